//! Role-gated access rules.
//!
//! Only `RH` and `admin` may look at or change someone else's records.
//! These checks run inside the core services; hiding a button in a client
//! is not enforcement.

use crate::error::{AttendanceError, AttendanceResult};
use crate::model::{Identity, Matricula};

/// true iff the caller is HR or administrator.
pub fn can_view_or_edit_others(identity: &Identity) -> bool {
    identity.role.is_hr_or_admin()
}

pub fn require_hr_or_admin(identity: &Identity) -> AttendanceResult<()> {
    if can_view_or_edit_others(identity) {
        Ok(())
    } else {
        Err(AttendanceError::permission("HR/Admin only"))
    }
}

/// Caller may act on `target` when it is themselves or when privileged.
pub fn require_self_or_privileged(identity: &Identity, target: &Matricula) -> AttendanceResult<()> {
    if &identity.matricula == target || can_view_or_edit_others(identity) {
        Ok(())
    } else {
        Err(AttendanceError::permission(format!(
            "{} may only operate on their own records",
            identity.matricula
        )))
    }
}
