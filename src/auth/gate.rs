use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AttendanceError, AttendanceResult};
use crate::model::document::normalize_document;
use crate::model::{Employee, Identity};
use crate::store::PersistencePort;

/// Checks login credentials (email + document number) against the
/// identity records.
pub struct AuthGate {
    store: Arc<dyn PersistencePort>,
}

impl AuthGate {
    pub fn new(store: Arc<dyn PersistencePort>) -> Self {
        Self { store }
    }

    /// Returns the matching employee. Unknown email and wrong document are
    /// indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, document: &str) -> AttendanceResult<Employee> {
        let email = email.trim().to_lowercase();
        let document = normalize_document(document.trim());
        if email.is_empty() || document.is_empty() {
            return Err(AttendanceError::validation("email and document are required"));
        }

        let Some(employee) = self.store.find_employee_by_email(&email).await? else {
            debug!("Login refused: unknown email");
            return Err(AttendanceError::InvalidCredentials);
        };

        if normalize_document(&employee.document) != document {
            debug!(matricula = %employee.matricula, "Login refused: document mismatch");
            return Err(AttendanceError::InvalidCredentials);
        }

        info!(matricula = %employee.matricula, role = %employee.role, "Login accepted");
        Ok(employee)
    }

    /// Same as [`AuthGate::authenticate`], reduced to the session identity.
    pub async fn identify(&self, email: &str, document: &str) -> AttendanceResult<Identity> {
        self.authenticate(email, document)
            .await
            .map(|employee| Identity::from(&employee))
    }
}
