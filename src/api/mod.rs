pub mod employee;
pub mod me;
pub mod punch;

use crate::error::AttendanceError;
use crate::model::Matricula;

/// Path and query registration numbers; malformed input is a 400.
pub(crate) fn parse_matricula(raw: &str) -> Result<Matricula, AttendanceError> {
    raw.parse::<Matricula>()
        .map_err(|e| AttendanceError::validation(e.to_string()))
}
