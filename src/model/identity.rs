use serde::{Deserialize, Serialize};

use super::employee::Employee;
use super::matricula::Matricula;
use super::role::Role;

/// The authenticated caller, carried into every core operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub matricula: Matricula,
    pub name: String,
    pub role: Role,
}

impl Identity {
    pub fn new(matricula: Matricula, name: impl Into<String>, role: Role) -> Self {
        Identity {
            matricula,
            name: name.into(),
            role,
        }
    }
}

impl From<&Employee> for Identity {
    fn from(employee: &Employee) -> Self {
        Identity {
            matricula: employee.matricula.clone(),
            name: employee.name.clone(),
            role: employee.role,
        }
    }
}
