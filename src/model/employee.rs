use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::matricula::Matricula;
use super::role::{Branch, Role, Sex, Shift};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "matricula": "04821-37",
        "name": "MARIA DA SILVA",
        "email": "maria@empresa.com.br",
        "document": "52998224725",
        "role": "Funcionario",
        "branch": "Matriz",
        "shift": "Manhã",
        "sex": "Feminino",
        "created_at": 1735725600000i64,
        "updated_at": 1735725600000i64
    })
)]
pub struct Employee {
    #[schema(example = "04821-37", value_type = String)]
    pub matricula: Matricula,

    #[schema(example = "MARIA DA SILVA")]
    pub name: String,

    #[schema(example = "maria@empresa.com.br")]
    pub email: String,

    /// National ID, digits only.
    #[schema(example = "52998224725")]
    pub document: String,

    pub role: Role,
    pub branch: Branch,
    pub shift: Shift,

    #[schema(nullable = true)]
    pub sex: Option<Sex>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[schema(value_type = i64)]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[schema(value_type = i64)]
    pub updated_at: DateTime<Utc>,
}

/// Registration payload. The registration number is never supplied by the
/// caller; it is generated on create.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewEmployee {
    #[schema(example = "Maria da Silva")]
    pub name: String,
    #[schema(example = "maria@empresa.com.br", format = "email")]
    pub email: String,
    #[schema(example = "529.982.247-25")]
    pub document: String,
    pub role: Role,
    pub branch: Branch,
    pub shift: Shift,
    #[serde(default)]
    pub sex: Option<Sex>,
}

/// Partial update. Every field except the registration number is mutable.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct EmployeeUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub document: Option<String>,
    pub role: Option<Role>,
    pub branch: Option<Branch>,
    pub shift: Option<Shift>,
    pub sex: Option<Sex>,
}

impl EmployeeUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.document.is_none()
            && self.role.is_none()
            && self.branch.is_none()
            && self.shift.is_none()
            && self.sex.is_none()
    }

    /// Applies the update onto `employee`, stamping `updated_at`.
    pub fn apply_to(&self, employee: &mut Employee, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            employee.name = name.clone();
        }
        if let Some(email) = &self.email {
            employee.email = email.clone();
        }
        if let Some(document) = &self.document {
            employee.document = document.clone();
        }
        if let Some(role) = self.role {
            employee.role = role;
        }
        if let Some(branch) = self.branch {
            employee.branch = branch;
        }
        if let Some(shift) = self.shift {
            employee.shift = shift;
        }
        if let Some(sex) = self.sex {
            employee.sex = Some(sex);
        }
        employee.updated_at = now;
    }
}
