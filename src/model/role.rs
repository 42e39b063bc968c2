use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Employee role as stored with the employee record.
///
/// The wire and storage spellings are the ones the mobile app always used:
/// `RH`, `Funcionario` and `admin`.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
pub enum Role {
    #[serde(rename = "admin")]
    #[strum(serialize = "admin")]
    Admin,
    #[serde(rename = "RH")]
    #[strum(serialize = "RH")]
    Hr,
    #[serde(rename = "Funcionario")]
    #[strum(serialize = "Funcionario")]
    Employee,
}

impl Role {
    pub fn is_hr_or_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
pub enum Branch {
    Filial,
    Matriz,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
pub enum Shift {
    #[serde(rename = "Manhã")]
    #[strum(serialize = "Manhã")]
    Morning,
    #[serde(rename = "Tarde")]
    #[strum(serialize = "Tarde")]
    Afternoon,
}

/// Legacy field, kept optional.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
pub enum Sex {
    Masculino,
    Feminino,
}
