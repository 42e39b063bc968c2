//! Persistence port.
//!
//! The core reaches storage only through [`PersistencePort`]. One adapter is
//! chosen per deployment (`STORAGE_BACKEND`) and is authoritative: failures
//! come back as [`StoreError`] and are never retried against another store.

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    Employee, EmployeeUpdate, Matricula, NewPunch, PunchAmendment, PunchId, PunchRecord,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness rule of the store rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The registration number is already in use. Kept apart from
    /// `Conflict` so allocation can draw another candidate.
    #[error("Registration number taken: {0}")]
    MatriculaTaken(Matricula),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000") => {
                StoreError::Conflict(db_err.message().to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Punches of one employee with `start <= timestamp <= end`, in no
    /// particular order.
    async fn list_punches(
        &self,
        employee: &Matricula,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PunchRecord>>;

    /// Punches of every employee in `[start, end]`.
    async fn list_all_punches(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PunchRecord>>;

    /// Atomic append. `Conflict` when the same type already exists for that
    /// employee and day.
    async fn write_punch(&self, punch: NewPunch) -> StoreResult<PunchRecord>;

    async fn get_punch(&self, id: &PunchId) -> StoreResult<Option<PunchRecord>>;

    /// Overwrites type and timestamp and attaches the audit stamp. The day
    /// grouping is left untouched.
    async fn amend_punch(&self, id: &PunchId, amendment: PunchAmendment) -> StoreResult<()>;

    async fn delete_punch(&self, id: &PunchId) -> StoreResult<()>;

    async fn list_employees(&self) -> StoreResult<Vec<Employee>>;

    async fn find_employee(&self, matricula: &Matricula) -> StoreResult<Option<Employee>>;

    async fn find_employee_by_email(&self, email: &str) -> StoreResult<Option<Employee>>;

    /// Case-insensitive substring over name, prefix over registration
    /// number and document.
    async fn search_employees(&self, term: &str) -> StoreResult<Vec<Employee>>;

    /// `MatriculaTaken` when the registration number is in use, `Conflict`
    /// when the email is.
    async fn create_employee(&self, employee: Employee) -> StoreResult<Employee>;

    async fn update_employee(
        &self,
        matricula: &Matricula,
        update: EmployeeUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Employee>;

    /// Removes the employee only; their punches stay as history.
    async fn delete_employee(&self, matricula: &Matricula) -> StoreResult<()>;

    /// Releases connections. Called once at shutdown.
    async fn close(&self) {}
}
