//! MySQL adapter.
//!
//! Punches live one row per event, grouped by `(matricula, day)`; the unique
//! key on `(matricula, day, punch_type)` enforces one punch of each type per
//! day. Older rows may carry the app's legacy `entrada`/`saida` spellings,
//! which are normalized on read and never reach the sequencer.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::{FromRow, MySqlPool};
use std::str::FromStr;
use tracing::{debug, error, info};

use super::{PersistencePort, StoreError, StoreResult};
use crate::model::{
    AmendmentStamp, Branch, Employee, EmployeeUpdate, GeoLocation, Matricula, NewPunch,
    PunchAmendment, PunchId, PunchRecord, PunchType, Role, Sex, Shift,
};
use crate::utils::sql_update::{SqlUpdateBuilder, execute_update};

const CREATE_EMPLOYEES: &str = r#"
CREATE TABLE IF NOT EXISTS employees (
    matricula   CHAR(8)      NOT NULL PRIMARY KEY,
    name        VARCHAR(255) NOT NULL,
    email       VARCHAR(255) NOT NULL,
    document    CHAR(11)     NOT NULL,
    role        VARCHAR(16)  NOT NULL,
    branch      VARCHAR(16)  NOT NULL,
    shift       VARCHAR(16)  NOT NULL,
    sex         VARCHAR(16)  NULL,
    created_at  BIGINT       NOT NULL,
    updated_at  BIGINT       NOT NULL,
    UNIQUE KEY uq_employees_email (email)
)
"#;

const CREATE_PUNCHES: &str = r#"
CREATE TABLE IF NOT EXISTS punches (
    id               CHAR(36)     NOT NULL PRIMARY KEY,
    matricula        CHAR(8)      NOT NULL,
    day              DATE         NOT NULL,
    punch_type       VARCHAR(32)  NOT NULL,
    ts_millis        BIGINT       NOT NULL,
    latitude         DOUBLE       NULL,
    longitude        DOUBLE       NULL,
    accuracy         DOUBLE       NULL,
    amended_by       CHAR(8)      NULL,
    amended_by_name  VARCHAR(255) NULL,
    amended_by_role  VARCHAR(16)  NULL,
    amended_at       BIGINT       NULL,
    UNIQUE KEY uq_punches_day_type (matricula, day, punch_type),
    KEY idx_punches_ts (matricula, ts_millis)
)
"#;

const EMPLOYEE_COLUMNS: &str =
    "matricula, name, email, document, role, branch, shift, sex, created_at, updated_at";

const PUNCH_COLUMNS: &str = "id, matricula, day, punch_type, ts_millis, latitude, longitude, \
     accuracy, amended_by, amended_by_name, amended_by_role, amended_at";

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates the tables when missing.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(CREATE_EMPLOYEES).execute(&self.pool).await?;
        sqlx::query(CREATE_PUNCHES).execute(&self.pool).await?;
        info!("MySQL schema ready");
        Ok(())
    }

    async fn fetch_punches(&self, sql: &str, binds: PunchFilter<'_>) -> StoreResult<Vec<PunchRecord>> {
        let mut query = sqlx::query_as::<_, PunchRow>(sql);
        if let Some(matricula) = binds.matricula {
            query = query.bind(matricula.as_str());
        }
        let rows = query
            .bind(binds.start.timestamp_millis())
            .bind(binds.end.timestamp_millis())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch punches");
                StoreError::from(e)
            })?;

        rows.into_iter().map(PunchRecord::try_from).collect()
    }
}

struct PunchFilter<'a> {
    matricula: Option<&'a Matricula>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Maps every spelling found in stored rows onto the canonical type.
pub fn normalize_punch_type(raw: &str) -> StoreResult<PunchType> {
    let cleaned = raw.trim().to_lowercase();
    match cleaned.as_str() {
        "entrada" => Ok(PunchType::Chegada),
        "saida" | "saída" => Ok(PunchType::Saida),
        "almoço" => Ok(PunchType::Almoco),
        "termino almoco" | "término almoço" => Ok(PunchType::TerminoAlmoco),
        other => PunchType::from_str(other)
            .map_err(|_| StoreError::Unavailable(format!("unknown punch type in storage: {raw:?}"))),
    }
}

fn corrupt(what: &str, value: &str) -> StoreError {
    StoreError::Unavailable(format!("corrupt {what} in storage: {value:?}"))
}

fn millis(ms: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| corrupt("timestamp", &ms.to_string()))
}

fn parse_with<T: FromStr>(what: &str, raw: &str) -> StoreResult<T> {
    raw.parse::<T>().map_err(|_| corrupt(what, raw))
}

#[derive(FromRow)]
struct EmployeeRow {
    matricula: String,
    name: String,
    email: String,
    document: String,
    role: String,
    branch: String,
    shift: String,
    sex: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = StoreError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee {
            matricula: parse_with::<Matricula>("registration number", &row.matricula)?,
            name: row.name,
            email: row.email,
            document: row.document,
            role: parse_with::<Role>("role", &row.role)?,
            branch: parse_with::<Branch>("branch", &row.branch)?,
            shift: parse_with::<Shift>("shift", &row.shift)?,
            sex: row
                .sex
                .as_deref()
                .map(|s| parse_with::<Sex>("sex", s))
                .transpose()?,
            created_at: millis(row.created_at)?,
            updated_at: millis(row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct PunchRow {
    id: String,
    matricula: String,
    day: NaiveDate,
    punch_type: String,
    ts_millis: i64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
    amended_by: Option<String>,
    amended_by_name: Option<String>,
    amended_by_role: Option<String>,
    amended_at: Option<i64>,
}

impl TryFrom<PunchRow> for PunchRecord {
    type Error = StoreError;

    fn try_from(row: PunchRow) -> Result<Self, Self::Error> {
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoLocation {
                latitude,
                longitude,
                accuracy: row.accuracy,
            }),
            _ => None,
        };

        let amendment = match (row.amended_by, row.amended_by_role, row.amended_at) {
            (Some(by), Some(role), Some(at)) => Some(AmendmentStamp {
                amender_id: parse_with::<Matricula>("amender", &by)?,
                amender_name: row.amended_by_name.unwrap_or_default(),
                amender_role: parse_with::<Role>("amender role", &role)?,
                amended_at: millis(at)?,
            }),
            _ => None,
        };

        Ok(PunchRecord {
            id: PunchId::from(row.id),
            employee: parse_with::<Matricula>("registration number", &row.matricula)?,
            day: row.day,
            punch_type: normalize_punch_type(&row.punch_type)?,
            timestamp: millis(row.ts_millis)?,
            location,
            amendment,
        })
    }
}

/// Duplicate-entry messages name the violated key; on `employees` the
/// primary key is the registration number.
fn is_primary_key_clash(message: &str) -> bool {
    message.contains("PRIMARY")
}

/// Escapes `LIKE` wildcards in user-supplied search terms.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl PersistencePort for MySqlStore {
    async fn list_punches(
        &self,
        employee: &Matricula,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PunchRecord>> {
        let sql = format!(
            "SELECT {PUNCH_COLUMNS} FROM punches WHERE matricula = ? AND ts_millis BETWEEN ? AND ?"
        );
        self.fetch_punches(
            &sql,
            PunchFilter {
                matricula: Some(employee),
                start,
                end,
            },
        )
        .await
    }

    async fn list_all_punches(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PunchRecord>> {
        let sql = format!("SELECT {PUNCH_COLUMNS} FROM punches WHERE ts_millis BETWEEN ? AND ?");
        self.fetch_punches(
            &sql,
            PunchFilter {
                matricula: None,
                start,
                end,
            },
        )
        .await
    }

    async fn write_punch(&self, punch: NewPunch) -> StoreResult<PunchRecord> {
        let id = PunchId::generate();
        let location = punch.location;

        sqlx::query(
            r#"
            INSERT INTO punches (id, matricula, day, punch_type, ts_millis, latitude, longitude, accuracy)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(punch.employee.as_str())
        .bind(punch.day)
        .bind(punch.punch_type.as_ref())
        .bind(punch.timestamp.timestamp_millis())
        .bind(location.map(|l| l.latitude))
        .bind(location.map(|l| l.longitude))
        .bind(location.and_then(|l| l.accuracy))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let err = StoreError::from(e);
            if !matches!(err, StoreError::Conflict(_)) {
                error!(error = %err, matricula = %punch.employee, "Failed to insert punch");
            }
            err
        })?;

        debug!(punch_id = %id, matricula = %punch.employee, "Punch row inserted");

        Ok(PunchRecord {
            id,
            employee: punch.employee,
            day: punch.day,
            punch_type: punch.punch_type,
            timestamp: punch.timestamp,
            location,
            amendment: None,
        })
    }

    async fn get_punch(&self, id: &PunchId) -> StoreResult<Option<PunchRecord>> {
        let sql = format!("SELECT {PUNCH_COLUMNS} FROM punches WHERE id = ?");
        let row = sqlx::query_as::<_, PunchRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(PunchRecord::try_from).transpose()
    }

    async fn amend_punch(&self, id: &PunchId, amendment: PunchAmendment) -> StoreResult<()> {
        let stamp = amendment.stamp;
        let update = SqlUpdateBuilder::new("punches")
            .set("punch_type", amendment.punch_type.as_ref())
            .set("ts_millis", amendment.timestamp.timestamp_millis())
            .set("amended_by", stamp.amender_id.as_str())
            .set("amended_by_name", stamp.amender_name)
            .set("amended_by_role", stamp.amender_role.as_ref())
            .set("amended_at", stamp.amended_at.timestamp_millis())
            .finish("id", id.as_str());

        let affected = execute_update(&self.pool, update).await?;
        if affected == 0 && self.get_punch(id).await?.is_none() {
            return Err(StoreError::NotFound(format!("punch {id}")));
        }
        Ok(())
    }

    async fn delete_punch(&self, id: &PunchId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM punches WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("punch {id}")));
        }
        Ok(())
    }

    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY created_at DESC, matricula"
        );
        let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Employee::try_from).collect()
    }

    async fn find_employee(&self, matricula: &Matricula) -> StoreResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE matricula = ?");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(matricula.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Employee::try_from).transpose()
    }

    async fn find_employee_by_email(&self, email: &str) -> StoreResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE email = ?");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Employee::try_from).transpose()
    }

    async fn search_employees(&self, term: &str) -> StoreResult<Vec<Employee>> {
        let escaped = escape_like(term);
        let contains = format!("%{}%", escaped.to_lowercase());
        let prefix = format!("{escaped}%");

        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees \
             WHERE LOWER(name) LIKE ? OR matricula LIKE ? OR document LIKE ? \
             ORDER BY name, matricula"
        );
        debug!(sql = %sql, term, "Searching employees");

        let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(contains)
            .bind(&prefix)
            .bind(&prefix)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Employee::try_from).collect()
    }

    async fn create_employee(&self, employee: Employee) -> StoreResult<Employee> {
        sqlx::query(
            r#"
            INSERT INTO employees
            (matricula, name, email, document, role, branch, shift, sex, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee.matricula.as_str())
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.document)
        .bind(employee.role.as_ref())
        .bind(employee.branch.as_ref())
        .bind(employee.shift.as_ref())
        .bind(employee.sex.map(|s| s.to_string()))
        .bind(employee.created_at.timestamp_millis())
        .bind(employee.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(message) if is_primary_key_clash(&message) => {
                StoreError::MatriculaTaken(employee.matricula.clone())
            }
            other => other,
        })?;

        Ok(employee)
    }

    async fn update_employee(
        &self,
        matricula: &Matricula,
        update: EmployeeUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Employee> {
        let sql_update = SqlUpdateBuilder::new("employees")
            .set_if("name", update.name)
            .set_if("email", update.email)
            .set_if("document", update.document)
            .set_if("role", update.role.map(|r| r.to_string()))
            .set_if("branch", update.branch.map(|b| b.to_string()))
            .set_if("shift", update.shift.map(|s| s.to_string()))
            .set_if("sex", update.sex.map(|s| s.to_string()))
            .set("updated_at", now.timestamp_millis())
            .finish("matricula", matricula.as_str());

        execute_update(&self.pool, sql_update).await?;

        self.find_employee(matricula)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("employee {matricula}")))
    }

    async fn delete_employee(&self, matricula: &Matricula) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM employees WHERE matricula = ?")
            .bind(matricula.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("employee {matricula}")));
        }
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("MySQL pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_spellings_normalize_to_canonical_types() {
        assert_eq!(normalize_punch_type("entrada").unwrap(), PunchType::Chegada);
        assert_eq!(normalize_punch_type("saida").unwrap(), PunchType::Saida);
        assert_eq!(normalize_punch_type("Saída").unwrap(), PunchType::Saida);
        assert_eq!(normalize_punch_type("CHEGADA").unwrap(), PunchType::Chegada);
        assert_eq!(
            normalize_punch_type(" TERMINO_ALMOCO ").unwrap(),
            PunchType::TerminoAlmoco
        );
    }

    #[test]
    fn unknown_spelling_is_a_storage_error() {
        assert!(matches!(
            normalize_punch_type("intervalo"),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn primary_key_clash_is_told_apart_from_email_clash() {
        assert!(is_primary_key_clash(
            "Duplicate entry '52655-54' for key 'employees.PRIMARY'"
        ));
        assert!(!is_primary_key_clash(
            "Duplicate entry 'ana@x.com' for key 'employees.uq_employees_email'"
        ));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_x"), "50\\%\\_x");
    }

    #[test]
    fn punch_row_without_coordinates_has_no_location() {
        let row = PunchRow {
            id: "p1".into(),
            matricula: "00001-01".into(),
            day: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            punch_type: "entrada".into(),
            ts_millis: 1_792_404_000_000,
            latitude: None,
            longitude: Some(1.0),
            accuracy: None,
            amended_by: None,
            amended_by_name: None,
            amended_by_role: None,
            amended_at: None,
        };
        let record = PunchRecord::try_from(row).unwrap();
        assert_eq!(record.punch_type, PunchType::Chegada);
        assert!(record.location.is_none());
        assert!(record.amendment.is_none());
    }
}
