//! In-process adapter. Backs `STORAGE_BACKEND=memory` and the test-suite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{PersistencePort, StoreError, StoreResult};
use crate::model::{
    Employee, EmployeeUpdate, Matricula, NewPunch, PunchAmendment, PunchId, PunchRecord,
};

#[derive(Default)]
struct Tables {
    employees: BTreeMap<Matricula, Employee>,
    punches: HashMap<PunchId, PunchRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn punches_where<F>(&self, pred: F) -> Vec<PunchRecord>
    where
        F: Fn(&PunchRecord) -> bool,
    {
        self.read()
            .punches
            .values()
            .filter(|p| pred(p))
            .cloned()
            .collect()
    }
}

fn email_taken(tables: &Tables, email: &str, except: Option<&Matricula>) -> bool {
    tables
        .employees
        .values()
        .any(|e| e.email == email && Some(&e.matricula) != except)
}

#[async_trait]
impl PersistencePort for MemoryStore {
    async fn list_punches(
        &self,
        employee: &Matricula,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PunchRecord>> {
        Ok(self.punches_where(|p| {
            &p.employee == employee && start <= p.timestamp && p.timestamp <= end
        }))
    }

    async fn list_all_punches(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PunchRecord>> {
        Ok(self.punches_where(|p| start <= p.timestamp && p.timestamp <= end))
    }

    async fn write_punch(&self, punch: NewPunch) -> StoreResult<PunchRecord> {
        let mut tables = self.write();

        let exists = tables.punches.values().any(|p| {
            p.employee == punch.employee && p.day == punch.day && p.punch_type == punch.punch_type
        });
        if exists {
            return Err(StoreError::Conflict(format!(
                "{} already recorded for {}_{}",
                punch.punch_type, punch.employee, punch.day
            )));
        }

        let record = PunchRecord {
            id: PunchId::generate(),
            employee: punch.employee,
            day: punch.day,
            punch_type: punch.punch_type,
            timestamp: punch.timestamp,
            location: punch.location,
            amendment: None,
        };
        tables.punches.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_punch(&self, id: &PunchId) -> StoreResult<Option<PunchRecord>> {
        Ok(self.read().punches.get(id).cloned())
    }

    async fn amend_punch(&self, id: &PunchId, amendment: PunchAmendment) -> StoreResult<()> {
        let mut tables = self.write();

        let (employee, day) = match tables.punches.get(id) {
            Some(p) => (p.employee.clone(), p.day),
            None => return Err(StoreError::NotFound(format!("punch {id}"))),
        };

        let clash = tables.punches.values().any(|p| {
            &p.id != id
                && p.employee == employee
                && p.day == day
                && p.punch_type == amendment.punch_type
        });
        if clash {
            return Err(StoreError::Conflict(format!(
                "{} already recorded for {employee}_{day}",
                amendment.punch_type
            )));
        }

        if let Some(record) = tables.punches.get_mut(id) {
            record.punch_type = amendment.punch_type;
            record.timestamp = amendment.timestamp;
            record.amendment = Some(amendment.stamp);
        }
        Ok(())
    }

    async fn delete_punch(&self, id: &PunchId) -> StoreResult<()> {
        match self.write().punches.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("punch {id}"))),
        }
    }

    /// Newest first, like the database adapter.
    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        let mut employees: Vec<Employee> = self.read().employees.values().cloned().collect();
        employees.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.matricula.cmp(&b.matricula))
        });
        Ok(employees)
    }

    async fn find_employee(&self, matricula: &Matricula) -> StoreResult<Option<Employee>> {
        Ok(self.read().employees.get(matricula).cloned())
    }

    async fn find_employee_by_email(&self, email: &str) -> StoreResult<Option<Employee>> {
        Ok(self
            .read()
            .employees
            .values()
            .find(|e| e.email == email)
            .cloned())
    }

    async fn search_employees(&self, term: &str) -> StoreResult<Vec<Employee>> {
        let needle = term.to_lowercase();
        let mut found: Vec<Employee> = self
            .read()
            .employees
            .values()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.matricula.as_str().starts_with(term)
                    || e.document.starts_with(term)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.matricula.cmp(&b.matricula)));
        Ok(found)
    }

    async fn create_employee(&self, employee: Employee) -> StoreResult<Employee> {
        let mut tables = self.write();

        if tables.employees.contains_key(&employee.matricula) {
            return Err(StoreError::MatriculaTaken(employee.matricula));
        }
        if email_taken(&tables, &employee.email, None) {
            return Err(StoreError::Conflict(format!("email {}", employee.email)));
        }

        tables
            .employees
            .insert(employee.matricula.clone(), employee.clone());
        Ok(employee)
    }

    async fn update_employee(
        &self,
        matricula: &Matricula,
        update: EmployeeUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Employee> {
        let mut tables = self.write();

        if let Some(email) = &update.email {
            if email_taken(&tables, email, Some(matricula)) {
                return Err(StoreError::Conflict(format!("email {email}")));
            }
        }

        let employee = tables
            .employees
            .get_mut(matricula)
            .ok_or_else(|| StoreError::NotFound(format!("employee {matricula}")))?;
        update.apply_to(employee, now);
        Ok(employee.clone())
    }

    async fn delete_employee(&self, matricula: &Matricula) -> StoreResult<()> {
        match self.write().employees.remove(matricula) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("employee {matricula}"))),
        }
    }
}
