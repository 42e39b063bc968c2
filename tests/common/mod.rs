#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::channel::oneshot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use ponto::clock::{LocalCalendar, ManualClock};
use ponto::identity::IdentityStore;
use ponto::model::{
    Branch, Employee, EmployeeUpdate, Identity, Matricula, NewPunch, PunchAmendment, PunchId,
    PunchRecord, Role, Shift,
};
use ponto::session::AttendanceSessionManager;
use ponto::store::{MemoryStore, PersistencePort, StoreError, StoreResult};

pub const VALID_DOCUMENTS: [&str; 4] = ["52998224725", "11144477735", "39053344705", "12345678909"];

pub fn calendar() -> LocalCalendar {
    LocalCalendar::from_offset_minutes(-180).unwrap()
}

/// Local wall-clock time (UTC-3) as an instant.
pub fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    calendar()
        .offset()
        .with_ymd_and_hms(y, mo, d, h, mi, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn matricula(s: &str) -> Matricula {
    s.parse().unwrap()
}

pub fn employee(m: &str, role: Role) -> Employee {
    let now = Utc::now();
    Employee {
        matricula: matricula(m),
        name: "EMPREGADO TESTE".into(),
        email: format!("{m}@empresa.com"),
        document: VALID_DOCUMENTS[0].into(),
        role,
        branch: Branch::Matriz,
        shift: Shift::Morning,
        sex: None,
        created_at: now,
        updated_at: now,
    }
}

pub async fn seed(store: &dyn PersistencePort, m: &str, role: Role) -> Identity {
    let created = store.create_employee(employee(m, role)).await.unwrap();
    Identity::from(&created)
}

/// Core services over one in-memory store and a hand-driven clock.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub sessions: AttendanceSessionManager,
    pub identities: IdentityStore,
}

impl Harness {
    pub fn at(now: DateTime<Utc>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(now));
        Harness {
            sessions: AttendanceSessionManager::new(store.clone(), clock.clone(), calendar()),
            identities: IdentityStore::new(store.clone(), clock.clone()),
            store,
            clock,
        }
    }

    pub fn tick(&self, minutes: i64) {
        self.clock.advance(Duration::minutes(minutes));
    }
}

/// Memory store with switchable faults: listing can be made to fail, and
/// the first punch write can be held until released.
pub struct FaultyStore {
    inner: MemoryStore,
    fail_listing: AtomicBool,
    write_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        FaultyStore {
            inner: MemoryStore::new(),
            fail_listing: AtomicBool::new(false),
            write_gate: Mutex::new(None),
        }
    }

    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    /// Holds the next `write_punch` until the returned sender fires.
    pub fn hold_next_write(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.write_gate.lock().unwrap() = Some(rx);
        tx
    }

    fn check_listing(&self) -> StoreResult<()> {
        if self.fail_listing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistencePort for FaultyStore {
    async fn list_punches(
        &self,
        employee: &Matricula,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PunchRecord>> {
        self.check_listing()?;
        self.inner.list_punches(employee, start, end).await
    }

    async fn list_all_punches(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PunchRecord>> {
        self.check_listing()?;
        self.inner.list_all_punches(start, end).await
    }

    async fn write_punch(&self, punch: NewPunch) -> StoreResult<PunchRecord> {
        let gate = self.write_gate.lock().unwrap().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        self.inner.write_punch(punch).await
    }

    async fn get_punch(&self, id: &PunchId) -> StoreResult<Option<PunchRecord>> {
        self.inner.get_punch(id).await
    }

    async fn amend_punch(&self, id: &PunchId, amendment: PunchAmendment) -> StoreResult<()> {
        self.inner.amend_punch(id, amendment).await
    }

    async fn delete_punch(&self, id: &PunchId) -> StoreResult<()> {
        self.inner.delete_punch(id).await
    }

    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        self.check_listing()?;
        self.inner.list_employees().await
    }

    async fn find_employee(&self, matricula: &Matricula) -> StoreResult<Option<Employee>> {
        self.inner.find_employee(matricula).await
    }

    async fn find_employee_by_email(&self, email: &str) -> StoreResult<Option<Employee>> {
        self.inner.find_employee_by_email(email).await
    }

    async fn search_employees(&self, term: &str) -> StoreResult<Vec<Employee>> {
        self.check_listing()?;
        self.inner.search_employees(term).await
    }

    async fn create_employee(&self, employee: Employee) -> StoreResult<Employee> {
        self.inner.create_employee(employee).await
    }

    async fn update_employee(
        &self,
        matricula: &Matricula,
        update: EmployeeUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Employee> {
        self.inner.update_employee(matricula, update, now).await
    }

    async fn delete_employee(&self, matricula: &Matricula) -> StoreResult<()> {
        self.inner.delete_employee(matricula).await
    }
}
