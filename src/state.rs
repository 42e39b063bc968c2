use std::sync::Arc;

use crate::auth::AuthGate;
use crate::clock::{Clock, LocalCalendar};
use crate::identity::IdentityStore;
use crate::session::AttendanceSessionManager;
use crate::store::PersistencePort;

/// Services shared by every worker, built once around a single store.
pub struct AppState {
    pub store: Arc<dyn PersistencePort>,
    pub identities: IdentityStore,
    pub sessions: AttendanceSessionManager,
    pub gate: AuthGate,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PersistencePort>,
        clock: Arc<dyn Clock>,
        calendar: LocalCalendar,
    ) -> Self {
        Self {
            identities: IdentityStore::new(store.clone(), clock.clone()),
            sessions: AttendanceSessionManager::new(store.clone(), clock, calendar),
            gate: AuthGate::new(store.clone()),
            store,
        }
    }
}
