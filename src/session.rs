//! Attendance session manager.
//!
//! Orchestrates punch actions: resolves who is punching, asks the sequencer
//! what comes next, writes through the ledger and re-reads the day. All
//! writes for one `(employee, day)` are serialized by an in-flight guard
//! that refuses re-entrant calls instead of queueing them.

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::auth::policy::{require_hr_or_admin, require_self_or_privileged};
use crate::clock::{Clock, DayWindow, LocalCalendar};
use crate::error::{AttendanceError, AttendanceResult};
use crate::model::punch::sort_punches;
use crate::model::{
    AmendmentStamp, DayKey, Employee, GeoLocation, Identity, Matricula, NewPunch,
    PunchAmendment, PunchId, PunchRecord, PunchType,
};
use crate::sequencer::{self, NextPunch};
use crate::store::{PersistencePort, StoreError};

/// Longest span accepted by [`AttendanceSessionManager::punches_in_period`].
pub const MAX_PERIOD_DAYS: i64 = 366;

/// Result of a successful punch: the new record plus the day re-read from
/// the ledger.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordedPunch {
    pub punch: PunchRecord,
    pub day: Vec<PunchRecord>,
}

/// Holds the `(employee, day)` slot until dropped.
pub struct InFlightGuard<'a> {
    slots: &'a DashMap<DayKey, ()>,
    key: DayKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.slots.remove(&self.key);
    }
}

pub struct AttendanceSessionManager {
    store: Arc<dyn PersistencePort>,
    clock: Arc<dyn Clock>,
    calendar: LocalCalendar,
    in_flight: DashMap<DayKey, ()>,
}

fn validate_location(location: &GeoLocation) -> AttendanceResult<()> {
    if !(-90.0..=90.0).contains(&location.latitude) {
        return Err(AttendanceError::validation("latitude out of range"));
    }
    if !(-180.0..=180.0).contains(&location.longitude) {
        return Err(AttendanceError::validation("longitude out of range"));
    }
    if location.accuracy.is_some_and(|a| a.is_nan() || a < 0.0) {
        return Err(AttendanceError::validation("accuracy must be non-negative"));
    }
    Ok(())
}

fn types_of<'a, I>(punches: I) -> Vec<PunchType>
where
    I: IntoIterator<Item = &'a PunchRecord>,
{
    punches.into_iter().map(|p| p.punch_type).collect()
}

impl AttendanceSessionManager {
    pub fn new(
        store: Arc<dyn PersistencePort>,
        clock: Arc<dyn Clock>,
        calendar: LocalCalendar,
    ) -> Self {
        Self {
            store,
            clock,
            calendar,
            in_flight: DashMap::new(),
        }
    }

    pub fn calendar(&self) -> &LocalCalendar {
        &self.calendar
    }

    /// Current local calendar day.
    pub fn today(&self) -> NaiveDate {
        self.calendar.day_of(self.clock.now())
    }

    /// Claims the slot for `key`, or fails with `PunchInFlight`.
    pub fn try_acquire(&self, key: DayKey) -> AttendanceResult<InFlightGuard<'_>> {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => {
                warn!(key = %key, "Re-entrant punch operation refused");
                Err(AttendanceError::PunchInFlight)
            }
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(InFlightGuard {
                    slots: &self.in_flight,
                    key,
                })
            }
        }
    }

    async fn resolve_target(
        &self,
        actor: &Identity,
        target: &Matricula,
    ) -> AttendanceResult<Employee> {
        require_self_or_privileged(actor, target)?;
        self.store
            .find_employee(target)
            .await?
            .ok_or_else(|| AttendanceError::NotFound(format!("employee {target}")))
    }

    async fn load_window(
        &self,
        employee: &Matricula,
        window: DayWindow,
    ) -> AttendanceResult<Vec<PunchRecord>> {
        let mut punches = self
            .store
            .list_punches(employee, window.start, window.end)
            .await?;
        sort_punches(&mut punches);
        Ok(punches)
    }

    /// Records the next punch of today for `target`.
    pub async fn record_punch(
        &self,
        actor: &Identity,
        target: &Matricula,
        location: Option<GeoLocation>,
    ) -> AttendanceResult<RecordedPunch> {
        if let Some(location) = &location {
            validate_location(location)?;
        }
        let employee = self.resolve_target(actor, target).await?;

        let now = self.clock.now();
        let day = self.calendar.day_of(now);
        let window = self.calendar.window(day);
        let _guard = self.try_acquire(DayKey::new(target.clone(), day))?;

        let today = self.load_window(target, window).await?;
        let recorded = types_of(&today);

        let next = match sequencer::next_type(recorded.iter().copied())? {
            NextPunch::Next(t) => t,
            NextPunch::Complete => {
                debug!(matricula = %target, %day, "Journey already complete");
                return Err(AttendanceError::JourneyComplete);
            }
        };

        if sequencer::is_duplicate(recorded.iter().copied(), next) {
            return Err(AttendanceError::DuplicatePunch(next));
        }

        let written = self
            .store
            .write_punch(NewPunch {
                employee: target.clone(),
                day,
                punch_type: next,
                timestamp: now,
                location,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AttendanceError::DuplicatePunch(next),
                other => other.into(),
            })?;

        // Re-derive from the ledger rather than trusting the write's echo.
        let day_punches = self.load_window(target, window).await?;
        let punch = day_punches
            .iter()
            .find(|p| p.id == written.id)
            .cloned()
            .unwrap_or(written);

        info!(
            matricula = %target,
            name = %employee.name,
            by = %actor.matricula,
            punch_type = %punch.punch_type,
            punch_id = %punch.id,
            "Punch recorded"
        );

        Ok(RecordedPunch {
            punch,
            day: day_punches,
        })
    }

    /// What `record_punch` would record right now, without writing.
    pub async fn next_punch(
        &self,
        actor: &Identity,
        target: &Matricula,
    ) -> AttendanceResult<NextPunch> {
        self.resolve_target(actor, target).await?;
        let day = self.today();
        let today = self.load_window(target, self.calendar.window(day)).await?;
        Ok(sequencer::next_type(types_of(&today))?)
    }

    /// One day's punches, ascending by time.
    pub async fn day_punches(
        &self,
        actor: &Identity,
        target: &Matricula,
        day: NaiveDate,
    ) -> AttendanceResult<Vec<PunchRecord>> {
        require_self_or_privileged(actor, target)?;
        self.load_window(target, self.calendar.window(day)).await
    }

    /// Punches over whole days `from..=to`. `target = None` means every
    /// employee and is HR/admin only.
    pub async fn punches_in_period(
        &self,
        actor: &Identity,
        target: Option<&Matricula>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AttendanceResult<Vec<PunchRecord>> {
        if from > to {
            return Err(AttendanceError::validation("period start is after its end"));
        }
        if (to - from).num_days() >= MAX_PERIOD_DAYS {
            return Err(AttendanceError::validation(format!(
                "period may span at most {MAX_PERIOD_DAYS} days"
            )));
        }

        let range = self.calendar.range(from, to);
        match target {
            Some(target) => {
                require_self_or_privileged(actor, target)?;
                self.load_window(target, range).await
            }
            None => {
                require_hr_or_admin(actor)?;
                let mut punches = self.store.list_all_punches(range.start, range.end).await?;
                sort_punches(&mut punches);
                Ok(punches)
            }
        }
    }

    /// HR/admin correction of a punch's type and time. The punch stays on
    /// its original day and the day must remain a valid sequence.
    pub async fn amend_punch(
        &self,
        actor: &Identity,
        punch_id: &PunchId,
        new_type: PunchType,
        new_timestamp: DateTime<Utc>,
    ) -> AttendanceResult<()> {
        require_hr_or_admin(actor)?;

        let punch = self
            .store
            .get_punch(punch_id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound(format!("punch {punch_id}")))?;

        let window = self.calendar.window(punch.day);
        if !sequencer::is_within_window(window.start, window.end, new_timestamp) {
            debug!(punch_id = %punch_id, %new_timestamp, day = %punch.day, "Amendment outside day window");
            return Err(AttendanceError::InvalidTimestamp);
        }

        let _guard = self.try_acquire(punch.day_key())?;

        let day = self.load_window(&punch.employee, window).await?;
        let others = types_of(day.iter().filter(|p| &p.id != punch_id));

        if sequencer::is_duplicate(others.iter().copied(), new_type) {
            return Err(AttendanceError::DuplicatePunch(new_type));
        }
        sequencer::check_prefix(others.iter().copied().chain(std::iter::once(new_type)))?;

        let amendment = PunchAmendment {
            punch_type: new_type,
            timestamp: new_timestamp,
            stamp: AmendmentStamp {
                amender_id: actor.matricula.clone(),
                amender_name: actor.name.clone(),
                amender_role: actor.role,
                amended_at: self.clock.now(),
            },
        };

        self.store
            .amend_punch(punch_id, amendment)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AttendanceError::DuplicatePunch(new_type),
                other => other.into(),
            })?;

        info!(
            punch_id = %punch_id,
            matricula = %punch.employee,
            from_type = %punch.punch_type,
            to_type = %new_type,
            by = %actor.matricula,
            "Punch amended"
        );
        Ok(())
    }

    /// HR/admin hard delete. The remaining punches of the day must still
    /// form a valid sequence.
    pub async fn delete_punch(&self, actor: &Identity, punch_id: &PunchId) -> AttendanceResult<()> {
        require_hr_or_admin(actor)?;

        let punch = self
            .store
            .get_punch(punch_id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound(format!("punch {punch_id}")))?;

        let _guard = self.try_acquire(punch.day_key())?;

        let day = self
            .load_window(&punch.employee, self.calendar.window(punch.day))
            .await?;
        sequencer::check_prefix(types_of(day.iter().filter(|p| &p.id != punch_id)))?;

        self.store.delete_punch(punch_id).await?;

        warn!(
            punch_id = %punch_id,
            matricula = %punch.employee,
            punch_type = %punch.punch_type,
            by = %actor.matricula,
            "Punch deleted"
        );
        Ok(())
    }
}
