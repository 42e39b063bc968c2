//! Identity store: employee records and registration-number allocation.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::policy::{require_hr_or_admin, require_self_or_privileged};
use crate::clock::Clock;
use crate::error::{AttendanceError, AttendanceResult};
use crate::model::document::{is_valid_document, normalize_document};
use crate::model::{
    Branch, Employee, EmployeeUpdate, Identity, Matricula, NewEmployee, Role, Shift,
};
use crate::store::{PersistencePort, StoreError};
use crate::utils::matricula_index::MatriculaIndex;

/// Upper bound on candidates drawn before giving up.
pub const MAX_GENERATION_ATTEMPTS: usize = 20;

const WARMUP_BATCH: usize = 500;

/// Bootstrap administrator, created once if missing.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub document: String,
}

pub struct IdentityStore {
    store: Arc<dyn PersistencePort>,
    clock: Arc<dyn Clock>,
    index: MatriculaIndex,
}

/// Upper-cases a full name, allowing only letters (diacritics included)
/// and single spaces.
pub fn normalize_name(raw: &str) -> AttendanceResult<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(AttendanceError::validation("name is required"));
    }
    if !collapsed.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(AttendanceError::validation(
            "name may only contain letters and spaces",
        ));
    }
    Ok(collapsed.to_uppercase())
}

pub fn normalize_email(raw: &str) -> AttendanceResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(AttendanceError::validation("email is required"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(AttendanceError::validation("email may not contain spaces"));
    }
    Ok(email)
}

/// Strips punctuation and checks both check digits.
pub fn validate_document(raw: &str) -> AttendanceResult<String> {
    let document = normalize_document(raw.trim());
    if document.is_empty() {
        return Err(AttendanceError::validation("document is required"));
    }
    if !is_valid_document(&document) {
        return Err(AttendanceError::validation("invalid document number"));
    }
    Ok(document)
}

fn require_role_grant(actor: &Identity, role: Role) -> AttendanceResult<()> {
    if role == Role::Admin && actor.role != Role::Admin {
        return Err(AttendanceError::permission(
            "only an administrator may grant the admin role",
        ));
    }
    Ok(())
}

fn require_admin_to_touch_admin(actor: &Identity, target: &Employee) -> AttendanceResult<()> {
    if target.role == Role::Admin && actor.role != Role::Admin {
        return Err(AttendanceError::permission(
            "only an administrator may change or remove an administrator",
        ));
    }
    Ok(())
}

fn exhausted() -> AttendanceError {
    warn!(
        attempts = MAX_GENERATION_ATTEMPTS,
        "Registration number generation exhausted"
    );
    AttendanceError::GenerationExhausted {
        attempts: MAX_GENERATION_ATTEMPTS,
    }
}

impl IdentityStore {
    pub fn new(store: Arc<dyn PersistencePort>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            index: MatriculaIndex::new(),
        }
    }

    /// Primes the registration-number index from storage.
    pub async fn warmup(&self) -> AttendanceResult<usize> {
        Ok(self.index.warmup(self.store.as_ref(), WARMUP_BATCH).await?)
    }

    /// Draws candidates until one is free, at most
    /// [`MAX_GENERATION_ATTEMPTS`] times.
    pub async fn generate_matricula<R>(&self, rng: &mut R) -> AttendanceResult<Matricula>
    where
        R: Rng + Send + ?Sized,
    {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let candidate = Matricula::random(rng);
            if self
                .index
                .is_available(&candidate, self.store.as_ref())
                .await?
            {
                debug!(matricula = %candidate, attempt, "Registration number allocated");
                return Ok(candidate);
            }
            debug!(matricula = %candidate, attempt, "Registration number collision");
        }

        Err(exhausted())
    }

    /// Draws a free number and inserts the record built around it. A
    /// number the index missed but the store already holds counts as a
    /// collision and is drawn again, within the same attempt budget.
    async fn insert_with_fresh_matricula<R, F>(
        &self,
        rng: &mut R,
        build: F,
    ) -> AttendanceResult<Employee>
    where
        R: Rng + Send + ?Sized,
        F: Fn(Matricula) -> Employee + Send,
    {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let candidate = Matricula::random(rng);
            if !self
                .index
                .is_available(&candidate, self.store.as_ref())
                .await?
            {
                debug!(matricula = %candidate, attempt, "Registration number collision");
                continue;
            }

            match self.store.create_employee(build(candidate)).await {
                Ok(created) => {
                    self.index.insert(&created.matricula).await;
                    return Ok(created);
                }
                Err(StoreError::MatriculaTaken(taken)) => {
                    debug!(matricula = %taken, attempt, "Registration number taken in store");
                    self.index.insert(&taken).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(exhausted())
    }

    pub async fn create(&self, actor: &Identity, new: NewEmployee) -> AttendanceResult<Employee> {
        let mut rng = StdRng::from_entropy();
        self.create_with_rng(actor, new, &mut rng).await
    }

    /// Registration with an explicit randomness source.
    pub async fn create_with_rng<R>(
        &self,
        actor: &Identity,
        new: NewEmployee,
        rng: &mut R,
    ) -> AttendanceResult<Employee>
    where
        R: Rng + Send + ?Sized,
    {
        require_hr_or_admin(actor)?;
        require_role_grant(actor, new.role)?;

        let name = normalize_name(&new.name)?;
        let email = normalize_email(&new.email)?;
        let document = validate_document(&new.document)?;

        let now = self.clock.now();
        let created = self
            .insert_with_fresh_matricula(rng, |matricula| Employee {
                matricula,
                name: name.clone(),
                email: email.clone(),
                document: document.clone(),
                role: new.role,
                branch: new.branch,
                shift: new.shift,
                sex: new.sex,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            matricula = %created.matricula,
            role = %created.role,
            by = %actor.matricula,
            "Employee registered"
        );
        Ok(created)
    }

    pub async fn list(&self, actor: &Identity) -> AttendanceResult<Vec<Employee>> {
        require_hr_or_admin(actor)?;
        Ok(self.store.list_employees().await?)
    }

    /// Blank terms list everyone.
    pub async fn search(&self, actor: &Identity, term: &str) -> AttendanceResult<Vec<Employee>> {
        require_hr_or_admin(actor)?;
        let term = term.trim();
        if term.is_empty() {
            return Ok(self.store.list_employees().await?);
        }
        Ok(self.store.search_employees(term).await?)
    }

    pub async fn get(&self, actor: &Identity, matricula: &Matricula) -> AttendanceResult<Employee> {
        require_self_or_privileged(actor, matricula)?;
        self.find_existing(matricula).await
    }

    async fn find_existing(&self, matricula: &Matricula) -> AttendanceResult<Employee> {
        self.store
            .find_employee(matricula)
            .await?
            .ok_or_else(|| AttendanceError::NotFound(format!("employee {matricula}")))
    }

    pub async fn update(
        &self,
        actor: &Identity,
        matricula: &Matricula,
        update: EmployeeUpdate,
    ) -> AttendanceResult<Employee> {
        require_hr_or_admin(actor)?;

        if update.is_empty() {
            return Err(AttendanceError::validation("no fields provided for update"));
        }
        if let Some(role) = update.role {
            require_role_grant(actor, role)?;
        }
        let current = self.find_existing(matricula).await?;
        require_admin_to_touch_admin(actor, &current)?;

        let normalized = EmployeeUpdate {
            name: update.name.as_deref().map(normalize_name).transpose()?,
            email: update.email.as_deref().map(normalize_email).transpose()?,
            document: update.document.as_deref().map(validate_document).transpose()?,
            ..update
        };

        let updated = self
            .store
            .update_employee(matricula, normalized, self.clock.now())
            .await?;

        info!(matricula = %matricula, by = %actor.matricula, "Employee updated");
        Ok(updated)
    }

    /// Removes the employee record. Their punch history is left in place.
    pub async fn delete(&self, actor: &Identity, matricula: &Matricula) -> AttendanceResult<()> {
        require_hr_or_admin(actor)?;
        if &actor.matricula == matricula {
            return Err(AttendanceError::validation("you cannot delete your own record"));
        }
        let current = self.find_existing(matricula).await?;
        require_admin_to_touch_admin(actor, &current)?;

        self.store.delete_employee(matricula).await?;
        self.index.remove(matricula).await;

        info!(matricula = %matricula, by = %actor.matricula, "Employee deleted");
        Ok(())
    }

    /// Creates the configured administrator unless an employee with that
    /// email already exists.
    pub async fn bootstrap_admin(&self, seed: &AdminSeed) -> AttendanceResult<Employee> {
        let email = normalize_email(&seed.email)?;

        if let Some(existing) = self.store.find_employee_by_email(&email).await? {
            debug!(matricula = %existing.matricula, "Administrator already present");
            return Ok(existing);
        }

        let name = normalize_name(&seed.name)?;
        let document = validate_document(&seed.document)?;
        let mut rng = StdRng::from_entropy();
        let now = self.clock.now();
        let created = self
            .insert_with_fresh_matricula(&mut rng, |matricula| Employee {
                matricula,
                name: name.clone(),
                email: email.clone(),
                document: document.clone(),
                role: Role::Admin,
                branch: Branch::Matriz,
                shift: Shift::Morning,
                sex: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(matricula = %created.matricula, "Administrator created");
        Ok(created)
    }
}
