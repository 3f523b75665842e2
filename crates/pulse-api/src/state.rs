//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! - **Stores**: one in-memory [`Store`] per table. Reads are served from
//!   memory; when a database pool is configured, writes go to Postgres first
//!   and then to memory, and [`AppState::hydrate_from_db`] loads everything
//!   back on startup.
//! - **Mailer**: the transactional-email collaborator, behind
//!   `Arc<dyn Mailer>` so tests can swap in an [`pulse_mail::Outbox`].
//! - **Config**: [`AppConfig`], read from the environment once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use pulse_core::{
    AssignmentId, CompanyId, DepartmentId, EmailAddress, GuestInviteId, InviteToken, ProfileId,
    QaResponses, Questionnaire, ResponseId, Role, SurveyId, TeamId,
};
use pulse_mail::{LogMailer, Mailer};
use pulse_state::{
    Assignment, GuestInvite, ScheduleError, SurveySchedule, DEFAULT_INVITE_TTL_HOURS,
};

use crate::auth::SecretToken;

// ── Generic In-Memory Store ──────────────────────────────────────────────────

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Insert unless an existing record conflicts with the new one.
    ///
    /// The conflict scan and the insert run under one write lock, so two
    /// concurrent inserts of the same unique key cannot both succeed.
    /// Returns `false` (and stores nothing) on conflict.
    pub fn insert_unique(&self, id: Uuid, value: T, conflicts: impl Fn(&T) -> bool) -> bool {
        let mut guard = self.data.write();
        if guard.values().any(conflicts) {
            return false;
        }
        guard.insert(id, value);
        true
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// First record matching `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// All records matching `pred`.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure may inspect the current state, validate preconditions,
    /// mutate the record, and return `Ok(R)` or `Err(E)`. The whole
    /// operation runs under a single write lock.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with
    /// the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Apply `f` to every record matching `pred`. Returns how many changed.
    pub fn update_where(&self, pred: impl Fn(&T) -> bool, mut f: impl FnMut(&mut T)) -> usize {
        let mut guard = self.data.write();
        let mut changed = 0;
        for entry in guard.values_mut().filter(|v| pred(v)) {
            f(entry);
            changed += 1;
        }
        changed
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A record that belongs to exactly one company.
pub trait Tenanted {
    fn company_id(&self) -> CompanyId;
}

impl<T: Clone + Send + Sync + Tenanted> Store<T> {
    /// Fetch a record only if it belongs to `company`.
    ///
    /// Records of other tenants are indistinguishable from missing ones.
    pub fn get_scoped(&self, id: &Uuid, company: CompanyId) -> Option<T> {
        self.get(id).filter(|v| v.company_id() == company)
    }

    /// Every record belonging to `company`.
    pub fn list_scoped(&self, company: CompanyId) -> Vec<T> {
        self.filter(|v| v.company_id() == company)
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

/// A tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyRecord {
    pub id: CompanyId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentRecord {
    pub id: DepartmentId,
    pub company_id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person in a company.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub id: ProfileId,
    pub company_id: CompanyId,
    pub email: EmailAddress,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub department_id: Option<DepartmentId>,
    /// A profile is on at most one team.
    pub team_id: Option<TeamId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRecord {
    pub id: TeamId,
    pub company_id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub manager_id: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyRecord {
    pub id: SurveyId,
    pub company_id: CompanyId,
    pub title: String,
    pub description: Option<String>,
    pub questions: Questionnaire,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SurveyRecord {
    /// The survey's activity window, validated.
    pub fn schedule(&self) -> Result<SurveySchedule, ScheduleError> {
        SurveySchedule::new(self.is_active, self.start_date, self.end_date)
    }
}

/// A submitted set of answers, from an employee or a guest.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    pub id: ResponseId,
    pub survey_id: SurveyId,
    pub company_id: CompanyId,
    pub team_id: Option<TeamId>,
    /// `None` for guest responses.
    pub profile_id: Option<ProfileId>,
    pub assignment_id: Option<AssignmentId>,
    pub guest_invite_id: Option<GuestInviteId>,
    pub qa_responses: QaResponses,
    pub submitted_at: DateTime<Utc>,
}

macro_rules! tenanted {
    ($($ty:ty),* $(,)?) => {
        $(impl Tenanted for $ty {
            fn company_id(&self) -> CompanyId {
                self.company_id
            }
        })*
    };
}

tenanted!(
    DepartmentRecord,
    ProfileRecord,
    TeamRecord,
    SurveyRecord,
    ResponseRecord,
    Assignment,
    GuestInvite,
);

// ── Configuration ────────────────────────────────────────────────────────────

/// Default public base URL for links in emails.
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<SecretToken>,
    /// Public base URL of the web app, without a trailing slash.
    pub site_url: String,
    /// Lifetime of a guest invite link, in hours.
    pub guest_invite_ttl_hours: i64,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "PORT",
                value: raw,
                reason: "expected a port number",
            })?,
            None => defaults.port,
        };

        let auth_token = lookup("AUTH_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(SecretToken::new);

        let site_url = lookup("SITE_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or(defaults.site_url);

        let guest_invite_ttl_hours = match lookup("GUEST_INVITE_TTL_HOURS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "GUEST_INVITE_TTL_HOURS",
                        value: raw,
                        reason: "expected a positive number of hours",
                    })
                }
            },
            None => defaults.guest_invite_ttl_hours,
        };

        Ok(Self {
            port,
            auth_token,
            site_url,
            guest_invite_ttl_hours,
        })
    }

    pub fn invite_ttl(&self) -> Duration {
        Duration::hours(self.guest_invite_ttl_hours)
    }

    /// The magic link a guest follows to answer a survey.
    pub fn guest_link(&self, token: &InviteToken) -> String {
        format!("{}/survey/guest/{}", self.site_url, token.as_str())
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.site_url)
    }

    pub fn dashboard_url(&self) -> String {
        format!("{}/dashboard", self.site_url)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("site_url", &self.site_url)
            .field("guest_invite_ttl_hours", &self.guest_invite_ttl_hours)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            site_url: DEFAULT_SITE_URL.to_string(),
            guest_invite_ttl_hours: DEFAULT_INVITE_TTL_HOURS,
        }
    }
}

// ── Application State ────────────────────────────────────────────────────────

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub companies: Store<CompanyRecord>,
    pub departments: Store<DepartmentRecord>,
    pub profiles: Store<ProfileRecord>,
    pub teams: Store<TeamRecord>,
    pub surveys: Store<SurveyRecord>,
    pub assignments: Store<Assignment>,
    pub guest_invites: Store<GuestInvite>,
    pub responses: Store<ResponseRecord>,

    pub mailer: Arc<dyn Mailer>,
    /// Postgres pool. `None` means in-memory only.
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
}

impl AppState {
    /// Default configuration, log-only mail, no database.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), Arc::new(LogMailer), None)
    }

    pub fn with_config(config: AppConfig, mailer: Arc<dyn Mailer>, db_pool: Option<PgPool>) -> Self {
        Self {
            companies: Store::new(),
            departments: Store::new(),
            profiles: Store::new(),
            teams: Store::new(),
            surveys: Store::new(),
            assignments: Store::new(),
            guest_invites: Store::new(),
            responses: Store::new(),
            mailer,
            db_pool,
            config,
        }
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let companies = crate::db::companies::load_all(pool)
            .await
            .map_err(|e| format!("failed to load companies: {e}"))?;
        let company_count = companies.len();
        for record in companies {
            self.companies.insert(*record.id.as_uuid(), record);
        }

        let departments = crate::db::departments::load_all(pool)
            .await
            .map_err(|e| format!("failed to load departments: {e}"))?;
        let department_count = departments.len();
        for record in departments {
            self.departments.insert(*record.id.as_uuid(), record);
        }

        let profiles = crate::db::profiles::load_all(pool)
            .await
            .map_err(|e| format!("failed to load profiles: {e}"))?;
        let profile_count = profiles.len();
        for record in profiles {
            self.profiles.insert(*record.id.as_uuid(), record);
        }

        let teams = crate::db::teams::load_all(pool)
            .await
            .map_err(|e| format!("failed to load teams: {e}"))?;
        let team_count = teams.len();
        for record in teams {
            self.teams.insert(*record.id.as_uuid(), record);
        }

        let surveys = crate::db::surveys::load_all(pool)
            .await
            .map_err(|e| format!("failed to load surveys: {e}"))?;
        let survey_count = surveys.len();
        for record in surveys {
            self.surveys.insert(*record.id.as_uuid(), record);
        }

        let assignments = crate::db::assignments::load_all(pool)
            .await
            .map_err(|e| format!("failed to load assignments: {e}"))?;
        let assignment_count = assignments.len();
        for record in assignments {
            self.assignments.insert(*record.id.as_uuid(), record);
        }

        let invites = crate::db::guest_invites::load_all(pool)
            .await
            .map_err(|e| format!("failed to load guest invites: {e}"))?;
        let invite_count = invites.len();
        for record in invites {
            self.guest_invites.insert(*record.id.as_uuid(), record);
        }

        let responses = crate::db::responses::load_all(pool)
            .await
            .map_err(|e| format!("failed to load survey responses: {e}"))?;
        let response_count = responses.len();
        for record in responses {
            self.responses.insert(*record.id.as_uuid(), record);
        }

        tracing::info!(
            companies = company_count,
            departments = department_count,
            profiles = profile_count,
            teams = team_count,
            surveys = survey_count,
            assignments = assignment_count,
            guest_invites = invite_count,
            responses = response_count,
            "hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("companies", &self.companies.len())
            .field("profiles", &self.profiles.len())
            .field("surveys", &self.surveys.len())
            .field("mailer", &self.mailer.kind())
            .field("database", &self.db_pool.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn department(company_id: CompanyId, name: &str) -> DepartmentRecord {
        let now = Utc::now();
        DepartmentRecord {
            id: DepartmentId::new(),
            company_id,
            name: name.to_string(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    // ── Store ────────────────────────────────────────────────────────────────

    #[test]
    fn store_insert_get_remove() {
        let store: Store<DepartmentRecord> = Store::new();
        let dept = department(CompanyId::new(), "Engineering");
        let id = *dept.id.as_uuid();

        assert!(store.insert(id, dept.clone()).is_none());
        assert_eq!(store.get(&id), Some(dept));
        assert!(store.contains(&id));
        assert_eq!(store.len(), 1);
        assert!(store.remove(&id).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn store_try_update_reports_missing_and_errors() {
        let store: Store<DepartmentRecord> = Store::new();
        let dept = department(CompanyId::new(), "Sales");
        let id = *dept.id.as_uuid();
        store.insert(id, dept);

        let missing: Option<Result<(), &str>> = store.try_update(&Uuid::new_v4(), |_| Ok(()));
        assert!(missing.is_none());

        let rejected = store.try_update(&id, |d| {
            if d.is_active {
                Err("still active")
            } else {
                Ok(())
            }
        });
        assert_eq!(rejected, Some(Err("still active")));

        let renamed = store.try_update(&id, |d| {
            d.name = "Field Sales".into();
            Ok::<_, ()>(d.name.clone())
        });
        assert_eq!(renamed, Some(Ok("Field Sales".to_string())));
    }

    #[test]
    fn store_insert_unique_rejects_conflicts() {
        let store: Store<DepartmentRecord> = Store::new();
        let company = CompanyId::new();
        let first = department(company, "Ops");
        assert!(store.insert_unique(*first.id.as_uuid(), first, |_| false));

        let dup = department(company, "ops");
        let accepted = store.insert_unique(*dup.id.as_uuid(), dup, |d| {
            d.company_id == company && d.name.eq_ignore_ascii_case("ops")
        });
        assert!(!accepted);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn scoped_get_hides_other_tenants() {
        let store: Store<DepartmentRecord> = Store::new();
        let mine = CompanyId::new();
        let theirs = CompanyId::new();
        let dept = department(theirs, "Legal");
        let id = *dept.id.as_uuid();
        store.insert(id, dept);

        assert!(store.get_scoped(&id, mine).is_none());
        assert!(store.get_scoped(&id, theirs).is_some());
        assert!(store.list_scoped(mine).is_empty());
    }

    #[test]
    fn update_where_counts_changes() {
        let store: Store<DepartmentRecord> = Store::new();
        let company = CompanyId::new();
        for name in ["A", "B", "C"] {
            let d = department(company, name);
            store.insert(*d.id.as_uuid(), d);
        }
        let changed = store.update_where(|d| d.name != "B", |d| d.is_active = false);
        assert_eq!(changed, 2);
        assert_eq!(store.filter(|d| d.is_active).len(), 1);
    }

    // ── AppConfig ────────────────────────────────────────────────────────────

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.auth_token.is_none());
        assert_eq!(config.site_url, DEFAULT_SITE_URL);
        assert_eq!(config.guest_invite_ttl_hours, 168);
    }

    #[test]
    fn config_reads_values_and_trims_site_url() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("AUTH_TOKEN", "s3cret"),
            ("SITE_URL", "https://pulse.example.com/"),
            ("GUEST_INVITE_TTL_HOURS", "48"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.auth_token.as_ref().map(|t| t.expose()), Some("s3cret"));
        assert_eq!(config.login_url(), "https://pulse.example.com/login");
        assert_eq!(config.invite_ttl(), Duration::hours(48));

        let token = InviteToken::generate();
        assert_eq!(
            config.guest_link(&token),
            format!("https://pulse.example.com/survey/guest/{}", token.as_str())
        );
    }

    #[test]
    fn config_rejects_bad_values() {
        assert!(AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        let err = AppConfig::from_lookup(lookup(&[("GUEST_INVITE_TTL_HOURS", "0")])).unwrap_err();
        assert!(err.to_string().contains("GUEST_INVITE_TTL_HOURS"));
    }

    #[test]
    fn config_debug_redacts_auth_token() {
        let config = AppConfig::from_lookup(lookup(&[("AUTH_TOKEN", "hunter2")])).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn app_state_debug_names_mailer() {
        let state = AppState::new();
        assert!(format!("{state:?}").contains("\"log\""));
    }

    #[tokio::test]
    async fn hydrate_without_pool_is_noop() {
        let state = AppState::new();
        state.hydrate_from_db().await.unwrap();
        assert!(state.companies.is_empty());
    }
}
