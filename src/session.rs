//! Authenticated session, profile context and role/site gating.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Profile, Role};

/// Refresh this long before the access token expires.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Authenticated user as returned by the identity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens of a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) >= self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Session persisted between runs as JSON.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the platform data directory.
    pub fn default_location() -> Option<Self> {
        crate::config::data_dir().map(|dir| Self::new(dir.join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved session, if any. A corrupt file is treated as absent.
    pub fn load(&self) -> Option<Session> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {}: {e}", self.path.display());
                None
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Which records the current user may read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// Admins: every site.
    AllSites,
    /// Assigned to one site.
    Site(i64),
    /// Non-admin without an assigned site: nothing.
    Denied,
}

impl AccessScope {
    pub fn for_profile(role: Role, work_id: Option<i64>) -> Self {
        match (role, work_id) {
            (Role::Admin, _) => AccessScope::AllSites,
            (_, Some(id)) => AccessScope::Site(id),
            (_, None) => AccessScope::Denied,
        }
    }

    /// `obra_id` filter value for list queries. `None` means unfiltered.
    pub fn site_filter(&self) -> Option<i64> {
        match self {
            AccessScope::Site(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AccessScope::Denied)
    }

    /// Site a new record is written to.
    ///
    /// Assigned users always write to their own site; admins must pick one.
    pub fn write_site(&self, selected: Option<i64>) -> Result<i64> {
        match self {
            AccessScope::Site(id) => Ok(*id),
            AccessScope::AllSites => selected.ok_or_else(|| AppError::validation("Selecione a obra.")),
            AccessScope::Denied => Err(no_site_error()),
        }
    }

    /// Whether a record of `work_id` may be modified.
    pub fn check_write(&self, work_id: i64) -> Result<()> {
        match self {
            AccessScope::AllSites => Ok(()),
            AccessScope::Site(id) if *id == work_id => Ok(()),
            AccessScope::Site(_) => Err(AppError::forbidden("registro de outra obra")),
            AccessScope::Denied => Err(no_site_error()),
        }
    }
}

fn no_site_error() -> AppError {
    AppError::forbidden("usuário sem obra atribuída")
}

/// Top-level navigation tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    Dashboard,
    Deliveries,
    Visitors,
    Exit,
    Reports,
    Admin,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Dashboard,
        Tab::Deliveries,
        Tab::Visitors,
        Tab::Exit,
        Tab::Reports,
        Tab::Admin,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Painel",
            Tab::Deliveries => "Entregas",
            Tab::Visitors => "Visitantes",
            Tab::Exit => "Saída",
            Tab::Reports => "Relatórios",
            Tab::Admin => "Administração",
        }
    }

    pub fn allowed_for(&self, role: Role) -> bool {
        match self {
            Tab::Dashboard => true,
            Tab::Deliveries | Tab::Visitors | Tab::Exit => matches!(role, Role::Admin | Role::Guard),
            Tab::Reports => matches!(role, Role::Admin | Role::Manager),
            Tab::Admin => role == Role::Admin,
        }
    }
}

/// Tabs visible to `role`, in display order.
pub fn tabs(role: Role) -> Vec<Tab> {
    Tab::ALL.into_iter().filter(|tab| tab.allowed_for(role)).collect()
}

/// Everything a query needs to know about who is asking.
///
/// Built on login, dropped on logout.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: Session,
    pub profile: Option<Profile>,
}

impl SessionContext {
    pub fn new(session: Session, profile: Option<Profile>) -> Self {
        Self { session, profile }
    }

    pub fn access_token(&self) -> &str {
        &self.session.access_token
    }

    pub fn user_id(&self) -> Uuid {
        self.session.user.id
    }

    /// Missing profile means the least privileged role.
    pub fn role(&self) -> Role {
        self.profile.as_ref().map(|p| p.role).unwrap_or_default()
    }

    pub fn work_id(&self) -> Option<i64> {
        self.profile.as_ref().and_then(|p| p.work_id)
    }

    pub fn scope(&self) -> AccessScope {
        AccessScope::for_profile(self.role(), self.work_id())
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }

    pub fn can_open(&self, tab: Tab) -> bool {
        tab.allowed_for(self.role())
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("apenas administradores"))
        }
    }

    /// Name for the header: profile name, else e-mail.
    pub fn display_name(&self) -> String {
        match &self.profile {
            Some(p) if !p.full_name.is_empty() => p.full_name.clone(),
            _ => self.session.user.email.clone().unwrap_or_else(|| "Usuário".to_string()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn session() -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap(),
            user: AuthUser {
                id: Uuid::nil(),
                email: Some("porteiro@obra.com".to_string()),
            },
        }
    }

    pub(crate) fn context(role: Role, work_id: Option<i64>) -> SessionContext {
        let profile = Profile {
            id: Uuid::nil(),
            full_name: "ANA".to_string(),
            role,
            work_id,
            updated_at: None,
        };
        SessionContext::new(session(), Some(profile))
    }

    #[test]
    fn test_needs_refresh_margin() {
        let s = session();
        assert!(!s.needs_refresh(Utc.with_ymd_and_hms(2026, 10, 15, 11, 58, 0).unwrap()));
        assert!(s.needs_refresh(Utc.with_ymd_and_hms(2026, 10, 15, 11, 59, 30).unwrap()));
        assert!(!s.is_expired(Utc.with_ymd_and_hms(2026, 10, 15, 11, 59, 30).unwrap()));
    }

    #[test]
    fn test_scope_default_deny() {
        assert_eq!(context(Role::Guard, None).scope(), AccessScope::Denied);
        assert_eq!(context(Role::Manager, None).scope(), AccessScope::Denied);
        assert_eq!(context(Role::Guard, Some(4)).scope(), AccessScope::Site(4));
        assert_eq!(context(Role::Admin, None).scope(), AccessScope::AllSites);
        assert_eq!(context(Role::Admin, Some(4)).scope(), AccessScope::AllSites);

        let no_profile = SessionContext::new(session(), None);
        assert_eq!(no_profile.role(), Role::Guard);
        assert_eq!(no_profile.scope(), AccessScope::Denied);
    }

    #[test]
    fn test_write_site() {
        assert_eq!(AccessScope::Site(3).write_site(Some(9)).unwrap(), 3);
        assert_eq!(AccessScope::AllSites.write_site(Some(9)).unwrap(), 9);
        assert!(matches!(
            AccessScope::AllSites.write_site(None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(AccessScope::Denied.write_site(Some(9)), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_check_write() {
        assert!(AccessScope::AllSites.check_write(1).is_ok());
        assert!(AccessScope::Site(1).check_write(1).is_ok());
        assert!(AccessScope::Site(1).check_write(2).is_err());
        assert!(AccessScope::Denied.check_write(1).is_err());
    }

    #[test]
    fn test_tabs_by_role() {
        assert_eq!(tabs(Role::Admin), Tab::ALL.to_vec());
        assert_eq!(
            tabs(Role::Guard),
            vec![Tab::Dashboard, Tab::Deliveries, Tab::Visitors, Tab::Exit]
        );
        assert_eq!(tabs(Role::Manager), vec![Tab::Dashboard, Tab::Reports]);
    }

    #[test]
    fn test_session_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        assert!(store.load().is_none());

        store.save(&session()).unwrap();
        assert_eq!(store.load(), Some(session()));

        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_session_file_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_none());
    }
}
