//! Client session identity

use crate::locale::Locale;
use crate::storage::{ClientStorage, StorageResult, SESSION_CREATED_AT_KEY, SESSION_ID_KEY};
use chrono::{DateTime, Utc};

/// Visitor session, created once and kept forever
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub locale: Locale,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Hydrate the persisted session, or create and persist a new one
    pub fn load_or_create(storage: &dyn ClientStorage, locale: Locale) -> StorageResult<Self> {
        if let Some(session_id) = storage.get(SESSION_ID_KEY)?.filter(|id| !id.is_empty()) {
            let created_at = match storage.get(SESSION_CREATED_AT_KEY)? {
                Some(raw) => parse_datetime(&raw),
                None => {
                    // Session predates the timestamp key
                    let now = Utc::now();
                    storage.set(SESSION_CREATED_AT_KEY, &now.to_rfc3339())?;
                    now
                }
            };
            tracing::debug!(session_id = %session_id, "Hydrated chat session");
            return Ok(Self {
                session_id,
                locale,
                created_at,
            });
        }

        let session = Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            locale,
            created_at: Utc::now(),
        };
        storage.set(SESSION_ID_KEY, &session.session_id)?;
        storage.set(SESSION_CREATED_AT_KEY, &session.created_at.to_rfc3339())?;
        tracing::info!(session_id = %session.session_id, "Created chat session");
        Ok(session)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
