//! Capability resolution: given a principal and a session id, decide what
//! the caller may do. Stateless over the metadata store.
//!
//! Unknown session ids and real denials produce the same [`Error::Forbidden`]
//! so responses never reveal whether a session exists.

use meta_store::SessionRow;
use uuid::Uuid;

use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use crate::principal::Principal;

/// What an operation needs from the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Need {
    Write,
    Read,
    /// Owner-only, and only for interactively authenticated callers.
    Delete,
}

/// The owner-independent facts the policy decision needs, separated from the
/// store lookups so the policy itself stays a pure function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AccessFacts {
    pub owner_matches: bool,
    pub shared_with_caller: bool,
}

pub(crate) fn allows(principal: &Principal, facts: AccessFacts, need: Need) -> bool {
    match (principal, need) {
        (Principal::ApiKey { .. }, Need::Write | Need::Read) => facts.owner_matches,
        (Principal::ApiKey { .. }, Need::Delete) => false,
        (Principal::WebSession { .. }, Need::Write | Need::Delete) => facts.owner_matches,
        (Principal::WebSession { .. }, Need::Read) => {
            facts.owner_matches || facts.shared_with_caller
        }
        (Principal::ShareToken { .. }, Need::Read) => facts.shared_with_caller,
        (Principal::ShareToken { .. }, Need::Write | Need::Delete) => false,
    }
}

impl SyncEngine {
    pub(crate) async fn resolve(
        &self,
        principal: &Principal,
        session_id: Uuid,
        need: Need,
    ) -> Result<SessionRow> {
        let session = self
            .db()
            .get_session(session_id)
            .await?
            .ok_or(Error::Forbidden)?;

        let owner_matches = principal.user_id() == Some(session.owner_user_id);

        // only consult share rows when ownership alone doesn't settle it
        let shared_with_caller = if owner_matches || need != Need::Read {
            false
        } else {
            match principal {
                Principal::WebSession { email, .. } => {
                    self.db().share_exists_for_email(session.id, email).await?
                }
                Principal::ShareToken { token } => self
                    .db()
                    .lookup_share_by_token(token)
                    .await?
                    .is_some_and(|share| share.session_id == session.id),
                Principal::ApiKey { .. } => false,
            }
        };

        let facts = AccessFacts {
            owner_matches,
            shared_with_caller,
        };

        if allows(principal, facts, need) {
            Ok(session)
        } else {
            Err(Error::Forbidden)
        }
    }

    pub(crate) async fn resolve_write(
        &self,
        principal: &Principal,
        session_id: Uuid,
    ) -> Result<SessionRow> {
        self.resolve(principal, session_id, Need::Write).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNED: AccessFacts = AccessFacts {
        owner_matches: true,
        shared_with_caller: false,
    };
    const SHARED: AccessFacts = AccessFacts {
        owner_matches: false,
        shared_with_caller: true,
    };
    const NEITHER: AccessFacts = AccessFacts {
        owner_matches: false,
        shared_with_caller: false,
    };

    fn api_key() -> Principal {
        Principal::ApiKey { user_id: 1 }
    }

    fn web() -> Principal {
        Principal::WebSession {
            user_id: 1,
            email: "u@example.com".into(),
        }
    }

    fn token() -> Principal {
        Principal::ShareToken {
            token: "tok".into(),
        }
    }

    #[test]
    fn api_key_writes_and_reads_owned_sessions_only() {
        assert!(allows(&api_key(), OWNED, Need::Write));
        assert!(allows(&api_key(), OWNED, Need::Read));
        assert!(!allows(&api_key(), SHARED, Need::Write));
        assert!(!allows(&api_key(), SHARED, Need::Read));
        assert!(!allows(&api_key(), NEITHER, Need::Read));
    }

    #[test]
    fn api_key_never_deletes() {
        assert!(!allows(&api_key(), OWNED, Need::Delete));
    }

    #[test]
    fn web_session_gets_shared_reads_but_not_shared_writes() {
        assert!(allows(&web(), OWNED, Need::Write));
        assert!(allows(&web(), OWNED, Need::Delete));
        assert!(allows(&web(), SHARED, Need::Read));
        assert!(!allows(&web(), SHARED, Need::Write));
        assert!(!allows(&web(), SHARED, Need::Delete));
        assert!(!allows(&web(), NEITHER, Need::Read));
    }

    #[test]
    fn share_token_is_read_only() {
        assert!(allows(&token(), SHARED, Need::Read));
        assert!(!allows(&token(), SHARED, Need::Write));
        assert!(!allows(&token(), SHARED, Need::Delete));
        assert!(!allows(&token(), NEITHER, Need::Read));
    }
}
