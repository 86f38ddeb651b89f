/// A caller already authenticated by the HTTP surface. The engine only ever
/// sees one of these; raw credentials never cross this boundary.
#[derive(Debug, Clone)]
pub enum Principal {
    /// Daemon credential: full write + read over the key owner's sessions.
    ApiKey { user_id: i64 },
    /// Browser credential: owner rights plus shared reads by email.
    WebSession { user_id: i64, email: String },
    /// Bare public share token: read access to exactly one session.
    ShareToken { token: String },
}

impl Principal {
    /// The user this principal acts as, if it is user-backed at all.
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Self::ApiKey { user_id } | Self::WebSession { user_id, .. } => Some(*user_id),
            Self::ShareToken { .. } => None,
        }
    }
}
