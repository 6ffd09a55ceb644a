use std::sync::Arc;

use actix_web::cookie::{time, Cookie, SameSite};
use chrono::Duration;

use crate::auth::middleware::SESSION_COOKIE;
use crate::auth::password::PasswordHasher;
use crate::auth::token::SessionCodec;
use crate::config::Config;
use crate::store::Store;

/// Everything handlers and middleware share. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub codec: Arc<SessionCodec>,
    pub hasher: PasswordHasher,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        codec: SessionCodec,
        hasher: PasswordHasher,
        session_ttl: Duration,
    ) -> Self {
        Self {
            store,
            codec: Arc::new(codec),
            hasher,
            session_ttl,
            cookie_secure: false,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn Store>) -> Self {
        let mut state = Self::new(
            store,
            SessionCodec::with_system_clock(config.jwt_secret.as_bytes()),
            PasswordHasher::new(config.bcrypt_cost),
            Duration::seconds(config.session_ttl_secs),
        );
        state.cookie_secure = config.cookie_secure;
        state
    }

    /// Issues a session token for `user_id` with the configured ttl.
    pub fn issue_session(&self, user_id: uuid::Uuid) -> Result<String, crate::error::AppError> {
        self.codec.issue(&user_id.to_string(), self.session_ttl)
    }

    /// Cookie carrying a freshly issued token.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, token)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(time::Duration::seconds(self.session_ttl.num_seconds()))
            .finish()
    }

    /// Cookie that makes the browser drop the session.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(SESSION_COOKIE, "")
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .finish();
        cookie.make_removal();
        cookie
    }
}
