//! The authorization checkpoint.
//!
//! `SessionGuard` wraps the `/api` scope. Every request except the handful of public
//! auth endpoints must carry a session token, either in the `token` cookie or as an
//! `Authorization: Bearer` header. A request is admitted only when the token verifies
//! and its subject still exists; the resolved [`Identity`] is then stored in the
//! request extensions for extractors and later middleware.

use std::fmt;
use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use uuid::Uuid;

use crate::auth::extractors::Identity;
use crate::auth::token::{AuthError, SessionCodec};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::Store;

pub const SESSION_COOKIE: &str = "token";

/// Paths under the guarded scope that are reachable without a session.
const PUBLIC_PATHS: [&str; 3] = ["/api/auth/register", "/api/auth/login", "/api/auth/logout"];

/// Why the checkpoint refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoTokenProvided,
    InvalidToken(AuthError),
    /// The token is valid but its user no longer exists.
    UnknownSubject,
}

impl Rejection {
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::NoTokenProvided => "NoTokenProvided",
            Rejection::InvalidToken(err) => err.kind(),
            Rejection::UnknownSubject => "UnknownSubject",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> AppError {
        AppError::Unauthorized(rejection.kind().to_string())
    }
}

/// Reads the session token from the cookie, falling back to a bearer header.
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
}

/// Verifies `token` and confirms its subject is a known user.
pub async fn authenticate(
    token: Option<&str>,
    codec: &SessionCodec,
    store: &dyn Store,
) -> Result<Result<Identity, Rejection>, AppError> {
    let Some(token) = token else {
        return Ok(Err(Rejection::NoTokenProvided));
    };

    let claims = match codec.verify(token) {
        Ok(claims) => claims,
        Err(err) => return Ok(Err(Rejection::InvalidToken(err))),
    };

    let Ok(subject) = Uuid::parse_str(&claims.sub) else {
        return Ok(Err(Rejection::InvalidToken(AuthError::MalformedToken)));
    };

    if store.find_user_by_id(subject).await?.is_none() {
        return Ok(Err(Rejection::UnknownSubject));
    }

    Ok(Ok(Identity { subject }))
}

/// Runs the full checkpoint for one request.
///
/// The inner result is the checkpoint's verdict. The outer error is reserved for
/// failures that are not the caller's fault (missing state, store errors).
pub async fn require_session(req: &HttpRequest) -> Result<Result<Identity, Rejection>, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::InternalServerError("AppState is not configured".into()))?;

    let token = extract_token(req);
    let verdict = authenticate(token.as_deref(), &state.codec, state.store.as_ref()).await?;
    if let Err(rejection) = &verdict {
        log::debug!("Rejected {} {}: {}", req.method(), req.path(), rejection);
    }
    Ok(verdict)
}

pub struct SessionGuard;

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SessionGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGuardService {
            service: Rc::new(service),
        }))
    }
}

pub struct SessionGuardService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SessionGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if PUBLIC_PATHS.contains(&req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let session = require_session(req.request()).await;
            let err = match session {
                Ok(Ok(identity)) => {
                    req.extensions_mut().insert(identity);
                    return service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body);
                }
                Ok(Err(rejection)) => AppError::from(rejection),
                Err(err) => err,
            };
            Ok(req.into_response(err.error_response()).map_into_right_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::PasswordHasher;
    use crate::auth::token::tests::ManualClock;
    use crate::models::User;
    use crate::store::MemoryStore;
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;
    use chrono::Duration;
    use std::sync::Arc;

    const SECRET: &[u8] = b"middleware_test_secret_0123456789ab";

    async fn setup() -> (SessionCodec, Arc<MemoryStore>, Arc<ManualClock>, User) {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let codec = SessionCodec::new(SECRET, clock.clone());
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(User::new(
                "u1".into(),
                PasswordHasher::new(4).hash("password123").unwrap(),
            ))
            .await
            .unwrap();
        (codec, store, clock, user)
    }

    #[test]
    fn test_extract_token_prefers_cookie() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "from-cookie"))
            .insert_header((header::AUTHORIZATION, "Bearer from-header"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_extract_token_from_bearer_header() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("abc.def.ghi"));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert_eq!(extract_token(&req), None);

        let req = TestRequest::default().to_http_request();
        assert_eq!(extract_token(&req), None);
    }

    #[actix_rt::test]
    async fn test_authenticate_admits_valid_token() {
        let (codec, store, _, user) = setup().await;
        let token = codec
            .issue(&user.id.to_string(), Duration::seconds(3600))
            .unwrap();

        let identity = authenticate(Some(&token), &codec, store.as_ref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.subject, user.id);
    }

    #[actix_rt::test]
    async fn test_authenticate_rejections() {
        let (codec, store, clock, user) = setup().await;

        let result = authenticate(None, &codec, store.as_ref()).await.unwrap();
        assert_eq!(result, Err(Rejection::NoTokenProvided));

        let result = authenticate(Some("garbage"), &codec, store.as_ref())
            .await
            .unwrap();
        assert_eq!(
            result,
            Err(Rejection::InvalidToken(AuthError::MalformedToken))
        );

        let not_a_uuid = codec.issue("u1", Duration::seconds(60)).unwrap();
        let result = authenticate(Some(&not_a_uuid), &codec, store.as_ref())
            .await
            .unwrap();
        assert_eq!(
            result,
            Err(Rejection::InvalidToken(AuthError::MalformedToken))
        );

        let stranger = codec
            .issue(&Uuid::new_v4().to_string(), Duration::seconds(60))
            .unwrap();
        let result = authenticate(Some(&stranger), &codec, store.as_ref())
            .await
            .unwrap();
        assert_eq!(result, Err(Rejection::UnknownSubject));

        let token = codec
            .issue(&user.id.to_string(), Duration::seconds(3600))
            .unwrap();
        clock.advance(3601);
        let result = authenticate(Some(&token), &codec, store.as_ref())
            .await
            .unwrap();
        assert_eq!(result, Err(Rejection::InvalidToken(AuthError::Expired)));
    }

    #[actix_rt::test]
    async fn test_require_session_reports_typed_rejection() {
        let (codec, store, _, user) = setup().await;
        let token = codec
            .issue(&user.id.to_string(), Duration::seconds(3600))
            .unwrap();
        let state = AppState::new(store, codec, PasswordHasher::new(4), Duration::seconds(3600));

        let req = TestRequest::default()
            .app_data(web::Data::new(state.clone()))
            .to_http_request();
        assert_eq!(
            require_session(&req).await.unwrap(),
            Err(Rejection::NoTokenProvided)
        );

        let req = TestRequest::default()
            .app_data(web::Data::new(state.clone()))
            .insert_header((header::AUTHORIZATION, "Bearer a.b.c"))
            .to_http_request();
        assert_eq!(
            require_session(&req).await.unwrap(),
            Err(Rejection::InvalidToken(AuthError::BadSignature))
        );

        let req = TestRequest::default()
            .app_data(web::Data::new(state))
            .cookie(Cookie::new(SESSION_COOKIE, token))
            .to_http_request();
        assert_eq!(
            require_session(&req).await.unwrap(),
            Ok(Identity { subject: user.id })
        );

        // Without application state the failure is not a rejection.
        let req = TestRequest::default().to_http_request();
        assert!(matches!(
            require_session(&req).await,
            Err(AppError::InternalServerError(_))
        ));
    }

    #[test]
    fn test_rejection_kinds() {
        assert_eq!(Rejection::NoTokenProvided.kind(), "NoTokenProvided");
        assert_eq!(
            Rejection::InvalidToken(AuthError::BadSignature).kind(),
            "BadSignature"
        );
        assert_eq!(Rejection::UnknownSubject.to_string(), "UnknownSubject");

        let err: AppError = Rejection::NoTokenProvided.into();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg == "NoTokenProvided"));
    }
}
