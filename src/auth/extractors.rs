use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;

/// The authenticated caller, as resolved by `SessionGuard`.
///
/// Routes behind the guard take `Identity` as a handler argument. If the guard did
/// not run, extraction fails with `401 NoTokenProvided` instead of reaching the
/// handler body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// Id of the user the session belongs to.
    pub subject: Uuid,
}

impl FromRequest for Identity {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Identity>().copied() {
            Some(identity) => ready(Ok(identity)),
            None => {
                log::warn!("No identity on {}; is SessionGuard applied?", req.path());
                let err = AppError::Unauthorized("NoTokenProvided".to_string());
                ready(Err(err.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_rt::test]
    async fn test_identity_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        let subject = Uuid::new_v4();
        req.extensions_mut().insert(Identity { subject });

        let mut payload = Payload::None;
        let extracted = Identity::from_request(&req, &mut payload).await.unwrap();
        assert_eq!(extracted.subject, subject);
    }

    #[actix_rt::test]
    async fn test_identity_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let err = Identity::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }
}
