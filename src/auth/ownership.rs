//! Per-resource ownership.
//!
//! A task may only be read, changed or deleted by the user that owns it. The check
//! runs as middleware (`OwnershipGuard`) on every `/api/tasks/{id}` route, after
//! `SessionGuard` has resolved the caller. Handlers receive the already-authorized
//! task through the [`OwnedTask`] extractor, which cannot succeed unless the guard ran.
//!
//! Denials are answered exactly like a missing record, so a caller cannot tell a
//! task that does not exist from one that belongs to somebody else.

use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use uuid::Uuid;

use crate::auth::extractors::Identity;
use crate::error::AppError;
use crate::models::Task;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("Forbidden")]
    Forbidden,
}

impl AuthorizationError {
    /// The response a denied caller sees: the same 404 as for a missing `resource`.
    pub fn into_not_found(self, resource: &str) -> AppError {
        not_found(resource)
    }
}

pub fn not_found(resource: &str) -> AppError {
    AppError::NotFound(format!("{} not found", resource))
}

/// Permits access only when `owner` is the authenticated subject.
pub fn ensure_owner(owner: Uuid, identity: &Identity) -> Result<(), AuthorizationError> {
    if owner == identity.subject {
        Ok(())
    } else {
        Err(AuthorizationError::Forbidden)
    }
}

/// A task the current caller is allowed to act on.
#[derive(Debug, Clone)]
pub struct OwnedTask(pub Task);

impl OwnedTask {
    pub fn into_inner(self) -> Task {
        self.0
    }
}

impl FromRequest for OwnedTask {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<OwnedTask>().cloned() {
            Some(task) => ready(Ok(task)),
            None => {
                let err = AppError::InternalServerError(format!(
                    "OwnedTask requested on {} without OwnershipGuard",
                    req.path()
                ));
                ready(Err(err.into()))
            }
        }
    }
}

/// Loads the task named by the `{id}` path segment and admits the request only
/// if the caller owns it.
pub async fn authorize_task(req: &HttpRequest) -> Result<OwnedTask, AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .copied()
        .ok_or_else(|| AppError::Unauthorized("NoTokenProvided".into()))?;

    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::InternalServerError("AppState is not configured".into()))?;

    let task_id = req
        .match_info()
        .get("id")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| not_found("Task"))?;

    let task = state
        .store
        .find_task(task_id)
        .await?
        .ok_or_else(|| not_found("Task"))?;

    if let Err(denied) = ensure_owner(task.user_id, &identity) {
        log::warn!(
            "User {} denied access to task {} owned by {}",
            identity.subject,
            task.id,
            task.user_id
        );
        return Err(denied.into_not_found("Task"));
    }

    Ok(OwnedTask(task))
}

pub struct OwnershipGuard;

impl<S, B> Transform<S, ServiceRequest> for OwnershipGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = OwnershipGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(OwnershipGuardService {
            service: Rc::new(service),
        }))
    }
}

pub struct OwnershipGuardService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for OwnershipGuardService<S>
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
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let authorization = authorize_task(req.request()).await;
            match authorization {
                Ok(task) => {
                    req.extensions_mut().insert(task);
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                }
                Err(err) => Ok(req.into_response(err.error_response()).map_into_right_body()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_is_permitted() {
        let subject = Uuid::new_v4();
        assert!(ensure_owner(subject, &Identity { subject }).is_ok());
    }

    #[test]
    fn test_non_owner_is_forbidden() {
        let identity = Identity {
            subject: Uuid::new_v4(),
        };
        assert_eq!(
            ensure_owner(Uuid::new_v4(), &identity),
            Err(AuthorizationError::Forbidden)
        );
    }

    #[test]
    fn test_denial_looks_like_missing_record() {
        let denied = AuthorizationError::Forbidden.into_not_found("Task");
        let missing = not_found("Task");

        assert_eq!(denied.to_string(), missing.to_string());
        assert!(matches!(denied, AppError::NotFound(_)));
    }
}
