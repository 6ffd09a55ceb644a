use crate::{
    auth::{ensure_owner, ownership::not_found, Identity},
    error::AppError,
    models::{UserChanges, UserUpdate},
    state::AppState,
};
use actix_web::{delete, get, put, web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

/// Lists all accounts. Password hashes are never serialized.
#[get("")]
pub async fn get_users(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let users = state.store.list_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

#[get("/{id}")]
pub async fn get_user(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let user = state
        .store
        .find_user_by_id(user_id.into_inner())
        .await?
        .ok_or_else(|| not_found("User"))?;

    Ok(HttpResponse::Ok().json(user))
}

/// Updates the caller's own account. A new password is hashed before it is stored.
///
/// ## Responses:
/// - `200 OK`: the updated user.
/// - `400 Bad Request`: username taken.
/// - `404 Not Found`: the id is not the caller's.
/// - `422 Unprocessable Entity`: validation failed.
#[put("/{id}")]
pub async fn update_user(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
    update: web::Json<UserUpdate>,
    identity: Identity,
) -> Result<impl Responder, AppError> {
    let user_id = user_id.into_inner();
    ensure_owner(user_id, &identity).map_err(|e| e.into_not_found("User"))?;
    update.validate()?;

    let UserUpdate { username, password } = update.into_inner();
    let password_hash = match password {
        Some(password) => Some(state.hasher.hash_blocking(password).await?),
        None => None,
    };

    let user = state
        .store
        .update_user(
            user_id,
            UserChanges {
                username,
                password_hash,
            },
        )
        .await?
        .ok_or_else(|| not_found("User"))?;

    Ok(HttpResponse::Ok().json(user))
}

/// Deletes the caller's own account and clears the session cookie.
/// The account's tasks are not deleted.
#[delete("/{id}")]
pub async fn delete_user(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
    identity: Identity,
) -> Result<impl Responder, AppError> {
    let user_id = user_id.into_inner();
    ensure_owner(user_id, &identity).map_err(|e| e.into_not_found("User"))?;

    if !state.store.delete_user(user_id).await? {
        return Err(not_found("User"));
    }

    log::info!("Deleted user {}", user_id);
    Ok(HttpResponse::NoContent()
        .cookie(state.removal_cookie())
        .finish())
}
