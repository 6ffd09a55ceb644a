use crate::{
    auth::{Identity, OwnedTask},
    error::AppError,
    models::{Task, TaskInput, TaskQuery},
    state::AppState,
};
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

/// Retrieves the authenticated user's tasks, newest first.
///
/// ## Query Parameters:
/// - `search` (optional): case-insensitive match on title and description.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task` objects owned by the caller.
/// - `401 Unauthorized`: no valid session.
pub async fn get_tasks(
    state: web::Data<AppState>,
    query_params: web::Query<TaskQuery>,
    identity: Identity,
) -> Result<impl Responder, AppError> {
    let tasks = state
        .store
        .list_tasks(identity.subject, &query_params)
        .await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
///
/// The owner is always the caller; any owner given in the payload is ignored.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `401 Unauthorized`: no valid session, or the caller's account is gone.
/// - `422 Unprocessable Entity`: `TaskInput` validation failed.
pub async fn create_task(
    state: web::Data<AppState>,
    task_data: web::Json<TaskInput>,
    identity: Identity,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    // The owner must exist when the task is created.
    if state.store.find_user_by_id(identity.subject).await?.is_none() {
        return Err(AppError::Unauthorized("UnknownSubject".into()));
    }

    let task = Task::new(task_data.into_inner(), identity.subject);
    let created = state.store.create_task(task).await?;

    Ok(HttpResponse::Created().json(created))
}

/// Retrieves one task. Only reachable through `OwnershipGuard`.
///
/// ## Responses:
/// - `200 OK`: the `Task`.
/// - `404 Not Found`: no such task, or it belongs to someone else.
pub async fn get_task(task: OwnedTask) -> impl Responder {
    HttpResponse::Ok().json(task.into_inner())
}

/// Replaces title, description and due date of an owned task.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `404 Not Found`: no such task, or it belongs to someone else.
/// - `422 Unprocessable Entity`: `TaskInput` validation failed.
pub async fn update_task(
    state: web::Data<AppState>,
    task: OwnedTask,
    task_data: web::Json<TaskInput>,
    identity: Identity,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let task = task.into_inner();

    let updated = state
        .store
        .update_task(task.id, identity.subject, task_data.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes an owned task.
///
/// ## Responses:
/// - `204 No Content`: deleted.
/// - `404 Not Found`: no such task, or it belongs to someone else.
pub async fn delete_task(
    state: web::Data<AppState>,
    task: OwnedTask,
    identity: Identity,
) -> Result<impl Responder, AppError> {
    let task = task.into_inner();

    if !state.store.delete_task(task.id, identity.subject).await? {
        return Err(AppError::NotFound("Task not found".into()));
    }

    Ok(HttpResponse::NoContent().finish())
}
