pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

use crate::auth::{OwnershipGuard, SessionGuard};

/// Routes under `/api`. The whole scope sits behind `SessionGuard`; task item
/// routes additionally sit behind `OwnershipGuard`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::register)
            .service(auth::logout)
            .service(auth::profile),
    )
    .service(
        web::scope("/tasks")
            .service(
                web::resource("")
                    .route(web::get().to(tasks::get_tasks))
                    .route(web::post().to(tasks::create_task)),
            )
            .service(
                web::resource("/{id}")
                    .wrap(OwnershipGuard)
                    .route(web::get().to(tasks::get_task))
                    .route(web::put().to(tasks::update_task))
                    .route(web::delete().to(tasks::delete_task)),
            ),
    )
    .service(
        web::scope("/users")
            .service(users::get_users)
            .service(users::get_user)
            .service(users::update_user)
            .service(users::delete_user),
    );
}

/// Mounts the health check and the guarded `/api` scope.
pub fn app(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(web::scope("/api").wrap(SessionGuard).configure(config));
}
