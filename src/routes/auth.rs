use crate::{
    auth::{AuthResponse, Identity, LoginRequest, RegisterRequest},
    error::AppError,
    models::User,
    state::AppState,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use validator::Validate;

fn session_response(
    mut builder: actix_web::HttpResponseBuilder,
    state: &AppState,
    user: &User,
) -> Result<HttpResponse, AppError> {
    let token = state.issue_session(user.id)?;
    Ok(builder
        .cookie(state.session_cookie(token.clone()))
        .json(AuthResponse {
            token,
            user_id: user.id,
        }))
}

/// Register a new user
///
/// Creates a new user account, stores the bcrypt hash of the password and starts
/// a session (cookie plus token in the body).
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let RegisterRequest { username, password } = register_data.into_inner();

    if state.store.find_user_by_username(&username).await?.is_some() {
        return Err(AppError::BadRequest("Username already taken".into()));
    }

    let password_hash = state.hasher.hash_blocking(password).await?;
    let user = state
        .store
        .create_user(User::new(username, password_hash))
        .await?;

    log::info!("Registered user {}", user.id);
    session_response(HttpResponse::Created(), &state, &user)
}

/// Login user
///
/// Unknown usernames and wrong passwords get the same answer.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;
    let LoginRequest { username, password } = login_data.into_inner();

    let Some(user) = state.store.find_user_by_username(&username).await? else {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !state
        .hasher
        .verify_blocking(password, user.password_hash.clone())
        .await?
    {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    session_response(HttpResponse::Ok(), &state, &user)
}

/// Logout
///
/// Tokens are stateless, so this only tells the browser to drop the cookie.
/// A copy of the token held elsewhere stays valid until it expires.
#[post("/logout")]
pub async fn logout(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok()
        .cookie(state.removal_cookie())
        .json(serde_json::json!({ "status": "logged_out" }))
}

/// Current user
#[get("/profile")]
pub async fn profile(
    state: web::Data<AppState>,
    identity: Identity,
) -> Result<impl Responder, AppError> {
    let user = state
        .store
        .find_user_by_id(identity.subject)
        .await?
        .ok_or_else(|| AppError::Unauthorized("UnknownSubject".into()))?;

    Ok(HttpResponse::Ok().json(user))
}
