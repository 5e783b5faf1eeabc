use actix_web::cookie::Cookie;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{AppError, AuthError};
use crate::AppState;

pub const SESSION_COOKIE: &str = "session_id";

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestForm {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordForm {
    pub email: Option<String>,
    pub reset_token: Option<String>,
    pub new_password: Option<String>,
}

fn required(value: &Option<String>, name: &str) -> Result<String, AppError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::ValidationError(format!("{} is required", name))),
    }
}

fn session_cookie(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE).map(|c| c.value().to_string())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/users", web::post().to(register))
        .route("/sessions", web::post().to(login))
        .route("/sessions", web::delete().to(logout))
        .route("/profile", web::get().to(profile))
        .route("/reset_password", web::post().to(reset_password_token))
        .route("/reset_password", web::put().to(update_password));
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Bienvenue" }))
}

pub async fn register(
    form: web::Form<CredentialsForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let email = required(&form.email, "email")?;
    let password = required(&form.password, "password")?;
    info!("Received registration request for email: {}", email);

    match state.auth_service.register(&email, &password).await {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "email": email,
            "message": "user created"
        }))),
        Err(AppError::AuthError(AuthError::AlreadyExists(_))) => {
            Ok(HttpResponse::BadRequest().json(json!({
                "message": "email already registered"
            })))
        }
        Err(e) => Err(e),
    }
}

pub async fn login(
    form: web::Form<CredentialsForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let email = required(&form.email, "email")?;
    let password = required(&form.password, "password")?;

    if !state.auth_service.valid_login(&email, &password).await? {
        warn!("Login failed for email: {}", email);
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state
        .auth_service
        .create_session(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    info!("Login successful for email: {}", email);
    let cookie = Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .finish();

    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "email": email,
        "message": "logged in"
    })))
}

pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = session_cookie(&req).unwrap_or_default();
    let user = state
        .auth_service
        .get_user_by_session(&token)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    state.auth_service.destroy_session(user.id).await?;

    let mut removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    removal.make_removal();

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, "/"))
        .cookie(removal)
        .finish())
}

pub async fn profile(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = session_cookie(&req).unwrap_or_default();
    let user = state
        .auth_service
        .get_user_by_session(&token)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    Ok(HttpResponse::Ok().json(json!({ "email": user.email })))
}

pub async fn reset_password_token(
    form: web::Form<ResetRequestForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let email = required(&form.email, "email")?;
    let reset_token = state.auth_service.get_reset_token(&email).await?;

    Ok(HttpResponse::Ok().json(json!({
        "email": email,
        "reset_token": reset_token
    })))
}

pub async fn update_password(
    form: web::Form<UpdatePasswordForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let email = required(&form.email, "email")?;
    let reset_token = required(&form.reset_token, "reset_token")?;
    let new_password = required(&form.new_password, "new_password")?;

    let owner = state
        .auth_service
        .get_user_by_reset_token(&reset_token)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    if owner.email != email {
        warn!("Reset token presented for a different email: {}", email);
        return Err(AuthError::InvalidToken.into());
    }

    state
        .auth_service
        .update_password(&reset_token, &new_password)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "email": email,
        "message": "Password updated"
    })))
}
