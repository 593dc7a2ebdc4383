//! Registration, login, and logout.
//!
//! These open and close the session that the comment gates check.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::Response,
    Form,
};

use super::{render, Page, PageContext, CAMPGROUNDS_PATH};
use crate::auth::{
    clear_session_cookie, generate_session_token, hash_password, hash_session_token,
    read_cookie, session_cookie, verify_password, DUMMY_PASSWORD_HASH, LOGIN_PATH,
    SESSION_COOKIE_NAME,
};
use crate::errors::{AppError, Redirected};
use crate::flash::Flash;
use crate::models::{CredentialsRequest, User};
use crate::AppState;

pub const REGISTER_PATH: &str = "/register";

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 8;

/// GET /register - Registration form.
pub async fn register_form(ctx: PageContext) -> Page<()> {
    render(ctx, "users/register", ())
}

/// POST /register - Create an account and log it in.
pub async fn register(
    State(state): State<AppState>,
    Form(request): Form<CredentialsRequest>,
) -> Result<Response, Redirected> {
    let username = request.username.trim();
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AppError::Validation(format!(
            "Username must be between {} and {} characters",
            MIN_USERNAME_LEN, MAX_USERNAME_LEN
        ))
        .redirect_to(REGISTER_PATH));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ))
        .redirect_to(REGISTER_PATH));
    }

    let password = request.password.clone();
    let password_hash = run_blocking(move || hash_password(&password))
        .await
        .and_then(|hashed| hashed)
        .map_err(|e| e.redirect_to(REGISTER_PATH))?;
    let user = state
        .repo
        .create_user(username, &password_hash)
        .await
        .map_err(|e| e.redirect_to(REGISTER_PATH))?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    let flash = Flash::success(format!("Welcome to YelpCamp {}", user.username));
    login_redirect(&state, &user, flash)
        .await
        .map_err(|e| e.redirect_to(LOGIN_PATH))
}

/// GET /login - Login form.
pub async fn login_form(ctx: PageContext) -> Page<()> {
    render(ctx, "users/login", ())
}

/// POST /login - Verify credentials and open a session.
pub async fn login(
    State(state): State<AppState>,
    Form(request): Form<CredentialsRequest>,
) -> Result<Response, Redirected> {
    let credentials = state
        .repo
        .get_user_by_username(request.username.trim())
        .await
        .map_err(|e| e.redirect_to(LOGIN_PATH))?;

    // Unknown usernames still pay for a full Argon2 verification.
    let (stored_hash, user) = match credentials {
        Some(stored) => (stored.password_hash, Some(stored.user)),
        None => (DUMMY_PASSWORD_HASH.to_string(), None),
    };
    let password = request.password.clone();
    let matched = run_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| e.redirect_to(LOGIN_PATH))?;
    let verified = user.filter(|_| matched);

    let user = match verified {
        Some(user) => user,
        None => {
            return Err(
                AppError::Unauthorized("Invalid username or password".to_string())
                    .redirect_to(LOGIN_PATH),
            )
        }
    };

    tracing::info!(user_id = %user.id, "User logged in");
    let flash = Flash::success(format!("Welcome back {}", user.username));
    login_redirect(&state, &user, flash)
        .await
        .map_err(|e| e.redirect_to(LOGIN_PATH))
}

/// GET /logout - Close the session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = read_cookie(&headers, SESSION_COOKIE_NAME) {
        if let Err(e) = state.repo.delete_session(&hash_session_token(&token)).await {
            tracing::error!("Failed to delete session: {}", e);
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response = Flash::success("Logged you out!").redirect(CAMPGROUNDS_PATH);
    response.headers_mut().append(
        SET_COOKIE,
        clear_session_cookie(state.config.secure_cookies),
    );
    response
}

/// Password hashing is CPU bound; keep it off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))
}

/// Open a session for `user` and redirect to the campground list.
async fn login_redirect(state: &AppState, user: &User, flash: Flash) -> Result<Response, AppError> {
    let token = generate_session_token()?;
    state
        .repo
        .create_session(
            &hash_session_token(&token),
            &user.id,
            state.config.session_ttl_hours,
        )
        .await?;

    let cookie = session_cookie(
        &token,
        state.config.session_ttl_hours,
        state.config.secure_cookies,
    )
    .ok_or_else(|| AppError::Internal("Session cookie is not a valid header".to_string()))?;

    let mut response = flash.redirect(CAMPGROUNDS_PATH);
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}
