use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{normalize_email, validate_email, validate_password_len};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::TokenResponse;
use crate::schemas::user::{UserCreate, UserLogin, UserResponse};

/// Max attempts per window for auth endpoints (login/register).
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<UserCreate>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    validate_email(&payload.email)?;
    validate_password_len(&payload.password)?;
    let email = normalize_email(&payload.email);

    let rate_key = format!("rl:register:{email}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many registration attempts, try again later"));
    }

    // The configured teacher email is reserved; report it the same way as a
    // taken address.
    if email == state.settings().teacher().email {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let existing = repositories::users::exists_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;

    if existing.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();
    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            hashed_password,
            full_name: payload.full_name.as_deref(),
            role: UserRole::Student,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let response = TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    validate_email(&payload.email)?;
    let email = normalize_email(&payload.email);

    let rate_key = format!("rl:login:{email}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let teacher = state.settings().teacher();
    let user = if email == teacher.email && !teacher.password.is_empty() {
        if payload.password != teacher.password {
            return Err(ApiError::Unauthorized("Incorrect email or password"));
        }
        ensure_teacher_account(&state).await?
    } else {
        let user = repositories::users::find_by_email(state.db(), &email)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?
            .ok_or(ApiError::Unauthorized("Incorrect email or password"))?;

        let verified = security::verify_password(&payload.password, &user.hashed_password)
            .map_err(|_| ApiError::Unauthorized("Incorrect email or password"))?;

        if !verified {
            return Err(ApiError::Unauthorized("Incorrect email or password"));
        }

        user
    };

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    }))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

/// The teacher account is a singleton keyed by the configured email and
/// created lazily on the first successful login with the configured pair.
async fn ensure_teacher_account(state: &AppState) -> Result<User, ApiError> {
    let teacher = state.settings().teacher();

    let existing = repositories::users::find_by_email(state.db(), &teacher.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load teacher account"))?;

    if let Some(user) = existing {
        let matches = security::verify_password(&teacher.password, &user.hashed_password)
            .unwrap_or(false);
        if !matches {
            // Configured password rotated since the row was created.
            let hashed = security::hash_password(&teacher.password)
                .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;
            repositories::users::update_password(state.db(), &user.id, hashed, primitive_now_utc())
                .await
                .map_err(|e| ApiError::internal(e, "Failed to update teacher password"))?;
        }
        return Ok(user);
    }

    let hashed_password = security::hash_password(&teacher.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();
    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &teacher.email,
            hashed_password,
            full_name: Some("Teacher"),
            role: UserRole::Teacher,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create teacher account"))?;

    tracing::info!(email = %user.email, "Created teacher account on first login");
    Ok(user)
}

#[cfg(test)]
mod tests;
