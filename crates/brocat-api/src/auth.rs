use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Duration;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};

use brocat_db::Database;
use brocat_db::models::{NewUser, User};
use brocat_types::api::{ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::{ApiError, run_blocking};
use crate::middleware::{Claims, acting_user};
use crate::serialize::user_view;
use crate::storage::Storage;
use crate::validation::{UploadConfig, validate_login, validate_password_change, validate_registration};

/// Token lifetime for a plain login and for a fresh registration.
const SESSION_TTL_DAYS: i64 = 1;
/// Token lifetime when "remember me" is ticked.
const REMEMBER_TTL_DAYS: i64 = 30;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub jwt_secret: String,
    pub uploads: UploadConfig,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db_state = state.clone();
    let user = run_blocking(move || {
        validate_registration(&db_state.db, &req)??;

        // Hashes here; the plaintext goes no further
        let new_user = NewUser::new(req.email, req.username, &req.password)?;
        Ok(db_state.db.create_user(&new_user)?)
    })
    .await?;

    let token = create_token(&state.jwt_secret, &user, Duration::days(SESSION_TTL_DAYS))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: user_view(&user, Vec::new()),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_login(&req)?;

    let username = req.username.clone();
    let remember = req.remember;
    let db_state = state.clone();
    let authenticated =
        run_blocking(move || Ok(db_state.db.authenticate(&req.username, &req.password)?)).await?;

    let Some(user) = authenticated else {
        warn!("Failed login for {}", username);
        return Err(ApiError::Unauthorized);
    };

    let ttl_days = if remember { REMEMBER_TTL_DAYS } else { SESSION_TTL_DAYS };
    let token = create_token(&state.jwt_secret, &user, Duration::days(ttl_days))?;
    info!("User {} logged in", user.username);

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        token,
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    validate_password_change(&req)?;

    run_blocking(move || {
        let mut user = acting_user(&state.db, &claims)?;
        if !user.verify(&req.current_password) {
            warn!("Failed password change for {}", user.username);
            return Err(ApiError::Unauthorized);
        }

        user.set_password(&req.new_password)?;
        state.db.save_password(&user)?;
        Ok(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn create_token(secret: &str, user: &User, ttl: Duration) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
