use crate::{
    data_access,
    error::{ApiError, ApiResult},
    models::Claims,
    utils::{check_password_strength, is_valid_email},
    AppState,
};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use log::{info, warn};
use rocket::{
    http::Status,
    post,
    request::{FromRequest, Outcome, Request},
    serde::json::Json,
    State,
};
use serde::{Deserialize, Serialize};

const TOKEN_TTL_SECS: i64 = 60 * 60 * 24 * 30;

#[derive(Deserialize)]
pub struct RegisterInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub token: String,
}

#[post("/register", data = "<input>")]
pub async fn register(state: &State<AppState>, input: Json<RegisterInput>) -> ApiResult<TokenResponse> {
    let (Some(email), Some(password)) = (input.email.as_deref(), input.password.as_deref()) else {
        return Err(ApiError::bad_request("Missing email or password"));
    };
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!("Rejected sign-up with malformed email");
        return Err(ApiError::bad_request("Invalid input format."));
    }
    check_password_strength(password).map_err(ApiError::bad_request)?;

    if data_access::get_user_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::conflict("Email already exists."));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let user = data_access::create_user(&state.db, &email, name, &password_hash)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::conflict("Email already exists.")
            }
            other => other.into(),
        })?;
    info!("Registered user {}", user.id);

    let token = generate_token(&user.id, &state.config.jwt_secret)?;
    Ok(Json(TokenResponse { token }))
}

#[post("/login", data = "<input>")]
pub async fn login(state: &State<AppState>, input: Json<LoginInput>) -> ApiResult<TokenResponse> {
    let (Some(email), Some(password)) = (input.email.as_deref(), input.password.as_deref()) else {
        return Err(ApiError::bad_request("Missing email or password"));
    };

    let user = data_access::get_user_by_email(&state.db, email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let parsed = PasswordHash::new(&user.password_hash)?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_err()
    {
        warn!("Failed login for user {}", user.id);
        return Err(ApiError::Unauthorized);
    }

    let token = generate_token(&user.id, &state.config.jwt_secret)?;
    Ok(Json(TokenResponse { token }))
}

pub fn generate_token(user_id: &str, secret: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id.to_owned(),
        exp: (chrono::Utc::now().timestamp() + TOKEN_TTL_SECS) as usize,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn verify_token(token: &str, secret: &str) -> Option<String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|TokenData { claims, .. }| claims.sub)
}

/// The caller's user id, taken from a `Bearer` token.
pub struct AuthUser(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(state) = req.rocket().state::<AppState>() else {
            return Outcome::Error((
                Status::InternalServerError,
                ApiError::Internal("application state missing".into()),
            ));
        };
        let user_id = req
            .headers()
            .get_one("Authorization")
            .and_then(|auth| auth.strip_prefix("Bearer "))
            .and_then(|token| verify_token(token.trim(), &state.config.jwt_secret));
        match user_id {
            Some(id) => Outcome::Success(AuthUser(id)),
            None => Outcome::Error((Status::Unauthorized, ApiError::Unauthorized)),
        }
    }
}
