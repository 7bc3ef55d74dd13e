use chrono::{Duration, Utc};
use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;

use crate::auth as tokens;
use crate::config::AppConfig;
use crate::domain::{User, UserRole};
use crate::error::{AppError, AppResult};
use crate::repository::{sms_codes, users};
use crate::schemas::{LoginInput, RegisterInput, SendSmsInput, VerifySmsInput};

pub const PURPOSE_REGISTER: &str = "register";
pub const PURPOSE_LOGIN: &str = "login";

#[derive(Debug, Serialize)]
pub struct LoginPayload {
    pub token: String,
    pub user_id: i64,
    pub phone: String,
    pub name: String,
    pub user_type: i16,
}

fn login_payload(config: &AppConfig, user: &User, role: UserRole) -> AppResult<LoginPayload> {
    let token = tokens::issue_token(
        &config.jwt_secret,
        config.jwt_ttl_seconds,
        user.id,
        &user.phone,
        role,
    )?;
    Ok(LoginPayload {
        token,
        user_id: user.id,
        phone: user.phone.clone(),
        name: user.name.clone(),
        user_type: role.code(),
    })
}

/// Issues a 6-digit code with a short TTL. Actual SMS dispatch is an
/// external concern; outside production the code lands in the log so
/// development flows work without a provider.
pub async fn send_sms_code(
    pool: &PgPool,
    config: &AppConfig,
    input: &SendSmsInput,
) -> AppResult<()> {
    let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
    let expires_at = Utc::now() + Duration::minutes(config.sms_code_ttl_minutes);
    sms_codes::upsert(pool, &input.phone, &input.purpose, &code, expires_at).await?;

    if config.is_production() {
        tracing::info!(phone = %input.phone, purpose = %input.purpose, "sms code issued");
    } else {
        tracing::info!(phone = %input.phone, purpose = %input.purpose, code = %code, "sms code issued");
    }
    Ok(())
}

pub async fn verify_sms_code(pool: &PgPool, input: &VerifySmsInput) -> AppResult<bool> {
    sms_codes::consume(pool, &input.phone, &input.purpose, &input.code).await
}

pub async fn register(
    pool: &PgPool,
    config: &AppConfig,
    input: &RegisterInput,
) -> AppResult<LoginPayload> {
    if input.password != input.confirm_password {
        return Err(AppError::InvalidInput(
            "the two passwords do not match".to_string(),
        ));
    }
    if !sms_codes::consume(pool, &input.phone, PURPOSE_REGISTER, &input.sms_code).await? {
        return Err(AppError::InvalidInput(
            "the verification code is wrong or expired".to_string(),
        ));
    }
    if users::find_by_phone(pool, &input.phone).await?.is_some() {
        return Err(AppError::Duplicate(
            "the phone number is already registered".to_string(),
        ));
    }

    let hash = tokens::hash_password(&input.password)?;
    let user = users::insert(
        pool,
        &input.phone,
        Some(&hash),
        &input.name,
        UserRole::Landlord,
    )
    .await?;
    users::touch_last_login(pool, user.id).await?;

    tracing::info!(user_id = user.id, phone = %user.phone, "landlord registered");
    login_payload(config, &user, UserRole::Landlord)
}

/// Landlords sign in with a password, tenants with an SMS code. A tenant
/// identity that does not exist yet is provisioned on first login, the
/// same find-or-create used when a landlord binds a tenant to a room.
pub async fn login(pool: &PgPool, config: &AppConfig, input: &LoginInput) -> AppResult<LoginPayload> {
    match (&input.password, &input.sms_code) {
        (Some(password), _) => login_landlord(pool, config, &input.phone, password).await,
        (None, Some(code)) => login_tenant(pool, config, &input.phone, code).await,
        (None, None) => Err(AppError::InvalidInput(
            "either a password or an sms code is required".to_string(),
        )),
    }
}

async fn login_landlord(
    pool: &PgPool,
    config: &AppConfig,
    phone: &str,
    password: &str,
) -> AppResult<LoginPayload> {
    let user = users::find_by_phone(pool, phone)
        .await?
        .ok_or_else(|| AppError::Unauthorized("wrong phone number or password".to_string()))?;
    if user.role() != Some(UserRole::Landlord) {
        return Err(AppError::Unauthorized(
            "wrong phone number or password".to_string(),
        ));
    }
    let stored_hash = user
        .password
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("wrong phone number or password".to_string()))?;
    if !tokens::verify_password(password, stored_hash) {
        return Err(AppError::Unauthorized(
            "wrong phone number or password".to_string(),
        ));
    }
    if !user.is_active() {
        return Err(AppError::Forbidden("the account is disabled".to_string()));
    }

    users::touch_last_login(pool, user.id).await?;
    tracing::info!(user_id = user.id, "landlord logged in");
    login_payload(config, &user, UserRole::Landlord)
}

async fn login_tenant(
    pool: &PgPool,
    config: &AppConfig,
    phone: &str,
    code: &str,
) -> AppResult<LoginPayload> {
    if !sms_codes::consume(pool, phone, PURPOSE_LOGIN, code).await? {
        return Err(AppError::Unauthorized(
            "the verification code is wrong or expired".to_string(),
        ));
    }

    let user = find_or_create_tenant(pool, phone, None).await?;
    if !user.is_active() {
        return Err(AppError::Forbidden("the account is disabled".to_string()));
    }

    users::touch_last_login(pool, user.id).await?;
    tracing::info!(user_id = user.id, "tenant logged in");
    login_payload(config, &user, UserRole::Tenant)
}

/// Tenant identities are keyed by phone. A phone already registered as a
/// landlord cannot double as a tenant.
pub async fn find_or_create_tenant(
    pool: &PgPool,
    phone: &str,
    name: Option<&str>,
) -> AppResult<User> {
    if let Some(existing) = users::find_by_phone(pool, phone).await? {
        return match existing.role() {
            Some(UserRole::Tenant) => Ok(existing),
            _ => Err(AppError::InvalidInput(
                "the phone number belongs to a landlord account".to_string(),
            )),
        };
    }
    let display_name = name.unwrap_or(phone);
    let user = users::insert(pool, phone, None, display_name, UserRole::Tenant).await?;
    tracing::info!(user_id = user.id, phone = %phone, "tenant identity provisioned");
    Ok(user)
}
