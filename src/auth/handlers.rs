use crate::{
    api::user::UserResponse,
    auth::{
        auth::AuthUser,
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{AppError, FieldErrors},
    model::employee::Employee,
    models::LoginReqDto,
    utils::cpf::normalize_cpf,
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

/// Same body for every failed reset verification, so callers cannot probe
/// which of the three checks (paystub presence, birth date, mother's name)
/// failed.
const VERIFICATION_MISMATCH: &str = "Verification data mismatch or not found.";

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordDto {
    #[schema(example = "123.456.789-09")]
    pub cpf: String,
    /// YYYY-MM-DD
    #[schema(example = "1990-05-17")]
    pub data_nascimento: String,
    #[schema(example = "MARIA")]
    pub primeiro_nome_mae: String,
    pub new_password: String,
}

/// First word of a full name, trimmed and uppercased, the form the
/// verification comparison runs on.
fn first_name(full: &str) -> String {
    full.trim()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_uppercase()
}

fn format_date_ymd(dt: NaiveDateTime) -> String {
    dt.date().format("%Y-%m-%d").to_string()
}

/// Birth date and mother's first name must both match the paystub record.
fn verification_matches(
    paystub_nasc: NaiveDateTime,
    paystub_mae: &str,
    input_nasc: NaiveDate,
    input_mae: &str,
) -> bool {
    format_date_ymd(paystub_nasc) == input_nasc.format("%Y-%m-%d").to_string()
        && first_name(paystub_mae) == first_name(input_mae)
}

async fn fetch_employee_by_cpf(pool: &PgPool, cpf: &str) -> Result<Option<Employee>, AppError> {
    let employee = sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, cpf, cracha, email, password, created_at, updated_at
        FROM employes
        WHERE cpf = $1
        "#,
    )
    .bind(cpf)
    .fetch_optional(pool)
    .await?;

    Ok(employee)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token + employee account (sans password)"),
        (status = 400, description = "Malformed CPF or empty password"),
        (status = 401, description = "Unknown CPF or wrong password")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, body))]
pub async fn login(
    body: web::Json<LoginReqDto>,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    let mut errors = FieldErrors::new();
    let cpf = match normalize_cpf(&body.cpf) {
        Some(c) => c,
        None => {
            errors.push("cpf", "Invalid CPF format.");
            String::new()
        }
    };
    if body.password.is_empty() {
        errors.push("password", "Password is required.");
    }
    errors.finish()?;

    debug!("Fetching employee account");

    let employee = match fetch_employee_by_cpf(pool.get_ref(), &cpf).await? {
        Some(e) => e,
        None => {
            warn!(%cpf, "Login attempt failed: account not found");
            return Err(AppError::Unauthorized("Invalid CPF or password.".into()));
        }
    };

    if verify_password(&body.password, &employee.password).is_err() {
        warn!(%cpf, "Login attempt failed: password mismatch");
        return Err(AppError::Unauthorized("Invalid CPF or password.".into()));
    }

    debug!("Password verified, issuing token");

    let token = generate_access_token(
        &employee.id,
        &employee.cpf,
        &employee.cracha,
        employee.email.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    info!("Login successful");

    Ok(HttpResponse::Ok().json(json!({
        "user": UserResponse::from(employee),
        "token": token,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Decoded token claims"),
        (status = 401)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "user": auth }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    responses(
        (status = 200, description = "Employee profile loaded from the database"),
        (status = 401),
        (status = 404, description = "Account no longer exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn profile(
    auth: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let profile = sqlx::query_as::<_, UserResponse>(
        r#"
        SELECT id, cpf, cracha, email, created_at, updated_at
        FROM employes
        WHERE id = $1
        "#,
    )
    .bind(&auth.id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({ "profile": profile })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordDto,
    responses(
        (status = 204, description = "Password updated"),
        (status = 400, description = "Validation failed or verification mismatch"),
        (status = 404, description = "No account for the provided CPF")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_reset_password", skip(pool, body))]
pub async fn reset_password(
    body: web::Json<ResetPasswordDto>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let mut errors = FieldErrors::new();

    let cpf = match normalize_cpf(&body.cpf) {
        Some(c) => c,
        None => {
            errors.push("cpf", "Invalid CPF format.");
            String::new()
        }
    };
    let data_nascimento = match NaiveDate::parse_from_str(&body.data_nascimento, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            errors.push("dataNascimento", "Date of birth must be in YYYY-MM-DD format.");
            None
        }
    };
    if body.primeiro_nome_mae.trim().len() < 2 {
        errors.push(
            "primeiroNomeMae",
            "Mother's first name must be at least 2 characters long.",
        );
    }
    if body.new_password.len() < 6 {
        errors.push(
            "newPassword",
            "New password must be at least 6 characters long.",
        );
    }
    errors.finish()?;
    let data_nascimento = data_nascimento.ok_or(AppError::Internal)?;

    let employee = fetch_employee_by_cpf(pool.get_ref(), &cpf)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found for the provided CPF.".to_string()))?;

    // Any paystub row works: data_nasc / nome_mae repeat across the table.
    let record = sqlx::query_as::<_, (NaiveDateTime, Option<String>)>(
        r#"
        SELECT data_nasc, nome_mae
        FROM paystubs
        WHERE cpf = $1
        LIMIT 1
        "#,
    )
    .bind(&cpf)
    .fetch_optional(pool.get_ref())
    .await?;

    let (data_nasc, nome_mae) = match record {
        Some(r) => r,
        None => {
            warn!(%cpf, "Password reset: no paystub record for CPF");
            return Err(AppError::BadRequest(VERIFICATION_MISMATCH.to_string()));
        }
    };

    let nome_mae = match nome_mae {
        Some(n) if !n.trim().is_empty() => n,
        _ => {
            warn!(%cpf, "Password reset: paystub record has no mother's name");
            return Err(AppError::BadRequest(VERIFICATION_MISMATCH.to_string()));
        }
    };

    if !verification_matches(data_nasc, &nome_mae, data_nascimento, &body.primeiro_nome_mae) {
        debug!(%cpf, "Password reset: verification data mismatch");
        return Err(AppError::BadRequest(VERIFICATION_MISMATCH.to_string()));
    }

    let hashed = hash_password(&body.new_password);

    sqlx::query("UPDATE employes SET password = $1, updated_at = NOW() WHERE id = $2")
        .bind(&hashed)
        .bind(&employee.id)
        .execute(pool.get_ref())
        .await?;

    info!(%cpf, "Password reset successful");

    Ok(HttpResponse::NoContent().finish())
}
