use crate::{
    auth::{auth::AuthUser, password::hash_password},
    error::{AppError, FieldErrors},
    model::employee::Employee,
    utils::{
        cpf::normalize_cpf,
        cpf_cache, cpf_filter,
        db_utils::{build_update_sql, execute_update},
    },
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sqlx::PgPool;
use tracing::{error, info, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateUserDto {
    #[schema(example = "123.456.789-09")]
    pub cpf: String,
    /// Badge number
    #[schema(example = "9001")]
    pub cracha: String,
    #[schema(example = "joao@empresa.com.br", nullable = true)]
    pub email: Option<String>,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUserDto {
    pub email: Option<String>,
    pub cracha: Option<String>,
    pub password: Option<String>,
}

/// Employee account as exposed over the API: never carries the password.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub cpf: String,
    pub cracha: String,
    pub email: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub updated_at: Option<NaiveDateTime>,
}

impl From<Employee> for UserResponse {
    fn from(e: Employee) -> Self {
        Self {
            id: e.id,
            cpf: e.cpf,
            cracha: e.cracha,
            email: e.email,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

fn is_plausible_email(s: &str) -> bool {
    let s = s.trim();
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

#[derive(Debug)]
struct NormalizedCreate {
    cpf: String,
    cracha: String,
    email: Option<String>,
    password: String,
}

fn validate_create(dto: &CreateUserDto) -> Result<NormalizedCreate, AppError> {
    let mut errors = FieldErrors::new();

    let cpf = match normalize_cpf(&dto.cpf) {
        Some(c) => c,
        None => {
            errors.push("cpf", "Invalid CPF format.");
            String::new()
        }
    };
    if dto.cracha.trim().is_empty() {
        errors.push("cracha", "Crachá is required.");
    }
    let email = match dto.email.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(e) if is_plausible_email(e) => Some(e.to_string()),
        Some(_) => {
            errors.push("email", "Invalid email address.");
            None
        }
    };
    if dto.password.len() < 6 {
        errors.push("password", "Password must be at least 6 characters long.");
    }
    errors.finish()?;

    Ok(NormalizedCreate {
        cpf,
        cracha: dto.cracha.trim().to_string(),
        email,
        password: dto.password.clone(),
    })
}

/// true  => CPF has no account yet
/// false => CPF already registered
pub async fn is_cpf_available(cpf: &str, pool: &PgPool) -> bool {
    // 1. Cuckoo filter — fast negative (no false negatives)
    if !cpf_filter::might_exist(cpf) {
        return true;
    }

    // 2. Moka cache — fast positive
    if cpf_cache::is_taken(cpf).await {
        return false;
    }

    // 3. Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employes WHERE cpf = $1 LIMIT 1)",
    )
    .bind(cpf)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "CPF absent from payroll records"),
        (status = 409, description = "CPF, crachá or email already in use")
    ),
    tag = "Users"
)]
pub async fn create_user(
    pool: web::Data<PgPool>,
    payload: web::Json<CreateUserDto>,
) -> Result<HttpResponse, AppError> {
    let data = validate_create(&payload)?;

    // Registration is only open to people who actually appear in payroll.
    let known_employee = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM paystubs WHERE cpf = $1 LIMIT 1)",
    )
    .bind(&data.cpf)
    .fetch_one(pool.get_ref())
    .await?;

    if !known_employee {
        warn!(cpf = %data.cpf, "Registration rejected: CPF not in payroll records");
        return Err(AppError::Forbidden(
            "CPF not found in payroll records.".to_string(),
        ));
    }

    if !is_cpf_available(&data.cpf, pool.get_ref()).await {
        return Err(AppError::Conflict("CPF already in use.".to_string()));
    }

    let cracha_taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employes WHERE cracha = $1 LIMIT 1)",
    )
    .bind(&data.cracha)
    .fetch_one(pool.get_ref())
    .await?;
    if cracha_taken {
        return Err(AppError::Conflict("Crachá already in use.".to_string()));
    }

    if let Some(email) = &data.email {
        let email_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM employes WHERE email = $1 LIMIT 1)",
        )
        .bind(email)
        .fetch_one(pool.get_ref())
        .await?;
        if email_taken {
            return Err(AppError::Conflict(
                "Email address already in use.".to_string(),
            ));
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    let hashed = hash_password(&data.password);

    // Unique indexes still back us up if two registrations race past the
    // pre-checks: 23505 maps to 409.
    let created = sqlx::query_as::<_, UserResponse>(
        r#"
        INSERT INTO employes (id, cpf, cracha, email, password, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
        RETURNING id, cpf, cracha, email, created_at, updated_at
        "#,
    )
    .bind(&id)
    .bind(&data.cpf)
    .bind(&data.cracha)
    .bind(&data.email)
    .bind(&hashed)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| AppError::from_db_write(e, "CPF, crachá or email already in use."))?;

    // Keep the availability fast path in sync
    cpf_filter::insert(&data.cpf);
    cpf_cache::mark_taken(&data.cpf).await;

    info!(cpf = %data.cpf, "Account registered");

    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "All accounts, sans password", body = [UserResponse]),
        (status = 401)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    _auth: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let users = sqlx::query_as::<_, UserResponse>(
        r#"
        SELECT id, cpf, cracha, email, created_at, updated_at
        FROM employes
        ORDER BY created_at DESC NULLS LAST
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id", description = "Account id")),
    responses(
        (status = 200, body = UserResponse),
        (status = 401),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    _auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let user = sqlx::query_as::<_, UserResponse>(
        r#"
        SELECT id, cpf, cracha, email, created_at, updated_at
        FROM employes
        WHERE id = $1
        "#,
    )
    .bind(&id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id", description = "Account id")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, body = UserResponse),
        (status = 401),
        (status = 404),
        (status = 409, description = "Email or crachá already used by another account")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    _auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    body: web::Json<UpdateUserDto>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let current = sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, cpf, cracha, email, password, created_at, updated_at
        FROM employes
        WHERE id = $1
        "#,
    )
    .bind(&id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("User not found for update.".to_string()))?;

    let mut errors = FieldErrors::new();
    if let Some(email) = body.email.as_deref() {
        if !is_plausible_email(email) {
            errors.push("email", "Invalid email address.");
        }
    }
    if let Some(cracha) = body.cracha.as_deref() {
        if cracha.trim().is_empty() {
            errors.push("cracha", "Crachá must not be empty.");
        }
    }
    if let Some(password) = body.password.as_deref() {
        if password.len() < 6 {
            errors.push("password", "Password must be at least 6 characters long.");
        }
    }
    errors.finish()?;

    // Uniqueness re-checks against OTHER rows
    if let Some(email) = body.email.as_deref() {
        if Some(email) != current.email.as_deref() {
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM employes WHERE email = $1 AND id <> $2 LIMIT 1)",
            )
            .bind(email)
            .bind(&id)
            .fetch_one(pool.get_ref())
            .await?;
            if taken {
                return Err(AppError::Conflict(
                    "New email address already in use by another user.".to_string(),
                ));
            }
        }
    }
    if let Some(cracha) = body.cracha.as_deref() {
        if cracha != current.cracha {
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM employes WHERE cracha = $1 AND id <> $2 LIMIT 1)",
            )
            .bind(cracha)
            .bind(&id)
            .fetch_one(pool.get_ref())
            .await?;
            if taken {
                return Err(AppError::Conflict(
                    "Crachá already in use by another user.".to_string(),
                ));
            }
        }
    }

    // Only the provided fields make it into the UPDATE
    let mut fields = Map::new();
    if let Some(email) = &body.email {
        fields.insert("email".to_string(), json!(email.trim()));
    }
    if let Some(cracha) = &body.cracha {
        fields.insert("cracha".to_string(), json!(cracha.trim()));
    }
    if let Some(password) = &body.password {
        fields.insert("password".to_string(), json!(hash_password(password)));
    }

    let update = build_update_sql("employes", &Value::Object(fields), "id", &id)
        .map_err(|_| AppError::BadRequest("No fields provided for update".to_string()))?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| AppError::from_db_write(e, "Email or crachá already in use."))?;

    if affected == 0 {
        return Err(AppError::NotFound("User not found for update.".to_string()));
    }

    let updated = sqlx::query_as::<_, UserResponse>(
        r#"
        SELECT id, cpf, cracha, email, created_at, updated_at
        FROM employes
        WHERE id = $1
        "#,
    )
    .bind(&id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id", description = "Account id")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    _auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let deleted_cpf =
        sqlx::query_scalar::<_, String>("DELETE FROM employes WHERE id = $1 RETURNING cpf")
            .bind(&id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, %id, "Failed to delete account");
                AppError::Internal
            })?;

    match deleted_cpf {
        Some(cpf) => {
            cpf_filter::remove(&cpf);
            cpf_cache::unmark(&cpf).await;
            Ok(HttpResponse::NoContent().finish())
        }
        None => Err(AppError::NotFound(
            "User not found or could not be deleted".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(cpf: &str, cracha: &str, email: Option<&str>, password: &str) -> CreateUserDto {
        CreateUserDto {
            cpf: cpf.to_string(),
            cracha: cracha.to_string(),
            email: email.map(str::to_string),
            password: password.to_string(),
        }
    }

    #[test]
    fn create_validation_normalizes_cpf_and_email() {
        let ok = validate_create(&dto(
            "123.456.789-09",
            " 9001 ",
            Some(" joao@empresa.com.br "),
            "secret1",
        ))
        .unwrap();
        assert_eq!(ok.cpf, "12345678909");
        assert_eq!(ok.cracha, "9001");
        assert_eq!(ok.email.as_deref(), Some("joao@empresa.com.br"));
    }

    #[test]
    fn create_validation_collects_all_field_errors() {
        let err = validate_create(&dto("12", "", Some("nope"), "abc")).unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert!(fields.contains_key("cpf"));
                assert!(fields.contains_key("cracha"));
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("password"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_email_becomes_none() {
        let ok = validate_create(&dto("12345678909", "9001", Some(""), "secret1")).unwrap();
        assert_eq!(ok.email, None);

        let ok = validate_create(&dto("12345678909", "9001", None, "secret1")).unwrap();
        assert_eq!(ok.email, None);
    }

    #[test]
    fn plausible_email_check() {
        assert!(is_plausible_email("a@b.com"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.com"));
        assert!(!is_plausible_email("sem-arroba"));
    }
}
