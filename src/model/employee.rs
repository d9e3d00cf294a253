use chrono::NaiveDateTime;

/// Row of the `employes` table: the login account for one employee.
/// Carries the password hash, so it is deliberately not Serialize;
/// responses go through `api::user::UserResponse` instead.
#[derive(Debug, sqlx::FromRow)]
pub struct Employee {
    pub id: String,
    pub cpf: String,
    pub cracha: String,
    pub email: Option<String>,
    pub password: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}
