use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "123.456.789-09")]
    pub cpf: String,
    pub password: String,
}

/// JWT payload. `sub` carries the employee account id; the CPF is what the
/// paystub endpoints scope their queries by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub cpf: String,
    pub cracha: String,
    pub email: Option<String>,
    pub exp: usize,
    pub jti: String,
}
