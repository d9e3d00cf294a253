use crate::config::Config;
use crate::error::AppError;
use crate::models::Claims;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Serialize;

/// Authenticated employee, extracted from the bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub cpf: String,
    pub cracha: String,
    pub email: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => {
                return ready(Err(AppError::Unauthorized("Missing token".to_string())));
            }
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(AppError::Internal)),
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => {
                return ready(Err(AppError::Unauthorized("Invalid token".to_string())));
            }
        };

        ready(Ok(AuthUser {
            id: data.claims.sub,
            cpf: data.claims.cpf,
            cracha: data.claims.cracha,
            email: data.claims.email,
        }))
    }
}
