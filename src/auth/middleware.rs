use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

fn reject(req: ServiceRequest, message: &str) -> Result<ServiceResponse<BoxBody>, Error> {
    let resp = AppError::Unauthorized(message.to_string()).error_response();
    Ok(req.into_response(resp.map_into_boxed_body()))
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or(AppError::Internal)?
        .clone();

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_string(),
            Err(_) => return reject(req, "Invalid Authorization header encoding"),
        },
        None => return reject(req, "Missing Authorization header"),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return reject(req, "Authorization header must start with Bearer"),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return reject(req, "Invalid or expired token"),
    };

    let auth_user = AuthUser {
        id: claims.sub,
        cpf: claims.cpf,
        cracha: claims.cracha,
        email: claims.email,
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, middleware::from_fn, test as atest, web};

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            server_addr: String::new(),
            access_token_ttl: 3600,
            app_env: "development".to_string(),
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_reset_per_min: 30,
            rate_protected_per_min: 1000,
            cors_allowed_origins: vec![],
            api_prefix: "/api/v1".to_string(),
        }
    }

    #[actix_web::test]
    async fn missing_header_gets_the_json_envelope() {
        let app = atest::init_service(
            App::new().app_data(Data::new(test_config())).service(
                web::resource("/guarded")
                    .wrap(from_fn(auth_middleware))
                    .route(web::get().to(|| async { HttpResponse::Ok().finish() })),
            ),
        )
        .await;

        let req = atest::TestRequest::get().uri("/guarded").to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = atest::read_body_json(resp).await;
        assert_eq!(body["statusCode"], 401);
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["message"], "Missing Authorization header");
    }

    #[actix_web::test]
    async fn bad_scheme_gets_the_json_envelope() {
        let app = atest::init_service(
            App::new().app_data(Data::new(test_config())).service(
                web::resource("/guarded")
                    .wrap(from_fn(auth_middleware))
                    .route(web::get().to(|| async { HttpResponse::Ok().finish() })),
            ),
        )
        .await;

        let req = atest::TestRequest::get()
            .uri("/guarded")
            .insert_header(("Authorization", "Basic abc"))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = atest::read_body_json(resp).await;
        assert_eq!(body["message"], "Authorization header must start with Bearer");
    }
}
