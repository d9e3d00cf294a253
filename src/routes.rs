use crate::{
    api::{paystub, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Per-route limiter keyed on peer IP.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let reset_limiter = Arc::new(build_limiter(config.rate_reset_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/auth")
                    // public
                    .service(
                        web::resource("/login")
                            .wrap(login_limiter.clone())
                            .route(web::post().to(handlers::login)),
                    )
                    .service(
                        web::resource("/reset-password")
                            .wrap(reset_limiter)
                            .route(web::post().to(handlers::reset_password)),
                    )
                    // bearer token required (AuthUser extractor)
                    .service(
                        web::resource("/me")
                            .wrap(protected_limiter.clone())
                            .route(web::get().to(handlers::me)),
                    )
                    .service(
                        web::resource("/profile")
                            .wrap(protected_limiter.clone())
                            .route(web::get().to(handlers::profile)),
                    ),
            )
            .service(
                web::scope("/users")
                    // POST is open registration; the remaining handlers
                    // require a token through the AuthUser extractor
                    .service(
                        web::resource("")
                            .wrap(register_limiter)
                            .route(web::post().to(user::create_user))
                            .route(web::get().to(user::list_users)),
                    )
                    .service(
                        web::resource("/{id}")
                            .wrap(protected_limiter.clone())
                            .route(web::get().to(user::get_user))
                            .route(web::put().to(user::update_user))
                            .route(web::delete().to(user::delete_user)),
                    ),
            )
            .service(
                web::scope("/paystubs")
                    .wrap(from_fn(auth_middleware)) // authentication
                    .wrap(protected_limiter) // rate limiting
                    .service(web::resource("").route(web::get().to(paystub::list_summaries)))
                    .service(
                        web::resource("/details").route(web::get().to(paystub::get_details)),
                    )
                    .service(
                        web::resource("/event/{id}").route(web::get().to(paystub::get_event)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test as atest};
    use std::net::SocketAddr;

    #[actix_web::test]
    async fn limiter_returns_429_once_burst_is_spent() {
        let app = atest::init_service(
            App::new().service(
                web::resource("/ping")
                    .wrap(Arc::new(build_limiter(1)))
                    .route(web::get().to(|| async { HttpResponse::Ok().finish() })),
            ),
        )
        .await;

        let peer: SocketAddr = "10.0.0.1:40000".parse().unwrap();

        let first = atest::TestRequest::get()
            .uri("/ping")
            .peer_addr(peer)
            .to_request();
        assert_eq!(atest::call_service(&app, first).await.status(), StatusCode::OK);

        let second = atest::TestRequest::get()
            .uri("/ping")
            .peer_addr(peer)
            .to_request();
        assert_eq!(
            atest::call_service(&app, second).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
