use crate::{
    api::{employee, me, punch},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use tracing::warn;

// Helper to build per-route limiter. `None` if the quota cannot be built.
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

/// Auth + protected routes with per-IP rate limiting.
pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    configure_auth(cfg, config.rate_login_per_min);
    configure_api(cfg, &config.api_prefix, config.rate_protected_per_min);
}

fn configure_auth(cfg: &mut web::ServiceConfig, rate_per_min: u32) {
    let login = web::resource("/login").route(web::post().to(handlers::login));
    let refresh = web::resource("/refresh").route(web::post().to(handlers::refresh_token));

    match (build_limiter(rate_per_min), build_limiter(rate_per_min)) {
        (Some(login_limiter), Some(refresh_limiter)) => cfg.service(
            web::scope("/auth")
                .service(login.wrap(login_limiter))
                .service(refresh.wrap(refresh_limiter)),
        ),
        _ => {
            warn!(rate_per_min, "Login rate limiter disabled");
            cfg.service(web::scope("/auth").service(login).service(refresh))
        }
    };
}

fn protected_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/me").route(web::get().to(me::me)))
        .service(
            web::scope("/employees")
                // /employees
                .service(
                    web::resource("")
                        .route(web::post().to(employee::create_employee))
                        .route(web::get().to(employee::list_employees)),
                )
                // /employees/{matricula}
                .service(
                    web::resource("/{matricula}")
                        .route(web::get().to(employee::get_employee))
                        .route(web::put().to(employee::update_employee))
                        .route(web::delete().to(employee::delete_employee)),
                ),
        )
        .service(
            web::scope("/punches")
                // /punches
                .service(
                    web::resource("")
                        .route(web::post().to(punch::record_punch))
                        .route(web::get().to(punch::day_punches)),
                )
                // fixed segments before /{id}
                .service(web::resource("/next").route(web::get().to(punch::next_punch)))
                .service(web::resource("/period").route(web::get().to(punch::period_punches)))
                // /punches/{id}
                .service(
                    web::resource("/{id}")
                        .route(web::put().to(punch::amend_punch))
                        .route(web::delete().to(punch::delete_punch)),
                ),
        );
}

fn configure_api(cfg: &mut web::ServiceConfig, prefix: &str, rate_per_min: u32) {
    let scope = web::scope(prefix)
        .configure(protected_routes)
        .wrap(from_fn(auth_middleware));

    match build_limiter(rate_per_min) {
        Some(limiter) => cfg.service(scope.wrap(limiter)),
        None => {
            warn!(rate_per_min, "Protected rate limiter disabled");
            cfg.service(scope)
        }
    };
}

// Token flow:
// POST /auth/login {email, document} issues an access and a refresh token.
// Every call under the API prefix sends the access token as a bearer; the
// middleware re-reads the employee so role changes apply immediately.
// POST /auth/refresh with the refresh token issues a fresh pair.
