use crate::{
    api::{employee, leave, schedule},
    auth::{handlers, middleware::admin_guard},
    config::Config,
};
use actix_governor::{
    governor::middleware::NoOpMiddleware, Governor, GovernorConfigBuilder, PeerIpKeyExtractor,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
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

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let admin_limiter = Arc::new(build_limiter(config.rate_admin_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    cfg.service(
        web::scope(&config.api_prefix)
            // Public reads + leave submission
            .service(web::resource("/employees").route(web::get().to(employee::list_employees)))
            .service(web::resource("/leaves").route(web::get().to(leave::get_leaves)))
            .service(
                web::resource("/replacements").route(web::get().to(schedule::get_replacements)),
            )
            .service(web::resource("/schedule").route(web::get().to(schedule::leave_schedule)))
            .service(web::resource("/leave/request").route(web::post().to(leave::request_leave)))
            // Admin-gated mutations
            .service(
                web::scope("/admin")
                    .wrap(from_fn(admin_guard))
                    .wrap(admin_limiter)
                    .service(
                        web::resource("/employees")
                            .route(web::post().to(employee::create_employee)),
                    )
                    .service(
                        web::resource("/employees/{id}")
                            .route(web::put().to(employee::rename_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(
                        web::resource("/leaves/{id}")
                            .route(web::put().to(leave::edit_leave))
                            .route(web::delete().to(leave::delete_leave)),
                    ),
            ),
    );
}
