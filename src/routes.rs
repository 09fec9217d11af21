use crate::{
    api::{employee, hike_letter, offer_letter, payslip, relieving_letter},
    auth::{handlers, middleware::session_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond((60_000 / requests_per_min as u64).max(1))
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(session_middleware))
            .wrap(protected_limiter)
            .service(web::resource("/dashboard").route(web::get().to(handlers::dashboard)))
            .service(web::resource("/users").route(web::post().to(handlers::create_user)))
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // static paths go before /{id}
                    .service(
                        web::resource("/check-unique").route(web::get().to(employee::check_unique)),
                    )
                    .service(
                        web::resource("/export").route(web::get().to(employee::export_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(
                        web::resource("/{id}/offer-letter")
                            .route(web::post().to(offer_letter::generate_offer_letter))
                            .route(web::get().to(offer_letter::get_offer_letter)),
                    )
                    .service(
                        web::resource("/{id}/offer-letter/download")
                            .route(web::get().to(offer_letter::download_offer_letter)),
                    )
                    .service(
                        web::resource("/{id}/hike-letter")
                            .route(web::post().to(hike_letter::generate_hike_letter))
                            .route(web::get().to(hike_letter::get_hike_letter)),
                    )
                    .service(
                        web::resource("/{id}/hike-letter/download")
                            .route(web::get().to(hike_letter::download_hike_letter)),
                    )
                    .service(
                        web::resource("/{id}/payslips")
                            .route(web::post().to(payslip::generate_payslip))
                            .route(web::get().to(payslip::get_payslips)),
                    )
                    .service(
                        web::resource("/{id}/payslips/{payslip_id}/download")
                            .route(web::get().to(payslip::download_payslip)),
                    )
                    .service(
                        web::resource("/{id}/relieving-letter")
                            .route(web::post().to(relieving_letter::generate_relieving_letter))
                            .route(web::get().to(relieving_letter::get_relieving_letter)),
                    )
                    .service(
                        web::resource("/{id}/relieving-letter/download")
                            .route(web::get().to(relieving_letter::download_relieving_letter)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token + refresh_token, both tied to one session id
//  └─ session idles out after SESSION_TIMEOUT seconds without a request

// API REQUEST
//  └─ Authorization: Bearer access_token (refreshes the idle timer)

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ new pair while the session is alive, 401 once it has idled out
