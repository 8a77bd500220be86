//! Session & Access Control Server
//!
//! Wires the identity store, token service, revocation list, OTP challenge
//! manager, rate limiter, and federated login bridge into the HTTP API and
//! serves it.

use std::sync::Arc;

use dotenv::dotenv;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth_service::{
    api::{AppState, RouterBuilder},
    config::AppConfig,
    service::{
        email::EmailConfig, AuthService, EmailService, FederatedAuthService, GoogleOAuthClient,
        OtpService, RateLimitConfig, RateLimitService, RevocationList, TokenService,
    },
    store::{postgres::PgUserStore, UserStore},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv().ok();
    env_logger::init();

    log::info!("Starting auth service v{}", auth_service::VERSION);

    let config = AppConfig::from_env()?;
    config.validate()?;
    log::info!("Configuration loaded and validated");

    // Identity store (runs pending migrations on connect)
    let store: Arc<dyn UserStore> = Arc::new(PgUserStore::connect(&config.database).await?);
    log::info!("Identity store connected");

    // Outbound notifier, when SMTP is configured
    let email_service = match EmailConfig::from_env()? {
        Some(email_config) => {
            let service = Arc::new(EmailService::new(email_config)?);
            log::info!("Email service initialized");
            Some(service)
        }
        None => {
            log::warn!("Email service not configured; one-time codes will not be delivered");
            None
        }
    };

    // Core services
    let token_service = Arc::new(TokenService::new(
        &config.jwt.secret,
        config.jwt.session_ttl_minutes,
        config.jwt.bridge_ttl_minutes,
    ));
    let revocation_list = Arc::new(RevocationList::new());
    let otp_service = Arc::new(OtpService::new(
        Arc::clone(&store),
        email_service,
        config.otp_window_minutes,
    ));
    let rate_limit_service = Arc::new(RateLimitService::new(
        Arc::clone(&store),
        RateLimitConfig::from_env(),
    ));
    let auth_service = Arc::new(AuthService::new(
        Arc::clone(&store),
        Arc::clone(&otp_service),
        Arc::clone(&token_service),
        Arc::clone(&revocation_list),
    ));
    let federated_auth_service = Arc::new(FederatedAuthService::new(
        Arc::clone(&store),
        Arc::clone(&token_service),
    ));
    log::info!("Core services initialized");

    // Federated provider adapter, when configured
    let google_oauth = match &config.oauth {
        Some(oauth_config) => {
            let client = Arc::new(GoogleOAuthClient::new(oauth_config)?);
            log::info!("Google OAuth adapter initialized");
            Some(client)
        }
        None => {
            log::warn!("Google OAuth not configured; federated login disabled");
            None
        }
    };

    let state = AppState {
        auth_service,
        token_service,
        revocation_list,
        rate_limit_service,
        federated_auth_service,
        google_oauth,
        // The analysis backend ships separately; without it the protected
        // endpoint reports the backend unavailable after the rate gate.
        analyzer: None,
        store,
        frontend_base_url: config.frontend_base_url.clone(),
    };

    let app = RouterBuilder::with_all_routes().build(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .into_inner(),
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
