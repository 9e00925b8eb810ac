//! Backend entry-point: configuration, migrations, REST routes, OpenAPI.

use std::io;
use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Key, SameSite};
use actix_web::{App, HttpServer, web};
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use campus_backend::Trace;
#[cfg(debug_assertions)]
use campus_backend::doc::ApiDoc;
use campus_backend::inbound::http::health::{HealthState, live, ready};
use campus_backend::outbound::gateway::{
    GatewayAdapter, HttpCertificateRenderer, HttpPaymentGateway, RendererAdapter,
};
use campus_backend::outbound::persistence::{DbPool, PoolConfig};
use campus_backend::server::{AppConfig, AppServices, configure_api, run_migrations};

fn other_error(message: impl std::fmt::Display) -> io::Error {
    io::Error::other(message.to_string())
}

fn session_key(config: &AppConfig) -> io::Result<Key> {
    let Some(path) = &config.session_key_file else {
        if cfg!(debug_assertions) {
            warn!("no session key file configured; using a throwaway key (dev only)");
            return Ok(Key::generate());
        }
        return Err(other_error("CAMPUS_SESSION_KEY_FILE is required"));
    };
    match std::fs::read(path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(e) => {
            if cfg!(debug_assertions) {
                warn!(path = %path.display(), error = %e, "session key unreadable; using a throwaway key (dev only)");
                Ok(Key::generate())
            } else {
                Err(other_error(format!(
                    "failed to read session key at {}: {e}",
                    path.display()
                )))
            }
        }
    }
}

fn build_gateway(config: &AppConfig) -> io::Result<GatewayAdapter> {
    match (
        config.gateway_base_url().map_err(other_error)?,
        config.gateway_access_token.as_deref(),
    ) {
        (Some(url), Some(token)) => Ok(GatewayAdapter::Http(
            HttpPaymentGateway::new(url, token).map_err(other_error)?,
        )),
        _ => {
            warn!("payment gateway not configured; paid checkout is disabled");
            Ok(GatewayAdapter::Disabled)
        }
    }
}

fn build_renderer(config: &AppConfig) -> io::Result<RendererAdapter> {
    match config.renderer_url().map_err(other_error)? {
        Some(url) => Ok(RendererAdapter::Http(
            HttpCertificateRenderer::new(url).map_err(other_error)?,
        )),
        None => {
            warn!("certificate renderer not configured; certificates are issued without assets");
            Ok(RendererAdapter::Disabled)
        }
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = AppConfig::load().map_err(other_error)?;
    let database_url = config.database_url().map_err(other_error)?.to_owned();
    let bind_addr = config.bind_addr().map_err(other_error)?;
    let frontend_base = config.frontend_base_url().map_err(other_error)?;
    let signing_key = config.reference_signing_key().map_err(other_error)?;
    let cookie_secure = config.cookie_secure();
    let key = session_key(&config)?;

    run_migrations(&database_url).await.map_err(other_error)?;
    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .map_err(other_error)?;

    let services = web::Data::new(AppServices::with_database(
        pool,
        Arc::new(build_gateway(&config)?),
        Arc::new(build_renderer(&config)?),
        frontend_base,
        signing_key,
    ));

    let health_state = web::Data::new(HealthState::new());
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        let session = SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
            .cookie_name("session".into())
            .cookie_path("/".into())
            .cookie_secure(cookie_secure)
            .cookie_http_only(true)
            .cookie_same_site(SameSite::Lax)
            .build();

        let api = web::scope("/api/v1").wrap(session).configure(configure_api);

        #[allow(unused_mut, reason = "mutated only in debug builds")]
        let mut app = App::new()
            .app_data(services.clone())
            .app_data(server_health_state.clone())
            .wrap(Trace)
            .service(api)
            .service(ready)
            .service(live);

        #[cfg(debug_assertions)]
        {
            app = app
                .service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
        }

        app
    })
    .bind(bind_addr)?;

    health_state.mark_ready();
    server.run().await
}
