//! Server configuration and shared application state.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{delete, get, post},
};
use rand::RngCore;
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::crypto::CryptoKey;
use crate::handlers;
use crate::oauth::{GoogleOAuth, GranolaOAuth, granola::DiscoveryCache};
use crate::repositories::client_registration::ClientRegistrationRepository;
use crate::repositories::pending_authorization::PendingAuthorizationRepository;
use crate::repositories::provider_token::ProviderTokenRepository;

/// Discovery metadata is effectively static per deployment; refresh daily.
const DISCOVERY_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub http: reqwest::Client,
    pub crypto_key: CryptoKey,
    pub granola: Arc<GranolaOAuth>,
    pub google: Arc<GoogleOAuth>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: DatabaseConnection) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()?;

        let crypto_key = match &config.crypto_key {
            Some(bytes) => CryptoKey::new(bytes.clone())
                .map_err(|e| anyhow::anyhow!("invalid crypto key: {}", e))?,
            None => {
                // Ephemeral key: stored tokens will not survive a restart
                tracing::warn!(
                    "PROJECTOS_CRYPTO_KEY is not set, using an ephemeral token encryption key"
                );
                let mut bytes = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                CryptoKey::new(bytes).expect("32-byte key")
            }
        };

        let db_arc = Arc::new(db.clone());
        let tokens = ProviderTokenRepository::new(db_arc.clone(), crypto_key.clone());

        let granola = Arc::new(GranolaOAuth::new(
            config.clone(),
            http.clone(),
            ClientRegistrationRepository::new(db_arc.clone()),
            tokens.clone(),
            DiscoveryCache::new(DISCOVERY_CACHE_TTL),
        ));
        let google = Arc::new(GoogleOAuth::new(config.clone(), http.clone(), tokens));

        Ok(Self {
            config,
            db,
            http,
            crypto_key,
            granola,
            google,
        })
    }

    pub fn pending_repo(&self) -> PendingAuthorizationRepository {
        PendingAuthorizationRepository::new(Arc::new(self.db.clone()))
    }

    pub fn token_repo(&self) -> ProviderTokenRepository {
        ProviderTokenRepository::new(Arc::new(self.db.clone()), self.crypto_key.clone())
    }
}

/// Creates and configures the Axum application router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/connect/{provider}", post(handlers::connect::start_connect))
        .route(
            "/callback/{provider}",
            get(handlers::callback::oauth_callback),
        )
        .route(
            "/connections",
            get(handlers::connections::list_connections),
        )
        .route(
            "/connections/{provider}",
            delete(handlers::connections::reset_connection),
        )
        .route("/meetings", get(handlers::meetings::list_meetings))
        .route(
            "/meetings/{document_id}/import",
            post(handlers::meetings::import_meeting),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration and state.
pub async fn run_server(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let config = state.config.clone();
    let app = create_app(state);

    let addr = config
        .bind_addr()
        .map_err(|e| format!("invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::connect::start_connect,
        crate::handlers::callback::oauth_callback,
        crate::handlers::connections::list_connections,
        crate::handlers::connections::reset_connection,
        crate::handlers::meetings::list_meetings,
        crate::handlers::meetings::import_meeting,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::connect::AuthorizeUrlResponse,
            crate::handlers::connections::ConnectionInfo,
            crate::handlers::connections::ConnectionsResponse,
            crate::handlers::connections::ResetResponse,
            crate::handlers::meetings::MeetingsResponse,
            crate::mcp::types::McpDocument,
            crate::mcp::types::McpTranscript,
            crate::transcript::TranscriptImport,
            crate::error::ApiError,
        )
    ),
    info(
        title = "Project OS Integrations API",
        description = "Third-party OAuth connections and transcript import",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
