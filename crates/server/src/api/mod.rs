pub mod health;
pub mod ingestion;
pub mod openapi;
pub mod silence;
pub mod status;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use self::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full axum router: ingestion, silence, and status routes,
/// Swagger UI, and the shared tracing/CORS middleware stack.
#[must_use]
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .route("/api/v2/alerts", get(ingestion::list_alerts).post(ingestion::post_alerts))
        .route("/api/v2/silences", get(silence::list_silences).post(silence::create_silence))
        .route(
            "/api/v2/silences/{id}",
            get(silence::get_silence).put(silence::update_silence).delete(silence::expire_silence),
        )
        .route("/api/v2/status", get(status::status));

    api.merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
