//! REST API layer: route handlers, DTOs, OpenAPI document, and router
//! composition.

pub mod dto;
pub mod handlers;

use axum::Router;
use axum::http::Uri;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::error::{self, ApiError};

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "RFMD API", description = "Cached RFM-D analytics over the homeowners table"),
    paths(
        handlers::homeowners::list_homeowners,
        handlers::homeowners::kpis,
        handlers::homeowners::top10,
        handlers::homeowners::radar,
        handlers::homeowners::trade_counts,
        handlers::homeowners::summary,
        handlers::homeowners::segments,
        handlers::homeowners::regions,
        handlers::homeowners::sub_region_revenue,
        handlers::system::root_handler,
        handlers::system::health_handler,
    ),
    tags(
        (name = "Homeowners", description = "RFM-D analytics"),
        (name = "System", description = "Service status"),
    )
)]
pub struct ApiDoc;

/// Builds the router with all REST endpoints, without state or layers.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .merge(handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

/// Builds the complete application: routes, 404 fallback, panic capture,
/// request tracing and CORS, bound to `state`.
pub fn build_app(state: AppState) -> Router {
    build_router()
        .fallback(fallback)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn fallback(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}
