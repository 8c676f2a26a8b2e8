//! OpenInv REST API
//!
//! Two surfaces on one router:
//!
//! - the management API under `/api/v1`: device listing with
//!   filter/sort/pagination, group membership, and optimistic-concurrency
//!   tag updates guarded by `If-Match`/`ETag`;
//! - the internal API under `/api/internal/v1/inventory`: tenant
//!   provisioning, device provisioning, and auth-verification forwarding.
//!
//! Management requests resolve their tenant namespace from an (unverified)
//! claim in the bearer token; requests without one use the default
//! namespace. Token validation itself is the auth collaborator's job.

#![warn(missing_docs)]

pub mod auth;
pub mod dto;
pub mod error;
pub mod identity;
pub mod pagination;
pub mod routes;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use inv_store::TenantStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use auth::AuthClient;
pub use dto::*;

/// Shared API state
#[derive(Clone)]
pub struct ApiState {
    /// Multi-tenant device store
    pub store: Arc<TenantStore>,
    /// Client for the external auth validator
    pub auth: AuthClient,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "OpenInv API",
        version = "1.0.0",
        description = "OpenInv device inventory service",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::health_check,
        routes::management::list_devices,
        routes::management::get_device,
        routes::management::put_device_group,
        routes::management::delete_device_group,
        routes::management::list_groups,
        routes::management::list_group_devices,
        routes::management::patch_tags,
        routes::management::put_tags,
        routes::internal::create_tenant,
        routes::internal::create_device,
        routes::internal::auth_verify,
    ),
    components(
        schemas(
            ErrorBody, HealthResponse,
            DeviceDto, AttributeDto, DeviceNew,
            GroupBody, GroupDto, TenantNew
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "devices", description = "Device inventory management"),
        (name = "groups", description = "Device group membership"),
        (name = "internal", description = "Internal provisioning API")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", routes::management::router())
        .nest("/api/internal/v1/inventory", routes::internal::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
