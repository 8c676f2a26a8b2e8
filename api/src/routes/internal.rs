//! Internal API: tenant provisioning, device provisioning, auth verify

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use inv_common::{DeviceId, Error, Scope};

use crate::dto::{DeviceNew, ErrorBody, TenantNew};
use crate::error::ApiError;
use crate::ApiState;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/tenants", post(create_tenant))
        .route("/devices", post(create_device))
        .route("/auth/verify", post(auth_verify))
}

/// Provision a tenant namespace; safe to repeat
#[utoipa::path(
    post,
    path = "/api/internal/v1/inventory/tenants",
    request_body = TenantNew,
    responses(
        (status = 201, description = "Tenant provisioned"),
        (status = 400, description = "Empty tenant id", body = ErrorBody)
    ),
    tag = "internal"
)]
pub async fn create_tenant(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<TenantNew>,
) -> Result<StatusCode, ApiError> {
    state.store.create_tenant(&body.tenant_id)?;
    Ok(StatusCode::CREATED)
}

#[derive(Debug, Deserialize)]
pub struct ProvisioningParams {
    tenant_id: Option<String>,
}

/// Provision a device into a tenant namespace
#[utoipa::path(
    post,
    path = "/api/internal/v1/inventory/devices",
    params(
        ("tenant_id" = Option<String>, Query, description = "Target tenant; omitted selects the default namespace")
    ),
    request_body = DeviceNew,
    responses(
        (status = 201, description = "Device provisioned"),
        (status = 400, description = "Invalid device id or attributes", body = ErrorBody)
    ),
    tag = "internal"
)]
pub async fn create_device(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ProvisioningParams>,
    Json(body): Json<DeviceNew>,
) -> Result<Response, ApiError> {
    let id = DeviceId::new(body.id)?;
    let attrs = body
        .attributes
        .into_iter()
        .map(|dto| dto.into_attribute(Scope::Inventory))
        .collect::<inv_common::Result<Vec<_>>>()?;

    let ns = state.store.namespace(params.tenant_id.as_deref());
    ns.add_device(&id, body.description, attrs)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::LOCATION,
        HeaderValue::from_str(&format!("devices/{}", id))
            .map_err(|e| ApiError(Error::Internal(format!("invalid location header: {}", e))))?,
    );
    Ok((StatusCode::CREATED, headers).into_response())
}

/// Forward an auth check to the external validator
#[utoipa::path(
    post,
    path = "/api/internal/v1/inventory/auth/verify",
    params(
        ("Authorization" = String, Header, description = "Bearer token under test"),
        ("X-Original-URI" = Option<String>, Header, description = "URI of the original request"),
        ("X-Original-Method" = Option<String>, Header, description = "Method of the original request")
    ),
    responses(
        (status = 200, description = "Token accepted"),
        (status = 403, description = "Token rejected", body = ErrorBody),
        (status = 502, description = "Auth upstream unreachable", body = ErrorBody)
    ),
    tag = "internal"
)]
pub async fn auth_verify(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError(Error::Forbidden))?;
    let original_uri = header_str(&headers, "x-original-uri");
    let original_method = header_str(&headers, "x-original-method");

    state
        .auth
        .verify(authorization, original_uri, original_method)
        .await?;
    Ok(StatusCode::OK)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
