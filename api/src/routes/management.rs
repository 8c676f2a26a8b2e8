//! Management API: device listing, groups, tag updates

use std::sync::Arc;

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use inv_common::{DeviceId, Error, GroupName, Scope};
use inv_search::Pagination;
use inv_store::{Namespace, TagUpdateMode};

use crate::dto::{AttributeDto, DeviceDto, ErrorBody, GroupBody, GroupDto};
use crate::error::ApiError;
use crate::identity::identity_from_headers;
use crate::pagination::{page_link_header, parse_list_query};
use crate::ApiState;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/devices", get(list_devices))
        .route("/devices/:id", get(get_device).delete(delete_device))
        .route(
            "/devices/:id/group",
            get(get_device_group).put(put_device_group),
        )
        .route("/devices/:id/group/:name", axum::routing::delete(delete_device_group))
        .route("/devices/:id/tags", axum::routing::patch(patch_tags).put(put_tags))
        .route("/groups", get(list_groups))
        .route("/groups/:name/devices", get(list_group_devices))
}

fn tenant_namespace(state: &ApiState, headers: &HeaderMap) -> Arc<Namespace> {
    let identity = identity_from_headers(headers);
    state.store.namespace(identity.tenant.as_deref())
}

fn etag_header(revision: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ETAG,
        HeaderValue::from_str(revision)
            .map_err(|e| ApiError(Error::Internal(format!("invalid revision header: {}", e))))?,
    );
    Ok(headers)
}

fn listing_headers(
    path: &str,
    params: &[(String, String)],
    page: Pagination,
    total: usize,
) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let links = page_link_header(path, params, page, page.has_next(total));
    headers.insert(
        header::LINK,
        HeaderValue::from_str(&links)
            .map_err(|e| ApiError(Error::Internal(format!("invalid link header: {}", e))))?,
    );
    headers.insert(
        HeaderName::from_static("x-total-count"),
        HeaderValue::from_str(&total.to_string())
            .map_err(|e| ApiError(Error::Internal(format!("invalid count header: {}", e))))?,
    );
    Ok(headers)
}

/// List devices with filtering, sorting and pagination
#[utoipa::path(
    get,
    path = "/api/v1/devices",
    params(
        ("page" = Option<u32>, Query, description = "Page number, starting at 1"),
        ("per_page" = Option<u32>, Query, description = "Items per page"),
        ("sort" = Option<String>, Query, description = "Sort key: [scope:]name[:asc|desc]"),
        ("has_group" = Option<bool>, Query, description = "Keep only devices with/without a group"),
        ("group" = Option<String>, Query, description = "Keep only members of this group")
    ),
    responses(
        (status = 200, description = "Matching devices", body = Vec<DeviceDto>),
        (status = 400, description = "Invalid query", body = ErrorBody)
    ),
    tag = "devices",
    security(("bearer" = []))
)]
pub async fn list_devices(
    State(state): State<Arc<ApiState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let ns = tenant_namespace(&state, &headers);
    let query = parse_list_query(&params)?;
    let (devices, total) = ns.list_devices(&query);

    let headers_out = listing_headers(uri.path(), &params, query.page, total)?;
    let body: Vec<DeviceDto> = devices.iter().map(DeviceDto::from).collect();
    Ok((headers_out, Json(body)).into_response())
}

/// Get one device; the response carries its revision in `ETag`
#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}",
    params(("id" = String, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Device details", body = DeviceDto),
        (status = 404, description = "Device not found", body = ErrorBody)
    ),
    tag = "devices",
    security(("bearer" = []))
)]
pub async fn get_device(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let ns = tenant_namespace(&state, &headers);
    let device = ns.get_device(&DeviceId::new(id)?)?;
    let headers_out = etag_header(&device.revision)?;
    Ok((headers_out, Json(DeviceDto::from(&device))).into_response())
}

pub async fn delete_device(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let ns = tenant_namespace(&state, &headers);
    match ns.delete_device(&DeviceId::new(id)?) {
        Ok(()) | Err(Error::DeviceNotFound) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into()),
    }
}

pub async fn get_device_group(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<GroupDto>, ApiError> {
    let ns = tenant_namespace(&state, &headers);
    let group = ns.device_group(&DeviceId::new(id)?)?;
    Ok(Json(GroupDto {
        group: group.map(|g| g.to_string()),
    }))
}

/// Assign the device to a group, leaving any prior group
#[utoipa::path(
    put,
    path = "/api/v1/devices/{id}/group",
    params(("id" = String, Path, description = "Device ID")),
    request_body = GroupBody,
    responses(
        (status = 204, description = "Device assigned"),
        (status = 400, description = "Invalid group name", body = ErrorBody),
        (status = 404, description = "Device not found", body = ErrorBody)
    ),
    tag = "groups",
    security(("bearer" = []))
)]
pub async fn put_device_group(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<GroupBody>,
) -> Result<StatusCode, ApiError> {
    let ns = tenant_namespace(&state, &headers);
    ns.assign_group(&DeviceId::new(id)?, GroupName::new(body.group)?)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove the device from a group it is currently a member of
#[utoipa::path(
    delete,
    path = "/api/v1/devices/{id}/group/{name}",
    params(
        ("id" = String, Path, description = "Device ID"),
        ("name" = String, Path, description = "Group name")
    ),
    responses(
        (status = 204, description = "Membership cleared"),
        (status = 404, description = "Device is not a member of this group", body = ErrorBody)
    ),
    tag = "groups",
    security(("bearer" = []))
)]
pub async fn delete_device_group(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path((id, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let ns = tenant_namespace(&state, &headers);
    ns.unassign_group(&DeviceId::new(id)?, &GroupName::new(name)?)?;
    Ok(StatusCode::NO_CONTENT)
}

/// List groups with at least one member
#[utoipa::path(
    get,
    path = "/api/v1/groups",
    responses(
        (status = 200, description = "Group names", body = Vec<String>)
    ),
    tag = "groups",
    security(("bearer" = []))
)]
pub async fn list_groups(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Json<Vec<String>> {
    let ns = tenant_namespace(&state, &headers);
    Json(ns.list_groups().iter().map(|g| g.to_string()).collect())
}

#[derive(Debug, Deserialize)]
pub struct GroupDevicesParams {
    page: Option<usize>,
    per_page: Option<usize>,
}

/// List member device ids of one group
#[utoipa::path(
    get,
    path = "/api/v1/groups/{name}/devices",
    params(
        ("name" = String, Path, description = "Group name"),
        ("page" = Option<u32>, Query, description = "Page number, starting at 1"),
        ("per_page" = Option<u32>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Member device ids", body = Vec<String>)
    ),
    tag = "groups",
    security(("bearer" = []))
)]
pub async fn list_group_devices(
    State(state): State<Arc<ApiState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(params): Query<GroupDevicesParams>,
) -> Result<Response, ApiError> {
    let ns = tenant_namespace(&state, &headers);
    let page = Pagination::new(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(inv_search::DEFAULT_PER_PAGE),
    )?;
    let (ids, total) = ns.devices_by_group(&GroupName::new(name)?, page);

    let headers_out = listing_headers(uri.path(), &[], page, total)?;
    let body: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    Ok((headers_out, Json(body)).into_response())
}

/// Merge tag attributes into the device's tags scope
#[utoipa::path(
    patch,
    path = "/api/v1/devices/{id}/tags",
    params(
        ("id" = String, Path, description = "Device ID"),
        ("If-Match" = Option<String>, Header, description = "Expected device revision")
    ),
    request_body = Vec<AttributeDto>,
    responses(
        (status = 200, description = "Tags merged; new revision in ETag"),
        (status = 404, description = "Device not found", body = ErrorBody),
        (status = 412, description = "Stale revision", body = ErrorBody)
    ),
    tag = "devices",
    security(("bearer" = []))
)]
pub async fn patch_tags(
    state: State<Arc<ApiState>>,
    headers: HeaderMap,
    path: Path<String>,
    body: Json<Vec<AttributeDto>>,
) -> Result<Response, ApiError> {
    update_tags(state, headers, path, body, TagUpdateMode::Merge).await
}

/// Replace the device's tags scope
#[utoipa::path(
    put,
    path = "/api/v1/devices/{id}/tags",
    params(
        ("id" = String, Path, description = "Device ID"),
        ("If-Match" = Option<String>, Header, description = "Expected device revision")
    ),
    request_body = Vec<AttributeDto>,
    responses(
        (status = 200, description = "Tags replaced; new revision in ETag"),
        (status = 404, description = "Device not found", body = ErrorBody),
        (status = 412, description = "Stale revision", body = ErrorBody)
    ),
    tag = "devices",
    security(("bearer" = []))
)]
pub async fn put_tags(
    state: State<Arc<ApiState>>,
    headers: HeaderMap,
    path: Path<String>,
    body: Json<Vec<AttributeDto>>,
) -> Result<Response, ApiError> {
    update_tags(state, headers, path, body, TagUpdateMode::Replace).await
}

async fn update_tags(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Vec<AttributeDto>>,
    mode: TagUpdateMode,
) -> Result<Response, ApiError> {
    let ns = tenant_namespace(&state, &headers);

    let if_match = match headers.get(header::IF_MATCH) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ApiError(Error::invalid("invalid If-Match header")))?,
        ),
        None => None,
    };

    let tags = body
        .into_iter()
        .map(|dto| dto.into_attribute(Scope::Tags))
        .collect::<inv_common::Result<Vec<_>>>()?;

    let revision = ns.update_tags(&DeviceId::new(id)?, tags, mode, if_match)?;
    let headers_out = etag_header(&revision)?;
    Ok((StatusCode::OK, headers_out).into_response())
}
