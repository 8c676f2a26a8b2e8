//! Request identity
//!
//! The bearer token is opaque to this service; validation belongs to the
//! external auth collaborator. The only thing read here is an optional
//! tenant claim, with signature checking disabled, to route the request
//! into its namespace. Anything unreadable falls back to the default
//! namespace.

use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// Identity resolved from request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Token subject, when present
    pub subject: Option<String>,
    /// Tenant the request operates on; `None` selects the default
    pub tenant: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    tenant_id: Option<String>,
}

/// Resolve the request identity from headers.
pub fn identity_from_headers(headers: &HeaderMap) -> Identity {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Identity::default();
    };
    let Ok(raw) = value.to_str() else {
        return Identity::default();
    };
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw);

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;

    match decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Identity {
            subject: data.claims.sub,
            tenant: data.claims.tenant_id,
        },
        Err(_) => Identity::default(),
    }
}
