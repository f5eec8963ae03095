// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "X-Api-Key";
pub const API_KEY_QUERY: &str = "apikey";

/// Configured API key; `None` leaves the API open.
#[derive(Clone, Default)]
pub struct ApiKey(pub Option<Arc<str>>);

impl ApiKey {
    pub fn new(key: Option<&str>) -> Self {
        Self(key.map(str::trim).filter(|k| !k.is_empty()).map(Arc::from))
    }
}

fn presented_key(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get(API_KEY_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }
    request.uri().query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name.eq_ignore_ascii_case(API_KEY_QUERY))
            .map(|(_, value)| value.into_owned())
    })
}

/// Checks the `X-Api-Key` header or `apikey` query parameter in constant time.
pub async fn auth_middleware(State(expected): State<ApiKey>, request: Request, next: Next) -> Response {
    let Some(expected) = expected.0 else {
        return next.run(request).await;
    };

    match presented_key(&request) {
        Some(key) if bool::from(key.as_bytes().ct_eq(expected.as_bytes())) => {
            next.run(request).await
        }
        Some(_) => {
            debug!(target: "auth", path = %request.uri().path(), "invalid api key");
            ApiError::new(StatusCode::UNAUTHORIZED, "invalid api key").into_response()
        }
        None => {
            debug!(target: "auth", path = %request.uri().path(), "missing api key");
            ApiError::new(StatusCode::UNAUTHORIZED, "api key required").into_response()
        }
    }
}
