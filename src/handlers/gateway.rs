use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{on, MethodFilter},
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::lambda::events::{Body as GatewayBody, QueryMap};
use crate::lambda::{ApiGatewayEntrypoint, ApiGatewayV2httpRequest, ApiGatewayV2httpResponse};

/// Shared state of the local server
#[derive(Clone)]
pub struct GatewayState {
    pub entrypoint: Arc<ApiGatewayEntrypoint>,
}

/// Registers every route key, e.g. `GET /edit/{id}`, as an axum route
pub fn gateway_router(state: GatewayState, route_keys: &[&'static str]) -> Router {
    let mut router = Router::new();

    for &route_key in route_keys {
        let Some((method, path)) = axum_route(route_key) else {
            warn!("Skipping unsupported route key {}", route_key);
            continue;
        };

        router = router.route(
            &path,
            on(
                method,
                move |State(state): State<GatewayState>,
                      uri: Uri,
                      path_parameters: Option<Path<HashMap<String, String>>>,
                      Query(query): Query<HashMap<String, String>>,
                      headers: HeaderMap,
                      body: String| async move {
                    let event = to_gateway_event(
                        route_key,
                        &uri,
                        path_parameters.map(|Path(p)| p).unwrap_or_default(),
                        query,
                        &headers,
                        body,
                    );
                    forward(state, event).await
                },
            ),
        );
    }

    // Unmatched requests still reach the entrypoint, which answers 404
    router
        .fallback(
            |State(state): State<GatewayState>, method: Method, uri: Uri, headers: HeaderMap| async move {
                let route_key = format!("{} {}", method, uri.path());
                let event = to_gateway_event(&route_key, &uri, HashMap::new(), HashMap::new(), &headers, String::new());
                forward(state, event).await
            },
        )
        .with_state(state)
}

#[instrument(skip_all, fields(route_key = event.route_key.as_deref().unwrap_or_default()))]
async fn forward(state: GatewayState, event: ApiGatewayV2httpRequest) -> Response {
    to_http_response(state.entrypoint.handle_request(event).await)
}

/// Method filter and axum path of a route key
pub fn axum_route(route_key: &str) -> Option<(MethodFilter, String)> {
    let (method, path) = route_key.split_once(' ')?;
    let method = match method {
        "GET" => MethodFilter::GET,
        "POST" => MethodFilter::POST,
        "PUT" => MethodFilter::PUT,
        "PATCH" => MethodFilter::PATCH,
        "DELETE" => MethodFilter::DELETE,
        _ => return None,
    };

    let path = path
        .split('/')
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => format!(":{}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/");

    Some((method, path))
}

/// The event API Gateway would have delivered for this request
pub fn to_gateway_event(
    route_key: &str,
    uri: &Uri,
    path_parameters: HashMap<String, String>,
    query_parameters: HashMap<String, String>,
    headers: &HeaderMap,
    body: String,
) -> ApiGatewayV2httpRequest {
    let cookies: Vec<String> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(str::trim)
        .filter(|cookie| !cookie.is_empty())
        .map(str::to_string)
        .collect();

    let mut headers = headers.clone();
    headers.remove(header::COOKIE);

    let query_parameters: HashMap<String, Vec<String>> = query_parameters
        .into_iter()
        .map(|(name, value)| (name, vec![value]))
        .collect();

    ApiGatewayV2httpRequest {
        route_key: Some(route_key.to_string()),
        raw_path: Some(uri.path().to_string()),
        raw_query_string: uri.query().map(str::to_string),
        cookies: (!cookies.is_empty()).then_some(cookies),
        headers,
        query_string_parameters: QueryMap::from(query_parameters),
        path_parameters,
        body: (!body.is_empty()).then_some(body),
        is_base64_encoded: false,
        ..Default::default()
    }
}

pub fn to_http_response(response: ApiGatewayV2httpResponse) -> Response {
    let status = u16::try_from(response.status_code)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match response.body {
        Some(GatewayBody::Text(text)) => Body::from(text),
        Some(GatewayBody::Binary(bytes)) => Body::from(bytes),
        Some(GatewayBody::Empty) | None => Body::empty(),
    };
    let mut http_response = (status, body).into_response();

    let headers = http_response.headers_mut();
    for (name, value) in &response.headers {
        headers.insert(name.clone(), value.clone());
    }
    for cookie in response.cookies {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(header::SET_COOKIE, value);
        }
    }

    http_response
}
