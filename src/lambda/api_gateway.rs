use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{CONTENT_TYPE, LOCATION};
use http::HeaderValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::lambda::events::{ApiGatewayV2httpRequest, ApiGatewayV2httpResponse, Body};
use crate::models::{ServiceError, ServiceResult};
use crate::services::Authenticator;
use crate::web::router::{error_page, error_response};
use crate::web::{form, Request, Response, Router};

const TEXT_HTML: &str = "text/html";

/// Answers API Gateway HTTP API events with rendered pages
pub struct ApiGatewayEntrypoint {
    router: Router,
    authenticator: Arc<dyn Authenticator>,
}

impl ApiGatewayEntrypoint {
    pub fn new(router: Router, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            router,
            authenticator,
        }
    }

    /// Route keys the website answers to
    pub fn route_keys(&self) -> Vec<&'static str> {
        self.router.routes().iter().map(|route| route.route()).collect()
    }

    #[instrument(skip(self, event), fields(route_key = event.route_key.as_deref().unwrap_or_default()))]
    pub async fn handle_request(&self, event: ApiGatewayV2httpRequest) -> ApiGatewayV2httpResponse {
        let route_key = event.route_key.as_deref().unwrap_or_default();
        let Some(route) = self.router.matching_route(route_key) else {
            warn!("No route registered for {}", route_key);
            return to_api_gateway_response(error_page(404, "Page not found"));
        };

        let cookies = event.cookies.clone().unwrap_or_default();
        if route.requires_authentication() && !self.authenticator.is_authenticated(&cookies).await {
            return to_api_gateway_response(self.authenticator.login_redirect_response());
        }

        let response = match to_request(event) {
            Ok(request) => self.router.process_request(route.as_ref(), request).await,
            Err(e) => error_response(&e),
        };
        to_api_gateway_response(response)
    }
}

fn to_request(event: ApiGatewayV2httpRequest) -> ServiceResult<Request> {
    Ok(Request {
        body: parse_body(event.body.as_deref(), event.is_base64_encoded)?,
        query_parameters: event
            .query_string_parameters
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        path_parameters: event.path_parameters,
    })
}

/// Form fields of a request body
pub fn parse_body(body: Option<&str>, is_base64_encoded: bool) -> ServiceResult<HashMap<String, String>> {
    let Some(body) = body else {
        return Ok(HashMap::new());
    };

    if !is_base64_encoded {
        return Ok(form::parse(body));
    }

    let decoded = STANDARD
        .decode(body)
        .map_err(|_| ServiceError::display("Invalid request body"))?;
    Ok(form::parse(&String::from_utf8_lossy(&decoded)))
}

pub fn to_api_gateway_response(response: Response) -> ApiGatewayV2httpResponse {
    let mut gateway_response = ApiGatewayV2httpResponse {
        status_code: i64::from(response.status_code),
        body: response.body.map(Body::Text),
        is_base64_encoded: false,
        cookies: response.cookies,
        ..Default::default()
    };

    let headers = &mut gateway_response.headers;
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
    if (301..=307).contains(&response.status_code) {
        match HeaderValue::from_str(&location(&response.path)) {
            Ok(value) => {
                headers.insert(LOCATION, value);
            }
            Err(_) => warn!("Redirect target {} is not a valid header", response.path),
        }
    }

    gateway_response
}

/// Absolute URLs pass through, page names become site paths
pub fn location(path: &str) -> String {
    if path.starts_with("http") {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lambda::events::fixtures::http_api_event;
    use crate::test_support::MockTestAuthenticator;
    use crate::web::{Context, ResponseModifier, Route, Template};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes what it received into the page
    struct EchoRoute {
        key: &'static str,
        public: bool,
        seen: Arc<Mutex<Option<Request>>>,
    }

    #[async_trait]
    impl Route for EchoRoute {
        fn route(&self) -> &'static str {
            self.key
        }

        fn template(&self) -> Template {
            Template::Static("health")
        }

        fn requires_authentication(&self) -> bool {
            !self.public
        }

        async fn handle(
            &self,
            request: &Request,
            context: &mut Context,
            _response_modifier: &mut ResponseModifier,
        ) -> ServiceResult<()> {
            *self.seen.lock().unwrap() = Some(request.clone());
            context.set_variable("status", "up")
        }
    }

    struct RedirectRoute;

    #[async_trait]
    impl Route for RedirectRoute {
        fn route(&self) -> &'static str {
            "POST /submit"
        }

        fn template(&self) -> Template {
            Template::redirect("GET /open")
        }

        fn requires_authentication(&self) -> bool {
            false
        }

        async fn handle(
            &self,
            _request: &Request,
            _context: &mut Context,
            response_modifier: &mut ResponseModifier,
        ) -> ServiceResult<()> {
            response_modifier.cookies.push("seen=1".to_string());
            Ok(())
        }
    }

    fn entrypoint(
        authenticator: MockTestAuthenticator,
    ) -> (ApiGatewayEntrypoint, Arc<Mutex<Option<Request>>>) {
        let seen = Arc::new(Mutex::new(None));
        let routes: Vec<Arc<dyn Route>> = vec![
            Arc::new(EchoRoute {
                key: "GET /open",
                public: true,
                seen: seen.clone(),
            }),
            Arc::new(EchoRoute {
                key: "GET /protected/{id}",
                public: false,
                seen: seen.clone(),
            }),
            Arc::new(RedirectRoute),
        ];
        (
            ApiGatewayEntrypoint::new(Router::new(routes), Arc::new(authenticator)),
            seen,
        )
    }

    fn event(route_key: &str) -> ApiGatewayV2httpRequest {
        let raw_path = route_key.split_once(' ').map(|(_, path)| path).unwrap_or("/");
        serde_json::from_value(http_api_event(route_key, raw_path)).unwrap()
    }

    fn body_text(response: &ApiGatewayV2httpResponse) -> &str {
        match &response.body {
            Some(Body::Text(text)) => text,
            _ => "",
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (entrypoint, _) = entrypoint(MockTestAuthenticator::new());

        let response = entrypoint.handle_request(event("GET /missing")).await;

        assert_eq!(response.status_code, 404);
        assert_eq!(response.headers["content-type"], "text/html");
        assert!(body_text(&response).contains("Page not found"));
    }

    #[tokio::test]
    async fn test_unauthenticated_request_is_sent_to_login() {
        let mut authenticator = MockTestAuthenticator::new();
        authenticator
            .expect_is_authenticated()
            .withf(|cookies| cookies.len() == 1 && cookies[0] == "session=invalid")
            .returning(|_| false);
        authenticator.expect_login_redirect_response().returning(|| Response {
            status_code: 302,
            path: "https://auth.passhelper.example/login".to_string(),
            body: None,
            cookies: vec![],
        });
        let (entrypoint, seen) = entrypoint(authenticator);

        let mut request = event("GET /protected/{id}");
        request.cookies = Some(vec!["session=invalid".to_string()]);
        let response = entrypoint.handle_request(request).await;

        assert_eq!(response.status_code, 302);
        assert_eq!(
            response.headers["location"],
            "https://auth.passhelper.example/login"
        );
        assert!(seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_authenticated_request_passes_parameters_through() {
        let mut authenticator = MockTestAuthenticator::new();
        authenticator.expect_is_authenticated().returning(|_| true);
        let (entrypoint, seen) = entrypoint(authenticator);

        let mut payload = http_api_event("GET /protected/{id}", "/protected/123");
        payload["pathParameters"] = serde_json::json!({"id": "123"});
        payload["queryStringParameters"] = serde_json::json!({"param1": "value1"});
        let request: ApiGatewayV2httpRequest = serde_json::from_value(payload).unwrap();
        let response = entrypoint.handle_request(request).await;

        assert_eq!(response.status_code, 200);
        assert!(!response.headers.contains_key("location"));
        let seen = seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.path_parameters["id"], "123");
        assert_eq!(seen.query_parameters["param1"], "value1");
    }

    #[tokio::test]
    async fn test_public_route_skips_authentication() {
        let mut authenticator = MockTestAuthenticator::new();
        authenticator.expect_is_authenticated().times(0);
        let (entrypoint, seen) = entrypoint(authenticator);

        let mut request = event("GET /open");
        request.body = Some(STANDARD.encode("param1=value+1&param2=value2"));
        request.is_base64_encoded = true;
        let response = entrypoint.handle_request(request).await;

        assert_eq!(response.status_code, 200);
        let seen = seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.body["param1"], "value 1");
        assert_eq!(seen.body["param2"], "value2");
    }

    #[tokio::test]
    async fn test_redirect_sets_location_and_cookies() {
        let (entrypoint, _) = entrypoint(MockTestAuthenticator::new());

        let response = entrypoint.handle_request(event("POST /submit")).await;

        assert_eq!(response.status_code, 303);
        assert_eq!(response.headers["location"], "/health");
        assert!(response.body.is_none());
        assert_eq!(response.cookies, vec!["seen=1".to_string()]);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_rejected() {
        let (entrypoint, seen) = entrypoint(MockTestAuthenticator::new());

        let mut request = event("GET /open");
        request.body = Some("%%% not base64".to_string());
        request.is_base64_encoded = true;
        let response = entrypoint.handle_request(request).await;

        assert_eq!(response.status_code, 400);
        assert!(seen.lock().unwrap().is_none());
    }

    #[test]
    fn test_route_keys() {
        let (entrypoint, _) = entrypoint(MockTestAuthenticator::new());
        assert_eq!(
            entrypoint.route_keys(),
            vec!["GET /open", "GET /protected/{id}", "POST /submit"]
        );
    }

    #[test]
    fn test_location() {
        assert_eq!(location("index"), "/index");
        assert_eq!(location("https://auth.example.com/login"), "https://auth.example.com/login");
    }

    #[test]
    fn test_plain_body_is_parsed_as_form() {
        let body = parse_body(Some("email=jane%40example.com"), false).unwrap();
        assert_eq!(body["email"], "jane@example.com");
        assert!(parse_body(None, true).unwrap().is_empty());
    }
}
