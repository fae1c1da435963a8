use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, instrument};

use crate::models::{ServiceError, ServiceResult};
use crate::web::pages::{render_error_page, render_page, ERROR_PAGE};
use crate::web::{Context, Request, Response, ResponseModifier, Route, Template};

const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Dispatches route keys to registered routes and turns their outcome into
/// a response
pub struct Router {
    routes: Vec<Arc<dyn Route>>,
}

impl Router {
    pub fn new(routes: Vec<Arc<dyn Route>>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[Arc<dyn Route>] {
        &self.routes
    }

    /// First route registered under `route_key`
    pub fn matching_route(&self, route_key: &str) -> Option<Arc<dyn Route>> {
        self.routes
            .iter()
            .find(|route| route.route() == route_key)
            .cloned()
    }

    #[instrument(skip(self, route, request), fields(route = %route.route()))]
    pub async fn process_request(&self, route: &dyn Route, request: Request) -> Response {
        let mut context = Context::new();
        let mut response_modifier = ResponseModifier::default();

        let outcome = match route
            .handle(&request, &mut context, &mut response_modifier)
            .await
        {
            Ok(()) => self.render(route.template(), &context),
            Err(e) => Err(e),
        };

        match outcome {
            Ok((status_code, path, body)) => Response {
                status_code,
                path,
                body,
                cookies: response_modifier.cookies,
            },
            Err(e) => error_response(&e),
        }
    }

    fn render(&self, template: Template, context: &Context) -> ServiceResult<(u16, String, Option<String>)> {
        match template {
            Template::Static(name) => Ok((200, name.to_string(), Some(render_page(name, context)?))),
            redirect => {
                let (status, name) = self.resolve_redirect(redirect)?;
                Ok((status, name.to_string(), None))
            }
        }
    }

    /// Follows redirect targets until a static page is reached. The status
    /// of the last redirect in the chain is kept.
    pub fn resolve_redirect(&self, template: Template) -> ServiceResult<(u16, &'static str)> {
        let mut visited = HashSet::new();
        let mut current = template;
        let mut status_code = 200;

        loop {
            match current {
                Template::Static(name) => return Ok((status_code, name)),
                Template::Redirect { route, status } => {
                    if !visited.insert(route) {
                        return Err(ServiceError::Configuration {
                            message: format!("Redirect cycle through {}", route),
                        });
                    }
                    let target = self.matching_route(route).ok_or_else(|| {
                        ServiceError::Configuration {
                            message: format!("Redirect to unknown route {}", route),
                        }
                    })?;
                    status_code = status;
                    current = target.template();
                }
            }
        }
    }
}

/// The error page for a failed request
pub fn error_response(error: &ServiceError) -> Response {
    let (status_code, message) = match error.display_message() {
        Some(message) => {
            crate::warn_with_trace!("Request rejected: {}", message);
            (400, message)
        }
        None => {
            crate::error_with_trace!(error = %error, "Request failed");
            (500, GENERIC_ERROR_MESSAGE)
        }
    };
    error_page(status_code, message)
}

pub fn error_page(status_code: u16, message: &str) -> Response {
    let body = render_error_page(status_code, message).unwrap_or_else(|e| {
        error!("Failed to render error page: {}", e);
        message.to_string()
    });

    Response {
        status_code,
        path: ERROR_PAGE.to_string(),
        body: Some(body),
        cookies: Vec::new(),
    }
}
