use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::models::{ServiceError, ServiceResult, ValidationError};

pub const DEFAULT_REDIRECT_STATUS: u16 = 303;

/// What a route answers with once its handler has run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    /// Render the named page
    Static(&'static str),
    /// Answer with the template of the route registered under `route`
    Redirect { route: &'static str, status: u16 },
}

impl Template {
    /// Redirect with `303 See Other`
    pub fn redirect(route: &'static str) -> Self {
        Template::Redirect {
            route,
            status: DEFAULT_REDIRECT_STATUS,
        }
    }

    pub fn redirect_with_status(route: &'static str, status: u16) -> Self {
        Template::Redirect { route, status }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub body: HashMap<String, String>,
    pub query_parameters: HashMap<String, String>,
    pub path_parameters: HashMap<String, String>,
}

impl Request {
    pub fn path_parameter(&self, name: &str) -> ServiceResult<&str> {
        self.path_parameters
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ServiceError::ValidationError {
                message: format!("missing path parameter {}", name),
            })
    }

    /// Deserializes the form body into `T`. Values that do not parse are a
    /// display error naming the bad value.
    pub fn form<T: DeserializeOwned>(&self) -> ServiceResult<T> {
        let body: Map<String, Value> = self
            .body
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();

        serde_json::from_value(Value::Object(body)).map_err(|e| {
            ValidationError::InvalidForm {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// Side effects a handler applies to the response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseModifier {
    pub cookies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status_code: u16,
    /// Rendered page name, or the redirect target
    pub path: String,
    pub body: Option<String>,
    pub cookies: Vec<String>,
}

/// Named values handed from a handler to the page renderer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    variables: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_variable<T: Serialize>(&mut self, name: &str, value: T) -> ServiceResult<()> {
        let value = serde_json::to_value(value).map_err(|e| ServiceError::ValidationError {
            message: format!("context variable {}: {}", name, e),
        })?;
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.variable(name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// The whole context as a page model
    pub fn to_model<T: DeserializeOwned>(&self) -> ServiceResult<T> {
        serde_json::from_value(Value::Object(self.variables.clone())).map_err(|e| {
            ServiceError::ValidationError {
                message: format!("page model: {}", e),
            }
        })
    }
}

/// An endpoint addressed by its API Gateway route key, e.g. `GET /edit/{id}`
#[async_trait]
pub trait Route: Send + Sync {
    fn route(&self) -> &'static str;

    fn template(&self) -> Template;

    fn requires_authentication(&self) -> bool {
        true
    }

    async fn handle(
        &self,
        request: &Request,
        context: &mut Context,
        response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()>;
}
