use async_trait::async_trait;

use crate::models::ServiceResult;
use crate::web::{Context, Request, ResponseModifier, Route, Template};

/// Liveness page, reachable without logging in
pub struct GetHealth;

#[async_trait]
impl Route for GetHealth {
    fn route(&self) -> &'static str {
        "GET /health"
    }

    fn template(&self) -> Template {
        Template::Static("health")
    }

    fn requires_authentication(&self) -> bool {
        false
    }

    async fn handle(
        &self,
        _request: &Request,
        context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        context.set_variable("status", "up")
    }
}
