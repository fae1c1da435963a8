use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::models::ServiceResult;
use crate::services::cognito_service::ACCESS_TOKEN_COOKIE;
use crate::services::Authenticator;
use crate::web::routes::GET_INDEX;
use crate::web::{Context, Request, ResponseModifier, Route, Template};

/// Hosted UI callback: trades the authorization code for an access token cookie
pub struct GetLoginRoute {
    authenticator: Arc<dyn Authenticator>,
    domain: String,
}

impl GetLoginRoute {
    pub fn new(authenticator: Arc<dyn Authenticator>, domain: String) -> Self {
        Self {
            authenticator,
            domain,
        }
    }
}

#[async_trait]
impl Route for GetLoginRoute {
    fn route(&self) -> &'static str {
        "GET /login"
    }

    fn template(&self) -> Template {
        Template::redirect_with_status(GET_INDEX, 302)
    }

    fn requires_authentication(&self) -> bool {
        false
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        request: &Request,
        _context: &mut Context,
        response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        let Some(code) = request.query_parameters.get("code") else {
            info!("Login callback without code");
            return Ok(());
        };

        if let Some(jwt) = self.authenticator.authenticate(code).await? {
            set_access_token_cookie(
                response_modifier,
                &jwt.access_token,
                &self.domain,
                jwt.expires_in,
            );
        }
        Ok(())
    }
}

pub struct GetLogoutRoute {
    domain: String,
}

impl GetLogoutRoute {
    pub fn new(domain: String) -> Self {
        Self { domain }
    }
}

#[async_trait]
impl Route for GetLogoutRoute {
    fn route(&self) -> &'static str {
        "GET /logout"
    }

    fn template(&self) -> Template {
        Template::redirect_with_status(GET_INDEX, 302)
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
        set_access_token_cookie(response_modifier, "", &self.domain, 1);
        Ok(())
    }
}

fn set_access_token_cookie(
    response_modifier: &mut ResponseModifier,
    value: &str,
    domain: &str,
    max_age: i64,
) {
    response_modifier.cookies.push(
        [
            format!("{}={}", ACCESS_TOKEN_COOKIE, value),
            format!("Domain={}", domain),
            format!("Max-Age={}", max_age),
            "Path=/".to_string(),
            "Secure".to_string(),
            "HttpOnly".to_string(),
        ]
        .join("; "),
    );
}
