use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use crate::models::{AddNotificationEndpointForm, ServiceResult};
use crate::services::{NotificationEndpointService, UserPoolService};
use crate::web::routes::GET_NOTIFICATION_ENDPOINTS;
use crate::web::{Context, Request, ResponseModifier, Route, Template};

pub struct GetNotificationEndpoints {
    notification_endpoint_service: Arc<NotificationEndpointService>,
    user_pool_service: Arc<UserPoolService>,
}

impl GetNotificationEndpoints {
    pub fn new(
        notification_endpoint_service: Arc<NotificationEndpointService>,
        user_pool_service: Arc<UserPoolService>,
    ) -> Self {
        Self {
            notification_endpoint_service,
            user_pool_service,
        }
    }
}

#[async_trait]
impl Route for GetNotificationEndpoints {
    fn route(&self) -> &'static str {
        GET_NOTIFICATION_ENDPOINTS
    }

    fn template(&self) -> Template {
        Template::Static("notification-endpoints")
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        _request: &Request,
        context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        let endpoints = self.notification_endpoint_service.find_all_emails().await?;
        let users = self.user_pool_service.list_all_users().await?;

        context.set_variable("notificationEndpoints", endpoints)?;
        context.set_variable("users", users)?;
        context.set_variable(
            "addNotificationEndpointForm",
            AddNotificationEndpointForm::default(),
        )
    }
}

pub struct PostNotificationEndpoints {
    notification_endpoint_service: Arc<NotificationEndpointService>,
}

impl PostNotificationEndpoints {
    pub fn new(notification_endpoint_service: Arc<NotificationEndpointService>) -> Self {
        Self {
            notification_endpoint_service,
        }
    }
}

#[async_trait]
impl Route for PostNotificationEndpoints {
    fn route(&self) -> &'static str {
        "POST /notification-endpoints"
    }

    fn template(&self) -> Template {
        Template::redirect(GET_NOTIFICATION_ENDPOINTS)
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        request: &Request,
        _context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        let form: AddNotificationEndpointForm = request.form()?;
        if let Some(email) = form.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            self.notification_endpoint_service.add_email(email).await?;
        }
        Ok(())
    }
}

pub struct DeleteNotificationEndpoint {
    notification_endpoint_service: Arc<NotificationEndpointService>,
}

impl DeleteNotificationEndpoint {
    pub fn new(notification_endpoint_service: Arc<NotificationEndpointService>) -> Self {
        Self {
            notification_endpoint_service,
        }
    }
}

#[async_trait]
impl Route for DeleteNotificationEndpoint {
    fn route(&self) -> &'static str {
        "DELETE /notification-endpoints/{id}"
    }

    fn template(&self) -> Template {
        Template::redirect(GET_NOTIFICATION_ENDPOINTS)
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        request: &Request,
        _context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        self.notification_endpoint_service
            .delete_email(request.path_parameter("id")?)
            .await
    }
}
