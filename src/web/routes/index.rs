use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use crate::models::{PassportsInYearView, ServiceResult};
use crate::services::{NotificationEndpointService, PassportService};
use crate::web::routes::GET_INDEX;
use crate::web::{Context, Request, ResponseModifier, Route, Template};

pub struct GetRoot;

#[async_trait]
impl Route for GetRoot {
    fn route(&self) -> &'static str {
        "GET /"
    }

    fn template(&self) -> Template {
        Template::redirect_with_status(GET_INDEX, 301)
    }

    async fn handle(
        &self,
        _request: &Request,
        _context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        Ok(())
    }
}

/// Passports grouped by expiry year, plus who receives reminders
pub struct GetIndex {
    passport_service: Arc<PassportService>,
    notification_endpoint_service: Arc<NotificationEndpointService>,
}

impl GetIndex {
    pub fn new(
        passport_service: Arc<PassportService>,
        notification_endpoint_service: Arc<NotificationEndpointService>,
    ) -> Self {
        Self {
            passport_service,
            notification_endpoint_service,
        }
    }
}

#[async_trait]
impl Route for GetIndex {
    fn route(&self) -> &'static str {
        GET_INDEX
    }

    fn template(&self) -> Template {
        Template::Static("index")
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        _request: &Request,
        context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        let passports = self.passport_service.find_all().await?;
        let passport_count = passports.len();
        let endpoints = self.notification_endpoint_service.find_all_emails().await?;

        context.set_variable(
            "passportsInYearView",
            PassportsInYearView::group_by_year(passports),
        )?;
        context.set_variable("passportCount", passport_count)?;
        context.set_variable("notificationEndpointCount", endpoints.len())?;
        context.set_variable(
            "notificationEndpoints",
            endpoints
                .iter()
                .map(|endpoint| endpoint.email.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )?;
        Ok(())
    }
}
