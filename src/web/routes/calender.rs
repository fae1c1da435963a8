use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use crate::models::ServiceResult;
use crate::services::CalenderService;
use crate::web::{Context, Request, ResponseModifier, Route, Template};

pub struct GetCalender {
    calender_service: Arc<CalenderService>,
}

impl GetCalender {
    pub fn new(calender_service: Arc<CalenderService>) -> Self {
        Self { calender_service }
    }
}

#[async_trait]
impl Route for GetCalender {
    fn route(&self) -> &'static str {
        "GET /calender"
    }

    fn template(&self) -> Template {
        Template::Static("calender")
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        _request: &Request,
        context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        let download_url = self
            .calender_service
            .create_passport_expiration_calender()
            .await?;
        context.set_variable("downloadUrl", download_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{route_services, Mocks};
    use crate::web::Router;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_calender_page_links_presigned_url() {
        let mut mocks = Mocks::default();
        mocks.passports.expect_find_all().returning(|| Ok(vec![]));
        mocks.notifications.expect_find_all().returning(|| Ok(HashMap::new()));
        mocks.calendar_store.expect_put_calendar().returning(|_, _| Ok(()));
        mocks
            .calendar_store
            .expect_download_url()
            .returning(|_| Ok("https://bucket.example/ics/reminders.ics".to_string()));

        let services = route_services(mocks);
        let route: Arc<dyn Route> = Arc::new(GetCalender::new(services.calender_service));
        let router = Router::new(vec![route.clone()]);

        let response = router.process_request(route.as_ref(), Request::default()).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.path, "calender");
        assert!(response
            .body
            .unwrap()
            .contains("https://bucket.example/ics/reminders.ics"));
    }
}
