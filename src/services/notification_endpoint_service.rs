use std::sync::Arc;
use tracing::instrument;

use crate::models::{NotificationEndpointView, RepositoryError, ServiceResult};
use crate::repositories::keys::{email_from_endpoint_id, endpoint_id};
use crate::repositories::NotificationEndpointRepository;

/// Email addresses registered to receive renewal reminders
pub struct NotificationEndpointService {
    repository: Arc<dyn NotificationEndpointRepository>,
}

impl NotificationEndpointService {
    pub fn new(repository: Arc<dyn NotificationEndpointRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self))]
    pub async fn find_all_emails(&self) -> ServiceResult<Vec<NotificationEndpointView>> {
        let emails = self.repository.find_all_emails().await?;
        Ok(emails
            .into_iter()
            .map(|email| NotificationEndpointView {
                id: endpoint_id(&email),
                email,
            })
            .collect())
    }

    #[instrument(skip(self, email))]
    pub async fn add_email(&self, email: &str) -> ServiceResult<()> {
        self.repository.add_email(&email.to_lowercase()).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_email(&self, id: &str) -> ServiceResult<()> {
        let email = email_from_endpoint_id(id).map_err(RepositoryError::from)?;
        self.repository.delete_email(&email).await?;
        Ok(())
    }
}
