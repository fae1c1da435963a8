use askama::Template;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::models::{country_code_to_country_name, ExpiringPassportEmailView, ServiceResult};
use crate::repositories::{PartitionKey, Passport, PassportRepository, SortKey};
use crate::services::email_service::{EmailMessage, EmailService, ReminderEmail};
use crate::services::user_pool_service::UserPoolService;

/// Sends renewal reminders once a passport's reminder item expires
pub struct NotificationService {
    email_service: Arc<dyn EmailService>,
    user_pool_service: Arc<UserPoolService>,
    passport_repository: Arc<dyn PassportRepository>,
    email_name: String,
    domain: String,
}

impl NotificationService {
    pub fn new(
        email_service: Arc<dyn EmailService>,
        user_pool_service: Arc<UserPoolService>,
        passport_repository: Arc<dyn PassportRepository>,
        email_name: String,
        domain: String,
    ) -> Self {
        Self {
            email_service,
            user_pool_service,
            passport_repository,
            email_name,
            domain,
        }
    }

    /// Emails every user with reminders enabled about one passport
    #[instrument(skip(self, partition, sort), fields(partition = %partition, sort = %sort))]
    pub async fn send(&self, partition: &PartitionKey, sort: &SortKey) -> ServiceResult<()> {
        let Some(passport) = self.passport_repository.find(partition, sort).await? else {
            debug!("Passport no longer exists, skipping reminder");
            return Ok(());
        };

        let recipients = self.user_pool_service.list_all_users_with_email_enabled().await?;
        let view = self.to_view(&passport);
        let html_body = ReminderEmail {
            expiring_passport: &view,
        }
        .render()?;

        for recipient in &recipients {
            self.email_service
                .send_email(EmailMessage {
                    from: format!("{}@{}", self.email_name, self.domain),
                    to: recipient.email_address.clone(),
                    source: "Passport Renewal Reminder".to_string(),
                    subject: subject(&passport),
                    html_body: html_body.clone(),
                })
                .await?;
        }

        crate::info_with_trace!(recipients = recipients.len(), "Renewal reminder sent");
        Ok(())
    }

    fn to_view(&self, passport: &Passport) -> ExpiringPassportEmailView {
        ExpiringPassportEmailView {
            full_name: passport.full_name(),
            country_name: country_code_to_country_name(&passport.country_code),
            issued_date: passport.issued,
            expires_date: passport.expires,
            url: format!("https://{}", self.domain),
        }
    }
}

fn subject(passport: &Passport) -> String {
    format!("It's time to renew your passport {}!", passport.first_name)
}
