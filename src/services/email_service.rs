//! Outgoing email: askama HTML bodies delivered through SES.

use askama::Template;
use async_trait::async_trait;
use aws_sdk_ses::types::{Body, Content, Destination, Message};
use aws_sdk_ses::Client as SesClient;
use std::sync::Arc;
use tracing::{error, info, instrument, Instrument};

use crate::models::{ExpiringPassportEmailView, ServiceError, ServiceResult};

const CHARSET: &str = "UTF-8";

/// Renewal reminder for one passport
#[derive(Template)]
#[template(path = "emails/reminder.html")]
pub struct ReminderEmail<'a> {
    pub expiring_passport: &'a ExpiringPassportEmailView,
}

/// Temporary password sent when login is enabled for a user
#[derive(Template)]
#[template(path = "emails/reset.html")]
pub struct ResetPasswordEmail<'a> {
    pub temporary_password: &'a str,
    pub login_url: &'a str,
}

/// A rendered email ready to be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    /// Shown after the product name in the sender display name
    pub source: String,
    pub subject: String,
    pub html_body: String,
}

impl EmailMessage {
    /// `"PassHelper - {source}" <{from}>`
    pub fn source_header(&self) -> String {
        format!("\"PassHelper - {}\" <{}>", self.source, self.from)
    }
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send_email(&self, message: EmailMessage) -> ServiceResult<()>;
}

pub struct SesEmailService {
    client: Arc<SesClient>,
    region: String,
}

impl SesEmailService {
    pub fn new(client: Arc<SesClient>, region: String) -> Self {
        Self { client, region }
    }

    fn create_ses_span(&self) -> tracing::Span {
        tracing::info_span!(
            "SES",
            "aws.service" = "SES",
            "aws.operation" = "SendEmail",
            "aws.region" = %self.region,
            "aws.remote.service" = "AWS::SES",
            "aws.remote.operation" = "SendEmail",
            "otel.kind" = "client",
            "otel.name" = "SES.SendEmail",
            "rpc.system" = "aws-api",
            "rpc.service" = "AmazonSimpleEmailService",
            "rpc.method" = "SendEmail",
        )
    }
}

fn utf8_content(data: &str) -> ServiceResult<Content> {
    Content::builder()
        .data(data)
        .charset(CHARSET)
        .build()
        .map_err(|e| ServiceError::external("ses", e))
}

#[async_trait]
impl EmailService for SesEmailService {
    #[instrument(skip(self, message), fields(subject = %message.subject))]
    async fn send_email(&self, message: EmailMessage) -> ServiceResult<()> {
        let ses_message = Message::builder()
            .subject(utf8_content(&message.subject)?)
            .body(Body::builder().html(utf8_content(&message.html_body)?).build())
            .build();

        let response = async {
            self.client
                .send_email()
                .source(message.source_header())
                .destination(Destination::builder().to_addresses(&message.to).build())
                .message(ses_message)
                .send()
                .await
                .map_err(|e| {
                    let e = aws_sdk_ses::Error::from(e);
                    error!("SES error: {:?}", e);
                    ServiceError::external("ses", e)
                })
        }
        .instrument(self.create_ses_span())
        .await?;

        info!(message_id = %response.message_id(), "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_source_header() {
        let message = EmailMessage {
            from: "no-reply@passhelper.example".to_string(),
            to: "jane@example.com".to_string(),
            source: "Passport Renewal Reminder".to_string(),
            subject: "subject".to_string(),
            html_body: String::new(),
        };
        assert_eq!(
            message.source_header(),
            "\"PassHelper - Passport Renewal Reminder\" <no-reply@passhelper.example>"
        );
    }

    #[test]
    fn test_reminder_template_renders_passport() {
        let view = ExpiringPassportEmailView {
            full_name: "Jane Doe".to_string(),
            country_name: "Canada".to_string(),
            issued_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            expires_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            url: "https://passhelper.example".to_string(),
        };

        let html = ReminderEmail {
            expiring_passport: &view,
        }
        .render()
        .unwrap();

        assert!(html.contains("Jane Doe"));
        assert!(html.contains("Canada"));
        assert!(html.contains("2030-01-01"));
        assert!(html.contains("https://passhelper.example"));
    }

    #[test]
    fn test_reset_template_renders_password() {
        let html = ResetPasswordEmail {
            temporary_password: "Abc123!xyz",
            login_url: "https://passhelper.example",
        }
        .render()
        .unwrap();

        assert!(html.contains("Abc123!xyz"));
        assert!(html.contains("https://passhelper.example"));
    }
}
