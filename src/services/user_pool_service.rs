use askama::Template;
use rand::seq::{IndexedRandom, SliceRandom};
use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    ServiceError, ServiceResult, UserView, ValidationError, EMAIL_ATTRIBUTE,
    EMAIL_ENABLED_ATTRIBUTE, OWNER_ATTRIBUTE,
};
use crate::repositories::{PoolUser, UserPoolRepository};
use crate::services::email_service::{EmailMessage, EmailService, ResetPasswordEmail};

const PASSWORD_LENGTH: usize = 14;
const UPPER_CASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER_CASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL_CHARS: &[u8] = b"!@#$%^&*()-_=+[]{}|;:'\",.<>?/`~";

/// Which user setting a toggle request changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAttribute {
    Email,
    Login,
}

impl UserAttribute {
    pub fn parse(attribute: &str) -> Result<Self, ValidationError> {
        match attribute {
            "email" => Ok(UserAttribute::Email),
            "login" => Ok(UserAttribute::Login),
            other => Err(ValidationError::InvalidAttribute {
                attribute: other.to_string(),
            }),
        }
    }
}

/// Accepts exactly `true` or `false`
pub fn parse_strict_bool(value: &str) -> Result<bool, ValidationError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ValidationError::InvalidAttributeValue {
            value: other.to_string(),
        }),
    }
}

/// Manages the household's users in the Cognito user pool
pub struct UserPoolService {
    repository: Arc<dyn UserPoolRepository>,
    email_service: Arc<dyn EmailService>,
    domain_name: String,
}

impl UserPoolService {
    pub fn new(
        repository: Arc<dyn UserPoolRepository>,
        email_service: Arc<dyn EmailService>,
        domain_name: String,
    ) -> Self {
        Self {
            repository,
            email_service,
            domain_name,
        }
    }

    /// All users, oldest first
    #[instrument(skip(self))]
    pub async fn list_all_users(&self) -> ServiceResult<Vec<UserView>> {
        let mut users = self.repository.list_users().await?;
        users.sort_by_key(|user| user.created_at);
        Ok(users.iter().map(to_user_view).collect())
    }

    #[instrument(skip(self))]
    pub async fn list_all_users_with_email_enabled(&self) -> ServiceResult<Vec<UserView>> {
        Ok(self
            .list_all_users()
            .await?
            .into_iter()
            .filter(|user| user.email_enabled)
            .collect())
    }

    /// Creates a user with email and login disabled
    #[instrument(skip(self, email))]
    pub async fn create_user(&self, email: &str) -> ServiceResult<()> {
        let username = self.repository.create_user(email).await?;
        self.enable_or_disable_user(&username, false).await?;
        crate::info_with_trace!(username = %username, "User created");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn toggle_user_attribute(
        &self,
        username: &str,
        attribute: &str,
        value: &str,
    ) -> ServiceResult<()> {
        let enabled = parse_strict_bool(value)?;

        match UserAttribute::parse(attribute)? {
            UserAttribute::Email => self.enable_or_disable_email(username, enabled).await,
            UserAttribute::Login => self.enable_or_disable_user(username, enabled).await,
        }
    }

    #[instrument(skip(self))]
    pub async fn enable_or_disable_email(&self, username: &str, enabled: bool) -> ServiceResult<()> {
        self.repository
            .update_attribute(username, EMAIL_ENABLED_ATTRIBUTE, &enabled.to_string())
            .await?;
        Ok(())
    }

    /// Enabling login also issues and emails a temporary password
    #[instrument(skip(self))]
    pub async fn enable_or_disable_user(&self, username: &str, enabled: bool) -> ServiceResult<()> {
        let user = self.deny_if_owner(username).await?;

        if !enabled {
            self.repository.disable_user(username).await?;
            return Ok(());
        }

        self.repository.enable_user(username).await?;

        let password = generate_random_password();
        self.repository
            .set_temporary_password(username, &password)
            .await?;

        let login_url = format!("https://{}", self.domain_name);
        let html_body = ResetPasswordEmail {
            temporary_password: &password,
            login_url: &login_url,
        }
        .render()?;

        self.email_service
            .send_email(EmailMessage {
                from: format!("no-reply@{}", self.domain_name),
                to: user.attribute(EMAIL_ATTRIBUTE).unwrap_or_default().to_string(),
                source: "Reset Password".to_string(),
                subject: "PassHelper Temporary Password".to_string(),
                html_body,
            })
            .await?;

        crate::info_with_trace!(username = %username, "Login enabled");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, username: &str) -> ServiceResult<()> {
        self.deny_if_owner(username).await?;
        self.repository.delete_user(username).await?;
        Ok(())
    }

    async fn deny_if_owner(&self, username: &str) -> ServiceResult<PoolUser> {
        let user = self.repository.get_user(username).await?;
        if user.is_owner() {
            return Err(ServiceError::display("Can not modify user"));
        }
        Ok(user)
    }
}

fn to_user_view(user: &PoolUser) -> UserView {
    UserView {
        username: user.username.clone(),
        email_address: user.attribute(EMAIL_ATTRIBUTE).unwrap_or_default().to_string(),
        email_enabled: user.has_attribute_set_to_true(EMAIL_ENABLED_ATTRIBUTE),
        owner: user.has_attribute_set_to_true(OWNER_ATTRIBUTE),
        login_enabled: user.enabled,
    }
}

/// Random password with at least one character of each required class
pub fn generate_random_password() -> String {
    let mut rng = rand::rng();
    let all: Vec<u8> = [UPPER_CASE, LOWER_CASE, DIGITS, SPECIAL_CHARS].concat();

    let mut password: Vec<u8> = [UPPER_CASE, LOWER_CASE, DIGITS, SPECIAL_CHARS]
        .iter()
        .filter_map(|class| class.choose(&mut rng).copied())
        .collect();
    while password.len() < PASSWORD_LENGTH {
        if let Some(c) = all.choose(&mut rng) {
            password.push(*c);
        }
    }
    password.shuffle(&mut rng);

    password.into_iter().map(char::from).collect()
}
