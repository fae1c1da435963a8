use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::types::{
    AttributeType, DeliveryMediumType, MessageActionType, UserType,
};
use aws_sdk_cognitoidentityprovider::{Client as CognitoClient, Error as CognitoError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, Instrument};

use crate::models::{
    RepositoryError, RepositoryResult, EMAIL_ATTRIBUTE, EMAIL_ENABLED_ATTRIBUTE,
    EMAIL_VERIFIED_ATTRIBUTE, OWNER_ATTRIBUTE,
};

/// A user as stored in the Cognito user pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolUser {
    pub username: String,
    pub created_at: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub attributes: HashMap<String, String>,
}

impl PoolUser {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Case-insensitive `true` check used for display flags
    pub fn has_attribute_set_to_true(&self, name: &str) -> bool {
        self.attribute(name)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    /// Owners are marked with exactly `true`
    pub fn is_owner(&self) -> bool {
        self.attribute(OWNER_ATTRIBUTE) == Some("true")
    }
}

/// Cognito admin operations on the user pool
#[async_trait]
pub trait UserPoolRepository: Send + Sync {
    async fn list_users(&self) -> RepositoryResult<Vec<PoolUser>>;

    async fn get_user(&self, username: &str) -> RepositoryResult<PoolUser>;

    /// Create a user without sending Cognito's invitation, returning its username
    async fn create_user(&self, email: &str) -> RepositoryResult<String>;

    async fn update_attribute(&self, username: &str, name: &str, value: &str) -> RepositoryResult<()>;

    async fn enable_user(&self, username: &str) -> RepositoryResult<()>;

    async fn disable_user(&self, username: &str) -> RepositoryResult<()>;

    async fn set_temporary_password(&self, username: &str, password: &str) -> RepositoryResult<()>;

    async fn delete_user(&self, username: &str) -> RepositoryResult<()>;
}

pub struct CognitoUserPoolRepository {
    client: Arc<CognitoClient>,
    user_pool_id: String,
    region: String,
}

impl CognitoUserPoolRepository {
    pub fn new(client: Arc<CognitoClient>, user_pool_id: String, region: String) -> Self {
        Self {
            client,
            user_pool_id,
            region,
        }
    }

    fn create_cognito_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "CognitoIdentityProvider",
            "aws.service" = "CognitoIdentityProvider",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.remote.service" = "AWS::Cognito",
            "aws.remote.operation" = operation,
            "aws.remote.resource.type" = "AWS::Cognito::UserPool",
            "aws.remote.resource.identifier" = %self.user_pool_id,
            "otel.kind" = "client",
            "otel.name" = format!("CognitoIdentityProvider.{}", operation),
            "rpc.system" = "aws-api",
            "rpc.service" = "AWSCognitoIdentityProviderService",
            "rpc.method" = operation,
        )
    }

    fn map_cognito_error(&self, error: CognitoError) -> RepositoryError {
        error!("Cognito error: {:?}", error);

        match error {
            CognitoError::UserNotFoundException(_) => RepositoryError::NotFound {
                message: "User not found".to_string(),
            },
            CognitoError::UsernameExistsException(_) => RepositoryError::AlreadyExists {
                message: "This user already exists".to_string(),
            },
            other => RepositoryError::AwsSdk {
                message: other.to_string(),
            },
        }
    }

    pub fn user_type_to_pool_user(user: &UserType) -> PoolUser {
        PoolUser {
            username: user.username().unwrap_or_default().to_string(),
            created_at: user.user_create_date().and_then(smithy_to_chrono),
            enabled: user.enabled(),
            attributes: attributes_to_map(user.attributes()),
        }
    }
}

fn attribute(name: &str, value: &str) -> RepositoryResult<AttributeType> {
    AttributeType::builder()
        .name(name)
        .value(value)
        .build()
        .map_err(|e| RepositoryError::AwsSdk {
            message: e.to_string(),
        })
}

fn attributes_to_map(attributes: &[AttributeType]) -> HashMap<String, String> {
    attributes
        .iter()
        .filter_map(|a| a.value().map(|v| (a.name().to_string(), v.to_string())))
        .collect()
}

fn smithy_to_chrono(date: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(date.secs(), date.subsec_nanos())
}

#[async_trait]
impl UserPoolRepository for CognitoUserPoolRepository {
    #[instrument(skip(self), fields(user_pool = %self.user_pool_id))]
    async fn list_users(&self) -> RepositoryResult<Vec<PoolUser>> {
        let mut users = Vec::new();
        let mut pagination_token: Option<String> = None;

        loop {
            let response = async {
                self.client
                    .list_users()
                    .user_pool_id(&self.user_pool_id)
                    .set_pagination_token(pagination_token.take())
                    .send()
                    .await
                    .map_err(|e| self.map_cognito_error(e.into()))
            }
            .instrument(self.create_cognito_span("ListUsers"))
            .await?;

            users.extend(response.users().iter().map(Self::user_type_to_pool_user));

            match response.pagination_token() {
                Some(token) if !token.is_empty() => pagination_token = Some(token.to_string()),
                _ => break,
            }
        }

        info!("Found {} users", users.len());
        Ok(users)
    }

    #[instrument(skip(self), fields(user_pool = %self.user_pool_id))]
    async fn get_user(&self, username: &str) -> RepositoryResult<PoolUser> {
        let response = async {
            self.client
                .admin_get_user()
                .user_pool_id(&self.user_pool_id)
                .username(username)
                .send()
                .await
                .map_err(|e| self.map_cognito_error(e.into()))
        }
        .instrument(self.create_cognito_span("AdminGetUser"))
        .await?;

        Ok(PoolUser {
            username: response.username().to_string(),
            created_at: response.user_create_date().and_then(smithy_to_chrono),
            enabled: response.enabled(),
            attributes: attributes_to_map(response.user_attributes()),
        })
    }

    #[instrument(skip(self, email), fields(user_pool = %self.user_pool_id))]
    async fn create_user(&self, email: &str) -> RepositoryResult<String> {
        let attributes = vec![
            attribute(EMAIL_ATTRIBUTE, email)?,
            attribute(EMAIL_ENABLED_ATTRIBUTE, "false")?,
            attribute(EMAIL_VERIFIED_ATTRIBUTE, "true")?,
        ];

        let response = async {
            self.client
                .admin_create_user()
                .user_pool_id(&self.user_pool_id)
                .username(email)
                .desired_delivery_mediums(DeliveryMediumType::Email)
                .message_action(MessageActionType::Suppress)
                .set_user_attributes(Some(attributes))
                .send()
                .await
                .map_err(|e| self.map_cognito_error(e.into()))
        }
        .instrument(self.create_cognito_span("AdminCreateUser"))
        .await?;

        let username = response
            .user()
            .and_then(|user| user.username())
            .unwrap_or(email)
            .to_string();
        info!("User created");
        Ok(username)
    }

    #[instrument(skip(self), fields(user_pool = %self.user_pool_id))]
    async fn update_attribute(&self, username: &str, name: &str, value: &str) -> RepositoryResult<()> {
        let attribute = attribute(name, value)?;

        async {
            self.client
                .admin_update_user_attributes()
                .user_pool_id(&self.user_pool_id)
                .username(username)
                .user_attributes(attribute)
                .send()
                .await
                .map_err(|e| self.map_cognito_error(e.into()))
        }
        .instrument(self.create_cognito_span("AdminUpdateUserAttributes"))
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(user_pool = %self.user_pool_id))]
    async fn enable_user(&self, username: &str) -> RepositoryResult<()> {
        async {
            self.client
                .admin_enable_user()
                .user_pool_id(&self.user_pool_id)
                .username(username)
                .send()
                .await
                .map_err(|e| self.map_cognito_error(e.into()))
        }
        .instrument(self.create_cognito_span("AdminEnableUser"))
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(user_pool = %self.user_pool_id))]
    async fn disable_user(&self, username: &str) -> RepositoryResult<()> {
        async {
            self.client
                .admin_disable_user()
                .user_pool_id(&self.user_pool_id)
                .username(username)
                .send()
                .await
                .map_err(|e| self.map_cognito_error(e.into()))
        }
        .instrument(self.create_cognito_span("AdminDisableUser"))
        .await?;

        Ok(())
    }

    #[instrument(skip(self, password), fields(user_pool = %self.user_pool_id))]
    async fn set_temporary_password(&self, username: &str, password: &str) -> RepositoryResult<()> {
        async {
            self.client
                .admin_set_user_password()
                .user_pool_id(&self.user_pool_id)
                .username(username)
                .password(password)
                .permanent(false)
                .send()
                .await
                .map_err(|e| self.map_cognito_error(e.into()))
        }
        .instrument(self.create_cognito_span("AdminSetUserPassword"))
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(user_pool = %self.user_pool_id))]
    async fn delete_user(&self, username: &str) -> RepositoryResult<()> {
        async {
            self.client
                .admin_delete_user()
                .user_pool_id(&self.user_pool_id)
                .username(username)
                .send()
                .await
                .map_err(|e| self.map_cognito_error(e.into()))
        }
        .instrument(self.create_cognito_span("AdminDeleteUser"))
        .await?;

        info!("User deleted");
        Ok(())
    }
}
