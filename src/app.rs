//! Wires configuration into the services behind each entrypoint.

use std::sync::Arc;
use tracing::info;

use crate::config::{Config, ConfigError};
use crate::lambda::{ApiGatewayEntrypoint, NotificationListenerEntrypoint};
use crate::repositories::{
    CognitoUserPoolRepository, DynamoDbNotificationEndpointRepository,
    DynamoDbPassportNotificationRepository, DynamoDbPassportRepository,
};
use crate::services::{
    Authenticator, CalenderService, CognitoService, CognitoSettings, EmailService,
    JwksTokenVerifier, NotificationEndpointService, NotificationService, PassportService,
    S3CalendarStore, SesEmailService, UserPoolService,
};
use crate::web::{all_routes, RouteServices, Router};

/// Services used by the website routes
pub async fn route_services(config: &Config) -> Result<RouteServices, ConfigError> {
    config.validate_for_website()?;

    let region = config.aws.region.clone();
    let dynamodb_client = Arc::new(config.aws.dynamodb_client.clone());
    let http_client = reqwest::Client::new();

    let passport_service = Arc::new(PassportService::new(
        Arc::new(DynamoDbPassportRepository::new(
            dynamodb_client.clone(),
            config.database.passport_table_name.clone(),
            region.clone(),
        )),
        Arc::new(DynamoDbPassportNotificationRepository::new(
            dynamodb_client.clone(),
            config.database.notification_table_name.clone(),
            region.clone(),
        )),
    ));

    let notification_endpoint_service = Arc::new(NotificationEndpointService::new(Arc::new(
        DynamoDbNotificationEndpointRepository::new(
            dynamodb_client,
            config.database.notification_endpoint_table_name.clone(),
            region.clone(),
        ),
    )));

    let user_pool_service = Arc::new(user_pool_service(config, &config.server.domain_name));

    let calender_service = Arc::new(CalenderService::new(
        passport_service.clone(),
        Arc::new(S3CalendarStore::new(
            Arc::new(config.aws.s3_client.clone()),
            config.calendar.ics_bucket_name.clone(),
            region.clone(),
        )),
    ));

    let verifier = Arc::new(JwksTokenVerifier::for_user_pool(
        http_client.clone(),
        &region,
        &config.cognito.user_pool_id,
        config.cognito.jwks_cache_ttl(),
    ));
    let authenticator: Arc<dyn Authenticator> = Arc::new(CognitoService::new(
        CognitoSettings {
            hosted_ui_url: config.cognito.hosted_ui_url(),
            client_id: config.cognito.client_id.clone(),
            client_secret: config.cognito_client_secret().await?,
            domain_name: config.server.domain_name.clone(),
        },
        http_client,
        verifier,
    ));

    info!(
        passports = %config.database.passport_table_name,
        notifications = %config.database.notification_table_name,
        endpoints = %config.database.notification_endpoint_table_name,
        "Website services initialized"
    );

    Ok(RouteServices {
        passport_service,
        notification_endpoint_service,
        user_pool_service,
        calender_service,
        authenticator,
        domain_name: config.server.domain_name.clone(),
    })
}

pub async fn api_gateway_entrypoint(config: &Config) -> Result<ApiGatewayEntrypoint, ConfigError> {
    let services = route_services(config).await?;
    Ok(ApiGatewayEntrypoint::new(
        Router::new(all_routes(&services)),
        services.authenticator.clone(),
    ))
}

pub fn notification_listener_entrypoint(
    config: &Config,
) -> Result<NotificationListenerEntrypoint, ConfigError> {
    config.validate_for_notifications()?;

    let email_service: Arc<dyn EmailService> = Arc::new(ses_email_service(config));
    let notification_service = NotificationService::new(
        email_service,
        Arc::new(user_pool_service(config, &config.email.email_domain)),
        Arc::new(DynamoDbPassportRepository::new(
            Arc::new(config.aws.dynamodb_client.clone()),
            config.database.passport_table_name.clone(),
            config.aws.region.clone(),
        )),
        config.email.email_name.clone(),
        config.email.email_domain.clone(),
    );

    info!(
        passports = %config.database.passport_table_name,
        sender = %format!("{}@{}", config.email.email_name, config.email.email_domain),
        "Notification services initialized"
    );

    Ok(NotificationListenerEntrypoint::new(Arc::new(
        notification_service,
    )))
}

fn ses_email_service(config: &Config) -> SesEmailService {
    SesEmailService::new(Arc::new(config.aws.ses_client.clone()), config.aws.region.clone())
}

fn user_pool_service(config: &Config, domain_name: &str) -> UserPoolService {
    UserPoolService::new(
        Arc::new(CognitoUserPoolRepository::new(
            Arc::new(config.aws.cognito_client.clone()),
            config.cognito.user_pool_id.clone(),
            config.aws.region.clone(),
        )),
        Arc::new(ses_email_service(config)),
        domain_name.to_string(),
    )
}
