// Services module - business logic layer

pub mod calender_service;
pub mod cognito_service;
pub mod email_service;
pub mod notification_endpoint_service;
pub mod notification_service;
pub mod passport_service;
pub mod user_pool_service;

pub use calender_service::{CalendarStore, CalenderService, S3CalendarStore};
pub use cognito_service::{
    Authenticator, CognitoService, CognitoSettings, JwksTokenVerifier, Jwt, TokenVerifier,
};
pub use email_service::{EmailMessage, EmailService, SesEmailService};
pub use notification_endpoint_service::NotificationEndpointService;
pub use notification_service::NotificationService;
pub use passport_service::PassportService;
pub use user_pool_service::UserPoolService;
