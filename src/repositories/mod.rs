pub mod dynamodb;
pub mod keys;
pub mod notification_endpoint_repository;
pub mod passport_notification_repository;
pub mod passport_repository;
pub mod user_pool_repository;


pub use dynamodb::DynamoDbTable;
pub use keys::{PartitionKey, PassportKey, SortKey};
pub use notification_endpoint_repository::{
    DynamoDbNotificationEndpointRepository, NotificationEndpointRepository,
};
pub use passport_notification_repository::{
    DynamoDbPassportNotificationRepository, PassportNotificationRepository,
};
pub use passport_repository::{
    CreatePassportRequest, DynamoDbPassportRepository, EditPassportRequest, Passport,
    PassportRepository,
};
pub use user_pool_repository::{CognitoUserPoolRepository, PoolUser, UserPoolRepository};
