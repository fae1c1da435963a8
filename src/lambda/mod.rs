//! Lambda entrypoints: the website behind API Gateway and the reminder
//! listener on the notification table stream.

pub mod api_gateway;
pub mod events;
pub mod notification_listener;

pub use api_gateway::ApiGatewayEntrypoint;
pub use events::{ApiGatewayV2httpRequest, ApiGatewayV2httpResponse, DynamoDbEvent};
pub use notification_listener::NotificationListenerEntrypoint;
