use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::lambda::events::{DynamoDbEvent, DynamoDbEventRecord};
use crate::models::ServiceResult;
use crate::repositories::{PartitionKey, SortKey};
use crate::services::NotificationService;

const REMOVE_EVENT: &str = "REMOVE";
const SERVICE_IDENTITY: &str = "Service";
const DYNAMODB_PRINCIPAL: &str = "dynamodb.amazonaws.com";

pub const OK: &str = "OK";

/// Key attributes of a notification table item
#[derive(Debug, Deserialize)]
struct NotificationKeys {
    name: String,
    identifier: String,
}

/// Turns TTL expiries on the notification table into reminder emails
pub struct NotificationListenerEntrypoint {
    notification_service: Arc<NotificationService>,
}

impl NotificationListenerEntrypoint {
    pub fn new(notification_service: Arc<NotificationService>) -> Self {
        Self {
            notification_service,
        }
    }

    #[instrument(skip_all)]
    pub async fn handle_request(&self, event: DynamoDbEvent) -> ServiceResult<&'static str> {
        debug!(records = event.records.len(), "Stream batch received");

        for record in &event.records {
            if let Some((partition, sort)) = ttl_expiry_key(record) {
                self.notification_service.send(&partition, &sort).await?;
            }
        }
        Ok(OK)
    }
}

/// The passport key of a record, if it is a TTL removal from the
/// notification table
pub fn ttl_expiry_key(record: &DynamoDbEventRecord) -> Option<(PartitionKey, SortKey)> {
    if record.event_name != REMOVE_EVENT || !is_ttl_triggered(record) {
        return None;
    }

    let keys: NotificationKeys = match serde_dynamo::from_item(record.change.keys.clone()) {
        Ok(keys) => keys,
        Err(e) => {
            warn!("Skipping TTL removal with unreadable keys: {}", e);
            return None;
        }
    };
    if keys.name.is_empty() || keys.identifier.is_empty() {
        warn!("Skipping TTL removal with an empty key");
        return None;
    }

    Some((PartitionKey(keys.name), SortKey(keys.identifier)))
}

fn is_ttl_triggered(record: &DynamoDbEventRecord) -> bool {
    record.user_identity.as_ref().is_some_and(|identity| {
        identity.type_.eq_ignore_ascii_case(SERVICE_IDENTITY)
            && identity.principal_id.eq_ignore_ascii_case(DYNAMODB_PRINCIPAL)
    })
}
