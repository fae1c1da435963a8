use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{string_attribute, DynamoDbTable, Item};
use crate::models::RepositoryResult;

const TYPE_ATTRIBUTE: &str = "type";
const VALUE_ATTRIBUTE: &str = "value";
const EMAIL_TYPE: &str = "email";

#[async_trait]
pub trait NotificationEndpointRepository: Send + Sync {
    async fn find_all_emails(&self) -> RepositoryResult<Vec<String>>;

    async fn add_email(&self, email: &str) -> RepositoryResult<()>;

    async fn delete_email(&self, email: &str) -> RepositoryResult<()>;
}

pub struct DynamoDbNotificationEndpointRepository {
    table: DynamoDbTable,
}

impl DynamoDbNotificationEndpointRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            table: DynamoDbTable::new(client, table_name, region),
        }
    }

    pub fn email_to_item(&self, email: &str) -> Item {
        let mut item = Item::new();
        item.insert(
            TYPE_ATTRIBUTE.to_string(),
            AttributeValue::S(EMAIL_TYPE.to_string()),
        );
        item.insert(
            VALUE_ATTRIBUTE.to_string(),
            AttributeValue::S(email.to_lowercase()),
        );
        item
    }
}

#[async_trait]
impl NotificationEndpointRepository for DynamoDbNotificationEndpointRepository {
    #[instrument(skip(self), fields(table = %self.table.table_name()))]
    async fn find_all_emails(&self) -> RepositoryResult<Vec<String>> {
        let items = self
            .table
            .query_partition(TYPE_ATTRIBUTE, EMAIL_TYPE)
            .await?;

        let emails: Vec<String> = items
            .iter()
            .filter_map(|item| match string_attribute(item, VALUE_ATTRIBUTE) {
                Ok(email) => Some(email),
                Err(e) => {
                    warn!("Failed to parse notification endpoint: {}", e);
                    None
                }
            })
            .collect();

        info!("Found {} notification emails", emails.len());
        Ok(emails)
    }

    #[instrument(skip(self), fields(table = %self.table.table_name()))]
    async fn add_email(&self, email: &str) -> RepositoryResult<()> {
        let item = self.email_to_item(email);

        async {
            let result = self
                .table
                .client()
                .put_item()
                .table_name(self.table.table_name())
                .set_item(Some(item))
                .send()
                .await;
            DynamoDbTable::record_outcome(&result);
            result.map_err(|e| self.table.map_error(e.into()))
        }
        .instrument(self.table.span("PutItem"))
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table.table_name()))]
    async fn delete_email(&self, email: &str) -> RepositoryResult<()> {
        let key = self.email_to_item(email);

        async {
            let result = self
                .table
                .client()
                .delete_item()
                .table_name(self.table.table_name())
                .set_key(Some(key))
                .send()
                .await;
            DynamoDbTable::record_outcome(&result);
            result.map_err(|e| self.table.map_error(e.into()))
        }
        .instrument(self.table.span("DeleteItem"))
        .await?;

        Ok(())
    }
}
