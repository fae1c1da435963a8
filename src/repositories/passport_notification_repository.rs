use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{optional_number_attribute, string_attribute, DynamoDbTable, Item};
use super::keys::{PartitionKey, PassportKey, SortKey};
use super::passport_repository::{key_item, PARTITION_ATTRIBUTE, SORT_ATTRIBUTE};
use crate::models::dates::{date_to_seconds, seconds_to_date};
use crate::models::RepositoryResult;

/// TTL attribute of the notification table
pub const EXPIRES_ATTRIBUTE: &str = "expires";

/// Reminder items keyed like their passport. DynamoDB expires an item on its
/// `expires` date, which is what triggers the reminder email.
#[async_trait]
pub trait PassportNotificationRepository: Send + Sync {
    async fn put(&self, passport_id: &str, notification_date: NaiveDate) -> RepositoryResult<()>;

    async fn get(&self, passport_id: &str) -> RepositoryResult<Option<NaiveDate>>;

    /// Reminder dates by passport ID
    async fn find_all(&self) -> RepositoryResult<HashMap<String, NaiveDate>>;

    async fn find_all_matching(&self, passport_id: &str) -> RepositoryResult<HashMap<String, NaiveDate>>;

    /// Remove a reminder without letting its TTL fire
    async fn delete(&self, passport_id: &str) -> RepositoryResult<()>;
}

pub struct DynamoDbPassportNotificationRepository {
    table: DynamoDbTable,
}

impl DynamoDbPassportNotificationRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            table: DynamoDbTable::new(client, table_name, region),
        }
    }

    pub fn notification_to_item(&self, key: &PassportKey, notification_date: Option<NaiveDate>) -> Item {
        let mut item = key_item(key);
        if let Some(date) = notification_date {
            item.insert(
                EXPIRES_ATTRIBUTE.to_string(),
                AttributeValue::N(date_to_seconds(date).to_string()),
            );
        }
        item
    }

    /// `None` when the item carries no reminder date
    pub fn item_to_notification(&self, item: &Item) -> RepositoryResult<Option<(String, NaiveDate)>> {
        let key = PassportKey::new(
            PartitionKey(string_attribute(item, PARTITION_ATTRIBUTE)?),
            SortKey(string_attribute(item, SORT_ATTRIBUTE)?),
        );
        Ok(optional_number_attribute(item, EXPIRES_ATTRIBUTE)?
            .map(|seconds| (key.id(), seconds_to_date(seconds))))
    }

    fn items_to_dates(&self, items: Vec<Item>) -> HashMap<String, NaiveDate> {
        let mut dates = HashMap::new();
        for item in items {
            match self.item_to_notification(&item) {
                Ok(Some((id, date))) => {
                    dates.insert(id, date);
                }
                Ok(None) => continue,
                Err(e) => warn!("Failed to parse notification item: {}", e),
            }
        }
        dates
    }

    async fn put_item(&self, item: Item) -> RepositoryResult<()> {
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
}

#[async_trait]
impl PassportNotificationRepository for DynamoDbPassportNotificationRepository {
    #[instrument(skip(self), fields(table = %self.table.table_name()))]
    async fn put(&self, passport_id: &str, notification_date: NaiveDate) -> RepositoryResult<()> {
        let key = PassportKey::from_id(passport_id)?;
        self.put_item(self.notification_to_item(&key, Some(notification_date)))
            .await?;
        info!("Reminder stored for {}", notification_date);
        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table.table_name()))]
    async fn get(&self, passport_id: &str) -> RepositoryResult<Option<NaiveDate>> {
        let key = PassportKey::from_id(passport_id)?;

        let response = async {
            let result = self
                .table
                .client()
                .get_item()
                .table_name(self.table.table_name())
                .set_key(Some(key_item(&key)))
                .send()
                .await;
            DynamoDbTable::record_outcome(&result);
            result.map_err(|e| self.table.map_error(e.into()))
        }
        .instrument(self.table.span("GetItem"))
        .await?;

        match response.item {
            Some(item) => Ok(self.item_to_notification(&item)?.map(|(_, date)| date)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(table = %self.table.table_name()))]
    async fn find_all(&self) -> RepositoryResult<HashMap<String, NaiveDate>> {
        let items = self.table.scan_all().await?;
        Ok(self.items_to_dates(items))
    }

    #[instrument(skip(self), fields(table = %self.table.table_name()))]
    async fn find_all_matching(&self, passport_id: &str) -> RepositoryResult<HashMap<String, NaiveDate>> {
        let key = PassportKey::from_id(passport_id)?;
        let items = self
            .table
            .query_partition(PARTITION_ATTRIBUTE, key.partition.as_str())
            .await?;
        Ok(self.items_to_dates(items))
    }

    #[instrument(skip(self), fields(table = %self.table.table_name()))]
    async fn delete(&self, passport_id: &str) -> RepositoryResult<()> {
        let key = PassportKey::from_id(passport_id)?;

        // Clear the TTL first so the removal below is not mistaken for an expiry
        self.put_item(self.notification_to_item(&key, None)).await?;

        async {
            let result = self
                .table
                .client()
                .delete_item()
                .table_name(self.table.table_name())
                .set_key(Some(key_item(&key)))
                .send()
                .await;
            DynamoDbTable::record_outcome(&result);
            result.map_err(|e| self.table.map_error(e.into()))
        }
        .instrument(self.table.span("DeleteItem"))
        .await?;

        info!("Reminder deleted");
        Ok(())
    }
}
