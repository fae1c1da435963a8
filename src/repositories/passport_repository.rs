use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, ReturnValue, TransactWriteItem};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{number_attribute, string_attribute, DynamoDbTable, Item};
use super::keys::{PartitionKey, PassportKey, SortKey};
use crate::models::dates::{date_to_millis, millis_to_date};
use crate::models::{RepositoryError, RepositoryResult};

pub const PARTITION_ATTRIBUTE: &str = "name";
pub const SORT_ATTRIBUTE: &str = "identifier";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePassportRequest {
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub number: String,
    pub country_code: String,
    pub issued: NaiveDate,
    pub expires: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPassportRequest {
    pub first_name: String,
    pub last_name: String,
    pub number: String,
    pub issued: NaiveDate,
    pub expires: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passport {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub number: String,
    pub country_code: String,
    pub issued: NaiveDate,
    pub expires: NaiveDate,
}

impl Passport {
    pub fn key(&self) -> PassportKey {
        PassportKey::for_passport(&self.first_name, &self.last_name, &self.country_code, &self.number)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl CreatePassportRequest {
    fn into_passport(self) -> Passport {
        let key = PassportKey::for_passport(&self.first_name, &self.last_name, &self.country_code, &self.number);
        Passport {
            id: key.id(),
            first_name: self.first_name,
            last_name: self.last_name,
            dob: self.dob,
            number: self.number,
            country_code: self.country_code,
            issued: self.issued,
            expires: self.expires,
        }
    }
}

impl EditPassportRequest {
    /// Applies the edit on top of `existing`; country and date of birth are kept
    pub fn merge_with(self, existing: &Passport) -> Passport {
        let key = PassportKey::for_passport(&self.first_name, &self.last_name, &existing.country_code, &self.number);
        Passport {
            id: key.id(),
            first_name: self.first_name,
            last_name: self.last_name,
            dob: existing.dob,
            number: self.number,
            country_code: existing.country_code.clone(),
            issued: self.issued,
            expires: self.expires,
        }
    }
}

/// Trait defining the interface for passport data access operations
#[async_trait]
pub trait PassportRepository: Send + Sync {
    /// Store a new passport, returning its ID
    async fn save(&self, request: CreatePassportRequest) -> RepositoryResult<String>;

    /// Apply an edit, returning the possibly changed ID
    async fn update(&self, id: &str, request: EditPassportRequest) -> RepositoryResult<String>;

    async fn find(&self, partition: &PartitionKey, sort: &SortKey) -> RepositoryResult<Option<Passport>>;

    async fn get(&self, id: &str) -> RepositoryResult<Passport>;

    /// Delete a passport, returning the removed item if there was one
    async fn delete(&self, id: &str) -> RepositoryResult<Option<Passport>>;

    async fn find_all(&self) -> RepositoryResult<Vec<Passport>>;

    /// All passports of the person owning `id`
    async fn find_all_matching(&self, id: &str) -> RepositoryResult<Vec<Passport>>;
}

/// DynamoDB implementation of the PassportRepository trait
pub struct DynamoDbPassportRepository {
    table: DynamoDbTable,
}

impl DynamoDbPassportRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            table: DynamoDbTable::new(client, table_name, region),
        }
    }

    pub fn table_name(&self) -> &str {
        self.table.table_name()
    }

    /// Convert a passport to DynamoDB attribute values
    pub fn passport_to_item(&self, passport: &Passport) -> Item {
        let key = passport.key();
        let mut item = key_item(&key);

        item.insert("number".to_string(), AttributeValue::S(passport.number.clone()));
        item.insert(
            "countryCode".to_string(),
            AttributeValue::S(passport.country_code.clone()),
        );
        item.insert(
            "firstName".to_string(),
            AttributeValue::S(passport.first_name.clone()),
        );
        item.insert(
            "lastName".to_string(),
            AttributeValue::S(passport.last_name.clone()),
        );
        item.insert(
            "dob".to_string(),
            AttributeValue::N(date_to_millis(passport.dob).to_string()),
        );
        item.insert(
            "issued".to_string(),
            AttributeValue::N(date_to_millis(passport.issued).to_string()),
        );
        item.insert(
            "expires".to_string(),
            AttributeValue::N(date_to_millis(passport.expires).to_string()),
        );

        item
    }

    /// Convert a DynamoDB item to a passport. The ID comes from the stored keys.
    pub fn item_to_passport(&self, item: &Item) -> RepositoryResult<Passport> {
        let key = PassportKey::new(
            PartitionKey(string_attribute(item, PARTITION_ATTRIBUTE)?),
            SortKey(string_attribute(item, SORT_ATTRIBUTE)?),
        );

        Ok(Passport {
            id: key.id(),
            first_name: string_attribute(item, "firstName")?,
            last_name: string_attribute(item, "lastName")?,
            dob: millis_to_date(number_attribute(item, "dob")?),
            number: string_attribute(item, "number")?,
            country_code: string_attribute(item, "countryCode")?,
            issued: millis_to_date(number_attribute(item, "issued")?),
            expires: millis_to_date(number_attribute(item, "expires")?),
        })
    }

    fn items_to_passports(&self, items: Vec<Item>) -> Vec<Passport> {
        let mut passports = Vec::with_capacity(items.len());
        for item in items {
            match self.item_to_passport(&item) {
                Ok(passport) => passports.push(passport),
                Err(e) => {
                    warn!("Failed to parse passport item: {}", e);
                    continue;
                }
            }
        }
        passports
    }

    async fn get_item(&self, key: &PassportKey) -> RepositoryResult<Option<Passport>> {
        let response = async {
            let result = self
                .table
                .client()
                .get_item()
                .table_name(self.table.table_name())
                .set_key(Some(key_item(key)))
                .send()
                .await;
            DynamoDbTable::record_outcome(&result);
            result.map_err(|e| self.table.map_error(e.into()))
        }
        .instrument(self.table.span("GetItem"))
        .await?;

        response
            .item
            .map(|item| self.item_to_passport(&item))
            .transpose()
    }

    async fn put_item(&self, passport: &Passport, must_not_exist: bool) -> RepositoryResult<()> {
        let item = self.passport_to_item(passport);

        async {
            let mut request = self
                .table
                .client()
                .put_item()
                .table_name(self.table.table_name())
                .set_item(Some(item));

            if must_not_exist {
                request = request
                    .condition_expression("attribute_not_exists(#pk) AND attribute_not_exists(#sk)")
                    .expression_attribute_names("#pk", PARTITION_ATTRIBUTE)
                    .expression_attribute_names("#sk", SORT_ATTRIBUTE);
            }

            let result = request.send().await;
            DynamoDbTable::record_outcome(&result);
            result.map_err(|e| match DynamoDbError::from(e) {
                DynamoDbError::ConditionalCheckFailedException(_) => RepositoryError::AlreadyExists {
                    message: "This passport already exists".to_string(),
                },
                other => self.table.map_error(other),
            })
        }
        .instrument(self.table.span("PutItem"))
        .await?;

        Ok(())
    }

    async fn replace_item(&self, old_key: &PassportKey, passport: &Passport) -> RepositoryResult<()> {
        let delete = Delete::builder()
            .table_name(self.table.table_name())
            .set_key(Some(key_item(old_key)))
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: e.to_string(),
            })?;
        let put = Put::builder()
            .table_name(self.table.table_name())
            .set_item(Some(self.passport_to_item(passport)))
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: e.to_string(),
            })?;

        async {
            let result = self
                .table
                .client()
                .transact_write_items()
                .transact_items(TransactWriteItem::builder().delete(delete).build())
                .transact_items(TransactWriteItem::builder().put(put).build())
                .send()
                .await;
            DynamoDbTable::record_outcome(&result);
            result.map_err(|e| self.table.map_error(e.into()))
        }
        .instrument(self.table.span("TransactWriteItems"))
        .await?;

        Ok(())
    }
}

/// The primary key attributes of a passport-keyed item
pub fn key_item(key: &PassportKey) -> Item {
    let mut item = Item::new();
    item.insert(
        PARTITION_ATTRIBUTE.to_string(),
        AttributeValue::S(key.partition.as_str().to_string()),
    );
    item.insert(
        SORT_ATTRIBUTE.to_string(),
        AttributeValue::S(key.sort.as_str().to_string()),
    );
    item
}

fn not_found() -> RepositoryError {
    RepositoryError::NotFound {
        message: "Passport not found".to_string(),
    }
}

#[async_trait]
impl PassportRepository for DynamoDbPassportRepository {
    #[instrument(skip(self, request), fields(table = %self.table.table_name()))]
    async fn save(&self, request: CreatePassportRequest) -> RepositoryResult<String> {
        info!("Saving new passport");

        let passport = request.into_passport();
        self.put_item(&passport, true).await?;

        info!("Passport saved successfully");
        Ok(passport.id)
    }

    #[instrument(skip(self, request), fields(table = %self.table.table_name(), id = %id))]
    async fn update(&self, id: &str, request: EditPassportRequest) -> RepositoryResult<String> {
        info!("Updating passport");

        let old_key = PassportKey::from_id(id)?;
        let existing = self.get_item(&old_key).await?.ok_or_else(not_found)?;
        let updated = request.merge_with(&existing);

        if updated.key() != old_key {
            info!("Passport key changed, replacing item");
            self.replace_item(&old_key, &updated).await?;
        } else {
            self.put_item(&updated, false).await?;
        }

        info!("Passport updated successfully");
        Ok(updated.id)
    }

    #[instrument(skip(self), fields(table = %self.table.table_name(), partition = %partition, sort = %sort))]
    async fn find(&self, partition: &PartitionKey, sort: &SortKey) -> RepositoryResult<Option<Passport>> {
        info!("Finding passport by key");
        self.get_item(&PassportKey::new(partition.clone(), sort.clone()))
            .await
    }

    #[instrument(skip(self), fields(table = %self.table.table_name(), id = %id))]
    async fn get(&self, id: &str) -> RepositoryResult<Passport> {
        let key = PassportKey::from_id(id)?;
        self.get_item(&key).await?.ok_or_else(not_found)
    }

    #[instrument(skip(self), fields(table = %self.table.table_name(), id = %id))]
    async fn delete(&self, id: &str) -> RepositoryResult<Option<Passport>> {
        info!("Deleting passport");

        let key = PassportKey::from_id(id)?;
        let response = async {
            let result = self
                .table
                .client()
                .delete_item()
                .table_name(self.table.table_name())
                .set_key(Some(key_item(&key)))
                .return_values(ReturnValue::AllOld)
                .send()
                .await;
            DynamoDbTable::record_outcome(&result);
            result.map_err(|e| self.table.map_error(e.into()))
        }
        .instrument(self.table.span("DeleteItem"))
        .await?;

        response
            .attributes
            .filter(|attributes| !attributes.is_empty())
            .map(|attributes| self.item_to_passport(&attributes))
            .transpose()
    }

    #[instrument(skip(self), fields(table = %self.table.table_name()))]
    async fn find_all(&self) -> RepositoryResult<Vec<Passport>> {
        let passports = self.items_to_passports(self.table.scan_all().await?);
        info!("Found {} passports", passports.len());
        Ok(passports)
    }

    #[instrument(skip(self), fields(table = %self.table.table_name(), id = %id))]
    async fn find_all_matching(&self, id: &str) -> RepositoryResult<Vec<Passport>> {
        let key = PassportKey::from_id(id)?;
        let items = self
            .table
            .query_partition(PARTITION_ATTRIBUTE, key.partition.as_str())
            .await?;
        Ok(self.items_to_passports(items))
    }
}
