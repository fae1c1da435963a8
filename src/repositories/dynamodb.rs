use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, Instrument};

use crate::models::{RepositoryError, RepositoryResult};

pub type Item = HashMap<String, AttributeValue>;

/// A DynamoDB table handle shared by the repositories: client, table name
/// and the tracing/error conventions every call goes through.
#[derive(Clone)]
pub struct DynamoDbTable {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbTable {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    pub fn client(&self) -> &DynamoDbClient {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create a DynamoDB subsegment span with X-Ray and OpenTelemetry attributes
    pub fn span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "DynamoDB",
            "aws.service" = "DynamoDB",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.dynamodb.table_name" = %self.table_name,
            "aws.request_id" = tracing::field::Empty,

            "aws.remote.service" = "AWS::DynamoDB",
            "aws.remote.operation" = operation,
            "aws.remote.resource.type" = "AWS::DynamoDB::Table",
            "aws.remote.resource.identifier" = %self.table_name,

            "otel.kind" = "client",
            "otel.name" = format!("DynamoDB.{}", operation),

            "rpc.system" = "aws-api",
            "rpc.service" = "AmazonDynamoDBv2",
            "rpc.method" = operation,

            "http.status_code" = tracing::field::Empty,

            "db.system" = "dynamodb",
            "db.name" = %self.table_name,
            "db.operation" = operation,
            "component" = "aws-sdk-dynamodb",
        )
    }

    /// Convert DynamoDB error to RepositoryError
    pub fn map_error(&self, error: DynamoDbError) -> RepositoryError {
        error!("DynamoDB error: {:?}", error);

        match error {
            DynamoDbError::ResourceNotFoundException(_) => RepositoryError::TableNotFound {
                table_name: self.table_name.clone(),
            },
            DynamoDbError::TransactionCanceledException(e) => RepositoryError::TransactionFailed {
                message: e.to_string(),
            },
            other => RepositoryError::AwsSdk {
                message: other.to_string(),
            },
        }
    }

    /// Records the outcome of a call on the current DynamoDB span
    pub fn record_outcome<T: RequestId, E: std::fmt::Display>(result: &Result<T, E>) {
        match result {
            Ok(output) => {
                tracing::Span::current().record("http.status_code", 200);
                if let Some(request_id) = output.request_id() {
                    tracing::Span::current().record("aws.request_id", request_id);
                }
            }
            Err(e) => {
                tracing::Span::current().record("http.status_code", 400);
                error!("DynamoDB call failed: {}", e);
            }
        }
    }

    /// Scans the whole table, following `LastEvaluatedKey`
    pub async fn scan_all(&self) -> RepositoryResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut exclusive_start_key: Option<Item> = None;

        loop {
            let response = async {
                let result = self
                    .client
                    .scan()
                    .table_name(&self.table_name)
                    .set_exclusive_start_key(exclusive_start_key.take())
                    .send()
                    .await;
                Self::record_outcome(&result);
                result.map_err(|e| self.map_error(e.into()))
            }
            .instrument(self.span("Scan"))
            .await?;

            items.extend(response.items.unwrap_or_default());

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }

    /// Queries every item under one partition key value, following pages
    pub async fn query_partition(
        &self,
        partition_attribute: &str,
        partition_value: &str,
    ) -> RepositoryResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut exclusive_start_key: Option<Item> = None;

        loop {
            let response = async {
                let result = self
                    .client
                    .query()
                    .table_name(&self.table_name)
                    .key_condition_expression("#pk = :pk")
                    .expression_attribute_names("#pk", partition_attribute)
                    .expression_attribute_values(":pk", AttributeValue::S(partition_value.to_string()))
                    .set_exclusive_start_key(exclusive_start_key.take())
                    .send()
                    .await;
                Self::record_outcome(&result);
                result.map_err(|e| self.map_error(e.into()))
            }
            .instrument(self.span("Query"))
            .await?;

            items.extend(response.items.unwrap_or_default());

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }
}

pub fn string_attribute(item: &Item, name: &str) -> RepositoryResult<String> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidItem {
            message: format!("Missing {}", name),
        })
}

pub fn number_attribute(item: &Item, name: &str) -> RepositoryResult<i64> {
    optional_number_attribute(item, name)?.ok_or_else(|| RepositoryError::InvalidItem {
        message: format!("Missing {}", name),
    })
}

pub fn optional_number_attribute(item: &Item, name: &str) -> RepositoryResult<Option<i64>> {
    match item.get(name) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(value) => value
            .as_n()
            .ok()
            .and_then(|n| n.parse::<i64>().ok())
            .map(Some)
            .ok_or_else(|| RepositoryError::InvalidItem {
                message: format!("Invalid {}", name),
            }),
    }
}
