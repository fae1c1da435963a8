//! Payloads exchanged with the Lambda runtime.

pub use aws_lambda_events::apigw::{ApiGatewayV2httpRequest, ApiGatewayV2httpResponse};
pub use aws_lambda_events::dynamodb::{Event as DynamoDbEvent, EventRecord as DynamoDbEventRecord};
pub use aws_lambda_events::encodings::Body;
pub use aws_lambda_events::query_map::QueryMap;
