use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEndpointView {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNotificationEndpointForm {
    pub email: Option<String>,
}

/// Content of the renewal reminder email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringPassportEmailView {
    pub full_name: String,
    pub country_name: String,
    pub issued_date: NaiveDate,
    pub expires_date: NaiveDate,
    pub url: String,
}
