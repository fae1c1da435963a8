use serde::{Deserialize, Serialize};

pub const EMAIL_ATTRIBUTE: &str = "email";
pub const EMAIL_VERIFIED_ATTRIBUTE: &str = "email_verified";
pub const EMAIL_ENABLED_ATTRIBUTE: &str = "custom:emailEnabled";
pub const OWNER_ATTRIBUTE: &str = "custom:isOwner";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub username: String,
    pub email_address: String,
    pub email_enabled: bool,
    pub owner: bool,
    pub login_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddUserForm {
    pub email: Option<String>,
}
