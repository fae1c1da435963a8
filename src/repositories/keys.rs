use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use std::fmt;

use crate::models::KeyError;

/// URL-safe decoder that accepts IDs with or without trailing padding
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const KEY_SEPARATOR: char = '#';

/// Hash key shared by all passports of one person: `first^last`, lowercased
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey(pub String);

/// Range key identifying one passport: `country^number`, lowercased
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey(pub String);

impl PartitionKey {
    pub fn from_name(first_name: &str, last_name: &str) -> Self {
        PartitionKey(format!("{}^{}", first_name, last_name).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SortKey {
    pub fn from_passport(country_code: &str, number: &str) -> Self {
        SortKey(format!("{}^{}", country_code, number).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full primary key of a passport item and its opaque external ID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PassportKey {
    pub partition: PartitionKey,
    pub sort: SortKey,
}

impl PassportKey {
    pub fn new(partition: PartitionKey, sort: SortKey) -> Self {
        Self { partition, sort }
    }

    pub fn for_passport(first_name: &str, last_name: &str, country_code: &str, number: &str) -> Self {
        Self::new(
            PartitionKey::from_name(first_name, last_name),
            SortKey::from_passport(country_code, number),
        )
    }

    /// base64url of `partition#sort`
    pub fn id(&self) -> String {
        URL_SAFE.encode(format!("{}{}{}", self.partition, KEY_SEPARATOR, self.sort))
    }

    /// Decodes an external ID back into its keys. The ID is split on the
    /// first `#`; anything after it belongs to the sort key.
    pub fn from_id(id: &str) -> Result<Self, KeyError> {
        let bytes = LENIENT_URL_SAFE
            .decode(id)
            .map_err(|_| KeyError::InvalidPassportId)?;
        let decoded = String::from_utf8(bytes).map_err(|_| KeyError::InvalidPassportId)?;
        let (partition, sort) = decoded
            .split_once(KEY_SEPARATOR)
            .ok_or(KeyError::InvalidPassportId)?;

        Ok(Self::new(
            PartitionKey(partition.to_string()),
            SortKey(sort.to_string()),
        ))
    }
}

/// base64url encoding of a notification endpoint email
pub fn endpoint_id(email: &str) -> String {
    URL_SAFE.encode(email)
}

pub fn email_from_endpoint_id(id: &str) -> Result<String, KeyError> {
    let bytes = LENIENT_URL_SAFE
        .decode(id)
        .map_err(|_| KeyError::InvalidEndpointId)?;
    String::from_utf8(bytes).map_err(|_| KeyError::InvalidEndpointId)
}
