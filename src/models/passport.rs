use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Form submitted when adding a passport. Every field is optional so that
/// partially filled forms can be rejected with a single message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePassportForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "optional_date")]
    pub dob: Option<NaiveDate>,
    pub number: Option<String>,
    pub issuing_country: Option<String>,
    #[serde(default, deserialize_with = "optional_date")]
    pub issued_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date")]
    pub expires_date: Option<NaiveDate>,
}

/// Form submitted when editing a passport. Country and date of birth are
/// not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPassportForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub number: Option<String>,
    #[serde(default, deserialize_with = "optional_date")]
    pub issued_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date")]
    pub expires_date: Option<NaiveDate>,
}

/// How soon a passport expires, relative to the request date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiringWithin {
    HalfYear,
    Year,
    OverYear,
}

impl ExpiringWithin {
    /// Buckets a whole-month distance to expiry
    pub fn from_months(months: i64) -> Self {
        match months {
            m if m <= 6 => ExpiringWithin::HalfYear,
            m if m <= 12 => ExpiringWithin::Year,
            _ => ExpiringWithin::OverYear,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiringWithin::HalfYear => "HALF_YEAR",
            ExpiringWithin::Year => "YEAR",
            ExpiringWithin::OverYear => "OVER_YEAR",
        }
    }
}

impl fmt::Display for ExpiringWithin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassportView {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub dob: NaiveDate,
    pub number: String,
    pub country_code: String,
    pub country_name: String,
    pub issued_date: NaiveDate,
    pub expires_date: NaiveDate,
    pub notification_date: Option<NaiveDate>,
    pub expiring: ExpiringWithin,
}

impl PassportView {
    pub fn to_edit_form(&self) -> EditPassportForm {
        EditPassportForm {
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
            number: Some(self.number.clone()),
            issued_date: Some(self.issued_date),
            expires_date: Some(self.expires_date),
        }
    }
}

/// Passports expiring in the same calendar year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassportsInYearView {
    pub expiration_year: i32,
    pub passports: Vec<PassportView>,
}

impl PassportsInYearView {
    /// Groups passports by expiry year, ordered by year then expiry date
    pub fn group_by_year(mut passports: Vec<PassportView>) -> Vec<PassportsInYearView> {
        passports.sort_by_key(|p| p.expires_date);

        let mut groups: Vec<PassportsInYearView> = Vec::new();
        for passport in passports {
            let year = passport.expires_date.year();
            match groups.last_mut() {
                Some(group) if group.expiration_year == year => group.passports.push(passport),
                _ => groups.push(PassportsInYearView {
                    expiration_year: year,
                    passports: vec![passport],
                }),
            }
        }
        groups
    }
}

/// Accepts `yyyy-mm-dd`, treating a missing or blank value as absent
fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid date {}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn view(first_name: &str, expires: NaiveDate) -> PassportView {
        PassportView {
            id: format!("{}-id", first_name),
            first_name: first_name.to_string(),
            last_name: "Doe".to_string(),
            full_name: format!("{} Doe", first_name),
            dob: date(1990, 1, 1),
            number: "123".to_string(),
            country_code: "CA".to_string(),
            country_name: "Canada".to_string(),
            issued_date: date(2020, 1, 1),
            expires_date: expires,
            notification_date: None,
            expiring: ExpiringWithin::OverYear,
        }
    }

    #[test]
    fn test_create_form_deserialization() {
        let form: CreatePassportForm = serde_json::from_value(json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "dob": "1990-04-01",
            "number": "AB123",
            "issuingCountry": "Canada",
            "issuedDate": "2020-01-01",
            "expiresDate": ""
        }))
        .unwrap();

        assert_eq!(form.first_name.as_deref(), Some("Jane"));
        assert_eq!(form.dob, Some(date(1990, 4, 1)));
        assert_eq!(form.expires_date, None);
    }

    #[test]
    fn test_missing_fields_deserialize_as_none() {
        let form: EditPassportForm = serde_json::from_value(json!({ "number": "X1" })).unwrap();
        assert_eq!(form.number.as_deref(), Some("X1"));
        assert!(form.first_name.is_none());
        assert!(form.issued_date.is_none());
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let result: Result<CreatePassportForm, _> =
            serde_json::from_value(json!({ "dob": "01/04/1990" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_expiring_within_buckets() {
        assert_eq!(ExpiringWithin::from_months(-3), ExpiringWithin::HalfYear);
        assert_eq!(ExpiringWithin::from_months(6), ExpiringWithin::HalfYear);
        assert_eq!(ExpiringWithin::from_months(7), ExpiringWithin::Year);
        assert_eq!(ExpiringWithin::from_months(12), ExpiringWithin::Year);
        assert_eq!(ExpiringWithin::from_months(13), ExpiringWithin::OverYear);
        assert_eq!(
            serde_json::to_value(ExpiringWithin::HalfYear).unwrap(),
            json!("HALF_YEAR")
        );
    }

    #[test]
    fn test_group_by_year_sorts_groups_and_members() {
        let groups = PassportsInYearView::group_by_year(vec![
            view("C", date(2030, 5, 1)),
            view("A", date(2028, 9, 1)),
            view("B", date(2028, 2, 1)),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].expiration_year, 2028);
        let names: Vec<_> = groups[0].passports.iter().map(|p| p.first_name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(groups[1].expiration_year, 2030);
    }
}
