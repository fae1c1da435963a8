use chrono::{Months, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use crate::models::dates::{months_between, today};
use crate::models::{
    country_code_to_country_name, country_to_country_code, valid_country_code_or_default,
    CreatePassportForm, EditPassportForm, ExpiringWithin, PassportView, ServiceResult,
    ValidationError,
};
use crate::repositories::{
    CreatePassportRequest, EditPassportRequest, PartitionKey, Passport,
    PassportNotificationRepository, PassportRepository, SortKey,
};

/// Reminders go out this many months before a passport expires
pub const WARN_BEFORE_EXPIRATION_MONTHS: u32 = 6;

/// Service for managing passports and their renewal reminders
pub struct PassportService {
    passport_repository: Arc<dyn PassportRepository>,
    notification_repository: Arc<dyn PassportNotificationRepository>,
    today: fn() -> NaiveDate,
}

impl PassportService {
    pub fn new(
        passport_repository: Arc<dyn PassportRepository>,
        notification_repository: Arc<dyn PassportNotificationRepository>,
    ) -> Self {
        Self::with_clock(passport_repository, notification_repository, today)
    }

    /// Create a PassportService with a fixed notion of the current date
    pub fn with_clock(
        passport_repository: Arc<dyn PassportRepository>,
        notification_repository: Arc<dyn PassportNotificationRepository>,
        today: fn() -> NaiveDate,
    ) -> Self {
        Self {
            passport_repository,
            notification_repository,
            today,
        }
    }

    #[instrument(skip(self, form))]
    pub async fn save(&self, form: CreatePassportForm) -> ServiceResult<String> {
        let request = to_create_request(form)?;
        let expires = request.expires;

        let id = self.passport_repository.save(request).await?;
        self.save_notification(&id, expires).await?;

        crate::info_with_trace!(passport_id = %id, "Passport saved");
        Ok(id)
    }

    #[instrument(skip(self, form))]
    pub async fn update(&self, id: &str, form: EditPassportForm) -> ServiceResult<String> {
        let request = to_edit_request(form)?;
        let expires = request.expires;

        let updated_id = self.passport_repository.update(id, request).await?;
        if updated_id != id {
            self.notification_repository.delete(id).await?;
        }
        self.save_notification(&updated_id, expires).await?;

        crate::info_with_trace!(passport_id = %updated_id, "Passport updated");
        Ok(updated_id)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> ServiceResult<PassportView> {
        let passport = self.passport_repository.get(id).await?;
        let notification_date = self.notification_repository.get(&passport.id).await?;
        Ok(self.to_view(passport, notification_date))
    }

    #[instrument(skip(self))]
    pub async fn find(
        &self,
        partition: &PartitionKey,
        sort: &SortKey,
    ) -> ServiceResult<Option<PassportView>> {
        let Some(passport) = self.passport_repository.find(partition, sort).await? else {
            return Ok(None);
        };
        let notification_date = self.notification_repository.get(&passport.id).await?;
        Ok(Some(self.to_view(passport, notification_date)))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        self.passport_repository.delete(id).await?;
        self.notification_repository.delete(id).await?;

        crate::info_with_trace!(passport_id = %id, "Passport deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self) -> ServiceResult<Vec<PassportView>> {
        let passports = self.passport_repository.find_all().await?;
        let notification_dates = self.notification_repository.find_all().await?;
        Ok(self.merge_with_notification_dates(passports, &notification_dates))
    }

    fn merge_with_notification_dates(
        &self,
        passports: Vec<Passport>,
        notification_dates: &HashMap<String, NaiveDate>,
    ) -> Vec<PassportView> {
        passports
            .into_iter()
            .map(|passport| {
                let notification_date = notification_dates.get(&passport.id).copied();
                self.to_view(passport, notification_date)
            })
            .collect()
    }

    /// Stores the reminder, or drops it when its date has already passed
    async fn save_notification(&self, passport_id: &str, expires: NaiveDate) -> ServiceResult<()> {
        let notification_date = notification_date(expires);

        if notification_date < (self.today)() {
            self.notification_repository.delete(passport_id).await?;
        } else {
            self.notification_repository
                .put(passport_id, notification_date)
                .await?;
        }
        Ok(())
    }

    fn to_view(&self, passport: Passport, notification_date: Option<NaiveDate>) -> PassportView {
        let months = months_between((self.today)(), passport.expires);

        PassportView {
            full_name: passport.full_name(),
            country_code: valid_country_code_or_default(&passport.country_code),
            country_name: country_code_to_country_name(&passport.country_code),
            id: passport.id,
            first_name: passport.first_name,
            last_name: passport.last_name,
            dob: passport.dob,
            number: passport.number,
            issued_date: passport.issued,
            expires_date: passport.expires,
            notification_date,
            expiring: ExpiringWithin::from_months(months),
        }
    }
}

/// The date a reminder for a passport expiring on `expires` is due
pub fn notification_date(expires: NaiveDate) -> NaiveDate {
    expires
        .checked_sub_months(Months::new(WARN_BEFORE_EXPIRATION_MONTHS))
        .unwrap_or(NaiveDate::MIN)
}

fn required<T>(value: Option<T>) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::IncompletePassport)
}

fn to_create_request(form: CreatePassportForm) -> Result<CreatePassportRequest, ValidationError> {
    Ok(CreatePassportRequest {
        first_name: required(form.first_name)?,
        last_name: required(form.last_name)?,
        dob: required(form.dob)?,
        number: required(form.number)?,
        country_code: country_to_country_code(&required(form.issuing_country)?),
        issued: required(form.issued_date)?,
        expires: required(form.expires_date)?,
    })
}

fn to_edit_request(form: EditPassportForm) -> Result<EditPassportRequest, ValidationError> {
    Ok(EditPassportRequest {
        first_name: required(form.first_name)?,
        last_name: required(form.last_name)?,
        number: required(form.number)?,
        issued: required(form.issued_date)?,
        expires: required(form.expires_date)?,
    })
}
