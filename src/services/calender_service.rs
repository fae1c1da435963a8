//! iCalendar feed of passport expiry dates, hosted on S3.

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Months, NaiveDate, NaiveTime};
use icalendar::{Alarm, Calendar, Component, Event, EventLike, Trigger};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, instrument, Instrument};
use uuid::Uuid;

use crate::models::dates::{long_format, today};
use crate::models::{PassportView, ServiceError, ServiceResult};
use crate::services::passport_service::{PassportService, WARN_BEFORE_EXPIRATION_MONTHS};

const CALENDAR_CONTENT_TYPE: &str = "text/calendar";
const DOWNLOAD_URL_VALIDITY: Duration = Duration::from_secs(60);

/// Where generated calendar files are kept
#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn put_calendar(&self, key: &str, body: String) -> ServiceResult<()>;

    /// Short-lived download URL for a stored calendar
    async fn download_url(&self, key: &str) -> ServiceResult<String>;
}

pub struct S3CalendarStore {
    client: Arc<S3Client>,
    bucket: String,
    region: String,
}

impl S3CalendarStore {
    pub fn new(client: Arc<S3Client>, bucket: String, region: String) -> Self {
        Self {
            client,
            bucket,
            region,
        }
    }

    fn create_s3_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "S3",
            "aws.service" = "S3",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.s3.bucket" = %self.bucket,
            "aws.remote.service" = "AWS::S3",
            "aws.remote.operation" = operation,
            "otel.kind" = "client",
            "otel.name" = %format!("S3.{}", operation),
            "rpc.system" = "aws-api",
            "rpc.service" = "S3",
            "rpc.method" = operation,
        )
    }
}

#[async_trait]
impl CalendarStore for S3CalendarStore {
    async fn put_calendar(&self, key: &str, body: String) -> ServiceResult<()> {
        let content_length = body.len() as i64;

        async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .content_type(CALENDAR_CONTENT_TYPE)
                .content_length(content_length)
                .body(ByteStream::from(body.into_bytes()))
                .send()
                .await
                .map_err(|e| {
                    let e = aws_sdk_s3::Error::from(e);
                    error!("S3 error: {:?}", e);
                    ServiceError::external("s3", e)
                })
        }
        .instrument(self.create_s3_span("PutObject"))
        .await?;
        Ok(())
    }

    async fn download_url(&self, key: &str) -> ServiceResult<String> {
        let presigning = PresigningConfig::expires_in(DOWNLOAD_URL_VALIDITY)
            .map_err(|e| ServiceError::external("s3", e))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| ServiceError::external("s3", aws_sdk_s3::Error::from(e)))?;

        Ok(request.uri().to_string())
    }
}

/// Builds the household's passport calendar and hands out download links
pub struct CalenderService {
    passport_service: Arc<PassportService>,
    store: Arc<dyn CalendarStore>,
    today: fn() -> NaiveDate,
}

impl CalenderService {
    pub fn new(passport_service: Arc<PassportService>, store: Arc<dyn CalendarStore>) -> Self {
        Self::with_clock(passport_service, store, today)
    }

    pub fn with_clock(
        passport_service: Arc<PassportService>,
        store: Arc<dyn CalendarStore>,
        today: fn() -> NaiveDate,
    ) -> Self {
        Self {
            passport_service,
            store,
            today,
        }
    }

    /// Stores a fresh calendar and returns a one minute download URL
    #[instrument(skip(self))]
    pub async fn create_passport_expiration_calender(&self) -> ServiceResult<String> {
        let passports = self.passport_service.find_all().await?;
        let calendar = passport_calendar(&passports, (self.today)());

        let key = calendar_key(&Uuid::new_v4().to_string());
        self.store.put_calendar(&key, calendar.to_string()).await?;

        crate::info_with_trace!(passports = passports.len(), key = %key, "Calendar stored");
        self.store.download_url(&key).await
    }
}

pub fn calendar_key(uid: &str) -> String {
    format!("ics/{}/reminders.ics", uid)
}

/// Two all-day events per passport: the expiry itself and the reminder date
pub fn passport_calendar(passports: &[PassportView], today: NaiveDate) -> Calendar {
    let mut calendar = Calendar::new();
    for passport in passports {
        let expires = passport_expires_event(passport, today);
        let will_expire = passport_will_expire_event(passport, &expires);
        calendar.push(expires);
        calendar.push(will_expire);
    }
    calendar.done()
}

fn passport_expires_event(passport: &PassportView, today: NaiveDate) -> Event {
    let text = format!(
        "{} passport issued by {} expires today",
        possessive(&passport.full_name),
        passport.country_name
    );

    let mut event = Event::new();
    event
        .uid(&event_id(passport, passport.expires_date))
        .summary(&text)
        .description(&text)
        .all_day(passport.expires_date);

    // Only passports already inside the 3 month window get an alarm
    let alarm_date = months_before(passport.expires_date, WARN_BEFORE_EXPIRATION_MONTHS / 2);
    if alarm_date < today {
        let trigger = alarm_date.and_time(NaiveTime::MIN).and_utc();
        event.alarm(Alarm::display(&text, Trigger::from(trigger)));
    }
    event.done()
}

fn passport_will_expire_event(passport: &PassportView, expires_event: &Event) -> Event {
    let event_date = months_before(passport.expires_date, WARN_BEFORE_EXPIRATION_MONTHS);
    let name = possessive(&passport.full_name);

    let mut event = Event::new();
    event
        .uid(&event_id(passport, event_date))
        .summary(&format!(
            "{} passport issued by {} is expiring soon",
            name, passport.country_name
        ))
        .description(&format!(
            "{} passport issued by {} will expire on {}",
            name,
            passport.country_name,
            long_format(passport.expires_date)
        ))
        .all_day(event_date);

    if let Some(related) = expires_event.get_uid() {
        event.add_property("RELATED-TO", related);
    }
    event.done()
}

fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(date)
}

/// Base64 of `fullName-eventDate-expiresDate-countryCode`
pub fn event_id(passport: &PassportView, event_date: NaiveDate) -> String {
    STANDARD.encode(format!(
        "{}-{}-{}-{}",
        passport.full_name, event_date, passport.expires_date, passport.country_code
    ))
}

pub fn possessive(name: &str) -> String {
    if name.ends_with('s') {
        format!("{}'", name)
    } else {
        format!("{}'s", name)
    }
}
