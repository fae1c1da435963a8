use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::mock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{RepositoryError, ServiceResult};
use crate::repositories::{
    CreatePassportRequest, EditPassportRequest, NotificationEndpointRepository, PartitionKey,
    Passport, PassportKey, PassportNotificationRepository, PassportRepository, PoolUser, SortKey,
    UserPoolRepository,
};
use crate::services::{
    Authenticator, CalendarStore, CalenderService, EmailMessage, EmailService, Jwt,
    NotificationEndpointService, PassportService, UserPoolService,
};
use crate::web::routes::RouteServices;
use crate::web::Response;

mock! {
    pub TestPassportRepository {}

    #[async_trait]
    impl PassportRepository for TestPassportRepository {
        async fn save(&self, request: CreatePassportRequest) -> Result<String, RepositoryError>;
        async fn update(&self, id: &str, request: EditPassportRequest) -> Result<String, RepositoryError>;
        async fn find(&self, partition: &PartitionKey, sort: &SortKey) -> Result<Option<Passport>, RepositoryError>;
        async fn get(&self, id: &str) -> Result<Passport, RepositoryError>;
        async fn delete(&self, id: &str) -> Result<Option<Passport>, RepositoryError>;
        async fn find_all(&self) -> Result<Vec<Passport>, RepositoryError>;
        async fn find_all_matching(&self, id: &str) -> Result<Vec<Passport>, RepositoryError>;
    }
}

mock! {
    pub TestNotificationRepository {}

    #[async_trait]
    impl PassportNotificationRepository for TestNotificationRepository {
        async fn put(&self, passport_id: &str, notification_date: NaiveDate) -> Result<(), RepositoryError>;
        async fn get(&self, passport_id: &str) -> Result<Option<NaiveDate>, RepositoryError>;
        async fn find_all(&self) -> Result<HashMap<String, NaiveDate>, RepositoryError>;
        async fn find_all_matching(&self, passport_id: &str) -> Result<HashMap<String, NaiveDate>, RepositoryError>;
        async fn delete(&self, passport_id: &str) -> Result<(), RepositoryError>;
    }
}

mock! {
    pub TestEndpointRepository {}

    #[async_trait]
    impl NotificationEndpointRepository for TestEndpointRepository {
        async fn find_all_emails(&self) -> Result<Vec<String>, RepositoryError>;
        async fn add_email(&self, email: &str) -> Result<(), RepositoryError>;
        async fn delete_email(&self, email: &str) -> Result<(), RepositoryError>;
    }
}

mock! {
    pub TestUserPoolRepository {}

    #[async_trait]
    impl UserPoolRepository for TestUserPoolRepository {
        async fn list_users(&self) -> Result<Vec<PoolUser>, RepositoryError>;
        async fn get_user(&self, username: &str) -> Result<PoolUser, RepositoryError>;
        async fn create_user(&self, email: &str) -> Result<String, RepositoryError>;
        async fn update_attribute(&self, username: &str, name: &str, value: &str) -> Result<(), RepositoryError>;
        async fn enable_user(&self, username: &str) -> Result<(), RepositoryError>;
        async fn disable_user(&self, username: &str) -> Result<(), RepositoryError>;
        async fn set_temporary_password(&self, username: &str, password: &str) -> Result<(), RepositoryError>;
        async fn delete_user(&self, username: &str) -> Result<(), RepositoryError>;
    }
}

mock! {
    pub TestEmailService {}

    #[async_trait]
    impl EmailService for TestEmailService {
        async fn send_email(&self, message: EmailMessage) -> ServiceResult<()>;
    }
}

mock! {
    pub TestCalendarStore {}

    #[async_trait]
    impl CalendarStore for TestCalendarStore {
        async fn put_calendar(&self, key: &str, body: String) -> ServiceResult<()>;
        async fn download_url(&self, key: &str) -> ServiceResult<String>;
    }
}

mock! {
    pub TestAuthenticator {}

    #[async_trait]
    impl Authenticator for TestAuthenticator {
        async fn is_authenticated(&self, cookies: &[String]) -> bool;
        async fn authenticate(&self, code: &str) -> ServiceResult<Option<Jwt>>;
        fn login_redirect_response(&self) -> Response;
    }
}

/// Every seam below the routes, each defaulting to a mock with no expectations
#[derive(Default)]
pub struct Mocks {
    pub passports: MockTestPassportRepository,
    pub notifications: MockTestNotificationRepository,
    pub endpoints: MockTestEndpointRepository,
    pub users: MockTestUserPoolRepository,
    pub email: MockTestEmailService,
    pub calendar_store: MockTestCalendarStore,
    pub authenticator: MockTestAuthenticator,
}

pub const DOMAIN: &str = "passhelper.example";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn fixed_today() -> NaiveDate {
    date(2025, 1, 15)
}

pub fn passport(first_name: &str, last_name: &str, expires: NaiveDate) -> Passport {
    let key = PassportKey::for_passport(first_name, last_name, "CA", "AB123");
    Passport {
        id: key.id(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        dob: date(1990, 4, 1),
        number: "AB123".to_string(),
        country_code: "CA".to_string(),
        issued: date(2020, 1, 1),
        expires,
    }
}

pub fn pool_user(username: &str, email: &str, owner: bool) -> PoolUser {
    PoolUser {
        username: username.to_string(),
        created_at: None,
        enabled: true,
        attributes: HashMap::from([
            ("email".to_string(), email.to_string()),
            ("custom:emailEnabled".to_string(), "true".to_string()),
            ("custom:isOwner".to_string(), owner.to_string()),
        ]),
    }
}

pub fn route_services(mocks: Mocks) -> RouteServices {
    let email: Arc<dyn EmailService> = Arc::new(mocks.email);
    let passport_service = Arc::new(PassportService::with_clock(
        Arc::new(mocks.passports),
        Arc::new(mocks.notifications),
        fixed_today,
    ));

    RouteServices {
        passport_service: passport_service.clone(),
        notification_endpoint_service: Arc::new(NotificationEndpointService::new(Arc::new(
            mocks.endpoints,
        ))),
        user_pool_service: Arc::new(UserPoolService::new(
            Arc::new(mocks.users),
            email,
            DOMAIN.to_string(),
        )),
        calender_service: Arc::new(CalenderService::with_clock(
            passport_service,
            Arc::new(mocks.calendar_store),
            fixed_today,
        )),
        authenticator: Arc::new(mocks.authenticator),
        domain_name: DOMAIN.to_string(),
    }
}
