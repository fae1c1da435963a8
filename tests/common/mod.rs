#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use passhelper_rs::config::ServerConfig;
use passhelper_rs::handlers::{create_app, GatewayState};
use passhelper_rs::lambda::ApiGatewayEntrypoint;
use passhelper_rs::models::{RepositoryError, ServiceResult};
use passhelper_rs::repositories::{
    CreatePassportRequest, EditPassportRequest, NotificationEndpointRepository, PartitionKey,
    Passport, PassportKey, PassportNotificationRepository, PassportRepository, PoolUser, SortKey,
    UserPoolRepository,
};
use passhelper_rs::services::{
    Authenticator, CalendarStore, CalenderService, EmailMessage, EmailService, Jwt,
    NotificationEndpointService, PassportService, UserPoolService,
};
use passhelper_rs::web::{all_routes, Response, RouteServices, Router};

pub const VALID_TOKEN: &str = "valid-token";
pub const LOGIN_URL: &str = "https://auth.passhelper.test/login";
pub const DOMAIN: &str = "passhelper.test";
pub const MAX_REQUEST_SIZE: usize = 64 * 1024;

/// Passports held in memory, keyed by ID
#[derive(Default)]
pub struct InMemoryPassportRepository {
    passports: Mutex<HashMap<String, Passport>>,
}

fn not_found() -> RepositoryError {
    RepositoryError::NotFound {
        message: "Passport not found".to_string(),
    }
}

#[async_trait]
impl PassportRepository for InMemoryPassportRepository {
    async fn save(&self, request: CreatePassportRequest) -> Result<String, RepositoryError> {
        let key = PassportKey::for_passport(
            &request.first_name,
            &request.last_name,
            &request.country_code,
            &request.number,
        );
        let passport = Passport {
            id: key.id(),
            first_name: request.first_name,
            last_name: request.last_name,
            dob: request.dob,
            number: request.number,
            country_code: request.country_code,
            issued: request.issued,
            expires: request.expires,
        };

        let mut passports = self.passports.lock().unwrap();
        if passports.contains_key(&passport.id) {
            return Err(RepositoryError::AlreadyExists {
                message: "This passport already exists".to_string(),
            });
        }
        passports.insert(passport.id.clone(), passport.clone());
        Ok(passport.id)
    }

    async fn update(&self, id: &str, request: EditPassportRequest) -> Result<String, RepositoryError> {
        PassportKey::from_id(id)?;
        let mut passports = self.passports.lock().unwrap();
        let existing = passports.remove(id).ok_or_else(not_found)?;
        let updated = request.merge_with(&existing);
        passports.insert(updated.id.clone(), updated.clone());
        Ok(updated.id)
    }

    async fn find(&self, partition: &PartitionKey, sort: &SortKey) -> Result<Option<Passport>, RepositoryError> {
        let id = PassportKey::new(partition.clone(), sort.clone()).id();
        Ok(self.passports.lock().unwrap().get(&id).cloned())
    }

    async fn get(&self, id: &str) -> Result<Passport, RepositoryError> {
        PassportKey::from_id(id)?;
        self.passports
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn delete(&self, id: &str) -> Result<Option<Passport>, RepositoryError> {
        PassportKey::from_id(id)?;
        Ok(self.passports.lock().unwrap().remove(id))
    }

    async fn find_all(&self) -> Result<Vec<Passport>, RepositoryError> {
        Ok(self.passports.lock().unwrap().values().cloned().collect())
    }

    async fn find_all_matching(&self, id: &str) -> Result<Vec<Passport>, RepositoryError> {
        let key = PassportKey::from_id(id)?;
        Ok(self
            .passports
            .lock()
            .unwrap()
            .values()
            .filter(|passport| passport.key().partition == key.partition)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    pub dates: Mutex<HashMap<String, NaiveDate>>,
}

#[async_trait]
impl PassportNotificationRepository for InMemoryNotificationRepository {
    async fn put(&self, passport_id: &str, notification_date: NaiveDate) -> Result<(), RepositoryError> {
        self.dates
            .lock()
            .unwrap()
            .insert(passport_id.to_string(), notification_date);
        Ok(())
    }

    async fn get(&self, passport_id: &str) -> Result<Option<NaiveDate>, RepositoryError> {
        Ok(self.dates.lock().unwrap().get(passport_id).copied())
    }

    async fn find_all(&self) -> Result<HashMap<String, NaiveDate>, RepositoryError> {
        Ok(self.dates.lock().unwrap().clone())
    }

    async fn find_all_matching(&self, passport_id: &str) -> Result<HashMap<String, NaiveDate>, RepositoryError> {
        let key = PassportKey::from_id(passport_id)?;
        Ok(self
            .dates
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| {
                PassportKey::from_id(id).is_ok_and(|other| other.partition == key.partition)
            })
            .map(|(id, date)| (id.clone(), *date))
            .collect())
    }

    async fn delete(&self, passport_id: &str) -> Result<(), RepositoryError> {
        self.dates.lock().unwrap().remove(passport_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEndpointRepository {
    emails: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationEndpointRepository for InMemoryEndpointRepository {
    async fn find_all_emails(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self.emails.lock().unwrap().clone())
    }

    async fn add_email(&self, email: &str) -> Result<(), RepositoryError> {
        let mut emails = self.emails.lock().unwrap();
        if !emails.iter().any(|existing| existing == email) {
            emails.push(email.to_string());
        }
        Ok(())
    }

    async fn delete_email(&self, email: &str) -> Result<(), RepositoryError> {
        self.emails.lock().unwrap().retain(|existing| existing != email);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserPool {
    users: Mutex<Vec<PoolUser>>,
}

impl InMemoryUserPool {
    fn with_user<T>(&self, username: &str, f: impl FnOnce(&mut PoolUser) -> T) -> Result<T, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|user| user.username == username)
            .ok_or_else(|| RepositoryError::NotFound {
                message: "User not found".to_string(),
            })?;
        Ok(f(user))
    }
}

#[async_trait]
impl UserPoolRepository for InMemoryUserPool {
    async fn list_users(&self) -> Result<Vec<PoolUser>, RepositoryError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn get_user(&self, username: &str) -> Result<PoolUser, RepositoryError> {
        self.with_user(username, |user| user.clone())
    }

    async fn create_user(&self, email: &str) -> Result<String, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        let username = format!("user-{}", users.len() + 1);
        users.push(PoolUser {
            username: username.clone(),
            created_at: None,
            enabled: true,
            attributes: HashMap::from([
                ("email".to_string(), email.to_string()),
                ("custom:emailEnabled".to_string(), "false".to_string()),
            ]),
        });
        Ok(username)
    }

    async fn update_attribute(&self, username: &str, name: &str, value: &str) -> Result<(), RepositoryError> {
        self.with_user(username, |user| {
            user.attributes.insert(name.to_string(), value.to_string());
        })
    }

    async fn enable_user(&self, username: &str) -> Result<(), RepositoryError> {
        self.with_user(username, |user| user.enabled = true)
    }

    async fn disable_user(&self, username: &str) -> Result<(), RepositoryError> {
        self.with_user(username, |user| user.enabled = false)
    }

    async fn set_temporary_password(&self, username: &str, _password: &str) -> Result<(), RepositoryError> {
        self.with_user(username, |_| ())
    }

    async fn delete_user(&self, username: &str) -> Result<(), RepositoryError> {
        self.users.lock().unwrap().retain(|user| user.username != username);
        Ok(())
    }
}

/// Remembers every email instead of sending it
#[derive(Default)]
pub struct RecordingEmailService {
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl EmailService for RecordingEmailService {
    async fn send_email(&self, message: EmailMessage) -> ServiceResult<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCalendarStore {
    pub calendars: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl CalendarStore for InMemoryCalendarStore {
    async fn put_calendar(&self, key: &str, body: String) -> ServiceResult<()> {
        self.calendars.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }

    async fn download_url(&self, key: &str) -> ServiceResult<String> {
        Ok(format!("https://calendars.passhelper.test/{}", key))
    }
}

/// Accepts exactly one access token and one authorization code
pub struct StaticAuthenticator;

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn is_authenticated(&self, cookies: &[String]) -> bool {
        cookies
            .iter()
            .any(|cookie| cookie == &format!("accessToken={}", VALID_TOKEN))
    }

    async fn authenticate(&self, code: &str) -> ServiceResult<Option<Jwt>> {
        Ok((code == "good-code").then(|| Jwt {
            access_token: VALID_TOKEN.to_string(),
            expires_in: 3600,
        }))
    }

    fn login_redirect_response(&self) -> Response {
        Response {
            status_code: 302,
            path: LOGIN_URL.to_string(),
            body: None,
            cookies: Vec::new(),
        }
    }
}

pub struct TestEnvironment {
    pub base_url: String,
    pub client: reqwest::Client,
    pub notifications: Arc<InMemoryNotificationRepository>,
    pub calendars: Arc<InMemoryCalendarStore>,
    pub emails: Arc<RecordingEmailService>,
}

impl TestEnvironment {
    /// Serves the whole site on an ephemeral port, backed by in-memory stores
    pub async fn new() -> Self {
        let notifications = Arc::new(InMemoryNotificationRepository::default());
        let calendars = Arc::new(InMemoryCalendarStore::default());
        let emails = Arc::new(RecordingEmailService::default());

        let passport_service = Arc::new(PassportService::new(
            Arc::new(InMemoryPassportRepository::default()),
            notifications.clone(),
        ));
        let services = RouteServices {
            passport_service: passport_service.clone(),
            notification_endpoint_service: Arc::new(NotificationEndpointService::new(Arc::new(
                InMemoryEndpointRepository::default(),
            ))),
            user_pool_service: Arc::new(UserPoolService::new(
                Arc::new(InMemoryUserPool::default()),
                emails.clone(),
                DOMAIN.to_string(),
            )),
            calender_service: Arc::new(CalenderService::new(passport_service, calendars.clone())),
            authenticator: Arc::new(StaticAuthenticator),
            domain_name: DOMAIN.to_string(),
        };

        let entrypoint = ApiGatewayEntrypoint::new(
            Router::new(all_routes(&services)),
            services.authenticator.clone(),
        );
        let route_keys = entrypoint.route_keys();
        let app = create_app(
            GatewayState {
                entrypoint: Arc::new(entrypoint),
            },
            &route_keys,
            &ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                request_timeout_seconds: 30,
                max_request_size: MAX_REQUEST_SIZE,
                domain_name: DOMAIN.to_string(),
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base_url: format!("http://{}", addr),
            client,
            notifications,
            calendars,
            emails,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn auth_cookie(&self) -> String {
        format!("accessToken={}", VALID_TOKEN)
    }
}
