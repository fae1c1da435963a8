//! Every endpoint of the site, keyed the way API Gateway names its routes.

pub mod auth;
pub mod calender;
pub mod health;
pub mod index;
pub mod notification_endpoints;
pub mod passports;
pub mod users;


use std::sync::Arc;

use crate::services::{
    Authenticator, CalenderService, NotificationEndpointService, PassportService, UserPoolService,
};
use crate::web::Route;

pub const GET_INDEX: &str = "GET /index";
pub const GET_USERS: &str = "GET /users";
pub const GET_NOTIFICATION_ENDPOINTS: &str = "GET /notification-endpoints";

/// Services the routes are built from
#[derive(Clone)]
pub struct RouteServices {
    pub passport_service: Arc<PassportService>,
    pub notification_endpoint_service: Arc<NotificationEndpointService>,
    pub user_pool_service: Arc<UserPoolService>,
    pub calender_service: Arc<CalenderService>,
    pub authenticator: Arc<dyn Authenticator>,
    /// Cookie domain, the public domain of the site
    pub domain_name: String,
}

pub fn all_routes(services: &RouteServices) -> Vec<Arc<dyn Route>> {
    vec![
        Arc::new(auth::GetLoginRoute::new(
            services.authenticator.clone(),
            services.domain_name.clone(),
        )),
        Arc::new(auth::GetLogoutRoute::new(services.domain_name.clone())),
        Arc::new(index::GetRoot),
        Arc::new(index::GetIndex::new(
            services.passport_service.clone(),
            services.notification_endpoint_service.clone(),
        )),
        Arc::new(passports::PostAdd::new(services.passport_service.clone())),
        Arc::new(passports::GetAdd),
        Arc::new(passports::GetEdit::new(services.passport_service.clone())),
        Arc::new(passports::PostEdit::new(services.passport_service.clone())),
        Arc::new(passports::DeleteEdit::new(services.passport_service.clone())),
        Arc::new(users::GetUsers::new(services.user_pool_service.clone())),
        Arc::new(users::PostUser::new(services.user_pool_service.clone())),
        Arc::new(users::DeleteUser::new(services.user_pool_service.clone())),
        Arc::new(users::PatchUserAttributeValue::new(
            services.user_pool_service.clone(),
        )),
        Arc::new(notification_endpoints::GetNotificationEndpoints::new(
            services.notification_endpoint_service.clone(),
            services.user_pool_service.clone(),
        )),
        Arc::new(notification_endpoints::PostNotificationEndpoints::new(
            services.notification_endpoint_service.clone(),
        )),
        Arc::new(notification_endpoints::DeleteNotificationEndpoint::new(
            services.notification_endpoint_service.clone(),
        )),
        Arc::new(calender::GetCalender::new(services.calender_service.clone())),
        Arc::new(health::GetHealth),
    ]
}
