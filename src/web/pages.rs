//! HTML pages. Each page model is read from the handler's [`Context`], so
//! its serde names match the variables the handlers set.

use askama::Template;
use serde::Deserialize;

use crate::models::{
    AddNotificationEndpointForm, AddUserForm, Country, CreatePassportForm, EditPassportForm,
    NotificationEndpointView, PassportView, PassportsInYearView, ServiceError, ServiceResult,
    UserView,
};
use crate::web::Context;

pub const ERROR_PAGE: &str = "error";

#[derive(Template, Deserialize)]
#[template(path = "index.html")]
#[serde(rename_all = "camelCase")]
pub struct IndexPage {
    pub passports_in_year_view: Vec<PassportsInYearView>,
    pub passport_count: usize,
    pub notification_endpoint_count: usize,
    /// Comma separated addresses
    pub notification_endpoints: String,
}

#[derive(Template, Deserialize)]
#[template(path = "add.html")]
#[serde(rename_all = "camelCase")]
pub struct AddPage {
    pub countries: Vec<Country>,
    pub create_passport_form: CreatePassportForm,
}

#[derive(Template, Deserialize)]
#[template(path = "edit.html")]
#[serde(rename_all = "camelCase")]
pub struct EditPage {
    pub edit_passport_form: EditPassportForm,
    pub passport_view: PassportView,
}

#[derive(Template, Deserialize)]
#[template(path = "users.html")]
#[serde(rename_all = "camelCase")]
pub struct UsersPage {
    pub users: Vec<UserView>,
    pub add_new_user_form: AddUserForm,
}

#[derive(Template, Deserialize)]
#[template(path = "notification-endpoints.html")]
#[serde(rename_all = "camelCase")]
pub struct NotificationEndpointsPage {
    pub notification_endpoints: Vec<NotificationEndpointView>,
    pub users: Vec<UserView>,
    pub add_notification_endpoint_form: AddNotificationEndpointForm,
}

#[derive(Template, Deserialize)]
#[template(path = "calender.html")]
#[serde(rename_all = "camelCase")]
pub struct CalenderPage {
    pub download_url: String,
}

#[derive(Template, Deserialize)]
#[template(path = "health.html")]
pub struct HealthPage {
    pub status: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage<'a> {
    pub status_code: u16,
    pub message: &'a str,
}

/// Renders the page registered under `name` from the handler's variables
pub fn render_page(name: &str, context: &Context) -> ServiceResult<String> {
    let html = match name {
        "index" => context.to_model::<IndexPage>()?.render()?,
        "add" => context.to_model::<AddPage>()?.render()?,
        "edit" => context.to_model::<EditPage>()?.render()?,
        "users" => context.to_model::<UsersPage>()?.render()?,
        "notification-endpoints" => context.to_model::<NotificationEndpointsPage>()?.render()?,
        "calender" => context.to_model::<CalenderPage>()?.render()?,
        "health" => context.to_model::<HealthPage>()?.render()?,
        other => {
            return Err(ServiceError::Configuration {
                message: format!("No page named {}", other),
            })
        }
    };
    Ok(html)
}

pub fn render_error_page(status_code: u16, message: &str) -> ServiceResult<String> {
    Ok(ErrorPage {
        status_code,
        message,
    }
    .render()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{countries, ExpiringWithin};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn passport_view() -> PassportView {
        PassportView {
            id: "amFuZV5kb2UjY2FeYWIxMjM=".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            full_name: "Jane Doe".to_string(),
            dob: date(1990, 4, 1),
            number: "AB123".to_string(),
            country_code: "CA".to_string(),
            country_name: "Canada".to_string(),
            issued_date: date(2020, 1, 1),
            expires_date: date(2030, 1, 1),
            notification_date: Some(date(2029, 7, 1)),
            expiring: ExpiringWithin::OverYear,
        }
    }

    #[test]
    fn test_render_index() {
        let mut context = Context::new();
        let groups = PassportsInYearView::group_by_year(vec![passport_view()]);
        context.set_variable("passportsInYearView", &groups).unwrap();
        context.set_variable("passportCount", 1).unwrap();
        context.set_variable("notificationEndpointCount", 2).unwrap();
        context
            .set_variable("notificationEndpoints", "a@example.com, b@example.com")
            .unwrap();

        let html = render_page("index", &context).unwrap();
        assert!(html.contains("Jane Doe"));
        assert!(html.contains("2030"));
        assert!(html.contains("OVER_YEAR"));
        assert!(html.contains("a@example.com, b@example.com"));
    }

    #[test]
    fn test_render_add_lists_countries() {
        let mut context = Context::new();
        context.set_variable("countries", countries()).unwrap();
        context
            .set_variable("createPassportForm", CreatePassportForm::default())
            .unwrap();

        let html = render_page("add", &context).unwrap();
        assert!(html.contains("Canada"));
        assert!(html.contains("Zimbabwe"));
    }

    #[test]
    fn test_render_edit_prefills_form() {
        let view = passport_view();
        let mut context = Context::new();
        context.set_variable("editPassportForm", view.to_edit_form()).unwrap();
        context.set_variable("passportView", &view).unwrap();

        let html = render_page("edit", &context).unwrap();
        assert!(html.contains("value=\"AB123\""));
        assert!(html.contains("2030-01-01"));
        assert!(html.contains(&view.id));
    }

    #[test]
    fn test_render_health() {
        let mut context = Context::new();
        context.set_variable("status", "up").unwrap();
        assert!(render_page("health", &context).unwrap().contains("up"));
    }

    #[test]
    fn test_missing_variables_fail_rendering() {
        assert!(render_page("calender", &Context::new()).is_err());
        assert!(render_page("nope", &Context::new()).is_err());
    }

    #[test]
    fn test_error_page_escapes_message() {
        let html = render_error_page(400, "<b>Invalid Passport ID</b>").unwrap();
        assert!(html.contains("&lt;b&gt;Invalid Passport ID"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("400"));
    }
}
