use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use crate::models::{countries, CreatePassportForm, EditPassportForm, ServiceResult};
use crate::services::PassportService;
use crate::web::routes::GET_INDEX;
use crate::web::{Context, Request, ResponseModifier, Route, Template};

pub struct GetAdd;

#[async_trait]
impl Route for GetAdd {
    fn route(&self) -> &'static str {
        "GET /add"
    }

    fn template(&self) -> Template {
        Template::Static("add")
    }

    async fn handle(
        &self,
        _request: &Request,
        context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        context.set_variable("countries", countries())?;
        context.set_variable("createPassportForm", CreatePassportForm::default())?;
        Ok(())
    }
}

pub struct PostAdd {
    passport_service: Arc<PassportService>,
}

impl PostAdd {
    pub fn new(passport_service: Arc<PassportService>) -> Self {
        Self { passport_service }
    }
}

#[async_trait]
impl Route for PostAdd {
    fn route(&self) -> &'static str {
        "POST /add"
    }

    fn template(&self) -> Template {
        Template::redirect(GET_INDEX)
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        request: &Request,
        _context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        let form: CreatePassportForm = request.form()?;
        self.passport_service.save(form).await?;
        Ok(())
    }
}

pub struct GetEdit {
    passport_service: Arc<PassportService>,
}

impl GetEdit {
    pub fn new(passport_service: Arc<PassportService>) -> Self {
        Self { passport_service }
    }
}

#[async_trait]
impl Route for GetEdit {
    fn route(&self) -> &'static str {
        "GET /edit/{id}"
    }

    fn template(&self) -> Template {
        Template::Static("edit")
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        request: &Request,
        context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        let passport = self.passport_service.get(request.path_parameter("id")?).await?;
        context.set_variable("editPassportForm", passport.to_edit_form())?;
        context.set_variable("passportView", &passport)?;
        Ok(())
    }
}

pub struct PostEdit {
    passport_service: Arc<PassportService>,
}

impl PostEdit {
    pub fn new(passport_service: Arc<PassportService>) -> Self {
        Self { passport_service }
    }
}

#[async_trait]
impl Route for PostEdit {
    fn route(&self) -> &'static str {
        "POST /edit/{id}"
    }

    fn template(&self) -> Template {
        Template::redirect(GET_INDEX)
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        request: &Request,
        _context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        let form: EditPassportForm = request.form()?;
        self.passport_service
            .update(request.path_parameter("id")?, form)
            .await?;
        Ok(())
    }
}

pub struct DeleteEdit {
    passport_service: Arc<PassportService>,
}

impl DeleteEdit {
    pub fn new(passport_service: Arc<PassportService>) -> Self {
        Self { passport_service }
    }
}

#[async_trait]
impl Route for DeleteEdit {
    fn route(&self) -> &'static str {
        "DELETE /edit/{id}"
    }

    fn template(&self) -> Template {
        Template::redirect(GET_INDEX)
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        request: &Request,
        _context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        self.passport_service
            .delete(request.path_parameter("id")?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Country, PassportView};
    use crate::repositories::PassportKey;
    use crate::test_support::{date, passport, route_services, Mocks};
    use crate::web::Router;
    use mockall::predicate::eq;
    use std::collections::HashMap;

    fn form_request(id: Option<&str>, body: &[(&str, &str)]) -> Request {
        Request {
            body: body
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            path_parameters: id
                .map(|id| HashMap::from([("id".to_string(), id.to_string())]))
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_add_offers_countries_and_empty_form() {
        let mut context = Context::new();
        GetAdd
            .handle(&Request::default(), &mut context, &mut ResponseModifier::default())
            .await
            .unwrap();

        let countries: Vec<Country> = context.get("countries").unwrap();
        assert!(countries.iter().any(|c| c.code == "CA" && c.name == "Canada"));
        assert_eq!(
            context.get::<CreatePassportForm>("createPassportForm"),
            Some(CreatePassportForm::default())
        );
    }

    #[tokio::test]
    async fn test_post_add_saves_and_redirects_to_index() {
        let mut mocks = Mocks::default();
        mocks
            .passports
            .expect_save()
            .withf(|request| request.country_code == "CA" && request.number == "AB123")
            .times(1)
            .returning(|_| Ok(PassportKey::for_passport("Jane", "Doe", "CA", "AB123").id()));
        mocks.notifications.expect_put().times(1).returning(|_, _| Ok(()));

        let services = route_services(mocks);
        let route: Arc<dyn Route> = Arc::new(PostAdd::new(services.passport_service));

        let request = form_request(
            None,
            &[
                ("firstName", "Jane"),
                ("lastName", "Doe"),
                ("dob", "1990-04-01"),
                ("number", "AB123"),
                ("issuingCountry", "Canada"),
                ("issuedDate", "2020-01-01"),
                ("expiresDate", "2030-01-01"),
            ],
        );
        let router = Router::new(vec![route.clone(), Arc::new(TestIndex)]);
        let response = router.process_request(route.as_ref(), request).await;

        assert_eq!(response.status_code, 303);
        assert_eq!(response.path, "index");
        assert_eq!(response.body, None);
    }

    #[tokio::test]
    async fn test_post_add_incomplete_form_is_display_error() {
        let services = route_services(Mocks::default());
        let route = PostAdd::new(services.passport_service);

        let error = route
            .handle(
                &form_request(None, &[("firstName", "Jane")]),
                &mut Context::new(),
                &mut ResponseModifier::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(error.display_message(), Some("Invalid passport request"));
    }

    #[tokio::test]
    async fn test_get_edit_sets_form_and_view() {
        let stored = passport("Jane", "Doe", date(2030, 1, 1));
        let id = stored.id.clone();

        let mut mocks = Mocks::default();
        mocks
            .passports
            .expect_get()
            .with(eq(id.clone()))
            .returning(move |_| Ok(stored.clone()));
        mocks.notifications.expect_get().returning(|_| Ok(Some(date(2029, 7, 1))));

        let services = route_services(mocks);
        let mut context = Context::new();
        GetEdit::new(services.passport_service)
            .handle(&form_request(Some(&id), &[]), &mut context, &mut ResponseModifier::default())
            .await
            .unwrap();

        let view: PassportView = context.get("passportView").unwrap();
        assert_eq!(view.id, id);
        assert_eq!(view.notification_date, Some(date(2029, 7, 1)));
        let form: EditPassportForm = context.get("editPassportForm").unwrap();
        assert_eq!(form.number.as_deref(), Some("AB123"));
        assert_eq!(form.expires_date, Some(date(2030, 1, 1)));
    }

    #[tokio::test]
    async fn test_post_edit_updates_by_path_id() {
        let id = PassportKey::for_passport("Jane", "Doe", "CA", "AB123").id();
        let new_id = PassportKey::for_passport("Jane", "Smith", "CA", "AB123").id();

        let mut mocks = Mocks::default();
        let returned = new_id.clone();
        mocks
            .passports
            .expect_update()
            .withf({
                let id = id.clone();
                move |requested, request| requested == id && request.last_name == "Smith"
            })
            .returning(move |_, _| Ok(returned.clone()));
        mocks
            .notifications
            .expect_delete()
            .with(eq(id.clone()))
            .times(1)
            .returning(|_| Ok(()));
        mocks
            .notifications
            .expect_put()
            .with(eq(new_id), eq(date(2029, 7, 1)))
            .returning(|_, _| Ok(()));

        let services = route_services(mocks);
        PostEdit::new(services.passport_service)
            .handle(
                &form_request(
                    Some(&id),
                    &[
                        ("firstName", "Jane"),
                        ("lastName", "Smith"),
                        ("number", "AB123"),
                        ("issuedDate", "2020-01-01"),
                        ("expiresDate", "2030-01-01"),
                    ],
                ),
                &mut Context::new(),
                &mut ResponseModifier::default(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_edit_removes_passport_and_reminder() {
        let id = PassportKey::for_passport("Jane", "Doe", "CA", "AB123").id();

        let mut mocks = Mocks::default();
        mocks
            .passports
            .expect_delete()
            .with(eq(id.clone()))
            .times(1)
            .returning(|_| Ok(None));
        mocks
            .notifications
            .expect_delete()
            .with(eq(id.clone()))
            .times(1)
            .returning(|_| Ok(()));

        let services = route_services(mocks);
        DeleteEdit::new(services.passport_service)
            .handle(&form_request(Some(&id), &[]), &mut Context::new(), &mut ResponseModifier::default())
            .await
            .unwrap();
    }

    struct TestIndex;

    #[async_trait]
    impl Route for TestIndex {
        fn route(&self) -> &'static str {
            GET_INDEX
        }

        fn template(&self) -> Template {
            Template::Static("index")
        }

        async fn handle(
            &self,
            _request: &Request,
            _context: &mut Context,
            _response_modifier: &mut ResponseModifier,
        ) -> ServiceResult<()> {
            Ok(())
        }
    }
}
