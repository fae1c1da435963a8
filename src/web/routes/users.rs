use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::models::{AddUserForm, ServiceResult};
use crate::services::UserPoolService;
use crate::web::routes::GET_USERS;
use crate::web::{Context, Request, ResponseModifier, Route, Template};

fn add_new_user_form(context: &mut Context) -> ServiceResult<()> {
    context.set_variable("addNewUserForm", AddUserForm::default())
}

pub struct GetUsers {
    user_pool_service: Arc<UserPoolService>,
}

impl GetUsers {
    pub fn new(user_pool_service: Arc<UserPoolService>) -> Self {
        Self { user_pool_service }
    }
}

#[async_trait]
impl Route for GetUsers {
    fn route(&self) -> &'static str {
        GET_USERS
    }

    fn template(&self) -> Template {
        Template::Static("users")
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        _request: &Request,
        context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        let users = self.user_pool_service.list_all_users().await?;
        context.set_variable("users", users)?;
        add_new_user_form(context)
    }
}

pub struct PostUser {
    user_pool_service: Arc<UserPoolService>,
}

impl PostUser {
    pub fn new(user_pool_service: Arc<UserPoolService>) -> Self {
        Self { user_pool_service }
    }
}

#[async_trait]
impl Route for PostUser {
    fn route(&self) -> &'static str {
        "POST /users"
    }

    fn template(&self) -> Template {
        Template::redirect(GET_USERS)
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        request: &Request,
        context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        let form: AddUserForm = request.form()?;
        match form.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => self.user_pool_service.create_user(email).await?,
            _ => info!("No email submitted, no user created"),
        }
        add_new_user_form(context)
    }
}

pub struct DeleteUser {
    user_pool_service: Arc<UserPoolService>,
}

impl DeleteUser {
    pub fn new(user_pool_service: Arc<UserPoolService>) -> Self {
        Self { user_pool_service }
    }
}

#[async_trait]
impl Route for DeleteUser {
    fn route(&self) -> &'static str {
        "DELETE /users/{username}"
    }

    fn template(&self) -> Template {
        Template::redirect(GET_USERS)
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        request: &Request,
        context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        self.user_pool_service
            .delete_user(request.path_parameter("username")?)
            .await?;
        add_new_user_form(context)
    }
}

/// Turns a user's reminder emails or login on and off
pub struct PatchUserAttributeValue {
    user_pool_service: Arc<UserPoolService>,
}

impl PatchUserAttributeValue {
    pub fn new(user_pool_service: Arc<UserPoolService>) -> Self {
        Self { user_pool_service }
    }
}

#[async_trait]
impl Route for PatchUserAttributeValue {
    fn route(&self) -> &'static str {
        "PATCH /users/{username}/attributes/{attribute}/value/{value}"
    }

    fn template(&self) -> Template {
        Template::redirect(GET_USERS)
    }

    #[instrument(skip_all)]
    async fn handle(
        &self,
        request: &Request,
        context: &mut Context,
        _response_modifier: &mut ResponseModifier,
    ) -> ServiceResult<()> {
        self.user_pool_service
            .toggle_user_attribute(
                request.path_parameter("username")?,
                request.path_parameter("attribute")?,
                request.path_parameter("value")?,
            )
            .await?;
        add_new_user_form(context)
    }
}
