//! Page controllers: each one owns a form and a request manager, and tears
//! the manager down when dropped so nothing outlives the page.

use shared::domain::{Place, PlaceId, User, UserId};
use thiserror::Error;
use tracing::info;

use crate::{
    api::{ApiCallError, NewPlace, PlacesApi, PlacesContext, Signup},
    form::{inputs, FieldState, FieldValue, FileUpload, FormStateManager},
    http::HttpClientManager,
    validators::{validate, Validator},
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error(transparent)]
    Api(#[from] ApiCallError),
    #[error("the form has invalid fields")]
    InvalidForm,
    #[error("nothing loaded yet")]
    NotLoaded,
}

impl PageError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_cancelled())
    }
}

type FieldRules = &'static [(&'static str, &'static [Validator])];

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";
const ADDRESS: &str = "address";
const IMAGE: &str = "image";
const EMAIL: &str = "email";
const PASSWORD: &str = "password";
const NAME: &str = "name";

const PLACE_RULES: FieldRules = &[
    (TITLE, &[Validator::Require]),
    (DESCRIPTION, &[Validator::MinLength(5)]),
    (ADDRESS, &[Validator::Require]),
];

const AUTH_RULES: FieldRules = &[
    (EMAIL, &[Validator::Email, Validator::Require]),
    (PASSWORD, &[Validator::MinLength(6)]),
    (NAME, &[Validator::Require]),
];

/// Validates `value` against the rules for `id` and feeds the result into
/// the form. Fields without rules are accepted as-is.
fn text_input(form: &FormStateManager, rules: FieldRules, id: &str, value: &str) -> bool {
    let validators = rules
        .iter()
        .find(|(field, _)| *field == id)
        .map(|(_, validators)| *validators)
        .unwrap_or(&[]);
    let is_valid = validate(value, validators);
    form.input_handler().call(id, value, is_valid);
    is_valid
}

/// Exactly one picked file makes the image field valid.
fn image_input(form: &FormStateManager, file: Option<FileUpload>) -> bool {
    match file {
        Some(file) => {
            form.input_handler().call(IMAGE, file, true);
            true
        }
        None => {
            form.input_handler().call(IMAGE, FieldValue::Empty, false);
            false
        }
    }
}

fn required_text(form: &FormStateManager, id: &str) -> String {
    form.text(id).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

pub struct AuthPage {
    api: PlacesApi,
    form: FormStateManager,
    mode: AuthMode,
}

impl AuthPage {
    pub fn new(ctx: &PlacesContext) -> Self {
        Self {
            api: ctx.api(),
            form: FormStateManager::new(
                inputs([(EMAIL, FieldState::blank()), (PASSWORD, FieldState::blank())]),
                false,
            ),
            mode: AuthMode::Login,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn form(&self) -> &FormStateManager {
        &self.form
    }

    pub fn http(&self) -> &HttpClientManager {
        self.api.http()
    }

    pub fn input(&self, id: &str, value: &str) -> bool {
        text_input(&self.form, AUTH_RULES, id, value)
    }

    pub fn pick_image(&self, file: Option<FileUpload>) -> bool {
        image_input(&self.form, file)
    }

    /// Signup needs a name and an avatar on top of the login fields.
    pub fn switch_mode(&mut self) {
        let mut fields = self.form.snapshot().inputs;
        match self.mode {
            AuthMode::Login => {
                fields.insert(NAME.to_string(), FieldState::blank());
                fields.insert(
                    IMAGE.to_string(),
                    FieldState::new(FieldValue::Empty, false),
                );
                self.form.set_form_data(fields, false);
                self.mode = AuthMode::Signup;
            }
            AuthMode::Signup => {
                fields.remove(NAME);
                fields.remove(IMAGE);
                let credentials_valid = fields.get(EMAIL).is_some_and(|f| f.is_valid)
                    && fields.get(PASSWORD).is_some_and(|f| f.is_valid);
                self.form.set_form_data(fields, credentials_valid);
                self.mode = AuthMode::Login;
            }
        }
    }

    /// Logs the session in on success and returns the user id.
    pub async fn submit(&self) -> Result<UserId, PageError> {
        if !self.form.is_valid() {
            return Err(PageError::InvalidForm);
        }
        let snapshot = self.form.snapshot();
        let email = snapshot.text(EMAIL).unwrap_or_default().to_string();
        let password = snapshot.text(PASSWORD).unwrap_or_default().to_string();

        let auth = match self.mode {
            AuthMode::Login => self.api.login(&email, &password).await?,
            AuthMode::Signup => {
                self.api
                    .signup(Signup {
                        name: snapshot.text(NAME).unwrap_or_default().to_string(),
                        email,
                        password,
                        image: snapshot.file(IMAGE).cloned(),
                    })
                    .await?
            }
        };

        info!(user_id = %auth.user_id, mode = ?self.mode, "auth: session started");
        self.api
            .session()
            .login(auth.user_id.clone(), auth.token, None);
        Ok(auth.user_id)
    }

    pub fn teardown(&self) {
        self.api.http().teardown();
    }
}

impl Drop for AuthPage {
    fn drop(&mut self) {
        self.teardown();
    }
}

pub struct NewPlacePage {
    api: PlacesApi,
    form: FormStateManager,
}

impl NewPlacePage {
    pub fn new(ctx: &PlacesContext) -> Self {
        Self {
            api: ctx.api(),
            form: FormStateManager::new(
                inputs([
                    (TITLE, FieldState::blank()),
                    (DESCRIPTION, FieldState::blank()),
                    (ADDRESS, FieldState::blank()),
                    (IMAGE, FieldState::new(FieldValue::Empty, false)),
                ]),
                false,
            ),
        }
    }

    pub fn form(&self) -> &FormStateManager {
        &self.form
    }

    pub fn http(&self) -> &HttpClientManager {
        self.api.http()
    }

    pub fn input(&self, id: &str, value: &str) -> bool {
        text_input(&self.form, PLACE_RULES, id, value)
    }

    pub fn pick_image(&self, file: Option<FileUpload>) -> bool {
        image_input(&self.form, file)
    }

    pub async fn submit(&self) -> Result<Place, PageError> {
        if !self.form.is_valid() {
            return Err(PageError::InvalidForm);
        }
        let snapshot = self.form.snapshot();
        let place = self
            .api
            .create_place(NewPlace {
                title: required_text(&self.form, TITLE),
                description: required_text(&self.form, DESCRIPTION),
                address: required_text(&self.form, ADDRESS),
                image: snapshot.file(IMAGE).cloned(),
            })
            .await?;
        info!(place_id = %place.id, "places: created");
        Ok(place)
    }

    pub fn teardown(&self) {
        self.api.http().teardown();
    }
}

impl Drop for NewPlacePage {
    fn drop(&mut self) {
        self.teardown();
    }
}

pub struct UpdatePlacePage {
    api: PlacesApi,
    form: FormStateManager,
    place_id: PlaceId,
    loaded: Option<Place>,
}

impl UpdatePlacePage {
    pub fn new(ctx: &PlacesContext, place_id: PlaceId) -> Self {
        Self {
            api: ctx.api(),
            form: FormStateManager::new(
                inputs([(TITLE, FieldState::blank()), (DESCRIPTION, FieldState::blank())]),
                false,
            ),
            place_id,
            loaded: None,
        }
    }

    pub fn form(&self) -> &FormStateManager {
        &self.form
    }

    pub fn http(&self) -> &HttpClientManager {
        self.api.http()
    }

    pub fn loaded(&self) -> Option<&Place> {
        self.loaded.as_ref()
    }

    /// Fetches the place and seeds the form with its stored, known-good values.
    pub async fn load(&mut self) -> Result<&Place, PageError> {
        let place = self.api.place(&self.place_id).await?;
        self.form.set_form_data(
            inputs([
                (TITLE, FieldState::new(place.title.clone(), true)),
                (DESCRIPTION, FieldState::new(place.description.clone(), true)),
            ]),
            true,
        );
        Ok(&*self.loaded.insert(place))
    }

    pub fn input(&self, id: &str, value: &str) -> bool {
        text_input(&self.form, PLACE_RULES, id, value)
    }

    /// Saves the edit and returns the route to show next.
    pub async fn submit(&self) -> Result<String, PageError> {
        if self.loaded.is_none() {
            return Err(PageError::NotLoaded);
        }
        if !self.form.is_valid() {
            return Err(PageError::InvalidForm);
        }
        let place = self
            .api
            .update_place(
                &self.place_id,
                &required_text(&self.form, TITLE),
                &required_text(&self.form, DESCRIPTION),
            )
            .await?;
        info!(place_id = %place.id, "places: updated");

        let user_id = self
            .api
            .session()
            .user_id()
            .ok_or(ApiCallError::NotAuthenticated)?;
        Ok(format!("/{user_id}/places"))
    }

    pub fn teardown(&self) {
        self.api.http().teardown();
    }
}

impl Drop for UpdatePlacePage {
    fn drop(&mut self) {
        self.teardown();
    }
}

pub struct UserPlacesPage {
    api: PlacesApi,
    user_id: UserId,
    places: Vec<Place>,
}

impl UserPlacesPage {
    pub fn new(ctx: &PlacesContext, user_id: UserId) -> Self {
        Self {
            api: ctx.api(),
            user_id,
            places: Vec::new(),
        }
    }

    pub fn http(&self) -> &HttpClientManager {
        self.api.http()
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub async fn load(&mut self) -> Result<&[Place], PageError> {
        self.places = self.api.places_by_user(&self.user_id).await?;
        Ok(&self.places)
    }

    /// Deletes on the backend, then drops the place from the local list.
    pub async fn delete_place(&mut self, place_id: &PlaceId) -> Result<String, PageError> {
        let response = self.api.delete_place(place_id).await?;
        self.places.retain(|place| &place.id != place_id);
        info!(place_id = %place_id, "places: deleted");
        Ok(response.message)
    }

    pub fn teardown(&self) {
        self.api.http().teardown();
    }
}

impl Drop for UserPlacesPage {
    fn drop(&mut self) {
        self.teardown();
    }
}

pub struct UsersPage {
    api: PlacesApi,
    users: Vec<User>,
}

impl UsersPage {
    pub fn new(ctx: &PlacesContext) -> Self {
        Self {
            api: ctx.api(),
            users: Vec::new(),
        }
    }

    pub fn http(&self) -> &HttpClientManager {
        self.api.http()
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub async fn load(&mut self) -> Result<&[User], PageError> {
        self.users = self.api.users().await?;
        Ok(&self.users)
    }

    pub fn teardown(&self) {
        self.api.http().teardown();
    }
}

impl Drop for UsersPage {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "tests/pages_tests.rs"]
mod tests;
