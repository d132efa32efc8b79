use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use shared::{
    domain::{Place, PlaceId, User, UserId},
    protocol::{
        AuthResponse, LoginRequest, MessageResponse, PlaceResponse, PlacesResponse,
        UpdatePlaceRequest, UsersResponse,
    },
};
use thiserror::Error;
use url::Url;

use crate::{
    form::FileUpload,
    http::{HttpClientManager, HttpError},
    session::AuthSession,
    transport::{HttpRequest, HttpTransport, MultipartBody, ReqwestTransport},
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiCallError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("you must be logged in to do that")]
    NotAuthenticated,
    #[error("could not encode request: {0}")]
    Encode(String),
}

impl ApiCallError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Http(err) if err.is_cancelled())
    }
}

/// Shared pieces every page needs: where the backend lives, who is logged in,
/// and how bytes get there. Each page builds its own [`PlacesApi`] from it so
/// that request state stays per page.
#[derive(Clone)]
pub struct PlacesContext {
    base_url: String,
    session: AuthSession,
    transport: Arc<dyn HttpTransport>,
}

impl PlacesContext {
    pub fn new(base_url: impl Into<String>, session: AuthSession) -> Self {
        Self::with_transport(base_url, session, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(
        base_url: impl Into<String>,
        session: AuthSession,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn api(&self) -> PlacesApi {
        PlacesApi {
            base_url: self.base_url.clone(),
            session: self.session.clone(),
            http: HttpClientManager::with_transport(Arc::clone(&self.transport)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlace {
    pub title: String,
    pub description: String,
    pub address: String,
    pub image: Option<FileUpload>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
    pub image: Option<FileUpload>,
}

/// Typed calls against the places backend, all routed through one
/// [`HttpClientManager`].
#[derive(Clone)]
pub struct PlacesApi {
    base_url: String,
    session: AuthSession,
    http: HttpClientManager,
}

impl PlacesApi {
    pub fn http(&self) -> &HttpClientManager {
        &self.http
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub async fn users(&self) -> Result<Vec<User>, ApiCallError> {
        let response: UsersResponse = self
            .call(self.request(Method::GET, &["api", "users"])?)
            .await?;
        Ok(response.users)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiCallError> {
        let body = serde_json::to_value(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })
        .map_err(|err| ApiCallError::Encode(err.to_string()))?;
        self.call(self.request(Method::POST, &["api", "users", "login"])?.json(body))
            .await
    }

    pub async fn signup(&self, signup: Signup) -> Result<AuthResponse, ApiCallError> {
        let mut form = MultipartBody::default()
            .text("name", signup.name)
            .text("email", signup.email)
            .text("password", signup.password);
        if let Some(image) = signup.image {
            form = form.file("image", image);
        }
        self.call(
            self.request(Method::POST, &["api", "users", "signup"])?
                .multipart(form),
        )
        .await
    }

    pub async fn place(&self, place_id: &PlaceId) -> Result<Place, ApiCallError> {
        let response: PlaceResponse = self
            .call(self.request(Method::GET, &["api", "places", place_id.as_str()])?)
            .await?;
        Ok(response.place)
    }

    pub async fn places_by_user(&self, user_id: &UserId) -> Result<Vec<Place>, ApiCallError> {
        let response: PlacesResponse = self
            .call(self.request(
                Method::GET,
                &["api", "places", "user", user_id.as_str()],
            )?)
            .await?;
        Ok(response.places)
    }

    pub async fn create_place(&self, place: NewPlace) -> Result<Place, ApiCallError> {
        let mut form = MultipartBody::default()
            .text("title", place.title)
            .text("description", place.description)
            .text("address", place.address);
        if let Some(image) = place.image {
            form = form.file("image", image);
        }
        let request = self.authorized(self.request(Method::POST, &["api", "places"])?)?;
        let response: PlaceResponse = self.call(request.multipart(form)).await?;
        Ok(response.place)
    }

    pub async fn update_place(
        &self,
        place_id: &PlaceId,
        title: &str,
        description: &str,
    ) -> Result<Place, ApiCallError> {
        let body = serde_json::to_value(UpdatePlaceRequest {
            title: title.to_string(),
            description: description.to_string(),
        })
        .map_err(|err| ApiCallError::Encode(err.to_string()))?;
        let request =
            self.authorized(self.request(Method::PATCH, &["api", "places", place_id.as_str()])?)?;
        let response: PlaceResponse = self.call(request.json(body)).await?;
        Ok(response.place)
    }

    pub async fn delete_place(&self, place_id: &PlaceId) -> Result<MessageResponse, ApiCallError> {
        let request = self
            .authorized(self.request(Method::DELETE, &["api", "places", place_id.as_str()])?)?;
        match self.http.send_request(request).await? {
            // Some backends answer a delete with an empty body.
            serde_json::Value::Null => Ok(MessageResponse {
                message: "Deleted place.".to_string(),
            }),
            body => Ok(self.http.decode(body)?),
        }
    }

    /// Appends `segments` to the base url, percent-encoding each one.
    fn request(&self, method: Method, segments: &[&str]) -> Result<HttpRequest, ApiCallError> {
        let base = &self.base_url;
        let mut url = Url::parse(base)
            .map_err(|err| ApiCallError::Encode(format!("bad base url '{base}': {err}")))?;
        url.path_segments_mut()
            .map_err(|_| ApiCallError::Encode(format!("base url '{base}' cannot hold a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(HttpRequest::new(url).method(method))
    }

    fn authorized(&self, request: HttpRequest) -> Result<HttpRequest, ApiCallError> {
        let (name, value) = self
            .session
            .authorization_header()
            .ok_or(ApiCallError::NotAuthenticated)?;
        Ok(request.header(name, value))
    }

    async fn call<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiCallError> {
        Ok(self.http.send_json(request).await?)
    }
}
