pub mod api;
pub mod form;
pub mod http;
pub mod pages;
pub mod session;
pub mod transport;
pub mod validators;

pub use api::{ApiCallError, NewPlace, PlacesApi, PlacesContext, Signup};
pub use form::{
    FieldId, FieldState, FieldValue, FileUpload, FormState, FormStateManager, InputHandler,
};
pub use http::{HttpClientManager, HttpError, HttpRequestState};
pub use pages::{
    AuthMode, AuthPage, NewPlacePage, PageError, UpdatePlacePage, UserPlacesPage, UsersPage,
};
pub use session::AuthSession;
pub use transport::{
    HttpRequest, HttpTransport, MultipartBody, RequestBody, RequestBuildError, ReqwestTransport,
};
pub use validators::{validate, Validator};
