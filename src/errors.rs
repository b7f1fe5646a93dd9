use actix_web::{http::StatusCode, HttpResponse};
use derive_more::Display;
use serde_json::{json, Value};

#[derive(Debug, Display, PartialEq, Eq)]
pub enum CommonError {
    #[display(fmt = "too_short")]
    TooShort,
    #[display(fmt = "too_long")]
    TooLong,
    #[display(fmt = "invalid")]
    Invalid,
    #[display(fmt = "out_of_range")]
    OutOfRange,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Fields {
    Username(CommonError),
    Email(CommonError),
    Password(CommonError),
    Title(CommonError),
    Content(CommonError),
    Page(CommonError),
    Limit(CommonError),
    Body(String),
}

impl Fields {
    fn to_json(&self) -> Value {
        let (field, error) = match self {
            Fields::Username(e) => ("username", e.to_string()),
            Fields::Email(e) => ("email", e.to_string()),
            Fields::Password(e) => ("password", e.to_string()),
            Fields::Title(e) => ("title", e.to_string()),
            Fields::Content(e) => ("content", e.to_string()),
            Fields::Page(e) => ("page", e.to_string()),
            Fields::Limit(e) => ("limit", e.to_string()),
            Fields::Body(msg) => ("body", msg.to_owned()),
        };

        json!({ "field": field, "error": error })
    }
}

#[derive(Debug, Display)]
pub enum ServerError {
    DieselError,
    EnvironmentError,
    R2D2Error,
    MigrationError,
    BlockingError,
    HashError,
    JWTError,
    StoreError,
    #[display(fmt = "Validation Error")]
    UserError(Vec<Fields>),
    #[display(fmt = "Conflict: {}", _0)]
    Conflict(&'static str),
    Unauthorized,
    InvalidCredentials,
    Forbidden,
    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),
    Unavailable,
}

impl From<r2d2::Error> for ServerError {
    fn from(err: r2d2::Error) -> ServerError {
        log::error!("connection pool: {err}");
        ServerError::R2D2Error
    }
}

impl From<diesel::result::Error> for ServerError {
    fn from(err: diesel::result::Error) -> ServerError {
        log::error!("diesel: {err}");
        ServerError::DieselError
    }
}

impl From<jsonwebtoken::errors::Error> for ServerError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        log::error!("jwt: {err}");
        ServerError::JWTError
    }
}

impl From<actix_web::error::BlockingError> for ServerError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        log::error!("blocking pool: {err}");
        ServerError::BlockingError
    }
}

impl actix_web::error::ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::UserError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Conflict(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized | ServerError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::Forbidden => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut res = HttpResponse::build(self.status_code());
        match self {
            ServerError::UserError(fields) => {
                let detail: Vec<Value> = fields.iter().map(Fields::to_json).collect();
                res.json(json!({ "detail": detail }))
            }
            ServerError::Conflict(msg) => res.json(json!({ "detail": msg })),
            ServerError::Unauthorized => res
                .insert_header(("WWW-Authenticate", "Bearer"))
                .json(json!({ "detail": "Could not validate credentials" })),
            ServerError::InvalidCredentials => res
                .insert_header(("WWW-Authenticate", "Bearer"))
                .json(json!({ "detail": "Incorrect username or password" })),
            ServerError::Forbidden => res.json(json!({ "detail": "Inactive user" })),
            ServerError::NotFound(_) => res.json(json!({ "detail": self.to_string() })),
            ServerError::Unavailable => res.json(json!({ "detail": "Service unavailable" })),
            // internals stay in the log
            _ => res.json(json!({ "detail": "Internal server error" })),
        }
    }
}
