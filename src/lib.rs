// H2PETRONS client - library root

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
pub mod session;
pub mod transport;

pub use error::ApiError;
pub use http_client::{ApiClient, RequestOptions};
pub use session::{SessionManager, UiVisibility};
