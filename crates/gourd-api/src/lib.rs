//! Local control surface of the gourd agent.

mod error;
pub use error::ApiError;

mod handler;
pub use handler::ApiHandler;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpApi;

#[cfg(feature = "http")]
pub use axum;
