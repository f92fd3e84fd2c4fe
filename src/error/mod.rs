mod app;
mod check;
mod config;
mod harness;
mod http;

pub use app::{AppError, AppResult};
pub use check::CheckError;
pub use config::ConfigError;
pub use harness::HarnessError;
pub use http::HttpError;
