//! CLI argument types.
mod cli;


pub use cli::HarnessArgs;
