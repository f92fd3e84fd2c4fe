//! Configuration loading and the immutable run settings.
mod loader;
mod settings;
pub mod types;


pub use loader::{DEFAULT_CONFIG_FILES, load_config};
pub use settings::{Overrides, Settings};

#[cfg(test)]
pub(crate) use loader::load_config_file;
