//! Configuration loading, CLI overlay, and validated run settings.
mod apply;
mod loader;
mod settings;
pub mod types;


pub use apply::apply_config;
pub use loader::load_config;
pub use settings::LoadSettings;

#[cfg(any(test, feature = "fuzzing"))]
pub(crate) use loader::parse_config;
#[cfg(test)]
pub(crate) use loader::load_config_file;
