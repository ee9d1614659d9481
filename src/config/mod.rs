//! Project configuration (`.queryvault.toml`).

pub mod settings;

pub use settings::Settings;
