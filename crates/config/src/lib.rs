// Configuration loading: dataset settings and saved view presets

pub mod error;
pub mod preset;
pub mod settings;

pub use error::ConfigError;
pub use preset::ViewPreset;
pub use settings::Settings;
