//! Utility functions and helpers.

pub mod preflight;
pub mod settings;

pub use preflight::resolve_provider_token;
pub use settings::Settings;
