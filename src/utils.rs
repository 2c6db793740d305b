//! Utility functions and helpers.

pub mod general;
pub mod settings;

pub use general::*;
pub use settings::Settings;
