//! Error type and settings shared by the whole crate.

pub mod error;
pub mod settings;
