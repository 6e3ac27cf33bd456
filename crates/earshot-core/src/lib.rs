//! Core types and configuration for earshot.
//!
//! This crate provides the configuration model shared by the audio and
//! transcription crates, along with language tag handling.

mod config;
mod language;

pub use config::{
    Config, ConfigManager, CredentialConfig, DEFAULT_MODULE, ModuleConfig, ServerConfig, SttConfig,
};
pub use language::{DEFAULT_LANGUAGE, normalize_language};

/// Application name
pub const APP_NAME: &str = "earshot";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";
