//! Command-line front end for grounded document question answering.
//!
//! Configuration is resolved once at startup ([`config::AppConfig`]) and the
//! provider pair is built from the resulting [`config::ProviderChoice`].

pub mod config;
pub mod console;
pub mod providers;

pub use config::{AppConfig, ConfigError, ProviderChoice, ProviderKind, Settings};
