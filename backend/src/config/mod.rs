//! Configuration module for the draft service.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;
use crate::models::ClientSettings;
use crate::session::{AutoSaveOptions, GuardOptions, DEFAULT_UNSAVED_MESSAGE};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Autosave interval handed to editing clients
    pub autosave_interval: Duration,
    /// Whether editing clients autosave by default
    pub autosave_enabled: bool,
    /// Prompt shown when leaving a form with unsaved changes
    pub unsaved_message: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("GASSAFE_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("GASSAFE_DB_PATH")
            .unwrap_or_else(|_| "./data/drafts.sqlite".to_string())
            .into();

        let bind_addr = env::var("GASSAFE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid GASSAFE_BIND_ADDR: {}", e)))?;

        let log_level = env::var("GASSAFE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let autosave_interval = match env::var("GASSAFE_AUTOSAVE_INTERVAL_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| {
                    AppError::Config(format!("Invalid GASSAFE_AUTOSAVE_INTERVAL_MS: {}", e))
                })?,
            Err(_) => AutoSaveOptions::DEFAULT_INTERVAL,
        };

        let autosave_enabled = match env::var("GASSAFE_AUTOSAVE_ENABLED") {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                AppError::Config(format!("Invalid GASSAFE_AUTOSAVE_ENABLED: {}", raw))
            })?,
            Err(_) => true,
        };

        let unsaved_message = env::var("GASSAFE_UNSAVED_MESSAGE")
            .unwrap_or_else(|_| DEFAULT_UNSAVED_MESSAGE.to_string());

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            autosave_interval,
            autosave_enabled,
            unsaved_message,
        })
    }

    /// Autosave scheduler options for an editing session.
    pub fn autosave_options(&self) -> AutoSaveOptions {
        AutoSaveOptions {
            interval: self.autosave_interval,
            enabled: self.autosave_enabled,
        }
    }

    /// Navigation guard options for an editing session.
    pub fn guard_options(&self) -> GuardOptions {
        GuardOptions {
            enabled: true,
            message: self.unsaved_message.clone(),
        }
    }

    /// Settings published to frontends at `GET /api/settings`.
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            autosave_interval_ms: self.autosave_interval.as_millis() as u64,
            autosave_enabled: self.autosave_enabled,
            unsaved_changes_message: self.unsaved_message.clone(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
