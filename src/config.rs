//! Config System - Numeric Limits Enforced by Every Document

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::number::NumberRange;

/// Lowest message field number.
pub const MIN_MESSAGE_NUMBER: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfig {
    #[serde(default = "default_max_message_number")]
    pub max_message_number: u32,
    #[serde(default = "default_max_enum_number")]
    pub max_enum_number: u32,
    /// Numbers message fields may not use. Reservations may still cover them.
    #[serde(default = "default_implementation_reserved")]
    pub implementation_reserved: Option<NumberRange>,
}

fn default_max_message_number() -> u32 { 536_870_911 }
fn default_max_enum_number() -> u32 { i32::MAX as u32 }
fn default_implementation_reserved() -> Option<NumberRange> {
    NumberRange::new(19_000, 19_999).ok()
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            max_message_number: default_max_message_number(),
            max_enum_number: default_max_enum_number(),
            implementation_reserved: default_implementation_reserved(),
        }
    }
}

impl SchemaConfig {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: SchemaConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_number < MIN_MESSAGE_NUMBER {
            return Err(ConfigError::Invalid(format!(
                "maxMessageNumber must be at least {MIN_MESSAGE_NUMBER}"
            )));
        }
        Ok(())
    }
}
