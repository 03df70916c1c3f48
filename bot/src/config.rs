//! Configuration management for the raffle bot.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tombola_core::types::Money;

/// A configuration value could not be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value of the wrong shape.
    #[error("environment variable {name} is invalid: {value:?}")]
    Invalid {
        /// The offending variable.
        name: &'static str,
        /// The raw value found.
        value: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Location of the durable JSON snapshot.
    pub store_path: PathBuf,
    /// Pool capacity N.
    pub total_tickets: u32,
    /// Price of one ticket.
    pub ticket_price: Money,
    /// Prize shown in raffle info.
    pub prize_name: String,
    /// Card number users transfer the payment to.
    pub card_number: String,
}

impl Settings {
    /// Hydrates settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store_path: PathBuf::from(var_or("STORE_PATH", "data/store.json")),
            total_tickets: parse_var("TOTAL_TICKETS", 300)?,
            ticket_price: Money::new(parse_var("TICKET_PRICE", 50_000)?),
            prize_name: var_or("PRIZE_NAME", "iPhone 16 Pro Max"),
            card_number: var_or("CARD_NUMBER", ""),
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}
