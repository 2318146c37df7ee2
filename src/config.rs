//! Runtime configuration.
//!
//! Defaults reproduce the storefront's production constants. Every value can
//! be overridden through `STOREFRONT_*` environment variables (a `.env` file
//! is loaded by `main` before [`AppConfig::from_env`] runs).

use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// A delivery zone matched by a keyword appearing in the customer address.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryZone {
    pub keyword: String,
    pub fee: Decimal,
}

impl DeliveryZone {
    pub fn new(keyword: impl Into<String>, fee: impl Into<Decimal>) -> Self {
        Self {
            keyword: keyword.into(),
            fee: fee.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    /// Checked in order; the first zone whose keyword matches wins.
    pub zones: Vec<DeliveryZone>,
    pub fallback_fee: Decimal,
    /// Share of a pre-order subtotal collected up front.
    pub pre_order_ratio: Decimal,
    /// Up-front amounts are rounded to a multiple of this.
    pub rounding_step: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            zones: vec![DeliveryZone::new("savar", 70), DeliveryZone::new("dhaka", 110)],
            fallback_fee: Decimal::from(150),
            pre_order_ratio: Decimal::new(25, 2),
            rounding_step: Decimal::from(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Attempts a transaction gets before a write conflict is reported.
    pub max_attempts: u32,
    pub channel_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            channel_buffer: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub store: StoreConfig,
    /// File backing the anonymous visitor's cart.
    pub local_cart_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig::default(),
            store: StoreConfig::default(),
            local_cart_path: PathBuf::from("storefront-cart.json"),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the environment, falling back to defaults for
    /// unset variables.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] when a variable is set but cannot
    /// be parsed or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(fee) = parse_fee(&lookup, "STOREFRONT_FEE_SAVAR")? {
            set_zone_fee(&mut config.pricing, "savar", fee);
        }
        if let Some(fee) = parse_fee(&lookup, "STOREFRONT_FEE_DHAKA")? {
            set_zone_fee(&mut config.pricing, "dhaka", fee);
        }
        if let Some(fee) = parse_fee(&lookup, "STOREFRONT_FEE_DEFAULT")? {
            config.pricing.fallback_fee = fee;
        }
        if let Some(ratio) = parse_var::<Decimal>(&lookup, "STOREFRONT_PREORDER_RATIO")? {
            if ratio < Decimal::ZERO || ratio > Decimal::ONE {
                return Err(invalid("STOREFRONT_PREORDER_RATIO", "must be between 0 and 1"));
            }
            config.pricing.pre_order_ratio = ratio;
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "STOREFRONT_TX_MAX_ATTEMPTS")? {
            if attempts == 0 {
                return Err(invalid("STOREFRONT_TX_MAX_ATTEMPTS", "must be at least 1"));
            }
            config.store.max_attempts = attempts;
        }
        if let Some(buffer) = parse_var::<usize>(&lookup, "STOREFRONT_CHANNEL_BUFFER")? {
            if buffer == 0 {
                return Err(invalid("STOREFRONT_CHANNEL_BUFFER", "must be at least 1"));
            }
            config.store.channel_buffer = buffer;
        }
        if let Some(path) = lookup("STOREFRONT_LOCAL_CART") {
            config.local_cart_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(key, &e.to_string())),
    }
}

fn parse_fee(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Decimal>, ConfigError> {
    match parse_var::<Decimal>(lookup, key)? {
        Some(fee) if fee.is_sign_negative() => Err(invalid(key, "must not be negative")),
        fee => Ok(fee),
    }
}

fn set_zone_fee(pricing: &mut PricingConfig, keyword: &str, fee: Decimal) {
    match pricing.zones.iter_mut().find(|zone| zone.keyword == keyword) {
        Some(zone) => zone.fee = fee,
        None => pricing.zones.push(DeliveryZone::new(keyword, fee)),
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
