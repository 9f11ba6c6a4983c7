//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, slippage within bounds)
//! - Check token table integrity (unique addresses and symbols)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use crate::config::schema::AppConfig;
use crate::swap::types::MAX_SLIPPAGE_BPS;

/// Largest decimals value whose scale factor still fits in a U256.
pub const MAX_TOKEN_DECIMALS: u8 = 77;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.network.chain_id == 0 {
        errors.push(ValidationError::new("network.chain_id", "must be non-zero"));
    }
    for (field, value) in [
        ("network.rpc_url", &config.network.rpc_url),
        ("network.explorer_url", &config.network.explorer_url),
    ] {
        if let Err(e) = url::Url::parse(value) {
            errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
        }
    }

    if config.contracts.router.is_zero() {
        errors.push(ValidationError::new("contracts.router", "must not be the zero address"));
    }
    if config.contracts.factory.is_zero() {
        errors.push(ValidationError::new("contracts.factory", "must not be the zero address"));
    }

    if config.tokens.len() < 2 {
        errors.push(ValidationError::new("tokens", "at least two tokens are required"));
    }
    let mut addresses = HashSet::new();
    let mut symbols = HashSet::new();
    for (i, token) in config.tokens.iter().enumerate() {
        if !addresses.insert(token.address) {
            errors.push(ValidationError::new(
                format!("tokens[{}].address", i),
                format!("duplicate address {}", token.address),
            ));
        }
        if !symbols.insert(token.symbol.to_ascii_uppercase()) {
            errors.push(ValidationError::new(
                format!("tokens[{}].symbol", i),
                format!("duplicate symbol {}", token.symbol),
            ));
        }
        if token.decimals > MAX_TOKEN_DECIMALS {
            errors.push(ValidationError::new(
                format!("tokens[{}].decimals", i),
                format!("must be at most {}", MAX_TOKEN_DECIMALS),
            ));
        }
    }

    let swap = &config.swap;
    if swap.default_slippage_bps == 0 || swap.default_slippage_bps > MAX_SLIPPAGE_BPS {
        errors.push(ValidationError::new(
            "swap.default_slippage_bps",
            format!("must be within 1..={}", MAX_SLIPPAGE_BPS),
        ));
    }
    if swap.quote_debounce_ms == 0 {
        errors.push(ValidationError::new("swap.quote_debounce_ms", "must be positive"));
    }
    if swap.balance_poll_secs == 0 {
        errors.push(ValidationError::new("swap.balance_poll_secs", "must be positive"));
    }
    if swap.deadline_secs == 0 {
        errors.push(ValidationError::new("swap.deadline_secs", "must be positive"));
    }
    if swap.price_impact_warning_pct.is_nan() || swap.price_impact_warning_pct <= 0.0 {
        errors.push(ValidationError::new("swap.price_impact_warning_pct", "must be positive"));
    }

    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be positive"));
    }
    if config.chain.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.confirmation_timeout_secs", "must be positive"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.network.chain_id = 0;
        config.network.rpc_url = "not a url".to_string();
        config.swap.default_slippage_bps = 0;
        config.swap.balance_poll_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"network.chain_id"));
        assert!(fields.contains(&"network.rpc_url"));
        assert!(fields.contains(&"swap.default_slippage_bps"));
        assert!(fields.contains(&"swap.balance_poll_secs"));
    }

    #[test]
    fn test_duplicate_tokens() {
        let mut config = AppConfig::default();
        let mut dup = config.tokens[0].clone();
        dup.symbol = "tka".to_string();
        config.tokens.push(dup);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "tokens[2].address"));
        assert!(errors.iter().any(|e| e.field == "tokens[2].symbol"));
    }

    #[test]
    fn test_single_token_rejected() {
        let mut config = AppConfig::default();
        config.tokens.truncate(1);
        config.contracts.router = Address::ZERO;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "tokens"));
        assert!(errors.iter().any(|e| e.field == "contracts.router"));
    }
}
