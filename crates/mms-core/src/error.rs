//! Error types for mms-core.

use std::fmt;

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid currency pair {pair:?}: {reason}")]
    InvalidCurrencyPair { pair: String, reason: String },

    #[error("Invalid market {market}: {reason}")]
    InvalidMarket { market: String, reason: String },

    #[error("Invalid market map: {0}")]
    InvalidMarketMap(String),

    #[error("Invalid perpetual ticker: {0}")]
    InvalidPerpetualTicker(String),

    #[error("Metadata parse error for {market}: {reason}")]
    Metadata { market: String, reason: String },

    #[error("Schema validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn market(market: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMarket {
            market: market.into(),
            reason: reason.into(),
        }
    }
}

/// Accumulated schema failures.
///
/// Validation keeps going after the first failure so an operator sees every
/// broken market from one run. Display joins the failures with `"; "`.
#[derive(Debug, Default)]
pub struct ValidationErrors(Vec<CoreError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: CoreError) {
        // Flatten nested batches so Display stays a single flat list.
        match err {
            CoreError::Validation(inner) => self.0.extend(inner.0),
            other => self.0.push(other),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[CoreError] {
        &self.0
    }

    /// `Ok(())` when nothing was collected, otherwise `CoreError::Validation`.
    pub fn into_result(self) -> CoreResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_join() {
        let mut errs = ValidationErrors::new();
        assert!(errs.is_empty());

        errs.push(CoreError::market("BTC/USD", "no providers"));
        errs.push(CoreError::InvalidMarketMap("dangling ref".to_string()));

        let msg = errs.to_string();
        assert_eq!(
            msg,
            "Invalid market BTC/USD: no providers; Invalid market map: dangling ref"
        );
        assert!(errs.into_result().is_err());
    }

    #[test]
    fn test_validation_errors_flatten_nested() {
        let mut inner = ValidationErrors::new();
        inner.push(CoreError::market("A/B", "x"));
        inner.push(CoreError::market("C/D", "y"));

        let mut outer = ValidationErrors::new();
        outer.push(CoreError::Validation(inner));
        assert_eq!(outer.len(), 2);
    }

    #[test]
    fn test_empty_into_result_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
