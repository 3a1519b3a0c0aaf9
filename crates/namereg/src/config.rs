//! Registrar configuration.

use namereg_core::{Amount, MAX_NAME_LENGTH, MAX_VALUE_LENGTH};
use serde::{Deserialize, Serialize};

use crate::error::{RegistrarError, Result};

/// Configuration for the [`Registrar`](crate::Registrar).
///
/// Every field has a default, so a JSON document only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrarConfig {
    /// Longest accepted name, in bytes.
    pub max_name_length: usize,
    /// Longest accepted value, in bytes.
    pub max_value_length: usize,
    /// Pending operations allowed on one name before updates are refused.
    pub name_chain_limit: usize,
    /// Confirmations a commit needs before its queued reveal is released.
    pub reveal_maturity_depth: u32,
    /// Amount locked in every name output.
    pub name_locked_amount: Amount,
    /// Blocks after its last update at which a name expires.
    pub name_expiration_depth: u64,
    /// Output indices scanned when looking for a commit in the ledger.
    pub max_prevout_trials: u32,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            max_name_length: MAX_NAME_LENGTH,
            max_value_length: MAX_VALUE_LENGTH,
            name_chain_limit: 5,
            reveal_maturity_depth: 12,
            name_locked_amount: 1_000_000,
            name_expiration_depth: 36_000,
            max_prevout_trials: 1_000,
        }
    }
}

impl RegistrarConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RegistrarError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_name_length", self.max_name_length as u64),
            ("name_chain_limit", self.name_chain_limit as u64),
            ("name_locked_amount", self.name_locked_amount),
            ("name_expiration_depth", self.name_expiration_depth),
            ("max_prevout_trials", u64::from(self.max_prevout_trials)),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(RegistrarError::Config(format!("{} must be positive", field)));
            }
        }
        Ok(())
    }
}
