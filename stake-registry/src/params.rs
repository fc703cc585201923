//! Staking parameters consumed by the registry.
//!
//! Only `max_validators` influences behaviour here; the remaining fields are
//! carried for the collaborators that share the parameter record.

use {
    borsh::{BorshDeserialize, BorshSerialize},
    serde::{Deserialize, Serialize},
};

/// Default upper bound on the bonded validator set.
pub const DEFAULT_MAX_VALIDATORS: u16 = 100;

/// Default bond denomination.
pub const DEFAULT_BOND_DENOM: &str = "trv1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StakingParams {
    /// Maximum number of validators in the bonded set.
    /// Default: 100.
    pub max_validators: u16,

    /// Denomination of bondable tokens. Opaque to the registry.
    /// Default: `"trv1"`.
    pub bond_denom: String,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            max_validators: DEFAULT_MAX_VALIDATORS,
            bond_denom: DEFAULT_BOND_DENOM.to_string(),
        }
    }
}

impl StakingParams {
    /// Validate parameters before they are stored.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_validators == 0 {
            return Err(ConfigError::ZeroMaxValidators);
        }
        if self.bond_denom.trim().is_empty() {
            return Err(ConfigError::EmptyBondDenom);
        }
        Ok(())
    }

    pub fn max_validators(&self) -> usize {
        usize::from(self.max_validators)
    }
}

/// Errors in staking parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_validators must be > 0")]
    ZeroMaxValidators,
    #[error("bond_denom must not be empty")]
    EmptyBondDenom,
}
