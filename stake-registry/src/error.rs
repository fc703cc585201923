use {
    crate::{decimal::Dec, params::ConfigError, validator::BondStatus},
    solana_pubkey::Pubkey,
    thiserror::Error,
};

/// Errors produced by the stake registry.
///
/// Lookups report absence as `Ok(None)`, never as an error. Every variant for
/// which [`StakeError::is_contract_violation`] returns true means an internal
/// caller broke the registry's contract; the failed transition has been rolled
/// back and the block pipeline must halt rather than retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakeError {
    #[error("validator {0} not found")]
    ValidatorNotFound(Pubkey),

    #[error("validator {0} already exists")]
    ValidatorAlreadyExists(Pubkey),

    #[error("invalid staking parameters: {0}")]
    InvalidParams(#[from] ConfigError),

    #[error("slash fraction must be within [0, 1], got {0}")]
    InvalidSlashFraction(Dec),

    #[error("validator {operator} would hold {tokens} tokens, past the largest voting power")]
    PowerOutOfRange { operator: Pubkey, tokens: Dec },

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error(
        "cannot remove {requested} shares from validator {operator}: only {held} issued"
    )]
    InsufficientShares {
        operator: Pubkey,
        requested: Dec,
        held: Dec,
    },

    #[error("{bucket} token bucket underflow: holds {held}, asked to remove {requested}")]
    PoolUnderflow {
        bucket: &'static str,
        held: Dec,
        requested: Dec,
    },

    #[error("validator {operator} holds {tokens} tokens but {shares} shares")]
    SharesWithoutTokens {
        operator: Pubkey,
        tokens: Dec,
        shares: Dec,
    },

    #[error("validator {0} still holds tokens or shares")]
    ValidatorNotEmpty(Pubkey),

    #[error("consensus key of validator {0} cannot change once set")]
    ConsensusKeyChanged(Pubkey),

    #[error("consensus key {key} is already bound to validator {owner}")]
    DuplicateConsensusKey { key: Pubkey, owner: Pubkey },

    #[error("validator {operator} submitted as {submitted:?} but stored as {stored:?}")]
    StatusMismatch {
        operator: Pubkey,
        submitted: BondStatus,
        stored: BondStatus,
    },

    #[error("power index already holds an entry for validator {0}")]
    DuplicatePowerIndexEntry(Pubkey),

    #[error("power index has no entry for validator {0}")]
    StalePowerIndexEntry(Pubkey),

    #[error("corrupted {what} record: {reason}")]
    CorruptedRecord { what: &'static str, reason: String },
}

impl StakeError {
    /// True for every variant that can only be produced by a misbehaving
    /// internal caller or corrupted state.
    pub fn is_contract_violation(&self) -> bool {
        !matches!(
            self,
            StakeError::ValidatorNotFound(_)
                | StakeError::ValidatorAlreadyExists(_)
                | StakeError::InvalidParams(_)
                | StakeError::InvalidSlashFraction(_)
                | StakeError::PowerOutOfRange { .. }
        )
    }
}

pub type StakeResult<T> = Result<T, StakeError>;
