//! Validator records and the share/token conversion primitives.
//!
//! A validator's stake is tracked twice: as `tokens` (what it actually holds)
//! and as `delegator_shares` (proportional claims issued to delegators). The
//! exchange rate `tokens / shares` only moves down through an explicit slash.

use {
    crate::{
        decimal::Dec,
        error::{StakeError, StakeResult},
        pool::Pool,
        power_index::PowerRankKey,
        updates::ValidatorUpdate,
    },
    borsh::{BorshDeserialize, BorshSerialize},
    serde::{Deserialize, Serialize},
    solana_pubkey::Pubkey,
};

/// Bonding status of a validator.
///
/// Only two states are modelled. A time-delayed `Unbonding` exit state is part
/// of the wider staking design but has no semantics in this registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub enum BondStatus {
    /// Holds stake but is outside the active voting set.
    #[default]
    Unbonded,
    /// Member of the size-bounded active voting set.
    Bonded,
}

impl BondStatus {
    pub(crate) fn bucket_name(self) -> &'static str {
        match self {
            BondStatus::Bonded => "bonded",
            BondStatus::Unbonded => "loose",
        }
    }
}

/// Free-form operator metadata. Opaque to the registry.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Description {
    pub moniker: String,
    pub identity: String,
    pub website: String,
    pub details: String,
}

impl Description {
    pub fn with_moniker(moniker: impl Into<String>) -> Self {
        Self {
            moniker: moniker.into(),
            ..Self::default()
        }
    }
}

/// A registered validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Validator {
    /// Operator identity. Primary key, never changes.
    pub operator: Pubkey,
    /// Consensus public key reported to the consensus engine. Secondary key,
    /// never changes once stored.
    pub consensus_pubkey: Pubkey,
    pub description: Description,
    pub status: BondStatus,
    /// Excluded from the power index and never bonded while set.
    pub jailed: bool,
    pub tokens: Dec,
    pub delegator_shares: Dec,
    /// Height of the rank stamp. Frozen while Bonded.
    pub bond_height: u64,
    /// Order of the rank stamp within `bond_height`.
    pub bond_intra_tx_counter: u32,
}

impl Validator {
    /// A zero-state, unbonded record.
    pub fn new(operator: Pubkey, consensus_pubkey: Pubkey, description: Description) -> Self {
        Self {
            operator,
            consensus_pubkey,
            description,
            status: BondStatus::Unbonded,
            jailed: false,
            tokens: Dec::ZERO,
            delegator_shares: Dec::ZERO,
            bond_height: 0,
            bond_intra_tx_counter: 0,
        }
    }

    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }

    /// Voting power: tokens rounded half-to-even to a whole number.
    ///
    /// The registry refuses any record whose power would not fit, so this is
    /// total for every stored validator. Use [`Self::checked_power`] on
    /// records that have not been through the registry.
    pub fn power(&self) -> u64 {
        self.checked_power().unwrap_or(u64::MAX)
    }

    /// Voting power, or `PowerOutOfRange` when the tokens round past `u64::MAX`.
    pub fn checked_power(&self) -> StakeResult<u64> {
        power_of(self.operator, self.tokens)
    }

    /// Power-index key for the current snapshot of this record.
    ///
    /// Pool totals never take part in the ranking, so the key depends on the
    /// record alone and must be recomputed whenever tokens or the rank stamp
    /// change.
    pub fn power_rank_key(&self) -> PowerRankKey {
        PowerRankKey::new(
            self.power(),
            self.bond_height,
            self.bond_intra_tx_counter,
            &self.operator,
        )
    }

    /// Tokens per share, or `None` before any share has been issued.
    pub fn exchange_rate(&self) -> Option<Dec> {
        if self.delegator_shares.is_zero() {
            return None;
        }
        self.tokens.checked_quo(self.delegator_shares)
    }

    /// True once both tokens and shares are gone and the record can be deleted.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_zero() && self.delegator_shares.is_zero()
    }

    /// Update advertising this validator's current power.
    pub fn consensus_update(&self) -> ValidatorUpdate {
        ValidatorUpdate {
            pub_key: self.consensus_pubkey,
            power: self.power(),
        }
    }

    /// Update removing this validator from the consensus set.
    pub fn consensus_update_zero(&self) -> ValidatorUpdate {
        ValidatorUpdate {
            pub_key: self.consensus_pubkey,
            power: 0,
        }
    }

    /// Issue shares for `amount` freshly delegated tokens.
    ///
    /// Shares are issued at the current exchange rate (1:1 for a validator
    /// without shares), and `amount` is credited to the pool bucket matching
    /// the validator's *current* status. Status and rank are untouched; the
    /// caller follows up with the bonding state machine. Returns the shares
    /// issued. On error neither the validator nor the pool is modified.
    pub fn add_tokens_from_delegation(&mut self, pool: &mut Pool, amount: Dec) -> StakeResult<Dec> {
        let issued = if self.delegator_shares.is_zero() {
            amount
        } else {
            if self.tokens.is_zero() {
                return Err(StakeError::SharesWithoutTokens {
                    operator: self.operator,
                    tokens: self.tokens,
                    shares: self.delegator_shares,
                });
            }
            amount
                .checked_mul_quo(self.delegator_shares, self.tokens)
                .ok_or(StakeError::Overflow("share issuance"))?
        };

        let tokens = self
            .tokens
            .checked_add(amount)
            .ok_or(StakeError::Overflow("validator tokens"))?;
        power_of(self.operator, tokens)?;
        let shares = self
            .delegator_shares
            .checked_add(issued)
            .ok_or(StakeError::Overflow("delegator shares"))?;
        let mut next_pool = *pool;
        next_pool.credit(self.status, amount)?;

        self.tokens = tokens;
        self.delegator_shares = shares;
        *pool = next_pool;
        Ok(issued)
    }

    /// Burn `shares` and release the tokens backing them.
    ///
    /// Tokens removed are `shares * tokens / delegator_shares`; removing every
    /// share releases exactly every token. The released amount is debited from
    /// the pool bucket matching the current status and returned for the
    /// caller's balance accounting. Asking for more shares than were issued is
    /// a contract violation. On error nothing is modified.
    pub fn remove_delegator_shares(&mut self, pool: &mut Pool, shares: Dec) -> StakeResult<Dec> {
        if shares > self.delegator_shares {
            return Err(StakeError::InsufficientShares {
                operator: self.operator,
                requested: shares,
                held: self.delegator_shares,
            });
        }

        let released = if shares == self.delegator_shares {
            self.tokens
        } else {
            shares
                .checked_mul_quo(self.tokens, self.delegator_shares)
                .ok_or(StakeError::Overflow("share redemption"))?
        };

        let tokens = self
            .tokens
            .checked_sub(released)
            .ok_or(StakeError::PoolUnderflow {
                bucket: "validator",
                held: self.tokens,
                requested: released,
            })?;
        let remaining_shares = self
            .delegator_shares
            .checked_sub(shares)
            .ok_or(StakeError::Overflow("delegator shares"))?;
        if tokens.is_zero() && remaining_shares.is_positive() {
            return Err(StakeError::SharesWithoutTokens {
                operator: self.operator,
                tokens,
                shares: remaining_shares,
            });
        }
        let mut next_pool = *pool;
        next_pool.debit(self.status, released)?;

        self.tokens = tokens;
        self.delegator_shares = remaining_shares;
        *pool = next_pool;
        Ok(released)
    }
}

fn power_of(operator: Pubkey, tokens: Dec) -> StakeResult<u64> {
    tokens
        .round_u64()
        .ok_or(StakeError::PowerOutOfRange { operator, tokens })
}
