//! Key layout of the registry inside the injected store.
//!
//! ```text
//! 0x00                      -> StakingParams
//! 0x01                      -> Pool
//! 0x02                      -> IntraTxCounter
//! 0x21 | operator           -> Validator
//! 0x22 | consensus pubkey   -> operator
//! 0x23 | operator           -> (empty)           bonded membership
//! 0x24 | PowerRankKey       -> (empty)           power index
//! 0x31                      -> operator          cliff validator
//! 0x32                      -> PowerRankKey      cliff power
//! 0x41 | consensus pubkey   -> (seq, power)      pending updates
//! 0x42                      -> u64               next update sequence
//! ```

use {
    crate::error::{StakeError, StakeResult},
    borsh::{BorshDeserialize, BorshSerialize},
    solana_pubkey::Pubkey,
};

pub(crate) const PARAMS_KEY: &[u8] = &[0x00];
pub(crate) const POOL_KEY: &[u8] = &[0x01];
pub(crate) const INTRA_TX_COUNTER_KEY: &[u8] = &[0x02];

pub(crate) const VALIDATORS_PREFIX: u8 = 0x21;
pub(crate) const VALIDATORS_BY_CONSENSUS_KEY_PREFIX: u8 = 0x22;
pub(crate) const BONDED_VALIDATORS_PREFIX: u8 = 0x23;
pub(crate) const VALIDATORS_BY_POWER_PREFIX: u8 = 0x24;

pub(crate) const CLIFF_VALIDATOR_KEY: &[u8] = &[0x31];
pub(crate) const CLIFF_VALIDATOR_POWER_KEY: &[u8] = &[0x32];

pub(crate) const PENDING_UPDATES_PREFIX: u8 = 0x41;
pub(crate) const PENDING_UPDATE_SEQ_KEY: &[u8] = &[0x42];

fn prefixed(prefix: u8, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(suffix.len().saturating_add(1));
    key.push(prefix);
    key.extend_from_slice(suffix);
    key
}

pub(crate) fn validator_key(operator: &Pubkey) -> Vec<u8> {
    prefixed(VALIDATORS_PREFIX, operator.as_ref())
}

pub(crate) fn consensus_key_index_key(consensus_pubkey: &Pubkey) -> Vec<u8> {
    prefixed(VALIDATORS_BY_CONSENSUS_KEY_PREFIX, consensus_pubkey.as_ref())
}

pub(crate) fn bonded_validator_key(operator: &Pubkey) -> Vec<u8> {
    prefixed(BONDED_VALIDATORS_PREFIX, operator.as_ref())
}

pub(crate) fn power_index_key(rank_key: &[u8]) -> Vec<u8> {
    prefixed(VALIDATORS_BY_POWER_PREFIX, rank_key)
}

pub(crate) fn pending_update_key(consensus_pubkey: &Pubkey) -> Vec<u8> {
    prefixed(PENDING_UPDATES_PREFIX, consensus_pubkey.as_ref())
}

/// Strip the one-byte prefix and read the remaining 32 bytes as a pubkey.
pub(crate) fn pubkey_suffix(what: &'static str, key: &[u8]) -> StakeResult<Pubkey> {
    key.get(1..)
        .and_then(|suffix| Pubkey::try_from(suffix).ok())
        .ok_or_else(|| StakeError::CorruptedRecord {
            what,
            reason: format!("expected a 32-byte key suffix, got {} bytes", key.len()),
        })
}

pub(crate) fn pubkey_value(what: &'static str, value: &[u8]) -> StakeResult<Pubkey> {
    Pubkey::try_from(value).map_err(|_| StakeError::CorruptedRecord {
        what,
        reason: format!("expected 32 bytes, got {}", value.len()),
    })
}

pub(crate) fn encode<T: BorshSerialize>(what: &'static str, value: &T) -> StakeResult<Vec<u8>> {
    borsh::to_vec(value).map_err(|err| StakeError::CorruptedRecord {
        what,
        reason: err.to_string(),
    })
}

pub(crate) fn decode<T: BorshDeserialize>(what: &'static str, bytes: &[u8]) -> StakeResult<T> {
    borsh::from_slice(bytes).map_err(|err| StakeError::CorruptedRecord {
        what,
        reason: err.to_string(),
    })
}
