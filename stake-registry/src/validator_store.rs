//! Keyed validator storage with a consensus-key secondary index and the
//! bonded-membership index. No ranking logic lives here.

use {
    crate::{
        error::{StakeError, StakeResult},
        store::{keys, KvStore},
        validator::Validator,
    },
    solana_pubkey::Pubkey,
};

pub fn get<S: KvStore + ?Sized>(store: &S, operator: &Pubkey) -> StakeResult<Option<Validator>> {
    store
        .get(&keys::validator_key(operator))
        .map(|bytes| keys::decode("validator", &bytes))
        .transpose()
}

pub fn get_by_consensus_key<S: KvStore + ?Sized>(
    store: &S,
    consensus_pubkey: &Pubkey,
) -> StakeResult<Option<Validator>> {
    match store.get(&keys::consensus_key_index_key(consensus_pubkey)) {
        Some(operator) => {
            let operator = keys::pubkey_value("consensus key index", &operator)?;
            get(store, &operator)
        }
        None => Ok(None),
    }
}

/// Upsert by operator and bind the consensus key to it.
///
/// The consensus key of a stored validator is immutable, and a consensus key
/// can belong to at most one operator.
pub(crate) fn put<S: KvStore + ?Sized>(store: &mut S, validator: &Validator) -> StakeResult<()> {
    if let Some(stored) = get(store, &validator.operator)? {
        if stored.consensus_pubkey != validator.consensus_pubkey {
            return Err(StakeError::ConsensusKeyChanged(validator.operator));
        }
    }
    let index_key = keys::consensus_key_index_key(&validator.consensus_pubkey);
    if let Some(owner) = store.get(&index_key) {
        let owner = keys::pubkey_value("consensus key index", &owner)?;
        if owner != validator.operator {
            return Err(StakeError::DuplicateConsensusKey {
                key: validator.consensus_pubkey,
                owner,
            });
        }
    }

    store.set(
        &keys::validator_key(&validator.operator),
        keys::encode("validator", validator)?,
    );
    store.set(&index_key, validator.operator.to_bytes().to_vec());
    Ok(())
}

/// Remove the record and its consensus-key binding.
///
/// Callers must already have dropped the power-index entry, the bonded
/// membership marker and reconciled the pool.
pub(crate) fn delete<S: KvStore + ?Sized>(store: &mut S, validator: &Validator) {
    store.delete(&keys::validator_key(&validator.operator));
    store.delete(&keys::consensus_key_index_key(&validator.consensus_pubkey));
}

pub fn is_bonded<S: KvStore + ?Sized>(store: &S, operator: &Pubkey) -> bool {
    store.has(&keys::bonded_validator_key(operator))
}

pub(crate) fn mark_bonded<S: KvStore + ?Sized>(store: &mut S, operator: &Pubkey) {
    store.set(&keys::bonded_validator_key(operator), Vec::new());
}

pub(crate) fn unmark_bonded<S: KvStore + ?Sized>(store: &mut S, operator: &Pubkey) {
    store.delete(&keys::bonded_validator_key(operator));
}

/// Operators in the bonded-membership index, in operator-byte order.
pub fn bonded_operators<S: KvStore + ?Sized>(store: &S) -> StakeResult<Vec<Pubkey>> {
    store
        .iter_prefix(&[keys::BONDED_VALIDATORS_PREFIX])
        .map(|(key, _)| keys::pubkey_suffix("bonded index", &key))
        .collect()
}

pub fn bonded_count<S: KvStore + ?Sized>(store: &S) -> usize {
    store
        .iter_prefix(&[keys::BONDED_VALIDATORS_PREFIX])
        .count()
}

/// Every bonded record, in operator-byte order.
pub fn list_bonded<S: KvStore + ?Sized>(store: &S) -> StakeResult<Vec<Validator>> {
    bonded_operators(store)?
        .iter()
        .map(|operator| {
            get(store, operator)?.ok_or_else(|| StakeError::CorruptedRecord {
                what: "bonded index",
                reason: format!("operator {operator} has no validator record"),
            })
        })
        .collect()
}

/// Every record, in operator-byte order.
pub fn list_all<S: KvStore + ?Sized>(store: &S) -> StakeResult<Vec<Validator>> {
    store
        .iter_prefix(&[keys::VALIDATORS_PREFIX])
        .map(|(_, bytes)| keys::decode("validator", &bytes))
        .collect()
}
