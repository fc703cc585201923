//! Cliff validator cache: the lowest-ranked bonded validator while the bonded
//! set is at capacity. Absent whenever there is room in the set.

use {
    crate::{
        error::StakeResult,
        power_index::{self, PowerRankKey},
        store::{keys, KvStore},
        validator_store,
    },
    log::*,
    solana_pubkey::Pubkey,
};

pub fn get_validator<S: KvStore + ?Sized>(store: &S) -> StakeResult<Option<Pubkey>> {
    store
        .get(keys::CLIFF_VALIDATOR_KEY)
        .map(|bytes| keys::pubkey_value("cliff validator", &bytes))
        .transpose()
}

pub fn get_power<S: KvStore + ?Sized>(store: &S) -> StakeResult<Option<PowerRankKey>> {
    store
        .get(keys::CLIFF_VALIDATOR_POWER_KEY)
        .map(|bytes| PowerRankKey::from_bytes(&bytes))
        .transpose()
}

fn set<S: KvStore + ?Sized>(store: &mut S, key: &PowerRankKey) {
    store.set(keys::CLIFF_VALIDATOR_KEY, key.operator().to_bytes().to_vec());
    store.set(keys::CLIFF_VALIDATOR_POWER_KEY, key.as_bytes().to_vec());
}

fn clear<S: KvStore + ?Sized>(store: &mut S) {
    store.delete(keys::CLIFF_VALIDATOR_KEY);
    store.delete(keys::CLIFF_VALIDATOR_POWER_KEY);
}

/// Recompute the cache from the bonded set and the power index.
///
/// Relies on the bonded set being exactly the head of the power index, so the
/// cliff is the entry at rank `max_validators - 1`.
pub(crate) fn recompute<S: KvStore + ?Sized>(
    store: &mut S,
    max_validators: usize,
) -> StakeResult<Option<PowerRankKey>> {
    let previous = get_power(store)?;
    let at_capacity = validator_store::bonded_count(store) >= max_validators;
    let cliff = match max_validators.checked_sub(1) {
        Some(last) if at_capacity => power_index::nth(store, last)?,
        _ => None,
    };

    if cliff != previous {
        match &cliff {
            Some(key) => {
                info!(
                    "cliff validator is now {} (power {})",
                    key.operator(),
                    key.power()
                );
                set(store, key);
            }
            None => {
                debug!("bonded set below capacity, no cliff validator");
                clear(store);
            }
        }
    }
    Ok(cliff)
}
