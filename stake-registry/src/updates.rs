//! Pending validator updates for the consensus engine.
//!
//! Within one window (between two [`clear`] calls) every consensus key has at
//! most one entry. A later write for the same key overwrites the power but
//! keeps the position of the first write, so the engine sees keys in the order
//! they were first touched.

use {
    crate::{
        error::{StakeError, StakeResult},
        store::{keys, KvStore},
    },
    borsh::{BorshDeserialize, BorshSerialize},
    log::*,
    serde::{Deserialize, Serialize},
    solana_pubkey::Pubkey,
};

/// A `(consensus key, power)` pair reported to the consensus engine. Power 0
/// removes the key from the engine's validator set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct ValidatorUpdate {
    pub pub_key: Pubkey,
    pub power: u64,
}

impl ValidatorUpdate {
    pub fn new(pub_key: Pubkey, power: u64) -> Self {
        Self { pub_key, power }
    }

    pub fn is_removal(&self) -> bool {
        self.power == 0
    }
}

#[derive(BorshSerialize, BorshDeserialize)]
struct PendingEntry {
    seq: u64,
    power: u64,
}

fn next_seq<S: KvStore + ?Sized>(store: &mut S) -> StakeResult<u64> {
    let seq = match store.get(keys::PENDING_UPDATE_SEQ_KEY) {
        Some(bytes) => keys::decode::<u64>("update sequence", &bytes)?,
        None => 0,
    };
    let next = seq
        .checked_add(1)
        .ok_or(StakeError::Overflow("update sequence"))?;
    store.set(keys::PENDING_UPDATE_SEQ_KEY, keys::encode("update sequence", &next)?);
    Ok(seq)
}

/// Record `update`, overwriting any earlier entry for the same key.
pub(crate) fn record<S: KvStore + ?Sized>(store: &mut S, update: ValidatorUpdate) -> StakeResult<()> {
    let key = keys::pending_update_key(&update.pub_key);
    let seq = match store.get(&key) {
        Some(bytes) => keys::decode::<PendingEntry>("pending update", &bytes)?.seq,
        None => next_seq(store)?,
    };
    trace!(
        "pending update {} -> power {} (seq {})",
        update.pub_key,
        update.power,
        seq
    );
    let entry = PendingEntry {
        seq,
        power: update.power,
    };
    store.set(&key, keys::encode("pending update", &entry)?);
    Ok(())
}

/// Snapshot of the window in first-touch order.
pub fn pending<S: KvStore + ?Sized>(store: &S) -> StakeResult<Vec<ValidatorUpdate>> {
    let mut entries = store
        .iter_prefix(&[keys::PENDING_UPDATES_PREFIX])
        .map(|(key, bytes)| {
            let pub_key = keys::pubkey_suffix("pending update", &key)?;
            let entry: PendingEntry = keys::decode("pending update", &bytes)?;
            Ok((entry.seq, ValidatorUpdate::new(pub_key, entry.power)))
        })
        .collect::<StakeResult<Vec<_>>>()?;
    entries.sort_unstable_by_key(|(seq, _)| *seq);
    Ok(entries.into_iter().map(|(_, update)| update).collect())
}

/// Empty the window and restart the sequence.
pub(crate) fn clear<S: KvStore + ?Sized>(store: &mut S) -> usize {
    let stale: Vec<Vec<u8>> = store
        .iter_prefix(&[keys::PENDING_UPDATES_PREFIX])
        .map(|(key, _)| key)
        .collect();
    for key in &stale {
        store.delete(key);
    }
    store.delete(keys::PENDING_UPDATE_SEQ_KEY);
    stale.len()
}
