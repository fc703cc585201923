//! Power-ordered index of non-jailed validators.
//!
//! Each entry is a [`PowerRankKey`] stored under the `0x24` prefix with an
//! empty value. Keys are laid out so that plain ascending byte order is rank
//! order (best first), which makes `top_k` a forward prefix scan and lets
//! every node derive the same ranking from the same bytes.

use {
    crate::{
        error::{StakeError, StakeResult},
        store::{keys, KvStore},
    },
    solana_pubkey::Pubkey,
    std::fmt,
};

const POWER_END: usize = 8;
const HEIGHT_END: usize = 16;
const COUNTER_END: usize = 20;

/// Composite ranking key:
/// `!power (u64 BE) | bond_height (u64 BE) | intra_tx_counter (u32 BE) | operator`.
///
/// Higher power sorts first; among equal power an earlier stamp (lower height,
/// then lower counter) outranks a later one; the operator breaks any remaining
/// tie so no two validators ever compare equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PowerRankKey([u8; PowerRankKey::LEN]);

impl PowerRankKey {
    pub const LEN: usize = 52;

    pub fn new(power: u64, bond_height: u64, intra_tx_counter: u32, operator: &Pubkey) -> Self {
        let mut bytes = [0u8; Self::LEN];
        bytes[..POWER_END].copy_from_slice(&(!power).to_be_bytes());
        bytes[POWER_END..HEIGHT_END].copy_from_slice(&bond_height.to_be_bytes());
        bytes[HEIGHT_END..COUNTER_END].copy_from_slice(&intra_tx_counter.to_be_bytes());
        bytes[COUNTER_END..].copy_from_slice(operator.as_ref());
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> StakeResult<Self> {
        <[u8; Self::LEN]>::try_from(bytes)
            .map(Self)
            .map_err(|_| StakeError::CorruptedRecord {
                what: "power rank key",
                reason: format!("expected {} bytes, got {}", Self::LEN, bytes.len()),
            })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn power(&self) -> u64 {
        !u64::from_be_bytes(self.field::<8>(0))
    }

    pub fn bond_height(&self) -> u64 {
        u64::from_be_bytes(self.field::<8>(POWER_END))
    }

    pub fn intra_tx_counter(&self) -> u32 {
        u32::from_be_bytes(self.field::<4>(HEIGHT_END))
    }

    pub fn operator(&self) -> Pubkey {
        Pubkey::new_from_array(self.field::<32>(COUNTER_END))
    }

    fn field<const N: usize>(&self, start: usize) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.0[start..start.saturating_add(N)]);
        out
    }

    /// True if `self` ranks strictly better than `other`.
    pub fn outranks(&self, other: &PowerRankKey) -> bool {
        self < other
    }
}

impl fmt::Debug for PowerRankKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerRankKey")
            .field("power", &self.power())
            .field("bond_height", &self.bond_height())
            .field("intra_tx_counter", &self.intra_tx_counter())
            .field("operator", &self.operator())
            .finish()
    }
}

pub fn exists<S: KvStore + ?Sized>(store: &S, key: &PowerRankKey) -> bool {
    store.has(&keys::power_index_key(key.as_bytes()))
}

pub(crate) fn insert<S: KvStore + ?Sized>(store: &mut S, key: &PowerRankKey) -> StakeResult<()> {
    if exists(store, key) {
        return Err(StakeError::DuplicatePowerIndexEntry(key.operator()));
    }
    store.set(&keys::power_index_key(key.as_bytes()), Vec::new());
    Ok(())
}

pub(crate) fn remove<S: KvStore + ?Sized>(store: &mut S, key: &PowerRankKey) -> StakeResult<()> {
    if !exists(store, key) {
        return Err(StakeError::StalePowerIndexEntry(key.operator()));
    }
    store.delete(&keys::power_index_key(key.as_bytes()));
    Ok(())
}

/// Replace `old` with `new`. Either side may be absent (jailed snapshot).
pub(crate) fn replace<S: KvStore + ?Sized>(
    store: &mut S,
    old: Option<&PowerRankKey>,
    new: Option<&PowerRankKey>,
) -> StakeResult<()> {
    if old == new {
        return Ok(());
    }
    if let Some(old) = old {
        remove(store, old)?;
    }
    if let Some(new) = new {
        insert(store, new)?;
    }
    Ok(())
}

/// Every entry in rank order, best first.
pub fn iter<S: KvStore + ?Sized>(
    store: &S,
) -> impl Iterator<Item = StakeResult<PowerRankKey>> + '_ {
    store
        .iter_prefix(&[keys::VALIDATORS_BY_POWER_PREFIX])
        .map(|(key, _)| PowerRankKey::from_bytes(key.get(1..).unwrap_or_default()))
}

/// The best `limit` entries, best first.
pub fn top_k<S: KvStore + ?Sized>(store: &S, limit: usize) -> StakeResult<Vec<PowerRankKey>> {
    iter(store).take(limit).collect()
}

/// The entry at rank `n` (0 = best), if the index holds that many.
pub fn nth<S: KvStore + ?Sized>(store: &S, n: usize) -> StakeResult<Option<PowerRankKey>> {
    iter(store).nth(n).transpose()
}
