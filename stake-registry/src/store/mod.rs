//! Storage context and singleton records.

pub(crate) mod keys;
mod kv;

pub use kv::{CacheStore, KvPair, KvStore, MemoryStore};

use crate::{error::StakeResult, params::StakingParams, pool::Pool};

/// Stored parameters, or the defaults if none were ever written.
pub fn get_params<S: KvStore + ?Sized>(store: &S) -> StakeResult<StakingParams> {
    match store.get(keys::PARAMS_KEY) {
        Some(bytes) => keys::decode("params", &bytes),
        None => Ok(StakingParams::default()),
    }
}

pub(crate) fn set_params<S: KvStore + ?Sized>(
    store: &mut S,
    params: &StakingParams,
) -> StakeResult<()> {
    store.set(keys::PARAMS_KEY, keys::encode("params", params)?);
    Ok(())
}

/// Stored pool, or an empty pool if none was ever written.
pub fn get_pool<S: KvStore + ?Sized>(store: &S) -> StakeResult<Pool> {
    match store.get(keys::POOL_KEY) {
        Some(bytes) => keys::decode("pool", &bytes),
        None => Ok(Pool::default()),
    }
}

pub(crate) fn set_pool<S: KvStore + ?Sized>(store: &mut S, pool: &Pool) -> StakeResult<()> {
    store.set(keys::POOL_KEY, keys::encode("pool", pool)?);
    Ok(())
}
