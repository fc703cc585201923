//! Staking keeper: the entry point used by the block-execution pipeline.
//!
//! The keeper owns the injected store and the current block height. Every
//! mutating call runs inside a [`CacheStore`] and is flushed only when it
//! succeeds, so a transition either commits as a whole or leaves no trace.

use {
    crate::{
        bonding, cliff,
        decimal::Dec,
        error::{StakeError, StakeResult},
        params::StakingParams,
        pool::Pool,
        power_index::{self, PowerRankKey},
        store::{self, CacheStore, KvStore},
        updates::{self, ValidatorUpdate},
        validator::{Description, Validator},
        validator_store,
    },
    log::*,
    solana_pubkey::Pubkey,
};

pub struct StakingKeeper<S: KvStore> {
    store: S,
    block_height: u64,
}

impl<S: KvStore> StakingKeeper<S> {
    /// Wrap an existing store. Height starts at 0 until [`Self::begin_block`].
    pub fn new(store: S) -> Self {
        Self {
            store,
            block_height: 0,
        }
    }

    /// Wrap a store and install `params`.
    pub fn with_params(store: S, params: StakingParams) -> StakeResult<Self> {
        let mut keeper = Self::new(store);
        keeper.set_params(&params)?;
        Ok(keeper)
    }

    /// Set the height used to stamp rank changes from now on.
    pub fn begin_block(&mut self, height: u64) {
        trace!("begin block {height}");
        self.block_height = height;
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn transact<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut CacheStore<'_, S>, u64) -> StakeResult<T>,
    ) -> StakeResult<T> {
        let height = self.block_height;
        let mut cache = CacheStore::new(&mut self.store);
        match f(&mut cache, height) {
            Ok(out) => {
                cache.write();
                Ok(out)
            }
            Err(err) => {
                if err.is_contract_violation() {
                    error!("{operation} at height {height} rolled back: {err}");
                } else {
                    debug!("{operation} at height {height} rejected: {err}");
                }
                Err(err)
            }
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    pub fn params(&self) -> StakeResult<StakingParams> {
        store::get_params(&self.store)
    }

    pub fn pool(&self) -> StakeResult<Pool> {
        store::get_pool(&self.store)
    }

    pub fn validator(&self, operator: &Pubkey) -> StakeResult<Option<Validator>> {
        validator_store::get(&self.store, operator)
    }

    pub fn validator_by_consensus_key(
        &self,
        consensus_pubkey: &Pubkey,
    ) -> StakeResult<Option<Validator>> {
        validator_store::get_by_consensus_key(&self.store, consensus_pubkey)
    }

    /// Every validator, in operator-byte order.
    pub fn all_validators(&self) -> StakeResult<Vec<Validator>> {
        validator_store::list_all(&self.store)
    }

    /// Bonded validators, in operator-byte order.
    pub fn bonded_validators(&self) -> StakeResult<Vec<Validator>> {
        validator_store::list_bonded(&self.store)
    }

    /// Bonded validators, best-ranked first.
    pub fn validators_by_power(&self) -> StakeResult<Vec<Validator>> {
        let max_validators = self.params()?.max_validators();
        power_index::top_k(&self.store, max_validators)?
            .iter()
            .filter(|key| validator_store::is_bonded(&self.store, &key.operator()))
            .map(|key| {
                validator_store::get(&self.store, &key.operator())?.ok_or_else(|| {
                    StakeError::CorruptedRecord {
                        what: "power index",
                        reason: format!("operator {} has no record", key.operator()),
                    }
                })
            })
            .collect()
    }

    pub fn cliff_validator(&self) -> StakeResult<Option<Pubkey>> {
        cliff::get_validator(&self.store)
    }

    pub fn cliff_validator_power(&self) -> StakeResult<Option<PowerRankKey>> {
        cliff::get_power(&self.store)
    }

    pub fn power_index_contains(&self, key: &PowerRankKey) -> bool {
        power_index::exists(&self.store, key)
    }

    /// Updates recorded since the last [`Self::clear_pending_updates`].
    pub fn pending_updates(&self) -> StakeResult<Vec<ValidatorUpdate>> {
        updates::pending(&self.store)
    }

    // ── Writes ──────────────────────────────────────────────────────────────

    /// Validate and store `params`, rebalancing the bonded set if the bound
    /// changed.
    pub fn set_params(&mut self, params: &StakingParams) -> StakeResult<()> {
        self.transact("set_params", |store, height| {
            bonding::set_params(store, height, params)
        })
    }

    /// Overwrite the pool record. Used by the delegation collaborator after
    /// applying the share primitives on a [`Validator`] directly.
    pub fn set_pool(&mut self, pool: &Pool) -> StakeResult<()> {
        self.transact("set_pool", |store, _| store::set_pool(store, pool))
    }

    /// Apply a changed validator record: re-rank it, flip its status if it
    /// crossed the cliff, and record the resulting consensus updates.
    pub fn update_validator(&mut self, validator: Validator) -> StakeResult<Validator> {
        self.transact("update_validator", |store, height| {
            bonding::update_validator(store, height, validator)
        })
    }

    /// Register a new validator backed by `amount` self-delegated tokens.
    /// Returns the stored record and the shares issued.
    pub fn create_validator(
        &mut self,
        operator: Pubkey,
        consensus_pubkey: Pubkey,
        description: Description,
        amount: Dec,
    ) -> StakeResult<(Validator, Dec)> {
        self.transact("create_validator", |store, height| {
            if validator_store::get(store, &operator)?.is_some() {
                return Err(StakeError::ValidatorAlreadyExists(operator));
            }
            let validator = Validator::new(operator, consensus_pubkey, description);
            bonding::delegate(store, height, validator, amount)
        })
    }

    /// Delegate `amount` tokens to an existing validator.
    pub fn delegate(&mut self, operator: &Pubkey, amount: Dec) -> StakeResult<(Validator, Dec)> {
        self.transact("delegate", |store, height| {
            let validator = validator_store::get(store, operator)?
                .ok_or(StakeError::ValidatorNotFound(*operator))?;
            bonding::delegate(store, height, validator, amount)
        })
    }

    /// Redeem `shares` of `operator`. Returns the tokens released. A validator
    /// left with neither tokens nor shares is removed.
    pub fn undelegate(&mut self, operator: &Pubkey, shares: Dec) -> StakeResult<Dec> {
        self.transact("undelegate", |store, height| {
            bonding::undelegate(store, height, operator, shares)
        })
    }

    /// Burn `fraction` of the stake behind `consensus_pubkey`.
    ///
    /// `infraction_height` and `power` only identify the offence in logs.
    /// Returns the tokens burned, or `None` when the key is unknown.
    pub fn slash(
        &mut self,
        consensus_pubkey: &Pubkey,
        infraction_height: u64,
        power: u64,
        fraction: Dec,
    ) -> StakeResult<Option<Dec>> {
        self.transact("slash", |store, height| {
            bonding::slash(
                store,
                height,
                consensus_pubkey,
                infraction_height,
                power,
                fraction,
            )
        })
    }

    pub fn jail(&mut self, consensus_pubkey: &Pubkey) -> StakeResult<Validator> {
        self.transact("jail", |store, height| {
            bonding::set_jailed(store, height, consensus_pubkey, true)
        })
    }

    pub fn unjail(&mut self, consensus_pubkey: &Pubkey) -> StakeResult<Validator> {
        self.transact("unjail", |store, height| {
            bonding::set_jailed(store, height, consensus_pubkey, false)
        })
    }

    /// Remove a validator holding neither tokens nor shares.
    pub fn remove_validator(&mut self, operator: &Pubkey) -> StakeResult<()> {
        self.transact("remove_validator", |store, _| {
            bonding::remove_validator(store, operator)
        })
    }

    /// Drop every pending update. Called once per height after the consensus
    /// engine consumed [`Self::pending_updates`].
    pub fn clear_pending_updates(&mut self) -> StakeResult<usize> {
        self.transact("clear_pending_updates", |store, _| Ok(updates::clear(store)))
    }
}
