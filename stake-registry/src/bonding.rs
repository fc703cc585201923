//! Bonding state machine.
//!
//! Every stake change funnels through [`update_validator`], which keeps four
//! structures in lockstep: the validator record, the power index, the bonded
//! membership (with its pool bucket) and the cliff cache. The bonded set is
//! always exactly the best `max_validators` entries of the power index.
//!
//! Rank stamps `(bond_height, intra_tx_counter)` are frozen while a validator
//! is Bonded. A validator evicted from the set is re-stamped on the way out,
//! and an Unbonded validator is re-stamped whenever its power or jailed flag
//! changes, so a validator that fell out of the set and comes back at the
//! same power ranks behind one that never left.

use {
    crate::{
        cliff,
        decimal::Dec,
        error::{StakeError, StakeResult},
        params::StakingParams,
        pool::Pool,
        power_index::{self, PowerRankKey},
        store::{self, keys, KvStore},
        updates,
        validator::{BondStatus, Validator},
        validator_store,
    },
    borsh::{BorshDeserialize, BorshSerialize},
    log::*,
    solana_pubkey::Pubkey,
    std::collections::BTreeSet,
};

#[derive(BorshSerialize, BorshDeserialize)]
struct IntraTxCounter {
    height: u64,
    counter: u32,
}

/// Next rank-stamp counter at `height`. Restarts at 0 on a new height.
pub(crate) fn next_intra_tx_counter<S: KvStore + ?Sized>(
    store: &mut S,
    height: u64,
) -> StakeResult<u32> {
    let counter = match store.get(keys::INTRA_TX_COUNTER_KEY) {
        Some(bytes) => {
            let stored: IntraTxCounter = keys::decode("intra-tx counter", &bytes)?;
            if stored.height == height {
                stored.counter
            } else {
                0
            }
        }
        None => 0,
    };
    let next = IntraTxCounter {
        height,
        counter: counter
            .checked_add(1)
            .ok_or(StakeError::Overflow("intra-tx counter"))?,
    };
    store.set(
        keys::INTRA_TX_COUNTER_KEY,
        keys::encode("intra-tx counter", &next)?,
    );
    Ok(counter)
}

fn stamp<S: KvStore + ?Sized>(
    store: &mut S,
    height: u64,
    validator: &mut Validator,
) -> StakeResult<()> {
    validator.bond_height = height;
    validator.bond_intra_tx_counter = next_intra_tx_counter(store, height)?;
    debug!(
        "validator {} stamped at height {} #{}",
        validator.operator, validator.bond_height, validator.bond_intra_tx_counter
    );
    Ok(())
}

/// Re-stamp a validator leaving the bonded set by eviction and move its
/// power-index entry to the new key.
fn restamp_evicted<S: KvStore + ?Sized>(
    store: &mut S,
    height: u64,
    validator: &mut Validator,
) -> StakeResult<()> {
    let old_key = (!validator.jailed).then(|| validator.power_rank_key());
    stamp(store, height, validator)?;
    let new_key = (!validator.jailed).then(|| validator.power_rank_key());
    power_index::replace(store, old_key.as_ref(), new_key.as_ref())
}

fn load<S: KvStore + ?Sized>(store: &S, operator: &Pubkey) -> StakeResult<Validator> {
    validator_store::get(store, operator)?.ok_or_else(|| StakeError::CorruptedRecord {
        what: "power index",
        reason: format!("operator {operator} has an index entry but no record"),
    })
}

fn bond<S: KvStore + ?Sized>(
    store: &mut S,
    pool: &mut Pool,
    validator: &mut Validator,
) -> StakeResult<()> {
    pool.loose_to_bonded(validator.tokens)?;
    validator.status = BondStatus::Bonded;
    validator_store::mark_bonded(store, &validator.operator);
    updates::record(store, validator.consensus_update())?;
    info!(
        "validator {} bonded with power {}",
        validator.operator,
        validator.power()
    );
    Ok(())
}

fn unbond<S: KvStore + ?Sized>(
    store: &mut S,
    pool: &mut Pool,
    validator: &mut Validator,
) -> StakeResult<()> {
    pool.bonded_to_loose(validator.tokens)?;
    validator.status = BondStatus::Unbonded;
    validator_store::unmark_bonded(store, &validator.operator);
    updates::record(store, validator.consensus_update_zero())?;
    info!(
        "validator {} unbonded at power {}",
        validator.operator,
        validator.power()
    );
    Ok(())
}

fn promote<S: KvStore + ?Sized>(
    store: &mut S,
    pool: &mut Pool,
    operator: &Pubkey,
) -> StakeResult<()> {
    let mut validator = load(store, operator)?;
    bond(store, pool, &mut validator)?;
    validator_store::put(store, &validator)
}

fn demote<S: KvStore + ?Sized>(
    store: &mut S,
    height: u64,
    pool: &mut Pool,
    operator: &Pubkey,
) -> StakeResult<()> {
    let mut validator = load(store, operator)?;
    restamp_evicted(store, height, &mut validator)?;
    unbond(store, pool, &mut validator)?;
    validator_store::put(store, &validator)
}

/// Bond every unbonded entry among the best `max_validators` keys, best first.
fn fill_vacancies<S: KvStore + ?Sized>(
    store: &mut S,
    pool: &mut Pool,
    max_validators: usize,
) -> StakeResult<()> {
    for key in power_index::top_k(store, max_validators)? {
        let operator = key.operator();
        if !validator_store::is_bonded(store, &operator) {
            promote(store, pool, &operator)?;
        }
    }
    Ok(())
}

/// Apply a changed validator record.
///
/// `validator.status` must match the stored status (Unbonded for a validator
/// that is not stored yet); the stamp is taken from the store unless the
/// stamp rule asks for a fresh one. Returns the record as stored.
pub(crate) fn update_validator<S: KvStore + ?Sized>(
    store: &mut S,
    height: u64,
    mut validator: Validator,
) -> StakeResult<Validator> {
    let max_validators = store::get_params(store)?.max_validators();
    let stored = validator_store::get(store, &validator.operator)?;
    let stored_status = stored
        .as_ref()
        .map_or(BondStatus::Unbonded, |stored| stored.status);
    if validator.status != stored_status {
        return Err(StakeError::StatusMismatch {
            operator: validator.operator,
            submitted: validator.status,
            stored: stored_status,
        });
    }
    validator.checked_power()?;

    match &stored {
        Some(old)
            if old.is_bonded()
                || (old.power() == validator.power() && old.jailed == validator.jailed) =>
        {
            validator.bond_height = old.bond_height;
            validator.bond_intra_tx_counter = old.bond_intra_tx_counter;
        }
        _ => stamp(store, height, &mut validator)?,
    }

    let old_key = stored
        .as_ref()
        .filter(|old| !old.jailed)
        .map(Validator::power_rank_key);
    let new_key = (!validator.jailed).then(|| validator.power_rank_key());
    if old_key != new_key {
        debug!(
            "validator {} rank key {:?} -> {:?}",
            validator.operator, old_key, new_key
        );
    }
    power_index::replace(store, old_key.as_ref(), new_key.as_ref())?;

    let mut pool = store::get_pool(store)?;
    let was_bonded = validator.is_bonded();
    let mut vacancy = false;
    match new_key {
        Some(key) if !was_bonded => {
            if validator_store::bonded_count(store) < max_validators {
                bond(store, &mut pool, &mut validator)?;
            } else {
                let cliff_key = cliff::get_power(store)?.ok_or_else(|| {
                    StakeError::CorruptedRecord {
                        what: "cliff validator",
                        reason: "bonded set is at capacity but no cliff is recorded".to_string(),
                    }
                })?;
                if key.outranks(&cliff_key) {
                    demote(store, height, &mut pool, &cliff_key.operator())?;
                    bond(store, &mut pool, &mut validator)?;
                }
            }
        }
        Some(key) => {
            let boundary = match max_validators.checked_sub(1) {
                Some(last) => power_index::nth(store, last)?,
                None => None,
            };
            let still_ranked = boundary.map_or(true, |boundary| !boundary.outranks(&key));
            if still_ranked {
                if stored.as_ref().map(Validator::power) != Some(validator.power()) {
                    updates::record(store, validator.consensus_update())?;
                }
            } else {
                restamp_evicted(store, height, &mut validator)?;
                unbond(store, &mut pool, &mut validator)?;
                vacancy = true;
            }
        }
        None if was_bonded => {
            unbond(store, &mut pool, &mut validator)?;
            vacancy = true;
        }
        None => {}
    }

    validator_store::put(store, &validator)?;
    if vacancy {
        fill_vacancies(store, &mut pool, max_validators)?;
    }
    store::set_pool(store, &pool)?;
    if was_bonded || validator.is_bonded() {
        cliff::recompute(store, max_validators)?;
    }
    Ok(validator)
}

/// Delete an empty validator from every index, emitting a removal update and
/// back-filling the bonded set if it was Bonded.
///
/// `stored` is the record as currently stored; its key is the one in the
/// power index. The caller has already settled the validator's tokens against
/// `pool`.
fn retire<S: KvStore + ?Sized>(
    store: &mut S,
    mut pool: Pool,
    stored: &Validator,
) -> StakeResult<()> {
    let max_validators = store::get_params(store)?.max_validators();
    if !stored.jailed {
        power_index::remove(store, &stored.power_rank_key())?;
    }
    validator_store::delete(store, stored);
    if stored.is_bonded() {
        validator_store::unmark_bonded(store, &stored.operator);
        updates::record(store, stored.consensus_update_zero())?;
        fill_vacancies(store, &mut pool, max_validators)?;
    }
    store::set_pool(store, &pool)?;
    cliff::recompute(store, max_validators)?;
    info!("validator {} removed", stored.operator);
    Ok(())
}

/// Remove a validator that holds neither tokens nor shares.
pub(crate) fn remove_validator<S: KvStore + ?Sized>(
    store: &mut S,
    operator: &Pubkey,
) -> StakeResult<()> {
    let stored =
        validator_store::get(store, operator)?.ok_or(StakeError::ValidatorNotFound(*operator))?;
    if !stored.is_empty() {
        return Err(StakeError::ValidatorNotEmpty(*operator));
    }
    let pool = store::get_pool(store)?;
    retire(store, pool, &stored)
}

/// Add `amount` tokens to `validator` and re-rank it. Returns the stored
/// record and the shares issued.
pub(crate) fn delegate<S: KvStore + ?Sized>(
    store: &mut S,
    height: u64,
    mut validator: Validator,
    amount: Dec,
) -> StakeResult<(Validator, Dec)> {
    let mut pool = store::get_pool(store)?;
    let issued = validator.add_tokens_from_delegation(&mut pool, amount)?;
    store::set_pool(store, &pool)?;
    let validator = update_validator(store, height, validator)?;
    Ok((validator, issued))
}

/// Burn `shares` of `operator` and re-rank it, removing the validator if it
/// ends up empty. Returns the tokens released.
pub(crate) fn undelegate<S: KvStore + ?Sized>(
    store: &mut S,
    height: u64,
    operator: &Pubkey,
    shares: Dec,
) -> StakeResult<Dec> {
    let stored =
        validator_store::get(store, operator)?.ok_or(StakeError::ValidatorNotFound(*operator))?;
    let mut pool = store::get_pool(store)?;
    let mut validator = stored.clone();
    let released = validator.remove_delegator_shares(&mut pool, shares)?;
    if validator.is_empty() {
        retire(store, pool, &stored)?;
    } else {
        store::set_pool(store, &pool)?;
        update_validator(store, height, validator)?;
    }
    Ok(released)
}

/// Slash `fraction` of the shares of the validator behind `consensus_pubkey`.
///
/// Returns the tokens burned, or `None` if no such validator exists (it may
/// have exited after the infraction).
pub(crate) fn slash<S: KvStore + ?Sized>(
    store: &mut S,
    height: u64,
    consensus_pubkey: &Pubkey,
    infraction_height: u64,
    power: u64,
    fraction: Dec,
) -> StakeResult<Option<Dec>> {
    if fraction > Dec::ONE {
        return Err(StakeError::InvalidSlashFraction(fraction));
    }
    let Some(stored) = validator_store::get_by_consensus_key(store, consensus_pubkey)? else {
        warn!(
            "slash for unknown validator {consensus_pubkey} at height {infraction_height} ignored"
        );
        return Ok(None);
    };

    let shares = fraction
        .checked_mul(stored.delegator_shares)
        .ok_or(StakeError::Overflow("slash shares"))?;
    let mut pool = store::get_pool(store)?;
    let mut validator = stored.clone();
    let burned = validator.remove_delegator_shares(&mut pool, shares)?;
    warn!(
        "slashed validator {} by {} for infraction at height {} (power {}): {} tokens burned",
        stored.operator, fraction, infraction_height, power, burned
    );

    if validator.is_empty() {
        retire(store, pool, &stored)?;
    } else {
        store::set_pool(store, &pool)?;
        update_validator(store, height, validator)?;
    }
    Ok(Some(burned))
}

/// Set or clear the jailed flag of the validator behind `consensus_pubkey`.
pub(crate) fn set_jailed<S: KvStore + ?Sized>(
    store: &mut S,
    height: u64,
    consensus_pubkey: &Pubkey,
    jailed: bool,
) -> StakeResult<Validator> {
    let mut validator = validator_store::get_by_consensus_key(store, consensus_pubkey)?
        .ok_or(StakeError::ValidatorNotFound(*consensus_pubkey))?;
    if validator.jailed == jailed {
        return Ok(validator);
    }
    validator.jailed = jailed;
    info!(
        "validator {} {}",
        validator.operator,
        if jailed { "jailed" } else { "unjailed" }
    );
    update_validator(store, height, validator)
}

/// Store new parameters and reconcile the bonded set with the new bound:
/// the lowest-ranked validators leave first, then the best candidates fill
/// any room.
///
/// Evicted validators are re-stamped best first so they keep their relative
/// order among themselves.
pub(crate) fn set_params<S: KvStore + ?Sized>(
    store: &mut S,
    height: u64,
    params: &StakingParams,
) -> StakeResult<()> {
    params.validate()?;
    let previous = store::get_params(store)?;
    store::set_params(store, params)?;
    if previous.max_validators == params.max_validators {
        return Ok(());
    }
    info!(
        "max_validators changed {} -> {}",
        previous.max_validators, params.max_validators
    );

    let max_validators = params.max_validators();
    let top: BTreeSet<Pubkey> = power_index::top_k(store, max_validators)?
        .iter()
        .map(PowerRankKey::operator)
        .collect();
    let mut leaving: Vec<Validator> = validator_store::list_bonded(store)?
        .into_iter()
        .filter(|validator| !top.contains(&validator.operator))
        .collect();
    leaving.sort_by_key(Validator::power_rank_key);
    for validator in leaving.iter_mut() {
        restamp_evicted(store, height, validator)?;
    }

    let mut pool = store::get_pool(store)?;
    for mut validator in leaving.into_iter().rev() {
        unbond(store, &mut pool, &mut validator)?;
        validator_store::put(store, &validator)?;
    }
    fill_vacancies(store, &mut pool, max_validators)?;
    store::set_pool(store, &pool)?;
    cliff::recompute(store, max_validators)?;
    Ok(())
}
