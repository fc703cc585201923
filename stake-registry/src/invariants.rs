//! Consistency checks over the whole registry state.
//!
//! Used by the test suites after every transition, and cheap enough to run
//! from a debug hook at the end of a block.

use {
    crate::{
        cliff,
        error::StakeResult,
        power_index::{self, PowerRankKey},
        store::{self, KvStore},
        validator_store,
    },
    std::collections::BTreeSet,
};

/// Check every cross-structure invariant. Returns a description of each
/// violation found; an empty vector means the state is consistent.
pub fn check<S: KvStore + ?Sized>(store: &S) -> StakeResult<Vec<String>> {
    let mut violations = Vec::new();
    let max_validators = store::get_params(store)?.max_validators();
    let validators = validator_store::list_all(store)?;
    let index: Vec<PowerRankKey> = power_index::iter(store).collect::<StakeResult<_>>()?;
    let index_set: BTreeSet<PowerRankKey> = index.iter().copied().collect();
    let bonded_marked: BTreeSet<_> = validator_store::bonded_operators(store)?
        .into_iter()
        .collect();

    let mut expected_index = BTreeSet::new();
    for validator in &validators {
        let operator = validator.operator;
        if validator.jailed {
            if validator.is_bonded() {
                violations.push(format!("jailed validator {operator} is bonded"));
            }
        } else {
            let key = validator.power_rank_key();
            if !index_set.contains(&key) {
                violations.push(format!("validator {operator} missing from power index"));
            }
            expected_index.insert(key);
        }
        if validator.is_bonded() != bonded_marked.contains(&operator) {
            violations.push(format!(
                "validator {operator} status {:?} disagrees with bonded index",
                validator.status
            ));
        }
        if validator.tokens.is_positive() != validator.delegator_shares.is_positive() {
            violations.push(format!(
                "validator {operator} holds {} tokens and {} shares",
                validator.tokens, validator.delegator_shares
            ));
        }
    }
    for key in index_set.difference(&expected_index) {
        violations.push(format!("dangling power index entry {key:?}"));
    }

    let records: BTreeSet<_> = validators.iter().map(|v| v.operator).collect();
    for operator in bonded_marked.difference(&records) {
        violations.push(format!("bonded index names unknown validator {operator}"));
    }

    let bonded = bonded_marked.len();
    if bonded > max_validators {
        violations.push(format!(
            "{bonded} bonded validators exceed the bound of {max_validators}"
        ));
    }
    let head: BTreeSet<_> = index.iter().take(bonded).map(PowerRankKey::operator).collect();
    if head != bonded_marked {
        violations.push("bonded set is not the head of the power index".to_string());
    }
    if bonded < max_validators && index.len() > bonded {
        violations.push(format!(
            "{} candidates left unbonded with {} free slots",
            index.len().saturating_sub(bonded),
            max_validators.saturating_sub(bonded)
        ));
    }

    let expected_cliff = if bonded >= max_validators && bonded > 0 {
        index.get(bonded.saturating_sub(1)).copied()
    } else {
        None
    };
    let cliff_power = cliff::get_power(store)?;
    if cliff_power != expected_cliff {
        violations.push(format!(
            "cliff power {cliff_power:?} but lowest bonded key is {expected_cliff:?}"
        ));
    }
    let cliff_validator = cliff::get_validator(store)?;
    if cliff_validator != expected_cliff.map(|key| key.operator()) {
        violations.push(format!("cliff validator {cliff_validator:?} is stale"));
    }

    Ok(violations)
}
