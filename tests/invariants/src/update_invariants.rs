//! Property-based tests for consensus updates and transition atomicity.
//!
//! Tests:
//! 1. Applying every update window reproduces the bonded set and powers
//! 2. Each window names a consensus key at most once
//! 3. Re-storing an unchanged validator is a no-op
//! 4. A failed operation leaves no trace in the store

#[cfg(test)]
mod tests {
    use {
        crate::harness::{apply, new_keeper, operator, ops_strategy, SEEDS},
        proptest::prelude::*,
        solana_pubkey::Pubkey,
        std::collections::{BTreeMap, BTreeSet},
        trv1_stake_registry::{BondStatus, Dec, StakeError},
    };

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 1-2. Engine view tracks the bonded set
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn engine_view_matches_bonded_set(
            max_validators in 1..=6u16,
            ops in ops_strategy(40),
        ) {
            let mut keeper = new_keeper(max_validators);
            let mut engine: BTreeMap<Pubkey, u64> = BTreeMap::new();
            for (step, op) in ops.iter().enumerate() {
                apply(&mut keeper, op).unwrap();

                let updates = keeper.pending_updates().unwrap();
                let keys: BTreeSet<_> = updates.iter().map(|u| u.pub_key).collect();
                prop_assert_eq!(keys.len(), updates.len(), "duplicate key in window");
                for update in &updates {
                    if update.is_removal() {
                        engine.remove(&update.pub_key);
                    } else {
                        engine.insert(update.pub_key, update.power);
                    }
                }
                keeper.clear_pending_updates().unwrap();

                // ── INVARIANT: the engine's set is exactly the positive-power bonded set ──
                let expected: BTreeMap<Pubkey, u64> = keeper
                    .bonded_validators()
                    .unwrap()
                    .iter()
                    .filter(|v| v.power() > 0)
                    .map(|v| (v.consensus_pubkey, v.power()))
                    .collect();
                prop_assert_eq!(&engine, &expected, "step {} {:?}", step, op);
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 3. Idempotence
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn update_is_idempotent(
            max_validators in 1..=6u16,
            ops in ops_strategy(40),
        ) {
            let mut keeper = new_keeper(max_validators);
            for op in &ops {
                apply(&mut keeper, op).unwrap();
            }
            keeper.clear_pending_updates().unwrap();
            let snapshot = keeper.store().clone();

            // ── INVARIANT: same record in, same state out ──
            for validator in keeper.all_validators().unwrap() {
                let stored = keeper.update_validator(validator.clone()).unwrap();
                prop_assert_eq!(stored, validator);
            }
            prop_assert!(keeper.pending_updates().unwrap().is_empty());
            prop_assert!(keeper.store() == &snapshot);
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 4. Atomic rollback
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn failed_transition_is_invisible(
            max_validators in 1..=6u16,
            ops in ops_strategy(40),
            seed in 0..SEEDS,
        ) {
            let mut keeper = new_keeper(max_validators);
            for op in &ops {
                apply(&mut keeper, op).unwrap();
            }
            let Some(validator) = keeper.validator(&operator(seed)).unwrap() else {
                return Ok(());
            };
            let snapshot = keeper.store().clone();

            // ── INVARIANT: overshooting shares fails and changes nothing ──
            let overshoot = validator.delegator_shares.checked_add(Dec::ONE).unwrap();
            let err = keeper.undelegate(&operator(seed), overshoot).unwrap_err();
            prop_assert!(err.is_contract_violation(), "{err:?}");
            prop_assert!(keeper.store() == &snapshot);

            // ── INVARIANT: a status the store disagrees with is refused ──
            let mut forged = validator.clone();
            forged.status = match validator.status {
                BondStatus::Bonded => BondStatus::Unbonded,
                BondStatus::Unbonded => BondStatus::Bonded,
            };
            let err = keeper.update_validator(forged).unwrap_err();
            let is_status_mismatch = matches!(err, StakeError::StatusMismatch { .. });
            prop_assert!(is_status_mismatch, "{err:?}");
            prop_assert!(keeper.store() == &snapshot);
        }
    }
}
