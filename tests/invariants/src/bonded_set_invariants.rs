//! Property-based tests for bonded set and power index consistency.
//!
//! Tests:
//! 1. Every registry check passes after every operation
//! 2. Bonded validators rank at or above the cliff, candidates below it
//! 3. The bonded set never exceeds the configured bound
//! 4. Replaying the same operations yields byte-identical state

#[cfg(test)]
mod tests {
    use {
        crate::harness::{apply, new_keeper, ops_strategy},
        proptest::prelude::*,
        trv1_stake_registry::{invariants, BondStatus},
    };

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 1. Registry checks hold after every operation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn registry_consistent_after_every_op(
            max_validators in 1..=6u16,
            ops in ops_strategy(40),
        ) {
            let mut keeper = new_keeper(max_validators);
            for (step, op) in ops.iter().enumerate() {
                let result = apply(&mut keeper, op);
                prop_assert!(result.is_ok(), "step {step} {op:?} failed: {result:?}");

                // ── INVARIANT: index, markers, shares and cliff all agree ──
                let violations = invariants::check(keeper.store()).unwrap();
                prop_assert!(
                    violations.is_empty(),
                    "step {step} {op:?} left violations: {violations:?}"
                );
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 2. Cliff separates bonded validators from candidates
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn bonded_rank_at_or_above_cliff(
            max_validators in 1..=6u16,
            ops in ops_strategy(40),
        ) {
            let mut keeper = new_keeper(max_validators);
            for op in &ops {
                apply(&mut keeper, op).unwrap();
            }

            let cliff = keeper.cliff_validator_power().unwrap();
            let validators = keeper.all_validators().unwrap();
            match cliff {
                Some(cliff) => {
                    for validator in validators.iter().filter(|v| !v.jailed) {
                        let key = validator.power_rank_key();
                        match validator.status {
                            // ── INVARIANT: bonded keys never rank below the cliff ──
                            BondStatus::Bonded => prop_assert!(
                                key <= cliff,
                                "bonded {} ranks below cliff {cliff:?}",
                                validator.operator
                            ),
                            // ── INVARIANT: every candidate ranks strictly below it ──
                            BondStatus::Unbonded => prop_assert!(
                                cliff.outranks(&key),
                                "candidate {} outranks cliff {cliff:?}",
                                validator.operator
                            ),
                        }
                    }
                    prop_assert_eq!(
                        keeper.cliff_validator().unwrap(),
                        Some(cliff.operator())
                    );
                }
                None => {
                    // ── INVARIANT: no cliff means room is left and nobody waits ──
                    let bonded = keeper.bonded_validators().unwrap().len();
                    prop_assert!(bonded < keeper.params().unwrap().max_validators());
                    prop_assert!(validators
                        .iter()
                        .all(|v| v.jailed || v.is_bonded()));
                }
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 3. Bonded set size bound
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn bonded_set_within_bound(
            max_validators in 1..=6u16,
            ops in ops_strategy(40),
        ) {
            let mut keeper = new_keeper(max_validators);
            for op in &ops {
                apply(&mut keeper, op).unwrap();
                let bound = keeper.params().unwrap().max_validators();
                let bonded = keeper.bonded_validators().unwrap();
                prop_assert!(bonded.len() <= bound, "{} bonded over bound {bound}", bonded.len());

                // ── INVARIANT: the ranked view covers the bonded set, best first ──
                let by_power = keeper.validators_by_power().unwrap();
                prop_assert_eq!(by_power.len(), bonded.len());
                prop_assert!(by_power
                    .windows(2)
                    .all(|pair| pair[0].power_rank_key().outranks(&pair[1].power_rank_key())));
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 4. Determinism
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn replay_is_deterministic(
            max_validators in 1..=6u16,
            ops in ops_strategy(40),
        ) {
            let mut first = new_keeper(max_validators);
            let mut second = new_keeper(max_validators);
            for op in &ops {
                let a = apply(&mut first, op).unwrap();
                let b = apply(&mut second, op).unwrap();
                prop_assert_eq!(a, b);
            }
            // ── INVARIANT: same operations, same bytes ──
            prop_assert!(first.store() == second.store());
            prop_assert_eq!(
                first.pending_updates().unwrap(),
                second.pending_updates().unwrap()
            );
        }
    }
}
