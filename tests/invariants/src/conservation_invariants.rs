//! Property-based tests for token conservation and share backing.
//!
//! Tests:
//! 1. Pool total moves only by delegated, released and burned amounts
//! 2. Each pool bucket equals the tokens of the validators in that status
//! 3. Redeeming every share releases exactly every token
//! 4. Share redemption never releases more than the validator holds

#[cfg(test)]
mod tests {
    use {
        crate::harness::{apply, new_keeper, operator, ops_strategy, percent, SEEDS},
        proptest::prelude::*,
        solana_pubkey::Pubkey,
        trv1_stake_registry::{BondStatus, Dec, Description, Pool, Validator},
    };

    fn sum_tokens<'a>(validators: impl Iterator<Item = &'a Validator>) -> Dec {
        validators.fold(Dec::ZERO, |acc, v| acc.checked_add(v.tokens).unwrap())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 1-2. Pool conservation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn pool_changes_only_by_external_amounts(
            max_validators in 1..=6u16,
            ops in ops_strategy(40),
        ) {
            let mut keeper = new_keeper(max_validators);
            let mut expected = Dec::ZERO;
            for (step, op) in ops.iter().enumerate() {
                let flow = apply(&mut keeper, op).unwrap();
                expected = expected
                    .checked_add(flow.added)
                    .and_then(|total| total.checked_sub(flow.removed))
                    .unwrap();

                // ── INVARIANT: status flips move tokens, never create them ──
                let pool = keeper.pool().unwrap();
                prop_assert_eq!(
                    pool.total_tokens(),
                    Some(expected),
                    "step {} {:?}",
                    step,
                    op
                );

                let validators = keeper.all_validators().unwrap();
                let bonded = sum_tokens(validators.iter().filter(|v| v.is_bonded()));
                let loose = sum_tokens(validators.iter().filter(|v| !v.is_bonded()));
                prop_assert_eq!(pool.bucket(BondStatus::Bonded), bonded);
                prop_assert_eq!(pool.bucket(BondStatus::Unbonded), loose);
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 3. Full redemption
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn redeeming_every_share_releases_every_token(
            tokens in 1..=1_000_000_000_000_000u64,
            shares in 1..=1_000_000_000_000_000u64,
            partial in prop::collection::vec(1..=90u64, 0..=3),
        ) {
            let mut validator = Validator::new(
                Pubkey::new_from_array([1; 32]),
                Pubkey::new_from_array([2; 32]),
                Description::default(),
            );
            validator.tokens = Dec::from_int(tokens);
            validator.delegator_shares = Dec::from_int(shares);
            let mut pool = Pool {
                loose_tokens: validator.tokens,
                ..Pool::default()
            };

            let mut released = Dec::ZERO;
            for pct in partial {
                let burn = percent(pct).checked_mul(validator.delegator_shares).unwrap();
                let out = validator.remove_delegator_shares(&mut pool, burn).unwrap();
                released = released.checked_add(out).unwrap();
            }
            let rest = validator.delegator_shares;
            let out = validator.remove_delegator_shares(&mut pool, rest).unwrap();
            released = released.checked_add(out).unwrap();

            // ── INVARIANT: nothing is stranded and nothing is minted ──
            prop_assert_eq!(released, Dec::from_int(tokens));
            prop_assert!(validator.is_empty());
            prop_assert_eq!(pool.loose_tokens, Dec::ZERO);
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 4. Redemption bound through the keeper
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn undelegate_bounded_by_validator_tokens(
            ops in ops_strategy(30),
            seed in 0..SEEDS,
            pct in 1..=100u64,
        ) {
            let mut keeper = new_keeper(4);
            for op in &ops {
                apply(&mut keeper, op).unwrap();
            }
            let Some(before) = keeper.validator(&operator(seed)).unwrap() else {
                return Ok(());
            };
            let shares = percent(pct).checked_mul(before.delegator_shares).unwrap();
            let released = keeper.undelegate(&operator(seed), shares).unwrap();

            // ── INVARIANT: a holder never walks away with more than backs them ──
            prop_assert!(released <= before.tokens);
            let remaining = keeper
                .validator(&operator(seed))
                .unwrap()
                .map_or(Dec::ZERO, |v| v.tokens);
            prop_assert_eq!(remaining.checked_add(released), Some(before.tokens));
        }
    }
}
