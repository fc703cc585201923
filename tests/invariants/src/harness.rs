//! Operation model shared by the registry property tests.

use {
    proptest::prelude::*,
    solana_pubkey::Pubkey,
    trv1_stake_registry::{
        Dec, Description, MemoryStore, StakeError, StakingKeeper, StakingParams,
    },
};

pub type Keeper = StakingKeeper<MemoryStore>;

/// Number of distinct validators the generated operations touch.
pub const SEEDS: u8 = 12;

#[derive(Debug, Clone)]
pub enum Op {
    Create { seed: u8, amount: u64 },
    Delegate { seed: u8, amount: u64 },
    Undelegate { seed: u8, percent: u64 },
    Slash { seed: u8, percent: u64 },
    Jail { seed: u8 },
    Unjail { seed: u8 },
    SetMaxValidators { max_validators: u16 },
    NextBlock,
}

/// Tokens entering and leaving the registry in one operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flow {
    pub added: Dec,
    pub removed: Dec,
}

pub fn operator(seed: u8) -> Pubkey {
    Pubkey::new_from_array([seed.wrapping_add(1); 32])
}

pub fn consensus_key(seed: u8) -> Pubkey {
    Pubkey::new_from_array([seed.wrapping_add(101); 32])
}

pub fn percent(value: u64) -> Dec {
    Dec::from_scaled(value, 2).unwrap_or(Dec::ZERO)
}

pub fn new_keeper(max_validators: u16) -> Keeper {
    StakingKeeper::with_params(
        MemoryStore::new(),
        StakingParams {
            max_validators,
            ..StakingParams::default()
        },
    )
    .unwrap()
}

/// Largest single delegation generated.
pub const MAX_AMOUNT: u64 = 1_000_000_000_000_000;

/// Mostly small amounts so powers collide, with a share of stakes up to
/// [`MAX_AMOUNT`].
fn amount_strategy(min: u64) -> impl Strategy<Value = u64> {
    prop_oneof![
        3 => min..=1_000_000u64,
        1 => min..=MAX_AMOUNT,
    ]
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..SEEDS, amount_strategy(1)).prop_map(|(seed, amount)| Op::Create { seed, amount }),
        3 => (0..SEEDS, amount_strategy(0)).prop_map(|(seed, amount)| Op::Delegate { seed, amount }),
        2 => (0..SEEDS, 1..=100u64).prop_map(|(seed, percent)| Op::Undelegate { seed, percent }),
        1 => (0..SEEDS, 0..=100u64).prop_map(|(seed, percent)| Op::Slash { seed, percent }),
        1 => (0..SEEDS).prop_map(|seed| Op::Jail { seed }),
        1 => (0..SEEDS).prop_map(|seed| Op::Unjail { seed }),
        1 => (1..=8u16).prop_map(|max_validators| Op::SetMaxValidators { max_validators }),
        1 => Just(Op::NextBlock),
    ]
}

pub fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 1..max_len)
}

/// Apply `op` through the keeper.
///
/// Operations naming a validator that does not exist (or creating one that
/// does) are rejected by the keeper and count as no-ops here. Any other error
/// is returned.
pub fn apply(keeper: &mut Keeper, op: &Op) -> Result<Flow, StakeError> {
    let result = match *op {
        Op::Create { seed, amount } => keeper
            .create_validator(
                operator(seed),
                consensus_key(seed),
                Description::default(),
                Dec::from_int(amount),
            )
            .map(|_| Flow {
                added: Dec::from_int(amount),
                ..Flow::default()
            }),
        Op::Delegate { seed, amount } => keeper
            .delegate(&operator(seed), Dec::from_int(amount))
            .map(|_| Flow {
                added: Dec::from_int(amount),
                ..Flow::default()
            }),
        Op::Undelegate { seed, percent: pct } => {
            let Some(validator) = keeper.validator(&operator(seed))? else {
                return Ok(Flow::default());
            };
            let shares = percent(pct)
                .checked_mul(validator.delegator_shares)
                .unwrap_or(Dec::ZERO);
            keeper
                .undelegate(&operator(seed), shares)
                .map(|released| Flow {
                    removed: released,
                    ..Flow::default()
                })
        }
        Op::Slash { seed, percent: pct } => keeper
            .slash(&consensus_key(seed), keeper.block_height(), 0, percent(pct))
            .map(|burned| Flow {
                removed: burned.unwrap_or(Dec::ZERO),
                ..Flow::default()
            }),
        Op::Jail { seed } => keeper.jail(&consensus_key(seed)).map(|_| Flow::default()),
        Op::Unjail { seed } => keeper.unjail(&consensus_key(seed)).map(|_| Flow::default()),
        Op::SetMaxValidators { max_validators } => keeper
            .set_params(&StakingParams {
                max_validators,
                ..StakingParams::default()
            })
            .map(|_| Flow::default()),
        Op::NextBlock => {
            let next = keeper.block_height().saturating_add(1);
            keeper.begin_block(next);
            Ok(Flow::default())
        }
    };
    match result {
        Err(StakeError::ValidatorNotFound(_)) | Err(StakeError::ValidatorAlreadyExists(_)) => {
            Ok(Flow::default())
        }
        other => other,
    }
}
