//! TRv1 Stake Registry
//!
//! Validator-set management for TRv1 proof of stake. The registry keeps every
//! validator's stake, ranks validators by voting power, maintains the
//! size-bounded **bonded set** that votes in consensus, and produces the
//! per-height list of `(consensus key, power)` changes that the consensus
//! engine applies to its own validator set.
//!
//! # Key Properties
//!
//! - **Deterministic ranking**: validators are ordered by a byte-comparable
//!   [`PowerRankKey`] (power descending, then rank stamp, then operator), so
//!   every node derives the same bonded set from the same state.
//! - **Cliff tracking**: while the bonded set is full, the lowest-ranked bonded
//!   validator is cached as the eviction boundary.
//! - **Fixed-point stake**: all token and share amounts are [`Dec`] values with
//!   ten fractional digits and banker's rounding. No floating point.
//! - **Atomic transitions**: each keeper call runs against a write buffer and
//!   commits only on success.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  StakingKeeper                   │
//! │  ┌────────────────────────────────────────────┐  │
//! │  │        bonding (state machine)             │  │
//! │  └────────────────────────────────────────────┘  │
//! │  ┌───────────┐ ┌───────────┐ ┌───────┐ ┌───────┐ │
//! │  │ validator │ │  power    │ │ cliff │ │updates│ │
//! │  │  store    │ │  index    │ │       │ │       │ │
//! │  └───────────┘ └───────────┘ └───────┘ └───────┘ │
//! │  ┌────────────────────────────────────────────┐  │
//! │  │     CacheStore  over  injected KvStore     │  │
//! │  └────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use {
//!     solana_pubkey::Pubkey,
//!     trv1_stake_registry::{Dec, Description, MemoryStore, StakingKeeper},
//! };
//!
//! let mut keeper = StakingKeeper::new(MemoryStore::new());
//! keeper.begin_block(1);
//!
//! let operator = Pubkey::new_from_array([1; 32]);
//! let consensus_key = Pubkey::new_from_array([2; 32]);
//! let (validator, _shares) = keeper
//!     .create_validator(operator, consensus_key, Description::default(), Dec::from_int(100))
//!     .unwrap();
//! assert!(validator.is_bonded());
//!
//! let updates = keeper.pending_updates().unwrap();
//! assert_eq!(updates[0].power, 100);
//! keeper.clear_pending_updates().unwrap();
//! ```

mod bonding;
pub mod cliff;
pub mod decimal;
pub mod error;
pub mod invariants;
pub mod keeper;
pub mod params;
pub mod pool;
pub mod power_index;
pub mod store;
pub mod updates;
pub mod validator;
pub mod validator_store;


// Re-exports for convenience.
pub use decimal::Dec;
pub use error::{StakeError, StakeResult};
pub use keeper::StakingKeeper;
pub use params::{ConfigError, StakingParams};
pub use pool::Pool;
pub use power_index::PowerRankKey;
pub use store::{CacheStore, KvStore, MemoryStore};
pub use updates::ValidatorUpdate;
pub use validator::{BondStatus, Description, Validator};
