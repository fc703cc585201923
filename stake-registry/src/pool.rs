//! Aggregate bonded / loose token totals.

use {
    crate::{
        decimal::Dec,
        error::{StakeError, StakeResult},
        validator::BondStatus,
    },
    borsh::{BorshDeserialize, BorshSerialize},
    serde::{Deserialize, Serialize},
};

/// Token totals across every validator.
///
/// Status flips move tokens between the two buckets and never change their
/// sum; only delegation and share removal add or take tokens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Pool {
    /// Tokens held by Bonded validators.
    pub bonded_tokens: Dec,
    /// Tokens held by Unbonded validators.
    pub loose_tokens: Dec,
}

impl Pool {
    pub fn total_tokens(&self) -> Option<Dec> {
        self.bonded_tokens.checked_add(self.loose_tokens)
    }

    pub fn bucket(&self, status: BondStatus) -> Dec {
        match status {
            BondStatus::Bonded => self.bonded_tokens,
            BondStatus::Unbonded => self.loose_tokens,
        }
    }

    pub(crate) fn credit(&mut self, status: BondStatus, amount: Dec) -> StakeResult<()> {
        let bucket = self.bucket_mut(status);
        *bucket = bucket
            .checked_add(amount)
            .ok_or(StakeError::Overflow("pool credit"))?;
        Ok(())
    }

    pub(crate) fn debit(&mut self, status: BondStatus, amount: Dec) -> StakeResult<()> {
        let held = self.bucket(status);
        let remaining = held.checked_sub(amount).ok_or(StakeError::PoolUnderflow {
            bucket: status.bucket_name(),
            held,
            requested: amount,
        })?;
        *self.bucket_mut(status) = remaining;
        Ok(())
    }

    /// Move `amount` from the loose bucket into the bonded bucket.
    pub(crate) fn loose_to_bonded(&mut self, amount: Dec) -> StakeResult<()> {
        self.transfer(BondStatus::Unbonded, BondStatus::Bonded, amount)
    }

    /// Move `amount` from the bonded bucket into the loose bucket.
    pub(crate) fn bonded_to_loose(&mut self, amount: Dec) -> StakeResult<()> {
        self.transfer(BondStatus::Bonded, BondStatus::Unbonded, amount)
    }

    fn transfer(&mut self, from: BondStatus, to: BondStatus, amount: Dec) -> StakeResult<()> {
        let mut next = *self;
        next.debit(from, amount)?;
        next.credit(to, amount)?;
        *self = next;
        Ok(())
    }

    fn bucket_mut(&mut self, status: BondStatus) -> &mut Dec {
        match status {
            BondStatus::Bonded => &mut self.bonded_tokens,
            BondStatus::Unbonded => &mut self.loose_tokens,
        }
    }
}
