//! Player currency.
//!
//! Income arrives in fractional amounts every logic tick, so the balance is
//! kept in fixed point; costs and the persisted balance are whole units.
//! Whole-unit amounts above the fixed-point range saturate.

use nodewar_core::fixed::Fixed64;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyLedger {
    balance: Fixed64,
}

impl CurrencyLedger {
    pub fn new(balance: u32) -> Self {
        Self {
            balance: Fixed64::saturating_from_num(balance),
        }
    }

    /// Whole units available to spend.
    pub fn balance(&self) -> u32 {
        self.balance.saturating_to_num::<u32>()
    }

    /// Balance including the fractional carry.
    pub fn exact(&self) -> Fixed64 {
        self.balance
    }

    /// The part of the balance below one unit, which [`balance`] drops.
    ///
    /// [`balance`]: Self::balance
    pub fn fraction(&self) -> Fixed64 {
        self.balance.frac()
    }

    /// Add income. Negative amounts are ignored.
    pub fn credit(&mut self, amount: Fixed64) {
        if amount > Fixed64::ZERO {
            self.balance = self.balance.saturating_add(amount);
        }
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        Fixed64::checked_from_num(cost).is_some_and(|cost| self.balance >= cost)
    }

    /// Deduct `cost`. Returns `false` and leaves the balance alone if it
    /// does not cover the cost.
    pub fn spend(&mut self, cost: u32) -> bool {
        if !self.can_afford(cost) {
            debug!(cost, balance = self.balance(), "cannot afford");
            return false;
        }
        self.balance = self.balance.saturating_sub(Fixed64::saturating_from_num(cost));
        true
    }
}
