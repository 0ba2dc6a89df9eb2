//! Pull-style refund ledger for evicted bidders.
//!
//! Eviction only records what is owed; the evicted sender later withdraws.
//! No transfer ever happens while a submission is being applied.

use std::collections::HashMap;

use ember_core::error::RefundError;
use ember_core::types::{Amount, Sender};

/// Owed balances per sender.
#[derive(Debug, Clone, Default)]
pub struct RefundLedger {
    owed: HashMap<Sender, Amount>,
}

impl RefundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted `(sender, owed)` pairs. Zero balances are dropped.
    pub fn from_balances(balances: impl IntoIterator<Item = (Sender, Amount)>) -> Self {
        Self {
            owed: balances
                .into_iter()
                .filter(|(_, amount)| *amount > 0)
                .collect(),
        }
    }

    /// Amount currently owed to `sender`.
    pub fn owed(&self, sender: &Sender) -> Amount {
        self.owed.get(sender).copied().unwrap_or(0)
    }

    /// Balance `sender` would have after being credited `amount`.
    pub fn balance_after_credit(&self, sender: &Sender, amount: Amount) -> Result<Amount, RefundError> {
        self.owed(sender)
            .checked_add(amount)
            .ok_or(RefundError::Overflow(*sender))
    }

    /// Credit `amount` to `sender`, returning the new balance.
    pub fn credit(&mut self, sender: Sender, amount: Amount) -> Result<Amount, RefundError> {
        let balance = self.balance_after_credit(&sender, amount)?;
        if balance > 0 {
            self.owed.insert(sender, balance);
        }
        Ok(balance)
    }

    /// Remove and return everything owed to `sender`.
    pub fn take(&mut self, sender: &Sender) -> Result<Amount, RefundError> {
        self.owed
            .remove(sender)
            .filter(|amount| *amount > 0)
            .ok_or(RefundError::NothingOwed(*sender))
    }

    /// Sum of all owed balances, saturating.
    pub fn total_owed(&self) -> Amount {
        self.owed.values().fold(0, |acc, v| acc.saturating_add(*v))
    }

    /// Number of senders with a non-zero balance.
    pub fn len(&self) -> usize {
        self.owed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owed.is_empty()
    }

    /// Iterate over `(sender, owed)` pairs (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = (&Sender, &Amount)> {
        self.owed.iter()
    }
}
