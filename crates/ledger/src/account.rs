use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use tally_core::AccountId;

/// A single balance, in minor units, guarded by its own reader/writer lock.
///
/// Accounts are only created by the registry and are never removed. Every
/// mutation takes the exclusive lock; reads take the shared lock.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    balance: RwLock<u64>,
}

/// Point-in-time view of an account, as handed to serializers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub total_money: u64,
}

impl Account {
    pub(crate) fn new(id: AccountId) -> Self {
        Self {
            id,
            balance: RwLock::new(0),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn balance(&self) -> u64 {
        // A poisoned lock still holds a whole integer; nothing can be torn.
        *self.balance.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            total_money: self.balance(),
        }
    }

    /// Adds `amount`. Returns `false` without touching the balance when the
    /// amount is non-positive or the result would not fit.
    pub fn credit(&self, amount: i64) -> bool {
        self.lock_exclusive().credit(amount)
    }

    /// Subtracts `amount`. Returns `false` without touching the balance when
    /// the amount is non-positive or exceeds the current balance.
    pub fn withdraw(&self, amount: i64) -> bool {
        self.lock_exclusive().withdraw(amount)
    }

    /// [`Account::credit`], returning the state read under the same lock.
    /// `None` when the credit was refused.
    pub fn credit_snapshot(&self, amount: i64) -> Option<AccountSnapshot> {
        let mut guard = self.lock_exclusive();
        guard.credit(amount).then(|| guard.snapshot())
    }

    /// [`Account::withdraw`], returning the state read under the same lock.
    /// `None` when the withdrawal was refused.
    pub fn withdraw_snapshot(&self, amount: i64) -> Option<AccountSnapshot> {
        let mut guard = self.lock_exclusive();
        guard.withdraw(amount).then(|| guard.snapshot())
    }

    pub(crate) fn lock_exclusive(&self) -> BalanceGuard<'_> {
        BalanceGuard {
            id: self.id,
            balance: self.balance.write().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Non-blocking variant of [`Account::lock_exclusive`]. `None` means the
    /// lock is currently held by someone else.
    pub(crate) fn try_lock_exclusive(&self) -> Option<BalanceGuard<'_>> {
        use std::sync::TryLockError;

        let balance = match self.balance.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        Some(BalanceGuard { id: self.id, balance })
    }
}

/// Exclusive hold on one account's balance.
///
/// Never leaves this crate: the transfer protocol is the only code allowed to
/// hold two of these at once.
pub(crate) struct BalanceGuard<'a> {
    id: AccountId,
    balance: RwLockWriteGuard<'a, u64>,
}

impl BalanceGuard<'_> {
    pub(crate) fn id(&self) -> AccountId {
        self.id
    }

    pub(crate) fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            total_money: *self.balance,
        }
    }

    pub(crate) fn credit(&mut self, amount: i64) -> bool {
        let Some(amount) = positive(amount) else {
            return false;
        };
        match self.balance.checked_add(amount) {
            Some(next) => {
                *self.balance = next;
                true
            }
            None => false,
        }
    }

    pub(crate) fn withdraw(&mut self, amount: i64) -> bool {
        let Some(amount) = positive(amount) else {
            return false;
        };
        if amount > *self.balance {
            return false;
        }
        *self.balance -= amount;
        true
    }
}

fn positive(amount: i64) -> Option<u64> {
    if amount <= 0 { None } else { Some(amount as u64) }
}
