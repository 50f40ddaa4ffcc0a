//! Id-addressed facade over the registry and the transfer protocol.

use std::sync::Arc;

use tally_core::{AccountId, DomainError, DomainResult};

use crate::account::{Account, AccountSnapshot};
use crate::registry::AccountRegistry;
use crate::transfer::{Transfer, TransferOutcome, TransferProtocol, TransferStrategy};

/// The operations offered to outer layers: account creation and lookup plus
/// the three money movements.
///
/// Unknown ids come back as [`DomainError::NotFound`]. Business-rule failures
/// (non-positive amount, insufficient funds, self-transfer) are `Ok(false)`.
#[derive(Debug, Default)]
pub struct Ledger {
    registry: AccountRegistry,
    protocol: TransferProtocol,
}

impl Ledger {
    pub fn new(strategy: TransferStrategy) -> Self {
        Self {
            registry: AccountRegistry::new(),
            protocol: TransferProtocol::new(strategy),
        }
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    pub fn create_account(&self) -> DomainResult<Arc<Account>> {
        self.registry.create_account()
    }

    pub fn get_account(&self, id: AccountId) -> Option<Arc<Account>> {
        self.registry.get_account(id)
    }

    pub fn list_accounts(&self) -> Vec<Arc<Account>> {
        self.registry.list_accounts()
    }

    pub fn credit(&self, id: AccountId, amount: i64) -> DomainResult<bool> {
        Ok(self.resolve(id)?.credit(amount))
    }

    pub fn withdraw(&self, id: AccountId, amount: i64) -> DomainResult<bool> {
        Ok(self.resolve(id)?.withdraw(amount))
    }

    /// [`Ledger::credit`], returning the account state read under the same
    /// lock. `Ok(None)` when the credit was refused.
    pub fn credit_snapshot(&self, id: AccountId, amount: i64) -> DomainResult<Option<AccountSnapshot>> {
        Ok(self.resolve(id)?.credit_snapshot(amount))
    }

    /// [`Ledger::withdraw`], returning the account state read under the same
    /// lock. `Ok(None)` when the withdrawal was refused.
    pub fn withdraw_snapshot(&self, id: AccountId, amount: i64) -> DomainResult<Option<AccountSnapshot>> {
        Ok(self.resolve(id)?.withdraw_snapshot(amount))
    }

    pub fn transfer(&self, from: AccountId, to: AccountId, amount: i64) -> DomainResult<bool> {
        Ok(self.execute(Transfer { from, to, amount })?.is_committed())
    }

    /// Like [`Ledger::transfer`], but reports which terminal state was reached.
    pub fn execute(&self, transfer: Transfer) -> DomainResult<TransferOutcome> {
        Ok(self.execute_with_source(transfer)?.0)
    }

    /// Like [`Ledger::execute`], also returning the source account as the
    /// transfer left it.
    pub fn execute_with_source(&self, transfer: Transfer) -> DomainResult<(TransferOutcome, AccountSnapshot)> {
        let from = self.resolve(transfer.from)?;
        let to = self.resolve(transfer.to)?;
        Ok(self.protocol.execute_with_source(&from, &to, transfer.amount))
    }

    fn resolve(&self, id: AccountId) -> DomainResult<Arc<Account>> {
        self.registry.get_account(id).ok_or(DomainError::NotFound)
    }
}
