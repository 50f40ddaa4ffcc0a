use tally_core::{AccountId, DomainResult};
use tally_ledger::{AccountSnapshot, Ledger, Transfer, TransferOutcome, TransferStrategy};

/// Result of a money movement that reached an existing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Movement {
    /// The operation went through; carries the account state read before
    /// its lock was released.
    Applied(AccountSnapshot),
    /// The ledger declined it; carries a human-readable reason.
    Rejected(&'static str),
    /// Locks could not be acquired before the deadline (try-lock only).
    TimedOut,
}

/// Services shared by every handler.
#[derive(Debug, Default)]
pub struct AppServices {
    ledger: Ledger,
}

impl AppServices {
    pub fn new(strategy: TransferStrategy) -> Self {
        Self {
            ledger: Ledger::new(strategy),
        }
    }

    pub fn create_account(&self) -> DomainResult<AccountSnapshot> {
        let account = self.ledger.create_account()?;
        Ok(account.snapshot())
    }

    pub fn get_account(&self, id: AccountId) -> Option<AccountSnapshot> {
        self.ledger.get_account(id).map(|a| a.snapshot())
    }

    pub fn list_accounts(&self) -> Vec<AccountSnapshot> {
        self.ledger
            .list_accounts()
            .iter()
            .map(|a| a.snapshot())
            .collect()
    }

    pub fn remove_account(&self, id: AccountId) -> DomainResult<()> {
        self.ledger.registry().remove_account(id)
    }

    pub fn credit(&self, id: AccountId, amount: i64) -> DomainResult<Movement> {
        Ok(match self.ledger.credit_snapshot(id, amount)? {
            Some(snapshot) => Movement::Applied(snapshot),
            None => Movement::Rejected("amount must be positive and the balance must stay representable"),
        })
    }

    pub fn withdraw(&self, id: AccountId, amount: i64) -> DomainResult<Movement> {
        Ok(match self.ledger.withdraw_snapshot(id, amount)? {
            Some(snapshot) => Movement::Applied(snapshot),
            None => Movement::Rejected("amount must be positive and must not exceed the balance"),
        })
    }

    /// On success the snapshot is of the source account.
    pub fn transfer(&self, from: AccountId, to: AccountId, amount: i64) -> DomainResult<Movement> {
        let (outcome, source) = self.ledger.execute_with_source(Transfer { from, to, amount })?;
        Ok(match outcome {
            TransferOutcome::Committed => Movement::Applied(source),
            TransferOutcome::SelfTransferRejected => {
                Movement::Rejected("source and destination accounts must differ")
            }
            TransferOutcome::Aborted => Movement::Rejected(
                "amount must be positive and must not exceed the source balance",
            ),
            TransferOutcome::RolledBack => {
                Movement::Rejected("destination account cannot accept the amount")
            }
            TransferOutcome::TimedOut => Movement::TimedOut,
        })
    }
}
