//! Two-account transfer protocol.
//!
//! A transfer holds the exclusive locks of both accounts while it withdraws
//! from the source and credits the destination, so no observer ever sees the
//! money in flight.
//!
//! ## Lock acquisition
//!
//! - [`TransferStrategy::Ordered`] (default): lock the account with the smaller
//!   id first. Every transfer in the process acquires locks in ascending id
//!   order, which rules out circular wait; `A -> B` and `B -> A` lock in the
//!   same sequence.
//! - [`TransferStrategy::TryLock`]: try the source, then the destination,
//!   without blocking. On partial success release, back off, and retry until
//!   the timeout elapses. Expiry is reported as [`TransferOutcome::TimedOut`].
//!
//! ## States
//!
//! ```text
//! Requested ─┬─> SelfTransferRejected
//!            └─> LocksAcquired ─┬─> withdraw fails ──> Aborted
//!                               └─> withdraw ok ─┬─> credit ok ───> Committed
//!                                                └─> credit fails ─> RolledBack
//! ```

use std::time::{Duration, Instant};

use tally_core::AccountId;

use crate::account::{Account, AccountSnapshot, BalanceGuard};

/// A single transfer request. Evaluated once; leaves no record behind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: i64,
}

/// Terminal state of a transfer attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Source and destination were the same account. No lock was taken.
    SelfTransferRejected,
    /// The withdrawal failed (non-positive amount or insufficient funds).
    Aborted,
    /// Funds moved.
    Committed,
    /// The credit failed after a successful withdrawal and the source was restored.
    RolledBack,
    /// Both locks could not be held together before the deadline.
    TimedOut,
}

impl TransferOutcome {
    pub fn is_committed(self) -> bool {
        matches!(self, TransferOutcome::Committed)
    }
}

/// How a transfer acquires its two locks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TransferStrategy {
    #[default]
    Ordered,
    TryLock { timeout: Duration, backoff: Duration },
}

impl TransferStrategy {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);
    pub const DEFAULT_BACKOFF: Duration = Duration::from_micros(50);

    pub fn try_lock() -> Self {
        TransferStrategy::TryLock {
            timeout: Self::DEFAULT_TIMEOUT,
            backoff: Self::DEFAULT_BACKOFF,
        }
    }
}

/// Upper bound for the try-lock backoff, regardless of the configured start.
const MAX_BACKOFF: Duration = Duration::from_millis(5);

#[derive(Debug, Copy, Clone, Default)]
pub struct TransferProtocol {
    strategy: TransferStrategy,
}

impl TransferProtocol {
    pub fn new(strategy: TransferStrategy) -> Self {
        Self { strategy }
    }

    /// Moves `amount` from `from` to `to`; `true` only if the funds moved.
    pub fn transfer(&self, from: &Account, to: &Account, amount: i64) -> bool {
        self.execute(from, to, amount).is_committed()
    }

    pub fn execute(&self, from: &Account, to: &Account, amount: i64) -> TransferOutcome {
        self.execute_with_source(from, to, amount).0
    }

    /// Like [`TransferProtocol::execute`], also returning the source account.
    ///
    /// Once both locks were held, the snapshot is taken before they are
    /// released, so it is the source balance this transfer left behind.
    pub fn execute_with_source(
        &self,
        from: &Account,
        to: &Account,
        amount: i64,
    ) -> (TransferOutcome, AccountSnapshot) {
        if from.id() == to.id() {
            tracing::debug!(account_id = %from.id(), amount, "self-transfer rejected");
            return (TransferOutcome::SelfTransferRejected, from.snapshot());
        }

        let (outcome, source) = match self.strategy {
            TransferStrategy::Ordered => ordered(from, to, amount),
            TransferStrategy::TryLock { timeout, backoff } => {
                with_try_lock(from, to, amount, timeout, backoff)
            }
        };

        match outcome {
            TransferOutcome::RolledBack => tracing::warn!(
                from = %from.id(),
                to = %to.id(),
                amount,
                "destination rejected credit; source restored"
            ),
            TransferOutcome::TimedOut => tracing::warn!(
                from = %from.id(),
                to = %to.id(),
                amount,
                "could not acquire both account locks before timeout"
            ),
            _ => tracing::debug!(from = %from.id(), to = %to.id(), amount, ?outcome, "transfer finished"),
        }
        (outcome, source)
    }
}

fn ordered(from: &Account, to: &Account, amount: i64) -> (TransferOutcome, AccountSnapshot) {
    if from.id() < to.id() {
        let mut source = from.lock_exclusive();
        let mut destination = to.lock_exclusive();
        move_funds(&mut source, &mut destination, amount)
    } else {
        let mut destination = to.lock_exclusive();
        let mut source = from.lock_exclusive();
        move_funds(&mut source, &mut destination, amount)
    }
}

fn with_try_lock(
    from: &Account,
    to: &Account,
    amount: i64,
    timeout: Duration,
    backoff: Duration,
) -> (TransferOutcome, AccountSnapshot) {
    let deadline = Instant::now() + timeout;
    let mut pause = backoff;

    loop {
        if let Some(mut source) = from.try_lock_exclusive() {
            if let Some(mut destination) = to.try_lock_exclusive() {
                return move_funds(&mut source, &mut destination, amount);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return (TransferOutcome::TimedOut, from.snapshot());
        }
        std::thread::sleep(pause.min(deadline - now));
        pause = (pause * 2).min(MAX_BACKOFF).max(backoff);
    }
}

/// Runs with both locks held.
fn move_funds(
    source: &mut BalanceGuard<'_>,
    destination: &mut BalanceGuard<'_>,
    amount: i64,
) -> (TransferOutcome, AccountSnapshot) {
    debug_assert_ne!(source.id(), destination.id());

    let outcome = if !source.withdraw(amount) {
        TransferOutcome::Aborted
    } else if destination.credit(amount) {
        TransferOutcome::Committed
    } else {
        // The withdrawal just freed exactly this much headroom, so this credit fits.
        let restored = source.credit(amount);
        debug_assert!(restored);
        TransferOutcome::RolledBack
    };
    (outcome, source.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AccountRegistry;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn strategies() -> [TransferStrategy; 2] {
        [
            TransferStrategy::Ordered,
            TransferStrategy::TryLock {
                timeout: Duration::from_secs(5),
                backoff: Duration::from_micros(10),
            },
        ]
    }

    fn funded(registry: &AccountRegistry, balance: i64) -> Arc<Account> {
        let account = registry.create_account().unwrap();
        if balance > 0 {
            assert!(account.credit(balance));
        }
        account
    }

    #[test]
    fn successful_transfer_conserves_funds() {
        for strategy in strategies() {
            let registry = AccountRegistry::new();
            let a = funded(&registry, 500);
            let b = funded(&registry, 20);
            let protocol = TransferProtocol::new(strategy);

            assert_eq!(protocol.execute(&a, &b, 120), TransferOutcome::Committed);
            assert_eq!(a.balance(), 380);
            assert_eq!(b.balance(), 140);

            // Higher id to lower id takes the other branch of the lock order.
            assert!(protocol.transfer(&b, &a, 40));
            assert_eq!(a.balance(), 420);
            assert_eq!(b.balance(), 100);
        }
    }

    #[test]
    fn source_snapshot_is_what_the_transfer_left_behind() {
        for strategy in strategies() {
            let registry = AccountRegistry::new();
            let a = funded(&registry, 300);
            let b = funded(&registry, 0);
            let protocol = TransferProtocol::new(strategy);

            let (outcome, source) = protocol.execute_with_source(&a, &b, 120);
            assert_eq!(outcome, TransferOutcome::Committed);
            assert_eq!(source, AccountSnapshot { id: a.id(), total_money: 180 });

            let (outcome, source) = protocol.execute_with_source(&a, &b, 181);
            assert_eq!(outcome, TransferOutcome::Aborted);
            assert_eq!(source.total_money, 180);
        }
    }

    #[test]
    fn self_transfer_is_rejected_even_with_funds() {
        for strategy in strategies() {
            let registry = AccountRegistry::new();
            let a = funded(&registry, 1_000);
            let protocol = TransferProtocol::new(strategy);

            for amount in [-5, 0, 1, 1_000, 5_000] {
                assert_eq!(
                    protocol.execute(&a, &a, amount),
                    TransferOutcome::SelfTransferRejected
                );
            }
            assert_eq!(a.balance(), 1_000);
        }
    }

    #[test]
    fn self_transfer_check_takes_no_lock() {
        let registry = AccountRegistry::new();
        let a = funded(&registry, 10);
        let _held = a.lock_exclusive();

        // Would deadlock if the protocol tried to lock `a`.
        assert!(!TransferProtocol::default().transfer(&a, &a, 5));
    }

    #[test]
    fn insufficient_funds_leave_both_untouched() {
        for strategy in strategies() {
            let registry = AccountRegistry::new();
            let a = funded(&registry, 100);
            let b = funded(&registry, 7);
            let protocol = TransferProtocol::new(strategy);

            assert_eq!(protocol.execute(&a, &b, 101), TransferOutcome::Aborted);
            assert_eq!(a.balance(), 100);
            assert_eq!(b.balance(), 7);
        }
    }

    #[test]
    fn non_positive_amount_aborts() {
        let registry = AccountRegistry::new();
        let a = funded(&registry, 100);
        let b = funded(&registry, 0);
        let protocol = TransferProtocol::default();

        assert_eq!(protocol.execute(&a, &b, 0), TransferOutcome::Aborted);
        assert_eq!(protocol.execute(&a, &b, -10), TransferOutcome::Aborted);
        assert_eq!(a.balance(), 100);
        assert_eq!(b.balance(), 0);
    }

    #[test]
    fn failed_credit_rolls_back_the_withdrawal() {
        for strategy in strategies() {
            let registry = AccountRegistry::new();
            let a = funded(&registry, 10);
            let b = funded(&registry, i64::MAX);
            assert!(b.credit(i64::MAX));
            let b_before = b.balance();
            let protocol = TransferProtocol::new(strategy);

            assert_eq!(protocol.execute(&a, &b, 10), TransferOutcome::RolledBack);
            assert_eq!(a.balance(), 10);
            assert_eq!(b.balance(), b_before);
        }
    }

    #[test]
    fn try_lock_times_out_while_destination_is_held() {
        let registry = AccountRegistry::new();
        let a = funded(&registry, 10);
        let b = funded(&registry, 0);
        let protocol = TransferProtocol::new(TransferStrategy::TryLock {
            timeout: Duration::from_millis(20),
            backoff: Duration::from_millis(1),
        });

        let held = b.lock_exclusive();
        assert_eq!(protocol.execute(&a, &b, 5), TransferOutcome::TimedOut);
        drop(held);

        assert_eq!(a.balance(), 10);
        assert_eq!(b.balance(), 0);
        assert_eq!(protocol.execute(&a, &b, 5), TransferOutcome::Committed);
    }

    #[test]
    fn opposite_transfers_do_not_deadlock() {
        for strategy in strategies() {
            for _ in 0..200 {
                let registry = AccountRegistry::new();
                let a = funded(&registry, 200);
                let b = funded(&registry, 450);
                let protocol = TransferProtocol::new(strategy);

                let (ab, ba) = std::thread::scope(|s| {
                    let ab = s.spawn(|| protocol.transfer(&a, &b, 50));
                    let ba = s.spawn(|| protocol.transfer(&b, &a, 350));
                    (ab.join().unwrap(), ba.join().unwrap())
                });

                assert!(ab && ba);
                assert_eq!(a.balance(), 500);
                assert_eq!(b.balance(), 150);
            }
        }
    }

    #[test]
    fn contended_transfers_conserve_the_total() {
        const ACCOUNTS: usize = 6;
        const THREADS: usize = 8;
        const ROUNDS: usize = 2_000;

        for strategy in strategies() {
            let registry = AccountRegistry::new();
            let accounts: Vec<_> = (0..ACCOUNTS).map(|_| funded(&registry, 1_000)).collect();
            let protocol = TransferProtocol::new(strategy);

            std::thread::scope(|s| {
                for t in 0..THREADS {
                    let accounts = &accounts;
                    let protocol = &protocol;
                    s.spawn(move || {
                        // Cheap deterministic walk over pairs, different per thread.
                        let mut state = t * 7 + 1;
                        for _ in 0..ROUNDS {
                            state = (state * 31 + 17) % 9_973;
                            let from = state % ACCOUNTS;
                            let to = (state / ACCOUNTS) % ACCOUNTS;
                            let amount = (state % 300) as i64;
                            protocol.transfer(&accounts[from], &accounts[to], amount);
                        }
                    });
                }
            });

            let total: u64 = accounts.iter().map(|a| a.balance()).sum();
            assert_eq!(total, (ACCOUNTS * 1_000) as u64);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: committed transfers move exactly `amount`; anything else
        /// leaves both balances where they were.
        #[test]
        fn every_attempt_conserves_the_pair(
            start_a in 0i64..10_000,
            start_b in 0i64..10_000,
            moves in prop::collection::vec((any::<bool>(), -100i64..12_000), 1..30)
        ) {
            let registry = AccountRegistry::new();
            let a = funded(&registry, start_a);
            let b = funded(&registry, start_b);
            let protocol = TransferProtocol::default();
            let total = a.balance() + b.balance();

            for (forward, amount) in moves {
                let (from, to) = if forward { (&a, &b) } else { (&b, &a) };
                let (from_before, to_before) = (from.balance(), to.balance());

                if protocol.transfer(from, to, amount) {
                    prop_assert_eq!(from.balance(), from_before - amount as u64);
                    prop_assert_eq!(to.balance(), to_before + amount as u64);
                } else {
                    prop_assert_eq!(from.balance(), from_before);
                    prop_assert_eq!(to.balance(), to_before);
                }
                prop_assert_eq!(a.balance() + b.balance(), total);
            }
        }
    }
}
