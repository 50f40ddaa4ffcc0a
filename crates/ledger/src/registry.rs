//! Append-only account registry.
//!
//! Accounts live in an arena of geometrically growing segments. Each slot is a
//! `OnceLock`, written exactly once by the creator that owns its index, and
//! `committed` is bumped only after the slot is filled. Readers load
//! `committed` and never touch the append mutex, so lookups and listings run
//! against the committed prefix while creations are in flight.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tally_core::{AccountId, DomainError, DomainResult};

use crate::account::Account;

/// Size of the first segment; segment `k` holds `FIRST_SEGMENT << k` slots.
const FIRST_SEGMENT: usize = 32;
/// Enough segments to cover the whole `u32` id space.
const SEGMENTS: usize = 28;

type Segment = Box<[OnceLock<Arc<Account>>]>;

#[derive(Debug)]
pub struct AccountRegistry {
    segments: [OnceLock<Segment>; SEGMENTS],
    committed: AtomicUsize,
    append: Mutex<()>,
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self {
            segments: std::array::from_fn(|_| OnceLock::new()),
            committed: AtomicUsize::new(0),
            append: Mutex::new(()),
        }
    }

    /// Creates a zero-balance account with the next sequential id.
    ///
    /// Id assignment and append happen under one mutex, so concurrent callers
    /// always observe distinct ids.
    pub fn create_account(&self) -> DomainResult<Arc<Account>> {
        let _append = self.append.lock().unwrap_or_else(PoisonError::into_inner);

        let index = self.committed.load(Ordering::Relaxed);
        let raw = u32::try_from(index).map_err(|_| DomainError::CapacityExhausted)?;
        let (segment, offset) = locate(index).ok_or(DomainError::CapacityExhausted)?;

        let slots = self.segments[segment].get_or_init(|| {
            (0..FIRST_SEGMENT << segment)
                .map(|_| OnceLock::new())
                .collect()
        });

        let account = Arc::new(Account::new(AccountId::new(raw)));
        // Only the append-lock holder writes slots, and it writes each index once.
        let stored = slots[offset].set(Arc::clone(&account)).is_ok();
        debug_assert!(stored, "slot {index} written twice");
        self.committed.store(index + 1, Ordering::Release);

        tracing::debug!(account_id = %account.id(), "account created");
        Ok(account)
    }

    /// Resolves an id to its account, or `None` if it has not been created yet.
    pub fn get_account(&self, id: AccountId) -> Option<Arc<Account>> {
        let index = id.index();
        if index >= self.committed.load(Ordering::Acquire) {
            return None;
        }
        self.slot(index)
    }

    /// Accounts committed at the time of the call, in id order.
    pub fn list_accounts(&self) -> Vec<Arc<Account>> {
        let len = self.committed.load(Ordering::Acquire);
        (0..len).filter_map(|index| self.slot(index)).collect()
    }

    /// The registry is append-only; removal always fails.
    pub fn remove_account(&self, id: AccountId) -> DomainResult<()> {
        Err(DomainError::unsupported(format!(
            "account {id} cannot be removed: registry is append-only"
        )))
    }

    pub fn len(&self) -> usize {
        self.committed.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, index: usize) -> Option<Arc<Account>> {
        let (segment, offset) = locate(index)?;
        self.segments[segment].get()?.get(offset).and_then(OnceLock::get).cloned()
    }
}

/// Maps a flat index to `(segment, offset)`.
///
/// Segment `k` starts at `FIRST_SEGMENT * (2^k - 1)`, so
/// `index + FIRST_SEGMENT` lies in `[FIRST_SEGMENT << k, FIRST_SEGMENT << (k + 1))`.
fn locate(index: usize) -> Option<(usize, usize)> {
    let shifted = index.checked_add(FIRST_SEGMENT)?;
    let segment = (usize::BITS - 1 - (shifted / FIRST_SEGMENT).leading_zeros()) as usize;
    if segment >= SEGMENTS {
        return None;
    }
    Some((segment, shifted - (FIRST_SEGMENT << segment)))
}
