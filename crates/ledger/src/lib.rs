//! In-memory ledger: accounts, an append-only registry, and a deadlock-free
//! two-account transfer protocol.
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod account;
pub mod ledger;
pub mod registry;
pub mod transfer;

pub use account::{Account, AccountSnapshot};
pub use ledger::Ledger;
pub use registry::AccountRegistry;
pub use transfer::{Transfer, TransferOutcome, TransferProtocol, TransferStrategy};
