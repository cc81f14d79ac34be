//! ledgerdb-session: the authenticated channel to the ledger server for one
//! scraping run: account resolution, sequencing and idempotent submission.

pub mod dto;
mod http;
pub mod resolver;
pub mod sequencer;
pub mod session;

pub use resolver::AccountResolver;
pub use sequencer::SequenceTracker;
pub use session::{DEFAULT_TIMEOUT, MergeSession};
