//! ledgerdb-core: statement records, the scrape error taxonomy, row-text
//! normalization and the ledger sink contract shared by sessions and drivers.

pub mod config;
pub mod error;
pub mod ledger;
pub mod normalize;
pub mod record;

pub use config::{InstanceInfo, SiteInfo, redact_userinfo};
pub use error::{Result, ScrapeError};
pub use ledger::Ledger;
pub use record::{AccountReference, MergeOutcome, RunCounters, StatementRecord};
