use crate::error::Result;
use crate::record::{MergeOutcome, StatementRecord};

/// Where site drivers send what they scrape.
///
/// Calls must be made one at a time and in page order: sequencing of identical
/// records depends on it. `&mut self` keeps a sink single-writer.
#[allow(async_fn_in_trait)]
pub trait Ledger {
    /// Map an institution-native account reference to the ledger's account id.
    async fn resolve_account_id(&mut self, institution: &str, reference: &str) -> Result<i64>;

    /// Sequence and submit one record.
    async fn merge(&mut self, record: StatementRecord) -> Result<MergeOutcome>;
}
