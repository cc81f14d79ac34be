//! Within-run duplicate counting.
//!
//! A portal can list the same purchase twice on one day. The server tells
//! such rows apart by `sequence`: the n-th identical row of a run is sent with
//! sequence n, so a rerun that sees the same rows again maps them onto the
//! same server records instead of inserting new ones.

use std::collections::HashMap;

use chrono::NaiveDate;
use ledgerdb_core::StatementRecord;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TransactionKey {
    institution: String,
    account_id: i64,
    date: NaiveDate,
    amount: Decimal,
    description: String,
}

impl From<&StatementRecord> for TransactionKey {
    fn from(r: &StatementRecord) -> Self {
        Self {
            institution: r.institution.clone(),
            account_id: r.account_id,
            date: r.date,
            amount: r.amount,
            description: r.description.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SequenceTracker {
    seen: HashMap<TransactionKey, u32>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence `record` would get if submitted now: 1 + identical records
    /// already committed this run.
    pub fn next_sequence(&self, record: &StatementRecord) -> u32 {
        self.seen
            .get(&TransactionKey::from(record))
            .copied()
            .unwrap_or(0)
            + 1
    }

    /// Count `record` as submitted.
    pub fn commit(&mut self, record: &StatementRecord) {
        *self.seen.entry(TransactionKey::from(record)).or_insert(0) += 1;
    }
}
