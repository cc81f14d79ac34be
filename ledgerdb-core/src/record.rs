use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::normalize::collapse_whitespace;

/// One scraped transaction, normalized and bank-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub institution: String,
    pub account_id: i64,
    pub date: NaiveDate,
    /// Funds leaving the account are negative.
    pub amount: Decimal,
    pub description: String,
    sequence: u32,
}

impl StatementRecord {
    /// Build a record with an unassigned sequence. The description is
    /// whitespace-collapsed and trimmed.
    pub fn new(
        institution: impl Into<String>,
        account_id: i64,
        date: NaiveDate,
        amount: Decimal,
        description: &str,
    ) -> Self {
        Self {
            institution: institution.into(),
            account_id,
            date,
            amount,
            description: collapse_whitespace(description),
            sequence: 0,
        }
    }

    /// 1-based ordinal among identical records of the run; 0 until a ledger
    /// session has assigned it.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn assign_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }

}

/// Institution-native account identifier as shown on the portal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountReference {
    pub institution: String,
    pub reference: String,
}

impl AccountReference {
    pub fn new(institution: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            institution: institution.into(),
            reference: reference.into(),
        }
    }
}

/// Per-run submission counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// Every record the server accepted.
    pub processed: u32,
    /// Records the server had not seen before.
    pub inserted: u32,
}

impl std::fmt::Display for RunCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} processed, {} inserted", self.processed, self.inserted)
    }
}

/// Result of a single merge call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub sequence: u32,
    /// Server-side count of this exact record (sequence included) before the call.
    pub duplicates: u64,
}

impl MergeOutcome {
    pub fn is_new(&self) -> bool {
        self.duplicates == 0
    }
}
