//! Wire shapes of the ledger server API.

use chrono::NaiveDate;
use ledgerdb_core::StatementRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST /statement`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementDto<'a> {
    pub statement_date: NaiveDate,
    pub account_id: i64,
    pub amount: Decimal,
    pub description: &'a str,
    /// Legacy column, always empty.
    pub source: &'static str,
    pub sequence: u32,
}

impl<'a> From<&'a StatementRecord> for StatementDto<'a> {
    fn from(r: &'a StatementRecord) -> Self {
        Self {
            statement_date: r.date,
            account_id: r.account_id,
            amount: r.amount,
            description: &r.description,
            source: "",
            sequence: r.sequence(),
        }
    }
}

/// Body of `GET /institution_link/{institution}/{reference}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionLinkDto {
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    pub account_id: i64,
}
