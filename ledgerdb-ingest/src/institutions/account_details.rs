//! The "Account Summary" / "Account Details" portal shared by PC Financial and
//! Simplii: a summary page with one table per product class, and a details
//! page with an account selector and a five-column transaction list.

use std::sync::LazyLock;

use ledgerdb_core::normalize::{Cents, Sign, capture, debit_or_credit, parse_date};
use ledgerdb_core::{Ledger, Result, ScrapeError, StatementRecord};
use regex::Regex;

use super::{Portal, ensure, ensure_cells};
use crate::browser::Browser;

pub const HEADER: &str = "Date Transactions Funds out Funds in Running Balance";
pub const CELL_CLASSES: [&str; 5] = ["date", "transactions", "debit", "credit", "balance"];

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([0-9]+)\)").unwrap());

const NO_TRANSACTIONS: &str = "There are no transactions found";

/// `"No Fee Chequing (1234567)"` → `1234567`.
pub fn parse_reference(account_name: &str) -> Result<String> {
    capture(&REFERENCE_RE, account_name, "selected account").map(str::to_string)
}

/// One transaction row. `classes` are the cells' `class` attributes and must
/// line up with [`CELL_CLASSES`]. Funds out come back negative.
pub fn parse_row(institution: &str, account_id: i64, cells: &[String], classes: &[Option<String>]) -> Result<StatementRecord> {
    ensure_cells(cells, CELL_CLASSES.len())?;
    for (class, want) in classes.iter().zip(CELL_CLASSES) {
        ensure(class.as_deref() == Some(want), || format!("cell class {class:?}, expected {want:?}"))?;
    }
    ensure(classes.len() == CELL_CLASSES.len(), || format!("{} cell classes", classes.len()))?;

    let date = parse_date(&cells[0], "%b %d, %Y")?;
    let amount = debit_or_credit(&cells[2], &cells[3], Cents::Optional, Sign::Unsigned)?;

    Ok(StatementRecord::new(institution, account_id, date, amount, &cells[1]))
}

/// Open every account listed in the summary table with class `class_name` and
/// scrape its transactions.
///
/// `leading` are the texts of the rows that precede the transactions in the
/// details table.
pub(crate) async fn scrape_summary_table<B, L>(
    portal: &Portal<B>,
    ledger: &mut L,
    institution: &str,
    class_name: &str,
    leading: &[&str],
) -> Result<()>
where
    B: Browser,
    L: Ledger,
{
    let browser = &portal.browser;
    let table_xpath = format!("//table[@class='{class_name}']");
    tracing::debug!(parent: portal.span(), table = class_name, "account summary");

    for i in 0.. {
        portal.pause(2, 5).await;
        portal.click_xpath("//a[text()='Account Summary']").await?;
        let table = browser.find(&table_xpath).await?;
        let accounts = browser.find_all_in(&table, "tbody/tr").await?;

        if i == 0 {
            if let [only] = accounts.as_slice() {
                if browser.text(only).await?.contains("You don't have any") {
                    tracing::debug!(parent: portal.span(), table = class_name, "no accounts");
                    return Ok(());
                }
            }
            ensure(!accounts.is_empty(), || format!("no rows in {class_name} table"))?;
            tracing::debug!(parent: portal.span(), table = class_name, "got {} accounts", accounts.len());
        }
        let Some(account) = accounts.get(i) else {
            break;
        };
        tracing::debug!(parent: portal.span(), "processing account {} of {}", i + 1, accounts.len());

        let link = browser.find_in(account, ".//a").await?;
        portal.pause(2, 5).await;
        portal.click(&link).await?;
        scrape_account(portal, ledger, institution, leading).await?;
    }
    Ok(())
}

async fn scrape_account<B, L>(portal: &Portal<B>, ledger: &mut L, institution: &str, leading: &[&str]) -> Result<()>
where
    B: Browser,
    L: Ledger,
{
    let browser = &portal.browser;
    browser.find("//header/h1[text()='Account Details']").await?;

    let select = browser.find("//div[@class='account-selector']//select").await?;
    let mut account_name = None;
    for option in browser.find_all_in(&select, "./option").await? {
        if browser.attribute(&option, "selected").await?.is_some() {
            account_name = Some(browser.text(&option).await?);
            break;
        }
    }
    let account_name = account_name.ok_or_else(|| ScrapeError::page("account selector has no selection"))?;
    let reference = parse_reference(&account_name)?;
    tracing::debug!(parent: portal.span(), %reference, "account details");

    if let Some(alert) = browser.find_all("//ui-alert/div[@class='ui-text']").await?.first() {
        let text = browser.text(alert).await?;
        if text.starts_with(NO_TRANSACTIONS) {
            tracing::debug!(parent: portal.span(), %reference, alert = %text, "skipping account");
        } else {
            tracing::warn!(parent: portal.span(), %reference, alert = %text, "skipping account");
        }
        return Ok(());
    }

    let account_id = ledger.resolve_account_id(institution, &reference).await?;

    let table = browser
        .find("//section[contains(@class,'transaction-list')]//table")
        .await?;
    let rows = browser.find_all_in(&table, ".//tr").await?;
    ensure(rows.len() >= leading.len(), || format!("{} rows in transaction list", rows.len()))?;
    for (row, want) in rows.iter().zip(leading) {
        let text = browser.text(row).await?;
        ensure(text == *want, || format!("transaction list row {text:?}, expected {want:?}"))?;
    }
    let body = &rows[leading.len()..];
    tracing::debug!(parent: portal.span(), "got {} transactions", body.len());

    for (i, row) in body.iter().enumerate() {
        let tds = browser.find_all_in(row, "./td").await?;
        let mut cells = Vec::with_capacity(tds.len());
        let mut classes = Vec::with_capacity(tds.len());
        for td in &tds {
            cells.push(browser.text(td).await?);
            classes.push(browser.attribute(td, "class").await?);
        }
        ledger.merge(parse_row(institution, account_id, &cells, &classes)?).await?;
        tracing::debug!(parent: portal.span(), "merged transaction {} of {}", i + 1, body.len());
    }
    Ok(())
}

/// Summary page landmarks shown right after a successful sign-on.
pub(crate) async fn check_signed_on<B: Browser>(portal: &Portal<B>) -> Result<()> {
    portal.landmark("//header/h1[text()='Account Summary']").await?;
    portal.landmark("//section[@class='user-info']").await?;
    let title = portal.browser.title().await?;
    if !(title.starts_with("Account Summary - ") && title.ends_with("- Online Banking")) {
        return Err(ScrapeError::login(format!("landed on {title:?}")));
    }
    Ok(())
}

pub(crate) async fn sign_off<B: Browser>(portal: &Portal<B>) -> Result<()> {
    tracing::debug!(parent: portal.span(), "logging out");
    portal.click_xpath("//button[text()='sign out']/..").await?;
    portal.browser.find("//h1[text()='You have signed off']").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn classes() -> Vec<Option<String>> {
        CELL_CLASSES.iter().map(|c| Some(c.to_string())).collect()
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse_reference("No Fee Chequing (1234567) - $10.00").unwrap(), "1234567");
        assert!(parse_reference("No Fee Chequing").is_err());
    }

    #[test]
    fn test_funds_out_is_negative() {
        let r = parse_row("simplii", 4, &row(&["Feb 29, 2024", "PRE-AUTHORIZED\nDEBIT", "$1,200", "", "$5.00"]), &classes())
            .unwrap();
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(r.amount, Decimal::from(-1200));
        assert_eq!(r.description, "PRE-AUTHORIZED DEBIT");
        assert_eq!(r.institution, "simplii");

        let r = parse_row("simplii", 4, &row(&["Mar 1, 2024", "DEPOSIT", "", "$0.15", "$5.15"]), &classes()).unwrap();
        assert_eq!(r.amount, Decimal::new(15, 2));
    }

    #[test]
    fn test_rejects_unexpected_cells() {
        let good = row(&["Mar 1, 2024", "DEPOSIT", "", "$1.00", "$5.00"]);
        let mut swapped = classes();
        swapped.swap(2, 3);
        assert!(parse_row("pcfinancial", 1, &good, &swapped).is_err());
        assert!(parse_row("pcfinancial", 1, &good, &classes()[..4]).is_err());

        let both = row(&["Mar 1, 2024", "X", "$1.00", "$1.00", "$5.00"]);
        assert!(parse_row("pcfinancial", 1, &both, &classes()).is_err());
        let signed = row(&["Mar 1, 2024", "X", "-$1.00", "", "$5.00"]);
        assert!(parse_row("pcfinancial", 1, &signed, &classes()).is_err());
        let four = row(&["Mar 1, 2024", "X", "$1.00", ""]);
        assert!(matches!(
            parse_row("pcfinancial", 1, &four, &classes()),
            Err(ScrapeError::PageStructure(_))
        ));
    }
}
