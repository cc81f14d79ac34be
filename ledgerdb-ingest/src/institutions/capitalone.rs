//! Capital One (credit card). One account per login; charges are shown as
//! positive amounts.

use std::sync::LazyLock;

use ledgerdb_core::normalize::{Cents, Sign, capture, parse_date, parse_dollars};
use ledgerdb_core::{Ledger, Result, StatementRecord};
use regex::Regex;

use super::{Portal, ensure, ensure_cells};
use crate::browser::{self, Browser, ReleaseMode};
use crate::driver::{DriverContext, SiteDriver};

pub const INSTITUTION: &str = "capitalone";

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\.\.\.(\d+)$").unwrap());
// "Open Drawer", "Close Drawer" precede the date in the first cell.
static DRAWER_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]+").unwrap());

const APPEARS_AS: &str = "./following-sibling::div//div[starts-with(@class,'info')]//span[@class='appears_as']";

/// `...1234` → `1234`.
pub fn parse_reference(text: &str) -> Result<String> {
    capture(&REFERENCE_RE, text.trim(), "account number").map(str::to_string)
}

/// One posted transaction. `cells` are the five grid cells of the row and
/// `appears_as` is the merchant text from the row's drawer.
pub fn parse_row(account_id: i64, cells: &[String], appears_as: &str) -> Result<StatementRecord> {
    ensure_cells(cells, 5)?;

    let date: String = cells[0].chars().filter(|c| !c.is_whitespace()).collect();
    let date = DRAWER_PREFIX_RE.replace(&date, "");
    let date = parse_date(&date, "%m/%d/%y")?;

    let amount = parse_dollars(&cells[4], Cents::Required, Sign::Signed)?;

    Ok(StatementRecord::new(INSTITUTION, account_id, date, -amount, appears_as))
}

pub struct CapitalOne<B: Browser> {
    portal: Portal<B>,
}

impl<B: Browser> CapitalOne<B> {
    pub fn new(browser: B, ctx: DriverContext) -> Self {
        Self {
            portal: Portal::new(browser, ctx),
        }
    }

    /// The drawer text renders lazily after the click.
    async fn appears_as(&self, row: &B::Element) -> Result<String> {
        let browser = &self.portal.browser;
        for _ in 0..10 {
            if !browser.find_all_in(row, APPEARS_AS).await?.is_empty() {
                break;
            }
            self.portal.pause(1, 1).await;
        }
        let span = browser.find_in(row, APPEARS_AS).await?;
        browser.text(&span).await
    }

    async fn scrape_posted<L: Ledger>(&self, ledger: &mut L, account_id: i64) -> Result<()> {
        let browser = &self.portal.browser;
        let table = browser.find("//div[@id='postedTransactionTable']").await?;
        let rows = browser.find_all_in(&table, "./div[@role='row']").await?;
        tracing::debug!(parent: self.portal.span(), rows = rows.len(), "posted transactions");

        for (i, row) in rows.iter().enumerate() {
            let cells = browser.find_all_in(row, "./div[@role='gridcell']").await?;
            ensure(cells.len() == 5, || format!("expected 5 cells, got {}", cells.len()))?;

            let drawer = browser.find_in(&cells[0], "./a[.='Open Drawer']").await?;
            self.portal.click(&drawer).await?;
            let appears_as = self.appears_as(row).await?;

            let texts = browser::texts(browser, &cells).await?;
            ledger.merge(parse_row(account_id, &texts, &appears_as)?).await?;
            tracing::debug!(parent: self.portal.span(), "merged transaction {} of {}", i + 1, rows.len());
        }
        Ok(())
    }
}

impl<B: Browser> SiteDriver for CapitalOne<B> {
    fn institution(&self) -> &'static str {
        INSTITUTION
    }

    fn logged_in(&self) -> bool {
        self.portal.logged_in
    }

    async fn authenticate(&mut self, logon: &str, password: &str) -> Result<()> {
        let portal = &self.portal;
        portal.open().await?;
        portal.pause(10, 20).await;
        portal.browser.find("//label[.='Sign In']").await?;

        let input = portal.browser.find("//input[@id='username']").await?;
        portal.browser.send_keys(&input, logon).await?;
        let input = portal.browser.find("//input[@id='password']").await?;
        portal.browser.send_keys(&input, password).await?;
        portal.click_xpath("//button[.='Sign In']").await?;
        tracing::debug!(parent: portal.span(), "logging in");

        portal.landmark("//h1/span[starts-with(text(),'Welcome')]").await?;
        tracing::debug!(parent: portal.span(), "logged in");
        self.portal.logged_in = true;
        Ok(())
    }

    async fn scrape<L: Ledger>(&mut self, ledger: &mut L) -> Result<()> {
        let portal = &self.portal;
        portal.pause(10, 20).await;

        let reference = parse_reference(&portal.text_of("//span[@id='acct0_number']").await?)?;
        let account_id = ledger.resolve_account_id(INSTITUTION, &reference).await?;

        portal.click_xpath("//a[@id='transactions_link']").await?;
        portal.pause(10, 20).await;
        portal.browser.find("//h1[.='Transactions & Details']").await?;

        self.scrape_posted(ledger, account_id).await
    }

    async fn deauthenticate(&mut self) -> Result<()> {
        tracing::debug!(parent: self.portal.span(), "logging out");
        self.portal.click_xpath("//a[.='Sign Out']").await?;
        self.portal
            .browser
            .find("//h1[.=\"You've logged out of online banking.\"]")
            .await?;
        self.portal.logged_in = false;
        Ok(())
    }

    async fn release(self, mode: ReleaseMode) -> Result<()> {
        self.portal.release(mode).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ledgerdb_core::ScrapeError;
    use rust_decimal::Decimal;

    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse_reference("...1234").unwrap(), "1234");
        assert!(parse_reference("1234").is_err());
        assert!(parse_reference("...12a4").is_err());
    }

    #[test]
    fn test_charge_becomes_negative() {
        let row = cells(&["Open Drawer\n3/05/24", "Mar 4", "AMAZON MKTP", "Me", "$1,234.56"]);
        let r = parse_row(9, &row, "  AMAZON.CA   MARKETPLACE ").unwrap();
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(r.amount, Decimal::new(-123456, 2));
        assert_eq!(r.description, "AMAZON.CA MARKETPLACE");
        assert_eq!(r.account_id, 9);
        assert_eq!(r.institution, "capitalone");
    }

    #[test]
    fn test_payment_becomes_positive() {
        let row = cells(&["Close Drawer 12/31/23", "", "PAYMENT", "", "-$50.00"]);
        let r = parse_row(9, &row, "PAYMENT - THANK YOU").unwrap();
        assert_eq!(r.amount, Decimal::new(5000, 2));
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_rejects_malformed_rows() {
        let short = cells(&["3/05/24", "x", "y", "$1.00"]);
        assert!(matches!(parse_row(1, &short, "x"), Err(ScrapeError::PageStructure(_))));

        let no_cents = cells(&["3/05/24", "", "", "", "$12"]);
        assert!(matches!(parse_row(1, &no_cents, "x"), Err(ScrapeError::PageStructure(_))));

        let bad_date = cells(&["2024-03-05", "", "", "", "$12.00"]);
        assert!(matches!(parse_row(1, &bad_date, "x"), Err(ScrapeError::PageStructure(_))));
    }
}
