//! MBNA (credit card). Scrapes the Snapshot page's recent activity and the
//! current statement's activity; both render the same transaction table.

use std::sync::LazyLock;

use ledgerdb_core::normalize::{Cents, Sign, capture, collapse_whitespace, parse_date, parse_dollars};
use ledgerdb_core::{Ledger, Result, ScrapeError, StatementRecord};
use regex::Regex;

use super::{Portal, ensure, ensure_cells};
use crate::browser::{Browser, ReleaseMode};
use crate::driver::{DriverContext, SiteDriver};

pub const INSTITUTION: &str = "mbna";

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ending in (\d+)").unwrap());

const HEADER: [&str; 5] = [
    "Transaction date",
    "Posting date",
    "Description",
    "Reference number",
    "Amount",
];

const LOGGED_IN: &str = "//h1[normalize-space(.)='My Accounts']";

/// `"... ending in 1234"` → `1234`.
pub fn parse_reference(text: &str) -> Result<String> {
    capture(&REFERENCE_RE, text, "account link").map(str::to_string)
}

/// Header cells must start with the expected column names.
pub fn check_header(cells: &[String]) -> Result<()> {
    ensure_cells(cells, HEADER.len())?;
    for (cell, want) in cells.iter().zip(HEADER) {
        let cell = collapse_whitespace(cell);
        ensure(cell.starts_with(want), || {
            format!("transaction table column {cell:?}, expected {want:?}")
        })?;
    }
    Ok(())
}

/// One table row. Pending (`TEMP`) rows have no posting date yet and are
/// skipped with `None`.
pub fn parse_row(account_id: i64, cells: &[String]) -> Result<Option<StatementRecord>> {
    ensure_cells(cells, 5)?;
    if cells[1].trim().is_empty() && cells[3].trim() == "TEMP" {
        return Ok(None);
    }
    let date = parse_date(&cells[1], "%m/%d/%Y")?;
    let amount = parse_dollars(&cells[4], Cents::Optional, Sign::Signed)?;
    Ok(Some(StatementRecord::new(
        INSTITUTION,
        account_id,
        date,
        -amount,
        &cells[2],
    )))
}

pub struct Mbna<B: Browser> {
    portal: Portal<B>,
}

impl<B: Browser> Mbna<B> {
    pub fn new(browser: B, ctx: DriverContext) -> Self {
        Self {
            portal: Portal::new(browser, ctx),
        }
    }

    async fn scrape_table<L: Ledger>(&self, ledger: &mut L, account_id: i64) -> Result<()> {
        let portal = &self.portal;
        let table = portal.browser.find("//table[@id='transactionTable']").await?;
        let rows = portal.browser.find_all_in(&table, ".//tr").await?;
        let (head, body) = rows
            .split_first()
            .ok_or_else(|| ScrapeError::page("transaction table has no rows"))?;
        tracing::debug!(parent: portal.span(), "got {} transactions", body.len());

        check_header(&portal.child_texts(head, ".//th").await?)?;

        for (i, row) in body.iter().enumerate() {
            let cells = portal.child_texts(row, "./td").await?;
            match parse_row(account_id, &cells)? {
                Some(record) => {
                    ledger.merge(record).await?;
                    tracing::debug!(parent: portal.span(), "merged transaction {}", i + 1);
                }
                None => tracing::debug!(parent: portal.span(), "skipped TEMP transaction at row {}", i + 1),
            }
        }
        Ok(())
    }

    /// The username box sometimes renders hidden until the page is reloaded.
    async fn username_input(&self) -> Result<B::Element> {
        let browser = &self.portal.browser;
        let mut input = browser.find("//input[@id='usernameInput']").await?;
        for _ in 0..5 {
            if browser.is_displayed(&input).await? {
                break;
            }
            browser.refresh().await?;
            input = browser.find("//input[@id='usernameInput']").await?;
        }
        Ok(input)
    }
}

impl<B: Browser> SiteDriver for Mbna<B> {
    fn institution(&self) -> &'static str {
        INSTITUTION
    }

    fn logged_in(&self) -> bool {
        self.portal.logged_in
    }

    async fn authenticate(&mut self, logon: &str, password: &str) -> Result<()> {
        let portal = &self.portal;
        portal.open().await?;
        portal.pause(4, 7).await;

        let input = self.username_input().await?;
        portal.browser.send_keys(&input, logon).await?;
        portal.pause(1, 2).await;
        let input = portal.browser.find("//input[@id='passwordInput']").await?;
        portal.browser.send_keys(&input, password).await?;
        portal.pause(1, 2).await;

        portal
            .click_xpath("//input[@id='login' and @value='Login' and @type='submit']")
            .await?;
        tracing::debug!(parent: portal.span(), "logging in");

        // Give the landing page its implicit wait before looking for errors.
        portal.browser.find_all(LOGGED_IN).await?;
        if let Some(e) = portal.browser.find_all("//div[@id='errorMessage']").await?.first() {
            let message = portal.browser.text(e).await?;
            return Err(ScrapeError::login(collapse_whitespace(&message)));
        }
        portal.landmark(LOGGED_IN).await?;

        tracing::debug!(parent: portal.span(), "logged in");
        self.portal.logged_in = true;
        Ok(())
    }

    async fn scrape<L: Ledger>(&mut self, ledger: &mut L) -> Result<()> {
        let portal = &self.portal;

        let mut link = None;
        for candidate in portal.browser.find_all("//a[@title='Link to Account Snapshot']").await? {
            if portal.browser.is_displayed(&candidate).await? {
                link = Some(candidate);
                break;
            }
        }
        let link = link.ok_or_else(|| ScrapeError::page("no visible account snapshot link"))?;

        let reference = parse_reference(&portal.browser.text(&link).await?)?;
        tracing::debug!(parent: portal.span(), %reference, "account");
        let account_id = ledger.resolve_account_id(INSTITUTION, &reference).await?;
        portal.browser.click(&link).await?;

        tracing::debug!(parent: portal.span(), "snapshot");
        portal.browser.find("//h3[@id='recentActivitySummary']").await?;
        self.scrape_table(ledger, account_id).await?;

        tracing::debug!(parent: portal.span(), "statements");
        portal.click_xpath("//li[@id='tab-statements']").await?;
        portal.browser.find("//h1[normalize-space(.)='Statements']").await?;
        portal
            .browser
            .find("//h3[normalize-space(.)='Statement activity']")
            .await?;
        let closing = portal
            .browser
            .find("//div[normalize-space(./strong)='Statement closing date:']")
            .await?;
        let closing = portal.browser.find_in(&closing, "./following-sibling::div").await?;
        let closing = portal.browser.text(&closing).await?;
        tracing::debug!(parent: portal.span(), %closing, "statement closing date");
        self.scrape_table(ledger, account_id).await
    }

    async fn deauthenticate(&mut self) -> Result<()> {
        tracing::debug!(parent: self.portal.span(), "logging out");
        self.portal.click_xpath("//a[text()='Logout']").await?;
        self.portal
            .browser
            .find("//p/strong[text()='You have successfully logged out!']")
            .await?;
        self.portal.logged_in = false;
        Ok(())
    }

    async fn release(self, mode: ReleaseMode) -> Result<()> {
        self.portal.release(mode).await
    }
}
