//! RBC Royal Bank. Walks every bank account on the summary page and scrapes
//! its last 30 days.

use std::sync::LazyLock;

use ledgerdb_core::normalize::{Cents, Sign, capture, debit_or_credit, digits_only, parse_date};
use ledgerdb_core::{Ledger, Result, ScrapeError, StatementRecord};
use regex::Regex;

use super::{Portal, ensure, ensure_cells};
use crate::browser::{Browser, ReleaseMode};
use crate::driver::{DriverContext, SiteDriver};

pub const INSTITUTION: &str = "rbc";

// Chequing 12345-1234567
static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]+ ([-0-9]+)$").unwrap());
static FIELD_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+$").unwrap());

pub const HEADER: &str = "DATE DESCRIPTION WITHDRAWALS DEPOSIT BALANCE";
const SUMMARY_TITLE: &str = "Accounts Summary - RBC Online Banking";
const DETAILS_TITLE: &str = "Bank Account Details - RBC Online Banking";

/// `Chequing 12345-1234567` → `123451234567`.
pub fn parse_reference(text: &str) -> Result<String> {
    digits_only(capture(&REFERENCE_RE, text.trim(), "bank account")?)
}

/// One transaction row: date, description, withdrawals, deposit, balance.
///
/// Exactly one of withdrawals/deposit is filled. Withdrawals are rendered
/// negative already, deposits positive.
pub fn parse_row(account_id: i64, cells: &[String]) -> Result<StatementRecord> {
    ensure_cells(cells, 5)?;
    let date = parse_date(&cells[0], "%b %d, %Y")?;

    let amount = debit_or_credit(&cells[2], &cells[3], Cents::Required, Sign::Signed)?;

    Ok(StatementRecord::new(INSTITUTION, account_id, date, amount, &cells[1]))
}

pub struct Rbc<B: Browser> {
    portal: Portal<B>,
}

impl<B: Browser> Rbc<B> {
    pub fn new(browser: B, ctx: DriverContext) -> Self {
        Self {
            portal: Portal::new(browser, ctx),
        }
    }

    async fn click(&self, element: &B::Element) -> Result<()> {
        self.portal.pause(10, 20).await;
        self.portal.click(element).await
    }

    async fn check_title(&self, want: &str) -> Result<()> {
        let title = self.portal.browser.title().await?;
        ensure(title == want, || format!("page title {title:?}, expected {want:?}"))
    }

    async fn check_summary(&self) -> Result<()> {
        self.portal.browser.find("//h2[starts-with(text(),'Welcome, ')]").await?;
        self.check_title(SUMMARY_TITLE).await
    }

    /// The input a `<label for=...>` points at, with its expected type.
    async fn labelled_input(&self, label: &str, kind: &str) -> Result<B::Element> {
        let browser = &self.portal.browser;
        let label = browser.find(&format!("//label[starts-with(text(),'{label}')]")).await?;
        let id = browser.attribute(&label, "for").await?.unwrap_or_default();
        ensure(FIELD_ID_RE.is_match(&id), || format!("label points at {id:?}"))?;

        let input = browser.find(&format!("//input[@id='{id}']")).await?;
        let got = browser.attribute(&input, "type").await?;
        ensure(got.as_deref() == Some(kind), || format!("input {id} has type {got:?}, expected {kind}"))?;
        Ok(input)
    }

    /// Account links of the bank accounts table, re-read from the summary page.
    async fn account_links(&self) -> Result<Vec<B::Element>> {
        let browser = &self.portal.browser;
        let section = browser.find("//section[@id='bankAcc']").await?;
        let heading = browser.text(&browser.find_in(&section, "./div/h3").await?).await?;
        ensure(heading == "Bank Accounts", || format!("section heading {heading:?}"))?;

        let table = browser.find_in(&section, "./table").await?;
        let caption = browser.text(&browser.find_in(&table, "./caption").await?).await?;
        ensure(caption == "Bank Accounts Table", || format!("table caption {caption:?}"))?;

        let links = browser.find_all_in(&table, "./tbody/tr/th/form/a").await?;
        ensure(!links.is_empty(), || "no bank accounts listed".to_string())?;
        Ok(links)
    }

    async fn scrape_details<L: Ledger>(&self, ledger: &mut L, account_id: i64) -> Result<()> {
        let portal = &self.portal;
        let section = portal.browser.find("//section[@id='pdaTransactionsTable']").await?;
        self.check_title(DETAILS_TITLE).await?;
        let tables = portal.browser.find_all_in(&section, ".//table").await?;
        ensure(tables.len() == 1, || format!("{} transaction tables", tables.len()))?;

        let rows = portal.browser.find_all_in(&tables[0], ".//tr").await?;
        let (head, body) = rows
            .split_first()
            .ok_or_else(|| ScrapeError::page("transaction table has no rows"))?;
        let head = portal.browser.text(head).await?;
        ensure(head == HEADER, || format!("transaction table header {head:?}"))?;

        for (i, row) in body.iter().enumerate() {
            // Date is a <th>, the rest are <td>.
            let cells = portal.child_texts(row, "./child::*").await?;
            ledger.merge(parse_row(account_id, &cells)?).await?;
            tracing::debug!(parent: portal.span(), "merged transaction {}", i + 1);
        }
        Ok(())
    }
}

impl<B: Browser> SiteDriver for Rbc<B> {
    fn institution(&self) -> &'static str {
        INSTITUTION
    }

    fn logged_in(&self) -> bool {
        self.portal.logged_in
    }

    async fn authenticate(&mut self, logon: &str, password: &str) -> Result<()> {
        let portal = &self.portal;
        portal.open().await?;
        portal.browser.find("//h2[text()='Sign in to Online Banking']").await?;

        let input = self.labelled_input("Client Card or Username", "text").await?;
        portal.browser.send_keys(&input, logon).await?;
        let input = self.labelled_input("Password", "password").await?;
        portal.browser.send_keys(&input, password).await?;

        let submit = portal.browser.find("//button[text()='Sign In']").await?;
        let kind = portal.browser.attribute(&submit, "type").await?;
        ensure(kind.as_deref() == Some("submit"), || format!("sign in button has type {kind:?}"))?;
        portal.browser.click(&submit).await?;
        tracing::debug!(parent: portal.span(), "logging in");

        self.check_summary().await.map_err(|e| match e {
            ScrapeError::PageStructure(m) => ScrapeError::LoginFailure(m),
            other => other,
        })?;
        tracing::debug!(parent: portal.span(), "logged in");
        self.portal.logged_in = true;
        Ok(())
    }

    async fn scrape<L: Ledger>(&mut self, ledger: &mut L) -> Result<()> {
        let portal = &self.portal;
        for i in 0.. {
            let links = self.account_links().await?;
            let Some(link) = links.get(i) else {
                break;
            };

            let label = portal.browser.find_in(link, "parent::form/following-sibling::span").await?;
            let label = portal.browser.text(&label).await?;
            tracing::debug!(parent: portal.span(), account = %label, "processing account {}", i + 1);
            let reference = parse_reference(&label)?;
            let account_id = ledger.resolve_account_id(INSTITUTION, &reference).await?;

            self.click(link).await?;
            let last_30 = portal.browser.find("//a[@title='Display last 30 days']").await?;
            self.click(&last_30).await?;
            portal.pause(5, 10).await;
            self.scrape_details(ledger, account_id).await?;

            let summary = portal
                .browser
                .find("//a[normalize-space(text())='Accounts Summary']")
                .await?;
            self.click(&summary).await?;
            self.check_summary().await?;
        }
        Ok(())
    }

    async fn deauthenticate(&mut self) -> Result<()> {
        tracing::debug!(parent: self.portal.span(), "logging out");
        let button = self.portal.browser.find("//button/span[.='Sign Out']/..").await?;
        self.click(&button).await?;
        self.portal.browser.find("//h1[contains(., 'Signed Out')]").await?;
        self.portal.logged_in = false;
        Ok(())
    }

    async fn release(self, mode: ReleaseMode) -> Result<()> {
        self.portal.release(mode).await
    }
}
