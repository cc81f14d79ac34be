//! Per-institution site drivers.
//!
//! Each driver splits into pure row parsers (cell text in, `StatementRecord`
//! out) and a browser flow that finds the cells. Page layouts are whatever the
//! portal served last time anyone looked; the parsers are where the format
//! assumptions are checked.

mod account_details;
pub mod capitalone;
pub mod mbna;
pub mod pcfinancial;
pub mod rbc;
pub mod simplii;

use ledgerdb_core::{Result, ScrapeError};
use tracing::Span;

use crate::browser::{self, Browser, ReleaseMode};
use crate::driver::DriverContext;

/// Browser plus the bits of state every driver carries.
pub(crate) struct Portal<B: Browser> {
    pub(crate) browser: B,
    pub(crate) ctx: DriverContext,
    pub(crate) logged_in: bool,
}

impl<B: Browser> Portal<B> {
    pub(crate) fn new(browser: B, ctx: DriverContext) -> Self {
        Self {
            browser,
            ctx,
            logged_in: false,
        }
    }

    pub(crate) fn span(&self) -> &Span {
        &self.ctx.span
    }

    pub(crate) async fn open(&self) -> Result<()> {
        tracing::info!(parent: self.span(), url = %self.ctx.site_url, "connecting");
        self.browser.goto(&self.ctx.site_url).await
    }

    pub(crate) async fn pause(&self, min_secs: u64, max_secs: u64) {
        self.ctx.pacer.between(min_secs, max_secs).await;
    }

    /// Bring `element` to the middle of the viewport, then click it.
    pub(crate) async fn click(&self, element: &B::Element) -> Result<()> {
        self.browser.scroll_into_view(element).await?;
        self.browser.click(element).await
    }

    pub(crate) async fn click_xpath(&self, xpath: &str) -> Result<()> {
        let element = self.browser.find(xpath).await?;
        self.click(&element).await
    }

    /// Like `find`, but a missing element means the login did not go through.
    pub(crate) async fn landmark(&self, xpath: &str) -> Result<B::Element> {
        self.browser.find(xpath).await.map_err(|e| match e {
            ScrapeError::PageStructure(m) => ScrapeError::LoginFailure(m),
            other => other,
        })
    }

    pub(crate) async fn text_of(&self, xpath: &str) -> Result<String> {
        let element = self.browser.find(xpath).await?;
        self.browser.text(&element).await
    }

    /// Text of each child of `parent` matching `xpath`.
    pub(crate) async fn child_texts(&self, parent: &B::Element, xpath: &str) -> Result<Vec<String>> {
        let children = self.browser.find_all_in(parent, xpath).await?;
        browser::texts(&self.browser, &children).await
    }

    pub(crate) async fn release(self, mode: ReleaseMode) -> Result<()> {
        self.browser.release(mode).await
    }
}

/// `PageStructure` error unless `cond` holds.
pub(crate) fn ensure(cond: bool, message: impl FnOnce() -> String) -> Result<()> {
    if cond { Ok(()) } else { Err(ScrapeError::page(message())) }
}

/// Fail unless a table row has exactly `expected` cells.
pub(crate) fn ensure_cells(cells: &[String], expected: usize) -> Result<()> {
    ensure(cells.len() == expected, || {
        format!("expected {expected} cells, got {}: {cells:?}", cells.len())
    })
}
