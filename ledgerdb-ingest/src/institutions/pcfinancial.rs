//! PC Financial deposit accounts.

use ledgerdb_core::{Ledger, Result};

use super::Portal;
use super::account_details::{self, HEADER};
use crate::browser::{Browser, KEY_ENTER, ReleaseMode};
use crate::driver::{DriverContext, SiteDriver};

pub const INSTITUTION: &str = "pcfinancial";

pub struct PcFinancial<B: Browser> {
    portal: Portal<B>,
}

impl<B: Browser> PcFinancial<B> {
    pub fn new(browser: B, ctx: DriverContext) -> Self {
        Self {
            portal: Portal::new(browser, ctx),
        }
    }

    /// The input right after the label containing `label`.
    async fn input_after(&self, label: &str) -> Result<B::Element> {
        let browser = &self.portal.browser;
        let label = browser.find(&format!("//label[contains(.,'{label}')]")).await?;
        browser.find_in(&label, "following::input").await
    }
}

impl<B: Browser> SiteDriver for PcFinancial<B> {
    fn institution(&self) -> &'static str {
        INSTITUTION
    }

    fn logged_in(&self) -> bool {
        self.portal.logged_in
    }

    async fn authenticate(&mut self, logon: &str, password: &str) -> Result<()> {
        let portal = &self.portal;
        portal.open().await?;
        portal.browser.find("//h1[text()='Online Banking Sign In']").await?;

        let card = self.input_after("Card Number:").await?;
        portal.browser.send_keys(&card, logon).await?;
        let secret = self.input_after("Password:").await?;
        portal.browser.send_keys(&secret, password).await?;
        portal.pause(2, 5).await;
        portal.browser.send_keys(&secret, KEY_ENTER).await?;
        tracing::debug!(parent: portal.span(), "logging in");

        account_details::check_signed_on(portal).await?;
        tracing::debug!(parent: portal.span(), "logged in");
        self.portal.logged_in = true;
        Ok(())
    }

    async fn scrape<L: Ledger>(&mut self, ledger: &mut L) -> Result<()> {
        account_details::scrape_summary_table(&self.portal, ledger, INSTITUTION, "DEPOSIT", &[HEADER]).await
    }

    async fn deauthenticate(&mut self) -> Result<()> {
        account_details::sign_off(&self.portal).await?;
        self.portal.logged_in = false;
        Ok(())
    }

    async fn release(self, mode: ReleaseMode) -> Result<()> {
        self.portal.release(mode).await
    }
}
