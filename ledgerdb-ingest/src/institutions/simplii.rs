//! Simplii Financial. Same portal family as PC Financial, with more product
//! tables on the summary page and a caption row above the transaction list.

use ledgerdb_core::{Ledger, Result, ScrapeError};

use super::Portal;
use super::account_details::{self, HEADER};
use crate::browser::{Browser, KEY_ENTER, ReleaseMode};
use crate::driver::{DriverContext, SiteDriver};

pub const INSTITUTION: &str = "simplii";

const SUMMARY_TABLES: [&str; 4] = ["DEPOSIT", "NON_REGISTERED_INVESTMENT", "REGISTERED_INVESTMENT", "CREDIT"];

pub struct Simplii<B: Browser> {
    portal: Portal<B>,
}

impl<B: Browser> Simplii<B> {
    pub fn new(browser: B, ctx: DriverContext) -> Self {
        Self {
            portal: Portal::new(browser, ctx),
        }
    }
}

impl<B: Browser> SiteDriver for Simplii<B> {
    fn institution(&self) -> &'static str {
        INSTITUTION
    }

    fn logged_in(&self) -> bool {
        self.portal.logged_in
    }

    async fn authenticate(&mut self, logon: &str, password: &str) -> Result<()> {
        let portal = &self.portal;
        portal.open().await?;

        let mut sign_on = None;
        for button in portal.browser.find_all("//button").await? {
            if portal.browser.text(&button).await? == "Sign on" {
                sign_on = Some(button);
                break;
            }
        }
        let sign_on = sign_on.ok_or_else(|| ScrapeError::page("no \"Sign on\" button"))?;
        portal.browser.click(&sign_on).await?;

        let card = portal.browser.find("//input[@id='card-number-']").await?;
        portal.browser.send_keys(&card, logon).await?;
        let secret = portal.browser.find("//input[@id='password-']").await?;
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
        for class_name in SUMMARY_TABLES {
            account_details::scrape_summary_table(
                &self.portal,
                ledger,
                INSTITUTION,
                class_name,
                &["Transaction List", HEADER],
            )
            .await?;
        }
        Ok(())
    }

    async fn deauthenticate(&mut self) -> Result<()> {
        self.portal.pause(10, 20).await;
        account_details::sign_off(&self.portal).await?;
        self.portal.logged_in = false;
        Ok(())
    }

    async fn release(self, mode: ReleaseMode) -> Result<()> {
        self.portal.release(mode).await
    }
}
