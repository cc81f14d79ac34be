//! The capability contract every institution driver implements.

use ledgerdb_core::{Ledger, Result};
use tracing::Span;

use crate::browser::ReleaseMode;
use crate::pacer::Pacer;

/// What every driver is built with besides its browser.
#[derive(Debug, Clone)]
pub struct DriverContext {
    /// Portal landing page.
    pub site_url: String,
    pub pacer: Pacer,
    pub span: Span,
}

/// Where a driver is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Created,
    Authenticated,
    Scraping,
    Deauthenticated,
    Closed,
}

#[allow(async_fn_in_trait)]
pub trait SiteDriver {
    /// Registry key, e.g. `"rbc"`.
    fn institution(&self) -> &'static str;

    /// True only between a successful `authenticate` and `deauthenticate`.
    fn logged_in(&self) -> bool;

    /// Sign in. Fails with `LoginFailure` when the site reports an error or
    /// the post-login landmark never shows up.
    async fn authenticate(&mut self, logon: &str, password: &str) -> Result<()>;

    /// Walk every account on the portal and merge its rows into `ledger` in
    /// page order.
    async fn scrape<L: Ledger>(&mut self, ledger: &mut L) -> Result<()>;

    /// Sign out.
    async fn deauthenticate(&mut self) -> Result<()>;

    /// Give the browser back. Consumes the driver.
    async fn release(self, mode: ReleaseMode) -> Result<()>;
}
