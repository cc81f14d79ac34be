//! Runs one driver from login to browser release.

use ledgerdb_core::{Ledger, Result, ScrapeError};
use tracing::Span;

use crate::browser::ReleaseMode;
use crate::driver::{DriverState, SiteDriver};

/// States a driver passed through, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleReport {
    pub states: Vec<DriverState>,
}

pub struct LifecycleController {
    keep: bool,
    span: Span,
}

impl LifecycleController {
    /// `keep` skips logout and leaves the browser window open.
    pub fn new(keep: bool, span: Span) -> Self {
        Self { keep, span }
    }

    /// Authenticate, scrape and log out, then release the browser.
    ///
    /// The browser is released exactly once whatever happens. Logout runs at
    /// most once and only after a successful login. The first failure is the
    /// one returned; cleanup failures that follow it are attached to it.
    pub async fn run<D, L>(&self, mut driver: D, ledger: &mut L, logon: &str, password: &str) -> Result<LifecycleReport>
    where
        D: SiteDriver,
        L: Ledger,
    {
        let institution = driver.institution();
        let mut states = vec![DriverState::Created];
        let mut cleanup = Vec::new();

        tracing::debug!(parent: &self.span, %institution, "authenticating");
        let mut outcome = driver.authenticate(logon, password).await;
        let authenticated = outcome.is_ok();
        if authenticated {
            states.push(DriverState::Authenticated);
            states.push(DriverState::Scraping);
            tracing::info!(parent: &self.span, %institution, "logged in, scraping");
            outcome = driver.scrape(ledger).await;
        }
        if let Err(e) = &outcome {
            tracing::error!(parent: &self.span, %institution, error = %e, "run failed");
        }

        if self.keep {
            tracing::info!(parent: &self.span, %institution, "keeping browser session; skipping logout");
        } else if authenticated && driver.logged_in() {
            match driver.deauthenticate().await {
                Ok(()) => states.push(DriverState::Deauthenticated),
                Err(e) => absorb(&mut outcome, &mut cleanup, e, &self.span, "logout failed"),
            }
        }

        let mode = if self.keep { ReleaseMode::Keep } else { ReleaseMode::Quit };
        match driver.release(mode).await {
            Ok(()) => states.push(DriverState::Closed),
            Err(e) => absorb(&mut outcome, &mut cleanup, e, &self.span, "browser release failed"),
        }
        tracing::debug!(parent: &self.span, ?states, "driver finished");

        match outcome {
            Ok(()) => Ok(LifecycleReport { states }),
            Err(cause) => Err(ScrapeError::with_cleanup(cause, cleanup)),
        }
    }
}

/// A teardown failure becomes the run's error only when nothing failed before it.
fn absorb(outcome: &mut Result<()>, cleanup: &mut Vec<ScrapeError>, e: ScrapeError, span: &Span, what: &str) {
    tracing::warn!(parent: span, error = %e, "{what}");
    if outcome.is_ok() {
        *outcome = Err(e);
    } else {
        cleanup.push(e);
    }
}
