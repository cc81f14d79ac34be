//! One scraping run, end to end.

use std::future::Future;
use std::time::Duration;

use ledgerdb_core::{InstanceInfo, Result, RunCounters, SiteInfo};
use ledgerdb_session::{DEFAULT_TIMEOUT, MergeSession};

use crate::browser::Browser;
use crate::driver::DriverContext;
use crate::lifecycle::LifecycleController;
use crate::pacer::Pacer;
use crate::registry;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Leave the browser open and logged in when done.
    pub keep: bool,
    /// Ledger server request timeout.
    pub timeout: Duration,
    pub pacer: Pacer,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            keep: false,
            timeout: DEFAULT_TIMEOUT,
            pacer: Pacer::new(),
        }
    }
}

/// Scrape `site` into the ledger server described by `instance`.
///
/// The institution is checked against the registry and the ledger server's
/// reachability is confirmed before `connect_browser` is called, so a bad name or an unreachable
/// server never opens a browser. Counters are logged whether or not the run
/// succeeds.
pub async fn run_site<B, F, Fut>(
    site: &SiteInfo,
    instance: &InstanceInfo,
    options: &RunOptions,
    connect_browser: F,
) -> Result<RunCounters>
where
    B: Browser,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<B>>,
{
    let institution = registry::lookup(&site.institution)?;
    let span = tracing::info_span!("scrape", institution = institution.name());

    let mut session = MergeSession::open_with_timeout(
        &instance.url,
        &instance.username,
        &instance.password,
        options.timeout,
        span.clone(),
    )
    .await?;

    let browser = match connect_browser().await {
        Ok(browser) => browser,
        Err(e) => {
            session.close();
            return Err(e);
        }
    };

    let ctx = DriverContext {
        site_url: site.url.clone(),
        pacer: options.pacer,
        span: span.clone(),
    };
    let driver = institution.build(browser, ctx);
    let outcome = LifecycleController::new(options.keep, span)
        .run(driver, &mut session, &site.logon, &site.password)
        .await;

    let counters = session.close();
    outcome.map(|_| counters)
}
