//! ledgerdb-ingest: browser-driven site drivers, the driver lifecycle and the
//! run wiring that feeds scraped statements into a ledger session.

pub mod browser;
pub mod driver;
pub mod institutions;
pub mod lifecycle;
pub mod pacer;
pub mod registry;
pub mod runner;

#[cfg(test)]
mod testing;

pub use browser::{Browser, ReleaseMode, WebDriverClient};
pub use driver::{DriverContext, DriverState, SiteDriver};
pub use lifecycle::{LifecycleController, LifecycleReport};
pub use pacer::Pacer;
pub use registry::{Institution, SiteDriverKind};
pub use runner::{RunOptions, run_site};
