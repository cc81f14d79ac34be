//! Institution name → site driver.

use ledgerdb_core::{Ledger, Result, ScrapeError};

use crate::browser::{Browser, ReleaseMode};
use crate::driver::{DriverContext, SiteDriver};
use crate::institutions::capitalone::{self, CapitalOne};
use crate::institutions::mbna::{self, Mbna};
use crate::institutions::pcfinancial::{self, PcFinancial};
use crate::institutions::rbc::{self, Rbc};
use crate::institutions::simplii::{self, Simplii};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Institution {
    CapitalOne,
    Mbna,
    PcFinancial,
    Rbc,
    Simplii,
}

pub const REGISTRY: &[(&str, Institution)] = &[
    (capitalone::INSTITUTION, Institution::CapitalOne),
    (mbna::INSTITUTION, Institution::Mbna),
    (pcfinancial::INSTITUTION, Institution::PcFinancial),
    (rbc::INSTITUTION, Institution::Rbc),
    (simplii::INSTITUTION, Institution::Simplii),
];

/// Find the driver registered for `name` (case-insensitive).
pub fn lookup(name: &str) -> Result<Institution> {
    REGISTRY
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name.trim()))
        .map(|(_, institution)| *institution)
        .ok_or_else(|| ScrapeError::UnknownInstitution(name.to_string()))
}

impl Institution {
    pub fn name(self) -> &'static str {
        match self {
            Institution::CapitalOne => capitalone::INSTITUTION,
            Institution::Mbna => mbna::INSTITUTION,
            Institution::PcFinancial => pcfinancial::INSTITUTION,
            Institution::Rbc => rbc::INSTITUTION,
            Institution::Simplii => simplii::INSTITUTION,
        }
    }

    pub fn build<B: Browser>(self, browser: B, ctx: DriverContext) -> SiteDriverKind<B> {
        match self {
            Institution::CapitalOne => SiteDriverKind::CapitalOne(CapitalOne::new(browser, ctx)),
            Institution::Mbna => SiteDriverKind::Mbna(Mbna::new(browser, ctx)),
            Institution::PcFinancial => SiteDriverKind::PcFinancial(PcFinancial::new(browser, ctx)),
            Institution::Rbc => SiteDriverKind::Rbc(Rbc::new(browser, ctx)),
            Institution::Simplii => SiteDriverKind::Simplii(Simplii::new(browser, ctx)),
        }
    }
}

/// Any registered driver.
pub enum SiteDriverKind<B: Browser> {
    CapitalOne(CapitalOne<B>),
    Mbna(Mbna<B>),
    PcFinancial(PcFinancial<B>),
    Rbc(Rbc<B>),
    Simplii(Simplii<B>),
}

macro_rules! dispatch {
    ($self:expr, $driver:ident => $body:expr) => {
        match $self {
            SiteDriverKind::CapitalOne($driver) => $body,
            SiteDriverKind::Mbna($driver) => $body,
            SiteDriverKind::PcFinancial($driver) => $body,
            SiteDriverKind::Rbc($driver) => $body,
            SiteDriverKind::Simplii($driver) => $body,
        }
    };
}

impl<B: Browser> SiteDriver for SiteDriverKind<B> {
    fn institution(&self) -> &'static str {
        dispatch!(self, d => d.institution())
    }

    fn logged_in(&self) -> bool {
        dispatch!(self, d => d.logged_in())
    }

    async fn authenticate(&mut self, logon: &str, password: &str) -> Result<()> {
        dispatch!(self, d => d.authenticate(logon, password).await)
    }

    async fn scrape<L: Ledger>(&mut self, ledger: &mut L) -> Result<()> {
        dispatch!(self, d => d.scrape(ledger).await)
    }

    async fn deauthenticate(&mut self) -> Result<()> {
        dispatch!(self, d => d.deauthenticate().await)
    }

    async fn release(self, mode: ReleaseMode) -> Result<()> {
        dispatch!(self, d => d.release(mode).await)
    }
}
