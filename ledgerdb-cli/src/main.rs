use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use ledgerdb_core::redact_userinfo;
use ledgerdb_ingest::{RunOptions, WebDriverClient, run_site};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod credentials;
mod kpscript;

use credentials::{CredentialSource, TomlCredentials, instance_info, instance_title, site_info};
use kpscript::KpScript;

/// Element lookups poll this long before a page counts as broken.
const IMPLICIT_WAIT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(
    name = "ledgerdb-scraper",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("LEDGERDB_BUILD_SHA"), ")"),
    about = "Scrape bank statements into a ledgerdb server"
)]
struct Cli {
    /// Credential entry title of the banking site to scrape
    #[arg(required_unless_present = "list")]
    site: Option<String>,

    /// ledgerdb instance (entry `ledgerdb-<INSTANCE>`, default `ledgerdb`)
    instance: Option<String>,

    /// KeePass database holding site and instance entries
    #[arg(long, default_value = "./ledgerdb-scraper.kdbx")]
    kdbx_file: PathBuf,

    /// KeePass database password, or `@file` to read it from a file
    #[arg(long, default_value = "@ledgerdb-scraper.pw")]
    kdbx_pw: String,

    /// Read entries from a TOML file instead of KeePass
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// WebDriver server URL
    #[arg(long, env = "LEDGERDB_WEBDRIVER", default_value = "http://localhost:4444")]
    webdriver: String,

    /// Leave the browser open and logged in when done
    #[arg(long)]
    keep: bool,

    /// List credential entries (passwords masked) and exit
    #[arg(short, long)]
    list: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = open_store(&cli)?;

    if cli.list {
        for line in store.list()? {
            println!("{line}");
        }
        return Ok(());
    }

    let site = cli.site.as_deref().context("SITE is required")?;
    let title = instance_title(cli.instance.as_deref());
    let site_entry = site_info(store.as_ref(), site)?;
    let instance = instance_info(store.as_ref(), &title).with_context(|| format!("instance entry {title:?}"))?;

    let options = RunOptions {
        keep: cli.keep,
        ..RunOptions::default()
    };
    let webdriver = cli.webdriver.clone();
    let counters = run_site(&site_entry, &instance, &options, || async move {
        WebDriverClient::connect(&webdriver, IMPLICIT_WAIT).await
    })
    .await
    .with_context(|| scrape_context(site, &instance.url))?;

    println!("{counters}");
    Ok(())
}

fn scrape_context(site: &str, url: &str) -> String {
    format!("scraping {site} into {}", redact_userinfo(url))
}

fn open_store(cli: &Cli) -> Result<Box<dyn CredentialSource>> {
    match &cli.credentials {
        Some(path) => Ok(Box::new(TomlCredentials::load(path)?)),
        None => Ok(Box::new(
            KpScript::open(&cli.kdbx_file, &cli.kdbx_pw)
                .with_context(|| format!("opening {}", cli.kdbx_file.display()))?,
        )),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "ledgerdb=info",
        1 => "ledgerdb=debug",
        _ => "ledgerdb=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
