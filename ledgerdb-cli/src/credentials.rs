use anyhow::{Context, Result, anyhow};
use ledgerdb_core::{InstanceInfo, SiteInfo};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Where entry strings come from. Entries are addressed by title; fields use
/// KeePass names (`UserName`, `Password`, `URL`, `Notes`).
pub trait CredentialSource {
    fn entry(&self, title: &str, field: &str) -> Result<String>;

    /// Human-readable listing of every entry, passwords masked.
    fn list(&self) -> Result<Vec<String>>;
}

pub fn site_info(source: &dyn CredentialSource, site: &str) -> Result<SiteInfo> {
    let logon = source.entry(site, "UserName")?;
    let password = source.entry(site, "Password")?;
    let url = source.entry(site, "URL")?;
    let notes = source.entry(site, "Notes")?;
    SiteInfo::from_entry(logon, password, url, &notes).with_context(|| format!("site entry {site:?}"))
}

pub fn instance_info(source: &dyn CredentialSource, title: &str) -> Result<InstanceInfo> {
    Ok(InstanceInfo {
        url: source.entry(title, "URL")?,
        username: source.entry(title, "UserName")?,
        password: source.entry(title, "Password")?,
    })
}

/// `None` → `ledgerdb`, `test` → `ledgerdb-test`.
pub fn instance_title(instance: Option<&str>) -> String {
    match instance.map(str::trim).filter(|s| !s.is_empty()) {
        None => "ledgerdb".to_string(),
        Some(name) if name == "ledgerdb" || name.starts_with("ledgerdb-") => name.to_string(),
        Some(name) => format!("ledgerdb-{name}"),
    }
}

#[derive(Deserialize)]
struct TomlEntry {
    #[serde(rename = "UserName", default)]
    user_name: String,
    #[serde(rename = "Password", default)]
    password: String,
    #[serde(rename = "URL", default)]
    url: String,
    #[serde(rename = "Notes", default)]
    notes: String,
}

/// Plain TOML credentials file, one table per entry title:
///
/// ```toml
/// [rbc]
/// UserName = "4510..."
/// Password = "..."
/// URL = "https://www.rbcroyalbank.com/"
/// Notes = '{"institution": "rbc"}'
/// ```
pub struct TomlCredentials {
    entries: BTreeMap<String, TomlEntry>,
}

impl TomlCredentials {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parse {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        // toml's error text quotes the offending line, which may hold a secret.
        let entries = toml::from_str(text).map_err(|_| anyhow!("not a table of credential entries"))?;
        Ok(Self { entries })
    }
}

impl CredentialSource for TomlCredentials {
    fn entry(&self, title: &str, field: &str) -> Result<String> {
        let entry = self
            .entries
            .get(title)
            .ok_or_else(|| anyhow!("no credential entry titled {title:?}"))?;
        let value = match field {
            "UserName" => &entry.user_name,
            "Password" => &entry.password,
            "URL" => &entry.url,
            "Notes" => &entry.notes,
            other => return Err(anyhow!("unknown entry field {other:?}")),
        };
        Ok(value.clone())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for (title, entry) in &self.entries {
            out.push(format!("S: Title = {title}"));
            out.push(format!("S: UserName = {}", entry.user_name));
            out.push("S: Password = ********".to_string());
            out.push(format!("S: URL = {}", entry.url));
            out.push(format!("S: Notes = {}", entry.notes));
            out.push(String::new());
        }
        Ok(out)
    }
}
