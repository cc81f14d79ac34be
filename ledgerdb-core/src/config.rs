//! Typed run configuration assembled from a credential entry.

use serde::Deserialize;

use crate::error::{Result, ScrapeError};

/// Login details for one banking site.
#[derive(Clone, PartialEq, Eq)]
pub struct SiteInfo {
    pub logon: String,
    pub password: String,
    pub url: String,
    /// Registry key of the site driver, e.g. `"rbc"`.
    pub institution: String,
}

/// Extra settings kept in the Notes field of a site entry, as JSON.
#[derive(Debug, Deserialize)]
struct SiteNotes {
    institution: String,
    #[serde(default)]
    url: Option<String>,
}

impl SiteInfo {
    /// Build from the raw fields of a credential entry.
    ///
    /// `notes` must be a JSON object carrying at least `institution`; a `url`
    /// key there overrides the entry's URL field.
    pub fn from_entry(logon: String, password: String, url: String, notes: &str) -> Result<Self> {
        let notes: SiteNotes = serde_json::from_str(notes.trim()).map_err(|e| {
            ScrapeError::Config(format!("entry notes are not a JSON object with an institution ({e})"))
        })?;
        Ok(Self {
            logon,
            password,
            url: notes.url.unwrap_or(url),
            institution: notes.institution.trim().to_lowercase(),
        })
    }
}

impl std::fmt::Debug for SiteInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteInfo")
            .field("logon", &"******")
            .field("password", &"******")
            .field("url", &self.url)
            .field("institution", &self.institution)
            .finish()
    }
}

/// A ledger-server deployment and the basic-auth credentials for it.
#[derive(Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for InstanceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceInfo")
            .field("url", &redact_userinfo(&self.url))
            .field("username", &self.username)
            .field("password", &"******")
            .finish()
    }
}

/// `url` with any `user:password@` part of its authority removed, for logs and
/// error messages. Anything that does not look like a URL comes back as is.
pub fn redact_userinfo(url: &str) -> String {
    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, url),
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(end);
    let Some((_, host)) = authority.rsplit_once('@') else {
        return url.to_string();
    };
    match scheme {
        Some(scheme) => format!("{scheme}://{host}{tail}"),
        None => format!("{host}{tail}"),
    }
}
