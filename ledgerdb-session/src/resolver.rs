use ledgerdb_core::{AccountReference, Result, ScrapeError};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};

use crate::dto::InstitutionLinkDto;
use crate::http::{check_status, endpoint, transport_error};

/// Looks up ledger account ids for portal account references.
///
/// Every call is a fresh request; the server is expected to answer the same
/// reference with the same id for the whole run.
#[derive(Clone)]
pub struct AccountResolver {
    client: Client,
    base: Url,
    username: String,
    password: String,
}

impl AccountResolver {
    pub fn new(client: Client, base: Url, username: &str, password: &str) -> Self {
        Self {
            client,
            base,
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub async fn resolve(&self, account: &AccountReference) -> Result<i64> {
        let url = endpoint(
            &self.base,
            &["institution_link", &account.institution, &account.reference],
        )?;

        let resp = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;
        let resp = check_status(resp).await?;

        let body = resp.text().await.map_err(transport_error)?;
        let link: InstitutionLinkDto =
            serde_json::from_str(&body).map_err(|e| ScrapeError::ServerRequest {
                status: 200,
                body: Some(format!("unreadable institution link ({e}): {body}")),
            })?;

        tracing::debug!(
            institution = %account.institution,
            reference = %account.reference,
            account_id = link.account_id,
            "resolved account"
        );
        Ok(link.account_id)
    }
}

impl std::fmt::Debug for AccountResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountResolver")
            .field("base", &self.base.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
