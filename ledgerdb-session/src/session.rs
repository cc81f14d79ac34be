//! One scraping run's channel to the ledger server.

use std::sync::LazyLock;
use std::time::Duration;

use ledgerdb_core::{
    AccountReference, Ledger, MergeOutcome, Result, RunCounters, ScrapeError, StatementRecord,
    redact_userinfo,
};
use regex::Regex;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use tracing::Span;

use crate::dto::StatementDto;
use crate::http::{check_status, endpoint, transport_error};
use crate::resolver::AccountResolver;
use crate::sequencer::SequenceTracker;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// Server responses for consecutive merges into one account, logged as a
/// single line when the account changes.
#[derive(Debug, Default)]
struct Progress {
    account_id: Option<i64>,
    responses: Vec<u64>,
}

pub struct MergeSession {
    client: Client,
    base: Url,
    username: String,
    password: String,
    resolver: AccountResolver,
    tracker: SequenceTracker,
    counters: RunCounters,
    progress: Progress,
    span: Span,
}

impl MergeSession {
    /// Connect with [`DEFAULT_TIMEOUT`].
    pub async fn open(server_url: &str, username: &str, password: &str, span: Span) -> Result<Self> {
        Self::open_with_timeout(server_url, username, password, DEFAULT_TIMEOUT, span).await
    }

    /// Build the channel and send the server one authenticated `GET`.
    ///
    /// That response's status code is ignored; failing to get any response at
    /// all is a `Connectivity` error, so a run never starts a browser against a
    /// server it cannot reach. Errors carry the URL without its userinfo.
    pub async fn open_with_timeout(
        server_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
        span: Span,
    ) -> Result<Self> {
        let connectivity = |message: String| ScrapeError::Connectivity {
            url: redact_userinfo(server_url),
            message,
        };

        let base = Url::parse(server_url).map_err(|e| connectivity(format!("invalid url: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| connectivity(e.to_string()))?;

        let reachable = client
            .get(base.clone())
            .basic_auth(username, Some(password))
            .send()
            .await
            .map_err(|e| connectivity(e.without_url().to_string()))?;
        tracing::debug!(parent: &span, status = %reachable.status(), "ledger server reachable");

        Ok(Self {
            resolver: AccountResolver::new(client.clone(), base.clone(), username, password),
            client,
            base,
            username: username.to_string(),
            password: password.to_string(),
            tracker: SequenceTracker::new(),
            counters: RunCounters::default(),
            progress: Progress::default(),
            span,
        })
    }

    pub async fn resolve_account_id(&mut self, institution: &str, reference: &str) -> Result<i64> {
        let account = AccountReference::new(institution, reference);
        match self.resolver.resolve(&account).await {
            Ok(id) => Ok(id),
            Err(e) => {
                tracing::error!(parent: &self.span, %institution, error = %e, "account resolution failed");
                Err(e)
            }
        }
    }

    /// Sequence `record` against this run's earlier merges and submit it.
    ///
    /// Records must arrive in page order. The record only counts towards later
    /// sequences once the server has accepted it.
    pub async fn merge(&mut self, mut record: StatementRecord) -> Result<MergeOutcome> {
        let sequence = self.tracker.next_sequence(&record);
        record.assign_sequence(sequence);

        let url = endpoint(&self.base, &["statement"])?;
        let resp = self
            .client
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "text/plain")
            .json(&StatementDto::from(&record))
            .send()
            .await
            .map_err(transport_error)?;
        let resp = check_status(resp).await?;

        let body = resp.text().await.map_err(transport_error)?;
        let duplicates = parse_duplicate_count(&body)?;
        tracing::debug!(
            parent: &self.span,
            account_id = record.account_id,
            date = %record.date,
            sequence,
            duplicates,
            "merged statement"
        );

        let outcome = MergeOutcome { sequence, duplicates };
        self.tracker.commit(&record);
        self.counters.processed += 1;
        if outcome.is_new() {
            self.counters.inserted += 1;
        }
        self.note_progress(record.account_id, duplicates);

        Ok(outcome)
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// Report the run's counters and discard the session.
    pub fn close(mut self) -> RunCounters {
        self.flush_progress();
        tracing::info!(
            parent: &self.span,
            processed = self.counters.processed,
            inserted = self.counters.inserted,
            "{}",
            self.counters
        );
        self.counters
    }

    fn note_progress(&mut self, account_id: i64, duplicates: u64) {
        if self.progress.account_id != Some(account_id) {
            self.flush_progress();
            self.progress.account_id = Some(account_id);
        }
        self.progress.responses.push(duplicates);
    }

    fn flush_progress(&mut self) {
        if let Some(account_id) = self.progress.account_id.take() {
            let responses: Vec<String> = self
                .progress
                .responses
                .drain(..)
                .map(|d| d.to_string())
                .collect();
            tracing::info!(parent: &self.span, account_id, "{account_id} {}", responses.join(" "));
        }
    }
}

impl Ledger for MergeSession {
    async fn resolve_account_id(&mut self, institution: &str, reference: &str) -> Result<i64> {
        MergeSession::resolve_account_id(self, institution, reference).await
    }

    async fn merge(&mut self, record: StatementRecord) -> Result<MergeOutcome> {
        MergeSession::merge(self, record).await
    }
}

impl std::fmt::Debug for MergeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeSession")
            .field("base", &redact_userinfo(self.base.as_str()))
            .field("username", &self.username)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

/// The merge endpoint answers with the number of identical records it already
/// held, as a bare integer.
/// Anything around the digits, whitespace included, is a protocol error.
fn parse_duplicate_count(body: &str) -> Result<u64> {
    if !COUNT_RE.is_match(body) {
        return Err(ScrapeError::ServerRequest {
            status: 200,
            body: Some(format!("expected a duplicate count, got {body:?}")),
        });
    }
    body.parse().map_err(|_| ScrapeError::ServerRequest {
        status: 200,
        body: Some(format!("duplicate count out of range: {body}")),
    })
}
