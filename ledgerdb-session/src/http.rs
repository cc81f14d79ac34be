use ledgerdb_core::{Result, ScrapeError};
use reqwest::{Response, StatusCode, Url};

/// `base` with `segments` appended, each percent-encoded.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ScrapeError::Config(format!("server url {base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Pass a 200 response through; anything else becomes `ServerRequest`.
pub(crate) async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status == StatusCode::OK {
        tracing::debug!(%status, url = %resp.url(), "server request ok");
        return Ok(resp);
    }

    tracing::error!(%status, url = %resp.url(), "server request failed");
    let body = resp.text().await.ok().filter(|b| !b.is_empty());
    Err(ScrapeError::ServerRequest {
        status: status.as_u16(),
        body,
    })
}

/// Transport failure on an established session (connection reset, timeout...).
pub(crate) fn transport_error(e: reqwest::Error) -> ScrapeError {
    ScrapeError::ServerRequest {
        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
        body: Some(e.without_url().to_string()),
    }
}
