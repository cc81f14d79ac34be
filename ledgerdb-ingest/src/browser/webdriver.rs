//! Minimal W3C WebDriver client (geckodriver, chromedriver, Selenium server).

use std::time::Duration;

use ledgerdb_core::{Result, ScrapeError};
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Browser, ReleaseMode};

/// Key under which W3C WebDriver serializes element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Handle to an element in the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(String);

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

impl From<WireError> for ScrapeError {
    fn from(e: WireError) -> Self {
        ScrapeError::Browser(format!("{}: {}", e.error, e.message))
    }
}

pub struct WebDriverClient {
    http: Client,
    base: Url,
    session_id: String,
}

impl WebDriverClient {
    /// Start a browser session on the WebDriver server at `server_url`.
    ///
    /// `implicit_wait` is how long element lookups poll before giving up.
    pub async fn connect(server_url: &str, implicit_wait: Duration) -> Result<Self> {
        let base = Url::parse(server_url)
            .map_err(|e| ScrapeError::Config(format!("webdriver url {server_url:?}: {e}")))?;
        let http = Client::new();

        let value = send(
            &http,
            Method::POST,
            join(&base, &["session"])?,
            Some(json!({ "capabilities": { "alwaysMatch": {} } })),
        )
        .await
        .map_err(ScrapeError::from)?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ScrapeError::Browser(format!("no sessionId in {value}")))?
            .to_string();
        tracing::debug!(%session_id, "webdriver session started");

        let client = Self {
            http,
            base,
            session_id,
        };
        client
            .command(
                Method::POST,
                &["timeouts"],
                Some(json!({ "implicit": implicit_wait.as_millis() as u64 })),
            )
            .await?;
        Ok(client)
    }

    async fn command(&self, method: Method, path: &[&str], body: Option<Value>) -> Result<Value> {
        Ok(self.wire(method, path, body).await?)
    }

    async fn wire(
        &self,
        method: Method,
        path: &[&str],
        body: Option<Value>,
    ) -> std::result::Result<Value, WireError> {
        let mut segments = vec!["session", self.session_id.as_str()];
        segments.extend_from_slice(path);
        let url = join(&self.base, &segments).map_err(|e| WireError {
            error: "invalid url".into(),
            message: e.to_string(),
        })?;
        send(&self.http, method, url, body).await
    }

    async fn locate(&self, parent: Option<&ElementRef>, xpath: &str, many: bool) -> Result<Value> {
        let mut path = Vec::new();
        if let Some(p) = parent {
            path.extend(["element", p.0.as_str()]);
        }
        path.push(if many { "elements" } else { "element" });

        let body = json!({ "using": "xpath", "value": xpath });
        match self.wire(Method::POST, &path, Some(body)).await {
            Ok(v) => Ok(v),
            Err(e) if e.error == "no such element" => {
                Err(ScrapeError::page(format!("no element matches {xpath}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn element_command(
        &self,
        method: Method,
        element: &ElementRef,
        action: &[&str],
        body: Option<Value>,
    ) -> Result<Value> {
        let mut path = vec!["element", element.0.as_str()];
        path.extend_from_slice(action);
        self.command(method, &path, body).await
    }
}

impl Browser for WebDriverClient {
    type Element = ElementRef;

    async fn goto(&self, url: &str) -> Result<()> {
        tracing::debug!(%url, "navigate");
        self.command(Method::POST, &["url"], Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        let v = self.command(Method::GET, &["title"], None).await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn refresh(&self) -> Result<()> {
        self.command(Method::POST, &["refresh"], Some(json!({}))).await?;
        Ok(())
    }

    async fn find(&self, xpath: &str) -> Result<ElementRef> {
        element_ref(&self.locate(None, xpath, false).await?)
    }

    async fn find_all(&self, xpath: &str) -> Result<Vec<ElementRef>> {
        element_refs(&self.locate(None, xpath, true).await?)
    }

    async fn find_in(&self, parent: &ElementRef, xpath: &str) -> Result<ElementRef> {
        element_ref(&self.locate(Some(parent), xpath, false).await?)
    }

    async fn find_all_in(&self, parent: &ElementRef, xpath: &str) -> Result<Vec<ElementRef>> {
        element_refs(&self.locate(Some(parent), xpath, true).await?)
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        let v = self.element_command(Method::GET, element, &["text"], None).await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let v = self
            .element_command(Method::GET, element, &["attribute", name], None)
            .await?;
        Ok(v.as_str().map(str::to_string))
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        let v = self
            .element_command(Method::GET, element, &["displayed"], None)
            .await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.element_command(Method::POST, element, &["click"], Some(json!({})))
            .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.element_command(Method::POST, element, &["value"], Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()> {
        let script = "arguments[0].scrollIntoView({block: 'center'})";
        self.command(
            Method::POST,
            &["execute", "sync"],
            Some(json!({ "script": script, "args": [{ ELEMENT_KEY: element.0 }] })),
        )
        .await?;
        Ok(())
    }

    async fn release(self, mode: ReleaseMode) -> Result<()> {
        match mode {
            ReleaseMode::Quit => {
                self.command(Method::DELETE, &[], None).await?;
                tracing::debug!(session_id = %self.session_id, "webdriver session closed");
            }
            ReleaseMode::Keep => {
                tracing::info!(session_id = %self.session_id, "leaving browser window open");
            }
        }
        Ok(())
    }
}

fn join(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ScrapeError::Config(format!("webdriver url {base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Issue one WebDriver command and unwrap its `value`.
async fn send(
    http: &Client,
    method: Method,
    url: Url,
    body: Option<Value>,
) -> std::result::Result<Value, WireError> {
    let mut req = http.request(method, url);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req.send().await.map_err(|e| WireError {
        error: "transport".into(),
        message: e.to_string(),
    })?;

    let status = resp.status();
    let mut envelope: Value = resp.json().await.map_err(|e| WireError {
        error: "invalid response".into(),
        message: format!("{status}: {e}"),
    })?;
    let value = envelope.get_mut("value").map(Value::take).unwrap_or(Value::Null);

    if status.is_success() {
        Ok(value)
    } else {
        Err(serde_json::from_value(value).unwrap_or_else(|_| WireError {
            error: status.to_string(),
            message: String::new(),
        }))
    }
}

fn element_ref(v: &Value) -> Result<ElementRef> {
    v.get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementRef(id.to_string()))
        .ok_or_else(|| ScrapeError::Browser(format!("not an element reference: {v}")))
}

fn element_refs(v: &Value) -> Result<Vec<ElementRef>> {
    v.as_array()
        .ok_or_else(|| ScrapeError::Browser(format!("not an element list: {v}")))?
        .iter()
        .map(element_ref)
        .collect()
}
