//! The slice of browser automation site drivers rely on.
//!
//! Elements are located by XPath. `find*` fails with `PageStructure` when an
//! element is missing, so a driver's landmark checks read as plain `find`
//! calls; `find_all*` returns an empty list instead.

pub mod webdriver;

use ledgerdb_core::Result;

pub use webdriver::WebDriverClient;

/// How a driver lets go of its browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    /// Close the window and end the automation session.
    Quit,
    /// Leave the window open for inspection; only forget the handle.
    Keep,
}

#[allow(async_fn_in_trait)]
pub trait Browser {
    type Element: Clone + std::fmt::Debug;

    async fn goto(&self, url: &str) -> Result<()>;
    async fn title(&self) -> Result<String>;
    async fn refresh(&self) -> Result<()>;

    async fn find(&self, xpath: &str) -> Result<Self::Element>;
    async fn find_all(&self, xpath: &str) -> Result<Vec<Self::Element>>;
    async fn find_in(&self, parent: &Self::Element, xpath: &str) -> Result<Self::Element>;
    async fn find_all_in(&self, parent: &Self::Element, xpath: &str) -> Result<Vec<Self::Element>>;

    async fn text(&self, element: &Self::Element) -> Result<String>;
    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;
    async fn is_displayed(&self, element: &Self::Element) -> Result<bool>;
    async fn click(&self, element: &Self::Element) -> Result<()>;
    async fn send_keys(&self, element: &Self::Element, text: &str) -> Result<()>;
    async fn scroll_into_view(&self, element: &Self::Element) -> Result<()>;

    /// End the browser session. Called exactly once per browser.
    async fn release(self, mode: ReleaseMode) -> Result<()>;
}

/// WebDriver key code for Enter.
pub const KEY_ENTER: &str = "\u{E007}";

/// Text of every element, in order.
pub async fn texts<B: Browser>(browser: &B, elements: &[B::Element]) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(elements.len());
    for e in elements {
        out.push(browser.text(e).await?);
    }
    Ok(out)
}
