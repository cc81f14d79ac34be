//! In-memory browser and ledger used by driver and lifecycle tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ledgerdb_core::{Ledger, MergeOutcome, Result, ScrapeError, StatementRecord};

use crate::browser::{Browser, ReleaseMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeElement(usize);

#[derive(Debug, Default)]
struct Node {
    text: String,
    attributes: HashMap<String, String>,
    hidden: bool,
}

/// A page where every XPath a driver asks for has been registered up front.
/// Lookups are keyed by (parent, xpath) and never depend on navigation.
#[derive(Debug, Default)]
struct FakeDom {
    nodes: Vec<Node>,
    children: HashMap<(Option<usize>, String), Vec<usize>>,
    title: String,
    actions: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeBrowser {
    dom: Arc<Mutex<FakeDom>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&self, title: &str) {
        self.dom.lock().unwrap().title = title.to_string();
    }

    pub fn add(&self, xpath: &str, text: &str) -> FakeElement {
        self.insert(None, xpath, text)
    }

    pub fn add_in(&self, parent: FakeElement, xpath: &str, text: &str) -> FakeElement {
        self.insert(Some(parent.0), xpath, text)
    }

    /// A row under `parent` with one child per cell. Returns the cells.
    pub fn add_row(&self, parent: FakeElement, row_xpath: &str, cell_xpath: &str, cells: &[&str]) -> Vec<FakeElement> {
        let row = self.add_in(parent, row_xpath, &cells.join(" "));
        cells.iter().map(|cell| self.add_in(row, cell_xpath, cell)).collect()
    }

    pub fn set_attribute(&self, element: FakeElement, name: &str, value: &str) {
        let mut dom = self.dom.lock().unwrap();
        dom.nodes[element.0]
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    pub fn hide(&self, element: FakeElement) {
        self.dom.lock().unwrap().nodes[element.0].hidden = true;
    }

    /// Navigation, clicks, keystrokes and release, in order.
    pub fn actions(&self) -> Vec<String> {
        self.dom.lock().unwrap().actions.clone()
    }

    fn insert(&self, parent: Option<usize>, xpath: &str, text: &str) -> FakeElement {
        let mut dom = self.dom.lock().unwrap();
        dom.nodes.push(Node {
            text: text.to_string(),
            ..Node::default()
        });
        let id = dom.nodes.len() - 1;
        dom.children
            .entry((parent, xpath.to_string()))
            .or_default()
            .push(id);
        FakeElement(id)
    }

    fn lookup(&self, parent: Option<usize>, xpath: &str) -> Vec<FakeElement> {
        let dom = self.dom.lock().unwrap();
        dom.children
            .get(&(parent, xpath.to_string()))
            .map(|ids| ids.iter().copied().map(FakeElement).collect())
            .unwrap_or_default()
    }

    fn first(&self, parent: Option<usize>, xpath: &str) -> Result<FakeElement> {
        self.lookup(parent, xpath)
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::page(format!("no element matches {xpath}")))
    }

    fn record(&self, action: String) {
        self.dom.lock().unwrap().actions.push(action);
    }

    fn node_text(&self, element: &FakeElement) -> String {
        self.dom.lock().unwrap().nodes[element.0].text.clone()
    }
}

impl Browser for FakeBrowser {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> Result<()> {
        self.record(format!("goto {url}"));
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.dom.lock().unwrap().title.clone())
    }

    async fn refresh(&self) -> Result<()> {
        self.record("refresh".to_string());
        Ok(())
    }

    async fn find(&self, xpath: &str) -> Result<FakeElement> {
        self.first(None, xpath)
    }

    async fn find_all(&self, xpath: &str) -> Result<Vec<FakeElement>> {
        Ok(self.lookup(None, xpath))
    }

    async fn find_in(&self, parent: &FakeElement, xpath: &str) -> Result<FakeElement> {
        self.first(Some(parent.0), xpath)
    }

    async fn find_all_in(&self, parent: &FakeElement, xpath: &str) -> Result<Vec<FakeElement>> {
        Ok(self.lookup(Some(parent.0), xpath))
    }

    async fn text(&self, element: &FakeElement) -> Result<String> {
        Ok(self.node_text(element))
    }

    async fn attribute(&self, element: &FakeElement, name: &str) -> Result<Option<String>> {
        let dom = self.dom.lock().unwrap();
        Ok(dom.nodes[element.0].attributes.get(name).cloned())
    }

    async fn is_displayed(&self, element: &FakeElement) -> Result<bool> {
        Ok(!self.dom.lock().unwrap().nodes[element.0].hidden)
    }

    async fn click(&self, element: &FakeElement) -> Result<()> {
        let text = self.node_text(element);
        self.record(format!("click {text}"));
        Ok(())
    }

    async fn send_keys(&self, _element: &FakeElement, text: &str) -> Result<()> {
        self.record(format!("keys {text}"));
        Ok(())
    }

    async fn scroll_into_view(&self, _element: &FakeElement) -> Result<()> {
        Ok(())
    }

    async fn release(self, mode: ReleaseMode) -> Result<()> {
        self.record(format!("release {mode:?}"));
        Ok(())
    }
}

/// Ledger sink that keeps everything it is given.
#[derive(Debug, Default)]
pub struct RecordingLedger {
    links: HashMap<(String, String), i64>,
    pub resolved: Vec<(String, String)>,
    pub records: Vec<StatementRecord>,
}

impl RecordingLedger {
    pub fn with_link(mut self, institution: &str, reference: &str, account_id: i64) -> Self {
        self.links
            .insert((institution.to_string(), reference.to_string()), account_id);
        self
    }
}

impl Ledger for RecordingLedger {
    async fn resolve_account_id(&mut self, institution: &str, reference: &str) -> Result<i64> {
        let key = (institution.to_string(), reference.to_string());
        self.resolved.push(key.clone());
        self.links
            .get(&key)
            .copied()
            .ok_or_else(|| ScrapeError::ServerRequest {
                status: 404,
                body: Some("institution link not found".to_string()),
            })
    }

    async fn merge(&mut self, record: StatementRecord) -> Result<MergeOutcome> {
        self.records.push(record);
        Ok(MergeOutcome {
            sequence: 1,
            duplicates: 0,
        })
    }
}

/// Login form, landing page, one account and one activity table that both
/// the snapshot and the statement view resolve to.
pub fn mbna_portal(browser: &FakeBrowser) {
    browser.add("//input[@id='usernameInput']", "");
    browser.add("//input[@id='passwordInput']", "");
    browser.add("//input[@id='login' and @value='Login' and @type='submit']", "Login");
    browser.add("//h1[normalize-space(.)='My Accounts']", "My Accounts");

    let hidden = browser.add("//a[@title='Link to Account Snapshot']", "MBNA ending in 9999");
    browser.hide(hidden);
    browser.add("//a[@title='Link to Account Snapshot']", "MBNA Rewards ending in 4321");
    browser.add("//h3[@id='recentActivitySummary']", "Recent activity");
    browser.add("//li[@id='tab-statements']", "Statements");
    browser.add("//h1[normalize-space(.)='Statements']", "Statements");
    browser.add("//h3[normalize-space(.)='Statement activity']", "Statement activity");
    let closing = browser.add(
        "//div[normalize-space(./strong)='Statement closing date:']",
        "Statement closing date:",
    );
    browser.add_in(closing, "./following-sibling::div", "03/15/2024");

    let table = browser.add("//table[@id='transactionTable']", "");
    browser.add_row(
        table,
        ".//tr",
        ".//th",
        &["Transaction\ndate", "Posting\ndate", "Description", "Reference\nnumber", "Amount"],
    );
    browser.add_row(table, ".//tr", "./td", &["03/01/2024", "03/02/2024", "COFFEE  SHOP", "123", "$4.50"]);
    browser.add_row(table, ".//tr", "./td", &["03/03/2024", "", "PENDING", "TEMP", "$9.00"]);
    browser.add_row(table, ".//tr", "./td", &["03/05/2024", "03/05/2024", "PAYMENT", "456", "-$100"]);

    browser.add("//a[text()='Logout']", "Logout");
    browser.add("//p/strong[text()='You have successfully logged out!']", "bye");
}
