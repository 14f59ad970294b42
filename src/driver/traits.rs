use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Browser page capability
///
/// This trait is the only seam between the automation logic and the browser
/// engine. Everything the crate knows about the application is expressed as
/// CSS selectors and in-page scripts passed through these operations, so a
/// scripted double can stand in for a real browser in tests.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Short engine name for logs (e.g. "chromium")
    fn engine_name(&self) -> &str;

    /// Navigate the page to an absolute URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Evaluate a function expression in the page
    ///
    /// # Arguments
    /// * `script` - A JavaScript function expression, e.g. `(arg) => ...`
    /// * `arg` - JSON argument passed to the function
    ///
    /// # Returns
    /// The JSON-serialisable return value of the function
    async fn evaluate(&self, script: &str, arg: Value) -> Result<Value>;

    /// Click the first element matching a CSS selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Clear an input and set its value
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Press a key (or chord such as `Control+A`) on the element
    async fn press_key(&self, selector: &str, key: &str) -> Result<()>;

    /// Type text key by key into the element
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    /// Current location of the page
    async fn current_url(&self) -> Result<String>;

    /// Close the page and release the browser
    async fn close(&self) -> Result<()>;
}

/// Creates fresh page drivers, used when a session must be recreated
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageDriver>>;
}
