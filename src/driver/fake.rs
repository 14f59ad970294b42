//! Scripted page double for tests
//!
//! Responses are keyed by script constant. A queued response is consumed per
//! evaluation; the last one stays sticky. Unknown scripts evaluate to null.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::traits::{DriverLauncher, PageDriver};

#[derive(Default)]
struct Inner {
    responses: HashMap<String, VecDeque<Value>>,
    click_effects: HashMap<String, Vec<(String, Value)>>,
    evaluations: Vec<(String, Value)>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    keys: Vec<(String, String)>,
    typed: Vec<(String, String)>,
    navigations: Vec<String>,
    failing_navigations: u32,
    failing_scripts: Vec<String>,
    url: String,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct FakePage {
    inner: Arc<Mutex<Inner>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `script` with `value`
    pub fn on_evaluate(&self, script: &str, value: Value) {
        self.on_evaluate_seq(script, vec![value]);
    }

    /// Answer `script` with each value in turn, repeating the last
    pub fn on_evaluate_seq(&self, script: &str, values: Vec<Value>) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .responses
            .insert(script.to_string(), values.into_iter().collect());
    }

    /// After a click on `selector`, answer `script` with `value`
    pub fn on_click(&self, selector: &str, script: &str, value: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .click_effects
            .entry(selector.to_string())
            .or_default()
            .push((script.to_string(), value));
    }

    /// Fail the next `count` navigations as if the browser had gone away
    pub fn fail_navigations(&self, count: u32) {
        self.inner.lock().unwrap().failing_navigations = count;
    }

    /// Make every evaluation of `script` fail with a page error
    pub fn fail_evaluate(&self, script: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_scripts
            .push(script.to_string());
    }

    pub fn set_url(&self, url: &str) {
        self.inner.lock().unwrap().url = url.to_string();
    }

    pub fn clicks(&self) -> Vec<String> {
        self.inner.lock().unwrap().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().fills.clone()
    }

    pub fn keys(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().keys.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().typed.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.inner.lock().unwrap().navigations.clone()
    }

    /// Arguments passed to every evaluation of `script`
    pub fn evaluations_of(&self, script: &str) -> Vec<Value> {
        self.inner
            .lock()
            .unwrap()
            .evaluations
            .iter()
            .filter(|(s, _)| s == script)
            .map(|(_, arg)| arg.clone())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }
}

#[async_trait]
impl PageDriver for FakePage {
    fn engine_name(&self) -> &str {
        "fake"
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_navigations > 0 {
            inner.failing_navigations -= 1;
            anyhow::bail!("Target page, context or browser has been closed");
        }
        inner.navigations.push(url.to_string());
        inner.url = url.to_string();
        Ok(())
    }

    async fn evaluate(&self, script: &str, arg: Value) -> Result<Value> {
        let mut inner = self.inner.lock().unwrap();
        inner.evaluations.push((script.to_string(), arg));
        if inner.failing_scripts.iter().any(|s| s == script) {
            anyhow::bail!("Evaluation failed: TypeError: Cannot read properties of undefined");
        }
        let value = match inner.responses.get_mut(script) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Value::Null),
            Some(queue) => queue.front().cloned().unwrap_or(Value::Null),
            None => Value::Null,
        };
        Ok(value)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.clicks.push(selector.to_string());
        if let Some(effects) = inner.click_effects.get(selector).cloned() {
            for (script, value) in effects {
                inner.responses.insert(script, VecDeque::from(vec![value]));
            }
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .fills
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: &str) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .keys
            .push((selector.to_string(), key.to_string()));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .typed
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.inner.lock().unwrap().url.clone())
    }

    async fn close(&self) -> Result<()> {
        self.inner.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Hands out clones of one shared page and counts launches
#[derive(Clone, Default)]
pub struct FakeLauncher {
    pub page: FakePage,
    launches: Arc<Mutex<u32>>,
}

impl FakeLauncher {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            launches: Arc::new(Mutex::new(0)),
        }
    }

    pub fn launches(&self) -> u32 {
        *self.launches.lock().unwrap()
    }
}

#[async_trait]
impl DriverLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>> {
        *self.launches.lock().unwrap() += 1;
        Ok(Box::new(self.page.clone()))
    }
}
