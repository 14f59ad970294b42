//! Web driver implementation using Playwright
//!
//! Runs Chromium with a persistent profile directory so an interactive
//! login survives across runs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use log::debug;
use playwright::api::{BrowserContext, Page, Viewport};
use playwright::Playwright;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::driver::traits::{DriverLauncher, PageDriver};
use crate::error::{looks_like_closed_target, FioriError};
use crate::utils::browser;
use crate::utils::config::Config;

/// Web driver configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub headless: bool,
    pub profile_dir: PathBuf,
    pub executable: Option<PathBuf>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub navigation_timeout_ms: u64,
}

impl WebDriverConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.headless,
            profile_dir: config.profile_dir.clone(),
            executable: config.browser_executable.clone(),
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            navigation_timeout_ms: config.timeouts.navigation_ms,
        }
    }
}

/// Chromium page driven through Playwright
pub struct WebDriver {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    config: WebDriverConfig,
}

/// Map driver failures that mean the target went away
fn session_error(err: impl std::fmt::Display, action: &str) -> anyhow::Error {
    let message = format!("{} failed: {}", action, err);
    if looks_like_closed_target(&message) {
        FioriError::SessionInvalid(message).into()
    } else {
        anyhow::anyhow!(message)
    }
}

impl WebDriver {
    pub async fn new(config: WebDriverConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;
        std::fs::create_dir_all(&config.profile_dir).with_context(|| {
            format!("Failed to create profile dir: {}", config.profile_dir.display())
        })?;

        let executable = browser::find_browser(config.executable.as_deref());
        if executable.is_none() {
            println!(
                "{} No browser executable found. Falling back to the Playwright bundle...",
                "ℹ".blue()
            );
            playwright
                .prepare()
                .context("Failed to install the Playwright browser bundle")?;
        }

        let args: Vec<String> = [
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--ignore-certificate-errors",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let chromium = playwright.chromium();
        let mut launcher = chromium
            .persistent_context_launcher(&config.profile_dir)
            .headless(config.headless)
            .ignore_https_errors(true)
            .viewport(Some(Viewport {
                width: config.viewport_width as i32,
                height: config.viewport_height as i32,
            }))
            .args(&args);
        if let Some(ref path) = executable {
            println!("{} Using browser: {}", "🌐".blue(), path.display());
            launcher = launcher.executable(path);
        }

        let context = launcher
            .launch()
            .await
            .context("Failed to launch Chromium with persistent profile")?;

        // A persistent context opens with one blank page
        let page = match context.pages().unwrap_or_default().into_iter().next() {
            Some(page) => page,
            None => context.new_page().await?,
        };

        debug!("Chromium ready, profile {}", config.profile_dir.display());

        Ok(Self {
            playwright: Arc::new(playwright),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            config,
        })
    }
}

#[async_trait]
impl PageDriver for WebDriver {
    fn engine_name(&self) -> &str {
        "chromium"
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .timeout(self.config.navigation_timeout_ms as f64)
            .goto()
            .await
            .map_err(|e| session_error(e, "Navigation"))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str, arg: Value) -> Result<Value> {
        let page = self.page.lock().await;
        page.evaluate::<Value, Value>(script, arg)
            .await
            .map_err(|e| session_error(e, "Page script"))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.click_builder(selector)
            .click()
            .await
            .map_err(|e| session_error(e, &format!("Click on '{}'", selector)))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.fill_builder(selector, value)
            .fill()
            .await
            .map_err(|e| session_error(e, &format!("Fill of '{}'", selector)))?;
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.press_builder(selector, key)
            .press()
            .await
            .map_err(|e| session_error(e, &format!("Key {} on '{}'", key, selector)))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.type_builer(selector, text)
            .r#type()
            .await
            .map_err(|e| session_error(e, &format!("Typing into '{}'", selector)))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let page = self.page.lock().await;
        page.url().map_err(|e| session_error(e, "Reading URL"))
    }

    async fn close(&self) -> Result<()> {
        self.context
            .close()
            .await
            .map_err(|e| session_error(e, "Closing browser"))?;
        Ok(())
    }
}

/// Launches a fresh [`WebDriver`] per session
pub struct WebLauncher {
    config: WebDriverConfig,
}

impl WebLauncher {
    pub fn new(config: WebDriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverLauncher for WebLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>> {
        println!("{} Launching Chromium...", "🚀".blue());
        let driver = WebDriver::new(self.config.clone()).await?;
        Ok(Box::new(driver))
    }
}
