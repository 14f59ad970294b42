use anyhow::Result;
use colored::Colorize;
use log::{debug, warn};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use crate::driver::traits::{DriverLauncher, PageDriver};
use crate::error::{is_session_invalid, FioriError};
use crate::metadata::{store, Metadata};
use crate::ui5::readiness::{self, Predicate};
use crate::utils::config::{Config, Timeouts};

/// One browser session and everything the commands share across calls
///
/// Commands receive the session explicitly; there is no global page. The
/// page is driven by one caller at a time.
pub struct Session {
    pub config: Config,
    launcher: Arc<dyn DriverLauncher>,
    driver: Option<Box<dyn PageDriver>>,
    metadata: Option<Metadata>,
    last_url: Option<String>,
}

impl Session {
    pub fn new(config: Config, launcher: Arc<dyn DriverLauncher>) -> Self {
        Self {
            config,
            launcher,
            driver: None,
            metadata: None,
            last_url: None,
        }
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.config.timeouts
    }

    pub fn is_started(&self) -> bool {
        self.driver.is_some()
    }

    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    /// The live page, or [`FioriError::NoSession`]
    pub fn driver(&self) -> Result<&dyn PageDriver> {
        self.driver
            .as_deref()
            .ok_or_else(|| FioriError::NoSession.into())
    }

    /// Launch a browser if none is running
    pub async fn ensure_driver(&mut self) -> Result<&dyn PageDriver> {
        if self.driver.is_none() {
            let driver = self.launcher.launch().await?;
            debug!("Launched {} page", driver.engine_name());
            self.driver = Some(driver);
        }
        self.driver()
    }

    /// Navigate, recreating the browser once if it went away
    pub async fn navigate(&mut self, url: &str) -> Result<()> {
        let first = self.ensure_driver().await?.navigate(url).await;
        match first {
            Ok(()) => {}
            Err(e) if is_session_invalid(&e) => {
                warn!("Browser session lost ({:#}), relaunching once", e);
                println!("  {} Browser closed unexpectedly, restarting", "♻️".yellow());
                self.teardown().await;
                self.ensure_driver().await?.navigate(url).await?;
            }
            Err(e) => return Err(e),
        }
        self.last_url = Some(url.to_string());
        Ok(())
    }

    /// Navigate to `url` (or the configured URL) and wait for the app
    ///
    /// The filter bar wait is best effort since a start URL may point at an
    /// object page.
    pub async fn start(&mut self, url: Option<&str>) -> Result<String> {
        let url = url
            .map(str::to_string)
            .or_else(|| self.config.url.clone())
            .ok_or_else(|| anyhow::anyhow!("No URL given and none configured (FIORI_URL)"))?;

        println!("{} Opening {}", "🌐".blue(), url);
        self.navigate(&url).await?;

        let t = self.config.timeouts.clone();
        let driver = self.driver()?;
        readiness::wait_until(
            driver,
            Predicate::FrameworkReady,
            Value::Null,
            t.framework_ready_ms,
            t.poll_interval_ms,
        )
        .await?;
        readiness::wait_until(
            driver,
            Predicate::ViewElementRendered,
            Value::Null,
            t.element_ms,
            t.poll_interval_ms,
        )
        .await?;
        if let Err(e) = readiness::wait_until(
            driver,
            Predicate::FilterBarRendered,
            Value::Null,
            t.element_ms,
            t.poll_interval_ms,
        )
        .await
        {
            debug!("No filter bar after start: {:#}", e);
        }

        println!("{} Application ready", "✅".green());
        Ok(url)
    }

    /// Reconciled metadata, loaded from disk on first use
    pub fn metadata(&mut self) -> Result<Metadata> {
        if self.metadata.is_none() {
            self.metadata = Some(store::load(&self.config.metadata_path)?);
        }
        self.metadata
            .clone()
            .ok_or_else(|| anyhow::anyhow!("metadata unavailable"))
    }

    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = Some(metadata);
    }

    /// Close the page; a closed session can be started again
    pub async fn close(&mut self) -> Result<()> {
        if let Some(driver) = self.driver.take() {
            driver.close().await?;
            println!("{} Browser closed", "👋".blue());
        }
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.close().await {
                debug!("Ignoring close error during teardown: {:#}", e);
            }
        }
    }
}

/// Delete the persistent browser profile
///
/// Idempotent: returns whether anything was removed, never fails on a
/// missing directory.
pub fn dispose_profile(dir: &Path) -> Result<bool> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
