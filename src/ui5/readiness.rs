//! Readiness waiter
//!
//! UI5 renders asynchronously, so every step that reads or drives the page
//! first polls one of these predicates. A timeout surfaces as
//! [`FioriError::Timeout`]; the waiter never retries on its own.

use anyhow::Result;
use log::debug;
use serde_json::{json, Value};

use super::scripts;
use crate::driver::common::{poll_for, poll_until, PollConfig};
use crate::driver::traits::PageDriver;
use crate::error::{is_session_invalid, FioriError};

/// Page conditions the waiter knows how to check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// The framework core reports itself initialised
    FrameworkReady,
    /// At least one view-scoped element is rendered
    ViewElementRendered,
    FilterBarRendered,
    /// The table has a row whose first line carries non-empty cell text
    RowsRendered,
    /// An explicit "no data" indicator is shown
    NoDataShown,
    ObjectPageShown,
}

impl Predicate {
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::FrameworkReady => "framework-ready",
            Predicate::ViewElementRendered => "view-element-rendered",
            Predicate::FilterBarRendered => "filter-bar-rendered",
            Predicate::RowsRendered => "rows-rendered",
            Predicate::NoDataShown => "no-data-shown",
            Predicate::ObjectPageShown => "object-page-shown",
        }
    }

    fn script(&self) -> &'static str {
        match self {
            Predicate::FrameworkReady => scripts::FRAMEWORK_READY,
            Predicate::ViewElementRendered => scripts::VIEW_ELEMENT_RENDERED,
            Predicate::FilterBarRendered => scripts::FILTER_BAR_RENDERED,
            Predicate::RowsRendered => scripts::ROWS_RENDERED,
            Predicate::NoDataShown => scripts::NO_DATA_SHOWN,
            Predicate::ObjectPageShown => scripts::OBJECT_PAGE_PRESENT,
        }
    }
}

/// Terminal state of a row wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowsState {
    Rows,
    NoData,
}

/// Evaluate a predicate once
///
/// Script failures (page mid-navigation, framework not loaded yet) count as
/// "not yet"; a closed session propagates.
pub async fn check(driver: &dyn PageDriver, predicate: Predicate, arg: &Value) -> Result<bool> {
    match driver.evaluate(predicate.script(), arg.clone()).await {
        Ok(value) => Ok(value.as_bool().unwrap_or(false)),
        Err(e) if is_session_invalid(&e) => {
            Err(FioriError::SessionInvalid(format!("{:#}", e)).into())
        }
        Err(e) => {
            debug!("{} check failed: {:#}", predicate.name(), e);
            Ok(false)
        }
    }
}

/// Wait until `predicate` holds or fail with a timeout error
pub async fn wait_until(
    driver: &dyn PageDriver,
    predicate: Predicate,
    arg: Value,
    timeout_ms: u64,
    interval_ms: u64,
) -> Result<()> {
    let config = PollConfig::with_timeout(timeout_ms, interval_ms);
    let arg = &arg;
    let met = poll_until(move || check(driver, predicate, arg), &config).await?;
    if met {
        debug!("{} satisfied", predicate.name());
        Ok(())
    } else {
        Err(FioriError::timeout(predicate.name(), timeout_ms).into())
    }
}

/// Wait for rendered rows or an explicit "no data" state
///
/// Both are successful outcomes; only neither within the bound is a timeout.
pub async fn wait_for_rows(
    driver: &dyn PageDriver,
    list_id: Option<&str>,
    timeout_ms: u64,
    interval_ms: u64,
) -> Result<RowsState> {
    let arg = json!({ "listId": list_id });
    let arg = &arg;
    let config = PollConfig::with_timeout(timeout_ms, interval_ms);

    let state = poll_for(
        move || async move {
            if check(driver, Predicate::RowsRendered, arg).await? {
                return Ok::<Option<RowsState>, anyhow::Error>(Some(RowsState::Rows));
            }
            if check(driver, Predicate::NoDataShown, arg).await? {
                return Ok(Some(RowsState::NoData));
            }
            Ok(None)
        },
        &config,
    )
    .await?;

    state.ok_or_else(|| {
        FioriError::timeout(
            format!(
                "{} or {}",
                Predicate::RowsRendered.name(),
                Predicate::NoDataShown.name()
            ),
            timeout_ms,
        )
        .into()
    })
}
