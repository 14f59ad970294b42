//! Interaction executor
//!
//! The only code that changes page state. Every operation takes the page,
//! a resolved target and the wait bounds; state-changing operations end in
//! a scenario classification.

use anyhow::Result;
use colored::Colorize;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::scenario::{self, ActionResult, FormField};
use crate::driver::common::{poll_for, poll_until, PollConfig};
use crate::driver::traits::PageDriver;
use crate::error::FioriError;
use crate::metadata::types::{FilterDescriptor, FilterTarget};
use crate::ui5::readiness::{self, Predicate, RowsState};
use crate::ui5::{ids, scripts};
use crate::utils::config::Timeouts;

/// Attribute the row scripts tag the targeted row with
const MARKED_ROW: &str = "[data-fiori-pilot-row]";

/// Press a control, preferring the framework press event over a DOM click
pub async fn press(driver: &dyn PageDriver, id: &str, selector: &str) -> Result<()> {
    let fired = driver
        .evaluate(scripts::FIRE_PRESS, json!({ "id": id }))
        .await?
        .as_bool()
        .unwrap_or(false);
    if fired {
        debug!("Fired press on {}", id);
        Ok(())
    } else {
        debug!("Clicking {}", selector);
        driver.click(selector).await
    }
}

/// Press the filter bar's Go button and wait for rows or "no data"
pub async fn press_go(driver: &dyn PageDriver, list_id: Option<&str>, t: &Timeouts) -> Result<RowsState> {
    let config = PollConfig::with_timeout(t.element_ms, t.poll_interval_ms);
    let go = poll_for(
        || async {
            let value = driver.evaluate(scripts::FIND_GO_BUTTON, Value::Null).await?;
            Ok::<Option<String>, anyhow::Error>(value.as_str().map(str::to_string))
        },
        &config,
    )
    .await?
    .ok_or_else(|| FioriError::not_found("button", "Go", Vec::new()))?;

    println!("  {} Pressing {}", "🔎".cyan(), ids::local_id(&go));
    press(driver, &go, &ids::css_id(&go)).await?;

    readiness::wait_for_rows(driver, list_id, t.rows_ms, t.poll_interval_ms).await
}

// ============================================================================
// Filters and fields
// ============================================================================

/// Set a filter value through the control kind the descriptor points at
pub async fn set_filter(
    driver: &dyn PageDriver,
    filter: &FilterDescriptor,
    value: &str,
    t: &Timeouts,
) -> Result<()> {
    let target = filter.target().ok_or_else(|| {
        FioriError::Script(format!("filter {} has no selector", filter.property_key))
    })?;
    info!("Setting filter {} = {}", filter.property_key, value);

    match target {
        FilterTarget::Input(css) | FilterTarget::Date(css) => {
            driver.fill(css, value).await?;
            dispatch_change(driver, css).await?;
        }
        FilterTarget::Select(css) => {
            driver.click(css).await?;
            choose_popup_item(driver, value, t).await?;
        }
        FilterTarget::Field(css) => {
            let input = format!("{} input", css);
            driver.click(css).await?;
            driver.type_text(&input, value).await?;
            driver.press_key(&input, "Enter").await?;
            dispatch_change(driver, &input).await?;
        }
    }
    Ok(())
}

async fn dispatch_change(driver: &dyn PageDriver, selector: &str) -> Result<()> {
    driver
        .evaluate(scripts::DISPATCH_CHANGE, json!({ "selector": selector }))
        .await?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PopupPick {
    clicked: bool,
    options: Vec<String>,
}

async fn pick_popup_item(driver: &dyn PageDriver, value: &str) -> Result<PopupPick> {
    let raw = driver
        .evaluate(scripts::CLICK_POPUP_ITEM, json!({ "value": value }))
        .await?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}

/// Click the first open list item containing `value`
async fn choose_popup_item(driver: &dyn PageDriver, value: &str, t: &Timeouts) -> Result<()> {
    let bound = t.element_ms.min(t.action_settle_ms.max(1000));
    let config = PollConfig::with_timeout(bound, t.poll_interval_ms);

    let picked = poll_until(
        || async { Ok::<bool, anyhow::Error>(pick_popup_item(driver, value).await?.clicked) },
        &config,
    )
    .await?;
    if picked {
        return Ok(());
    }

    // One last look, so the error can list what the popup offered
    let last = pick_popup_item(driver, value).await?;
    if last.clicked {
        Ok(())
    } else {
        Err(FioriError::not_found("option", value, last.options).into())
    }
}

/// Focus, select all, type and notify
pub async fn fill_field(driver: &dyn PageDriver, field: &FormField, value: &str) -> Result<()> {
    info!("Filling {} = {}", field.display_name(), value);
    driver.click(&field.selector).await?;
    driver.press_key(&field.selector, "Control+A").await?;
    driver.type_text(&field.selector, value).await?;
    dispatch_change(driver, &field.selector).await
}

// ============================================================================
// Actions
// ============================================================================

/// Press an action and classify what the page did
pub async fn invoke_action(
    driver: &dyn PageDriver,
    id: &str,
    selector: &str,
    t: &Timeouts,
) -> Result<ActionResult> {
    let before = scenario::probe(driver).await?;
    press(driver, id, selector).await?;
    scenario::observe(driver, &before, t.action_settle_ms, t.poll_interval_ms).await
}

/// Press the dialog's primary button or the object page save action
pub async fn submit_form(driver: &dyn PageDriver, t: &Timeouts) -> Result<ActionResult> {
    let id = find_button(driver, scripts::FIND_SUBMIT_BUTTON, "submit").await?;
    invoke_action(driver, &id, &ids::css_id(&id), t).await
}

/// Cancel the draft and confirm the discard popover when it appears
pub async fn discard_draft(driver: &dyn PageDriver, t: &Timeouts) -> Result<ActionResult> {
    let id = find_button(driver, scripts::FIND_DISCARD_BUTTON, "discard").await?;
    let before = scenario::probe(driver).await?;
    press(driver, &id, &ids::css_id(&id)).await?;

    let config = PollConfig::with_timeout(t.action_settle_ms, t.poll_interval_ms);
    let confirmed = poll_until(
        || async {
            let value = driver.evaluate(scripts::CONFIRM_DISCARD, Value::Null).await?;
            Ok::<bool, anyhow::Error>(value.as_bool().unwrap_or(false))
        },
        &config,
    )
    .await?;
    debug!("Discard confirmation pressed: {}", confirmed);

    scenario::observe(driver, &before, t.action_settle_ms, t.poll_interval_ms).await
}

async fn find_button(driver: &dyn PageDriver, script: &str, what: &str) -> Result<String> {
    driver
        .evaluate(script, Value::Null)
        .await?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FioriError::not_found("button", what, Vec::new()).into())
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RowMark {
    marked: bool,
    row_count: usize,
    has_checkbox: bool,
    has_navigation: bool,
}

async fn mark_row(driver: &dyn PageDriver, list_id: &str, index: usize) -> Result<RowMark> {
    let raw = driver
        .evaluate(scripts::MARK_ROW, json!({ "listId": list_id, "index": index }))
        .await?;
    let mark: RowMark = serde_json::from_value(raw).unwrap_or_default();
    if !mark.marked {
        let alternatives = if mark.row_count > 0 {
            vec![format!("0..{}", mark.row_count - 1)]
        } else {
            Vec::new()
        };
        return Err(FioriError::not_found("row", index.to_string(), alternatives).into());
    }
    Ok(mark)
}

async fn row_selected(driver: &dyn PageDriver) -> Result<Option<bool>> {
    Ok(driver
        .evaluate(scripts::ROW_SELECTED, Value::Null)
        .await?
        .as_bool())
}

/// How a row selection was achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    Keyboard,
    CheckboxClick,
    RowClick,
    /// Nothing changed the observed state
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSelection {
    pub index: usize,
    pub selected: bool,
    pub method: SelectionMethod,
}

/// Toggle a row's selection, reporting the state actually observed
///
/// Tries keyboard activation of the checkbox, then a click on its visual
/// decoration, then a click on the row.
pub async fn select_row(
    driver: &dyn PageDriver,
    list_id: &str,
    index: usize,
    t: &Timeouts,
) -> Result<RowSelection> {
    let mark = mark_row(driver, list_id, index).await?;
    let initial = row_selected(driver).await?.unwrap_or(false);

    let checkbox = format!("{} .sapMCb", MARKED_ROW);
    let decoration = format!("{} .sapMCbBg", MARKED_ROW);

    let mut attempts: Vec<(SelectionMethod, &str)> = Vec::new();
    if mark.has_checkbox {
        attempts.push((SelectionMethod::Keyboard, checkbox.as_str()));
        attempts.push((SelectionMethod::CheckboxClick, decoration.as_str()));
    }
    attempts.push((SelectionMethod::RowClick, MARKED_ROW));

    let config = PollConfig::with_timeout(t.action_settle_ms.min(2000), t.poll_interval_ms);

    for (method, selector) in attempts {
        let outcome = match method {
            SelectionMethod::Keyboard => driver.press_key(selector, " ").await,
            _ => driver.click(selector).await,
        };
        if let Err(e) = outcome {
            debug!("{:?} on row {} failed: {:#}", method, index, e);
            continue;
        }

        let changed = poll_until(
            || async {
                let state = row_selected(driver).await?;
                Ok::<bool, anyhow::Error>(state.map_or(false, |s| s != initial))
            },
            &config,
        )
        .await?;
        if changed {
            return Ok(RowSelection {
                index,
                selected: !initial,
                method,
            });
        }
    }

    Ok(RowSelection {
        index,
        selected: row_selected(driver).await?.unwrap_or(initial),
        method: SelectionMethod::Unchanged,
    })
}

/// Which signal ended a row navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationSignal {
    ObjectPage,
    UrlChanged,
}

/// Open the object page of row `index`
///
/// Races the object page landmark against a location change; both share
/// the navigation bound.
pub async fn open_object_page(
    driver: &dyn PageDriver,
    list_id: &str,
    index: usize,
    t: &Timeouts,
) -> Result<NavigationSignal> {
    let mark = mark_row(driver, list_id, index).await?;
    let before_url = driver.current_url().await?;

    if mark.has_navigation {
        let nav = format!(
            "{row} .sapMLIBImgNav, {row} .sapMListTblNavCol",
            row = MARKED_ROW
        );
        driver.click(&nav).await?;
    } else {
        driver.click(&format!("{} td.sapMListTblCell", MARKED_ROW)).await?;
    }

    let landmark = readiness::wait_until(
        driver,
        Predicate::ObjectPageShown,
        Value::Null,
        t.navigation_ms,
        t.poll_interval_ms,
    );

    let config = PollConfig::with_timeout(t.navigation_ms, t.poll_interval_ms);
    let before = before_url.as_str();
    let url_change = poll_until(
        move || async move { Ok::<bool, anyhow::Error>(driver.current_url().await? != before) },
        &config,
    );

    let signal = tokio::select! {
        landed = landmark => {
            landed?;
            NavigationSignal::ObjectPage
        }
        changed = url_change => {
            if !changed? {
                return Err(FioriError::timeout("object-page-shown or url-changed", t.navigation_ms).into());
            }
            NavigationSignal::UrlChanged
        }
    };

    println!("  {} Opened object page of row {} ({:?})", "📄".green(), index, signal);
    Ok(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::types::FilterSelectors;
    use crate::runner::scenario::Severity;

    fn timeouts() -> Timeouts {
        Timeouts {
            framework_ready_ms: 200,
            element_ms: 200,
            rows_ms: 200,
            action_settle_ms: 100,
            navigation_ms: 200,
            poll_interval_ms: 5,
        }
    }

    fn filter(selectors: FilterSelectors) -> FilterDescriptor {
        FilterDescriptor {
            property_key: "Status".into(),
            label: "Status".into(),
            filter_field_id: "app--ff::Status".into(),
            local_id: "ff::Status".into(),
            selectors,
        }
    }

    #[tokio::test]
    async fn test_set_filter_input_fills_and_notifies() {
        let page = crate::driver::fake::FakePage::new();
        let f = filter(FilterSelectors {
            input_css: Some("#status-inner".into()),
            filter_field_css: Some("#status".into()),
            ..Default::default()
        });
        set_filter(&page, &f, "Open", &timeouts()).await.unwrap();
        assert_eq!(page.fills(), vec![("#status-inner".to_string(), "Open".to_string())]);
        assert_eq!(
            page.evaluations_of(scripts::DISPATCH_CHANGE)[0]["selector"],
            "#status-inner"
        );
    }

    #[tokio::test]
    async fn test_set_filter_select_picks_popup_item() {
        let page = crate::driver::fake::FakePage::new();
        page.on_evaluate_seq(
            scripts::CLICK_POPUP_ITEM,
            vec![json!({ "clicked": false, "options": [] }), json!({ "clicked": true })],
        );
        let f = filter(FilterSelectors {
            select_css: Some("#status-arrow".into()),
            ..Default::default()
        });
        set_filter(&page, &f, "Open", &timeouts()).await.unwrap();
        assert_eq!(page.clicks(), vec!["#status-arrow"]);
    }

    #[tokio::test]
    async fn test_set_filter_select_unknown_option() {
        let page = crate::driver::fake::FakePage::new();
        page.on_evaluate(
            scripts::CLICK_POPUP_ITEM,
            json!({ "clicked": false, "options": ["Open", "Closed"] }),
        );
        let f = filter(FilterSelectors {
            select_css: Some("#status-arrow".into()),
            ..Default::default()
        });
        let err = set_filter(&page, &f, "Archived", &timeouts()).await.unwrap_err();
        assert!(err.to_string().contains("Open, Closed"));
    }

    #[tokio::test]
    async fn test_set_filter_generic_field_types() {
        let page = crate::driver::fake::FakePage::new();
        let f = filter(FilterSelectors {
            filter_field_css: Some("#status".into()),
            ..Default::default()
        });
        set_filter(&page, &f, "Open", &timeouts()).await.unwrap();
        assert_eq!(page.clicks(), vec!["#status"]);
        assert_eq!(page.typed(), vec![("#status input".to_string(), "Open".to_string())]);
    }

    #[tokio::test]
    async fn test_invoke_action_prefers_fire_press() {
        let page = crate::driver::fake::FakePage::new();
        page.on_evaluate(scripts::FIRE_PRESS, json!(true));
        page.on_evaluate(scripts::PROBE_SCENARIO, json!({}));
        let result = invoke_action(&page, "app--btn", "#app--btn", &timeouts()).await.unwrap();
        assert_eq!(result, ActionResult::ActionCompleted);
        assert!(page.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_action_validation_error() {
        let page = crate::driver::fake::FakePage::new();
        page.on_evaluate(scripts::PROBE_SCENARIO, json!({}));
        page.on_click(
            "#app--approve",
            scripts::PROBE_SCENARIO,
            json!({ "messageSurface": true, "messageCount": 1 }),
        );
        page.on_evaluate(
            scripts::EXTRACT_MESSAGES,
            json!([{ "classes": "sapMLIB sapMMsgViewItem sapMMsgViewItemError", "text": "Enter a reason" }]),
        );

        let result = invoke_action(&page, "app--approve", "#app--approve", &timeouts())
            .await
            .unwrap();
        match result {
            ActionResult::ErrorMessages { messages } => {
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].severity, Severity::Error);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(page.clicks(), vec!["#app--approve"]);
    }

    #[tokio::test]
    async fn test_submit_form_presses_primary_button() {
        let page = crate::driver::fake::FakePage::new();
        page.on_evaluate(scripts::FIND_SUBMIT_BUTTON, json!("app--dialog-ok"));
        let result = submit_form(&page, &timeouts()).await.unwrap();
        assert_eq!(result, ActionResult::ActionCompleted);
        assert_eq!(page.clicks(), vec!["#app--dialog-ok"]);
    }

    #[tokio::test]
    async fn test_submit_form_without_button() {
        let page = crate::driver::fake::FakePage::new();
        let err = submit_form(&page, &timeouts()).await.unwrap_err();
        assert_eq!(err.downcast_ref::<FioriError>().map(|e| e.kind()), Some("not_found"));
    }

    #[tokio::test]
    async fn test_discard_draft_confirms_popover() {
        let page = crate::driver::fake::FakePage::new();
        page.on_evaluate(scripts::FIND_DISCARD_BUTTON, json!("app--footer-cancel"));
        page.on_evaluate_seq(scripts::CONFIRM_DISCARD, vec![json!(false), json!(true)]);
        let result = discard_draft(&page, &timeouts()).await.unwrap();
        assert_eq!(result.kind(), crate::runner::scenario::ScenarioKind::ActionCompleted);
        assert_eq!(page.clicks(), vec!["#app--footer-cancel"]);
        assert_eq!(page.evaluations_of(scripts::CONFIRM_DISCARD).len(), 2);
    }

    #[tokio::test]
    async fn test_select_row_falls_back_to_checkbox_click() {
        let page = crate::driver::fake::FakePage::new();
        page.on_evaluate(
            scripts::MARK_ROW,
            json!({ "marked": true, "rowCount": 3, "hasCheckbox": true }),
        );
        page.on_evaluate(scripts::ROW_SELECTED, json!(false));
        let decoration = format!("{} .sapMCbBg", MARKED_ROW);
        page.on_click(&decoration, scripts::ROW_SELECTED, json!(true));

        let selection = select_row(&page, "list", 1, &timeouts()).await.unwrap();
        assert_eq!(selection.method, SelectionMethod::CheckboxClick);
        assert!(selection.selected);
        assert_eq!(page.keys().len(), 1);
    }

    #[tokio::test]
    async fn test_select_row_reports_unchanged_state() {
        let page = crate::driver::fake::FakePage::new();
        page.on_evaluate(scripts::MARK_ROW, json!({ "marked": true, "rowCount": 3 }));
        page.on_evaluate(scripts::ROW_SELECTED, json!(false));
        let selection = select_row(&page, "list", 0, &timeouts()).await.unwrap();
        assert_eq!(selection.method, SelectionMethod::Unchanged);
        assert!(!selection.selected);
        assert_eq!(page.clicks(), vec![MARKED_ROW]);
    }

    #[tokio::test]
    async fn test_select_missing_row() {
        let page = crate::driver::fake::FakePage::new();
        page.on_evaluate(scripts::MARK_ROW, json!({ "marked": false, "rowCount": 2 }));
        let err = select_row(&page, "list", 5, &timeouts()).await.unwrap_err();
        assert!(err.to_string().contains("0..1"));
    }

    #[tokio::test]
    async fn test_open_object_page_via_landmark() {
        let page = crate::driver::fake::FakePage::new();
        page.set_url("https://host/ui#Orders-manage");
        page.on_evaluate(
            scripts::MARK_ROW,
            json!({ "marked": true, "rowCount": 1, "hasNavigation": true }),
        );
        page.on_evaluate_seq(scripts::OBJECT_PAGE_PRESENT, vec![json!(false), json!(true)]);
        let signal = open_object_page(&page, "list", 0, &timeouts()).await.unwrap();
        assert_eq!(signal, NavigationSignal::ObjectPage);
    }

    #[tokio::test]
    async fn test_open_object_page_times_out() {
        let page = crate::driver::fake::FakePage::new();
        page.on_evaluate(scripts::MARK_ROW, json!({ "marked": true, "rowCount": 1 }));
        let err = open_object_page(&page, "list", 0, &timeouts()).await.unwrap_err();
        assert_eq!(err.downcast_ref::<FioriError>().map(|e| e.kind()), Some("timeout"));
    }

    #[tokio::test]
    async fn test_press_go_waits_for_rows() {
        let page = crate::driver::fake::FakePage::new();
        page.on_evaluate(scripts::FIND_GO_BUTTON, json!("app--fb-btnSearch"));
        page.on_evaluate(scripts::ROWS_RENDERED, json!(true));
        let state = press_go(&page, Some("list"), &timeouts()).await.unwrap();
        assert_eq!(state, RowsState::Rows);
        assert_eq!(page.clicks(), vec!["#app--fb-btnSearch"]);
    }
}
