//! In-page scripts
//!
//! Every script is a function expression `(arg) => ...` evaluated through
//! [`PageDriver::evaluate`](crate::driver::traits::PageDriver::evaluate).
//! Scripts only read the page (or press one element) and return neutral JSON;
//! classification, reconciliation and scenario decisions are made in Rust.

/// Shared helpers, spliced into the scripts that need them
macro_rules! helpers {
    () => {
        r#"
  const shown = (el) => !!el && el.getClientRects().length > 0
    && getComputedStyle(el).visibility !== 'hidden';
  const txt = (el) => (el && el.textContent || '').replace(/\s+/g, ' ').trim();
  const ui5 = () => window.sap && sap.ui && typeof sap.ui.getCore === 'function';
  const byId = (id) => {
    if (!ui5()) return null;
    const Element = (sap.ui.core && sap.ui.core.Element) || null;
    if (Element && typeof Element.getElementById === 'function') return Element.getElementById(id);
    return sap.ui.getCore().byId(id);
  };
  const press = (el) => {
    const ctrl = el && el.id ? byId(el.id) : null;
    if (ctrl && typeof ctrl.firePress === 'function') { ctrl.firePress(); return; }
    el.click();
  };
  const hidden = (el) => el.closest('.sapUiInvisibleText, .sapUiPseudoInvisibleText, [aria-hidden="true"]');
  const cellText = (cell) => {
    let direct = '';
    cell.childNodes.forEach((n) => { if (n.nodeType === 3) direct += n.textContent; });
    const nested = [];
    cell.querySelectorAll('*').forEach((el) => {
      if (el.children.length === 0 && !hidden(el)) {
        const t = txt(el);
        if (t) nested.push(t);
      }
    });
    return { direct: direct.replace(/\s+/g, ' ').trim(), nested };
  };
  const rowsOf = (listId) => {
    const list = (listId && document.getElementById(listId)) || document.querySelector('.sapMListTbl');
    if (!list) return [];
    return Array.from(list.querySelectorAll('tr.sapMListTblRow'));
  };
  const topDialog = () => Array.from(document.querySelectorAll('.sapMDialog')).filter(shown).pop() || null;
"#
    };
}

// ============================================================================
// Readiness predicates
// ============================================================================

pub const FRAMEWORK_READY: &str = r#"() => {
  if (!(window.sap && sap.ui && typeof sap.ui.getCore === 'function')) return false;
  const core = sap.ui.getCore();
  if (!core) return false;
  return typeof core.isInitialized === 'function' ? core.isInitialized() : true;
}"#;

pub const VIEW_ELEMENT_RENDERED: &str =
    r#"() => !!document.querySelector('[id*="--"][data-sap-ui]')"#;

pub const FILTER_BAR_RENDERED: &str = r#"() => !!document.querySelector(
  '.sapUiMdcFilterBarBase, .sapUiMdcFilterBar, .sapUiCompFilterBar, [data-sap-ui][id*="::FilterBar::"]'
)"#;

pub const ROWS_RENDERED: &str = concat!(
    "(arg) => {",
    helpers!(),
    r#"
  const rows = rowsOf(arg && arg.listId);
  if (rows.length === 0) return false;
  const cells = Array.from(rows[0].querySelectorAll('td[data-sap-ui-column]'));
  return cells.some((cell) => {
    const t = cellText(cell);
    return t.direct.length > 0 || t.nested.length > 0;
  });
}"#
);

pub const NO_DATA_SHOWN: &str = concat!(
    "() => {",
    helpers!(),
    r#"
  return Array.from(document.querySelectorAll(
    '.sapMListNoData, .sapUiTableCtrlEmpty, .sapMListTbl .sapMIllustratedMessage'
  )).some(shown);
}"#
);

// ============================================================================
// Control registry scan
// ============================================================================

/// Walks the element registry and returns `{ ready, entries }`
///
/// Entries without a DOM reference are reported with `domPresent: false`;
/// entries whose extraction throws carry an `error` field.
pub const SCAN_REGISTRY: &str = r#"(arg) => {
  if (!(window.sap && sap.ui && typeof sap.ui.getCore === 'function')) {
    return { ready: false, entries: [] };
  }
  const core = sap.ui.getCore();
  const req = (name) => (sap.ui.require ? sap.ui.require(name) : null);
  const Element = (sap.ui.core && sap.ui.core.Element) || req('sap/ui/core/Element');
  const LabelEnablement = (sap.ui.core && sap.ui.core.LabelEnablement) || req('sap/ui/core/LabelEnablement');

  let all = [];
  if (Element && Element.registry && typeof Element.registry.all === 'function') {
    all = Object.values(Element.registry.all());
  } else if (core.mElements) {
    all = Object.values(core.mElements);
  } else {
    return { ready: false, entries: [] };
  }

  const call = (c, name) => {
    try { return typeof c[name] === 'function' ? c[name]() : undefined; } catch (e) { return undefined; }
  };
  const str = (v) => (v === undefined || v === null || typeof v === 'object') ? null : String(v);
  const byId = (id) => (Element && typeof Element.getElementById === 'function') ? Element.getElementById(id) : core.byId(id);

  const labelFor = (ctrl) => {
    if (!LabelEnablement || typeof LabelEnablement.getReferencingLabels !== 'function') return null;
    const ids = LabelEnablement.getReferencingLabels(ctrl) || [];
    for (const id of ids) {
      const label = byId(id);
      const text = label && str(call(label, 'getText'));
      if (text) return text;
    }
    return null;
  };

  const filterItems = (bar) => {
    let fields = call(bar, 'getFilterItems');
    if (!Array.isArray(fields)) {
      const groups = call(bar, 'getFilterGroupItems') || [];
      fields = groups.map((g) => call(g, 'getControl')).filter(Boolean);
    }
    return fields.map((f) => {
      const dom = typeof f.getDomRef === 'function' ? f.getDomRef() : null;
      const first = (sel) => (dom ? dom.querySelector(sel) : null);
      const date = first('.sapMDatePicker, .sapMDRS, .sapMDTP, .sapMDateTimeField');
      const select = date ? null : first('.sapMSlt, .sapMComboBox, .sapMMultiComboBox');
      const trigger = select ? (select.querySelector('.sapMInputBaseIconContainer, .sapMSltArrow') || select) : null;
      const input = date || select ? null : first('input.sapMInputBaseInner, input, textarea');
      const dateInput = date ? (date.querySelector('input') || date) : null;
      return {
        id: f.getId(),
        label: labelFor(f) || str(call(f, 'getLabel')),
        propertyKey: str(call(f, 'getPropertyKey')),
        fieldPath: str(call(f, 'getFieldPath')),
        innerInputId: input && input.id ? input.id : null,
        innerSelectId: trigger && trigger.id ? trigger.id : (select && select.id ? select.id : null),
        innerDateId: dateInput && dateInput.id ? dateInput.id : null,
      };
    });
  };

  const entries = [];
  for (const c of all) {
    let id = '';
    try {
      id = c.getId();
      const typeName = c.getMetadata().getName();
      const dom = typeof c.getDomRef === 'function' ? c.getDomRef() : null;
      if (!dom) {
        entries.push({ id, typeName, domPresent: false });
        continue;
      }
      const entry = {
        id,
        typeName,
        domPresent: true,
        visible: call(c, 'getVisible') !== false && dom.getClientRects().length > 0,
        enabled: call(c, 'getEnabled') !== false,
        ariaRole: dom.getAttribute('role'),
        ariaLabel: dom.getAttribute('aria-label'),
        ariaDescribedBy: dom.getAttribute('aria-describedby'),
        placeholder: str(call(c, 'getPlaceholder')),
        value: str(call(c, 'getValue')),
        text: str(call(c, 'getText')),
        title: str(call(c, 'getTitle')),
        label: str(call(c, 'getLabel')) || labelFor(c),
        tooltip: str(call(c, 'getTooltip_AsString')),
        bindings: {},
      };
      const infos = c.mBindingInfos || {};
      for (const name of Object.keys(infos)) {
        const info = infos[name] || {};
        const path = Array.isArray(info.parts)
          ? info.parts.map((p) => p.path).filter(Boolean).join(',')
          : info.path;
        if (path) entry.bindings[name] = String(path);
      }
      if (/Table|\.List$|\.Tree$/.test(typeName)) {
        const items = call(c, 'getItems');
        const rows = call(c, 'getRows');
        const columns = call(c, 'getColumns');
        entry.rowCount = Array.isArray(items) ? items.length : (Array.isArray(rows) ? rows.length : null);
        entry.columnCount = Array.isArray(columns) ? columns.length : null;
      }
      if (/FilterBar/.test(typeName)) {
        entry.filterItems = filterItems(c);
      }
      entries.push(entry);
    } catch (e) {
      entries.push({ id, error: String((e && e.message) || e) });
    }
  }
  return { ready: true, entries };
}"#;

// ============================================================================
// Rows
// ============================================================================

/// `{ header: [{columnId, text}], rows: [[{columnId, direct, nested}]] }`
pub const READ_ROWS: &str = concat!(
    "(arg) => {",
    helpers!(),
    r#"
  const list = (arg && arg.listId && document.getElementById(arg.listId)) || document.querySelector('.sapMListTbl');
  if (!list) return { header: [], rows: [] };
  const header = Array.from(list.querySelectorAll('tr.sapMListTblHeader th[data-sap-ui-column]'))
    .map((th) => ({ columnId: th.getAttribute('data-sap-ui-column'), text: txt(th) }));
  const rows = rowsOf(list.id).map((tr) =>
    Array.from(tr.querySelectorAll('td[data-sap-ui-column]')).map((td) => {
      const t = cellText(td);
      return { columnId: td.getAttribute('data-sap-ui-column'), direct: t.direct, nested: t.nested };
    })
  );
  return { header, rows };
}"#
);

/// Tags row `index` with `data-fiori-pilot-row` and reports its affordances
pub const MARK_ROW: &str = concat!(
    "(arg) => {",
    helpers!(),
    r#"
  document.querySelectorAll('[data-fiori-pilot-row]').forEach((el) => el.removeAttribute('data-fiori-pilot-row'));
  const row = rowsOf(arg.listId)[arg.index];
  if (!row) return { marked: false, rowCount: rowsOf(arg.listId).length };
  row.setAttribute('data-fiori-pilot-row', String(arg.index));
  return {
    marked: true,
    rowCount: rowsOf(arg.listId).length,
    hasCheckbox: !!row.querySelector('.sapMCb'),
    hasNavigation: !!row.querySelector('.sapMLIBImgNav, .sapMListTblNavCol'),
  };
}"#
);

/// Selection state of the marked row
pub const ROW_SELECTED: &str = r#"() => {
  const row = document.querySelector('[data-fiori-pilot-row]');
  if (!row) return null;
  const cb = row.querySelector('.sapMCb');
  return row.getAttribute('aria-selected') === 'true'
    || row.classList.contains('sapMLIBSelected')
    || (!!cb && cb.getAttribute('aria-checked') === 'true');
}"#;

pub const OBJECT_PAGE_PRESENT: &str = concat!(
    "() => {",
    helpers!(),
    r#"
  return Array.from(document.querySelectorAll('.sapUxAPObjectPageLayout, .sapUxAPObjectPageHeaderTitle')).some(shown);
}"#
);

// ============================================================================
// Scenario probes and extraction
// ============================================================================

/// `{ dialogWithFormAndFooter, messageSurface, messageCount, messageKeys, objectPage }`
pub const PROBE_SCENARIO: &str = concat!(
    "() => {",
    helpers!(),
    r#"
  const dialogs = Array.from(document.querySelectorAll('.sapMDialog')).filter(shown);
  const dialogWithFormAndFooter = dialogs.some((d) =>
    !!d.querySelector('.sapUiForm, .sapUiSimpleForm, .sapUiMdcField, .sapMInputBase, form')
    && !!d.querySelector('.sapMDialogFooter, footer'));
  const surfaces = Array.from(document.querySelectorAll(
    '.sapMMsgPopover, .sapMMessagePopover, .sapMMessageBox, .sapMMsgStrip, .sapMMessageView'
  )).filter(shown);
  const messageItems = Array.from(document.querySelectorAll('.sapMMsgViewItem, .sapMMsgStrip, .sapMMessageBox'))
    .filter(shown);
  const messageCount = messageItems.length;
  const messageKeys = messageItems.map((el) => `${el.id}|${txt(el)}`);
  const objectPage = Array.from(document.querySelectorAll(
    '.sapUxAPObjectPageLayout, .sapUxAPObjectPageHeaderTitle, .sapUiForm'
  )).some(shown);
  return { dialogWithFormAndFooter, messageSurface: surfaces.length > 0, messageCount, messageKeys, objectPage };
}"#
);

/// `[{ classes, text }]` from message popovers, message boxes and strips
pub const EXTRACT_MESSAGES: &str = concat!(
    "() => {",
    helpers!(),
    r#"
  const out = [];
  const push = (classes, text) => { if (text) out.push({ classes, text }); };
  document.querySelectorAll('.sapMMsgViewItem').forEach((li) => {
    if (!shown(li)) return;
    const title = li.querySelector('.sapMSLITitleOnly, .sapMSLITitle, .sapMLIBContent');
    push(li.className, txt(title || li));
  });
  document.querySelectorAll('.sapMMsgStrip').forEach((strip) => {
    if (!shown(strip)) return;
    push(strip.className, txt(strip.querySelector('.sapMMsgStripMessage') || strip));
  });
  document.querySelectorAll('.sapMMessageBox').forEach((box) => {
    if (!shown(box)) return;
    push(box.className, txt(box.querySelector('.sapMMessageBoxText, .sapMText, .sapMFT') || box));
  });
  return out;
}"#
);

/// `[{ id, name, label, value, readOnly }]` for the top dialog or the page
pub const EXTRACT_FORM_FIELDS: &str = concat!(
    "(arg) => {",
    helpers!(),
    r#"
  const root = arg && arg.scope === 'dialog'
    ? topDialog()
    : (document.querySelector('.sapUxAPObjectPageLayout') || document.body);
  if (!root) return [];
  const labelOf = (el) => {
    const ids = [el.id, el.id.replace(/-inner$/, '')];
    for (const id of ids) {
      if (!id) continue;
      const byFor = document.querySelector('label[for="' + CSS.escape(id) + '"]');
      if (byFor && txt(byFor)) return txt(byFor);
    }
    const element = el.closest('.sapUiFormElement, .sapUiFormCLElement, .sapUiAFLayoutItem, .sapUiMdcField');
    const inForm = element && element.querySelector('label, .sapMLabel');
    if (inForm && txt(inForm)) return txt(inForm);
    let node = el.closest('[data-sap-ui]') || el;
    while (node && node !== root) {
      const prev = node.previousElementSibling;
      if (prev && txt(prev)) return txt(prev);
      node = node.parentElement;
    }
    return null;
  };
  return Array.from(root.querySelectorAll('input:not([type="hidden"]), textarea'))
    .filter((el) => el.id && shown(el))
    .map((el) => ({
      id: el.id,
      name: el.getAttribute('name'),
      label: labelOf(el),
      value: el.type === 'checkbox' ? String(el.checked) : (el.value || ''),
      readOnly: el.readOnly || el.disabled,
    }));
}"#
);

/// `[{ label, value }]` from the object page form elements
pub const READ_OBJECT_FIELDS: &str = concat!(
    "() => {",
    helpers!(),
    r#"
  const root = document.querySelector('.sapUxAPObjectPageLayout') || document.body;
  const out = [];
  root.querySelectorAll('.sapUiFormElement, .sapUiFormCLElement, .sapUiAFLayoutItem').forEach((el) => {
    if (!shown(el)) return;
    const label = el.querySelector('label, .sapMLabel');
    const input = el.querySelector('input:not([type="hidden"]), textarea');
    let value = input ? input.value : '';
    if (!value) {
      const parts = [];
      el.querySelectorAll('*').forEach((n) => {
        if (n.children.length === 0 && !hidden(n) && !(label && label.contains(n))) {
          const t = txt(n);
          if (t) parts.push(t);
        }
      });
      value = parts.join(' ');
    }
    out.push({ label: txt(label).replace(/:$/, ''), value });
  });
  return out;
}"#
);

// ============================================================================
// Pressing and input
// ============================================================================

/// Calls `firePress()` on the control with `arg.id`; false if it has none
pub const FIRE_PRESS: &str = concat!(
    "(arg) => {",
    helpers!(),
    r#"
  const ctrl = byId(arg.id);
  if (!ctrl || typeof ctrl.firePress !== 'function') return false;
  if (typeof ctrl.getEnabled === 'function' && !ctrl.getEnabled()) return false;
  ctrl.firePress();
  return true;
}"#
);

/// Dispatches input, change and blur on the element matching `arg.selector`
pub const DISPATCH_CHANGE: &str = r#"(arg) => {
  const el = document.querySelector(arg.selector);
  if (!el) return false;
  for (const type of ['input', 'change']) {
    el.dispatchEvent(new Event(type, { bubbles: true }));
  }
  el.dispatchEvent(new FocusEvent('blur', { bubbles: false }));
  el.dispatchEvent(new FocusEvent('focusout', { bubbles: true }));
  return true;
}"#;

/// Clicks the first open popup list item containing `arg.value`
pub const CLICK_POPUP_ITEM: &str = concat!(
    "(arg) => {",
    helpers!(),
    r#"
  const want = String(arg.value).toLowerCase();
  const items = Array.from(document.querySelectorAll(
    '.sapMPopover li, .sapMSltPicker li, .sapMComboBoxBasePicker li, .sapMSelectList li, .sapMDialog li.sapMLIB'
  )).filter(shown);
  const options = items.map(txt).filter(Boolean);
  const hit = items.find((li) => txt(li).toLowerCase().includes(want));
  if (!hit) return { clicked: false, options };
  hit.click();
  return { clicked: true, options };
}"#
);

/// Id of the filter bar's Go button, or null
pub const FIND_GO_BUTTON: &str = concat!(
    "() => {",
    helpers!(),
    r#"
  const byConvention = Array.from(document.querySelectorAll('[id$="-btnSearch"], [id$="::FilterBar::GoButton"]')).find(shown);
  if (byConvention) return byConvention.id;
  const byText = Array.from(document.querySelectorAll('.sapMBtn')).filter(shown)
    .find((b) => /^(go|search)$/i.test(txt(b)));
  return byText ? byText.id : null;
}"#
);

/// Id of the button that submits the open dialog or object page, or null
pub const FIND_SUBMIT_BUTTON: &str = concat!(
    "() => {",
    helpers!(),
    r#"
  const dlg = topDialog();
  if (dlg) {
    const buttons = Array.from(dlg.querySelectorAll('.sapMDialogFooter .sapMBtn, footer .sapMBtn')).filter(shown);
    const primary = buttons.find((b) => b.querySelector('.sapMBtnEmphasized'))
      || buttons.find((b) => /^(ok|create|save|apply|submit)$/i.test(txt(b)));
    if (primary) return primary.id;
  }
  const footer = Array.from(document.querySelectorAll(
    '[id*="FooterBar::StandardAction::Save"], [id$="::StandardAction::Save"], [id*="FooterBar::StandardAction::Apply"]'
  )).find(shown);
  return footer ? footer.id : null;
}"#
);

/// Id of the draft cancel button, or null
pub const FIND_DISCARD_BUTTON: &str = concat!(
    "() => {",
    helpers!(),
    r#"
  const btn = Array.from(document.querySelectorAll(
    '[id*="FooterBar::StandardAction::Cancel"], [id$="::StandardAction::Cancel"]'
  )).find(shown);
  return btn ? btn.id : null;
}"#
);

/// Presses the "Discard" confirmation in the draft popover
pub const CONFIRM_DISCARD: &str = concat!(
    "() => {",
    helpers!(),
    r#"
  const btn = Array.from(document.querySelectorAll('.sapMPopover .sapMBtn, .sapMDialog .sapMBtn')).filter(shown)
    .find((b) => /discard/i.test(txt(b)));
  if (!btn) return false;
  press(btn);
  return true;
}"#
);

// ============================================================================
// Column settings dialog
// ============================================================================

/// Column labels listed in the open settings dialog, or null if none is open
pub const READ_SETTINGS_COLUMNS: &str = concat!(
    "() => {",
    helpers!(),
    r#"
  const dlg = topDialog();
  if (!dlg) return null;
  const labels = [];
  dlg.querySelectorAll('.sapMListTbl tbody tr, ul li.sapMLIB').forEach((row) => {
    const label = row.querySelector('.sapMLabel, .sapMText, .sapMSLITitleOnly');
    const t = txt(label);
    if (t && !labels.includes(t)) labels.push(t);
  });
  return labels.length ? labels : null;
}"#
);

/// Closes the top dialog via its cancel/close button, or Escape
pub const CLOSE_TOP_DIALOG: &str = concat!(
    "() => {",
    helpers!(),
    r#"
  const dlg = topDialog();
  if (!dlg) return false;
  const btn = Array.from(dlg.querySelectorAll('.sapMDialogFooter .sapMBtn, footer .sapMBtn'))
    .find((b) => /cancel|close/i.test(txt(b)));
  if (btn) { press(btn); return true; }
  dlg.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape', keyCode: 27, bubbles: true }));
  return true;
}"#
);
