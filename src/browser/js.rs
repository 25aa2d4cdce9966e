//! Script snippets evaluated in page context.
//!
//! Everything interactive goes through scripts rather than synthesized input
//! events: the portal's generated markup re-renders controls between
//! navigations, and script lookups keep working across contexts where direct
//! element handles go stale.

/// Levels of the reCAPTCHA client registry searched for a verify callback.
const CALLBACK_DEPTH: usize = 5;

/// Render a Rust string as a JS string literal.
fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Inner text of an element, or `null`.
pub fn text_of(id: &str) -> String {
    format!(
        "(() => {{ const el = document.getElementById({id}); return el ? el.innerText : null; }})()",
        id = quote(id)
    )
}

/// Form value of an element, or `null`.
pub fn value_of(id: &str) -> String {
    format!(
        "(() => {{ const el = document.getElementById({id}); return el ? String(el.value ?? '') : null; }})()",
        id = quote(id)
    )
}

/// Number of elements whose id starts with the given prefix.
pub fn count_by_id_prefix(prefix: &str) -> String {
    format!(
        "document.querySelectorAll('[id^=' + JSON.stringify({prefix}) + ']').length",
        prefix = quote(prefix)
    )
}

/// Click an element by id; `false` when absent.
pub fn click(id: &str) -> String {
    format!(
        "(() => {{ const el = document.getElementById({id}); if (!el) return false; el.click(); return true; }})()",
        id = quote(id)
    )
}

/// Assign a field value with the event dispatch the portal's own handlers
/// expect: focus, set, input, change, blur.
pub fn set_value(id: &str, value: &str) -> String {
    format!(
        "(() => {{ \
           const el = document.getElementById({id}); \
           if (!el) return false; \
           el.focus(); \
           el.value = {value}; \
           el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
           el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
           el.blur(); \
           return true; \
         }})()",
        id = quote(id),
        value = quote(value)
    )
}

/// Select an option on a `<select>` and dispatch the change event.
pub fn select_value(id: &str, value: &str) -> String {
    format!(
        "(() => {{ \
           const el = document.getElementById({id}); \
           if (!el) return false; \
           el.value = {value}; \
           el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
           return true; \
         }})()",
        id = quote(id),
        value = quote(value)
    )
}

/// Visible text of the whole page.
pub const PAGE_TEXT: &str = "document.body ? document.body.innerText : ''";

/// All `table tr` rows as arrays of trimmed cell texts.
pub const TABLE_ROWS: &str = "(() => Array.from(document.querySelectorAll('table tr'))\
    .map(tr => Array.from(tr.querySelectorAll('td')).map(td => td.innerText.trim())))()";

/// Write a solved token into the reCAPTCHA response field, creating the
/// field if the widget never rendered it.
pub fn inject_recaptcha_token(token: &str) -> String {
    format!(
        "(() => {{ \
           let el = document.getElementById('g-recaptcha-response'); \
           if (!el) {{ \
             el = document.createElement('textarea'); \
             el.id = 'g-recaptcha-response'; \
             el.name = 'g-recaptcha-response'; \
             el.style.display = 'none'; \
             document.body.appendChild(el); \
           }} \
           el.value = {token}; \
           return true; \
         }})()",
        token = quote(token)
    )
}

/// Walk the reCAPTCHA client registry for a `callback` function and invoke
/// it with the token. Returns `false` when no callback was reachable; the
/// injected token alone may still satisfy server-side validation.
pub fn invoke_recaptcha_callback(token: &str) -> String {
    format!(
        "(() => {{ \
           const seen = new Set(); \
           const visit = (obj, depth) => {{ \
             if (!obj || depth > {depth} || typeof obj !== 'object' || seen.has(obj)) return null; \
             seen.add(obj); \
             for (const key of Object.keys(obj)) {{ \
               let val; \
               try {{ val = obj[key]; }} catch (e) {{ continue; }} \
               if (key === 'callback' && typeof val === 'function') return val; \
               const found = visit(val, depth + 1); \
               if (found) return found; \
             }} \
             return null; \
           }}; \
           const cfg = window.___grecaptcha_cfg; \
           if (!cfg || !cfg.clients) return false; \
           const cb = visit(cfg.clients, 0); \
           if (!cb) return false; \
           try {{ cb({token}); }} catch (e) {{ return false; }} \
           return true; \
         }})()",
        depth = CALLBACK_DEPTH,
        token = quote(token)
    )
}

/// Fire the grid's own row event for a control, the way the generated page
/// wires its detail triggers.
pub fn grid_row_event(control: &str) -> String {
    format!(
        "(() => {{ \
           if (!window.gx || !gx.evt) return false; \
           gx.evt.execEvt(\"E'DODETALLE'.\", false, {control}); \
           return true; \
         }})()",
        control = quote(control)
    )
}
