//! Trellis C ABI
//!
//! Exposes the engine to foreign callers through `extern "C"` functions.
//!
//! # Conventions
//!
//! - Every object is a `uint32_t` handle. 0 means "no object" (and is what
//!   failed calls return).
//! - Strings are passed as pointer + byte length and need not be
//!   NUL-terminated. Invalid UTF-8 is replaced. A null pointer is only
//!   accepted together with a zero length.
//! - Strings are returned by copying into a caller buffer. The return value
//!   is the full byte length, so a caller can retry with a larger buffer.
//! - Failures never unwind into the caller. They are logged and recorded as
//!   the calling thread's last error (see [`trl_last_error`]).
//!
//! # Architecture
//!
//! ```text
//! host (C, Python, JS addon) -> trl_* functions -> Engine (behind one Mutex)
//! ```

// exported names follow the `trl_Class_method` pattern of the C header
#![allow(non_snake_case)]

use std::borrow::Cow;
use std::cell::RefCell;
use std::ffi::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, Once, OnceLock, PoisonError};
use std::{ptr, slice};

use tracing_subscriber::EnvFilter;
use trellis_engine::{Config, Engine, EngineError, Handle, ObjectKind, Visibility};

// =============================================================================
// Global State
// =============================================================================

/// The process-wide engine, created on first use
static ENGINE: OnceLock<Mutex<Option<Engine>>> = OnceLock::new();

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn state() -> MutexGuard<'static, Option<Engine>> {
    ENGINE
        .get_or_init(|| Mutex::new(None))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn new_engine() -> Engine {
    let config = Config::from_env();
    init_logging(&config);
    Engine::new(config)
}

fn init_logging(config: &Config) {
    static LOGGING: Once = Once::new();
    LOGGING.call_once(|| {
        let filter =
            EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("warn"));
        // the host may already have installed a subscriber
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Why a boundary call failed
#[derive(Debug, thiserror::Error)]
enum CallError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("null string pointer with length {0}")]
    NullString(usize),

    #[error("panicked: {0}")]
    Panicked(String),
}

type CallResult<T> = Result<T, CallError>;

/// Run `f` against the engine, collapsing every failure to `fallback`
fn call<T>(name: &'static str, fallback: T, f: impl FnOnce(&mut Engine) -> CallResult<T>) -> T {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut guard = state();
        f(guard.get_or_insert_with(new_engine))
    }));

    let err = match outcome {
        Ok(Ok(value)) => return value,
        Ok(Err(err)) => err,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            CallError::Panicked(message)
        }
    };

    tracing::warn!("{} failed: {}", name, err);
    LAST_ERROR.with(|last| *last.borrow_mut() = Some(format!("{name}: {err}")));
    fallback
}

fn handle(raw: u32) -> CallResult<Handle> {
    Handle::from_raw(raw)
        .ok_or(CallError::Engine(EngineError::InvalidHandle { handle: raw, expected: None }))
}

fn optional_handle(raw: u32) -> CallResult<Option<Handle>> {
    if raw == 0 { Ok(None) } else { handle(raw).map(Some) }
}

/// Destroy a handle after checking it is of the expected kind
fn destroy(engine: &mut Engine, raw: u32, kind: ObjectKind) -> CallResult<()> {
    let h = handle(raw)?;
    if engine.kind_of(h) != Some(kind) {
        return Err(EngineError::InvalidHandle { handle: raw, expected: Some(kind) }.into());
    }
    Ok(engine.destroy(h)?)
}

/// Borrow a caller string
///
/// # Safety
/// `ptr` must be valid for reads of `len` bytes when `len > 0`.
unsafe fn str_arg<'a>(ptr: *const c_char, len: usize) -> CallResult<Cow<'a, str>> {
    if len == 0 {
        return Ok(Cow::Borrowed(""));
    }
    if ptr.is_null() {
        return Err(CallError::NullString(len));
    }
    let bytes = unsafe { slice::from_raw_parts(ptr.cast::<u8>(), len) };
    Ok(String::from_utf8_lossy(bytes))
}

/// Copy `text` into a caller buffer, truncating to `buf_len`
///
/// # Safety
/// `buf` must be valid for writes of `buf_len` bytes, or null.
unsafe fn copy_out(text: &str, buf: *mut c_char, buf_len: usize) -> usize {
    if !buf.is_null() && buf_len > 0 {
        let n = text.len().min(buf_len);
        unsafe { ptr::copy_nonoverlapping(text.as_ptr(), buf.cast::<u8>(), n) };
    }
    text.len()
}

// =============================================================================
// FFI Functions - Process
// =============================================================================

/// Copy the calling thread's last error message into `buf`.
///
/// Returns the full message length, 0 when no call has failed yet.
///
/// # Safety
/// `buf` must be valid for writes of `buf_len` bytes, or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trl_last_error(buf: *mut c_char, buf_len: usize) -> usize {
    LAST_ERROR.with(|last| match last.borrow().as_deref() {
        Some(message) => unsafe { copy_out(message, buf, buf_len) },
        None => 0,
    })
}

/// Drop the engine and every object it owns. The next call starts fresh.
#[unsafe(no_mangle)]
pub extern "C" fn trl_shutdown() {
    let engine = state().take();
    if engine.is_some() {
        tracing::info!("shutting down");
    }
    drop(engine);
    LAST_ERROR.with(|last| last.borrow_mut().take());
}

// =============================================================================
// FFI Functions - Application
// =============================================================================

/// Create the application. Returns 0 if one is already alive.
#[unsafe(no_mangle)]
pub extern "C" fn trl_App_init() -> u32 {
    call("trl_App_init", 0, |engine| Ok(engine.init_app()?.raw()))
}

/// Run one engine step. Never blocks.
#[unsafe(no_mangle)]
pub extern "C" fn trl_App_tick(app: u32) {
    call("trl_App_tick", (), |engine| Ok(engine.tick(handle(app)?)?));
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_App_wake_up(app: u32) {
    call("trl_App_wake_up", (), |engine| Ok(engine.wake_up(handle(app)?)?));
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_App_drop(app: u32) {
    call("trl_App_drop", (), |engine| destroy(engine, app, ObjectKind::Application));
}

// =============================================================================
// FFI Functions - Window Management
// =============================================================================

/// Open a window. Non-positive sizes use the default size.
///
/// # Safety
/// `title` must be valid for reads of `title_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trl_Window_new(
    title: *const c_char,
    title_len: usize,
    width: i32,
    height: i32,
) -> u32 {
    call("trl_Window_new", 0, |engine| {
        let title = unsafe { str_arg(title, title_len) }?;
        Ok(engine.create_window(&title, width, height)?.raw())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Window_should_close(win: u32) -> bool {
    call("trl_Window_should_close", false, |engine| {
        Ok(engine.should_close(handle(win)?)?)
    })
}

/// Copy the window title into `buf`; returns its full length
///
/// # Safety
/// `buf` must be valid for writes of `buf_len` bytes, or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trl_Window_title(win: u32, buf: *mut c_char, buf_len: usize) -> usize {
    call("trl_Window_title", 0, |engine| {
        let window = engine.window(handle(win)?)?;
        Ok(unsafe { copy_out(window.title(), buf, buf_len) })
    })
}

/// # Safety
/// `title` must be valid for reads of `title_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trl_Window_set_title(win: u32, title: *const c_char, title_len: usize) {
    call("trl_Window_set_title", (), |engine| {
        let title = unsafe { str_arg(title, title_len) }?;
        Ok(engine.set_title(handle(win)?, &title)?)
    });
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Window_width(win: u32) -> u32 {
    call("trl_Window_width", 0, |engine| Ok(engine.window(handle(win)?)?.width()))
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Window_height(win: u32) -> u32 {
    call("trl_Window_height", 0, |engine| Ok(engine.window(handle(win)?)?.height()))
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Window_resize(win: u32, width: i32, height: i32) {
    call("trl_Window_resize", (), |engine| {
        Ok(engine.resize(handle(win)?, width, height)?)
    });
}

fn set_visibility(name: &'static str, win: u32, visibility: Visibility) {
    call(name, (), |engine| Ok(engine.set_visibility(handle(win)?, visibility)?));
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Window_show(win: u32) {
    set_visibility("trl_Window_show", win, Visibility::Shown);
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Window_hide(win: u32) {
    set_visibility("trl_Window_hide", win, Visibility::Hidden);
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Window_minimize(win: u32) {
    set_visibility("trl_Window_minimize", win, Visibility::Minimized);
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Window_maximize(win: u32) {
    set_visibility("trl_Window_maximize", win, Visibility::Maximized);
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Window_restore(win: u32) {
    set_visibility("trl_Window_restore", win, Visibility::Shown);
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Window_focus(win: u32) {
    call("trl_Window_focus", (), |engine| Ok(engine.focus(handle(win)?)?));
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Window_drop(win: u32) {
    call("trl_Window_drop", (), |engine| destroy(engine, win, ObjectKind::Window));
}

// =============================================================================
// FFI Functions - Documents
// =============================================================================

#[unsafe(no_mangle)]
pub extern "C" fn trl_Document_new() -> u32 {
    call("trl_Document_new", 0, |engine| Ok(engine.create_document()?.raw()))
}

/// # Safety
/// `tag` must be valid for reads of `tag_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trl_Document_create_element(
    doc: u32,
    tag: *const c_char,
    tag_len: usize,
) -> u32 {
    call("trl_Document_create_element", 0, |engine| {
        let tag = unsafe { str_arg(tag, tag_len) }?;
        Ok(engine.create_element(handle(doc)?, &tag)?.raw())
    })
}

/// # Safety
/// `text` must be valid for reads of `text_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trl_Document_create_text_node(
    doc: u32,
    text: *const c_char,
    text_len: usize,
) -> u32 {
    call("trl_Document_create_text_node", 0, |engine| {
        let text = unsafe { str_arg(text, text_len) }?;
        Ok(engine.create_text_node(handle(doc)?, &text)?.raw())
    })
}

/// Destroy a document and every node handle it owns
#[unsafe(no_mangle)]
pub extern "C" fn trl_Document_drop(doc: u32) {
    call("trl_Document_drop", (), |engine| destroy(engine, doc, ObjectKind::Document));
}

// =============================================================================
// FFI Functions - Nodes
// =============================================================================

/// Append `child` under `parent` (a node or a document)
#[unsafe(no_mangle)]
pub extern "C" fn trl_Node_append_child(parent: u32, child: u32) {
    call("trl_Node_append_child", (), |engine| {
        Ok(engine.append_child(handle(parent)?, handle(child)?)?)
    });
}

/// Insert `child` before `before`; 0 appends
#[unsafe(no_mangle)]
pub extern "C" fn trl_Node_insert_before(parent: u32, child: u32, before: u32) {
    call("trl_Node_insert_before", (), |engine| {
        Ok(engine.insert_before(handle(parent)?, handle(child)?, optional_handle(before)?)?)
    });
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Node_remove_child(parent: u32, child: u32) {
    call("trl_Node_remove_child", (), |engine| {
        Ok(engine.remove_child(handle(parent)?, handle(child)?)?)
    });
}

/// First descendant of `root` matching a single-token selector; 0 if none.
/// A document root also reaches its unattached nodes.
///
/// # Safety
/// `selector` must be valid for reads of `selector_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trl_Node_query_selector(
    root: u32,
    selector: *const c_char,
    selector_len: usize,
) -> u32 {
    call("trl_Node_query_selector", 0, |engine| {
        let selector = unsafe { str_arg(selector, selector_len) }?;
        let found = engine.query_selector(handle(root)?, &selector)?;
        Ok(Handle::raw_or_zero(found))
    })
}

/// Canonical handle of a live node; 0 if it is gone
#[unsafe(no_mangle)]
pub extern "C" fn trl_Node_id(node: u32) -> u32 {
    call("trl_Node_id", 0, |engine| Ok(engine.node_id(handle(node)?)?.raw()))
}

/// 1 = element, 3 = text, 9 = document, 0 = invalid
#[unsafe(no_mangle)]
pub extern "C" fn trl_Node_kind(node: u32) -> u32 {
    call("trl_Node_kind", 0, |engine| Ok(engine.node_kind(handle(node)?)? as u32))
}

fn navigate(
    name: &'static str,
    node: u32,
    step: fn(&Engine, Handle) -> Result<Option<Handle>, EngineError>,
) -> u32 {
    call(name, 0, |engine| Ok(Handle::raw_or_zero(step(engine, handle(node)?)?)))
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Node_parent_node(node: u32) -> u32 {
    navigate("trl_Node_parent_node", node, Engine::parent_node)
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Node_first_child(node: u32) -> u32 {
    navigate("trl_Node_first_child", node, Engine::first_child)
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Node_last_child(node: u32) -> u32 {
    navigate("trl_Node_last_child", node, Engine::last_child)
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Node_previous_sibling(node: u32) -> u32 {
    navigate("trl_Node_previous_sibling", node, Engine::previous_sibling)
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Node_next_sibling(node: u32) -> u32 {
    navigate("trl_Node_next_sibling", node, Engine::next_sibling)
}

/// Destroy a node handle. The node is detached; its children stay alive.
#[unsafe(no_mangle)]
pub extern "C" fn trl_Node_drop(node: u32) {
    call("trl_Node_drop", (), |engine| destroy(engine, node, ObjectKind::Node));
}

/// # Safety
/// `name` and `value` must be valid for reads of their lengths.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trl_Element_set_attribute(
    el: u32,
    name: *const c_char,
    name_len: usize,
    value: *const c_char,
    value_len: usize,
) {
    call("trl_Element_set_attribute", (), |engine| {
        let name = unsafe { str_arg(name, name_len) }?;
        let value = unsafe { str_arg(value, value_len) }?;
        Ok(engine.set_attribute(handle(el)?, &name, &value)?)
    });
}

/// # Safety
/// `name` must be valid for reads of `name_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trl_Element_remove_attribute(el: u32, name: *const c_char, name_len: usize) {
    call("trl_Element_remove_attribute", (), |engine| {
        let name = unsafe { str_arg(name, name_len) }?;
        engine.remove_attribute(handle(el)?, &name)?;
        Ok(())
    });
}

/// Copy a text node's data into `buf`; returns its full length
///
/// # Safety
/// `buf` must be valid for writes of `buf_len` bytes, or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trl_CharacterData_data(node: u32, buf: *mut c_char, buf_len: usize) -> usize {
    call("trl_CharacterData_data", 0, |engine| {
        let text = engine.text(handle(node)?)?;
        Ok(unsafe { copy_out(text, buf, buf_len) })
    })
}

/// # Safety
/// `data` must be valid for reads of `data_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn trl_CharacterData_set_data(node: u32, data: *const c_char, data_len: usize) {
    call("trl_CharacterData_set_data", (), |engine| {
        let data = unsafe { str_arg(data, data_len) }?;
        Ok(engine.set_text(handle(node)?, &data)?)
    });
}

// =============================================================================
// FFI Functions - Rendering
// =============================================================================

#[unsafe(no_mangle)]
pub extern "C" fn trl_Renderer_new(doc: u32, win: u32) -> u32 {
    call("trl_Renderer_new", 0, |engine| {
        Ok(engine.create_renderer(handle(doc)?, handle(win)?)?.raw())
    })
}

/// Present the document in the window. Repeated calls within one tick do
/// nothing unless the tree or window size changed.
#[unsafe(no_mangle)]
pub extern "C" fn trl_Renderer_render(renderer: u32) {
    call("trl_Renderer_render", (), |engine| {
        engine.render(handle(renderer)?)?;
        Ok(())
    });
}

#[unsafe(no_mangle)]
pub extern "C" fn trl_Renderer_drop(renderer: u32) {
    call("trl_Renderer_drop", (), |engine| destroy(engine, renderer, ObjectKind::Renderer));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_arg() {
        let bytes = b"div\xffx";
        let s = unsafe { str_arg(bytes.as_ptr().cast(), bytes.len()) }.unwrap();
        assert_eq!(s, "div\u{fffd}x");

        assert_eq!(unsafe { str_arg(ptr::null(), 0) }.unwrap(), "");
        assert!(matches!(
            unsafe { str_arg(ptr::null(), 3) },
            Err(CallError::NullString(3))
        ));
    }

    #[test]
    fn test_copy_out_truncates() {
        let mut buf = [0 as c_char; 4];
        let n = unsafe { copy_out("Hello", buf.as_mut_ptr(), buf.len()) };
        assert_eq!(n, 5);
        assert_eq!(buf.map(|c| c as u8), *b"Hell");

        assert_eq!(unsafe { copy_out("Hello", ptr::null_mut(), 0) }, 5);
    }

    #[test]
    fn test_zero_handle_rejected() {
        assert!(handle(0).is_err());
        assert_eq!(optional_handle(0).unwrap(), None);
    }
}
