//! Panic reporting.
//!
//! A panic inside a cycle is caught by the scheduler and turned into an
//! aborted outcome.  The hook installed here makes sure the panic still
//! reaches the log with its location before the unwind is caught.

use std::any::Any;
use std::panic;

use log::error;

/// Route panic reports through `log` instead of stderr.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "<unknown>".into());
        error!(
            "PANIC | {} at {}",
            panic_message(info.payload()),
            location
        );
    }));
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
