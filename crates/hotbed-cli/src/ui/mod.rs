//! Terminal status lines.
//!
//! Everything here writes to stderr so module output piped from stdout stays
//! clean. Colors come from `owo-colors` and are decided once by
//! [`init_colors`].
//!
//! ```no_run
//! use hotbed_cli::ui;
//!
//! ui::init_colors(false);
//! ui::success("Server ready");
//! ```

mod format;
mod messages;

use std::sync::atomic::{AtomicBool, Ordering};

static COLORS: AtomicBool = AtomicBool::new(true);

pub use format::{describe_decision, format_duration, print_banner};
pub use messages::{debug, error, info, success, warning};

/// Check if color output should be enabled.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    console::user_attended_stderr()
}

/// Apply the color choice to every later status line.
pub fn init_colors(no_color: bool) {
    COLORS.store(!no_color && should_use_color(), Ordering::Relaxed);
}

pub(crate) fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}
