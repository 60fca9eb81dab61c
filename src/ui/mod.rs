//! UI module for consistent CLI output
//!
//! Uses `cliclack` for interactive spinners and prompts with automatic
//! fallback to plain output in CI/non-interactive environments, and a quiet
//! mode that silences decorations entirely when machine-readable output is
//! requested.
//!
//! # Example
//!
//! ```rust,ignore
//! use argus::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Reading package tree...");
//! // ... do work ...
//! spinner.stop("1234 packages");
//!
//! ui::step_warn_hint(&ctx, "stabilize skipped", "not running against core repo");
//! ui::outro_success(&ctx, "No findings");
//! ```

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    intro, outro_success, outro_warn, remark, step_error_detail, step_ok, step_ok_detail,
    step_warn_hint,
};
pub use progress::{ScanProgress, TaskSpinner};
pub use prompts::confirm;
