//! CLI command implementations

pub mod cache;
pub mod checks;
pub mod completions;
pub mod config;
pub mod scan;

pub use cache::execute as cache;
pub use checks::execute as checks;
pub use completions::execute as completions;
pub use config::execute as config;
pub use scan::execute as scan;
