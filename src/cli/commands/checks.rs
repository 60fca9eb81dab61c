//! Checks command - list the check registry

use crate::check::CheckKind;
use crate::error::ArgusResult;
use console::style;

/// Execute the checks command
pub fn execute() -> ArgusResult<()> {
    println!(
        "{:<20} {:<13} {:<10} {}",
        style("NAME").bold(),
        style("SCOPE").bold(),
        style("ADDONS").bold(),
        style("DESCRIPTION").bold()
    );
    println!("{}", "-".repeat(100));

    for kind in CheckKind::ALL {
        let addons = kind
            .required_addons()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let addons = if addons.is_empty() { "-".to_string() } else { addons };
        println!(
            "{:<20} {:<13} {:<10} {}",
            kind.name(),
            kind.scope().to_string(),
            addons,
            kind.description()
        );
    }

    println!();
    println!("{} check(s)", CheckKind::ALL.len());
    Ok(())
}
