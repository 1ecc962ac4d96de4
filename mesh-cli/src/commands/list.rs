//! List built-in scenarios.

use anyhow::Result;
use mesh_harness::scenario;

/// Run the list command.
pub fn run() -> Result<()> {
    for scenario in scenario::catalog() {
        println!("{:<22} {}", scenario.name, scenario.description);
    }
    Ok(())
}
