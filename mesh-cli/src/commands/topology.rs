//! Describe a scenario's topology.

use anyhow::{Context, Result};
use mesh_harness::scenario::{self, Scenario};
use mesh_types::RoleType;

/// Run the topology command.
pub fn run(name: &str, json: bool) -> Result<()> {
    let scenario = scenario::find(name).with_context(|| format!("Unknown scenario: {}", name))?;

    if json {
        let body = serde_json::to_string_pretty(&scenario.topology)
            .context("Failed to serialize topology")?;
        println!("{}", body);
        return Ok(());
    }

    print!("{}", describe(&scenario));
    Ok(())
}

/// Human-readable summary of a scenario.
fn describe(scenario: &Scenario) -> String {
    let mut out = format!("=== {} ===\n{}\n\nDevices:\n", scenario.name, scenario.description);
    for (name, spec) in scenario.topology.iter() {
        let capabilities: Vec<String> = spec.capabilities.iter().map(|c| format!("{:?}", c)).collect();
        out.push_str(&format!(
            "  {:<8} {:<14} {:<20} [{}]{}\n",
            name,
            spec.role_type,
            spec.base_image,
            capabilities.join(", "),
            if spec.rcp_mode { " rcp" } else { "" }
        ));
    }

    out.push_str("\nSteps:\n");
    out.push_str("  reset Thread state of every end-device\n");
    if let Some(plan) = &scenario.formation {
        out.push_str(&format!(
            "  wait {:?} for {:?} on the {}\n",
            plan.ready_timeout,
            plan.ready_marker,
            RoleType::BorderRouter
        ));
        out.push_str(&format!(
            "  form network {:?}, expect {} within {:?}\n",
            plan.dataset.network_name, plan.expected_role, plan.timeout
        ));
    }
    out.push_str(&format!(
        "  run {} {} on the controller\n",
        scenario.test.interpreter.as_deref().unwrap_or(""),
        scenario.test.program
    ));
    let roles: Vec<&str> = scenario.final_roles.roles.iter().map(|r| r.as_str()).collect();
    out.push_str(&format!(
        "  expect end-devices in [{}] within {:?}\n",
        roles.join(", "),
        scenario.final_roles.timeout
    ));
    if !scenario.expected_reports.is_empty() {
        out.push_str(&format!(
            "  verify {} attribute reports\n",
            scenario.expected_reports.len()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_basic_cluster() {
        let text = describe(&scenario::find("basic-cluster-attrs").unwrap());
        assert!(text.contains("device1"));
        assert!(text.contains("CHIPEndDevice"));
        assert!(text.contains("verify 10 attribute reports"));
        assert!(!text.contains("form network"));
    }

    #[test]
    fn describe_service_discovery() {
        let text = describe(&scenario::find("service-discovery").unwrap());
        assert!(text.contains("Border-Router"));
        assert!(text.contains("form network \"OpenThreadDemo\", expect leader within 15s"));
        assert!(text.contains("[child, router]"));
    }

    #[test]
    fn unknown_scenario_is_error() {
        assert!(run("nope", true).is_err());
    }
}
