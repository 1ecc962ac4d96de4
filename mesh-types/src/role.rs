//! Thread mesh roles.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Role a Thread device reports through `ot-ctl state`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThreadRole {
    /// Thread stack not running.
    Disabled,
    /// Running but not attached to a partition.
    Detached,
    /// Attached as a child of a router.
    Child,
    /// Active router.
    Router,
    /// Partition leader.
    Leader,
    /// Anything the CLI printed that is not a known role.
    Other(String),
}

impl ThreadRole {
    /// Parse the first whitespace-separated token of `ot-ctl state` output.
    ///
    /// Empty output maps to `Other("")`.
    pub fn from_state_output(output: &str) -> Self {
        let token = output.split_whitespace().next().unwrap_or("");
        token.parse().unwrap_or_else(|_| ThreadRole::Other(token.into()))
    }

    /// Name as printed by the Thread CLI.
    pub fn as_str(&self) -> &str {
        match self {
            ThreadRole::Disabled => "disabled",
            ThreadRole::Detached => "detached",
            ThreadRole::Child => "child",
            ThreadRole::Router => "router",
            ThreadRole::Leader => "leader",
            ThreadRole::Other(raw) => raw,
        }
    }
}

impl FromStr for ThreadRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(ThreadRole::Disabled),
            "detached" => Ok(ThreadRole::Detached),
            "child" => Ok(ThreadRole::Child),
            "router" => Ok(ThreadRole::Router),
            "leader" => Ok(ThreadRole::Leader),
            other => Err(format!("unknown thread role: {}", other)),
        }
    }
}

impl fmt::Display for ThreadRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles a wait accepts and how long it may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleExpectation {
    /// Accepted roles.
    pub roles: Vec<ThreadRole>,
    /// Upper bound on the wait.
    pub timeout: Duration,
}

impl RoleExpectation {
    /// Expect a single role.
    pub fn one(role: ThreadRole, timeout: Duration) -> Self {
        Self {
            roles: vec![role],
            timeout,
        }
    }

    /// Expect any of several roles.
    pub fn any_of(roles: impl IntoIterator<Item = ThreadRole>, timeout: Duration) -> Self {
        Self {
            roles: roles.into_iter().collect(),
            timeout,
        }
    }

    /// True when `role` satisfies the expectation.
    pub fn accepts(&self, role: &ThreadRole) -> bool {
        self.roles.contains(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_token() {
        assert_eq!(ThreadRole::from_state_output("leader\nDone\n"), ThreadRole::Leader);
        assert_eq!(ThreadRole::from_state_output("  child  "), ThreadRole::Child);
        assert_eq!(
            ThreadRole::from_state_output("Error 13: InvalidState"),
            ThreadRole::Other("Error".into())
        );
        assert_eq!(ThreadRole::from_state_output(""), ThreadRole::Other(String::new()));
    }

    #[test]
    fn display_round_trips_known_roles() {
        for role in [
            ThreadRole::Disabled,
            ThreadRole::Detached,
            ThreadRole::Child,
            ThreadRole::Router,
            ThreadRole::Leader,
        ] {
            assert_eq!(role.to_string().parse::<ThreadRole>().unwrap(), role);
        }
    }

    #[test]
    fn expectation_accepts_members_only() {
        let exp = RoleExpectation::any_of(
            [ThreadRole::Child, ThreadRole::Router],
            Duration::from_secs(2),
        );
        assert!(exp.accepts(&ThreadRole::Router));
        assert!(!exp.accepts(&ThreadRole::Leader));
        assert!(!exp.accepts(&ThreadRole::Other("router?".into())));
    }
}
