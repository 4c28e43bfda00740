//! Override variables and the values recovered from them.
//!
//! Builds started for a pull request carry the pull request identity as
//! override variables. The build runner echoes them back in the build's
//! state-change events, which is how a finished build is correlated with
//! its pull request without any stored mapping.

use serde::{Deserialize, Serialize};

pub const PULL_REQUEST_ID: &str = "FLOW_PULL_REQUEST_ID";
pub const PULL_REQUEST_SRC_COMMIT: &str = "FLOW_PULL_REQUEST_SRC_COMMIT";
pub const PULL_REQUEST_DST_COMMIT: &str = "FLOW_PULL_REQUEST_DST_COMMIT";
pub const BRANCH: &str = "FLOW_BRANCH";
pub const TAG: &str = "FLOW_TAG";
pub const SCHEDULE: &str = "FLOW_SCHEDULE";

/// How the build runner resolves a variable's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableKind {
    #[default]
    Plaintext,
    ParameterStore,
    SecretsManager,
}

/// A named value injected into a build's environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideVariable {
    pub name: String,
    pub value: String,
    #[serde(rename = "type", default)]
    pub kind: VariableKind,
}

impl OverrideVariable {
    pub fn plaintext(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: VariableKind::Plaintext,
        }
    }
}

/// Value of the first variable named `name`.
pub fn find_variable<'a>(variables: &'a [OverrideVariable], name: &str) -> Option<&'a str> {
    variables
        .iter()
        .find(|variable| variable.name == name)
        .map(|variable| variable.value.as_str())
}

/// Pull request a build was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub id: String,
    pub source_commit: String,
    pub destination_commit: String,
}

impl PullRequestRef {
    /// Recover the pull request from echoed variables. All three must be present.
    pub fn from_variables(variables: &[OverrideVariable]) -> Option<Self> {
        Some(Self {
            id: find_variable(variables, PULL_REQUEST_ID)?.to_string(),
            source_commit: find_variable(variables, PULL_REQUEST_SRC_COMMIT)?.to_string(),
            destination_commit: find_variable(variables, PULL_REQUEST_DST_COMMIT)?.to_string(),
        })
    }

    /// Variables that let a build be correlated back to this pull request.
    pub fn to_variables(&self) -> Vec<OverrideVariable> {
        vec![
            OverrideVariable::plaintext(PULL_REQUEST_ID, &self.id),
            OverrideVariable::plaintext(PULL_REQUEST_SRC_COMMIT, &self.source_commit),
            OverrideVariable::plaintext(PULL_REQUEST_DST_COMMIT, &self.destination_commit),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables() -> Vec<OverrideVariable> {
        vec![
            OverrideVariable::plaintext("CODEBUILD_CONFIG", "x"),
            OverrideVariable::plaintext(PULL_REQUEST_ID, "12"),
            OverrideVariable::plaintext(PULL_REQUEST_SRC_COMMIT, "src"),
            OverrideVariable::plaintext(PULL_REQUEST_DST_COMMIT, "dst"),
            OverrideVariable::plaintext(PULL_REQUEST_ID, "99"),
        ]
    }

    #[test]
    fn find_variable_returns_first_exact_match() {
        let vars = variables();

        assert_eq!(find_variable(&vars, PULL_REQUEST_ID), Some("12"));
        assert_eq!(find_variable(&vars, "flow_pull_request_id"), None);
        assert_eq!(find_variable(&vars, "MISSING"), None);
    }

    #[test]
    fn pull_request_ref_needs_all_three_variables() {
        let vars = variables();
        assert_eq!(
            PullRequestRef::from_variables(&vars),
            Some(PullRequestRef {
                id: "12".into(),
                source_commit: "src".into(),
                destination_commit: "dst".into(),
            })
        );

        for missing in [PULL_REQUEST_ID, PULL_REQUEST_SRC_COMMIT, PULL_REQUEST_DST_COMMIT] {
            let partial: Vec<_> = vars.iter().filter(|v| v.name != missing).cloned().collect();
            assert_eq!(PullRequestRef::from_variables(&partial), None, "{missing}");
        }
    }

    #[test]
    fn variable_type_defaults_to_plaintext() {
        let variable: OverrideVariable =
            serde_json::from_value(serde_json::json!({ "name": "A", "value": "b" })).unwrap();
        assert_eq!(variable.kind, VariableKind::Plaintext);

        let json = serde_json::to_value(OverrideVariable::plaintext("A", "b")).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "A", "value": "b", "type": "PLAINTEXT" }));
    }
}
