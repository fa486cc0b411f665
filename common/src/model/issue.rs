use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a finding is.
///
/// Variants are declared from least to most serious so the derived `Ord`
/// gives `Success < Low < Medium < High < Critical`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A compliance confirmation rather than a problem.
    Success,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// True for anything that needs remediation.
    pub fn is_risk(self) -> bool {
        self != Severity::Success
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Compliant,
    Missing,
    Inadequate,
    Outdated,
    Violation,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Compliant => "compliant",
            IssueType::Missing => "missing",
            IssueType::Inadequate => "inadequate",
            IssueType::Outdated => "outdated",
            IssueType::Violation => "violation",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding for one paragraph against one rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub rule_number: String,
    pub rule_title: String,
    pub severity: Severity,
    pub issue_type: IssueType,
    pub description: String,
    /// What the paragraph currently says, for the remediation preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_text: Option<String>,
    /// What the rule expects the paragraph to say.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}
