//! Per-paragraph rule evaluation.
//!
//! The worker only depends on `ParagraphAnalyzer`; the engine behind it
//! (keyword matching here, an LLM service in larger deployments) is swapped
//! in `main.rs`.

use common::model::issue::{Issue, IssueType, Severity};
use common::model::rule_set::Rule;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Timeouts, rate limits and other failures worth another attempt.
    #[error("transient: {0}")]
    Transient(String),
    /// The engine rejected the paragraph; retrying will not help.
    #[error("{0}")]
    Rejected(String),
}

impl AnalyzerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalyzerError::Transient(_))
    }
}

/// What an analyzer found for one paragraph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Findings {
    pub applicable_rules: Vec<String>,
    pub issues: Vec<Issue>,
}

/// Judges one paragraph against the rule catalog of its job.
///
/// Called from rayon worker threads, so implementations must be thread-safe
/// and should not block on async I/O.
pub trait ParagraphAnalyzer: Send + Sync {
    fn analyze(&self, paragraph: &str, catalog: &[Rule]) -> Result<Findings, AnalyzerError>;
}

/// Minimum word length used when a rule has no keywords and terms are taken
/// from its title.
const TITLE_TERM_MIN_CHARS: usize = 5;
const EXCERPT_CHARS: usize = 200;

/// Deterministic analyzer that matches rule keywords against the paragraph.
///
/// A rule applies when at least one of its terms occurs. Paragraphs that
/// mention every term are confirmed compliant; partial coverage is reported
/// as inadequate, `low` when at least half the terms are covered and
/// `medium` otherwise.
#[derive(Debug, Default, Clone)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    fn terms(rule: &Rule) -> Vec<String> {
        if !rule.keywords.is_empty() {
            return rule.keywords.iter().map(|k| k.to_lowercase()).collect();
        }
        rule.rule_title
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= TITLE_TERM_MIN_CHARS)
            .map(str::to_lowercase)
            .collect()
    }
}

fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}

impl ParagraphAnalyzer for KeywordAnalyzer {
    fn analyze(&self, paragraph: &str, catalog: &[Rule]) -> Result<Findings, AnalyzerError> {
        let haystack = paragraph.to_lowercase();
        let mut findings = Findings::default();

        for rule in catalog {
            let terms = Self::terms(rule);
            let (matched, missing): (Vec<&String>, Vec<&String>) =
                terms.iter().partition(|t| haystack.contains(t.as_str()));
            if matched.is_empty() {
                continue;
            }
            findings.applicable_rules.push(rule.rule_number.clone());

            let issue = if missing.is_empty() {
                Issue {
                    rule_number: rule.rule_number.clone(),
                    rule_title: rule.rule_title.clone(),
                    severity: Severity::Success,
                    issue_type: IssueType::Compliant,
                    description: format!(
                        "Paragraph addresses every requirement of rule {}.",
                        rule.rule_number
                    ),
                    current_text: None,
                    required_text: None,
                    suggested_fix: None,
                }
            } else {
                let missing: Vec<&str> = missing.iter().map(|t| t.as_str()).collect();
                let severity = if matched.len() * 2 >= terms.len() {
                    Severity::Low
                } else {
                    Severity::Medium
                };
                Issue {
                    rule_number: rule.rule_number.clone(),
                    rule_title: rule.rule_title.clone(),
                    severity,
                    issue_type: IssueType::Inadequate,
                    description: format!(
                        "Paragraph touches on rule {} ({}) but does not address: {}.",
                        rule.rule_number,
                        rule.rule_title,
                        missing.join(", ")
                    ),
                    current_text: Some(excerpt(paragraph)),
                    required_text: (!rule.rule_text.trim().is_empty())
                        .then(|| excerpt(rule.rule_text.trim())),
                    suggested_fix: Some(format!(
                        "Add language covering {}.",
                        missing.join(", ")
                    )),
                }
            };
            findings.issues.push(issue);
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(number: &str, title: &str, keywords: &[&str]) -> Rule {
        Rule {
            id: None,
            rule_number: number.to_string(),
            rule_title: title.to_string(),
            rule_text: "Members shall preserve records for six years.".to_string(),
            category: None,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            effective_start_date: None,
            effective_end_date: None,
        }
    }

    #[test]
    fn full_coverage_is_compliant() {
        let catalog = [rule("4511", "Books and Records", &["records", "six years"])];
        let findings = KeywordAnalyzer
            .analyze("The firm keeps Records for six years.", &catalog)
            .unwrap();
        assert_eq!(findings.applicable_rules, vec!["4511"]);
        assert_eq!(findings.issues[0].severity, Severity::Success);
        assert_eq!(findings.issues[0].issue_type, IssueType::Compliant);
    }

    #[test]
    fn partial_coverage_grades_by_share_of_terms() {
        let catalog = [
            rule("2210", "Communications", &["fair", "balanced"]),
            rule("2111", "Suitability", &["suitable", "risk", "objectives"]),
        ];
        let findings = KeywordAnalyzer
            .analyze("Our fair statements carry some risk.", &catalog)
            .unwrap();
        assert_eq!(findings.applicable_rules, vec!["2210", "2111"]);
        assert_eq!(findings.issues[0].severity, Severity::Low);
        assert_eq!(findings.issues[1].severity, Severity::Medium);
        let fix = findings.issues[1].suggested_fix.as_deref().unwrap();
        assert!(fix.contains("suitable") && fix.contains("objectives"));
    }

    #[test]
    fn unrelated_paragraph_has_no_findings() {
        let catalog = [rule("3110", "Supervision", &["supervisory"])];
        let findings = KeywordAnalyzer
            .analyze("The lease term is twelve months.", &catalog)
            .unwrap();
        assert_eq!(findings, Findings::default());
    }

    #[test]
    fn title_words_stand_in_for_missing_keywords() {
        let catalog = [rule("3240", "Borrowing From Customers", &[])];
        let findings = KeywordAnalyzer
            .analyze("No borrowing arrangements with customers are permitted.", &catalog)
            .unwrap();
        assert_eq!(findings.issues[0].severity, Severity::Success);
    }
}
