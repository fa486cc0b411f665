use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A named, versioned collection of rules a document is checked against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Rules effective today (no end date). Empty in list responses.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Storage id; absent on rules that have not been saved yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub rule_number: String,
    pub rule_title: String,
    pub rule_text: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Lowercase terms the keyword analyzer looks for.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub effective_start_date: Option<NaiveDate>,
    /// Set once a rule has been superseded.
    #[serde(default)]
    pub effective_end_date: Option<NaiveDate>,
}

/// The lightweight view of a rule used for classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub rule_number: String,
    pub rule_title: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<&Rule> for CatalogEntry {
    fn from(rule: &Rule) -> Self {
        CatalogEntry {
            rule_number: rule.rule_number.clone(),
            rule_title: rule.rule_title.clone(),
            category: rule.category.clone(),
        }
    }
}

impl Rule {
    /// Whether the rule was in force on `date`: started on or before it and
    /// not yet ended.
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.effective_start_date.is_none_or(|start| start <= date)
            && self.effective_end_date.is_none_or(|end| end > date)
    }
}
