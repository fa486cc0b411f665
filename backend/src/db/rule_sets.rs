use super::Db;
use crate::error::ApiError;
use chrono::{NaiveDate, Utc};
use common::model::rule_set::{Rule, RuleSet};
use common::requests::UpdateRuleRequest;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

const RULE_COLUMNS: &str = "rule_number, rule_title, rule_text, category, keywords, \
                            effective_start_date, effective_end_date";

fn rule_set_from_row(row: &Row<'_>) -> rusqlite::Result<RuleSet> {
    Ok(RuleSet {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        is_active: row.get::<_, i64>(3)? != 0,
        created_at: row.get(4)?,
        rules: Vec::new(),
    })
}

/// Expects `id` followed by `RULE_COLUMNS`.
fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<Rule> {
    let keywords: String = row.get(5)?;
    Ok(Rule {
        id: row.get(0)?,
        rule_number: row.get(1)?,
        rule_title: row.get(2)?,
        rule_text: row.get(3)?,
        category: row.get(4)?,
        // Column is always written by `add_rules`; tolerate hand-edited rows.
        keywords: serde_json::from_str(&keywords).unwrap_or_default(),
        effective_start_date: row.get(6)?,
        effective_end_date: row.get(7)?,
    })
}

fn normalise_keywords(keywords: &[String]) -> Result<String, ApiError> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    serde_json::to_string(&keywords).map_err(|e| ApiError::Internal(e.to_string()))
}

fn find_rule(conn: &Connection, rule_set_id: i64, rule_id: i64) -> Result<Option<Rule>, ApiError> {
    let rule = conn
        .query_row(
            &format!("SELECT id, {RULE_COLUMNS} FROM rules WHERE id = ?1 AND rule_set_id = ?2"),
            params![rule_id, rule_set_id],
            rule_from_row,
        )
        .optional()?;
    Ok(rule)
}

impl Db {
    pub fn create_rule_set(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<RuleSet, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation(
                "Rule set name must not be empty".to_string(),
            ));
        }
        let conn = self.conn()?;
        let created_at = Utc::now();
        let inserted = conn.execute(
            "INSERT INTO rule_sets (name, description, is_active, created_at) VALUES (?1, ?2, 1, ?3)",
            params![name, description, created_at],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(ApiError::Validation(format!(
                    "A rule set named '{}' already exists",
                    name
                )));
            }
            Err(e) => return Err(e.into()),
        }
        Ok(RuleSet {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            is_active: true,
            created_at,
            rules: Vec::new(),
        })
    }

    /// Active rule sets, newest first, without their rules.
    pub fn list_rule_sets(&self) -> Result<Vec<RuleSet>, ApiError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, is_active, created_at FROM rule_sets \
             WHERE is_active = 1 ORDER BY created_at DESC, id DESC",
        )?;
        let sets = stmt
            .query_map([], rule_set_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sets)
    }

    /// A rule set with its current rules, active or not.
    pub fn get_rule_set(&self, id: i64) -> Result<Option<RuleSet>, ApiError> {
        let found = {
            let conn = self.conn()?;
            conn.query_row(
                "SELECT id, name, description, is_active, created_at FROM rule_sets WHERE id = ?1",
                params![id],
                rule_set_from_row,
            )
            .optional()?
        };
        match found {
            Some(mut set) => {
                set.rules = self.rule_catalog(id, None)?;
                Ok(Some(set))
            }
            None => Ok(None),
        }
    }

    pub fn add_rules(&self, rule_set_id: i64, rules: &[Rule]) -> Result<usize, ApiError> {
        if rules.iter().any(|r| r.rule_number.trim().is_empty()) {
            return Err(ApiError::Validation(
                "Every rule needs a rule_number".to_string(),
            ));
        }
        let mut conn = self.conn()?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM rule_sets WHERE id = ?1",
                params![rule_set_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(ApiError::NotFound(format!(
                "Rule set {} not found",
                rule_set_id
            )));
        }

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO rules (rule_set_id, {RULE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ))?;
            for rule in rules {
                let keywords = normalise_keywords(&rule.keywords)?;
                stmt.execute(params![
                    rule_set_id,
                    rule.rule_number.trim(),
                    rule.rule_title,
                    rule.rule_text,
                    rule.category,
                    keywords,
                    rule.effective_start_date,
                    rule.effective_end_date,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rules.len())
    }

    /// Applies the present fields of `update` to one rule of a set. `None`
    /// when the rule does not exist in that set.
    pub fn update_rule(
        &self,
        rule_set_id: i64,
        rule_id: i64,
        update: &UpdateRuleRequest,
    ) -> Result<Option<Rule>, ApiError> {
        if update.rule_title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ApiError::Validation(
                "Rule title must not be empty".to_string(),
            ));
        }
        let conn = self.conn()?;
        let Some(mut rule) = find_rule(&conn, rule_set_id, rule_id)? else {
            return Ok(None);
        };
        if let Some(title) = &update.rule_title {
            rule.rule_title = title.trim().to_string();
        }
        if let Some(text) = &update.rule_text {
            rule.rule_text = text.clone();
        }
        if let Some(category) = &update.category {
            rule.category = Some(category.clone());
        }
        let keywords = normalise_keywords(update.keywords.as_ref().unwrap_or(&rule.keywords))?;
        conn.execute(
            "UPDATE rules SET rule_title = ?1, rule_text = ?2, category = ?3, keywords = ?4 \
             WHERE id = ?5",
            params![rule.rule_title, rule.rule_text, rule.category, keywords, rule_id],
        )?;
        find_rule(&conn, rule_set_id, rule_id)
    }

    pub fn delete_rule(&self, rule_set_id: i64, rule_id: i64) -> Result<bool, ApiError> {
        let deleted = self.conn()?.execute(
            "DELETE FROM rules WHERE id = ?1 AND rule_set_id = ?2",
            params![rule_id, rule_set_id],
        )?;
        Ok(deleted > 0)
    }

    /// Marks a rule set inactive. Jobs already running keep their catalog.
    pub fn deactivate_rule_set(&self, id: i64) -> Result<bool, ApiError> {
        let changed = self.conn()?.execute(
            "UPDATE rule_sets SET is_active = 0 WHERE id = ?1 AND is_active = 1",
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// Rules used to analyse a document.
    ///
    /// With a date: rules that started on or before it and had not ended.
    /// Without: only rules that have no end date.
    pub fn rule_catalog(
        &self,
        rule_set_id: i64,
        effective_date: Option<NaiveDate>,
    ) -> Result<Vec<Rule>, ApiError> {
        let conn = self.conn()?;
        let rules = match effective_date {
            Some(date) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, {RULE_COLUMNS} FROM rules WHERE rule_set_id = ?1 \
                     AND (effective_start_date IS NULL OR effective_start_date <= ?2) \
                     AND (effective_end_date IS NULL OR effective_end_date > ?2) \
                     ORDER BY id"
                ))?;
                let rows = stmt.query_map(params![rule_set_id, date], rule_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, {RULE_COLUMNS} FROM rules WHERE rule_set_id = ?1 \
                     AND effective_end_date IS NULL ORDER BY id"
                ))?;
                let rows = stmt.query_map(params![rule_set_id], rule_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(rules)
    }
}
