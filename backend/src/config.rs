use std::path::PathBuf;
use std::str::FromStr;

/// Server settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite file holding rule sets. `:memory:` keeps everything in RAM.
    pub database_path: String,
    /// Directory with the TTF family used for PDF exports.
    pub fonts_dir: PathBuf,
    pub json_limit: usize,
    /// Paragraphs analysed in parallel before progress is written.
    pub batch_size: usize,
    /// Shorter paragraphs are not worth analysing.
    pub min_paragraph_chars: usize,
    pub min_document_chars: usize,
    pub max_document_chars: usize,
    pub cache_enabled: bool,
    pub cache_ttl_hours: u32,
    /// Finished analyses are forgotten this long after they end. `0` keeps
    /// them until deleted.
    pub job_retention_hours: u32,
    /// Tries per paragraph when the analyzer reports a transient error.
    pub analyzer_attempts: u32,
    /// Wait before the first retry; later retries wait proportionally longer.
    pub retry_backoff_ms: u64,
    /// Paragraphs of a batch not started within this time are marked failed.
    pub batch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: "compliance.sqlite".to_string(),
            fonts_dir: PathBuf::from("./fonts"),
            json_limit: 10 * 1024 * 1024,
            batch_size: 20,
            min_paragraph_chars: 50,
            min_document_chars: 100,
            max_document_chars: 500_000,
            cache_enabled: true,
            cache_ttl_hours: 24,
            job_retention_hours: 168,
            analyzer_attempts: 2,
            retry_backoff_ms: 3000,
            batch_timeout_secs: 90,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads `COMPLIANCE_*` variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or unparsable keys keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        let lookup = &lookup;

        Config {
            host: lookup("COMPLIANCE_HOST").unwrap_or(defaults.host),
            port: parse_var(lookup, "COMPLIANCE_PORT").unwrap_or(defaults.port),
            database_path: lookup("COMPLIANCE_DB_PATH").unwrap_or(defaults.database_path),
            fonts_dir: lookup("COMPLIANCE_FONTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.fonts_dir),
            json_limit: parse_var(lookup, "COMPLIANCE_JSON_LIMIT")
                .unwrap_or(defaults.json_limit),
            batch_size: parse_var(lookup, "COMPLIANCE_BATCH_SIZE")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.batch_size),
            min_paragraph_chars: parse_var(lookup, "COMPLIANCE_MIN_PARAGRAPH_CHARS")
                .unwrap_or(defaults.min_paragraph_chars),
            min_document_chars: defaults.min_document_chars,
            max_document_chars: parse_var(lookup, "COMPLIANCE_MAX_DOCUMENT_CHARS")
                .unwrap_or(defaults.max_document_chars),
            cache_enabled: match lookup("COMPLIANCE_CACHE_ENABLED").as_deref() {
                Some("true") | Some("1") => true,
                Some("false") | Some("0") => false,
                _ => defaults.cache_enabled,
            },
            cache_ttl_hours: parse_var(lookup, "COMPLIANCE_CACHE_TTL_HOURS")
                .unwrap_or(defaults.cache_ttl_hours),
            job_retention_hours: parse_var(lookup, "COMPLIANCE_JOB_RETENTION_HOURS")
                .unwrap_or(defaults.job_retention_hours),
            analyzer_attempts: parse_var(lookup, "COMPLIANCE_ANALYZER_ATTEMPTS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.analyzer_attempts),
            retry_backoff_ms: parse_var(lookup, "COMPLIANCE_RETRY_BACKOFF_MS")
                .unwrap_or(defaults.retry_backoff_ms),
            batch_timeout_secs: parse_var(lookup, "COMPLIANCE_BATCH_TIMEOUT_SECS")
                .filter(|n: &u64| *n > 0)
                .unwrap_or(defaults.batch_timeout_secs),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn overrides_and_defaults() {
        let env: HashMap<&str, &str> = [
            ("COMPLIANCE_PORT", "9090"),
            ("COMPLIANCE_BATCH_SIZE", "0"),
            ("COMPLIANCE_CACHE_ENABLED", "false"),
            ("COMPLIANCE_MAX_DOCUMENT_CHARS", "not-a-number"),
            ("COMPLIANCE_JOB_RETENTION_HOURS", "0"),
            ("COMPLIANCE_ANALYZER_ATTEMPTS", "0"),
        ]
        .into_iter()
        .collect();
        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.port, 9090);
        assert_eq!(config.batch_size, 20, "zero batch size falls back");
        assert!(!config.cache_enabled);
        assert_eq!(config.max_document_chars, 500_000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.job_retention_hours, 0);
        assert_eq!(config.analyzer_attempts, 2, "at least one attempt");
        assert_eq!(config.batch_timeout_secs, 90);
    }
}
