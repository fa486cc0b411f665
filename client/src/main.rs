use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use common::model::analysis::AnalysisSnapshot;
use common::requests::{AnalyzeDocumentRequest, ExportFormat, HistoryQuery};
use compliance_client::api::{HttpJobApi, JobApi};
use compliance_client::error::ClientError;
use compliance_client::poller::{watch, PollOutcome, ProgressUpdate, WatchError};
use compliance_client::preferences::{FilePreferenceStore, PreferenceStore, Preferences};
use compliance_client::progress::{EtaTuning, PollSchedule};
use env_logger::Env;
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "compliance-watch", version, about = "Submit documents for compliance analysis and follow their progress")]
struct Cli {
    /// Base URL of the analysis service.
    #[arg(long, env = "COMPLIANCE_API_URL", default_value = "http://127.0.0.1:8080")]
    api_url: String,

    /// Bearer token forwarded to the service.
    #[arg(long, env = "COMPLIANCE_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// User id sent as `X-User-Id`.
    #[arg(long, env = "COMPLIANCE_USER")]
    user: Option<String>,

    /// Where the last used rule set is remembered.
    #[arg(long, env = "COMPLIANCE_PREFS", default_value = ".compliance-watch.json")]
    prefs: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a text file and follow the analysis.
    Submit {
        file: PathBuf,
        /// Defaults to the rule set of the previous submission.
        #[arg(long)]
        rule_set: Option<i64>,
        /// Analyse against rules in force on this date (YYYY-MM-DD).
        #[arg(long)]
        effective_date: Option<NaiveDate>,
        /// Ignore cached results of an identical submission.
        #[arg(long)]
        force_new: bool,
        /// Print the session id and return without polling.
        #[arg(long)]
        no_watch: bool,
    },
    /// Follow a running analysis.
    Watch { session_id: String },
    /// Stop a running analysis, keeping its partial results.
    Stop { session_id: String },
    /// Download a report of a completed analysis.
    Export {
        session_id: String,
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List your past analyses.
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// List active rule sets.
    RuleSets,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no rule set given and none remembered; pass --rule-set")]
    NoRuleSet,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(Env::default().default_filter_or("warn"));
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let api = HttpJobApi::new(&cli.api_url, cli.token, cli.user);
    let prefs = FilePreferenceStore::new(cli.prefs);

    match cli.command {
        Command::Submit {
            file,
            rule_set,
            effective_date,
            force_new,
            no_watch,
        } => {
            let saved = prefs.load().unwrap_or_else(|e| {
                warn!("Ignoring unreadable preferences: {}", e);
                Preferences::default()
            });
            let rule_set_id = rule_set
                .or(saved.last_rule_set_id)
                .ok_or(CliError::NoRuleSet)?;
            let document_text = tokio::fs::read_to_string(&file).await?;

            let response = api
                .submit(&AnalyzeDocumentRequest {
                    document_text,
                    rule_set_id,
                    effective_date,
                    force_new,
                })
                .await?;
            prefs.save(&Preferences {
                last_rule_set_id: Some(rule_set_id),
            })?;
            info!("Submitted {} as {}", file.display(), response.session_id);
            println!("{} ({})", response.session_id, response.message);

            if no_watch {
                return Ok(ExitCode::SUCCESS);
            }
            follow(&api, &response.session_id).await
        }
        Command::Watch { session_id } => follow(&api, &session_id).await,
        Command::Stop { session_id } => {
            let response = api.stop(&session_id).await?;
            println!("{}", response.message);
            Ok(ExitCode::SUCCESS)
        }
        Command::Export {
            session_id,
            format,
            output,
        } => {
            let bytes = api.export(&session_id, format).await?;
            let path = output.unwrap_or_else(|| {
                PathBuf::from(format!("compliance_analysis_{}.{}", session_id, format))
            });
            tokio::fs::write(&path, &bytes).await?;
            println!("Wrote {} bytes to {}", bytes.len(), path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::History { limit, offset } => {
            let page = api.history(&HistoryQuery { limit, offset }).await?;
            for entry in &page.analyses {
                println!(
                    "{}  {:<10}  {}  {:>4} issues  {}",
                    entry.session_id,
                    entry.status,
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.issues_count,
                    entry.title
                );
            }
            println!(
                "{} of {} analyses",
                page.analyses.len().min(page.total),
                page.total
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::RuleSets => {
            for set in api.rule_sets().await? {
                println!(
                    "{:>4}  {}  {}",
                    set.id,
                    set.name,
                    set.description.unwrap_or_default()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_progress(update: ProgressUpdate) {
    let eta = update
        .eta
        .map(|eta| format!(", {} remaining", eta.label()))
        .unwrap_or_default();
    println!(
        "[{:>5.1}%] {} {}/{} paragraphs{}",
        update.percent,
        update.snapshot.status,
        update.visible_processed,
        update.snapshot.total_paragraphs,
        eta
    );
}

fn print_summary(snapshot: &AnalysisSnapshot) {
    let summary = snapshot.risk_summary();
    println!(
        "{} paragraphs: {} compliant, {} critical, {} high, {} medium, {} low",
        snapshot.paragraphs.len(),
        summary.compliant_paragraphs,
        summary.critical,
        summary.high,
        summary.medium,
        summary.low
    );
    if summary.failed_paragraphs > 0 {
        println!(
            "{} paragraphs could not be analysed; see the export for details.",
            summary.failed_paragraphs
        );
    }
}

async fn follow(api: &HttpJobApi, session_id: &str) -> Result<ExitCode, CliError> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = watch(
        api,
        session_id,
        &PollSchedule::default(),
        EtaTuning::default(),
        &cancel,
        print_progress,
    )
    .await?;

    match outcome {
        PollOutcome::Completed(snapshot) => {
            print_summary(&snapshot);
            Ok(ExitCode::SUCCESS)
        }
        PollOutcome::Stopped(snapshot) => {
            println!("Analysis stopped; partial results kept.");
            print_summary(&snapshot);
            Ok(ExitCode::SUCCESS)
        }
        PollOutcome::Failed(_) => {
            eprintln!("Analysis failed. Start a new analysis or try again later.");
            Ok(ExitCode::FAILURE)
        }
        PollOutcome::Cancelled => {
            println!(
                "Stopped watching; the analysis continues. Resume with `compliance-watch watch {}`.",
                session_id
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
