use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an analysis job.
///
/// `queued → processing → {completed | failed | stopped}`. `processing` may
/// repeat on every progress write; nothing leaves a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Registered, waiting for the worker to claim it.
    Queued,
    /// The worker is segmenting or analysing paragraphs.
    Processing,
    /// Every paragraph has been analysed.
    Completed,
    /// The worker gave up; the cause stays server-side.
    Failed,
    /// Someone asked the job to stop.
    Stopped,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Queued, Processing) | (Queued, Failed) | (Queued, Stopped) => true,
            (Processing, Processing)
            | (Processing, Completed)
            | (Processing, Failed)
            | (Processing, Stopped) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_exit() {
        let all = [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Stopped,
        ];
        for from in all.into_iter().filter(|s| s.is_terminal()) {
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn processing_can_repeat_but_queued_cannot_complete_directly() {
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Stopped).unwrap();
        assert_eq!(json, "\"stopped\"");
        let back: JobStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(back, JobStatus::Processing);
    }
}
