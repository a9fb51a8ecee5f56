//! Step, scenario and run reports.
//!
//! Reports serialize to JSON for machines and implement [`Display`] for the
//! terminal. A failed step carries its [`StepFailure`], including a snapshot of
//! the offending response when there was one.
//!
//! [`Display`]: std::fmt::Display

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::client::{HttpMethod, HttpResponse};
use crate::error::StepFailure;

/// A copy of a response kept for failure reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSnapshot {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute request URL.
    pub url: String,
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Response body.
    pub body: Value,
}

/// Lifecycle of a scenario execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    /// Not started.
    Pending,
    /// Steps are executing.
    Running,
    /// Every step passed.
    Passed,
    /// A step failed.
    Failed,
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScenarioState::Pending => "PENDING",
            ScenarioState::Running => "RUNNING",
            ScenarioState::Passed => "PASSED",
            ScenarioState::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// Result of a single step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step passed.
    Passed,
    /// The step failed.
    Failed {
        /// Why.
        failure: StepFailure,
    },
    /// An earlier step failed, so this one never ran.
    Skipped,
}

/// One request/response exchange, summarized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeSummary {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute request URL.
    pub url: String,
    /// Status code.
    pub status: u16,
    /// Round-trip time in milliseconds.
    pub elapsed_ms: u64,
}

impl From<&HttpResponse> for ExchangeSummary {
    fn from(response: &HttpResponse) -> Self {
        Self {
            method: response.method,
            url: response.url.clone(),
            status: response.status,
            elapsed_ms: millis(response.elapsed),
        }
    }
}

/// Report for one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// Zero-based position within the scenario.
    pub index: usize,
    /// Step name.
    pub name: String,
    /// Result.
    pub outcome: StepOutcome,
    /// Exchanges performed, one per iteration item.
    pub exchanges: Vec<ExchangeSummary>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl StepReport {
    /// A report for a step that never ran.
    pub fn skipped(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            outcome: StepOutcome::Skipped,
            exchanges: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Returns the failure, if the step failed.
    pub fn failure(&self) -> Option<&StepFailure> {
        match &self.outcome {
            StepOutcome::Failed { failure } => Some(failure),
            _ => None,
        }
    }

    /// Returns true if the step failed.
    pub fn is_failed(&self) -> bool {
        self.failure().is_some()
    }
}

/// Report for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Final state.
    pub state: ScenarioState,
    /// Per-step reports, in order.
    pub steps: Vec<StepReport>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// A pending report with no steps.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ScenarioState::Pending,
            steps: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Moves the scenario to `Running`.
    pub fn start(&mut self) {
        self.state = ScenarioState::Running;
    }

    /// Moves the scenario to its terminal state based on the step reports.
    pub fn finish(&mut self, elapsed: Duration) {
        self.state = if self.steps.iter().any(StepReport::is_failed) {
            ScenarioState::Failed
        } else {
            ScenarioState::Passed
        };
        self.duration_ms = millis(elapsed);
    }

    /// Returns true if the scenario passed.
    pub fn passed(&self) -> bool {
        self.state == ScenarioState::Passed
    }

    /// Returns the first failed step, if any.
    pub fn failed_step(&self) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.is_failed())
    }
}

/// Pass/fail counts for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Scenarios executed.
    pub total: usize,
    /// Scenarios passed.
    pub passed: usize,
    /// Scenarios failed.
    pub failed: usize,
}

/// Report for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Base URL of the service under test.
    pub base_url: String,
    /// Scenario reports, in execution order.
    pub scenarios: Vec<ScenarioReport>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl RunReport {
    /// An empty report starting now.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            started_at: Utc::now(),
            base_url: base_url.into(),
            scenarios: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Counts passed and failed scenarios.
    pub fn summary(&self) -> RunSummary {
        let passed = self.scenarios.iter().filter(|s| s.passed()).count();
        RunSummary {
            total: self.scenarios.len(),
            passed,
            failed: self.scenarios.len() - passed,
        }
    }

    /// Returns true if every scenario passed.
    pub fn is_success(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    /// Renders the report as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run against {} started {}",
            self.base_url,
            self.started_at.to_rfc3339()
        )?;

        for scenario in &self.scenarios {
            writeln!(
                f,
                "\n[{}] {} ({} ms)",
                scenario.state, scenario.name, scenario.duration_ms
            )?;
            for step in &scenario.steps {
                match &step.outcome {
                    StepOutcome::Passed => {
                        writeln!(f, "  ok    {:>2} {}", step.index, step.name)?;
                    }
                    StepOutcome::Skipped => {
                        writeln!(f, "  skip  {:>2} {}", step.index, step.name)?;
                    }
                    StepOutcome::Failed { failure } => {
                        writeln!(f, "  FAIL  {:>2} {}: {}", step.index, step.name, failure)?;
                        if let Some(snapshot) = failure.snapshot() {
                            writeln!(
                                f,
                                "        {} {} -> {}",
                                snapshot.method, snapshot.url, snapshot.status
                            )?;
                            writeln!(f, "        body: {}", snapshot.body)?;
                        }
                    }
                }
            }
        }

        let summary = self.summary();
        write!(
            f,
            "\n{} scenario(s): {} passed, {} failed ({} ms)",
            summary.total, summary.passed, summary.failed, self.duration_ms
        )
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusSet;
    use serde_json::json;

    fn snapshot() -> ResponseSnapshot {
        ResponseSnapshot {
            method: HttpMethod::Post,
            url: "http://localhost:3000/664/posts".to_string(),
            status: 401,
            headers: BTreeMap::new(),
            body: json!("Unauthorized"),
        }
    }

    fn failed_scenario() -> ScenarioReport {
        let mut report = ScenarioReport::new("create post");
        report.start();
        report.steps.push(StepReport {
            index: 0,
            name: "create".to_string(),
            outcome: StepOutcome::Failed {
                failure: StepFailure::UnexpectedStatus {
                    status: 401,
                    accepted: StatusSet::exactly(201),
                    snapshot: Box::new(snapshot()),
                },
            },
            exchanges: Vec::new(),
            duration_ms: 3,
        });
        report.steps.push(StepReport::skipped(1, "read back"));
        report.finish(Duration::from_millis(5));
        report
    }

    #[test]
    fn test_scenario_state_transitions() {
        let mut report = ScenarioReport::new("empty");
        assert_eq!(report.state, ScenarioState::Pending);
        report.start();
        assert_eq!(report.state, ScenarioState::Running);
        report.finish(Duration::ZERO);
        assert!(report.passed());

        let failed = failed_scenario();
        assert_eq!(failed.state, ScenarioState::Failed);
        assert_eq!(failed.failed_step().map(|s| s.index), Some(0));
    }

    #[test]
    fn test_run_summary() {
        let mut run = RunReport::new("http://localhost:3000");
        let mut ok = ScenarioReport::new("ok");
        ok.finish(Duration::ZERO);
        run.scenarios.push(ok);
        run.scenarios.push(failed_scenario());

        assert_eq!(
            run.summary(),
            RunSummary {
                total: 2,
                passed: 1,
                failed: 1
            }
        );
        assert!(!run.is_success());
    }

    #[test]
    fn test_text_rendering() {
        let mut run = RunReport::new("http://localhost:3000");
        run.scenarios.push(failed_scenario());
        let text = run.to_string();
        assert!(text.contains("[FAILED] create post"));
        assert!(text.contains("FAIL   0 create: unexpected status 401 (accepted: {201})"));
        assert!(text.contains("skip   1 read back"));
        assert!(text.contains("1 scenario(s): 0 passed, 1 failed"));
    }

    #[test]
    fn test_json_rendering() {
        let mut run = RunReport::new("http://localhost:3000");
        run.scenarios.push(failed_scenario());
        let value: Value = serde_json::from_str(&run.to_json().unwrap()).unwrap();

        let step = &value["scenarios"][0]["steps"][0];
        assert_eq!(value["scenarios"][0]["state"], json!("failed"));
        assert_eq!(step["outcome"]["result"], json!("failed"));
        assert_eq!(step["outcome"]["failure"]["kind"], json!("unexpected_status"));
        assert_eq!(step["outcome"]["failure"]["accepted"], json!([201]));
        assert_eq!(step["outcome"]["failure"]["snapshot"]["status"], json!(401));
        assert_eq!(value["scenarios"][0]["steps"][1]["outcome"]["result"], json!("skipped"));
    }
}
