//! Scenario execution.
//!
//! [`ScenarioRunner`] executes the steps of one scenario strictly in order,
//! threading a fresh [`ScenarioContext`] through them. Before the first
//! request it checks that every fixture the scenario needs is either in the
//! store or persisted by an earlier step; otherwise the scenario fails with
//! `FixtureNotFound` and nothing is sent. For each step it then:
//!
//! 1. checks the step's requirements (fixtures exist, captured values exist)
//! 2. loads the bearer credential, if the request declares one
//! 3. for each iteration item (or once), draws generated values, renders the
//!    request and sends it
//! 4. rejects statuses outside the step's acceptable set
//! 5. evaluates every assertion and aggregates the mismatches
//! 6. applies captures, persisting them to fixtures where requested
//!
//! The first failing step marks the scenario `Failed`; every step after it is
//! reported as `Skipped`.
//!
//! [`TestRun`] runs a list of scenarios against one fixture store and
//! collects a [`RunReport`]. Fixtures the scenarios persist are removed when
//! the run starts, so nothing carries over from an earlier run.

use std::collections::BTreeSet;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::assertions::evaluate_all;
use crate::client::HttpClient;
use crate::context::ScenarioContext;
use crate::error::StepFailure;
use crate::fixtures::{FixtureStore, FixtureStoreExt};
use crate::generator::Generator;
use crate::report::{
    ExchangeSummary, RunReport, ScenarioReport, StepOutcome, StepReport, millis,
};
use crate::scenario::{Requirement, Scenario, Step};
use crate::status::StatusOutcome;
use crate::types::Credential;

/// Executes scenarios against a service.
///
/// The runner borrows its collaborators; the fixture store in particular is
/// owned by the caller and scoped to one run.
#[derive(Clone, Copy)]
pub struct ScenarioRunner<'a> {
    client: &'a HttpClient,
    fixtures: &'a dyn FixtureStore,
    generator: &'a dyn Generator,
}

impl<'a> ScenarioRunner<'a> {
    /// Creates a runner.
    pub fn new(
        client: &'a HttpClient,
        fixtures: &'a dyn FixtureStore,
        generator: &'a dyn Generator,
    ) -> Self {
        Self {
            client,
            fixtures,
            generator,
        }
    }

    /// Runs one scenario to completion.
    pub async fn run(&self, scenario: &Scenario) -> ScenarioReport {
        let started = Instant::now();
        let mut report = ScenarioReport::new(&scenario.name);
        report.start();
        info!(scenario = %scenario.name, steps = scenario.steps.len(), "Running scenario");

        let mut ctx = ScenarioContext::new();
        let mut failed = false;
        let unmet = self.unmet_fixture(scenario);

        for (index, step) in scenario.steps.iter().enumerate() {
            if failed {
                report.steps.push(StepReport::skipped(index, &step.name));
                continue;
            }

            let step_report = match unmet {
                Some((at, name)) if at == index => StepReport {
                    index,
                    name: step.name.clone(),
                    outcome: StepOutcome::Failed {
                        failure: StepFailure::FixtureNotFound {
                            name: name.to_string(),
                        },
                    },
                    exchanges: Vec::new(),
                    duration_ms: 0,
                },
                Some(_) => {
                    report.steps.push(StepReport::skipped(index, &step.name));
                    continue;
                }
                None => self.run_step(index, step, &mut ctx).await,
            };
            if let Some(failure) = step_report.failure() {
                warn!(
                    scenario = %scenario.name,
                    step = index,
                    name = %step.name,
                    fatal = failure.is_fatal(),
                    "Step failed: {failure}"
                );
                failed = true;
            }
            report.steps.push(step_report);
        }

        report.finish(started.elapsed());
        info!(
            scenario = %scenario.name,
            state = %report.state,
            duration_ms = report.duration_ms,
            "Scenario finished"
        );
        report
    }

    /// Finds the first step needing a fixture that is neither stored nor
    /// persisted by an earlier step of the scenario.
    fn unmet_fixture<'s>(&self, scenario: &'s Scenario) -> Option<(usize, &'s str)> {
        let mut persisted: BTreeSet<&str> = BTreeSet::new();
        for (index, step) in scenario.steps.iter().enumerate() {
            let missing = step
                .required_fixtures()
                .find(|name| !persisted.contains(name) && !self.fixtures.contains(name));
            if let Some(name) = missing {
                return Some((index, name));
            }
            persisted.extend(step.persisted_fixtures());
        }
        None
    }

    async fn run_step(&self, index: usize, step: &Step, ctx: &mut ScenarioContext) -> StepReport {
        let started = Instant::now();
        let mut exchanges = Vec::new();

        let outcome = match self.execute(step, ctx, &mut exchanges).await {
            Ok(()) => StepOutcome::Passed,
            Err(failure) => StepOutcome::Failed { failure },
        };

        StepReport {
            index,
            name: step.name.clone(),
            outcome,
            exchanges,
            duration_ms: millis(started.elapsed()),
        }
    }

    async fn execute(
        &self,
        step: &Step,
        ctx: &mut ScenarioContext,
        exchanges: &mut Vec<ExchangeSummary>,
    ) -> Result<(), StepFailure> {
        self.check_requirements(step, ctx)?;

        let credential = match &step.request.bearer {
            Some(fixture) => Some(self.fixtures.load_credential(fixture)?),
            None => None,
        };

        let Some(iteration) = &step.each else {
            return self.exchange(step, ctx, credential.as_ref(), exchanges).await;
        };

        let items = iteration.items(ctx)?;
        debug!(step = %step.name, over = %iteration.over, items = items.len(), "Iterating");
        for item in items {
            ctx.insert(iteration.bind.clone(), item);
            let result = self.exchange(step, ctx, credential.as_ref(), exchanges).await;
            ctx.remove(&iteration.bind);
            result?;
        }
        Ok(())
    }

    fn check_requirements(&self, step: &Step, ctx: &ScenarioContext) -> Result<(), StepFailure> {
        for fixture in step.required_fixtures() {
            if !self.fixtures.contains(fixture) {
                return Err(StepFailure::FixtureNotFound {
                    name: fixture.to_string(),
                });
            }
        }
        for requirement in &step.requires {
            if let Requirement::Value(name) = requirement {
                if !ctx.contains(name) {
                    return Err(StepFailure::UnresolvedReference {
                        reference: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn exchange(
        &self,
        step: &Step,
        ctx: &mut ScenarioContext,
        credential: Option<&Credential>,
        exchanges: &mut Vec<ExchangeSummary>,
    ) -> Result<(), StepFailure> {
        for generate in &step.generate {
            ctx.insert(generate.name.clone(), self.generator.generate(generate.kind));
        }

        let request = step.request.render(ctx, credential, &step.accept)?;
        let response = self.client.send(&request).await?;
        exchanges.push(ExchangeSummary::from(&response));

        if let StatusOutcome::Rejected(status) = response.outcome {
            return Err(StepFailure::UnexpectedStatus {
                status,
                accepted: step.accept.clone(),
                snapshot: Box::new(response.snapshot()),
            });
        }

        let mismatches: Vec<String> = evaluate_all(&step.assertions, ctx, &response)?
            .into_iter()
            .filter_map(|result| {
                result
                    .mismatch
                    .map(|mismatch| format!("{}: {mismatch}", result.description))
            })
            .collect();
        if !mismatches.is_empty() {
            return Err(StepFailure::AssertionMismatch {
                mismatches,
                snapshot: Box::new(response.snapshot()),
            });
        }

        for capture in &step.captures {
            let value = capture.extract(&response)?;
            if let Some(fixture) = &capture.persist {
                self.fixtures.save(fixture, &value)?;
                debug!(capture = %capture.name, fixture = %fixture, "Persisted capture");
            }
            ctx.insert(capture.name.clone(), value);
        }

        Ok(())
    }
}

/// A sequence of scenarios sharing one fixture store.
///
/// Fixtures written by the scenarios live for one run: they are removed from
/// the store before the first scenario starts.
pub struct TestRun<'a> {
    runner: ScenarioRunner<'a>,
    only: Option<String>,
}

impl<'a> TestRun<'a> {
    /// Creates a run.
    pub fn new(
        client: &'a HttpClient,
        fixtures: &'a dyn FixtureStore,
        generator: &'a dyn Generator,
    ) -> Self {
        Self {
            runner: ScenarioRunner::new(client, fixtures, generator),
            only: None,
        }
    }

    /// Restricts the run to scenarios whose name contains `filter`.
    pub fn only(mut self, filter: Option<String>) -> Self {
        self.only = filter;
        self
    }

    fn clear_persisted(&self, scenarios: &[Scenario]) {
        let names: BTreeSet<&str> = scenarios
            .iter()
            .flat_map(Scenario::persisted_fixtures)
            .collect();
        for name in names {
            match self.runner.fixtures.remove(name) {
                Ok(true) => debug!(fixture = %name, "Cleared fixture from a previous run"),
                Ok(false) => {}
                Err(e) => warn!(fixture = %name, "Failed to clear fixture: {e}"),
            }
        }
    }

    /// Runs every selected scenario in order.
    pub async fn execute(&self, scenarios: &[Scenario]) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new(self.runner.client.base_url().as_str());

        let selected: Vec<&Scenario> = scenarios
            .iter()
            .filter(|scenario| {
                self.only
                    .as_deref()
                    .is_none_or(|needle| scenario.name.contains(needle))
            })
            .collect();

        info!(
            base_url = %report.base_url,
            fixtures = self.runner.fixtures.backend_name(),
            scenarios = selected.len(),
            "Starting run"
        );

        self.clear_persisted(scenarios);

        for scenario in selected {
            report.scenarios.push(self.runner.run(scenario).await);
        }

        report.duration_ms = millis(started.elapsed());
        let summary = report.summary();
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            duration_ms = report.duration_ms,
            "Run finished"
        );
        report
    }
}
