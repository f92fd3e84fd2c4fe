use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{AppError, AppResult, CheckError, HarnessError};

use super::context::SuiteContext;
use super::registry::{SuiteRegistry, TestModuleHandle};

pub const RUNNER_TITLE: &str = "Media Library end-to-end test runner";
pub const SELECTION_PROMPT: &str = "Which test would you like to run?";
/// Most recent runs kept by [`Runner::history`].
pub const HISTORY_LIMIT: usize = 64;

/// Where the interactive loop currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerState {
    Listing,
    AwaitingSelection,
    Executing { suite: String },
    Evicting { suite: String },
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuiteOutcome {
    Passed,
    Failed(String),
    Panicked(String),
}

impl SuiteOutcome {
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteRun {
    pub suite: String,
    pub outcome: SuiteOutcome,
}

/// Totals over every run of a session, including runs already dropped from
/// the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub runs: usize,
    pub failed: usize,
}

/// Interactive menu over a [`SuiteRegistry`].
///
/// Runs one suite at a time. Each selection builds a fresh instance from
/// the registry and drops it once the suite settles, pass or fail.
pub struct Runner {
    registry: SuiteRegistry,
    context: SuiteContext,
    handles: Vec<TestModuleHandle>,
    state: RunnerState,
    history: VecDeque<SuiteRun>,
    tally: RunTally,
}

impl Runner {
    #[must_use]
    pub fn new(registry: SuiteRegistry, context: SuiteContext) -> Self {
        let handles = registry.handles();
        Self {
            registry,
            context,
            handles,
            state: RunnerState::Listing,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            tally: RunTally::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &RunnerState {
        &self.state
    }

    #[must_use]
    pub fn handles(&self) -> &[TestModuleHandle] {
        &self.handles
    }

    /// The last [`HISTORY_LIMIT`] runs, oldest first.
    #[must_use]
    pub const fn history(&self) -> &VecDeque<SuiteRun> {
        &self.history
    }

    #[must_use]
    pub const fn tally(&self) -> RunTally {
        self.tally
    }

    /// Drives the menu until the operator submits an empty line or input
    /// ends.
    ///
    /// # Errors
    ///
    /// Only fails when reading the selection itself fails; suite failures
    /// are printed and the loop continues.
    pub async fn run<R>(&mut self, input: R) -> AppResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            self.list();

            self.state = RunnerState::AwaitingSelection;
            self.context.reporter().prompt(SELECTION_PROMPT);
            let line = lines
                .next_line()
                .await
                .map_err(|source| AppError::harness(HarnessError::ReadSelection { source }))?;
            let Some(line) = line else {
                break;
            };
            let selection = line.trim();
            if selection.is_empty() {
                break;
            }

            match self.resolve_selection(selection) {
                Some(name) => {
                    self.run_suite(&name).await;
                }
                None => {
                    tracing::warn!("Unknown selection '{}'", selection);
                    self.context
                        .reporter()
                        .log_errors(format!("Unknown selection '{}'", selection));
                }
            }
        }
        self.state = RunnerState::Finished;
        tracing::debug!("Runner finished after {} suite run(s)", self.tally.runs);
        Ok(())
    }

    fn list(&mut self) {
        self.state = RunnerState::Listing;
        let reporter = self.context.reporter();
        reporter.banner(RUNNER_TITLE);
        reporter.notice(&format!("Running against {}", self.context.settings().base()));
        for (index, handle) in self.handles.iter().enumerate() {
            reporter.menu_entry(index, &handle.file_name);
        }
    }

    /// Accepts a menu index or an exact suite name.
    fn resolve_selection(&self, selection: &str) -> Option<String> {
        if let Ok(index) = selection.parse::<usize>() {
            return self
                .handles
                .get(index)
                .map(|handle| handle.file_name.clone());
        }
        self.handles
            .iter()
            .find(|handle| handle.file_name == selection)
            .map(|handle| handle.file_name.clone())
    }

    /// Runs one suite to completion and evicts it.
    pub async fn run_suite(&mut self, name: &str) -> SuiteOutcome {
        self.state = RunnerState::Executing {
            suite: name.to_owned(),
        };
        let mut module = match self.registry.instantiate(name) {
            Ok(module) => module,
            Err(err) => {
                self.context.reporter().log_errors(err.to_string());
                let outcome = SuiteOutcome::Failed(err.to_string());
                self.record(name, outcome.clone());
                return outcome;
            }
        };
        self.set_loaded(name, true);
        tracing::info!("Running suite {}", name);

        let outcome = match AssertUnwindSafe(module.run(&self.context))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => SuiteOutcome::Passed,
            Ok(Err(err)) => {
                tracing::warn!("Suite {} failed: {}", name, err);
                let message = err.to_string();
                self.context.reporter().log_errors(err);
                SuiteOutcome::Failed(message)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("Suite {} panicked: {}", name, message);
                self.context
                    .reporter()
                    .log_errors(CheckError::Panicked(message.clone()));
                SuiteOutcome::Panicked(message)
            }
        };

        self.state = RunnerState::Evicting {
            suite: name.to_owned(),
        };
        drop(module);
        self.set_loaded(name, false);
        self.context.reporter().line("\n\n");
        self.record(name, outcome.clone());
        outcome
    }

    fn set_loaded(&mut self, name: &str, loaded: bool) {
        if let Some(handle) = self
            .handles
            .iter_mut()
            .find(|handle| handle.file_name == name)
        {
            handle.is_loaded = loaded;
        }
    }

    fn record(&mut self, name: &str, outcome: SuiteOutcome) {
        self.tally.runs = self.tally.runs.saturating_add(1);
        if !outcome.is_passed() {
            self.tally.failed = self.tally.failed.saturating_add(1);
        }
        if self.history.len() >= HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(SuiteRun {
            suite: name.to_owned(),
            outcome,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_owned()
}
