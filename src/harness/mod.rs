mod context;
mod registry;
mod runner;

pub use context::{DEFAULT_PAUSE, SuiteContext};
pub use registry::{SuiteRegistry, TestModule, TestModuleHandle};
pub use runner::{
    HISTORY_LIMIT, RUNNER_TITLE, RunTally, Runner, RunnerState, SELECTION_PROMPT, SuiteOutcome,
    SuiteRun,
};
