use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{AppResult, CheckError, HarnessError};

use super::context::SuiteContext;

/// One self-contained suite of HTTP-level checks.
///
/// A fresh value is constructed for every run, so any state a suite keeps
/// in its fields starts over each time it is selected.
#[async_trait]
pub trait TestModule: Send {
    /// # Errors
    ///
    /// Returns the first check that aborted the suite.
    async fn run(&mut self, ctx: &SuiteContext) -> Result<(), CheckError>;
}

type SuiteFactory = Box<dyn Fn() -> Box<dyn TestModule> + Send + Sync>;

/// Listing entry for a registered suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestModuleHandle {
    pub file_name: String,
    pub is_loaded: bool,
}

/// Named suite factories, listed in name order.
#[derive(Default)]
pub struct SuiteRegistry {
    factories: BTreeMap<String, SuiteFactory>,
}

impl SuiteRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the bundled suites.
    ///
    /// # Errors
    ///
    /// Returns an error if two bundled suites share a name.
    pub fn with_builtins() -> AppResult<Self> {
        let mut registry = Self::new();
        crate::suites::register_builtins(&mut registry)?;
        Ok(registry)
    }

    /// # Errors
    ///
    /// Returns `HarnessError::DuplicateSuite` when `name` is taken.
    pub fn register<F, M>(&mut self, name: &str, factory: F) -> Result<(), HarnessError>
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: TestModule + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(HarnessError::DuplicateSuite {
                name: name.to_owned(),
            });
        }
        self.factories.insert(
            name.to_owned(),
            Box::new(move || -> Box<dyn TestModule> { Box::new(factory()) }),
        );
        Ok(())
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn handles(&self) -> Vec<TestModuleHandle> {
        self.factories
            .keys()
            .map(|name| TestModuleHandle {
                file_name: name.clone(),
                is_loaded: false,
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Builds a brand-new instance of the named suite.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::UnknownSuite` for an unregistered name.
    pub fn instantiate(&self, name: &str) -> Result<Box<dyn TestModule>, HarnessError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| HarnessError::UnknownSuite {
                name: name.to_owned(),
            })
    }
}
