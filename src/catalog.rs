//! Ordered catalog of named load-test cases

use crate::config::LoadTestConfig;
use crate::context::ExecutionContext;
use crate::errors::{CaseResult, LoadTestError, LoadTestResult};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a case body
pub type CaseFuture = BoxFuture<'static, CaseResult>;

/// Signature shared by every case body
pub type CaseFn = Arc<dyn Fn(ExecutionContext, Arc<LoadTestConfig>) -> CaseFuture + Send + Sync>;

/// A named case and the function that runs it
#[derive(Clone)]
pub struct CaseDescriptor {
    name: String,
    run: CaseFn,
}

impl CaseDescriptor {
    /// Wrap an async case body under `name`
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(ExecutionContext, Arc<LoadTestConfig>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(move |ctx, cfg| body(ctx, cfg).boxed()),
        }
    }

    /// Case name, which is also its identity in the catalog
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start the case body with its scoped context
    pub fn invoke(&self, ctx: ExecutionContext, cfg: Arc<LoadTestConfig>) -> CaseFuture {
        (self.run)(ctx, cfg)
    }
}

impl fmt::Debug for CaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Cases in the order they execute
#[derive(Debug, Clone, Default)]
pub struct CaseRegistry {
    cases: Vec<CaseDescriptor>,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a case; names must be unique and non-empty
    pub fn register(&mut self, descriptor: CaseDescriptor) -> LoadTestResult<()> {
        if descriptor.name.trim().is_empty() {
            return Err(LoadTestError::InvalidCase {
                name: descriptor.name,
                reason: "case name cannot be empty".to_string(),
            });
        }
        if self.get(&descriptor.name).is_some() {
            return Err(LoadTestError::InvalidCase {
                name: descriptor.name,
                reason: "case already registered".to_string(),
            });
        }

        tracing::debug!(case = %descriptor.name, "Registered load test case");
        self.cases.push(descriptor);
        Ok(())
    }

    /// Builder-style variant of [`CaseRegistry::register`]
    pub fn with_case<F, Fut>(mut self, name: impl Into<String>, body: F) -> LoadTestResult<Self>
    where
        F: Fn(ExecutionContext, Arc<LoadTestConfig>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        self.register(CaseDescriptor::new(name, body))?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&CaseDescriptor> {
        self.cases.iter().find(|case| case.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaseDescriptor> {
        self.cases.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.cases.iter().map(|case| case.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
