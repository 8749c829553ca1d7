//! Explicit run context.
//!
//! Components never look up process-wide state. They are built from an
//! [`EvalContext`] that carries the validated configuration and the
//! `ronda_run` span their events are recorded under.

use std::sync::Arc;

use tracing::Span;
use tracing::span::EnteredSpan;

use crate::config::EvalConfig;
use crate::error::Result;

/// Configuration plus logging scope for one run.
#[derive(Debug, Clone)]
pub struct EvalContext {
    run_id: String,
    config: Arc<EvalConfig>,
    span: Span,
}

impl EvalContext {
    /// Validate `config` and open a run span with a timestamp-derived id.
    pub fn new(config: EvalConfig) -> Result<Self> {
        let run_id = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f").to_string();
        Self::with_run_id(config, run_id)
    }

    /// Validate `config` and open a run span with the given id.
    pub fn with_run_id(config: EvalConfig, run_id: impl Into<String>) -> Result<Self> {
        config.validate()?;
        let run_id = run_id.into();
        let span = tracing::info_span!("ronda_run", run_id = %run_id);
        Ok(Self {
            run_id,
            config: Arc::new(config),
            span,
        })
    }

    /// Identifier of this run.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The run configuration.
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// The run span.
    pub const fn span(&self) -> &Span {
        &self.span
    }

    /// Enter a child span for one component's work.
    pub fn enter(&self, component: &'static str) -> EnteredSpan {
        tracing::debug_span!(parent: &self.span, "component", name = component).entered()
    }

    /// A context sharing this run id and span with a modified configuration.
    pub fn derive(&self, f: impl FnOnce(&mut EvalConfig)) -> Result<Self> {
        let mut config = (*self.config).clone();
        f(&mut config);
        config.validate()?;
        Ok(Self {
            run_id: self.run_id.clone(),
            config: Arc::new(config),
            span: self.span.clone(),
        })
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            run_id: "default".to_string(),
            config: Arc::new(EvalConfig::default()),
            span: tracing::info_span!("ronda_run", run_id = "default"),
        }
    }
}
