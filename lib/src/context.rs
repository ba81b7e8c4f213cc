use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cancellation::CancellationHandle;
use crate::export::{DecodingEvaluator, VariableEvaluator};
use crate::result::VariableToColumnMap;
use crate::vocabulary::Vocabulary;

/// What an export needs from the query execution around it.
pub struct ExecutionContext {
    pub vocabulary: Arc<dyn Vocabulary>,
    pub variable_columns: VariableToColumnMap,
    pub cancellation: CancellationHandle,
    /// Reported in the JSON envelope.
    pub warnings: Vec<String>,
    pub runtime_information: serde_json::Value,
    /// Time the engine spent computing the result before export started.
    pub compute_time: Duration,
    /// When the request arrived; the envelope's total time is measured from here.
    pub request_started: Instant,
    /// Resolves template variables in CONSTRUCT exports.
    pub variable_evaluator: Arc<dyn VariableEvaluator>,
}

impl ExecutionContext {
    pub fn new(vocabulary: Arc<dyn Vocabulary>, variable_columns: VariableToColumnMap) -> Self {
        ExecutionContext {
            vocabulary,
            variable_columns,
            cancellation: CancellationHandle::new(),
            warnings: Vec::new(),
            runtime_information: serde_json::json!({}),
            compute_time: Duration::ZERO,
            request_started: Instant::now(),
            variable_evaluator: Arc::new(DecodingEvaluator),
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationHandle) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_variable_evaluator(mut self, evaluator: Arc<dyn VariableEvaluator>) -> Self {
        self.variable_evaluator = evaluator;
        self
    }

    pub fn with_request_started(mut self, started: Instant) -> Self {
        self.request_started = started;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}
