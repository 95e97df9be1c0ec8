//! Named-step flow runner
//!
//! Each pipeline entry point (data preparation, training, evaluation) is a
//! [`Flow`] made of named steps. A step runs to completion or fails the
//! whole flow; failures are logged with the flow and step name and then
//! returned to the caller unchanged. There is no retry.

use crate::error::Result;
use std::time::Instant;
use tracing::{error, info, info_span};

/// Timing record for one completed step
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub elapsed_ms: u128,
}

/// A named sequence of steps
#[derive(Debug)]
pub struct Flow {
    name: String,
    started: Instant,
    steps: Vec<StepRecord>,
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        info!(flow = %name, "Flow started");
        Self {
            name,
            started: Instant::now(),
            steps: Vec::new(),
        }
    }

    /// Run one step, logging start, completion time or failure.
    pub fn step<T, F>(&mut self, step: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let span = info_span!("step", flow = %self.name, step = step);
        let _guard = span.enter();

        let started = Instant::now();
        match f() {
            Ok(value) => {
                let elapsed_ms = started.elapsed().as_millis();
                info!(elapsed_ms, "Step finished");
                self.steps.push(StepRecord {
                    name: step.to_string(),
                    elapsed_ms,
                });
                Ok(value)
            }
            Err(e) => {
                error!(error = %e, "Step failed");
                Err(e)
            }
        }
    }

    /// Close the flow and return its step records.
    pub fn finish(self) -> Vec<StepRecord> {
        info!(
            flow = %self.name,
            steps = self.steps.len(),
            elapsed_ms = self.started.elapsed().as_millis(),
            "Flow finished"
        );
        self.steps
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
