//! Analysis configuration
//!
//! Defaults come from the machine (worker count) and can be overridden
//! programmatically with the `with_*` builders or from the environment:
//!
//! | variable                  | field            |
//! |---------------------------|------------------|
//! | `GENOSTAT_THREADS`        | `threads`        |
//! | `GENOSTAT_QUEUE_CAPACITY` | `queue_capacity` |
//! | `GENOSTAT_BUFFER_SIZE`    | `buffer_size`    |

use std::env;

use serde::{Deserialize, Serialize};

use crate::engines::core::io::DEFAULT_READ_BUFFER_SIZE;
use crate::engines::core::parallel::default_num_threads;
use crate::engines::core::{CasePolicy, PipelineConfig};
use crate::engines::{EngineError, EngineResult};

pub const THREADS_ENV: &str = "GENOSTAT_THREADS";
pub const QUEUE_CAPACITY_ENV: &str = "GENOSTAT_QUEUE_CAPACITY";
pub const BUFFER_SIZE_ENV: &str = "GENOSTAT_BUFFER_SIZE";

/// Settings shared by the streaming operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Worker threads per pipeline
    pub threads: usize,
    /// Capacity of each pipeline queue
    pub queue_capacity: usize,
    /// Bytes requested from the source per read
    pub buffer_size: usize,
    /// Which letter cases count as bases
    pub case_policy: CasePolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            threads: pipeline.workers,
            queue_capacity: pipeline.queue_capacity,
            buffer_size: DEFAULT_READ_BUFFER_SIZE,
            case_policy: CasePolicy::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_case_policy(mut self, case_policy: CasePolicy) -> Self {
        self.case_policy = case_policy;
        self
    }

    /// Reject settings that cannot make progress
    pub fn validate(&self) -> EngineResult<()> {
        if self.buffer_size == 0 {
            return Err(EngineError::invalid("buffer_size", "must be greater than zero"));
        }
        self.pipeline_config().validate()
    }

    /// Pipeline sizing derived from this configuration
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.threads,
            queue_capacity: self.queue_capacity,
        }
    }

    /// Defaults overridden by `GENOSTAT_*` environment variables
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            threads: parse_override(&lookup, THREADS_ENV, "threads", defaults.threads)?,
            queue_capacity: parse_override(
                &lookup,
                QUEUE_CAPACITY_ENV,
                "queue_capacity",
                defaults.queue_capacity,
            )?,
            buffer_size: parse_override(&lookup, BUFFER_SIZE_ENV, "buffer_size", defaults.buffer_size)?,
            case_policy: defaults.case_policy,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_override<F>(lookup: &F, key: &str, name: &'static str, fallback: usize) -> EngineResult<usize>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            let value = raw.trim().parse::<usize>().map_err(|err| {
                EngineError::invalid(name, format!("{key}={raw:?} is not a non-negative integer: {err}"))
            })?;
            log::debug!("{} overridden by {}: {}", name, key, value);
            Ok(value)
        }
        _ => Ok(fallback),
    }
}
