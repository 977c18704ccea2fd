use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{LogNormal, Normal, Triangular, Uniform};

use crate::error::AppraisalError;
use crate::AppraisalResult;

/// Probability distribution of an uncertain input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    Normal { mean: f64, std_dev: f64 },
    LogNormal { mu: f64, sigma: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
    Uniform { min: f64, max: f64 },
}

/// A validated distribution ready to draw from.
#[derive(Debug, Clone)]
pub(crate) enum Sampler {
    Normal(Normal),
    LogNormal(LogNormal),
    Triangular(Triangular),
    Uniform(Uniform),
}

fn invalid(field: &str, kind: &str, e: impl std::fmt::Display) -> AppraisalError {
    AppraisalError::invalid(field, format!("Invalid {kind} parameters: {e}"))
}

impl Distribution {
    /// Validate the parameters once, before any iteration runs.
    pub(crate) fn sampler(&self, field: &str) -> AppraisalResult<Sampler> {
        Ok(match *self {
            Distribution::Normal { mean, std_dev } => Sampler::Normal(
                Normal::new(mean, std_dev).map_err(|e| invalid(field, "Normal", e))?,
            ),
            Distribution::LogNormal { mu, sigma } => Sampler::LogNormal(
                LogNormal::new(mu, sigma).map_err(|e| invalid(field, "LogNormal", e))?,
            ),
            Distribution::Triangular { min, mode, max } => Sampler::Triangular(
                Triangular::new(min, max, mode).map_err(|e| invalid(field, "Triangular", e))?,
            ),
            Distribution::Uniform { min, max } => Sampler::Uniform(
                Uniform::new(min, max).map_err(|e| invalid(field, "Uniform", e))?,
            ),
        })
    }
}

impl Sampler {
    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Sampler::Normal(d) => rng.sample(d),
            Sampler::LogNormal(d) => rng.sample(d),
            Sampler::Triangular(d) => rng.sample(d),
            Sampler::Uniform(d) => rng.sample(d),
        }
    }
}
