//! Configuration for the local-search optimizer

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Prior over the number of clusters a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportPrior {
    /// Every support size is equally likely
    One,
    /// Support size is Poisson distributed with mean `support_lambda`
    Poisson,
}

impl FromStr for SupportPrior {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "one" => Ok(SupportPrior::One),
            "poisson" => Ok(SupportPrior::Poisson),
            _ => Err(ClusterError::UnknownSupportPrior(s.to_string())),
        }
    }
}

impl fmt::Display for SupportPrior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportPrior::One => write!(f, "one"),
            SupportPrior::Poisson => write!(f, "poisson"),
        }
    }
}

/// Parameters of the objective function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveParams {
    /// Weight of the squared-membership regularizer
    pub weight_beta: f64,

    pub support_prior: SupportPrior,

    /// Mean of the Poisson support prior
    pub support_lambda: f64,
}

impl Default for ObjectiveParams {
    fn default() -> Self {
        Self {
            weight_beta: 0.01,
            support_prior: SupportPrior::Poisson,
            support_lambda: 1.0,
        }
    }
}

/// Optimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NmfParams {
    /// Maximum number of passes over all nodes
    pub num_iter: usize,

    /// 0 = warnings only, 1 = info, 2 = debug, 3+ = trace
    pub verbosity: u8,

    pub objective: ObjectiveParams,

    /// Maximum number of clusters a single node may belong to
    pub max_cluster_per_node: Option<usize>,

    /// Seed for the node visiting order
    pub seed: u64,
}

impl Default for NmfParams {
    fn default() -> Self {
        Self {
            num_iter: 16,
            verbosity: 1,
            objective: ObjectiveParams::default(),
            max_cluster_per_node: None,
            seed: 1234567,
        }
    }
}

impl NmfParams {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        let objective = &self.objective;
        if !objective.weight_beta.is_finite() || objective.weight_beta < 0.0 {
            return Err(ClusterError::InvalidParameter {
                name: "weight_beta",
                reason: format!("must be finite and non-negative, got {}", objective.weight_beta),
            });
        }
        if objective.support_prior == SupportPrior::Poisson
            && !(objective.support_lambda.is_finite() && objective.support_lambda > 0.0)
        {
            return Err(ClusterError::InvalidParameter {
                name: "support_lambda",
                reason: format!("must be finite and positive, got {}", objective.support_lambda),
            });
        }
        if self.max_cluster_per_node == Some(0) {
            return Err(ClusterError::InvalidParameter {
                name: "max_cluster_per_node",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The `log` level corresponding to `verbosity`
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
