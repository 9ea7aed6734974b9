use crate::catalog::{Mode, Rule};
use crate::engine::SolveLimits;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Penalty weight per rule. Rules missing from the map use their catalog default.
pub type PenaltyWeights = BTreeMap<Rule, f64>;

/// Everything a single solve attempt reads besides the domain itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolveConfig {
    pub weights: PenaltyWeights,
    pub modes: BTreeMap<Rule, Mode>,
    pub time_limit_secs: f64,
    pub workers: u32,
    pub random_seed: i32,
    pub solver_log: bool,
    /// SPED cap for sections whose course does not declare one.
    pub default_sped_cap: Option<u32>,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            modes: BTreeMap::new(),
            time_limit_secs: 60.0,
            workers: 1,
            random_seed: 1234,
            solver_log: false,
            default_sped_cap: Some(12),
        }
    }
}

impl SolveConfig {
    pub fn weight(&self, rule: Rule) -> f64 {
        self.weights
            .get(&rule)
            .copied()
            .unwrap_or(rule.spec().default_weight)
    }

    pub fn mode(&self, rule: Rule) -> Mode {
        self.modes
            .get(&rule)
            .copied()
            .unwrap_or(rule.spec().default_mode)
    }

    pub fn is_hard(&self, rule: Rule) -> bool {
        self.mode(rule) == Mode::Hard
    }

    /// A copy of this configuration with `weights` layered over the current ones.
    pub fn with_weights(&self, weights: &PenaltyWeights) -> Self {
        let mut config = self.clone();
        for (rule, weight) in weights {
            config.weights.insert(*rule, *weight);
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (rule, weight) in &self.weights {
            if !(weight.is_finite() && *weight > 0.0) {
                return Err(ConfigError::NonPositiveWeight {
                    rule: rule.key().to_string(),
                    weight: *weight,
                });
            }
        }
        for (rule, mode) in &self.modes {
            if *mode == Mode::Hard && !rule.spec().allows_hard {
                return Err(ConfigError::HardNotSupported(rule.key().to_string()));
            }
        }
        if !(self.time_limit_secs > 0.0) || Duration::try_from_secs_f64(self.time_limit_secs).is_err() {
            return Err(ConfigError::InvalidTimeLimit(self.time_limit_secs));
        }
        Ok(())
    }

    pub fn limits(&self) -> SolveLimits {
        SolveLimits {
            time_limit: Duration::try_from_secs_f64(self.time_limit_secs).unwrap_or(Duration::MAX),
            workers: self.workers.max(1),
            random_seed: self.random_seed,
            log_to_console: self.solver_log,
        }
    }
}

/// Candidate weights searched by the penalty tuner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TunerConfig {
    pub grid: BTreeMap<Rule, Vec<f64>>,
    /// Number of candidates evaluated at the same time.
    pub parallelism: usize,
    pub solve: SolveConfig,
}

impl Default for TunerConfig {
    fn default() -> Self {
        let grid = BTreeMap::from([
            (Rule::MissingCourse, vec![1000.0, 1200.0, 1500.0, 2000.0]),
            (Rule::SectionOverload, vec![50.0, 100.0, 150.0]),
            (Rule::SpecialCourseViolation, vec![600.0, 800.0, 1000.0]),
            (Rule::LabAdjacencyViolation, vec![300.0, 400.0, 500.0]),
            (Rule::SpedOverload, vec![200.0, 250.0, 300.0]),
            (Rule::PeriodOverlap, vec![400.0, 600.0, 800.0]),
            (Rule::Balance, vec![25.0, 50.0, 75.0]),
        ]);
        Self {
            grid,
            parallelism: 1,
            solve: SolveConfig::default(),
        }
    }
}

impl TunerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.solve.validate()?;
        for (rule, candidates) in &self.grid {
            if candidates.is_empty() {
                return Err(ConfigError::EmptyCandidates(rule.key().to_string()));
            }
            if let Some(weight) = candidates.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
                return Err(ConfigError::NonPositiveWeight {
                    rule: rule.key().to_string(),
                    weight: *weight,
                });
            }
        }
        Ok(())
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let host = env::var("SCHEDULER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("SCHEDULER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        Ok(Self { host, port })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
