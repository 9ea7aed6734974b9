//! Penalty tuning: evaluate every weight vector of a candidate grid and keep
//! the one whose schedule scores best.
//!
//! Candidates are evaluated by scoped worker threads sharing one immutable
//! [`SolveContext`]. Results travel over a channel to a single writer that
//! owns the best record and forwards each improvement to a [`ResultSink`].

use crate::catalog::Rule;
use crate::config::{PenaltyWeights, TunerConfig};
use crate::conflicts::{ConflictKind, ConflictReport, analyze};
use crate::domain::Domain;
use crate::engine::SolvingEngine;
use crate::error::{RecordError, ScheduleError};
use crate::extract::{Extraction, ScheduleTables};
use crate::pipeline::{SolveContext, SolveStatus, run};
use crate::records::{write_json, write_tables};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Every weight vector of the grid, rules in catalog order, last rule varying fastest.
pub fn candidates(grid: &BTreeMap<Rule, Vec<f64>>) -> Vec<PenaltyWeights> {
    if grid.is_empty() {
        return vec![PenaltyWeights::new()];
    }
    let rules: Vec<Rule> = grid.keys().copied().collect();
    grid.values()
        .map(|weights| weights.iter().copied())
        .multi_cartesian_product()
        .map(|combination| rules.iter().copied().zip(combination).collect())
        .collect()
}

/// The evaluation of one candidate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trial {
    pub index: usize,
    /// Effective weight of every rule for this candidate.
    pub weights: PenaltyWeights,
    /// `None` when the engine failed.
    pub status: Option<SolveStatus>,
    pub objective: Option<f64>,
    pub score: f64,
    pub conflicts: ConflictReport,
    #[serde(skip)]
    pub tables: ScheduleTables,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl Trial {
    fn beats(&self, other: &Trial) -> bool {
        (self.score, self.index) < (other.score, other.index)
    }

    pub fn metrics(&self) -> TrialMetrics {
        TrialMetrics {
            candidate: self.index,
            status: self.status,
            objective: self.objective,
            score: self.score,
            conflict_counts: self.conflicts.counts(),
            slack_by_rule: self.conflicts.slack_by_rule.clone(),
            elapsed_ms: self.elapsed.as_millis() as u64,
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialMetrics {
    pub candidate: usize,
    pub status: Option<SolveStatus>,
    pub objective: Option<f64>,
    pub score: f64,
    pub conflict_counts: BTreeMap<ConflictKind, usize>,
    pub slack_by_rule: BTreeMap<Rule, f64>,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub weights: PenaltyWeights,
    pub metrics: TrialMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningSummary {
    /// All candidates in grid order.
    pub candidates: Vec<CandidateSummary>,
    /// Best score after each evaluation, in evaluation order. Never increases.
    pub best_score_history: Vec<f64>,
    pub best_candidate: Option<usize>,
    pub best_weights: Option<PenaltyWeights>,
    pub best_score: Option<f64>,
}

/// Receives every new best trial and the final summary.
pub trait ResultSink {
    fn record_best(&mut self, trial: &Trial) -> Result<(), RecordError>;

    fn finish(&mut self, summary: &TuningSummary) -> Result<(), RecordError>;
}

/// Keeps nothing.
#[derive(Debug, Default)]
pub struct DiscardSink;

impl ResultSink for DiscardSink {
    fn record_best(&mut self, _trial: &Trial) -> Result<(), RecordError> {
        Ok(())
    }

    fn finish(&mut self, _summary: &TuningSummary) -> Result<(), RecordError> {
        Ok(())
    }
}

/// Persists the best configuration under `root/best_configuration` and the
/// summary as `root/tuning_summary.json`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn best_dir(&self) -> PathBuf {
        self.root.join("best_configuration")
    }
}

impl ResultSink for DirectorySink {
    fn record_best(&mut self, trial: &Trial) -> Result<(), RecordError> {
        let dir = self.best_dir();
        fs::create_dir_all(&dir).map_err(|source| RecordError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        write_json(&dir.join("penalties.json"), &trial.weights)?;
        write_json(&dir.join("metrics.json"), &trial.metrics())?;
        write_tables(&dir, &trial.tables)?;
        debug!("Persisted candidate {} to {}", trial.index, dir.display());
        Ok(())
    }

    fn finish(&mut self, summary: &TuningSummary) -> Result<(), RecordError> {
        fs::create_dir_all(&self.root).map_err(|source| RecordError::Io {
            path: self.root.display().to_string(),
            source,
        })?;
        write_json(&self.root.join("tuning_summary.json"), summary)
    }
}

#[derive(Debug, Clone)]
pub struct TuningOutcome {
    pub best: Option<Trial>,
    pub summary: TuningSummary,
}

pub struct PenaltyTuner<'e, E: SolvingEngine + ?Sized> {
    engine: &'e E,
    config: TunerConfig,
}

impl<'e, E: SolvingEngine + ?Sized> PenaltyTuner<'e, E> {
    pub fn new(engine: &'e E, config: TunerConfig) -> Self {
        Self { engine, config }
    }

    /// Evaluates the whole grid. Structural problems stop the search before
    /// any candidate runs; per-candidate failures are scored and skipped over.
    pub fn tune(
        &self,
        domain: &Domain,
        sink: &mut dyn ResultSink,
    ) -> Result<TuningOutcome, ScheduleError> {
        self.config.validate()?;
        let base = SolveContext::prepare(domain, &self.config.solve)?;
        let candidates = candidates(&self.config.grid);
        let workers = self.config.parallelism.clamp(1, candidates.len().max(1));
        info!(
            "Tuning {} candidate weight vectors with {} worker(s)",
            candidates.len(),
            workers
        );
        let start_time = Instant::now();

        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<Trial>();
        let mut writer = Writer::new(sink, candidates.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let (base, candidates, next) = (&base, &candidates, &next);
                scope.spawn(move || {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(weights) = candidates.get(index) else {
                            break;
                        };
                        let trial = self.evaluate(base, index, weights);
                        if tx.send(trial).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for trial in rx {
                writer.accept(trial);
            }
        });

        let outcome = writer.finish()?;
        info!(
            "Tuning finished in {:.2?}; best candidate {:?} with score {:?}",
            start_time.elapsed(),
            outcome.summary.best_candidate,
            outcome.summary.best_score
        );
        Ok(outcome)
    }

    fn evaluate(&self, base: &SolveContext<'_>, index: usize, weights: &PenaltyWeights) -> Trial {
        let config = base.config().with_weights(weights);
        let ctx = base.with_config(&config);
        let effective: PenaltyWeights = Rule::ALL.iter().map(|r| (*r, config.weight(*r))).collect();
        let start_time = Instant::now();

        match run(&ctx, self.engine) {
            Ok(report) => {
                debug!(
                    "Candidate {}: {:?}, score {}",
                    index,
                    report.status,
                    report.score()
                );
                Trial {
                    index,
                    weights: effective,
                    status: Some(report.status),
                    objective: report.objective,
                    score: report.score(),
                    conflicts: report.conflicts,
                    tables: report.tables,
                    elapsed: report.elapsed,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Candidate {} failed: {}", index, e);
                let extraction = Extraction::unsolved(ctx.domain());
                let conflicts = analyze(
                    ctx.domain(),
                    ctx.availability(),
                    ctx.config(),
                    &extraction,
                    None,
                );
                Trial {
                    index,
                    weights: effective,
                    status: None,
                    objective: None,
                    score: conflicts.score(),
                    conflicts,
                    tables: extraction.tables(ctx.domain()),
                    elapsed: start_time.elapsed(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// The single owner of the best record.
struct Writer<'s> {
    sink: &'s mut dyn ResultSink,
    best: Option<Trial>,
    metrics: Vec<Option<CandidateSummary>>,
    history: Vec<f64>,
    sink_error: Option<RecordError>,
}

impl<'s> Writer<'s> {
    fn new(sink: &'s mut dyn ResultSink, candidates: usize) -> Self {
        Self {
            sink,
            best: None,
            metrics: vec![None; candidates],
            history: Vec::with_capacity(candidates),
            sink_error: None,
        }
    }

    fn accept(&mut self, trial: Trial) {
        if let Some(slot) = self.metrics.get_mut(trial.index) {
            *slot = Some(CandidateSummary {
                weights: trial.weights.clone(),
                metrics: trial.metrics(),
            });
        }

        if self.best.as_ref().is_none_or(|best| trial.beats(best)) {
            info!("New best: candidate {} with score {}", trial.index, trial.score);
            if self.sink_error.is_none() {
                if let Err(e) = self.sink.record_best(&trial) {
                    warn!("Could not persist candidate {}: {}", trial.index, e);
                    self.sink_error = Some(e);
                }
            }
            self.best = Some(trial);
        }

        if let Some(best) = &self.best {
            self.history.push(best.score);
        }
    }

    fn finish(mut self) -> Result<TuningOutcome, RecordError> {
        let summary = TuningSummary {
            candidates: self.metrics.into_iter().flatten().collect(),
            best_score_history: self.history,
            best_candidate: self.best.as_ref().map(|b| b.index),
            best_weights: self.best.as_ref().map(|b| b.weights.clone()),
            best_score: self.best.as_ref().map(|b| b.score),
        };
        if let Some(e) = self.sink_error.take() {
            return Err(e);
        }
        self.sink.finish(&summary)?;
        Ok(TuningOutcome {
            best: self.best,
            summary,
        })
    }
}

/// Reads back a persisted best weight vector.
pub fn load_best_weights(root: &Path) -> Result<PenaltyWeights, RecordError> {
    crate::records::read_json(&root.join("best_configuration").join("penalties.json"))
}
