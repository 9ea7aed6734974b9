//! One solve attempt: build, solve, extract, analyze.

use crate::availability::{Availability, precheck};
use crate::builder::{SlackReading, build};
use crate::config::SolveConfig;
use crate::conflicts::{ConflictReport, analyze};
use crate::data::SchedulingInput;
use crate::domain::Domain;
use crate::engine::{EngineOutcome, SolvingEngine};
use crate::error::ScheduleError;
use crate::extract::{Extraction, ScheduleTables};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Everything one attempt reads: the domain, its resolved availability and
/// the configuration. Immutable once prepared, so the tuner shares one
/// context between its workers.
#[derive(Debug)]
pub struct SolveContext<'a> {
    domain: &'a Domain,
    availability: Availability,
    config: &'a SolveConfig,
}

impl<'a> SolveContext<'a> {
    /// Validates the configuration and runs the structural pre-check.
    pub fn prepare(domain: &'a Domain, config: &'a SolveConfig) -> Result<Self, ScheduleError> {
        config.validate()?;
        let availability = Availability::resolve(domain);
        precheck(domain, &availability, config)?;
        Ok(Self {
            domain,
            availability,
            config,
        })
    }

    pub fn domain(&self) -> &'a Domain {
        self.domain
    }

    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    pub fn config(&self) -> &'a SolveConfig {
        self.config
    }

    /// The same domain and availability under another configuration.
    pub fn with_config<'b>(&self, config: &'b SolveConfig) -> SolveContext<'b>
    where
        'a: 'b,
    {
        SolveContext {
            domain: self.domain,
            availability: self.availability.clone(),
            config,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    FeasibleNotOptimal,
    Infeasible,
    TimedOut,
}

/// Outcome of one attempt, always with a conflict report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveReport {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub tables: ScheduleTables,
    pub conflicts: ConflictReport,
    pub elapsed: Duration,
    #[serde(skip)]
    pub extraction: Extraction,
}

impl SolveReport {
    pub fn has_solution(&self) -> bool {
        self.objective.is_some()
    }

    pub fn score(&self) -> f64 {
        self.conflicts.score()
    }
}

pub fn run<E: SolvingEngine + ?Sized>(
    ctx: &SolveContext<'_>,
    engine: &E,
) -> Result<SolveReport, ScheduleError> {
    let start_time = Instant::now();
    let domain = ctx.domain();
    let built = build(ctx);
    let outcome = engine.solve(&built.model, &ctx.config().limits())?;

    let status = match &outcome {
        EngineOutcome::Optimal(_) => SolveStatus::Optimal,
        EngineOutcome::Feasible(_) => SolveStatus::FeasibleNotOptimal,
        EngineOutcome::Infeasible => SolveStatus::Infeasible,
        EngineOutcome::TimedOut(_) => SolveStatus::TimedOut,
    };

    let (extraction, slacks, objective): (Extraction, Option<Vec<SlackReading>>, Option<f64>) =
        match outcome.incumbent() {
            Some(incumbent) => (
                Extraction::from_assignment(domain, &built, &incumbent.assignment),
                Some(built.slack_readings(&incumbent.assignment)),
                Some(incumbent.objective),
            ),
            None => {
                warn!("No solution available ({:?}); reporting every request as unmet", status);
                (Extraction::unsolved(domain), None, None)
            }
        };

    let conflicts = analyze(
        domain,
        ctx.availability(),
        ctx.config(),
        &extraction,
        slacks.as_deref(),
    );
    let tables = extraction.tables(domain);
    let elapsed = start_time.elapsed();
    info!(
        "Attempt finished in {:.2?}: {:?}, {} conflicts, score {}",
        elapsed,
        status,
        conflicts.conflicts.len(),
        conflicts.score()
    );

    Ok(SolveReport {
        status,
        objective,
        tables,
        conflicts,
        elapsed,
        extraction,
    })
}

/// Validates `input` and runs a single attempt with `config`.
pub fn solve_input<E: SolvingEngine + ?Sized>(
    input: &SchedulingInput,
    config: &SolveConfig,
    engine: &E,
) -> Result<SolveReport, ScheduleError> {
    let domain = Domain::from_input(input)?;
    let ctx = SolveContext::prepare(&domain, config)?;
    run(&ctx, engine)
}
