//! The boundary to the combinatorial solving engine.
//!
//! The core hands a [`Model`] and [`SolveLimits`] to a [`SolvingEngine`] and
//! must cope with every [`EngineOutcome`]. [`HighsEngine`] solves the model
//! with the HiGHS MIP solver through `good_lp`.

use crate::error::EngineError;
use crate::model::{Assignment, Comparison, Model, VarKind};
use good_lp::solvers::SolutionStatus;
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
    default_solver,
};
use log::{info, trace, warn};
use std::time::{Duration, Instant};

/// Resource bounds for one solve, owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveLimits {
    pub time_limit: Duration,
    /// Parallelism hint for the engine's own workers.
    pub workers: u32,
    pub random_seed: i32,
    pub log_to_console: bool,
}

impl Default for SolveLimits {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(60),
            workers: 1,
            random_seed: 1234,
            log_to_console: false,
        }
    }
}

/// A solution point and its objective value.
#[derive(Debug, Clone, PartialEq)]
pub struct Incumbent {
    pub assignment: Assignment,
    pub objective: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    Optimal(Incumbent),
    /// A solution was found but optimality was not proven.
    Feasible(Incumbent),
    Infeasible,
    /// The time budget ran out, possibly with an incumbent.
    TimedOut(Option<Incumbent>),
}

impl EngineOutcome {
    pub fn incumbent(&self) -> Option<&Incumbent> {
        match self {
            EngineOutcome::Optimal(inc) | EngineOutcome::Feasible(inc) => Some(inc),
            EngineOutcome::TimedOut(inc) => inc.as_ref(),
            EngineOutcome::Infeasible => None,
        }
    }
}

pub trait SolvingEngine: Sync {
    fn solve(&self, model: &Model, limits: &SolveLimits) -> Result<EngineOutcome, EngineError>;
}

/// Solves models with HiGHS.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsEngine;

impl SolvingEngine for HighsEngine {
    fn solve(&self, model: &Model, limits: &SolveLimits) -> Result<EngineOutcome, EngineError> {
        let start_time = Instant::now();
        let mut problem = ProblemVariables::new();

        let vars: Vec<Variable> = model
            .variables()
            .iter()
            .map(|def| match def.kind {
                VarKind::Binary => problem.add(variable().binary()),
                VarKind::Integer { min, max: Some(max) } => {
                    problem.add(variable().integer().min(min).max(max))
                }
                VarKind::Integer { min, max: None } => problem.add(variable().integer().min(min)),
            })
            .collect();

        let to_expression = |expr: &crate::model::LinearExpr| -> Expression {
            expr.terms
                .iter()
                .map(|(var, coefficient)| *coefficient * vars[var.get()])
                .sum::<Expression>()
                + expr.constant
        };

        let objective = to_expression(model.objective());
        let mut solver_model = problem
            .maximise(objective)
            .using(default_solver)
            .set_option("threads", limits.workers as i32)
            .set_option("random_seed", limits.random_seed)
            .set_option("time_limit", limits.time_limit.as_secs_f64())
            .set_option(
                "log_to_console",
                if limits.log_to_console { "true" } else { "false" },
            );

        for constraint in model.constraints() {
            let lhs = to_expression(&constraint.expr);
            let row = match constraint.cmp {
                Comparison::Le => lhs.leq(constraint.rhs),
                Comparison::Ge => lhs.geq(constraint.rhs),
                Comparison::Eq => lhs.eq(constraint.rhs),
            };
            solver_model.add_constraint(row);
        }
        trace!(
            "Handing {} variables and {} constraints to HiGHS",
            vars.len(),
            model.constraints().len()
        );

        info!("Starting ILP solver...");
        let solution = match solver_model.solve() {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) => {
                info!("Model proven infeasible in {:.2?}", start_time.elapsed());
                return Ok(EngineOutcome::Infeasible);
            }
            Err(e) => return Err(EngineError(e.to_string())),
        };

        let assignment = Assignment::new(
            vars.iter()
                .map(|var| round_integral(solution.value(*var)))
                .collect(),
        );
        let objective = model.objective_value(&assignment);
        let incumbent = Incumbent {
            assignment,
            objective,
        };
        let duration = start_time.elapsed();

        let outcome = match solution.status() {
            SolutionStatus::Optimal => {
                info!("Optimal solution found in {:.2?}", duration);
                EngineOutcome::Optimal(incumbent)
            }
            SolutionStatus::GapLimit => {
                info!("Solution within gap limit found in {:.2?}", duration);
                EngineOutcome::Feasible(incumbent)
            }
            SolutionStatus::TimeLimit => {
                if model.is_satisfied(&incumbent.assignment) {
                    warn!("Time limit reached after {:.2?}; using best solution found", duration);
                    EngineOutcome::TimedOut(Some(incumbent))
                } else {
                    warn!("Time limit reached after {:.2?} without a feasible solution", duration);
                    EngineOutcome::TimedOut(None)
                }
            }
        };
        Ok(outcome)
    }
}

/// Snaps solver noise such as `0.9999999` onto the integer grid.
fn round_integral(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-6 { rounded } else { value }
}
