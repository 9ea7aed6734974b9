//! A solver-neutral mixed integer model: variables, linear constraints and a
//! linear objective to maximise.
//!
//! The model builder only ever talks to this type; an engine adapter
//! translates it into whatever its backend understands.

use std::fmt;

const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(u32);

impl VarId {
    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    Binary,
    Integer { min: f64, max: Option<f64> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
}

impl VarDef {
    pub fn bounds(&self) -> (f64, Option<f64>) {
        match self.kind {
            VarKind::Binary => (0.0, Some(1.0)),
            VarKind::Integer { min, max } => (min, max),
        }
    }
}

/// `Σ coefficient · variable + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
            constant: 0.0,
        }
    }

    pub fn add(&mut self, var: VarId, coefficient: f64) -> &mut Self {
        self.terms.push((var, coefficient));
        self
    }

    pub fn plus(mut self, var: VarId, coefficient: f64) -> Self {
        self.terms.push((var, coefficient));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, c)| c * values.get(var.get()).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Le,
    Ge,
    Eq,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub label: String,
    pub expr: LinearExpr,
    pub cmp: Comparison,
    pub rhs: f64,
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.cmp {
            Comparison::Le => lhs <= self.rhs + TOLERANCE,
            Comparison::Ge => lhs >= self.rhs - TOLERANCE,
            Comparison::Eq => (lhs - self.rhs).abs() <= TOLERANCE,
        }
    }
}

/// A value for every variable of a model, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    values: Vec<f64>,
}

impl Assignment {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.get()).copied().unwrap_or(0.0)
    }

    /// Binary reading of a variable.
    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > 0.5
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    variables: Vec<VarDef>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(name.into(), VarKind::Binary)
    }

    pub fn add_integer(&mut self, name: impl Into<String>, min: f64, max: Option<f64>) -> VarId {
        self.add_variable(name.into(), VarKind::Integer { min, max })
    }

    fn add_variable(&mut self, name: String, kind: VarKind) -> VarId {
        let id = VarId(self.variables.len() as u32);
        self.variables.push(VarDef { name, kind });
        id
    }

    pub fn add_constraint(
        &mut self,
        label: impl Into<String>,
        expr: LinearExpr,
        cmp: Comparison,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            label: label.into(),
            expr,
            cmp,
            rhs,
        });
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn variables(&self) -> &[VarDef] {
        &self.variables
    }

    pub fn variable(&self, var: VarId) -> &VarDef {
        &self.variables[var.get()]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn objective_value(&self, assignment: &Assignment) -> f64 {
        self.objective.evaluate(assignment.values())
    }

    /// Constraints and variable bounds the assignment breaks.
    pub fn violations<'a>(&'a self, assignment: &'a Assignment) -> impl Iterator<Item = &'a Constraint> + 'a {
        self.constraints
            .iter()
            .filter(move |c| !c.is_satisfied(assignment.values()))
    }

    pub fn is_satisfied(&self, assignment: &Assignment) -> bool {
        if assignment.values().len() != self.variables.len() {
            return false;
        }
        let within_bounds = self.variables.iter().zip(assignment.values()).all(|(def, v)| {
            let (min, max) = def.bounds();
            let integral = (v - v.round()).abs() <= TOLERANCE;
            integral && *v >= min - TOLERANCE && max.is_none_or(|m| *v <= m + TOLERANCE)
        });
        within_bounds && self.violations(assignment).next().is_none()
    }
}
