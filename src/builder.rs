//! Translates a [`SolveContext`] into a [`Model`].
//!
//! Decision variables:
//! - `z[section, period]`: the section runs in the period,
//! - `x[student, section]`: the student is enrolled in the section,
//! - `y[student, section, period]`: the enrollment happens in that period,
//!   so student clashes are evaluated against the period actually chosen,
//! - `teaches[teacher, period]`: contiguous-load indicator.
//!
//! Variables only exist for legal pairings. Rules from the catalog are added
//! either as hard rows or as `row <= slack` with `weight * slack` subtracted
//! from the objective.

use crate::availability::Availability;
use crate::catalog::Rule;
use crate::config::SolveConfig;
use crate::domain::{CourseIdx, Domain, PeriodIdx, SectionIdx, StudentIdx, TeacherIdx};
use crate::model::{Assignment, Comparison, LinearExpr, Model, VarId};
use crate::pipeline::SolveContext;
use log::{debug, info};
use std::collections::HashMap;

/// What a penalty variable is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Request { student: StudentIdx, course: CourseIdx },
    Section(SectionIdx),
    StudentPeriod { student: StudentIdx, period: PeriodIdx },
    TeacherPeriod { teacher: TeacherIdx, period: PeriodIdx },
    CoursePeriod { course: CourseIdx, period: PeriodIdx },
    TeacherPair { teacher: TeacherIdx, first: PeriodIdx, second: PeriodIdx },
    TeacherTrack { teacher: TeacherIdx, track: String },
    Course(CourseIdx),
}

/// A slack variable and the weight it carries in the objective.
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyTerm {
    pub rule: Rule,
    pub subject: Subject,
    pub var: VarId,
    pub weight: f64,
}

/// The solved value of one slack variable.
#[derive(Debug, Clone, PartialEq)]
pub struct SlackReading {
    pub rule: Rule,
    pub subject: Subject,
    pub value: f64,
}

/// A model together with the typed maps needed to read a solution back.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    pub model: Model,
    z: HashMap<(SectionIdx, PeriodIdx), VarId>,
    x: HashMap<(StudentIdx, SectionIdx), VarId>,
    y: HashMap<(StudentIdx, SectionIdx, PeriodIdx), VarId>,
    teaches: HashMap<(TeacherIdx, PeriodIdx), VarId>,
    penalties: Vec<PenaltyTerm>,
}

impl BuiltModel {
    pub fn z(&self, section: SectionIdx, period: PeriodIdx) -> Option<VarId> {
        self.z.get(&(section, period)).copied()
    }

    pub fn x(&self, student: StudentIdx, section: SectionIdx) -> Option<VarId> {
        self.x.get(&(student, section)).copied()
    }

    pub fn y(&self, student: StudentIdx, section: SectionIdx, period: PeriodIdx) -> Option<VarId> {
        self.y.get(&(student, section, period)).copied()
    }

    pub fn teaches(&self, teacher: TeacherIdx, period: PeriodIdx) -> Option<VarId> {
        self.teaches.get(&(teacher, period)).copied()
    }

    pub fn penalties(&self) -> &[PenaltyTerm] {
        &self.penalties
    }

    pub fn penalties_for(&self, rule: Rule) -> impl Iterator<Item = &PenaltyTerm> + '_ {
        self.penalties.iter().filter(move |p| p.rule == rule)
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (self.z.len(), self.x.len(), self.y.len())
    }

    pub fn slack_readings(&self, assignment: &Assignment) -> Vec<SlackReading> {
        self.penalties
            .iter()
            .map(|p| SlackReading {
                rule: p.rule,
                subject: p.subject.clone(),
                value: assignment.value(p.var),
            })
            .collect()
    }
}

struct ModelBuilder<'a> {
    domain: &'a Domain,
    availability: &'a Availability,
    config: &'a SolveConfig,
    built: BuiltModel,
    objective: LinearExpr,
}

pub fn build(ctx: &SolveContext<'_>) -> BuiltModel {
    let mut builder = ModelBuilder {
        domain: ctx.domain(),
        availability: ctx.availability(),
        config: ctx.config(),
        built: BuiltModel {
            model: Model::new(),
            z: HashMap::new(),
            x: HashMap::new(),
            y: HashMap::new(),
            teaches: HashMap::new(),
            penalties: Vec::new(),
        },
        objective: LinearExpr::new(),
    };

    builder.add_variables();
    builder.add_section_placement();
    builder.add_enrollment_links();
    builder.add_requests();
    builder.add_capacity();
    builder.add_student_conflicts();
    builder.add_teacher_conflicts();
    builder.add_pin_coverage();
    builder.add_lab_adjacency();
    builder.add_contiguous_loads();
    builder.add_sped_caps();
    builder.add_period_overlap();
    builder.add_balance();

    let ModelBuilder {
        mut built,
        objective,
        ..
    } = builder;
    built.model.set_objective(objective);
    info!(
        "Model built: {} variables, {} constraints, {} penalty terms",
        built.model.variables().len(),
        built.model.constraints().len(),
        built.penalties.len()
    );
    built
}

impl ModelBuilder<'_> {
    /// Adds `expr cmp rhs` as a hard row, or relaxed by a fresh slack when the
    /// rule is soft. `slack_max` bounds the slack; `None` leaves it open.
    fn add_rule(
        &mut self,
        rule: Rule,
        subject: Subject,
        label: String,
        expr: LinearExpr,
        cmp: Comparison,
        rhs: f64,
        slack_max: Option<f64>,
    ) {
        if self.config.is_hard(rule) {
            self.built.model.add_constraint(label, expr, cmp, rhs);
            return;
        }
        let slack = self.add_penalty(rule, subject, format!("slack_{}", label), slack_max);
        match cmp {
            Comparison::Le => {
                self.built
                    .model
                    .add_constraint(label, expr.plus(slack, -1.0), Comparison::Le, rhs);
            }
            Comparison::Ge => {
                self.built
                    .model
                    .add_constraint(label, expr.plus(slack, 1.0), Comparison::Ge, rhs);
            }
            Comparison::Eq => {
                // |expr - rhs| <= slack
                self.built.model.add_constraint(
                    format!("{}_upper", label),
                    expr.clone().plus(slack, -1.0),
                    Comparison::Le,
                    rhs,
                );
                self.built.model.add_constraint(
                    format!("{}_lower", label),
                    expr.plus(slack, 1.0),
                    Comparison::Ge,
                    rhs,
                );
            }
        }
    }

    fn add_penalty(&mut self, rule: Rule, subject: Subject, name: String, max: Option<f64>) -> VarId {
        let var = self.built.model.add_integer(name, 0.0, max);
        let weight = self.config.weight(rule);
        self.objective.add(var, -weight);
        self.built.penalties.push(PenaltyTerm {
            rule,
            subject,
            var,
            weight,
        });
        var
    }

    fn section_label(&self, section: SectionIdx) -> &str {
        &self.domain.section(section).id
    }

    fn period_label(&self, period: PeriodIdx) -> &str {
        &self.domain.period(period).code
    }

    fn add_variables(&mut self) {
        let domain = self.domain;
        let availability = self.availability;
        for section in domain.section_indices() {
            for period in availability.legal_periods(section) {
                let name = format!("z_{}_{}", self.section_label(section), self.period_label(*period));
                let var = self.built.model.add_binary(name);
                self.built.z.insert((section, *period), var);
            }
        }

        for student in domain.student_indices() {
            let student_id = &domain.student(student).id;
            for course in &domain.student(student).requests {
                for section in domain.sections_of_course(*course) {
                    let legal = availability.legal_periods(*section);
                    if legal.is_empty() {
                        continue;
                    }
                    let section_id = &domain.section(*section).id;
                    let x = self
                        .built
                        .model
                        .add_binary(format!("x_{}_{}", student_id, section_id));
                    self.built.x.insert((student, *section), x);
                    self.objective.add(x, 1.0);
                    for period in legal {
                        let name = format!(
                            "y_{}_{}_{}",
                            student_id,
                            section_id,
                            domain.period(*period).code
                        );
                        let y = self.built.model.add_binary(name);
                        self.built.y.insert((student, *section, *period), y);
                    }
                }
            }
        }

        let (z, x, y) = self.built.counts();
        debug!("Generated {} z, {} x and {} y variables", z, x, y);
    }

    fn z_vars(&self, section: SectionIdx) -> Vec<VarId> {
        self.availability
            .legal_periods(section)
            .iter()
            .filter_map(|p| self.built.z(section, *p))
            .collect()
    }

    fn add_section_placement(&mut self) {
        debug!("Adding 'section scheduled once' and period pin constraints...");
        let domain = self.domain;
        for section in domain.section_indices() {
            let vars = self.z_vars(section);
            if vars.is_empty() {
                continue;
            }
            let label = format!("once_{}", self.section_label(section));
            self.built
                .model
                .add_constraint(label, LinearExpr::sum(vars), Comparison::Eq, 1.0);

            if let Some(pin) = &domain.course(domain.section(section).course).pin {
                let pinned: Vec<VarId> = pin
                    .iter()
                    .filter_map(|p| self.built.z(section, *p))
                    .collect();
                let label = format!("pin_{}", self.section_label(section));
                self.built
                    .model
                    .add_constraint(label, LinearExpr::sum(pinned), Comparison::Eq, 1.0);
            }
        }
    }

    fn add_enrollment_links(&mut self) {
        debug!("Adding enrollment linking constraints...");
        let domain = self.domain;
        let availability = self.availability;
        for student in domain.student_indices() {
            for course in &domain.student(student).requests {
                for section in domain.sections_of_course(*course) {
                    let Some(x) = self.built.x(student, *section) else {
                        continue;
                    };
                    let label = format!("{}_{}", domain.student(student).id, self.section_label(*section));
                    let mut ys = LinearExpr::new();
                    for period in availability.legal_periods(*section) {
                        let (Some(y), Some(z)) = (
                            self.built.y(student, *section, *period),
                            self.built.z(*section, *period),
                        ) else {
                            continue;
                        };
                        ys.add(y, 1.0);
                        self.built.model.add_constraint(
                            format!("y_le_z_{}_{}", label, self.period_label(*period)),
                            LinearExpr::new().plus(y, 1.0).plus(z, -1.0),
                            Comparison::Le,
                            0.0,
                        );
                    }
                    self.built.model.add_constraint(
                        format!("y_sum_{}", label),
                        ys.plus(x, -1.0),
                        Comparison::Eq,
                        0.0,
                    );
                    let mut scheduled = LinearExpr::new().plus(x, 1.0);
                    for z in self.z_vars(*section) {
                        scheduled.add(z, -1.0);
                    }
                    self.built.model.add_constraint(
                        format!("x_le_z_{}", label),
                        scheduled,
                        Comparison::Le,
                        0.0,
                    );
                }
            }
        }
    }

    fn add_requests(&mut self) {
        debug!("Adding one-section-per-request constraints...");
        let domain = self.domain;
        for student in domain.student_indices() {
            for &course in &domain.student(student).requests {
                let xs: Vec<VarId> = domain
                    .sections_of_course(course)
                    .iter()
                    .filter_map(|s| self.built.x(student, *s))
                    .collect();
                let label = format!("request_{}_{}", domain.student(student).id, domain.course(course).id);
                if !xs.is_empty() {
                    self.built.model.add_constraint(
                        format!("{}_at_most_one", label),
                        LinearExpr::sum(xs.clone()),
                        Comparison::Le,
                        1.0,
                    );
                }
                if self.config.is_hard(Rule::MissingCourse) {
                    self.built
                        .model
                        .add_constraint(label, LinearExpr::sum(xs), Comparison::Eq, 1.0);
                } else {
                    let subject = Subject::Request { student, course };
                    let miss = self.add_penalty(Rule::MissingCourse, subject, format!("miss_{}", label), Some(1.0));
                    self.built.model.add_constraint(
                        label,
                        LinearExpr::sum(xs).plus(miss, 1.0),
                        Comparison::Eq,
                        1.0,
                    );
                }
            }
        }
    }

    fn enrolled(&self, section: SectionIdx, sped_only: bool) -> Vec<VarId> {
        self.domain
            .student_indices()
            .filter(|s| !sped_only || self.domain.student(*s).sped)
            .filter_map(|s| self.built.x(s, section))
            .collect()
    }

    fn add_capacity(&mut self) {
        debug!("Adding section capacity constraints...");
        for section in self.domain.section_indices() {
            let xs = self.enrolled(section, false);
            let capacity = self.domain.section(section).capacity as usize;
            if xs.len() <= capacity {
                continue;
            }
            let excess = (xs.len() - capacity) as f64;
            self.add_rule(
                Rule::SectionOverload,
                Subject::Section(section),
                format!("capacity_{}", self.section_label(section)),
                LinearExpr::sum(xs),
                Comparison::Le,
                capacity as f64,
                Some(excess),
            );
        }
    }

    fn add_student_conflicts(&mut self) {
        debug!("Adding student period conflict constraints...");
        let domain = self.domain;
        for student in domain.student_indices() {
            for period in domain.period_indices() {
                let ys: Vec<VarId> = domain
                    .student(student)
                    .requests
                    .iter()
                    .flat_map(|c| domain.sections_of_course(*c).iter())
                    .filter_map(|s| self.built.y(student, *s, period))
                    .collect();
                if ys.len() < 2 {
                    continue;
                }
                let slack_max = (ys.len() - 1) as f64;
                self.add_rule(
                    Rule::StudentConflict,
                    Subject::StudentPeriod { student, period },
                    format!("student_{}_{}", domain.student(student).id, self.period_label(period)),
                    LinearExpr::sum(ys),
                    Comparison::Le,
                    1.0,
                    Some(slack_max),
                );
            }
        }
    }

    fn teacher_z_at(&self, teacher: TeacherIdx, period: PeriodIdx, labs_only: bool) -> Vec<VarId> {
        self.domain
            .sections_of_teacher(teacher)
            .iter()
            .filter(|s| !labs_only || self.domain.course(self.domain.section(**s).course).is_lab)
            .filter_map(|s| self.built.z(*s, period))
            .collect()
    }

    fn add_teacher_conflicts(&mut self) {
        debug!("Adding 'no teacher overlap' constraints...");
        let domain = self.domain;
        for teacher in domain.teacher_indices() {
            for period in domain.period_indices() {
                let zs = self.teacher_z_at(teacher, period, false);
                if zs.len() < 2 {
                    continue;
                }
                let slack_max = (zs.len() - 1) as f64;
                self.add_rule(
                    Rule::TeacherConflict,
                    Subject::TeacherPeriod { teacher, period },
                    format!("teacher_{}_{}", domain.teacher(teacher).id, self.period_label(period)),
                    LinearExpr::sum(zs),
                    Comparison::Le,
                    1.0,
                    Some(slack_max),
                );
            }
        }
    }

    fn add_pin_coverage(&mut self) {
        debug!("Adding pinned course coverage constraints...");
        let domain = self.domain;
        for course in domain.course_indices() {
            let Some(pin) = &domain.course(course).pin else {
                continue;
            };
            let sections = domain.sections_of_course(course);
            if sections.is_empty() {
                continue;
            }
            let (lower, upper) = pin_bounds(sections.len(), pin.len());
            for period in pin {
                let zs: Vec<VarId> = sections
                    .iter()
                    .filter_map(|s| self.built.z(*s, *period))
                    .collect();
                let label = format!("cover_{}_{}", domain.course(course).id, self.period_label(*period));
                let subject = Subject::CoursePeriod {
                    course,
                    period: *period,
                };
                if self.config.is_hard(Rule::SpecialCourseViolation) {
                    if lower > 0 {
                        self.built.model.add_constraint(
                            format!("{}_min", label),
                            LinearExpr::sum(zs.clone()),
                            Comparison::Ge,
                            lower as f64,
                        );
                    }
                    if zs.len() > upper {
                        self.built.model.add_constraint(
                            format!("{}_max", label),
                            LinearExpr::sum(zs),
                            Comparison::Le,
                            upper as f64,
                        );
                    }
                } else {
                    let slack_max = lower.max(zs.len().saturating_sub(upper)) as f64;
                    let slack = self.add_penalty(
                        Rule::SpecialCourseViolation,
                        subject,
                        format!("slack_{}", label),
                        Some(slack_max),
                    );
                    self.built.model.add_constraint(
                        format!("{}_min", label),
                        LinearExpr::sum(zs.clone()).plus(slack, 1.0),
                        Comparison::Ge,
                        lower as f64,
                    );
                    self.built.model.add_constraint(
                        format!("{}_max", label),
                        LinearExpr::sum(zs).plus(slack, -1.0),
                        Comparison::Le,
                        upper as f64,
                    );
                }
            }
        }
    }

    fn add_lab_adjacency(&mut self) {
        debug!("Adding lab prep adjacency constraints...");
        let domain = self.domain;
        let pairs = domain.adjacent_pairs();
        for teacher in domain.teacher_indices() {
            for (first, second) in &pairs {
                let before = self.teacher_z_at(teacher, *first, true);
                let after = self.teacher_z_at(teacher, *second, true);
                if before.is_empty() || after.is_empty() {
                    continue;
                }
                let slack_max = (before.len() + after.len() - 1) as f64;
                self.add_rule(
                    Rule::LabAdjacencyViolation,
                    Subject::TeacherPair {
                        teacher,
                        first: *first,
                        second: *second,
                    },
                    format!(
                        "lab_{}_{}_{}",
                        domain.teacher(teacher).id,
                        self.period_label(*first),
                        self.period_label(*second)
                    ),
                    LinearExpr::sum(before.into_iter().chain(after)),
                    Comparison::Le,
                    1.0,
                    Some(slack_max),
                );
            }
        }
    }

    fn add_contiguous_loads(&mut self) {
        let domain = self.domain;
        for teacher in domain.teacher_indices() {
            let Some(load) = domain.teacher(teacher).contiguous_load else {
                continue;
            };
            debug!("Adding contiguous load constraints for teacher {}", domain.teacher(teacher).id);
            let teacher_id = domain.teacher(teacher).id.clone();

            for period in domain.period_indices() {
                let name = format!("teaches_{}_{}", teacher_id, self.period_label(period));
                let indicator = self.built.model.add_binary(name.clone());
                self.built.teaches.insert((teacher, period), indicator);
                let mut definition = LinearExpr::new().plus(indicator, -1.0);
                for z in self.teacher_z_at(teacher, period, false) {
                    definition.add(z, 1.0);
                }
                self.built
                    .model
                    .add_constraint(name, definition, Comparison::Eq, 0.0);
            }

            for track in domain.tracks() {
                let periods = domain.periods_of_track(track);
                let daily = LinearExpr::sum(periods.iter().filter_map(|p| self.built.teaches(teacher, *p)));
                self.add_rule(
                    Rule::AdjacentLoad,
                    Subject::TeacherTrack {
                        teacher,
                        track: track.to_string(),
                    },
                    format!("load_{}_{}", teacher_id, track),
                    daily,
                    Comparison::Eq,
                    load as f64,
                    Some(periods.len().max(load as usize) as f64),
                );
            }

            if load < 2 {
                continue;
            }
            for period in domain.period_indices() {
                let Some(indicator) = self.built.teaches(teacher, period) else {
                    continue;
                };
                let mut isolated = LinearExpr::new().plus(indicator, 1.0);
                for neighbour in domain.neighbours(period) {
                    if let Some(n) = self.built.teaches(teacher, neighbour) {
                        isolated.add(n, -1.0);
                    }
                }
                let track = domain.period(period).track.clone();
                self.add_rule(
                    Rule::AdjacentLoad,
                    Subject::TeacherTrack { teacher, track },
                    format!("adjacent_{}_{}", teacher_id, self.period_label(period)),
                    isolated,
                    Comparison::Le,
                    0.0,
                    Some(1.0),
                );
            }
        }
    }

    fn add_sped_caps(&mut self) {
        debug!("Adding SPED distribution constraints...");
        let domain = self.domain;
        for section in domain.section_indices() {
            let course = domain.course(domain.section(section).course);
            let Some(cap) = course.sped_capacity_limit.or(self.config.default_sped_cap) else {
                continue;
            };
            let xs = self.enrolled(section, true);
            if xs.len() <= cap as usize {
                continue;
            }
            let excess = (xs.len() - cap as usize) as f64;
            self.add_rule(
                Rule::SpedOverload,
                Subject::Section(section),
                format!("sped_{}", self.section_label(section)),
                LinearExpr::sum(xs),
                Comparison::Le,
                cap as f64,
                Some(excess),
            );
        }
    }

    fn add_period_overlap(&mut self) {
        debug!("Adding per-period section caps...");
        let domain = self.domain;
        for course in domain.course_indices() {
            let Some(cap) = domain.course(course).max_sections_per_period else {
                continue;
            };
            for period in domain.period_indices() {
                let zs: Vec<VarId> = domain
                    .sections_of_course(course)
                    .iter()
                    .filter_map(|s| self.built.z(*s, period))
                    .collect();
                if zs.len() <= cap as usize {
                    continue;
                }
                let excess = (zs.len() - cap as usize) as f64;
                self.add_rule(
                    Rule::PeriodOverlap,
                    Subject::CoursePeriod { course, period },
                    format!("overlap_{}_{}", domain.course(course).id, self.period_label(period)),
                    LinearExpr::sum(zs),
                    Comparison::Le,
                    cap as f64,
                    Some(excess),
                );
            }
        }
    }

    fn add_balance(&mut self) {
        debug!("Adding section balancing terms...");
        let domain = self.domain;
        for course in domain.course_indices() {
            let loads: Vec<Vec<VarId>> = domain
                .sections_of_course(course)
                .iter()
                .map(|s| self.enrolled(*s, false))
                .filter(|xs| !xs.is_empty())
                .collect();
            if loads.len() < 2 {
                continue;
            }
            let course_id = domain.course(course).id.clone();
            let bound = loads.iter().map(Vec::len).max().unwrap_or(0) as f64;
            let l_max = self
                .built
                .model
                .add_integer(format!("l_max_{}", course_id), 0.0, Some(bound));
            let l_min = self
                .built
                .model
                .add_integer(format!("l_min_{}", course_id), 0.0, Some(bound));
            for (i, xs) in loads.into_iter().enumerate() {
                let load = LinearExpr::sum(xs);
                self.built.model.add_constraint(
                    format!("l_max_{}_{}", course_id, i),
                    load.clone().plus(l_max, -1.0),
                    Comparison::Le,
                    0.0,
                );
                self.built.model.add_constraint(
                    format!("l_min_{}_{}", course_id, i),
                    load.plus(l_min, -1.0),
                    Comparison::Ge,
                    0.0,
                );
            }
            let spread = self.add_penalty(
                Rule::Balance,
                Subject::Course(course),
                format!("spread_{}", course_id),
                Some(bound),
            );
            self.built.model.add_constraint(
                format!("spread_{}", course_id),
                LinearExpr::new()
                    .plus(spread, 1.0)
                    .plus(l_max, -1.0)
                    .plus(l_min, 1.0),
                Comparison::Ge,
                0.0,
            );
        }
    }
}

/// Minimum and maximum number of a pinned course's sections per pinned period.
pub fn pin_bounds(sections: usize, pin_size: usize) -> (usize, usize) {
    let lower = usize::from(sections >= pin_size);
    let upper = sections.div_ceil(pin_size.max(1));
    (lower, upper)
}
