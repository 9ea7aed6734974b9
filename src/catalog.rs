//! The constraint catalog: every rule the model builder can enforce either as
//! a hard constraint or as a weighted slack, in one table.
//!
//! The model builder reads a rule's mode and weight from here (through
//! [`crate::config::SolveConfig`]) and the penalty tuner enumerates the same
//! keys, so adding a rule means adding one row.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Hard,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// A student gets a section of every course they requested.
    MissingCourse,
    /// Enrollment stays within a section's seats.
    SectionOverload,
    /// A student attends at most one section per period.
    StudentConflict,
    /// A teacher teaches at most one section per period.
    TeacherConflict,
    /// Pinned courses cover their pinned periods.
    SpecialCourseViolation,
    /// A teacher never teaches lab sections in two adjacent periods.
    LabAdjacencyViolation,
    /// SPED enrollment per section stays within the cap.
    SpedOverload,
    /// Contiguous-load teachers teach their exact daily load in adjacent periods.
    AdjacentLoad,
    /// A course with a per-period section cap never exceeds it.
    PeriodOverlap,
    /// Sections of a multi-section course carry similar enrollment.
    Balance,
}

/// One row of the catalog.
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub rule: Rule,
    pub key: &'static str,
    pub description: &'static str,
    pub default_mode: Mode,
    pub default_weight: f64,
    pub allows_hard: bool,
}

pub const CATALOG: [RuleSpec; 10] = [
    RuleSpec {
        rule: Rule::MissingCourse,
        key: "missing_course",
        description: "student request left without a section",
        default_mode: Mode::Soft,
        default_weight: 1000.0,
        allows_hard: true,
    },
    RuleSpec {
        rule: Rule::SectionOverload,
        key: "section_overload",
        description: "seats over section capacity",
        default_mode: Mode::Soft,
        default_weight: 100.0,
        allows_hard: true,
    },
    RuleSpec {
        rule: Rule::StudentConflict,
        key: "student_conflict",
        description: "student booked twice in one period",
        default_mode: Mode::Hard,
        default_weight: 750.0,
        allows_hard: true,
    },
    RuleSpec {
        rule: Rule::TeacherConflict,
        key: "teacher_conflict",
        description: "teacher booked twice in one period",
        default_mode: Mode::Hard,
        default_weight: 800.0,
        allows_hard: true,
    },
    RuleSpec {
        rule: Rule::SpecialCourseViolation,
        key: "special_course_violation",
        description: "pinned course not covering its pinned periods",
        default_mode: Mode::Soft,
        default_weight: 800.0,
        allows_hard: true,
    },
    RuleSpec {
        rule: Rule::LabAdjacencyViolation,
        key: "lab_adjacency_violation",
        description: "lab sections taught back to back without prep",
        default_mode: Mode::Soft,
        default_weight: 400.0,
        allows_hard: true,
    },
    RuleSpec {
        rule: Rule::SpedOverload,
        key: "sped_overload",
        description: "SPED students over the per-section cap",
        default_mode: Mode::Soft,
        default_weight: 250.0,
        allows_hard: true,
    },
    RuleSpec {
        rule: Rule::AdjacentLoad,
        key: "adjacent_load",
        description: "contiguous teaching load broken",
        default_mode: Mode::Hard,
        default_weight: 500.0,
        allows_hard: true,
    },
    RuleSpec {
        rule: Rule::PeriodOverlap,
        key: "period_overlap",
        description: "more sections of a capped course in one period than allowed",
        default_mode: Mode::Soft,
        default_weight: 600.0,
        allows_hard: true,
    },
    RuleSpec {
        rule: Rule::Balance,
        key: "balance",
        description: "enrollment spread across sections of a course",
        default_mode: Mode::Soft,
        default_weight: 50.0,
        allows_hard: false,
    },
];

impl Rule {
    pub const ALL: [Rule; 10] = [
        Rule::MissingCourse,
        Rule::SectionOverload,
        Rule::StudentConflict,
        Rule::TeacherConflict,
        Rule::SpecialCourseViolation,
        Rule::LabAdjacencyViolation,
        Rule::SpedOverload,
        Rule::AdjacentLoad,
        Rule::PeriodOverlap,
        Rule::Balance,
    ];

    pub fn spec(self) -> &'static RuleSpec {
        // CATALOG rows are in declaration order.
        &CATALOG[self as usize]
    }

    pub fn key(self) -> &'static str {
        self.spec().key
    }

    pub fn from_key(key: &str) -> Option<Rule> {
        CATALOG.iter().find(|spec| spec.key == key).map(|spec| spec.rule)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
