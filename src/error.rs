use itertools::Itertools;
use std::fmt;

/// Which kind of input record an integrity error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Period,
    Course,
    Section,
    Teacher,
    Student,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Period => "period",
            EntityKind::Course => "course",
            EntityKind::Section => "section",
            EntityKind::Teacher => "teacher",
            EntityKind::Student => "student",
        };
        f.write_str(name)
    }
}

/// Fatal problems in the loaded records. Nothing is modelled past one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataIntegrityError {
    #[error("the period grid is empty")]
    EmptyPeriodGrid,
    #[error("duplicate {entity} id '{id}'")]
    DuplicateId { entity: EntityKind, id: String },
    #[error("{entity} '{id}' references unknown {target} '{reference}'")]
    UnknownReference {
        entity: EntityKind,
        id: String,
        target: EntityKind,
        reference: String,
    },
    #[error("malformed period code '{code}' in {context}")]
    MalformedPeriod { code: String, context: String },
    #[error("teacher '{teacher}' is not qualified to teach course '{course}' (section '{section}')")]
    Unqualified {
        teacher: String,
        section: String,
        course: String,
    },
    #[error("course '{course}' requires {required} sections but {actual} were loaded")]
    SectionCountMismatch {
        course: String,
        required: u32,
        actual: usize,
    },
    #[error("student '{student}' requests course '{course}' more than once")]
    DuplicateRequest { student: String, course: String },
    #[error("{file} references unknown {target} '{reference}'")]
    OrphanRecord {
        file: String,
        target: EntityKind,
        reference: String,
    },
}

/// One provable reason the model cannot be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralIssue {
    #[error("section '{section}' ({course}) has no legal period left for teacher '{teacher}'")]
    NoLegalPeriods {
        section: String,
        course: String,
        teacher: String,
    },
    #[error("course '{course}' has {requests} requests but only {capacity} seats")]
    CapacityShortfall {
        course: String,
        capacity: u64,
        requests: usize,
    },
    #[error("teacher '{teacher}' needs {sections} periods but only {available_periods} are available")]
    TeacherOverbooked {
        teacher: String,
        sections: usize,
        available_periods: usize,
    },
    #[error("teacher '{teacher}' has {sections} sections but a contiguous load needs exactly {required}")]
    LoadMismatch {
        teacher: String,
        sections: usize,
        required: usize,
    },
    #[error("teacher '{teacher}' must teach {load} periods on track {track} which only has {slots} slots")]
    LoadExceedsTrack {
        teacher: String,
        track: String,
        load: u32,
        slots: usize,
    },
    #[error("course '{course}' has {sections} sections but at most {cap} per period fit in {periods} periods")]
    OverlapCapTooTight {
        course: String,
        sections: usize,
        cap: u32,
        periods: usize,
    },
}

/// The model is provably infeasible before any solver time is spent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("structurally infeasible: {}", .issues.iter().join("; "))]
pub struct StructuralInfeasibility {
    pub issues: Vec<StructuralIssue>,
}

/// The solving engine failed for a reason other than infeasibility or the time budget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("solving engine failure: {0}")]
pub struct EngineError(pub String);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("penalty weight for '{rule}' must be positive and finite, got {weight}")]
    NonPositiveWeight { rule: String, weight: f64 },
    #[error("rule '{0}' cannot be enforced as a hard constraint")]
    HardNotSupported(String),
    #[error("time limit must be a positive, finite number of seconds, got {0}")]
    InvalidTimeLimit(f64),
    #[error("candidate list for '{0}' is empty")]
    EmptyCandidates(String),
    #[error("invalid port value")]
    InvalidPort,
    #[error("invalid host address: {0}")]
    InvalidHost(String),
}

/// Problems reading or writing flat record files.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("json error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything that can stop a solve attempt.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Integrity(#[from] DataIntegrityError),
    #[error(transparent)]
    Structural(#[from] StructuralInfeasibility),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Records(#[from] RecordError),
}

/// Failures starting or running the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_message_lists_every_issue() {
        let err = StructuralInfeasibility {
            issues: vec![
                StructuralIssue::NoLegalPeriods {
                    section: "S1".into(),
                    course: "Chemistry".into(),
                    teacher: "T1".into(),
                },
                StructuralIssue::CapacityShortfall {
                    course: "Algebra".into(),
                    capacity: 20,
                    requests: 25,
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("section 'S1'"));
        assert!(message.contains("25 requests but only 20 seats"));
    }

    #[test]
    fn integrity_error_names_the_record() {
        let err = DataIntegrityError::UnknownReference {
            entity: EntityKind::Section,
            id: "S9".into(),
            target: EntityKind::Teacher,
            reference: "T404".into(),
        };
        assert_eq!(
            err.to_string(),
            "section 'S9' references unknown teacher 'T404'"
        );
    }
}
