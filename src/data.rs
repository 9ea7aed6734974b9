use serde::{Deserialize, Serialize};

// Type aliases for clarity
pub type SectionId = String;
pub type CourseId = String;
pub type TeacherId = String;
pub type StudentId = String;
pub type PeriodCode = String;

/// The period grid used when the input does not name one: two alternating
/// day-tracks with four slots each.
pub const DEFAULT_PERIODS: [&str; 8] = ["R1", "R2", "R3", "R4", "G1", "G2", "G3", "G4"];

fn default_periods() -> Vec<PeriodCode> {
    DEFAULT_PERIODS.iter().map(|p| p.to_string()).collect()
}

/// A course offering. Courses that only appear through their sections are
/// derived with default flags, so this record is only needed for flags and pins.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    pub id: CourseId,
    #[serde(default)]
    pub required_sections: Option<u32>,
    #[serde(default)]
    pub is_lab: bool,
    #[serde(default)]
    pub sped_capacity_limit: Option<u32>,
    /// Periods the sections of this course are restricted to. Empty means unpinned.
    #[serde(default)]
    pub period_pin: Vec<PeriodCode>,
    /// At most this many sections of the course may share a period.
    #[serde(default)]
    pub max_sections_per_period: Option<u32>,
}

/// One teachable instance of a course.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    pub id: SectionId,
    pub course_id: CourseId,
    pub teacher_id: TeacherId,
    pub capacity: u32,
    #[serde(default)]
    pub department: Option<String>,
}

/// Represents a teacher with their scheduling constraints.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherRecord {
    pub id: TeacherId,
    #[serde(default)]
    pub department: Option<String>,
    /// Empty means the teacher may teach any course.
    #[serde(default)]
    pub qualified_courses: Vec<CourseId>,
    #[serde(default)]
    pub unavailable_periods: Vec<PeriodCode>,
    /// Teaches exactly this many periods per day-track, each next to another taught period.
    #[serde(default)]
    pub contiguous_load: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: StudentId,
    #[serde(default)]
    pub sped: bool,
    #[serde(default)]
    pub grade_level: Option<u8>,
    #[serde(default)]
    pub requested_courses: Vec<CourseId>,
}

/// The complete input for the scheduling problem.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingInput {
    #[serde(default = "default_periods")]
    pub periods: Vec<PeriodCode>,
    /// Slots after which the next slot of the same track does not count as adjacent.
    #[serde(default)]
    pub period_breaks: Vec<u16>,
    #[serde(default)]
    pub courses: Vec<CourseRecord>,
    pub sections: Vec<SectionRecord>,
    pub teachers: Vec<TeacherRecord>,
    pub students: Vec<StudentRecord>,
}

impl Default for SchedulingInput {
    fn default() -> Self {
        Self {
            periods: default_periods(),
            period_breaks: Vec::new(),
            courses: Vec::new(),
            sections: Vec::new(),
            teachers: Vec::new(),
            students: Vec::new(),
        }
    }
}
