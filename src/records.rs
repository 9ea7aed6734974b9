//! Flat-file input and output.
//!
//! Input headers are accepted both in compact form (`SectionID`) and in the
//! spaced form (`Section ID`). List cells are separated by `;` or `,`.

use crate::data::{CourseRecord, SchedulingInput, SectionRecord, StudentRecord, TeacherRecord};
use crate::error::{DataIntegrityError, EntityKind, RecordError, ScheduleError};
use crate::extract::ScheduleTables;
use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

pub const SECTIONS_FILE: &str = "Sections_Information.csv";
pub const TEACHERS_FILE: &str = "Teacher_Info.csv";
pub const UNAVAILABILITY_FILE: &str = "Teacher_unavailability.csv";
pub const STUDENTS_FILE: &str = "Student_Info.csv";
pub const PREFERENCES_FILE: &str = "Student_Preference_Info.csv";
pub const COURSES_FILE: &str = "Courses.csv";

pub const MASTER_SCHEDULE_FILE: &str = "Master_Schedule.csv";
pub const STUDENT_ASSIGNMENTS_FILE: &str = "Student_Assignments.csv";
pub const TEACHER_ASSIGNMENTS_FILE: &str = "Teacher_Assignments.csv";
pub const UNMET_REQUESTS_FILE: &str = "Students_Unmet_Requests.csv";

#[derive(Debug, Deserialize)]
struct SectionRow {
    #[serde(rename = "SectionID", alias = "Section ID")]
    section_id: String,
    #[serde(rename = "CourseID", alias = "Course ID")]
    course_id: String,
    #[serde(rename = "TeacherAssigned", alias = "Teacher Assigned")]
    teacher: String,
    #[serde(rename = "SeatsAvailable", alias = "# of Seats Available")]
    seats: u32,
    #[serde(rename = "Department", default, deserialize_with = "empty_string_as_none")]
    department: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeacherRow {
    #[serde(rename = "TeacherID", alias = "Teacher ID")]
    teacher_id: String,
    #[serde(rename = "Department", default, deserialize_with = "empty_string_as_none")]
    department: Option<String>,
    #[serde(rename = "QualifiedCourses", alias = "Qualified Courses", default)]
    qualified_courses: String,
    #[serde(rename = "FreePeriods", alias = "Free Periods", default)]
    free_periods: String,
    #[serde(rename = "SpecialStatus", alias = "Special Status", default)]
    special_status: String,
}

#[derive(Debug, Deserialize)]
struct UnavailabilityRow {
    #[serde(rename = "TeacherID", alias = "Teacher ID")]
    teacher_id: String,
    #[serde(rename = "UnavailablePeriods", alias = "Unavailable Periods", default)]
    periods: String,
}

#[derive(Debug, Deserialize)]
struct StudentRow {
    #[serde(rename = "StudentID", alias = "Student ID")]
    student_id: String,
    #[serde(rename = "SPED", default, deserialize_with = "flag")]
    sped: bool,
    #[serde(rename = "GradeLevel", alias = "Grade Level", default)]
    grade_level: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct PreferenceRow {
    #[serde(rename = "StudentID", alias = "Student ID")]
    student_id: String,
    #[serde(rename = "PreferredSections", alias = "Preferred Sections", default)]
    courses: String,
}

#[derive(Debug, Deserialize)]
struct CourseRow {
    #[serde(rename = "CourseID", alias = "Course ID")]
    course_id: String,
    #[serde(rename = "RequiredSections", alias = "Required Sections", default)]
    required_sections: Option<u32>,
    #[serde(rename = "IsLab", alias = "Is Lab", default, deserialize_with = "flag")]
    is_lab: bool,
    #[serde(rename = "SpedCapacityLimit", alias = "SPED Capacity Limit", default)]
    sped_capacity_limit: Option<u32>,
    #[serde(rename = "PeriodPin", alias = "Period Pin", default)]
    period_pin: String,
    #[serde(rename = "MaxSectionsPerPeriod", alias = "Max Sections Per Period", default)]
    max_sections_per_period: Option<u32>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts `1/0`, `yes/no`, `y/n` and `true/false`; an empty cell is `false`.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "y" | "true" => Ok(true),
        "" | "0" | "no" | "n" | "false" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid flag '{}'", other))),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split([';', ','])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// `contiguous:N` in the special status column.
fn contiguous_load(status: &str) -> Option<u32> {
    let (key, value) = status.trim().split_once(':')?;
    if key.trim().eq_ignore_ascii_case("contiguous") {
        value.trim().parse().ok()
    } else {
        None
    }
}

fn reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

pub fn parse_sections<R: Read>(input: R) -> Result<Vec<SectionRecord>, csv::Error> {
    let mut sections = Vec::new();
    for row in reader(input).deserialize::<SectionRow>() {
        let row = row?;
        sections.push(SectionRecord {
            id: row.section_id,
            course_id: row.course_id,
            teacher_id: row.teacher,
            capacity: row.seats,
            department: row.department,
        });
    }
    Ok(sections)
}

pub fn parse_teachers<R: Read>(input: R) -> Result<Vec<TeacherRecord>, csv::Error> {
    let mut teachers = Vec::new();
    for row in reader(input).deserialize::<TeacherRow>() {
        let row = row?;
        teachers.push(TeacherRecord {
            id: row.teacher_id,
            department: row.department,
            qualified_courses: split_list(&row.qualified_courses),
            unavailable_periods: split_list(&row.free_periods),
            contiguous_load: contiguous_load(&row.special_status),
        });
    }
    Ok(teachers)
}

pub fn parse_unavailability<R: Read>(input: R) -> Result<Vec<(String, Vec<String>)>, csv::Error> {
    reader(input)
        .deserialize::<UnavailabilityRow>()
        .map(|row| row.map(|row| (row.teacher_id, split_list(&row.periods))))
        .collect()
}

pub fn parse_students<R: Read>(input: R) -> Result<Vec<StudentRecord>, csv::Error> {
    let mut students = Vec::new();
    for row in reader(input).deserialize::<StudentRow>() {
        let row = row?;
        students.push(StudentRecord {
            id: row.student_id,
            sped: row.sped,
            grade_level: row.grade_level,
            requested_courses: Vec::new(),
        });
    }
    Ok(students)
}

pub fn parse_preferences<R: Read>(input: R) -> Result<Vec<(String, Vec<String>)>, csv::Error> {
    reader(input)
        .deserialize::<PreferenceRow>()
        .map(|row| row.map(|row| (row.student_id, split_list(&row.courses))))
        .collect()
}

pub fn parse_courses<R: Read>(input: R) -> Result<Vec<CourseRecord>, csv::Error> {
    let mut courses = Vec::new();
    for row in reader(input).deserialize::<CourseRow>() {
        let row = row?;
        courses.push(CourseRecord {
            id: row.course_id,
            required_sections: row.required_sections,
            is_lab: row.is_lab,
            sped_capacity_limit: row.sped_capacity_limit,
            period_pin: split_list(&row.period_pin),
            max_sections_per_period: row.max_sections_per_period,
        });
    }
    Ok(courses)
}

fn open(path: &Path) -> Result<File, RecordError> {
    File::open(path).map_err(|source| RecordError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse_file<T>(
    path: &Path,
    parse: impl FnOnce(File) -> Result<T, csv::Error>,
) -> Result<T, RecordError> {
    parse(open(path)?).map_err(|source| RecordError::Csv {
        path: path.display().to_string(),
        source,
    })
}

fn parse_optional<T: Default>(
    path: &Path,
    parse: impl FnOnce(File) -> Result<T, csv::Error>,
) -> Result<T, RecordError> {
    if path.exists() {
        parse_file(path, parse)
    } else {
        debug!("{} not found, using defaults", path.display());
        Ok(T::default())
    }
}

/// Loads the CSV files of `dir` into a [`SchedulingInput`] on the default
/// period grid.
pub fn load_input(dir: &Path) -> Result<SchedulingInput, ScheduleError> {
    let sections = parse_file(&dir.join(SECTIONS_FILE), parse_sections)?;
    let mut teachers = parse_file(&dir.join(TEACHERS_FILE), parse_teachers)?;
    let unavailability = parse_optional(&dir.join(UNAVAILABILITY_FILE), parse_unavailability)?;
    let mut students = parse_file(&dir.join(STUDENTS_FILE), parse_students)?;
    let preferences = parse_file(&dir.join(PREFERENCES_FILE), parse_preferences)?;
    let courses = parse_optional(&dir.join(COURSES_FILE), parse_courses)?;

    let teacher_lookup: HashMap<String, usize> = teachers
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.clone(), i))
        .collect();
    for (teacher_id, periods) in unavailability {
        let idx = teacher_lookup
            .get(&teacher_id)
            .ok_or_else(|| DataIntegrityError::OrphanRecord {
                file: UNAVAILABILITY_FILE.to_string(),
                target: EntityKind::Teacher,
                reference: teacher_id.clone(),
            })?;
        let unavailable = &mut teachers[*idx].unavailable_periods;
        for period in periods {
            if !unavailable.contains(&period) {
                unavailable.push(period);
            }
        }
    }

    let student_lookup: HashMap<String, usize> = students
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.clone(), i))
        .collect();
    for (student_id, requested) in preferences {
        let idx = student_lookup
            .get(&student_id)
            .ok_or_else(|| DataIntegrityError::OrphanRecord {
                file: PREFERENCES_FILE.to_string(),
                target: EntityKind::Student,
                reference: student_id.clone(),
            })?;
        students[*idx].requested_courses.extend(requested);
    }

    info!(
        "Loaded {} sections, {} teachers and {} students from {}",
        sections.len(),
        teachers.len(),
        students.len(),
        dir.display()
    );
    Ok(SchedulingInput {
        courses,
        sections,
        teachers,
        students,
        ..Default::default()
    })
}

fn write_rows<S: Serialize>(path: &Path, headers: &[&str], rows: &[S]) -> Result<(), RecordError> {
    let csv_error = |source| RecordError::Csv {
        path: path.display().to_string(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_error)?;
    writer.write_record(headers).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| RecordError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Writes the four output tables into `dir`, creating it when needed.
pub fn write_tables(dir: &Path, tables: &ScheduleTables) -> Result<(), RecordError> {
    fs::create_dir_all(dir).map_err(|source| RecordError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let master: Vec<(&str, &str)> = tables
        .master_schedule
        .iter()
        .map(|row| (row.section_id.as_str(), row.period.as_str()))
        .collect();
    write_rows(&dir.join(MASTER_SCHEDULE_FILE), &["SectionID", "Period"], &master)?;

    let students: Vec<(&str, &str)> = tables
        .student_assignments
        .iter()
        .map(|row| (row.student_id.as_str(), row.section_id.as_str()))
        .collect();
    write_rows(
        &dir.join(STUDENT_ASSIGNMENTS_FILE),
        &["StudentID", "SectionID"],
        &students,
    )?;

    let teachers: Vec<(&str, &str, &str)> = tables
        .teacher_assignments
        .iter()
        .map(|row| (row.teacher_id.as_str(), row.section_id.as_str(), row.period.as_str()))
        .collect();
    write_rows(
        &dir.join(TEACHER_ASSIGNMENTS_FILE),
        &["TeacherID", "SectionID", "Period"],
        &teachers,
    )?;

    let unmet: Vec<(&str, String)> = tables
        .unmet_requests
        .iter()
        .map(|row| (row.student_id.as_str(), row.courses.join(",")))
        .collect();
    write_rows(
        &dir.join(UNMET_REQUESTS_FILE),
        &["StudentID", "UnmetRequests"],
        &unmet,
    )?;

    debug!("Wrote output tables to {}", dir.display());
    Ok(())
}

/// Pretty-printed JSON file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), RecordError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| RecordError::Json {
        path: path.display().to_string(),
        source,
    })?;
    let mut file = File::create(path).map_err(|source| RecordError::Io {
        path: path.display().to_string(),
        source,
    })?;
    file.write_all(&json).map_err(|source| RecordError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, RecordError> {
    let file = open(path)?;
    serde_json::from_reader(file).map_err(|source| RecordError::Json {
        path: path.display().to_string(),
        source,
    })
}
