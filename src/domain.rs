//! The validated, index-addressed domain model.
//!
//! Records from [`crate::data`] are checked once and turned into arenas
//! addressed by small typed indices, so every decision-variable key in the
//! model builder is a tuple of these indices rather than loose strings.

use crate::data::SchedulingInput;
use crate::error::{DataIntegrityError, EntityKind};
use log::debug;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

macro_rules! typed_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub fn new(index: usize) -> Self {
                Self(index as u32)
            }

            #[inline]
            pub fn get(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

typed_index!(
    /// Position of a period in the grid.
    PeriodIdx
);
typed_index!(CourseIdx);
typed_index!(SectionIdx);
typed_index!(TeacherIdx);
typed_index!(StudentIdx);

/// A period: a day-track plus an ordinal slot within that track.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Period {
    pub code: String,
    pub track: String,
    pub slot: u16,
}

impl Period {
    /// Parses codes such as `R1` or `Day3`: leading letters name the track,
    /// trailing digits the slot.
    pub fn parse(code: &str) -> Option<Period> {
        let code = code.trim();
        let split = code.find(|c: char| c.is_ascii_digit())?;
        let (track, slot) = code.split_at(split);
        if track.is_empty() || !slot.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let slot = slot.parse::<u16>().ok()?;
        Some(Period {
            code: code.to_string(),
            track: track.to_string(),
            slot,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Course {
    pub id: String,
    pub required_sections: Option<u32>,
    pub is_lab: bool,
    pub sped_capacity_limit: Option<u32>,
    pub pin: Option<BTreeSet<PeriodIdx>>,
    pub max_sections_per_period: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Section {
    pub id: String,
    pub course: CourseIdx,
    pub teacher: TeacherIdx,
    pub capacity: u32,
    pub department: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Teacher {
    pub id: String,
    pub department: Option<String>,
    pub qualified: BTreeSet<CourseIdx>,
    pub unavailable: BTreeSet<PeriodIdx>,
    pub contiguous_load: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Student {
    pub id: String,
    pub sped: bool,
    pub grade_level: Option<u8>,
    pub requests: Vec<CourseIdx>,
}

/// Immutable, validated input for any number of solve attempts.
#[derive(Debug, Clone)]
pub struct Domain {
    periods: Vec<Period>,
    breaks: BTreeSet<u16>,
    courses: Vec<Course>,
    sections: Vec<Section>,
    teachers: Vec<Teacher>,
    students: Vec<Student>,
    sections_by_course: Vec<Vec<SectionIdx>>,
    sections_by_teacher: Vec<Vec<SectionIdx>>,
}

fn index_unique<'a, I>(
    entity: EntityKind,
    ids: I,
) -> Result<HashMap<&'a str, usize>, DataIntegrityError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut map = HashMap::new();
    for (i, id) in ids.into_iter().enumerate() {
        if map.insert(id, i).is_some() {
            return Err(DataIntegrityError::DuplicateId {
                entity,
                id: id.to_string(),
            });
        }
    }
    Ok(map)
}

impl Domain {
    pub fn from_input(input: &SchedulingInput) -> Result<Domain, DataIntegrityError> {
        if input.periods.is_empty() {
            return Err(DataIntegrityError::EmptyPeriodGrid);
        }
        let mut periods = Vec::with_capacity(input.periods.len());
        for code in &input.periods {
            let period = Period::parse(code).ok_or_else(|| DataIntegrityError::MalformedPeriod {
                code: code.clone(),
                context: "period grid".to_string(),
            })?;
            periods.push(period);
        }
        let period_lookup = index_unique(EntityKind::Period, periods.iter().map(|p| p.code.as_str()))?;
        let resolve_period = |code: &str, context: &str| -> Result<PeriodIdx, DataIntegrityError> {
            period_lookup
                .get(code.trim())
                .map(|i| PeriodIdx::new(*i))
                .ok_or_else(|| DataIntegrityError::MalformedPeriod {
                    code: code.to_string(),
                    context: context.to_string(),
                })
        };

        // declared courses first, then any course only named by a section
        let mut courses = Vec::new();
        index_unique(EntityKind::Course, input.courses.iter().map(|c| c.id.as_str()))?;
        for record in &input.courses {
            let pin = if record.period_pin.is_empty() {
                None
            } else {
                let context = format!("period pin of course '{}'", record.id);
                let set = record
                    .period_pin
                    .iter()
                    .map(|code| resolve_period(code, &context))
                    .collect::<Result<BTreeSet<_>, _>>()?;
                Some(set)
            };
            courses.push(Course {
                id: record.id.clone(),
                required_sections: record.required_sections,
                is_lab: record.is_lab,
                sped_capacity_limit: record.sped_capacity_limit,
                pin,
                max_sections_per_period: record.max_sections_per_period,
            });
        }
        let mut course_lookup: HashMap<String, usize> = courses
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        for section in &input.sections {
            if !course_lookup.contains_key(&section.course_id) {
                course_lookup.insert(section.course_id.clone(), courses.len());
                courses.push(Course {
                    id: section.course_id.clone(),
                    required_sections: None,
                    is_lab: false,
                    sped_capacity_limit: None,
                    pin: None,
                    max_sections_per_period: None,
                });
            }
        }

        let teacher_lookup =
            index_unique(EntityKind::Teacher, input.teachers.iter().map(|t| t.id.as_str()))?;
        let mut teachers = Vec::with_capacity(input.teachers.len());
        for record in &input.teachers {
            let mut qualified = BTreeSet::new();
            for course in &record.qualified_courses {
                let idx = course_lookup.get(course).ok_or_else(|| {
                    DataIntegrityError::UnknownReference {
                        entity: EntityKind::Teacher,
                        id: record.id.clone(),
                        target: EntityKind::Course,
                        reference: course.clone(),
                    }
                })?;
                qualified.insert(CourseIdx::new(*idx));
            }
            let context = format!("unavailability of teacher '{}'", record.id);
            let unavailable = record
                .unavailable_periods
                .iter()
                .filter(|code| !code.trim().is_empty())
                .map(|code| resolve_period(code, &context))
                .collect::<Result<BTreeSet<_>, _>>()?;
            teachers.push(Teacher {
                id: record.id.clone(),
                department: record.department.clone(),
                qualified,
                unavailable,
                contiguous_load: record.contiguous_load,
            });
        }

        index_unique(EntityKind::Section, input.sections.iter().map(|s| s.id.as_str()))?;
        let mut sections = Vec::with_capacity(input.sections.len());
        let mut sections_by_course = vec![Vec::new(); courses.len()];
        let mut sections_by_teacher = vec![Vec::new(); teachers.len()];
        for (i, record) in input.sections.iter().enumerate() {
            let course = CourseIdx::new(course_lookup[&record.course_id]);
            let teacher = teacher_lookup
                .get(record.teacher_id.as_str())
                .map(|t| TeacherIdx::new(*t))
                .ok_or_else(|| DataIntegrityError::UnknownReference {
                    entity: EntityKind::Section,
                    id: record.id.clone(),
                    target: EntityKind::Teacher,
                    reference: record.teacher_id.clone(),
                })?;
            let qualified = &teachers[teacher.get()].qualified;
            if !qualified.is_empty() && !qualified.contains(&course) {
                return Err(DataIntegrityError::Unqualified {
                    teacher: record.teacher_id.clone(),
                    section: record.id.clone(),
                    course: record.course_id.clone(),
                });
            }
            let idx = SectionIdx::new(i);
            sections_by_course[course.get()].push(idx);
            sections_by_teacher[teacher.get()].push(idx);
            sections.push(Section {
                id: record.id.clone(),
                course,
                teacher,
                capacity: record.capacity,
                department: record.department.clone(),
            });
        }

        for (course, owned) in courses.iter().zip(&sections_by_course) {
            if let Some(required) = course.required_sections {
                if required as usize != owned.len() {
                    return Err(DataIntegrityError::SectionCountMismatch {
                        course: course.id.clone(),
                        required,
                        actual: owned.len(),
                    });
                }
            }
        }

        index_unique(EntityKind::Student, input.students.iter().map(|s| s.id.as_str()))?;
        let mut students = Vec::with_capacity(input.students.len());
        for record in &input.students {
            let mut requests = Vec::with_capacity(record.requested_courses.len());
            let mut seen = HashSet::new();
            for course in &record.requested_courses {
                let idx = course_lookup.get(course).ok_or_else(|| {
                    DataIntegrityError::UnknownReference {
                        entity: EntityKind::Student,
                        id: record.id.clone(),
                        target: EntityKind::Course,
                        reference: course.clone(),
                    }
                })?;
                if !seen.insert(*idx) {
                    return Err(DataIntegrityError::DuplicateRequest {
                        student: record.id.clone(),
                        course: course.clone(),
                    });
                }
                requests.push(CourseIdx::new(*idx));
            }
            students.push(Student {
                id: record.id.clone(),
                sped: record.sped,
                grade_level: record.grade_level,
                requests,
            });
        }

        debug!(
            "Loaded domain: {} periods, {} courses, {} sections, {} teachers, {} students",
            periods.len(),
            courses.len(),
            sections.len(),
            teachers.len(),
            students.len()
        );

        Ok(Domain {
            periods,
            breaks: input.period_breaks.iter().copied().collect(),
            courses,
            sections,
            teachers,
            students,
            sections_by_course,
            sections_by_teacher,
        })
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn period(&self, idx: PeriodIdx) -> &Period {
        &self.periods[idx.get()]
    }

    pub fn period_indices(&self) -> impl Iterator<Item = PeriodIdx> + '_ {
        (0..self.periods.len()).map(PeriodIdx::new)
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn course(&self, idx: CourseIdx) -> &Course {
        &self.courses[idx.get()]
    }

    pub fn course_indices(&self) -> impl Iterator<Item = CourseIdx> + '_ {
        (0..self.courses.len()).map(CourseIdx::new)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, idx: SectionIdx) -> &Section {
        &self.sections[idx.get()]
    }

    pub fn section_indices(&self) -> impl Iterator<Item = SectionIdx> + '_ {
        (0..self.sections.len()).map(SectionIdx::new)
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn teacher(&self, idx: TeacherIdx) -> &Teacher {
        &self.teachers[idx.get()]
    }

    pub fn teacher_indices(&self) -> impl Iterator<Item = TeacherIdx> + '_ {
        (0..self.teachers.len()).map(TeacherIdx::new)
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn student(&self, idx: StudentIdx) -> &Student {
        &self.students[idx.get()]
    }

    pub fn student_indices(&self) -> impl Iterator<Item = StudentIdx> + '_ {
        (0..self.students.len()).map(StudentIdx::new)
    }

    pub fn sections_of_course(&self, course: CourseIdx) -> &[SectionIdx] {
        &self.sections_by_course[course.get()]
    }

    pub fn sections_of_teacher(&self, teacher: TeacherIdx) -> &[SectionIdx] {
        &self.sections_by_teacher[teacher.get()]
    }

    /// Distinct day-tracks in grid order.
    pub fn tracks(&self) -> Vec<&str> {
        let mut tracks: Vec<&str> = Vec::new();
        for period in &self.periods {
            if !tracks.contains(&period.track.as_str()) {
                tracks.push(&period.track);
            }
        }
        tracks
    }

    /// Periods of one track ordered by slot.
    pub fn periods_of_track(&self, track: &str) -> Vec<PeriodIdx> {
        let mut periods: Vec<PeriodIdx> = self
            .period_indices()
            .filter(|p| self.period(*p).track == track)
            .collect();
        periods.sort_by_key(|p| self.period(*p).slot);
        periods
    }

    /// True when `b` directly follows `a` on the same track without a break between them.
    pub fn are_adjacent(&self, a: PeriodIdx, b: PeriodIdx) -> bool {
        let (pa, pb) = (self.period(a), self.period(b));
        pa.track == pb.track
            && pa.slot.checked_add(1) == Some(pb.slot)
            && !self.breaks.contains(&pa.slot)
    }

    /// Every adjacent `(earlier, later)` pair in the grid.
    pub fn adjacent_pairs(&self) -> Vec<(PeriodIdx, PeriodIdx)> {
        let mut pairs = Vec::new();
        for track in self.tracks() {
            let ordered = self.periods_of_track(track);
            for window in ordered.windows(2) {
                if self.are_adjacent(window[0], window[1]) {
                    pairs.push((window[0], window[1]));
                }
            }
        }
        pairs
    }

    /// Adjacent periods on either side of `period`.
    pub fn neighbours(&self, period: PeriodIdx) -> Vec<PeriodIdx> {
        self.period_indices()
            .filter(|other| self.are_adjacent(*other, period) || self.are_adjacent(period, *other))
            .collect()
    }

    /// Students who requested `course`, in input order.
    pub fn requesters(&self, course: CourseIdx) -> impl Iterator<Item = StudentIdx> + '_ {
        self.student_indices()
            .filter(move |s| self.student(*s).requests.contains(&course))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::{CourseRecord, SectionRecord, StudentRecord, TeacherRecord};

    pub(crate) fn section(id: &str, course: &str, teacher: &str, capacity: u32) -> SectionRecord {
        SectionRecord {
            id: id.into(),
            course_id: course.into(),
            teacher_id: teacher.into(),
            capacity,
            department: None,
        }
    }

    pub(crate) fn teacher(id: &str) -> TeacherRecord {
        TeacherRecord {
            id: id.into(),
            ..Default::default()
        }
    }

    pub(crate) fn student(id: &str, courses: &[&str]) -> StudentRecord {
        StudentRecord {
            id: id.into(),
            requested_courses: courses.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn basic_input() -> SchedulingInput {
        SchedulingInput {
            sections: vec![
                section("S1", "Algebra", "T1", 20),
                section("S2", "Algebra", "T2", 20),
                section("S3", "Biology", "T1", 15),
            ],
            teachers: vec![teacher("T1"), teacher("T2")],
            students: vec![student("A", &["Algebra", "Biology"]), student("B", &["Algebra"])],
            ..Default::default()
        }
    }

    #[test]
    fn parses_period_codes() {
        let p = Period::parse("G3").unwrap();
        assert_eq!(p.track, "G");
        assert_eq!(p.slot, 3);
        assert!(Period::parse("3").is_none());
        assert!(Period::parse("R").is_none());
        assert!(Period::parse("R1a").is_none());
    }

    #[test]
    fn builds_indexed_domain_with_derived_courses() {
        let domain = Domain::from_input(&basic_input()).unwrap();
        assert_eq!(domain.courses().len(), 2);
        let algebra = CourseIdx::new(0);
        assert_eq!(domain.course(algebra).id, "Algebra");
        assert_eq!(domain.sections_of_course(algebra).len(), 2);
        assert_eq!(domain.sections_of_teacher(TeacherIdx::new(0)).len(), 2);
        assert_eq!(domain.requesters(algebra).count(), 2);
    }

    #[test]
    fn rejects_dangling_teacher_reference() {
        let mut input = basic_input();
        input.sections.push(section("S4", "Algebra", "T9", 10));
        let err = Domain::from_input(&input).unwrap_err();
        assert_eq!(
            err,
            DataIntegrityError::UnknownReference {
                entity: EntityKind::Section,
                id: "S4".into(),
                target: EntityKind::Teacher,
                reference: "T9".into(),
            }
        );
    }

    #[test]
    fn rejects_duplicate_ids_and_unknown_requests() {
        let mut input = basic_input();
        input.students.push(student("A", &[]));
        assert!(matches!(
            Domain::from_input(&input),
            Err(DataIntegrityError::DuplicateId { entity: EntityKind::Student, .. })
        ));

        let mut input = basic_input();
        input.students.push(student("C", &["Latin"]));
        assert!(matches!(
            Domain::from_input(&input),
            Err(DataIntegrityError::UnknownReference { target: EntityKind::Course, .. })
        ));
    }

    #[test]
    fn rejects_malformed_periods_and_unqualified_teachers() {
        let mut input = basic_input();
        input.teachers[0].unavailable_periods = vec!["X9".into()];
        assert!(matches!(
            Domain::from_input(&input),
            Err(DataIntegrityError::MalformedPeriod { .. })
        ));

        let mut input = basic_input();
        input.teachers[1].qualified_courses = vec!["Biology".into()];
        assert!(matches!(
            Domain::from_input(&input),
            Err(DataIntegrityError::Unqualified { .. })
        ));
    }

    #[test]
    fn checks_required_section_count() {
        let mut input = basic_input();
        input.courses.push(CourseRecord {
            id: "Algebra".into(),
            required_sections: Some(3),
            ..Default::default()
        });
        assert_eq!(
            Domain::from_input(&input).unwrap_err(),
            DataIntegrityError::SectionCountMismatch {
                course: "Algebra".into(),
                required: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn adjacency_respects_tracks_and_breaks() {
        let mut input = basic_input();
        input.period_breaks = vec![2];
        let domain = Domain::from_input(&input).unwrap();
        let r1 = PeriodIdx::new(0);
        let r2 = PeriodIdx::new(1);
        let r3 = PeriodIdx::new(2);
        let r4 = PeriodIdx::new(3);
        let g1 = PeriodIdx::new(4);
        assert!(domain.are_adjacent(r1, r2));
        assert!(!domain.are_adjacent(r2, r3));
        assert!(domain.are_adjacent(r3, r4));
        assert!(!domain.are_adjacent(r4, g1));
        assert_eq!(domain.adjacent_pairs().len(), 4);
        assert_eq!(domain.neighbours(r2), vec![r1]);
        assert_eq!(domain.tracks(), vec!["R", "G"]);
    }

    #[test]
    fn last_representable_slot_has_no_successor() {
        let mut input = basic_input();
        input.periods = vec!["R65534".into(), "R65535".into(), "G1".into()];
        let domain = Domain::from_input(&input).unwrap();
        let (last, only) = (PeriodIdx::new(1), PeriodIdx::new(2));
        assert!(domain.are_adjacent(PeriodIdx::new(0), last));
        assert!(!domain.are_adjacent(last, PeriodIdx::new(0)));
        assert!(domain.neighbours(only).is_empty());
        assert_eq!(domain.adjacent_pairs(), vec![(PeriodIdx::new(0), last)]);
        assert!(Period::parse("Day2-3").is_none());
    }
}
