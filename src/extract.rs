//! Reads a solved assignment back into schedule facts and flat output tables.

use crate::builder::BuiltModel;
use crate::data::{CourseId, PeriodCode, SectionId, StudentId, TeacherId};
use crate::domain::{CourseIdx, Domain, PeriodIdx, SectionIdx, StudentIdx};
use crate::model::Assignment;
use serde::{Deserialize, Serialize};

/// The facts of one solve attempt, in index order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    pub schedule: Vec<(SectionIdx, PeriodIdx)>,
    pub enrollments: Vec<(StudentIdx, SectionIdx)>,
    pub unmet: Vec<(StudentIdx, CourseIdx)>,
}

impl Extraction {
    /// Pure read of `assignment`; calling it twice yields the same value.
    pub fn from_assignment(domain: &Domain, built: &BuiltModel, assignment: &Assignment) -> Self {
        let mut schedule = Vec::new();
        for section in domain.section_indices() {
            for period in domain.period_indices() {
                if built.z(section, period).is_some_and(|z| assignment.is_set(z)) {
                    schedule.push((section, period));
                }
            }
        }

        let mut enrollments = Vec::new();
        let mut unmet = Vec::new();
        for student in domain.student_indices() {
            for &course in &domain.student(student).requests {
                let mut met = false;
                for &section in domain.sections_of_course(course) {
                    if built.x(student, section).is_some_and(|x| assignment.is_set(x)) {
                        enrollments.push((student, section));
                        met = true;
                    }
                }
                if !met {
                    unmet.push((student, course));
                }
            }
        }
        enrollments.sort();

        Self {
            schedule,
            enrollments,
            unmet,
        }
    }

    /// The extraction of an attempt that produced no solution: nothing is
    /// scheduled and every request is unmet.
    pub fn unsolved(domain: &Domain) -> Self {
        let unmet = domain
            .student_indices()
            .flat_map(|student| {
                domain
                    .student(student)
                    .requests
                    .iter()
                    .map(move |course| (student, *course))
            })
            .collect();
        Self {
            schedule: Vec::new(),
            enrollments: Vec::new(),
            unmet,
        }
    }

    /// Periods a section was placed in. More than one only when the
    /// assignment breaks the placement rows.
    pub fn periods_of(&self, section: SectionIdx) -> impl Iterator<Item = PeriodIdx> + '_ {
        self.schedule
            .iter()
            .filter(move |(s, _)| *s == section)
            .map(|(_, p)| *p)
    }

    pub fn period_of(&self, section: SectionIdx) -> Option<PeriodIdx> {
        self.periods_of(section).next()
    }

    pub fn is_scheduled(&self, section: SectionIdx) -> bool {
        self.period_of(section).is_some()
    }

    pub fn roster(&self, section: SectionIdx) -> impl Iterator<Item = StudentIdx> + '_ {
        self.enrollments
            .iter()
            .filter(move |(_, s)| *s == section)
            .map(|(student, _)| *student)
    }

    pub fn sections_of_student(&self, student: StudentIdx) -> impl Iterator<Item = SectionIdx> + '_ {
        self.enrollments
            .iter()
            .filter(move |(s, _)| *s == student)
            .map(|(_, section)| *section)
    }

    pub fn tables(&self, domain: &Domain) -> ScheduleTables {
        let period_code = |p: PeriodIdx| domain.period(p).code.clone();

        let master_schedule = self
            .schedule
            .iter()
            .map(|(section, period)| ScheduledSection {
                section_id: domain.section(*section).id.clone(),
                course_id: domain.course(domain.section(*section).course).id.clone(),
                period: period_code(*period),
            })
            .collect();

        let student_assignments = self
            .enrollments
            .iter()
            .map(|(student, section)| Enrollment {
                student_id: domain.student(*student).id.clone(),
                section_id: domain.section(*section).id.clone(),
            })
            .collect();

        let mut teacher_assignments: Vec<TeacherAssignment> = self
            .schedule
            .iter()
            .map(|(section, period)| TeacherAssignment {
                teacher_id: domain.teacher(domain.section(*section).teacher).id.clone(),
                section_id: domain.section(*section).id.clone(),
                period: period_code(*period),
            })
            .collect();
        teacher_assignments.sort_by(|a, b| a.teacher_id.cmp(&b.teacher_id));

        let mut unmet_requests: Vec<UnmetRequest> = Vec::new();
        for (student, course) in &self.unmet {
            let student_id = &domain.student(*student).id;
            let course_id = domain.course(*course).id.clone();
            match unmet_requests.last_mut() {
                Some(row) if &row.student_id == student_id => row.courses.push(course_id),
                _ => unmet_requests.push(UnmetRequest {
                    student_id: student_id.clone(),
                    courses: vec![course_id],
                }),
            }
        }

        ScheduleTables {
            master_schedule,
            student_assignments,
            teacher_assignments,
            unmet_requests,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSection {
    pub section_id: SectionId,
    pub course_id: CourseId,
    pub period: PeriodCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub student_id: StudentId,
    pub section_id: SectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAssignment {
    pub teacher_id: TeacherId,
    pub section_id: SectionId,
    pub period: PeriodCode,
}

/// All unmet requests of one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetRequest {
    pub student_id: StudentId,
    pub courses: Vec<CourseId>,
}

/// The flat output records of one solve attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTables {
    pub master_schedule: Vec<ScheduledSection>,
    pub student_assignments: Vec<Enrollment>,
    pub teacher_assignments: Vec<TeacherAssignment>,
    pub unmet_requests: Vec<UnmetRequest>,
}
