//! Diagnoses an extracted schedule: every rule the schedule breaks becomes a
//! [`Conflict`] record with a remediation hint. Never mutates its inputs.

use crate::availability::Availability;
use crate::builder::{SlackReading, pin_bounds};
use crate::catalog::Rule;
use crate::config::SolveConfig;
use crate::data::{CourseId, PeriodCode, SectionId, StudentId, TeacherId};
use crate::domain::{Domain, PeriodIdx, SectionIdx};
use crate::extract::Extraction;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    MissingCourse,
    SectionOverload,
    TeacherPeriodConflict,
    StudentPeriodConflict,
    PeriodPinViolation,
    PinCoverageViolation,
    LabAdjacencyViolation,
    SpedOverload,
    AdjacentLoadViolation,
    PeriodOverlapViolation,
    UnscheduledSection,
}

impl ConflictKind {
    /// Weight of one conflict of this kind in [`ConflictReport::score`].
    pub const fn score_weight(self) -> f64 {
        match self {
            ConflictKind::MissingCourse => 1000.0,
            ConflictKind::UnscheduledSection => 1000.0,
            ConflictKind::TeacherPeriodConflict => 800.0,
            ConflictKind::StudentPeriodConflict => 750.0,
            ConflictKind::PeriodPinViolation => 600.0,
            ConflictKind::PinCoverageViolation => 600.0,
            ConflictKind::PeriodOverlapViolation => 600.0,
            ConflictKind::AdjacentLoadViolation => 500.0,
            ConflictKind::LabAdjacencyViolation => 400.0,
            ConflictKind::SpedOverload => 250.0,
            ConflictKind::SectionOverload => 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Conflict {
    MissingCourse {
        student: StudentId,
        course: CourseId,
    },
    SectionOverload {
        section: SectionId,
        enrolled: usize,
        capacity: u32,
    },
    TeacherPeriodConflict {
        teacher: TeacherId,
        period: PeriodCode,
        sections: Vec<SectionId>,
    },
    StudentPeriodConflict {
        student: StudentId,
        period: PeriodCode,
        sections: Vec<SectionId>,
    },
    /// A section placed outside its legal periods.
    PeriodPinViolation {
        section: SectionId,
        period: PeriodCode,
        allowed: Vec<PeriodCode>,
    },
    PinCoverageViolation {
        course: CourseId,
        period: PeriodCode,
        scheduled: usize,
        min: usize,
        max: usize,
    },
    LabAdjacencyViolation {
        teacher: TeacherId,
        first: PeriodCode,
        second: PeriodCode,
    },
    SpedOverload {
        section: SectionId,
        sped: usize,
        cap: u32,
    },
    AdjacentLoadViolation {
        teacher: TeacherId,
        track: String,
        taught: usize,
        required: u32,
        isolated: Vec<PeriodCode>,
    },
    /// More sections of a capped course share a period than the cap allows.
    PeriodOverlapViolation {
        course: CourseId,
        period: PeriodCode,
        sections: Vec<SectionId>,
        cap: u32,
    },
    UnscheduledSection {
        section: SectionId,
    },
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        match self {
            Conflict::MissingCourse { .. } => ConflictKind::MissingCourse,
            Conflict::SectionOverload { .. } => ConflictKind::SectionOverload,
            Conflict::TeacherPeriodConflict { .. } => ConflictKind::TeacherPeriodConflict,
            Conflict::StudentPeriodConflict { .. } => ConflictKind::StudentPeriodConflict,
            Conflict::PeriodPinViolation { .. } => ConflictKind::PeriodPinViolation,
            Conflict::PinCoverageViolation { .. } => ConflictKind::PinCoverageViolation,
            Conflict::LabAdjacencyViolation { .. } => ConflictKind::LabAdjacencyViolation,
            Conflict::SpedOverload { .. } => ConflictKind::SpedOverload,
            Conflict::AdjacentLoadViolation { .. } => ConflictKind::AdjacentLoadViolation,
            Conflict::PeriodOverlapViolation { .. } => ConflictKind::PeriodOverlapViolation,
            Conflict::UnscheduledSection { .. } => ConflictKind::UnscheduledSection,
        }
    }

    /// A concrete change that would remove this conflict.
    pub fn remediation(&self) -> String {
        match self {
            Conflict::MissingCourse { student, course } => format!(
                "add a section of {} or free a seat in one for student {}",
                course, student
            ),
            Conflict::SectionOverload {
                section,
                enrolled,
                capacity,
            } => format!(
                "increase capacity of section {} by {} seats",
                section,
                enrolled.saturating_sub(*capacity as usize)
            ),
            Conflict::TeacherPeriodConflict {
                teacher,
                period,
                sections,
            } => format!(
                "move {} of sections {} out of period {} or assign them to a teacher other than {}",
                sections.len().saturating_sub(1),
                sections.join(", "),
                period,
                teacher
            ),
            Conflict::StudentPeriodConflict {
                student,
                period,
                sections,
            } => format!(
                "move student {} out of all but one of sections {} in period {}",
                student,
                sections.join(", "),
                period
            ),
            Conflict::PeriodPinViolation {
                section, allowed, ..
            } => format!("move section {} into one of periods {}", section, allowed.join(", ")),
            Conflict::PinCoverageViolation {
                course,
                period,
                scheduled,
                min,
                max,
            } => {
                if scheduled < min {
                    format!(
                        "schedule {} more section(s) of {} in period {}",
                        min.saturating_sub(*scheduled),
                        course,
                        period
                    )
                } else {
                    format!(
                        "move {} section(s) of {} out of period {}",
                        scheduled.saturating_sub(*max),
                        course,
                        period
                    )
                }
            }
            Conflict::LabAdjacencyViolation {
                teacher,
                first,
                second,
            } => format!(
                "leave a prep period for teacher {} between lab sections in {} and {}",
                teacher, first, second
            ),
            Conflict::SpedOverload { section, sped, cap } => format!(
                "move {} SPED student(s) out of section {}",
                sped.saturating_sub(*cap as usize),
                section
            ),
            Conflict::AdjacentLoadViolation {
                teacher,
                track,
                required,
                ..
            } => format!(
                "schedule teacher {} for exactly {} adjacent periods on track {}",
                teacher, required, track
            ),
            Conflict::PeriodOverlapViolation {
                course,
                period,
                sections,
                cap,
            } => format!(
                "move {} of sections {} of {} out of period {}",
                sections.len().saturating_sub(*cap as usize),
                sections.join(", "),
                course,
                period
            ),
            Conflict::UnscheduledSection { section } => {
                format!("free a legal period for section {}", section)
            }
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::MissingCourse { student, course } => {
                write!(f, "student {} did not get {}", student, course)
            }
            Conflict::SectionOverload {
                section,
                enrolled,
                capacity,
            } => write!(
                f,
                "section {} holds {} students for {} seats",
                section, enrolled, capacity
            ),
            Conflict::TeacherPeriodConflict {
                teacher,
                period,
                sections,
            } => write!(
                f,
                "teacher {} teaches {} sections in {}",
                teacher,
                sections.len(),
                period
            ),
            Conflict::StudentPeriodConflict {
                student,
                period,
                sections,
            } => write!(
                f,
                "student {} is in {} sections in {}",
                student,
                sections.len(),
                period
            ),
            Conflict::PeriodPinViolation { section, period, .. } => {
                write!(f, "section {} runs in illegal period {}", section, period)
            }
            Conflict::PinCoverageViolation {
                course,
                period,
                scheduled,
                ..
            } => write!(
                f,
                "pinned course {} has {} section(s) in {}",
                course, scheduled, period
            ),
            Conflict::LabAdjacencyViolation {
                teacher,
                first,
                second,
            } => write!(
                f,
                "teacher {} has lab sections back to back in {} and {}",
                teacher, first, second
            ),
            Conflict::SpedOverload { section, sped, cap } => write!(
                f,
                "section {} holds {} SPED students, cap is {}",
                section, sped, cap
            ),
            Conflict::AdjacentLoadViolation {
                teacher,
                track,
                taught,
                required,
                ..
            } => write!(
                f,
                "teacher {} teaches {} periods on track {}, expected {} adjacent",
                teacher, taught, track, required
            ),
            Conflict::PeriodOverlapViolation {
                course,
                period,
                sections,
                cap,
            } => write!(
                f,
                "course {} has {} sections in {}, at most {} allowed",
                course,
                sections.len(),
                period,
                cap
            ),
            Conflict::UnscheduledSection { section } => {
                write!(f, "section {} is not scheduled", section)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
    /// Total slack per soft rule, present when slack values were read.
    pub slack_by_rule: BTreeMap<Rule, f64>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn counts(&self) -> BTreeMap<ConflictKind, usize> {
        self.conflicts.iter().map(Conflict::kind).counts().into_iter().collect()
    }

    pub fn count(&self, kind: ConflictKind) -> usize {
        self.conflicts.iter().filter(|c| c.kind() == kind).count()
    }

    /// Fixed weighted sum of conflict counts; lower is better.
    pub fn score(&self) -> f64 {
        self.conflicts.iter().map(|c| c.kind().score_weight()).sum()
    }
}

pub fn analyze(
    domain: &Domain,
    availability: &Availability,
    config: &SolveConfig,
    extraction: &Extraction,
    slacks: Option<&[SlackReading]>,
) -> ConflictReport {
    let code = |p: PeriodIdx| domain.period(p).code.clone();
    let section_id = |s: SectionIdx| domain.section(s).id.clone();
    let mut conflicts = Vec::new();

    for section in domain.section_indices() {
        if !extraction.is_scheduled(section) {
            conflicts.push(Conflict::UnscheduledSection {
                section: section_id(section),
            });
        }
    }

    for (student, course) in &extraction.unmet {
        conflicts.push(Conflict::MissingCourse {
            student: domain.student(*student).id.clone(),
            course: domain.course(*course).id.clone(),
        });
    }

    for section in domain.section_indices() {
        let s = domain.section(section);
        let enrolled = extraction.roster(section).count();
        if enrolled > s.capacity as usize {
            conflicts.push(Conflict::SectionOverload {
                section: s.id.clone(),
                enrolled,
                capacity: s.capacity,
            });
        }
    }

    let by_teacher_period = extraction
        .schedule
        .iter()
        .map(|(s, p)| ((domain.section(*s).teacher, *p), *s))
        .into_group_map();
    for ((teacher, period), sections) in by_teacher_period.into_iter().sorted() {
        if sections.len() > 1 {
            conflicts.push(Conflict::TeacherPeriodConflict {
                teacher: domain.teacher(teacher).id.clone(),
                period: code(period),
                sections: sections.into_iter().map(section_id).collect(),
            });
        }
    }

    for student in domain.student_indices() {
        let by_period = extraction
            .sections_of_student(student)
            .filter_map(|s| extraction.period_of(s).map(|p| (p, s)))
            .into_group_map();
        for (period, sections) in by_period.into_iter().sorted() {
            if sections.len() > 1 {
                conflicts.push(Conflict::StudentPeriodConflict {
                    student: domain.student(student).id.clone(),
                    period: code(period),
                    sections: sections.into_iter().map(section_id).collect(),
                });
            }
        }
    }

    for (section, period) in &extraction.schedule {
        if !availability.is_legal(*section, *period) {
            conflicts.push(Conflict::PeriodPinViolation {
                section: section_id(*section),
                period: code(*period),
                allowed: availability
                    .legal_periods(*section)
                    .iter()
                    .map(|p| code(*p))
                    .collect(),
            });
        }
    }

    for course in domain.course_indices() {
        let Some(pin) = &domain.course(course).pin else {
            continue;
        };
        let sections = domain.sections_of_course(course);
        if sections.is_empty() {
            continue;
        }
        let (min, max) = pin_bounds(sections.len(), pin.len());
        for period in pin {
            let scheduled = sections
                .iter()
                .filter(|s| extraction.periods_of(**s).any(|p| p == *period))
                .count();
            if scheduled < min || scheduled > max {
                conflicts.push(Conflict::PinCoverageViolation {
                    course: domain.course(course).id.clone(),
                    period: code(*period),
                    scheduled,
                    min,
                    max,
                });
            }
        }
    }

    let pairs = domain.adjacent_pairs();
    for teacher in domain.teacher_indices() {
        let lab_periods: Vec<PeriodIdx> = domain
            .sections_of_teacher(teacher)
            .iter()
            .filter(|s| domain.course(domain.section(**s).course).is_lab)
            .flat_map(|s| extraction.periods_of(*s))
            .collect();
        for (first, second) in &pairs {
            if lab_periods.contains(first) && lab_periods.contains(second) {
                conflicts.push(Conflict::LabAdjacencyViolation {
                    teacher: domain.teacher(teacher).id.clone(),
                    first: code(*first),
                    second: code(*second),
                });
            }
        }
    }

    for section in domain.section_indices() {
        let s = domain.section(section);
        let Some(cap) = domain
            .course(s.course)
            .sped_capacity_limit
            .or(config.default_sped_cap)
        else {
            continue;
        };
        let sped = extraction
            .roster(section)
            .filter(|student| domain.student(*student).sped)
            .count();
        if sped > cap as usize {
            conflicts.push(Conflict::SpedOverload {
                section: s.id.clone(),
                sped,
                cap,
            });
        }
    }

    for teacher in domain.teacher_indices() {
        let t = domain.teacher(teacher);
        let Some(load) = t.contiguous_load else {
            continue;
        };
        let taught: Vec<PeriodIdx> = domain
            .sections_of_teacher(teacher)
            .iter()
            .flat_map(|s| extraction.periods_of(*s))
            .unique()
            .collect();
        for track in domain.tracks() {
            let on_track: Vec<PeriodIdx> = domain
                .periods_of_track(track)
                .into_iter()
                .filter(|p| taught.contains(p))
                .collect();
            let isolated: Vec<PeriodCode> = if load >= 2 {
                on_track
                    .iter()
                    .filter(|p| !domain.neighbours(**p).iter().any(|n| taught.contains(n)))
                    .map(|p| code(*p))
                    .collect()
            } else {
                Vec::new()
            };
            if on_track.len() != load as usize || !isolated.is_empty() {
                conflicts.push(Conflict::AdjacentLoadViolation {
                    teacher: t.id.clone(),
                    track: track.to_string(),
                    taught: on_track.len(),
                    required: load,
                    isolated,
                });
            }
        }
    }

    for course in domain.course_indices() {
        let Some(cap) = domain.course(course).max_sections_per_period else {
            continue;
        };
        let by_period = domain
            .sections_of_course(course)
            .iter()
            .flat_map(|s| extraction.periods_of(*s).map(move |p| (p, *s)))
            .into_group_map();
        for (period, sections) in by_period.into_iter().sorted() {
            if sections.len() > cap as usize {
                conflicts.push(Conflict::PeriodOverlapViolation {
                    course: domain.course(course).id.clone(),
                    period: code(period),
                    sections: sections.into_iter().map(section_id).collect(),
                    cap,
                });
            }
        }
    }

    let mut slack_by_rule = BTreeMap::new();
    for reading in slacks.unwrap_or_default() {
        if reading.value > 0.0 {
            *slack_by_rule.entry(reading.rule).or_insert(0.0) += reading.value;
        }
    }

    ConflictReport {
        conflicts,
        slack_by_rule,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CourseRecord, SchedulingInput};
    use crate::domain::tests::{section, student, teacher};
    use crate::domain::{CourseIdx, StudentIdx};

    fn pinned_input() -> SchedulingInput {
        SchedulingInput {
            courses: vec![CourseRecord {
                id: "Medical Career".into(),
                period_pin: vec!["R2".into(), "R4".into()],
                ..Default::default()
            }],
            sections: vec![
                section("MC1", "Medical Career", "T1", 2),
                section("MC2", "Medical Career", "T2", 2),
                section("AL1", "Algebra", "T1", 1),
            ],
            teachers: vec![teacher("T1"), teacher("T2")],
            students: vec![
                student("A", &["Medical Career", "Algebra"]),
                student("B", &["Algebra"]),
            ],
            ..Default::default()
        }
    }

    fn p(i: usize) -> PeriodIdx {
        PeriodIdx::new(i)
    }

    fn s(i: usize) -> SectionIdx {
        SectionIdx::new(i)
    }

    fn analyze_input(input: &SchedulingInput, extraction: &Extraction) -> ConflictReport {
        let domain = Domain::from_input(input).unwrap();
        let availability = Availability::resolve(&domain);
        analyze(&domain, &availability, &SolveConfig::default(), extraction, None)
    }

    #[test]
    fn clean_schedule_has_no_conflicts() {
        let extraction = Extraction {
            schedule: vec![(s(0), p(1)), (s(1), p(3)), (s(2), p(0))],
            enrollments: vec![
                (StudentIdx::new(0), s(0)),
                (StudentIdx::new(0), s(2)),
            ],
            unmet: vec![(StudentIdx::new(1), CourseIdx::new(1))],
        };
        let report = analyze_input(&pinned_input(), &extraction);
        assert_eq!(
            report.conflicts,
            vec![Conflict::MissingCourse {
                student: "B".into(),
                course: "Algebra".into(),
            }]
        );
        assert_eq!(report.score(), 1000.0);
    }

    #[test]
    fn flags_every_broken_exclusivity_and_pin() {
        // MC1 and AL1 share T1 in R2, A sits in both, MC2 is outside the pin
        // and AL1 holds two students for one seat.
        let extraction = Extraction {
            schedule: vec![(s(0), p(1)), (s(1), p(0)), (s(2), p(1))],
            enrollments: vec![
                (StudentIdx::new(0), s(0)),
                (StudentIdx::new(0), s(2)),
                (StudentIdx::new(1), s(2)),
            ],
            unmet: vec![],
        };
        let report = analyze_input(&pinned_input(), &extraction);
        let counts = report.counts();
        assert_eq!(counts[&ConflictKind::TeacherPeriodConflict], 1);
        assert_eq!(counts[&ConflictKind::StudentPeriodConflict], 1);
        assert_eq!(counts[&ConflictKind::SectionOverload], 1);
        assert_eq!(counts[&ConflictKind::PeriodPinViolation], 1);
        assert_eq!(counts[&ConflictKind::PinCoverageViolation], 1);

        let overload = report
            .conflicts
            .iter()
            .find(|c| c.kind() == ConflictKind::SectionOverload)
            .unwrap();
        assert_eq!(overload.remediation(), "increase capacity of section AL1 by 1 seats");
        let pin = report
            .conflicts
            .iter()
            .find(|c| c.kind() == ConflictKind::PeriodPinViolation)
            .unwrap();
        assert_eq!(pin.remediation(), "move section MC2 into one of periods R2, R4");
        assert_eq!(report.score(), 800.0 + 750.0 + 100.0 + 600.0 + 600.0);
    }

    #[test]
    fn unsolved_attempt_reports_missing_requests_and_unscheduled_sections() {
        let input = pinned_input();
        let domain = Domain::from_input(&input).unwrap();
        let report = analyze_input(&input, &Extraction::unsolved(&domain));
        assert_eq!(report.count(ConflictKind::UnscheduledSection), 3);
        assert_eq!(report.count(ConflictKind::MissingCourse), 3);
    }

    #[test]
    fn lab_sped_and_adjacent_load_checks() {
        let mut input = SchedulingInput {
            periods: vec!["R1".into(), "R2".into(), "R3".into()],
            courses: vec![CourseRecord {
                id: "Chemistry".into(),
                is_lab: true,
                sped_capacity_limit: Some(1),
                ..Default::default()
            }],
            sections: vec![
                section("CH1", "Chemistry", "T1", 5),
                section("CH2", "Chemistry", "T1", 5),
            ],
            teachers: vec![teacher("T1")],
            students: vec![student("A", &["Chemistry"]), student("B", &["Chemistry"])],
            ..Default::default()
        };
        input.students[0].sped = true;
        input.students[1].sped = true;
        input.teachers[0].contiguous_load = Some(2);

        let extraction = Extraction {
            schedule: vec![(s(0), p(0)), (s(1), p(1))],
            enrollments: vec![(StudentIdx::new(0), s(0)), (StudentIdx::new(1), s(0))],
            unmet: vec![],
        };
        let report = analyze_input(&input, &extraction);
        assert_eq!(report.count(ConflictKind::LabAdjacencyViolation), 1);
        assert_eq!(report.count(ConflictKind::SpedOverload), 1);
        // R1 and R2 are adjacent and two periods are taught, so the load holds.
        assert_eq!(report.count(ConflictKind::AdjacentLoadViolation), 0);

        let split = Extraction {
            schedule: vec![(s(0), p(0)), (s(1), p(2))],
            ..Default::default()
        };
        let report = analyze_input(&input, &split);
        assert_eq!(report.count(ConflictKind::LabAdjacencyViolation), 0);
        assert_eq!(
            report
                .conflicts
                .iter()
                .find(|c| c.kind() == ConflictKind::AdjacentLoadViolation),
            Some(&Conflict::AdjacentLoadViolation {
                teacher: "T1".into(),
                track: "R".into(),
                taught: 2,
                required: 2,
                isolated: vec!["R1".into(), "R3".into()],
            })
        );
    }

    #[test]
    fn slack_totals_are_grouped_by_rule() {
        use crate::builder::Subject;
        let input = pinned_input();
        let domain = Domain::from_input(&input).unwrap();
        let availability = Availability::resolve(&domain);
        let slacks = vec![
            SlackReading {
                rule: Rule::SectionOverload,
                subject: Subject::Section(s(2)),
                value: 1.0,
            },
            SlackReading {
                rule: Rule::SectionOverload,
                subject: Subject::Section(s(0)),
                value: 0.0,
            },
        ];
        let report = analyze(
            &domain,
            &availability,
            &SolveConfig::default(),
            &Extraction::unsolved(&domain),
            Some(&slacks),
        );
        assert_eq!(report.slack_by_rule.get(&Rule::SectionOverload), Some(&1.0));
        assert_eq!(report.slack_by_rule.len(), 1);
    }

    #[test]
    fn capped_course_sharing_a_period_is_flagged() {
        let input = SchedulingInput {
            courses: vec![CourseRecord {
                id: "Sports Med".into(),
                max_sections_per_period: Some(1),
                ..Default::default()
            }],
            sections: vec![
                section("SM1", "Sports Med", "T1", 30),
                section("SM2", "Sports Med", "T2", 30),
                section("SM3", "Sports Med", "T3", 30),
            ],
            teachers: vec![teacher("T1"), teacher("T2"), teacher("T3")],
            students: vec![],
            ..Default::default()
        };
        let extraction = Extraction {
            schedule: vec![(s(0), p(2)), (s(1), p(2)), (s(2), p(5))],
            enrollments: vec![],
            unmet: vec![],
        };
        let report = analyze_input(&input, &extraction);
        let overlap = Conflict::PeriodOverlapViolation {
            course: "Sports Med".into(),
            period: "R3".into(),
            sections: vec!["SM1".into(), "SM2".into()],
            cap: 1,
        };
        assert_eq!(report.conflicts, vec![overlap.clone()]);
        assert_eq!(report.score(), 600.0);
        assert_eq!(
            overlap.remediation(),
            "move 1 of sections SM1, SM2 of Sports Med out of period R3"
        );
        let json = serde_json::to_value(&overlap).unwrap();
        assert_eq!(json["kind"], "period_overlap_violation");
        assert_eq!(json["cap"], 1);
    }

    #[test]
    fn remediation_of_inconsistent_records_does_not_underflow() {
        let records = r#"[
            {"kind": "teacher_period_conflict", "teacher": "T1", "period": "R1", "sections": []},
            {"kind": "pin_coverage_violation", "course": "MC", "period": "R2", "scheduled": 1, "min": 1, "max": 2},
            {"kind": "pin_coverage_violation", "course": "MC", "period": "R2", "scheduled": 0, "min": 0, "max": 2}
        ]"#;
        let conflicts: Vec<Conflict> = serde_json::from_str(records).unwrap();
        assert_eq!(
            conflicts[0].remediation(),
            "move 0 of sections  out of period R1 or assign them to a teacher other than T1"
        );
        assert_eq!(conflicts[1].remediation(), "move 0 section(s) of MC out of period R2");
        assert_eq!(conflicts[2].remediation(), "move 0 section(s) of MC out of period R2");
    }
}
