//! Legal periods per section and the structural pre-check run before any model
//! is built.

use crate::catalog::Rule;
use crate::config::SolveConfig;
use crate::domain::{Domain, PeriodIdx, SectionIdx};
use crate::error::{StructuralInfeasibility, StructuralIssue};
use log::{debug, warn};
use std::collections::BTreeSet;

/// `legal_periods(section) = AllowedPeriods(course) \ Unavailable(teacher)`,
/// indexed by section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    legal: Vec<Vec<PeriodIdx>>,
}

impl Availability {
    pub fn resolve(domain: &Domain) -> Availability {
        let legal = domain
            .sections()
            .iter()
            .map(|section| {
                let course = domain.course(section.course);
                let teacher = domain.teacher(section.teacher);
                domain
                    .period_indices()
                    .filter(|p| course.pin.as_ref().is_none_or(|pin| pin.contains(p)))
                    .filter(|p| !teacher.unavailable.contains(p))
                    .collect()
            })
            .collect();
        Availability { legal }
    }

    pub fn legal_periods(&self, section: SectionIdx) -> &[PeriodIdx] {
        &self.legal[section.get()]
    }

    pub fn is_legal(&self, section: SectionIdx, period: PeriodIdx) -> bool {
        self.legal[section.get()].contains(&period)
    }

    /// Sections that cannot be placed anywhere.
    pub fn empty_sections(&self) -> impl Iterator<Item = SectionIdx> + '_ {
        self.legal
            .iter()
            .enumerate()
            .filter(|(_, periods)| periods.is_empty())
            .map(|(i, _)| SectionIdx::new(i))
    }
}

/// Collects every provable infeasibility. Checks that only hold when a rule
/// is hard are skipped (capacity shortfalls are still logged) when the rule
/// is configured soft.
pub fn precheck(
    domain: &Domain,
    availability: &Availability,
    config: &SolveConfig,
) -> Result<(), StructuralInfeasibility> {
    let mut issues = Vec::new();

    for section in availability.empty_sections() {
        let s = domain.section(section);
        issues.push(StructuralIssue::NoLegalPeriods {
            section: s.id.clone(),
            course: domain.course(s.course).id.clone(),
            teacher: domain.teacher(s.teacher).id.clone(),
        });
    }

    let capacity_is_binding =
        config.is_hard(Rule::SectionOverload) && config.is_hard(Rule::MissingCourse);
    for course in domain.course_indices() {
        let requests = domain.requesters(course).count();
        if requests == 0 {
            continue;
        }
        let capacity: u64 = domain
            .sections_of_course(course)
            .iter()
            .map(|s| u64::from(domain.section(*s).capacity))
            .sum();
        if capacity < requests as u64 {
            let id = &domain.course(course).id;
            let unoffered = domain.sections_of_course(course).is_empty();
            if capacity_is_binding || (unoffered && config.is_hard(Rule::MissingCourse)) {
                issues.push(StructuralIssue::CapacityShortfall {
                    course: id.clone(),
                    capacity,
                    requests,
                });
            } else {
                warn!(
                    "Course {}: {} students requested but only {} seats available",
                    id, requests, capacity
                );
            }
        }
    }

    if config.is_hard(Rule::TeacherConflict) {
        for teacher in domain.teacher_indices() {
            let sections = domain.sections_of_teacher(teacher);
            let available: BTreeSet<PeriodIdx> = sections
                .iter()
                .flat_map(|s| availability.legal_periods(*s).iter().copied())
                .collect();
            if sections.len() > available.len() {
                issues.push(StructuralIssue::TeacherOverbooked {
                    teacher: domain.teacher(teacher).id.clone(),
                    sections: sections.len(),
                    available_periods: available.len(),
                });
            }
        }
    }

    if config.is_hard(Rule::AdjacentLoad) {
        let tracks = domain.tracks();
        for teacher in domain.teacher_indices() {
            let t = domain.teacher(teacher);
            let Some(load) = t.contiguous_load else {
                continue;
            };
            let required = load as usize * tracks.len();
            let sections = domain.sections_of_teacher(teacher).len();
            if sections != required {
                issues.push(StructuralIssue::LoadMismatch {
                    teacher: t.id.clone(),
                    sections,
                    required,
                });
            }
            for track in &tracks {
                let slots = domain.periods_of_track(track).len();
                if load as usize > slots {
                    issues.push(StructuralIssue::LoadExceedsTrack {
                        teacher: t.id.clone(),
                        track: track.to_string(),
                        load,
                        slots,
                    });
                }
            }
        }
    }

    if config.is_hard(Rule::PeriodOverlap) {
        for course in domain.course_indices() {
            let Some(cap) = domain.course(course).max_sections_per_period else {
                continue;
            };
            let sections = domain.sections_of_course(course);
            let periods: BTreeSet<PeriodIdx> = sections
                .iter()
                .flat_map(|s| availability.legal_periods(*s).iter().copied())
                .collect();
            if sections.len() as u64 > u64::from(cap) * periods.len() as u64 {
                issues.push(StructuralIssue::OverlapCapTooTight {
                    course: domain.course(course).id.clone(),
                    sections: sections.len(),
                    cap,
                    periods: periods.len(),
                });
            }
        }
    }

    if issues.is_empty() {
        debug!("Structural pre-check passed");
        Ok(())
    } else {
        Err(StructuralInfeasibility { issues })
    }
}
