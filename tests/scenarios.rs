use master_schedule::builder::build;
use master_schedule::catalog::{Mode, Rule};
use master_schedule::config::{SolveConfig, TunerConfig};
use master_schedule::conflicts::{Conflict, ConflictKind};
use master_schedule::data::{CourseRecord, SchedulingInput, SectionRecord, StudentRecord, TeacherRecord};
use master_schedule::domain::{Domain, PeriodIdx, SectionIdx};
use master_schedule::engine::{EngineOutcome, HighsEngine, SolveLimits, SolvingEngine};
use master_schedule::error::{EngineError, ScheduleError, StructuralIssue};
use master_schedule::model::{Assignment, Model};
use master_schedule::pipeline::{SolveContext, SolveStatus, solve_input};
use master_schedule::tuner::{DirectorySink, PenaltyTuner, load_best_weights};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

fn section(id: &str, course: &str, teacher: &str, capacity: u32) -> SectionRecord {
    SectionRecord {
        id: id.into(),
        course_id: course.into(),
        teacher_id: teacher.into(),
        capacity,
        department: None,
    }
}

fn teacher(id: &str) -> TeacherRecord {
    TeacherRecord {
        id: id.into(),
        ..Default::default()
    }
}

fn student(id: &str, courses: &[&str]) -> StudentRecord {
    StudentRecord {
        id: id.into(),
        requested_courses: courses.iter().map(|c| c.to_string()).collect(),
        ..Default::default()
    }
}

fn single_section() -> SchedulingInput {
    SchedulingInput {
        sections: vec![section("BI1", "Biology", "T1", 10)],
        teachers: vec![teacher("T1")],
        students: vec![student("A", &["Biology"])],
        ..Default::default()
    }
}

struct UnreachableEngine;

impl SolvingEngine for UnreachableEngine {
    fn solve(&self, _: &Model, _: &SolveLimits) -> Result<EngineOutcome, EngineError> {
        panic!("no model should reach the engine");
    }
}

#[test]
fn one_section_one_student_is_optimal_without_conflicts() {
    let report = solve_input(&single_section(), &SolveConfig::default(), &HighsEngine).unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert_eq!(report.tables.master_schedule.len(), 1);
    assert_eq!(report.tables.master_schedule[0].section_id, "BI1");
    assert_eq!(report.tables.student_assignments.len(), 1);
    assert_eq!(report.tables.student_assignments[0].student_id, "A");
    assert!(report.tables.unmet_requests.is_empty());
    assert!(report.conflicts.is_empty());
}

#[test]
fn teacher_unavailable_everywhere_stops_before_the_model() {
    let mut input = single_section();
    input.teachers[0].unavailable_periods = input.periods.clone();

    let err = solve_input(&input, &SolveConfig::default(), &UnreachableEngine).unwrap_err();
    let ScheduleError::Structural(infeasibility) = err else {
        panic!("expected structural infeasibility, got {:?}", err);
    };
    assert_eq!(
        infeasibility.issues[0],
        StructuralIssue::NoLegalPeriods {
            section: "BI1".into(),
            course: "Biology".into(),
            teacher: "T1".into(),
        }
    );
}

fn pinned_pair() -> SchedulingInput {
    SchedulingInput {
        courses: vec![CourseRecord {
            id: "Medical Career".into(),
            period_pin: vec!["R2".into(), "R4".into()],
            ..Default::default()
        }],
        sections: vec![
            section("MC1", "Medical Career", "T1", 10),
            section("MC2", "Medical Career", "T2", 10),
        ],
        teachers: vec![teacher("T1"), teacher("T2")],
        students: vec![student("A", &["Medical Career"])],
        ..Default::default()
    }
}

#[test]
fn pinned_sections_take_one_pinned_period_each() {
    let mut config = SolveConfig::default();
    config.modes.insert(Rule::SpecialCourseViolation, Mode::Hard);
    let report = solve_input(&pinned_pair(), &config, &HighsEngine).unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    let periods: BTreeSet<&str> = report
        .tables
        .master_schedule
        .iter()
        .map(|row| row.period.as_str())
        .collect();
    assert_eq!(periods, BTreeSet::from(["R2", "R4"]));
}

#[test]
fn both_pinned_sections_in_one_period_is_rejected() {
    let input = pinned_pair();
    let domain = Domain::from_input(&input).unwrap();
    let mut config = SolveConfig::default();
    config.modes.insert(Rule::SpecialCourseViolation, Mode::Hard);
    let ctx = SolveContext::prepare(&domain, &config).unwrap();
    let built = build(&ctx);

    let r2 = PeriodIdx::new(1);
    let mut values = vec![0.0; built.model.variables().len()];
    for section in [SectionIdx::new(0), SectionIdx::new(1)] {
        values[built.z(section, r2).unwrap().get()] = 1.0;
    }
    let assignment = Assignment::new(values);

    let broken: Vec<&str> = built
        .model
        .violations(&assignment)
        .map(|c| c.label.as_str())
        .collect();
    assert!(broken.contains(&"cover_Medical Career_R2_max"));
    assert!(broken.contains(&"cover_Medical Career_R4_min"));
    assert!(!built.model.is_satisfied(&assignment));
}

#[test]
fn soft_capacity_overflow_is_reported_and_penalized() {
    let input = SchedulingInput {
        sections: vec![section("AL1", "Algebra", "T1", 20)],
        teachers: vec![teacher("T1")],
        students: (0..25)
            .map(|i| student(&format!("S{:02}", i), &["Algebra"]))
            .collect(),
        ..Default::default()
    };
    let weight = 100.0;
    let mut config = SolveConfig::default();
    config.weights.insert(Rule::SectionOverload, weight);

    let report = solve_input(&input, &config, &HighsEngine).unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert_eq!(
        report.conflicts.conflicts,
        vec![Conflict::SectionOverload {
            section: "AL1".into(),
            enrolled: 25,
            capacity: 20,
        }]
    );
    assert_eq!(
        report.conflicts.conflicts[0].remediation(),
        "increase capacity of section AL1 by 5 seats"
    );
    assert_eq!(report.conflicts.slack_by_rule.get(&Rule::SectionOverload), Some(&5.0));
    assert_eq!(report.objective, Some(25.0 - 5.0 * weight));
}

/// Hands the model to HiGHS only for the candidate whose missing-course
/// weight is 1500; every other candidate comes back infeasible.
struct SecondChoiceEngine;

impl SolvingEngine for SecondChoiceEngine {
    fn solve(&self, model: &Model, limits: &SolveLimits) -> Result<EngineOutcome, EngineError> {
        let chosen = model.objective().terms.iter().any(|(_, c)| *c == -1500.0);
        if chosen {
            HighsEngine.solve(model, limits)
        } else {
            Ok(EngineOutcome::Infeasible)
        }
    }
}

#[test]
fn tuner_keeps_the_configuration_with_fewer_conflicts() {
    let input = SchedulingInput {
        sections: vec![section("AL1", "Algebra", "T1", 1)],
        teachers: vec![teacher("T1")],
        students: vec![student("A", &["Algebra"]), student("B", &["Algebra"])],
        ..Default::default()
    };
    let domain = Domain::from_input(&input).unwrap();
    let config = TunerConfig {
        grid: BTreeMap::from([(Rule::MissingCourse, vec![1000.0, 1500.0])]),
        parallelism: 2,
        solve: SolveConfig::default(),
    };
    let root = std::env::temp_dir().join(format!("master_schedule_scenario5_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&root);
    let mut sink = DirectorySink::new(&root);

    let outcome = PenaltyTuner::new(&SecondChoiceEngine, config)
        .tune(&domain, &mut sink)
        .unwrap();

    let by_index: HashMap<usize, usize> = outcome
        .summary
        .candidates
        .iter()
        .map(|c| (c.metrics.candidate, c.metrics.conflict_counts.values().sum()))
        .collect();
    assert_eq!(by_index[&0], 3);
    assert_eq!(by_index[&1], 1);
    assert_eq!(outcome.summary.best_candidate, Some(1));

    let persisted = load_best_weights(&root).unwrap();
    assert_eq!(persisted[&Rule::MissingCourse], 1500.0);
    std::fs::remove_dir_all(&root).unwrap();
}

fn school() -> SchedulingInput {
    let mut students = Vec::new();
    for i in 0..10 {
        let mut courses = vec!["Algebra", "Chemistry", "Biology"];
        if i % 2 == 0 {
            courses.push("Medical Career");
        }
        let mut record = student(&format!("ST{}", i), &courses);
        record.sped = i < 3;
        students.push(record);
    }
    SchedulingInput {
        courses: vec![
            CourseRecord {
                id: "Medical Career".into(),
                period_pin: vec!["R1".into(), "G1".into()],
                ..Default::default()
            },
            CourseRecord {
                id: "Chemistry".into(),
                is_lab: true,
                sped_capacity_limit: Some(2),
                ..Default::default()
            },
        ],
        sections: vec![
            section("MC1", "Medical Career", "T1", 5),
            section("MC2", "Medical Career", "T2", 5),
            section("AL1", "Algebra", "T1", 6),
            section("AL2", "Algebra", "T3", 6),
            section("CH1", "Chemistry", "T2", 6),
            section("CH2", "Chemistry", "T2", 6),
            section("BI1", "Biology", "T3", 10),
        ],
        teachers: vec![teacher("T1"), teacher("T2"), teacher("T3")],
        students,
        ..Default::default()
    }
}

#[test]
fn solved_school_respects_exclusivity_capacity_and_pins() {
    let input = school();
    let mut config = SolveConfig::default();
    config.time_limit_secs = 30.0;
    let report = solve_input(&input, &config, &HighsEngine).unwrap();
    assert!(report.has_solution());
    let tables = &report.tables;

    // Every section in exactly one period.
    let mut placed: HashMap<&str, usize> = HashMap::new();
    for row in &tables.master_schedule {
        *placed.entry(row.section_id.as_str()).or_default() += 1;
    }
    assert_eq!(placed.len(), input.sections.len());
    assert!(placed.values().all(|n| *n == 1));

    // No teacher in two places at once.
    let mut busy = HashSet::new();
    for row in &tables.teacher_assignments {
        assert!(busy.insert((row.teacher_id.as_str(), row.period.as_str())));
    }

    // No student in two places at once.
    let period_of: HashMap<&str, &str> = tables
        .master_schedule
        .iter()
        .map(|row| (row.section_id.as_str(), row.period.as_str()))
        .collect();
    let mut seated = HashSet::new();
    for row in &tables.student_assignments {
        assert!(seated.insert((row.student_id.as_str(), period_of[row.section_id.as_str()])));
    }

    // Overfull sections show up as conflicts whose excess matches the slack.
    let mut excess = 0.0;
    for record in &input.sections {
        let enrolled = tables
            .student_assignments
            .iter()
            .filter(|row| row.section_id == record.id)
            .count();
        if enrolled > record.capacity as usize {
            excess += (enrolled - record.capacity as usize) as f64;
            assert!(report.conflicts.conflicts.contains(&Conflict::SectionOverload {
                section: record.id.clone(),
                enrolled,
                capacity: record.capacity,
            }));
        }
    }
    let slack = report
        .conflicts
        .slack_by_rule
        .get(&Rule::SectionOverload)
        .copied()
        .unwrap_or(0.0);
    assert_eq!(slack, excess);

    // Pinned course sections stay inside the pin.
    for id in ["MC1", "MC2"] {
        assert!(["R1", "G1"].contains(&period_of[id]));
    }
    assert_eq!(report.conflicts.count(ConflictKind::PeriodPinViolation), 0);
}

#[test]
fn extraction_of_the_same_solution_is_identical() {
    use master_schedule::extract::Extraction;
    use master_schedule::records::write_tables;

    let input = school();
    let domain = Domain::from_input(&input).unwrap();
    let config = SolveConfig::default();
    let ctx = SolveContext::prepare(&domain, &config).unwrap();
    let built = build(&ctx);
    let outcome = HighsEngine.solve(&built.model, &config.limits()).unwrap();
    let incumbent = outcome.incumbent().unwrap();

    let first = Extraction::from_assignment(&domain, &built, &incumbent.assignment).tables(&domain);
    let second = Extraction::from_assignment(&domain, &built, &incumbent.assignment).tables(&domain);
    assert_eq!(first, second);

    let root = std::env::temp_dir().join(format!("master_schedule_p6_{}", std::process::id()));
    let (a, b) = (root.join("a"), root.join("b"));
    write_tables(&a, &first).unwrap();
    write_tables(&b, &second).unwrap();
    for file in ["Master_Schedule.csv", "Student_Assignments.csv", "Teacher_Assignments.csv"] {
        let left = std::fs::read(a.join(file)).unwrap();
        let right = std::fs::read(b.join(file)).unwrap();
        assert_eq!(left, right, "{} differs", file);
    }
    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn contiguous_load_teacher_gets_adjacent_periods_on_each_track() {
    let mut input = SchedulingInput {
        sections: vec![
            section("PE1", "Physical Education", "T1", 30),
            section("PE2", "Physical Education", "T1", 30),
            section("PE3", "Physical Education", "T1", 30),
            section("PE4", "Physical Education", "T1", 30),
        ],
        teachers: vec![teacher("T1")],
        students: vec![student("A", &["Physical Education"])],
        ..Default::default()
    };
    input.teachers[0].contiguous_load = Some(2);

    let report = solve_input(&input, &SolveConfig::default(), &HighsEngine).unwrap();
    assert_eq!(report.status, SolveStatus::Optimal);
    assert_eq!(report.conflicts.count(ConflictKind::AdjacentLoadViolation), 0);

    let mut by_track: BTreeMap<char, Vec<u32>> = BTreeMap::new();
    for row in &report.tables.master_schedule {
        let (track, slot) = row.period.split_at(1);
        by_track
            .entry(track.chars().next().unwrap())
            .or_default()
            .push(slot.parse().unwrap());
    }
    assert_eq!(by_track.len(), 2);
    for slots in by_track.values_mut() {
        slots.sort();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0] + 1, slots[1]);
    }
}

#[test]
fn balance_spreads_students_evenly_across_sections() {
    let input = SchedulingInput {
        sections: vec![
            section("AL1", "Algebra", "T1", 10),
            section("AL2", "Algebra", "T2", 10),
        ],
        teachers: vec![teacher("T1"), teacher("T2")],
        students: (0..4)
            .map(|i| student(&format!("S{}", i), &["Algebra"]))
            .collect(),
        ..Default::default()
    };
    let report = solve_input(&input, &SolveConfig::default(), &HighsEngine).unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert_eq!(report.objective, Some(4.0));
    for id in ["AL1", "AL2"] {
        let enrolled = report
            .tables
            .student_assignments
            .iter()
            .filter(|row| row.section_id == id)
            .count();
        assert_eq!(enrolled, 2, "{} is unbalanced", id);
    }
    assert!(report.conflicts.slack_by_rule.get(&Rule::Balance).is_none());
}

#[test]
fn capped_course_never_doubles_up_in_a_period() {
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
        students: vec![student("A", &["Sports Med"])],
        ..Default::default()
    };
    let report = solve_input(&input, &SolveConfig::default(), &HighsEngine).unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    let periods: HashSet<&str> = report
        .tables
        .master_schedule
        .iter()
        .map(|row| row.period.as_str())
        .collect();
    assert_eq!(periods.len(), 3);
    assert_eq!(report.conflicts.count(ConflictKind::PeriodOverlapViolation), 0);
}
