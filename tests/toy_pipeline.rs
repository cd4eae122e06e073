//! End-to-end checks on hand-sized instances, plus a construction pass
//! over the full term catalog.

use std::collections::BTreeSet;

use colloscope::catalog::{expand, standard_catalog, Availability, SlotIndex};
use colloscope::config::PenaltyWeights;
use colloscope::data::{Subject, Week, Weekday};
use colloscope::model::{BlockCoverage, ColleModel, Planning, Rules};
use colloscope::penalty;
use colloscope::report;
use colloscope::solver::{HighsEngine, SolveEngine, SolveParams, SolveStatus};

fn weeks(list: &[Week]) -> BTreeSet<Week> {
    list.iter().copied().collect()
}

fn toy_index() -> SlotIndex {
    let templates = vec![
        Availability::new(Subject::Maths, "Mme Aubert", Weekday::Tuesday, "16:00", "17:00", weeks(&[1, 2, 3])),
        Availability::new(Subject::Maths, "Mme Aubert", Weekday::Tuesday, "17:00", "18:00", weeks(&[1, 2, 3])),
        Availability::new(Subject::English, "Mr Barnes", Weekday::Monday, "17:00", "18:00", weeks(&[1, 2, 3])),
        Availability::new(Subject::Physics, "Mr Colin", Weekday::Wednesday, "15:00", "16:00", weeks(&[1, 2, 3])),
        Availability::new(Subject::Physics, "Mr Colin", Weekday::Wednesday, "16:00", "17:00", weeks(&[1, 2, 3])),
        Availability::new(Subject::SystemsEngineering, "Mr Danet", Weekday::Thursday, "17:00", "18:00", weeks(&[1, 2, 3])),
    ];
    SlotIndex::new(expand(&templates, &[1, 2, 3]).unwrap())
}

fn toy_planning() -> Planning {
    Planning {
        weeks: vec![1, 2, 3],
        groups: vec![1, 2],
        rules: Rules {
            forbidden: Vec::new(),
            maths_target: 2,
            clash_pair: Some((1, 2)),
            window_len: 2,
            window_target: 1,
            block_len: 2,
            block_coverage: vec![BlockCoverage {
                teacher: "Mr Danet".to_string(),
                excluded_week: None,
                weight: 4,
            }],
            early_coverage_weeks: 2,
        },
    }
}

fn toy_weights() -> PenaltyWeights {
    PenaltyWeights {
        maths_count: 15,
        maths_consecutive: 20,
        maths_clash: 25,
        s2i_window: 25,
        same_day: 6,
        back_to_back: 10,
        teacher_repeat: 8,
        goubet_coverage: 20,
        berteloot_coverage: 20,
        other_coverage: 2,
    }
}

#[test]
fn all_weights_zero_accepts_any_feasible_assignment() {
    let index = toy_index();
    let mut planning = toy_planning();
    planning.rules.block_coverage.clear();
    let mut model = ColleModel::build(&planning, &index);
    penalty::encode(&mut model, &index, &planning, &PenaltyWeights::disabled());
    let outcome = HighsEngine
        .solve(&model.ilp, &SolveParams::default(), None)
        .unwrap();
    assert_eq!(outcome.status, SolveStatus::Optimal);
    assert_eq!(outcome.objective, 0);
}

#[test]
fn audit_matches_the_solver_objective() {
    let index = toy_index();
    let planning = toy_planning();
    let weights = toy_weights();
    let mut model = ColleModel::build(&planning, &index);
    penalty::encode(&mut model, &index, &planning, &weights);
    let outcome = HighsEngine
        .solve(&model.ilp, &SolveParams::default(), None)
        .unwrap();
    assert_eq!(outcome.status, SolveStatus::Optimal);
    let audited = penalty::audit(&model, &index, &planning, &weights, &outcome.valuation);
    assert_eq!(audited.total, outcome.objective);
}

#[test]
fn forced_maths_shortfall_costs_exactly_its_weight() {
    // no maths offering at all: the only timetable misses the one-week
    // target by one, so the objective is the bare policy weight
    let templates = vec![
        Availability::new(Subject::English, "Mr Barnes", Weekday::Monday, "17:00", "18:00", weeks(&[1, 2])),
        Availability::new(Subject::Physics, "Mr Colin", Weekday::Wednesday, "15:00", "16:00", weeks(&[1, 2])),
    ];
    let index = SlotIndex::new(expand(&templates, &[1, 2]).unwrap());
    let planning = Planning {
        weeks: vec![1, 2],
        groups: vec![1],
        rules: Rules {
            forbidden: Vec::new(),
            maths_target: 1,
            clash_pair: None,
            window_len: 2,
            window_target: 0,
            block_len: 2,
            block_coverage: Vec::new(),
            early_coverage_weeks: 2,
        },
    };
    let mut weights = PenaltyWeights::disabled();
    weights.maths_count = 5;
    let mut model = ColleModel::build(&planning, &index);
    penalty::encode(&mut model, &index, &planning, &weights);
    let outcome = HighsEngine
        .solve(&model.ilp, &SolveParams::default(), None)
        .unwrap();
    assert_eq!(outcome.status, SolveStatus::Optimal);
    assert_eq!(outcome.objective, 5);
    let audited = penalty::audit(&model, &index, &planning, &weights, &outcome.valuation);
    assert_eq!(audited.total, 5);
    assert_eq!(audited.violations.len(), 1);
    assert_eq!(audited.violations[0].policy, "maths count");
}

#[test]
fn report_extraction_is_deterministic() {
    let index = toy_index();
    let planning = toy_planning();
    let weights = toy_weights();
    let mut model = ColleModel::build(&planning, &index);
    penalty::encode(&mut model, &index, &planning, &weights);
    let outcome = HighsEngine
        .solve(&model.ilp, &SolveParams::default(), None)
        .unwrap();

    let first = report::extract(&model, &index, &outcome.valuation);
    let second = report::extract(&model, &index, &outcome.valuation);
    assert_eq!(first, second);
    // every (week, group) pair lands on exactly two rows
    assert_eq!(
        first.iter().map(|r| r.groups.split(", ").count()).sum::<usize>(),
        planning.weeks.len() * planning.groups.len() * 2
    );

    let mut bytes_first = Vec::new();
    let mut bytes_second = Vec::new();
    report::write_csv(&first, &mut bytes_first).unwrap();
    report::write_csv(&second, &mut bytes_second).unwrap();
    assert_eq!(bytes_first, bytes_second);
}

#[test]
fn full_term_model_builds_at_scale() {
    let weights = PenaltyWeights::default();
    let planning = Planning::standard(&weights);
    let slots = expand(&standard_catalog(), &planning.weeks).unwrap();
    let index = SlotIndex::new(slots);
    assert_eq!(index.len(), 705);

    let mut model = ColleModel::build(&planning, &index);
    assert_eq!(model.ilp.var_count(), index.len() * planning.groups.len());
    let hard_constraints = model.ilp.constraints().len();
    assert!(hard_constraints > index.len());

    penalty::encode(&mut model, &index, &planning, &weights);
    assert!(model.ilp.penalties().len() > 1_000);
    assert!(model.ilp.constraints().len() > hard_constraints);
}
