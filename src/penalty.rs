//! Soft policies, each encoded independently as reified indicator
//! variables feeding weighted objective terms, plus an audit that
//! recomputes every policy's violations straight from a solved
//! assignment.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use itertools::Itertools;
use log::debug;

use crate::catalog::SlotIndex;
use crate::config::PenaltyWeights;
use crate::data::{Group, Slot, Subject, Week, Weekday};
use crate::ilp::{LinExpr, VarId};
use crate::model::{ColleModel, Planning};
use crate::solver::Valuation;

/// "group g sits maths in week w" flags, shared by three policies.
type MathsFlags = BTreeMap<(Week, Group), VarId>;
/// "teacher t sees group g in week w" flags, keyed by teacher ordinal.
type TeacherFlags = BTreeMap<(usize, Week, Group), VarId>;

/// Encodes every enabled policy into `model.ilp`. A zero weight skips the
/// policy entirely.
pub fn encode(
    model: &mut ColleModel,
    index: &SlotIndex,
    planning: &Planning,
    weights: &PenaltyWeights,
) {
    let maths = if weights.maths_count > 0
        || weights.maths_consecutive > 0
        || weights.maths_clash > 0
    {
        maths_flags(model, index, planning)
    } else {
        MathsFlags::new()
    };
    let used = if weights.teacher_repeat > 0 {
        teacher_flags(model, index, planning)
    } else {
        TeacherFlags::new()
    };

    maths_count(model, planning, weights, &maths);
    maths_consecutive(model, planning, weights, &maths);
    maths_clash(model, planning, weights, &maths);
    s2i_windows(model, index, planning, weights);
    day_load(model, index, planning, weights);
    back_to_back(model, index, planning, weights);
    teacher_repeat(model, index, planning, weights, &used);
    block_coverage(model, index, planning);
    other_coverage(model, index, planning, weights);
    debug!("{} weighted penalty terms", model.ilp.penalties().len());
}

fn occupancy_sum<'a>(
    model: &ColleModel,
    week: Week,
    group: Group,
    slots: impl IntoIterator<Item = &'a Slot>,
) -> LinExpr {
    LinExpr::sum(slots.into_iter().map(|s| model.var(week, group, s.id)))
}

fn maths_flags(model: &mut ColleModel, index: &SlotIndex, planning: &Planning) -> MathsFlags {
    let mut flags = MathsFlags::new();
    for &week in &planning.weeks {
        let slots: Vec<&Slot> = index.week_subject(week, Subject::Maths).collect();
        for &g in &planning.groups {
            let total = occupancy_sum(model, week, g, slots.iter().copied());
            // the weekly quota caps this sum at one, plain equality works
            let flag = model.ilp.bool_of_sum(format!("is_maths_w{week}_g{g}"), total);
            flags.insert((week, g), flag);
        }
    }
    flags
}

fn teacher_flags(model: &mut ColleModel, index: &SlotIndex, planning: &Planning) -> TeacherFlags {
    let mut flags = TeacherFlags::new();
    for (ti, teacher) in index.teachers().iter().enumerate() {
        for &week in &planning.weeks {
            let slots: Vec<&Slot> = index.week_teacher(week, teacher).collect();
            if slots.is_empty() {
                continue;
            }
            let ub = slots.len() as i64;
            for &g in &planning.groups {
                let total = occupancy_sum(model, week, g, slots.iter().copied());
                let flag = model.ilp.count_at_least(
                    format!("uses_{teacher}_w{week}_g{g}"),
                    total,
                    1,
                    ub,
                );
                flags.insert((ti, week, g), flag);
            }
        }
    }
    flags
}

/// |maths weeks - target| per group.
fn maths_count(
    model: &mut ColleModel,
    planning: &Planning,
    weights: &PenaltyWeights,
    maths: &MathsFlags,
) {
    if weights.maths_count == 0 {
        return;
    }
    let horizon = planning.weeks.len() as i64;
    for &g in &planning.groups {
        let count = LinExpr::sum(planning.weeks.iter().map(|&w| maths[&(w, g)]));
        let deviation = model.ilp.abs_deviation(
            format!("maths_dev_g{g}"),
            count,
            planning.rules.maths_target,
            horizon,
        );
        model.ilp.penalize(weights.maths_count, deviation);
    }
}

/// Maths in two consecutive weeks for one group.
fn maths_consecutive(
    model: &mut ColleModel,
    planning: &Planning,
    weights: &PenaltyWeights,
    maths: &MathsFlags,
) {
    if weights.maths_consecutive == 0 {
        return;
    }
    for &g in &planning.groups {
        for pair in planning.weeks.windows(2) {
            let a = maths[&(pair[0], g)];
            let b = maths[&(pair[1], g)];
            let z = model
                .ilp
                .bool_and(format!("maths_consec_w{}_g{g}", pair[0]), a, b);
            model.ilp.penalize(weights.maths_consecutive, z);
        }
    }
}

/// The designated group pair both sitting maths the same week.
fn maths_clash(
    model: &mut ColleModel,
    planning: &Planning,
    weights: &PenaltyWeights,
    maths: &MathsFlags,
) {
    if weights.maths_clash == 0 {
        return;
    }
    let Some((first, second)) = planning.rules.clash_pair else {
        return;
    };
    if !planning.groups.contains(&first) || !planning.groups.contains(&second) {
        return;
    }
    for &week in &planning.weeks {
        let a = maths[&(week, first)];
        let b = maths[&(week, second)];
        let z = model.ilp.bool_and(format!("maths_both_w{week}"), a, b);
        model.ilp.penalize(weights.maths_clash, z);
    }
}

/// |S2I count - target| over every sliding window of weeks, per group.
fn s2i_windows(
    model: &mut ColleModel,
    index: &SlotIndex,
    planning: &Planning,
    weights: &PenaltyWeights,
) {
    if weights.s2i_window == 0 {
        return;
    }
    for &g in &planning.groups {
        for window in planning.weeks.windows(planning.rules.window_len) {
            let mut count = LinExpr::new();
            for &week in window {
                for s in index.week_subject(week, Subject::SystemsEngineering) {
                    count.add_term(model.var(week, g, s.id), 1);
                }
            }
            let deviation = model.ilp.abs_deviation(
                format!("s2i_dev_w{}_g{g}", window[0]),
                count,
                planning.rules.window_target,
                planning.rules.window_len as i64,
            );
            model.ilp.penalize(weights.s2i_window, deviation);
        }
    }
}

/// Two or more colles on the same weekday for one group.
fn day_load(
    model: &mut ColleModel,
    index: &SlotIndex,
    planning: &Planning,
    weights: &PenaltyWeights,
) {
    if weights.same_day == 0 {
        return;
    }
    for &week in &planning.weeks {
        for day in Weekday::ALL {
            let slots: Vec<&Slot> = index.week_day(week, day).collect();
            if slots.is_empty() {
                continue;
            }
            for &g in &planning.groups {
                let total = occupancy_sum(model, week, g, slots.iter().copied());
                let crowded = model.ilp.count_at_least(
                    format!("two_same_day_w{week}_g{g}_{day}"),
                    total,
                    2,
                    slots.len() as i64,
                );
                model.ilp.penalize(weights.same_day, crowded);
            }
        }
    }
}

/// A colle starting exactly when the previous one ends, same day.
fn back_to_back(
    model: &mut ColleModel,
    index: &SlotIndex,
    planning: &Planning,
    weights: &PenaltyWeights,
) {
    if weights.back_to_back == 0 {
        return;
    }
    for &week in &planning.weeks {
        for day in Weekday::ALL {
            let adjacent: Vec<(&Slot, &Slot)> = index
                .week_day(week, day)
                .tuple_combinations()
                .filter(|&(a, b)| a.back_to_back(b))
                .collect();
            for (s1, s2) in adjacent {
                for &g in &planning.groups {
                    let a = model.var(week, g, s1.id);
                    let b = model.var(week, g, s2.id);
                    let z = model.ilp.bool_and(
                        format!("b2b_w{week}_g{g}_s{}_{}", s1.id, s2.id),
                        a,
                        b,
                    );
                    model.ilp.penalize(weights.back_to_back, z);
                }
            }
        }
    }
}

/// The same teacher in two consecutive weeks for one group, any subject.
fn teacher_repeat(
    model: &mut ColleModel,
    index: &SlotIndex,
    planning: &Planning,
    weights: &PenaltyWeights,
    used: &TeacherFlags,
) {
    if weights.teacher_repeat == 0 {
        return;
    }
    for (ti, teacher) in index.teachers().iter().enumerate() {
        for &g in &planning.groups {
            for pair in planning.weeks.windows(2) {
                let (Some(&a), Some(&b)) = (
                    used.get(&(ti, pair[0], g)),
                    used.get(&(ti, pair[1], g)),
                ) else {
                    continue;
                };
                let z = model.ilp.bool_and(
                    format!("repeat_{teacher}_w{}_g{g}", pair[0]),
                    a,
                    b,
                );
                model.ilp.penalize(weights.teacher_repeat, z);
            }
        }
    }
}

/// Designated teachers missed over a whole block of weeks by a group.
fn block_coverage(model: &mut ColleModel, index: &SlotIndex, planning: &Planning) {
    for cover in &planning.rules.block_coverage {
        if cover.weight == 0 {
            continue;
        }
        for &g in &planning.groups {
            for block in planning.weeks.chunks(planning.rules.block_len) {
                let weeks: Vec<Week> = block
                    .iter()
                    .copied()
                    .filter(|&w| Some(w) != cover.excluded_week)
                    .collect();
                if weeks.is_empty() {
                    continue;
                }
                let mut total = LinExpr::new();
                let mut ub = 0i64;
                for &week in &weeks {
                    for s in index.week_teacher(week, &cover.teacher) {
                        total.add_term(model.var(week, g, s.id), 1);
                        ub += 1;
                    }
                }
                let missed = model.ilp.is_zero(
                    format!("miss_{}_blk{}_g{g}", cover.teacher, block[0]),
                    total,
                    ub,
                );
                model.ilp.penalize(cover.weight, missed);
            }
        }
    }
}

/// Any remaining teacher never seen by a group over the leading weeks.
fn other_coverage(
    model: &mut ColleModel,
    index: &SlotIndex,
    planning: &Planning,
    weights: &PenaltyWeights,
) {
    if weights.other_coverage == 0 {
        return;
    }
    let designated: HashSet<&str> = planning
        .rules
        .block_coverage
        .iter()
        .map(|c| c.teacher.as_str())
        .collect();
    let early: Vec<Week> = planning
        .weeks
        .iter()
        .copied()
        .take(planning.rules.early_coverage_weeks)
        .collect();
    for teacher in index.teachers() {
        if designated.contains(teacher.as_str()) {
            continue;
        }
        for &g in &planning.groups {
            let mut total = LinExpr::new();
            let mut ub = 0i64;
            for &week in &early {
                for s in index.week_teacher(week, teacher) {
                    total.add_term(model.var(week, g, s.id), 1);
                    ub += 1;
                }
            }
            let missed = model
                .ilp
                .is_zero(format!("miss_other_{teacher}_g{g}"), total, ub);
            model.ilp.penalize(weights.other_coverage, missed);
        }
    }
}

/// One audited policy violation and the cost it contributes.
#[derive(Debug, Clone)]
pub struct Violation {
    pub policy: &'static str,
    pub cost: i64,
    pub detail: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.policy, self.detail)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Audit {
    pub total: i64,
    pub violations: Vec<Violation>,
}

impl Audit {
    fn add(&mut self, policy: &'static str, cost: i64, detail: String) {
        self.total += cost;
        self.violations.push(Violation { policy, cost, detail });
    }
}

fn takes_subject(
    taken: &BTreeMap<(Week, Group), Vec<&Slot>>,
    week: Week,
    group: Group,
    subject: Subject,
) -> bool {
    taken
        .get(&(week, group))
        .is_some_and(|slots| slots.iter().any(|s| s.subject == subject))
}

fn count_subject(
    taken: &BTreeMap<(Week, Group), Vec<&Slot>>,
    week: Week,
    group: Group,
    subject: Subject,
) -> i64 {
    taken
        .get(&(week, group))
        .map_or(0, |slots| slots.iter().filter(|s| s.subject == subject).count() as i64)
}

fn takes_teacher(
    taken: &BTreeMap<(Week, Group), Vec<&Slot>>,
    week: Week,
    group: Group,
    teacher: &str,
) -> bool {
    taken
        .get(&(week, group))
        .is_some_and(|slots| slots.iter().any(|s| s.teacher == teacher))
}

/// Recounts every policy violation from the solved assignment, without
/// going through the encoded auxiliary variables. At the optimum the
/// audited total equals the solver-reported objective.
pub fn audit(
    model: &ColleModel,
    index: &SlotIndex,
    planning: &Planning,
    weights: &PenaltyWeights,
    valuation: &Valuation,
) -> Audit {
    let mut taken: BTreeMap<(Week, Group), Vec<&Slot>> = BTreeMap::new();
    for (week, group, slot) in model.occupied(valuation) {
        taken.entry((week, group)).or_default().push(index.slot(slot));
    }
    let rules = &planning.rules;
    let mut audit = Audit::default();

    if weights.maths_count > 0 {
        for &g in &planning.groups {
            let count = planning
                .weeks
                .iter()
                .filter(|&&w| takes_subject(&taken, w, g, Subject::Maths))
                .count() as i64;
            let deviation = (count - rules.maths_target).abs();
            if deviation > 0 {
                audit.add(
                    "maths count",
                    weights.maths_count * deviation,
                    format!("group {g} sits maths {count} weeks, target {}", rules.maths_target),
                );
            }
        }
    }

    if weights.maths_consecutive > 0 {
        for &g in &planning.groups {
            for pair in planning.weeks.windows(2) {
                if takes_subject(&taken, pair[0], g, Subject::Maths)
                    && takes_subject(&taken, pair[1], g, Subject::Maths)
                {
                    audit.add(
                        "maths consecutive",
                        weights.maths_consecutive,
                        format!("group {g} sits maths in weeks {} and {}", pair[0], pair[1]),
                    );
                }
            }
        }
    }

    if weights.maths_clash > 0 {
        if let Some((first, second)) = rules.clash_pair {
            if planning.groups.contains(&first) && planning.groups.contains(&second) {
                for &week in &planning.weeks {
                    if takes_subject(&taken, week, first, Subject::Maths)
                        && takes_subject(&taken, week, second, Subject::Maths)
                    {
                        audit.add(
                            "maths clash",
                            weights.maths_clash,
                            format!("groups {first} and {second} both sit maths in week {week}"),
                        );
                    }
                }
            }
        }
    }

    if weights.s2i_window > 0 {
        for &g in &planning.groups {
            for window in planning.weeks.windows(rules.window_len) {
                let count: i64 = window
                    .iter()
                    .map(|&w| count_subject(&taken, w, g, Subject::SystemsEngineering))
                    .sum();
                let deviation = (count - rules.window_target).abs();
                if deviation > 0 {
                    audit.add(
                        "s2i window",
                        weights.s2i_window * deviation,
                        format!(
                            "group {g} has {count} S2I colles over weeks {}..{}, target {}",
                            window[0],
                            window[window.len() - 1],
                            rules.window_target
                        ),
                    );
                }
            }
        }
    }

    if weights.same_day > 0 {
        for (&(week, g), slots) in &taken {
            let mut per_day: BTreeMap<Weekday, usize> = BTreeMap::new();
            for s in slots {
                *per_day.entry(s.weekday).or_default() += 1;
            }
            for (day, count) in per_day {
                if count >= 2 {
                    audit.add(
                        "same day",
                        weights.same_day,
                        format!("group {g} has {count} colles on {day} in week {week}"),
                    );
                }
            }
        }
    }

    if weights.back_to_back > 0 {
        for (&(week, g), slots) in &taken {
            for (s1, s2) in slots.iter().copied().tuple_combinations() {
                if s1.back_to_back(s2) {
                    audit.add(
                        "back to back",
                        weights.back_to_back,
                        format!(
                            "group {g} chains {} and {} on {} in week {week}",
                            s1.teacher, s2.teacher, s1.weekday
                        ),
                    );
                }
            }
        }
    }

    if weights.teacher_repeat > 0 {
        for teacher in index.teachers() {
            for &g in &planning.groups {
                for pair in planning.weeks.windows(2) {
                    if takes_teacher(&taken, pair[0], g, teacher)
                        && takes_teacher(&taken, pair[1], g, teacher)
                    {
                        audit.add(
                            "teacher repeat",
                            weights.teacher_repeat,
                            format!(
                                "group {g} sees {teacher} in weeks {} and {}",
                                pair[0], pair[1]
                            ),
                        );
                    }
                }
            }
        }
    }

    for cover in &rules.block_coverage {
        if cover.weight == 0 {
            continue;
        }
        for &g in &planning.groups {
            for block in planning.weeks.chunks(rules.block_len) {
                let weeks: Vec<Week> = block
                    .iter()
                    .copied()
                    .filter(|&w| Some(w) != cover.excluded_week)
                    .collect();
                if weeks.is_empty() {
                    continue;
                }
                if !weeks.iter().any(|&w| takes_teacher(&taken, w, g, &cover.teacher)) {
                    audit.add(
                        "block coverage",
                        cover.weight,
                        format!(
                            "group {g} never sees {} in weeks {}..{}",
                            cover.teacher,
                            block[0],
                            block[block.len() - 1]
                        ),
                    );
                }
            }
        }
    }

    if weights.other_coverage > 0 {
        let designated: HashSet<&str> = rules
            .block_coverage
            .iter()
            .map(|c| c.teacher.as_str())
            .collect();
        let early: Vec<Week> = planning
            .weeks
            .iter()
            .copied()
            .take(rules.early_coverage_weeks)
            .collect();
        for teacher in index.teachers() {
            if designated.contains(teacher.as_str()) {
                continue;
            }
            for &g in &planning.groups {
                if !early.iter().any(|&w| takes_teacher(&taken, w, g, teacher)) {
                    audit.add(
                        "other coverage",
                        weights.other_coverage,
                        format!(
                            "group {g} never sees {teacher} in the first {} weeks",
                            early.len()
                        ),
                    );
                }
            }
        }
    }

    audit
}
