//! Decision variables and hard constraints: one boolean per
//! (week, group, slot) triple, capacity, weekly quotas, same-day overlap
//! exclusion and the forbidden (group, subject, teacher) table.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::info;

use crate::catalog::SlotIndex;
use crate::config::PenaltyWeights;
use crate::data::{Group, Pairing, Slot, SlotId, Subject, Week, Weekday};
use crate::ilp::{LinExpr, Model, VarId};
use crate::solver::Valuation;

/// Declarative (group, subject, teacher) exclusion.
#[derive(Debug, Clone)]
pub struct ForbiddenPair {
    pub group: Group,
    pub subject: Subject,
    pub teacher: String,
}

/// A designated teacher every group must see at least once per block of
/// weeks, with an optional week ignored by the check.
#[derive(Debug, Clone)]
pub struct BlockCoverage {
    pub teacher: String,
    pub excluded_week: Option<Week>,
    pub weight: i64,
}

/// The structural side of the soft policies: which groups, teachers and
/// spans each policy talks about. The weights live in the configuration.
#[derive(Debug, Clone)]
pub struct Rules {
    pub forbidden: Vec<ForbiddenPair>,
    /// Target number of maths weeks per group over the horizon.
    pub maths_target: i64,
    /// Pair of groups that should not both sit maths the same week.
    pub clash_pair: Option<(Group, Group)>,
    /// Sliding window length for the S2I ratio policy.
    pub window_len: usize,
    /// Target S2I count inside each window.
    pub window_target: i64,
    /// Length of the coverage blocks for designated teachers.
    pub block_len: usize,
    pub block_coverage: Vec<BlockCoverage>,
    /// How many leading weeks the all-other-teachers coverage check spans.
    pub early_coverage_weeks: usize,
}

#[derive(Debug, Clone)]
pub struct Planning {
    pub weeks: Vec<Week>,
    pub groups: Vec<Group>,
    pub rules: Rules,
}

impl Planning {
    /// The 22-week, 16-group term with the standing policy rules.
    pub fn standard(weights: &PenaltyWeights) -> Planning {
        Planning {
            weeks: (1..=22).collect(),
            groups: (1..=16).collect(),
            rules: Rules {
                forbidden: vec![
                    ForbiddenPair {
                        group: 3,
                        subject: Subject::English,
                        teacher: "Mme Lachot".to_string(),
                    },
                    ForbiddenPair {
                        group: 3,
                        subject: Subject::Physics,
                        teacher: "Mr Pauchet".to_string(),
                    },
                ],
                maths_target: 11,
                clash_pair: Some((1, 2)),
                window_len: 4,
                window_target: 1,
                block_len: 8,
                block_coverage: vec![
                    BlockCoverage {
                        teacher: "Mme Goubet".to_string(),
                        excluded_week: None,
                        weight: weights.goubet_coverage,
                    },
                    BlockCoverage {
                        teacher: "Mr Berteloot".to_string(),
                        excluded_week: Some(12),
                        weight: weights.berteloot_coverage,
                    },
                ],
                early_coverage_weeks: 16,
            },
        }
    }
}

/// The hard model plus the occupancy variable map the penalty encoder and
/// the report reader both need.
pub struct ColleModel {
    pub ilp: Model,
    x: BTreeMap<(Week, Group, SlotId), VarId>,
}

impl ColleModel {
    pub fn build(planning: &Planning, index: &SlotIndex) -> ColleModel {
        let mut ilp = Model::new();
        let mut x: BTreeMap<(Week, Group, SlotId), VarId> = BTreeMap::new();
        for s in index.slots() {
            for &g in &planning.groups {
                let var = ilp.bool_var(format!("x_w{}_g{}_s{}", s.week, g, s.id));
                x.insert((s.week, g, s.id), var);
            }
        }
        info!(
            "{} occupancy variables over {} slots",
            x.len(),
            index.len()
        );

        // at most one group per slot
        for s in index.slots() {
            let total = LinExpr::sum(planning.groups.iter().map(|&g| x[&(s.week, g, s.id)]));
            ilp.le(total, 1);
        }

        // each week every group sits exactly one colle per pool
        info!("adding weekly quota constraints");
        for &week in &planning.weeks {
            let ma: Vec<&Slot> = index
                .week(week)
                .filter(|s| s.subject.pairing() == Pairing::MathsEnglish)
                .collect();
            let ps: Vec<&Slot> = index
                .week(week)
                .filter(|s| s.subject.pairing() == Pairing::PhysicsEngineering)
                .collect();
            for &g in &planning.groups {
                ilp.eq(LinExpr::sum(ma.iter().map(|s| x[&(week, g, s.id)])), 1);
                ilp.eq(LinExpr::sum(ps.iter().map(|s| x[&(week, g, s.id)])), 1);
            }
        }

        // no overlapping pair on the same day for one group
        info!("adding same-day overlap constraints");
        for &week in &planning.weeks {
            for day in Weekday::ALL {
                for (s1, s2) in index.week_day(week, day).tuple_combinations() {
                    if !s1.overlaps(s2) {
                        continue;
                    }
                    for &g in &planning.groups {
                        let pair = LinExpr::sum([x[&(week, g, s1.id)], x[&(week, g, s2.id)]]);
                        ilp.le(pair, 1);
                    }
                }
            }
        }

        // forbidden (group, subject, teacher) pairs are pinned to zero
        for f in &planning.rules.forbidden {
            if !planning.groups.contains(&f.group) {
                continue;
            }
            for &week in &planning.weeks {
                for s in index.week(week) {
                    if s.subject == f.subject && s.teacher == f.teacher {
                        ilp.eq(LinExpr::from(x[&(week, f.group, s.id)]), 0);
                    }
                }
            }
        }

        ColleModel { ilp, x }
    }

    /// The occupancy variable of a (week, group, slot) triple. Panics on a
    /// triple outside the planning, which is a caller bug.
    pub fn var(&self, week: Week, group: Group, slot: SlotId) -> VarId {
        self.x[&(week, group, slot)]
    }

    pub fn assignments(&self) -> impl Iterator<Item = ((Week, Group, SlotId), VarId)> + '_ {
        self.x.iter().map(|(&k, &v)| (k, v))
    }

    /// The (week, group, slot) triples occupied under a valuation, in
    /// deterministic order.
    pub fn occupied(&self, valuation: &Valuation) -> Vec<(Week, Group, SlotId)> {
        self.x
            .iter()
            .filter(|&(_, &var)| valuation.is_set(var))
            .map(|(&key, _)| key)
            .collect()
    }
}
