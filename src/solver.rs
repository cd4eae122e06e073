//! The solve boundary: a narrow engine interface over the model
//! representation, with HiGHS (through `good_lp`) as the production
//! backend and an exhaustive reference engine for small models.

use std::time::{Duration, Instant};

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use log::info;
use thiserror::Error;

use crate::ilp::{Cmp, Domain, LinExpr, Model, VarId};

#[derive(Debug, Clone, Copy)]
pub struct SolveParams {
    /// Wall-clock budget for the whole search.
    pub time_budget: Duration,
    /// Requested degree of parallel search inside the engine.
    pub workers: u32,
}

impl Default for SolveParams {
    fn default() -> SolveParams {
        SolveParams {
            time_budget: Duration::from_secs(21_600),
            workers: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// The objective is proven minimal.
    Optimal,
    /// Best assignment found within the budget, optimality not proven.
    Feasible,
}

#[derive(Debug, Clone)]
pub struct SearchStats {
    pub elapsed: Duration,
    pub solutions: u32,
}

/// Values the engine assigned to every model variable.
#[derive(Debug, Clone)]
pub struct Valuation {
    values: Vec<i64>,
}

impl Valuation {
    pub(crate) fn new(values: Vec<i64>) -> Valuation {
        Valuation { values }
    }

    pub fn value(&self, var: VarId) -> i64 {
        self.values[var.index()]
    }

    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) == 1
    }

    pub fn eval(&self, expr: &LinExpr) -> i64 {
        expr.eval_with(&self.values)
    }
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub status: SolveStatus,
    pub valuation: Valuation,
    pub objective: i64,
    pub stats: SearchStats,
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("the hard constraints admit no assignment")]
    Infeasible,
    #[error("no feasible assignment found within the {0:?} budget")]
    Timeout(Duration),
    #[error("solver backend failure: {0}")]
    Backend(String),
}

/// Receives each improving solution. Diagnostics only, no effect on the
/// search or its result.
pub trait ProgressObserver {
    fn on_solution(&mut self, objective: i64, stats: &SearchStats);
}

/// Opaque solving capability: model in, valuation out.
pub trait SolveEngine {
    fn solve(
        &self,
        model: &Model,
        params: &SolveParams,
        observer: Option<&mut dyn ProgressObserver>,
    ) -> Result<Outcome, SolveError>;
}

/// Production engine backed by the HiGHS MILP solver.
pub struct HighsEngine;

fn as_expression(expr: &LinExpr, vars: &[Variable]) -> Expression {
    let mut e = Expression::from(expr.constant() as f64);
    for &(v, c) in expr.terms() {
        e += c as f64 * vars[v.index()];
    }
    e
}

impl SolveEngine for HighsEngine {
    fn solve(
        &self,
        model: &Model,
        params: &SolveParams,
        mut observer: Option<&mut dyn ProgressObserver>,
    ) -> Result<Outcome, SolveError> {
        let start = Instant::now();
        let mut problem = ProblemVariables::new();
        let mut vars: Vec<Variable> = Vec::with_capacity(model.var_count());
        for def in model.vars() {
            let v = match def.domain {
                Domain::Bool => problem.add(variable().binary()),
                Domain::Int { lo, hi } => {
                    problem.add(variable().integer().min(lo as f64).max(hi as f64))
                }
            };
            vars.push(v);
        }
        let mut lp = problem
            .minimise(as_expression(&model.objective(), &vars))
            .using(default_solver)
            .set_option("time_limit", params.time_budget.as_secs_f64())
            .set_option("threads", params.workers as i32)
            .set_option("parallel", if params.workers > 1 { "on" } else { "off" })
            .set_option("output_flag", "false");
        for c in model.constraints() {
            let expr = as_expression(&c.expr, &vars);
            let rhs = c.rhs as f64;
            lp.add_constraint(match c.cmp {
                Cmp::Le => constraint!(expr <= rhs),
                Cmp::Ge => constraint!(expr >= rhs),
                Cmp::Eq => constraint!(expr == rhs),
            });
        }
        info!(
            "handing {} variables and {} constraints to HiGHS",
            model.var_count(),
            model.constraints().len()
        );
        match lp.solve() {
            Ok(solution) => {
                let values: Vec<i64> = vars
                    .iter()
                    .map(|&v| solution.value(v).round() as i64)
                    .collect();
                let valuation = Valuation::new(values);
                let objective = valuation.eval(&model.objective());
                let elapsed = start.elapsed();
                // a run that consumed the whole budget holds an incumbent,
                // not a proof
                let status = if elapsed >= params.time_budget {
                    SolveStatus::Feasible
                } else {
                    SolveStatus::Optimal
                };
                let stats = SearchStats {
                    elapsed,
                    solutions: 1,
                };
                if let Some(obs) = observer.as_deref_mut() {
                    obs.on_solution(objective, &stats);
                }
                Ok(Outcome {
                    status,
                    valuation,
                    objective,
                    stats,
                })
            }
            Err(ResolutionError::Infeasible) => Err(SolveError::Infeasible),
            Err(error) => {
                if start.elapsed() >= params.time_budget {
                    Err(SolveError::Timeout(params.time_budget))
                } else {
                    Err(SolveError::Backend(error.to_string()))
                }
            }
        }
    }
}

/// Reference engine enumerating the whole assignment space. Only viable
/// for small models; lets encodings be validated without a MILP backend.
pub struct ExhaustiveEngine {
    pub state_limit: u128,
}

impl Default for ExhaustiveEngine {
    fn default() -> ExhaustiveEngine {
        ExhaustiveEngine {
            state_limit: 1 << 22,
        }
    }
}

impl SolveEngine for ExhaustiveEngine {
    fn solve(
        &self,
        model: &Model,
        params: &SolveParams,
        mut observer: Option<&mut dyn ProgressObserver>,
    ) -> Result<Outcome, SolveError> {
        let start = Instant::now();
        let domains: Vec<(i64, i64)> = model
            .vars()
            .iter()
            .map(|d| match d.domain {
                Domain::Bool => (0, 1),
                Domain::Int { lo, hi } => (lo, hi),
            })
            .collect();
        let mut states: u128 = 1;
        for &(lo, hi) in &domains {
            states = states.saturating_mul((hi - lo + 1) as u128);
            if states > self.state_limit {
                return Err(SolveError::Backend(
                    "state space too large for exhaustive search".to_string(),
                ));
            }
        }
        let objective = model.objective();
        let mut current: Vec<i64> = domains.iter().map(|&(lo, _)| lo).collect();
        let mut best: Option<(i64, Vec<i64>)> = None;
        let mut solutions = 0u32;
        let mut visited = 0u64;
        'search: loop {
            visited += 1;
            if visited & 0xFFF == 0 && start.elapsed() >= params.time_budget {
                break;
            }
            if model.constraints().iter().all(|c| c.holds(&current)) {
                let value = objective.eval_with(&current);
                if best.as_ref().is_none_or(|(incumbent, _)| value < *incumbent) {
                    solutions += 1;
                    let stats = SearchStats {
                        elapsed: start.elapsed(),
                        solutions,
                    };
                    if let Some(obs) = observer.as_deref_mut() {
                        obs.on_solution(value, &stats);
                    }
                    best = Some((value, current.clone()));
                }
            }
            let mut pos = 0;
            loop {
                if pos == domains.len() {
                    break 'search;
                }
                current[pos] += 1;
                if current[pos] <= domains[pos].1 {
                    break;
                }
                current[pos] = domains[pos].0;
                pos += 1;
            }
        }
        let exhausted = start.elapsed() < params.time_budget;
        match best {
            Some((value, values)) => Ok(Outcome {
                status: if exhausted {
                    SolveStatus::Optimal
                } else {
                    SolveStatus::Feasible
                },
                valuation: Valuation::new(values),
                objective: value,
                stats: SearchStats {
                    elapsed: start.elapsed(),
                    solutions,
                },
            }),
            None if exhausted => Err(SolveError::Infeasible),
            None => Err(SolveError::Timeout(params.time_budget)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ilp::LinExpr;

    struct Recorder(Vec<i64>);

    impl ProgressObserver for Recorder {
        fn on_solution(&mut self, objective: i64, _stats: &SearchStats) {
            self.0.push(objective);
        }
    }

    /// Pick at least one of two options, the cheaper one costs 2.
    fn cover_model() -> (Model, VarId, VarId) {
        let mut model = Model::new();
        let x = model.bool_var("x");
        let y = model.bool_var("y");
        model.ge(LinExpr::sum([x, y]), 1);
        model.penalize(2, x);
        model.penalize(3, y);
        (model, x, y)
    }

    #[test]
    fn exhaustive_engine_minimizes() {
        let (model, x, y) = cover_model();
        let outcome = ExhaustiveEngine::default()
            .solve(&model, &SolveParams::default(), None)
            .unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert_eq!(outcome.objective, 2);
        assert_eq!(outcome.valuation.value(x), 1);
        assert_eq!(outcome.valuation.value(y), 0);
    }

    #[test]
    fn exhaustive_engine_detects_infeasibility() {
        let mut model = Model::new();
        let x = model.bool_var("x");
        model.ge(LinExpr::from(x), 2);
        let result = ExhaustiveEngine::default().solve(&model, &SolveParams::default(), None);
        assert!(matches!(result, Err(SolveError::Infeasible)));
    }

    #[test]
    fn observer_sees_improving_objectives() {
        let (model, _, _) = cover_model();
        let mut recorder = Recorder(Vec::new());
        ExhaustiveEngine::default()
            .solve(&model, &SolveParams::default(), Some(&mut recorder))
            .unwrap();
        assert!(!recorder.0.is_empty());
        assert!(recorder.0.windows(2).all(|w| w[1] < w[0]));
        assert_eq!(*recorder.0.last().unwrap(), 2);
    }

    #[test]
    fn highs_engine_agrees_with_the_reference() {
        let (model, x, y) = cover_model();
        let outcome = HighsEngine
            .solve(&model, &SolveParams::default(), None)
            .unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert_eq!(outcome.objective, 2);
        assert_eq!(outcome.valuation.value(x), 1);
        assert_eq!(outcome.valuation.value(y), 0);
    }

    #[test]
    fn highs_engine_reports_infeasibility() {
        let mut model = Model::new();
        let x = model.bool_var("x");
        let y = model.bool_var("y");
        model.ge(LinExpr::sum([x, y]), 2);
        model.le(LinExpr::sum([x, y]), 1);
        let result = HighsEngine.solve(&model, &SolveParams::default(), None);
        assert!(matches!(result, Err(SolveError::Infeasible)));
    }

    #[test]
    fn integer_deviation_is_pinned_at_the_optimum() {
        let mut model = Model::new();
        let n = model.int_var("n", 0, 5);
        model.eq(LinExpr::from(n), 4);
        let d = model.abs_deviation("d", LinExpr::from(n), 1, 5);
        model.penalize(1, d);
        let outcome = ExhaustiveEngine::default()
            .solve(&model, &SolveParams::default(), None)
            .unwrap();
        assert_eq!(outcome.objective, 3);
        assert_eq!(outcome.valuation.value(d), 3);
    }
}
