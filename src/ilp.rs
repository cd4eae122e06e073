//! Integer-linear model representation: decision variables, constraints
//! and weighted penalty terms, independent of any solver backend.
//!
//! The reified helpers force an auxiliary variable to track a derived fact
//! about a sum of decision variables through paired inequalities, so the
//! objective can price non-linear facts with linear terms.

/// Handle to a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Bool,
    Int { lo: i64, hi: i64 },
}

#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub domain: Domain,
}

/// Linear expression with integer coefficients.
#[derive(Debug, Clone, Default)]
pub struct LinExpr {
    terms: Vec<(VarId, i64)>,
    constant: i64,
}

impl LinExpr {
    pub fn new() -> LinExpr {
        LinExpr::default()
    }

    pub fn term(var: VarId, coeff: i64) -> LinExpr {
        LinExpr {
            terms: vec![(var, coeff)],
            constant: 0,
        }
    }

    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> LinExpr {
        LinExpr {
            terms: vars.into_iter().map(|v| (v, 1)).collect(),
            constant: 0,
        }
    }

    pub fn add_term(&mut self, var: VarId, coeff: i64) {
        self.terms.push((var, coeff));
    }

    pub fn terms(&self) -> &[(VarId, i64)] {
        &self.terms
    }

    pub fn constant(&self) -> i64 {
        self.constant
    }

    pub fn eval_with(&self, values: &[i64]) -> i64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|&(v, c)| c * values[v.index()])
                .sum::<i64>()
    }
}

impl From<VarId> for LinExpr {
    fn from(var: VarId) -> LinExpr {
        LinExpr::term(var, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Le,
    Ge,
    Eq,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub expr: LinExpr,
    pub cmp: Cmp,
    pub rhs: i64,
}

impl Constraint {
    pub fn holds(&self, values: &[i64]) -> bool {
        let value = self.expr.eval_with(values);
        match self.cmp {
            Cmp::Le => value <= self.rhs,
            Cmp::Ge => value >= self.rhs,
            Cmp::Eq => value == self.rhs,
        }
    }
}

/// The model under construction. Created once, handed by reference to the
/// solve engine, never mutated afterwards.
#[derive(Debug, Default)]
pub struct Model {
    vars: Vec<VarDef>,
    constraints: Vec<Constraint>,
    penalties: Vec<(i64, VarId)>,
}

impl Model {
    pub fn new() -> Model {
        Model::default()
    }

    pub fn bool_var(&mut self, name: impl Into<String>) -> VarId {
        self.vars.push(VarDef {
            name: name.into(),
            domain: Domain::Bool,
        });
        VarId(self.vars.len() - 1)
    }

    pub fn int_var(&mut self, name: impl Into<String>, lo: i64, hi: i64) -> VarId {
        debug_assert!(lo <= hi);
        self.vars.push(VarDef {
            name: name.into(),
            domain: Domain::Int { lo, hi },
        });
        VarId(self.vars.len() - 1)
    }

    pub fn le(&mut self, expr: LinExpr, rhs: i64) {
        self.constraints.push(Constraint { expr, cmp: Cmp::Le, rhs });
    }

    pub fn ge(&mut self, expr: LinExpr, rhs: i64) {
        self.constraints.push(Constraint { expr, cmp: Cmp::Ge, rhs });
    }

    pub fn eq(&mut self, expr: LinExpr, rhs: i64) {
        self.constraints.push(Constraint { expr, cmp: Cmp::Eq, rhs });
    }

    /// Adds a weighted term to the minimized objective.
    pub fn penalize(&mut self, weight: i64, var: VarId) {
        debug_assert!(weight > 0);
        self.penalties.push((weight, var));
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn penalties(&self) -> &[(i64, VarId)] {
        &self.penalties
    }

    pub fn objective(&self) -> LinExpr {
        LinExpr {
            terms: self.penalties.iter().map(|&(w, v)| (v, w)).collect(),
            constant: 0,
        }
    }

    /// z tracks a AND b: z <= a, z <= b, z >= a + b - 1.
    pub fn bool_and(&mut self, name: impl Into<String>, a: VarId, b: VarId) -> VarId {
        let z = self.bool_var(name);
        let mut c1 = LinExpr::from(z);
        c1.add_term(a, -1);
        self.le(c1, 0);
        let mut c2 = LinExpr::from(z);
        c2.add_term(b, -1);
        self.le(c2, 0);
        let mut c3 = LinExpr::from(z);
        c3.add_term(a, -1);
        c3.add_term(b, -1);
        self.ge(c3, -1);
        z
    }

    /// y tracks `expr >= k` for an expr ranging over [0, ub]. Two-sided:
    /// y = 1 forces expr >= k, y = 0 caps expr at k - 1.
    pub fn count_at_least(
        &mut self,
        name: impl Into<String>,
        expr: LinExpr,
        k: i64,
        ub: i64,
    ) -> VarId {
        debug_assert!(k >= 1 && ub >= 0);
        let y = self.bool_var(name);
        let mut lower = expr.clone();
        lower.add_term(y, -k);
        self.ge(lower, 0);
        let mut upper = expr;
        upper.add_term(y, -(ub - k + 1).max(0));
        self.le(upper, k - 1);
        y
    }

    /// m tracks `expr == 0` for an expr ranging over [0, ub].
    pub fn is_zero(&mut self, name: impl Into<String>, expr: LinExpr, ub: i64) -> VarId {
        debug_assert!(ub >= 0);
        let m = self.bool_var(name);
        let mut low = expr.clone();
        low.add_term(m, 1);
        self.ge(low, 1);
        let mut high = expr;
        high.add_term(m, ub);
        self.le(high, ub);
        m
    }

    /// b equals an expr already capped at one by the hard constraints.
    pub fn bool_of_sum(&mut self, name: impl Into<String>, expr: LinExpr) -> VarId {
        let b = self.bool_var(name);
        let mut e = expr;
        e.add_term(b, -1);
        self.eq(e, 0);
        b
    }

    /// d >= |expr - target|; a minimizing objective pins d to the deviation.
    pub fn abs_deviation(
        &mut self,
        name: impl Into<String>,
        expr: LinExpr,
        target: i64,
        ub: i64,
    ) -> VarId {
        let d = self.int_var(name, 0, ub);
        let mut over = LinExpr::from(d);
        for &(v, c) in expr.terms() {
            over.add_term(v, -c);
        }
        over.constant -= expr.constant;
        self.ge(over, -target);
        let mut under = LinExpr::from(d);
        for &(v, c) in expr.terms() {
            under.add_term(v, c);
        }
        under.constant += expr.constant;
        self.ge(under, target);
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every assignment in the cross product of the variable domains.
    fn assignments(model: &Model) -> Vec<Vec<i64>> {
        let domains: Vec<(i64, i64)> = model
            .vars()
            .iter()
            .map(|d| match d.domain {
                Domain::Bool => (0, 1),
                Domain::Int { lo, hi } => (lo, hi),
            })
            .collect();
        let mut out = vec![Vec::new()];
        for (lo, hi) in domains {
            out = out
                .into_iter()
                .flat_map(|prefix| {
                    (lo..=hi).map(move |v| {
                        let mut next = prefix.clone();
                        next.push(v);
                        next
                    })
                })
                .collect();
        }
        out
    }

    fn feasible(model: &Model, values: &[i64]) -> bool {
        model.constraints().iter().all(|c| c.holds(values))
    }

    #[test]
    fn bool_and_tracks_conjunction() {
        let mut model = Model::new();
        let a = model.bool_var("a");
        let b = model.bool_var("b");
        let z = model.bool_and("z", a, b);
        for values in assignments(&model) {
            let expected = values[a.index()] == 1 && values[b.index()] == 1;
            assert_eq!(
                feasible(&model, &values),
                (values[z.index()] == 1) == expected,
                "assignment {values:?}"
            );
        }
    }

    #[test]
    fn count_at_least_is_forced_both_ways() {
        let mut model = Model::new();
        let vars: Vec<VarId> = (0..3).map(|i| model.bool_var(format!("v{i}"))).collect();
        let y = model.count_at_least("y", LinExpr::sum(vars.clone()), 2, 3);
        for values in assignments(&model) {
            let total: i64 = vars.iter().map(|v| values[v.index()]).sum();
            assert_eq!(
                feasible(&model, &values),
                (values[y.index()] == 1) == (total >= 2),
                "assignment {values:?}"
            );
        }
    }

    #[test]
    fn count_at_least_with_unreachable_threshold_pins_to_zero() {
        let mut model = Model::new();
        let a = model.bool_var("a");
        let y = model.count_at_least("y", LinExpr::from(a), 2, 1);
        for values in assignments(&model) {
            assert_eq!(feasible(&model, &values), values[y.index()] == 0);
        }
    }

    #[test]
    fn is_zero_tracks_empty_sums() {
        let mut model = Model::new();
        let vars: Vec<VarId> = (0..2).map(|i| model.bool_var(format!("v{i}"))).collect();
        let m = model.is_zero("m", LinExpr::sum(vars.clone()), 2);
        for values in assignments(&model) {
            let total: i64 = vars.iter().map(|v| values[v.index()]).sum();
            assert_eq!(
                feasible(&model, &values),
                (values[m.index()] == 1) == (total == 0),
                "assignment {values:?}"
            );
        }
    }

    #[test]
    fn is_zero_over_nothing_is_always_one() {
        let mut model = Model::new();
        let m = model.is_zero("m", LinExpr::new(), 0);
        for values in assignments(&model) {
            assert_eq!(feasible(&model, &values), values[m.index()] == 1);
        }
    }

    #[test]
    fn bool_of_sum_mirrors_the_sum() {
        let mut model = Model::new();
        let a = model.bool_var("a");
        let b = model.bool_of_sum("b", LinExpr::from(a));
        for values in assignments(&model) {
            assert_eq!(
                feasible(&model, &values),
                values[a.index()] == values[b.index()]
            );
        }
    }

    #[test]
    fn abs_deviation_is_a_lower_bounded_distance() {
        let mut model = Model::new();
        let n = model.int_var("n", 0, 5);
        let d = model.abs_deviation("d", LinExpr::from(n), 3, 5);
        for values in assignments(&model) {
            let expected = (values[n.index()] - 3).abs();
            if feasible(&model, &values) {
                assert!(values[d.index()] >= expected);
            } else {
                assert!(values[d.index()] < expected);
            }
        }
    }

    #[test]
    fn objective_collects_weighted_terms() {
        let mut model = Model::new();
        let a = model.bool_var("a");
        let b = model.bool_var("b");
        model.penalize(3, a);
        model.penalize(5, b);
        assert_eq!(model.objective().eval_with(&[1, 1]), 8);
        assert_eq!(model.objective().eval_with(&[1, 0]), 3);
    }
}
