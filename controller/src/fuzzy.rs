//! Discretized Mamdani fuzzy inference.
//!
//! Membership functions are sampled on a finite universe and evaluated by
//! linear interpolation between samples. Rule antecedents combine with `min`,
//! consequents aggregate with `max`, and the output set is defuzzified with a
//! piecewise-linear centroid over a universe upsampled at every activation
//! level, so results match the common sampled-universe fuzzy toolkits.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// Every rule fired with zero strength, so the centroid is undefined.
    #[error("no rule fired, aggregated output set is empty")]
    NoActiveRule,

    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("variable `{variable}` has no term `{term}`")]
    UnknownTerm { variable: String, term: String },

    #[error("term `{term}` of `{variable}` is not an ordered triangle")]
    MalformedTerm { variable: String, term: String },

    #[error("variable `{0}` has an empty universe")]
    EmptyUniverse(String),

    #[error("rule {0} has no conditions")]
    EmptyAntecedent(usize),

    #[error("expected {expected} inputs, got {actual}")]
    InputArity { expected: usize, actual: usize },

    #[error("input `{0}` is not a number")]
    NonFiniteInput(String),

    #[error("defuzzified output is not finite")]
    NonFinite,
}

pub type Result<T> = std::result::Result<T, InferenceError>;

/// Ordered, finite set of points an axis is sampled on.
#[derive(Debug, Clone, PartialEq)]
pub struct Universe(Vec<f64>);

impl Universe {
    /// Integer steps from `start` to `end`, both inclusive.
    pub fn steps(start: i32, end: i32) -> Self {
        Universe((start..=end).map(f64::from).collect())
    }

    pub fn from_points(mut points: Vec<f64>) -> Self {
        points.sort_by(f64::total_cmp);
        points.dedup();
        Universe(points)
    }

    pub fn points(&self) -> &[f64] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Triangular membership: zero outside `(left, right)`, one at `peak`.
/// `left == peak` or `peak == right` gives a shoulder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub left: f64,
    pub peak: f64,
    pub right: f64,
}

impl Triangle {
    pub const fn new(left: f64, peak: f64, right: f64) -> Self {
        Self { left, peak, right }
    }

    pub fn is_ordered(&self) -> bool {
        self.left <= self.peak && self.peak <= self.right
    }

    pub fn degree(&self, x: f64) -> f64 {
        if x == self.peak {
            return 1.0;
        }
        if self.left != self.peak && self.left < x && x < self.peak {
            return (x - self.left) / (self.peak - self.left);
        }
        if self.peak != self.right && self.peak < x && x < self.right {
            return (self.right - x) / (self.right - self.peak);
        }
        0.0
    }

    pub fn sample(&self, universe: &Universe) -> Vec<f64> {
        universe.points().iter().map(|&x| self.degree(x)).collect()
    }
}

#[derive(Debug, Clone)]
struct Term {
    name: String,
    shape: Triangle,
    samples: Vec<f64>,
}

/// A linguistic variable: one axis and its named terms.
#[derive(Debug, Clone)]
pub struct FuzzyVariable {
    name: String,
    universe: Universe,
    terms: Vec<Term>,
}

impl FuzzyVariable {
    pub fn new(name: impl Into<String>, universe: Universe) -> Self {
        Self {
            name: name.into(),
            universe,
            terms: Vec::new(),
        }
    }

    pub fn term(mut self, name: impl Into<String>, shape: Triangle) -> Self {
        let samples = shape.sample(&self.universe);
        self.terms.push(Term {
            name: name.into(),
            shape,
            samples,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn term_names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.name.as_str())
    }

    /// Membership of `x` in the named term, or `None` for an unknown term.
    pub fn membership(&self, term: &str, x: f64) -> Option<f64> {
        self.term_index(term).map(|i| self.degree(i, self.clip(x)))
    }

    fn term_index(&self, term: &str) -> Option<usize> {
        self.terms.iter().position(|t| t.name == term)
    }

    fn degree(&self, term: usize, x: f64) -> f64 {
        interp(x, self.universe.points(), &self.terms[term].samples)
    }

    fn clip(&self, x: f64) -> f64 {
        let points = self.universe.points();
        match (points.first(), points.last()) {
            (Some(&lo), Some(&hi)) => x.clamp(lo, hi),
            _ => x,
        }
    }

    fn check(&self) -> Result<()> {
        if self.universe.is_empty() {
            return Err(InferenceError::EmptyUniverse(self.name.clone()));
        }
        if let Some(bad) = self.terms.iter().find(|t| !t.shape.is_ordered()) {
            return Err(InferenceError::MalformedTerm {
                variable: self.name.clone(),
                term: bad.name.clone(),
            });
        }
        Ok(())
    }
}

/// Linear interpolation of `(xp, fp)` at `x`, holding the edge values
/// outside the sampled range.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let last = match xp.len().checked_sub(1) {
        Some(last) => last,
        None => return 0.0,
    };
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    let j = xp.partition_point(|&p| p <= x).saturating_sub(1);
    if x == xp[j] {
        return fp[j];
    }
    let slope = (fp[j + 1] - fp[j]) / (xp[j + 1] - xp[j]);
    slope * (x - xp[j]) + fp[j]
}

/// Points where the sampled curve `mf` crosses `level` (`level > 0`).
fn level_crossings(xs: &[f64], mf: &[f64], level: f64) -> Vec<f64> {
    let mut out = Vec::new();
    for i in 0..xs.len().saturating_sub(1) {
        if (mf[i] >= level) != (mf[i + 1] >= level) {
            out.push(xs[i] + (level - mf[i]) * (xs[i + 1] - xs[i]) / (mf[i + 1] - mf[i]));
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Condition {
    input: usize,
    term: usize,
}

/// Conjunction of input conditions implying one output term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    conditions: Vec<Condition>,
    consequent: usize,
}

/// Aggregated output fuzzy set on the upsampled output universe.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSet {
    pub points: Vec<f64>,
    pub degrees: Vec<f64>,
}

impl OutputSet {
    /// Total membership mass. Zero means nothing fired.
    pub fn mass(&self) -> f64 {
        self.degrees.iter().sum()
    }

    /// Center of gravity of the piecewise-linear set.
    pub fn centroid(&self) -> Result<f64> {
        if self.mass() == 0.0 {
            return Err(InferenceError::NoActiveRule);
        }
        let (xs, ys) = (&self.points, &self.degrees);
        if xs.len() == 1 {
            return Ok(xs[0]);
        }

        let mut sum_moment_area = 0.0;
        let mut sum_area = 0.0;
        for i in 1..xs.len() {
            let (x1, x2) = (xs[i - 1], xs[i]);
            let (y1, y2) = (ys[i - 1], ys[i]);
            if (y1 == 0.0 && y2 == 0.0) || x1 == x2 {
                continue;
            }
            let (moment, area) = if y1 == y2 {
                (0.5 * (x1 + x2), (x2 - x1) * y1)
            } else if y1 == 0.0 {
                (2.0 / 3.0 * (x2 - x1) + x1, 0.5 * (x2 - x1) * y2)
            } else if y2 == 0.0 {
                (1.0 / 3.0 * (x2 - x1) + x1, 0.5 * (x2 - x1) * y1)
            } else {
                (
                    (2.0 / 3.0 * (x2 - x1) * (y2 + 0.5 * y1)) / (y1 + y2) + x1,
                    0.5 * (x2 - x1) * (y1 + y2),
                )
            };
            sum_moment_area += moment * area;
            sum_area += area;
        }

        let crisp = sum_moment_area / sum_area.max(f64::EPSILON);
        if crisp.is_finite() {
            Ok(crisp)
        } else {
            Err(InferenceError::NonFinite)
        }
    }
}

/// Immutable Mamdani system: input variables, one output variable, rules.
///
/// Holds no per-evaluation state, so one instance can serve any number of
/// concurrent callers.
#[derive(Debug, Clone)]
pub struct FuzzySystem {
    inputs: Vec<FuzzyVariable>,
    output: FuzzyVariable,
    rules: Vec<Rule>,
}

impl FuzzySystem {
    pub fn new(inputs: Vec<FuzzyVariable>, output: FuzzyVariable) -> Result<Self> {
        for var in inputs.iter().chain(std::iter::once(&output)) {
            var.check()?;
        }
        Ok(Self {
            inputs,
            output,
            rules: Vec::new(),
        })
    }

    /// Appends `IF a AND b ... THEN output=consequent`. Conditions are
    /// `(variable, term)` name pairs.
    pub fn rule(mut self, antecedent: &[(&str, &str)], consequent: &str) -> Result<Self> {
        if antecedent.is_empty() {
            return Err(InferenceError::EmptyAntecedent(self.rules.len() + 1));
        }
        let mut conditions = Vec::with_capacity(antecedent.len());
        for &(variable, term) in antecedent {
            let input = self
                .inputs
                .iter()
                .position(|v| v.name == variable)
                .ok_or_else(|| InferenceError::UnknownVariable(variable.to_string()))?;
            let term_idx = self.inputs[input].term_index(term).ok_or_else(|| {
                InferenceError::UnknownTerm {
                    variable: variable.to_string(),
                    term: term.to_string(),
                }
            })?;
            conditions.push(Condition { input, term: term_idx });
        }
        let consequent = self.output.term_index(consequent).ok_or_else(|| {
            InferenceError::UnknownTerm {
                variable: self.output.name.clone(),
                term: consequent.to_string(),
            }
        })?;
        self.rules.push(Rule { conditions, consequent });
        Ok(self)
    }

    pub fn inputs(&self) -> &[FuzzyVariable] {
        &self.inputs
    }

    pub fn output(&self) -> &FuzzyVariable {
        &self.output
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Crisp output for one crisp value per input, in input order.
    pub fn infer(&self, crisp: &[f64]) -> Result<f64> {
        let activations = self.activations(crisp)?;
        self.aggregate(&activations).centroid()
    }

    /// Activation level of each output term, in term order.
    pub fn activations(&self, crisp: &[f64]) -> Result<Vec<f64>> {
        if crisp.len() != self.inputs.len() {
            return Err(InferenceError::InputArity {
                expected: self.inputs.len(),
                actual: crisp.len(),
            });
        }
        let mut clipped = Vec::with_capacity(crisp.len());
        for (var, &x) in self.inputs.iter().zip(crisp) {
            if x.is_nan() {
                return Err(InferenceError::NonFiniteInput(var.name.clone()));
            }
            clipped.push(var.clip(x));
        }

        let mut activations = vec![0.0_f64; self.output.terms.len()];
        for rule in &self.rules {
            let strength = rule
                .conditions
                .iter()
                .map(|c| self.inputs[c.input].degree(c.term, clipped[c.input]))
                .fold(1.0_f64, f64::min);
            let slot = &mut activations[rule.consequent];
            *slot = slot.max(strength);
        }
        Ok(activations)
    }

    /// Clips every output term at its activation and unions them with `max`.
    pub fn aggregate(&self, activations: &[f64]) -> OutputSet {
        let xs = self.output.universe.points();

        let mut points = xs.to_vec();
        for (term, &level) in self.output.terms.iter().zip(activations) {
            if level > 0.0 {
                points.extend(level_crossings(xs, &term.samples, level));
            }
        }
        let points = Universe::from_points(points).0;

        let mut degrees = vec![0.0_f64; points.len()];
        for (term, &level) in self.output.terms.iter().zip(activations) {
            for (degree, &x) in degrees.iter_mut().zip(&points) {
                let clipped = level.min(interp(x, xs, &term.samples));
                *degree = degree.max(clipped);
            }
        }
        OutputSet { points, degrees }
    }
}
