//! Hyperparameter search over a bounded box with a fixed evaluation budget.

use crate::error::MlError;
use crate::training::solver::{GridSearch, ParticleSwarm, RandomSearch, Solver};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// A hyperparameter point: parameter name to value.
///
/// Ordered so that proposals and sampling never depend on hash order.
pub type HyperParams = BTreeMap<String, f64>;

/// Closed interval `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

impl Bounds {
    pub fn new(low: f64, high: f64) -> Result<Self, MlError> {
        if !low.is_finite() || !high.is_finite() || low > high {
            return Err(MlError::invalid_input(format!(
                "invalid bounds [{low}, {high}]"
            )));
        }
        Ok(Self { low, high })
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    pub fn centre(&self) -> f64 {
        self.low + self.width() / 2.0
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.low, self.high)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.width() == 0.0 {
            self.low
        } else {
            rng.gen_range(self.low..=self.high)
        }
    }
}

/// Named bounded parameters, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchSpace {
    params: BTreeMap<String, Bounds>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`SearchSpace::add`].
    pub fn with(mut self, name: &str, low: f64, high: f64) -> Result<Self, MlError> {
        self.add(name, low, high)?;
        Ok(self)
    }

    pub fn add(&mut self, name: &str, low: f64, high: f64) -> Result<(), MlError> {
        let bounds = Bounds::new(low, high)
            .map_err(|e| MlError::invalid_input(format!("parameter '{name}': {e}")))?;
        self.insert(name, bounds);
        Ok(())
    }

    pub fn insert(&mut self, name: &str, bounds: Bounds) {
        self.params.insert(name.to_string(), bounds);
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Bounds> {
        self.params.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Bounds)> {
        self.params.iter()
    }

    /// Whether `point` names exactly these parameters, each within bounds.
    pub fn contains(&self, point: &HyperParams) -> bool {
        point.len() == self.params.len()
            && self
                .params
                .iter()
                .all(|(name, b)| point.get(name).is_some_and(|v| b.contains(*v)))
    }

    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> HyperParams {
        self.params
            .iter()
            .map(|(name, b)| (name.clone(), b.sample(rng)))
            .collect()
    }

    /// Convert a position vector (in name order) into a point.
    pub fn point_from(&self, position: &[f64]) -> HyperParams {
        self.params
            .iter()
            .zip(position)
            .map(|((name, b), v)| (name.clone(), b.clamp(*v)))
            .collect()
    }

    pub(crate) fn bounds(&self) -> Vec<Bounds> {
        self.params.values().copied().collect()
    }
}

/// Which solver proposes candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    #[default]
    ParticleSwarm,
    #[serde(alias = "random")]
    RandomSearch,
    #[serde(alias = "grid")]
    GridSearch,
}

impl SolverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParticleSwarm => "particle_swarm",
            Self::RandomSearch => "random_search",
            Self::GridSearch => "grid_search",
        }
    }

    pub fn build(&self, space: &SearchSpace, num_evals: usize) -> Box<dyn Solver> {
        match self {
            Self::ParticleSwarm => Box::new(ParticleSwarm::for_budget(space.clone(), num_evals)),
            Self::RandomSearch => Box::new(RandomSearch::new(space.clone(), num_evals)),
            Self::GridSearch => Box::new(GridSearch::for_budget(space.clone(), num_evals)),
        }
    }
}

impl std::str::FromStr for SolverKind {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "particle_swarm" | "pso" => Ok(Self::ParticleSwarm),
            "random_search" | "random" => Ok(Self::RandomSearch),
            "grid_search" | "grid" => Ok(Self::GridSearch),
            other => Err(MlError::invalid_input(format!(
                "unknown solver '{other}' (expected particle_swarm, random or grid)"
            ))),
        }
    }
}

/// Search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of candidate evaluations.
    #[serde(default = "default_num_evals")]
    pub num_evals: usize,
    #[serde(default)]
    pub solver: SolverKind,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_evals: default_num_evals(),
            solver: SolverKind::default(),
        }
    }
}

fn default_num_evals() -> usize {
    100
}

/// One evaluated candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub number: usize,
    pub params: HyperParams,
    pub value: f64,
}

/// Diagnostics returned alongside the best point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchInfo {
    /// Best objective value observed.
    pub optimum: f64,
    pub num_evals: usize,
    pub solver: String,
    /// Every evaluated candidate, in evaluation order.
    pub call_log: Vec<Trial>,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best: HyperParams,
    pub info: SearchInfo,
}

/// Maximize `objective` over `space`, evaluating at most `config.num_evals`
/// candidates. Ties keep the earlier candidate; objective errors propagate.
pub fn maximize<F>(
    mut objective: F,
    space: &SearchSpace,
    config: &SearchConfig,
    rng: &mut StdRng,
) -> Result<SearchOutcome, MlError>
where
    F: FnMut(&HyperParams) -> Result<f64, MlError>,
{
    if config.num_evals == 0 {
        return Err(MlError::invalid_input("evaluation budget must be at least 1"));
    }
    if space.is_empty() {
        return Err(MlError::invalid_input("search space has no parameters"));
    }

    let started = Instant::now();
    let mut solver = config.solver.build(space, config.num_evals);
    let mut call_log: Vec<Trial> = Vec::with_capacity(config.num_evals);
    let mut best: Option<usize> = None;

    while call_log.len() < config.num_evals {
        let mut batch = solver.propose(rng);
        if batch.is_empty() {
            break;
        }
        batch.truncate(config.num_evals - call_log.len());

        let mut results = Vec::with_capacity(batch.len());
        for params in batch {
            let value = objective(&params)?;
            if value.is_nan() {
                return Err(MlError::search(format!(
                    "objective returned NaN for {params:?}"
                )));
            }
            let number = call_log.len();
            tracing::debug!(trial = number, ?params, value, "Evaluated candidate");
            if best.is_none_or(|b| value > call_log[b].value) {
                best = Some(number);
            }
            call_log.push(Trial {
                number,
                params: params.clone(),
                value,
            });
            results.push((params, value));
        }
        solver.observe(&results);
    }

    let best = best.ok_or_else(|| MlError::search("solver proposed no candidates"))?;
    let best_trial = &call_log[best];
    tracing::debug!(
        solver = solver.name(),
        evals = call_log.len(),
        optimum = best_trial.value,
        "Search finished"
    );
    Ok(SearchOutcome {
        best: best_trial.params.clone(),
        info: SearchInfo {
            optimum: best_trial.value,
            num_evals: call_log.len(),
            solver: solver.name().to_string(),
            duration_secs: started.elapsed().as_secs_f64(),
            call_log,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn space() -> SearchSpace {
        SearchSpace::new()
            .with("C", 0.0, 10.0)
            .unwrap()
            .with("log_gamma", -5.0, 0.0)
            .unwrap()
    }

    fn paraboloid(p: &HyperParams) -> Result<f64, MlError> {
        Ok(-(p["C"] - 3.0).powi(2) - (p["log_gamma"] + 2.0).powi(2))
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(SearchSpace::new().with("C", 1.0, 0.0).is_err());
        assert!(SearchSpace::new().with("C", f64::NAN, 1.0).is_err());
        assert!(SearchSpace::new().with("C", 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_every_solver_respects_budget_and_bounds() {
        for solver in [
            SolverKind::ParticleSwarm,
            SolverKind::RandomSearch,
            SolverKind::GridSearch,
        ] {
            let config = SearchConfig {
                num_evals: 37,
                solver,
            };
            let mut rng = StdRng::seed_from_u64(5);
            let outcome = maximize(paraboloid, &space(), &config, &mut rng).unwrap();
            assert!(outcome.info.num_evals <= 37, "{solver:?}");
            assert_eq!(outcome.info.call_log.len(), outcome.info.num_evals);
            assert!(outcome.info.call_log.iter().all(|t| space().contains(&t.params)));
            assert!(space().contains(&outcome.best));
            let max = outcome
                .info
                .call_log
                .iter()
                .map(|t| t.value)
                .fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(outcome.info.optimum, max);
        }
    }

    #[test]
    fn test_particle_swarm_uses_full_budget_and_converges() {
        let config = SearchConfig {
            num_evals: 150,
            solver: SolverKind::ParticleSwarm,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = maximize(paraboloid, &space(), &config, &mut rng).unwrap();
        assert_eq!(outcome.info.num_evals, 150);
        assert!(outcome.info.optimum > -0.5, "optimum {}", outcome.info.optimum);
    }

    #[test]
    fn test_single_evaluation_budget() {
        let config = SearchConfig {
            num_evals: 1,
            solver: SolverKind::ParticleSwarm,
        };
        let mut rng = StdRng::seed_from_u64(2);
        let outcome = maximize(paraboloid, &space(), &config, &mut rng).unwrap();
        assert_eq!(outcome.info.num_evals, 1);
        assert!(space().contains(&outcome.best));
        assert_eq!(outcome.info.call_log[0].params, outcome.best);
    }

    #[test]
    fn test_zero_budget_and_empty_space_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let zero = SearchConfig {
            num_evals: 0,
            ..SearchConfig::default()
        };
        assert!(maximize(paraboloid, &space(), &zero, &mut rng).is_err());
        assert!(maximize(paraboloid, &SearchSpace::new(), &SearchConfig::default(), &mut rng).is_err());
    }

    #[test]
    fn test_objective_error_propagates() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = maximize(
            |_| Err(MlError::training("degenerate fold")),
            &space(),
            &SearchConfig::default(),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, MlError::Training(_)));
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = maximize(|_| Ok(0.5), &space(), &SearchConfig::default(), &mut rng).unwrap();
        assert_eq!(outcome.best, outcome.info.call_log[0].params);
    }

    #[test]
    fn test_same_seed_same_search() {
        let run = || {
            let mut rng = StdRng::seed_from_u64(99);
            maximize(paraboloid, &space(), &SearchConfig::default(), &mut rng).unwrap()
        };
        let (a, b) = (run(), run());
        assert_eq!(a.best, b.best);
        assert_eq!(a.info.call_log, b.info.call_log);
    }

    #[test]
    fn test_solver_kind_parsing() {
        assert_eq!("grid".parse::<SolverKind>().unwrap(), SolverKind::GridSearch);
        assert_eq!("pso".parse::<SolverKind>().unwrap(), SolverKind::ParticleSwarm);
        assert!("annealing".parse::<SolverKind>().is_err());
        let kind: SolverKind = serde_json::from_str("\"random\"").unwrap();
        assert_eq!(kind, SolverKind::RandomSearch);
    }
}
