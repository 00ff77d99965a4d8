//! Candidate proposal strategies used by [`maximize`](crate::training::sweep::maximize).

use crate::training::sweep::{Bounds, HyperParams, SearchSpace};
use rand::{Rng, RngCore};

/// Proposes batches of candidate points and learns from their scores.
///
/// An empty batch means the solver is exhausted.
pub trait Solver {
    fn name(&self) -> &'static str;

    fn propose(&mut self, rng: &mut dyn RngCore) -> Vec<HyperParams>;

    /// Scores for (a prefix of) the last proposed batch, in proposal order.
    fn observe(&mut self, results: &[(HyperParams, f64)]);
}

// ---------------------------------------------------------------------------
// ParticleSwarm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Particle {
    position: Vec<f64>,
    speed: Vec<f64>,
    best: Option<(Vec<f64>, f64)>,
}

/// Particle swarm optimisation inside the search box.
#[derive(Debug, Clone)]
pub struct ParticleSwarm {
    space: SearchSpace,
    bounds: Vec<Bounds>,
    pub num_particles: usize,
    pub num_generations: usize,
    /// Attraction towards each particle's own best.
    pub phi1: f64,
    /// Attraction towards the swarm's best.
    pub phi2: f64,
    particles: Vec<Particle>,
    best: Option<(Vec<f64>, f64)>,
    generation: usize,
}

impl ParticleSwarm {
    pub fn new(space: SearchSpace, num_particles: usize, num_generations: usize) -> Self {
        let bounds = space.bounds();
        Self {
            space,
            bounds,
            num_particles: num_particles.max(1),
            num_generations,
            phi1: 1.5,
            phi2: 1.5,
            particles: Vec::new(),
            best: None,
            generation: 0,
        }
    }

    /// Size the swarm so that particles × generations covers `num_evals`.
    pub fn for_budget(space: SearchSpace, num_evals: usize) -> Self {
        let num_particles = match num_evals {
            n if n > 1000 => 100,
            n if n >= 200 => 20,
            n if n >= 10 => 10,
            n => n.max(1),
        };
        let num_generations = num_evals.div_ceil(num_particles);
        Self::new(space, num_particles, num_generations)
    }

    fn smax(&self) -> Vec<f64> {
        self.bounds.iter().map(Bounds::width).collect()
    }

    fn initialise(&mut self, rng: &mut dyn RngCore) {
        let smax = self.smax();
        self.particles = (0..self.num_particles)
            .map(|_| Particle {
                position: self.bounds.iter().map(|b| b.sample(rng)).collect(),
                speed: smax.iter().map(|&s| symmetric(rng, s)).collect(),
                best: None,
            })
            .collect();
    }

    fn step(&mut self, rng: &mut dyn RngCore) {
        let smax = self.smax();
        let Some((global_best, _)) = self.best.clone() else {
            return;
        };
        for particle in &mut self.particles {
            let personal_best = particle
                .best
                .as_ref()
                .map_or_else(|| particle.position.clone(), |(p, _)| p.clone());
            for d in 0..self.bounds.len() {
                let u1: f64 = rng.gen_range(0.0..1.0);
                let u2: f64 = rng.gen_range(0.0..1.0);
                let x = particle.position[d];
                let v = particle.speed[d]
                    + u1 * self.phi1 * (personal_best[d] - x)
                    + u2 * self.phi2 * (global_best[d] - x);
                particle.speed[d] = v.clamp(-smax[d], smax[d]);
                particle.position[d] = self.bounds[d].clamp(x + particle.speed[d]);
            }
        }
    }
}

fn symmetric(rng: &mut dyn RngCore, half_width: f64) -> f64 {
    if half_width == 0.0 {
        0.0
    } else {
        rng.gen_range(-half_width..=half_width)
    }
}

impl Solver for ParticleSwarm {
    fn name(&self) -> &'static str {
        "particle_swarm"
    }

    fn propose(&mut self, rng: &mut dyn RngCore) -> Vec<HyperParams> {
        if self.generation >= self.num_generations {
            return Vec::new();
        }
        if self.generation == 0 {
            self.initialise(rng);
        } else {
            self.step(rng);
        }
        self.generation += 1;
        self.particles
            .iter()
            .map(|p| self.space.point_from(&p.position))
            .collect()
    }

    fn observe(&mut self, results: &[(HyperParams, f64)]) {
        for (particle, (_, value)) in self.particles.iter_mut().zip(results) {
            let value = *value;
            if particle.best.as_ref().is_none_or(|(_, b)| value > *b) {
                particle.best = Some((particle.position.clone(), value));
            }
            if self.best.as_ref().is_none_or(|(_, b)| value > *b) {
                self.best = Some((particle.position.clone(), value));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RandomSearch
// ---------------------------------------------------------------------------

/// Independent uniform draws from the box.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    space: SearchSpace,
    remaining: usize,
}

impl RandomSearch {
    pub fn new(space: SearchSpace, num_evals: usize) -> Self {
        Self {
            space,
            remaining: num_evals,
        }
    }
}

impl Solver for RandomSearch {
    fn name(&self) -> &'static str {
        "random_search"
    }

    fn propose(&mut self, rng: &mut dyn RngCore) -> Vec<HyperParams> {
        let batch = (0..self.remaining)
            .map(|_| self.space.sample_uniform(rng))
            .collect();
        self.remaining = 0;
        batch
    }

    fn observe(&mut self, _results: &[(HyperParams, f64)]) {}
}

// ---------------------------------------------------------------------------
// GridSearch
// ---------------------------------------------------------------------------

/// Evenly spaced grid, cartesian product in parameter-name order.
#[derive(Debug, Clone)]
pub struct GridSearch {
    space: SearchSpace,
    pub(crate) n_points: usize,
    done: bool,
}

impl GridSearch {
    pub fn new(space: SearchSpace, n_points: usize) -> Self {
        Self {
            space,
            n_points: n_points.max(1),
            done: false,
        }
    }

    /// The largest grid with `n_points^dims <= num_evals` (at least one point).
    pub fn for_budget(space: SearchSpace, num_evals: usize) -> Self {
        let dims = u32::try_from(space.len().max(1)).unwrap_or(u32::MAX);
        let mut n_points = 1usize;
        while (n_points + 1)
            .checked_pow(dims)
            .is_some_and(|total| total <= num_evals)
        {
            n_points += 1;
        }
        Self::new(space, n_points)
    }

    fn axis(&self, bounds: &Bounds) -> Vec<f64> {
        if self.n_points == 1 {
            return vec![bounds.centre()];
        }
        let divisor = (self.n_points - 1) as f64;
        (0..self.n_points)
            .map(|i| bounds.low + bounds.width() * i as f64 / divisor)
            .collect()
    }

    pub fn configurations(&self) -> Vec<HyperParams> {
        let mut configs = vec![HyperParams::new()];
        for (name, bounds) in self.space.iter() {
            let axis = self.axis(bounds);
            configs = configs
                .iter()
                .flat_map(|config| {
                    axis.iter().map(move |v| {
                        let mut c = config.clone();
                        c.insert(name.clone(), *v);
                        c
                    })
                })
                .collect();
        }
        configs
    }
}

impl Solver for GridSearch {
    fn name(&self) -> &'static str {
        "grid_search"
    }

    fn propose(&mut self, _rng: &mut dyn RngCore) -> Vec<HyperParams> {
        if self.done {
            return Vec::new();
        }
        self.done = true;
        self.configurations()
    }

    fn observe(&mut self, _results: &[(HyperParams, f64)]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn space() -> SearchSpace {
        SearchSpace::new()
            .with("C", 0.0, 10.0)
            .unwrap()
            .with("log_gamma", -5.0, 0.0)
            .unwrap()
    }

    #[test]
    fn test_swarm_sizing() {
        let cases = [(1, 1, 1), (7, 7, 1), (100, 10, 10), (105, 10, 11), (200, 20, 10), (5000, 100, 50)];
        for (evals, particles, generations) in cases {
            let pso = ParticleSwarm::for_budget(space(), evals);
            assert_eq!(pso.num_particles, particles, "evals {evals}");
            assert_eq!(pso.num_generations, generations, "evals {evals}");
        }
    }

    #[test]
    fn test_swarm_generations_then_exhausted() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut pso = ParticleSwarm::new(space(), 4, 2);
        for _ in 0..2 {
            let batch = pso.propose(&mut rng);
            assert_eq!(batch.len(), 4);
            assert!(batch.iter().all(|p| space().contains(p)));
            let scored: Vec<_> = batch.into_iter().map(|p| (p, 1.0)).collect();
            pso.observe(&scored);
        }
        assert!(pso.propose(&mut rng).is_empty());
    }

    #[test]
    fn test_grid_axis_and_product() {
        let grid = GridSearch::new(space(), 3);
        let configs = grid.configurations();
        assert_eq!(configs.len(), 9);
        assert_eq!(configs[0]["C"], 0.0);
        assert_eq!(configs[0]["log_gamma"], -5.0);
        assert_eq!(configs[8]["C"], 10.0);
        assert_eq!(configs[8]["log_gamma"], 0.0);
        assert_eq!(configs[4]["C"], 5.0);
    }

    #[test]
    fn test_grid_budget_sizing() {
        assert_eq!(GridSearch::for_budget(space(), 1).n_points, 1);
        assert_eq!(GridSearch::for_budget(space(), 8).n_points, 2);
        assert_eq!(GridSearch::for_budget(space(), 100).n_points, 10);
        let single = GridSearch::for_budget(space(), 1).configurations();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0]["C"], 5.0);
        assert_eq!(single[0]["log_gamma"], -2.5);
    }

    #[test]
    fn test_random_search_single_batch() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut random = RandomSearch::new(space(), 12);
        let batch = random.propose(&mut rng);
        assert_eq!(batch.len(), 12);
        assert!(batch.iter().all(|p| space().contains(p)));
        assert!(random.propose(&mut rng).is_empty());
    }
}
