//! RBF-kernel support vector classifier trained with SMO.
//!
//! Solves the C-SVC dual
//!
//! ```text
//! min_a  ½ aᵀQa − eᵀa   s.t.  0 ≤ a_i ≤ C,  yᵀa = 0,   Q_ij = y_i y_j K(x_i, x_j)
//! ```
//!
//! with maximal-violating-pair working set selection. The kernel matrix is
//! computed once up front; training sets here are a few hundred rows at most.

use crate::data::SampleSet;
use crate::error::MlError;
use crate::training::sweep::HyperParams;
use serde::{Deserialize, Serialize};

const TOLERANCE: f64 = 1e-3;
const TAU: f64 = 1e-12;

/// Classifier hyperparameters. `gamma = 10^log_gamma`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvmParams {
    pub c: f64,
    pub log_gamma: f64,
}

impl SvmParams {
    pub const C: &'static str = "C";
    pub const LOG_GAMMA: &'static str = "log_gamma";

    pub fn new(c: f64, log_gamma: f64) -> Self {
        Self { c, log_gamma }
    }

    /// Read `C` and `log_gamma` from a hyperparameter point.
    pub fn from_hyperparams(params: &HyperParams) -> Result<Self, MlError> {
        let get = |name: &str| {
            params
                .get(name)
                .copied()
                .ok_or_else(|| MlError::invalid_input(format!("missing hyperparameter '{name}'")))
        };
        Ok(Self::new(get(Self::C)?, get(Self::LOG_GAMMA)?))
    }

    pub fn gamma(&self) -> f64 {
        10f64.powf(self.log_gamma)
    }

    fn validate(&self) -> Result<(), MlError> {
        if !self.c.is_finite() || self.c < 0.0 {
            return Err(MlError::invalid_input(format!(
                "C must be a non-negative finite number, got {}",
                self.c
            )));
        }
        if !self.log_gamma.is_finite() {
            return Err(MlError::invalid_input(format!(
                "log_gamma must be finite, got {}",
                self.log_gamma
            )));
        }
        Ok(())
    }
}

/// Support vector classifier.
#[derive(Debug, Clone, Default)]
pub struct Svm {
    /// Upper bound on SMO iterations; defaults to `max(10_000_000, 100·n)`.
    pub max_iter: Option<usize>,
}

impl Svm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&self, data: &SampleSet, params: SvmParams) -> Result<SvmModel, MlError> {
        params.validate()?;
        let n = data.len();
        if n == 0 {
            return Err(MlError::training("cannot fit on an empty training set"));
        }
        if data.n_positive() == 0 || data.n_negative() == 0 {
            return Err(MlError::training(
                "training labels contain a single class",
            ));
        }

        let gamma = params.gamma();
        let x = data.features();
        let y: Vec<f64> = data.labels().iter().map(|&l| if l { 1.0 } else { -1.0 }).collect();
        let mut q = vec![0.0f64; n * n];
        for i in 0..n {
            for j in i..n {
                let v = y[i] * y[j] * rbf(&x[i], &x[j], gamma);
                q[i * n + j] = v;
                q[j * n + i] = v;
            }
        }

        let c = params.c;
        let mut alpha = vec![0.0f64; n];
        let mut grad = vec![-1.0f64; n];
        let max_iter = self.max_iter.unwrap_or_else(|| (100 * n).max(10_000_000));

        let mut iterations = 0;
        while iterations < max_iter {
            let Some((i, j)) = select_working_set(&y, &alpha, &grad, c) else {
                break;
            };
            iterations += 1;

            let (old_i, old_j) = (alpha[i], alpha[j]);
            update_pair(&mut alpha, &grad, &q, n, &y, c, i, j);

            let (d_i, d_j) = (alpha[i] - old_i, alpha[j] - old_j);
            for (t, g) in grad.iter_mut().enumerate() {
                *g += q[t * n + i] * d_i + q[t * n + j] * d_j;
            }
        }
        if iterations == max_iter {
            tracing::warn!(iterations, "SMO reached the iteration limit before converging");
        }

        let rho = compute_rho(&y, &alpha, &grad, c);
        let support: Vec<usize> = (0..n).filter(|&i| alpha[i] > 0.0).collect();
        tracing::trace!(
            n,
            iterations,
            n_support = support.len(),
            c,
            log_gamma = params.log_gamma,
            "Fitted SVM"
        );

        Ok(SvmModel {
            params,
            support_vectors: support.iter().map(|&i| x[i].clone()).collect(),
            dual_coef: support.iter().map(|&i| alpha[i] * y[i]).collect(),
            rho,
        })
    }
}

/// Maximal violating pair: `i` from I_up maximising `-y·G`, `j` from I_low
/// minimising it. `None` once the KKT gap is below tolerance.
fn select_working_set(y: &[f64], alpha: &[f64], grad: &[f64], c: f64) -> Option<(usize, usize)> {
    let mut g_max = f64::NEG_INFINITY;
    let mut g_min = f64::INFINITY;
    let mut i_up = None;
    let mut j_low = None;
    for t in 0..y.len() {
        let score = -y[t] * grad[t];
        let in_up = (y[t] > 0.0 && alpha[t] < c) || (y[t] < 0.0 && alpha[t] > 0.0);
        let in_low = (y[t] > 0.0 && alpha[t] > 0.0) || (y[t] < 0.0 && alpha[t] < c);
        if in_up && score > g_max {
            g_max = score;
            i_up = Some(t);
        }
        if in_low && score < g_min {
            g_min = score;
            j_low = Some(t);
        }
    }
    match (i_up, j_low) {
        (Some(i), Some(j)) if i != j && g_max - g_min > TOLERANCE => Some((i, j)),
        _ => None,
    }
}

/// Analytic two-variable update, clipped to the box.
#[allow(clippy::too_many_arguments)]
fn update_pair(
    alpha: &mut [f64],
    grad: &[f64],
    q: &[f64],
    n: usize,
    y: &[f64],
    c: f64,
    i: usize,
    j: usize,
) {
    let q_ii = q[i * n + i];
    let q_jj = q[j * n + j];
    let q_ij = q[i * n + j];

    if y[i] != y[j] {
        let quad = positive(q_ii + q_jj + 2.0 * q_ij);
        let delta = (-grad[i] - grad[j]) / quad;
        let diff = alpha[i] - alpha[j];
        alpha[i] += delta;
        alpha[j] += delta;
        if diff > 0.0 {
            if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = diff;
            }
        } else if alpha[i] < 0.0 {
            alpha[i] = 0.0;
            alpha[j] = -diff;
        }
        if diff > 0.0 {
            if alpha[i] > c {
                alpha[i] = c;
                alpha[j] = c - diff;
            }
        } else if alpha[j] > c {
            alpha[j] = c;
            alpha[i] = c + diff;
        }
    } else {
        let quad = positive(q_ii + q_jj - 2.0 * q_ij);
        let delta = (grad[i] - grad[j]) / quad;
        let sum = alpha[i] + alpha[j];
        alpha[i] -= delta;
        alpha[j] += delta;
        if sum > c {
            if alpha[i] > c {
                alpha[i] = c;
                alpha[j] = sum - c;
            }
        } else if alpha[j] < 0.0 {
            alpha[j] = 0.0;
            alpha[i] = sum;
        }
        if sum > c {
            if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = sum - c;
            }
        } else if alpha[i] < 0.0 {
            alpha[i] = 0.0;
            alpha[j] = sum;
        }
    }
}

fn positive(quad: f64) -> f64 {
    if quad > 0.0 { quad } else { TAU }
}

/// Offset of the decision function: mean of `y·G` over free variables, or the
/// midpoint of the feasible interval when every variable sits at a bound.
fn compute_rho(y: &[f64], alpha: &[f64], grad: &[f64], c: f64) -> f64 {
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut free_sum = 0.0;
    let mut n_free = 0usize;
    for t in 0..y.len() {
        let yg = y[t] * grad[t];
        if alpha[t] >= c {
            if y[t] < 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else if alpha[t] <= 0.0 {
            if y[t] > 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else {
            n_free += 1;
            free_sum += yg;
        }
    }
    if n_free > 0 {
        free_sum / n_free as f64
    } else {
        (upper + lower) / 2.0
    }
}

fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let dist: f64 = a.iter().zip(b).map(|(u, v)| (u - v).powi(2)).sum();
    (-gamma * dist).exp()
}

/// A fitted classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmModel {
    pub params: SvmParams,
    support_vectors: Vec<Vec<f64>>,
    /// `alpha_i · y_i` for each support vector.
    dual_coef: Vec<f64>,
    rho: f64,
}

impl SvmModel {
    pub fn n_support(&self) -> usize {
        self.support_vectors.len()
    }

    /// Signed distance-like score per row; positive leans towards `true`.
    pub fn decision_function(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        let gamma = self.params.gamma();
        rows.iter()
            .map(|row| {
                self.support_vectors
                    .iter()
                    .zip(&self.dual_coef)
                    .map(|(sv, coef)| coef * rbf(sv, row, gamma))
                    .sum::<f64>()
                    - self.rho
            })
            .collect()
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<bool> {
        self.decision_function(rows)
            .into_iter()
            .map(|d| d > 0.0)
            .collect()
    }
}
