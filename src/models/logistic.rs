//! L2-regularized logistic regression trained by damped Newton iterations

use crate::config::ModelConfig;
use crate::error::{PipelineError, Result};
use crate::types::{Labels, FRAUD};
use nalgebra::{DMatrix, DVector};
use ndarray::{concatenate, Array1, Array2, Axis};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Armijo sufficient-decrease constant for the line search
const ARMIJO: f64 = 1e-4;
/// Smallest step tried before the line search gives up
const MIN_STEP: f64 = 1e-10;

/// Logistic regression trainer.
///
/// Minimizes `0.5 * |beta|^2 + C * sum(log(1 + exp(-y_i * beta.x_i)))` with
/// labels mapped to {-1, +1}. When `fit_intercept` is set the bias is learned
/// as an extra constant-one feature and is regularized like the weights.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    c: f64,
    max_iter: usize,
    tolerance: f64,
    fit_intercept: bool,
}

impl LogisticRegression {
    pub fn new(c: f64) -> Self {
        Self {
            c,
            max_iter: crate::config::DEFAULT_MAX_ITER,
            tolerance: crate::config::DEFAULT_TOLERANCE,
            fit_intercept: true,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            c: config.c,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
            fit_intercept: config.fit_intercept,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Fit on `features`/`labels`; both classes must be present.
    pub fn fit(&self, features: &Array2<f64>, labels: &Labels) -> Result<LogisticModel> {
        let n = features.nrows();
        if n == 0 || n != labels.len() {
            return Err(PipelineError::invalid(format!(
                "cannot fit on {n} feature rows with {} labels",
                labels.len()
            )));
        }
        let n_fraud = labels.iter().filter(|&&l| l == FRAUD).count();
        if n_fraud == 0 || n_fraud == n {
            return Err(PipelineError::invalid(
                "training data must contain both classes",
            ));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::invalid(
                "training features contain missing or non-finite values",
            ));
        }

        let x = if self.fit_intercept {
            concatenate(Axis(1), &[features.view(), Array2::ones((n, 1)).view()])
                .map_err(|e| PipelineError::invalid(format!("design matrix: {e}")))?
        } else {
            features.to_owned()
        };
        let y: Array1<f64> = labels
            .iter()
            .map(|&l| if l == FRAUD { 1.0 } else { -1.0 })
            .collect();

        let d = x.ncols();
        let mut beta = Array1::<f64>::zeros(d);
        let mut objective = self.objective(&x, &y, &beta);
        let mut gradient = self.gradient(&x, &y, &beta);
        let stop = self.tolerance * inf_norm(&gradient).max(1.0);

        let mut iterations = 0;
        let mut converged = inf_norm(&gradient) <= stop;
        while !converged && iterations < self.max_iter {
            iterations += 1;

            let direction = self.newton_direction(&x, &beta, &gradient)?;
            let slope = gradient.dot(&direction);

            let mut step = 1.0;
            let mut candidate = &beta + &(&direction * step);
            let mut candidate_objective = self.objective(&x, &y, &candidate);
            while candidate_objective > objective + ARMIJO * step * slope && step > MIN_STEP {
                step *= 0.5;
                candidate = &beta + &(&direction * step);
                candidate_objective = self.objective(&x, &y, &candidate);
            }

            beta = candidate;
            objective = candidate_objective;
            gradient = self.gradient(&x, &y, &beta);
            converged = inf_norm(&gradient) <= stop;

            debug!(
                iteration = iterations,
                objective = objective,
                gradient_norm = inf_norm(&gradient),
                step = step,
                "Newton iteration"
            );
        }

        if converged {
            info!(iterations = iterations, objective = objective, "Solver converged");
        } else {
            warn!(
                max_iter = self.max_iter,
                gradient_norm = inf_norm(&gradient),
                "Solver failed to converge, increase max_iter"
            );
        }

        let (weights, intercept) = if self.fit_intercept {
            (beta.slice(ndarray::s![..d - 1]).to_owned(), beta[d - 1])
        } else {
            (beta, 0.0)
        };

        Ok(LogisticModel {
            weights,
            intercept,
            iterations,
            converged,
        })
    }

    fn objective(&self, x: &Array2<f64>, y: &Array1<f64>, beta: &Array1<f64>) -> f64 {
        let margins = x.dot(beta) * y;
        let loss: f64 = margins.iter().map(|&m| softplus(-m)).sum();
        0.5 * beta.dot(beta) + self.c * loss
    }

    fn gradient(&self, x: &Array2<f64>, y: &Array1<f64>, beta: &Array1<f64>) -> Array1<f64> {
        let z = x.dot(beta);
        // d/dz log(1 + exp(-y z)) = -y * sigmoid(-y z)
        let residual: Array1<f64> = z
            .iter()
            .zip(y.iter())
            .map(|(&zi, &yi)| -yi * sigmoid(-yi * zi))
            .collect();
        beta + &(x.t().dot(&residual) * self.c)
    }

    /// Solve `H p = -g` with `H = I + C * X^T W X`
    fn newton_direction(
        &self,
        x: &Array2<f64>,
        beta: &Array1<f64>,
        gradient: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        let d = x.ncols();
        let weights = x.dot(beta).mapv(|z| {
            let p = sigmoid(z);
            (p * (1.0 - p)).sqrt()
        });
        let weighted = x * &weights.insert_axis(Axis(1));
        let mut hessian = weighted.t().dot(&weighted) * self.c;
        for i in 0..d {
            hessian[[i, i]] += 1.0;
        }

        let hessian = DMatrix::from_fn(d, d, |i, j| hessian[[i, j]]);
        let rhs = DVector::from_iterator(d, gradient.iter().map(|g| -g));
        let cholesky = hessian
            .cholesky()
            .ok_or_else(|| PipelineError::Solver("Hessian is not positive definite".into()))?;
        Ok(cholesky.solve(&rhs).iter().copied().collect())
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_REGULARIZATION_C)
    }
}

/// Fitted logistic regression model; immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogisticModel {
    pub weights: Array1<f64>,
    pub intercept: f64,
    /// Newton iterations performed
    pub iterations: usize,
    pub converged: bool,
}

impl LogisticModel {
    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    /// Linear score `w.x + b` per row
    pub fn decision_function(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        if features.ncols() != self.n_features() {
            return Err(PipelineError::invalid(format!(
                "model expects {} features, got {}",
                self.n_features(),
                features.ncols()
            )));
        }
        Ok(features.dot(&self.weights) + self.intercept)
    }

    /// Fraud probability per row
    pub fn predict_proba(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(features)?.mapv(sigmoid))
    }

    /// Class labels, fraud when the probability exceeds `threshold`
    pub fn predict(&self, features: &Array2<f64>, threshold: f64) -> Result<Labels> {
        Ok(self
            .predict_proba(features)?
            .mapv(|p| u8::from(p > threshold)))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + exp(z))` without overflow
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn inf_norm(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}
