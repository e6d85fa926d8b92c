//! Trainable function approximators.
//!
//! The trainer only needs three things from a model: a forward pass,
//! a gradient step given d(loss)/d(output), and the gradient of a
//! weighted output with respect to the input (to push the critic's
//! action gradient back into the actor). Linear models are enough for
//! the observation sizes this simulator produces.

use rand::Rng;

pub trait FunctionApproximator: Send {
    fn input_dim(&self) -> usize;

    fn output_dim(&self) -> usize;

    fn predict(&self, input: &[f64]) -> Vec<f64>;

    /// One averaged gradient-descent step.
    ///
    /// `output_grads[i]` is d(loss)/d(output) for `inputs[i]`.
    fn update(&mut self, inputs: &[Vec<f64>], output_grads: &[Vec<f64>], learning_rate: f64);

    /// d(output · `output_weights`)/d(input).
    fn input_gradient(&self, input: &[f64], output_weights: &[f64]) -> Vec<f64>;
}

// ── Linear model ───────────────────────────────────────────────────

/// `y = W·x + b`, with `W` stored row-major (`output_dim × input_dim`).
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    input_dim: usize,
    output_dim: usize,
    weights: Vec<f64>,
    bias: Vec<f64>,
}

impl LinearModel {
    pub fn zeros(input_dim: usize, output_dim: usize) -> Self {
        Self {
            input_dim,
            output_dim,
            weights: vec![0.0; input_dim * output_dim],
            bias: vec![0.0; output_dim],
        }
    }

    /// Uniform weights in `[-scale, scale]`, zero bias.
    pub fn random<R: Rng + ?Sized>(input_dim: usize, output_dim: usize, scale: f64, rng: &mut R) -> Self {
        let mut model = Self::zeros(input_dim, output_dim);
        for w in &mut model.weights {
            *w = rng.random_range(-scale..=scale);
        }
        model
    }

    pub fn with_bias(mut self, bias: Vec<f64>) -> Self {
        debug_assert_eq!(bias.len(), self.output_dim);
        self.bias = bias;
        self
    }

    pub fn weight(&self, output: usize, input: usize) -> f64 {
        self.weights[output * self.input_dim + input]
    }

    pub fn bias(&self) -> &[f64] {
        &self.bias
    }

    fn row(&self, output: usize) -> &[f64] {
        let start = output * self.input_dim;
        &self.weights[start..start + self.input_dim]
    }
}

impl FunctionApproximator for LinearModel {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn predict(&self, input: &[f64]) -> Vec<f64> {
        (0..self.output_dim)
            .map(|o| dot(self.row(o), input) + self.bias[o])
            .collect()
    }

    fn update(&mut self, inputs: &[Vec<f64>], output_grads: &[Vec<f64>], learning_rate: f64) {
        let n = inputs.len().min(output_grads.len());
        if n == 0 {
            return;
        }
        let step = learning_rate / n as f64;
        for (x, g) in inputs.iter().zip(output_grads) {
            for (o, grad) in g.iter().enumerate().take(self.output_dim) {
                if *grad == 0.0 {
                    continue;
                }
                let start = o * self.input_dim;
                for (w, xi) in self.weights[start..start + self.input_dim].iter_mut().zip(x) {
                    *w -= step * grad * xi;
                }
                self.bias[o] -= step * grad;
            }
        }
    }

    fn input_gradient(&self, _input: &[f64], output_weights: &[f64]) -> Vec<f64> {
        let mut grad = vec![0.0; self.input_dim];
        for (o, v) in output_weights.iter().enumerate().take(self.output_dim) {
            for (g, w) in grad.iter_mut().zip(self.row(o)) {
                *g += v * w;
            }
        }
        grad
    }
}

// ── Softmax actor ──────────────────────────────────────────────────

/// Linear logits followed by a softmax: a distribution over actions.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftmaxActor {
    logits: LinearModel,
}

impl SoftmaxActor {
    pub fn new(logits: LinearModel) -> Self {
        Self { logits }
    }

    /// Zero weights and a slightly decreasing bias, so the untrained
    /// actor always prefers action 0, then 1, and so on.
    pub fn prior(state_dim: usize, action_dim: usize) -> Self {
        let bias = (0..action_dim).map(|a| -(a as f64) * 1e-3).collect();
        Self::new(LinearModel::zeros(state_dim, action_dim).with_bias(bias))
    }

    pub fn random<R: Rng + ?Sized>(state_dim: usize, action_dim: usize, rng: &mut R) -> Self {
        Self::new(LinearModel::random(state_dim, action_dim, 0.01, rng))
    }

    pub fn logits(&self) -> &LinearModel {
        &self.logits
    }

    /// Back-propagate d/d(probabilities) through the softmax.
    fn logit_grad(probs: &[f64], grad: &[f64]) -> Vec<f64> {
        let inner = dot(probs, grad);
        probs.iter().zip(grad).map(|(p, g)| p * (g - inner)).collect()
    }
}

impl FunctionApproximator for SoftmaxActor {
    fn input_dim(&self) -> usize {
        self.logits.input_dim()
    }

    fn output_dim(&self) -> usize {
        self.logits.output_dim()
    }

    fn predict(&self, input: &[f64]) -> Vec<f64> {
        softmax(&self.logits.predict(input))
    }

    fn update(&mut self, inputs: &[Vec<f64>], output_grads: &[Vec<f64>], learning_rate: f64) {
        let logit_grads: Vec<Vec<f64>> = inputs
            .iter()
            .zip(output_grads)
            .map(|(x, g)| Self::logit_grad(&self.predict(x), g))
            .collect();
        self.logits.update(inputs, &logit_grads, learning_rate);
    }

    fn input_gradient(&self, input: &[f64], output_weights: &[f64]) -> Vec<f64> {
        let through = Self::logit_grad(&self.predict(input), output_weights);
        self.logits.input_gradient(input, &through)
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    if total > 0.0 && total.is_finite() {
        exps.into_iter().map(|e| e / total).collect()
    } else {
        vec![1.0 / logits.len().max(1) as f64; logits.len()]
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if *v <= b => best,
            _ if v.is_nan() => best,
            _ => Some((i, *v)),
        })
        .map(|(i, _)| i)
}
