//! Action-value approximator: a small fully-connected network with ReLU
//! hidden layers and a linear output head, trained by plain batched
//! gradient descent on mean-squared error. Parameters serialize as part
//! of a policy checkpoint.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseLayer {
    /// Row-major: `weights[out][in]`.
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

impl DenseLayer {
    fn new(fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Self {
        // He initialization for the ReLU stack.
        let std_dev = (2.0 / fan_in as f64).sqrt();
        let dist = Normal::new(0.0, std_dev).expect("valid normal distribution");

        let weights = (0..fan_out)
            .map(|_| (0..fan_in).map(|_| dist.sample(rng)).collect())
            .collect();

        Self {
            weights,
            biases: vec![0.0; fan_out],
        }
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(self.biases.iter())
            .map(|(row, bias)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + bias)
            .collect()
    }
}

/// Q-value network over a fixed-size state vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QNetwork {
    layers: Vec<DenseLayer>,
}

impl QNetwork {
    /// `sizes` lists layer widths input-first, e.g. `[7, 128, 128, 2]`.
    pub fn new(sizes: &[usize], rng: &mut StdRng) -> Self {
        assert!(sizes.len() >= 2, "network needs input and output layers");
        let layers = sizes
            .windows(2)
            .map(|pair| DenseLayer::new(pair[0], pair[1], rng))
            .collect();
        Self { layers }
    }

    pub fn output_dim(&self) -> usize {
        self.layers
            .last()
            .map(|l| l.biases.len())
            .unwrap_or(0)
    }

    /// Predicted action values for one state.
    pub fn predict(&self, input: &[f64]) -> Vec<f64> {
        let mut activation = input.to_vec();
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            activation = layer.forward(&activation);
            if i != last {
                for v in &mut activation {
                    *v = v.max(0.0);
                }
            }
        }
        activation
    }

    /// Index of the highest-valued action; first maximum wins on ties.
    pub fn argmax(&self, input: &[f64]) -> usize {
        let values = self.predict(input);
        let mut best = 0;
        for (i, v) in values.iter().enumerate() {
            if *v > values[best] {
                best = i;
            }
        }
        best
    }

    /// Largest predicted action value for one state.
    pub fn max_value(&self, input: &[f64]) -> f64 {
        self.predict(input)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// One gradient-descent step over the batch toward `targets`,
    /// minimizing MSE. Returns the pre-step mean loss.
    pub fn fit_batch(&mut self, inputs: &[Vec<f64>], targets: &[Vec<f64>], learning_rate: f64) -> f64 {
        assert_eq!(inputs.len(), targets.len(), "batch size mismatch");
        if inputs.is_empty() {
            return 0.0;
        }

        let batch_n = inputs.len() as f64;
        let last = self.layers.len() - 1;

        // Accumulated gradients, same shape as the parameters.
        let mut weight_grads: Vec<Vec<Vec<f64>>> = self
            .layers
            .iter()
            .map(|l| l.weights.iter().map(|row| vec![0.0; row.len()]).collect())
            .collect();
        let mut bias_grads: Vec<Vec<f64>> = self
            .layers
            .iter()
            .map(|l| vec![0.0; l.biases.len()])
            .collect();

        let mut total_loss = 0.0;

        for (input, target) in inputs.iter().zip(targets) {
            // Forward pass, caching post-activation outputs per layer.
            let mut activations: Vec<Vec<f64>> = vec![input.clone()];
            for (i, layer) in self.layers.iter().enumerate() {
                let mut out = layer.forward(activations.last().expect("activation"));
                if i != last {
                    for v in &mut out {
                        *v = v.max(0.0);
                    }
                }
                activations.push(out);
            }

            let prediction = activations.last().expect("output activation");
            total_loss += prediction
                .iter()
                .zip(target)
                .map(|(p, t)| (p - t).powi(2))
                .sum::<f64>()
                / prediction.len() as f64;

            // Backward pass: delta is dL/dz for the current layer.
            let mut delta: Vec<f64> = prediction
                .iter()
                .zip(target)
                .map(|(p, t)| 2.0 * (p - t) / batch_n)
                .collect();

            for i in (0..self.layers.len()).rev() {
                let layer_input = &activations[i];

                for (j, d) in delta.iter().enumerate() {
                    for (k, x) in layer_input.iter().enumerate() {
                        weight_grads[i][j][k] += d * x;
                    }
                    bias_grads[i][j] += d;
                }

                if i > 0 {
                    // Propagate through the weights, then through the
                    // previous layer's ReLU.
                    let mut prev_delta = vec![0.0; layer_input.len()];
                    for (j, d) in delta.iter().enumerate() {
                        for (k, w) in self.layers[i].weights[j].iter().enumerate() {
                            prev_delta[k] += d * w;
                        }
                    }
                    for (k, pd) in prev_delta.iter_mut().enumerate() {
                        if activations[i][k] <= 0.0 {
                            *pd = 0.0;
                        }
                    }
                    delta = prev_delta;
                }
            }
        }

        for (i, layer) in self.layers.iter_mut().enumerate() {
            for (j, row) in layer.weights.iter_mut().enumerate() {
                for (k, w) in row.iter_mut().enumerate() {
                    *w -= learning_rate * weight_grads[i][j][k];
                }
            }
            for (j, b) in layer.biases.iter_mut().enumerate() {
                *b -= learning_rate * bias_grads[i][j];
            }
        }

        total_loss / batch_n
    }

    /// Copy another network's parameters into this one.
    pub fn copy_weights_from(&mut self, other: &QNetwork) {
        self.layers = other.layers.clone();
    }
}
