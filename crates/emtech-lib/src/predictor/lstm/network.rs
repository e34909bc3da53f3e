//! Single-layer LSTM with a linear read-out, trained by full BPTT
//!
//! Parameters live in one flat vector so gradients can be summed and fed to
//! Adam without per-tensor bookkeeping. Gate order is input, forget, cell,
//! output. Layout:
//!
//! ```text
//! W [4H × (1 + H)]   gate weights over [x, h_prev]
//! b [4H]             gate biases
//! V [K × H]          read-out weights
//! c [K]              read-out biases
//! ```

use rand::rngs::StdRng;
use rand::Rng;

const FORGET_BIAS: f64 = 1.0;
const CLIP_NORM: f64 = 5.0;

/// Recurrent state carried between steps
#[derive(Debug, Clone, PartialEq)]
pub struct LstmState {
    pub hidden: Vec<f64>,
    pub cell: Vec<f64>,
}

impl LstmState {
    pub fn zeros(hidden: usize) -> Self {
        Self {
            hidden: vec![0.0; hidden],
            cell: vec![0.0; hidden],
        }
    }
}

/// Activations of one time step, kept for the backward pass
struct StepCache {
    input: Vec<f64>,
    prev: LstmState,
    i: Vec<f64>,
    f: Vec<f64>,
    g: Vec<f64>,
    o: Vec<f64>,
    cell: Vec<f64>,
}

/// Gradient of one window
#[derive(Debug, Clone)]
pub struct WindowGradient {
    pub grad: Vec<f64>,
    pub loss: f64,
    pub final_state: LstmState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LstmNetwork {
    hidden: usize,
    outputs: usize,
    params: Vec<f64>,
}

impl LstmNetwork {
    pub fn new(hidden: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (hidden as f64).sqrt();
        let len = param_count(hidden, outputs);
        let params: Vec<f64> = (0..len).map(|_| rng.random_range(-bound..bound)).collect();

        let mut net = Self {
            hidden,
            outputs,
            params,
        };
        let forget = net.bias_offset() + hidden;
        net.params[forget..forget + hidden].fill(FORGET_BIAS);
        net
    }

    pub fn hidden(&self) -> usize {
        self.hidden
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn param_len(&self) -> usize {
        self.params.len()
    }

    pub fn params_mut(&mut self) -> &mut [f64] {
        &mut self.params
    }

    fn cols(&self) -> usize {
        1 + self.hidden
    }

    fn bias_offset(&self) -> usize {
        4 * self.hidden * self.cols()
    }

    fn readout_offset(&self) -> usize {
        self.bias_offset() + 4 * self.hidden
    }

    fn readout_bias_offset(&self) -> usize {
        self.readout_offset() + self.outputs * self.hidden
    }

    fn step(&self, x: f64, prev: &LstmState) -> StepCache {
        let h = self.hidden;
        let cols = self.cols();
        let b = self.bias_offset();
        let mut z = vec![0.0; 4 * h];
        for (r, zr) in z.iter_mut().enumerate() {
            let row = &self.params[r * cols..(r + 1) * cols];
            let recurrent: f64 = row[1..].iter().zip(&prev.hidden).map(|(w, hp)| w * hp).sum();
            *zr = row[0] * x + recurrent + self.params[b + r];
        }

        let i: Vec<f64> = z[..h].iter().map(|&v| sigmoid(v)).collect();
        let f: Vec<f64> = z[h..2 * h].iter().map(|&v| sigmoid(v)).collect();
        let g: Vec<f64> = z[2 * h..3 * h].iter().map(|&v| v.tanh()).collect();
        let o: Vec<f64> = z[3 * h..].iter().map(|&v| sigmoid(v)).collect();
        let cell: Vec<f64> = (0..h).map(|j| f[j] * prev.cell[j] + i[j] * g[j]).collect();

        StepCache {
            input: vec![x],
            prev: prev.clone(),
            i,
            f,
            g,
            o,
            cell,
        }
    }

    fn next_state(cache: &StepCache) -> LstmState {
        let hidden = cache
            .o
            .iter()
            .zip(&cache.cell)
            .map(|(o, c)| o * c.tanh())
            .collect();
        LstmState {
            hidden,
            cell: cache.cell.clone(),
        }
    }

    fn readout(&self, hidden: &[f64]) -> Vec<f64> {
        let v = self.readout_offset();
        let c = self.readout_bias_offset();
        (0..self.outputs)
            .map(|k| {
                let row = &self.params[v + k * self.hidden..v + (k + 1) * self.hidden];
                row.iter().zip(hidden).map(|(w, h)| w * h).sum::<f64>() + self.params[c + k]
            })
            .collect()
    }

    /// Run a window from `state`; returns the read-out and the final state
    pub fn forward(&self, window: &[f64], state: &LstmState) -> (Vec<f64>, LstmState) {
        let mut current = state.clone();
        for &x in window {
            let cache = self.step(x, &current);
            current = Self::next_state(&cache);
        }
        (self.readout(&current.hidden), current)
    }

    /// Mean squared error gradient over one window
    ///
    /// The incoming state is treated as a constant; gradients do not flow
    /// into earlier windows.
    pub fn gradient(&self, window: &[f64], target: &[f64], state: &LstmState) -> WindowGradient {
        let h = self.hidden;
        let cols = self.cols();
        let b = self.bias_offset();
        let v = self.readout_offset();
        let c = self.readout_bias_offset();

        let mut caches = Vec::with_capacity(window.len());
        let mut current = state.clone();
        for &x in window {
            let cache = self.step(x, &current);
            current = Self::next_state(&cache);
            caches.push(cache);
        }
        let output = self.readout(&current.hidden);

        let k = self.outputs as f64;
        let loss = output
            .iter()
            .zip(target)
            .map(|(y, t)| (y - t).powi(2))
            .sum::<f64>()
            / k;
        let dy: Vec<f64> = output
            .iter()
            .zip(target)
            .map(|(y, t)| 2.0 * (y - t) / k)
            .collect();

        let mut grad = vec![0.0; self.params.len()];
        let mut dh = vec![0.0; h];
        for (out, &d) in dy.iter().enumerate() {
            for j in 0..h {
                grad[v + out * h + j] += d * current.hidden[j];
                dh[j] += d * self.params[v + out * h + j];
            }
            grad[c + out] += d;
        }

        let mut dc_next = vec![0.0; h];
        for cache in caches.iter().rev() {
            let mut dz = vec![0.0; 4 * h];
            for j in 0..h {
                let tanh_c = cache.cell[j].tanh();
                let d_o = dh[j] * tanh_c;
                let dc = dc_next[j] + dh[j] * cache.o[j] * (1.0 - tanh_c * tanh_c);
                let d_i = dc * cache.g[j];
                let d_g = dc * cache.i[j];
                let d_f = dc * cache.prev.cell[j];
                dc_next[j] = dc * cache.f[j];

                dz[j] = d_i * cache.i[j] * (1.0 - cache.i[j]);
                dz[h + j] = d_f * cache.f[j] * (1.0 - cache.f[j]);
                dz[2 * h + j] = d_g * (1.0 - cache.g[j] * cache.g[j]);
                dz[3 * h + j] = d_o * cache.o[j] * (1.0 - cache.o[j]);
            }

            let mut dh_prev = vec![0.0; h];
            for (r, &dzr) in dz.iter().enumerate() {
                if dzr == 0.0 {
                    continue;
                }
                let row = r * cols;
                grad[row] += dzr * cache.input[0];
                for j in 0..h {
                    grad[row + 1 + j] += dzr * cache.prev.hidden[j];
                    dh_prev[j] += dzr * self.params[row + 1 + j];
                }
                grad[b + r] += dzr;
            }
            dh = dh_prev;
        }

        WindowGradient {
            grad,
            loss,
            final_state: current,
        }
    }
}

/// Scale `grad` down to `CLIP_NORM` when its norm exceeds it
pub fn clip_gradient(grad: &mut [f64]) {
    let norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
    if norm > CLIP_NORM {
        let scale = CLIP_NORM / norm;
        grad.iter_mut().for_each(|g| *g *= scale);
    }
}

fn param_count(hidden: usize, outputs: usize) -> usize {
    4 * hidden * (1 + hidden) + 4 * hidden + outputs * hidden + outputs
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Adam optimiser state for one parameter vector
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

impl Adam {
    const BETA1: f64 = 0.9;
    const BETA2: f64 = 0.999;
    const EPSILON: f64 = 1e-8;

    pub fn new(len: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            m: vec![0.0; len],
            v: vec![0.0; len],
            t: 0,
        }
    }

    pub fn step(&mut self, params: &mut [f64], grad: &[f64]) {
        self.t += 1;
        let bias1 = 1.0 - Self::BETA1.powi(self.t);
        let bias2 = 1.0 - Self::BETA2.powi(self.t);
        for (idx, p) in params.iter_mut().enumerate() {
            let g = grad[idx];
            self.m[idx] = Self::BETA1 * self.m[idx] + (1.0 - Self::BETA1) * g;
            self.v[idx] = Self::BETA2 * self.v[idx] + (1.0 - Self::BETA2) * g * g;
            let m_hat = self.m[idx] / bias1;
            let v_hat = self.v[idx] / bias2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + Self::EPSILON);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn network(outputs: usize) -> LstmNetwork {
        let mut rng = StdRng::seed_from_u64(7);
        LstmNetwork::new(3, outputs, &mut rng)
    }

    #[test]
    fn test_parameter_layout() {
        let net = network(2);
        assert_eq!(net.param_len(), 4 * 3 * 4 + 12 + 6 + 2);
        assert_eq!(net.outputs(), 2);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let net = network(2);
        let window = [0.1, 0.5, 0.3, 0.9];
        let target = [0.4, 0.7];
        let state = LstmState::zeros(3);
        let analytic = net.gradient(&window, &target, &state).grad;

        let eps = 1e-6;
        for idx in (0..net.param_len()).step_by(7) {
            let mut plus = net.clone();
            plus.params_mut()[idx] += eps;
            let mut minus = net.clone();
            minus.params_mut()[idx] -= eps;
            let lp = plus.gradient(&window, &target, &state).loss;
            let lm = minus.gradient(&window, &target, &state).loss;
            let numeric = (lp - lm) / (2.0 * eps);
            assert!(
                (numeric - analytic[idx]).abs() < 1e-5,
                "param {}: numeric {} analytic {}",
                idx,
                numeric,
                analytic[idx]
            );
        }
    }

    #[test]
    fn test_forward_matches_gradient_state() {
        let net = network(1);
        let window = [0.2, 0.4];
        let state = LstmState::zeros(3);
        let (_, forward_state) = net.forward(&window, &state);
        let grad_state = net.gradient(&window, &[0.0], &state).final_state;
        assert_eq!(forward_state, grad_state);
    }

    #[test]
    fn test_clip_gradient() {
        let mut grad = vec![30.0, 40.0];
        clip_gradient(&mut grad);
        let norm = (grad[0] * grad[0] + grad[1] * grad[1]).sqrt();
        assert!((norm - CLIP_NORM).abs() < 1e-12);
    }

    #[test]
    fn test_adam_reduces_loss() {
        let mut net = network(1);
        let window = [0.1, 0.2, 0.3, 0.4];
        let target = [0.5];
        let state = LstmState::zeros(3);
        let before = net.gradient(&window, &target, &state).loss;
        let mut adam = Adam::new(net.param_len(), 0.01);
        for _ in 0..50 {
            let g = net.gradient(&window, &target, &state).grad;
            adam.step(net.params_mut(), &g);
        }
        let after = net.gradient(&window, &target, &state).loss;
        assert!(after < before);
    }
}
