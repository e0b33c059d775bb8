//! Constant-velocity Kalman filter over box geometry.
//!
//! The state is `[cx, cy, aspect, h, vcx, vcy, vaspect, vh]`, measurements are
//! boxes in XYAH form. Matrices use ndarray; the 4x4 innovation inverse goes
//! through nalgebra to stay free of BLAS/LAPACK.

use ndarray::{Array1, Array2};

use crate::tracker::Rect;

const NDIM: usize = 4;

/// Mean and covariance of one track.
#[derive(Debug, Clone)]
pub struct KalmanState {
    pub mean: Array1<f64>,
    pub covariance: Array2<f64>,
}

impl KalmanState {
    /// Current box estimate.
    pub fn rect(&self) -> Rect {
        Rect::from_xyah(
            self.mean[0] as f32,
            self.mean[1] as f32,
            self.mean[2] as f32,
            self.mean[3] as f32,
        )
    }

    /// Estimated height change per frame.
    pub fn height_velocity(&self) -> f64 {
        self.mean[NDIM + 3]
    }
}

#[derive(Debug, Clone)]
pub struct BoxKalman {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for BoxKalman {
    fn default() -> Self {
        Self::new()
    }
}

fn measurement(rect: &Rect) -> [f64; NDIM] {
    rect.to_xyah().map(f64::from)
}

fn diagonal(std: &[f64]) -> Array2<f64> {
    Array2::from_diag(&Array1::from_iter(std.iter().map(|s| s * s)))
}

impl BoxKalman {
    pub fn new() -> Self {
        let mut motion_mat = Array2::eye(2 * NDIM);
        for i in 0..NDIM {
            motion_mat[[i, NDIM + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((NDIM, 2 * NDIM));
        for i in 0..NDIM {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    /// Start a track at `rect` with zero velocity.
    pub fn initiate(&self, rect: &Rect) -> KalmanState {
        let z = measurement(rect);
        let mut mean = Array1::zeros(2 * NDIM);
        for (i, value) in z.iter().enumerate() {
            mean[i] = *value;
        }

        let h = z[3];
        let pos = 2.0 * self.std_weight_position * h;
        let vel = 10.0 * self.std_weight_velocity * h;
        let covariance = diagonal(&[pos, pos, 1e-2, pos, vel, vel, 1e-5, vel]);

        KalmanState { mean, covariance }
    }

    /// Advance the state by one frame.
    pub fn predict(&self, state: &mut KalmanState) {
        let h = state.mean[3];
        let pos = self.std_weight_position * h;
        let vel = self.std_weight_velocity * h;
        let motion_cov = diagonal(&[pos, pos, 1e-2, pos, vel, vel, 1e-5, vel]);

        state.mean = self.motion_mat.dot(&state.mean);
        state.covariance =
            self.motion_mat.dot(&state.covariance).dot(&self.motion_mat.t()) + motion_cov;
    }

    /// Fold a new observation of the box into the state.
    ///
    /// Returns `false` and leaves the state untouched if the innovation
    /// covariance is singular.
    pub fn update(&self, state: &mut KalmanState, rect: &Rect) -> bool {
        let h = state.mean[3];
        let pos = self.std_weight_position * h;
        let innovation_cov = diagonal(&[pos, pos, 1e-1, pos]);

        let projected_mean = self.update_mat.dot(&state.mean);
        let projected_cov = self
            .update_mat
            .dot(&state.covariance)
            .dot(&self.update_mat.t())
            + innovation_cov;

        let Some(s_inv) = invert_4x4(&projected_cov) else {
            return false;
        };

        let innovation = Array1::from_vec(measurement(rect).to_vec()) - projected_mean;
        // K = P * H^T * S^-1
        let kalman_gain = state.covariance.dot(&self.update_mat.t()).dot(&s_inv);

        state.mean = &state.mean + &kalman_gain.dot(&innovation);
        state.covariance =
            &state.covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());
        true
    }
}

fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let nm = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]);
    let inv = nm.try_inverse()?;
    Some(Array2::from_shape_fn((NDIM, NDIM), |(i, j)| inv[(i, j)]))
}
