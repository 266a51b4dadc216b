//! Generic discrete-time extended Kalman filter.
//!
//! The filter is parameterized once at construction with the process and
//! observation models, their Jacobians and the two noise providers, then
//! driven through `predict`/`update`. The hooks are plain boxed closures:
//! the providers may capture shared state (the motion model captures the
//! tick interval this way), so nothing here needs to know what system is
//! being estimated.
//!
//! # Algorithm
//!
//! Prediction:
//!
//! ```text
//! x⁻ = f(x)          P⁻ = F·P·Fᵀ + Q        F = ∂f/∂x |ₓ
//! ```
//!
//! Correction:
//!
//! ```text
//! K  = P⁻·Hᵀ·(H·P⁻·Hᵀ + R(z))⁻¹            H = ∂h/∂x |ₓ₋
//! x  = x⁻ + K·(z − h(x⁻))                   P = (I − K·H)·P⁻
//! ```
//!
//! Between `predict` and `update` the a-priori state stays readable so the
//! caller can associate candidate measurements against it before
//! committing to a correction.

use nalgebra::{SMatrix, SVector};
use thiserror::Error;

/// State vector of dimension `S`.
pub type StateVec<const S: usize> = SVector<f64, S>;
/// Square state-space matrix.
pub type StateMat<const S: usize> = SMatrix<f64, S, S>;
/// Measurement vector of dimension `M`.
pub type MeasVec<const M: usize> = SVector<f64, M>;
/// Square measurement-space matrix.
pub type MeasMat<const M: usize> = SMatrix<f64, M, M>;

/// Nonlinear process transition x → x'.
pub type ProcessFn<const S: usize> = Box<dyn Fn(&StateVec<S>) -> StateVec<S>>;
/// Jacobian of the process transition, evaluated at x.
pub type ProcessJacobianFn<const S: usize> = Box<dyn Fn(&StateVec<S>) -> StateMat<S>>;
/// Nonlinear observation model x → z.
pub type ObservationFn<const S: usize, const M: usize> = Box<dyn Fn(&StateVec<S>) -> MeasVec<M>>;
/// Jacobian of the observation model, evaluated at x.
pub type ObservationJacobianFn<const S: usize, const M: usize> =
    Box<dyn Fn(&StateVec<S>) -> SMatrix<f64, M, S>>;
/// Process noise provider (captures whatever it depends on, e.g. dt).
pub type ProcessNoiseFn<const S: usize> = Box<dyn Fn() -> StateMat<S>>;
/// Measurement noise provider, evaluated on the incoming measurement.
pub type MeasurementNoiseFn<const M: usize> = Box<dyn Fn(&MeasVec<M>) -> MeasMat<M>>;

/// Numerical failure inside an `update`.
///
/// The caller treats either variant as "measurement rejected": the filter
/// stays at the predicted state and the tick counts as a miss.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterError {
    #[error("innovation covariance is singular")]
    SingularInnovation,
    #[error("non-finite value in posterior state")]
    NonFiniteState,
}

/// Discrete-time extended Kalman filter over `S` states and `M`
/// measurement components.
pub struct ExtendedKalmanFilter<const S: usize, const M: usize> {
    f: ProcessFn<S>,
    h: ObservationFn<S, M>,
    jacobian_f: ProcessJacobianFn<S>,
    jacobian_h: ObservationJacobianFn<S, M>,
    update_q: ProcessNoiseFn<S>,
    update_r: MeasurementNoiseFn<M>,
    /// Covariance the filter is re-seeded with on `set_state`
    p0: StateMat<S>,
    /// A-priori estimate from the last `predict`
    x_pri: StateVec<S>,
    /// A-posteriori estimate
    x_post: StateVec<S>,
    p_pri: StateMat<S>,
    p_post: StateMat<S>,
}

impl<const S: usize, const M: usize> ExtendedKalmanFilter<S, M> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        f: ProcessFn<S>,
        h: ObservationFn<S, M>,
        jacobian_f: ProcessJacobianFn<S>,
        jacobian_h: ObservationJacobianFn<S, M>,
        update_q: ProcessNoiseFn<S>,
        update_r: MeasurementNoiseFn<M>,
        p0: StateMat<S>,
    ) -> Self {
        Self {
            f,
            h,
            jacobian_f,
            jacobian_h,
            update_q,
            update_r,
            p0,
            x_pri: StateVec::zeros(),
            x_post: StateVec::zeros(),
            p_pri: p0,
            p_post: p0,
        }
    }

    /// Re-seed the filter at `x0` with the initial covariance.
    ///
    /// Both the prior and posterior pairs are assigned, so an `update`
    /// directly after a re-seed corrects the fresh state.
    pub fn set_state(&mut self, x0: &StateVec<S>) {
        self.x_pri = *x0;
        self.x_post = *x0;
        self.p_pri = self.p0;
        self.p_post = self.p0;
    }

    /// A-posteriori state estimate.
    #[inline]
    pub fn state(&self) -> &StateVec<S> {
        &self.x_post
    }

    /// A-priori state from the last `predict`.
    #[inline]
    pub fn predicted_state(&self) -> &StateVec<S> {
        &self.x_pri
    }

    /// A-posteriori error covariance.
    #[inline]
    pub fn covariance(&self) -> &StateMat<S> {
        &self.p_post
    }

    /// Prediction step.
    ///
    /// The posterior is advanced to the prediction as well, so ticks with
    /// no accepted measurement propagate the state unchanged by any
    /// correction.
    pub fn predict(&mut self) -> StateVec<S> {
        self.x_pri = (self.f)(&self.x_post);
        let f_mat = (self.jacobian_f)(&self.x_post);
        self.p_pri = f_mat * self.p_post * f_mat.transpose() + (self.update_q)();

        self.x_post = self.x_pri;
        self.p_post = self.p_pri;
        self.x_pri
    }

    /// Correction step with measurement `z`.
    ///
    /// On failure the filter remains at the predicted state (the caller
    /// treats the measurement as rejected).
    pub fn update(&mut self, z: &MeasVec<M>) -> Result<StateVec<S>, FilterError> {
        let h_mat = (self.jacobian_h)(&self.x_pri);
        let r_mat = (self.update_r)(z);

        let innovation_cov = h_mat * self.p_pri * h_mat.transpose() + r_mat;
        let innovation_cov_inv = innovation_cov
            .try_inverse()
            .ok_or(FilterError::SingularInnovation)?;

        let gain = self.p_pri * h_mat.transpose() * innovation_cov_inv;
        let x_post = self.x_pri + gain * (z - (self.h)(&self.x_pri));

        if x_post.iter().any(|v| !v.is_finite()) {
            return Err(FilterError::NonFiniteState);
        }

        self.x_post = x_post;
        self.p_post = (StateMat::<S>::identity() - gain * h_mat) * self.p_pri;
        Ok(self.x_post)
    }
}

impl<const S: usize, const M: usize> std::fmt::Debug for ExtendedKalmanFilter<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedKalmanFilter")
            .field("x_pri", &self.x_pri)
            .field("x_post", &self.x_post)
            .finish_non_exhaustive()
    }
}
