//! State estimation: generic EKF plus the whole-robot motion model.

mod ekf;
mod motion_model;

pub use ekf::{
    ExtendedKalmanFilter, FilterError, MeasMat, MeasVec, MeasurementNoiseFn, ObservationFn,
    ObservationJacobianFn, ProcessFn, ProcessJacobianFn, ProcessNoiseFn, StateMat, StateVec,
};
pub use motion_model::{
    build_robot_ekf, state, DtHandle, EkfConfig, PlateMeasurement, RobotEkf, RobotState,
};
