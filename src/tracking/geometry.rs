//! Plate geometry of the tracked robot.
//!
//! Pure functions of the filter state: where the plates of the enemy
//! robot are expected to be, and which of them an observation most likely
//! came from. The tracker associates by taking the minimum over this
//! finite (N ≤ 4) candidate set.

use std::f64::consts::PI;

use crate::core::math::normalize_angle;
use crate::core::types::Point3;
use crate::estimation::{state, RobotState};

/// Number of plates carried by a robot with the given detector id.
///
/// Outposts carry three plates and balanced chassis two; anything the
/// table does not know is assumed to be a standard 4-plate robot.
pub fn armor_count(id: &str) -> u32 {
    match id {
        "outpost" => 3,
        "balance" => 2,
        _ => 4,
    }
}

/// One predicted plate on the tracked robot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateEstimate {
    /// Plate index; 0 is the currently observed plate
    pub index: usize,
    /// Predicted plate center in the world frame
    pub position: Point3,
    /// Plate facing yaw, continuous (same branch as the state yaw)
    pub yaw: f64,
}

/// Closest predicted plate to an observed position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateMatch {
    /// Index of the closest predicted plate
    pub index: usize,
    /// Euclidean distance from the observation to that plate
    pub distance: f64,
    /// Yaw of that plate, normalized to the principal branch
    pub yaw: f64,
}

/// Enumerate the predicted plates for a filter state.
///
/// Plates sit every 2π/N of yaw around the center. Four-plate robots
/// alternate the tracked pair (r, za) with the alternate pair
/// (another_r, za + dz); 2- and 3-plate robots carry a single pair.
pub fn predicted_plates(
    x: &RobotState,
    armors_num: u32,
    another_r: f64,
    dz: f64,
) -> impl Iterator<Item = PlateEstimate> {
    let (xc, yc, za, yaw, r) = (
        x[state::XC],
        x[state::YC],
        x[state::ZA],
        x[state::YAW],
        x[state::R],
    );
    let n = armors_num.max(1) as usize;
    (0..n).map(move |i| {
        let plate_yaw = yaw + i as f64 * (2.0 * PI / n as f64);
        let alternate_pair = armors_num == 4 && i % 2 == 1;
        let (r_i, z_i) = if alternate_pair {
            (another_r, za + dz)
        } else {
            (r, za)
        };
        PlateEstimate {
            index: i,
            position: Point3::new(
                xc - r_i * plate_yaw.cos(),
                yc - r_i * plate_yaw.sin(),
                z_i,
            ),
            yaw: plate_yaw,
        }
    })
}

/// Find the predicted plate closest to an observed position.
pub fn best_match(
    observed: &Point3,
    x: &RobotState,
    armors_num: u32,
    another_r: f64,
    dz: f64,
) -> Option<PlateMatch> {
    predicted_plates(x, armors_num, another_r, dz)
        .map(|plate| PlateMatch {
            index: plate.index,
            distance: plate.position.distance(observed),
            yaw: normalize_angle(plate.yaw),
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn four_plate_state() -> RobotState {
        let mut x = RobotState::zeros();
        x[state::XC] = 2.0;
        x[state::YC] = 1.0;
        x[state::ZA] = 0.1;
        x[state::YAW] = 0.0;
        x[state::R] = 0.25;
        x
    }

    #[test]
    fn test_armor_count_table() {
        assert_eq!(armor_count("outpost"), 3);
        assert_eq!(armor_count("balance"), 2);
        assert_eq!(armor_count("3"), 4);
        assert_eq!(armor_count("guard"), 4);
        assert_eq!(armor_count("something-new"), 4);
    }

    #[test]
    fn test_four_plate_ring_alternates_pairs() {
        let x = four_plate_state();
        let plates: Vec<_> = predicted_plates(&x, 4, 0.30, 0.05).collect();
        assert_eq!(plates.len(), 4);

        // Plate 0: tracked pair at yaw 0
        assert_relative_eq!(plates[0].position.x, 2.0 - 0.25, epsilon = 1e-12);
        assert_relative_eq!(plates[0].position.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(plates[0].position.z, 0.1, epsilon = 1e-12);

        // Plate 1: alternate pair at yaw π/2
        assert_relative_eq!(plates[1].yaw, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(plates[1].position.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(plates[1].position.y, 1.0 - 0.30, epsilon = 1e-12);
        assert_relative_eq!(plates[1].position.z, 0.15, epsilon = 1e-12);

        // Plate 2: tracked pair again, opposite side
        assert_relative_eq!(plates[2].position.x, 2.0 + 0.25, epsilon = 1e-12);
        assert_relative_eq!(plates[2].position.z, 0.1, epsilon = 1e-12);

        // Plate 3: alternate pair
        assert_relative_eq!(plates[3].position.y, 1.0 + 0.30, epsilon = 1e-12);
        assert_relative_eq!(plates[3].position.z, 0.15, epsilon = 1e-12);
    }

    #[test]
    fn test_three_plate_ring_single_pair() {
        let x = four_plate_state();
        let plates: Vec<_> = predicted_plates(&x, 3, 0.30, 0.05).collect();
        assert_eq!(plates.len(), 3);
        for plate in &plates {
            // another_r / dz must not leak into non-4-plate geometry
            let horizontal = ((plate.position.x - 2.0).powi(2)
                + (plate.position.y - 1.0).powi(2))
            .sqrt();
            assert_relative_eq!(horizontal, 0.25, epsilon = 1e-12);
            assert_relative_eq!(plate.position.z, 0.1, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_best_match_picks_nearest_plate() {
        let x = four_plate_state();
        // Just off the plate-1 position
        let observed = Point3::new(2.01, 1.0 - 0.30, 0.15);
        let m = best_match(&observed, &x, 4, 0.30, 0.05).unwrap();
        assert_eq!(m.index, 1);
        assert!(m.distance < 0.02);
        assert_relative_eq!(m.yaw, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_best_match_yaw_is_principal() {
        let mut x = four_plate_state();
        x[state::YAW] = 3.0; // plate 2 at 3.0 + π wraps past the seam
        let plates: Vec<_> = predicted_plates(&x, 4, 0.25, 0.0).collect();
        let observed = plates[2].position;
        let m = best_match(&observed, &x, 4, 0.25, 0.0).unwrap();
        assert_eq!(m.index, 2);
        assert!(m.yaw <= std::f64::consts::PI && m.yaw >= -std::f64::consts::PI);
        assert_relative_eq!(m.yaw, normalize_angle(3.0 + std::f64::consts::PI), epsilon = 1e-12);
    }
}
