//! # lfgsim-physics
//!
//! Per-tick kinematics for falling nodes.
//!
//! Each tick runs three stages over a node's [`Kinematics`], in order:
//!
//! 1. [`Integrator::update_acceleration`] - random x/y drift
//! 2. [`Integrator::update_velocity`] - gravity, clamped at terminal velocity
//! 3. [`Integrator::update_position`] - integrate, clamped at the ground
//!
//! The ground absorbs: once `position.z` reaches zero the vertical state is
//! frozen, while x/y keep integrating.

use lfgsim_common::{Kinematics, Settings};
use rand::Rng;

/// Largest x/y acceleration change per second of simulated time (m/s²).
pub const MAX_ACCEL_DELTA: f64 = 0.005;

/// Relative spread of per-node terminal velocity around the base value.
pub const DRAG_VARIANCE: f64 = 0.05;

/// Uniform integer percentage in [-100, 100] scaled to [-1.0, 1.0].
fn unit_jitter<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(-100i32..=100) as f64 / 100.0
}

/// Draw a node's terminal velocity within ±5% of `base`.
pub fn randomized_terminal_velocity<R: Rng + ?Sized>(base: f64, rng: &mut R) -> f64 {
    base + base * DRAG_VARIANCE * unit_jitter(rng)
}

/// Outcome of one velocity update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelocityUpdate {
    /// Still accelerating (or already at the ground).
    Accelerating,
    /// Vertical speed was clamped to terminal velocity this tick.
    ReachedTerminal,
    /// Already at terminal velocity.
    AtTerminal,
}

/// Kinematics integrator for a fixed time resolution.
#[derive(Debug, Clone, Copy)]
pub struct Integrator {
    /// Tick length in seconds.
    pub time_resolution: f64,
    /// Percent chance per tick of an x/y acceleration change.
    pub spread_factor: f64,
}

impl Integrator {
    /// Create an integrator from run settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Integrator {
            time_resolution: settings.time_resolution,
            spread_factor: settings.spread_factor,
        }
    }

    /// Randomly perturb x/y acceleration. Returns true if it changed.
    ///
    /// The vertical component stays equal to gravity.
    pub fn update_acceleration<R: Rng + ?Sized>(&self, k: &mut Kinematics, rng: &mut R) -> bool {
        if (rng.gen_range(0u32..100) as f64) >= self.spread_factor {
            return false;
        }
        let scale = self.time_resolution * MAX_ACCEL_DELTA;
        let dx = unit_jitter(rng) * scale;
        let dy = unit_jitter(rng) * scale;
        log::trace!("changing x/y acceleration by {:.9},{:.9}", dx, dy);
        k.acceleration.x += dx;
        k.acceleration.y += dy;
        true
    }

    /// Integrate acceleration into velocity.
    pub fn update_velocity(&self, k: &mut Kinematics) -> VelocityUpdate {
        let mut outcome = VelocityUpdate::Accelerating;
        if k.position.z > 0.0 {
            if k.velocity.z < k.terminal_velocity {
                let next = k.velocity.z + k.acceleration.z * self.time_resolution;
                if next < k.terminal_velocity {
                    k.velocity.z = next;
                } else {
                    k.velocity.z = k.terminal_velocity;
                    outcome = VelocityUpdate::ReachedTerminal;
                }
            } else {
                outcome = VelocityUpdate::AtTerminal;
            }
        }
        k.velocity.x += k.acceleration.x * self.time_resolution;
        k.velocity.y += k.acceleration.y * self.time_resolution;
        outcome
    }

    /// Integrate velocity into position. Returns true on the tick the node lands.
    pub fn update_position(&self, k: &mut Kinematics) -> bool {
        let mut landed = false;
        if k.position.z > 0.0 {
            let next = k.position.z - k.velocity.z * self.time_resolution;
            if next > 0.0 {
                k.position.z = next;
            } else {
                k.position.z = 0.0;
                landed = true;
            }
        }
        k.position.x += k.velocity.x * self.time_resolution;
        k.position.y += k.velocity.y * self.time_resolution;
        landed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lfgsim_common::Vec3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn integrator(time_resolution: f64, spread_factor: f64) -> Integrator {
        Integrator { time_resolution, spread_factor }
    }

    #[test]
    fn test_lands_in_expected_ticks() {
        // 10 m under 9.8 m/s² at 0.1 s/tick: analytic t = sqrt(20/9.8) ≈ 1.43 s.
        let physics = integrator(0.1, 0.0);
        let mut k = Kinematics::at_rest(Vec3::new(0.0, 0.0, 10.0), 9.8, 1000.0);
        let mut ticks = 0;
        while !k.is_landed() {
            physics.update_velocity(&mut k);
            physics.update_position(&mut k);
            ticks += 1;
            assert!(ticks < 100, "node never landed");
        }
        let analytic = (2.0 * 10.0 / 9.8_f64).sqrt() / 0.1;
        assert_eq!(ticks, 14);
        assert!((ticks as f64 - analytic).abs() < 1.0);
    }

    #[test]
    fn test_clamps_to_terminal_velocity() {
        let physics = integrator(0.5, 0.0);
        let mut k = Kinematics::at_rest(Vec3::new(0.0, 0.0, 1000.0), 9.8, 8.0);
        assert_eq!(physics.update_velocity(&mut k), VelocityUpdate::Accelerating);
        assert_eq!(physics.update_velocity(&mut k), VelocityUpdate::ReachedTerminal);
        assert_eq!(k.velocity.z, 8.0);
        assert_eq!(physics.update_velocity(&mut k), VelocityUpdate::AtTerminal);
        assert_eq!(k.velocity.z, 8.0);
    }

    #[test]
    fn test_ground_clamp_and_freeze() {
        let physics = integrator(1.0, 0.0);
        let mut k = Kinematics::at_rest(Vec3::new(0.0, 0.0, 5.0), 9.8, 50.0);
        k.velocity = Vec3::new(1.0, -2.0, 7.0);
        assert!(physics.update_position(&mut k));
        assert_eq!(k.position.z, 0.0);

        let frozen = k.velocity.z;
        physics.update_velocity(&mut k);
        assert!(!physics.update_position(&mut k));
        assert_eq!(k.velocity.z, frozen);
        assert_eq!(k.position.z, 0.0);
        // Horizontal motion continues after landing.
        assert_relative_eq!(k.position.x, 2.0);
        assert_relative_eq!(k.position.y, -4.0);
    }

    #[test]
    fn test_no_spread_never_changes_acceleration() {
        let physics = integrator(0.01, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut k = Kinematics::at_rest(Vec3::new(0.0, 0.0, 10.0), 9.8, 8.0);
        for _ in 0..1000 {
            assert!(!physics.update_acceleration(&mut k, &mut rng));
        }
        assert_eq!(k.acceleration, Vec3::new(0.0, 0.0, 9.8));
    }

    #[test]
    fn test_full_spread_bounded_change() {
        let physics = integrator(0.01, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut k = Kinematics::at_rest(Vec3::new(0.0, 0.0, 10.0), 9.8, 8.0);
        let bound = 0.01 * MAX_ACCEL_DELTA;
        for _ in 0..100 {
            let before = k.acceleration;
            assert!(physics.update_acceleration(&mut k, &mut rng));
            assert!((k.acceleration.x - before.x).abs() <= bound + 1e-15);
            assert!((k.acceleration.y - before.y).abs() <= bound + 1e-15);
            assert_eq!(k.acceleration.z, 9.8);
        }
    }

    #[test]
    fn test_terminal_velocity_variance() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            let v = randomized_terminal_velocity(8.0, &mut rng);
            assert!((7.6..=8.4).contains(&v), "terminal velocity {} out of range", v);
        }
    }
}
