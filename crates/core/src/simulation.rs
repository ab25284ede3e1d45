//! Simulation container: owns the apartment, the particle population, and
//! the flow solver, and exposes the narrow configuration/query surface the
//! surrounding driver and telemetry layers consume.
//!
//! One call to [`AirflowSimulation::update`] is one discrete frame. The
//! solver pass runs first and mutates particle velocities and temperatures;
//! every particle's own advance then runs on top of those adjustments. This
//! sequential order is a correctness requirement of the flow model.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::apartment::{Apartment, FanId, OpeningId, ZoneId};
use crate::geometry::Vec2;
use crate::particle::AirParticle;
use crate::solver::FlowSolver;

/// Seed used by [`AirflowSimulation::new`]. Runs built with the same seed
/// and stepped with the same `dt` sequence are bit-for-bit identical.
pub const DEFAULT_SEED: u64 = 42;

/// Placement attempts for the baseline ambient population.
const BASELINE_PARTICLE_ATTEMPTS: usize = 50;

/// Particles added per accepted injection.
const INJECTION_CLUSTER_SIZE: usize = 5;

/// Full per-axis span of injection position jitter (offsets stay within
/// ±0.1 m, keeping the cluster within 0.15 m of the requested point).
const INJECTION_POSITION_JITTER: f32 = 0.2;

/// Full per-axis span of injection velocity jitter.
const INJECTION_VELOCITY_JITTER: f32 = 0.5;

/// Floor of the population soft cap regardless of the density setting.
const MIN_SOFT_CAP: usize = 500;

/// A running multi-zone airflow simulation.
#[derive(Debug)]
pub struct AirflowSimulation {
    apartment: Apartment,
    particles: Vec<AirParticle>,
    solver: FlowSolver,
    rng: StdRng,
    next_particle_id: u32,
    frame_count: u64,
    /// Particle-density target; the soft cap is `max(500, density * 8)`.
    particle_density: u32,
    /// Speed multiplier interpreted by the external driver when computing
    /// `dt`. Stored here, never applied by the core.
    flow_speed: f32,
}

impl Default for AirflowSimulation {
    fn default() -> Self {
        Self::new()
    }
}

impl AirflowSimulation {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Build a simulation with a fixed RNG seed and the baseline ambient
    /// particle population.
    pub fn with_seed(seed: u64) -> Self {
        let mut sim = AirflowSimulation {
            apartment: Apartment::new(),
            particles: Vec::new(),
            solver: FlowSolver::new(seed),
            rng: StdRng::seed_from_u64(seed.wrapping_add(1)),
            next_particle_id: 0,
            frame_count: 0,
            particle_density: 100,
            flow_speed: 1.0,
        };
        sim.seed_baseline_population();
        sim
    }

    /// Advance the simulation by one frame of `dt` seconds.
    ///
    /// Non-positive deltas are rejected without effect. Above the soft cap,
    /// the oldest particles are trimmed first.
    pub fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            warn!(dt, "ignoring non-positive time step");
            return;
        }

        let max_particles = self.max_particles();
        if self.particles.len() > max_particles {
            let excess = self.particles.len() - max_particles;
            self.particles.drain(0..excess);
        }

        self.solver.update(
            &mut self.apartment,
            &mut self.particles,
            dt,
            &mut self.next_particle_id,
        );

        let ambient = self.solver.ambient_temperature();
        let apartment = &self.apartment;
        self.particles
            .retain_mut(|particle| particle.advance(dt, apartment, ambient));

        // The membership lists hold pre-filter indices; drop them with the
        // dead particles.
        self.apartment.clear_zone_particles();

        // Outlet spawning is staggered so the AC keeps priority over fans.
        if self.apartment.ac_unit.is_active && self.frame_count % 2 == 0 {
            self.spawn_ac_outlet_particles();
        }
        if self.frame_count % 3 == 0 {
            self.spawn_fan_particles();
        }

        self.frame_count += 1;
    }

    /// Inject a jittered cluster of particles near a point. Rejected with no
    /// effect when the point is not a valid position.
    pub fn inject(&mut self, x: f32, y: f32, temperature: f32, velocity: Vec2) -> bool {
        if !self.apartment.is_valid_position(x, y) {
            debug!(x, y, "rejected injection at invalid position");
            return false;
        }

        for _ in 0..INJECTION_CLUSTER_SIZE {
            let position = Vec2::new(
                x + (self.rng.random::<f32>() - 0.5) * INJECTION_POSITION_JITTER,
                y + (self.rng.random::<f32>() - 0.5) * INJECTION_POSITION_JITTER,
            );
            let velocity = Vec2::new(
                velocity.x + (self.rng.random::<f32>() - 0.5) * INJECTION_VELOCITY_JITTER,
                velocity.y + (self.rng.random::<f32>() - 0.5) * INJECTION_VELOCITY_JITTER,
            );
            let id = self.next_id();
            self.particles
                .push(AirParticle::new(id, position, temperature, velocity));
        }
        true
    }

    /// Drop all particles, restore zone temperatures to ambient, and reseed
    /// the baseline ambient population.
    pub fn reset(&mut self) {
        info!("simulation reset");
        self.particles.clear();
        let ambient = self.solver.ambient_temperature();
        for id in ZoneId::ALL {
            let zone = self.apartment.zone_mut(id);
            zone.temperature = ambient;
            zone.particles.clear();
        }
        self.seed_baseline_population();
    }

    // --- configuration mutators ---------------------------------------

    pub fn set_ambient_temperature(&mut self, temperature: f32) {
        self.solver.set_ambient_temperature(temperature);
    }

    /// Set the AC target temperature and flow strength, the latter on the
    /// external 0-100% scale.
    pub fn set_ac_settings(&mut self, temperature: f32, flow_percent: f32) {
        self.apartment
            .set_ac_settings(temperature, flow_percent / 100.0);
    }

    pub fn set_ac_active(&mut self, is_active: bool) {
        self.apartment.set_ac_active(is_active);
    }

    pub fn set_opening_state(&mut self, id: OpeningId, is_open: bool) {
        self.apartment.set_opening_state(id, is_open);
    }

    pub fn set_opening_height(&mut self, id: OpeningId, height: f32) {
        self.apartment.set_opening_height(id, height);
    }

    pub fn set_fan_active(&mut self, id: FanId, is_active: bool) {
        self.apartment.set_fan_active(id, is_active);
    }

    /// Set a fan's flow strength on the external 0-100% scale.
    pub fn set_fan_flow(&mut self, id: FanId, flow_percent: f32) {
        self.apartment.set_fan_flow(id, flow_percent / 100.0);
    }

    pub fn set_particle_density(&mut self, density: u32) {
        self.particle_density = density;
    }

    /// Store the flow-speed multiplier for the driver. The core never
    /// applies it to `dt` itself.
    pub fn set_flow_speed(&mut self, multiplier: f32) {
        self.flow_speed = multiplier.max(0.0);
    }

    // --- read-only queries ---------------------------------------------

    pub fn apartment(&self) -> &Apartment {
        &self.apartment
    }

    pub fn particles(&self) -> &[AirParticle] {
        &self.particles
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn zone_average_temperature(&self, id: ZoneId) -> f32 {
        self.apartment.average_temperature(id, &self.particles)
    }

    pub fn ambient_temperature(&self) -> f32 {
        self.solver.ambient_temperature()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn flow_speed(&self) -> f32 {
        self.flow_speed
    }

    pub fn particle_density(&self) -> u32 {
        self.particle_density
    }

    // --- internals -------------------------------------------------------

    fn max_particles(&self) -> usize {
        MIN_SOFT_CAP.max(self.particle_density as usize * 8)
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_particle_id;
        self.next_particle_id += 1;
        id
    }

    fn seed_baseline_population(&mut self) {
        let ambient = self.solver.ambient_temperature();
        for _ in 0..BASELINE_PARTICLE_ATTEMPTS {
            let x = self.rng.random::<f32>() * self.apartment.width;
            let y = self.rng.random::<f32>() * self.apartment.height;
            if self.apartment.is_valid_position(x, y) {
                let id = self.next_id();
                self.particles
                    .push(AirParticle::new(id, Vec2::new(x, y), ambient, Vec2::zeros()));
            }
        }
    }

    /// Driver-level AC outlet spawning: a short burst of cold particles at
    /// the back of the housing with pure horizontal velocity, so the duct
    /// channeling forms a narrow beam.
    fn spawn_ac_outlet_particles(&mut self) {
        let ac = &self.apartment.ac_unit;
        let per_frame = (ac.flow_strength * 100.0 / 12.0).floor() as usize;
        let x = ac.rect.x + 0.05;
        let y = ac.rect.y + ac.rect.height / 2.0;
        let speed = (ac.flow_strength * 1.5).max(1.2);
        let temperature = ac.target_temperature;
        let limit = (self.max_particles() as f32 * 0.95) as usize;

        for _ in 0..per_frame {
            if self.particles.len() >= limit {
                break;
            }
            let id = self.next_id();
            self.particles.push(AirParticle::new(
                id,
                Vec2::new(x, y),
                temperature,
                Vec2::new(speed, 0.0),
            ));
        }
    }

    /// Fan spawning: narrow directional beams of ambient-temperature air at
    /// each active fan's center, ±2° jitter about the fan direction.
    fn spawn_fan_particles(&mut self) {
        let limit = (self.max_particles() as f32 * 0.9) as usize;
        let ambient = self.solver.ambient_temperature();

        for fan_id in FanId::ALL {
            let (center, direction, flow_strength) = {
                let fan = self.apartment.fan(fan_id);
                if !fan.is_active {
                    continue;
                }
                (fan.rect.center(), fan.direction, fan.flow_strength)
            };

            let per_frame = (flow_strength * 2.0).floor() as usize;
            let base_angle = direction.y.atan2(direction.x);
            let speed = flow_strength * 2.0;

            for _ in 0..per_frame {
                if self.particles.len() >= limit {
                    break;
                }
                let jitter = (self.rng.random::<f32>() - 0.5) * 2.0 * 2.0_f32.to_radians();
                let angle = base_angle + jitter;
                let id = self.next_id();
                self.particles.push(AirParticle::new(
                    id,
                    center,
                    ambient,
                    Vec2::new(speed * angle.cos(), speed * angle.sin()),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injection_at_valid_point_adds_exact_cluster() {
        let mut sim = AirflowSimulation::with_seed(3);
        let before = sim.particle_count();

        let accepted = sim.inject(4.5, 1.5, 28.0, Vec2::zeros());
        assert!(accepted);
        assert_eq!(sim.particle_count(), before + 5);

        for particle in &sim.particles()[before..] {
            let offset = particle.position - Vec2::new(4.5, 1.5);
            assert!(offset.norm() <= 0.15, "cluster spread too wide: {offset:?}");
            assert_eq!(particle.temperature, 28.0);
            assert!(particle.is_alive());
        }
    }

    #[test]
    fn injection_at_invalid_point_is_rejected() {
        let mut sim = AirflowSimulation::with_seed(3);
        let before = sim.particle_count();

        // Floor plane outside the stair gap.
        assert!(!sim.inject(2.0, 3.0, 28.0, Vec2::zeros()));
        // Out of bounds.
        assert!(!sim.inject(-1.0, 1.0, 28.0, Vec2::zeros()));
        assert_eq!(sim.particle_count(), before);
    }

    #[test]
    fn non_positive_dt_is_a_no_op() {
        let mut sim = AirflowSimulation::with_seed(3);
        let before: Vec<Vec2> = sim.particles().iter().map(|p| p.position).collect();

        sim.update(0.0);
        sim.update(-1.0);

        assert_eq!(sim.frame_count(), 0);
        let after: Vec<Vec2> = sim.particles().iter().map(|p| p.position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn soft_cap_trims_oldest_first() {
        let mut sim = AirflowSimulation::with_seed(3);
        for _ in 0..120 {
            assert!(sim.inject(4.5, 1.5, 22.0, Vec2::zeros()));
        }
        let before = sim.particle_count();
        assert!(before > MIN_SOFT_CAP);

        sim.set_particle_density(0); // soft cap floors at 500
        let excess = before - MIN_SOFT_CAP;
        sim.update(1.0 / 60.0);

        // Creation order equals vector order, so the survivors from before
        // the update all carry ids at or above the trimmed prefix.
        let min_id = sim.particles().iter().map(|p| p.id).min().unwrap();
        assert!(min_id >= excess as u32);
        assert!(sim.particle_count() <= MIN_SOFT_CAP + 8);
    }

    #[test]
    fn reset_restores_zone_temperatures_and_population() {
        let mut sim = AirflowSimulation::with_seed(3);
        sim.set_ambient_temperature(25.0);
        for _ in 0..30 {
            sim.update(1.0 / 60.0);
        }

        sim.reset();
        assert!(sim.particle_count() > 0);
        assert!(sim.particle_count() <= BASELINE_PARTICLE_ATTEMPTS);
        for id in ZoneId::ALL {
            assert_eq!(sim.apartment().zone(id).temperature, 25.0);
        }
        for particle in sim.particles() {
            assert_eq!(particle.temperature, 25.0);
            assert_eq!(particle.age, 0);
        }
    }

    #[test]
    fn flow_speed_is_stored_not_applied() {
        let mut sim = AirflowSimulation::with_seed(3);
        sim.set_flow_speed(2.5);
        assert_eq!(sim.flow_speed(), 2.5);
        sim.set_flow_speed(-1.0);
        assert_eq!(sim.flow_speed(), 0.0);
    }

    #[test]
    fn ac_flow_percent_maps_to_unit_scale() {
        let mut sim = AirflowSimulation::with_seed(3);
        sim.set_ac_settings(18.0, 75.0);
        assert_eq!(sim.apartment().ac_unit.flow_strength, 0.75);
        assert_eq!(sim.apartment().ac_unit.target_temperature, 18.0);

        sim.set_ac_settings(18.0, 250.0); // clamped
        assert_eq!(sim.apartment().ac_unit.flow_strength, 1.0);
    }
}
