//! Per-frame flow aggregation.
//!
//! The solver runs once per simulation frame, strictly before the particles'
//! own advance: it rebuilds zone membership, smooths zone temperatures,
//! schedules temperature-driven inter-zone transport, applies AC spawn and
//! envelope effects, and resolves short-range particle interaction. Each
//! step depends on state built by the previous one within the same frame,
//! so the order is a binding contract.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::apartment::{AcUnit, Apartment, ZoneId};
use crate::geometry::Vec2;
use crate::particle::AirParticle;

/// Hard global cap on live particles; AC spawning stops at this limit.
pub const PARTICLE_HARD_CAP: usize = 1000;

/// Zone temperature blend toward the particle mean (old/new split).
const ZONE_BLEND_KEEP: f32 = 0.95;

/// Per-frame relaxation of empty zones toward ambient.
const EMPTY_ZONE_RELAX: f32 = 0.001;

/// Minimum zone temperature difference that drives transport.
const TRANSPORT_TEMP_THRESHOLD: f32 = 0.5;

/// Minimum flow magnitude below which a transport action is skipped.
const TRANSPORT_MIN_STRENGTH: f32 = 0.01;

/// Radius of the AC's thermal/push influence around its outlet.
const AC_INFLUENCE_RADIUS: f32 = 2.0;

/// Interaction radius for the pairwise particle scan.
const INTERACTION_RADIUS: f32 = 0.3;

/// Fraction of the pairwise temperature difference exchanged per second.
const INTERACTION_MIXING_RATE: f32 = 0.1;

/// Mutual repulsion applied to interacting pairs.
const INTERACTION_REPULSION: f32 = 0.05;

/// Number of particles a transport action may nudge from a source zone of
/// `len` particles at the given flow strength. Capped at 5% of the zone (at
/// least one) and can be zero for weak flows.
fn transport_nudge_count(len: usize, flow_strength: f32) -> usize {
    let by_flow = (len as f32 * flow_strength * 0.1).floor() as usize;
    let by_share = ((len as f32 * 0.05).floor() as usize).max(1);
    by_flow.min(by_share)
}

/// Orchestrates one simulation frame of zone bookkeeping, transport, device
/// effects, and pairwise interaction.
#[derive(Debug)]
pub struct FlowSolver {
    ambient_temperature: f32,
    rng: StdRng,
}

impl FlowSolver {
    pub fn new(seed: u64) -> Self {
        FlowSolver {
            ambient_temperature: 22.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn ambient_temperature(&self) -> f32 {
        self.ambient_temperature
    }

    /// Set the global ambient temperature consumed by zone relaxation and by
    /// each particle's own buoyancy and mixing.
    pub fn set_ambient_temperature(&mut self, temperature: f32) {
        self.ambient_temperature = temperature;
    }

    /// Run one frame of flow aggregation. Mutates particle velocities and
    /// temperatures; the particles' own advance runs afterward on top of
    /// these adjustments.
    pub fn update(
        &mut self,
        apartment: &mut Apartment,
        particles: &mut Vec<AirParticle>,
        dt: f32,
        next_id: &mut u32,
    ) {
        apartment.clear_zone_particles();

        // Reassign membership. Particles resolving to no zone are omitted
        // from all lists this frame but still advected by their own update.
        for (index, particle) in particles.iter_mut().enumerate() {
            if let Some(id) = apartment.zone_at(particle.position.x, particle.position.y) {
                apartment.zone_mut(id).particles.push(index);
                particle.zone = Some(id);
            }
        }

        self.update_zone_temperatures(apartment, particles);
        self.calculate_inter_zone_flows(apartment, particles, dt);
        self.apply_ac_effects(apartment, particles, dt, next_id);
        Self::handle_particle_interactions(particles, dt);
    }

    /// Smooth each zone's temperature: blend toward the particle mean when
    /// occupied, relax toward ambient when empty.
    fn update_zone_temperatures(&self, apartment: &mut Apartment, particles: &[AirParticle]) {
        for id in ZoneId::ALL {
            let mean = {
                let zone = apartment.zone(id);
                if zone.particles.is_empty() {
                    None
                } else {
                    let sum: f32 = zone
                        .particles
                        .iter()
                        .map(|&i| particles[i].temperature)
                        .sum();
                    Some(sum / zone.particles.len() as f32)
                }
            };

            let zone = apartment.zone_mut(id);
            zone.temperature = match mean {
                Some(mean) => zone.temperature * ZONE_BLEND_KEEP + mean * (1.0 - ZONE_BLEND_KEEP),
                None => {
                    zone.temperature * (1.0 - EMPTY_ZONE_RELAX)
                        + self.ambient_temperature * EMPTY_ZONE_RELAX
                }
            };
        }
    }

    /// Schedule transport actions between connected zone pairs whose
    /// temperature difference exceeds the threshold across an open flow
    /// area.
    fn calculate_inter_zone_flows(
        &mut self,
        apartment: &Apartment,
        particles: &mut [AirParticle],
        dt: f32,
    ) {
        for id in ZoneId::ALL {
            for &other in apartment.connected_zones(id) {
                let flow_area = apartment.open_area_between(id, other);
                if flow_area <= 0.0 {
                    continue;
                }

                let temp_diff =
                    apartment.zone(id).temperature - apartment.zone(other).temperature;
                // Temperature difference stands in for pressure.
                let pressure_diff = temp_diff * 0.1;
                let flow_strength = pressure_diff.abs() * flow_area * dt * 0.1;

                if temp_diff.abs() > TRANSPORT_TEMP_THRESHOLD
                    && flow_strength > TRANSPORT_MIN_STRENGTH
                {
                    // Cold air displaces toward the warmer zone.
                    let (source, target) = if temp_diff > 0.0 { (other, id) } else { (id, other) };
                    self.nudge_particles_toward(apartment, particles, source, target, flow_strength);
                }
            }
        }
    }

    /// Bias randomly chosen source-zone particles toward the destination
    /// zone's centroid. Never relocates particles outright.
    fn nudge_particles_toward(
        &mut self,
        apartment: &Apartment,
        particles: &mut [AirParticle],
        source: ZoneId,
        target: ZoneId,
        flow_strength: f32,
    ) {
        let members = &apartment.zone(source).particles;
        if members.is_empty() {
            return;
        }

        let count = transport_nudge_count(members.len(), flow_strength);
        let target_center = apartment.zone(target).rect.center();

        for _ in 0..count {
            let pick = members[self.rng.random_range(0..members.len())];
            let particle = &mut particles[pick];

            let offset = target_center - particle.position;
            let distance = offset.norm();
            if distance > 0.0 {
                let force = flow_strength * 0.5;
                particle.add_force(offset.x / distance * force, offset.y / distance * force);
            }
        }
    }

    /// Spawn jet particles at the AC outlet and cool/push every particle
    /// inside the AC envelope (housing plus tube, extended one meter past
    /// the tube end, within a narrow band around the duct centerline).
    fn apply_ac_effects(
        &mut self,
        apartment: &Apartment,
        particles: &mut Vec<AirParticle>,
        dt: f32,
        next_id: &mut u32,
    ) {
        let ac = &apartment.ac_unit;
        if !ac.is_active {
            return;
        }

        let spawn_count = (ac.flow_strength * 2.0).floor() as usize;
        for _ in 0..spawn_count {
            if particles.len() >= PARTICLE_HARD_CAP {
                break;
            }
            let particle = self.spawn_ac_particle(ac, next_id);
            particles.push(particle);
        }

        let outlet = ac.outlet();
        let envelope_right = ac.tube.x + ac.tube.width + 1.0;
        let band_bottom = ac.tube.y - 0.1;
        let band_top = ac.tube.y + ac.tube.height + 0.1;

        for &index in &apartment.zone(ac.zone).particles {
            let particle = &mut particles[index];
            let in_envelope = (ac.rect.x..=envelope_right).contains(&particle.position.x)
                && (band_bottom..=band_top).contains(&particle.position.y);
            if !in_envelope {
                continue;
            }

            let distance = (particle.position - outlet).norm();
            if distance < AC_INFLUENCE_RADIUS {
                let proximity = (AC_INFLUENCE_RADIUS - distance) / AC_INFLUENCE_RADIUS;
                let cooling = proximity.max(0.0) * ac.flow_strength * dt * 0.8;
                particle.temperature = particle.temperature * (1.0 - cooling)
                    + ac.target_temperature * cooling;

                // Purely horizontal push; the duct channeling keeps the jet
                // narrow.
                let push = ac.flow_strength * 0.3 * proximity;
                particle.add_force(push, 0.0);
            }
        }
    }

    /// New jet particle at the outlet face: nearly horizontal, ±1° angular
    /// jitter, speed proportional to flow strength, at the AC target
    /// temperature.
    fn spawn_ac_particle(&mut self, ac: &AcUnit, next_id: &mut u32) -> AirParticle {
        let outlet = ac.outlet();
        let max_angle = 1.0_f32.to_radians();
        let angle = (self.rng.random::<f32>() - 0.5) * 2.0 * max_angle;
        let speed = ac.flow_strength * 1.5;

        let id = *next_id;
        *next_id += 1;

        AirParticle::new(
            id,
            outlet,
            ac.target_temperature,
            Vec2::new(speed * angle.cos(), speed * angle.sin()),
        )
    }

    /// O(n²) pairwise scan: close pairs exchange a fraction of their
    /// temperature difference and repel slightly along the connecting line.
    /// This is the only particle-particle coupling; it conserves neither
    /// momentum nor energy by design of the source model.
    fn handle_particle_interactions(particles: &mut [AirParticle], dt: f32) {
        let count = particles.len();
        for i in 0..count {
            let (head, tail) = particles.split_at_mut(i + 1);
            let a = &mut head[i];

            for b in tail {
                let distance = a.distance_to(b);
                if distance >= INTERACTION_RADIUS {
                    continue;
                }

                let temp_diff = a.temperature - b.temperature;
                let mixing = INTERACTION_MIXING_RATE * dt;
                a.temperature -= temp_diff * mixing;
                b.temperature += temp_diff * mixing;

                if distance > 0.0 {
                    let dx = (a.position.x - b.position.x) / distance;
                    let dy = (a.position.y - b.position.y) / distance;
                    a.add_force(dx * INTERACTION_REPULSION, dy * INTERACTION_REPULSION);
                    b.add_force(-dx * INTERACTION_REPULSION, -dy * INTERACTION_REPULSION);
                }
            }
        }
    }
}
