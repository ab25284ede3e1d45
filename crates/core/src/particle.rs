//! Air parcel state and per-step kinetic/boundary update.
//!
//! Each particle carries temperature and velocity and advances itself once
//! per frame: buoyancy scaled by a momentum factor, extra pull for cold air,
//! isotropic drag, Euler integration, slow relaxation toward ambient, then
//! boundary resolution against the apartment geometry. Mass is derived from
//! temperature at every step and is never stored independently of it.

use serde::{Deserialize, Serialize};

use crate::apartment::{Apartment, ZoneId};
use crate::geometry::Vec2;

/// Particle lifetime in frames (20 seconds at 60 fps).
pub const MAX_AGE: u32 = 1200;

/// Hard ceiling on particle speed, enforced by [`AirParticle::add_force`].
pub const MAX_SPEED: f32 = 5.0;

/// Lower bound on derived mass.
pub const MASS_FLOOR: f32 = 0.1;

/// Fraction of the ambient temperature difference absorbed per step.
const TEMP_MIXING_RATE: f32 = 0.001;

/// Velocity retained after bouncing off an outer wall, the floor slab, or
/// the partition wall.
const WALL_RESTITUTION: f32 = 0.3;

/// Harder push-back for particles that already leaked into the floor slab.
const LEAK_RESTITUTION: f32 = 0.5;

/// Low-restitution bounce inside the AC housing and tube.
const DUCT_WALL_RESTITUTION: f32 = 0.1;

/// Minimum rightward speed enforced inside the AC housing and tube.
const AC_OUTLET_SPEED: f32 = 2.5;

/// Directional force applied inside an active fan duct.
const FAN_DUCT_FORCE: f32 = 3.0;

/// Half the thickness of the floor slab; leaked particles within this
/// distance of the plane are expelled.
const FLOOR_SLAB_HALF: f32 = 0.1;

/// Derived mass for a given temperature: cold air is denser, warm air is
/// lighter. 5% change per degree around the 20°C base, floored at
/// [`MASS_FLOOR`].
pub fn mass_for_temperature(temperature: f32) -> f32 {
    (1.0 + (20.0 - temperature) * 0.05).max(MASS_FLOOR)
}

/// One air parcel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirParticle {
    pub id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Temperature in °C.
    pub temperature: f32,
    /// Derived from temperature; recomputed every step.
    pub mass: f32,
    /// Frame count since creation. Force-set to [`MAX_AGE`] to mark the
    /// particle for removal.
    pub age: u32,
    /// Last-known containing zone. Advisory only; membership is rebuilt by
    /// the solver each frame.
    pub zone: Option<ZoneId>,
}

impl AirParticle {
    pub fn new(id: u32, position: Vec2, temperature: f32, velocity: Vec2) -> Self {
        AirParticle {
            id,
            position,
            velocity,
            temperature,
            mass: mass_for_temperature(temperature),
            age: 0,
            zone: None,
        }
    }

    /// Advance one step. Returns liveness: callers must drop particles for
    /// which this is false.
    pub fn advance(&mut self, dt: f32, apartment: &Apartment, ambient_temp: f32) -> bool {
        self.age += 1;
        self.mass = mass_for_temperature(self.temperature);

        // Directed airflow should dominate passive buoyancy, so buoyancy and
        // gravity are suppressed for fast-moving jet particles.
        let speed = self.velocity.norm();
        let momentum_factor = (1.0 - speed * 0.5).max(0.1);

        self.velocity.y += (ambient_temp - self.temperature) * 0.02 * momentum_factor * dt;
        if self.temperature < ambient_temp {
            self.velocity.y -= 0.1 * dt * momentum_factor;
        }

        // Air resistance.
        self.velocity *= 0.99;

        self.position += self.velocity * dt;

        self.temperature += (ambient_temp - self.temperature) * TEMP_MIXING_RATE;

        self.resolve_boundaries(apartment);

        self.age < MAX_AGE
    }

    /// Add to velocity, rescaling to [`MAX_SPEED`] if exceeded. Repeated
    /// per-frame forcing (device channeling, transport nudges, pairwise
    /// repulsion) all funnels through here.
    pub fn add_force(&mut self, fx: f32, fy: f32) {
        self.velocity.x += fx;
        self.velocity.y += fy;

        let speed = self.velocity.norm();
        if speed > MAX_SPEED {
            self.velocity *= MAX_SPEED / speed;
        }
    }

    /// Override temperature and recompute mass.
    pub fn set_temperature(&mut self, temperature: f32) {
        self.temperature = temperature;
        self.mass = mass_for_temperature(temperature);
    }

    pub fn distance_to(&self, other: &AirParticle) -> f32 {
        (self.position - other.position).norm()
    }

    pub fn is_alive(&self) -> bool {
        self.age < MAX_AGE
    }

    /// Mark the particle for removal on the next liveness filter.
    pub fn mark_escaped(&mut self) {
        self.age = MAX_AGE;
    }

    /// Temperature mapped to an RGB color for telemetry (10..30°C,
    /// blue through cyan to yellow and red). Pure function of temperature.
    pub fn color(&self) -> [u8; 3] {
        let normalized = ((self.temperature - 10.0) / 20.0).clamp(0.0, 1.0);
        if normalized <= 0.5 {
            let intensity = ((1.0 - normalized * 2.0) * 255.0) as u8;
            [intensity, intensity, 255]
        } else {
            let intensity = ((normalized - 0.5) * 2.0 * 255.0) as u8;
            [255, 255 - intensity, 0]
        }
    }

    fn resolve_boundaries(&mut self, apartment: &Apartment) {
        match apartment.zone_at(self.position.x, self.position.y) {
            Some(zone) => self.zone = Some(zone),
            None => self.bounce_from_walls(apartment),
        }

        if self.check_window_escape(apartment) {
            // Escaped through an open window; skip remaining checks.
            return;
        }

        self.resolve_partition_wall(apartment);
        self.resolve_ac_duct(apartment);
        self.resolve_fan_ducts(apartment);
    }

    /// Clamp to the nearest outer wall and resolve the floor slab. Only
    /// called when the current position resolves to no zone.
    fn bounce_from_walls(&mut self, apartment: &Apartment) {
        if self.position.x <= 0.0 {
            self.position.x = 0.0;
            self.velocity.x = self.velocity.x.abs() * WALL_RESTITUTION;
        }
        if self.position.x >= apartment.width {
            self.position.x = apartment.width;
            self.velocity.x = -self.velocity.x.abs() * WALL_RESTITUTION;
        }
        if self.position.y <= 0.0 {
            self.position.y = 0.0;
            self.velocity.y = self.velocity.y.abs() * WALL_RESTITUTION;
        }
        if self.position.y >= apartment.height {
            self.position.y = apartment.height;
            self.velocity.y = -self.velocity.y.abs() * WALL_RESTITUTION;
        }

        // The floor slab is solid everywhere outside the stair gap.
        let gap = &apartment.stair_gap;
        let in_stair_gap = (gap.x..=gap.x + gap.width).contains(&self.position.x);
        if in_stair_gap {
            return;
        }

        let plane = apartment.floor_height;
        let band = crate::apartment::FLOOR_BAND;
        let y = self.position.y;

        if y > plane - band && y < plane + band {
            // Crossing the plane: snap to the side it came from.
            if self.velocity.y > 0.0 {
                self.position.y = plane - band;
                self.velocity.y = -self.velocity.y.abs() * WALL_RESTITUTION;
            } else {
                self.position.y = plane + band;
                self.velocity.y = self.velocity.y.abs() * WALL_RESTITUTION;
            }
        } else if y > plane && y < plane + FLOOR_SLAB_HALF {
            // Leaked into the slab from above; expel upward, harder.
            self.position.y = plane + band;
            self.velocity.y = self.velocity.y.abs() * LEAK_RESTITUTION;
        } else if y < plane && y > plane - FLOOR_SLAB_HALF {
            // Leaked into the slab from below; expel downward, harder.
            self.position.y = plane - band;
            self.velocity.y = -self.velocity.y.abs() * LEAK_RESTITUTION;
        }
    }

    /// Particles inside an open window (expanded 0.1 m horizontally) escape
    /// outside: mark for removal and report true.
    fn check_window_escape(&mut self, apartment: &Apartment) -> bool {
        for opening in apartment.openings() {
            if opening.is_open
                && opening.leads_outside()
                && opening
                    .rect
                    .contains_expanded(self.position.x, self.position.y, 0.1, 0.0)
            {
                self.mark_escaped();
                return true;
            }
        }
        false
    }

    /// The partition wall between mezzanine and bedroom blocks particles
    /// except through the door area when the door is open.
    fn resolve_partition_wall(&mut self, apartment: &Apartment) {
        let wall_x = apartment.zone(ZoneId::UpperBedroom).rect.x;
        let x = self.position.x;
        let y = self.position.y;

        if x <= wall_x - 0.1 || x >= wall_x + 0.1 {
            return;
        }
        if !(apartment.floor_height..=apartment.height).contains(&y) {
            return;
        }

        let door = apartment.opening(crate::apartment::OpeningId::BedroomDoor);
        let in_door_area = (door.rect.y..=door.rect.y + door.rect.height).contains(&y);
        if door.is_open && in_door_area {
            return;
        }

        if self.velocity.x > 0.0 {
            // Moving mezzanine to bedroom; bounce back left.
            self.position.x = wall_x - 0.1;
            self.velocity.x = -self.velocity.x.abs() * WALL_RESTITUTION;
        } else {
            self.position.x = wall_x + 0.1;
            self.velocity.x = self.velocity.x.abs() * WALL_RESTITUTION;
        }
    }

    /// Channel particles inside the AC housing or its extension tube into a
    /// directed, low-divergence jet: enforce a minimum outlet speed, pull
    /// toward the duct midline, bounce softly off the duct walls, and
    /// forcibly accelerate particles pressed against the entry face instead
    /// of letting them stall.
    fn resolve_ac_duct(&mut self, apartment: &Apartment) {
        let ac = &apartment.ac_unit;
        let in_housing = ac.rect.contains(self.position.x, self.position.y);
        let in_tube = ac.tube.contains(self.position.x, self.position.y);
        if !in_housing && !in_tube {
            return;
        }

        let section = if in_housing { &ac.rect } else { &ac.tube };
        let center_y = section.y + section.height / 2.0;
        let top = section.y + section.height;
        let bottom = section.y;

        self.velocity.x = self.velocity.x.max(AC_OUTLET_SPEED);

        let allowed_deviation = if in_housing {
            ac.rect.height * 0.3
        } else {
            ac.tube.height * 0.2
        };
        if (self.position.y - center_y).abs() > allowed_deviation {
            self.velocity.y += (center_y - self.position.y) * 0.8;
        }

        if self.position.y <= bottom {
            self.position.y = bottom + 0.01;
            self.velocity.y = self.velocity.y.abs() * DUCT_WALL_RESTITUTION;
        } else if self.position.y >= top {
            self.position.y = top - 0.01;
            self.velocity.y = -self.velocity.y.abs() * DUCT_WALL_RESTITUTION;
        }

        // Entry face: amplified rebound so the jet never stalls backward.
        if in_housing && self.position.x <= ac.rect.x {
            self.position.x = ac.rect.x + 0.01;
            self.velocity.x = self.velocity.x.abs() * 1.5;
        } else if in_tube && self.position.x <= ac.tube.x {
            self.position.x = ac.tube.x + 0.01;
            self.velocity.x = self.velocity.x.abs() * 1.2;
        }
    }

    /// Channel particles through active fan ducts: strong force along the
    /// fan direction, elastic wall bounces, and centering toward the duct
    /// midlines past 30% of the duct extent.
    fn resolve_fan_ducts(&mut self, apartment: &Apartment) {
        for fan in apartment.fans() {
            if !fan.is_active {
                continue;
            }
            let duct = &fan.duct;
            if !duct.contains(self.position.x, self.position.y) {
                continue;
            }

            self.velocity.x += fan.direction.x * FAN_DUCT_FORCE;
            self.velocity.y += fan.direction.y * FAN_DUCT_FORCE;

            if self.position.x <= duct.x {
                self.position.x = duct.x + 0.01;
                self.velocity.x = self.velocity.x.abs();
            } else if self.position.x >= duct.x + duct.width {
                self.position.x = duct.x + duct.width - 0.01;
                self.velocity.x = -self.velocity.x.abs();
            }

            if self.position.y <= duct.y {
                self.position.y = duct.y + 0.01;
                self.velocity.y = self.velocity.y.abs();
            } else if self.position.y >= duct.y + duct.height {
                self.position.y = duct.y + duct.height - 0.01;
                self.velocity.y = -self.velocity.y.abs();
            }

            let center = duct.center();
            if (self.position.x - center.x).abs() > duct.width * 0.3 {
                self.velocity.x += (center.x - self.position.x) * 0.5;
            }
            if (self.position.y - center.y).abs() > duct.height * 0.3 {
                self.velocity.y += (center.y - self.position.y) * 0.5;
            }
        }
    }
}
