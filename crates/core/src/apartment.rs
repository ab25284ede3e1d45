//! Geometry/zone model of the two-level apartment.
//!
//! The apartment is the single source of truth for geometry: three
//! rectangular zones, the openings between them (and to the outside), the
//! stair gap that is the only permeable region of the floor plane, the AC
//! unit with its extension tube, and two ducted fans. All cross-references
//! are plain id lookups into fixed arenas; zone membership lists hold
//! particle indices and are rebuilt every frame by the flow solver.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Rect, Vec2};
use crate::particle::AirParticle;

/// Half-width of the band around the floor plane where position resolution
/// is restricted to the stair gap.
pub const FLOOR_BAND: f32 = 0.05;

/// Flow cross-section assumed for the stair shaft when no explicit opening
/// applies. The shaft always offers some convective path between levels.
pub const STAIR_DEFAULT_FLOW_AREA: f32 = 1.0;

/// Maximum opening height accepted by [`Apartment::set_opening_height`].
pub const MAX_OPENING_HEIGHT: f32 = 2.0;

/// Stable zone identifiers, doubling as arena indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneId {
    LowerFloor,
    UpperMezzanine,
    UpperBedroom,
}

impl ZoneId {
    pub const ALL: [ZoneId; 3] = [
        ZoneId::LowerFloor,
        ZoneId::UpperMezzanine,
        ZoneId::UpperBedroom,
    ];

    fn index(self) -> usize {
        match self {
            ZoneId::LowerFloor => 0,
            ZoneId::UpperMezzanine => 1,
            ZoneId::UpperBedroom => 2,
        }
    }
}

/// Stable opening identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpeningId {
    BedroomDoor,
    LeftWindow,
    RightWindow,
}

impl OpeningId {
    pub const ALL: [OpeningId; 3] = [
        OpeningId::BedroomDoor,
        OpeningId::LeftWindow,
        OpeningId::RightWindow,
    ];

    fn index(self) -> usize {
        match self {
            OpeningId::BedroomDoor => 0,
            OpeningId::LeftWindow => 1,
            OpeningId::RightWindow => 2,
        }
    }

    /// Resolve an opening from its external name. Unknown names yield `None`
    /// so that callers can treat them as a no-op.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bedroomDoor" => Some(OpeningId::BedroomDoor),
            "leftWindow" => Some(OpeningId::LeftWindow),
            "rightWindow" => Some(OpeningId::RightWindow),
            _ => None,
        }
    }
}

/// Stable fan identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FanId {
    StairFan,
    BedroomFan,
}

impl FanId {
    pub const ALL: [FanId; 2] = [FanId::StairFan, FanId::BedroomFan];

    fn index(self) -> usize {
        match self {
            FanId::StairFan => 0,
            FanId::BedroomFan => 1,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "stairFan" => Some(FanId::StairFan),
            "bedroomFan" => Some(FanId::BedroomFan),
            _ => None,
        }
    }
}

/// What an opening leads to: another zone, or the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpeningTarget {
    Zone(ZoneId),
    Outside,
}

/// A rectangular zone with smoothed temperature and a per-frame membership
/// list of particle indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub rect: Rect,
    pub connections: Vec<ZoneId>,
    /// Smoothed zone temperature (°C), updated once per frame.
    pub temperature: f32,
    /// Indices into the frame's particle slice. Transient: rebuilt every
    /// frame, never persisted, carries membership only.
    #[serde(skip)]
    pub particles: Vec<usize>,
}

/// A door or window between two zones (or a zone and the outside).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opening {
    pub from_zone: ZoneId,
    pub to_zone: OpeningTarget,
    pub rect: Rect,
    pub is_open: bool,
}

impl Opening {
    /// Openings leading outside are escape routes for particles.
    pub fn leads_outside(&self) -> bool {
        self.to_zone == OpeningTarget::Outside
    }
}

/// Wall-mounted AC unit with an extension tube that channels its jet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcUnit {
    pub zone: ZoneId,
    pub rect: Rect,
    pub tube: Rect,
    pub target_temperature: f32,
    /// Flow strength on a 0-1 scale.
    pub flow_strength: f32,
    pub is_active: bool,
}

impl AcUnit {
    /// Center of the outlet face (right edge of the housing).
    pub fn outlet(&self) -> Vec2 {
        Vec2::new(self.rect.x + self.rect.width, self.rect.y + self.rect.height / 2.0)
    }
}

/// Directional fan with a short duct that channels its jet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fan {
    pub id: FanId,
    pub zone: ZoneId,
    pub rect: Rect,
    pub direction: Vec2,
    /// Flow strength on a 0-1 scale.
    pub flow_strength: f32,
    pub is_active: bool,
    pub duct: Rect,
}

/// The apartment: a 9 m × 6 m two-level dwelling.
///
/// Lower floor spans the full width; the upper level splits into a mezzanine
/// and a bedroom separated by a partition wall with a door. The floor plane
/// at y = 3 is impermeable except through the stair gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Apartment {
    pub width: f32,
    pub height: f32,
    /// Height of the floor plane separating the two levels.
    pub floor_height: f32,
    zones: [Zone; 3],
    openings: [Opening; 3],
    pub stair_gap: Rect,
    pub ac_unit: AcUnit,
    fans: [Fan; 2],
}

impl Default for Apartment {
    fn default() -> Self {
        Self::new()
    }
}

impl Apartment {
    pub fn new() -> Self {
        let zones = [
            Zone {
                id: ZoneId::LowerFloor,
                rect: Rect::new(0.0, 0.0, 9.0, 3.0),
                connections: vec![ZoneId::UpperMezzanine],
                temperature: 22.0,
                particles: Vec::new(),
            },
            Zone {
                id: ZoneId::UpperMezzanine,
                rect: Rect::new(0.0, 3.0, 6.0, 3.0),
                connections: vec![ZoneId::UpperBedroom, ZoneId::LowerFloor],
                temperature: 22.0,
                particles: Vec::new(),
            },
            Zone {
                id: ZoneId::UpperBedroom,
                rect: Rect::new(6.0, 3.0, 3.0, 3.0),
                connections: vec![ZoneId::UpperMezzanine],
                temperature: 22.0,
                particles: Vec::new(),
            },
        ];

        let openings = [
            Opening {
                from_zone: ZoneId::UpperMezzanine,
                to_zone: OpeningTarget::Zone(ZoneId::UpperBedroom),
                rect: Rect::new(6.0, 3.0, 0.8, 2.1),
                is_open: true,
            },
            Opening {
                from_zone: ZoneId::LowerFloor,
                to_zone: OpeningTarget::Outside,
                rect: Rect::new(0.0, 0.5, 0.1, 1.5),
                is_open: false,
            },
            Opening {
                from_zone: ZoneId::LowerFloor,
                to_zone: OpeningTarget::Outside,
                rect: Rect::new(8.9, 0.5, 0.1, 1.5),
                is_open: false,
            },
        ];

        let ac_unit = AcUnit {
            zone: ZoneId::UpperMezzanine,
            rect: Rect::new(0.2, 4.0, 0.6, 0.3),
            tube: Rect::new(0.8, 4.05, 0.4, 0.2),
            target_temperature: 16.0,
            flow_strength: 0.5,
            is_active: true,
        };

        let fans = [
            Fan {
                id: FanId::StairFan,
                zone: ZoneId::UpperMezzanine,
                rect: Rect::new(5.3, 5.5, 0.4, 0.4),
                direction: Vec2::new(0.0, -1.0),
                flow_strength: 0.5,
                is_active: false,
                duct: Rect::new(5.35, 5.1, 0.3, 0.4),
            },
            Fan {
                id: FanId::BedroomFan,
                zone: ZoneId::UpperBedroom,
                rect: Rect::new(8.5, 4.5, 0.3, 0.3),
                direction: Vec2::new(-1.0, 0.0),
                flow_strength: 0.5,
                is_active: false,
                duct: Rect::new(8.0, 4.55, 0.5, 0.2),
            },
        ];

        Apartment {
            width: 9.0,
            height: 6.0,
            floor_height: 3.0,
            zones,
            openings,
            stair_gap: Rect::new(4.9, 2.9, 1.2, 0.2),
            ac_unit,
            fans,
        }
    }

    pub fn zone(&self, id: ZoneId) -> &Zone {
        &self.zones[id.index()]
    }

    pub fn zone_mut(&mut self, id: ZoneId) -> &mut Zone {
        &mut self.zones[id.index()]
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn opening(&self, id: OpeningId) -> &Opening {
        &self.openings[id.index()]
    }

    pub fn openings(&self) -> &[Opening] {
        &self.openings
    }

    pub fn fan(&self, id: FanId) -> &Fan {
        &self.fans[id.index()]
    }

    pub fn fans(&self) -> &[Fan] {
        &self.fans
    }

    /// Resolve the zone containing a point.
    ///
    /// Within ±[`FLOOR_BAND`] of the floor plane the point is valid only
    /// inside the stair gap: below the plane it belongs to the lower floor,
    /// at or above to the mezzanine. At floor height outside the gap there
    /// is no zone, which keeps the floor impermeable everywhere but the
    /// stair shaft.
    pub fn zone_at(&self, x: f32, y: f32) -> Option<ZoneId> {
        if y > self.floor_height - FLOOR_BAND && y < self.floor_height + FLOOR_BAND {
            if (self.stair_gap.x..=self.stair_gap.x + self.stair_gap.width).contains(&x) {
                return Some(if y < self.floor_height {
                    ZoneId::LowerFloor
                } else {
                    ZoneId::UpperMezzanine
                });
            }
            return None;
        }

        ZoneId::ALL
            .into_iter()
            .find(|&id| self.zone(id).rect.contains(x, y))
    }

    /// True iff the point is inside the apartment bounds and resolves to a
    /// zone.
    pub fn is_valid_position(&self, x: f32, y: f32) -> bool {
        if !(0.0..=self.width).contains(&x) || !(0.0..=self.height).contains(&y) {
            return false;
        }
        self.zone_at(x, y).is_some()
    }

    pub fn connected_zones(&self, id: ZoneId) -> &[ZoneId] {
        &self.zone(id).connections
    }

    /// Whether a zone pair is joined by the stair shaft.
    pub fn is_stair_connection(&self, a: ZoneId, b: ZoneId) -> bool {
        matches!(
            (a, b),
            (ZoneId::LowerFloor, ZoneId::UpperMezzanine)
                | (ZoneId::UpperMezzanine, ZoneId::LowerFloor)
        )
    }

    /// Total open cross-section between two zones, aggregated from their
    /// connecting openings. The stair shaft substitutes a default area when
    /// no explicit opening applies.
    pub fn open_area_between(&self, a: ZoneId, b: ZoneId) -> f32 {
        let mut area = 0.0;
        for opening in &self.openings {
            let joins = match opening.to_zone {
                OpeningTarget::Zone(to) => {
                    (opening.from_zone == a && to == b) || (opening.from_zone == b && to == a)
                }
                OpeningTarget::Outside => false,
            };
            if joins && opening.is_open {
                area += opening.rect.area();
            }
        }

        if area == 0.0 && self.is_stair_connection(a, b) {
            return STAIR_DEFAULT_FLOW_AREA;
        }
        area
    }

    /// Mean temperature of the particles currently resolved to the zone,
    /// falling back to the zone's smoothed temperature when none are.
    ///
    /// Reads each particle's own zone tag rather than the per-frame
    /// membership lists, which go stale once the liveness filter removes
    /// particles.
    pub fn average_temperature(&self, id: ZoneId, particles: &[AirParticle]) -> f32 {
        let mut sum = 0.0_f32;
        let mut count = 0_u32;
        for particle in particles {
            if particle.zone == Some(id) {
                sum += particle.temperature;
                count += 1;
            }
        }
        if count == 0 {
            return self.zone(id).temperature;
        }
        sum / count as f32
    }

    /// Clear every zone's transient membership list. Called at the start of
    /// each solver frame before reassignment.
    pub fn clear_zone_particles(&mut self) {
        for zone in &mut self.zones {
            zone.particles.clear();
        }
    }

    pub fn set_opening_state(&mut self, id: OpeningId, is_open: bool) {
        debug!(?id, is_open, "opening state changed");
        self.openings[id.index()].is_open = is_open;
    }

    /// Set an opening's height, bounded to [`MAX_OPENING_HEIGHT`].
    pub fn set_opening_height(&mut self, id: OpeningId, height: f32) {
        self.openings[id.index()].rect.height = height.clamp(0.0, MAX_OPENING_HEIGHT);
    }

    /// Update the AC's target temperature and flow strength (0-1). Side
    /// effect only; no physics happens here.
    pub fn set_ac_settings(&mut self, temperature: f32, flow_strength: f32) {
        self.ac_unit.target_temperature = temperature;
        self.ac_unit.flow_strength = flow_strength.clamp(0.0, 1.0);
    }

    pub fn set_ac_active(&mut self, is_active: bool) {
        debug!(is_active, "AC unit toggled");
        self.ac_unit.is_active = is_active;
    }

    pub fn set_fan_active(&mut self, id: FanId, is_active: bool) {
        debug!(?id, is_active, "fan toggled");
        self.fans[id.index()].is_active = is_active;
    }

    pub fn set_fan_flow(&mut self, id: FanId, flow_strength: f32) {
        self.fans[id.index()].flow_strength = flow_strength.clamp(0.0, 1.0);
    }
}
