//! Airflow Simulation Core Library
//!
//! Approximates convective airflow and thermal mixing inside a small
//! two-level apartment with a discrete particle model: thousands of
//! lightweight air parcels carry temperature and velocity, are advected by
//! simplified buoyancy/drag physics, are channeled by an AC unit and two
//! ducted fans, and exchange heat across zone boundaries.
//!
//! This is a stylized, explainable heuristic, not a CFD solver: there is no
//! pressure field and no mesh. Zone temperature differences stand in for
//! pressure, and inter-zone transport biases particle trajectories instead
//! of conserving mass.
//!
//! The external driver supplies the per-frame time delta; everything here is
//! single-threaded and frame-stepped.

pub mod apartment;
pub mod geometry;
pub mod particle;
pub mod simulation;
pub mod solver;

// Re-export the public surface
pub use apartment::{
    AcUnit, Apartment, Fan, FanId, Opening, OpeningId, OpeningTarget, Zone, ZoneId,
};
pub use geometry::{Rect, Vec2};
pub use particle::AirParticle;
pub use simulation::AirflowSimulation;
pub use solver::FlowSolver;
