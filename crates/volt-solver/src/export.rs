//! Export points: the solved-state snapshots a `Simulation::run` hands to
//! the caller one at a time, per §6.1. Kept as a plain push-style sink
//! rather than an iterator/stream so the driver decides exactly when a
//! point is final (after `Behavior::accept` has already run for a
//! transient step) without the caller being able to hold a point open
//! across the next one.

use std::collections::HashMap;

use faer::c64;

/// One solved real-valued snapshot: every live (non-ground) variable's
/// name mapped to its value, tagged with a simulation time for transient
/// analyses or `None` for OP/DC.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPoint {
    pub time: Option<f64>,
    pub values: HashMap<String, f64>,
}

/// One solved complex-valued snapshot from an AC sweep, tagged with the
/// frequency it was solved at.
#[derive(Debug, Clone, PartialEq)]
pub struct PhasorExportPoint {
    pub frequency: f64,
    pub values: HashMap<String, c64>,
}

/// Consumes real-valued export points as a driver produces them.
pub trait ExportSink {
    fn accept(&mut self, point: ExportPoint);
}

/// Consumes phasor export points as the AC driver produces them. Kept
/// separate from `ExportSink` since its value type is complex, not real.
pub trait PhasorExportSink {
    fn accept(&mut self, point: PhasorExportPoint);
}

/// The simplest sink: just buffers every point it is handed, in order.
#[derive(Debug, Default)]
pub struct VecSink {
    pub points: Vec<ExportPoint>,
}

impl ExportSink for VecSink {
    fn accept(&mut self, point: ExportPoint) {
        self.points.push(point);
    }
}

/// Phasor counterpart to `VecSink`.
#[derive(Debug, Default)]
pub struct PhasorVecSink {
    pub points: Vec<PhasorExportPoint>,
}

impl PhasorExportSink for PhasorVecSink {
    fn accept(&mut self, point: PhasorExportPoint) {
        self.points.push(point);
    }
}
