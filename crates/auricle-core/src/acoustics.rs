//! Room-acoustics query seam
//!
//! The acoustics engine answers per-source queries (arrival direction,
//! direct/reflections loudness, decay times) and a listener outdoorness
//! query, all in its own right-handed Z-up frame. This module owns the
//! world/local transforms supplied by the application, the conversion into
//! that frame, and a per-source debug snapshot of the latest results.

use std::sync::{Arc, Mutex};

use crate::types::{AcousticVec, HostVec, Matrix4};

/// Sentinel the acoustics engine uses for fields it could not compute
pub const ACOUSTICS_FAILURE_CODE: f32 = -1.0e10;

/// One successful acoustics query
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcousticsQueryResult {
    pub direct_delay_seconds: f32,
    pub direct_loudness_db: f32,
    pub direct_azimuth_degrees: f32,
    pub direct_elevation_degrees: f32,
    pub reflections_delay_seconds: f32,
    pub reflections_loudness_db: f32,
    pub early_decay_time_seconds: f32,
    pub reverb_time_seconds: f32,
}

/// Seam to the external acoustics engine
pub trait AcousticsQuery: Send {
    /// Per-source acoustic parameters; positions in the engine's Z-up frame
    fn query(
        &mut self,
        source_position: AcousticVec,
        listener_position: AcousticVec,
    ) -> Option<AcousticsQueryResult>;

    /// Openness estimate in [0, 1] at the listener position
    fn outdoorness(&mut self, listener_position: AcousticVec) -> Option<f32>;
}

/// Latest query result retained for one source, drained by the snapshot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceDebugRecord {
    pub source_id: usize,
    pub source_position: AcousticVec,
    pub listener_position: AcousticVec,
    pub result: AcousticsQueryResult,
    pub outdoorness: f32,
}

/// Convert the engine's polar arrival angles (degrees) to a unit vector in
/// its Z-up frame
pub fn polar_to_cartesian(azimuth_degrees: f32, elevation_degrees: f32) -> AcousticVec {
    let az = azimuth_degrees.to_radians();
    let el = elevation_degrees.to_radians();
    AcousticVec::new(el.sin() * az.cos(), el.sin() * az.sin(), el.cos())
}

/// Application-facing context: transforms, outdoorness cache, debug records
pub struct AcousticsContext {
    backend: Option<Box<dyn AcousticsQuery>>,
    world_to_local: Matrix4,
    local_to_world: Matrix4,
    last_outdoorness: f32,
    debug_records: Vec<SourceDebugRecord>,
}

impl AcousticsContext {
    pub fn new() -> Self {
        Self {
            backend: None,
            world_to_local: Matrix4::IDENTITY,
            local_to_world: Matrix4::IDENTITY,
            last_outdoorness: 0.5,
            debug_records: Vec::new(),
        }
    }

    pub fn with_backend(backend: Box<dyn AcousticsQuery>) -> Self {
        let mut ctx = Self::new();
        ctx.backend = Some(backend);
        ctx
    }

    /// Application transform between host world space and the space the
    /// acoustics data was baked in
    pub fn set_transforms(&mut self, world_to_local: Matrix4, local_to_world: Matrix4) {
        self.world_to_local = world_to_local;
        self.local_to_world = local_to_world;
    }

    pub fn local_to_world(&self) -> &Matrix4 {
        &self.local_to_world
    }

    /// Host world position into the acoustics frame: application transform,
    /// then the Y/Z axis swap
    pub fn to_acoustic_frame(&self, position: HostVec) -> AcousticVec {
        self.world_to_local.multiply_point(position).to_acoustic()
    }

    /// Query acoustic parameters for one source. On success the per-source
    /// debug record is upserted; on failure None, and the caller falls back
    /// to the default parameter path.
    pub fn query_params(
        &mut self,
        source_id: usize,
        source_world: HostVec,
        listener_world: HostVec,
    ) -> Option<AcousticsQueryResult> {
        let source_position = self.to_acoustic_frame(source_world);
        let listener_position = self.to_acoustic_frame(listener_world);
        let result = self.backend.as_mut()?.query(source_position, listener_position)?;
        let record = SourceDebugRecord {
            source_id,
            source_position,
            listener_position,
            result,
            outdoorness: self.last_outdoorness,
        };
        match self.debug_records.iter_mut().find(|r| r.source_id == source_id) {
            Some(existing) => *existing = record,
            None => self.debug_records.push(record),
        }
        Some(result)
    }

    /// Outdoorness at the listener; caches the last successful value
    pub fn query_outdoorness(&mut self, listener_world: HostVec) -> Option<f32> {
        let listener_position = self.to_acoustic_frame(listener_world);
        let value = self.backend.as_mut()?.outdoorness(listener_position)?;
        self.last_outdoorness = value;
        Some(value)
    }

    pub fn last_outdoorness(&self) -> f32 {
        self.last_outdoorness
    }

    /// Move the accumulated per-source records out, leaving the buffer empty
    pub fn take_debug_snapshot(&mut self) -> Vec<SourceDebugRecord> {
        std::mem::take(&mut self.debug_records)
    }

    /// Called when the acoustics data set is reloaded; stale records would
    /// reference probes from the previous bake
    pub fn on_data_reloaded(&mut self) {
        self.debug_records.clear();
        log::info!("acoustics data reloaded, debug snapshot cleared");
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }
}

impl Default for AcousticsContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared acoustics context
pub type SharedAcoustics = Arc<Mutex<AcousticsContext>>;
