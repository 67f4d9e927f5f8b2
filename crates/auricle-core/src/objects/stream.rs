//! Seam over the OS spatial-audio API
//!
//! The real implementation wraps the platform's spatial audio client; tests
//! use in-memory fakes. All methods may be called from the pump thread.

use crate::error::SpatialResult;
use crate::types::DspVec;

/// One dynamic audio object owned by the render stream
pub trait SpatialObject: Send {
    /// World-space position for this cycle, engine frame
    fn set_position(&mut self, position: DspVec);

    /// Linear amplitude applied by the OS renderer
    fn set_volume(&mut self, amplitude: f32);

    /// The object's render page for this cycle. Its length is the sample
    /// capacity the object accepts before the next `end_update`.
    fn buffer(&mut self) -> &mut [f32];
}

/// An activated spatial render stream on one output device
pub trait SpatialRenderStream: Send {
    /// Activate a new dynamic object on this stream
    fn activate_object(&mut self) -> SpatialResult<Box<dyn SpatialObject>>;

    /// Bracket one pump pass over the objects
    fn begin_update(&mut self) -> SpatialResult<()>;
    fn end_update(&mut self) -> SpatialResult<()>;

    fn start(&mut self) -> SpatialResult<()>;
    fn stop(&mut self) -> SpatialResult<()>;

    /// Maximum concurrently active dynamic objects
    fn max_objects(&self) -> usize;
}

/// Entry point to the OS spatial-audio service
pub trait SpatialAudioClient: Send {
    /// Id of the current default render device
    fn default_device_id(&self) -> String;

    /// Activate a render stream on the given device. May block briefly;
    /// only called outside the audio hot path.
    fn activate(&mut self, device_id: &str) -> SpatialResult<Box<dyn SpatialRenderStream>>;
}
