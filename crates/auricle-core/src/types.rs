//! Shared types and constants for the spatial render path

/// Audio sample type used throughout
pub type Sample = f32;

/// DSP engine sample rate in Hz
pub const SAMPLE_RATE: u32 = 48_000;

/// Engine processing block size in mono samples (~21 ms at 48 kHz)
pub const QUANTUM: usize = 1024;

/// Number of per-source processing slots in the pool
pub const MAX_SOURCES: usize = 128;

/// Widest output format the engine renders (7.1)
pub const MAX_OUTPUT_CHANNELS: usize = 8;

/// Amplitude below which a source is considered inaudible (-94 dB)
pub const MIN_AUDIBLE_GAIN: f32 = 2.0e-5;

/// Floor for the effective source distance in meters
pub const MIN_SOURCE_DISTANCE: f32 = 0.1;

/// Upper bound of the occlusion-factor parameter
pub const MAX_OCCLUSION_FACTOR: f32 = 2.0;

/// Transmission floor in dB; at or below this the secondary path is disabled
pub const MIN_TRANSMISSION_DB: f32 = -60.0;

/// Early-reflections power used when no acoustics query is available
pub const DEFAULT_EARLY_REFLECTIONS_POWER_DB: f32 = -12.0;

/// Early-reflections 60 dB decay used when no acoustics query is available
pub const DEFAULT_EARLY_REFLECTIONS_T60: f32 = 0.25;

/// Late-reverb 60 dB decay used when no acoustics query is available
pub const DEFAULT_LATE_REVERB_T60: f32 = 0.5;

/// Spatial blend at or below this value keeps the source unspatialized
pub const MIN_SPATIAL_BLEND: f32 = 0.001;

/// Ring fills this many consumer cycles before the render pump may start draining
pub const PREROLL_BUFFERS: usize = 5;

/// Render-pump passes without a host tick before the stream is declared stopped
pub const MAX_PUMP_PASSES_PER_HOST_TICK: u32 = 8;

/// Per-source ring capacity in mono samples for the object backend
pub const RING_SAMPLES: usize = QUANTUM * 4;

/// Minimum alignment in bytes for buffers handed to the engine
pub const MIN_BUFFER_ALIGNMENT: usize = 16;

/// Convert a linear amplitude (0..1] to decibels
#[inline]
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    20.0 * amplitude.log10()
}

/// Convert decibels to a linear amplitude
#[inline]
pub fn db_to_amplitude(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// True for 1, 2, 4, 8, ... Host tick lengths must satisfy this.
#[inline]
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && n & (n - 1) == 0
}

/// Vector in the host's left-handed, Y-up world/listener space
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HostVec {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Vector in the DSP engine's right-handed, Y-up space
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DspVec {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Vector in the acoustics engine's right-handed, Z-up space
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AcousticVec {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl HostVec {
    pub const ZERO: HostVec = HostVec { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Handedness flip into the engine's right-handed frame: negate X and Z
    #[inline]
    pub fn to_dsp(self) -> DspVec {
        DspVec { x: -self.x, y: self.y, z: -self.z }
    }

    /// Axis swap into the acoustics engine's Z-up frame
    #[inline]
    pub fn to_acoustic(self) -> AcousticVec {
        AcousticVec { x: self.x, y: self.z, z: self.y }
    }
}

impl DspVec {
    pub const ZERO: DspVec = DspVec { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector, or zero when the input has no direction
    pub fn normalized_or_zero(self) -> DspVec {
        let len = self.length();
        if len > f32::EPSILON {
            DspVec { x: self.x / len, y: self.y / len, z: self.z / len }
        } else {
            DspVec::ZERO
        }
    }
}

impl AcousticVec {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Axis swap back into the host's Y-up axis order (same frame otherwise)
    #[inline]
    pub fn to_host_axes(self) -> HostVec {
        HostVec { x: self.x, y: self.z, z: self.y }
    }
}

/// Column-major 4x4 transform as supplied by the host
///
/// Element layout matches the host convention: columns are basis vectors,
/// translation lives in elements 12..15.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix4 {
    pub m: [f32; 16],
}

impl Matrix4 {
    pub const IDENTITY: Matrix4 = Matrix4 {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub fn new(m: [f32; 16]) -> Self {
        Self { m }
    }

    /// Pure translation, used in tests to position sources
    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        let mut out = Matrix4::IDENTITY;
        out.m[12] = x;
        out.m[13] = y;
        out.m[14] = z;
        out
    }

    /// Rotation about the Y axis, used in tests to orient the listener
    pub fn from_rotation_y(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        let mut out = Matrix4::IDENTITY;
        out.m[0] = c;
        out.m[2] = -s;
        out.m[8] = s;
        out.m[10] = c;
        out
    }

    /// The translation column
    #[inline]
    pub fn translation(&self) -> HostVec {
        HostVec::new(self.m[12], self.m[13], self.m[14])
    }

    /// Transform a point (rotation + translation)
    pub fn multiply_point(&self, v: HostVec) -> HostVec {
        let m = &self.m;
        HostVec::new(
            m[0] * v.x + m[4] * v.y + m[8] * v.z + m[12],
            m[1] * v.x + m[5] * v.y + m[9] * v.z + m[13],
            m[2] * v.x + m[6] * v.y + m[10] * v.z + m[14],
        )
    }

    /// Transform a direction (rotation only)
    pub fn multiply_vector(&self, v: HostVec) -> HostVec {
        let m = &self.m;
        HostVec::new(
            m[0] * v.x + m[4] * v.y + m[8] * v.z,
            m[1] * v.x + m[5] * v.y + m[9] * v.z,
            m[2] * v.x + m[6] * v.y + m[10] * v.z,
        )
    }

    /// Transform a direction by the transposed rotation block
    ///
    /// For a rigid transform this inverts the rotation, which recovers the
    /// listener's world position from the host's pre-inverted listener matrix:
    /// `pos = -(R^T * t)`.
    pub fn transposed_rotate(&self, v: HostVec) -> HostVec {
        let m = &self.m;
        HostVec::new(
            m[0] * v.x + m[1] * v.y + m[2] * v.z,
            m[4] * v.x + m[5] * v.y + m[6] * v.z,
            m[8] * v.x + m[9] * v.y + m[10] * v.z,
        )
    }
}

/// Four samples in one 16-byte block; the unit of aligned scratch storage
#[derive(Clone, Copy, Debug)]
#[repr(C, align(16))]
struct AlignedBlock([f32; 4]);

// [f32; 4] is exactly 16 bytes, so the align attribute adds no padding.
unsafe impl bytemuck::Zeroable for AlignedBlock {}
unsafe impl bytemuck::Pod for AlignedBlock {}

/// Heap float buffer aligned to [`MIN_BUFFER_ALIGNMENT`], as required for
/// every buffer handed to the DSP engine. Allocated once, never grown.
pub struct AlignedFloats {
    blocks: Vec<AlignedBlock>,
    len: usize,
}

impl AlignedFloats {
    /// Allocate `len` samples of zeroed, aligned storage
    pub fn new(len: usize) -> Self {
        let blocks = vec![AlignedBlock([0.0; 4]); len.div_ceil(4)];
        Self { blocks, len }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &bytemuck::cast_slice(&self.blocks)[..self.len]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut bytemuck::cast_slice_mut(&mut self.blocks)[..self.len]
    }

    /// Zero the whole buffer
    pub fn fill_silence(&mut self) {
        for block in &mut self.blocks {
            *block = AlignedBlock([0.0; 4]);
        }
    }
}
