//! Host-visible parameter enumerations for both effects
//!
//! Host parameter names are limited to 15 characters.

/// Per-source spatializer parameters, in registration order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpatializerParam {
    /// Additive reverb loudness in dB
    ReverbPowerAdjust,
    /// Multiplier on early/late T60
    DecayTimeScalar,
    /// 0 disables, 1/2/3 select engine quality tiers
    HrtfMode,
    /// Multiplier on combined geometry loss
    OcclusionFactor,
    /// Power applied to the reported distance
    DistanceWarp,
    /// Secondary-arrival floor in dB
    TransmissionDb,
    /// Additive offset to queried outdoorness
    OutdoornessAdjust,
}

impl SpatializerParam {
    pub const COUNT: usize = 7;

    pub fn from_index(index: usize) -> Option<Self> {
        use SpatializerParam::*;
        [
            ReverbPowerAdjust,
            DecayTimeScalar,
            HrtfMode,
            OcclusionFactor,
            DistanceWarp,
            TransmissionDb,
            OutdoornessAdjust,
        ]
        .get(index)
        .copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Shared mixer parameters, in registration order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MixerParam {
    /// Additive reverb loudness applied globally, dB
    ReverbPowerAdjust,
    /// Global multiplier on reverb times
    ReverbTimeScale,
    /// Exactly 1.0 selects the panner engine, anything else binaural
    UsePanner,
}

impl MixerParam {
    pub const COUNT: usize = 3;

    pub fn from_index(index: usize) -> Option<Self> {
        use MixerParam::*;
        [ReverbPowerAdjust, ReverbTimeScale, UsePanner].get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Registration record for one host parameter
#[derive(Clone, Copy, Debug)]
pub struct ParamDef {
    pub name: &'static str,
    pub unit: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub description: &'static str,
}

/// Per-source parameter table, indexed by [`SpatializerParam`]
pub fn spatializer_param_defs() -> &'static [ParamDef; SpatializerParam::COUNT] {
    &[
        ParamDef {
            name: "ReverbAdjust",
            unit: "dB",
            min: -20.0,
            max: 20.0,
            default: 0.0,
            description: "Additive adjustment to reverb power",
        },
        ParamDef {
            name: "RT60Scale",
            unit: "",
            min: 0.0,
            max: 2.0,
            default: 1.0,
            description: "Multiplier on reverb decay times",
        },
        ParamDef {
            name: "HrtfMode",
            unit: "",
            min: 0.0,
            max: 3.0,
            default: 1.0,
            description: "0 disables HRTF, 1-3 select quality",
        },
        ParamDef {
            name: "OcclusionFactor",
            unit: "",
            min: 0.0,
            max: crate::types::MAX_OCCLUSION_FACTOR,
            default: 1.0,
            description: "Multiplier on geometry-driven loss",
        },
        ParamDef {
            name: "DistanceWarp",
            unit: "",
            min: 0.1,
            max: 2.0,
            default: 1.0,
            description: "Power applied to source distance",
        },
        ParamDef {
            name: "Transmission",
            unit: "dB",
            min: -120.0,
            max: 0.0,
            default: crate::types::MIN_TRANSMISSION_DB,
            description: "Through-geometry transmission floor",
        },
        ParamDef {
            name: "OutdoorAdjust",
            unit: "",
            min: -1.0,
            max: 1.0,
            default: 0.0,
            description: "Offset applied to outdoorness",
        },
    ]
}

/// Mixer parameter table, indexed by [`MixerParam`]
pub fn mixer_param_defs() -> &'static [ParamDef; MixerParam::COUNT] {
    &[
        ParamDef {
            name: "Wetness Adjust",
            unit: "dB",
            min: -20.0,
            max: 20.0,
            default: 0.0,
            description: "Global reverb power adjustment",
        },
        ParamDef {
            name: "RT60 Scale",
            unit: "",
            min: 0.0,
            max: 2.0,
            default: 1.0,
            description: "Global reverb time multiplier",
        },
        ParamDef {
            name: "Use Panning",
            unit: "",
            min: 0.0,
            max: 1.0,
            default: 0.0,
            description: "Switch to the panner engine",
        },
    ]
}

/// Parameter vector seeded with registration defaults
pub fn default_spatializer_params() -> [f32; SpatializerParam::COUNT] {
    let defs = spatializer_param_defs();
    std::array::from_fn(|i| defs[i].default)
}

/// Mixer parameter vector seeded with registration defaults
pub fn default_mixer_params() -> [f32; MixerParam::COUNT] {
    let defs = mixer_param_defs();
    std::array::from_fn(|i| defs[i].default)
}
