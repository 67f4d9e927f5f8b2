//! Translation from host state to the engine's acoustic-parameter record
//!
//! Two paths produce the record each tick: the default path when no
//! acoustics query is available, and the queried path which folds the
//! acoustics engine's arrival and loudness data into the same record.
//! All handedness conversion happens here, exactly once per record: host
//! listener-local vectors cross into the engine frame via `HostVec::to_dsp`.

use crate::acoustics::{polar_to_cartesian, AcousticsQueryResult};
use crate::hrtf::{AcousticParameters, HrtfQuality};
use crate::spatializer::params::SpatializerParam;
use crate::types::{
    amplitude_to_db, HostVec, Matrix4, DEFAULT_EARLY_REFLECTIONS_POWER_DB,
    DEFAULT_EARLY_REFLECTIONS_T60, DEFAULT_LATE_REVERB_T60, MIN_SOURCE_DISTANCE,
    MIN_TRANSMISSION_DB,
};

/// Everything the translator needs from the effect instance and the host
pub struct TranslationInputs<'a> {
    pub source_matrix: &'a Matrix4,
    pub listener_matrix: &'a Matrix4,
    pub params: &'a [f32; SpatializerParam::COUNT],
    /// Distance last reported through the attenuation callback
    pub source_distance: f32,
    /// Attenuation last reported through the attenuation callback
    pub dry_distance_attenuation: f32,
    pub global_reverb_power_db: f32,
    pub global_reverb_time_scale: f32,
}

impl TranslationInputs<'_> {
    fn param(&self, p: SpatializerParam) -> f32 {
        self.params[p.index()]
    }
}

/// Source world position: the translation column of its transform
pub fn source_world_position(source_matrix: &Matrix4) -> HostVec {
    source_matrix.translation()
}

/// Listener world position recovered from the pre-inverted listener matrix:
/// `pos = -(R^T * t)`
pub fn listener_world_position(listener_matrix: &Matrix4) -> HostVec {
    let t = listener_matrix.translation();
    let r = listener_matrix.transposed_rotate(t);
    HostVec::new(-r.x, -r.y, -r.z)
}

/// Listener-local direction toward the source, host handedness
pub fn listener_to_source_direction(source_matrix: &Matrix4, listener_matrix: &Matrix4) -> HostVec {
    listener_matrix.multiply_point(source_world_position(source_matrix))
}

/// Default path: no acoustics engine, or the query failed
pub fn translate_default(inputs: &TranslationInputs<'_>) -> AcousticParameters {
    let direction = listener_to_source_direction(inputs.source_matrix, inputs.listener_matrix);
    let distance_power_db = amplitude_to_db(inputs.dry_distance_attenuation);
    let t60_scale =
        inputs.param(SpatializerParam::DecayTimeScalar) * inputs.global_reverb_time_scale;

    AcousticParameters {
        primary_arrival_direction: direction.to_dsp().normalized_or_zero(),
        primary_arrival_geometry_power_db: 0.0,
        primary_arrival_distance_power_db: distance_power_db,
        secondary_arrival_direction: crate::types::DspVec::ZERO,
        secondary_arrival_geometry_power_db: -120.0,
        secondary_arrival_distance_power_db: 0.0,
        effective_source_distance: inputs.source_distance.max(MIN_SOURCE_DISTANCE),
        early_reflections_power_db: DEFAULT_EARLY_REFLECTIONS_POWER_DB
            + distance_power_db
            + inputs.param(SpatializerParam::ReverbPowerAdjust)
            + inputs.global_reverb_power_db,
        early_reflections_60db_decay_seconds: DEFAULT_EARLY_REFLECTIONS_T60 * t60_scale,
        late_reverb_60db_decay_seconds: DEFAULT_LATE_REVERB_T60 * t60_scale,
        outdoorness: (0.5 + inputs.param(SpatializerParam::OutdoornessAdjust)).clamp(0.0, 1.0),
        quality: HrtfQuality::from_param(inputs.param(SpatializerParam::HrtfMode)),
    }
}

/// Queried path: fold a successful acoustics query into the record.
///
/// `outdoorness` is the engine's listener-openness estimate and
/// `local_to_world` the application transform the bake was made under.
pub fn translate_queried(
    inputs: &TranslationInputs<'_>,
    query: &AcousticsQueryResult,
    outdoorness: f32,
    local_to_world: &Matrix4,
) -> AcousticParameters {
    let occlusion_factor = inputs.param(SpatializerParam::OcclusionFactor);
    let occlusion_actual = query.direct_loudness_db.max(query.reflections_loudness_db);
    let obstruction_db = query.direct_loudness_db - occlusion_actual;
    let wet_level_db = query.reflections_loudness_db - occlusion_actual;
    let occlusion_db = occlusion_actual * occlusion_factor;

    // Arrival direction: acoustics polar -> acoustics cartesian -> bake-local
    // axes -> world -> listener -> engine frame
    let arrival_local = polar_to_cartesian(query.direct_azimuth_degrees, query.direct_elevation_degrees)
        .to_host_axes();
    let arrival_world = local_to_world.multiply_vector(arrival_local);
    let arrival_listener = inputs.listener_matrix.multiply_vector(arrival_world);
    let primary_direction = arrival_listener.to_dsp().normalized_or_zero();

    let primary_geometry_db = occlusion_db + obstruction_db;
    let distance_power_db = amplitude_to_db(inputs.dry_distance_attenuation);

    // Secondary (transmission) path shares the direct line-of-sight direction
    let transmission_db = inputs.param(SpatializerParam::TransmissionDb);
    let transmission_gate = MIN_TRANSMISSION_DB * occlusion_factor;
    let (secondary_direction, secondary_geometry_db, secondary_distance_db) =
        if transmission_db > transmission_gate {
            let direct = listener_to_source_direction(inputs.source_matrix, inputs.listener_matrix);
            (
                direct.to_dsp().normalized_or_zero(),
                transmission_db.min(transmission_gate - primary_geometry_db),
                distance_power_db,
            )
        } else {
            (crate::types::DspVec::ZERO, -120.0, 0.0)
        };

    let effective_distance = inputs
        .source_distance
        .powf(inputs.param(SpatializerParam::DistanceWarp))
        .max(MIN_SOURCE_DISTANCE);
    let drr_adjust = distance_power_db + amplitude_to_db(effective_distance);
    let t60_scale =
        inputs.param(SpatializerParam::DecayTimeScalar) * inputs.global_reverb_time_scale;

    AcousticParameters {
        primary_arrival_direction: primary_direction,
        primary_arrival_geometry_power_db: primary_geometry_db,
        primary_arrival_distance_power_db: distance_power_db,
        secondary_arrival_direction: secondary_direction,
        secondary_arrival_geometry_power_db: secondary_geometry_db,
        secondary_arrival_distance_power_db: secondary_distance_db,
        effective_source_distance: effective_distance,
        early_reflections_power_db: occlusion_db
            + wet_level_db
            + drr_adjust
            + inputs.param(SpatializerParam::ReverbPowerAdjust)
            + inputs.global_reverb_power_db,
        early_reflections_60db_decay_seconds: query.early_decay_time_seconds * t60_scale,
        late_reverb_60db_decay_seconds: query.reverb_time_seconds * t60_scale,
        outdoorness: (outdoorness + inputs.param(SpatializerParam::OutdoornessAdjust))
            .clamp(0.0, 1.0),
        quality: HrtfQuality::from_param(inputs.param(SpatializerParam::HrtfMode)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatializer::params::default_spatializer_params;
    use crate::types::DspVec;

    fn inputs<'a>(
        source: &'a Matrix4,
        listener: &'a Matrix4,
        params: &'a [f32; SpatializerParam::COUNT],
    ) -> TranslationInputs<'a> {
        TranslationInputs {
            source_matrix: source,
            listener_matrix: listener,
            params,
            source_distance: 2.0,
            dry_distance_attenuation: 0.5,
            global_reverb_power_db: 0.0,
            global_reverb_time_scale: 1.0,
        }
    }

    fn a_query() -> AcousticsQueryResult {
        AcousticsQueryResult {
            direct_delay_seconds: 0.005,
            direct_loudness_db: -6.0,
            direct_azimuth_degrees: 0.0,
            direct_elevation_degrees: 90.0,
            reflections_delay_seconds: 0.01,
            reflections_loudness_db: -12.0,
            early_decay_time_seconds: 0.4,
            reverb_time_seconds: 1.0,
        }
    }

    #[test]
    fn test_default_path_handedness_flip_only() {
        // Identity listener: a source at host (x, y, z) arrives from
        // (-x, y, -z) normalised in the engine frame
        let source = Matrix4::from_translation(1.0, 2.0, 2.0);
        let listener = Matrix4::IDENTITY;
        let params = default_spatializer_params();
        let record = translate_default(&inputs(&source, &listener, &params));
        let d = record.primary_arrival_direction;
        assert!((d.x - (-1.0 / 3.0)).abs() < 1e-5);
        assert!((d.y - (2.0 / 3.0)).abs() < 1e-5);
        assert!((d.z - (-2.0 / 3.0)).abs() < 1e-5);
        assert!((d.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_default_path_powers() {
        let source = Matrix4::from_translation(0.0, 1.0, 0.0);
        let listener = Matrix4::IDENTITY;
        let params = default_spatializer_params();
        let record = translate_default(&inputs(&source, &listener, &params));
        assert_eq!(record.primary_arrival_geometry_power_db, 0.0);
        assert!((record.primary_arrival_distance_power_db - amplitude_to_db(0.5)).abs() < 1e-5);
        assert_eq!(record.secondary_arrival_direction, DspVec::ZERO);
        assert!(
            (record.early_reflections_power_db
                - (DEFAULT_EARLY_REFLECTIONS_POWER_DB + amplitude_to_db(0.5)))
            .abs()
                < 1e-5
        );
        assert_eq!(record.effective_source_distance, 2.0);
    }

    #[test]
    fn test_outdoorness_always_clamped() {
        let source = Matrix4::from_translation(0.0, 1.0, 0.0);
        let listener = Matrix4::IDENTITY;
        let mut params = default_spatializer_params();
        params[SpatializerParam::OutdoornessAdjust.index()] = 1.0;
        let record = translate_default(&inputs(&source, &listener, &params));
        assert_eq!(record.outdoorness, 1.0);

        params[SpatializerParam::OutdoornessAdjust.index()] = -1.0;
        let record = translate_queried(
            &inputs(&source, &listener, &params),
            &a_query(),
            0.3,
            &Matrix4::IDENTITY,
        );
        assert_eq!(record.outdoorness, 0.0);
    }

    #[test]
    fn test_queried_occlusion_split() {
        let source = Matrix4::from_translation(0.0, 0.0, 1.0);
        let listener = Matrix4::IDENTITY;
        let mut params = default_spatializer_params();
        params[SpatializerParam::OcclusionFactor.index()] = 2.0;
        let record = translate_queried(
            &inputs(&source, &listener, &params),
            &a_query(),
            0.5,
            &Matrix4::IDENTITY,
        );
        // occlusionActual = max(-6, -12) = -6; obstruction = 0
        // geometry = -6 * 2 + 0 = -12
        assert!((record.primary_arrival_geometry_power_db - (-12.0)).abs() < 1e-5);
    }

    #[test]
    fn test_queried_arrival_direction_from_polar() {
        // Azimuth 0, elevation 90 is +X in the acoustics frame; with identity
        // transforms that is host +X, engine -X
        let source = Matrix4::from_translation(0.0, 0.0, 1.0);
        let listener = Matrix4::IDENTITY;
        let params = default_spatializer_params();
        let record = translate_queried(
            &inputs(&source, &listener, &params),
            &a_query(),
            0.5,
            &Matrix4::IDENTITY,
        );
        let d = record.primary_arrival_direction;
        assert!((d.x - (-1.0)).abs() < 1e-5);
        assert!(d.y.abs() < 1e-5);
        assert!(d.z.abs() < 1e-5);
    }

    #[test]
    fn test_secondary_path_gating() {
        let source = Matrix4::from_translation(0.0, 0.0, 4.0);
        let listener = Matrix4::IDENTITY;
        let mut params = default_spatializer_params();

        // Default transmission (-60) with factor 1 sits on the gate: disabled
        let record = translate_queried(
            &inputs(&source, &listener, &params),
            &a_query(),
            0.5,
            &Matrix4::IDENTITY,
        );
        assert_eq!(record.secondary_arrival_direction, DspVec::ZERO);
        assert_eq!(record.secondary_arrival_geometry_power_db, -120.0);

        // Raise the factor: gate drops to -120, the path opens along the
        // direct line of sight
        params[SpatializerParam::OcclusionFactor.index()] = 2.0;
        let record = translate_queried(
            &inputs(&source, &listener, &params),
            &a_query(),
            0.5,
            &Matrix4::IDENTITY,
        );
        let d = record.secondary_arrival_direction;
        assert!((d.z - (-1.0)).abs() < 1e-5);
        // geometry = min(-60, -120 - primaryGeom) with primaryGeom = -12
        assert!((record.secondary_arrival_geometry_power_db - (-108.0)).abs() < 1e-5);
        assert_eq!(
            record.secondary_arrival_distance_power_db,
            record.primary_arrival_distance_power_db
        );
    }

    #[test]
    fn test_distance_warp_and_floor() {
        let source = Matrix4::from_translation(0.0, 0.0, 1.0);
        let listener = Matrix4::IDENTITY;
        let mut params = default_spatializer_params();
        params[SpatializerParam::DistanceWarp.index()] = 2.0;
        let mut ti = inputs(&source, &listener, &params);
        ti.source_distance = 3.0;
        let record = translate_queried(&ti, &a_query(), 0.5, &Matrix4::IDENTITY);
        assert!((record.effective_source_distance - 9.0).abs() < 1e-5);

        // Very near sources clamp to the minimum distance
        ti.source_distance = 0.01;
        let record = translate_queried(&ti, &a_query(), 0.5, &Matrix4::IDENTITY);
        assert_eq!(record.effective_source_distance, MIN_SOURCE_DISTANCE);
    }

    #[test]
    fn test_listener_world_position_round_trip() {
        // Host gives us the inverted listener transform; recover the world
        // position for the acoustics query
        let world_pos = HostVec::new(3.0, 1.0, -2.0);
        // Inverse of a pure translation is translation by the negation
        let inverted = Matrix4::from_translation(-world_pos.x, -world_pos.y, -world_pos.z);
        let recovered = listener_world_position(&inverted);
        assert!((recovered.x - world_pos.x).abs() < 1e-5);
        assert!((recovered.y - world_pos.y).abs() < 1e-5);
        assert!((recovered.z - world_pos.z).abs() < 1e-5);
    }

    #[test]
    fn test_rotated_listener_direction() {
        // Listener yawed 90 degrees: a source ahead in world space arrives
        // from the side in listener space
        let source = Matrix4::from_translation(0.0, 0.0, 1.0);
        let listener = Matrix4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let dir = listener_to_source_direction(&source, &listener);
        assert!((dir.x - 1.0).abs() < 1e-5);
        assert!(dir.z.abs() < 1e-5);
    }
}
