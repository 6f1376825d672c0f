//! Self-describing JSON metadata export/import.
//!
//! Required top-level keys: `kind`, `module`, `attributes`, `controlled`,
//! `followed`. Round-trip: a record serialized by one version of the engine
//! must be deserializable by the same version without loss.

use crate::base::SweepCore;
use crate::followset::FollowSet;
use crate::kinds::leakage_limiter::LeakageLimiterSweep;
use crate::kinds::listening::ListeningSweep;
use crate::kinds::magnet_coupled::MagnetCoupledSweep;
use crate::kinds::one_axis::OneAxisSweep;
use crate::kinds::simultaneous::SimultaneousSweep;
use crate::kinds::time_only::TimeOnlySweep;
use crate::kinds::two_axis::TwoAxisSweep;
use crate::kinds::SweepKind;
use crate::trajectory::{Trajectory, TrajectoryMode};
use measureit_common::error::MeasureItError;
use measureit_parameter::Parameter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A resolver from instrument identity string to a live [`Parameter`]
/// handle, used by `init_from_metadata`.
///
/// A `Station` in the reference deployment is the object that owns all
/// instrument channels; this crate only needs to resolve identities back
/// into handles, so the contract is a single lookup method.
pub trait Station {
    /// Resolve an instrument identity (as produced by
    /// [`Parameter::identity`]) back into a live parameter handle.
    fn resolve(&self, identity: &str) -> Option<Box<dyn Parameter>>;
}

/// Self-describing sweep metadata record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    /// The sweep kind discriminator, e.g. `"one_axis"`, `"simultaneous"`.
    pub kind: String,
    /// The crate that produced this record.
    pub module: String,
    /// Kind-specific attributes (delays, direction mode, max_time,
    /// back_multiplier, ...).
    pub attributes: Value,
    /// Per controlled parameter: instrument identity + start/stop/step.
    /// `None` for sweep kinds with no controlled parameter (time-only).
    pub controlled: Option<Value>,
    /// Followed parameter name -> instrument identity.
    pub followed: BTreeMap<String, String>,
}

impl Metadata {
    /// Canonicalize by round-tripping through `serde_json::Value`, so two
    /// semantically-equal records compare equal regardless of key order.
    pub fn canonicalize(&self) -> Value {
        serde_json::to_value(self).expect("Metadata always serializes")
    }
}

/// Build the `followed` map from a follow-set's names and identities.
pub fn followed_map(names: &[String], identities: &[String]) -> BTreeMap<String, String> {
    names.iter().cloned().zip(identities.iter().cloned()).collect()
}

/// Resolve an instrument identity via a [`Station`], failing with a
/// [`MeasureItError::Config`] if unknown.
pub fn resolve_or_config_error(
    station: &dyn Station,
    identity: &str,
) -> Result<Box<dyn Parameter>, MeasureItError> {
    station
        .resolve(identity)
        .ok_or_else(|| MeasureItError::Config(format!("unknown parameter identity: {identity}")))
}

/// Reconstruct a [`SweepCore`] from a self-describing [`Metadata`] record,
/// resolving every controlled and follow parameter identity through
/// `station`. The inverse of `SweepCore::export_metadata`.
///
/// # Errors
/// Returns [`MeasureItError::Config`] if `meta.kind` is unrecognized, an
/// identity fails to resolve, or a required attribute is missing or
/// malformed.
pub fn init_from_metadata(meta: &Metadata, station: &dyn Station) -> Result<SweepCore, MeasureItError> {
    let kind = build_kind(meta, station)?;
    let controlled_names = kind.controlled_names();

    let mut follow = FollowSet::new();
    for identity in meta.followed.values() {
        let param = resolve_or_config_error(station, identity)?;
        follow.follow_param(param, &controlled_names)?;
    }

    SweepCore::new(kind, follow)
}

fn build_kind(meta: &Metadata, station: &dyn Station) -> Result<Box<dyn SweepKind>, MeasureItError> {
    match meta.kind.as_str() {
        "one_axis" => Ok(Box::new(build_one_axis(&meta.attributes, meta.controlled.as_ref(), station)?)),
        "simultaneous" => Ok(Box::new(build_simultaneous(meta, station)?)),
        "time_only" => Ok(Box::new(build_time_only(&meta.attributes)?)),
        "listening" => Ok(Box::new(build_listening(&meta.attributes, station)?)),
        "two_axis" => Ok(Box::new(build_two_axis(meta, station)?)),
        "magnet_coupled" => Ok(Box::new(build_magnet_coupled(meta, station)?)),
        "leakage_limiter" => Ok(Box::new(build_leakage_limiter(meta, station)?)),
        other => Err(MeasureItError::Config(format!("unknown sweep kind: {other}"))),
    }
}

fn f64_field(v: &Value, key: &str, kind: &str) -> Result<f64, MeasureItError> {
    v.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| MeasureItError::Config(format!("{kind} metadata missing numeric field '{key}'")))
}

fn str_field<'a>(v: &'a Value, key: &str, kind: &str) -> Result<&'a str, MeasureItError> {
    v.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| MeasureItError::Config(format!("{kind} metadata missing string field '{key}'")))
}

fn parse_mode(s: &str) -> Result<TrajectoryMode, MeasureItError> {
    match s {
        "OneShot" => Ok(TrajectoryMode::OneShot),
        "Bidirectional" => Ok(TrajectoryMode::Bidirectional),
        "Continual" => Ok(TrajectoryMode::Continual),
        other => Err(MeasureItError::Config(format!("unknown trajectory mode: {other}"))),
    }
}

fn build_one_axis(
    attributes: &Value,
    controlled: Option<&Value>,
    station: &dyn Station,
) -> Result<OneAxisSweep, MeasureItError> {
    let controlled = controlled
        .ok_or_else(|| MeasureItError::Config("one_axis metadata missing 'controlled'".to_string()))?;
    let identity = str_field(controlled, "identity", "one_axis")?;
    let param = resolve_or_config_error(station, identity)?;
    let start = f64_field(controlled, "start", "one_axis")?;
    let stop = f64_field(controlled, "stop", "one_axis")?;
    let step = f64_field(controlled, "step", "one_axis")?;
    let mode = parse_mode(str_field(attributes, "mode", "one_axis")?)?;
    let trajectory = Trajectory::new(start, stop, step, mode)?;
    let inter_delay = f64_field(attributes, "inter_delay", "one_axis")?;
    let restart_from_start = attributes.get("restart_from_start").and_then(Value::as_bool).unwrap_or(false);
    Ok(OneAxisSweep::new(param, trajectory, inter_delay, restart_from_start))
}

fn build_simultaneous(meta: &Metadata, station: &dyn Station) -> Result<SimultaneousSweep, MeasureItError> {
    let controlled = meta
        .controlled
        .as_ref()
        .and_then(Value::as_array)
        .ok_or_else(|| MeasureItError::Config("simultaneous metadata missing 'controlled' array".to_string()))?;
    let mode = parse_mode(str_field(&meta.attributes, "mode", "simultaneous")?)?;
    let inter_delay = f64_field(&meta.attributes, "inter_delay", "simultaneous")?;

    let mut axes = Vec::with_capacity(controlled.len());
    for axis in controlled {
        let identity = str_field(axis, "identity", "simultaneous")?;
        let param = resolve_or_config_error(station, identity)?;
        let start = f64_field(axis, "start", "simultaneous")?;
        let stop = f64_field(axis, "stop", "simultaneous")?;
        let step = f64_field(axis, "step", "simultaneous")?;
        axes.push((param, Trajectory::new(start, stop, step, mode)?));
    }
    SimultaneousSweep::new(axes, inter_delay)
}

fn build_time_only(attributes: &Value) -> Result<TimeOnlySweep, MeasureItError> {
    let outer_delay = f64_field(attributes, "outer_delay", "time_only")?;
    let max_time = attributes.get("max_time").and_then(Value::as_f64);
    Ok(TimeOnlySweep::new(outer_delay, max_time))
}

fn build_listening(attributes: &Value, station: &dyn Station) -> Result<ListeningSweep, MeasureItError> {
    let poll_delay = f64_field(attributes, "poll_delay", "listening")?;
    let threshold = f64_field(attributes, "threshold", "listening")?;
    let identity = str_field(attributes, "watched_identity", "listening")?;
    let watched = resolve_or_config_error(station, identity)?;
    Ok(ListeningSweep::new(watched, poll_delay, threshold))
}

fn build_two_axis(meta: &Metadata, station: &dyn Station) -> Result<TwoAxisSweep, MeasureItError> {
    let inner_attrs = meta
        .attributes
        .get("inner")
        .ok_or_else(|| MeasureItError::Config("two_axis metadata missing 'attributes.inner'".to_string()))?;
    let controlled = meta
        .controlled
        .as_ref()
        .ok_or_else(|| MeasureItError::Config("two_axis metadata missing 'controlled'".to_string()))?;
    let inner = build_one_axis(inner_attrs, controlled.get("inner"), station)?;

    let outer = controlled
        .get("outer")
        .ok_or_else(|| MeasureItError::Config("two_axis metadata missing 'controlled.outer'".to_string()))?;
    let outer_identity = str_field(outer, "identity", "two_axis")?;
    let outer_param = resolve_or_config_error(station, outer_identity)?;
    let outer_start = f64_field(outer, "start", "two_axis")?;
    let outer_stop = f64_field(outer, "stop", "two_axis")?;
    let outer_step = f64_field(outer, "step", "two_axis")?;
    let outer_trajectory = Trajectory::new(outer_start, outer_stop, outer_step, TrajectoryMode::OneShot)?;

    let outer_delay = f64_field(&meta.attributes, "outer_delay", "two_axis")?;
    let back_multiplier = meta.attributes.get("back_multiplier").and_then(Value::as_u64).unwrap_or(1) as u32;

    TwoAxisSweep::new(inner, outer_param, outer_trajectory, outer_delay, back_multiplier)
}

fn build_magnet_coupled(meta: &Metadata, station: &dyn Station) -> Result<MagnetCoupledSweep, MeasureItError> {
    let inner_attrs = meta
        .attributes
        .get("inner")
        .ok_or_else(|| MeasureItError::Config("magnet_coupled metadata missing 'attributes.inner'".to_string()))?;
    let controlled = meta
        .controlled
        .as_ref()
        .ok_or_else(|| MeasureItError::Config("magnet_coupled metadata missing 'controlled'".to_string()))?;
    let inner = build_one_axis(inner_attrs, controlled.get("inner"), station)?;

    let ratio = f64_field(&meta.attributes, "ratio", "magnet_coupled")?;
    let coupled_identity = str_field(&meta.attributes, "coupled_identity", "magnet_coupled")?;
    let coupled = resolve_or_config_error(station, coupled_identity)?;

    Ok(MagnetCoupledSweep::new(inner, coupled, ratio))
}

fn build_leakage_limiter(meta: &Metadata, station: &dyn Station) -> Result<LeakageLimiterSweep, MeasureItError> {
    let inner_attrs = meta
        .attributes
        .get("inner")
        .ok_or_else(|| MeasureItError::Config("leakage_limiter metadata missing 'attributes.inner'".to_string()))?;
    // Unlike two_axis/magnet_coupled, leakage_limiter's controlled
    // descriptor delegates straight to the inner one-axis sweep rather
    // than nesting it under an "inner" key.
    let inner = build_one_axis(inner_attrs, meta.controlled.as_ref(), station)?;

    let limit = f64_field(&meta.attributes, "limit", "leakage_limiter")?;
    let guard_identity = str_field(&meta.attributes, "guard_identity", "leakage_limiter")?;
    let guard = resolve_or_config_error(station, guard_identity)?;
    let max_flips = meta.attributes.get("max_flips").and_then(Value::as_u64).unwrap_or(1) as u32;

    Ok(LeakageLimiterSweep::new(inner, guard, limit, max_flips))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_ignores_field_construction_order() {
        let a = Metadata {
            kind: "one_axis".to_string(),
            module: "measureit_sweep".to_string(),
            attributes: serde_json::json!({"inter_delay": 0.01}),
            controlled: Some(serde_json::json!({"name": "gate"})),
            followed: followed_map(&["i".to_string()], &["dmm.ch1".to_string()]),
        };
        let b = a.clone();
        assert_eq!(a.canonicalize(), b.canonicalize());
    }

    struct NullStation;
    impl Station for NullStation {
        fn resolve(&self, _identity: &str) -> Option<Box<dyn Parameter>> {
            None
        }
    }

    #[test]
    fn resolve_unknown_identity_is_config_error() {
        let err = resolve_or_config_error(&NullStation, "missing.ch0").unwrap_err();
        assert!(matches!(err, MeasureItError::Config(_)));
    }

    struct TableStation {
        channels: std::collections::HashMap<&'static str, f64>,
    }

    impl Station for TableStation {
        fn resolve(&self, identity: &str) -> Option<Box<dyn Parameter>> {
            let initial = *self.channels.get(identity)?;
            Some(Box::new(measureit_parameter::SimulatedParameter::new(identity, "V", initial)))
        }
    }

    #[test]
    fn init_from_metadata_round_trips_a_one_axis_sweep() {
        use crate::followset::FollowSet;
        use crate::trajectory::{Trajectory, TrajectoryMode};

        let station = TableStation {
            channels: [("gate.ch0", 0.0), ("dmm.ch1", 0.0)].into_iter().collect(),
        };
        let param = station.resolve("gate.ch0").unwrap();
        let traj = Trajectory::new(0.0, 1.0, 0.5, TrajectoryMode::OneShot).unwrap();
        let kind = OneAxisSweep::new(param, traj, 0.0, true);

        let mut follow = FollowSet::new();
        follow.follow_param(station.resolve("dmm.ch1").unwrap(), &["gate.ch0".to_string()]).unwrap();

        let original = SweepCore::new(Box::new(kind), follow).unwrap();
        let meta = original.export_metadata();

        let rebuilt = init_from_metadata(&meta, &station).unwrap();
        let meta2 = rebuilt.export_metadata();

        assert_eq!(meta.canonicalize(), meta2.canonicalize());
    }

    #[test]
    fn init_from_metadata_rejects_unknown_kind() {
        let meta = Metadata {
            kind: "not_a_real_kind".to_string(),
            module: "measureit_sweep".to_string(),
            attributes: serde_json::json!({}),
            controlled: None,
            followed: BTreeMap::new(),
        };
        let station = TableStation { channels: std::collections::HashMap::new() };
        let err = init_from_metadata(&meta, &station).unwrap_err();
        assert!(matches!(err, MeasureItError::Config(_)));
    }
}
