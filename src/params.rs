//! Parameter Store
//!
//! Every engine parameter lives in an `AtomicU32` holding the bit pattern of
//! an `f32`. The control thread writes through [`ParameterStore::set_param`]
//! (by name, with JSON values) or [`ParameterStore::set`] (by id); the audio
//! thread takes one [`ParamSnapshot`] per block with relaxed loads. There is
//! no lock anywhere on either path.
//!
//! Names follow the instrument's original parameter identifiers
//! (`osc1Level`, `noiseType`, ...), so host-side glue can map them 1:1.

use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::{Map, Value};

use crate::dsp::{AdsrParams, NoiseType, Waveform};
use crate::error::{Result, StrataError};

// ============================================================================
// Parameter Table
// ============================================================================

/// How a parameter's `f32` storage is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Continuous value in [min, max]
    Float,
    /// 0.0 = off, 1.0 = on
    Bool,
    /// Index into the given option names
    Choice(&'static [&'static str]),
}

/// Static description of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub kind: ParamKind,
}

impl ParamSpec {
    const fn float(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            min,
            max,
            default,
            kind: ParamKind::Float,
        }
    }

    const fn toggle(name: &'static str, default: bool) -> Self {
        Self {
            name,
            min: 0.0,
            max: 1.0,
            default: if default { 1.0 } else { 0.0 },
            kind: ParamKind::Bool,
        }
    }

    const fn choice(
        name: &'static str,
        options: &'static [&'static str],
        last: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            min: 0.0,
            max: last,
            default,
            kind: ParamKind::Choice(options),
        }
    }

    /// Clamp and quantize a raw value to what this parameter can hold.
    /// NaN maps to the default.
    pub fn sanitize(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        match self.kind {
            ParamKind::Float => value.clamp(self.min, self.max),
            ParamKind::Bool => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ParamKind::Choice(_) => value.round().clamp(self.min, self.max),
        }
    }
}

/// Number of engine parameters
pub const PARAM_COUNT: usize = 25;

/// Identifier for every engine parameter. Discriminants index [`PARAM_SPECS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Osc1Enable,
    Osc1Level,
    Osc1Pan,
    Osc1Waveform,
    Osc1Detune,
    SubEnable,
    SubLevel,
    SubPan,
    SubHarmonics,
    SubWarmth,
    NoiseEnable,
    NoiseLevel,
    NoisePan,
    NoiseType,
    NoiseFilterCutoff,
    NoiseFilterMod,
    NoiseAtmosphere,
    SamplerEnable,
    SamplerLevel,
    SamplerPan,
    SamplerLoop,
    EnvAttack,
    EnvDecay,
    EnvSustain,
    EnvRelease,
}

/// Ranges and defaults, in `ParamId` order
pub static PARAM_SPECS: [ParamSpec; PARAM_COUNT] = [
    ParamSpec::toggle("osc1Enable", true),
    ParamSpec::float("osc1Level", 0.0, 1.0, 0.7),
    ParamSpec::float("osc1Pan", -1.0, 1.0, 0.0),
    ParamSpec::choice("osc1Waveform", &Waveform::NAMES, 3.0, 2.0),
    ParamSpec::float("osc1Detune", -50.0, 50.0, 5.0),
    ParamSpec::toggle("subEnable", true),
    ParamSpec::float("subLevel", 0.0, 1.0, 0.3),
    ParamSpec::float("subPan", -1.0, 1.0, 0.0),
    ParamSpec::float("subHarmonics", 0.0, 0.5, 0.2),
    ParamSpec::float("subWarmth", 0.0, 1.0, 0.5),
    ParamSpec::toggle("noiseEnable", true),
    ParamSpec::float("noiseLevel", 0.0, 1.0, 0.4),
    ParamSpec::float("noisePan", -1.0, 1.0, 0.0),
    ParamSpec::choice("noiseType", &NoiseType::NAMES, 2.0, 1.0),
    ParamSpec::float("noiseFilterCutoff", 500.0, 8000.0, 2000.0),
    ParamSpec::float("noiseFilterMod", 0.0, 1.0, 0.5),
    ParamSpec::float("noiseAtmosphere", 0.0, 1.0, 0.8),
    ParamSpec::toggle("samplerEnable", true),
    ParamSpec::float("samplerLevel", 0.0, 1.0, 0.8),
    ParamSpec::float("samplerPan", -1.0, 1.0, 0.0),
    ParamSpec::toggle("samplerLoop", false),
    ParamSpec::float("envAttack", 0.0, 10.0, 0.5),
    ParamSpec::float("envDecay", 0.0, 10.0, 0.5),
    ParamSpec::float("envSustain", 0.0, 1.0, 0.8),
    ParamSpec::float("envRelease", 0.0, 20.0, 1.5),
];

impl ParamId {
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::Osc1Enable,
        ParamId::Osc1Level,
        ParamId::Osc1Pan,
        ParamId::Osc1Waveform,
        ParamId::Osc1Detune,
        ParamId::SubEnable,
        ParamId::SubLevel,
        ParamId::SubPan,
        ParamId::SubHarmonics,
        ParamId::SubWarmth,
        ParamId::NoiseEnable,
        ParamId::NoiseLevel,
        ParamId::NoisePan,
        ParamId::NoiseType,
        ParamId::NoiseFilterCutoff,
        ParamId::NoiseFilterMod,
        ParamId::NoiseAtmosphere,
        ParamId::SamplerEnable,
        ParamId::SamplerLevel,
        ParamId::SamplerPan,
        ParamId::SamplerLoop,
        ParamId::EnvAttack,
        ParamId::EnvDecay,
        ParamId::EnvSustain,
        ParamId::EnvRelease,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static ParamSpec {
        &PARAM_SPECS[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Look up a parameter by its external name (exact match)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }
}

// ============================================================================
// Parameter Store
// ============================================================================

/// Lock-free parameter storage shared between control and audio threads
#[derive(Debug)]
pub struct ParameterStore {
    values: [AtomicU32; PARAM_COUNT],
}

impl ParameterStore {
    /// Create a store holding every parameter's default
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|i| AtomicU32::new(PARAM_SPECS[i].default.to_bits())),
        }
    }

    /// Store a value, clamped to the parameter's range
    pub fn set(&self, id: ParamId, value: f32) {
        let value = id.spec().sanitize(value);
        self.values[id.index()].store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Restore every parameter to its default
    pub fn reset_to_defaults(&self) {
        for id in ParamId::ALL {
            self.set(id, id.spec().default);
        }
    }

    /// Set a parameter by name from a JSON value
    ///
    /// Floats take numbers. Toggles take booleans or numbers (non-zero is on).
    /// Choices take an option name (case-insensitive) or an index.
    ///
    /// # Errors
    /// * `UnknownParameter` - No parameter has this name
    /// * `InvalidParameterValue` - The value has the wrong JSON type or names no option
    pub fn set_param(&self, name: &str, value: &Value) -> Result<()> {
        let id = ParamId::from_name(name).ok_or_else(|| StrataError::UnknownParameter {
            name: name.to_string(),
        })?;
        let spec = id.spec();

        let invalid = |expected: &'static str| StrataError::InvalidParameterValue {
            name: name.to_string(),
            expected,
            found: value.to_string(),
        };

        let raw = match (spec.kind, value) {
            (ParamKind::Float, Value::Number(n)) => n.as_f64().ok_or_else(|| invalid("number"))? as f32,
            (ParamKind::Float, _) => return Err(invalid("number")),

            (ParamKind::Bool, Value::Bool(b)) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            (ParamKind::Bool, Value::Number(n)) => match n.as_f64() {
                Some(v) if v != 0.0 => 1.0,
                Some(_) => 0.0,
                None => return Err(invalid("boolean")),
            },
            (ParamKind::Bool, _) => return Err(invalid("boolean")),

            (ParamKind::Choice(options), Value::String(s)) => options
                .iter()
                .position(|opt| opt.eq_ignore_ascii_case(s))
                .ok_or_else(|| invalid("option name"))? as f32,
            (ParamKind::Choice(_), Value::Number(n)) => {
                n.as_f64().ok_or_else(|| invalid("option index"))? as f32
            }
            (ParamKind::Choice(_), _) => return Err(invalid("option name or index")),
        };

        self.set(id, raw);
        Ok(())
    }

    /// Apply every entry of a JSON object, stopping at the first error
    pub fn apply_json(&self, values: &Value) -> Result<()> {
        let object = values.as_object().ok_or_else(|| StrataError::InvalidParameterValue {
            name: "<parameters>".to_string(),
            expected: "object",
            found: values.to_string(),
        })?;
        for (name, value) in object {
            self.set_param(name, value)?;
        }
        Ok(())
    }

    /// All current values as a JSON object keyed by parameter name
    ///
    /// Toggles are reported as booleans and choices by option name.
    pub fn get_params(&self) -> Value {
        let mut map = Map::new();
        for id in ParamId::ALL {
            let spec = id.spec();
            let value = self.get(id);
            let json = match spec.kind {
                ParamKind::Float => serde_json::json!(value),
                ParamKind::Bool => Value::Bool(value >= 0.5),
                ParamKind::Choice(options) => {
                    let index = (value as usize).min(options.len() - 1);
                    Value::String(options[index].to_string())
                }
            };
            map.insert(spec.name.to_string(), json);
        }
        Value::Object(map)
    }

    /// Copy every value out with relaxed loads
    ///
    /// Called once per block on the audio thread.
    #[inline]
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            values: std::array::from_fn(|i| f32::from_bits(self.values[i].load(Ordering::Relaxed))),
        }
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Plain copy of all parameter values, read by the mixer for one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSnapshot {
    values: [f32; PARAM_COUNT],
}

impl ParamSnapshot {
    /// Snapshot holding every default, without a store
    pub fn defaults() -> Self {
        Self {
            values: std::array::from_fn(|i| PARAM_SPECS[i].default),
        }
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        self.values[id.index()]
    }

    #[inline]
    pub fn flag(&self, id: ParamId) -> bool {
        self.get(id) >= 0.5
    }

    #[inline]
    pub fn choice(&self, id: ParamId) -> usize {
        self.get(id).max(0.0) as usize
    }

    pub fn waveform(&self) -> Waveform {
        Waveform::from_index(self.choice(ParamId::Osc1Waveform))
    }

    pub fn noise_type(&self) -> NoiseType {
        NoiseType::from_index(self.choice(ParamId::NoiseType))
    }

    pub fn adsr(&self) -> AdsrParams {
        AdsrParams::new(
            self.get(ParamId::EnvAttack),
            self.get(ParamId::EnvDecay),
            self.get(ParamId::EnvSustain),
            self.get(ParamId::EnvRelease),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_matches_ids() {
        for (i, id) in ParamId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(ParamId::from_name(id.name()), Some(*id));
            let spec = id.spec();
            assert!(spec.min <= spec.default && spec.default <= spec.max, "{}", spec.name);
            if let ParamKind::Choice(options) = spec.kind {
                assert_eq!(spec.max as usize, options.len() - 1, "{}", spec.name);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let store = ParameterStore::new();
        assert_eq!(store.get(ParamId::Osc1Level), 0.7);
        assert_eq!(store.get(ParamId::NoiseFilterCutoff), 2000.0);
        let snap = store.snapshot();
        assert_eq!(snap.waveform(), Waveform::Triangle);
        assert_eq!(snap.noise_type(), NoiseType::Pink);
        assert!(snap.flag(ParamId::SubEnable));
        assert!(!snap.flag(ParamId::SamplerLoop));
        assert_eq!(snap, ParamSnapshot::defaults());
    }

    #[test]
    fn test_set_clamps() {
        let store = ParameterStore::new();
        store.set(ParamId::Osc1Level, 3.0);
        assert_eq!(store.get(ParamId::Osc1Level), 1.0);
        store.set(ParamId::Osc1Pan, -7.0);
        assert_eq!(store.get(ParamId::Osc1Pan), -1.0);
        store.set(ParamId::Osc1Detune, 80.0);
        assert_eq!(store.get(ParamId::Osc1Detune), 50.0);
        store.set(ParamId::NoiseFilterCutoff, 10.0);
        assert_eq!(store.get(ParamId::NoiseFilterCutoff), 500.0);
        store.set(ParamId::SubLevel, f32::NAN);
        assert_eq!(store.get(ParamId::SubLevel), 0.3);
    }

    #[test]
    fn test_set_param_by_name() {
        let store = ParameterStore::new();
        store.set_param("osc1Level", &json!(0.25)).unwrap();
        store.set_param("noiseType", &json!("Brown")).unwrap();
        store.set_param("osc1Waveform", &json!(1)).unwrap();
        store.set_param("subEnable", &json!(false)).unwrap();
        store.set_param("samplerLoop", &json!(1)).unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.get(ParamId::Osc1Level), 0.25);
        assert_eq!(snap.noise_type(), NoiseType::Brown);
        assert_eq!(snap.waveform(), Waveform::Saw);
        assert!(!snap.flag(ParamId::SubEnable));
        assert!(snap.flag(ParamId::SamplerLoop));
    }

    #[test]
    fn test_set_param_errors() {
        let store = ParameterStore::new();

        let err = store.set_param("osc9Level", &json!(0.5)).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_PARAMETER");

        let err = store.set_param("osc1Level", &json!("loud")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER_VALUE");

        let err = store.set_param("noiseType", &json!("purple")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER_VALUE");

        let err = store.set_param("subEnable", &json!("yes")).unwrap_err();
        assert!(err.is_recoverable());

        // failed writes leave the value untouched
        assert_eq!(store.get(ParamId::Osc1Level), 0.7);
    }

    #[test]
    fn test_choice_index_clamped() {
        let store = ParameterStore::new();
        store.set_param("osc1Waveform", &json!(42)).unwrap();
        assert_eq!(store.snapshot().waveform(), Waveform::Square);
    }

    #[test]
    fn test_get_params_json() {
        let store = ParameterStore::new();
        store.set_param("noiseType", &json!("white")).unwrap();
        let params = store.get_params();
        let obj = params.as_object().unwrap();
        assert_eq!(obj.len(), PARAM_COUNT);
        assert_eq!(params["noiseType"], json!("white"));
        assert_eq!(params["osc1Waveform"], json!("triangle"));
        assert_eq!(params["osc1Enable"], json!(true));
        assert!((params["osc1Level"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_get_params_round_trips_through_apply_json() {
        let a = ParameterStore::new();
        a.set(ParamId::SubWarmth, 0.9);
        a.set(ParamId::NoiseType, 0.0);
        a.set(ParamId::SamplerEnable, 0.0);

        let b = ParameterStore::new();
        b.apply_json(&a.get_params()).unwrap();
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_reset_to_defaults() {
        let store = ParameterStore::new();
        store.set(ParamId::EnvAttack, 3.0);
        store.reset_to_defaults();
        assert_eq!(store.snapshot(), ParamSnapshot::defaults());
    }

    #[test]
    fn test_adsr_from_snapshot() {
        let store = ParameterStore::new();
        store.set(ParamId::EnvRelease, 4.0);
        let adsr = store.snapshot().adsr();
        assert_eq!(adsr.release, 4.0);
        assert_eq!(adsr.sustain, 0.8);
    }
}
