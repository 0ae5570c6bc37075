use std::collections::BTreeMap;

use serde::{
  Deserialize,
  Serialize,
};

use crate::error::{
  HalaImporterError,
  HalaImporterErrorKind,
};

/// The flat key-value configuration of an importer.
/// All values are stored as strings and parsed when a file is opened.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HalaConfiguration {
  values: BTreeMap<String, String>,
}

/// The implementation of the configuration.
impl HalaConfiguration {
  /// Create a configuration from the key-value pairs.
  /// param pairs: The key-value pairs.
  /// return: The configuration.
  pub fn with_defaults(pairs: &[(&str, &str)]) -> Self {
    Self {
      values: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    }
  }

  /// Read configuration values from a JSON object, overriding existing keys.
  /// Booleans, numbers and strings are accepted.
  /// param json: The JSON text.
  /// return: The result.
  pub fn merge_json(&mut self, json: &str) -> Result<(), HalaImporterError> {
    let object: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)
      .map_err(|err| HalaImporterError::new(HalaImporterErrorKind::Configuration, "Parse configuration JSON failed.", Some(Box::new(err))))?;
    for (key, value) in object {
      let value = match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return Err(HalaImporterError::new(
          HalaImporterErrorKind::Configuration,
          &format!("Configuration value of \"{}\" must be a string, a number or a boolean.", key),
          None,
        )),
      };
      self.values.insert(key, value);
    }
    Ok(())
  }

  pub fn set<V: ToString>(&mut self, key: &str, value: V) {
    self.values.insert(key.to_string(), value.to_string());
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.values.get(key).map(|v| v.as_str())
  }

  /// Get a boolean value.
  /// param key: The key.
  /// return: The value, false if the key is missing.
  pub fn get_bool(&self, key: &str) -> Result<bool, HalaImporterError> {
    match self.get(key) {
      None => Ok(false),
      Some("true") | Some("1") => Ok(true),
      Some("false") | Some("0") => Ok(false),
      Some(value) => Err(Self::invalid(key, value)),
    }
  }

  /// Get an integer value.
  /// param key: The key.
  /// return: The value, 0 if the key is missing.
  pub fn get_i64(&self, key: &str) -> Result<i64, HalaImporterError> {
    match self.get(key) {
      None => Ok(0),
      Some(value) => value.trim().parse::<i64>().map_err(|_| Self::invalid(key, value)),
    }
  }

  /// Get a set limit, negative values mean unbounded.
  /// param key: The key.
  /// return: The limit, unbounded if the key is missing.
  pub fn get_limit(&self, key: &str) -> Result<Option<u32>, HalaImporterError> {
    if self.get(key).is_none() {
      return Ok(None);
    }
    let value = self.get_i64(key)?;
    Ok(if value < 0 { None } else { Some(value.min(u32::MAX as i64) as u32) })
  }

  fn invalid(key: &str, value: &str) -> HalaImporterError {
    HalaImporterError::new(
      HalaImporterErrorKind::Configuration,
      &format!("Invalid value \"{}\" of option \"{}\".", value, key),
      None,
    )
  }
}

/// How the geometry transforms of the nodes are exposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaGeometryTransformHandling(u8);
impl HalaGeometryTransformHandling {
  pub const HELPER_NODES: Self = Self(0);
  pub const MODIFY_GEOMETRY: Self = Self(1);
  pub const PRESERVE: Self = Self(2);

  pub fn from_name(value: &str) -> Option<Self> {
    match value {
      "helperNodes" => Some(Self::HELPER_NODES),
      "modifyGeometry" => Some(Self::MODIFY_GEOMETRY),
      "preserve" => Some(Self::PRESERVE),
      _ => None,
    }
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// Where the unit and axis conversion is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaUnitNormalizationHandling(u8);
impl HalaUnitNormalizationHandling {
  pub const ADJUST_TRANSFORMS: Self = Self(0);
  pub const TRANSFORM_ROOT: Self = Self(1);

  pub fn from_name(value: &str) -> Option<Self> {
    match value {
      "adjustTransforms" => Some(Self::ADJUST_TRANSFORMS),
      "transformRoot" => Some(Self::TRANSFORM_ROOT),
      _ => None,
    }
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// The options of the FBX importer.
#[derive(Clone, Debug)]
pub struct HalaFbxOptions {
  pub generate_missing_normals: bool,
  pub strict: bool,
  pub preserve_root_node: bool,
  pub geometry_transform_handling: HalaGeometryTransformHandling,
  pub unit_normalization_handling: HalaUnitNormalizationHandling,
  pub normalize_units: bool,
  pub max_uv_sets: Option<u32>,
  pub max_tangent_sets: Option<u32>,
  pub max_color_sets: Option<u32>,
  pub generate_indices: bool,
  pub preserve_material_factors: bool,
  pub per_instance_materials: bool,
}

/// The implementation of the FBX importer options.
impl HalaFbxOptions {
  pub const DEFAULTS: &'static [(&'static str, &'static str)] = &[
    ("generateMissingNormals", "false"),
    ("strict", "false"),
    ("preserveRootNode", "false"),
    ("geometryTransformHandling", "helperNodes"),
    ("unitNormalizationHandling", "adjustTransforms"),
    ("normalizeUnits", "false"),
    ("maxUvSets", "-1"),
    ("maxTangentSets", "-1"),
    ("maxColorSets", "-1"),
    ("generateIndices", "true"),
    ("preserveMaterialFactors", "false"),
    ("perInstanceMaterials", "true"),
  ];

  /// Read the options from the configuration.
  /// param config: The configuration.
  /// return: The options.
  pub fn from_configuration(config: &HalaConfiguration) -> Result<Self, HalaImporterError> {
    let geometry_transform_handling = {
      let value = config.get("geometryTransformHandling").unwrap_or("helperNodes");
      HalaGeometryTransformHandling::from_name(value)
        .ok_or(HalaConfiguration::invalid("geometryTransformHandling", value))?
    };
    let unit_normalization_handling = {
      let value = config.get("unitNormalizationHandling").unwrap_or("adjustTransforms");
      HalaUnitNormalizationHandling::from_name(value)
        .ok_or(HalaConfiguration::invalid("unitNormalizationHandling", value))?
    };
    let normalize_units = config.get_bool("normalizeUnits")?;

    // The conversion has to live on an object, so the root can not be elided then.
    let preserve_root_node = config.get_bool("preserveRootNode")? ||
      (normalize_units && unit_normalization_handling == HalaUnitNormalizationHandling::TRANSFORM_ROOT);

    Ok(Self {
      generate_missing_normals: config.get_bool("generateMissingNormals")?,
      strict: config.get_bool("strict")?,
      preserve_root_node,
      geometry_transform_handling,
      unit_normalization_handling,
      normalize_units,
      max_uv_sets: config.get_limit("maxUvSets")?,
      max_tangent_sets: config.get_limit("maxTangentSets")?,
      max_color_sets: config.get_limit("maxColorSets")?,
      generate_indices: config.get("generateIndices").is_none() || config.get_bool("generateIndices")?,
      preserve_material_factors: config.get_bool("preserveMaterialFactors")?,
      per_instance_materials: config.get("perInstanceMaterials").is_none() || config.get_bool("perInstanceMaterials")?,
    })
  }
}

/// The options of the glTF importer.
#[derive(Clone, Debug)]
pub struct HalaGltfOptions {
  pub ignore_required_extensions: bool,
  pub normalize_quaternions: bool,
  pub object_id_attribute: String,
  pub max_uv_sets: Option<u32>,
  pub max_color_sets: Option<u32>,
  pub generate_indices: bool,
  /// Report all animations as a single clip.
  pub merge_animation_clips: bool,
  /// Flip rotation keys so linear interpolation takes the shortest path.
  pub optimize_quaternion_shortest_path: bool,
}

/// The implementation of the glTF importer options.
impl HalaGltfOptions {
  pub const DEFAULTS: &'static [(&'static str, &'static str)] = &[
    ("ignoreRequiredExtensions", "false"),
    ("normalizeQuaternions", "true"),
    ("objectIdAttribute", "_OBJECT_ID"),
    ("maxUvSets", "-1"),
    ("maxTangentSets", "-1"),
    ("maxColorSets", "-1"),
    ("generateIndices", "false"),
    ("mergeAnimationClips", "false"),
    ("optimizeQuaternionShortestPath", "true"),
  ];

  /// Read the options from the configuration.
  /// param config: The configuration.
  /// return: The options.
  pub fn from_configuration(config: &HalaConfiguration) -> Result<Self, HalaImporterError> {
    let object_id_attribute = config.get("objectIdAttribute").unwrap_or("_OBJECT_ID").to_string();
    if object_id_attribute.is_empty() {
      return Err(HalaConfiguration::invalid("objectIdAttribute", ""));
    }
    Ok(Self {
      ignore_required_extensions: config.get_bool("ignoreRequiredExtensions")?,
      normalize_quaternions: config.get("normalizeQuaternions").is_none() || config.get_bool("normalizeQuaternions")?,
      object_id_attribute,
      max_uv_sets: config.get_limit("maxUvSets")?,
      max_color_sets: config.get_limit("maxColorSets")?,
      generate_indices: config.get_bool("generateIndices")?,
      merge_animation_clips: config.get_bool("mergeAnimationClips")?,
      optimize_quaternion_shortest_path: config.get("optimizeQuaternionShortestPath").is_none() ||
        config.get_bool("optimizeQuaternionShortestPath")?,
    })
  }
}
