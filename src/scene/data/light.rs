use glam::Vec3;

/// The type of the light.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaLightType(u8);
impl HalaLightType {
  pub const AMBIENT: Self = Self(0);
  pub const DIRECTIONAL: Self = Self(1);
  pub const POINT: Self = Self(2);
  pub const SPOT: Self = Self(3);

  pub fn from_u8(value: u8) -> Option<Self> {
    match value {
      0 => Some(Self::AMBIENT),
      1 => Some(Self::DIRECTIONAL),
      2 => Some(Self::POINT),
      3 => Some(Self::SPOT),
      _ => None,
    }
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// A light source.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaLightData {
  pub light_type: HalaLightType,
  pub color: Vec3,
  pub intensity: f32,
  /// Constant, linear and quadratic attenuation.
  pub attenuation: Vec3,
  /// Infinite if not limited.
  pub range: f32,
  /// Full cone angles in degrees, only meaningful for spot lights.
  pub inner_cone_angle: f32,
  pub outer_cone_angle: f32,
}

impl HalaLightData {
  pub const CONSTANT_ATTENUATION: Vec3 = Vec3::new(1.0, 0.0, 0.0);
  pub const LINEAR_ATTENUATION: Vec3 = Vec3::new(0.0, 1.0, 0.0);
  pub const QUADRATIC_ATTENUATION: Vec3 = Vec3::new(0.0, 0.0, 1.0);

  /// Create a light with infinite range and no cone.
  /// param light_type: The light type.
  /// param color: The color.
  /// param intensity: The intensity.
  /// param attenuation: The attenuation.
  /// return: The light.
  pub fn new(light_type: HalaLightType, color: Vec3, intensity: f32, attenuation: Vec3) -> Self {
    Self {
      light_type,
      color,
      intensity,
      attenuation,
      range: f32::INFINITY,
      inner_cone_angle: 0.0,
      outer_cone_angle: 0.0,
    }
  }
}
