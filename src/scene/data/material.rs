use glam::{
  Mat3,
  Vec3,
  Vec4,
};

/// The material type flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HalaMaterialTypes(u8);
impl HalaMaterialTypes {
  pub const NONE: Self = Self(0);
  pub const FLAT: Self = Self(1);
  pub const PHONG: Self = Self(1 << 1);
  pub const PBR_METALLIC_ROUGHNESS: Self = Self(1 << 2);
  pub const PBR_SPECULAR_GLOSSINESS: Self = Self(1 << 3);
  pub const PBR_CLEAR_COAT: Self = Self(1 << 4);

  pub fn contains(&self, other: Self) -> bool {
    self.0 & other.0 == other.0
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

impl std::ops::BitOr for HalaMaterialTypes {
  type Output = Self;

  fn bitor(self, rhs: Self) -> Self {
    Self(self.0 | rhs.0)
  }
}

impl std::ops::BitOrAssign for HalaMaterialTypes {
  fn bitor_assign(&mut self, rhs: Self) {
    self.0 |= rhs.0;
  }
}

/// A typed material attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum HalaMaterialValue {
  Bool(bool),
  Float(f32),
  UInt(u32),
  Vec3(Vec3),
  Vec4(Vec4),
  Matrix3(Mat3),
  String(String),
  /// A texture id in the importer's texture id space.
  Texture(u32),
}

/// A material described as a flat list of named attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaMaterialData {
  pub types: HalaMaterialTypes,
  pub attributes: Vec<(String, HalaMaterialValue)>,
}

/// The implementation of the material data.
impl HalaMaterialData {
  pub fn new(types: HalaMaterialTypes) -> Self {
    Self {
      types,
      attributes: Vec::new(),
    }
  }

  /// Set an attribute, replacing a previous value of the same name.
  /// param name: The attribute name.
  /// param value: The value.
  pub fn set(&mut self, name: &str, value: HalaMaterialValue) {
    match self.attributes.iter_mut().find(|(n, _)| n == name) {
      Some((_, v)) => *v = value,
      None => self.attributes.push((name.to_string(), value)),
    }
  }

  pub fn get(&self, name: &str) -> Option<&HalaMaterialValue> {
    self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v)
  }

  pub fn texture(&self, name: &str) -> Option<u32> {
    match self.get(name) {
      Some(HalaMaterialValue::Texture(id)) => Some(*id),
      _ => None,
    }
  }
}
