use std::collections::HashMap;

use glam::{
  UVec4,
  Vec2,
  Vec3,
  Vec4,
};

/// The primitive topology of a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HalaMeshPrimitive(u8);
impl HalaMeshPrimitive {
  pub const POINTS: Self = Self(0);
  pub const LINES: Self = Self(1);
  pub const LINE_LOOP: Self = Self(2);
  pub const LINE_STRIP: Self = Self(3);
  pub const TRIANGLES: Self = Self(4);
  pub const TRIANGLE_STRIP: Self = Self(5);
  pub const TRIANGLE_FAN: Self = Self(6);

  pub fn from_u8(value: u8) -> Option<Self> {
    if value <= 6 { Some(Self(value)) } else { None }
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// The meaning of a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HalaMeshAttribute {
  Position,
  Normal,
  Tangent,
  Bitangent,
  TextureCoordinates,
  Color,
  ObjectId,
  JointIds,
  Weights,
  /// A format specific attribute, the id is resolved by the importer.
  Custom(u16),
}

/// The typed data of a vertex attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum HalaVertexData {
  F32(Vec<f32>),
  U32(Vec<u32>),
  Vec2(Vec<Vec2>),
  Vec3(Vec<Vec3>),
  Vec4(Vec<Vec4>),
  UVec4(Vec<UVec4>),
}

impl HalaVertexData {
  pub fn len(&self) -> usize {
    match self {
      HalaVertexData::F32(v) => v.len(),
      HalaVertexData::U32(v) => v.len(),
      HalaVertexData::Vec2(v) => v.len(),
      HalaVertexData::Vec3(v) => v.len(),
      HalaVertexData::Vec4(v) => v.len(),
      HalaVertexData::UVec4(v) => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Append the bit pattern of one vertex to the key.
  fn hash_into(&self, index: usize, key: &mut Vec<u32>) {
    match self {
      HalaVertexData::F32(v) => key.push(v[index].to_bits()),
      HalaVertexData::U32(v) => key.push(v[index]),
      HalaVertexData::Vec2(v) => key.extend(v[index].to_array().map(f32::to_bits)),
      HalaVertexData::Vec3(v) => key.extend(v[index].to_array().map(f32::to_bits)),
      HalaVertexData::Vec4(v) => key.extend(v[index].to_array().map(f32::to_bits)),
      HalaVertexData::UVec4(v) => key.extend(v[index].to_array()),
    }
  }

  /// Keep only the listed vertices.
  fn gather(&self, indices: &[u32]) -> Self {
    fn pick<T: Copy>(values: &[T], indices: &[u32]) -> Vec<T> {
      indices.iter().map(|&i| values[i as usize]).collect()
    }
    match self {
      HalaVertexData::F32(v) => HalaVertexData::F32(pick(v, indices)),
      HalaVertexData::U32(v) => HalaVertexData::U32(pick(v, indices)),
      HalaVertexData::Vec2(v) => HalaVertexData::Vec2(pick(v, indices)),
      HalaVertexData::Vec3(v) => HalaVertexData::Vec3(pick(v, indices)),
      HalaVertexData::Vec4(v) => HalaVertexData::Vec4(pick(v, indices)),
      HalaVertexData::UVec4(v) => HalaVertexData::UVec4(pick(v, indices)),
    }
  }
}

/// One attribute array of a mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaMeshAttributeData {
  pub attribute: HalaMeshAttribute,
  pub data: HalaVertexData,
}

/// A mesh with a single primitive topology and a single material.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaMeshData {
  pub primitive: HalaMeshPrimitive,
  pub indices: Option<Vec<u32>>,
  pub vertex_count: u32,
  pub attributes: Vec<HalaMeshAttributeData>,
}

/// The implementation of the mesh data.
impl HalaMeshData {
  pub fn new(primitive: HalaMeshPrimitive, vertex_count: u32) -> Self {
    Self {
      primitive,
      indices: None,
      vertex_count,
      attributes: Vec::new(),
    }
  }

  pub fn add_attribute(&mut self, attribute: HalaMeshAttribute, data: HalaVertexData) {
    debug_assert_eq!(data.len(), self.vertex_count as usize);
    self.attributes.push(HalaMeshAttributeData { attribute, data });
  }

  /// Get the count of the attribute sets of the given kind.
  /// param attribute: The attribute.
  /// return: The count.
  pub fn attribute_count(&self, attribute: HalaMeshAttribute) -> u32 {
    self.attributes.iter().filter(|a| a.attribute == attribute).count() as u32
  }

  /// Get an attribute set.
  /// param attribute: The attribute.
  /// param set: The set index within the attributes of the same kind.
  /// return: The data.
  pub fn attribute(&self, attribute: HalaMeshAttribute, set: u32) -> Option<&HalaVertexData> {
    self.attributes.iter()
      .filter(|a| a.attribute == attribute)
      .nth(set as usize)
      .map(|a| &a.data)
  }

  pub fn positions(&self) -> Option<&[Vec3]> {
    match self.attribute(HalaMeshAttribute::Position, 0) {
      Some(HalaVertexData::Vec3(v)) => Some(v),
      _ => None,
    }
  }

  /// Get the element count of the primitive stream.
  /// return: The index count if indexed, the vertex count otherwise.
  pub fn element_count(&self) -> u32 {
    match &self.indices {
      Some(indices) => indices.len() as u32,
      None => self.vertex_count,
    }
  }

  /// Merge bit-identical vertices and turn the mesh into an indexed one.
  /// Existing indices are remapped, vertex order follows the first occurrence.
  pub fn remove_duplicates(&mut self) {
    let mut unique = HashMap::new();
    let mut kept = Vec::new();
    let mut remap = Vec::with_capacity(self.vertex_count as usize);
    let mut key = Vec::new();
    for i in 0..self.vertex_count as usize {
      key.clear();
      for attribute in self.attributes.iter() {
        attribute.data.hash_into(i, &mut key);
      }
      let index = *unique.entry(key.clone()).or_insert_with(|| {
        kept.push(i as u32);
        kept.len() as u32 - 1
      });
      remap.push(index);
    }

    let indices = match self.indices.take() {
      Some(indices) => indices.iter().map(|&i| remap[i as usize]).collect(),
      None => remap,
    };
    for attribute in self.attributes.iter_mut() {
      attribute.data = attribute.data.gather(&kept);
    }
    self.vertex_count = kept.len() as u32;
    self.indices = Some(indices);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn remove_duplicates_builds_an_index_buffer() {
    let mut mesh = HalaMeshData::new(HalaMeshPrimitive::TRIANGLES, 6);
    mesh.add_attribute(HalaMeshAttribute::Position, HalaVertexData::Vec3(vec![
      Vec3::ZERO, Vec3::X, Vec3::Y,
      Vec3::Y, Vec3::X, Vec3::ONE,
    ]));
    mesh.remove_duplicates();

    assert_eq!(mesh.vertex_count, 4);
    assert_eq!(mesh.indices, Some(vec![0, 1, 2, 2, 1, 3]));
    assert_eq!(mesh.positions().unwrap(), &[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE]);
  }

  #[test]
  fn differing_attributes_keep_vertices_apart() {
    let mut mesh = HalaMeshData::new(HalaMeshPrimitive::POINTS, 2);
    mesh.add_attribute(HalaMeshAttribute::Position, HalaVertexData::Vec3(vec![Vec3::ZERO, Vec3::ZERO]));
    mesh.add_attribute(HalaMeshAttribute::Normal, HalaVertexData::Vec3(vec![Vec3::X, Vec3::Y]));
    mesh.remove_duplicates();
    assert_eq!(mesh.vertex_count, 2);
    assert_eq!(mesh.attribute_count(HalaMeshAttribute::Normal), 1);
  }
}
