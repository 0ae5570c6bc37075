use glam::{
  Mat4,
  Quat,
  Vec2,
  Vec3,
  Vec4,
};

use crate::error::HalaImporterError;
use crate::scene::flatten::{
  objects::find_parent_cycle,
  HalaAttachment,
  HalaNodeSource,
  HalaSlotFaceCounts,
  HalaTrs,
};

/// A per-corner attribute, every polygon corner indexes into the values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaFbxVertexAttribute<T> {
  pub values: Vec<T>,
  pub indices: Vec<u32>,
}

impl<T: Copy> HalaFbxVertexAttribute<T> {
  /// Create an attribute with one value per corner.
  /// param values: The values.
  /// return: The attribute.
  pub fn per_corner(values: Vec<T>) -> Self {
    let indices = (0..values.len() as u32).collect();
    Self { values, indices }
  }

  /// Get the value of a corner.
  /// param corner: The corner index.
  /// return: The value.
  pub fn get(&self, corner: usize) -> Option<T> {
    self.indices.get(corner).and_then(|&i| self.values.get(i as usize)).copied()
  }
}

/// A polygon of a source mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HalaFbxFace {
  pub index_begin: u32,
  pub num_indices: u32,
}

/// A texture coordinate set with its optional tangent frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaFbxUvSet {
  pub name: String,
  pub uvs: HalaFbxVertexAttribute<Vec2>,
  pub tangents: Option<HalaFbxVertexAttribute<Vec3>>,
  pub bitangents: Option<HalaFbxVertexAttribute<Vec3>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaFbxColorSet {
  pub name: String,
  pub colors: HalaFbxVertexAttribute<Vec4>,
}

/// A source mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaFbxMesh {
  pub name: String,
  /// The control points.
  pub positions: Vec<Vec3>,
  /// The control point of every polygon corner.
  pub vertex_indices: Vec<u32>,
  pub faces: Vec<HalaFbxFace>,
  pub normals: Option<HalaFbxVertexAttribute<Vec3>>,
  pub uv_sets: Vec<HalaFbxUvSet>,
  pub color_sets: Vec<HalaFbxColorSet>,
  /// The material slot of every face, empty if all faces use slot 0.
  pub face_materials: Vec<u32>,
  /// The material of every slot as declared by the first instance.
  pub materials: Vec<Option<u32>>,
  pub skin: Option<u32>,
  /// The nodes referencing the mesh, filled by `finalize`.
  pub instances: Vec<u32>,
}

/// The implementation of the source mesh.
impl HalaFbxMesh {
  /// Get the count of material slots, at least one.
  pub fn slot_count(&self) -> u32 {
    (self.materials.len() as u32).max(1)
  }

  pub fn face_slot(&self, face: usize) -> u32 {
    self.face_materials.get(face).copied().unwrap_or(0)
  }

  /// Count the faces of every material slot by primitive kind.
  /// Polygons with three or more corners count as their fan triangles.
  /// return: The counts in slot order.
  pub fn slot_face_counts(&self) -> Vec<HalaSlotFaceCounts> {
    let mut counts = vec![HalaSlotFaceCounts::default(); self.slot_count() as usize];
    for (i, face) in self.faces.iter().enumerate() {
      let Some(slot) = counts.get_mut(self.face_slot(i) as usize) else {
        continue;
      };
      match face.num_indices {
        0 => {},
        1 => slot.points += 1,
        2 => slot.lines += 1,
        n => slot.triangles += n - 2,
      }
    }
    counts
  }

  pub fn is_skinned(&self) -> bool {
    self.skin.is_some()
  }
}

/// The decay of a light.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaFbxDecay(u8);
impl HalaFbxDecay {
  pub const NONE: Self = Self(0);
  pub const LINEAR: Self = Self(1);
  pub const QUADRATIC: Self = Self(2);
  pub const CUBIC: Self = Self(3);

  pub fn from_u8(value: u8) -> Self {
    Self(value)
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// The kind of a light.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaFbxLightKind(u8);
impl HalaFbxLightKind {
  pub const POINT: Self = Self(0);
  pub const DIRECTIONAL: Self = Self(1);
  pub const SPOT: Self = Self(2);
  pub const AREA: Self = Self(3);
  pub const VOLUME: Self = Self(4);

  pub fn from_u8(value: u8) -> Self {
    Self(value)
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HalaFbxLight {
  pub name: String,
  pub kind: HalaFbxLightKind,
  pub color: Vec3,
  pub intensity: f32,
  pub decay: HalaFbxDecay,
  /// Full cone angles in degrees.
  pub inner_angle: f32,
  pub outer_angle: f32,
}

impl Default for HalaFbxLight {
  fn default() -> Self {
    Self {
      name: String::new(),
      kind: HalaFbxLightKind::POINT,
      color: Vec3::ONE,
      intensity: 1.0,
      decay: HalaFbxDecay::QUADRATIC,
      inner_angle: 0.0,
      outer_angle: 45.0,
    }
  }
}

/// The projection mode of a camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaFbxProjectionMode(u8);
impl HalaFbxProjectionMode {
  pub const PERSPECTIVE: Self = Self(0);
  pub const ORTHOGRAPHIC: Self = Self(1);

  pub fn from_u8(value: u8) -> Self {
    Self(value)
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HalaFbxCamera {
  pub name: String,
  pub projection_mode: HalaFbxProjectionMode,
  /// Horizontal field of view in degrees.
  pub field_of_view: f32,
  pub aspect_ratio: f32,
  /// The full height of the orthographic view volume.
  pub orthographic_extent: f32,
  pub near_plane: f32,
  pub far_plane: f32,
}

impl Default for HalaFbxCamera {
  fn default() -> Self {
    Self {
      name: String::new(),
      projection_mode: HalaFbxProjectionMode::PERSPECTIVE,
      field_of_view: 40.0,
      aspect_ratio: 4.0 / 3.0,
      orthographic_extent: 1.0,
      near_plane: 0.1,
      far_plane: 1000.0,
    }
  }
}

/// A property of a material, a value with an optional factor and texture.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaFbxMaterialMap {
  pub value: Option<Vec4>,
  pub factor: Option<f32>,
  pub texture: Option<u32>,
}

impl HalaFbxMaterialMap {
  pub fn is_used(&self) -> bool {
    self.value.is_some() || self.texture.is_some()
  }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaFbxMaterial {
  pub name: String,
  pub diffuse: HalaFbxMaterialMap,
  pub specular: HalaFbxMaterialMap,
  pub ambient: HalaFbxMaterialMap,
  pub emissive: HalaFbxMaterialMap,
  pub shininess: HalaFbxMaterialMap,
  pub normal_map: HalaFbxMaterialMap,
  pub bump: HalaFbxMaterialMap,
  pub opacity: Option<f32>,
}

/// The wrapping of a texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HalaFbxWrapMode {
  #[default]
  Repeat,
  Clamp,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaFbxTexture {
  pub name: String,
  /// The index into the texture files, None if the texture has no file.
  pub file: Option<u32>,
  pub wrap_u: HalaFbxWrapMode,
  pub wrap_v: HalaFbxWrapMode,
}

/// A distinct file referenced by textures.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaFbxTextureFile {
  pub filename: String,
  pub relative_filename: String,
  /// The embedded file data.
  pub content: Option<Vec<u8>>,
}

/// A skin deformer, joints are source node ids.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaFbxSkin {
  pub name: String,
  pub joints: Vec<u32>,
  pub inverse_bind_matrices: Vec<Mat4>,
  /// The influences of every joint as control point index and weight.
  pub influences: Vec<Vec<(u32, f32)>>,
}

/// A source node.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaFbxNode {
  pub name: String,
  pub parent: Option<u32>,
  pub translation: Vec3,
  pub rotation: Quat,
  pub scaling: Vec3,
  pub visible: bool,
  pub geometry_transform: HalaTrs,
  /// The attached elements in connection order.
  pub meshes: Vec<u32>,
  pub lights: Vec<u32>,
  pub cameras: Vec<u32>,
  /// The materials the node assigns to the slots of its mesh.
  pub materials: Vec<u32>,
}

impl Default for HalaFbxNode {
  fn default() -> Self {
    Self {
      name: String::new(),
      parent: None,
      translation: Vec3::ZERO,
      rotation: Quat::IDENTITY,
      scaling: Vec3::ONE,
      visible: true,
      geometry_transform: HalaTrs::IDENTITY,
      meshes: Vec::new(),
      lights: Vec::new(),
      cameras: Vec::new(),
      materials: Vec::new(),
    }
  }
}

/// The up axis of the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaFbxUpAxis(u8);
impl HalaFbxUpAxis {
  pub const X: Self = Self(0);
  pub const Y: Self = Self(1);
  pub const Z: Self = Self(2);

  pub fn from_u8(value: u8) -> Option<Self> {
    match value {
      0 => Some(Self::X),
      1 => Some(Self::Y),
      2 => Some(Self::Z),
      _ => None,
    }
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// A parsed FBX or OBJ document.
/// Node 0 is the implicit root, the other entities reference each other by index.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaFbxDocument {
  pub nodes: Vec<HalaFbxNode>,
  pub meshes: Vec<HalaFbxMesh>,
  pub materials: Vec<HalaFbxMaterial>,
  pub textures: Vec<HalaFbxTexture>,
  pub texture_files: Vec<HalaFbxTextureFile>,
  pub lights: Vec<HalaFbxLight>,
  pub cameras: Vec<HalaFbxCamera>,
  pub skins: Vec<HalaFbxSkin>,
  pub up_axis: HalaFbxUpAxis,
  /// The length of one document unit in meters.
  pub unit_meters: f32,
  pub warnings: Vec<String>,
}

impl Default for HalaFbxDocument {
  fn default() -> Self {
    Self {
      nodes: vec![HalaFbxNode {
        name: "RootNode".to_string(),
        ..Default::default()
      }],
      meshes: Vec::new(),
      materials: Vec::new(),
      textures: Vec::new(),
      texture_files: Vec::new(),
      lights: Vec::new(),
      cameras: Vec::new(),
      skins: Vec::new(),
      up_axis: HalaFbxUpAxis::Y,
      unit_meters: 0.01,
      warnings: Vec::new(),
    }
  }
}

/// The implementation of the source document.
impl HalaFbxDocument {
  /// Create a document holding only the root node.
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a node.
  /// param node: The node.
  /// return: The node id.
  pub fn add_node(&mut self, node: HalaFbxNode) -> u32 {
    self.nodes.push(node);
    self.nodes.len() as u32 - 1
  }

  /// Check every cross reference and the node hierarchy, then fill the derived tables.
  /// return: The result.
  pub fn finalize(&mut self) -> Result<(), HalaImporterError> {
    let check = |kind: &str, owner: String, id: u32, count: usize| {
      if (id as usize) < count {
        Ok(())
      } else {
        Err(HalaImporterError::open(&format!("{} references {} {} out of {}.", owner, kind, id, count)))
      }
    };

    if self.nodes.is_empty() || self.nodes[0].parent.is_some() {
      return Err(HalaImporterError::open("The document has no root node."));
    }
    for (i, node) in self.nodes.iter().enumerate() {
      let owner = || format!("Node {}", i);
      match node.parent {
        Some(parent) => check("node", owner(), parent, self.nodes.len())?,
        None if i != 0 => return Err(HalaImporterError::open(&format!("Node {} has no parent.", i))),
        None => {},
      }
      for &mesh in node.meshes.iter() {
        check("mesh", owner(), mesh, self.meshes.len())?;
      }
      for &light in node.lights.iter() {
        check("light", owner(), light, self.lights.len())?;
      }
      for &camera in node.cameras.iter() {
        check("camera", owner(), camera, self.cameras.len())?;
      }
      for &material in node.materials.iter() {
        check("material", owner(), material, self.materials.len())?;
      }
    }

    let parents: Vec<_> = self.nodes.iter().map(|n| n.parent).collect();
    if let Some(node) = find_parent_cycle(&parents) {
      return Err(HalaImporterError::open(&format!("The node tree contains a cycle starting at node {}.", node)));
    }

    for (i, mesh) in self.meshes.iter().enumerate() {
      let owner = || format!("Mesh {}", i);
      for &index in mesh.vertex_indices.iter() {
        check("control point", owner(), index, mesh.positions.len())?;
      }
      for face in mesh.faces.iter() {
        let end = face.index_begin.checked_add(face.num_indices);
        if end.map_or(true, |end| end as usize > mesh.vertex_indices.len()) {
          return Err(HalaImporterError::open(&format!("Mesh {} has a face outside of its {} corners.", i, mesh.vertex_indices.len())));
        }
      }
      if !mesh.face_materials.is_empty() && mesh.face_materials.len() != mesh.faces.len() {
        return Err(HalaImporterError::open(&format!("Mesh {} has {} face materials for {} faces.", i, mesh.face_materials.len(), mesh.faces.len())));
      }
      for &slot in mesh.face_materials.iter() {
        check("material slot", owner(), slot, mesh.slot_count() as usize)?;
      }
      for material in mesh.materials.iter().flatten() {
        check("material", owner(), *material, self.materials.len())?;
      }
      if let Some(skin) = mesh.skin {
        check("skin", owner(), skin, self.skins.len())?;
      }
    }

    for (i, texture) in self.textures.iter().enumerate() {
      if let Some(file) = texture.file {
        check("texture file", format!("Texture {}", i), file, self.texture_files.len())?;
      }
    }
    for (i, material) in self.materials.iter().enumerate() {
      for map in [&material.diffuse, &material.specular, &material.ambient, &material.emissive, &material.shininess, &material.normal_map, &material.bump] {
        if let Some(texture) = map.texture {
          check("texture", format!("Material {}", i), texture, self.textures.len())?;
        }
      }
    }
    for (i, skin) in self.skins.iter().enumerate() {
      for &joint in skin.joints.iter() {
        check("node", format!("Skin {}", i), joint, self.nodes.len())?;
      }
    }

    for mesh in self.meshes.iter_mut() {
      mesh.instances.clear();
    }
    for (i, node) in self.nodes.iter().enumerate() {
      for &mesh in node.meshes.iter() {
        self.meshes[mesh as usize].instances.push(i as u32);
      }
    }
    Ok(())
  }
}

/// The source document seen as a node forest.
impl HalaNodeSource for HalaFbxDocument {
  fn node_count(&self) -> u32 {
    self.nodes.len() as u32
  }

  fn node_parent(&self, node: u32) -> Option<u32> {
    self.nodes.get(node as usize).and_then(|n| n.parent)
  }

  fn node_geometry_transform(&self, node: u32) -> Option<HalaTrs> {
    self.nodes.get(node as usize)
      .map(|n| n.geometry_transform)
      .filter(|t| !t.is_identity())
  }

  fn node_attachments(&self, node: u32) -> Vec<HalaAttachment> {
    let Some(node) = self.nodes.get(node as usize) else {
      return Vec::new();
    };
    let mut attachments = Vec::with_capacity(node.meshes.len() + node.lights.len() + node.cameras.len());
    for &mesh in node.meshes.iter() {
      let skin = self.meshes.get(mesh as usize).and_then(|m| m.skin);
      attachments.push(HalaAttachment::Mesh { mesh, skinned: skin.is_some() });
      if let Some(skin) = skin {
        attachments.push(HalaAttachment::Skin(skin));
      }
    }
    attachments.extend(node.lights.iter().map(|&light| HalaAttachment::Light(light)));
    attachments.extend(node.cameras.iter().map(|&camera| HalaAttachment::Camera(camera)));
    attachments
  }

  fn mesh_instance_count(&self, mesh: u32) -> u32 {
    self.meshes.get(mesh as usize).map_or(0, |m| m.instances.len() as u32)
  }
}
