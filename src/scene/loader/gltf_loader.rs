use std::path::{
  Path,
  PathBuf,
};

use glam::{
  Mat3,
  Mat4,
  Quat,
  UVec4,
  Vec2,
  Vec3,
  Vec4,
};
use gltf::accessor::{
  DataType,
  Dimensions,
};
use serde::Deserialize;

use crate::config::{
  HalaConfiguration,
  HalaGltfOptions,
};
use crate::error::{
  HalaImporterError,
  HalaImporterErrorKind,
};
use crate::file_callback::{
  load_external,
  HalaFileCallback,
  HalaInputFileCallbackPolicy,
};
use crate::scene::data::{
  HalaAnimationData,
  HalaAnimationInterpolation,
  HalaAnimationTarget,
  HalaAnimationTrack,
  HalaAnimationValues,
  HalaCameraData,
  HalaCubicHermite,
  HalaImageData,
  HalaLightData,
  HalaLightType,
  HalaMaterialData,
  HalaMaterialTypes,
  HalaMaterialValue,
  HalaMeshAttribute,
  HalaMeshData,
  HalaMeshPrimitive,
  HalaOrthographicCameraData,
  HalaSamplerFilter,
  HalaSamplerMipmap,
  HalaSamplerWrapping,
  HalaSceneData,
  HalaSceneField,
  HalaSceneMapping,
  HalaSkinData,
  HalaTextureData,
  HalaVertexData,
};
use crate::scene::flatten::{
  count_instances,
  fill_instances,
  objects::find_parent_cycle,
  HalaAttachment,
  HalaMeshChunk,
  HalaMeshChunkIndex,
  HalaNameMap,
  HalaNodeSource,
  HalaTrs,
  HalaVisitedScene,
};
use crate::scene::image_cache::{
  HalaImageCache,
  HalaImageImporter,
};
use crate::scene::importer::{
  check_id,
  HalaImporter,
};
use super::gltf_buffers::HalaGltfBuffers;

/// The extensions a file may require.
const SUPPORTED_EXTENSIONS: &[&str] = &[
  "KHR_lights_punctual",
  "KHR_materials_pbrSpecularGlossiness",
  "KHR_materials_unlit",
  "KHR_texture_transform",
  "KHR_texture_basisu",
  "GOOGLE_texture_basis",
  "MSFT_texture_dds",
];

/// The texture extensions replacing the image source, first match wins.
const TEXTURE_SOURCE_EXTENSIONS: &[&str] = &[
  "KHR_texture_basisu",
  "GOOGLE_texture_basis",
  "MSFT_texture_dds",
];

/// What the scene flattening needs to know about a node.
struct HalaGltfNode {
  parent: Option<u32>,
  children: Vec<u32>,
  attachments: Vec<HalaAttachment>,
  has_translation: bool,
  has_rotation: bool,
  has_scale: bool,
  has_matrix: bool,
}

impl HalaGltfNode {
  fn has_trs(&self) -> bool {
    self.has_translation || self.has_rotation || self.has_scale
  }
}

/// Everything derived from an opened document, discarded on close.
struct HalaGltfState {
  document: gltf::Document,
  /// The raw JSON, for properties the typed document does not keep.
  json: serde_json::Value,
  options: HalaGltfOptions,
  buffers: HalaGltfBuffers,
  nodes: Vec<HalaGltfNode>,
  chunks: HalaMeshChunkIndex,
  /// The material of every chunk.
  chunk_materials: Vec<Option<u32>>,
  /// The names of the custom vertex attributes in id order.
  custom_attributes: Vec<String>,
  scene_names: HalaNameMap,
  object_names: HalaNameMap,
  mesh_names: HalaNameMap,
  light_names: HalaNameMap,
  camera_names: HalaNameMap,
  skin_names: HalaNameMap,
  animation_names: HalaNameMap,
  material_names: HalaNameMap,
  texture_names: HalaNameMap,
  image_names: HalaNameMap,
}

/// The glTF 2.0 importer.
pub struct HalaGltfImporter {
  configuration: HalaConfiguration,
  callback: Option<HalaFileCallback>,
  images: HalaImageCache,
  state: Option<HalaGltfState>,
}

impl Default for HalaGltfImporter {
  fn default() -> Self {
    Self::new()
  }
}

/// The implementation of the glTF importer.
impl HalaGltfImporter {
  /// Create a new importer with the default configuration.
  /// return: The importer.
  pub fn new() -> Self {
    Self {
      configuration: HalaConfiguration::with_defaults(HalaGltfOptions::DEFAULTS),
      callback: None,
      images: HalaImageCache::default(),
      state: None,
    }
  }

  fn open_bytes(&mut self, data: &[u8], base_dir: Option<PathBuf>) -> Result<(), HalaImporterError> {
    self.close();
    let options = HalaGltfOptions::from_configuration(&self.configuration)?;

    let (json, bin) = if data.starts_with(b"glTF") {
      let glb = gltf::binary::Glb::from_slice(data)
        .map_err(|err| HalaImporterError::open(&format!("Parse the GLB container failed: {}.", err)))?;
      (glb.json.into_owned(), glb.bin.map(|bin| bin.into_owned()))
    } else {
      (data.to_vec(), None)
    };
    let mut json: serde_json::Value = serde_json::from_slice(&json)
      .map_err(|err| HalaImporterError::new(HalaImporterErrorKind::Open, "Parse the glTF JSON failed.", Some(Box::new(err))))?;

    Self::check_asset(&json)?;
    Self::check_required_extensions(&mut json, options.ignore_required_extensions)?;
    Self::apply_texture_sources(&mut json);

    let root = gltf::json::Root::deserialize(&json)
      .map_err(|err| HalaImporterError::open(&format!("Read the glTF document failed: {}.", err)))?;
    let document = gltf::Document::from_json(root)
      .map_err(|err| HalaImporterError::open(&format!("Invalid glTF document: {}.", err)))?;

    let nodes = Self::read_nodes(&document, &json)?;

    let mut parts = Vec::new();
    let mut chunk_materials = Vec::new();
    let mut custom_attributes: Vec<String> = Vec::new();
    for mesh in document.meshes() {
      let mut mesh_parts = Vec::new();
      for primitive in mesh.primitives() {
        let kind = Self::primitive_kind(primitive.mode());
        let elements = primitive.indices()
          .or_else(|| primitive.get(&gltf::Semantic::Positions))
          .map_or(0, |accessor| accessor.count() as u32);
        mesh_parts.push((kind, Self::face_count(kind, elements)));
        chunk_materials.push(primitive.material().index().map(|m| m as u32));
        for (semantic, _) in primitive.attributes() {
          if let gltf::Semantic::Extras(name) = semantic {
            let name = format!("_{}", name);
            if name != options.object_id_attribute && !custom_attributes.contains(&name) {
              custom_attributes.push(name);
            }
          }
        }
      }
      parts.push(mesh_parts);
    }
    let chunks = HalaMeshChunkIndex::build_from_parts(parts);

    let buffers = HalaGltfBuffers::new(document.buffers().count(), bin, base_dir);
    log::debug!(
      "HalaGltfImporter::open_bytes(): {} nodes, {} mesh chunks from {} meshes, {} buffers.",
      nodes.len(),
      chunks.len(),
      chunks.mesh_count(),
      document.buffers().count(),
    );
    self.state = Some(HalaGltfState {
      document,
      json,
      options,
      buffers,
      nodes,
      chunks,
      chunk_materials,
      custom_attributes,
      scene_names: HalaNameMap::new(),
      object_names: HalaNameMap::new(),
      mesh_names: HalaNameMap::new(),
      light_names: HalaNameMap::new(),
      camera_names: HalaNameMap::new(),
      skin_names: HalaNameMap::new(),
      animation_names: HalaNameMap::new(),
      material_names: HalaNameMap::new(),
      texture_names: HalaNameMap::new(),
      image_names: HalaNameMap::new(),
    });
    Ok(())
  }

  /// Check the asset version of the document.
  fn check_asset(json: &serde_json::Value) -> Result<(), HalaImporterError> {
    let asset = json.get("asset")
      .ok_or_else(|| HalaImporterError::open("The glTF asset property is missing."))?;
    let version = asset.get("version").and_then(|v| v.as_str())
      .ok_or_else(|| HalaImporterError::open("The glTF asset version is missing."))?;
    if !version.starts_with("2.") {
      return Err(HalaImporterError::open(&format!("Unsupported glTF version {}.", version)));
    }
    if let Some(min_version) = asset.get("minVersion") {
      if min_version.as_str() != Some("2.0") {
        return Err(HalaImporterError::open(&format!("Unsupported glTF minimum version {}.", min_version)));
      }
    }
    Ok(())
  }

  /// Reject required extensions that are not supported, then drop the list.
  fn check_required_extensions(json: &mut serde_json::Value, ignore: bool) -> Result<(), HalaImporterError> {
    let required: Vec<String> = json.get("extensionsRequired")
      .and_then(|v| v.as_array())
      .map(|list| list.iter().filter_map(|e| e.as_str()).map(|e| e.to_string()).collect())
      .unwrap_or_default();
    for extension in required.iter().filter(|e| !SUPPORTED_EXTENSIONS.contains(&e.as_str())) {
      if ignore {
        log::warn!("HalaGltfImporter::open_bytes(): Required extension {} is not supported, ignoring.", extension);
      } else {
        return Err(HalaImporterError::open(&format!("The required extension {} is not supported.", extension)));
      }
    }
    if let Some(root) = json.as_object_mut() {
      root.remove("extensionsRequired");
    }
    Ok(())
  }

  /// Replace the image source of textures by the one of a texture format extension.
  fn apply_texture_sources(json: &mut serde_json::Value) {
    let Some(textures) = json.get_mut("textures").and_then(|t| t.as_array_mut()) else {
      return;
    };
    for texture in textures.iter_mut() {
      let source = TEXTURE_SOURCE_EXTENSIONS.iter()
        .find_map(|name| texture.get("extensions")?.get(name)?.get("source").cloned());
      if let (Some(source), Some(texture)) = (source, texture.as_object_mut()) {
        texture.insert("source".to_string(), source);
      }
    }
  }

  /// Collect the node hierarchy, every node may have at most one parent and no cycles.
  fn read_nodes(document: &gltf::Document, json: &serde_json::Value) -> Result<Vec<HalaGltfNode>, HalaImporterError> {
    let node_count = document.nodes().count();
    let raw_nodes = json.get("nodes").and_then(|n| n.as_array());
    let mut nodes = Vec::with_capacity(node_count);
    let mut parents = vec![None; node_count];
    for node in document.nodes() {
      let raw = raw_nodes.and_then(|n| n.get(node.index()));
      let has = |key: &str| raw.and_then(|r| r.get(key)).is_some();
      let children: Vec<u32> = node.children().map(|child| child.index() as u32).collect();
      for &child in children.iter() {
        if let Some(parent) = parents[child as usize] {
          return Err(HalaImporterError::open(&format!(
            "The node {} has both node {} and node {} as parents.",
            child,
            parent,
            node.index(),
          )));
        }
        parents[child as usize] = Some(node.index() as u32);
      }
      let skin = node.skin().map(|skin| skin.index() as u32);
      let mut attachments = Vec::new();
      if let Some(mesh) = node.mesh() {
        attachments.push(HalaAttachment::Mesh { mesh: mesh.index() as u32, skinned: skin.is_some() });
      }
      attachments.extend(skin.map(HalaAttachment::Skin));
      attachments.extend(node.light().map(|light| HalaAttachment::Light(light.index() as u32)));
      attachments.extend(node.camera().map(|camera| HalaAttachment::Camera(camera.index() as u32)));
      nodes.push(HalaGltfNode {
        parent: None,
        children,
        attachments,
        has_translation: has("translation"),
        has_rotation: has("rotation"),
        has_scale: has("scale"),
        has_matrix: has("matrix"),
      });
    }
    if let Some(node) = find_parent_cycle(&parents) {
      return Err(HalaImporterError::open(&format!("The node tree contains a cycle starting at node {}.", node)));
    }
    for (node, parent) in nodes.iter_mut().zip(parents) {
      node.parent = parent;
    }
    Ok(nodes)
  }

  fn primitive_kind(mode: gltf::mesh::Mode) -> HalaMeshPrimitive {
    match mode {
      gltf::mesh::Mode::Points => HalaMeshPrimitive::POINTS,
      gltf::mesh::Mode::Lines => HalaMeshPrimitive::LINES,
      gltf::mesh::Mode::LineLoop => HalaMeshPrimitive::LINE_LOOP,
      gltf::mesh::Mode::LineStrip => HalaMeshPrimitive::LINE_STRIP,
      gltf::mesh::Mode::Triangles => HalaMeshPrimitive::TRIANGLES,
      gltf::mesh::Mode::TriangleStrip => HalaMeshPrimitive::TRIANGLE_STRIP,
      gltf::mesh::Mode::TriangleFan => HalaMeshPrimitive::TRIANGLE_FAN,
    }
  }

  /// Count the faces formed by a primitive stream.
  fn face_count(kind: HalaMeshPrimitive, elements: u32) -> u32 {
    match kind {
      HalaMeshPrimitive::POINTS | HalaMeshPrimitive::LINE_LOOP => elements,
      HalaMeshPrimitive::LINES => elements / 2,
      HalaMeshPrimitive::LINE_STRIP => elements.saturating_sub(1),
      HalaMeshPrimitive::TRIANGLES => elements / 3,
      _ => elements.saturating_sub(2),
    }
  }

  fn state(&self) -> Result<&HalaGltfState, HalaImporterError> {
    self.state.as_ref().ok_or_else(HalaImporterError::not_opened)
  }
}

fn missing(kind: &str, id: u32) -> HalaImporterError {
  HalaImporterError::query(&format!("The {} {} is missing.", kind, id))
}

fn name_of(name: Option<&str>) -> String {
  name.unwrap_or_default().to_string()
}

/// Group spline values stored as (in tangent, point, out tangent) triples.
/// The tangents are scaled by the duration of the interval they border.
fn cubic_hermite<T>(keys: &[f32], values: &[T]) -> Vec<HalaCubicHermite<T>>
where
  T: Copy + std::ops::Mul<f32, Output = T>,
{
  let mut frames: Vec<HalaCubicHermite<T>> = values.chunks_exact(3)
    .map(|value| HalaCubicHermite {
      in_tangent: value[0],
      point: value[1],
      out_tangent: value[2],
    })
    .collect();
  for i in 1..frames.len().min(keys.len()) {
    let duration = keys[i] - keys[i - 1];
    frames[i - 1].out_tangent = frames[i - 1].out_tangent * duration;
    frames[i].in_tangent = frames[i].in_tangent * duration;
  }
  frames
}

/// The node hierarchy of the document, scenes pick their roots from it.
impl HalaNodeSource for HalaGltfState {
  fn node_count(&self) -> u32 {
    self.nodes.len() as u32
  }

  fn node_parent(&self, node: u32) -> Option<u32> {
    self.nodes.get(node as usize).and_then(|n| n.parent)
  }

  fn node_geometry_transform(&self, _node: u32) -> Option<HalaTrs> {
    None
  }

  fn node_attachments(&self, node: u32) -> Vec<HalaAttachment> {
    self.nodes.get(node as usize).map(|n| n.attachments.clone()).unwrap_or_default()
  }

  fn mesh_instance_count(&self, mesh: u32) -> u32 {
    self.nodes.iter()
      .flat_map(|n| n.attachments.iter())
      .filter(|a| matches!(a, HalaAttachment::Mesh { mesh: m, .. } if *m == mesh))
      .count() as u32
  }
}

/// The implementation of the opened state.
impl HalaGltfState {
  fn scene(&self, id: u32) -> Result<HalaSceneData, HalaImporterError> {
    let scene = self.document.scenes().nth(id as usize).ok_or_else(|| missing("scene", id))?;
    let roots: Vec<u32> = scene.nodes().map(|node| node.index() as u32).collect();
    let visit = HalaVisitedScene::visit(&roots, self.nodes.len() as u32, |node| self.nodes[node as usize].children.clone());
    let sources: Vec<gltf::Node> = self.document.nodes().collect();

    // Count everything first, the fields are filled with exact capacities.
    let mut transformation_count = 0;
    let mut trs_count = 0;
    let (mut has_translations, mut has_rotations, mut has_scalings) = (false, false, false);
    for &(node, _) in visit.visited.iter() {
      let info = &self.nodes[node as usize];
      if info.has_trs() {
        trs_count += 1;
        transformation_count += 1;
      } else if info.has_matrix {
        transformation_count += 1;
      }
      has_translations |= info.has_translation;
      has_rotations |= info.has_rotation;
      has_scalings |= info.has_scale;
    }
    // The matrix field is redundant when every transformed node has TRS.
    if trs_count == transformation_count {
      transformation_count = 0;
    }
    let counts = count_instances(&visit, self, &self.chunks);

    fn ordered<T>(count: usize) -> HalaSceneField<T> {
      HalaSceneField::with_capacity(HalaSceneMapping::Ordered, count)
    }
    let optional = |enabled: bool| if enabled { trs_count } else { 0 };
    let mut parents = ordered(visit.visited.len());
    let mut transformations = ordered(transformation_count);
    let mut translations = ordered(optional(has_translations));
    let mut rotations = ordered(optional(has_rotations));
    let mut scalings = ordered(optional(has_scalings));

    for &(node, parent) in visit.visited.iter() {
      parents.push(node, parent);
      let info = &self.nodes[node as usize];
      let source = &sources[node as usize];

      let (translation, mut rotation, scaling, matrix) = match source.transform() {
        gltf::scene::Transform::Matrix { matrix } => (Vec3::ZERO, Quat::IDENTITY, Vec3::ONE, Some(Mat4::from_cols_array_2d(&matrix))),
        gltf::scene::Transform::Decomposed { translation, rotation, scale } => {
          (Vec3::from(translation), Quat::from_array(rotation), Vec3::from(scale), None)
        },
      };
      if info.has_rotation && self.options.normalize_quaternions && !rotation.is_normalized() {
        log::warn!("HalaGltfImporter::scene(): Rotation quaternion of node {} was renormalized.", node);
        rotation = rotation.normalize();
      }

      if transformation_count > 0 && (info.has_trs() || info.has_matrix) {
        transformations.push(node, matrix.unwrap_or_else(|| Mat4::from_scale_rotation_translation(scaling, rotation, translation)));
      }
      if info.has_trs() {
        if has_translations {
          translations.push(node, translation);
        }
        if has_rotations {
          rotations.push(node, rotation);
        }
        if has_scalings {
          scalings.push(node, scaling);
        }
      }
    }

    // Materials belong to the primitives, instances can not override them.
    let instances = fill_instances(&visit, self, &self.chunks, &counts, |_, chunk| self.chunk_material(chunk));

    Ok(HalaSceneData {
      mapping_bound: visit.mapping_bound(),
      parents: parents.finish(),
      transformations: transformations.finish(),
      translations: translations.finish(),
      rotations: rotations.finish(),
      scalings: scalings.finish(),
      meshes: instances.meshes,
      lights: instances.lights,
      cameras: instances.cameras,
      skins: instances.skins,
      ..Default::default()
    })
  }

  fn chunk_material(&self, chunk: &HalaMeshChunk) -> Option<u32> {
    let id = self.chunks.range(chunk.mesh).base + chunk.material_slot;
    self.chunk_materials.get(id as usize).copied().flatten()
  }

  /// Check that an attribute is stored as plain floats with the given dimensions.
  fn expect_float(accessor: &gltf::Accessor, dimensions: Dimensions, what: &str, mesh: u32) -> Result<(), HalaImporterError> {
    if accessor.data_type() != DataType::F32 || accessor.dimensions() != dimensions || accessor.normalized() {
      log::error!("HalaGltfImporter::mesh(): Mesh {} has unsupported {} format.", mesh, what);
      return Err(HalaImporterError::query(&format!(
        "The mesh {} {} have unsupported format {:?}/{:?}.",
        mesh,
        what,
        accessor.dimensions(),
        accessor.data_type(),
      )));
    }
    Ok(())
  }

  fn mesh(&self, id: u32, callback: Option<&HalaFileCallback>) -> Result<HalaMeshData, HalaImporterError> {
    let chunk = *self.chunks.get(id).ok_or_else(|| missing("mesh", id))?;
    let mesh = self.document.meshes().nth(chunk.mesh as usize).ok_or_else(|| missing("mesh", id))?;
    let primitive = mesh.primitives().nth(chunk.material_slot as usize).ok_or_else(|| missing("mesh", id))?;

    let positions = primitive.get(&gltf::Semantic::Positions)
      .ok_or_else(|| HalaImporterError::query(&format!("The mesh {} has no positions.", id)))?;
    Self::expect_float(&positions, Dimensions::Vec3, "positions", id)?;
    let vertex_count = positions.count();
    for (semantic, accessor) in primitive.attributes() {
      if accessor.count() != vertex_count {
        return Err(HalaImporterError::query(&format!(
          "The mesh {} attribute {:?} has {} elements, expected {}.",
          id,
          semantic,
          accessor.count(),
          vertex_count,
        )));
      }
      self.buffers.check_accessor(&accessor, callback)?;
    }
    if let Some(indices) = primitive.indices() {
      self.buffers.check_accessor(&indices, callback)?;
    }
    let buffers = self.buffers.loaded();
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).and_then(|data| data.as_deref()));

    let mut data = HalaMeshData::new(chunk.primitive, vertex_count as u32);
    let positions = reader.read_positions()
      .ok_or_else(|| HalaImporterError::query(&format!("Read positions of mesh {} failed.", id)))?;
    data.add_attribute(HalaMeshAttribute::Position, HalaVertexData::Vec3(positions.map(Vec3::from).collect()));

    if let Some(normals) = primitive.get(&gltf::Semantic::Normals) {
      Self::expect_float(&normals, Dimensions::Vec3, "normals", id)?;
      if let Some(normals) = reader.read_normals() {
        data.add_attribute(HalaMeshAttribute::Normal, HalaVertexData::Vec3(normals.map(Vec3::from).collect()));
      }
    }
    if let Some(tangents) = primitive.get(&gltf::Semantic::Tangents) {
      Self::expect_float(&tangents, Dimensions::Vec4, "tangents", id)?;
      if let Some(tangents) = reader.read_tangents() {
        data.add_attribute(HalaMeshAttribute::Tangent, HalaVertexData::Vec4(tangents.map(Vec4::from).collect()));
      }
    }

    let set_count = |semantic: fn(u32) -> gltf::Semantic| (0..).take_while(|&set| primitive.get(&semantic(set)).is_some()).count() as u32;
    let limit = |count: u32, max: Option<u32>, what: &str| {
      let kept = max.map_or(count, |m| count.min(m));
      if kept < count {
        log::warn!("HalaGltfImporter::mesh(): {} of {} {} sets of mesh {} kept.", kept, count, what, id);
      }
      kept
    };

    for set in 0..limit(set_count(gltf::Semantic::TexCoords), self.options.max_uv_sets, "texture coordinate") {
      if let Some(uvs) = reader.read_tex_coords(set) {
        data.add_attribute(HalaMeshAttribute::TextureCoordinates, HalaVertexData::Vec2(uvs.into_f32().map(Vec2::from).collect()));
      }
    }
    for set in 0..limit(set_count(gltf::Semantic::Colors), self.options.max_color_sets, "color") {
      if let Some(colors) = reader.read_colors(set) {
        data.add_attribute(HalaMeshAttribute::Color, HalaVertexData::Vec4(colors.into_rgba_f32().map(Vec4::from).collect()));
      }
    }
    for set in 0..set_count(gltf::Semantic::Joints) {
      if let Some(joints) = reader.read_joints(set) {
        let joints = joints.into_u16().map(|j| UVec4::from_array(j.map(u32::from))).collect();
        data.add_attribute(HalaMeshAttribute::JointIds, HalaVertexData::UVec4(joints));
      }
    }
    for set in 0..set_count(gltf::Semantic::Weights) {
      if let Some(weights) = reader.read_weights(set) {
        data.add_attribute(HalaMeshAttribute::Weights, HalaVertexData::Vec4(weights.into_f32().map(Vec4::from).collect()));
      }
    }

    let object_id = self.options.object_id_attribute.strip_prefix('_')
      .and_then(|name| primitive.get(&gltf::Semantic::Extras(name.to_string())));
    if let Some(accessor) = object_id {
      if accessor.dimensions() != Dimensions::Scalar
        || accessor.normalized()
        || !matches!(accessor.data_type(), DataType::U8 | DataType::U16 | DataType::U32) {
        log::error!("HalaGltfImporter::mesh(): Mesh {} object ID attribute has an unexpected type.", id);
        return Err(HalaImporterError::query(&format!(
          "The mesh {} object ID attribute {} has unexpected type {:?}/{:?}.",
          id,
          self.options.object_id_attribute,
          accessor.dimensions(),
          accessor.data_type(),
        )));
      }
      let ids = self.buffers.read_components(&accessor, callback)?;
      data.add_attribute(HalaMeshAttribute::ObjectId, HalaVertexData::U32(ids.into_iter().map(|v| v as u32).collect()));
    }

    for (custom, name) in self.custom_attributes.iter().enumerate() {
      let Some(accessor) = primitive.get(&gltf::Semantic::Extras(name[1..].to_string())) else {
        continue;
      };
      let values = self.buffers.read_components(&accessor, callback)?;
      let integer = !accessor.normalized() && accessor.data_type() != DataType::F32;
      let values = match (accessor.dimensions(), integer) {
        (Dimensions::Scalar, true) => HalaVertexData::U32(values.iter().map(|&v| v as u32).collect()),
        (Dimensions::Scalar, false) => HalaVertexData::F32(values.iter().map(|&v| v as f32).collect()),
        (Dimensions::Vec2, _) => HalaVertexData::Vec2(values.chunks_exact(2).map(|v| Vec2::new(v[0] as f32, v[1] as f32)).collect()),
        (Dimensions::Vec3, _) => HalaVertexData::Vec3(values.chunks_exact(3).map(|v| Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32)).collect()),
        (Dimensions::Vec4, _) => HalaVertexData::Vec4(values.chunks_exact(4).map(|v| Vec4::new(v[0] as f32, v[1] as f32, v[2] as f32, v[3] as f32)).collect()),
        (dimensions, _) => {
          return Err(HalaImporterError::query(&format!(
            "The mesh {} attribute {} has unsupported type {:?}.",
            id,
            name,
            dimensions,
          )));
        },
      };
      data.add_attribute(HalaMeshAttribute::Custom(custom as u16), values);
    }

    if let Some(indices) = reader.read_indices() {
      let indices: Vec<u32> = indices.into_u32().collect();
      if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(HalaImporterError::query(&format!(
          "The mesh {} index {} is out of range for {} vertices.",
          id,
          index,
          vertex_count,
        )));
      }
      data.indices = Some(indices);
    } else if self.options.generate_indices {
      data.remove_duplicates();
    }
    Ok(data)
  }

  fn light(&self, id: u32) -> Result<HalaLightData, HalaImporterError> {
    let light = self.document.lights()
      .and_then(|mut lights| lights.nth(id as usize))
      .ok_or_else(|| missing("light", id))?;
    let range = match light.range() {
      Some(range) if range != 0.0 => range,
      _ => f32::INFINITY,
    };

    // Punctual lights fall off with the inverse square of the distance.
    let falloff = Vec3::new(1.0, 0.0, 1.0);
    let (light_type, attenuation, cone) = match light.kind() {
      gltf::khr_lights_punctual::Kind::Directional => (HalaLightType::DIRECTIONAL, HalaLightData::CONSTANT_ATTENUATION, None),
      gltf::khr_lights_punctual::Kind::Point => (HalaLightType::POINT, falloff, None),
      gltf::khr_lights_punctual::Kind::Spot { inner_cone_angle, outer_cone_angle } => {
        // Half-angles in radians.
        if inner_cone_angle < 0.0 || inner_cone_angle >= outer_cone_angle || outer_cone_angle >= std::f32::consts::FRAC_PI_2 {
          log::error!("HalaGltfImporter::light(): Light {} cone angles are out of bounds.", id);
          return Err(HalaImporterError::query(&format!(
            "The light {} inner and outer cone angles {} and {} are out of the allowed bounds.",
            id,
            inner_cone_angle.to_degrees(),
            outer_cone_angle.to_degrees(),
          )));
        }
        (HalaLightType::SPOT, falloff, Some((inner_cone_angle, outer_cone_angle)))
      },
    };
    if light_type == HalaLightType::DIRECTIONAL && range.is_finite() {
      log::error!("HalaGltfImporter::light(): Light {} is directional and has a range.", id);
      return Err(HalaImporterError::query(&format!("The light {} is directional, a range can not be defined.", id)));
    }

    let mut data = HalaLightData::new(light_type, Vec3::from(light.color()), light.intensity(), attenuation);
    data.range = range;
    (data.inner_cone_angle, data.outer_cone_angle) = match cone {
      Some((inner, outer)) => (inner.to_degrees() * 2.0, outer.to_degrees() * 2.0),
      None => (360.0, 360.0),
    };
    Ok(data)
  }

  fn camera(&self, id: u32) -> Result<HalaCameraData, HalaImporterError> {
    let camera = self.document.cameras().nth(id as usize).ok_or_else(|| missing("camera", id))?;
    match camera.projection() {
      gltf::camera::Projection::Perspective(perspective) => Ok(HalaCameraData::with_fov(
        perspective.yfov(),
        false,
        perspective.aspect_ratio().unwrap_or(1.0),
        perspective.znear(),
        perspective.zfar().unwrap_or(f32::INFINITY),
      )),
      gltf::camera::Projection::Orthographic(orthographic) => Ok(HalaCameraData::Orthographic(HalaOrthographicCameraData {
        size: Vec2::new(orthographic.xmag(), orthographic.ymag()) * 2.0,
        znear: orthographic.znear(),
        zfar: orthographic.zfar(),
      })),
    }
  }

  fn skin(&self, id: u32, callback: Option<&HalaFileCallback>) -> Result<HalaSkinData, HalaImporterError> {
    let skin = self.document.skins().nth(id as usize).ok_or_else(|| missing("skin", id))?;
    let joints: Vec<u32> = skin.joints().map(|joint| joint.index() as u32).collect();
    if joints.is_empty() {
      log::error!("HalaGltfImporter::skin(): Skin {} has no joints.", id);
      return Err(HalaImporterError::query(&format!("The skin {} has no joints.", id)));
    }

    let inverse_bind_matrices = match skin.inverse_bind_matrices() {
      None => vec![Mat4::IDENTITY; joints.len()],
      Some(accessor) => {
        if accessor.dimensions() != Dimensions::Mat4 || accessor.data_type() != DataType::F32 || accessor.normalized() {
          return Err(HalaImporterError::query(&format!(
            "The skin {} inverse bind matrices have unexpected type {:?}/{:?}.",
            id,
            accessor.dimensions(),
            accessor.data_type(),
          )));
        }
        self.buffers.check_accessor(&accessor, callback)?;
        let buffers = self.buffers.loaded();
        let reader = skin.reader(|buffer| buffers.get(buffer.index()).and_then(|data| data.as_deref()));
        let matrices: Vec<Mat4> = reader.read_inverse_bind_matrices()
          .map(|matrices| matrices.map(|m| Mat4::from_cols_array_2d(&m)).collect())
          .unwrap_or_default();
        if matrices.len() != joints.len() {
          return Err(HalaImporterError::query(&format!(
            "The skin {} has {} inverse bind matrices, expected {}.",
            id,
            matrices.len(),
            joints.len(),
          )));
        }
        matrices
      },
    };
    Ok(HalaSkinData {
      joints,
      inverse_bind_matrices,
    })
  }

  /// Merged clips are reported as a single animation.
  fn animation_count(&self) -> u32 {
    let count = self.document.animations().count() as u32;
    if self.options.merge_animation_clips {
      count.min(1)
    } else {
      count
    }
  }

  fn animation(&self, id: u32, callback: Option<&HalaFileCallback>) -> Result<HalaAnimationData, HalaImporterError> {
    let animations: Vec<gltf::Animation> = if self.options.merge_animation_clips {
      self.document.animations().collect()
    } else {
      vec![self.document.animations().nth(id as usize).ok_or_else(|| missing("animation", id))?]
    };
    let mut tracks = Vec::new();
    for animation in animations.iter() {
      for channel in animation.channels() {
        tracks.push(self.animation_track(animation.index() as u32, &channel, callback)?);
      }
    }
    log::debug!("HalaGltfImporter::animation(): Animation {} has {} tracks.", id, tracks.len());
    Ok(HalaAnimationData {
      tracks,
    })
  }

  /// Read the keyframes of a channel as authored, without resampling.
  /// param id: The animation the channel belongs to, used in the messages.
  /// param channel: The channel.
  /// param callback: The file callback for external buffers.
  /// return: The track.
  fn animation_track(
    &self,
    id: u32,
    channel: &gltf::animation::Channel,
    callback: Option<&HalaFileCallback>,
  ) -> Result<HalaAnimationTrack, HalaImporterError> {
    use gltf::animation::{
      util::ReadOutputs,
      Interpolation,
      Property,
    };
    let target = channel.target();
    let (property, dimensions) = match target.property() {
      Property::Translation => (HalaAnimationTarget::TRANSLATION, Dimensions::Vec3),
      Property::Rotation => (HalaAnimationTarget::ROTATION, Dimensions::Vec4),
      Property::Scale => (HalaAnimationTarget::SCALING, Dimensions::Vec3),
      Property::MorphTargetWeights => {
        log::error!("HalaGltfImporter::animation(): Animation {} targets morph weights.", id);
        return Err(HalaImporterError::query(&format!("The animation {} targets morph weights, which are not supported.", id)));
      },
    };
    let sampler = channel.sampler();
    let (interpolation, values_per_key) = match sampler.interpolation() {
      Interpolation::Step => (HalaAnimationInterpolation::CONSTANT, 1),
      Interpolation::Linear => (HalaAnimationInterpolation::LINEAR, 1),
      Interpolation::CubicSpline => (HalaAnimationInterpolation::SPLINE, 3),
    };

    let input = sampler.input();
    let output = sampler.output();
    if input.dimensions() != Dimensions::Scalar || input.data_type() != DataType::F32 {
      return Err(HalaImporterError::query(&format!(
        "The animation {} time track has unexpected type {:?}/{:?}.",
        id,
        input.dimensions(),
        input.data_type(),
      )));
    }
    if output.dimensions() != dimensions || output.data_type() != DataType::F32 {
      return Err(HalaImporterError::query(&format!(
        "The animation {} output track has unexpected type {:?}/{:?}, expected {:?}/F32.",
        id,
        output.dimensions(),
        output.data_type(),
        dimensions,
      )));
    }
    if output.count() != input.count() * values_per_key {
      return Err(HalaImporterError::query(&format!(
        "The animation {} has {} output values for {} keys, expected {} per key.",
        id,
        output.count(),
        input.count(),
        values_per_key,
      )));
    }
    self.buffers.check_accessor(&input, callback)?;
    self.buffers.check_accessor(&output, callback)?;

    let buffers = self.buffers.loaded();
    let reader = channel.reader(|buffer| buffers.get(buffer.index()).and_then(|data| data.as_deref()));
    let keys: Vec<f32> = reader.read_inputs().map(|inputs| inputs.collect()).unwrap_or_default();
    let values = match reader.read_outputs() {
      Some(ReadOutputs::Translations(values)) | Some(ReadOutputs::Scales(values)) => {
        let values: Vec<Vec3> = values.map(Vec3::from_array).collect();
        if values_per_key == 3 {
          HalaAnimationValues::CubicHermiteVec3(cubic_hermite(&keys, &values))
        } else {
          HalaAnimationValues::Vec3(values)
        }
      },
      Some(ReadOutputs::Rotations(values)) => {
        let mut values: Vec<Quat> = values.into_f32().map(Quat::from_array).collect();
        if values_per_key == 3 {
          HalaAnimationValues::CubicHermiteQuat(cubic_hermite(&keys, &values))
        } else {
          if self.options.optimize_quaternion_shortest_path {
            for i in 1..values.len() {
              if values[i - 1].dot(values[i]) < 0.0 {
                values[i] = -values[i];
              }
            }
          }
          if self.options.normalize_quaternions {
            for value in values.iter_mut().filter(|value| value.length_squared() > 0.0) {
              *value = value.normalize();
            }
          }
          HalaAnimationValues::Quat(values)
        }
      },
      _ => return Err(HalaImporterError::query(&format!("The animation {} output could not be read.", id))),
    };
    if keys.len() != input.count() || values.len() != keys.len() {
      return Err(HalaImporterError::query(&format!("The animation {} keyframes could not be read.", id)));
    }

    Ok(HalaAnimationTrack {
      object: target.node().index() as u32,
      target: property,
      interpolation,
      keys,
      values,
    })
  }

  fn texture(&self, id: u32) -> Result<HalaTextureData, HalaImporterError> {
    let texture = self.document.textures().nth(id as usize).ok_or_else(|| missing("texture", id))?;
    let sampler = texture.sampler();
    use gltf::texture::{
      MagFilter,
      MinFilter,
      WrappingMode,
    };
    let (minification_filter, mipmap_filter) = match sampler.min_filter() {
      None | Some(MinFilter::LinearMipmapLinear) => (HalaSamplerFilter::LINEAR, HalaSamplerMipmap::LINEAR),
      Some(MinFilter::Nearest) => (HalaSamplerFilter::NEAREST, HalaSamplerMipmap::BASE),
      Some(MinFilter::Linear) => (HalaSamplerFilter::LINEAR, HalaSamplerMipmap::BASE),
      Some(MinFilter::NearestMipmapNearest) => (HalaSamplerFilter::NEAREST, HalaSamplerMipmap::NEAREST),
      Some(MinFilter::LinearMipmapNearest) => (HalaSamplerFilter::LINEAR, HalaSamplerMipmap::NEAREST),
      Some(MinFilter::NearestMipmapLinear) => (HalaSamplerFilter::NEAREST, HalaSamplerMipmap::LINEAR),
    };
    let magnification_filter = match sampler.mag_filter() {
      Some(MagFilter::Nearest) => HalaSamplerFilter::NEAREST,
      _ => HalaSamplerFilter::LINEAR,
    };
    let wrap = |mode: WrappingMode| match mode {
      WrappingMode::Repeat => HalaSamplerWrapping::REPEAT,
      WrappingMode::MirroredRepeat => HalaSamplerWrapping::MIRRORED_REPEAT,
      WrappingMode::ClampToEdge => HalaSamplerWrapping::CLAMP_TO_EDGE,
    };
    Ok(HalaTextureData {
      minification_filter,
      magnification_filter,
      mipmap_filter,
      wrapping: [wrap(sampler.wrap_s()), wrap(sampler.wrap_t()), HalaSamplerWrapping::REPEAT],
      image: texture.source().index() as u32,
    })
  }

  /// Add a texture reference with its coordinate set and transform.
  /// param data: The material data.
  /// param name: The texture attribute name.
  /// param texture: The texture index.
  /// param tex_coord: The texture coordinate set.
  /// param raw: The raw JSON of the texture reference.
  fn material_texture(data: &mut HalaMaterialData, name: &str, texture: usize, tex_coord: u32, raw: Option<&serde_json::Value>) {
    let mut tex_coord = tex_coord;
    let transform = raw.and_then(|r| r.get("extensions")).and_then(|e| e.get("KHR_texture_transform"));
    if let Some(transform) = transform {
      let vec2 = |key: &str, default: Vec2| transform.get(key)
        .and_then(|v| v.as_array())
        .and_then(|v| Some(Vec2::new(v.first()?.as_f64()? as f32, v.get(1)?.as_f64()? as f32)))
        .unwrap_or(default);
      let offset = vec2("offset", Vec2::ZERO);
      let scale = vec2("scale", Vec2::ONE);
      let rotation = transform.get("rotation").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
      if let Some(set) = transform.get("texCoord").and_then(|v| v.as_u64()) {
        tex_coord = set as u32;
      }
      let matrix = Mat3::from_translation(offset) * Mat3::from_angle(-rotation) * Mat3::from_scale(scale);
      data.set(&format!("{}Matrix", name), HalaMaterialValue::Matrix3(matrix));
    }
    if tex_coord != 0 {
      data.set(&format!("{}Coordinates", name), HalaMaterialValue::UInt(tex_coord));
    }
    data.set(name, HalaMaterialValue::Texture(texture as u32));
  }

  fn material(&self, id: u32) -> Result<HalaMaterialData, HalaImporterError> {
    let material = self.document.materials().nth(id as usize).ok_or_else(|| missing("material", id))?;
    let raw = self.json.get("materials").and_then(|m| m.get(id as usize));
    let raw_at = |path: &[&str]| path.iter().try_fold(raw?, |value, key| value.get(key));
    let mut data = HalaMaterialData::new(HalaMaterialTypes::NONE);

    match material.alpha_mode() {
      gltf::material::AlphaMode::Blend => data.set("AlphaBlend", HalaMaterialValue::Bool(true)),
      gltf::material::AlphaMode::Mask => {
        let cutoff = raw_at(&["alphaCutoff"]).and_then(|v| v.as_f64()).unwrap_or(0.5) as f32;
        data.set("AlphaMask", HalaMaterialValue::Float(cutoff));
      },
      gltf::material::AlphaMode::Opaque => {},
    }
    if material.double_sided() {
      data.set("DoubleSided", HalaMaterialValue::Bool(true));
    }

    if raw_at(&["pbrMetallicRoughness"]).is_some() {
      data.types |= HalaMaterialTypes::PBR_METALLIC_ROUGHNESS;
      let pbr = material.pbr_metallic_roughness();
      let base_color = Vec4::from(pbr.base_color_factor());
      if base_color != Vec4::ONE {
        data.set("BaseColor", HalaMaterialValue::Vec4(base_color));
      }
      if pbr.metallic_factor() != 1.0 {
        data.set("Metalness", HalaMaterialValue::Float(pbr.metallic_factor()));
      }
      if pbr.roughness_factor() != 1.0 {
        data.set("Roughness", HalaMaterialValue::Float(pbr.roughness_factor()));
      }
      if let Some(info) = pbr.base_color_texture() {
        let raw = raw_at(&["pbrMetallicRoughness", "baseColorTexture"]);
        Self::material_texture(&mut data, "BaseColorTexture", info.texture().index(), info.tex_coord(), raw);
      }
      if let Some(info) = pbr.metallic_roughness_texture() {
        let raw = raw_at(&["pbrMetallicRoughness", "metallicRoughnessTexture"]);
        Self::material_texture(&mut data, "MetallicRoughnessTexture", info.texture().index(), info.tex_coord(), raw);
      }
    }

    if let Some(pbr) = material.pbr_specular_glossiness() {
      data.types |= HalaMaterialTypes::PBR_SPECULAR_GLOSSINESS;
      let extension = ["extensions", "KHR_materials_pbrSpecularGlossiness"];
      let diffuse = Vec4::from(pbr.diffuse_factor());
      if diffuse != Vec4::ONE {
        data.set("DiffuseColor", HalaMaterialValue::Vec4(diffuse));
      }
      let specular = Vec3::from(pbr.specular_factor());
      if specular != Vec3::ONE {
        // The alpha stays zero to not affect transparency.
        data.set("SpecularColor", HalaMaterialValue::Vec4(specular.extend(0.0)));
      }
      if pbr.glossiness_factor() != 1.0 {
        data.set("Glossiness", HalaMaterialValue::Float(pbr.glossiness_factor()));
      }
      if let Some(info) = pbr.diffuse_texture() {
        let raw = raw_at(&[extension[0], extension[1], "diffuseTexture"]);
        Self::material_texture(&mut data, "DiffuseTexture", info.texture().index(), info.tex_coord(), raw);
      }
      if let Some(info) = pbr.specular_glossiness_texture() {
        let raw = raw_at(&[extension[0], extension[1], "specularGlossinessTexture"]);
        Self::material_texture(&mut data, "SpecularGlossinessTexture", info.texture().index(), info.tex_coord(), raw);
      }
    }

    // Unlit replaces every other type.
    if material.unlit() {
      data.types = HalaMaterialTypes::FLAT;
    }

    if let Some(normal) = material.normal_texture() {
      Self::material_texture(&mut data, "NormalTexture", normal.texture().index(), normal.tex_coord(), raw_at(&["normalTexture"]));
      if normal.scale() != 1.0 {
        data.set("NormalTextureScale", HalaMaterialValue::Float(normal.scale()));
      }
    }
    if let Some(occlusion) = material.occlusion_texture() {
      Self::material_texture(&mut data, "OcclusionTexture", occlusion.texture().index(), occlusion.tex_coord(), raw_at(&["occlusionTexture"]));
      if occlusion.strength() != 1.0 {
        data.set("OcclusionTextureStrength", HalaMaterialValue::Float(occlusion.strength()));
      }
    }

    let emissive = Vec3::from(material.emissive_factor()) * material.emissive_strength().unwrap_or(1.0);
    if emissive != Vec3::ZERO {
      data.set("EmissiveColor", HalaMaterialValue::Vec3(emissive));
    }
    if let Some(info) = material.emissive_texture() {
      Self::material_texture(&mut data, "EmissiveTexture", info.texture().index(), info.tex_coord(), raw_at(&["emissiveTexture"]));
    }
    Ok(data)
  }

  /// Fetch the encoded data of an image from a buffer view or a URI.
  fn image_bytes(&self, id: u32, callback: Option<&HalaFileCallback>) -> Result<Vec<u8>, HalaImporterError> {
    let image = self.document.images().nth(id as usize).ok_or_else(|| missing("image", id))?;
    match image.source() {
      gltf::image::Source::View { view, .. } => {
        let data = self.buffers.view_data(&view, callback)?;
        Ok(data[view.offset()..view.offset() + view.length()].to_vec())
      },
      gltf::image::Source::Uri { uri, .. } => {
        self.buffers.load_uri(uri, "image", callback, HalaInputFileCallbackPolicy::LoadTemporary)
      },
    }
  }

  fn mesh_name(&self, id: u32) -> String {
    self.chunks.get(id)
      .and_then(|chunk| self.document.meshes().nth(chunk.mesh as usize))
      .map(|mesh| name_of(mesh.name()))
      .unwrap_or_default()
  }
}

impl HalaImporter for HalaGltfImporter {
  fn configuration(&self) -> &HalaConfiguration {
    &self.configuration
  }

  fn configuration_mut(&mut self) -> &mut HalaConfiguration {
    &mut self.configuration
  }

  fn set_file_callback(&mut self, callback: Option<HalaFileCallback>) {
    self.callback = callback;
  }

  fn set_image_importer(&mut self, importer: Box<dyn HalaImageImporter>) {
    self.images = HalaImageCache::new(importer);
  }

  fn is_opened(&self) -> bool {
    self.state.is_some()
  }

  fn close(&mut self) {
    self.state = None;
    self.images.clear();
  }

  fn open_data(&mut self, data: &[u8]) -> Result<(), HalaImporterError> {
    self.open_bytes(data, None)
  }

  fn open_file(&mut self, path: &Path) -> Result<(), HalaImporterError> {
    self.close();
    let data = load_external(self.callback.as_ref(), path, HalaInputFileCallbackPolicy::LoadTemporary).ok_or_else(|| {
      HalaImporterError::open(&format!("Cannot open file \"{}\".", path.to_string_lossy()))
    })?;
    let base_dir = path.parent().map(|p| p.to_path_buf());
    self.open_bytes(&data, base_dir)
  }

  fn scene_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.scenes().count() as u32)
  }

  fn default_scene(&self) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    // Files without a default scene use the first one.
    Ok(match state.document.default_scene() {
      Some(scene) => Some(scene.index() as u32),
      None if state.document.scenes().count() > 0 => Some(0),
      None => None,
    })
  }

  fn scene_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.scene_names.find(name, || state.document.scenes().map(|s| name_of(s.name()))))
  }

  fn scene_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("scene", id, self.scene_count()?)?;
    Ok(state.document.scenes().nth(index).map(|s| name_of(s.name())).unwrap_or_default())
  }

  fn scene(&self, id: u32) -> Result<HalaSceneData, HalaImporterError> {
    let state = self.state()?;
    check_id("scene", id, self.scene_count()?)?;
    state.scene(id)
  }

  fn object_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.nodes.len() as u32)
  }

  fn object_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.object_names.find(name, || state.document.nodes().map(|n| name_of(n.name()))))
  }

  fn object_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("object", id, state.nodes.len() as u32)?;
    Ok(state.document.nodes().nth(index).map(|n| name_of(n.name())).unwrap_or_default())
  }

  fn mesh_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.chunks.len())
  }

  fn mesh_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.mesh_names.find(name, || (0..state.chunks.len()).map(|id| state.mesh_name(id))))
  }

  fn mesh_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    check_id("mesh", id, state.chunks.len())?;
    Ok(state.mesh_name(id))
  }

  fn mesh(&self, id: u32) -> Result<HalaMeshData, HalaImporterError> {
    let state = self.state()?;
    check_id("mesh", id, state.chunks.len())?;
    state.mesh(id, self.callback.as_ref())
  }

  fn mesh_attribute_for_name(&self, name: &str) -> Result<Option<HalaMeshAttribute>, HalaImporterError> {
    let state = self.state()?;
    if name == state.options.object_id_attribute {
      return Ok(Some(HalaMeshAttribute::ObjectId));
    }
    Ok(state.custom_attributes.iter().position(|n| n == name).map(|i| HalaMeshAttribute::Custom(i as u16)))
  }

  fn mesh_attribute_name(&self, attribute: HalaMeshAttribute) -> Result<Option<String>, HalaImporterError> {
    let state = self.state()?;
    Ok(match attribute {
      HalaMeshAttribute::ObjectId => Some(state.options.object_id_attribute.clone()),
      HalaMeshAttribute::Custom(id) => state.custom_attributes.get(id as usize).cloned(),
      _ => None,
    })
  }

  fn light_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.lights().map_or(0, |lights| lights.count()) as u32)
  }

  fn light_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.light_names.find(name, || {
      state.document.lights().into_iter().flatten().map(|l| name_of(l.name())).collect::<Vec<_>>()
    }))
  }

  fn light_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("light", id, self.light_count()?)?;
    Ok(state.document.lights().and_then(|mut lights| lights.nth(index)).map(|l| name_of(l.name())).unwrap_or_default())
  }

  fn light(&self, id: u32) -> Result<HalaLightData, HalaImporterError> {
    let state = self.state()?;
    check_id("light", id, self.light_count()?)?;
    state.light(id)
  }

  fn camera_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.cameras().count() as u32)
  }

  fn camera_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.camera_names.find(name, || state.document.cameras().map(|c| name_of(c.name()))))
  }

  fn camera_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("camera", id, self.camera_count()?)?;
    Ok(state.document.cameras().nth(index).map(|c| name_of(c.name())).unwrap_or_default())
  }

  fn camera(&self, id: u32) -> Result<HalaCameraData, HalaImporterError> {
    let state = self.state()?;
    check_id("camera", id, self.camera_count()?)?;
    state.camera(id)
  }

  fn skin_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.skins().count() as u32)
  }

  fn skin_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.skin_names.find(name, || state.document.skins().map(|s| name_of(s.name()))))
  }

  fn skin_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("skin", id, self.skin_count()?)?;
    Ok(state.document.skins().nth(index).map(|s| name_of(s.name())).unwrap_or_default())
  }

  fn skin(&self, id: u32) -> Result<HalaSkinData, HalaImporterError> {
    let state = self.state()?;
    check_id("skin", id, self.skin_count()?)?;
    state.skin(id, self.callback.as_ref())
  }

  fn animation_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.animation_count())
  }

  fn animation_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    if state.options.merge_animation_clips {
      return Ok(None);
    }
    Ok(state.animation_names.find(name, || state.document.animations().map(|a| name_of(a.name()))))
  }

  fn animation_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("animation", id, self.animation_count()?)?;
    if state.options.merge_animation_clips {
      return Ok(String::new());
    }
    Ok(state.document.animations().nth(index).map(|a| name_of(a.name())).unwrap_or_default())
  }

  fn animation(&self, id: u32) -> Result<HalaAnimationData, HalaImporterError> {
    let state = self.state()?;
    check_id("animation", id, self.animation_count()?)?;
    state.animation(id, self.callback.as_ref())
  }

  fn material_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.materials().count() as u32)
  }

  fn material_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.material_names.find(name, || state.document.materials().map(|m| name_of(m.name()))))
  }

  fn material_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("material", id, self.material_count()?)?;
    Ok(state.document.materials().nth(index).map(|m| name_of(m.name())).unwrap_or_default())
  }

  fn material(&self, id: u32) -> Result<HalaMaterialData, HalaImporterError> {
    let state = self.state()?;
    check_id("material", id, self.material_count()?)?;
    state.material(id)
  }

  fn texture_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.textures().count() as u32)
  }

  fn texture_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.texture_names.find(name, || state.document.textures().map(|t| name_of(t.name()))))
  }

  fn texture_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("texture", id, self.texture_count()?)?;
    Ok(state.document.textures().nth(index).map(|t| name_of(t.name())).unwrap_or_default())
  }

  fn texture(&self, id: u32) -> Result<HalaTextureData, HalaImporterError> {
    let state = self.state()?;
    check_id("texture", id, self.texture_count()?)?;
    state.texture(id)
  }

  fn image_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.images().count() as u32)
  }

  fn image_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.image_names.find(name, || state.document.images().map(|i| name_of(i.name()))))
  }

  fn image_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("image", id, self.image_count()?)?;
    Ok(state.document.images().nth(index).map(|i| name_of(i.name())).unwrap_or_default())
  }

  fn image(&self, id: u32) -> Result<HalaImageData, HalaImporterError> {
    let state = self.state()?;
    check_id("image", id, self.image_count()?)?;
    let image = self.images.get(id, || state.image_bytes(id, self.callback.as_ref()))?;
    Ok(HalaImageData::clone(&image))
  }
}

#[cfg(test)]
mod tests {
  use std::rc::Rc;

  use base64::Engine;
  use serde_json::json;

  use super::*;

  fn triangle_buffer() -> Vec<u8> {
    let mut data = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
      data.extend(value.to_le_bytes());
    }
    for index in [0u16, 1, 2, 0] {
      data.extend(index.to_le_bytes());
    }
    data
  }

  fn data_uri(data: &[u8]) -> String {
    format!("data:application/octet-stream;base64,{}", base64::engine::general_purpose::STANDARD.encode(data))
  }

  fn document(buffer_uri: &str) -> serde_json::Value {
    json!({
      "asset": {"version": "2.0"},
      "scene": 0,
      "scenes": [{"name": "Main", "nodes": [0]}],
      "nodes": [
        {"name": "Root", "children": [1, 2], "translation": [1.0, 0.0, 0.0]},
        {"name": "A", "mesh": 0, "rotation": [0.0, 0.0, 0.0, 2.0]},
        {"name": "B", "mesh": 0, "matrix": [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 5.0, 0.0, 1.0]}
      ],
      "meshes": [{
        "name": "Tri",
        "primitives": [
          {"attributes": {"POSITION": 0}, "indices": 1, "material": 0},
          {"attributes": {"POSITION": 0}, "mode": 0}
        ]
      }],
      "materials": [{"name": "Red", "pbrMetallicRoughness": {"baseColorFactor": [1.0, 0.0, 0.0, 1.0]}}],
      "accessors": [
        {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
        {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
      ],
      "bufferViews": [
        {"buffer": 0, "byteOffset": 0, "byteLength": 36},
        {"buffer": 0, "byteOffset": 36, "byteLength": 6}
      ],
      "buffers": [{"uri": buffer_uri, "byteLength": 44}]
    })
  }

  fn open(json: &serde_json::Value, options: &[(&str, &str)]) -> Result<HalaGltfImporter, HalaImporterError> {
    let mut importer = HalaGltfImporter::new();
    for (key, value) in options {
      importer.configuration_mut().set(key, value);
    }
    importer.open_data(&serde_json::to_vec(json).unwrap())?;
    Ok(importer)
  }

  #[test]
  fn scene_fields_follow_the_breadth_first_order() {
    let importer = open(&document(&data_uri(&triangle_buffer())), &[]).unwrap();
    assert_eq!(importer.default_scene().unwrap(), Some(0));
    assert_eq!(importer.scene_for_name("Main").unwrap(), Some(0));
    assert_eq!(importer.object_count().unwrap(), 3);
    assert_eq!(importer.mesh_count().unwrap(), 2);

    let scene = importer.scene(0).unwrap();
    assert_eq!(scene.mapping_bound, 3);
    assert_eq!(scene.parents.mapping, HalaSceneMapping::Ordered);
    assert_eq!(scene.parents.objects(), &[0, 1, 2]);
    assert_eq!(scene.parents.values(), &[None, Some(0), Some(0)]);

    // Node 2 only has a matrix, so every transformed node gets one.
    assert_eq!(scene.transformations.objects(), &[0, 1, 2]);
    assert_eq!(scene.translations.objects(), &[0, 1]);
    assert_eq!(*scene.rotations.get(1).unwrap(), Quat::IDENTITY);
    assert!(scene.scalings.is_empty());
    assert_eq!(scene.world_transforms()[2].w_axis.truncate(), Vec3::new(1.0, 5.0, 0.0));

    assert_eq!(scene.meshes.objects(), &[1, 1, 2, 2]);
    let instances: Vec<_> = scene.meshes.values().iter().map(|i| (i.mesh, i.material)).collect();
    assert_eq!(instances, vec![(0, Some(0)), (1, None), (0, Some(0)), (1, None)]);
  }

  #[test]
  fn primitives_are_separate_meshes() {
    let importer = open(&document(&data_uri(&triangle_buffer())), &[]).unwrap();
    let triangles = importer.mesh(0).unwrap();
    assert_eq!(triangles.primitive, HalaMeshPrimitive::TRIANGLES);
    assert_eq!(triangles.indices, Some(vec![0, 1, 2]));
    assert_eq!(triangles.positions().unwrap()[1], Vec3::X);

    let points = importer.mesh(1).unwrap();
    assert_eq!(points.primitive, HalaMeshPrimitive::POINTS);
    assert_eq!(points.indices, None);
    assert_eq!(importer.mesh_name(1).unwrap(), "Tri");
    assert_eq!(importer.mesh_for_name("Tri").unwrap(), Some(0));

    let importer = open(&document(&data_uri(&triangle_buffer())), &[("generateIndices", "true")]).unwrap();
    assert_eq!(importer.mesh(1).unwrap().indices, Some(vec![0, 1, 2]));
  }

  #[test]
  fn node_cycles_and_shared_children_are_rejected() {
    let mut json = document(&data_uri(&triangle_buffer()));
    json["nodes"][1]["children"] = json!([0]);
    let err = open(&json, &[]).err().unwrap();
    assert_eq!(err.kind(), HalaImporterErrorKind::Open);
    assert!(err.message().contains("cycle"));

    let mut json = document(&data_uri(&triangle_buffer()));
    json["nodes"][1]["children"] = json!([2]);
    let err = open(&json, &[]).err().unwrap();
    assert!(err.message().contains("parents"));
  }

  #[test]
  fn versions_and_required_extensions_are_checked() {
    let mut json = document(&data_uri(&triangle_buffer()));
    json["asset"]["version"] = json!("1.0");
    assert_eq!(open(&json, &[]).err().unwrap().kind(), HalaImporterErrorKind::Open);

    let mut json = document(&data_uri(&triangle_buffer()));
    json["extensionsRequired"] = json!(["KHR_texture_transform", "EXT_unknown"]);
    assert!(open(&json, &[]).err().unwrap().message().contains("EXT_unknown"));
    assert!(open(&json, &[("ignoreRequiredExtensions", "true")]).is_ok());
  }

  #[test]
  fn external_buffers_go_through_the_callback() {
    let json = document("tri%20angle.bin");
    let importer = open(&json, &[]).unwrap();
    assert_eq!(importer.mesh(0).unwrap_err().kind(), HalaImporterErrorKind::ResourceUnavailable);

    let mut importer = HalaGltfImporter::new();
    importer.set_file_callback(Some(Rc::new(|name: &str, _policy: HalaInputFileCallbackPolicy| {
      (name == "tri angle.bin").then(triangle_buffer)
    })));
    importer.open_data(&serde_json::to_vec(&json).unwrap()).unwrap();
    assert_eq!(importer.mesh(0).unwrap().vertex_count, 3);
  }

  fn animation_buffer() -> Vec<u8> {
    let mut values = vec![0.0f32, 1.0, 3.0];
    values.extend([0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
    values.extend([0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 2.0]);
    for key in 0..3 {
      values.extend([1.0, 1.0, 1.0]);
      values.extend([key as f32; 3]);
      values.extend([1.0, 1.0, 1.0]);
    }
    values.iter().flat_map(|value| value.to_le_bytes()).collect()
  }

  fn animated_document() -> serde_json::Value {
    let mut json = document(&data_uri(&triangle_buffer()));
    json["buffers"].as_array_mut().unwrap().push(json!({"uri": data_uri(&animation_buffer()), "byteLength": 204}));
    let views = json["bufferViews"].as_array_mut().unwrap();
    for (offset, length) in [(0, 12), (12, 36), (48, 48), (96, 108)] {
      views.push(json!({"buffer": 1, "byteOffset": offset, "byteLength": length}));
    }
    let accessors = json["accessors"].as_array_mut().unwrap();
    accessors.push(json!({"bufferView": 2, "componentType": 5126, "count": 3, "type": "SCALAR"}));
    accessors.push(json!({"bufferView": 3, "componentType": 5126, "count": 3, "type": "VEC3"}));
    accessors.push(json!({"bufferView": 4, "componentType": 5126, "count": 3, "type": "VEC4"}));
    accessors.push(json!({"bufferView": 5, "componentType": 5126, "count": 9, "type": "VEC3"}));
    json["animations"] = json!([
      {
        "name": "Walk",
        "channels": [
          {"sampler": 0, "target": {"node": 1, "path": "translation"}},
          {"sampler": 1, "target": {"node": 1, "path": "rotation"}}
        ],
        "samplers": [
          {"input": 2, "output": 3, "interpolation": "LINEAR"},
          {"input": 2, "output": 4, "interpolation": "STEP"}
        ]
      },
      {
        "name": "Pulse",
        "channels": [{"sampler": 0, "target": {"node": 2, "path": "scale"}}],
        "samplers": [{"input": 2, "output": 5, "interpolation": "CUBICSPLINE"}]
      }
    ]);
    json
  }

  #[test]
  fn animations_keep_the_authored_keyframes() {
    let importer = open(&animated_document(), &[]).unwrap();
    assert_eq!(importer.animation_count().unwrap(), 2);
    assert_eq!(importer.animation_for_name("Pulse").unwrap(), Some(1));
    assert_eq!(importer.animation_for_name("Run").unwrap(), None);
    assert_eq!(importer.animation_name(0).unwrap(), "Walk");
    assert_eq!(importer.animation(2).unwrap_err().kind(), HalaImporterErrorKind::Query);

    let walk = importer.animation(0).unwrap();
    assert_eq!(walk.tracks.len(), 2);
    assert_eq!(walk.duration(), Some((0.0, 3.0)));
    let translation = &walk.tracks[0];
    assert_eq!(translation.object, 1);
    assert_eq!(translation.target, HalaAnimationTarget::TRANSLATION);
    assert_eq!(translation.interpolation, HalaAnimationInterpolation::LINEAR);
    assert_eq!(translation.keys, vec![0.0, 1.0, 3.0]);
    assert_eq!(translation.values, HalaAnimationValues::Vec3(vec![Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)]));
    let rotation = &walk.tracks[1];
    assert_eq!(rotation.interpolation, HalaAnimationInterpolation::CONSTANT);
    assert_eq!(rotation.values, HalaAnimationValues::Quat(vec![Quat::IDENTITY; 3]));

    let pulse = importer.animation(1).unwrap();
    assert_eq!(pulse.tracks[0].object, 2);
    assert_eq!(pulse.tracks[0].target, HalaAnimationTarget::SCALING);
    assert_eq!(pulse.tracks[0].interpolation, HalaAnimationInterpolation::SPLINE);
    let HalaAnimationValues::CubicHermiteVec3(frames) = &pulse.tracks[0].values else {
      panic!("expected spline values");
    };
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[1].point, Vec3::ONE);
    assert_eq!(frames[0].in_tangent, Vec3::ONE);
    assert_eq!(frames[0].out_tangent, Vec3::ONE);
    assert_eq!(frames[1].in_tangent, Vec3::ONE);
    assert_eq!(frames[1].out_tangent, Vec3::splat(2.0));
    assert_eq!(frames[2].in_tangent, Vec3::splat(2.0));
    assert_eq!(frames[2].out_tangent, Vec3::ONE);
  }

  #[test]
  fn animation_options_change_the_clips() {
    let importer = open(&animated_document(), &[("mergeAnimationClips", "true"), ("optimizeQuaternionShortestPath", "false")]).unwrap();
    assert_eq!(importer.animation_count().unwrap(), 1);
    assert_eq!(importer.animation_for_name("Walk").unwrap(), None);
    assert_eq!(importer.animation_name(0).unwrap(), "");
    let merged = importer.animation(0).unwrap();
    assert_eq!(merged.tracks.len(), 3);
    assert_eq!(merged.tracks[2].object, 2);
    assert_eq!(
      merged.tracks[1].values,
      HalaAnimationValues::Quat(vec![Quat::IDENTITY, Quat::from_xyzw(0.0, 0.0, 0.0, -1.0), Quat::IDENTITY]),
    );
  }

  #[test]
  fn malformed_animation_channels_fail_the_query() {
    let mut json = animated_document();
    json["animations"][1]["samplers"][0]["interpolation"] = json!("LINEAR");
    json["animations"][0]["channels"][1]["target"]["path"] = json!("weights");
    let importer = open(&json, &[]).unwrap();
    let err = importer.animation(1).unwrap_err();
    assert_eq!(err.kind(), HalaImporterErrorKind::Query);
    assert!(err.message().contains("expected 1 per key"));
    assert!(importer.animation(0).unwrap_err().message().contains("morph weights"));
  }

  #[test]
  fn reopening_gives_the_same_tables() {
    let data = serde_json::to_vec(&animated_document()).unwrap();
    let mut importer = HalaGltfImporter::new();
    importer.open_data(&data).unwrap();
    let scene = importer.scene(0).unwrap();
    let meshes: Vec<_> = (0..importer.mesh_count().unwrap()).map(|id| importer.mesh(id).unwrap()).collect();
    let animation = importer.animation(0).unwrap();

    importer.open_data(&data).unwrap();
    assert_eq!(importer.scene(0).unwrap(), scene);
    assert_eq!(importer.animation(0).unwrap(), animation);
    for (id, mesh) in meshes.iter().enumerate() {
      assert_eq!(&importer.mesh(id as u32).unwrap(), mesh);
    }
  }

  #[test]
  fn short_buffers_fail_the_query() {
    let json = document(&data_uri(&triangle_buffer()[..40]));
    let importer = open(&json, &[]).unwrap();
    let err = importer.mesh(0).unwrap_err();
    assert_eq!(err.kind(), HalaImporterErrorKind::Query);
    assert!(err.message().contains("too short"));
  }

  #[test]
  fn punctual_lights_are_validated() {
    let mut json = document(&data_uri(&triangle_buffer()));
    json["extensions"] = json!({"KHR_lights_punctual": {"lights": [
      {"name": "Spot", "type": "spot", "range": 0.0, "spot": {"innerConeAngle": 0.25, "outerConeAngle": 0.5}},
      {"type": "directional", "range": 5.0},
      {"type": "spot", "spot": {"innerConeAngle": 0.6, "outerConeAngle": 0.5}},
      {"type": "point", "color": [1.0, 0.5, 0.0], "intensity": 3.0}
    ]}});
    json["nodes"][0]["extensions"] = json!({"KHR_lights_punctual": {"light": 0}});
    let importer = open(&json, &[]).unwrap();
    assert_eq!(importer.light_count().unwrap(), 4);
    assert_eq!(importer.light_for_name("Spot").unwrap(), Some(0));

    let spot = importer.light(0).unwrap();
    assert_eq!(spot.light_type, HalaLightType::SPOT);
    assert_eq!(spot.range, f32::INFINITY);
    assert!((spot.outer_cone_angle - 1.0f32.to_degrees()).abs() < 1e-4);
    assert_eq!(importer.light(1).unwrap_err().kind(), HalaImporterErrorKind::Query);
    assert_eq!(importer.light(2).unwrap_err().kind(), HalaImporterErrorKind::Query);
    let point = importer.light(3).unwrap();
    assert_eq!(point.color, Vec3::new(1.0, 0.5, 0.0));
    assert_eq!(point.outer_cone_angle, 360.0);

    let scene = importer.scene(0).unwrap();
    assert_eq!(scene.lights.objects(), &[0]);
    assert_eq!(scene.lights.values(), &[0]);
  }

  #[test]
  fn cameras_use_near_plane_sizes() {
    let mut json = document(&data_uri(&triangle_buffer()));
    json["cameras"] = json!([
      {"type": "perspective", "perspective": {"yfov": 1.0, "aspectRatio": 2.0, "znear": 0.5}},
      {"type": "orthographic", "orthographic": {"xmag": 2.0, "ymag": 1.0, "znear": 0.1, "zfar": 10.0}}
    ]);
    let importer = open(&json, &[]).unwrap();
    match importer.camera(0).unwrap() {
      HalaCameraData::Perspective(camera) => {
        let height = 2.0 * 0.5 * 0.5f32.tan();
        assert!((camera.size.y - height).abs() < 1e-6);
        assert!((camera.size.x - 2.0 * height).abs() < 1e-6);
        assert_eq!(camera.zfar, f32::INFINITY);
      },
      camera => panic!("unexpected camera {:?}", camera),
    }
    match importer.camera(1).unwrap() {
      HalaCameraData::Orthographic(camera) => assert_eq!(camera.size, Vec2::new(4.0, 2.0)),
      camera => panic!("unexpected camera {:?}", camera),
    }
  }

  #[test]
  fn textures_map_samplers_and_source_extensions() {
    let mut json = document(&data_uri(&triangle_buffer()));
    json["images"] = json!([{"uri": "a.png", "name": "A"}, {"uri": "b.ktx2", "name": "B"}]);
    json["samplers"] = json!([{"magFilter": 9728, "minFilter": 9985, "wrapS": 33071, "wrapT": 33648}]);
    json["textures"] = json!([
      {"name": "Basis", "sampler": 0, "source": 0, "extensions": {"KHR_texture_basisu": {"source": 1}}},
      {"source": 0}
    ]);
    let importer = open(&json, &[]).unwrap();
    let texture = importer.texture(0).unwrap();
    assert_eq!(texture.image, 1);
    assert_eq!(texture.magnification_filter, HalaSamplerFilter::NEAREST);
    assert_eq!((texture.minification_filter, texture.mipmap_filter), (HalaSamplerFilter::LINEAR, HalaSamplerMipmap::NEAREST));
    assert_eq!(texture.wrapping, [HalaSamplerWrapping::CLAMP_TO_EDGE, HalaSamplerWrapping::MIRRORED_REPEAT, HalaSamplerWrapping::REPEAT]);
    assert_eq!(importer.texture(1).unwrap(), HalaTextureData::new(0));
    assert_eq!(importer.image_for_name("B").unwrap(), Some(1));
    assert_eq!(importer.image(0).unwrap_err().kind(), HalaImporterErrorKind::ResourceUnavailable);
  }

  #[test]
  fn materials_expose_non_default_values() {
    let mut json = document(&data_uri(&triangle_buffer()));
    json["images"] = json!([{"uri": "a.png"}]);
    json["textures"] = json!([{"source": 0}]);
    json["materials"] = json!([{
      "name": "Painted",
      "pbrMetallicRoughness": {
        "metallicFactor": 0.25,
        "baseColorTexture": {"index": 0, "extensions": {"KHR_texture_transform": {"offset": [0.5, 0.0], "scale": [2.0, 2.0], "texCoord": 1}}}
      },
      "normalTexture": {"index": 0, "scale": 0.5},
      "alphaMode": "MASK",
      "alphaCutoff": 0.25,
      "doubleSided": true
    }, {
      "name": "Unlit",
      "pbrMetallicRoughness": {},
      "extensions": {"KHR_materials_unlit": {}}
    }]);
    let importer = open(&json, &[]).unwrap();
    let data = importer.material(0).unwrap();
    assert_eq!(data.types, HalaMaterialTypes::PBR_METALLIC_ROUGHNESS);
    assert_eq!(data.get("BaseColor"), None);
    assert_eq!(data.get("Metalness"), Some(&HalaMaterialValue::Float(0.25)));
    assert_eq!(data.texture("BaseColorTexture"), Some(0));
    assert_eq!(data.get("BaseColorTextureCoordinates"), Some(&HalaMaterialValue::UInt(1)));
    let expected = Mat3::from_translation(Vec2::new(0.5, 0.0)) * Mat3::from_scale(Vec2::splat(2.0));
    assert_eq!(data.get("BaseColorTextureMatrix"), Some(&HalaMaterialValue::Matrix3(expected)));
    assert_eq!(data.get("NormalTextureScale"), Some(&HalaMaterialValue::Float(0.5)));
    assert_eq!(data.get("AlphaMask"), Some(&HalaMaterialValue::Float(0.25)));
    assert_eq!(data.get("DoubleSided"), Some(&HalaMaterialValue::Bool(true)));

    assert_eq!(importer.material(1).unwrap().types, HalaMaterialTypes::FLAT);
    assert_eq!(importer.material_for_name("Unlit").unwrap(), Some(1));
  }

  #[test]
  fn object_ids_and_custom_attributes_are_read() {
    let mut buffer = triangle_buffer();
    for id in [7u16, 8, 9, 0] {
      buffer.extend(id.to_le_bytes());
    }
    for value in [0.5f32, 1.5, 2.5] {
      buffer.extend(value.to_le_bytes());
    }
    let mut json = document(&data_uri(&buffer));
    json["buffers"][0]["byteLength"] = json!(buffer.len());
    json["bufferViews"].as_array_mut().unwrap().extend([
      json!({"buffer": 0, "byteOffset": 44, "byteLength": 6}),
      json!({"buffer": 0, "byteOffset": 52, "byteLength": 12}),
    ]);
    json["accessors"].as_array_mut().unwrap().extend([
      json!({"bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR"}),
      json!({"bufferView": 3, "componentType": 5126, "count": 3, "type": "SCALAR"}),
    ]);
    json["meshes"][0]["primitives"][0]["attributes"] = json!({"POSITION": 0, "_OBJECT_ID": 2, "_TEMPERATURE": 3});
    let importer = open(&json, &[]).unwrap();

    assert_eq!(importer.mesh_attribute_for_name("_TEMPERATURE").unwrap(), Some(HalaMeshAttribute::Custom(0)));
    assert_eq!(importer.mesh_attribute_name(HalaMeshAttribute::Custom(0)).unwrap().as_deref(), Some("_TEMPERATURE"));
    assert_eq!(importer.mesh_attribute_for_name("_OBJECT_ID").unwrap(), Some(HalaMeshAttribute::ObjectId));

    let mesh = importer.mesh(0).unwrap();
    assert_eq!(mesh.attribute(HalaMeshAttribute::ObjectId, 0), Some(&HalaVertexData::U32(vec![7, 8, 9])));
    assert_eq!(mesh.attribute(HalaMeshAttribute::Custom(0), 0), Some(&HalaVertexData::F32(vec![0.5, 1.5, 2.5])));
  }

  #[test]
  fn glb_containers_use_the_binary_chunk() {
    let mut json = document("");
    json["buffers"] = json!([{"byteLength": 44}]);
    let mut text = serde_json::to_vec(&json).unwrap();
    while text.len() % 4 != 0 {
      text.push(b' ');
    }
    let bin = triangle_buffer();
    let mut glb = Vec::new();
    glb.extend(b"glTF");
    glb.extend(2u32.to_le_bytes());
    glb.extend(((12 + 8 + text.len() + 8 + bin.len()) as u32).to_le_bytes());
    glb.extend((text.len() as u32).to_le_bytes());
    glb.extend(b"JSON");
    glb.extend(&text);
    glb.extend((bin.len() as u32).to_le_bytes());
    glb.extend(b"BIN\0");
    glb.extend(&bin);

    let mut importer = HalaGltfImporter::new();
    importer.open_data(&glb).unwrap();
    assert_eq!(importer.mesh(0).unwrap().indices, Some(vec![0, 1, 2]));
  }
}
