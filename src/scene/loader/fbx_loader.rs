use std::path::{
  Path,
  PathBuf,
};

use glam::{
  Mat3,
  Quat,
  UVec4,
  Vec2,
  Vec3,
  Vec4,
};

use crate::config::{
  HalaConfiguration,
  HalaFbxOptions,
  HalaGeometryTransformHandling,
  HalaUnitNormalizationHandling,
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
  HalaCameraData,
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
  HalaSamplerWrapping,
  HalaSceneData,
  HalaSceneField,
  HalaSceneMapping,
  HalaSkinData,
  HalaTextureData,
  HalaVertexData,
};
use crate::scene::flatten::{
  instances::{
    count_instances,
    fill_instances,
  },
  HalaMeshChunk,
  HalaMeshChunkIndex,
  HalaNameMap,
  HalaObjectOrigin,
  HalaObjectTable,
  HalaTrs,
};
use crate::scene::image_cache::{
  HalaImageCache,
  HalaImageImporter,
};
use crate::scene::importer::{
  check_id,
  HalaImporter,
};
use super::fbx_binary::HalaFbxFile;
use super::fbx_convert::convert_fbx;
use super::fbx_document::*;
use super::obj_reader::read_obj;

/// The maximum number of joints influencing one vertex.
const MAX_JOINT_INFLUENCES: usize = 4;

/// Everything derived from an opened document, discarded on close.
struct HalaFbxState {
  document: HalaFbxDocument,
  options: HalaFbxOptions,
  file_dir: Option<PathBuf>,
  objects: HalaObjectTable,
  chunks: HalaMeshChunkIndex,
  /// The resident texture id of every source texture.
  texture_ids: Vec<Option<u32>>,
  /// The source texture of every resident texture.
  textures: Vec<u32>,
  object_names: HalaNameMap,
  mesh_names: HalaNameMap,
  light_names: HalaNameMap,
  camera_names: HalaNameMap,
  skin_names: HalaNameMap,
  material_names: HalaNameMap,
  texture_names: HalaNameMap,
  image_names: HalaNameMap,
}

/// The FBX and OBJ importer.
pub struct HalaFbxImporter {
  configuration: HalaConfiguration,
  callback: Option<HalaFileCallback>,
  images: HalaImageCache,
  state: Option<HalaFbxState>,
}

impl std::fmt::Debug for HalaFbxImporter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HalaFbxImporter")
      .field("opened", &self.state.is_some())
      .finish_non_exhaustive()
  }
}

impl Default for HalaFbxImporter {
  fn default() -> Self {
    Self::new()
  }
}

/// The implementation of the FBX importer.
impl HalaFbxImporter {
  /// Create a new importer with the default configuration.
  /// return: The importer.
  pub fn new() -> Self {
    Self {
      configuration: HalaConfiguration::with_defaults(HalaFbxOptions::DEFAULTS),
      callback: None,
      images: HalaImageCache::default(),
      state: None,
    }
  }

  /// Open an already built source document.
  /// param document: The document.
  /// param file_dir: The directory external files are resolved against.
  /// return: The result.
  pub fn open_document(&mut self, mut document: HalaFbxDocument, file_dir: Option<PathBuf>) -> Result<(), HalaImporterError> {
    self.close();
    let options = HalaFbxOptions::from_configuration(&self.configuration)?;
    document.finalize()?;
    for warning in document.warnings.iter() {
      log::warn!("HalaFbxImporter::open_document(): {}", warning);
    }
    if options.strict && !document.warnings.is_empty() {
      return Err(HalaImporterError::open(&format!("The document has {} warnings in strict mode.", document.warnings.len())));
    }

    let objects = HalaObjectTable::build(&document, options.preserve_root_node, options.geometry_transform_handling);
    let chunks = HalaMeshChunkIndex::build(document.meshes.iter().map(|m| m.slot_face_counts()));

    // Only textures with a file are exposed.
    let mut texture_ids = Vec::with_capacity(document.textures.len());
    let mut textures = Vec::new();
    for (i, texture) in document.textures.iter().enumerate() {
      if texture.file.is_some() {
        texture_ids.push(Some(textures.len() as u32));
        textures.push(i as u32);
      } else {
        texture_ids.push(None);
      }
    }

    log::debug!(
      "HalaFbxImporter::open_document(): {} objects ({} helpers), {} mesh chunks from {} meshes.",
      objects.object_count(),
      objects.helper_count(),
      chunks.len(),
      document.meshes.len(),
    );
    self.state = Some(HalaFbxState {
      document,
      options,
      file_dir,
      objects,
      chunks,
      texture_ids,
      textures,
      object_names: HalaNameMap::new(),
      mesh_names: HalaNameMap::new(),
      light_names: HalaNameMap::new(),
      camera_names: HalaNameMap::new(),
      skin_names: HalaNameMap::new(),
      material_names: HalaNameMap::new(),
      texture_names: HalaNameMap::new(),
      image_names: HalaNameMap::new(),
    });
    Ok(())
  }

  fn open_bytes(&mut self, data: &[u8], file_dir: Option<PathBuf>) -> Result<(), HalaImporterError> {
    self.close();
    let options = HalaFbxOptions::from_configuration(&self.configuration)?;
    let document = if HalaFbxFile::is_binary(data) {
      let file = HalaFbxFile::parse(data)?;
      convert_fbx(&file, options.strict)?
    } else if HalaFbxFile::is_ascii(data) {
      return Err(HalaImporterError::open("ASCII FBX files are not supported."));
    } else {
      read_obj(data, file_dir.as_deref(), self.callback.as_ref())?
    };
    self.open_document(document, file_dir)
  }

  fn state(&self) -> Result<&HalaFbxState, HalaImporterError> {
    self.state.as_ref().ok_or_else(HalaImporterError::not_opened)
  }
}

/// The implementation of the opened state.
impl HalaFbxState {
  fn object_name(&self, object: u32) -> String {
    match self.objects.origin(object) {
      Some(HalaObjectOrigin::Node(node)) => self.document.nodes[node as usize].name.clone(),
      Some(HalaObjectOrigin::GeometryHelper(node)) => format!("{}_GeometryTransformHelper", self.document.nodes[node as usize].name),
      None => String::new(),
    }
  }

  /// The rotation and scale converting the document axes and units.
  fn unit_conversion(&self) -> (Quat, f32) {
    let rotation = match self.document.up_axis {
      HalaFbxUpAxis::Z => Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
      HalaFbxUpAxis::X => Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
      _ => Quat::IDENTITY,
    };
    (rotation, self.document.unit_meters)
  }

  fn node_trs(&self, node: u32) -> HalaTrs {
    let source = &self.document.nodes[node as usize];
    let normalize = self.options.normalize_units;
    let handling = self.options.unit_normalization_handling;
    if node == 0 {
      if normalize && handling == HalaUnitNormalizationHandling::TRANSFORM_ROOT {
        let (rotation, scale) = self.unit_conversion();
        return HalaTrs {
          translation: Vec3::ZERO,
          rotation,
          scaling: Vec3::splat(scale),
        };
      }
      return HalaTrs::IDENTITY;
    }

    let trs = HalaTrs {
      translation: source.translation,
      rotation: source.rotation,
      scaling: source.scaling,
    };
    if normalize && handling == HalaUnitNormalizationHandling::ADJUST_TRANSFORMS && source.parent == Some(0) {
      let (rotation, scale) = self.unit_conversion();
      return HalaTrs {
        translation: rotation * (trs.translation * scale),
        rotation: rotation * trs.rotation,
        scaling: trs.scaling * scale,
      };
    }
    trs
  }

  /// Resolve the material a node renders a chunk with.
  /// Nodes override the material of a slot by their own material at the slot index.
  fn resolve_material(&self, node: u32, chunk: &HalaMeshChunk) -> Option<u32> {
    let slot = chunk.material_slot as usize;
    if self.options.per_instance_materials {
      if let Some(&material) = self.document.nodes.get(node as usize).and_then(|n| n.materials.get(slot)) {
        return Some(material);
      }
    }
    self.document.meshes.get(chunk.mesh as usize)
      .and_then(|m| m.materials.get(slot).copied())
      .flatten()
  }

  fn scene(&self) -> HalaSceneData {
    let table = &self.objects;
    let count = table.object_count() as usize;
    let handling = self.options.geometry_transform_handling;
    // Helper flags are always present, geometry transforms only when preserved.
    let with_geometry = handling == HalaGeometryTransformHandling::PRESERVE;
    fn implicit<T>(count: usize) -> HalaSceneField<T> {
      HalaSceneField::with_capacity(HalaSceneMapping::Implicit, count)
    }
    let optional = |enabled: bool| if enabled { count } else { 0 };

    let mut parents = implicit(count);
    let mut translations = implicit(count);
    let mut rotations = implicit(count);
    let mut scalings = implicit(count);
    let mut visibilities = implicit(count);
    let mut helpers = implicit(count);
    let mut geometry_translations = implicit(optional(with_geometry));
    let mut geometry_rotations = implicit(optional(with_geometry));
    let mut geometry_scalings = implicit(optional(with_geometry));

    for object in 0..count as u32 {
      let (trs, visible, helper, geometry) = match table.origin(object) {
        Some(HalaObjectOrigin::Node(node)) => {
          let source = &self.document.nodes[node as usize];
          (self.node_trs(node), source.visible, false, source.geometry_transform)
        },
        Some(HalaObjectOrigin::GeometryHelper(node)) => {
          let source = &self.document.nodes[node as usize];
          (source.geometry_transform, source.visible, true, HalaTrs::IDENTITY)
        },
        None => (HalaTrs::IDENTITY, true, false, HalaTrs::IDENTITY),
      };
      parents.push(object, table.parent(object));
      translations.push(object, trs.translation);
      rotations.push(object, trs.rotation);
      scalings.push(object, trs.scaling);
      visibilities.push(object, visible);
      helpers.push(object, helper);
      if with_geometry {
        geometry_translations.push(object, geometry.translation);
        geometry_rotations.push(object, geometry.rotation);
        geometry_scalings.push(object, geometry.scaling);
      }
    }

    let counts = count_instances(table, &self.document, &self.chunks);
    let instances = fill_instances(table, &self.document, &self.chunks, &counts, |node, chunk| self.resolve_material(node, chunk));

    HalaSceneData {
      mapping_bound: count as u64,
      parents: parents.finish(),
      transformations: HalaSceneField::default(),
      translations: translations.finish(),
      rotations: rotations.finish(),
      scalings: scalings.finish(),
      visibilities: visibilities.finish(),
      geometry_transform_helpers: helpers.finish(),
      geometry_translations: geometry_translations.finish(),
      geometry_rotations: geometry_rotations.finish(),
      geometry_scalings: geometry_scalings.finish(),
      meshes: instances.meshes,
      lights: instances.lights,
      cameras: instances.cameras,
      skins: instances.skins,
    }
  }

  /// Collect the polygon corners of a chunk, polygons are fan triangulated.
  fn chunk_corners(mesh: &HalaFbxMesh, chunk: &HalaMeshChunk) -> Vec<usize> {
    let mut corners = Vec::new();
    for (i, face) in mesh.faces.iter().enumerate() {
      if mesh.face_slot(i) != chunk.material_slot {
        continue;
      }
      let begin = face.index_begin as usize;
      let n = face.num_indices as usize;
      match (chunk.primitive, n) {
        (HalaMeshPrimitive::POINTS, 1) => corners.push(begin),
        (HalaMeshPrimitive::LINES, 2) => corners.extend([begin, begin + 1]),
        (HalaMeshPrimitive::TRIANGLES, n) if n >= 3 => {
          for k in 1..n - 1 {
            corners.extend([begin, begin + k, begin + k + 1]);
          }
        },
        _ => {},
      }
    }
    corners
  }

  /// Average the face normals around every control point.
  fn smooth_normals(mesh: &HalaFbxMesh) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; mesh.positions.len()];
    for face in mesh.faces.iter().filter(|f| f.num_indices >= 3) {
      let begin = face.index_begin as usize;
      let vertex = |k: usize| mesh.vertex_indices[begin + k] as usize;
      for k in 1..face.num_indices as usize - 1 {
        let (a, b, c) = (vertex(0), vertex(k), vertex(k + 1));
        let normal = (mesh.positions[b] - mesh.positions[a]).cross(mesh.positions[c] - mesh.positions[a]);
        for v in [a, b, c] {
          normals[v] += normal;
        }
      }
    }
    normals.iter().map(|n| n.normalize_or_zero()).collect()
  }

  /// The strongest joint influences of every control point, weights normalized.
  fn joint_influences(mesh: &HalaFbxMesh, skin: &HalaFbxSkin) -> Vec<(UVec4, Vec4)> {
    let mut influences: Vec<Vec<(u32, f32)>> = vec![Vec::new(); mesh.positions.len()];
    for (joint, weights) in skin.influences.iter().enumerate() {
      for &(vertex, weight) in weights.iter() {
        if let Some(list) = influences.get_mut(vertex as usize) {
          list.push((joint as u32, weight));
        }
      }
    }
    influences.into_iter().map(|mut list| {
      list.sort_by(|a, b| b.1.total_cmp(&a.1));
      list.truncate(MAX_JOINT_INFLUENCES);
      let total: f32 = list.iter().map(|(_, w)| w).sum();
      let mut ids = [0u32; MAX_JOINT_INFLUENCES];
      let mut weights = [0.0f32; MAX_JOINT_INFLUENCES];
      for (k, (joint, weight)) in list.into_iter().enumerate() {
        ids[k] = joint;
        weights[k] = if total > 0.0 { weight / total } else { 0.0 };
      }
      (UVec4::from_array(ids), Vec4::from_array(weights))
    }).collect()
  }

  fn mesh(&self, id: u32) -> Result<HalaMeshData, HalaImporterError> {
    let chunk = self.chunks.get(id)
      .ok_or_else(|| HalaImporterError::query(&format!("The mesh {} is out of range.", id)))?;
    let mesh = &self.document.meshes[chunk.mesh as usize];
    let corners = Self::chunk_corners(mesh, chunk);
    let vertex = |c: usize| mesh.vertex_indices[c] as usize;

    // A geometry transform baked into a mesh only instanced once.
    let baked = match mesh.instances.as_slice() {
      [node] if self.options.geometry_transform_handling == HalaGeometryTransformHandling::MODIFY_GEOMETRY
        && !mesh.is_skinned()
        && self.objects.is_baked(*node) => Some(self.document.nodes[*node as usize].geometry_transform.to_mat4()),
      _ => None,
    };
    let normal_matrix = baked.map(|m| Mat3::from_mat4(m).inverse().transpose());

    let mut data = HalaMeshData::new(chunk.primitive, corners.len() as u32);
    let positions = corners.iter().map(|&c| {
      let p = mesh.positions[vertex(c)];
      baked.map_or(p, |m| m.transform_point3(p))
    }).collect();
    data.add_attribute(HalaMeshAttribute::Position, HalaVertexData::Vec3(positions));

    let transform_direction = |v: Vec3, m: Option<Mat3>| m.map_or(v, |m| (m * v).normalize_or_zero());
    let normals = match &mesh.normals {
      Some(normals) => Some(corners.iter().map(|&c| normals.get(c).unwrap_or(Vec3::ZERO)).collect::<Vec<_>>()),
      None if self.options.generate_missing_normals => {
        let smooth = Self::smooth_normals(mesh);
        Some(corners.iter().map(|&c| smooth[vertex(c)]).collect())
      },
      None => None,
    };
    if let Some(normals) = normals {
      let normals = normals.into_iter().map(|n| transform_direction(n, normal_matrix)).collect();
      data.add_attribute(HalaMeshAttribute::Normal, HalaVertexData::Vec3(normals));
    }

    let limit = |count: usize, max: Option<u32>| max.map_or(count, |m| count.min(m as usize));
    let uv_count = limit(mesh.uv_sets.len(), self.options.max_uv_sets);
    if uv_count < mesh.uv_sets.len() {
      log::warn!("HalaFbxImporter::mesh(): {} of {} texture coordinate sets kept.", uv_count, mesh.uv_sets.len());
    }
    for set in mesh.uv_sets.iter().take(uv_count) {
      let uvs = corners.iter().map(|&c| set.uvs.get(c).unwrap_or(Vec2::ZERO)).collect();
      data.add_attribute(HalaMeshAttribute::TextureCoordinates, HalaVertexData::Vec2(uvs));
    }

    // Tangent frames are taken up to the first incomplete set.
    let tangent_limit = limit(uv_count, self.options.max_tangent_sets);
    let mut tangent_count = tangent_limit;
    let mut bitangent_count = tangent_limit;
    for (i, set) in mesh.uv_sets.iter().take(tangent_limit).enumerate() {
      if set.tangents.is_none() || set.bitangents.is_none() {
        tangent_count = i + set.tangents.is_some() as usize;
        bitangent_count = i + set.bitangents.is_some() as usize;
        break;
      }
    }
    let linear = baked.map(Mat3::from_mat4);
    for set in mesh.uv_sets.iter().take(tangent_count) {
      if let Some(tangents) = &set.tangents {
        let values = corners.iter().map(|&c| transform_direction(tangents.get(c).unwrap_or(Vec3::ZERO), linear)).collect();
        data.add_attribute(HalaMeshAttribute::Tangent, HalaVertexData::Vec3(values));
      }
    }
    for set in mesh.uv_sets.iter().take(bitangent_count) {
      if let Some(bitangents) = &set.bitangents {
        let values = corners.iter().map(|&c| transform_direction(bitangents.get(c).unwrap_or(Vec3::ZERO), linear)).collect();
        data.add_attribute(HalaMeshAttribute::Bitangent, HalaVertexData::Vec3(values));
      }
    }

    let color_count = limit(mesh.color_sets.len(), self.options.max_color_sets);
    for set in mesh.color_sets.iter().take(color_count) {
      let colors = corners.iter().map(|&c| set.colors.get(c).unwrap_or(Vec4::ONE)).collect();
      data.add_attribute(HalaMeshAttribute::Color, HalaVertexData::Vec4(colors));
    }

    if let Some(skin) = mesh.skin.and_then(|s| self.document.skins.get(s as usize)) {
      let influences = Self::joint_influences(mesh, skin);
      let (joints, weights): (Vec<_>, Vec<_>) = corners.iter().map(|&c| influences[vertex(c)]).unzip();
      data.add_attribute(HalaMeshAttribute::JointIds, HalaVertexData::UVec4(joints));
      data.add_attribute(HalaMeshAttribute::Weights, HalaVertexData::Vec4(weights));
    }

    data.indices = Some((0..corners.len() as u32).collect());
    if self.options.generate_indices {
      data.remove_duplicates();
    }
    Ok(data)
  }

  fn light(&self, id: u32) -> Result<HalaLightData, HalaImporterError> {
    let light = &self.document.lights[id as usize];
    let light_type = match light.kind {
      HalaFbxLightKind::POINT => HalaLightType::POINT,
      HalaFbxLightKind::DIRECTIONAL => HalaLightType::DIRECTIONAL,
      HalaFbxLightKind::SPOT => HalaLightType::SPOT,
      kind => {
        log::error!("HalaFbxImporter::light(): Light {} has unsupported type {}.", id, kind.to_u8());
        return Err(HalaImporterError::query(&format!("The light {} has unsupported type {}.", id, kind.to_u8())));
      },
    };

    let mut attenuation = match light.decay {
      HalaFbxDecay::NONE => HalaLightData::CONSTANT_ATTENUATION,
      HalaFbxDecay::LINEAR => HalaLightData::LINEAR_ATTENUATION,
      HalaFbxDecay::QUADRATIC => HalaLightData::QUADRATIC_ATTENUATION,
      HalaFbxDecay::CUBIC => {
        log::warn!("HalaFbxImporter::light(): Light {} cubic attenuation not supported, patching to quadratic.", id);
        HalaLightData::QUADRATIC_ATTENUATION
      },
      decay => {
        log::error!("HalaFbxImporter::light(): Light {} has unsupported decay {}.", id, decay.to_u8());
        return Err(HalaImporterError::query(&format!("The light {} has unsupported decay {}.", id, decay.to_u8())));
      },
    };
    if light_type == HalaLightType::DIRECTIONAL && attenuation != HalaLightData::CONSTANT_ATTENUATION {
      log::warn!("HalaFbxImporter::light(): Light {} is directional, attenuation forced to constant.", id);
      attenuation = HalaLightData::CONSTANT_ATTENUATION;
    }

    let mut data = HalaLightData::new(light_type, light.color, light.intensity, attenuation);
    if light_type == HalaLightType::SPOT {
      data.inner_cone_angle = light.inner_angle.clamp(0.0, 360.0);
      data.outer_cone_angle = light.outer_angle.clamp(data.inner_cone_angle, 360.0);
    } else {
      data.inner_cone_angle = 360.0;
      data.outer_cone_angle = 360.0;
    }
    Ok(data)
  }

  fn camera(&self, id: u32) -> Result<HalaCameraData, HalaImporterError> {
    let camera = &self.document.cameras[id as usize];
    match camera.projection_mode {
      HalaFbxProjectionMode::PERSPECTIVE => Ok(HalaCameraData::with_fov(
        camera.field_of_view.to_radians(),
        true,
        camera.aspect_ratio,
        camera.near_plane,
        camera.far_plane,
      )),
      HalaFbxProjectionMode::ORTHOGRAPHIC => Ok(HalaCameraData::Orthographic(HalaOrthographicCameraData {
        size: Vec2::new(camera.orthographic_extent * camera.aspect_ratio, camera.orthographic_extent),
        znear: camera.near_plane,
        zfar: camera.far_plane,
      })),
      mode => {
        log::error!("HalaFbxImporter::camera(): Camera {} has unknown projection mode {}.", id, mode.to_u8());
        Err(HalaImporterError::query(&format!("The camera {} has unknown projection mode {}.", id, mode.to_u8())))
      },
    }
  }

  fn skin(&self, id: u32) -> Result<HalaSkinData, HalaImporterError> {
    let skin = &self.document.skins[id as usize];
    let joints = skin.joints.iter().map(|&node| {
      self.objects.object_of_node(node)
        .ok_or_else(|| HalaImporterError::query(&format!("The skin {} uses the elided root as a joint.", id)))
    }).collect::<Result<Vec<_>, _>>()?;
    Ok(HalaSkinData {
      joints,
      inverse_bind_matrices: skin.inverse_bind_matrices.clone(),
    })
  }

  fn material(&self, id: u32) -> Result<HalaMaterialData, HalaImporterError> {
    let material = &self.document.materials[id as usize];
    let mut data = HalaMaterialData::new(if material.diffuse.is_used() { HalaMaterialTypes::PHONG } else { HalaMaterialTypes::NONE });
    let preserve = self.options.preserve_material_factors;
    let texture = |map: &HalaFbxMaterialMap| map.texture.and_then(|t| self.texture_ids.get(t as usize).copied().flatten());

    // Colors with an alpha channel take it from the opacity when one is given.
    let color = |data: &mut HalaMaterialData, map: &HalaFbxMaterialMap, name: &str, alpha: Option<Option<f32>>| {
      if let Some(value) = map.value {
        let factor = map.factor.unwrap_or(1.0);
        let rgb = if preserve { value.truncate() } else { value.truncate() * factor };
        let value = match alpha {
          Some(opacity) => HalaMaterialValue::Vec4(rgb.extend(opacity.unwrap_or(value.w))),
          None => HalaMaterialValue::Vec3(rgb),
        };
        data.set(&format!("{}Color", name), value);
        if preserve && map.factor.is_some() {
          data.set(&format!("{}Factor", name), HalaMaterialValue::Float(factor));
        }
      }
      if let Some(texture) = texture(map) {
        data.set(&format!("{}Texture", name), HalaMaterialValue::Texture(texture));
      }
    };
    color(&mut data, &material.ambient, "Ambient", Some(None));
    color(&mut data, &material.diffuse, "Diffuse", Some(material.opacity));
    color(&mut data, &material.specular, "Specular", Some(None));
    color(&mut data, &material.emissive, "Emissive", None);

    if let Some(shininess) = material.shininess.value {
      data.set("Shininess", HalaMaterialValue::Float(shininess.x));
    }
    if let Some(texture) = texture(&material.normal_map).or_else(|| texture(&material.bump)) {
      data.set("NormalTexture", HalaMaterialValue::Texture(texture));
    }
    Ok(data)
  }

  fn texture(&self, id: u32) -> Result<HalaTextureData, HalaImporterError> {
    let texture = &self.document.textures[self.textures[id as usize] as usize];
    let file = texture.file
      .ok_or_else(|| HalaImporterError::query(&format!("The texture {} has no file.", id)))?;
    let wrap = |mode: HalaFbxWrapMode| match mode {
      HalaFbxWrapMode::Repeat => HalaSamplerWrapping::REPEAT,
      HalaFbxWrapMode::Clamp => HalaSamplerWrapping::CLAMP_TO_EDGE,
    };
    let mut data = HalaTextureData::new(file);
    data.wrapping = [wrap(texture.wrap_u), wrap(texture.wrap_v), HalaSamplerWrapping::CLAMP_TO_EDGE];
    Ok(data)
  }

  /// Fetch the encoded data of an image from the document or an external file.
  fn image_bytes(&self, id: u32, callback: Option<&HalaFileCallback>) -> Result<Vec<u8>, HalaImporterError> {
    let file = &self.document.texture_files[id as usize];
    if let Some(content) = &file.content {
      return Ok(content.clone());
    }
    let name = if file.relative_filename.is_empty() { &file.filename } else { &file.relative_filename };
    let path = match (&self.file_dir, callback) {
      (Some(dir), _) => dir.join(name),
      (None, Some(_)) => PathBuf::from(name),
      (None, None) => return Err(HalaImporterError::new(
        HalaImporterErrorKind::ResourceUnavailable,
        "External images can be imported only when opening files from the filesystem or if a file callback is present.",
        None,
      )),
    };
    load_external(callback, &path, HalaInputFileCallbackPolicy::LoadTemporary).ok_or_else(|| HalaImporterError::new(
      HalaImporterErrorKind::ResourceUnavailable,
      &format!("Cannot load image file \"{}\".", path.to_string_lossy()),
      None,
    ))
  }
}

impl HalaImporter for HalaFbxImporter {
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
    let file_dir = path.parent().map(|p| p.to_path_buf());
    self.open_bytes(&data, file_dir)
  }

  fn scene_count(&self) -> Result<u32, HalaImporterError> {
    self.state().map(|_| 1)
  }

  fn default_scene(&self) -> Result<Option<u32>, HalaImporterError> {
    self.state().map(|_| Some(0))
  }

  fn scene_for_name(&self, _name: &str) -> Result<Option<u32>, HalaImporterError> {
    self.state().map(|_| None)
  }

  fn scene_name(&self, id: u32) -> Result<String, HalaImporterError> {
    check_id("scene", id, self.scene_count()?)?;
    Ok(String::new())
  }

  fn scene(&self, id: u32) -> Result<HalaSceneData, HalaImporterError> {
    let state = self.state()?;
    check_id("scene", id, 1)?;
    Ok(state.scene())
  }

  fn object_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.objects.object_count())
  }

  fn object_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.object_names.find(name, || (0..state.objects.object_count()).map(|o| state.object_name(o))))
  }

  fn object_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    check_id("object", id, state.objects.object_count())?;
    Ok(state.object_name(id))
  }

  fn mesh_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.chunks.len())
  }

  fn mesh_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.mesh_names.find(name, || state.chunks.iter().map(|(_, c)| state.document.meshes[c.mesh as usize].name.clone())))
  }

  fn mesh_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    check_id("mesh", id, state.chunks.len())?;
    Ok(state.chunks.get(id).map(|c| state.document.meshes[c.mesh as usize].name.clone()).unwrap_or_default())
  }

  fn mesh(&self, id: u32) -> Result<HalaMeshData, HalaImporterError> {
    let state = self.state()?;
    check_id("mesh", id, state.chunks.len())?;
    state.mesh(id)
  }

  fn light_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.lights.len() as u32)
  }

  fn light_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.light_names.find(name, || state.document.lights.iter().map(|l| l.name.clone())))
  }

  fn light_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("light", id, state.document.lights.len() as u32)?;
    Ok(state.document.lights[index].name.clone())
  }

  fn light(&self, id: u32) -> Result<HalaLightData, HalaImporterError> {
    let state = self.state()?;
    check_id("light", id, state.document.lights.len() as u32)?;
    state.light(id)
  }

  fn camera_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.cameras.len() as u32)
  }

  fn camera_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.camera_names.find(name, || state.document.cameras.iter().map(|c| c.name.clone())))
  }

  fn camera_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("camera", id, state.document.cameras.len() as u32)?;
    Ok(state.document.cameras[index].name.clone())
  }

  fn camera(&self, id: u32) -> Result<HalaCameraData, HalaImporterError> {
    let state = self.state()?;
    check_id("camera", id, state.document.cameras.len() as u32)?;
    state.camera(id)
  }

  fn skin_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.skins.len() as u32)
  }

  fn skin_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.skin_names.find(name, || state.document.skins.iter().map(|s| s.name.clone())))
  }

  fn skin_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("skin", id, state.document.skins.len() as u32)?;
    Ok(state.document.skins[index].name.clone())
  }

  fn skin(&self, id: u32) -> Result<HalaSkinData, HalaImporterError> {
    let state = self.state()?;
    check_id("skin", id, state.document.skins.len() as u32)?;
    state.skin(id)
  }

  fn material_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.materials.len() as u32)
  }

  fn material_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.material_names.find(name, || state.document.materials.iter().map(|m| m.name.clone())))
  }

  fn material_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("material", id, state.document.materials.len() as u32)?;
    Ok(state.document.materials[index].name.clone())
  }

  fn material(&self, id: u32) -> Result<HalaMaterialData, HalaImporterError> {
    let state = self.state()?;
    check_id("material", id, state.document.materials.len() as u32)?;
    state.material(id)
  }

  fn texture_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.textures.len() as u32)
  }

  fn texture_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.texture_names.find(name, || state.textures.iter().map(|&t| state.document.textures[t as usize].name.clone())))
  }

  fn texture_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("texture", id, state.textures.len() as u32)?;
    Ok(state.document.textures[state.textures[index] as usize].name.clone())
  }

  fn texture(&self, id: u32) -> Result<HalaTextureData, HalaImporterError> {
    let state = self.state()?;
    check_id("texture", id, state.textures.len() as u32)?;
    state.texture(id)
  }

  fn image_count(&self) -> Result<u32, HalaImporterError> {
    Ok(self.state()?.document.texture_files.len() as u32)
  }

  fn image_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError> {
    let state = self.state()?;
    Ok(state.image_names.find(name, || state.document.texture_files.iter().map(|f| f.relative_filename.clone())))
  }

  fn image_name(&self, id: u32) -> Result<String, HalaImporterError> {
    let state = self.state()?;
    let index = check_id("image", id, state.document.texture_files.len() as u32)?;
    Ok(state.document.texture_files[index].relative_filename.clone())
  }

  fn image(&self, id: u32) -> Result<HalaImageData, HalaImporterError> {
    let state = self.state()?;
    check_id("image", id, state.document.texture_files.len() as u32)?;
    let image = self.images.get(id, || state.image_bytes(id, self.callback.as_ref()))?;
    Ok(HalaImageData::clone(&image))
  }
}
