use std::collections::HashMap;

use glam::{
  Mat4,
  Quat,
  Vec2,
  Vec3,
  Vec4,
};

use crate::error::HalaImporterError;
use crate::scene::flatten::HalaTrs;
use super::fbx_binary::{
  HalaFbxFile,
  HalaFbxProperty,
  HalaFbxRecord,
};
use super::fbx_document::*;

/// The Properties70 block of a record.
struct HalaFbxProperties<'a> {
  values: HashMap<&'a str, &'a [HalaFbxProperty]>,
}

impl<'a> HalaFbxProperties<'a> {
  fn of(record: &'a HalaFbxRecord) -> Self {
    let mut values = HashMap::new();
    if let Some(block) = record.child("Properties70") {
      for p in block.children_named("P") {
        if let Some(name) = p.property(0).and_then(|v| v.as_str()) {
          values.insert(name, p.properties.get(4..).unwrap_or(&[]));
        }
      }
    }
    Self { values }
  }

  fn f64(&self, name: &str) -> Option<f64> {
    self.values.get(name).and_then(|v| v.first()).and_then(|p| p.as_f64())
  }

  fn f32(&self, name: &str) -> Option<f32> {
    self.f64(name).map(|v| v as f32)
  }

  fn i64(&self, name: &str) -> Option<i64> {
    self.values.get(name).and_then(|v| v.first()).and_then(|p| p.as_i64().or_else(|| p.as_f64().map(|f| f as i64)))
  }

  fn vec3(&self, name: &str) -> Option<Vec3> {
    let v = self.values.get(name)?;
    if v.len() < 3 {
      return None;
    }
    Some(Vec3::new(v[0].as_f64()? as f32, v[1].as_f64()? as f32, v[2].as_f64()? as f32))
  }
}

/// An object of the Objects block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HalaFbxObjectRef {
  Model(u32),
  Mesh(u32),
  Light(u32),
  Camera(u32),
  Material(u32),
  Texture(u32),
  Video(usize),
  Skin(u32),
  Cluster(usize),
  Other,
}

struct HalaFbxCluster {
  node: Option<u32>,
  indices: Vec<i64>,
  weights: Vec<f64>,
  transform: Mat4,
  transform_link: Mat4,
}

/// Split a "Name\x00\x01Class" object name.
fn object_name(record: &HalaFbxRecord) -> String {
  let name = record.property(1).and_then(|p| p.as_str()).unwrap_or("");
  match name.split_once("\x00\x01") {
    Some((name, _)) => name.to_string(),
    None => name.to_string(),
  }
}

fn object_class(record: &HalaFbxRecord) -> &str {
  record.property(2).and_then(|p| p.as_str()).unwrap_or("")
}

fn string_child(record: &HalaFbxRecord, name: &str) -> String {
  record.child_value(name).and_then(|p| p.as_str()).unwrap_or("").to_string()
}

fn matrix_child(record: &HalaFbxRecord, name: &str) -> Mat4 {
  match record.child_value(name).and_then(|p| p.to_f64_array()) {
    Some(values) if values.len() == 16 => {
      let mut cols = [0.0f32; 16];
      for (dst, src) in cols.iter_mut().zip(values.iter()) {
        *dst = *src as f32;
      }
      Mat4::from_cols_array(&cols)
    },
    _ => Mat4::IDENTITY,
  }
}

/// Compose an euler rotation given in degrees, the first axis of the order is applied first.
/// param degrees: The angles around X, Y and Z.
/// param order: The FBX rotation order.
/// return: The rotation.
pub fn euler_to_quat(degrees: Vec3, order: i64) -> Quat {
  let x = Quat::from_rotation_x(degrees.x.to_radians());
  let y = Quat::from_rotation_y(degrees.y.to_radians());
  let z = Quat::from_rotation_z(degrees.z.to_radians());
  match order {
    1 => y * z * x,
    2 => x * z * y,
    3 => z * x * y,
    4 => y * x * z,
    5 => x * y * z,
    _ => z * y * x,
  }
}

/// A layer element of a geometry before it is resolved to polygon corners.
struct HalaFbxLayer {
  mapping: String,
  reference: String,
  values: Vec<f64>,
  indices: Option<Vec<i64>>,
}

impl HalaFbxLayer {
  fn read(record: &HalaFbxRecord, values_name: &str, index_name: &str) -> Option<Self> {
    Some(Self {
      mapping: string_child(record, "MappingInformationType"),
      reference: string_child(record, "ReferenceInformationType"),
      values: record.child_value(values_name)?.to_f64_array()?,
      indices: record.child_value(index_name).and_then(|p| p.to_i64_array()),
    })
  }

  /// Resolve the layer to one value index per polygon corner.
  fn resolve<T, F>(&self, components: usize, mesh: &HalaFbxMesh, corner_faces: &[u32], convert: F) -> Result<HalaFbxVertexAttribute<T>, String>
  where
    F: Fn(&[f64]) -> T,
  {
    let values: Vec<T> = self.values.chunks_exact(components).map(convert).collect();
    let direct = self.reference == "Direct";
    let indices = match (&self.indices, direct) {
      (_, true) => None,
      (Some(indices), false) => Some(indices),
      (None, false) => return Err(format!("{} reference without indices", self.reference)),
    };

    let mut result = Vec::with_capacity(mesh.vertex_indices.len());
    for corner in 0..mesh.vertex_indices.len() {
      let element = match self.mapping.as_str() {
        "ByPolygonVertex" => corner,
        "ByVertex" | "ByVertice" | "ByControlPoint" => mesh.vertex_indices[corner] as usize,
        "ByPolygon" => corner_faces[corner] as usize,
        "AllSame" => 0,
        mapping => return Err(format!("unsupported mapping {}", mapping)),
      };
      let index = match indices {
        None => element as i64,
        Some(indices) => *indices.get(element).ok_or_else(|| format!("index {} is out of range", element))?,
      };
      if index < 0 || index as usize >= values.len() {
        return Err(format!("value {} is out of range for {} values", index, values.len()));
      }
      result.push(index as u32);
    }

    Ok(HalaFbxVertexAttribute {
      values,
      indices: result,
    })
  }
}

/// Converts the records of a binary FBX file into a document.
struct HalaFbxConverter<'a> {
  strict: bool,
  document: HalaFbxDocument,
  objects: HashMap<i64, HalaFbxObjectRef>,
  texture_records: Vec<&'a HalaFbxRecord>,
  videos: Vec<&'a HalaFbxRecord>,
  texture_videos: HashMap<u32, usize>,
  clusters: Vec<HalaFbxCluster>,
  skin_clusters: HashMap<u32, Vec<usize>>,
}

/// Convert a parsed binary FBX file into a document.
/// param file: The parsed file.
/// param strict: Fail on malformed geometry layers instead of dropping them.
/// return: The document.
pub fn convert_fbx(file: &HalaFbxFile, strict: bool) -> Result<HalaFbxDocument, HalaImporterError> {
  let mut converter = HalaFbxConverter {
    strict,
    document: HalaFbxDocument::new(),
    objects: HashMap::new(),
    texture_records: Vec::new(),
    videos: Vec::new(),
    texture_videos: HashMap::new(),
    clusters: Vec::new(),
    skin_clusters: HashMap::new(),
  };
  converter.read_settings(file);
  if let Some(objects) = file.record("Objects") {
    converter.read_objects(objects)?;
  }
  if let Some(connections) = file.record("Connections") {
    converter.connect(connections);
  }
  converter.finish()
}

impl<'a> HalaFbxConverter<'a> {
  fn warn(&mut self, msg: String) -> Result<(), HalaImporterError> {
    if self.strict {
      return Err(HalaImporterError::open(&msg));
    }
    log::warn!("HalaFbxConverter::warn(): {}", msg);
    self.document.warnings.push(msg);
    Ok(())
  }

  fn read_settings(&mut self, file: &HalaFbxFile) {
    let Some(settings) = file.record("GlobalSettings") else {
      return;
    };
    let properties = HalaFbxProperties::of(settings);
    if let Some(axis) = properties.i64("UpAxis").and_then(|a| HalaFbxUpAxis::from_u8(a as u8)) {
      self.document.up_axis = axis;
    }
    if let Some(scale) = properties.f32("UnitScaleFactor").filter(|s| *s > 0.0) {
      self.document.unit_meters = scale * 0.01;
    }
  }

  fn read_objects(&mut self, objects: &'a HalaFbxRecord) -> Result<(), HalaImporterError> {
    for record in objects.children.iter() {
      let Some(id) = record.property(0).and_then(|p| p.as_i64()) else {
        continue;
      };
      let object = match (record.name.as_str(), object_class(record)) {
        ("Model", _) => HalaFbxObjectRef::Model(self.read_model(record)),
        ("Geometry", "Mesh") => HalaFbxObjectRef::Mesh(self.read_geometry(record)?),
        ("NodeAttribute", "Light") => HalaFbxObjectRef::Light(self.read_light(record)),
        ("NodeAttribute", "Camera") => HalaFbxObjectRef::Camera(self.read_camera(record)),
        ("Material", _) => HalaFbxObjectRef::Material(self.read_material(record)),
        ("Texture", _) => {
          self.texture_records.push(record);
          HalaFbxObjectRef::Texture(self.read_texture(record))
        },
        ("Video", _) => {
          self.videos.push(record);
          HalaFbxObjectRef::Video(self.videos.len() - 1)
        },
        ("Deformer", "Skin") => {
          self.document.skins.push(HalaFbxSkin {
            name: object_name(record),
            ..Default::default()
          });
          HalaFbxObjectRef::Skin(self.document.skins.len() as u32 - 1)
        },
        ("Deformer", "Cluster") => {
          self.clusters.push(HalaFbxCluster {
            node: None,
            indices: record.child_value("Indexes").and_then(|p| p.to_i64_array()).unwrap_or_default(),
            weights: record.child_value("Weights").and_then(|p| p.to_f64_array()).unwrap_or_default(),
            transform: matrix_child(record, "Transform"),
            transform_link: matrix_child(record, "TransformLink"),
          });
          HalaFbxObjectRef::Cluster(self.clusters.len() - 1)
        },
        _ => HalaFbxObjectRef::Other,
      };
      self.objects.insert(id, object);
    }
    Ok(())
  }

  fn read_model(&mut self, record: &HalaFbxRecord) -> u32 {
    let properties = HalaFbxProperties::of(record);
    let order = properties.i64("RotationOrder").unwrap_or(0);
    let rotation = euler_to_quat(properties.vec3("Lcl Rotation").unwrap_or(Vec3::ZERO), order);
    let pre = euler_to_quat(properties.vec3("PreRotation").unwrap_or(Vec3::ZERO), 0);
    let post = euler_to_quat(properties.vec3("PostRotation").unwrap_or(Vec3::ZERO), 0);

    let geometry_transform = HalaTrs {
      translation: properties.vec3("GeometricTranslation").unwrap_or(Vec3::ZERO),
      rotation: euler_to_quat(properties.vec3("GeometricRotation").unwrap_or(Vec3::ZERO), 0),
      scaling: properties.vec3("GeometricScaling").unwrap_or(Vec3::ONE),
    };

    self.document.add_node(HalaFbxNode {
      name: object_name(record),
      parent: Some(0),
      translation: properties.vec3("Lcl Translation").unwrap_or(Vec3::ZERO),
      rotation: (pre * rotation * post.inverse()).normalize(),
      scaling: properties.vec3("Lcl Scaling").unwrap_or(Vec3::ONE),
      visible: properties.f64("Visibility").map_or(true, |v| v != 0.0),
      geometry_transform,
      ..Default::default()
    })
  }

  fn read_geometry(&mut self, record: &HalaFbxRecord) -> Result<u32, HalaImporterError> {
    let mut mesh = HalaFbxMesh {
      name: object_name(record),
      ..Default::default()
    };
    if let Some(vertices) = record.child_value("Vertices").and_then(|p| p.to_f64_array()) {
      mesh.positions = vertices.chunks_exact(3).map(|v| Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32)).collect();
    }

    // A negative index closes its polygon and stores the bitwise not of the vertex.
    let polygons = record.child_value("PolygonVertexIndex").and_then(|p| p.to_i64_array()).unwrap_or_default();
    let mut corner_faces = Vec::with_capacity(polygons.len());
    let mut begin = 0u32;
    for (i, &raw) in polygons.iter().enumerate() {
      let vertex = if raw < 0 { !raw } else { raw };
      mesh.vertex_indices.push(vertex as u32);
      corner_faces.push(mesh.faces.len() as u32);
      if raw < 0 {
        mesh.faces.push(HalaFbxFace { index_begin: begin, num_indices: i as u32 + 1 - begin });
        begin = i as u32 + 1;
      }
    }
    if (begin as usize) < polygons.len() {
      self.warn(format!("Geometry \"{}\" ends with an unterminated polygon.", mesh.name))?;
      mesh.faces.push(HalaFbxFace { index_begin: begin, num_indices: polygons.len() as u32 - begin });
    }

    let mut layers: Vec<&HalaFbxRecord> = record.children.iter().filter(|c| c.name.starts_with("LayerElement")).collect();
    layers.sort_by_key(|c| c.property(0).and_then(|p| p.as_i64()).unwrap_or(0));
    let vec3 = |v: &[f64]| Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32);

    let mut tangents = Vec::new();
    let mut bitangents = Vec::new();
    for layer in layers {
      let kind = layer.name.as_str();
      let result = match kind {
        "LayerElementNormal" if mesh.normals.is_none() => match HalaFbxLayer::read(layer, "Normals", "NormalsIndex") {
          Some(l) => l.resolve(3, &mesh, &corner_faces, vec3).map(|a| mesh.normals = Some(a)),
          None => Ok(()),
        },
        "LayerElementUV" => match HalaFbxLayer::read(layer, "UV", "UVIndex") {
          Some(l) => l.resolve(2, &mesh, &corner_faces, |v| Vec2::new(v[0] as f32, v[1] as f32)).map(|uvs| {
            mesh.uv_sets.push(HalaFbxUvSet {
              name: string_child(layer, "Name"),
              uvs,
              ..Default::default()
            })
          }),
          None => Ok(()),
        },
        "LayerElementColor" => match HalaFbxLayer::read(layer, "Colors", "ColorIndex") {
          Some(l) => l.resolve(4, &mesh, &corner_faces, |v| Vec4::new(v[0] as f32, v[1] as f32, v[2] as f32, v[3] as f32)).map(|colors| {
            mesh.color_sets.push(HalaFbxColorSet {
              name: string_child(layer, "Name"),
              colors,
            })
          }),
          None => Ok(()),
        },
        "LayerElementTangent" => match HalaFbxLayer::read(layer, "Tangents", "TangentsIndex") {
          Some(l) => l.resolve(3, &mesh, &corner_faces, vec3).map(|a| tangents.push(a)),
          None => Ok(()),
        },
        "LayerElementBinormal" => match HalaFbxLayer::read(layer, "Binormals", "BinormalsIndex") {
          Some(l) => l.resolve(3, &mesh, &corner_faces, vec3).map(|a| bitangents.push(a)),
          None => Ok(()),
        },
        "LayerElementMaterial" if mesh.face_materials.is_empty() => {
          Self::read_face_materials(layer, &mut mesh);
          Ok(())
        },
        _ => Ok(()),
      };
      if let Err(msg) = result {
        self.warn(format!("Geometry \"{}\" {} dropped: {}.", mesh.name, kind, msg))?;
      }
    }

    // Tangent frames follow the texture coordinate set of the same layer.
    for (set, tangent) in mesh.uv_sets.iter_mut().zip(tangents) {
      set.tangents = Some(tangent);
    }
    for (set, bitangent) in mesh.uv_sets.iter_mut().zip(bitangents) {
      set.bitangents = Some(bitangent);
    }

    self.document.meshes.push(mesh);
    Ok(self.document.meshes.len() as u32 - 1)
  }

  fn read_face_materials(layer: &HalaFbxRecord, mesh: &mut HalaFbxMesh) {
    let Some(materials) = layer.child_value("Materials").and_then(|p| p.to_i64_array()) else {
      return;
    };
    let slot = |i: usize| materials.get(i).copied().unwrap_or(0).max(0) as u32;
    mesh.face_materials = match string_child(layer, "MappingInformationType").as_str() {
      "ByPolygon" => (0..mesh.faces.len()).map(slot).collect(),
      _ => vec![slot(0); mesh.faces.len()],
    };
  }

  fn read_light(&mut self, record: &HalaFbxRecord) -> u32 {
    let properties = HalaFbxProperties::of(record);
    let default = HalaFbxLight::default();
    self.document.lights.push(HalaFbxLight {
      name: object_name(record),
      kind: properties.i64("LightType").map_or(default.kind, |t| HalaFbxLightKind::from_u8(t as u8)),
      color: properties.vec3("Color").unwrap_or(default.color),
      intensity: properties.f32("Intensity").map_or(default.intensity, |i| i / 100.0),
      decay: properties.i64("DecayType").map_or(default.decay, |d| HalaFbxDecay::from_u8(d as u8)),
      inner_angle: properties.f32("InnerAngle").unwrap_or(default.inner_angle),
      outer_angle: properties.f32("OuterAngle").unwrap_or(default.outer_angle),
    });
    self.document.lights.len() as u32 - 1
  }

  fn read_camera(&mut self, record: &HalaFbxRecord) -> u32 {
    let properties = HalaFbxProperties::of(record);
    let default = HalaFbxCamera::default();
    let aspect_ratio = match (properties.f32("AspectWidth"), properties.f32("AspectHeight")) {
      (Some(w), Some(h)) if w > 0.0 && h > 0.0 => w / h,
      _ => default.aspect_ratio,
    };
    self.document.cameras.push(HalaFbxCamera {
      name: object_name(record),
      projection_mode: properties.i64("ProjectionType").map_or(default.projection_mode, |p| HalaFbxProjectionMode::from_u8(p as u8)),
      field_of_view: properties.f32("FieldOfView").unwrap_or(default.field_of_view),
      aspect_ratio,
      orthographic_extent: properties.f32("OrthoZoom").unwrap_or(default.orthographic_extent),
      near_plane: properties.f32("NearPlane").unwrap_or(default.near_plane),
      far_plane: properties.f32("FarPlane").unwrap_or(default.far_plane),
    });
    self.document.cameras.len() as u32 - 1
  }

  fn read_material(&mut self, record: &HalaFbxRecord) -> u32 {
    let properties = HalaFbxProperties::of(record);
    let color = |names: [&str; 2]| names.iter().find_map(|n| properties.vec3(n)).map(|c| c.extend(1.0));
    let map = |names: [&str; 2], factor: &str| HalaFbxMaterialMap {
      value: color(names),
      factor: properties.f32(factor),
      texture: None,
    };
    self.document.materials.push(HalaFbxMaterial {
      name: object_name(record),
      diffuse: map(["DiffuseColor", "Diffuse"], "DiffuseFactor"),
      specular: map(["SpecularColor", "Specular"], "SpecularFactor"),
      ambient: map(["AmbientColor", "Ambient"], "AmbientFactor"),
      emissive: map(["EmissiveColor", "Emissive"], "EmissiveFactor"),
      shininess: HalaFbxMaterialMap {
        value: properties.f32("ShininessExponent").or_else(|| properties.f32("Shininess")).map(|s| Vec4::new(s, 0.0, 0.0, 0.0)),
        factor: None,
        texture: None,
      },
      normal_map: HalaFbxMaterialMap::default(),
      bump: HalaFbxMaterialMap::default(),
      opacity: properties.f32("Opacity"),
    });
    self.document.materials.len() as u32 - 1
  }

  fn read_texture(&mut self, record: &HalaFbxRecord) -> u32 {
    let properties = HalaFbxProperties::of(record);
    let wrap = |name: &str| match properties.i64(name) {
      Some(1) => HalaFbxWrapMode::Clamp,
      _ => HalaFbxWrapMode::Repeat,
    };
    self.document.textures.push(HalaFbxTexture {
      name: object_name(record),
      file: None,
      wrap_u: wrap("WrapModeU"),
      wrap_v: wrap("WrapModeV"),
    });
    self.document.textures.len() as u32 - 1
  }

  fn connect(&mut self, connections: &HalaFbxRecord) {
    for c in connections.children_named("C") {
      let (Some(kind), Some(child), Some(parent)) = (
        c.property(0).and_then(|p| p.as_str()),
        c.property(1).and_then(|p| p.as_i64()),
        c.property(2).and_then(|p| p.as_i64()),
      ) else {
        continue;
      };
      let child = self.objects.get(&child).copied().unwrap_or(HalaFbxObjectRef::Other);
      let parent = if parent == 0 {
        None
      } else {
        Some(self.objects.get(&parent).copied().unwrap_or(HalaFbxObjectRef::Other))
      };

      match (kind, child, parent) {
        ("OO", HalaFbxObjectRef::Model(node), Some(HalaFbxObjectRef::Model(parent))) => {
          self.document.nodes[node as usize].parent = Some(parent);
        },
        ("OO", HalaFbxObjectRef::Mesh(mesh), Some(HalaFbxObjectRef::Model(node))) => {
          self.document.nodes[node as usize].meshes.push(mesh);
        },
        ("OO", HalaFbxObjectRef::Light(light), Some(HalaFbxObjectRef::Model(node))) => {
          self.document.nodes[node as usize].lights.push(light);
        },
        ("OO", HalaFbxObjectRef::Camera(camera), Some(HalaFbxObjectRef::Model(node))) => {
          self.document.nodes[node as usize].cameras.push(camera);
        },
        ("OO", HalaFbxObjectRef::Material(material), Some(HalaFbxObjectRef::Model(node))) => {
          self.document.nodes[node as usize].materials.push(material);
        },
        ("OO", HalaFbxObjectRef::Video(video), Some(HalaFbxObjectRef::Texture(texture))) => {
          self.texture_videos.entry(texture).or_insert(video);
        },
        ("OO", HalaFbxObjectRef::Skin(skin), Some(HalaFbxObjectRef::Mesh(mesh))) => {
          self.document.meshes[mesh as usize].skin.get_or_insert(skin);
        },
        ("OO", HalaFbxObjectRef::Cluster(cluster), Some(HalaFbxObjectRef::Skin(skin))) => {
          self.skin_clusters.entry(skin).or_default().push(cluster);
        },
        ("OO", HalaFbxObjectRef::Model(node), Some(HalaFbxObjectRef::Cluster(cluster))) => {
          self.clusters[cluster].node = Some(node);
        },
        ("OP", HalaFbxObjectRef::Texture(texture), Some(HalaFbxObjectRef::Material(material))) => {
          let property = c.property(3).and_then(|p| p.as_str()).unwrap_or("");
          let material = &mut self.document.materials[material as usize];
          let map = match property {
            "DiffuseColor" | "Diffuse" => &mut material.diffuse,
            "SpecularColor" | "Specular" => &mut material.specular,
            "AmbientColor" | "Ambient" => &mut material.ambient,
            "EmissiveColor" | "Emissive" => &mut material.emissive,
            "ShininessExponent" | "Shininess" => &mut material.shininess,
            "NormalMap" => &mut material.normal_map,
            "Bump" => &mut material.bump,
            _ => continue,
          };
          map.texture.get_or_insert(texture);
        },
        _ => {},
      }
    }
  }

  fn finish(mut self) -> Result<HalaFbxDocument, HalaImporterError> {
    self.resolve_texture_files();
    self.resolve_skins();

    // Material slots follow the first node instancing the mesh.
    let mut assigned = vec![false; self.document.meshes.len()];
    for node in self.document.nodes.iter() {
      for &mesh in node.meshes.iter() {
        if !std::mem::replace(&mut assigned[mesh as usize], true) {
          self.document.meshes[mesh as usize].materials = node.materials.iter().map(|&m| Some(m)).collect();
        }
      }
    }
    for mesh in self.document.meshes.iter_mut() {
      let slots = mesh.face_materials.iter().max().map_or(0, |&s| s as usize + 1);
      if mesh.materials.len() < slots {
        mesh.materials.resize(slots, None);
      }
    }

    self.document.finalize()?;
    log::debug!(
      "HalaFbxConverter::finish(): {} nodes, {} meshes, {} materials, {} textures.",
      self.document.nodes.len(),
      self.document.meshes.len(),
      self.document.materials.len(),
      self.document.textures.len(),
    );
    Ok(self.document)
  }

  /// Deduplicate the files referenced by the textures.
  fn resolve_texture_files(&mut self) {
    let mut files: HashMap<(String, String), u32> = HashMap::new();
    for texture in 0..self.document.textures.len() as u32 {
      let video = self.texture_videos.get(&texture).and_then(|&v| self.videos.get(v)).copied();
      let record = self.texture_records.get(texture as usize).copied();

      let mut filename = record.map(|r| string_child(r, "FileName")).unwrap_or_default();
      let mut relative_filename = record.map(|r| string_child(r, "RelativeFilename")).unwrap_or_default();
      if let Some(video) = video {
        if filename.is_empty() {
          filename = string_child(video, "Filename");
        }
        if relative_filename.is_empty() {
          relative_filename = string_child(video, "RelativeFilename");
        }
      }
      if filename.is_empty() && relative_filename.is_empty() {
        continue;
      }

      let content = video.and_then(|v| match v.child_value("Content") {
        Some(HalaFbxProperty::Raw(data)) if !data.is_empty() => Some(data.clone()),
        _ => None,
      });
      let key = (filename.clone(), relative_filename.clone());
      let file = match files.get(&key) {
        Some(&file) => file,
        None => {
          self.document.texture_files.push(HalaFbxTextureFile {
            filename,
            relative_filename,
            content,
          });
          let file = self.document.texture_files.len() as u32 - 1;
          files.insert(key, file);
          file
        },
      };
      self.document.textures[texture as usize].file = Some(file);
    }
  }

  fn resolve_skins(&mut self) {
    for (skin, clusters) in self.skin_clusters.iter() {
      let skin = &mut self.document.skins[*skin as usize];
      for &cluster in clusters.iter() {
        let cluster = &self.clusters[cluster];
        let Some(node) = cluster.node else {
          continue;
        };
        skin.joints.push(node);
        skin.inverse_bind_matrices.push(cluster.transform_link.inverse() * cluster.transform);
        skin.influences.push(
          cluster.indices.iter().zip(cluster.weights.iter())
            .filter(|(i, _)| **i >= 0)
            .map(|(&i, &w)| (i as u32, w as f32))
            .collect(),
        );
      }
    }
  }
}
