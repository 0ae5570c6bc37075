use std::collections::HashMap;
use std::io::{
  BufReader,
  Cursor,
};
use std::path::Path;

use glam::{
  Vec2,
  Vec3,
  Vec4,
};

use crate::error::HalaImporterError;
use crate::file_callback::{
  load_external,
  HalaFileCallback,
  HalaInputFileCallbackPolicy,
};
use super::fbx_document::*;

/// Read a Wavefront OBJ file and its material libraries into a document.
/// param data: The OBJ file data.
/// param base_dir: The directory material libraries are resolved against.
/// param callback: The file callback used instead of the filesystem.
/// return: The document.
pub fn read_obj(
  data: &[u8],
  base_dir: Option<&Path>,
  callback: Option<&HalaFileCallback>,
) -> Result<HalaFbxDocument, HalaImporterError> {
  let options = tobj::LoadOptions {
    single_index: false,
    triangulate: false,
    ignore_points: false,
    ignore_lines: false,
    ..Default::default()
  };
  let mut reader = BufReader::new(Cursor::new(data));
  let (models, materials) = tobj::load_obj_buf(&mut reader, &options, |path| {
    let path = match base_dir {
      Some(base_dir) => base_dir.join(path),
      None if callback.is_some() => path.to_path_buf(),
      None => return Err(tobj::LoadError::OpenFileFailed),
    };
    match load_external(callback, &path, HalaInputFileCallbackPolicy::LoadTemporary) {
      Some(mtl) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mtl))),
      None => Err(tobj::LoadError::OpenFileFailed),
    }
  }).map_err(|err| HalaImporterError::open(&format!("Parse OBJ failed: {}.", err)))?;

  if models.is_empty() {
    return Err(HalaImporterError::open("The file format is not recognized."));
  }

  let mut document = HalaFbxDocument {
    unit_meters: 1.0,
    ..Default::default()
  };
  match materials {
    Ok(materials) => read_materials(&mut document, &materials),
    Err(err) => {
      let msg = format!("Material library not loaded: {}.", err);
      log::warn!("read_obj(): {}", msg);
      document.warnings.push(msg);
    },
  }

  for model in models.iter() {
    let mesh = read_mesh(&model.name, &model.mesh);
    let material = model.mesh.material_id
      .map(|m| m as u32)
      .filter(|&m| (m as usize) < document.materials.len());
    document.meshes.push(HalaFbxMesh {
      materials: vec![material],
      ..mesh
    });
    document.add_node(HalaFbxNode {
      name: model.name.clone(),
      parent: Some(0),
      meshes: vec![document.meshes.len() as u32 - 1],
      materials: material.into_iter().collect(),
      ..Default::default()
    });
  }

  document.finalize()?;
  log::debug!("read_obj(): {} models, {} materials.", models.len(), document.materials.len());
  Ok(document)
}

fn read_mesh(name: &str, mesh: &tobj::Mesh) -> HalaFbxMesh {
  let vertex_indices = mesh.indices.clone();
  let mut faces = Vec::new();
  if mesh.face_arities.is_empty() {
    for begin in (0..vertex_indices.len() as u32).step_by(3) {
      faces.push(HalaFbxFace { index_begin: begin, num_indices: 3 });
    }
  } else {
    let mut begin = 0;
    for &arity in mesh.face_arities.iter() {
      faces.push(HalaFbxFace { index_begin: begin, num_indices: arity });
      begin += arity;
    }
  }

  let normals = (!mesh.normal_indices.is_empty() && mesh.normal_indices.len() == vertex_indices.len()).then(|| HalaFbxVertexAttribute {
    values: mesh.normals.chunks_exact(3).map(|n| Vec3::new(n[0], n[1], n[2])).collect(),
    indices: mesh.normal_indices.clone(),
  });
  let uv_sets = if !mesh.texcoord_indices.is_empty() && mesh.texcoord_indices.len() == vertex_indices.len() {
    vec![HalaFbxUvSet {
      name: "UVMap".to_string(),
      uvs: HalaFbxVertexAttribute {
        values: mesh.texcoords.chunks_exact(2).map(|t| Vec2::new(t[0], t[1])).collect(),
        indices: mesh.texcoord_indices.clone(),
      },
      ..Default::default()
    }]
  } else {
    Vec::new()
  };
  let color_sets = if !mesh.vertex_color.is_empty() && mesh.vertex_color.len() == mesh.positions.len() {
    vec![HalaFbxColorSet {
      name: "Color".to_string(),
      colors: HalaFbxVertexAttribute {
        values: mesh.vertex_color.chunks_exact(3).map(|c| Vec4::new(c[0], c[1], c[2], 1.0)).collect(),
        indices: vertex_indices.clone(),
      },
    }]
  } else {
    Vec::new()
  };

  HalaFbxMesh {
    name: name.to_string(),
    positions: mesh.positions.chunks_exact(3).map(|p| Vec3::new(p[0], p[1], p[2])).collect(),
    vertex_indices,
    faces,
    normals,
    uv_sets,
    color_sets,
    ..Default::default()
  }
}

fn read_materials(document: &mut HalaFbxDocument, materials: &[tobj::Material]) {
  let mut files: HashMap<String, u32> = HashMap::new();
  let mut texture = |document: &mut HalaFbxDocument, path: &Option<String>| -> Option<u32> {
    let path = path.as_ref().filter(|p| !p.is_empty())?;
    let file = *files.entry(path.clone()).or_insert_with(|| {
      document.texture_files.push(HalaFbxTextureFile {
        filename: path.clone(),
        relative_filename: path.clone(),
        content: None,
      });
      document.texture_files.len() as u32 - 1
    });
    document.textures.push(HalaFbxTexture {
      name: path.clone(),
      file: Some(file),
      ..Default::default()
    });
    Some(document.textures.len() as u32 - 1)
  };

  for material in materials.iter() {
    let color = |c: Option<[f32; 3]>| c.map(|c| Vec4::new(c[0], c[1], c[2], 1.0));
    let result = HalaFbxMaterial {
      name: material.name.clone(),
      diffuse: HalaFbxMaterialMap {
        value: color(material.diffuse),
        factor: None,
        texture: texture(document, &material.diffuse_texture),
      },
      specular: HalaFbxMaterialMap {
        value: color(material.specular),
        factor: None,
        texture: texture(document, &material.specular_texture),
      },
      ambient: HalaFbxMaterialMap {
        value: color(material.ambient),
        factor: None,
        texture: texture(document, &material.ambient_texture),
      },
      emissive: HalaFbxMaterialMap::default(),
      shininess: HalaFbxMaterialMap {
        value: material.shininess.map(|s| Vec4::new(s, 0.0, 0.0, 0.0)),
        factor: None,
        texture: texture(document, &material.shininess_texture),
      },
      normal_map: HalaFbxMaterialMap {
        value: None,
        factor: None,
        texture: texture(document, &material.normal_texture),
      },
      bump: HalaFbxMaterialMap::default(),
      opacity: material.dissolve,
    };
    document.materials.push(result);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const QUAD_AND_TRIANGLE: &str = "\
o Quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
o Tri
v 0 0 1
v 1 0 1
v 0 1 1
f 5 6 7
";

  #[test]
  fn models_become_nodes_with_polygon_faces() {
    let document = read_obj(QUAD_AND_TRIANGLE.as_bytes(), None, None).unwrap();
    assert_eq!(document.nodes.len(), 3);
    assert_eq!(document.nodes[1].name, "Quad");
    assert_eq!(document.nodes[2].meshes, vec![1]);

    let quad = &document.meshes[0];
    assert_eq!(quad.faces, vec![HalaFbxFace { index_begin: 0, num_indices: 4 }]);
    assert_eq!(quad.uv_sets.len(), 1);
    assert_eq!(quad.uv_sets[0].uvs.get(2), Some(Vec2::new(1.0, 1.0)));
    assert_eq!(quad.slot_face_counts()[0].triangles, 2);
    assert_eq!(document.meshes[1].positions.len(), 3);
  }

  #[test]
  fn material_libraries_go_through_the_callback() {
    let data = b"mtllib box.mtl\nusemtl red\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    let callback: HalaFileCallback = std::rc::Rc::new(|name: &str, _policy: HalaInputFileCallbackPolicy| {
      (name == "box.mtl").then(|| b"newmtl red\nKd 1 0 0\nmap_Kd red.png\n".to_vec())
    });
    let document = read_obj(data, None, Some(&callback)).unwrap();
    assert_eq!(document.materials.len(), 1);
    assert_eq!(document.materials[0].diffuse.value, Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
    assert_eq!(document.meshes[0].materials, vec![Some(0)]);
    assert_eq!(document.texture_files[0].relative_filename, "red.png");
  }

  #[test]
  fn empty_input_is_not_recognized() {
    assert!(read_obj(b"", None, None).is_err());
  }
}
