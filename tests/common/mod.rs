#![allow(dead_code)]

use byteorder::{
  LittleEndian,
  WriteBytesExt,
};

/// A property of a written FBX record.
pub enum FbxValue {
  I32(i32),
  I64(i64),
  F64(f64),
  Str(String),
  I32Array(Vec<i32>),
  F64Array(Vec<f64>),
}

/// A record of a written FBX file.
pub struct FbxRecord {
  pub name: String,
  pub values: Vec<FbxValue>,
  pub children: Vec<FbxRecord>,
}

pub fn record(name: &str, values: Vec<FbxValue>, children: Vec<FbxRecord>) -> FbxRecord {
  FbxRecord {
    name: name.to_string(),
    values,
    children,
  }
}

pub fn string(value: &str) -> FbxValue {
  FbxValue::Str(value.to_string())
}

/// A Properties70 entry with a vector value.
pub fn vec3_property(name: &str, value: [f64; 3]) -> FbxRecord {
  record("P", vec![
    string(name),
    string(name),
    string(""),
    string("A"),
    FbxValue::F64(value[0]),
    FbxValue::F64(value[1]),
    FbxValue::F64(value[2]),
  ], vec![])
}

/// An object record with the "Name\x00\x01Class" naming.
pub fn object(kind: &str, id: i64, name: &str, class: &str, children: Vec<FbxRecord>) -> FbxRecord {
  record(kind, vec![
    FbxValue::I64(id),
    string(&format!("{}\x00\x01{}", name, kind)),
    string(class),
  ], children)
}

pub fn connection(child: i64, parent: i64) -> FbxRecord {
  record("C", vec![string("OO"), FbxValue::I64(child), FbxValue::I64(parent)], vec![])
}

fn write_value(data: &mut Vec<u8>, value: &FbxValue) {
  match value {
    FbxValue::I32(v) => {
      data.push(b'I');
      data.write_i32::<LittleEndian>(*v).unwrap();
    },
    FbxValue::I64(v) => {
      data.push(b'L');
      data.write_i64::<LittleEndian>(*v).unwrap();
    },
    FbxValue::F64(v) => {
      data.push(b'D');
      data.write_f64::<LittleEndian>(*v).unwrap();
    },
    FbxValue::Str(v) => {
      data.push(b'S');
      data.write_u32::<LittleEndian>(v.len() as u32).unwrap();
      data.extend_from_slice(v.as_bytes());
    },
    FbxValue::I32Array(v) => {
      data.push(b'i');
      data.write_u32::<LittleEndian>(v.len() as u32).unwrap();
      data.write_u32::<LittleEndian>(0).unwrap();
      data.write_u32::<LittleEndian>(v.len() as u32 * 4).unwrap();
      for x in v {
        data.write_i32::<LittleEndian>(*x).unwrap();
      }
    },
    FbxValue::F64Array(v) => {
      data.push(b'd');
      data.write_u32::<LittleEndian>(v.len() as u32).unwrap();
      data.write_u32::<LittleEndian>(0).unwrap();
      data.write_u32::<LittleEndian>(v.len() as u32 * 8).unwrap();
      for x in v {
        data.write_f64::<LittleEndian>(*x).unwrap();
      }
    },
  }
}

fn write_record(data: &mut Vec<u8>, record: &FbxRecord) {
  let start = data.len();
  data.extend_from_slice(&[0u8; 12]);
  data.push(record.name.len() as u8);
  data.extend_from_slice(record.name.as_bytes());
  let values_start = data.len();
  for value in record.values.iter() {
    write_value(data, value);
  }
  let values_len = data.len() - values_start;
  if !record.children.is_empty() {
    for child in record.children.iter() {
      write_record(data, child);
    }
    data.extend_from_slice(&[0u8; 13]);
  }
  let end = data.len() as u32;
  data[start..start + 4].copy_from_slice(&end.to_le_bytes());
  data[start + 4..start + 8].copy_from_slice(&(record.values.len() as u32).to_le_bytes());
  data[start + 8..start + 12].copy_from_slice(&(values_len as u32).to_le_bytes());
}

/// Write a version 7.4 binary FBX file.
pub fn write_fbx(records: &[FbxRecord]) -> Vec<u8> {
  let mut data = b"Kaydara FBX Binary  \0".to_vec();
  data.extend_from_slice(&[0x1a, 0x00]);
  data.write_u32::<LittleEndian>(7400).unwrap();
  for record in records {
    write_record(&mut data, record);
  }
  data.extend_from_slice(&[0u8; 13]);
  data
}

/// A quad and a line in two material slots, instanced by one model with a red and a blue material.
pub fn quad_fbx() -> Vec<u8> {
  let geometry = object("Geometry", 100, "QuadMesh", "Mesh", vec![
    record("Vertices", vec![FbxValue::F64Array(vec![
      0.0, 0.0, 0.0,
      1.0, 0.0, 0.0,
      1.0, 1.0, 0.0,
      0.0, 1.0, 0.0,
    ])], vec![]),
    record("PolygonVertexIndex", vec![FbxValue::I32Array(vec![0, 1, 2, -4, 0, -2])], vec![]),
    record("LayerElementMaterial", vec![FbxValue::I32(0)], vec![
      record("MappingInformationType", vec![string("ByPolygon")], vec![]),
      record("ReferenceInformationType", vec![string("IndexToDirect")], vec![]),
      record("Materials", vec![FbxValue::I32Array(vec![0, 1])], vec![]),
    ]),
  ]);
  let model = object("Model", 200, "Box", "Mesh", vec![
    record("Properties70", vec![], vec![
      vec3_property("Lcl Translation", [1.0, 2.0, 3.0]),
      vec3_property("GeometricTranslation", [0.0, 0.0, 5.0]),
    ]),
  ]);
  let material = |id: i64, name: &str, color: [f64; 3]| object("Material", id, name, "", vec![
    record("Properties70", vec![], vec![vec3_property("DiffuseColor", color)]),
  ]);

  write_fbx(&[
    record("Objects", vec![], vec![
      geometry,
      model,
      material(300, "Red", [1.0, 0.0, 0.0]),
      material(301, "Blue", [0.0, 0.0, 1.0]),
    ]),
    record("Connections", vec![], vec![
      connection(200, 0),
      connection(100, 200),
      connection(300, 200),
      connection(301, 200),
    ]),
  ])
}

/// A glTF document with one triangle stored in the given buffer URI.
pub fn triangle_gltf(buffer_uri: &str) -> serde_json::Value {
  serde_json::json!({
    "asset": {"version": "2.0"},
    "scenes": [{"nodes": [0]}],
    "nodes": [
      {"name": "Parent", "children": [1], "scale": [2.0, 2.0, 2.0]},
      {"name": "Child", "mesh": 0, "translation": [0.0, 1.0, 0.0]}
    ],
    "meshes": [{"name": "Triangle", "primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
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

pub fn triangle_buffer() -> Vec<u8> {
  let mut data = Vec::new();
  for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
    data.write_f32::<LittleEndian>(value).unwrap();
  }
  for index in [0u16, 1, 2, 0] {
    data.write_u16::<LittleEndian>(index).unwrap();
  }
  data
}

pub fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}
