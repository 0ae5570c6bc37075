mod common;

use glam::{
  Vec3,
  Vec4,
};
use hala_importer::prelude::*;
use hala_importer::scene::loader::fbx_document::{
  HalaFbxCamera,
  HalaFbxDocument,
  HalaFbxFace,
  HalaFbxLight,
  HalaFbxMaterial,
  HalaFbxMesh,
  HalaFbxNode,
};

use common::*;

fn triangle_geometry(id: i64, name: &str) -> FbxRecord {
  object("Geometry", id, name, "Mesh", vec![
    record("Vertices", vec![FbxValue::F64Array(vec![
      0.0, 0.0, 0.0,
      1.0, 0.0, 0.0,
      0.0, 1.0, 0.0,
    ])], vec![]),
    record("PolygonVertexIndex", vec![FbxValue::I32Array(vec![0, 1, -3])], vec![]),
  ])
}

/// One model carrying two geometries, two lights and two cameras.
fn rig_fbx(geometric_translation: Option<[f64; 3]>) -> Vec<u8> {
  let properties = geometric_translation
    .map(|t| vec![record("Properties70", vec![], vec![vec3_property("GeometricTranslation", t)])])
    .unwrap_or_default();
  write_fbx(&[
    record("Objects", vec![], vec![
      triangle_geometry(100, "A"),
      triangle_geometry(101, "B"),
      object("Model", 200, "Rig", "Null", properties),
      object("NodeAttribute", 300, "Key", "Light", vec![]),
      object("NodeAttribute", 301, "Fill", "Light", vec![]),
      object("NodeAttribute", 400, "Front", "Camera", vec![]),
      object("NodeAttribute", 401, "Side", "Camera", vec![]),
    ]),
    record("Connections", vec![], vec![
      connection(200, 0),
      connection(100, 200),
      connection(101, 200),
      connection(300, 200),
      connection(301, 200),
      connection(400, 200),
      connection(401, 200),
    ]),
  ])
}

fn open_rig(geometric_translation: Option<[f64; 3]>, options: &[(&str, &str)]) -> anyhow::Result<HalaFbxImporter> {
  init_logger();
  let mut importer = HalaFbxImporter::new();
  for (key, value) in options {
    importer.configuration_mut().set(key, value);
  }
  importer.open_data(&rig_fbx(geometric_translation))?;
  Ok(importer)
}

fn open_quad(options: &[(&str, &str)]) -> anyhow::Result<HalaFbxImporter> {
  init_logger();
  let mut importer = HalaFbxImporter::new();
  for (key, value) in options {
    importer.configuration_mut().set(key, value);
  }
  importer.open_data(&quad_fbx())?;
  Ok(importer)
}

#[test]
fn binary_fbx_is_flattened_with_a_geometry_helper() -> anyhow::Result<()> {
  let importer = open_quad(&[])?;
  assert_eq!(importer.scene_count()?, 1);
  assert_eq!(importer.default_scene()?, Some(0));
  assert_eq!(importer.object_count()?, 2);
  assert_eq!(importer.object_name(0)?, "Box");
  assert_eq!(importer.object_name(1)?, "Box_GeometryTransformHelper");

  let scene = importer.scene(0)?;
  assert_eq!(scene.mapping_bound, 2);
  assert_eq!(scene.parent_of(0), None);
  assert_eq!(scene.parent_of(1), Some(0));
  assert_eq!(scene.geometry_transform_helpers.values(), &[false, true]);
  assert_eq!(*scene.translations.get(0).unwrap(), Vec3::new(1.0, 2.0, 3.0));
  assert_eq!(*scene.translations.get(1).unwrap(), Vec3::new(0.0, 0.0, 5.0));
  let world = scene.world_transforms();
  assert!(world[1].w_axis.truncate().abs_diff_eq(Vec3::new(1.0, 2.0, 8.0), 1e-6));

  // The mesh hangs off the helper, one record per material slot.
  assert_eq!(scene.meshes.objects(), &[1, 1]);
  let instances: Vec<_> = scene.meshes.values().iter().map(|i| (i.mesh, i.material)).collect();
  assert_eq!(instances, vec![(0, Some(0)), (1, Some(1))]);
  Ok(())
}

#[test]
fn chunks_split_slots_and_primitives() -> anyhow::Result<()> {
  let importer = open_quad(&[])?;
  assert_eq!(importer.mesh_count()?, 2);
  assert_eq!(importer.mesh_name(0)?, "QuadMesh");
  assert_eq!(importer.mesh_for_name("QuadMesh")?, Some(0));

  let triangles = importer.mesh(0)?;
  assert_eq!(triangles.primitive, HalaMeshPrimitive::TRIANGLES);
  assert_eq!(triangles.indices, Some(vec![0, 1, 2, 0, 2, 3]));
  let lines = importer.mesh(1)?;
  assert_eq!(lines.primitive, HalaMeshPrimitive::LINES);
  assert_eq!(lines.element_count(), 2);
  Ok(())
}

#[test]
fn materials_come_from_the_model_connections() -> anyhow::Result<()> {
  let importer = open_quad(&[])?;
  assert_eq!(importer.material_count()?, 2);
  assert_eq!(importer.material_for_name("Blue")?, Some(1));
  let red = importer.material(0)?;
  assert!(red.types.contains(HalaMaterialTypes::PHONG));
  assert_eq!(red.get("DiffuseColor"), Some(&HalaMaterialValue::Vec4(Vec4::new(1.0, 0.0, 0.0, 1.0))));
  Ok(())
}

#[test]
fn modify_geometry_bakes_single_instances() -> anyhow::Result<()> {
  let importer = open_quad(&[("geometryTransformHandling", "modifyGeometry")])?;
  assert_eq!(importer.object_count()?, 1);
  let scene = importer.scene(0)?;
  assert_eq!(scene.meshes.objects(), &[0, 0]);
  assert_eq!(scene.geometry_transform_helpers.values(), &[false]);
  assert!(scene.geometry_translations.is_empty());
  let positions = importer.mesh(0)?.positions().unwrap().to_vec();
  assert!(positions.iter().all(|p| p.z == 5.0));
  Ok(())
}

#[test]
fn queries_are_repeatable() -> anyhow::Result<()> {
  let importer = open_quad(&[])?;
  assert_eq!(importer.scene(0)?, importer.scene(0)?);
  assert_eq!(importer.mesh(1)?, importer.mesh(1)?);
  assert_eq!(importer.object_for_name("Box")?, Some(0));
  assert_eq!(importer.object_for_name("Box")?, Some(0));
  assert_eq!(importer.object_for_name("Missing")?, None);
  Ok(())
}

#[test]
fn out_of_range_ids_and_closed_importers_fail() -> anyhow::Result<()> {
  let mut importer = open_quad(&[])?;
  assert_eq!(importer.mesh(2).unwrap_err().kind(), HalaImporterErrorKind::Query);
  assert_eq!(importer.scene(1).unwrap_err().kind(), HalaImporterErrorKind::Query);
  importer.close();
  assert!(!importer.is_opened());
  assert_eq!(importer.scene(0).unwrap_err().kind(), HalaImporterErrorKind::NotOpened);
  Ok(())
}

#[test]
fn invalid_configuration_fails_the_open() {
  let err = open_quad(&[("geometryTransformHandling", "sideways")]).unwrap_err();
  let err = err.downcast::<HalaImporterError>().unwrap();
  assert_eq!(err.kind(), HalaImporterErrorKind::Configuration);
}

#[test]
fn ascii_fbx_is_rejected() {
  let mut importer = HalaFbxImporter::new();
  let err = importer.open_data(b"; FBX 7.4.0 project file\nFBXHeaderExtension:  {\n}\n").unwrap_err();
  assert_eq!(err.kind(), HalaImporterErrorKind::Open);
  assert!(!importer.is_opened());
}

#[test]
fn files_open_from_disk() -> anyhow::Result<()> {
  let dir = tempfile::tempdir()?;
  let path = dir.path().join("quad.fbx");
  std::fs::write(&path, quad_fbx())?;

  let mut importer = HalaFbxImporter::new();
  importer.open_file(&path)?;
  assert_eq!(importer.mesh_count()?, 2);

  let missing = importer.open_file(&dir.path().join("missing.fbx")).unwrap_err();
  assert_eq!(missing.kind(), HalaImporterErrorKind::Open);
  assert!(!importer.is_opened());
  Ok(())
}

#[test]
fn object_ids_stay_dense_across_many_nodes() -> anyhow::Result<()> {
  let mut document = HalaFbxDocument::new();
  document.meshes.push(HalaFbxMesh {
    name: "Tri".to_string(),
    positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
    vertex_indices: vec![0, 1, 2],
    faces: vec![HalaFbxFace { index_begin: 0, num_indices: 3 }],
    ..Default::default()
  });
  let mut parent = 0;
  for i in 0..50 {
    parent = document.add_node(HalaFbxNode {
      name: format!("Node{}", i),
      parent: Some(parent),
      meshes: if i % 2 == 0 { vec![0] } else { vec![] },
      ..Default::default()
    });
  }

  let mut importer = HalaFbxImporter::new();
  importer.open_document(document, None)?;
  let scene = importer.scene(0)?;
  assert_eq!(importer.object_count()?, 50);
  assert_eq!(scene.mapping_bound, 50);
  assert_eq!(scene.parents.objects(), (0..50).collect::<Vec<_>>().as_slice());
  assert_eq!(scene.parent_of(0), None);
  assert_eq!(scene.parent_of(49), Some(48));
  assert_eq!(scene.meshes.len(), 25);
  assert!(scene.meshes.objects().iter().all(|&o| o % 2 == 0));
  Ok(())
}

#[test]
fn single_node_binds_every_category() -> anyhow::Result<()> {
  let mut document = HalaFbxDocument::new();
  document.meshes.push(HalaFbxMesh {
    name: "Tri".to_string(),
    positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
    vertex_indices: vec![0, 1, 2],
    faces: vec![HalaFbxFace { index_begin: 0, num_indices: 3 }],
    materials: vec![Some(0)],
    ..Default::default()
  });
  document.materials.push(HalaFbxMaterial { name: "Mat".to_string(), ..Default::default() });
  document.lights.push(HalaFbxLight { name: "Lamp".to_string(), ..Default::default() });
  document.cameras.push(HalaFbxCamera { name: "Eye".to_string(), ..Default::default() });
  document.add_node(HalaFbxNode {
    name: "Thing".to_string(),
    parent: Some(0),
    meshes: vec![0],
    lights: vec![0],
    cameras: vec![0],
    materials: vec![0],
    ..Default::default()
  });

  let mut importer = HalaFbxImporter::new();
  importer.open_document(document, None)?;
  assert_eq!(importer.object_count()?, 1);
  assert_eq!(importer.mesh_count()?, 1);
  assert_eq!(importer.mesh(0)?.primitive, HalaMeshPrimitive::TRIANGLES);

  let scene = importer.scene(0)?;
  assert_eq!(scene.meshes.objects(), &[0]);
  assert_eq!(scene.meshes.values(), &[HalaMeshInstance { mesh: 0, material: Some(0) }]);
  assert_eq!(scene.lights.objects(), &[0]);
  assert_eq!(scene.lights.values(), &[0]);
  assert_eq!(scene.cameras.objects(), &[0]);
  assert_eq!(scene.cameras.values(), &[0]);
  assert!(importer.light(0).is_ok());
  assert!(importer.camera(0).is_ok());
  Ok(())
}

#[test]
fn every_connected_attribute_is_instanced() -> anyhow::Result<()> {
  let importer = open_rig(None, &[])?;
  assert_eq!(importer.object_count()?, 1);
  assert_eq!(importer.mesh_count()?, 2);
  assert_eq!(importer.light_count()?, 2);
  assert_eq!(importer.camera_count()?, 2);

  let scene = importer.scene(0)?;
  assert_eq!(scene.meshes.objects(), &[0, 0]);
  let meshes: Vec<_> = scene.meshes.values().iter().map(|i| i.mesh).collect();
  assert_eq!(meshes, vec![0, 1]);
  assert_eq!(scene.lights.objects(), &[0, 0]);
  assert_eq!(scene.lights.values(), &[0, 1]);
  assert_eq!(scene.cameras.objects(), &[0, 0]);
  assert_eq!(scene.cameras.values(), &[0, 1]);
  Ok(())
}

#[test]
fn preserve_mode_always_has_geometry_fields() -> anyhow::Result<()> {
  let importer = open_rig(None, &[("geometryTransformHandling", "preserve")])?;
  let scene = importer.scene(0)?;
  assert_eq!(scene.geometry_translations.len(), 1);
  assert_eq!(scene.geometry_rotations.len(), 1);
  assert_eq!(scene.geometry_scalings.len(), 1);
  assert_eq!(scene.geometry_translations.values(), &[Vec3::ZERO]);
  assert_eq!(scene.geometry_scalings.values(), &[Vec3::ONE]);
  assert_eq!(scene.geometry_transform_helpers.values(), &[false]);

  let importer = open_quad(&[("geometryTransformHandling", "preserve")])?;
  assert_eq!(importer.object_count()?, 1);
  assert_eq!(importer.scene(0)?.geometry_translations.values(), &[Vec3::new(0.0, 0.0, 5.0)]);

  // Helper flags are present in every mode, geometry transforms only when preserved.
  let scene = open_rig(None, &[])?.scene(0)?;
  assert_eq!(scene.geometry_transform_helpers.values(), &[false]);
  assert!(scene.geometry_translations.is_empty());
  Ok(())
}

#[test]
fn modify_geometry_moves_every_attachment_to_the_helper() -> anyhow::Result<()> {
  let importer = open_rig(Some([0.0, 3.0, 0.0]), &[("geometryTransformHandling", "modifyGeometry")])?;
  // Lights and cameras can not be baked, so the node keeps a helper.
  assert_eq!(importer.object_count()?, 2);
  assert_eq!(importer.object_name(1)?, "Rig_GeometryTransformHelper");

  let scene = importer.scene(0)?;
  assert_eq!(scene.parent_of(1), Some(0));
  assert_eq!(scene.geometry_transform_helpers.values(), &[false, true]);
  assert_eq!(*scene.translations.get(1).unwrap(), Vec3::new(0.0, 3.0, 0.0));
  assert_eq!(scene.meshes.objects(), &[1, 1]);
  assert_eq!(scene.lights.objects(), &[1, 1]);
  assert_eq!(scene.cameras.objects(), &[1, 1]);

  // The helper carries the transform, so the geometry stays untouched.
  assert_eq!(importer.mesh(0)?.positions().unwrap()[2], Vec3::Y);
  Ok(())
}

#[test]
fn reopening_the_same_data_is_deterministic() -> anyhow::Result<()> {
  let data = quad_fbx();
  let mut first = HalaFbxImporter::new();
  first.open_data(&data)?;
  let mut second = HalaFbxImporter::new();
  second.open_data(&data)?;

  let scene = first.scene(0)?;
  assert_eq!(scene, second.scene(0)?);
  assert_eq!(first.object_count()?, second.object_count()?);
  for object in 0..first.object_count()? {
    assert_eq!(first.object_name(object)?, second.object_name(object)?);
  }
  assert_eq!(first.mesh_count()?, second.mesh_count()?);
  for mesh in 0..first.mesh_count()? {
    assert_eq!(first.mesh(mesh)?, second.mesh(mesh)?);
  }

  // The same importer opened again gives the same tables.
  first.open_data(&data)?;
  assert_eq!(first.scene(0)?, scene);
  Ok(())
}

#[test]
fn fbx_documents_report_no_animations() -> anyhow::Result<()> {
  let mut importer = HalaFbxImporter::new();
  assert_eq!(importer.animation_count().unwrap_err().kind(), HalaImporterErrorKind::NotOpened);
  importer.open_data(&quad_fbx())?;
  assert_eq!(importer.animation_count()?, 0);
  assert_eq!(importer.animation_for_name("Take 001")?, None);
  assert_eq!(importer.animation(0).unwrap_err().kind(), HalaImporterErrorKind::Query);
  Ok(())
}
