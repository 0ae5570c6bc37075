use crate::scene::data::{
  HalaMeshInstance,
  HalaSceneField,
  HalaSceneMapping,
};
use super::chunks::{
  HalaMeshChunk,
  HalaMeshChunkIndex,
};
use super::objects::{
  HalaAttachment,
  HalaInstanceTargets,
  HalaNodeSource,
};

/// The instance record counts of each category, computed before filling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HalaInstanceCounts {
  pub meshes: usize,
  pub lights: usize,
  pub cameras: usize,
  pub skins: usize,
}

/// The ordered instance tables of each category.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaInstanceTables {
  pub meshes: HalaSceneField<HalaMeshInstance>,
  pub lights: HalaSceneField<u32>,
  pub cameras: HalaSceneField<u32>,
  pub skins: HalaSceneField<u32>,
}

/// Visit every bindable attachment in binding order.
fn for_each_attachment<T, S, F>(targets: &T, source: &S, mut f: F)
where
  T: HalaInstanceTargets + ?Sized,
  S: HalaNodeSource + ?Sized,
  F: FnMut(u32, u32, &HalaAttachment),
{
  for node in targets.bound_nodes() {
    for attachment in source.node_attachments(node).iter() {
      if let Some(target) = targets.target_of(node, attachment) {
        f(node, target, attachment);
      }
    }
  }
}

/// Count the instance records every category will hold.
/// A mesh attachment contributes one record per chunk of the mesh.
/// param targets: The objects attachments are bound to.
/// param source: The node forest.
/// param chunks: The mesh chunk index.
/// return: The counts.
pub fn count_instances<T, S>(
  targets: &T,
  source: &S,
  chunks: &HalaMeshChunkIndex,
) -> HalaInstanceCounts
where
  T: HalaInstanceTargets + ?Sized,
  S: HalaNodeSource + ?Sized,
{
  let mut counts = HalaInstanceCounts::default();
  for_each_attachment(targets, source, |_, _, attachment| match attachment {
    HalaAttachment::Mesh { mesh, .. } => counts.meshes += chunks.chunk_count(*mesh) as usize,
    HalaAttachment::Light(_) => counts.lights += 1,
    HalaAttachment::Camera(_) => counts.cameras += 1,
    HalaAttachment::Skin(_) => counts.skins += 1,
  });
  counts
}

/// Fill the instance tables sized by `count_instances`.
/// Panics if the fill does not produce exactly the counted records.
/// param targets: The objects attachments are bound to.
/// param source: The node forest.
/// param chunks: The mesh chunk index.
/// param counts: The counts from the counting pass.
/// param resolve_material: Resolve the material of a chunk instanced by a node.
/// return: The instance tables.
pub fn fill_instances<T, S, F>(
  targets: &T,
  source: &S,
  chunks: &HalaMeshChunkIndex,
  counts: &HalaInstanceCounts,
  resolve_material: F,
) -> HalaInstanceTables
where
  T: HalaInstanceTargets + ?Sized,
  S: HalaNodeSource + ?Sized,
  F: Fn(u32, &HalaMeshChunk) -> Option<u32>,
{
  let mut meshes = HalaSceneField::with_capacity(HalaSceneMapping::Ordered, counts.meshes);
  let mut lights = HalaSceneField::with_capacity(HalaSceneMapping::Ordered, counts.lights);
  let mut cameras = HalaSceneField::with_capacity(HalaSceneMapping::Ordered, counts.cameras);
  let mut skins = HalaSceneField::with_capacity(HalaSceneMapping::Ordered, counts.skins);

  for_each_attachment(targets, source, |node, target, attachment| match attachment {
    HalaAttachment::Mesh { mesh, .. } => {
      let range = chunks.range(*mesh);
      for id in range.base..range.base + range.count {
        if let Some(chunk) = chunks.get(id) {
          meshes.push(target, HalaMeshInstance {
            mesh: id,
            material: resolve_material(node, chunk),
          });
        }
      }
    },
    HalaAttachment::Light(light) => lights.push(target, *light),
    HalaAttachment::Camera(camera) => cameras.push(target, *camera),
    HalaAttachment::Skin(skin) => skins.push(target, *skin),
  });

  HalaInstanceTables {
    meshes: meshes.finish(),
    lights: lights.finish(),
    cameras: cameras.finish(),
    skins: skins.finish(),
  }
}

#[cfg(test)]
mod tests {
  use glam::Vec3;

  use super::*;
  use crate::config::HalaGeometryTransformHandling;
  use crate::scene::flatten::chunks::HalaSlotFaceCounts;
  use crate::scene::flatten::objects::{
    HalaObjectTable,
    HalaTrs,
    HalaVisitedScene,
  };

  struct TestForest {
    parents: Vec<Option<u32>>,
    geometry: Vec<Option<HalaTrs>>,
    attachments: Vec<Vec<HalaAttachment>>,
  }

  impl HalaNodeSource for TestForest {
    fn node_count(&self) -> u32 {
      self.parents.len() as u32
    }
    fn node_parent(&self, node: u32) -> Option<u32> {
      self.parents[node as usize]
    }
    fn node_geometry_transform(&self, node: u32) -> Option<HalaTrs> {
      self.geometry[node as usize]
    }
    fn node_attachments(&self, node: u32) -> Vec<HalaAttachment> {
      self.attachments[node as usize].clone()
    }
    fn mesh_instance_count(&self, _mesh: u32) -> u32 {
      1
    }
  }

  fn triangles(count: u32) -> HalaSlotFaceCounts {
    HalaSlotFaceCounts { triangles: count, ..Default::default() }
  }

  #[test]
  fn two_nodes_share_a_two_material_mesh() {
    let forest = TestForest {
      parents: vec![None, Some(0), Some(0)],
      geometry: vec![None; 3],
      attachments: vec![
        vec![],
        vec![HalaAttachment::Mesh { mesh: 0, skinned: false }],
        vec![HalaAttachment::Mesh { mesh: 0, skinned: false }],
      ],
    };
    let chunks = HalaMeshChunkIndex::build(vec![vec![triangles(10), triangles(5)]]);
    let table = HalaObjectTable::build(&forest, false, HalaGeometryTransformHandling::HELPER_NODES);
    let counts = count_instances(&table, &forest, &chunks);
    assert_eq!(counts.meshes, 4);

    let tables = fill_instances(&table, &forest, &chunks, &counts, |_, chunk| Some(chunk.material_slot));
    assert_eq!(tables.meshes.objects(), &[0, 0, 1, 1]);
    let ids: Vec<_> = tables.meshes.values().iter().map(|i| (i.mesh, i.material)).collect();
    assert_eq!(ids, vec![(0, Some(0)), (1, Some(1)), (0, Some(0)), (1, Some(1))]);
  }

  #[test]
  fn helper_redirection_applies_to_every_category() {
    let forest = TestForest {
      parents: vec![None, Some(0)],
      geometry: vec![None, Some(HalaTrs { scaling: Vec3::splat(2.0), ..HalaTrs::IDENTITY })],
      attachments: vec![
        vec![],
        vec![
          HalaAttachment::Mesh { mesh: 0, skinned: false },
          HalaAttachment::Mesh { mesh: 1, skinned: true },
          HalaAttachment::Skin(0),
          HalaAttachment::Light(4),
          HalaAttachment::Camera(7),
        ],
      ],
    };
    let chunks = HalaMeshChunkIndex::build(vec![vec![triangles(1)], vec![triangles(1)]]);
    let table = HalaObjectTable::build(&forest, false, HalaGeometryTransformHandling::HELPER_NODES);
    let counts = count_instances(&table, &forest, &chunks);
    assert_eq!(counts, HalaInstanceCounts { meshes: 2, lights: 1, cameras: 1, skins: 1 });

    let tables = fill_instances(&table, &forest, &chunks, &counts, |_, _| None);
    assert_eq!(tables.meshes.objects(), &[1, 0]);
    assert_eq!(tables.skins.objects(), &[0]);
    assert_eq!(tables.lights.iter().collect::<Vec<_>>(), vec![(1, &4)]);
    assert_eq!(tables.cameras.iter().collect::<Vec<_>>(), vec![(1, &7)]);
  }

  #[test]
  fn meshes_without_chunks_emit_nothing() {
    let forest = TestForest {
      parents: vec![None, Some(0)],
      geometry: vec![None; 2],
      attachments: vec![vec![], vec![HalaAttachment::Mesh { mesh: 0, skinned: false }]],
    };
    let chunks = HalaMeshChunkIndex::build(vec![vec![HalaSlotFaceCounts::default()]]);
    let table = HalaObjectTable::build(&forest, false, HalaGeometryTransformHandling::HELPER_NODES);
    let counts = count_instances(&table, &forest, &chunks);
    assert_eq!(counts.meshes, 0);
    assert!(fill_instances(&table, &forest, &chunks, &counts, |_, _| None).meshes.is_empty());
  }

  #[test]
  fn visited_scenes_bind_on_the_nodes_themselves() {
    let forest = TestForest {
      parents: vec![None, Some(0), None],
      geometry: vec![None; 3],
      attachments: vec![
        vec![HalaAttachment::Camera(0)],
        vec![HalaAttachment::Mesh { mesh: 0, skinned: false }, HalaAttachment::Light(1)],
        vec![HalaAttachment::Mesh { mesh: 0, skinned: false }],
      ],
    };
    let chunks = HalaMeshChunkIndex::build_from_parts(vec![vec![
      (crate::scene::data::HalaMeshPrimitive::TRIANGLES, 1),
      (crate::scene::data::HalaMeshPrimitive::LINES, 1),
    ]]);
    // Node 2 is not part of the scene.
    let scene = HalaVisitedScene::visit(&[0], 3, |node| if node == 0 { vec![1] } else { vec![] });
    let counts = count_instances(&scene, &forest, &chunks);
    assert_eq!(counts, HalaInstanceCounts { meshes: 2, lights: 1, cameras: 1, skins: 0 });

    let tables = fill_instances(&scene, &forest, &chunks, &counts, |_, chunk| Some(chunk.material_slot + 10));
    assert_eq!(tables.meshes.objects(), &[1, 1]);
    let ids: Vec<_> = tables.meshes.values().iter().map(|i| (i.mesh, i.material)).collect();
    assert_eq!(ids, vec![(0, Some(10)), (1, Some(11))]);
    assert_eq!(tables.cameras.objects(), &[0]);
    assert_eq!(tables.lights.iter().collect::<Vec<_>>(), vec![(1, &1)]);
  }
}
