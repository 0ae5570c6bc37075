use crate::scene::data::HalaMeshPrimitive;

/// The face counts of one material slot of a source mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HalaSlotFaceCounts {
  pub points: u32,
  pub lines: u32,
  pub triangles: u32,
}

/// One drawable unit of a source mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaMeshChunk {
  pub mesh: u32,
  pub material_slot: u32,
  pub primitive: HalaMeshPrimitive,
  /// The face count of the chunk.
  pub faces: u32,
}

/// The contiguous chunk id range produced by one source mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HalaChunkRange {
  pub base: u32,
  pub count: u32,
}

/// The split of every source mesh into per-material, per-primitive chunks.
/// Built once when a file is opened, lookups only afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaMeshChunkIndex {
  chunks: Vec<HalaMeshChunk>,
  ranges: Vec<HalaChunkRange>,
}

/// The implementation of the mesh chunk index.
impl HalaMeshChunkIndex {
  /// Build the index from the face counts of every material slot of every mesh.
  /// Slots are visited in declaration order and points, lines, triangles within a slot,
  /// combinations without faces produce no chunk.
  /// param meshes: The per-slot face counts of each mesh, in mesh id order.
  /// return: The index.
  pub fn build<M, S>(meshes: M) -> Self
  where
    M: IntoIterator<Item = S>,
    S: IntoIterator<Item = HalaSlotFaceCounts>,
  {
    let mut index = Self::default();
    for (mesh, slots) in meshes.into_iter().enumerate() {
      let base = index.chunks.len() as u32;
      for (slot, counts) in slots.into_iter().enumerate() {
        for (primitive, faces) in [
          (HalaMeshPrimitive::POINTS, counts.points),
          (HalaMeshPrimitive::LINES, counts.lines),
          (HalaMeshPrimitive::TRIANGLES, counts.triangles),
        ] {
          if faces > 0 {
            index.chunks.push(HalaMeshChunk {
              mesh: mesh as u32,
              material_slot: slot as u32,
              primitive,
              faces,
            });
          }
        }
      }
      index.ranges.push(HalaChunkRange {
        base,
        count: index.chunks.len() as u32 - base,
      });
    }
    index
  }

  /// Build the index from meshes whose parts already are single-primitive units.
  /// Every part becomes one chunk and the slot is the part index.
  /// param meshes: The primitive and element count of each part of each mesh.
  /// return: The index.
  pub fn build_from_parts<M, S>(meshes: M) -> Self
  where
    M: IntoIterator<Item = S>,
    S: IntoIterator<Item = (HalaMeshPrimitive, u32)>,
  {
    let mut index = Self::default();
    for (mesh, parts) in meshes.into_iter().enumerate() {
      let base = index.chunks.len() as u32;
      for (slot, (primitive, faces)) in parts.into_iter().enumerate() {
        index.chunks.push(HalaMeshChunk {
          mesh: mesh as u32,
          material_slot: slot as u32,
          primitive,
          faces,
        });
      }
      index.ranges.push(HalaChunkRange {
        base,
        count: index.chunks.len() as u32 - base,
      });
    }
    index
  }

  /// Get the total chunk count.
  pub fn len(&self) -> u32 {
    self.chunks.len() as u32
  }

  pub fn is_empty(&self) -> bool {
    self.chunks.is_empty()
  }

  pub fn mesh_count(&self) -> u32 {
    self.ranges.len() as u32
  }

  /// Get the chunk range of a source mesh.
  /// param mesh: The source mesh id.
  /// return: The range, empty for unknown meshes.
  pub fn range(&self, mesh: u32) -> HalaChunkRange {
    self.ranges.get(mesh as usize).copied().unwrap_or_default()
  }

  pub fn chunk_count(&self, mesh: u32) -> u32 {
    self.range(mesh).count
  }

  /// Get the i-th chunk of a source mesh.
  /// param mesh: The source mesh id.
  /// param i: The chunk index within the mesh.
  /// return: The chunk.
  pub fn chunk(&self, mesh: u32, i: u32) -> Option<&HalaMeshChunk> {
    let range = self.range(mesh);
    if i >= range.count {
      return None;
    }
    self.chunks.get((range.base + i) as usize)
  }

  /// Get a chunk by its global id.
  /// param id: The chunk id.
  /// return: The chunk.
  pub fn get(&self, id: u32) -> Option<&HalaMeshChunk> {
    self.chunks.get(id as usize)
  }

  pub fn iter(&self) -> impl Iterator<Item = (u32, &HalaMeshChunk)> {
    self.chunks.iter().enumerate().map(|(i, c)| (i as u32, c))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn counts(points: u32, lines: u32, triangles: u32) -> HalaSlotFaceCounts {
    HalaSlotFaceCounts { points, lines, triangles }
  }

  #[test]
  fn chunks_are_slot_major_and_kind_minor() {
    let index = HalaMeshChunkIndex::build(vec![
      vec![counts(2, 0, 5), counts(0, 3, 1)],
      vec![counts(0, 0, 4)],
    ]);

    assert_eq!(index.len(), 5);
    assert_eq!(index.range(0), HalaChunkRange { base: 0, count: 4 });
    assert_eq!(index.range(1), HalaChunkRange { base: 4, count: 1 });

    let kinds: Vec<_> = (0..4).map(|i| {
      let chunk = index.chunk(0, i).unwrap();
      (chunk.material_slot, chunk.primitive)
    }).collect();
    assert_eq!(kinds, vec![
      (0, HalaMeshPrimitive::POINTS),
      (0, HalaMeshPrimitive::TRIANGLES),
      (1, HalaMeshPrimitive::LINES),
      (1, HalaMeshPrimitive::TRIANGLES),
    ]);
    assert_eq!(index.chunk(1, 0).unwrap().mesh, 1);
    assert!(index.chunk(1, 1).is_none());
  }

  #[test]
  fn empty_combinations_produce_no_chunks() {
    let index = HalaMeshChunkIndex::build(vec![
      vec![counts(0, 0, 0)],
      vec![],
      vec![counts(0, 0, 0), counts(0, 0, 2)],
    ]);
    assert_eq!(index.len(), 1);
    assert_eq!(index.chunk_count(0), 0);
    assert_eq!(index.chunk_count(1), 0);
    assert_eq!(index.range(2), HalaChunkRange { base: 0, count: 1 });
    assert_eq!(index.get(0).unwrap().material_slot, 1);
    assert!(index.iter().all(|(_, chunk)| chunk.faces > 0));
  }

  #[test]
  fn face_counts_are_conserved_per_kind() {
    let slots = vec![counts(1, 2, 3), counts(4, 0, 6), counts(0, 7, 0)];
    let index = HalaMeshChunkIndex::build(vec![slots.clone()]);
    let sum = |kind| index.iter().filter(|(_, c)| c.primitive == kind).map(|(_, c)| c.faces).sum::<u32>();
    assert_eq!(sum(HalaMeshPrimitive::POINTS), 5);
    assert_eq!(sum(HalaMeshPrimitive::LINES), 9);
    assert_eq!(sum(HalaMeshPrimitive::TRIANGLES), 9);
  }

  #[test]
  fn parts_keep_their_declaration_order() {
    let index = HalaMeshChunkIndex::build_from_parts(vec![
      vec![(HalaMeshPrimitive::TRIANGLE_STRIP, 1), (HalaMeshPrimitive::POINTS, 1)],
      vec![(HalaMeshPrimitive::LINES, 1)],
    ]);
    assert_eq!(index.len(), 3);
    assert_eq!(index.chunk(0, 1).unwrap().material_slot, 1);
    assert_eq!(index.chunk(1, 0).unwrap().primitive, HalaMeshPrimitive::LINES);
    assert_eq!(index.range(1).base, 2);
  }
}
