pub mod chunks;
pub mod objects;
pub mod instances;
pub mod names;

pub use chunks::{
  HalaChunkRange,
  HalaMeshChunk,
  HalaMeshChunkIndex,
  HalaSlotFaceCounts,
};
pub use objects::{
  HalaAttachment,
  HalaInstanceTargets,
  HalaNodeSource,
  HalaObjectOrigin,
  HalaObjectTable,
  HalaTrs,
  HalaVisitedScene,
};
pub use instances::{
  count_instances,
  fill_instances,
  HalaInstanceCounts,
  HalaInstanceTables,
};
pub use names::HalaNameMap;
