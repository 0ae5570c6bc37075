pub mod data;
pub mod flatten;
pub mod image_cache;
pub mod importer;
pub mod loader;

pub use importer::HalaImporter;
pub use image_cache::{
  HalaAnyImageImporter,
  HalaImageImporter,
};
pub use loader::{
  HalaFbxImporter,
  HalaGltfImporter,
};
