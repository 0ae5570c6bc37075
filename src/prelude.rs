pub use crate::error::{
  HalaImporterError,
  HalaImporterErrorKind,
};
pub use crate::config::{
  HalaConfiguration,
  HalaFbxOptions,
  HalaGltfOptions,
};
pub use crate::file_callback::{
  HalaFileCallback,
  HalaInputFileCallbackPolicy,
};
pub use crate::scene::{
  HalaAnyImageImporter,
  HalaFbxImporter,
  HalaGltfImporter,
  HalaImageImporter,
  HalaImporter,
};
pub use crate::scene::data::*;
