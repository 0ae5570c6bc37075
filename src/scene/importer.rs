use std::path::Path;

use crate::config::HalaConfiguration;
use crate::error::HalaImporterError;
use crate::file_callback::HalaFileCallback;
use crate::scene::data::{
  HalaAnimationData,
  HalaCameraData,
  HalaImageData,
  HalaLightData,
  HalaMaterialData,
  HalaMeshAttribute,
  HalaMeshData,
  HalaSceneData,
  HalaSkinData,
  HalaTextureData,
};
use crate::scene::image_cache::HalaImageImporter;

/// The query surface shared by the scene importers.
/// Every query is answered from the opened document and stays stable until it is closed.
pub trait HalaImporter {
  fn configuration(&self) -> &HalaConfiguration;
  fn configuration_mut(&mut self) -> &mut HalaConfiguration;

  /// Set the loader used for every external file, replacing filesystem access.
  fn set_file_callback(&mut self, callback: Option<HalaFileCallback>);

  /// Replace the image decoding delegate.
  fn set_image_importer(&mut self, importer: Box<dyn HalaImageImporter>);

  fn is_opened(&self) -> bool;
  fn close(&mut self);

  /// Open a document from memory, external files are only reachable through the file callback.
  /// param data: The file data.
  /// return: The result.
  fn open_data(&mut self, data: &[u8]) -> Result<(), HalaImporterError>;

  /// Open a document from a file, external files are resolved relative to it.
  /// param path: The file path.
  /// return: The result.
  fn open_file(&mut self, path: &Path) -> Result<(), HalaImporterError>;

  fn scene_count(&self) -> Result<u32, HalaImporterError>;
  fn default_scene(&self) -> Result<Option<u32>, HalaImporterError>;
  fn scene_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError>;
  fn scene_name(&self, id: u32) -> Result<String, HalaImporterError>;
  fn scene(&self, id: u32) -> Result<HalaSceneData, HalaImporterError>;

  fn object_count(&self) -> Result<u32, HalaImporterError>;
  fn object_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError>;
  fn object_name(&self, id: u32) -> Result<String, HalaImporterError>;

  fn mesh_count(&self) -> Result<u32, HalaImporterError>;
  fn mesh_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError>;
  fn mesh_name(&self, id: u32) -> Result<String, HalaImporterError>;
  fn mesh(&self, id: u32) -> Result<HalaMeshData, HalaImporterError>;

  /// Resolve a format specific vertex attribute name.
  fn mesh_attribute_for_name(&self, _name: &str) -> Result<Option<HalaMeshAttribute>, HalaImporterError> {
    Ok(None)
  }

  fn mesh_attribute_name(&self, _attribute: HalaMeshAttribute) -> Result<Option<String>, HalaImporterError> {
    Ok(None)
  }

  fn light_count(&self) -> Result<u32, HalaImporterError>;
  fn light_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError>;
  fn light_name(&self, id: u32) -> Result<String, HalaImporterError>;
  fn light(&self, id: u32) -> Result<HalaLightData, HalaImporterError>;

  fn camera_count(&self) -> Result<u32, HalaImporterError>;
  fn camera_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError>;
  fn camera_name(&self, id: u32) -> Result<String, HalaImporterError>;
  fn camera(&self, id: u32) -> Result<HalaCameraData, HalaImporterError>;

  fn skin_count(&self) -> Result<u32, HalaImporterError>;
  fn skin_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError>;
  fn skin_name(&self, id: u32) -> Result<String, HalaImporterError>;
  fn skin(&self, id: u32) -> Result<HalaSkinData, HalaImporterError>;

  fn material_count(&self) -> Result<u32, HalaImporterError>;
  fn material_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError>;
  fn material_name(&self, id: u32) -> Result<String, HalaImporterError>;
  fn material(&self, id: u32) -> Result<HalaMaterialData, HalaImporterError>;

  fn texture_count(&self) -> Result<u32, HalaImporterError>;
  fn texture_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError>;
  fn texture_name(&self, id: u32) -> Result<String, HalaImporterError>;
  fn texture(&self, id: u32) -> Result<HalaTextureData, HalaImporterError>;

  /// Get the animation count, formats without animation import report none.
  fn animation_count(&self) -> Result<u32, HalaImporterError> {
    if self.is_opened() {
      Ok(0)
    } else {
      Err(HalaImporterError::not_opened())
    }
  }

  fn animation_for_name(&self, _name: &str) -> Result<Option<u32>, HalaImporterError> {
    self.animation_count().map(|_| None)
  }

  fn animation_name(&self, id: u32) -> Result<String, HalaImporterError> {
    check_id("animation", id, self.animation_count()?)?;
    Err(HalaImporterError::query("Animation import is not supported."))
  }

  fn animation(&self, id: u32) -> Result<HalaAnimationData, HalaImporterError> {
    check_id("animation", id, self.animation_count()?)?;
    Err(HalaImporterError::query("Animation import is not supported."))
  }

  fn image_count(&self) -> Result<u32, HalaImporterError>;
  fn image_for_name(&self, name: &str) -> Result<Option<u32>, HalaImporterError>;
  fn image_name(&self, id: u32) -> Result<String, HalaImporterError>;
  fn image(&self, id: u32) -> Result<HalaImageData, HalaImporterError>;
}

/// Check an id against a count.
/// param kind: The entity kind used in the message.
/// param id: The id.
/// param count: The count.
/// return: The id.
pub(crate) fn check_id(kind: &str, id: u32, count: u32) -> Result<usize, HalaImporterError> {
  if id < count {
    Ok(id as usize)
  } else {
    Err(HalaImporterError::query(&format!("The {} {} is out of range for {} entries.", kind, id, count)))
  }
}
