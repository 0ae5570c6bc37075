use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{
  HalaImporterError,
  HalaImporterErrorKind,
};
use crate::scene::data::HalaImageData;

/// The image decoding delegate used by the scene importers.
pub trait HalaImageImporter {
  /// Decode an image file.
  /// param data: The encoded file data.
  /// return: The decoded image.
  fn open_data(&self, data: &[u8]) -> Result<HalaImageData, HalaImporterError>;
}

/// The default delegate decoding every format the image crate is built with.
#[derive(Clone, Copy, Debug, Default)]
pub struct HalaAnyImageImporter;

impl HalaImageImporter for HalaAnyImageImporter {
  fn open_data(&self, data: &[u8]) -> Result<HalaImageData, HalaImporterError> {
    HalaImageData::new_with_bytes(data)
  }
}

type HalaCachedImage = Result<Rc<HalaImageData>, (HalaImporterErrorKind, String)>;

/// Keeps the result of the most recently opened image id.
/// Repeated queries of the same id reuse it, failures included.
pub struct HalaImageCache {
  importer: Box<dyn HalaImageImporter>,
  last: RefCell<Option<(u32, HalaCachedImage)>>,
}

impl Default for HalaImageCache {
  fn default() -> Self {
    Self::new(Box::new(HalaAnyImageImporter))
  }
}

/// The implementation of the image cache.
impl HalaImageCache {
  pub fn new(importer: Box<dyn HalaImageImporter>) -> Self {
    Self {
      importer,
      last: RefCell::new(None),
    }
  }

  /// Get an image, fetching its file data and decoding it if the id is not the cached one.
  /// param id: The image id.
  /// param fetch: Fetch the encoded file data.
  /// return: The image.
  pub fn get<F>(&self, id: u32, fetch: F) -> Result<Rc<HalaImageData>, HalaImporterError>
  where
    F: FnOnce() -> Result<Vec<u8>, HalaImporterError>,
  {
    if let Some((cached_id, cached)) = self.last.borrow().as_ref() {
      if *cached_id == id {
        return cached.clone().map_err(|(kind, msg)| HalaImporterError::new(kind, &msg, None));
      }
    }

    let result = fetch().and_then(|data| self.importer.open_data(&data));
    let (cached, result) = match result {
      Ok(image) => {
        let image = Rc::new(image);
        (Ok(image.clone()), Ok(image))
      },
      Err(err) => {
        let msg = format!("Open image {} failed: {}", id, err.message());
        log::error!("HalaImageCache::get(): {}", msg);
        (Err((err.kind(), msg.clone())), Err(HalaImporterError::new(err.kind(), &msg, Some(Box::new(err)))))
      },
    };
    *self.last.borrow_mut() = Some((id, cached));
    result
  }

  /// Forget the cached image.
  pub fn clear(&self) {
    *self.last.borrow_mut() = None;
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;
  use crate::scene::data::{
    HalaImageDataType,
    HalaPixelFormat,
  };

  struct CountingImporter {
    opens: Rc<Cell<u32>>,
  }

  impl HalaImageImporter for CountingImporter {
    fn open_data(&self, data: &[u8]) -> Result<HalaImageData, HalaImporterError> {
      self.opens.set(self.opens.get() + 1);
      if data.is_empty() {
        return Err(HalaImporterError::query("empty image"));
      }
      Ok(HalaImageData {
        format: HalaPixelFormat::R8_UNORM,
        width: data.len() as u32,
        height: 1,
        data_type: HalaImageDataType::ByteData(data.to_vec()),
        num_of_bytes: data.len(),
      })
    }
  }

  #[test]
  fn repeated_queries_reuse_the_opened_image() {
    let opens = Rc::new(Cell::new(0));
    let cache = HalaImageCache::new(Box::new(CountingImporter { opens: opens.clone() }));
    assert_eq!(cache.get(3, || Ok(vec![1, 2])).unwrap().width, 2);
    assert_eq!(cache.get(3, || panic!("fetched again")).unwrap().width, 2);
    assert_eq!(opens.get(), 1);

    cache.get(4, || Ok(vec![1])).unwrap();
    cache.get(3, || Ok(vec![1, 2, 3])).unwrap();
    assert_eq!(opens.get(), 3);
  }

  #[test]
  fn failures_are_cached_too() {
    let opens = Rc::new(Cell::new(0));
    let cache = HalaImageCache::new(Box::new(CountingImporter { opens: opens.clone() }));
    assert!(cache.get(0, || Ok(Vec::new())).is_err());
    let err = cache.get(0, || panic!("fetched again")).unwrap_err();
    assert_eq!(err.kind(), HalaImporterErrorKind::Query);
    assert_eq!(opens.get(), 1);
  }
}
