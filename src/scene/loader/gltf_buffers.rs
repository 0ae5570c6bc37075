use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use base64::Engine;
use byteorder::{
  ByteOrder,
  LittleEndian,
};
use gltf::accessor::{
  sparse::IndexType,
  DataType,
};

use crate::error::{
  HalaImporterError,
  HalaImporterErrorKind,
};
use crate::file_callback::{
  load_external,
  HalaFileCallback,
  HalaInputFileCallbackPolicy,
};

/// The buffers of a glTF document, loaded on first use.
pub struct HalaGltfBuffers {
  bin: Option<Rc<[u8]>>,
  base_dir: Option<PathBuf>,
  loaded: RefCell<Vec<Option<Rc<[u8]>>>>,
}

/// The implementation of the glTF buffers.
impl HalaGltfBuffers {
  /// Create the buffer table.
  /// param count: The buffer count of the document.
  /// param bin: The binary chunk of a GLB container.
  /// param base_dir: The directory external files are resolved against.
  /// return: The buffer table.
  pub fn new(count: usize, bin: Option<Vec<u8>>, base_dir: Option<PathBuf>) -> Self {
    Self {
      bin: bin.map(Rc::from),
      base_dir,
      loaded: RefCell::new(vec![None; count]),
    }
  }

  /// Get the data of a buffer, loading it if needed.
  /// param buffer: The buffer.
  /// param callback: The file callback.
  /// return: The buffer data.
  pub fn load(&self, buffer: &gltf::Buffer, callback: Option<&HalaFileCallback>) -> Result<Rc<[u8]>, HalaImporterError> {
    let index = buffer.index();
    if let Some(Some(data)) = self.loaded.borrow().get(index) {
      return Ok(data.clone());
    }

    let data: Rc<[u8]> = match buffer.source() {
      gltf::buffer::Source::Bin => match (&self.bin, index) {
        (Some(bin), 0) => bin.clone(),
        _ => return Err(HalaImporterError::query(&format!("The buffer {} has no URI.", index))),
      },
      gltf::buffer::Source::Uri(uri) => {
        Rc::from(self.load_uri(uri, "buffer", callback, HalaInputFileCallbackPolicy::LoadPermanent)?)
      },
    };
    if data.len() < buffer.length() {
      return Err(HalaImporterError::query(&format!(
        "The buffer {} is too short, expected {} bytes but got {}.",
        index,
        buffer.length(),
        data.len(),
      )));
    }
    log::debug!("HalaGltfBuffers::load(): Buffer {} loaded with {} bytes.", index, data.len());

    if let Some(slot) = self.loaded.borrow_mut().get_mut(index) {
      *slot = Some(data.clone());
    }
    Ok(data)
  }

  /// Get the loaded buffers by index, None for buffers not loaded yet.
  pub fn loaded(&self) -> Vec<Option<Rc<[u8]>>> {
    self.loaded.borrow().clone()
  }

  /// Fetch the data behind a URI, either embedded or external.
  /// param uri: The URI.
  /// param kind: The kind of the referencing entity used in the messages.
  /// param callback: The file callback.
  /// param policy: The lifetime hint passed to the callback.
  /// return: The data.
  pub fn load_uri(
    &self,
    uri: &str,
    kind: &str,
    callback: Option<&HalaFileCallback>,
    policy: HalaInputFileCallbackPolicy,
  ) -> Result<Vec<u8>, HalaImporterError> {
    if let Some(data) = uri.strip_prefix("data:") {
      let (_, payload) = data.split_once(";base64,")
        .ok_or_else(|| HalaImporterError::query(&format!("The {} data URI is not base64 encoded.", kind)))?;
      return base64::engine::general_purpose::STANDARD.decode(payload).map_err(|err| HalaImporterError::new(
        HalaImporterErrorKind::Query,
        &format!("Decode the {} data URI failed.", kind),
        Some(Box::new(err)),
      ));
    }

    let name = percent_decode(uri);
    let path = match (&self.base_dir, callback) {
      (Some(dir), _) => dir.join(&name),
      (None, Some(_)) => PathBuf::from(&name),
      (None, None) => return Err(HalaImporterError::new(
        HalaImporterErrorKind::ResourceUnavailable,
        &format!("External {}s can be imported only when opening files from the filesystem or if a file callback is present.", kind),
        None,
      )),
    };
    load_external(callback, &path, policy).ok_or_else(|| HalaImporterError::new(
      HalaImporterErrorKind::ResourceUnavailable,
      &format!("Cannot load {} file \"{}\".", kind, path.to_string_lossy()),
      None,
    ))
  }

  /// Get the buffer data of a view, checking that the view lies within it.
  /// param view: The buffer view.
  /// param callback: The file callback.
  /// return: The whole buffer data.
  pub fn view_data(&self, view: &gltf::buffer::View, callback: Option<&HalaFileCallback>) -> Result<Rc<[u8]>, HalaImporterError> {
    let data = self.load(&view.buffer(), callback)?;
    if view.offset() + view.length() > data.len() {
      return Err(HalaImporterError::query(&format!(
        "The buffer view {} needs {} bytes but buffer {} has only {}.",
        view.index(),
        view.offset() + view.length(),
        view.buffer().index(),
        data.len(),
      )));
    }
    Ok(data)
  }

  /// Load the buffers of an accessor and check that all its elements lie within them.
  /// param accessor: The accessor.
  /// param callback: The file callback.
  /// return: The result.
  pub fn check_accessor(&self, accessor: &gltf::Accessor, callback: Option<&HalaFileCallback>) -> Result<(), HalaImporterError> {
    let index = accessor.index();
    let count = accessor.count();
    let element_size = accessor.size();
    let sparse = accessor.sparse();
    match accessor.view() {
      Some(view) => {
        self.view_data(&view, callback)?;
        let stride = view.stride().unwrap_or(element_size);
        let required = if count == 0 { 0 } else { accessor.offset() + stride * (count - 1) + element_size };
        if required > view.length() {
          return Err(HalaImporterError::query(&format!(
            "The accessor {} needs {} bytes but buffer view {} has only {}.",
            index,
            required,
            view.index(),
            view.length(),
          )));
        }
      },
      None if sparse.is_none() => {
        return Err(HalaImporterError::query(&format!("The accessor {} has no buffer view.", index)));
      },
      None => {},
    }

    if let Some(sparse) = sparse {
      let sparse_count = sparse.count() as usize;
      let indices = sparse.indices();
      let index_size = match indices.index_type() {
        IndexType::U8 => 1,
        IndexType::U16 => 2,
        IndexType::U32 => 4,
      };
      let values = sparse.values();
      for (view, offset, size) in [
        (indices.view(), indices.offset() as usize, index_size),
        (values.view(), values.offset() as usize, element_size),
      ] {
        self.view_data(&view, callback)?;
        if offset + sparse_count * size > view.length() {
          return Err(HalaImporterError::query(&format!(
            "The sparse storage of accessor {} exceeds buffer view {}.",
            index,
            view.index(),
          )));
        }
      }
    }
    Ok(())
  }

  /// Read every component of every element of an accessor.
  /// Normalized integers are mapped to the unit range, other integers keep their value.
  /// param accessor: The accessor.
  /// param callback: The file callback.
  /// return: The components, element-major.
  pub fn read_components(&self, accessor: &gltf::Accessor, callback: Option<&HalaFileCallback>) -> Result<Vec<f64>, HalaImporterError> {
    self.check_accessor(accessor, callback)?;
    let data_type = accessor.data_type();
    let normalized = accessor.normalized();
    let components = accessor.dimensions().multiplicity();
    let component_size = component_size(data_type);
    let element_size = accessor.size();
    let read_element = |element: &mut [f64], data: &[u8]| {
      for (c, value) in element.iter_mut().enumerate() {
        *value = read_component(&data[c * component_size..], data_type, normalized);
      }
    };

    // Elements without a buffer view start out as zero.
    let mut values = vec![0.0; accessor.count() * components];
    if let Some(view) = accessor.view() {
      let data = self.view_data(&view, callback)?;
      let stride = view.stride().unwrap_or(element_size);
      let begin = view.offset() + accessor.offset();
      for (i, element) in values.chunks_exact_mut(components).enumerate() {
        read_element(element, &data[begin + i * stride..]);
      }
    }

    if let Some(sparse) = accessor.sparse() {
      let indices = sparse.indices();
      let index_view = indices.view();
      let index_data = self.view_data(&index_view, callback)?;
      let index_begin = index_view.offset() + indices.offset() as usize;
      let sparse_values = sparse.values();
      let value_view = sparse_values.view();
      let value_data = self.view_data(&value_view, callback)?;
      let value_begin = value_view.offset() + sparse_values.offset() as usize;
      for k in 0..sparse.count() as usize {
        let target = match indices.index_type() {
          IndexType::U8 => index_data[index_begin + k] as usize,
          IndexType::U16 => LittleEndian::read_u16(&index_data[index_begin + 2 * k..]) as usize,
          IndexType::U32 => LittleEndian::read_u32(&index_data[index_begin + 4 * k..]) as usize,
        };
        let element = values.get_mut(target * components..(target + 1) * components).ok_or_else(|| {
          HalaImporterError::query(&format!("The sparse index {} of accessor {} is out of range.", target, accessor.index()))
        })?;
        read_element(element, &value_data[value_begin + k * element_size..]);
      }
    }
    Ok(values)
  }
}

fn component_size(data_type: DataType) -> usize {
  match data_type {
    DataType::I8 | DataType::U8 => 1,
    DataType::I16 | DataType::U16 => 2,
    DataType::U32 | DataType::F32 => 4,
  }
}

fn read_component(data: &[u8], data_type: DataType, normalized: bool) -> f64 {
  let (value, max) = match data_type {
    DataType::I8 => (data[0] as i8 as f64, i8::MAX as f64),
    DataType::U8 => (data[0] as f64, u8::MAX as f64),
    DataType::I16 => (LittleEndian::read_i16(data) as f64, i16::MAX as f64),
    DataType::U16 => (LittleEndian::read_u16(data) as f64, u16::MAX as f64),
    DataType::U32 => (LittleEndian::read_u32(data) as f64, u32::MAX as f64),
    DataType::F32 => return LittleEndian::read_f32(data) as f64,
  };
  if normalized {
    (value / max).max(-1.0)
  } else {
    value
  }
}

/// Decode the percent escapes of a relative URI.
/// param uri: The URI.
/// return: The decoded path.
pub fn percent_decode(uri: &str) -> String {
  let bytes = uri.as_bytes();
  let mut decoded = Vec::with_capacity(bytes.len());
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] == b'%' && i + 2 < bytes.len() {
      let value = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()
        .and_then(|hex| u8::from_str_radix(hex, 16).ok());
      if let Some(value) = value {
        decoded.push(value);
        i += 3;
        continue;
      }
    }
    decoded.push(bytes[i]);
    i += 1;
  }
  String::from_utf8_lossy(&decoded).into_owned()
}
