use std::io::{
  Cursor,
  Read,
};

use byteorder::{
  LittleEndian,
  ReadBytesExt,
};

use crate::error::HalaImporterError;

/// The magic of a binary FBX file.
pub const FBX_BINARY_MAGIC: &[u8; 21] = b"Kaydara FBX Binary  \0";

/// The offset of the first record.
const FBX_HEADER_SIZE: u64 = 27;

/// A property of a FBX record.
#[derive(Clone, Debug, PartialEq)]
pub enum HalaFbxProperty {
  Bool(bool),
  I16(i16),
  I32(i32),
  I64(i64),
  F32(f32),
  F64(f64),
  String(String),
  Raw(Vec<u8>),
  BoolArray(Vec<bool>),
  I32Array(Vec<i32>),
  I64Array(Vec<i64>),
  F32Array(Vec<f32>),
  F64Array(Vec<f64>),
}

/// The implementation of the FBX property.
impl HalaFbxProperty {
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Bool(v) => Some(*v as i64),
      Self::I16(v) => Some(*v as i64),
      Self::I32(v) => Some(*v as i64),
      Self::I64(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::F32(v) => Some(*v as f64),
      Self::F64(v) => Some(*v),
      _ => self.as_i64().map(|v| v as f64),
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::String(v) => Some(v.as_str()),
      _ => None,
    }
  }

  /// Get a numeric array as f64 values.
  pub fn to_f64_array(&self) -> Option<Vec<f64>> {
    match self {
      Self::F64Array(v) => Some(v.clone()),
      Self::F32Array(v) => Some(v.iter().map(|&x| x as f64).collect()),
      Self::I32Array(v) => Some(v.iter().map(|&x| x as f64).collect()),
      Self::I64Array(v) => Some(v.iter().map(|&x| x as f64).collect()),
      _ => None,
    }
  }

  /// Get an integer array as i64 values.
  pub fn to_i64_array(&self) -> Option<Vec<i64>> {
    match self {
      Self::I32Array(v) => Some(v.iter().map(|&x| x as i64).collect()),
      Self::I64Array(v) => Some(v.clone()),
      Self::BoolArray(v) => Some(v.iter().map(|&x| x as i64).collect()),
      _ => None,
    }
  }
}

/// A record of a FBX file with its properties and nested records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaFbxRecord {
  pub name: String,
  pub properties: Vec<HalaFbxProperty>,
  pub children: Vec<HalaFbxRecord>,
}

/// The implementation of the FBX record.
impl HalaFbxRecord {
  /// Find the first child with the name.
  /// param name: The child name.
  /// return: The child.
  pub fn child(&self, name: &str) -> Option<&HalaFbxRecord> {
    self.children.iter().find(|c| c.name == name)
  }

  pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HalaFbxRecord> + 'a {
    self.children.iter().filter(move |c| c.name == name)
  }

  pub fn property(&self, index: usize) -> Option<&HalaFbxProperty> {
    self.properties.get(index)
  }

  /// Get the first property of a child, the usual shape of a value record.
  /// param name: The child name.
  /// return: The property.
  pub fn child_value(&self, name: &str) -> Option<&HalaFbxProperty> {
    self.child(name).and_then(|c| c.property(0))
  }
}

/// A parsed binary FBX file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaFbxFile {
  pub version: u32,
  pub records: Vec<HalaFbxRecord>,
}

/// The implementation of the FBX file.
impl HalaFbxFile {
  /// Check whether the data starts with the binary FBX magic.
  pub fn is_binary(data: &[u8]) -> bool {
    data.starts_with(FBX_BINARY_MAGIC)
  }

  /// Check whether the data looks like an ASCII FBX file.
  pub fn is_ascii(data: &[u8]) -> bool {
    let head = &data[..data.len().min(1024)];
    let text = String::from_utf8_lossy(head);
    text.lines().any(|line| {
      let line = line.trim_start();
      line.starts_with("; FBX") || line.starts_with("FBXHeaderExtension:")
    })
  }

  /// Parse a binary FBX file.
  /// param data: The file data.
  /// return: The parsed file.
  pub fn parse(data: &[u8]) -> Result<Self, HalaImporterError> {
    if !Self::is_binary(data) {
      return Err(HalaImporterError::open("The data is not a binary FBX file."));
    }
    let mut parser = HalaFbxParser {
      cursor: Cursor::new(data),
      len: data.len() as u64,
      version: 0,
    };
    parser.cursor.set_position(23);
    parser.version = parser.cursor.read_u32::<LittleEndian>()?;
    parser.cursor.set_position(FBX_HEADER_SIZE);

    let mut records = Vec::new();
    while parser.remaining() >= parser.record_header_size() {
      match parser.read_record(0)? {
        Some(record) => records.push(record),
        None => break,
      }
    }
    log::debug!("HalaFbxFile::parse(): Version {} with {} top level records.", parser.version, records.len());
    Ok(Self {
      version: parser.version,
      records,
    })
  }

  /// Find a top level record.
  /// param name: The record name.
  /// return: The record.
  pub fn record(&self, name: &str) -> Option<&HalaFbxRecord> {
    self.records.iter().find(|r| r.name == name)
  }
}

/// The maximum record nesting depth accepted.
const FBX_MAX_DEPTH: u32 = 64;

struct HalaFbxParser<'a> {
  cursor: Cursor<&'a [u8]>,
  len: u64,
  version: u32,
}

impl<'a> HalaFbxParser<'a> {
  fn remaining(&self) -> u64 {
    self.len.saturating_sub(self.cursor.position())
  }

  /// Version 7.5 and later use 64-bit record headers.
  fn record_header_size(&self) -> u64 {
    if self.version >= 7500 { 25 } else { 13 }
  }

  fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>, HalaImporterError> {
    if len > self.remaining() {
      return Err(HalaImporterError::open(&format!("FBX data truncated at offset {}.", self.cursor.position())));
    }
    let mut data = vec![0u8; len as usize];
    self.cursor.read_exact(&mut data)?;
    Ok(data)
  }

  /// Read a record, None for the null record ending a record list.
  fn read_record(&mut self, depth: u32) -> Result<Option<HalaFbxRecord>, HalaImporterError> {
    if depth > FBX_MAX_DEPTH {
      return Err(HalaImporterError::open("FBX records are nested too deeply."));
    }
    let (end_offset, num_properties) = if self.version >= 7500 {
      let end_offset = self.cursor.read_u64::<LittleEndian>()?;
      let num_properties = self.cursor.read_u64::<LittleEndian>()?;
      let _property_list_len = self.cursor.read_u64::<LittleEndian>()?;
      (end_offset, num_properties)
    } else {
      let end_offset = self.cursor.read_u32::<LittleEndian>()? as u64;
      let num_properties = self.cursor.read_u32::<LittleEndian>()? as u64;
      let _property_list_len = self.cursor.read_u32::<LittleEndian>()?;
      (end_offset, num_properties)
    };
    let name_len = self.cursor.read_u8()?;

    if end_offset == 0 {
      return Ok(None);
    }
    if end_offset > self.len || end_offset < self.cursor.position() {
      return Err(HalaImporterError::open(&format!("FBX record ends at invalid offset {}.", end_offset)));
    }

    let name = String::from_utf8_lossy(&self.read_bytes(name_len as u64)?).to_string();
    let mut properties = Vec::with_capacity(num_properties.min(1024) as usize);
    for _ in 0..num_properties {
      properties.push(self.read_property()?);
    }

    let mut children = Vec::new();
    while self.cursor.position() < end_offset {
      match self.read_record(depth + 1)? {
        Some(child) => children.push(child),
        None => break,
      }
    }
    self.cursor.set_position(end_offset);

    Ok(Some(HalaFbxRecord {
      name,
      properties,
      children,
    }))
  }

  fn read_property(&mut self) -> Result<HalaFbxProperty, HalaImporterError> {
    let type_code = self.cursor.read_u8()?;
    let property = match type_code {
      b'C' => HalaFbxProperty::Bool(self.cursor.read_u8()? != 0),
      b'Y' => HalaFbxProperty::I16(self.cursor.read_i16::<LittleEndian>()?),
      b'I' => HalaFbxProperty::I32(self.cursor.read_i32::<LittleEndian>()?),
      b'L' => HalaFbxProperty::I64(self.cursor.read_i64::<LittleEndian>()?),
      b'F' => HalaFbxProperty::F32(self.cursor.read_f32::<LittleEndian>()?),
      b'D' => HalaFbxProperty::F64(self.cursor.read_f64::<LittleEndian>()?),
      b'S' | b'R' => {
        let len = self.cursor.read_u32::<LittleEndian>()? as u64;
        let data = self.read_bytes(len)?;
        if type_code == b'S' {
          HalaFbxProperty::String(String::from_utf8_lossy(&data).to_string())
        } else {
          HalaFbxProperty::Raw(data)
        }
      },
      b'b' => HalaFbxProperty::BoolArray(self.read_array(1)?.into_iter().map(|b| b != 0).collect()),
      b'i' => {
        let data = self.read_array(4)?;
        HalaFbxProperty::I32Array(Self::decode(&data, 4, |mut c| c.read_i32::<LittleEndian>())?)
      },
      b'l' => {
        let data = self.read_array(8)?;
        HalaFbxProperty::I64Array(Self::decode(&data, 8, |mut c| c.read_i64::<LittleEndian>())?)
      },
      b'f' => {
        let data = self.read_array(4)?;
        HalaFbxProperty::F32Array(Self::decode(&data, 4, |mut c| c.read_f32::<LittleEndian>())?)
      },
      b'd' => {
        let data = self.read_array(8)?;
        HalaFbxProperty::F64Array(Self::decode(&data, 8, |mut c| c.read_f64::<LittleEndian>())?)
      },
      _ => return Err(HalaImporterError::open(&format!("Unknown FBX property type {:?}.", type_code as char))),
    };
    Ok(property)
  }

  fn decode<T, F>(data: &[u8], size: usize, read: F) -> Result<Vec<T>, HalaImporterError>
  where
    F: Fn(&[u8]) -> std::io::Result<T>,
  {
    data.chunks_exact(size).map(|c| read(c).map_err(HalaImporterError::from)).collect()
  }

  /// Read the payload of an array property, inflating it if compressed.
  fn read_array(&mut self, element_size: u64) -> Result<Vec<u8>, HalaImporterError> {
    let array_len = self.cursor.read_u32::<LittleEndian>()? as u64;
    let encoding = self.cursor.read_u32::<LittleEndian>()?;
    let compressed_len = self.cursor.read_u32::<LittleEndian>()? as u64;
    let size = array_len * element_size;

    let data = match encoding {
      0 => self.read_bytes(size)?,
      1 => {
        let compressed = self.read_bytes(compressed_len)?;
        Self::inflate(&compressed)?
      },
      _ => return Err(HalaImporterError::open(&format!("Unknown FBX array encoding {}.", encoding))),
    };
    if data.len() as u64 != size {
      return Err(HalaImporterError::open(&format!("FBX array expected {} bytes but got {}.", size, data.len())));
    }
    Ok(data)
  }

  #[cfg(feature = "compression")]
  fn inflate(compressed: &[u8]) -> Result<Vec<u8>, HalaImporterError> {
    miniz_oxide::inflate::decompress_to_vec_zlib(compressed)
      .map_err(|err| HalaImporterError::open(&format!("FBX array decompression failed: {:?}.", err.status)))
  }

  #[cfg(not(feature = "compression"))]
  fn inflate(_compressed: &[u8]) -> Result<Vec<u8>, HalaImporterError> {
    Err(HalaImporterError::open("Compressed FBX arrays need the \"compression\" feature."))
  }
}
