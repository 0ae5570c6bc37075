use image::GenericImageView;

use crate::error::HalaImporterError;

/// The pixel format of the decoded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaPixelFormat(u8);
impl HalaPixelFormat {
  pub const R8_UNORM: Self = Self(0);
  pub const RG8_UNORM: Self = Self(1);
  pub const RGB8_UNORM: Self = Self(2);
  pub const RGBA8_UNORM: Self = Self(3);
  pub const R16_UNORM: Self = Self(4);
  pub const RG16_UNORM: Self = Self(5);
  pub const RGB16_UNORM: Self = Self(6);
  pub const RGBA16_UNORM: Self = Self(7);
  pub const RGB32_FLOAT: Self = Self(8);
  pub const RGBA32_FLOAT: Self = Self(9);

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HalaImageDataType {
  ByteData(Vec<u8>),
  FloatData(Vec<f32>),
}

/// A decoded 2D image.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaImageData {
  pub format: HalaPixelFormat,
  pub width: u32,
  pub height: u32,
  pub data_type: HalaImageDataType,
  pub num_of_bytes: usize,
}

impl HalaImageData {
  /// Decode an image from the encoded file data.
  /// param data: The file data.
  /// return: The result.
  pub fn new_with_bytes(data: &[u8]) -> Result<Self, HalaImporterError> {
    let img = image::load_from_memory(data)
      .map_err(|e| HalaImporterError::new(crate::error::HalaImporterErrorKind::Query, "Failed to decode image.", Some(Box::new(e))))?;
    let (width, height) = img.dimensions();

    let (format, data, num_of_bytes) = match img.color() {
      image::ColorType::L8 => {
        let data = img.into_bytes();
        let num_of_bytes = data.len();
        (HalaPixelFormat::R8_UNORM, HalaImageDataType::ByteData(data), num_of_bytes)
      },
      image::ColorType::La8 => {
        let data = img.into_bytes();
        let num_of_bytes = data.len();
        (HalaPixelFormat::RG8_UNORM, HalaImageDataType::ByteData(data), num_of_bytes)
      },
      image::ColorType::Rgb8 => {
        let data = img.into_bytes();
        let num_of_bytes = data.len();
        (HalaPixelFormat::RGB8_UNORM, HalaImageDataType::ByteData(data), num_of_bytes)
      },
      image::ColorType::Rgba8 => {
        let data = img.into_bytes();
        let num_of_bytes = data.len();
        (HalaPixelFormat::RGBA8_UNORM, HalaImageDataType::ByteData(data), num_of_bytes)
      },
      image::ColorType::L16 => {
        let data = img.into_bytes();
        let num_of_bytes = data.len();
        (HalaPixelFormat::R16_UNORM, HalaImageDataType::ByteData(data), num_of_bytes)
      },
      image::ColorType::La16 => {
        let data = img.into_bytes();
        let num_of_bytes = data.len();
        (HalaPixelFormat::RG16_UNORM, HalaImageDataType::ByteData(data), num_of_bytes)
      },
      image::ColorType::Rgb16 => {
        let data = img.into_bytes();
        let num_of_bytes = data.len();
        (HalaPixelFormat::RGB16_UNORM, HalaImageDataType::ByteData(data), num_of_bytes)
      },
      image::ColorType::Rgba16 => {
        let data = img.into_bytes();
        let num_of_bytes = data.len();
        (HalaPixelFormat::RGBA16_UNORM, HalaImageDataType::ByteData(data), num_of_bytes)
      },
      image::ColorType::Rgb32F => {
        let data = img.into_rgb32f().into_vec();
        let num_of_bytes = data.len() * std::mem::size_of::<f32>();
        (HalaPixelFormat::RGB32_FLOAT, HalaImageDataType::FloatData(data), num_of_bytes)
      },
      image::ColorType::Rgba32F => {
        let data = img.into_rgba32f().into_vec();
        let num_of_bytes = data.len() * std::mem::size_of::<f32>();
        (HalaPixelFormat::RGBA32_FLOAT, HalaImageDataType::FloatData(data), num_of_bytes)
      },
      color_type => return Err(HalaImporterError::query(&format!("Unsupported color type: {:?}", color_type))),
    };

    Ok(Self {
      format,
      width,
      height,
      data_type: data,
      num_of_bytes,
    })
  }
}
