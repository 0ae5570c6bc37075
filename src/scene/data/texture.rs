/// The texel filter of a sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaSamplerFilter(u8);
impl HalaSamplerFilter {
  pub const NEAREST: Self = Self(0);
  pub const LINEAR: Self = Self(1);

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// The mipmap selection of a sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaSamplerMipmap(u8);
impl HalaSamplerMipmap {
  /// Only the base level is used.
  pub const BASE: Self = Self(0);
  pub const NEAREST: Self = Self(1);
  pub const LINEAR: Self = Self(2);

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// The wrapping of texture coordinates outside of the unit range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaSamplerWrapping(u8);
impl HalaSamplerWrapping {
  pub const REPEAT: Self = Self(0);
  pub const MIRRORED_REPEAT: Self = Self(1);
  pub const CLAMP_TO_EDGE: Self = Self(2);
  pub const CLAMP_TO_BORDER: Self = Self(3);

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// A 2D texture referencing an image.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaTextureData {
  pub minification_filter: HalaSamplerFilter,
  pub magnification_filter: HalaSamplerFilter,
  pub mipmap_filter: HalaSamplerMipmap,
  pub wrapping: [HalaSamplerWrapping; 3],
  /// The image id in the importer's image id space.
  pub image: u32,
}

impl HalaTextureData {
  /// Create a texture with linear filtering and repeat wrapping.
  /// param image: The image id.
  /// return: The texture.
  pub fn new(image: u32) -> Self {
    Self {
      minification_filter: HalaSamplerFilter::LINEAR,
      magnification_filter: HalaSamplerFilter::LINEAR,
      mipmap_filter: HalaSamplerMipmap::LINEAR,
      wrapping: [HalaSamplerWrapping::REPEAT; 3],
      image,
    }
  }
}
