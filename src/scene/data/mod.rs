pub mod scene;
pub mod mesh;
pub mod material;
pub mod light;
pub mod camera;
pub mod texture;
pub mod image_data;
pub mod skin;
pub mod animation;

pub use scene::{
  HalaSceneData,
  HalaSceneField,
  HalaSceneMapping,
  HalaMeshInstance,
};
pub use mesh::{
  HalaMeshAttribute,
  HalaMeshAttributeData,
  HalaMeshData,
  HalaMeshPrimitive,
  HalaVertexData,
};
pub use material::{
  HalaMaterialData,
  HalaMaterialTypes,
  HalaMaterialValue,
};
pub use light::{
  HalaLightData,
  HalaLightType,
};
pub use camera::{
  HalaCameraData,
  HalaOrthographicCameraData,
  HalaPerspectiveCameraData,
};
pub use texture::{
  HalaSamplerFilter,
  HalaSamplerMipmap,
  HalaSamplerWrapping,
  HalaTextureData,
};
pub use image_data::{
  HalaImageData,
  HalaImageDataType,
  HalaPixelFormat,
};
pub use skin::HalaSkinData;
pub use animation::{
  HalaAnimationData,
  HalaAnimationInterpolation,
  HalaAnimationTarget,
  HalaAnimationTrack,
  HalaAnimationValues,
  HalaCubicHermite,
};
