use glam::Mat4;

/// A skin, the joints are object ids.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaSkinData {
  pub joints: Vec<u32>,
  pub inverse_bind_matrices: Vec<Mat4>,
}
