use glam::{
  Mat4,
  Vec2,
};

/// A perspective camera.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaPerspectiveCameraData {
  /// The size of the near plane.
  pub size: Vec2,
  pub aspect: f32,
  pub znear: f32,
  /// Infinite if the camera has no far plane.
  pub zfar: f32,
}

/// A orthographic camera.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaOrthographicCameraData {
  /// The full extent of the view volume.
  pub size: Vec2,
  pub znear: f32,
  pub zfar: f32,
}

/// A camera.
#[derive(Clone, Debug, PartialEq)]
pub enum HalaCameraData {
  Perspective(HalaPerspectiveCameraData),
  Orthographic(HalaOrthographicCameraData),
}

impl HalaCameraData {

  /// Create a perspective camera from a field of view.
  /// param fov: The field of view in radians.
  /// param horizontal: True if the field of view is horizontal.
  /// param aspect: The aspect ratio.
  /// param znear: The near plane.
  /// param zfar: The far plane.
  /// return: The camera.
  pub fn with_fov(fov: f32, horizontal: bool, aspect: f32, znear: f32, zfar: f32) -> Self {
    let extent = 2.0 * znear * (fov * 0.5).tan();
    let size = if horizontal {
      Vec2::new(extent, extent / aspect)
    } else {
      Vec2::new(extent * aspect, extent)
    };
    HalaCameraData::Perspective(HalaPerspectiveCameraData {
      size,
      aspect,
      znear,
      zfar,
    })
  }

  pub fn get_proj_matrix(&self) -> Mat4 {
    match self {
      HalaCameraData::Perspective(camera) => {
        let yfov = 2.0 * (camera.size.y * 0.5 / camera.znear).atan();
        if camera.zfar.is_finite() {
          Mat4::perspective_rh(yfov, camera.aspect, camera.znear, camera.zfar)
        } else {
          Mat4::perspective_infinite_rh(yfov, camera.aspect, camera.znear)
        }
      },
      HalaCameraData::Orthographic(camera) => {
        let half = camera.size * 0.5;
        Mat4::orthographic_rh(-half.x, half.x, -half.y, half.y, camera.znear, camera.zfar)
      },
    }
  }

}

#[cfg(test)]
mod tests {
  use glam::Vec4;

  use super::*;

  #[test]
  fn vertical_fov_keeps_the_height() {
    let camera = HalaCameraData::with_fov(std::f32::consts::FRAC_PI_2, false, 2.0, 1.0, 100.0);
    match &camera {
      HalaCameraData::Perspective(perspective) => {
        assert!((perspective.size.y - 2.0).abs() < 1e-6);
        assert!((perspective.size.x - 4.0).abs() < 1e-6);
      },
      _ => panic!("expected a perspective camera"),
    }
    let expected = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 2.0, 1.0, 100.0);
    assert!(camera.get_proj_matrix().abs_diff_eq(expected, 1e-5));
  }

  #[test]
  fn orthographic_projection_spans_the_size() {
    let camera = HalaCameraData::Orthographic(HalaOrthographicCameraData {
      size: Vec2::new(4.0, 2.0),
      znear: 0.0,
      zfar: 10.0,
    });
    let corner = camera.get_proj_matrix() * Vec4::new(2.0, 1.0, -10.0, 1.0);
    assert!(corner.abs_diff_eq(Vec4::new(1.0, 1.0, 1.0, 1.0), 1e-6));
  }
}
