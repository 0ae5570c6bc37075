use glam::{
  Quat,
  Vec3,
};

/// The interpolation between the keyframes of a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaAnimationInterpolation(u8);
impl HalaAnimationInterpolation {
  pub const CONSTANT: Self = Self(0);
  pub const LINEAR: Self = Self(1);
  pub const SPLINE: Self = Self(2);

  pub fn from_u8(value: u8) -> Option<Self> {
    match value {
      0 => Some(Self::CONSTANT),
      1 => Some(Self::LINEAR),
      2 => Some(Self::SPLINE),
      _ => None,
    }
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// The object property a track drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaAnimationTarget(u8);
impl HalaAnimationTarget {
  pub const TRANSLATION: Self = Self(0);
  pub const ROTATION: Self = Self(1);
  pub const SCALING: Self = Self(2);

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// A keyframe of a cubic Hermite spline.
/// The tangents are already scaled by the duration of their adjacent key interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalaCubicHermite<T> {
  pub in_tangent: T,
  pub point: T,
  pub out_tangent: T,
}

/// The keyframe values of a track, one per key.
#[derive(Clone, Debug, PartialEq)]
pub enum HalaAnimationValues {
  Vec3(Vec<Vec3>),
  Quat(Vec<Quat>),
  CubicHermiteVec3(Vec<HalaCubicHermite<Vec3>>),
  CubicHermiteQuat(Vec<HalaCubicHermite<Quat>>),
}

impl HalaAnimationValues {
  pub fn len(&self) -> usize {
    match self {
      Self::Vec3(values) => values.len(),
      Self::Quat(values) => values.len(),
      Self::CubicHermiteVec3(values) => values.len(),
      Self::CubicHermiteQuat(values) => values.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// The keyframes of one property of one object.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaAnimationTrack {
  pub object: u32,
  pub target: HalaAnimationTarget,
  pub interpolation: HalaAnimationInterpolation,
  /// The key times in seconds.
  pub keys: Vec<f32>,
  pub values: HalaAnimationValues,
}

/// An animation clip, the keyframes are kept as authored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaAnimationData {
  pub tracks: Vec<HalaAnimationTrack>,
}

/// The implementation of the animation data.
impl HalaAnimationData {
  /// Get the time span covered by the keys of all tracks.
  /// return: The first and last key time, None if there are no keys.
  pub fn duration(&self) -> Option<(f32, f32)> {
    self.tracks.iter()
      .filter_map(|track| Some((*track.keys.first()?, *track.keys.last()?)))
      .reduce(|(begin, end), (b, e)| (begin.min(b), end.max(e)))
  }
}
