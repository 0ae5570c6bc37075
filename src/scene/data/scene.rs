use glam::{
  Mat4,
  Quat,
  Vec3,
};

/// How the object column of a scene field relates to the object id space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HalaSceneMapping {
  /// The object column is exactly 0..mapping_bound.
  #[default]
  Implicit,
  /// The object column follows the visitation order and may repeat.
  Ordered,
  /// No ordering guarantee.
  Unordered,
}

/// A fixed-capacity column pair of object ids and values.
/// The capacity is set in a counting pass and every push is bounds-checked,
/// `finish` checks that the filling pass wrote exactly the counted amount.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaSceneField<T> {
  pub mapping: HalaSceneMapping,
  objects: Vec<u32>,
  values: Vec<T>,
  capacity: usize,
}

impl<T> Default for HalaSceneField<T> {
  fn default() -> Self {
    Self::with_capacity(HalaSceneMapping::Implicit, 0)
  }
}

impl<T> HalaSceneField<T> {
  /// Create an empty field with a fixed capacity.
  /// param mapping: The mapping kind.
  /// param capacity: The exact number of entries the field will hold.
  /// return: The field.
  pub fn with_capacity(mapping: HalaSceneMapping, capacity: usize) -> Self {
    Self {
      mapping,
      objects: Vec::with_capacity(capacity),
      values: Vec::with_capacity(capacity),
      capacity,
    }
  }

  /// Append an entry.
  /// param object: The object id.
  /// param value: The value.
  pub fn push(&mut self, object: u32, value: T) {
    assert!(
      self.objects.len() < self.capacity,
      "scene field overflow: capacity {} exceeded",
      self.capacity,
    );
    if self.mapping == HalaSceneMapping::Implicit {
      assert_eq!(self.objects.len(), object as usize, "implicit scene field filled out of order");
    }
    self.objects.push(object);
    self.values.push(value);
  }

  /// Close the filling pass.
  /// return: The field.
  pub fn finish(self) -> Self {
    assert_eq!(
      self.objects.len(),
      self.capacity,
      "scene field filled with {} entries, {} counted",
      self.objects.len(),
      self.capacity,
    );
    self
  }

  pub fn len(&self) -> usize {
    self.objects.len()
  }

  pub fn is_empty(&self) -> bool {
    self.objects.is_empty()
  }

  pub fn objects(&self) -> &[u32] {
    &self.objects
  }

  pub fn values(&self) -> &[T] {
    &self.values
  }

  /// Get the first value mapped to the object.
  /// param object: The object id.
  /// return: The value.
  pub fn get(&self, object: u32) -> Option<&T> {
    if self.mapping == HalaSceneMapping::Implicit {
      return self.values.get(object as usize);
    }
    self.objects.iter().position(|&o| o == object).map(|i| &self.values[i])
  }

  /// Get all values mapped to the object, in field order.
  /// param object: The object id.
  /// return: The values.
  pub fn get_all(&self, object: u32) -> Vec<&T> {
    self.iter().filter(|(o, _)| *o == object).map(|(_, v)| v).collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
    self.objects.iter().copied().zip(self.values.iter())
  }
}

/// A mesh attached to an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaMeshInstance {
  pub mesh: u32,
  pub material: Option<u32>,
}

/// The flattened scene graph of one scene.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaSceneData {
  pub mapping_bound: u64,
  pub parents: HalaSceneField<Option<u32>>,
  pub transformations: HalaSceneField<Mat4>,
  pub translations: HalaSceneField<Vec3>,
  pub rotations: HalaSceneField<Quat>,
  pub scalings: HalaSceneField<Vec3>,
  pub visibilities: HalaSceneField<bool>,
  pub geometry_transform_helpers: HalaSceneField<bool>,
  pub geometry_translations: HalaSceneField<Vec3>,
  pub geometry_rotations: HalaSceneField<Quat>,
  pub geometry_scalings: HalaSceneField<Vec3>,
  pub meshes: HalaSceneField<HalaMeshInstance>,
  pub lights: HalaSceneField<u32>,
  pub cameras: HalaSceneField<u32>,
  pub skins: HalaSceneField<u32>,
}

/// The implementation of the scene data.
impl HalaSceneData {
  /// Get the parent of the object.
  /// param object: The object id.
  /// return: The parent, None for roots and objects not in the scene.
  pub fn parent_of(&self, object: u32) -> Option<u32> {
    self.parents.get(object).copied().flatten()
  }

  /// Get the children of the object in parent field order.
  /// param object: The object id, None for the roots.
  /// return: The children.
  pub fn children_of(&self, object: Option<u32>) -> Vec<u32> {
    self.parents.iter().filter(|(_, p)| **p == object).map(|(o, _)| o).collect()
  }

  /// Get the local transform of the object.
  /// The matrix field wins over the TRS fields.
  /// param object: The object id.
  /// return: The transform.
  pub fn local_transform(&self, object: u32) -> Mat4 {
    if let Some(matrix) = self.transformations.get(object) {
      return *matrix;
    }
    let translation = self.translations.get(object).copied().unwrap_or(Vec3::ZERO);
    let rotation = self.rotations.get(object).copied().unwrap_or(Quat::IDENTITY);
    let scaling = self.scalings.get(object).copied().unwrap_or(Vec3::ONE);
    Mat4::from_scale_rotation_translation(scaling, rotation, translation)
  }

  /// Compute the world transforms of all objects in the parent field.
  /// Parents may appear after their children in the field.
  /// return: The world transform of every object id below the mapping bound.
  pub fn world_transforms(&self) -> Vec<Mat4> {
    let count = self.mapping_bound as usize;
    let mut world_transforms = vec![Mat4::IDENTITY; count];
    let mut resolved = vec![false; count];
    for &object in self.parents.objects() {
      let mut chain = Vec::new();
      let mut current = Some(object);
      while let Some(id) = current {
        if (id as usize) >= count || resolved[id as usize] || chain.contains(&id) {
          break;
        }
        chain.push(id);
        current = self.parent_of(id);
      }
      for &id in chain.iter().rev() {
        let local = self.local_transform(id);
        world_transforms[id as usize] = match self.parent_of(id) {
          Some(parent) if (parent as usize) < count => world_transforms[parent as usize] * local,
          _ => local,
        };
        resolved[id as usize] = true;
      }
    }
    world_transforms
  }
}
