use std::cell::OnceCell;
use std::collections::HashMap;

/// A name to id lookup built on first use.
/// When several entities share a name the first one wins, empty names are never mapped.
#[derive(Debug, Default)]
pub struct HalaNameMap {
  map: OnceCell<HashMap<String, u32>>,
}

impl HalaNameMap {
  pub fn new() -> Self {
    Self::default()
  }

  /// Look up a name, building the map from the names in id order on first use.
  /// param name: The name.
  /// param names: Produce the names of all entities in id order.
  /// return: The id.
  pub fn find<I, F>(&self, name: &str, names: F) -> Option<u32>
  where
    I: IntoIterator<Item = String>,
    F: FnOnce() -> I,
  {
    let map = self.map.get_or_init(|| {
      let mut map = HashMap::new();
      for (id, name) in names().into_iter().enumerate() {
        if !name.is_empty() {
          map.entry(name).or_insert(id as u32);
        }
      }
      log::debug!("Name map with {} entries built.", map.len());
      map
    });
    map.get(name).copied()
  }

  pub fn is_built(&self) -> bool {
    self.map.get().is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_occurrence_wins_and_map_is_built_once() {
    let names = HalaNameMap::new();
    assert!(!names.is_built());
    let source = || vec!["a".to_string(), "b".to_string(), "a".to_string(), String::new()];
    assert_eq!(names.find("a", source), Some(0));
    assert!(names.is_built());
    assert_eq!(names.find("b", || -> Vec<String> { panic!("rebuilt") }), Some(1));
    assert_eq!(names.find("", || -> Vec<String> { panic!("rebuilt") }), None);
    assert_eq!(names.find("c", || -> Vec<String> { panic!("rebuilt") }), None);
  }
}
