use std::collections::VecDeque;

use glam::{
  Mat4,
  Quat,
  Vec3,
};

use crate::config::HalaGeometryTransformHandling;

/// A decomposed local transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalaTrs {
  pub translation: Vec3,
  pub rotation: Quat,
  pub scaling: Vec3,
}

impl Default for HalaTrs {
  fn default() -> Self {
    Self::IDENTITY
  }
}

impl HalaTrs {
  pub const IDENTITY: Self = Self {
    translation: Vec3::ZERO,
    rotation: Quat::IDENTITY,
    scaling: Vec3::ONE,
  };

  pub fn is_identity(&self) -> bool {
    self.translation == Vec3::ZERO && self.rotation == Quat::IDENTITY && self.scaling == Vec3::ONE
  }

  pub fn to_mat4(&self) -> Mat4 {
    Mat4::from_scale_rotation_translation(self.scaling, self.rotation, self.translation)
  }
}

/// An element attached to a source node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalaAttachment {
  Mesh { mesh: u32, skinned: bool },
  Light(u32),
  Camera(u32),
  Skin(u32),
}

/// The read-only view of a source node forest the flattener works on.
/// Node 0 is the implicit root of the forest.
pub trait HalaNodeSource {
  fn node_count(&self) -> u32;
  fn node_parent(&self, node: u32) -> Option<u32>;
  /// The geometry transform of the node, None if it is identity.
  fn node_geometry_transform(&self, node: u32) -> Option<HalaTrs>;
  /// The attachments of the node in declaration order.
  fn node_attachments(&self, node: u32) -> Vec<HalaAttachment>;
  /// The number of nodes referencing the mesh.
  fn mesh_instance_count(&self, mesh: u32) -> u32;
}

/// The objects the attachments of source nodes are bound to.
pub trait HalaInstanceTargets {
  /// The source nodes whose attachments are bound, in binding order.
  fn bound_nodes(&self) -> Vec<u32>;
  /// Resolve the object an attachment of a node is bound to.
  fn target_of(&self, node: u32, attachment: &HalaAttachment) -> Option<u32>;
}

/// What a flattened object was made from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalaObjectOrigin {
  Node(u32),
  /// A synthetic object carrying the geometry transform of the node.
  GeometryHelper(u32),
}

/// The dense object id space of a flattened source forest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaObjectTable {
  offset: u32,
  node_count: u32,
  helpers: Vec<u32>,
  helper_of_node: Vec<Option<u32>>,
  baked_nodes: Vec<bool>,
  parents: Vec<Option<u32>>,
}

/// The implementation of the object table.
impl HalaObjectTable {
  /// Flatten the node forest.
  /// param source: The node forest.
  /// param preserve_root: Keep the implicit root as object 0.
  /// param handling: How geometry transforms are handled.
  /// return: The object table.
  pub fn build<S: HalaNodeSource + ?Sized>(
    source: &S,
    preserve_root: bool,
    handling: HalaGeometryTransformHandling,
  ) -> Self {
    let node_count = source.node_count();
    let offset = if preserve_root || node_count == 0 { 0 } else { 1 };
    let mut table = Self {
      offset,
      node_count,
      helpers: Vec::new(),
      helper_of_node: vec![None; node_count as usize],
      baked_nodes: vec![false; node_count as usize],
      parents: Vec::with_capacity((node_count - offset) as usize),
    };

    for node in offset..node_count {
      let parent = source.node_parent(node).and_then(|p| table.object_of_node(p));
      table.parents.push(parent);
    }

    // Helpers go after all node objects.
    let node_objects = node_count - offset;
    for node in offset..node_count {
      if source.node_geometry_transform(node).is_none() {
        continue;
      }
      if Self::needs_helper(source, node, handling) {
        let helper = node_objects + table.helpers.len() as u32;
        table.helpers.push(node);
        table.helper_of_node[node as usize] = Some(helper);
        table.parents.push(Some(node - offset));
      } else if handling == HalaGeometryTransformHandling::MODIFY_GEOMETRY {
        table.baked_nodes[node as usize] = true;
      }
    }

    table
  }

  /// Decide whether a node with a geometry transform gets a helper object.
  fn needs_helper<S: HalaNodeSource + ?Sized>(source: &S, node: u32, handling: HalaGeometryTransformHandling) -> bool {
    match handling {
      HalaGeometryTransformHandling::HELPER_NODES => true,
      // Shared geometry and non-geometry attachments can not be baked.
      HalaGeometryTransformHandling::MODIFY_GEOMETRY => source.node_attachments(node).iter().any(|attachment| match attachment {
        HalaAttachment::Mesh { mesh, skinned } => !skinned && source.mesh_instance_count(*mesh) > 1,
        HalaAttachment::Light(_) | HalaAttachment::Camera(_) => true,
        HalaAttachment::Skin(_) => false,
      }),
      _ => false,
    }
  }

  pub fn object_count(&self) -> u32 {
    self.parents.len() as u32
  }

  /// Get the count of objects made from source nodes, helpers excluded.
  pub fn node_object_count(&self) -> u32 {
    self.node_count - self.offset
  }

  pub fn helper_count(&self) -> u32 {
    self.helpers.len() as u32
  }

  pub fn root_retained(&self) -> bool {
    self.offset == 0
  }

  /// Get the object id of a source node.
  /// param node: The source node id.
  /// return: The object id, None for the elided root.
  pub fn object_of_node(&self, node: u32) -> Option<u32> {
    if node < self.offset || node >= self.node_count {
      None
    } else {
      Some(node - self.offset)
    }
  }

  pub fn helper_of_node(&self, node: u32) -> Option<u32> {
    self.helper_of_node.get(node as usize).copied().flatten()
  }

  /// Check if the geometry transform of the node is baked into its mesh.
  pub fn is_baked(&self, node: u32) -> bool {
    self.baked_nodes.get(node as usize).copied().unwrap_or(false)
  }

  /// Get what the object was made from.
  /// param object: The object id.
  /// return: The origin.
  pub fn origin(&self, object: u32) -> Option<HalaObjectOrigin> {
    let node_objects = self.node_object_count();
    if object < node_objects {
      Some(HalaObjectOrigin::Node(object + self.offset))
    } else {
      self.helpers.get((object - node_objects) as usize).map(|&node| HalaObjectOrigin::GeometryHelper(node))
    }
  }

  pub fn parent(&self, object: u32) -> Option<u32> {
    self.parents.get(object as usize).copied().flatten()
  }

  /// Resolve the object an attachment of a source node is bound to.
  /// Skinned meshes and skins stay on the node since the skin already contains the geometry transform.
  /// param node: The source node id.
  /// param attachment: The attachment.
  /// return: The object id, None if the node is not in the object space.
  pub fn target_object(&self, node: u32, attachment: &HalaAttachment) -> Option<u32> {
    match (self.helper_of_node(node), attachment) {
      (_, HalaAttachment::Mesh { skinned: true, .. }) | (_, HalaAttachment::Skin(_)) => self.object_of_node(node),
      (Some(helper), _) => Some(helper),
      (None, _) => self.object_of_node(node),
    }
  }
}

impl HalaInstanceTargets for HalaObjectTable {
  fn bound_nodes(&self) -> Vec<u32> {
    (self.offset..self.node_count).collect()
  }

  fn target_of(&self, node: u32, attachment: &HalaAttachment) -> Option<u32> {
    self.target_object(node, attachment)
  }
}

/// A scene visited from its root list, every node is the object of the same id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaVisitedScene {
  /// The visited nodes with their parents in visitation order.
  pub visited: Vec<(u32, Option<u32>)>,
}

/// The implementation of the visited scene.
impl HalaVisitedScene {
  /// Visit a scene breadth first.
  /// param roots: The root nodes.
  /// param node_count: The count of all nodes.
  /// param children: The children of a node.
  /// return: The visited scene.
  pub fn visit<F>(roots: &[u32], node_count: u32, children: F) -> Self
  where
    F: Fn(u32) -> Vec<u32>,
  {
    Self {
      visited: flatten_scene_roots(roots, node_count, children),
    }
  }

  /// Get one past the largest visited object id.
  pub fn mapping_bound(&self) -> u64 {
    self.visited.iter().map(|&(node, _)| node as u64 + 1).max().unwrap_or(0)
  }
}

impl HalaInstanceTargets for HalaVisitedScene {
  fn bound_nodes(&self) -> Vec<u32> {
    self.visited.iter().map(|&(node, _)| node).collect()
  }

  fn target_of(&self, node: u32, _attachment: &HalaAttachment) -> Option<u32> {
    Some(node)
  }
}

/// Visit a scene breadth first from its root list.
/// Nodes reachable twice are only visited the first time.
/// param roots: The root nodes.
/// param node_count: The count of all nodes.
/// param children: The children of a node.
/// return: The visited nodes with their parents in visitation order.
pub fn flatten_scene_roots<F>(roots: &[u32], node_count: u32, children: F) -> Vec<(u32, Option<u32>)>
where
  F: Fn(u32) -> Vec<u32>,
{
  let mut visited = vec![false; node_count as usize];
  let mut result = Vec::new();
  let mut queue = VecDeque::new();
  queue.extend(roots.iter().map(|&root| (root, None)));
  while let Some((node, parent)) = queue.pop_front() {
    match visited.get_mut(node as usize) {
      Some(seen) if !*seen => *seen = true,
      _ => continue,
    }
    result.push((node, parent));
    queue.extend(children(node).into_iter().map(|child| (child, Some(node))));
  }
  result
}

/// Find a cycle in the parent links.
/// Every node is walked at most once.
/// param parents: The parent of each node.
/// return: The first node whose parent chain loops, None if the graph is a forest.
pub fn find_parent_cycle(parents: &[Option<u32>]) -> Option<u32> {
  const UNVISITED: u8 = 0;
  const ON_PATH: u8 = 1;
  const DONE: u8 = 2;
  let mut states = vec![UNVISITED; parents.len()];
  let mut path = Vec::new();
  for start in 0..parents.len() as u32 {
    let mut current = Some(start);
    while let Some(node) = current {
      match states.get(node as usize) {
        Some(&UNVISITED) => {
          states[node as usize] = ON_PATH;
          path.push(node);
          current = parents[node as usize];
        },
        Some(&ON_PATH) => return Some(start),
        _ => break,
      }
    }
    for node in path.drain(..) {
      states[node as usize] = DONE;
    }
  }
  None
}
