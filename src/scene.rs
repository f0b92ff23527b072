//! Scene sink
//!
//! The animation core never renders. It writes local transforms and
//! visibility to nodes through [`Scene`], which a 3D engine implements.
//! [`SceneGraph`] is an in-memory implementation for headless runs.

/// A 3-component vector, used for translation, euler rotation and scale
pub type Vec3 = [f32; 3];

/// Handle to a node created by a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Vector with `value` on this axis and zero elsewhere
    pub fn vec(self, value: f32) -> Vec3 {
        let mut v = [0.0; 3];
        v[self as usize] = value;
        v
    }
}

/// Local transform of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in radians
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

/// Per-node output operations
pub trait SceneNode {
    fn set_translation(&mut self, node: NodeId, translation: Vec3);
    fn set_rotation(&mut self, node: NodeId, rotation: Vec3);
    fn set_scale(&mut self, node: NodeId, scale: Vec3);
    fn set_visible(&mut self, node: NodeId, visible: bool);
}

/// Creates nodes attached to a parent
pub trait NodeFactory {
    /// Create a child of `parent`, or a root node when `parent` is `None`
    fn create_node(&mut self, parent: Option<NodeId>, name: &str) -> NodeId;
}

/// Everything instruments need from the renderer
pub trait Scene: SceneNode + NodeFactory {}

impl<S: SceneNode + NodeFactory> Scene for S {}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    transform: Transform,
    visible: bool,
}

/// Arena of nodes kept in memory
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn transform(&self, node: NodeId) -> Transform {
        self.nodes
            .get(node.0)
            .map(|n| n.transform)
            .unwrap_or_default()
    }

    /// The node's own visibility flag
    pub fn is_visible(&self, node: NodeId) -> bool {
        self.nodes.get(node.0).is_some_and(|n| n.visible)
    }

    /// True when the node and every ancestor are visible
    pub fn is_shown(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            match self.nodes.get(id.0) {
                Some(n) if n.visible => current = n.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|n| n.name.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(node))
            .map(|(i, _)| NodeId(i))
    }

    /// First direct child of `node` with the given name
    pub fn child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.children(node)
            .find(|&id| self.name(id) == Some(name))
    }

    /// Follow a `/`-separated path of child names from `node`
    pub fn find_path(&self, node: NodeId, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(node, |current, name| self.child(current, name))
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node.0)
    }
}

impl NodeFactory for SceneGraph {
    fn create_node(&mut self, parent: Option<NodeId>, name: &str) -> NodeId {
        self.nodes.push(Node {
            name: name.to_string(),
            parent,
            transform: Transform::default(),
            visible: true,
        });
        NodeId(self.nodes.len() - 1)
    }
}

impl SceneNode for SceneGraph {
    fn set_translation(&mut self, node: NodeId, translation: Vec3) {
        if let Some(n) = self.node_mut(node) {
            n.transform.translation = translation;
        }
    }

    fn set_rotation(&mut self, node: NodeId, rotation: Vec3) {
        if let Some(n) = self.node_mut(node) {
            n.transform.rotation = rotation;
        }
    }

    fn set_scale(&mut self, node: NodeId, scale: Vec3) {
        if let Some(n) = self.node_mut(node) {
            n.transform.scale = scale;
        }
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(n) = self.node_mut(node) {
            n.visible = visible;
        }
    }
}
