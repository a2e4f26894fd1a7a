// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based scene tree.
//!
//! A [`Scene`] owns every node of one floorplan in a flat vector. Parent and
//! child links are [`NodeId`] indices into that vector, so the tree has a
//! single owner and no reference cycles. The node kind is fixed when the node
//! is inserted; nothing downstream inspects names to decide what a node is.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mesh::{Bounds3, TriangleMesh};

/// Stable index of a node inside its [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a scene node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Scene root (one per project)
    Root,
    /// A storey
    Floor,
    /// A room or ground area on a storey
    Room,
    /// The wall shell of one room
    Wall,
    /// The floor surface of one room
    Surface,
    /// A placed object (furniture, door, window)
    Object,
}

/// Object class as stored in the project file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    Door,
    Window,
    /// Generic furniture (`Ns` in Planner5D files)
    Furniture,
}

impl ObjectClass {
    /// Doors and windows store their angle a quarter turn off from furniture
    #[inline]
    pub fn has_quarter_turn_offset(self) -> bool {
        matches!(self, ObjectClass::Door | ObjectClass::Window)
    }
}

/// Placement attributes of an object node, in metres and radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectPlacement {
    pub class: ObjectClass,
    /// Rotation about the vertical axis
    pub angle: f64,
    pub mirror_x: bool,
    pub mirror_y: bool,
}

impl ObjectPlacement {
    pub fn new(class: ObjectClass, angle: f64) -> Self {
        Self {
            class,
            angle,
            mirror_x: false,
            mirror_y: false,
        }
    }
}

/// One node of the scene tree
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Node name, e.g. `Object_3_s__1234` or `Wall_0`
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Meshes owned by this node, one per loaded shape
    pub meshes: Vec<TriangleMesh>,
    /// Present on [`NodeKind::Object`] nodes
    pub placement: Option<ObjectPlacement>,
}

impl SceneNode {
    /// Bounds of this node's own meshes
    pub fn mesh_bounds(&self) -> Option<Bounds3> {
        self.meshes
            .iter()
            .filter_map(TriangleMesh::bounds)
            .reduce(|mut acc, b| {
                acc.union(&b);
                acc
            })
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(TriangleMesh::triangle_count).sum()
    }
}

/// Arena owning all nodes of one scene
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Scene identifier (project name)
    pub name: String,
    nodes: Vec<SceneNode>,
}

impl Scene {
    /// Creates an empty scene with no root
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    /// Creates a scene with a root node already inserted
    pub fn with_root(name: impl Into<String>) -> Self {
        let mut scene = Self::new(name);
        scene.push(NodeKind::Root, "Project".to_string(), None, Vec::new(), None);
        scene
    }

    fn push(
        &mut self,
        kind: NodeKind,
        name: String,
        parent: Option<NodeId>,
        meshes: Vec<TriangleMesh>,
        placement: Option<ObjectPlacement>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SceneNode {
            id,
            kind,
            name,
            parent,
            children: Vec::new(),
            meshes,
            placement,
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    /// The root node, `None` for an empty scene
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.nodes.first().map(|n| n.id)
    }

    /// Inserts a child node under `parent`, which must belong to this scene
    pub fn add_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: impl Into<String>,
        meshes: Vec<TriangleMesh>,
    ) -> Result<NodeId> {
        self.get(parent).ok_or(Error::UnknownNode(parent))?;
        Ok(self.push(kind, name.into(), Some(parent), meshes, None))
    }

    /// Inserts an object node with its placement under `parent`
    pub fn add_object(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        meshes: Vec<TriangleMesh>,
        placement: ObjectPlacement,
    ) -> Result<NodeId> {
        self.get(parent).ok_or(Error::UnknownNode(parent))?;
        Ok(self.push(NodeKind::Object, name.into(), Some(parent), meshes, Some(placement)))
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index())
    }

    /// All nodes in insertion (pre-order for loader-built scenes) order
    #[inline]
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first walk of the subtree rooted at `id` (including `id`)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.node(current).children.iter().rev().copied());
        }
        out
    }

    /// Bounds of every mesh in the subtree rooted at `id`
    pub fn subtree_bounds(&self, id: NodeId) -> Option<Bounds3> {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.node(n).mesh_bounds())
            .reduce(|mut acc, b| {
                acc.union(&b);
                acc
            })
    }

    /// Centroid of the subtree's bounding box
    pub fn centroid(&self, id: NodeId) -> Option<nalgebra::Point3<f64>> {
        self.subtree_bounds(id).map(|b| b.centroid())
    }

    /// Indented tree dump used for trace logging
    pub fn outline(&self) -> String {
        let Some(root) = self.root() else {
            return String::new();
        };
        let mut out = String::new();
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.node(id);
            out.push_str(&format!(
                "{:indent$}{} {:?} triangles={}\n",
                "",
                node.name,
                node.kind,
                node.triangle_count(),
                indent = depth * 2
            ));
            for child in node.children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }
}
