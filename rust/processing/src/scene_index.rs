// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Partition of a scene's nodes by kind.

use scene_heatmap_core::{NodeId, NodeKind, Scene};

use crate::error::{Error, Result};

/// Objects, walls, rooms and floors of one scene, in tree order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneIndex {
    pub objects: Vec<NodeId>,
    pub walls: Vec<NodeId>,
    pub rooms: Vec<NodeId>,
    pub floors: Vec<NodeId>,
}

impl SceneIndex {
    /// Walk the tree from the root; root and surface nodes are not listed
    pub fn build(scene: &Scene) -> Result<Self> {
        let root = scene
            .root()
            .ok_or_else(|| Error::EmptyScene(scene.name.clone()))?;

        let mut index = SceneIndex::default();
        for id in scene.descendants(root) {
            match scene.node(id).kind {
                NodeKind::Object => index.objects.push(id),
                NodeKind::Wall => index.walls.push(id),
                NodeKind::Room => index.rooms.push(id),
                NodeKind::Floor => index.floors.push(id),
                NodeKind::Root | NodeKind::Surface => {}
            }
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_heatmap_core::{ObjectClass, ObjectPlacement};

    #[test]
    fn test_partition() {
        let mut scene = Scene::with_root("p");
        let root = scene.root().unwrap();
        let floor = scene.add_child(root, NodeKind::Floor, "Floor_0", Vec::new()).unwrap();
        let room = scene.add_child(floor, NodeKind::Room, "Room_0", Vec::new()).unwrap();
        let wall = scene.add_child(room, NodeKind::Wall, "Wall_0", Vec::new()).unwrap();
        scene.add_child(room, NodeKind::Surface, "Floor_0", Vec::new()).unwrap();
        let chair = scene.add_object(
            floor,
            "Object_0_s__1",
            Vec::new(),
            ObjectPlacement::new(ObjectClass::Furniture, 0.0),
        ).unwrap();

        let index = SceneIndex::build(&scene).unwrap();
        assert_eq!(index.floors, vec![floor]);
        assert_eq!(index.rooms, vec![room]);
        assert_eq!(index.walls, vec![wall]);
        assert_eq!(index.objects, vec![chair]);
    }

    #[test]
    fn test_empty_scene_fails() {
        assert!(matches!(
            SceneIndex::build(&Scene::new("void")),
            Err(Error::EmptyScene(name)) if name == "void"
        ));
    }
}
