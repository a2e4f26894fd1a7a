// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene assembly from a Planner5D data root
//!
//! The data root is laid out as:
//!
//! ```text
//! <root>/projects_clean/<project>/project.json
//! <root>/roomfiles/<project>/fr_<floor+1>rm_<room+1>.obj    room walls
//! <root>/roomfiles/<project>/fr_<floor+1>rm_<room+1>f.obj   room floor
//! <root>/objects/<id>/<id>.obj                              object model
//! ```
//!
//! Object meshes are placed in world space while loading, so every mesh in an
//! assembled [`Scene`] is already in world coordinates.

use std::f64::consts::FRAC_PI_2;
use std::path::{Path, PathBuf};

use nalgebra::{Matrix4, Vector3};

use crate::error::{Error, Result};
use crate::obj::read_obj;
use crate::project::{read_project, Object, Project};
use crate::scene::{NodeKind, ObjectPlacement, Scene};

/// Builds scenes from project files and model meshes below a data root
#[derive(Debug, Clone)]
pub struct SceneAssembler {
    data_root: PathBuf,
}

impl SceneAssembler {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn project_path(&self, project: &str) -> PathBuf {
        self.data_root
            .join("projects_clean")
            .join(project)
            .join("project.json")
    }

    pub fn room_wall_path(&self, project: &str, floor: usize, room: usize) -> PathBuf {
        self.data_root
            .join("roomfiles")
            .join(project)
            .join(format!("fr_{}rm_{}.obj", floor + 1, room + 1))
    }

    pub fn room_floor_path(&self, project: &str, floor: usize, room: usize) -> PathBuf {
        self.data_root
            .join("roomfiles")
            .join(project)
            .join(format!("fr_{}rm_{}f.obj", floor + 1, room + 1))
    }

    pub fn object_path(&self, id: &str) -> PathBuf {
        self.data_root.join("objects").join(id).join(format!("{id}.obj"))
    }

    /// Read a project file and assemble its scene
    pub fn load_scene(&self, project_id: &str) -> Result<Scene> {
        let project = read_project(&self.project_path(project_id), project_id)?;
        self.assemble(&project)
    }

    /// Assemble the scene of an already parsed project
    ///
    /// A room whose wall file is missing gets no wall node. A missing object
    /// model fails the whole scene.
    pub fn assemble(&self, project: &Project) -> Result<Scene> {
        let mut scene = Scene::with_root(project.name.clone());
        let root = scene.root().ok_or_else(|| {
            Error::MalformedProject(format!("scene for {} has no root", project.name))
        })?;

        let mut floor_z = 0.0;
        for (i, floor) in project.floors.iter().enumerate() {
            let floor_node =
                scene.add_child(root, NodeKind::Floor, format!("Floor_{i}"), Vec::new())?;
            let elevation = floor_z;
            floor_z += floor.height;

            for (j, room) in floor.rooms.iter().enumerate() {
                let room_node =
                    scene.add_child(floor_node, NodeKind::Room, format!("Room_{j}"), Vec::new())?;
                if !room.is_enclosed() {
                    continue;
                }

                let wall_path = self.room_wall_path(&project.name, i, j);
                match read_obj(&wall_path) {
                    Ok(meshes) => {
                        scene.add_child(room_node, NodeKind::Wall, format!("Wall_{j}"), meshes)?;
                    }
                    Err(Error::Io { path, source }) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %source,
                            "skipping room walls"
                        );
                    }
                    Err(e) => return Err(e),
                }

                let surface_path = self.room_floor_path(&project.name, i, j);
                if surface_path.is_file() {
                    let meshes = read_obj(&surface_path)?;
                    scene.add_child(room_node, NodeKind::Surface, format!("Floor_{j}"), meshes)?;
                }
            }

            for (j, object) in floor.objects.iter().enumerate() {
                let Some(id) = object.identifier() else {
                    tracing::debug!(floor = i, object = j, "skipping object without identifier");
                    continue;
                };

                let mut meshes = read_obj(&self.object_path(id))?;
                let transform = object_transform(object, elevation);
                for mesh in &mut meshes {
                    mesh.transform(&transform);
                }

                let placement = ObjectPlacement {
                    class: object.class,
                    angle: object.angle,
                    mirror_x: object.flip_x,
                    mirror_y: object.flip_y,
                };
                scene.add_object(floor_node, format!("Object_{j}_{id}"), meshes, placement)?;
            }
        }

        tracing::trace!(scene = %scene.name, "assembled scene\n{}", scene.outline());
        Ok(scene)
    }
}

/// Model-to-world transform of an object on a floor at `elevation`
///
/// Applied right to left: mirrors, the door/window quarter turn, scale,
/// rotation about Z, translation, floor elevation.
pub fn object_transform(object: &Object, elevation: f64) -> Matrix4<f64> {
    let mut m = Matrix4::new_translation(&Vector3::new(0.0, 0.0, elevation));
    m *= Matrix4::new_translation(&Vector3::new(object.x, object.y, object.z));
    m *= Matrix4::new_rotation(Vector3::z() * object.angle);
    m *= Matrix4::new_nonuniform_scaling(&Vector3::new(
        object.scale_x,
        object.scale_y,
        object.scale_z,
    ));
    if object.class.has_quarter_turn_offset() {
        m *= Matrix4::new_rotation(Vector3::z() * FRAC_PI_2);
    }
    if object.flip_x {
        m *= Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
    }
    if object.flip_y {
        m *= Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, -1.0, 1.0));
    }
    m
}

/// Read a newline-separated list of project identifiers
///
/// Blank lines and lines starting with `#` are ignored.
pub fn load_project_ids(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(parse_project_ids(&text))
}

pub fn parse_project_ids(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ObjectClass;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn object(class: ObjectClass) -> Object {
        Object {
            class,
            id: Some("m1".to_string()),
            x: 1.0,
            y: 2.0,
            z: 0.0,
            scale_x: 2.0,
            scale_y: 1.0,
            scale_z: 1.0,
            angle: 0.0,
            flip_x: false,
            flip_y: false,
        }
    }

    #[test]
    fn test_furniture_transform() {
        let m = object_transform(&object(ObjectClass::Furniture), 3.0);
        let p = m.transform_point(&Point3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(p, Point3::new(3.0, 3.0, 3.0), epsilon = 1e-12);
    }

    #[test]
    fn test_door_quarter_turn_before_scale() {
        let m = object_transform(&object(ObjectClass::Door), 0.0);
        // (1, 0) turns to (0, 1), scale leaves y alone
        let p = m.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(1.0, 3.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_mirror_applied_first() {
        let mut o = object(ObjectClass::Furniture);
        o.flip_x = true;
        let p = object_transform(&o, 0.0).transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(-1.0, 2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_project_id_list() {
        let ids = parse_project_ids("a1\n\n  b2  \n# skipped\nc3");
        assert_eq!(ids, vec!["a1", "b2", "c3"]);
    }

    #[test]
    fn test_paths() {
        let assembler = SceneAssembler::new("/data");
        assert_eq!(
            assembler.room_wall_path("p", 0, 2),
            PathBuf::from("/data/roomfiles/p/fr_1rm_3.obj")
        );
        assert_eq!(
            assembler.room_floor_path("p", 1, 0),
            PathBuf::from("/data/roomfiles/p/fr_2rm_1f.obj")
        );
        assert_eq!(
            assembler.object_path("s__12"),
            PathBuf::from("/data/objects/s__12/s__12.obj")
        );
    }
}
