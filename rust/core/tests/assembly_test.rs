// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene assembly against an on-disk data root

use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use scene_heatmap_core::{load_project_ids, CategoryTable, Error, NodeKind, SceneAssembler};

const UNIT_SQUARE: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";

const TWO_WALLS: &str = "\
v 0 0 0
v 4 0 0
v 4 0 2.5
o a
f 1 2 3
v 0 0 0
v 0 3 0
v 0 3 2.5
o b
f 4 5 6
";

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project_json() -> String {
    r#"{ "items": [ { "data": {
        "className": "Project",
        "items": [
            { "className": "Floor", "h": 250, "items": [
                { "className": "Room", "x": 0, "y": 0, "items": [] },
                { "className": "Ground", "x": 0, "y": 0, "items": [] },
                { "className": "Ns", "id": "s/10", "x": 200, "y": 300, "z": 0, "sX": 100, "sY": 100, "sZ": 100, "a": 0 },
                { "className": "Ns", "id": "", "x": 0, "y": 0 }
            ]},
            { "className": "Floor", "h": 300, "items": [
                { "className": "Room", "x": 0, "y": 0, "items": [] },
                { "className": "Ns", "id": "s/10", "x": 0, "y": 0, "z": 0, "sX": 100, "sY": 100, "sZ": 100, "a": 0 }
            ]}
        ]
    }}]}"#
        .to_string()
}

fn data_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(&root.join("projects_clean/p1/project.json"), &project_json());
    write(&root.join("roomfiles/p1/fr_1rm_1.obj"), TWO_WALLS);
    write(&root.join("roomfiles/p1/fr_1rm_1f.obj"), UNIT_SQUARE);
    // floor 2 room 1 has no wall file
    write(&root.join("objects/s__10/s__10.obj"), UNIT_SQUARE);
    write(&root.join("list-of-projects.txt"), "p1\nmissing\n");
    write(
        &root.join("object_names.csv"),
        "id,name,category\ns__10,Chair,chair\n",
    );
    dir
}

#[test]
fn test_load_scene_tree() {
    let dir = data_root();
    let scene = SceneAssembler::new(dir.path()).load_scene("p1").unwrap();

    let kinds = |kind: NodeKind| scene.nodes().iter().filter(|n| n.kind == kind).count();
    assert_eq!(kinds(NodeKind::Root), 1);
    assert_eq!(kinds(NodeKind::Floor), 2);
    assert_eq!(kinds(NodeKind::Room), 3);
    assert_eq!(kinds(NodeKind::Wall), 1);
    assert_eq!(kinds(NodeKind::Surface), 1);
    assert_eq!(kinds(NodeKind::Object), 2);

    let wall = scene.nodes().iter().find(|n| n.kind == NodeKind::Wall).unwrap();
    assert_eq!(wall.name, "Wall_0");
    assert_eq!(wall.meshes.len(), 2);
}

#[test]
fn test_objects_placed_in_world_space() {
    let dir = data_root();
    let scene = SceneAssembler::new(dir.path()).load_scene("p1").unwrap();

    let objects: Vec<_> = scene
        .nodes()
        .iter()
        .filter(|n| n.kind == NodeKind::Object)
        .collect();
    assert_eq!(objects[0].name, "Object_0_s__10");

    let first = objects[0].mesh_bounds().unwrap();
    assert_relative_eq!(first.min.x, 2.0, epsilon = 1e-9);
    assert_relative_eq!(first.min.y, 3.0, epsilon = 1e-9);

    // second storey sits on top of the first
    let second = objects[1].mesh_bounds().unwrap();
    assert_relative_eq!(second.min.z, 2.5, epsilon = 1e-9);
}

#[test]
fn test_missing_object_model_fails_scene() {
    let dir = data_root();
    fs::remove_file(dir.path().join("objects/s__10/s__10.obj")).unwrap();
    let result = SceneAssembler::new(dir.path()).load_scene("p1");
    assert!(matches!(result, Err(Error::Io { .. })));
}

#[test]
fn test_missing_project_is_io_error() {
    let dir = data_root();
    let result = SceneAssembler::new(dir.path()).load_scene("missing");
    assert!(matches!(result, Err(Error::Io { .. })));
}

#[test]
fn test_lists_and_tables() {
    let dir = data_root();
    let ids = load_project_ids(&dir.path().join("list-of-projects.txt")).unwrap();
    assert_eq!(ids, vec!["p1", "missing"]);

    let table = CategoryTable::read(&dir.path().join("object_names.csv")).unwrap();
    assert_eq!(table.get("s__10"), Some("chair"));
}
