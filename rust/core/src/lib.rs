// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Scene-Heatmap Core
//!
//! Scene loading for floorplan co-occurrence analysis. Turns a Planner5D data
//! root into in-memory [`Scene`] arenas whose meshes are already placed in
//! world space.
//!
//! ## Overview
//!
//! - **Scene arena**: [`Scene`] owns [`SceneNode`]s linked by [`NodeId`]; every
//!   node carries an explicit [`NodeKind`]
//! - **Project parsing**: Planner5D `project.json` files via [serde_json](https://docs.rs/serde_json)
//! - **Mesh loading**: Wavefront OBJ, one [`TriangleMesh`] per shape, scanned
//!   with [memchr](https://docs.rs/memchr) and [fast-float](https://docs.rs/fast-float)
//! - **Category table**: `id,category` CSV parsed with [nom](https://docs.rs/nom)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scene_heatmap_core::{load_project_ids, CategoryTable, SceneAssembler};
//!
//! let assembler = SceneAssembler::new("/data/p5d");
//! let table = CategoryTable::read("/data/p5d/object_names.csv".as_ref())?;
//! for id in load_project_ids("/data/p5d/list-of-projects.txt".as_ref())? {
//!     let scene = assembler.load_scene(&id)?;
//!     println!("{}: {} nodes", scene.name, scene.len());
//! }
//! ```

pub mod assembly;
pub mod category_table;
pub mod error;
pub mod mesh;
pub mod obj;
pub mod project;
pub mod scene;

pub use assembly::{load_project_ids, object_transform, parse_project_ids, SceneAssembler};
pub use category_table::CategoryTable;
pub use error::{Error, Result};
pub use mesh::{Bounds3, Triangle, TriangleMesh};
pub use obj::{parse_obj, read_obj};
pub use project::{read_project, sanitize_identifier, Floor, Object, Project, Room, Wall};
pub use scene::{NodeId, NodeKind, ObjectClass, ObjectPlacement, Scene, SceneNode};
