// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planner5D project parsing
//!
//! A project file is a JSON document whose top-level `items` array contains an
//! entry with `data.className == "Project"`. Below it, every level is again an
//! `items` array of objects tagged by `className`:
//!
//! ```text
//! Project -> Floor -> { Room | Ground -> Wall -> Point, Door | Window | Ns }
//! ```
//!
//! Lengths are stored in centimetres and angles in degrees; both are converted
//! to metres and radians here so that nothing downstream deals with file units.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::scene::ObjectClass;

const CENTIMETRES_TO_METRES: f64 = 0.01;
const DEFAULT_STOREY_HEIGHT: f64 = 2.7;
const DEFAULT_WALL_WIDTH: f64 = 0.1;

/// A parsed project: a stack of floors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub floors: Vec<Floor>,
}

/// One storey
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Floor {
    /// Storey height in metres
    pub height: f64,
    pub rooms: Vec<Room>,
    pub objects: Vec<Object>,
}

/// A room or ground area
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Room {
    /// `Room` for enclosed rooms, `Ground` for open ground
    pub class_name: String,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub size_x: f64,
    pub size_y: f64,
    pub room_type: Option<String>,
    pub walls: Vec<Wall>,
}

impl Room {
    /// Only enclosed rooms have wall and floor meshes on disk
    pub fn is_enclosed(&self) -> bool {
        self.class_name == "Room"
    }
}

/// A wall segment between two points
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wall {
    pub width: f64,
    pub hidden: bool,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// A placed object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub class: ObjectClass,
    /// Sanitized model identifier, `None` or empty when the file has none
    pub id: Option<String>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub scale_z: f64,
    /// Rotation about the vertical axis in radians
    pub angle: f64,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Object {
    fn new(class: ObjectClass) -> Self {
        Self {
            class,
            id: None,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            scale_z: 1.0,
            angle: 0.0,
            flip_x: false,
            flip_y: false,
        }
    }

    /// Identifier usable for lookups, skipping missing or empty ones
    pub fn identifier(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Replace path separators in a model identifier with a double underscore
///
/// Identifiers such as `s/1234` become `s__1234`, which is both the model
/// directory name on disk and the key used by the category table.
pub fn sanitize_identifier(id: &str) -> String {
    id.replace('/', "__")
}

/// Read and parse a project file
pub fn read_project(path: &Path, name: &str) -> Result<Project> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let root: Value = serde_json::from_str(&text)?;
    parse_project(&root, name).map_err(|e| match e {
        Error::NoProject(_) => Error::NoProject(path.to_path_buf()),
        other => other,
    })
}

/// Parse a project from an already decoded JSON document
pub fn parse_project(root: &Value, name: &str) -> Result<Project> {
    for item in required_items(root, "document")? {
        let Some(item) = item.as_object() else { continue };
        let Some(data) = item.get("data").and_then(Value::as_object) else {
            continue;
        };
        if class_name(data)? != "Project" {
            continue;
        }

        let mut project = Project {
            name: name.to_string(),
            floors: Vec::new(),
        };
        for entry in required_items_of(data, "Project")? {
            let Some(entry) = entry.as_object() else { continue };
            if class_name(entry)? == "Floor" {
                project.floors.push(parse_floor(entry)?);
            }
        }
        return Ok(project);
    }

    Err(Error::NoProject(name.into()))
}

fn parse_floor(json: &Map<String, Value>) -> Result<Floor> {
    let mut floor = Floor {
        height: length(json, "h").unwrap_or(0.0),
        ..Default::default()
    };
    if floor.height <= 0.0 {
        floor.height = DEFAULT_STOREY_HEIGHT;
    }

    for item in required_items_of(json, "Floor")? {
        let Some(item) = item.as_object() else { continue };
        match class_name(item)? {
            "Room" | "Ground" => floor.rooms.push(parse_room(item)?),
            "Door" => floor.objects.push(parse_object(item, ObjectClass::Door)),
            "Window" => floor.objects.push(parse_object(item, ObjectClass::Window)),
            "Ns" => floor.objects.push(parse_object(item, ObjectClass::Furniture)),
            _ => {}
        }
    }

    Ok(floor)
}

fn parse_room(json: &Map<String, Value>) -> Result<Room> {
    let mut room = Room {
        class_name: class_name(json)?.to_string(),
        height: length(json, "h").unwrap_or(0.0),
        x: length(json, "x").unwrap_or(0.0),
        y: length(json, "y").unwrap_or(0.0),
        size_x: length(json, "sX").unwrap_or(0.0),
        size_y: length(json, "sY").unwrap_or(0.0),
        room_type: json.get("rtype").and_then(Value::as_str).map(str::to_string),
        walls: Vec::new(),
    };
    if room.height <= 0.0 {
        room.height = DEFAULT_STOREY_HEIGHT;
    }

    for item in required_items_of(json, "Room")? {
        let Some(item) = item.as_object() else { continue };
        if class_name(item)? == "Wall" {
            room.walls.push(parse_wall(item)?);
        }
    }

    Ok(room)
}

fn parse_wall(json: &Map<String, Value>) -> Result<Wall> {
    let mut wall = Wall {
        width: length(json, "w").unwrap_or(0.0),
        hidden: json.get("hidden").and_then(Value::as_bool).unwrap_or(false),
        ..Default::default()
    };
    if wall.width <= 0.0 {
        wall.width = DEFAULT_WALL_WIDTH;
    }

    for (index, item) in required_items_of(json, "Wall")?.iter().enumerate() {
        let Some(item) = item.as_object() else { continue };
        if class_name(item)? != "Point" {
            continue;
        }
        let x = length(item, "x")
            .ok_or_else(|| Error::MalformedProject("wall point without x".into()))?;
        let y = length(item, "y")
            .ok_or_else(|| Error::MalformedProject("wall point without y".into()))?;
        match index {
            0 => {
                wall.x1 = x;
                wall.y1 = y;
            }
            1 => {
                wall.x2 = x;
                wall.y2 = y;
            }
            _ => {}
        }
    }

    Ok(wall)
}

fn parse_object(json: &Map<String, Value>, class: ObjectClass) -> Object {
    let mut object = Object::new(class);
    object.id = json
        .get("id")
        .and_then(Value::as_str)
        .map(sanitize_identifier);
    if let Some(v) = length(json, "x") {
        object.x = v;
    }
    if let Some(v) = length(json, "y") {
        object.y = v;
    }
    if let Some(v) = length(json, "z") {
        object.z = v;
    }
    if let Some(v) = length(json, "sX") {
        object.scale_x = v;
    }
    if let Some(v) = length(json, "sY") {
        object.scale_y = v;
    }
    if let Some(v) = length(json, "sZ") {
        object.scale_z = v;
    }
    if let Some(degrees) = json.get("a").and_then(Value::as_f64) {
        object.angle = degrees.to_radians();
    }
    object.flip_x = flag(json, "fX");
    object.flip_y = flag(json, "fY");
    object
}

/// Numeric member converted from centimetres
fn length(json: &Map<String, Value>, key: &str) -> Option<f64> {
    json.get(key).and_then(Value::as_f64).map(|v| v * CENTIMETRES_TO_METRES)
}

/// Flip flags are integers in most files and booleans in a few
fn flag(json: &Map<String, Value>, key: &str) -> bool {
    match json.get(key) {
        Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

fn class_name(json: &Map<String, Value>) -> Result<&str> {
    json.get("className")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedProject("item without className".into()))
}

fn required_items<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::MalformedProject(format!("{what} is not an object")))
        .and_then(|obj| required_items_of(obj, what))
}

fn required_items_of<'a>(json: &'a Map<String, Value>, what: &str) -> Result<&'a Vec<Value>> {
    json.get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::MalformedProject(format!("{what} has no items array")))
}
