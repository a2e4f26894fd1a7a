// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object name to semantic category resolution.

use scene_heatmap_core::{CategoryTable, SceneNode};

use crate::error::{Error, Result};

/// Model identifier carried at the end of an object node name
///
/// The identifier is the last `_`-delimited segment. Identifiers of the
/// `s__<n>` series contain a double underscore, so when the last delimiter
/// is doubled the segment before it is included as well:
/// `Object_3_s__1234` yields `s__1234`, `Object_0_42` yields `42`.
pub fn object_identifier(name: &str) -> Result<&str> {
    let last = name
        .rfind('_')
        .ok_or_else(|| Error::MalformedObjectName(name.to_string()))?;

    let start = if last > 0 && name.as_bytes()[last - 1] == b'_' {
        name[..last - 1].rfind('_').map_or(0, |p| p + 1)
    } else {
        last + 1
    };
    Ok(&name[start..])
}

/// Looks up object categories in an identifier table
#[derive(Debug, Clone, Copy)]
pub struct CategoryResolver<'a> {
    table: &'a CategoryTable,
}

impl<'a> CategoryResolver<'a> {
    pub fn new(table: &'a CategoryTable) -> Self {
        Self { table }
    }

    /// Category for an object node name
    ///
    /// Unknown identifiers are a gap in the table and resolve to `None`; a
    /// name without any identifier is an error.
    pub fn resolve_name(&self, name: &str) -> Result<Option<&'a str>> {
        let id = object_identifier(name)?;
        match self.table.get(id) {
            Some(category) => {
                tracing::trace!(id, category, "resolved object category");
                Ok(Some(category))
            }
            None => {
                tracing::warn!(id, object = name, "unexpected object id");
                Ok(None)
            }
        }
    }

    #[inline]
    pub fn resolve(&self, node: &SceneNode) -> Result<Option<&'a str>> {
        self.resolve_name(&node.name)
    }
}
