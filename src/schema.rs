//! Schema module: SQL naming used when rendering filter trees.
//!
//! This module provides the SqlSchema type and builder. The point table has no default and must
//! always be named explicitly; the coordinate and correlation columns fall back to the catalog.

use crate::types::Column;
use serde::{Deserialize, Serialize};

fn default_latitude_column() -> String {
    Column::Latitude.catalog_name().to_string()
}

fn default_longitude_column() -> String {
    Column::Longitude.catalog_name().to_string()
}

fn default_trajectory_id_column() -> String {
    Column::TrajectoryId.catalog_name().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct SqlSchema {
    point_table: String,
    #[serde(default = "default_latitude_column")]
    latitude_column: String,
    #[serde(default = "default_longitude_column")]
    longitude_column: String,
    #[serde(default = "default_trajectory_id_column")]
    trajectory_id_column: String,
}

impl SqlSchema {
    pub fn new(point_table: impl Into<String>) -> Self {
        SqlSchemaBuilder::new(point_table).build()
    }
    /// Table holding one row per trajectory point.
    pub fn point_table(&self) -> &str {
        &self.point_table
    }
    pub fn latitude_column(&self) -> &str {
        &self.latitude_column
    }
    pub fn longitude_column(&self) -> &str {
        &self.longitude_column
    }
    /// Column correlating the point table with the trajectory-level query.
    pub fn trajectory_id_column(&self) -> &str {
        &self.trajectory_id_column
    }
}

#[derive(Debug, Clone)]
pub struct SqlSchemaBuilder {
    point_table: String,
    latitude_column: Option<String>,
    longitude_column: Option<String>,
    trajectory_id_column: Option<String>,
}

impl SqlSchemaBuilder {
    pub fn new(point_table: impl Into<String>) -> Self {
        Self {
            point_table: point_table.into(),
            latitude_column: None,
            longitude_column: None,
            trajectory_id_column: None,
        }
    }
    pub fn latitude_column(mut self, name: impl Into<String>) -> Self {
        self.latitude_column = Some(name.into());
        self
    }
    pub fn longitude_column(mut self, name: impl Into<String>) -> Self {
        self.longitude_column = Some(name.into());
        self
    }
    pub fn trajectory_id_column(mut self, name: impl Into<String>) -> Self {
        self.trajectory_id_column = Some(name.into());
        self
    }
    pub fn build(self) -> SqlSchema {
        SqlSchema {
            point_table: self.point_table,
            latitude_column: self.latitude_column.unwrap_or_else(default_latitude_column),
            longitude_column: self.longitude_column.unwrap_or_else(default_longitude_column),
            trajectory_id_column: self
                .trajectory_id_column
                .unwrap_or_else(default_trajectory_id_column),
        }
    }
}
