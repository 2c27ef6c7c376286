//! Class and tag registry of a project.
//!
//! Definitions keep every field the platform sends so a meta read from one
//! project can be written to another without loss. Identity is by name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label class definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjClass {
    #[serde(rename = "title")]
    pub name: String,
    #[serde(default)]
    pub shape: String,
    #[serde(default)]
    pub color: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ObjClass {
    pub fn new(name: impl Into<String>, shape: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: shape.into(),
            color: String::new(),
            extra: Map::new(),
        }
    }
}

/// Tag definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagMeta {
    pub name: String,
    #[serde(default)]
    pub value_type: String,
    #[serde(default)]
    pub color: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TagMeta {
    pub fn new(name: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: value_type.into(),
            color: String::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    #[serde(default)]
    pub classes: Vec<ObjClass>,
    #[serde(default)]
    pub tags: Vec<TagMeta>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectMeta {
    pub fn get_obj_class(&self, name: &str) -> Option<&ObjClass> {
        self.classes.iter().find(|class| class.name == name)
    }

    pub fn get_tag_meta(&self, name: &str) -> Option<&TagMeta> {
        self.tags.iter().find(|tag| tag.name == name)
    }

    /// Add classes whose names are not registered yet. Returns how many were added.
    pub fn merge_classes<'a>(&mut self, classes: impl IntoIterator<Item = &'a ObjClass>) -> usize {
        let mut added = 0;
        for class in classes {
            if self.get_obj_class(&class.name).is_none() {
                self.classes.push(class.clone());
                added += 1;
            }
        }
        added
    }

    /// Add tags whose names are not registered yet. Returns how many were added.
    pub fn merge_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a TagMeta>) -> usize {
        let mut added = 0;
        for tag in tags {
            if self.get_tag_meta(&tag.name).is_none() {
                self.tags.push(tag.clone());
                added += 1;
            }
        }
        added
    }
}
