//! The manifest: an ordered map of image folders and their typed properties.
//!
//! On disk every folder is a JSON object whose properties are `{"tp", "val"}`
//! pairs plus a plain `files` array:
//!
//! ```json
//! {
//!   "beach": {
//!     "exposure": { "tp": "exp", "val": 0 },
//!     "hsv": { "tp": "hsv", "val": [0, 0, 0] },
//!     "note": { "tp": "str", "val": "Add some notes here." },
//!     "ok": { "tp": "bool", "val": 1 },
//!     "files": ["a.jpg", "b.jpg"]
//!   }
//! }
//! ```

use serde_json::{Map, Value, json};

use crate::error::{EditorError, Result};

/// Property holding the exposure slider value.
pub const EXPOSURE_KEY: &str = "exposure";
/// Property holding the `[hue, saturation, lightness]` triple.
pub const HSV_KEY: &str = "hsv";
/// Property holding the image file names.
pub const FILES_KEY: &str = "files";

/// A property value, dispatched on its `tp` tag.
///
/// A known tag whose `val` has the wrong shape is kept as [`TypedField::Other`]
/// so that saving never rewrites data the editor does not understand.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedField {
    /// `tp: "exp"`, numeric exposure in [-10, 10].
    Exposure(f64),
    /// `tp: "hsv"`, `[hue, saturation, lightness]`.
    Hsv([f64; 3]),
    /// `tp: "str"`, free text.
    Text(String),
    /// `tp: "bool"`. The raw value is kept until edited, then written as 0/1.
    Flag(Value),
    /// Any other tag, shown read-only.
    Other { tp: String, val: Value },
    /// Not a `{"tp", "val"}` object at all, shown read-only.
    Untyped(Value),
}

impl TypedField {
    pub fn from_value(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Self::Untyped(value);
        };
        match (map.get("tp").and_then(Value::as_str), map.get("val")) {
            (Some(tp), Some(val)) if map.len() == 2 => Self::from_tagged(tp, val.clone()),
            _ => Self::Untyped(Value::Object(map)),
        }
    }

    fn from_tagged(tp: &str, val: Value) -> Self {
        let parsed = match tp {
            "exp" => val.as_f64().map(Self::Exposure),
            "hsv" => parse_triple(&val).map(Self::Hsv),
            "str" => val.as_str().map(|s| Self::Text(s.to_owned())),
            "bool" if val.is_boolean() || val.is_number() => Some(Self::Flag(val.clone())),
            _ => None,
        };
        parsed.unwrap_or_else(|| Self::Other {
            tp: tp.to_owned(),
            val,
        })
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Exposure(v) => json!({ "tp": "exp", "val": v }),
            Self::Hsv(hsv) => json!({ "tp": "hsv", "val": hsv }),
            Self::Text(s) => json!({ "tp": "str", "val": s }),
            Self::Flag(v) => json!({ "tp": "bool", "val": v }),
            Self::Other { tp, val } => json!({ "tp": tp, "val": val }),
            Self::Untyped(v) => v.clone(),
        }
    }

    /// The `tp` tag, if the property has one.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Exposure(_) => Some("exp"),
            Self::Hsv(_) => Some("hsv"),
            Self::Text(_) => Some("str"),
            Self::Flag(_) => Some("bool"),
            Self::Other { tp, .. } => Some(tp),
            Self::Untyped(_) => None,
        }
    }

    /// Flag state using JavaScript truthiness (`0`, `false` → unset).
    pub fn is_set(&self) -> bool {
        match self {
            Self::Flag(Value::Bool(b)) => *b,
            Self::Flag(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            _ => false,
        }
    }

    /// Text used by the read-only label.
    pub fn display_value(&self) -> String {
        match self {
            Self::Exposure(v) => v.to_string(),
            Self::Hsv([h, s, l]) => format!("{h},{s},{l}"),
            Self::Text(s) => s.clone(),
            Self::Flag(v) | Self::Other { val: v, .. } | Self::Untyped(v) => match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}

fn parse_triple(val: &Value) -> Option<[f64; 3]> {
    match val.as_array()?.as_slice() {
        [h, s, l] => Some([h.as_f64()?, s.as_f64()?, l.as_f64()?]),
        _ => None,
    }
}

/// One folder: its properties in document order plus its image list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderEntry {
    fields: Vec<(String, TypedField)>,
    pub files: Vec<String>,
}

impl FolderEntry {
    pub fn new(files: Vec<String>) -> Self {
        Self {
            fields: Vec::new(),
            files,
        }
    }

    fn from_value(name: &str, value: Value, require_files: bool) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(EditorError::Manifest(format!(
                "folder {name:?} is not an object"
            )));
        };

        let mut entry = Self::default();
        let mut saw_files = false;
        for (key, value) in map {
            if key == FILES_KEY {
                entry.files = parse_files(name, value)?;
                saw_files = true;
            } else {
                entry.fields.push((key, TypedField::from_value(value)));
            }
        }

        if require_files && !saw_files {
            return Err(EditorError::Manifest(format!(
                "folder {name:?} has no \"files\" list"
            )));
        }
        Ok(entry)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (key, field) in &self.fields {
            map.insert(key.clone(), field.to_value());
        }
        map.insert(FILES_KEY.to_owned(), json!(self.files));
        Value::Object(map)
    }

    pub fn get(&self, key: &str) -> Option<&TypedField> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, f)| f)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut TypedField> {
        self.fields.iter_mut().find(|(k, _)| k == key).map(|(_, f)| f)
    }

    /// Insert or replace a property, keeping its position if it already exists.
    pub fn set(&mut self, key: &str, field: TypedField) {
        match self.get_mut(key) {
            Some(existing) => *existing = field,
            None => self.fields.push((key.to_owned(), field)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Exposure value, only when the `exposure` property is tagged `exp`.
    pub fn exposure(&self) -> Option<f64> {
        match self.get(EXPOSURE_KEY) {
            Some(TypedField::Exposure(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns `false` (and changes nothing) when there is no `exp` property.
    pub fn set_exposure(&mut self, value: f64) -> bool {
        match self.get_mut(EXPOSURE_KEY) {
            Some(TypedField::Exposure(v)) => {
                *v = value;
                true
            }
            _ => false,
        }
    }

    pub fn hsv(&self) -> Option<[f64; 3]> {
        match self.get(HSV_KEY) {
            Some(TypedField::Hsv(hsv)) => Some(*hsv),
            _ => None,
        }
    }

    pub fn set_hsv(&mut self, value: [f64; 3]) -> bool {
        match self.get_mut(HSV_KEY) {
            Some(TypedField::Hsv(hsv)) => {
                *hsv = value;
                true
            }
            _ => false,
        }
    }

    /// Set one of hue (0), saturation (1) or lightness (2).
    pub fn set_hsv_component(&mut self, component: usize, value: f64) -> bool {
        match self.get_mut(HSV_KEY) {
            Some(TypedField::Hsv(hsv)) if component < 3 => {
                hsv[component] = value;
                true
            }
            _ => false,
        }
    }

    /// Properties shown in the generic field block, in document order.
    pub fn extra_fields_mut(&mut self) -> impl Iterator<Item = (&str, &mut TypedField)> {
        self.fields
            .iter_mut()
            .filter(|(k, _)| k != EXPOSURE_KEY && k != HSV_KEY)
            .map(|(k, f)| (k.as_str(), f))
    }

    pub fn extra_fields(&self) -> impl Iterator<Item = (&str, &TypedField)> {
        self.fields
            .iter()
            .filter(|(k, _)| k != EXPOSURE_KEY && k != HSV_KEY)
            .map(|(k, f)| (k.as_str(), f))
    }
}

fn parse_files(folder: &str, value: Value) -> Result<Vec<String>> {
    let Value::Array(items) = value else {
        return Err(EditorError::Manifest(format!(
            "folder {folder:?}: \"files\" is not a list"
        )));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(EditorError::Manifest(format!(
                "folder {folder:?}: file entry {other} is not a string"
            ))),
        })
        .collect()
}

/// All folders, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    folders: Vec<(String, FolderEntry)>,
}

impl Manifest {
    /// Parse a manifest; every folder must carry a `files` list.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?, true)
    }

    /// Like [`Manifest::from_json_str`] but tolerates folders without `files`.
    pub(crate) fn from_json_str_lenient(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?, false)
    }

    fn from_value(value: Value, require_files: bool) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(EditorError::Manifest(
                "top level is not an object".to_owned(),
            ));
        };
        let folders = map
            .into_iter()
            .map(|(name, value)| {
                let entry = FolderEntry::from_value(&name, value, require_files)?;
                Ok((name, entry))
            })
            .collect::<Result<_>>()?;
        Ok(Self { folders })
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .folders
            .iter()
            .map(|(name, entry)| (name.clone(), entry.to_value()))
            .collect();
        Value::Object(map)
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FolderEntry)> {
        self.folders.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn folder(&self, name: &str) -> Option<&FolderEntry> {
        self.folders.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn folder_mut(&mut self, name: &str) -> Option<&mut FolderEntry> {
        self.folders
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }

    /// Return the folder, appending an empty one if it does not exist yet.
    pub fn folder_or_insert(&mut self, name: &str) -> &mut FolderEntry {
        let index = match self.folders.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.folders.push((name.to_owned(), FolderEntry::default()));
                self.folders.len() - 1
            }
        };
        &mut self.folders[index].1
    }

    /// Copy exposure and hsv values from `patch` into folders that exist here.
    ///
    /// A value is copied only when both sides carry the same field kind. Every
    /// folder present in both documents is returned, in patch order, so the
    /// caller can refresh its sliders and filters.
    pub fn apply_patch(&mut self, patch: &AdjustmentPatch) -> Vec<String> {
        let mut touched = Vec::new();
        for folder in &patch.folders {
            let Some(entry) = self.folder_mut(&folder.name) else {
                log::debug!("Loaded file names unknown folder {:?}, ignoring", folder.name);
                continue;
            };

            match (&folder.exposure, entry.contains(EXPOSURE_KEY)) {
                (Some(TypedField::Exposure(v)), true) => {
                    if !entry.set_exposure(*v) {
                        log::warn!("{}: exposure is not an exp field, not updated", folder.name);
                    }
                }
                (Some(_), true) => {
                    log::warn!("{}: loaded exposure has an unexpected shape", folder.name);
                }
                _ => {}
            }

            match (&folder.hsv, entry.contains(HSV_KEY)) {
                (Some(TypedField::Hsv(hsv)), true) => {
                    if !entry.set_hsv(*hsv) {
                        log::warn!("{}: hsv is not an hsv field, not updated", folder.name);
                    }
                }
                (Some(_), true) => {
                    log::warn!("{}: loaded hsv has an unexpected shape", folder.name);
                }
                _ => {}
            }

            touched.push(folder.name.clone());
        }
        touched
    }
}

/// The adjustment values of a user-loaded manifest.
///
/// Only `exposure` and `hsv` are read; everything else in the file is ignored,
/// including a missing `files` list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjustmentPatch {
    folders: Vec<PatchedFolder>,
}

#[derive(Debug, Clone, PartialEq)]
struct PatchedFolder {
    name: String,
    exposure: Option<TypedField>,
    hsv: Option<TypedField>,
}

impl AdjustmentPatch {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let Value::Object(map) = serde_json::from_str(text)? else {
            return Err(EditorError::Manifest(
                "top level is not an object".to_owned(),
            ));
        };
        let folders = map
            .into_iter()
            .map(|(name, value)| PatchedFolder {
                exposure: value.get(EXPOSURE_KEY).cloned().map(TypedField::from_value),
                hsv: value.get(HSV_KEY).cloned().map(TypedField::from_value),
                name,
            })
            .collect();
        Ok(Self { folders })
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}
