//! Rebuild `data.json` from the folders found on disk.

use std::fs;
use std::path::Path;

use serde_json::json;

use crate::error::{EditorError, Result};
use crate::loader::MANIFEST_FILE;
use crate::manifest::{FolderEntry, Manifest, TypedField};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
const SKIPPED_DIRS: &[&str] = &["__pycache__"];

/// Properties every scanned folder gets unless it already has them.
fn default_fields() -> [(&'static str, TypedField); 4] {
    [
        ("exposure", TypedField::Exposure(1.0)),
        ("hsv", TypedField::Hsv([0.0, 0.0, 0.0])),
        ("note", TypedField::Text("Add some notes here.".to_owned())),
        ("ok", TypedField::Flag(json!(1))),
    ]
}

fn is_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn sorted_names(dir: &Path, want_dirs: bool) -> Result<Vec<String>> {
    let path = dir.display().to_string();
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| EditorError::io(&path, e))? {
        let entry = entry.map_err(|e| EditorError::io(&path, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| EditorError::io(&path, e))?
            .is_dir();
        if is_dir != want_dirs {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => log::warn!("Skipping non UTF-8 name {name:?} in {path}"),
        }
    }
    names.sort();
    Ok(names)
}

/// Scan `data_dir` and rewrite its manifest.
///
/// Every sub-directory becomes (or updates) a folder entry: missing default
/// properties are added and `files` is replaced by the directory's images.
/// Folders in the manifest without a directory are kept. With `overwrite`
/// the existing manifest is ignored.
pub fn sync_manifest(data_dir: &Path, overwrite: bool) -> Result<Manifest> {
    let manifest_path = data_dir.join(MANIFEST_FILE);
    log::info!("Syncing {}", manifest_path.display());

    let mut manifest = if overwrite {
        Manifest::default()
    } else {
        let text = fs::read_to_string(&manifest_path)
            .map_err(|e| EditorError::io(manifest_path.display().to_string(), e))?;
        Manifest::from_json_str_lenient(&text)?
    };

    for folder in sorted_names(data_dir, true)? {
        if SKIPPED_DIRS.contains(&folder.as_str()) {
            continue;
        }
        let files: Vec<String> = sorted_names(&data_dir.join(&folder), false)?
            .into_iter()
            .filter(|name| is_image(name))
            .collect();
        log::info!("{folder}: {} image(s)", files.len());

        let entry: &mut FolderEntry = manifest.folder_or_insert(&folder);
        for (key, field) in default_fields() {
            if !entry.contains(key) {
                entry.set(key, field);
            }
        }
        entry.files = files;
    }

    let text = manifest.to_pretty_json()?;
    fs::write(&manifest_path, text)
        .map_err(|e| EditorError::io(manifest_path.display().to_string(), e))?;
    log::info!("Updated {} ({} folders)", manifest_path.display(), manifest.len());
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_image_extensions() {
        assert!(is_image("a.JPG"));
        assert!(is_image("b.jpeg"));
        assert!(is_image("c.png"));
        assert!(!is_image("d.webp"));
        assert!(!is_image("notes.txt"));
        assert!(!is_image("jpg"));
    }

    #[test]
    fn test_overwrite_builds_from_scratch() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("beach")).unwrap();
        fs::create_dir(dir.path().join("__pycache__")).unwrap();
        touch(&dir.path().join("beach/b.png"));
        touch(&dir.path().join("beach/a.JPG"));
        touch(&dir.path().join("beach/readme.txt"));
        fs::create_dir(dir.path().join("beach/nested.jpg")).unwrap();

        let manifest = sync_manifest(dir.path(), true).unwrap();
        assert_eq!(manifest.len(), 1);
        let beach = manifest.folder("beach").unwrap();
        assert_eq!(beach.files, ["a.JPG", "b.png"]);
        assert_eq!(beach.exposure(), Some(1.0));
        assert_eq!(beach.hsv(), Some([0.0, 0.0, 0.0]));
        assert!(beach.get("ok").unwrap().is_set());

        let written = fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(Manifest::from_json_str(&written).unwrap(), manifest);
    }

    #[test]
    fn test_existing_fields_survive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("beach")).unwrap();
        touch(&dir.path().join("beach/new.jpg"));
        fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{
                "beach": {
                    "exposure": { "tp": "exp", "val": -2 },
                    "note": { "tp": "str", "val": "keep me" },
                    "files": ["gone.jpg"]
                },
                "archived": { "files": ["old.jpg"] }
            }"#,
        )
        .unwrap();

        let manifest = sync_manifest(dir.path(), false).unwrap();
        let beach = manifest.folder("beach").unwrap();
        assert_eq!(beach.exposure(), Some(-2.0));
        assert_eq!(beach.get("note"), Some(&TypedField::Text("keep me".into())));
        assert_eq!(beach.hsv(), Some([0.0, 0.0, 0.0]));
        assert_eq!(beach.files, ["new.jpg"]);
        assert_eq!(manifest.folder("archived").unwrap().files, ["old.jpg"]);
    }

    #[test]
    fn test_missing_manifest_without_overwrite_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(sync_manifest(dir.path(), false), Err(EditorError::Io { .. })));
    }
}
