//! Parameter-file storage conventions.
//!
//! Parameter files live in the document storage directory as `<name>.txt`.
//! The PDFs built from `X.txt` go to a sibling directory `X/`, and a
//! successful build moves the file itself to `X/X.txt`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use cvmaker_shared::{CvMakerError, Result};

/// Extension of parameter files.
pub const PARAMETER_EXTENSION: &str = "txt";

/// Resolve a document argument to a parameter-file path.
///
/// An existing path, or anything containing a path separator, is taken as
/// is. A bare name is looked up in `documents_dir`, with `.txt` appended
/// when it has no extension. When no such file exists but a published copy
/// does (`documents_dir/Jane/Jane.txt`), that copy is returned.
pub fn locate_document(name: &str, documents_dir: &Path) -> PathBuf {
    let as_path = Path::new(name);
    if as_path.exists() || as_path.components().count() > 1 {
        return as_path.to_path_buf();
    }
    let mut path = documents_dir.join(name);
    if path.extension().is_none() {
        path.set_extension(PARAMETER_EXTENSION);
    }
    if path.is_file() {
        return path;
    }
    let published = match (path.file_stem(), path.file_name()) {
        (Some(stem), Some(file)) => documents_dir.join(stem).join(file),
        _ => return path,
    };
    if published.is_file() {
        debug!(path = %published.display(), "found published parameter file");
        return published;
    }
    path
}

/// Output directory for `params_file`.
///
/// `dir/Jane.txt` maps to `dir/Jane/`, except when the file already sits in
/// a directory named `Jane`, which is then used directly.
pub fn destination_dir(params_file: &Path) -> Result<PathBuf> {
    let stem = params_file
        .file_stem()
        .ok_or_else(|| {
            CvMakerError::validation(format!("'{}' has no file name", params_file.display()))
        })?
        .to_os_string();
    let parent = params_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    if parent.file_name() == Some(stem.as_os_str()) {
        Ok(parent.to_path_buf())
    } else {
        Ok(parent.join(stem))
    }
}

/// Parameter files in `dir`, sorted by name. A missing directory is empty.
///
/// Published files (`dir/Jane/Jane.txt`) are listed alongside the
/// unpublished ones.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CvMakerError::io(dir, e)),
    };

    let mut docs = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CvMakerError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == PARAMETER_EXTENSION) {
            docs.push(path);
        } else if path.is_dir() {
            let Some(name) = path.file_name() else {
                continue;
            };
            let mut file = name.to_os_string();
            file.push(".");
            file.push(PARAMETER_EXTENSION);
            let published = path.join(file);
            if published.is_file() {
                docs.push(published);
            }
        }
    }
    docs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(docs)
}

/// Create `target` from the boilerplate at `boilerplate`.
///
/// Refuses to overwrite an existing file.
pub fn new_document(target: &Path, boilerplate: &Path) -> Result<()> {
    if target.exists() {
        return Err(CvMakerError::validation(format!(
            "'{}' already exists",
            target.display()
        )));
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CvMakerError::io(parent, e))?;
    }
    std::fs::copy(boilerplate, target).map_err(|e| CvMakerError::io(boilerplate, e))?;
    info!(path = %target.display(), "new parameter file created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_by_name_or_path() {
        let docs = Path::new("/home/jane/cvmaker");
        assert_eq!(locate_document("Jane", docs), docs.join("Jane.txt"));
        assert_eq!(locate_document("Jane.txt", docs), docs.join("Jane.txt"));
        assert_eq!(locate_document("Jane.params", docs), docs.join("Jane.params"));
        assert_eq!(
            locate_document("letters/Jane.txt", docs),
            PathBuf::from("letters/Jane.txt")
        );
    }

    #[test]
    fn existing_relative_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Jane.txt");
        std::fs::write(&file, "").unwrap();
        let arg = file.to_str().unwrap();
        assert_eq!(locate_document(arg, Path::new("/elsewhere")), file);
    }

    #[test]
    fn locates_published_documents() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path();
        let published = docs.join("Jane").join("Jane.txt");
        std::fs::create_dir(docs.join("Jane")).unwrap();
        std::fs::write(&published, "").unwrap();

        assert_eq!(locate_document("Jane", docs), published);
        assert_eq!(locate_document("Jane.txt", docs), published);
        assert_eq!(locate_document("John", docs), docs.join("John.txt"));

        std::fs::write(docs.join("Jane.txt"), "").unwrap();
        assert_eq!(locate_document("Jane", docs), docs.join("Jane.txt"));
    }

    #[test]
    fn destination_is_sibling_or_own_dir() {
        assert_eq!(
            destination_dir(Path::new("/docs/Jane.txt")).unwrap(),
            PathBuf::from("/docs/Jane")
        );
        assert_eq!(
            destination_dir(Path::new("/docs/Jane/Jane.txt")).unwrap(),
            PathBuf::from("/docs/Jane")
        );
        assert_eq!(
            destination_dir(Path::new("Jane.txt")).unwrap(),
            PathBuf::from("./Jane")
        );
    }

    #[test]
    fn lists_parameter_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "notes.md"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("c.txt")).unwrap();
        std::fs::create_dir(dir.path().join("attachments")).unwrap();
        std::fs::create_dir(dir.path().join("Anna")).unwrap();
        std::fs::write(dir.path().join("Anna").join("Anna.txt"), "").unwrap();

        let docs = list_documents(dir.path()).unwrap();
        assert_eq!(
            docs,
            vec![
                dir.path().join("Anna").join("Anna.txt"),
                dir.path().join("a.txt"),
                dir.path().join("b.txt"),
            ]
        );
        assert!(list_documents(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn new_document_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let boilerplate = dir.path().join("newdoc.txt");
        std::fs::write(&boilerplate, "OWN_NAME = ''\n").unwrap();

        let target = dir.path().join("docs").join("Jane.txt");
        new_document(&target, &boilerplate).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "OWN_NAME = ''\n");

        std::fs::write(&target, "edited").unwrap();
        let err = new_document(&target, &boilerplate).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "edited");
    }
}
