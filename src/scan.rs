//! Audio file discovery

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Normalize user-supplied extensions to lower case with a leading dot
pub fn normalize_formats<S: AsRef<str>>(formats: &[S]) -> Vec<String> {
    formats
        .iter()
        .map(|f| {
            let f = f.as_ref().trim().to_ascii_lowercase();
            if f.starts_with('.') {
                f
            } else {
                format!(".{}", f)
            }
        })
        .collect()
}

fn has_format(path: &Path, formats: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let ext = format!(".{}", e.to_ascii_lowercase());
            formats.iter().any(|f| *f == ext)
        })
        .unwrap_or(false)
}

/// Collect audio files under `root`.
///
/// A file root is returned as-is, whatever its extension. A directory is
/// walked (only its direct children unless `recursive`), keeping regular
/// files whose extension is in `formats`. Output is sorted.
pub fn collect_audio_files<S: AsRef<str>>(root: &Path, recursive: bool, formats: &[S]) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(Error::Path(format!("{} does not exist", root.display())));
    }

    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    if !root.is_dir() {
        return Err(Error::Path(format!("{} is not a file or directory", root.display())));
    }

    let formats = normalize_formats(formats);
    let mut walker = WalkDir::new(root);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && has_format(e.path(), &formats))
        .map(|e| e.into_path())
        .collect();

    files.sort();
    Ok(files)
}
