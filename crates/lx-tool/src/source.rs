use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::LxToolError;

pub const LEXY_EXTENSION: &str = "lexy";

pub fn read_lexy_file(path: &Path) -> Result<String, LxToolError> {
    fs::read_to_string(path).map_err(|source| LxToolError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Every `.lexy` file below `dir`, keyed by its `/`-separated relative path.
pub fn read_lexy_files_from_dir(dir: &Path) -> Result<BTreeMap<String, String>, LxToolError> {
    let mut files = BTreeMap::new();

    for entry in WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|extension| extension.to_str()) != Some(LEXY_EXTENSION) {
            continue;
        }

        let relative = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        files.insert(relative, read_lexy_file(path)?);
    }

    if files.is_empty() {
        return Err(LxToolError::SourceEmpty {
            path: dir.to_path_buf(),
        });
    }

    Ok(files)
}
