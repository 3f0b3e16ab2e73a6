//! Finding .bacpac packages to import

use crate::traits::FileSystem;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub const PACKAGE_EXTENSION: &str = "bacpac";

/// `.bacpac` files directly inside `dir`, sorted by name
pub fn discover_packages(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut packages: Vec<PathBuf> = fs
        .read_dir(dir)?
        .into_iter()
        .filter(|path| is_package(path) && fs.is_file(path))
        .collect();

    packages.sort();
    Ok(packages)
}

pub fn is_package(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PACKAGE_EXTENSION))
}

/// Database name proposed for a package: its file stem
pub fn suggest_database_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::trim)
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}
