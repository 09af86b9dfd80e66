// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ProjectFile, RawProjectFile};
use crate::errors::{PrincessError, Result};
use crate::store::StageUpdate;

/// Load a project file from a given path and return the raw `RawProjectFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (DAG correctness, etc.). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawProjectFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_raw(&contents)
}

/// Deserialize a project file from TOML text.
pub fn parse_raw(contents: &str) -> Result<RawProjectFile> {
    let project: RawProjectFile = toml::from_str(contents)?;
    Ok(project)
}

/// Load a project file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - unknown or self `after` references,
///   - inverted date windows and duplicate playbook indices,
///   - DAG cycles,
///   - policy sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ProjectFile> {
    let raw = load_from_path(&path)?;
    ProjectFile::try_from(raw)
}

/// Render a raw project file back to TOML.
pub fn render(project: &RawProjectFile) -> Result<String> {
    Ok(toml::to_string_pretty(project)?)
}

/// Write committed dates into a raw project file.
///
/// Every update must name an existing stage; nothing is changed otherwise.
pub fn apply_updates(project: &mut RawProjectFile, updates: &[StageUpdate]) -> Result<()> {
    if let Some(missing) = updates
        .iter()
        .find(|u| !project.stage.contains_key(&u.stage_id))
    {
        return Err(PrincessError::StageNotFound(missing.stage_id.clone()));
    }

    for update in updates {
        if let Some(stage) = project.stage.get_mut(&update.stage_id) {
            stage.start = update.start_date;
            stage.end = update.end_date;
        }
    }
    Ok(())
}

/// Helper to resolve a default project file path.
///
/// Currently `Princess.toml` in the current working directory.
pub fn default_project_path() -> PathBuf {
    PathBuf::from("Princess.toml")
}

/// Project key for a file: `[project].name`, else the file stem.
pub fn project_name(project: &ProjectFile, path: &Path) -> String {
    project.project.name.clone().unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    })
}
