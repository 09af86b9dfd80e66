// src/store/project_file.rs

//! Stage store backed by a TOML project file.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tracing::{debug, info};

use crate::config::loader::{apply_updates, parse_raw, project_name, render};
use crate::config::ProjectFile;
use crate::dag::Stage;
use crate::errors::{PrincessError, Result};
use crate::store::{StageStore, StageUpdate};

/// Reads stages from, and writes committed dates back to, a project file.
///
/// The file holds a single project; its key is `[project].name` or the file
/// stem (see [`project_name`]).
#[derive(Debug, Clone)]
pub struct ProjectFileStore {
    path: PathBuf,
}

impl ProjectFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_validated(path: &Path) -> Result<ProjectFile> {
        let contents = tokio::fs::read_to_string(path).await?;
        ProjectFile::try_from(parse_raw(&contents)?)
    }

    fn check_project(path: &Path, file: &ProjectFile, project: &str) -> Result<()> {
        let name = project_name(file, path);
        if name != project {
            return Err(PrincessError::ConfigError(format!(
                "{} holds project '{name}', not '{project}'",
                path.display()
            )));
        }
        Ok(())
    }
}

/// Write `contents` to a sibling file, then rename it over `path`, so a
/// crash mid-write leaves the old file intact.
async fn write_replacing(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PrincessError::ConfigError(format!("{} is not a file path", path.display())))?;
    let staging = path.with_file_name(format!(".{file_name}.princess-tmp"));

    tokio::fs::write(&staging, contents).await?;
    if let Err(err) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(err.into());
    }
    Ok(())
}

impl StageStore for ProjectFileStore {
    fn load_stages(
        &mut self,
        project: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Stage>>> + Send + '_>> {
        let project = project.to_string();
        let path = self.path.clone();

        Box::pin(async move {
            let file = Self::read_validated(&path).await?;
            Self::check_project(&path, &file, &project)?;
            let stages = file.to_stages();
            debug!(path = %path.display(), stages = stages.len(), "project file loaded");
            Ok(stages)
        })
    }

    fn update_stages(
        &mut self,
        project: &str,
        updates: Vec<StageUpdate>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let project = project.to_string();
        let path = self.path.clone();

        Box::pin(async move {
            let contents = tokio::fs::read_to_string(&path).await?;
            let mut raw = parse_raw(&contents)?;
            Self::check_project(&path, &ProjectFile::try_from(raw.clone())?, &project)?;

            apply_updates(&mut raw, &updates)?;
            // Re-validate so a bad batch never reaches disk.
            let rendered = render(&raw)?;
            ProjectFile::try_from(raw)?;

            write_replacing(&path, rendered.as_bytes()).await?;
            info!(path = %path.display(), updates = updates.len(), "project file updated");
            Ok(())
        })
    }
}
