use std::path::{Component, Path, PathBuf};

/// Workspace folders open in the host, in the order the host lists them.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    folders: Vec<PathBuf>,
}

impl Workspace {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self { folders }
    }

    /// The innermost folder containing `path`.
    pub fn folder_for(&self, path: &Path) -> Option<&Path> {
        self.folders
            .iter()
            .filter(|folder| path.starts_with(folder))
            .max_by_key(|folder| folder.components().count())
            .map(PathBuf::as_path)
    }

    /// Working directory for a formatter run on `path`: its folder, else the
    /// first folder, else `None` to inherit the host's.
    pub fn working_dir(&self, path: &Path) -> Option<&Path> {
        self.folder_for(path)
            .or_else(|| self.folders.first().map(PathBuf::as_path))
    }

    /// `path` relative to its folder, `/`-separated. Prefixed with the folder
    /// name when several folders are open. Paths outside every folder come
    /// back unchanged.
    pub fn relative_path(&self, path: &Path) -> String {
        let Some(folder) = self.folder_for(path) else {
            return path.display().to_string();
        };
        let Ok(rest) = path.strip_prefix(folder) else {
            return path.display().to_string();
        };

        let mut parts: Vec<String> = Vec::new();
        if self.folders.len() > 1
            && let Some(name) = folder.file_name()
        {
            parts.push(name.to_string_lossy().into_owned());
        }
        parts.extend(rest.components().filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        }));

        if parts.is_empty() {
            return path.display().to_string();
        }
        parts.join("/")
    }
}
