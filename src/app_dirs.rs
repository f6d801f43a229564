use directories::ProjectDirs;
use std::path::PathBuf;

/// Where plunge keeps its files
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "plunge")
    }

    /// `sessions.db` in the XDG state dir where the platform has one,
    /// the local data dir otherwise
    pub fn db_path() -> Option<PathBuf> {
        let dirs = Self::project()?;
        let base = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
        Some(base.join("sessions.db"))
    }

    pub fn config_path() -> PathBuf {
        Self::project()
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("plunge_config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_name_the_app_files() {
        if let Some(db) = AppDirs::db_path() {
            assert!(db.ends_with("sessions.db"));
            assert!(db.to_string_lossy().contains("plunge"));
        }
        assert!(AppDirs::config_path().to_string_lossy().ends_with("config.json"));
    }
}
