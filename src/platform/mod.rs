use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory (used by tests and
/// container deployments).
pub const DATA_DIR_ENV: &str = "LEADFLOW_DATA_DIR";

/// Platform-specific operations abstracted behind a common interface.
/// Each OS provides its own `NativePlatform` implementation so call sites
/// remain free of `#[cfg]` blocks.
pub trait Platform {
    /// Set restrictive *directory* permissions (0o700 on Unix, no-op on Windows).
    fn restrict_dir_permissions(path: &Path);

    /// Set restrictive *file* permissions (0o600 on Unix, no-op on Windows).
    fn restrict_file_permissions(path: &Path);

    /// Root data directory for leadflow.
    /// Unix: `~/.leadflow`, Windows: `%APPDATA%\leadflow`.
    fn data_dir() -> PathBuf;
}

/// Honour `LEADFLOW_DATA_DIR` when set and non-empty, otherwise use the
/// platform default.
pub(crate) fn resolve_data_dir(default: PathBuf) -> PathBuf {
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => default,
    }
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::NativePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::NativePlatform;
