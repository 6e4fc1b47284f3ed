use std::path::{Path, PathBuf};

/// OS-specific filesystem concerns, so call sites stay free of `#[cfg]` blocks.
pub trait Platform {
    /// Set restrictive *directory* permissions (0o700 on Unix, no-op on Windows).
    fn restrict_dir_permissions(path: &Path);

    /// Set restrictive *file* permissions (0o600 on Unix, no-op on Windows).
    /// The database holds raw API keys.
    fn restrict_file_permissions(path: &Path);

    /// Root data directory.
    /// Unix: `$XDG_DATA_HOME/llm-keepalive`, Windows: `%APPDATA%\llm-keepalive`.
    fn data_dir() -> PathBuf;
}

fn resolve_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("llm-keepalive")
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::NativePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::NativePlatform;
