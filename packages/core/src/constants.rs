use std::env;
use std::path::PathBuf;

/// Container path the output directory is mounted at when a job does not name one
pub const DEFAULT_MOUNT: &str = "/output";

/// Get the path to the Hill directory (~/.hill)
pub fn hill_dir() -> PathBuf {
    // First try HOME environment variable (useful for tests)
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".hill")
    } else {
        // Fall back to dirs crate for normal usage
        dirs::home_dir()
            .unwrap_or_else(env::temp_dir)
            .join(".hill")
    }
}

/// Default SQLite database location (~/.hill/hill.db)
pub fn database_file() -> PathBuf {
    hill_dir().join("hill.db")
}

/// Default artifact blob directory (~/.hill/artifacts)
pub fn artifacts_dir() -> PathBuf {
    hill_dir().join("artifacts")
}

/// Default daemon workspace (~/.hill/workspace)
pub fn workspace_dir() -> PathBuf {
    hill_dir().join("workspace")
}
