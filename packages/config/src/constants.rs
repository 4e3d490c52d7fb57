// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names and defaults used across Hill

// Control plane server
pub const HILL_HOST: &str = "HILL_HOST";
pub const HILL_PORT: &str = "HILL_PORT";
pub const PORT: &str = "PORT"; // Legacy
pub const HILL_DATA_DIR: &str = "HILL_DATA_DIR";
pub const HILL_DATABASE_URL: &str = "HILL_DATABASE_URL";
pub const HILL_CORS_ORIGIN: &str = "HILL_CORS_ORIGIN";

// Execution daemon
pub const HILL_URL: &str = "HILL_URL";
pub const HILL_ROBOT: &str = "HILL_ROBOT";
pub const HILL_WORKSPACE_DIR: &str = "HILL_WORKSPACE_DIR";
pub const HILL_POLL_INTERVAL_MS: &str = "HILL_POLL_INTERVAL_MS";
pub const HILL_DEVICE_PATH: &str = "HILL_DEVICE_PATH";
pub const HILL_STOP_TIMEOUT_SECS: &str = "HILL_STOP_TIMEOUT_SECS";
pub const HILL_HTTP_TIMEOUT_SECS: &str = "HILL_HTTP_TIMEOUT_SECS";
pub const HILL_MAX_INSPECT_FAILURES: &str = "HILL_MAX_INSPECT_FAILURES";

// Defaults
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_DEVICE_PATH: &str = "/dev";
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_INSPECT_FAILURES: u32 = 30;
pub const DEFAULT_ACTIVITY_WINDOW_SECS: i64 = 60;
