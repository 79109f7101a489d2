//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Drift - `check` found manifests that would change
pub const DRIFT: i32 = 2;

/// Malformed input - a manifest or CRD could not be patched
pub const MALFORMED: i32 = 3;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Interrupted - cancelled by Ctrl-C before finishing
pub const INTERRUPTED: i32 = 130;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
