//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - bad name, URL, constraint or unparseable file
pub const VALIDATION_ERROR: i32 = 2;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Not found - unknown repository or missing registry
pub const NOT_FOUND: i32 = 6;

/// Conflict - repository already registered with another configuration
pub const CONFLICT: i32 = 7;

/// Network error - index download failed
pub const NETWORK_ERROR: i32 = 8;

/// Concurrency error - registry lock not acquired in time
pub const LOCK_ERROR: i32 = 9;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
