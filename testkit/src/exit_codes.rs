//! Stable exit codes for the `testkit` CLI.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed: bad config, missing locator, unknown project, I/O error.
pub const INVALID: i32 = 1;
/// `testkit run` executed the build and it failed or timed out.
pub const BUILD_FAILED: i32 = 2;
