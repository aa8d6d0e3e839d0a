//! Locating and staging fixture projects for integration tests.
//!
//! A build step runs [`generate::process_projects`] (or the `testkit process`
//! command), which copies fixture projects into the output dir and writes a
//! locator file via [`locator::write_marker_file`]. Tests later load that
//! locator into a [`container::ProjectContainer`], stage isolated copies of
//! projects as [`scope::ProjectScope`]s, and drive builds in them with
//! [`runner::BuildRunner`].

pub mod container;
pub mod exit_codes;
pub mod generate;
pub mod io;
pub mod locator;
pub mod logging;
pub mod runner;
pub mod scope;
pub mod select;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
