//! Choosing which fixture project a test runs against.
//!
//! Candidates come in precedence order, for example a name given at the call
//! site, then one declared for the test, then one declared for the suite. The
//! first one present wins; otherwise the container's implicit project is used.

use anyhow::{Result, bail};
use tracing::debug;

use crate::container::ProjectContainer;
use crate::scope::ProjectScope;

/// Resolve the project name for a test.
pub fn resolve_project(container: &ProjectContainer, candidates: &[Option<&str>]) -> Result<String> {
    let chosen = candidates.iter().flatten().next().copied();
    let name = match chosen {
        Some(name) => name,
        None => match container.implicit_project_name() {
            Some(name) => name,
            None => bail!(
                "no TestKit project selected and no implicit project (available: {})",
                container.available()
            ),
        },
    };

    if !container.contains(name) {
        bail!(
            "unknown TestKit project `{name}` (available: {})",
            container.available()
        );
    }
    debug!(project = name, explicit = chosen.is_some(), "project selected");
    Ok(name.to_string())
}

/// Resolve the project and stage a fresh copy of it.
pub fn stage_selected(
    container: &ProjectContainer,
    candidates: &[Option<&str>],
) -> Result<ProjectScope> {
    let name = resolve_project(container, candidates)?;
    container.project_scope(&name)
}
