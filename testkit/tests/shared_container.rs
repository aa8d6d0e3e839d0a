//! Process-wide container lifecycle.
//!
//! Lives in its own test binary: it changes the working directory and fills
//! the shared container slot, both of which are global to the process.

use std::env;
use std::sync::Arc;

use testkit::container::ProjectContainer;
use testkit::locator::LOCATOR_ENV;
use testkit::test_support::FixtureSet;

#[test]
fn shared_container_is_reused_until_released() {
    if env::var_os(LOCATOR_ENV).is_some() {
        eprintln!("{LOCATOR_ENV} is set; discovery would ignore the fixture locator");
        return;
    }
    let fixtures = FixtureSet::new(&["simple", "other"]).expect("fixtures");
    let original_dir = env::current_dir().expect("cwd");
    env::set_current_dir(&fixtures.base_dir).expect("enter fixture dir");

    let first = ProjectContainer::shared().expect("shared");
    let second = ProjectContainer::shared().expect("shared again");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.staging_dir(), fixtures.staging_dir.as_path());
    assert_eq!(first.implicit_project_name(), Some("simple"));
    assert!(fixtures.staging_dir.is_dir());

    let scope = first.project_scope("other").expect("stage");
    assert!(scope.project_dir().join("fixture.txt").is_file());
    drop(scope);

    ProjectContainer::release_shared().expect("release shared");
    assert!(!fixtures.staging_dir.exists(), "empty staging dir removed");

    let third = ProjectContainer::shared().expect("shared after release");
    assert!(!Arc::ptr_eq(&first, &third), "slot was reset");
    ProjectContainer::release_shared().expect("release again");
    ProjectContainer::release_shared().expect("release when empty");

    env::set_current_dir(original_dir).expect("restore cwd");
}
