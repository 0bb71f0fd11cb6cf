//! Close semantics; one test since crash output is process-wide

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::panic;

#[test]
fn test_close_is_safe_before_and_after_init() {
    assert!(logkit_crashlog::close().is_ok());
    assert_eq!(logkit_crashlog::current_path(), None);

    let dir = tempfile::tempdir().unwrap();
    let path = logkit_crashlog::init_with_path(dir.path()).unwrap();
    let expected_name = format!(".{}.crashlog", logkit_core_types::exec_name());
    assert_eq!(path, dir.path().join(expected_name));
    assert_eq!(logkit_crashlog::current_path(), Some(path.clone()));

    assert!(logkit_crashlog::close().is_ok());
    assert!(logkit_crashlog::close().is_ok());
    assert_eq!(logkit_crashlog::current_path(), None);

    // closing does not reopen the gate
    assert_eq!(logkit_crashlog::init_to_time().unwrap(), path);
    assert_eq!(logkit_crashlog::current_path(), None);

    let outcome = panic::catch_unwind(|| panic!("after close"));
    assert!(outcome.is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}
