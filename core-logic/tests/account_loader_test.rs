use core_logic::{AccountLoader, ConfigError};
use std::io::Write;

#[test]
fn test_load_trims_and_skips_comments() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "  0xABCDEF1234567890  ").expect("write");
    writeln!(file, "# disabled account").expect("write");
    writeln!(file).expect("write");
    writeln!(file, "0x1111111111111111").expect("write");

    let accounts = AccountLoader::load_from(file.path()).expect("accounts");
    assert_eq!(accounts, vec!["0xABCDEF1234567890", "0x1111111111111111"]);
}

#[test]
fn test_duplicates_keep_first_occurrence() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "0xAAA").expect("write");
    writeln!(file, "0xBBB").expect("write");
    writeln!(file, "0xAAA").expect("write");

    let accounts = AccountLoader::load_from(file.path()).expect("accounts");
    assert_eq!(accounts, vec!["0xAAA", "0xBBB"]);
}

#[test]
fn test_empty_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "# nothing here").expect("write");

    let err = AccountLoader::load_from(file.path()).expect_err("empty list");
    assert!(matches!(err, ConfigError::Empty { .. }));
}

#[test]
fn test_missing_file_is_an_error() {
    let err = AccountLoader::load("no/such/dir/accounts.txt").expect_err("missing");
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}
