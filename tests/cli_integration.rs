//! Integration tests for the QueryVault CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! Passwords always come from `QUERY_PASSWORD`; stderr is piped, so the
//! binary never falls back to an interactive prompt.

use std::fs;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;

const PASSWORD: &str = "build-password";

/// Helper: get a Command pointing at the queryvault binary.
fn queryvault() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("queryvault").expect("binary should exist");
    cmd.env_remove("QUERY_PASSWORD").env_remove("RUST_LOG");
    cmd
}

/// Helper: a project with two queries and a config naming the verifier.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let queries = tmp.path().join("queries");
    fs::create_dir_all(&queries).unwrap();
    fs::write(
        queries.join("q1.rq"),
        "# marker\nSELECT ?s WHERE { ?s a ?type }\n",
    )
    .unwrap();
    fs::write(queries.join("q2.rq"), "SELECT ?o WHERE { ?s ?p ?o }\n").unwrap();
    fs::write(
        tmp.path().join(".queryvault.toml"),
        r##"source_dir = "queries"
output = "vault.json"
kdf_iterations = 1000
verifier_name = "q1.rq"
verifier_marker = "# marker"
"##,
    )
    .unwrap();
    tmp
}

fn build(tmp: &TempDir) {
    queryvault()
        .arg("build")
        .current_dir(tmp.path())
        .env("QUERY_PASSWORD", PASSWORD)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 encrypted queries"));
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

#[test]
fn help_flag_shows_usage() {
    queryvault()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("password-gated vault"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("unlock"))
        .stdout(predicate::str::contains("audit"));
}

#[test]
fn version_flag_shows_version() {
    queryvault()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("queryvault"));
}

#[test]
fn no_args_shows_help() {
    queryvault()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

#[test]
fn build_without_password_fails_and_writes_nothing() {
    let tmp = project();
    queryvault()
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("QUERY_PASSWORD"));
    assert!(!tmp.path().join("vault.json").exists());
}

#[test]
fn build_with_empty_source_fails() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("empty")).unwrap();
    queryvault()
        .args(["build", "--source", "empty", "--output", "v.json"])
        .args(["--iterations", "1000"])
        .current_dir(tmp.path())
        .env("QUERY_PASSWORD", PASSWORD)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No eligible query documents"));
    assert!(!tmp.path().join("v.json").exists());
}

#[test]
fn build_rejects_low_iteration_count() {
    let tmp = project();
    queryvault()
        .args(["build", "--iterations", "10"])
        .current_dir(tmp.path())
        .env("QUERY_PASSWORD", PASSWORD)
        .assert()
        .failure();
    assert!(!tmp.path().join("vault.json").exists());
}

#[test]
fn built_vault_holds_no_plaintext() {
    let tmp = project();
    build(&tmp);

    let json = fs::read_to_string(tmp.path().join("vault.json")).unwrap();
    assert!(json.contains("\"PBKDF2\""));
    assert!(json.contains("\"AES-GCM\""));
    assert!(!json.contains("SELECT"));
    assert!(!json.contains(PASSWORD));
}

// ---------------------------------------------------------------------------
// inspect / unlock
// ---------------------------------------------------------------------------

#[test]
fn inspect_lists_names_without_password() {
    let tmp = project();
    build(&tmp);

    queryvault()
        .arg("inspect")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("q1.rq"))
        .stdout(predicate::str::contains("q2.rq"))
        .stdout(predicate::str::contains("1000 iterations"))
        .stdout(predicate::str::contains("SELECT").not());
}

#[test]
fn inspect_missing_vault_fails() {
    let tmp = TempDir::new().unwrap();
    queryvault()
        .args(["inspect", "--vault", "nope.json"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Vault not found"));
}

#[test]
fn unlock_with_correct_password_lists_queries() {
    let tmp = project();
    build(&tmp);

    queryvault()
        .arg("unlock")
        .current_dir(tmp.path())
        .env("QUERY_PASSWORD", PASSWORD)
        .assert()
        .success()
        .stdout(predicate::str::contains("Unlocked 2 queries"))
        .stdout(predicate::str::contains("q2.rq"));
}

#[test]
fn unlock_show_prints_plaintext() {
    let tmp = project();
    build(&tmp);

    queryvault()
        .args(["unlock", "--show", "q2.rq"])
        .current_dir(tmp.path())
        .env("QUERY_PASSWORD", PASSWORD)
        .assert()
        .success()
        .stdout("SELECT ?o WHERE { ?s ?p ?o }\n");
}

#[test]
fn unlock_show_unknown_query_fails() {
    let tmp = project();
    build(&tmp);

    queryvault()
        .args(["unlock", "--show", "q9.rq"])
        .current_dir(tmp.path())
        .env("QUERY_PASSWORD", PASSWORD)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn unlock_with_wrong_password_fails() {
    let tmp = project();
    build(&tmp);

    queryvault()
        .args(["unlock", "--show", "q1.rq"])
        .current_dir(tmp.path())
        .env("QUERY_PASSWORD", "not-the-password")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Password incorrect"))
        .stdout(predicate::str::contains("SELECT").not());
}

#[test]
fn unlock_with_wrong_marker_fails() {
    let tmp = project();
    build(&tmp);

    queryvault()
        .args(["unlock", "--marker", "# something else"])
        .current_dir(tmp.path())
        .env("QUERY_PASSWORD", PASSWORD)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Password incorrect"));
}

#[test]
fn unlock_without_password_fails() {
    let tmp = project();
    build(&tmp);

    queryvault()
        .arg("unlock")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("QUERY_PASSWORD"));
}

// ---------------------------------------------------------------------------
// audit
// ---------------------------------------------------------------------------

/// Helper: flip one byte of a query's ciphertext inside the vault file.
#[cfg(feature = "audit-log")]
fn damage_query(tmp: &TempDir, name: &str) {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    let path = tmp.path().join("vault.json");
    let mut vault: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let query = vault["queries"]
        .as_array_mut()
        .unwrap()
        .iter_mut()
        .find(|q| q["name"] == name)
        .unwrap();
    let mut data = STANDARD.decode(query["data"].as_str().unwrap()).unwrap();
    data[0] ^= 0x01;
    query["data"] = STANDARD.encode(data).into();
    fs::write(&path, serde_json::to_string_pretty(&vault).unwrap()).unwrap();
}

#[cfg(feature = "audit-log")]
#[test]
fn audit_records_build_and_wrong_password() {
    let tmp = project();
    build(&tmp);
    queryvault()
        .arg("unlock")
        .current_dir(tmp.path())
        .env("QUERY_PASSWORD", "hunter2-typo")
        .assert()
        .failure();

    queryvault()
        .arg("audit")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("built"))
        .stdout(predicate::str::contains("wrong_password"))
        .stdout(predicate::str::contains("#1"))
        .stdout(predicate::str::contains("hunter2-typo").not());
}

#[cfg(feature = "audit-log")]
#[test]
fn damaged_vault_looks_like_wrong_password_but_is_audited_apart() {
    let tmp = project();
    build(&tmp);
    damage_query(&tmp, "q2.rq");

    // The person at the prompt learns nothing new...
    queryvault()
        .arg("unlock")
        .current_dir(tmp.path())
        .env("QUERY_PASSWORD", PASSWORD)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Password incorrect"))
        .stdout(predicate::str::contains("SELECT").not());

    // ...but the operator sees which query broke.
    queryvault()
        .args(["audit", "--outcome", "manifest_corrupt"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("manifest_corrupt"))
        .stdout(predicate::str::contains("q2.rq"))
        .stdout(predicate::str::contains("wrong_password").not());

    queryvault()
        .args(["audit", "--summary"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("built"))
        .stdout(predicate::str::contains("manifest_corrupt"))
        .stderr(predicate::str::contains("rebuild the vault"));
}

#[cfg(feature = "audit-log")]
#[test]
fn audit_rejects_unknown_outcome() {
    let tmp = project();
    build(&tmp);
    queryvault()
        .args(["audit", "--outcome", "rejected"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong_password"));
}
