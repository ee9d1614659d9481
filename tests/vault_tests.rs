//! Integration tests for the bundle builder and vault format.

use std::collections::HashSet;
use std::fs;

use queryvault::crypto::{derive_key, open, MIN_ITERATIONS};
use queryvault::errors::QueryVaultError;
use queryvault::vault::{read_manifest, BundleBuilder, VaultManifest};
use tempfile::TempDir;

const PASSWORD: &[u8] = b"build-password";

/// Helper: a source directory with `q1.rq` (the verifier) and `q2.rq`.
fn query_dir() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    fs::write(
        dir.path().join("q1.rq"),
        "# marker\nSELECT ?s WHERE { ?s a ?type }\n",
    )
    .unwrap();
    fs::write(dir.path().join("q2.rq"), "SELECT ?o WHERE { ?s ?p ?o }\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a query").unwrap();
    dir
}

fn builder(dir: &TempDir) -> BundleBuilder {
    BundleBuilder::new(dir.path()).iterations(MIN_ITERATIONS)
}

fn decrypt(manifest: &VaultManifest, name: &str, password: &[u8]) -> Option<String> {
    let item = manifest.get(name)?;
    let key = derive_key(password, &item.salt, manifest.kdf.iterations).ok()?;
    let plaintext = open(&key, &item.nonce, &item.ciphertext).ok()?;
    String::from_utf8(plaintext).ok()
}

// ---------------------------------------------------------------------------
// Build output
// ---------------------------------------------------------------------------

#[test]
fn build_seals_every_eligible_document() {
    let dir = query_dir();
    let manifest = builder(&dir).build(PASSWORD).expect("build");

    assert_eq!(manifest.version, 1);
    assert_eq!(manifest.kdf.iterations, MIN_ITERATIONS);
    let names: Vec<_> = manifest.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["q1.rq", "q2.rq"]);
    let labels: Vec<_> = manifest.items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, ["q1", "q2"]);

    assert_eq!(
        decrypt(&manifest, "q1.rq", PASSWORD).as_deref(),
        Some("# marker\nSELECT ?s WHERE { ?s a ?type }\n")
    );
    assert_eq!(
        decrypt(&manifest, "q2.rq", PASSWORD).as_deref(),
        Some("SELECT ?o WHERE { ?s ?p ?o }\n")
    );
    assert!(decrypt(&manifest, "q1.rq", b"wrong").is_none());
}

#[test]
fn manifest_holds_no_plaintext_or_password() {
    let dir = query_dir();
    let manifest = builder(&dir).build(PASSWORD).unwrap();
    let json = manifest.to_json().unwrap();

    assert!(!json.contains("SELECT"));
    assert!(!json.contains("build-password"));
    assert!(!json.contains("# marker"));
}

#[test]
fn build_to_writes_readable_vault() {
    let dir = query_dir();
    let out = dir.path().join("out").join("queries.encrypted.json");

    let written = builder(&dir).build_to(PASSWORD, &out).unwrap();
    let loaded = read_manifest(&out).unwrap();
    assert_eq!(written, loaded);

    // No temp file left behind.
    let leftovers: Vec<_> = fs::read_dir(out.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

// ---------------------------------------------------------------------------
// Uniqueness of salts and nonces
// ---------------------------------------------------------------------------

#[test]
fn salts_and_nonces_unique_within_and_across_builds() {
    let dir = TempDir::new().unwrap();
    for i in 0..8 {
        fs::write(dir.path().join(format!("q{i}.rq")), format!("SELECT {i}")).unwrap();
    }

    let mut salts = HashSet::new();
    let mut nonces = HashSet::new();
    for _ in 0..3 {
        let manifest = builder(&dir).build(PASSWORD).unwrap();
        for item in &manifest.items {
            assert!(salts.insert(item.salt.clone()), "salt repeated");
            assert!(nonces.insert(item.nonce.clone()), "nonce repeated");
        }
    }
    assert_eq!(salts.len(), 24);
}

#[test]
fn rebuild_changes_every_ciphertext() {
    let dir = query_dir();
    let first = builder(&dir).build(PASSWORD).unwrap();
    let second = builder(&dir).build(PASSWORD).unwrap();

    for (a, b) in first.items.iter().zip(&second.items) {
        assert_eq!(a.name, b.name);
        assert_ne!(a.ciphertext, b.ciphertext);
    }
}

// ---------------------------------------------------------------------------
// Build failures write nothing
// ---------------------------------------------------------------------------

#[test]
fn empty_source_fails_without_output() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("README.md"), "# queries").unwrap();
    let out = dir.path().join("vault.json");

    let result = builder(&dir).build_to(PASSWORD, &out);
    assert!(matches!(result, Err(QueryVaultError::NoQueryDocuments(_))));
    assert!(!out.exists());
}

#[test]
fn missing_password_fails_without_output() {
    let dir = query_dir();
    let out = dir.path().join("vault.json");

    let result = builder(&dir).build_to(b"", &out);
    assert!(matches!(result, Err(QueryVaultError::MissingPassword)));
    assert!(!out.exists());
}

#[test]
fn missing_source_dir_fails() {
    let dir = TempDir::new().unwrap();
    let result = BundleBuilder::new(dir.path().join("nope"))
        .iterations(MIN_ITERATIONS)
        .build(PASSWORD);
    assert!(matches!(result, Err(QueryVaultError::Io(_))));
}

// ---------------------------------------------------------------------------
// Reading vaults
// ---------------------------------------------------------------------------

#[test]
fn read_missing_vault_fails() {
    let dir = TempDir::new().unwrap();
    let result = read_manifest(&dir.path().join("missing.json"));
    assert!(matches!(result, Err(QueryVaultError::VaultNotFound(_))));
}

#[test]
fn read_garbage_vault_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        read_manifest(&path),
        Err(QueryVaultError::InvalidVaultFormat(_))
    ));
}

#[test]
fn reads_hand_written_vault_document() {
    // Shape produced by other tooling: key order differs, extra whitespace.
    let json = r#"{
      "queries": [],
      "cipher": { "keyLength": 256, "ivLength": 12, "name": "AES-GCM" },
      "kdf": { "iterations": 210000, "hash": "SHA-256", "name": "PBKDF2" },
      "version": 1
    }"#;
    let manifest = VaultManifest::from_json(json).unwrap();
    assert!(manifest.is_empty());
    assert_eq!(manifest.kdf.iterations, 210_000);
}
