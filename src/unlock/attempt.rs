//! A single password submission and its asynchronous resolution.
//!
//! An `UnlockAttempt` owns everything it needs (a shared handle to the
//! manifest, the verifier settings, the password) so it can resolve
//! off to the side while newer attempts are started.  Key derivation and
//! decryption run on the blocking pool; the attempt only suspends at
//! those calls.

use std::sync::Arc;

use futures::future::join_all;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use super::query_set::{DecryptedQuery, DecryptedQuerySet};
use crate::crypto::{derive_key, open};
use crate::errors::{QueryVaultError, Result};
use crate::vault::{QueryItem, VaultManifest};

/// Which item proves the password, and what its first line must say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verifier {
    pub name: String,
    pub marker: String,
}

impl Verifier {
    pub fn new(name: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marker: marker.into(),
        }
    }

    /// Returns `true` if the first line of `text` equals the marker.
    ///
    /// A trailing `\r` is ignored so CRLF documents verify too.
    pub fn matches(&self, text: &str) -> bool {
        let first_line = text.split('\n').next().unwrap_or_default();
        let first_line = first_line.strip_suffix('\r').unwrap_or(first_line);
        first_line.as_bytes().ct_eq(self.marker.as_bytes()).into()
    }
}

/// An in-flight password submission.
pub struct UnlockAttempt {
    id: u64,
    password: Arc<Zeroizing<String>>,
    manifest: Arc<VaultManifest>,
    verifier: Arc<Verifier>,
}

/// What an attempt found, before fencing decides whether it counts.
#[derive(Debug)]
pub(crate) enum AttemptResult {
    Verified(DecryptedQuerySet),
    /// Wrong key or marker mismatch.  Deliberately carries no detail.
    WrongPassword,
    /// The verifier passed but `item` did not decrypt.
    ManifestCorrupt { item: String },
}

/// A finished attempt, to be handed back to `UnlockController::finish`.
#[derive(Debug)]
pub struct ResolvedAttempt {
    pub(crate) id: u64,
    pub(crate) result: AttemptResult,
}

impl ResolvedAttempt {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl UnlockAttempt {
    pub(crate) fn new(
        id: u64,
        password: Zeroizing<String>,
        manifest: Arc<VaultManifest>,
        verifier: Arc<Verifier>,
    ) -> Self {
        Self {
            id,
            password: Arc::new(password),
            manifest,
            verifier,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Verify the password against the verifier item, then decrypt the rest.
    pub async fn resolve(self) -> ResolvedAttempt {
        let result = self.run().await;
        ResolvedAttempt {
            id: self.id,
            result,
        }
    }

    async fn run(&self) -> AttemptResult {
        // Fall back to the first item if the configured verifier is absent.
        let verifier_item = match self
            .manifest
            .get(&self.verifier.name)
            .or_else(|| self.manifest.items.first())
        {
            Some(item) => item,
            None => return AttemptResult::WrongPassword,
        };
        let iterations = self.manifest.kdf.iterations;

        let verifier_text = match open_item(&self.password, verifier_item, iterations).await {
            Ok(text) if self.verifier.matches(&text) => text,
            _ => {
                debug!(attempt = self.id, "Verifier item rejected the password");
                return AttemptResult::WrongPassword;
            }
        };

        let rest: Vec<&QueryItem> = self
            .manifest
            .items
            .iter()
            .filter(|item| item.name != verifier_item.name)
            .collect();
        let opened = join_all(
            rest.iter()
                .map(|item| open_item(&self.password, item, iterations)),
        )
        .await;

        let mut queries = Vec::with_capacity(self.manifest.len());
        queries.push(DecryptedQuery {
            name: verifier_item.name.clone(),
            label: verifier_item.label.clone(),
            text: verifier_text,
        });
        for (item, text) in rest.into_iter().zip(opened) {
            match text {
                Ok(text) => queries.push(DecryptedQuery {
                    name: item.name.clone(),
                    label: item.label.clone(),
                    text,
                }),
                Err(_) => {
                    return AttemptResult::ManifestCorrupt {
                        item: item.name.clone(),
                    }
                }
            }
        }

        AttemptResult::Verified(DecryptedQuerySet::new(
            queries,
            verifier_item.name.clone(),
        ))
    }
}

/// Derive the item's key and open its ciphertext on the blocking pool.
async fn open_item(
    password: &Arc<Zeroizing<String>>,
    item: &QueryItem,
    iterations: u32,
) -> Result<String> {
    let password = Arc::clone(password);
    let salt = item.salt.clone();
    let nonce = item.nonce.clone();
    let ciphertext = item.ciphertext.clone();

    tokio::task::spawn_blocking(move || {
        let key = derive_key(password.as_bytes(), &salt, iterations)?;
        let plaintext = open(&key, &nonce, &ciphertext)?;
        String::from_utf8(plaintext).map_err(|_| QueryVaultError::DecryptionFailed)
    })
    .await
    .map_err(|e| QueryVaultError::UnlockTaskFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MIN_ITERATIONS;
    use crate::vault::{BundleBuilder, SourceDocument};

    const PASSWORD: &str = "build-password";

    fn manifest() -> VaultManifest {
        let docs = [
            SourceDocument {
                name: "q1.rq".into(),
                text: "# marker\nSELECT ?s {}\n".into(),
            },
            SourceDocument {
                name: "q2.rq".into(),
                text: "SELECT ?o {}\n".into(),
            },
        ];
        BundleBuilder::new(".")
            .iterations(MIN_ITERATIONS)
            .seal_documents(&docs, PASSWORD.as_bytes())
            .unwrap()
    }

    async fn resolve(manifest: VaultManifest, password: &str) -> AttemptResult {
        let attempt = UnlockAttempt::new(
            7,
            Zeroizing::new(password.to_string()),
            Arc::new(manifest),
            Arc::new(Verifier::new("q1.rq", "# marker")),
        );
        let resolved = attempt.resolve().await;
        assert_eq!(resolved.id(), 7);
        resolved.result
    }

    #[tokio::test]
    async fn tampered_item_after_verifier_is_manifest_corrupt() {
        let mut manifest = manifest();
        let q2 = manifest.items.iter_mut().find(|i| i.name == "q2.rq").unwrap();
        q2.ciphertext[0] ^= 0x01;

        match resolve(manifest, PASSWORD).await {
            AttemptResult::ManifestCorrupt { item } => assert_eq!(item, "q2.rq"),
            other => panic!("expected ManifestCorrupt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_password_is_not_manifest_corrupt() {
        let mut manifest = manifest();
        // Even with q2 damaged, a wrong key never gets past the verifier.
        manifest.items[1].ciphertext[0] ^= 0x01;

        assert!(matches!(
            resolve(manifest, "nope").await,
            AttemptResult::WrongPassword
        ));
    }

    #[tokio::test]
    async fn tampered_verifier_is_wrong_password() {
        let mut manifest = manifest();
        manifest.items[0].ciphertext[0] ^= 0x01;

        assert!(matches!(
            resolve(manifest, PASSWORD).await,
            AttemptResult::WrongPassword
        ));
    }

    #[tokio::test]
    async fn correct_password_verifies_everything() {
        match resolve(manifest(), PASSWORD).await {
            AttemptResult::Verified(set) => {
                assert_eq!(set.len(), 2);
                assert_eq!(set.default_query().unwrap().name, "q1.rq");
            }
            other => panic!("expected Verified, got {other:?}"),
        }
    }

    #[test]
    fn marker_must_be_whole_first_line() {
        let v = Verifier::new("q1.rq", "# marker");
        assert!(v.matches("# marker\nSELECT * {}"));
        assert!(v.matches("# marker\r\nSELECT * {}"));
        assert!(v.matches("# marker"));
        assert!(!v.matches("# marker extra\nSELECT"));
        assert!(!v.matches("SELECT\n# marker"));
        assert!(!v.matches(""));
    }
}
