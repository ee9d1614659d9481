//! The plaintext query set published after a verified unlock.

use std::collections::BTreeMap;

/// One decrypted query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedQuery {
    pub name: String,
    pub label: String,
    pub text: String,
}

/// Every query in the vault, decrypted, keyed and ordered by name.
///
/// Only ever built whole: the controller publishes a complete set or
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedQuerySet {
    queries: BTreeMap<String, DecryptedQuery>,
    default_name: String,
}

impl DecryptedQuerySet {
    pub(crate) fn new(queries: Vec<DecryptedQuery>, default_name: String) -> Self {
        let queries = queries
            .into_iter()
            .map(|q| (q.name.clone(), q))
            .collect();
        Self {
            queries,
            default_name,
        }
    }

    /// Look up a query by its vault name.
    pub fn get(&self, name: &str) -> Option<&DecryptedQuery> {
        self.queries.get(name)
    }

    /// Plaintext of a query by name.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.queries.get(name).map(|q| q.text.as_str())
    }

    /// The query to select first: the one the password was verified against.
    pub fn default_query(&self) -> Option<&DecryptedQuery> {
        self.queries.get(&self.default_name)
    }

    /// Queries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &DecryptedQuery> {
        self.queries.values()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
