//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] keeps all heads in a `HashMap` protected by a
//! `RwLock`. Compare-and-swap compares and swaps under the write lock,
//! which makes it atomic with respect to concurrent callers.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use catena_types::ObjId;

use crate::error::{RefError, RefResult};
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::{CasOutcome, Reference};

/// An in-memory implementation of [`RefStore`].
///
/// All data lives in a `HashMap` behind a `RwLock`. Data is lost when the
/// store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<HashMap<String, ObjId>>,
}

impl InMemoryRefStore {
    /// Create a new empty reference store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> RefResult<Option<Reference>> {
        let refs = self.refs.read().expect("lock poisoned");
        Ok(refs.get(name).map(|head| Reference::new(name, *head)))
    }

    fn create_ref(&self, name: &str, head: ObjId) -> RefResult<Reference> {
        validate_ref_name(name)?;
        if head.is_null() {
            return Err(RefError::NullHead {
                name: name.to_string(),
            });
        }

        let mut refs = self.refs.write().expect("lock poisoned");
        if refs.contains_key(name) {
            return Err(RefError::AlreadyExists {
                name: name.to_string(),
            });
        }
        refs.insert(name.to_string(), head);
        debug!(name, head = %head.short_hex(), "created reference");
        Ok(Reference::new(name, head))
    }

    fn compare_and_set(
        &self,
        name: &str,
        expected: &ObjId,
        new: &ObjId,
    ) -> RefResult<CasOutcome> {
        if new.is_null() {
            return Err(RefError::NullHead {
                name: name.to_string(),
            });
        }

        let mut refs = self.refs.write().expect("lock poisoned");
        let Some(current) = refs.get_mut(name) else {
            return Err(RefError::NotFound {
                name: name.to_string(),
            });
        };
        if current != expected {
            debug!(
                name,
                expected = %expected.short_hex(),
                actual = %current.short_hex(),
                "CAS conflict"
            );
            return Ok(CasOutcome::Conflict { actual: *current });
        }
        *current = *new;
        debug!(name, head = %new.short_hex(), "advanced reference");
        Ok(CasOutcome::Committed)
    }

    fn delete_ref(&self, name: &str, expected: &ObjId) -> RefResult<CasOutcome> {
        let mut refs = self.refs.write().expect("lock poisoned");
        let Some(current) = refs.get(name) else {
            return Err(RefError::NotFound {
                name: name.to_string(),
            });
        };
        if current != expected {
            return Ok(CasOutcome::Conflict { actual: *current });
        }
        refs.remove(name);
        debug!(name, "deleted reference");
        Ok(CasOutcome::Committed)
    }

    fn list_refs(&self, prefix: &str) -> RefResult<Vec<Reference>> {
        let refs = self.refs.read().expect("lock poisoned");
        let mut result: Vec<Reference> = refs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, head)| Reference::new(name.clone(), *head))
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }
}
