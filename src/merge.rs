//! Attribute merge policy: first non-empty value wins.
//!
//! Entity records are progressively enriched from partial, possibly
//! conflicting dictionaries describing the same id. Rather than writing
//! merge logic at every call site, each field goes through [`merge`]:
//!
//! 1. slot unset → apply
//! 2. slot present but empty → apply
//! 3. candidate non-empty → apply (overwrite)
//! 4. otherwise → leave the slot untouched, report not-applied
//!
//! A refused overwrite is not an error; it is logged at debug level and
//! skipped. Re-supplying a value identical to the current one leaves
//! the slot unchanged and reports not-applied, so repeated construction
//! from the same dictionary is observably idempotent.
//!
//! # Empty vs absent
//!
//! A caller that wants to *clear* a field and a caller that simply did
//! not supply a value both used to present as "empty". [`Patch`] makes
//! the distinction explicit: a missing dictionary key becomes
//! [`Patch::Unspecified`] (never touches the slot), an explicit JSON
//! `null` becomes [`Patch::Clear`] (applies only against empty slots,
//! same rule order as above), and everything else is [`Patch::Value`].

/// Tri-state field update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// No value was supplied; the slot is left untouched.
    #[default]
    Unspecified,
    /// An explicit empty was supplied; clears the slot if the slot is
    /// itself empty, refused otherwise.
    Clear,
    /// A value was supplied.
    Value(T),
}

impl<T> Patch<T> {
    /// True if this patch carries a value.
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, Patch::Value(_))
    }

    /// Map the carried value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Unspecified => Patch::Unspecified,
            Patch::Clear => Patch::Clear,
            Patch::Value(v) => Patch::Value(f(v)),
        }
    }
}

/// Emptiness test used by the merge rules.
///
/// "Empty" mirrors the source dictionaries: empty string, empty
/// sequence, empty set. Scalars like numbers are never empty.
pub trait Fill {
    /// True if the value counts as empty for merge purposes.
    fn is_vacant(&self) -> bool;
}

impl Fill for String {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Fill for Vec<T> {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Ord> Fill for std::collections::BTreeSet<T> {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

impl Fill for f64 {
    fn is_vacant(&self) -> bool {
        false
    }
}

impl Fill for serde_json::Map<String, serde_json::Value> {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

/// Merge a patch into an optional slot. Returns whether the patch was
/// applied.
pub fn merge<T: Fill + PartialEq>(
    field: &'static str,
    slot: &mut Option<T>,
    patch: Patch<T>,
) -> bool {
    let vacant = slot.as_ref().map_or(true, Fill::is_vacant);
    match patch {
        Patch::Unspecified => false,
        Patch::Clear => {
            if slot.is_none() {
                false
            } else if vacant {
                *slot = None;
                true
            } else {
                log::debug!("field `{field}` was not cleared: a value is already set");
                false
            }
        }
        Patch::Value(candidate) => {
            if slot.as_ref() == Some(&candidate) {
                return false;
            }
            if vacant || !candidate.is_vacant() {
                *slot = Some(candidate);
                true
            } else {
                log::debug!("field `{field}` was not overridden: candidate is empty");
                false
            }
        }
    }
}

/// Merge a patch into a required (non-optional) collection-like slot.
///
/// Same rules as [`merge`], with `Clear` emptying the slot via
/// `Default` when allowed.
pub fn merge_seq<T: Fill + Default + PartialEq>(
    field: &'static str,
    slot: &mut T,
    patch: Patch<T>,
) -> bool {
    match patch {
        Patch::Unspecified => false,
        Patch::Clear => {
            if !slot.is_vacant() {
                log::debug!("field `{field}` was not cleared: a value is already set");
            }
            false
        }
        Patch::Value(candidate) => {
            if *slot == candidate {
                return false;
            }
            if slot.is_vacant() || !candidate.is_vacant() {
                *slot = candidate;
                true
            } else {
                log::debug!("field `{field}` was not overridden: candidate is empty");
                false
            }
        }
    }
}
