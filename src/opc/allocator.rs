//! Collision-free allocation of numbered identifiers.
//!
//! Page ids (`3`), relationship ids (`rId3`) and page filenames (`page3.xml`)
//! all follow the same shape: a fixed prefix, a decimal number, a fixed suffix.
//! [`NumberingPolicy`] captures one such convention and [`PartAllocator`]
//! bundles the three used when a page is added. Allocation always yields
//! `max(existing) + 1`; gaps are never reused.

use crate::opc::error::{OpcError, Result};
use serde::{Deserialize, Serialize};

/// One `prefix + number + suffix` naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingPolicy {
    pub prefix: String,
    pub suffix: String,
}

impl NumberingPolicy {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Bare decimal page ids: `1`, `2`, ...
    pub fn page_id() -> Self {
        Self::new("", "")
    }

    /// Relationship ids: `rId1`, `rId2`, ...
    pub fn rel_id() -> Self {
        Self::new("rId", "")
    }

    /// Page part filenames: `page1.xml`, `page2.xml`, ...
    pub fn page_filename() -> Self {
        Self::new("page", ".xml")
    }

    /// Numeric token of `name`, or `None` if it does not follow this convention.
    pub fn number_of(&self, name: &str) -> Option<u32> {
        let digits = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        atoi_simd::parse::<u32, false, false>(digits.as_bytes()).ok()
    }

    /// Format `n` with this convention.
    pub fn format(&self, n: u32) -> String {
        let mut buffer = itoa::Buffer::new();
        let digits = buffer.format(n);
        let mut out = String::with_capacity(self.prefix.len() + digits.len() + self.suffix.len());
        out.push_str(&self.prefix);
        out.push_str(digits);
        out.push_str(&self.suffix);
        out
    }

    /// Next free name after every conforming name in `existing`.
    ///
    /// Names that do not follow the convention are skipped. An empty input
    /// allocates `1`.
    pub fn next<'a, I>(&self, kind: &'static str, existing: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max = existing
            .into_iter()
            .filter_map(|name| {
                let n = self.number_of(name);
                if n.is_none() {
                    log::trace!("skipping non-conforming {} '{}'", kind, name);
                }
                n
            })
            .max()
            .unwrap_or(0);

        let next = max.checked_add(1).ok_or_else(|| OpcError::AllocationConflict {
            kind,
            value: self.format(max),
        })?;
        Ok(self.format(next))
    }
}

/// The identifiers allocated for one new page, computed from a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAllocation {
    pub id: String,
    pub r_id: String,
    pub filename: String,
}

/// Identifiers of an existing page, as seen by the allocator.
#[derive(Debug, Clone, Copy)]
pub struct AllocatedKeys<'a> {
    pub id: &'a str,
    pub r_id: &'a str,
    pub filename: &'a str,
}

/// Allocates page ids, relationship ids and page filenames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartAllocator {
    pub page_id: NumberingPolicy,
    pub rel_id: NumberingPolicy,
    pub page_filename: NumberingPolicy,
}

impl Default for PartAllocator {
    fn default() -> Self {
        Self {
            page_id: NumberingPolicy::page_id(),
            rel_id: NumberingPolicy::rel_id(),
            page_filename: NumberingPolicy::page_filename(),
        }
    }
}

impl PartAllocator {
    pub fn new(
        page_id: NumberingPolicy,
        rel_id: NumberingPolicy,
        page_filename: NumberingPolicy,
    ) -> Self {
        Self {
            page_id,
            rel_id,
            page_filename,
        }
    }

    pub fn next_page_id<'a, I: IntoIterator<Item = &'a str>>(&self, ids: I) -> Result<String> {
        self.page_id.next("page id", ids)
    }

    pub fn next_rel_id<'a, I: IntoIterator<Item = &'a str>>(&self, r_ids: I) -> Result<String> {
        self.rel_id.next("relationship id", r_ids)
    }

    pub fn next_filename<'a, I: IntoIterator<Item = &'a str>>(&self, filenames: I) -> Result<String> {
        self.page_filename.next("page filename", filenames)
    }

    /// Plan id, relationship id and filename for a new page from the current pages.
    ///
    /// Nothing is mutated; the caller applies the plan once every collision
    /// check has passed.
    pub fn plan<'a, I>(&self, existing: I) -> Result<PageAllocation>
    where
        I: IntoIterator<Item = AllocatedKeys<'a>>,
    {
        let keys: Vec<AllocatedKeys<'a>> = existing.into_iter().collect();
        Ok(PageAllocation {
            id: self.next_page_id(keys.iter().map(|k| k.id))?,
            r_id: self.next_rel_id(keys.iter().map(|k| k.r_id))?,
            filename: self.next_filename(keys.iter().map(|k| k.filename))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn keys<'a>(entries: &'a [(&'a str, &'a str, &'a str)]) -> Vec<AllocatedKeys<'a>> {
        entries
            .iter()
            .map(|&(id, r_id, filename)| AllocatedKeys {
                id,
                r_id,
                filename,
            })
            .collect()
    }

    #[test]
    fn test_empty_collection_allocates_one() {
        let plan = PartAllocator::default().plan(Vec::new()).unwrap();
        assert_eq!(plan.id, "1");
        assert_eq!(plan.r_id, "rId1");
        assert_eq!(plan.filename, "page1.xml");
    }

    #[test]
    fn test_gaps_are_not_reused() {
        let entries = [("1", "rId1", "page1.xml"), ("3", "rId3", "page3.xml")];
        let plan = PartAllocator::default().plan(keys(&entries)).unwrap();
        assert_eq!(plan.id, "4");
        assert_eq!(plan.r_id, "rId4");
        assert_eq!(plan.filename, "page4.xml");
    }

    #[test]
    fn test_each_convention_is_independent() {
        let entries = [("7", "rId2", "page1.xml"), ("0", "rId5", "page9.xml")];
        let plan = PartAllocator::default().plan(keys(&entries)).unwrap();
        assert_eq!(plan.id, "8");
        assert_eq!(plan.r_id, "rId6");
        assert_eq!(plan.filename, "page10.xml");
    }

    #[test]
    fn test_number_of_strict_tokens() {
        let policy = NumberingPolicy::page_filename();
        assert_eq!(policy.number_of("page12.xml"), Some(12));
        assert_eq!(policy.number_of("page.xml"), None);
        assert_eq!(policy.number_of("page1a.xml"), None);
        assert_eq!(policy.number_of("Page1.xml"), None);
        assert_eq!(policy.number_of("background1.xml"), None);

        let rel = NumberingPolicy::rel_id();
        assert_eq!(rel.number_of("rId007"), Some(7));
        assert_eq!(rel.number_of("rId-1"), None);
    }

    #[test]
    fn test_non_conforming_names_are_skipped() {
        let next = NumberingPolicy::rel_id()
            .next("relationship id", ["rIdX", "rId2", "custom"])
            .unwrap();
        assert_eq!(next, "rId3");
    }

    #[test]
    fn test_overflow_is_conflict() {
        let max = u32::MAX.to_string();
        let err = NumberingPolicy::page_id()
            .next("page id", [max.as_str()])
            .unwrap_err();
        assert!(matches!(err, OpcError::AllocationConflict { kind: "page id", .. }));
    }

    #[test]
    fn test_custom_policy() {
        let allocator = PartAllocator::new(
            NumberingPolicy::new("p-", ""),
            NumberingPolicy::new("R", "x"),
            NumberingPolicy::new("sheet_", ".xml"),
        );
        let entries = [("p-4", "R2x", "sheet_8.xml")];
        let plan = allocator.plan(keys(&entries)).unwrap();
        assert_eq!(plan.id, "p-5");
        assert_eq!(plan.r_id, "R3x");
        assert_eq!(plan.filename, "sheet_9.xml");
    }

    proptest! {
        #[test]
        fn prop_next_is_max_plus_one(numbers in proptest::collection::vec(0u32..100_000, 0..20)) {
            let policy = NumberingPolicy::rel_id();
            let names: Vec<String> = numbers.iter().map(|n| policy.format(*n)).collect();
            let next = policy.next("relationship id", names.iter().map(String::as_str)).unwrap();
            let expected = numbers.iter().copied().max().unwrap_or(0) + 1;
            prop_assert_eq!(policy.number_of(&next), Some(expected));
            prop_assert!(!names.contains(&next));
        }
    }
}
