//! Hierarchy lookup
//!
//! Partial addresses (a page or section known only by id) are expanded by
//! asking the host where the item lives. The lookup is the only suspension
//! point of a resolution.

use crate::{NavigationError, Result};
use std::collections::HashMap;

/// Where a page lives.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PageAncestry {
    pub notebook_id: String,
    pub section_id: String,
}

/// Where a section lives.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SectionAncestry {
    pub notebook_id: String,
}

/// Async access to the notebook/section/page hierarchy.
///
/// `Ok(None)` means the item does not exist; `Err` means the lookup itself
/// failed.
#[trait_variant::make(Send)]
pub trait HierarchyLookup: Send + Sync {
    /// Find the section and notebook containing a page.
    async fn lookup_page_ancestry(&self, page_id: &str) -> Result<Option<PageAncestry>>;

    /// Find the notebook containing a section.
    async fn lookup_section_ancestry(&self, section_id: &str) -> Result<Option<SectionAncestry>>;
}

/// In-memory hierarchy for tests and hosts that already hold the tree.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHierarchy {
    /// Section id -> notebook id.
    sections: HashMap<String, String>,
    /// Page id -> section id.
    pages: HashMap<String, String>,
    /// Ids whose lookups fail instead of answering.
    failing: Vec<String>,
}

impl InMemoryHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a section under a notebook.
    pub fn add_section(&mut self, notebook_id: &str, section_id: &str) -> &mut Self {
        self.sections
            .insert(section_id.to_string(), notebook_id.to_string());
        self
    }

    /// Register a page under a section.
    pub fn add_page(&mut self, section_id: &str, page_id: &str) -> &mut Self {
        self.pages.insert(page_id.to_string(), section_id.to_string());
        self
    }

    /// Make lookups of this id fail with a backend error.
    pub fn fail_on(&mut self, id: &str) -> &mut Self {
        self.failing.push(id.to_string());
        self
    }

    fn check(&self, id: &str) -> Result<()> {
        if self.failing.iter().any(|f| f == id) {
            Err(NavigationError::LookupFailed(format!("backend unavailable for {}", id)))
        } else {
            Ok(())
        }
    }
}

impl HierarchyLookup for InMemoryHierarchy {
    async fn lookup_page_ancestry(&self, page_id: &str) -> Result<Option<PageAncestry>> {
        self.check(page_id)?;
        let Some(section_id) = self.pages.get(page_id) else {
            return Ok(None);
        };
        Ok(self.sections.get(section_id).map(|notebook_id| PageAncestry {
            notebook_id: notebook_id.clone(),
            section_id: section_id.clone(),
        }))
    }

    async fn lookup_section_ancestry(&self, section_id: &str) -> Result<Option<SectionAncestry>> {
        self.check(section_id)?;
        Ok(self
            .sections
            .get(section_id)
            .map(|notebook_id| SectionAncestry {
                notebook_id: notebook_id.clone(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> InMemoryHierarchy {
        let mut h = InMemoryHierarchy::new();
        h.add_section("nb", "sec").add_page("sec", "page");
        h
    }

    #[tokio::test]
    async fn test_page_ancestry() {
        let h = hierarchy();
        let found = h.lookup_page_ancestry("page").await.unwrap();
        assert_eq!(
            found,
            Some(PageAncestry {
                notebook_id: "nb".into(),
                section_id: "sec".into(),
            })
        );
        assert_eq!(h.lookup_page_ancestry("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_section_ancestry_and_failure() {
        let mut h = hierarchy();
        let found = h.lookup_section_ancestry("sec").await.unwrap();
        assert_eq!(found.map(|a| a.notebook_id), Some("nb".to_string()));

        h.fail_on("sec");
        assert!(h.lookup_section_ancestry("sec").await.is_err());
    }
}
