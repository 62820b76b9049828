//! Navigation addresses and their specificity ordering.

use serde::{Deserialize, Serialize};

/// How deep into the hierarchy an address reaches.
///
/// Ordered so that a page target outranks a section target, which outranks a
/// notebook target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Specificity {
    None = 0,
    Notebook = 1,
    Section = 2,
    Page = 3,
}

/// A fully anchored location: a notebook plus optional narrower levels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavAddress {
    pub notebook_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
}

impl NavAddress {
    pub fn notebook(notebook_id: impl Into<String>) -> Self {
        Self {
            notebook_id: notebook_id.into(),
            ..Default::default()
        }
    }

    pub fn section(notebook_id: impl Into<String>, section_id: impl Into<String>) -> Self {
        Self {
            notebook_id: notebook_id.into(),
            section_id: Some(section_id.into()),
            ..Default::default()
        }
    }

    pub fn page(
        notebook_id: impl Into<String>,
        section_id: impl Into<String>,
        page_id: impl Into<String>,
    ) -> Self {
        Self {
            notebook_id: notebook_id.into(),
            section_id: Some(section_id.into()),
            page_id: Some(page_id.into()),
            block_id: None,
        }
    }

    pub fn with_block(mut self, block_id: impl Into<String>) -> Self {
        self.block_id = Some(block_id.into());
        self
    }

    /// The deepest level this address names.
    pub fn specificity(&self) -> Specificity {
        if self.page_id.is_some() {
            Specificity::Page
        } else if self.section_id.is_some() {
            Specificity::Section
        } else if self.notebook_id.is_empty() {
            Specificity::None
        } else {
            Specificity::Notebook
        }
    }

    /// Two addresses are consistent when they agree on the notebook and, if
    /// both name a section, on the section.
    pub fn is_consistent_with(&self, other: &NavAddress) -> bool {
        if self.notebook_id != other.notebook_id {
            return false;
        }
        match (&self.section_id, &other.section_id) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

/// An address that may lack its notebook (and section) and must be expanded
/// through a hierarchy lookup before use.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialAddress {
    #[serde(default)]
    pub notebook_id: Option<String>,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub block_id: Option<String>,
}

impl PartialAddress {
    /// A link to a page known only by id.
    pub fn page(page_id: impl Into<String>) -> Self {
        Self {
            page_id: Some(page_id.into()),
            ..Default::default()
        }
    }

    /// A link to a section known only by id.
    pub fn section(section_id: impl Into<String>) -> Self {
        Self {
            section_id: Some(section_id.into()),
            ..Default::default()
        }
    }

    pub fn with_block(mut self, block_id: impl Into<String>) -> Self {
        self.block_id = Some(block_id.into());
        self
    }
}

impl From<NavAddress> for PartialAddress {
    fn from(address: NavAddress) -> Self {
        Self {
            notebook_id: Some(address.notebook_id),
            section_id: address.section_id,
            page_id: address.page_id,
            block_id: address.block_id,
        }
    }
}

/// Which notebook, section and page the host currently shows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSelection {
    pub notebook_id: Option<String>,
    pub section_id: Option<String>,
    pub page_id: Option<String>,
}

impl ActiveSelection {
    pub fn new(
        notebook_id: Option<&str>,
        section_id: Option<&str>,
        page_id: Option<&str>,
    ) -> Self {
        Self {
            notebook_id: notebook_id.map(str::to_string),
            section_id: section_id.map(str::to_string),
            page_id: page_id.map(str::to_string),
        }
    }

    /// The address a hash should carry for this selection. Lower levels are
    /// only included while every level above them is set.
    pub fn to_address(&self) -> Option<NavAddress> {
        let notebook_id = self.notebook_id.clone()?;
        let section_id = self.section_id.clone();
        let page_id = section_id.as_ref().and(self.page_id.clone());
        Some(NavAddress {
            notebook_id,
            section_id,
            page_id,
            block_id: None,
        })
    }
}
