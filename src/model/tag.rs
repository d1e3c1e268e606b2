use derive_more::Display;
use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeSet;

#[derive(Debug, Serialize, FromRow, Clone, PartialEq)]
pub struct ParentTag {
    pub id: i64,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Serialize, FromRow, Clone, PartialEq)]
pub struct ChildTag {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub parent_tag_id: i64,
}

/// A snapshot of the two-level tag hierarchy.
///
/// Category addresses are resolved against a snapshot so that a single
/// feed request sees one consistent taxonomy.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    pub parents: Vec<ParentTag>,
    pub children: Vec<ChildTag>,
}

/// Address keywords that select an ordering or membership strategy instead of tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Keyword {
    #[display("home")]
    Home,
    #[display("popular")]
    Popular,
    #[display("saved")]
    Saved,
}

/// The resolved form of a category address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    ByTagSet(BTreeSet<i64>),
    ByKeyword(Keyword),
}

impl FilterSpec {
    pub fn empty() -> Self {
        FilterSpec::ByTagSet(BTreeSet::new())
    }
}

#[derive(Debug, Serialize)]
pub struct TaxonomyNode {
    #[serde(flatten)]
    pub parent: ParentTag,
    pub children: Vec<ChildTag>,
}
