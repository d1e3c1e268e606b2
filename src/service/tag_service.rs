use crate::errors::ApiResult;
use crate::model::tag::{ChildTag, FilterSpec, Keyword, ParentTag, Taxonomy, TaxonomyNode};
use crate::util::common::fold_case;
use sqlx::{query_as, SqliteConnection};
use std::collections::BTreeSet;

impl Taxonomy {
    pub async fn load(conn: &mut SqliteConnection) -> ApiResult<Taxonomy> {
        let parents = query_as::<_, ParentTag>("SELECT id, code, name FROM parent_tags ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;

        let children = query_as::<_, ChildTag>(
            "SELECT id, code, name, parent_tag_id FROM child_tags ORDER BY id",
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(Taxonomy { parents, children })
    }

    /// Resolves a category address into a filter.
    ///
    /// Accepted forms:
    /// - `""`, `"/"`, `"home"`, `"popular"`, `"saved"` (optionally with a leading slash)
    /// - `"/parent"`: every child of the parent with that code
    /// - `"/parent/child"`: the child with that code under that parent
    /// - anything else: an exact display-name lookup
    ///
    /// Misses are an empty tag set, never an error.
    pub fn resolve(&self, path: &str) -> FilterSpec {
        let path = path.trim();

        if let Some(keyword) = parse_keyword(path) {
            return FilterSpec::ByKeyword(keyword);
        }

        if let Some(rest) = path.strip_prefix('/') {
            let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

            match segments.as_slice() {
                [parent_code] => {
                    if let Some(parent) = self.parents.iter().find(|p| p.code == *parent_code) {
                        return FilterSpec::ByTagSet(self.children_of(parent.id));
                    }
                    return self.resolve_name(parent_code);
                }
                [parent_code, child_code] => {
                    let child = self.parents.iter().find(|p| p.code == *parent_code).and_then(
                        |parent| {
                            self.children
                                .iter()
                                .find(|c| c.parent_tag_id == parent.id && c.code == *child_code)
                        },
                    );

                    return match child {
                        Some(child) => FilterSpec::ByTagSet(BTreeSet::from([child.id])),
                        None => self.resolve_name(child_code),
                    };
                }
                _ => {}
            }
        }

        self.resolve_name(path)
    }

    /// Exact display-name match, children before parents.
    fn resolve_name(&self, name: &str) -> FilterSpec {
        if let Some(child) = self.children.iter().find(|c| c.name == name) {
            return FilterSpec::ByTagSet(BTreeSet::from([child.id]));
        }
        if let Some(parent) = self.parents.iter().find(|p| p.name == name) {
            return FilterSpec::ByTagSet(self.children_of(parent.id));
        }
        FilterSpec::empty()
    }

    pub fn children_of(&self, parent_id: i64) -> BTreeSet<i64> {
        self.children
            .iter()
            .filter(|c| c.parent_tag_id == parent_id)
            .map(|c| c.id)
            .collect()
    }

    /// Finds a child tag by display name, falling back to its code.
    pub fn find_child(&self, name_or_code: &str) -> Option<&ChildTag> {
        self.children
            .iter()
            .find(|c| c.name == name_or_code)
            .or_else(|| self.children.iter().find(|c| c.code == name_or_code))
    }

    /// Finds a parent tag by display name, falling back to its code.
    pub fn find_parent(&self, name_or_code: &str) -> Option<&ParentTag> {
        self.parents
            .iter()
            .find(|p| p.name == name_or_code)
            .or_else(|| self.parents.iter().find(|p| p.code == name_or_code))
    }

    /// Child and parent tags whose display name contains any of the folded `keywords`.
    pub fn matching_names(&self, keywords: &[String]) -> (BTreeSet<i64>, BTreeSet<i64>) {
        let matches = |name: &str| {
            let name = fold_case(name);
            keywords.iter().any(|k| name.contains(k.as_str()))
        };

        let child_ids = self.children.iter().filter(|c| matches(&c.name)).map(|c| c.id).collect();
        let parent_ids = self.parents.iter().filter(|p| matches(&p.name)).map(|p| p.id).collect();
        (child_ids, parent_ids)
    }

    pub fn into_tree(self) -> Vec<TaxonomyNode> {
        let Taxonomy { parents, children } = self;
        parents
            .into_iter()
            .map(|parent| {
                let children = children
                    .iter()
                    .filter(|c| c.parent_tag_id == parent.id)
                    .cloned()
                    .collect();
                TaxonomyNode { parent, children }
            })
            .collect()
    }
}

fn parse_keyword(path: &str) -> Option<Keyword> {
    match path.strip_prefix('/').unwrap_or(path) {
        "" | "home" => Some(Keyword::Home),
        "popular" => Some(Keyword::Popular),
        "saved" => Some(Keyword::Saved),
        _ => None,
    }
}
