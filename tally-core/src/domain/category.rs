//! Category tree

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Paths longer than this are cut off
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<u32>,
}

/// Categories keyed by id, parents resolved by lookup
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    by_id: HashMap<u32, Category>,
}

impl CategoryTree {
    pub fn new(categories: &[Category]) -> Self {
        let by_id = categories.iter().map(|c| (c.id, c.clone())).collect();
        Self { by_id }
    }

    pub fn get(&self, id: u32) -> Option<&Category> {
        self.by_id.get(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Category> {
        // lowest id wins when names repeat
        self.by_id
            .values()
            .filter(|c| c.name.eq_ignore_ascii_case(name))
            .min_by_key(|c| c.id)
    }

    /// Names from the root down to `id`
    ///
    /// Stops at a missing parent, at an id already on the path, or at
    /// `MAX_DEPTH` entries.
    pub fn path(&self, id: u32) -> Vec<String> {
        let mut names = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(id);

        while let Some(cid) = current {
            if names.len() >= MAX_DEPTH || !visited.insert(cid) {
                tracing::warn!(category_id = id, "Category parent chain truncated");
                break;
            }
            let Some(category) = self.by_id.get(&cid) else {
                break;
            };
            names.push(category.name.clone());
            current = category.parent_id;
        }

        names.reverse();
        names
    }

    /// `path` joined with " > ", or the name itself when unknown
    pub fn display_path(&self, name: &str) -> String {
        match self.find_by_name(name) {
            Some(category) => self.path(category.id).join(" > "),
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: u32, name: &str, parent_id: Option<u32>) -> Category {
        Category {
            id,
            name: name.to_string(),
            parent_id,
        }
    }

    #[test]
    fn test_path_root_first() {
        let tree = CategoryTree::new(&[
            cat(1, "Food", None),
            cat(2, "Restaurants", Some(1)),
            cat(3, "Coffee", Some(2)),
        ]);
        assert_eq!(tree.path(3), vec!["Food", "Restaurants", "Coffee"]);
        assert_eq!(tree.display_path("coffee"), "Food > Restaurants > Coffee");
        assert_eq!(tree.display_path("Unknown"), "Unknown");
    }

    #[test]
    fn test_cycle_terminates() {
        let tree = CategoryTree::new(&[cat(1, "A", Some(2)), cat(2, "B", Some(1))]);
        assert_eq!(tree.path(1), vec!["B", "A"]);

        let self_loop = CategoryTree::new(&[cat(7, "Loop", Some(7))]);
        assert_eq!(self_loop.path(7), vec!["Loop"]);
    }

    #[test]
    fn test_missing_parent_stops() {
        let tree = CategoryTree::new(&[cat(2, "Orphan", Some(99))]);
        assert_eq!(tree.path(2), vec!["Orphan"]);
        assert!(tree.path(42).is_empty());
    }

    #[test]
    fn test_depth_cap() {
        let chain: Vec<Category> = (0..100)
            .map(|i| cat(i, &format!("c{}", i), if i == 0 { None } else { Some(i - 1) }))
            .collect();
        let tree = CategoryTree::new(&chain);
        assert_eq!(tree.path(99).len(), MAX_DEPTH);
    }
}
