//! Group hierarchy and tag classification.
//!
//! Groups form a tree through an optional parent reference. Deleting a group
//! detaches its children (they become roots) instead of deleting them.
//! Re-parenting rejects moves that would make a group its own ancestor.

use crate::db::Database;
use crate::error::{Result, VaultError};
use crate::models::{Entry, Group, Id, Tag};
use crate::utils::{self, TreeItem};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Navigation and classification over the group tree.
pub struct GroupHierarchy<'a> {
    db: &'a Database,
}

impl<'a> GroupHierarchy<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a group, optionally under an existing parent.
    pub fn create_group(&self, name: &str, parent_id: Option<Id>) -> Result<Group> {
        if let Some(parent_id) = parent_id {
            self.db.get_group(parent_id)?;
        }
        self.db.insert_group(name, parent_id)
    }

    pub fn rename_group(&self, group_id: Id, name: &str) -> Result<Group> {
        let group = self.db.get_group(group_id)?;
        self.db.update_group(group_id, name, group.parent_id)?;
        self.db.get_group(group_id)
    }

    /// Move a group under a new parent, or to the top level with `None`.
    pub fn set_parent(&self, group_id: Id, parent_id: Option<Id>) -> Result<Group> {
        let group = self.db.get_group(group_id)?;

        if let Some(parent_id) = parent_id {
            let parent = self.db.get_group(parent_id)?;
            let would_cycle = parent_id == group_id
                || self.ancestors(parent_id)?.iter().any(|g| g.id == group_id);
            if would_cycle {
                warn!(
                    "Rejected moving group '{}' under its descendant '{}'",
                    group.name, parent.name
                );
                return Err(VaultError::GroupCycle {
                    group: group.name,
                    parent: parent.name,
                });
            }
        }

        self.db.update_group(group_id, &group.name, parent_id)?;
        self.db.get_group(group_id)
    }

    /// Delete a group; children become top-level groups, entries are deleted.
    pub fn delete_group(&self, group_id: Id) -> Result<()> {
        self.db.delete_group(group_id)
    }

    /// Direct children, ordered by name.
    pub fn children(&self, group_id: Id) -> Result<Vec<Group>> {
        self.db.child_groups(group_id)
    }

    /// Ancestors from the direct parent up to the root.
    ///
    /// Stops at the first repeated group, so a cycle stored by some other
    /// writer cannot loop forever.
    pub fn ancestors(&self, group_id: Id) -> Result<Vec<Group>> {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::from([group_id]);
        let mut current = self.db.get_group(group_id)?.parent_id;

        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                warn!("Group #{} has a cyclic parent chain", group_id);
                break;
            }
            let parent = self.db.get_group(parent_id)?;
            current = parent.parent_id;
            ancestors.push(parent);
        }

        Ok(ancestors)
    }

    /// Every group below this one, depth first.
    pub fn descendants(&self, group_id: Id) -> Result<Vec<Group>> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([group_id]);
        self.collect_descendants(group_id, &mut seen, &mut out)?;
        Ok(out)
    }

    fn collect_descendants(
        &self,
        group_id: Id,
        seen: &mut HashSet<Id>,
        out: &mut Vec<Group>,
    ) -> Result<()> {
        for child in self.children(group_id)? {
            if seen.insert(child.id) {
                let child_id = child.id;
                out.push(child);
                self.collect_descendants(child_id, seen, out)?;
            }
        }
        Ok(())
    }

    pub fn roots(&self) -> Result<Vec<Group>> {
        self.db.root_groups()
    }

    /// Display path from the root, e.g. "personal/banking".
    pub fn path(&self, group_id: Id) -> Result<String> {
        let group = self.db.get_group(group_id)?;
        let mut names: Vec<String> = self
            .ancestors(group_id)?
            .into_iter()
            .rev()
            .map(|g| g.name)
            .collect();
        names.push(group.name);
        Ok(names.join("/"))
    }

    /// The whole forest as tree items, labelled by `label`.
    pub fn tree<F>(&self, label: F) -> Result<Vec<TreeItem>>
    where
        F: Fn(&Group) -> Result<String>,
    {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        for root in self.roots()? {
            seen.insert(root.id);
            items.push(TreeItem {
                branch: Vec::new(),
                label: label(&root)?,
            });
            self.tree_below(&root, &Vec::new(), &label, &mut seen, &mut items)?;
        }
        Ok(items)
    }

    fn tree_below<F>(
        &self,
        group: &Group,
        branch: &[bool],
        label: &F,
        seen: &mut HashSet<Id>,
        items: &mut Vec<TreeItem>,
    ) -> Result<()>
    where
        F: Fn(&Group) -> Result<String>,
    {
        let children = self.children(group.id)?;
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            if !seen.insert(child.id) {
                continue;
            }
            let mut child_branch = branch.to_vec();
            child_branch.push(i + 1 == count);
            items.push(TreeItem {
                branch: child_branch.clone(),
                label: label(&child)?,
            });
            self.tree_below(&child, &child_branch, label, seen, items)?;
        }
        Ok(())
    }

    /// Entries filed directly in the group, or in its whole subtree.
    pub fn entries_in(&self, group_id: Id, recursive: bool) -> Result<Vec<Entry>> {
        let mut entries = self.db.entries_in_group(group_id)?;
        if recursive {
            for group in self.descendants(group_id)? {
                entries.extend(self.db.entries_in_group(group.id)?);
            }
        }
        Ok(entries)
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    /// Create a tag. Without an explicit slug one is derived from the name.
    pub fn create_tag(&self, name: &str, slug: Option<&str>) -> Result<Tag> {
        let slug = match slug {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => utils::slugify(name),
        };
        self.db.insert_tag(name, &slug)
    }

    /// Rename a tag. The slug is kept unless it was never set.
    pub fn rename_tag(&self, tag_id: Id, name: &str) -> Result<Tag> {
        let mut tag = self.db.get_tag(tag_id)?;
        tag.name = name.to_string();
        if tag.slug.is_empty() {
            tag.slug = utils::slugify(name);
        }
        self.db.update_tag(&tag)?;
        debug!("Renamed tag id: {} to {}", tag_id, name);
        Ok(tag)
    }

    /// Delete a tag; groups carrying it simply lose it.
    pub fn delete_tag(&self, tag_id: Id) -> Result<()> {
        self.db.delete_tag(tag_id)
    }

    pub fn tag_group(&self, group_id: Id, tag_id: Id) -> Result<()> {
        self.db.add_group_tag(group_id, tag_id)
    }

    pub fn untag_group(&self, group_id: Id, tag_id: Id) -> Result<()> {
        self.db.remove_group_tag(group_id, tag_id)
    }

    /// Tags attached to a group, ordered by name.
    pub fn tags_of(&self, group_id: Id) -> Result<Vec<Tag>> {
        self.db.group_tags(group_id)
    }

    /// Comma separated tag names, for listings.
    pub fn tags_display(&self, group_id: Id) -> Result<String> {
        Ok(self
            .tags_of(group_id)?
            .into_iter()
            .map(|t| t.name)
            .collect::<Vec<_>>()
            .join(", "))
    }

    pub fn groups_tagged(&self, slug: &str) -> Result<Vec<Group>> {
        let tag = self.db.find_tag_by_slug(slug)?;
        self.db.groups_with_tag(tag.id)
    }
}
