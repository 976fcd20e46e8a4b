use std::collections::HashSet;

use crate::error::SessionStoreError;
use crate::schema::SessionEntry;
use crate::store::SessionStore;

impl SessionStore {
    /// Entries on the branch ending at `target_leaf` (or the current leaf),
    /// oldest first.
    pub fn replay_leaf(
        &self,
        target_leaf: Option<&str>,
    ) -> Result<Vec<&SessionEntry>, SessionStoreError> {
        let Some(leaf_id) = target_leaf.or(self.current_leaf_id.as_deref()) else {
            return Ok(Vec::new());
        };

        let mut branch = Vec::new();
        let mut visited = HashSet::new();
        let mut next_id = Some(leaf_id);

        while let Some(id) = next_id {
            let index = *self
                .index_by_id
                .get(id)
                .ok_or_else(|| SessionStoreError::UnknownLeafId {
                    path: self.path.clone(),
                    leaf_id: id.to_string(),
                })?;
            if !visited.insert(index) {
                return Err(SessionStoreError::ReplayCycle {
                    path: self.path.clone(),
                    leaf_id: leaf_id.to_string(),
                });
            }

            let entry = &self.entries[index];
            branch.push(entry);
            next_id = entry.parent_id.as_deref();
        }

        branch.reverse();
        Ok(branch)
    }
}
