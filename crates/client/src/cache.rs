use common::types::GroupRecord;

/// An edit staged ahead of the server's answer. Staged edits render on top
/// of the authoritative list and are dropped wholesale once the server
/// responds with a fresh one.
#[derive(Clone, Debug)]
pub enum PendingChange {
    Add(GroupRecord),
    Update(GroupRecord),
    Remove(String),
}

/// Local mirror of the server-side group collection.
///
/// The authoritative list only ever changes by replacement with a server
/// response; staged edits live in a separate overlay so a failed request
/// never leaks half-applied state into the mirror.
#[derive(Clone, Debug, Default)]
pub struct GroupCache {
    groups: Vec<GroupRecord>,
    pending: Vec<PendingChange>,
    loading: bool,
}

impl GroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Adopt a server response as the new authoritative list. Every staged
    /// edit is discarded, answered or not.
    pub fn set_groups(&mut self, groups: Vec<GroupRecord>) {
        self.groups = groups;
        self.pending.clear();
    }

    pub fn stage_add(&mut self, group: GroupRecord) {
        self.pending.push(PendingChange::Add(group));
    }

    pub fn stage_update(&mut self, group: GroupRecord) {
        self.pending.push(PendingChange::Update(group));
    }

    pub fn stage_remove(&mut self, id: impl Into<String>) {
        self.pending.push(PendingChange::Remove(id.into()));
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Authoritative list with staged edits applied in the order they were
    /// staged. Additions land at the end, in server order otherwise.
    pub fn groups(&self) -> Vec<GroupRecord> {
        let mut view = self.groups.clone();
        for change in &self.pending {
            match change {
                PendingChange::Add(record) => view.push(record.clone()),
                PendingChange::Update(record) => {
                    if let Some(slot) = view.iter_mut().find(|g| g.id == record.id) {
                        *slot = record.clone();
                    }
                }
                PendingChange::Remove(id) => view.retain(|g| g.id != *id),
            }
        }
        view
    }

    /// Groups not explicitly disabled.
    pub fn active_groups(&self) -> Vec<GroupRecord> {
        self.groups().into_iter().filter(|g| g.enabled).collect()
    }

    pub fn group_by_id(&self, id: &str) -> Option<GroupRecord> {
        self.groups().into_iter().find(|g| g.id == id)
    }

    /// Every group whose member list contains `node_id`.
    pub fn groups_for_node(&self, node_id: &str) -> Vec<GroupRecord> {
        self.groups()
            .into_iter()
            .filter(|g| g.node_ids.iter().any(|n| n == node_id))
            .collect()
    }
}
