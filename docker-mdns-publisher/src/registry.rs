use std::collections::HashMap;
use shared::types::ContainerId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("container {0} already has published records")]
    AlreadyRegistered(ContainerId),
    #[error("container {0} has no published records")]
    NotRegistered(ContainerId),
}

/// Proof that a container id had no outstanding records when publishing began.
/// Required by [`RecordRegistry::commit`].
#[derive(Debug)]
pub struct RegistrationPermit {
    id: ContainerId,
}

/// Which container owns which announcer handles.
///
/// An id is present only while it owns at least one handle, and its handles
/// leave together.
#[derive(Debug)]
pub struct RecordRegistry<H> {
    records: HashMap<ContainerId, Vec<H>>,
}

impl<H> RecordRegistry<H> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    pub fn begin_registration(&self, id: &ContainerId) -> Result<RegistrationPermit, RegistryError> {
        if self.records.contains_key(id) {
            return Err(RegistryError::AlreadyRegistered(id.clone()));
        }
        Ok(RegistrationPermit { id: id.clone() })
    }

    pub fn commit(&mut self, permit: &RegistrationPermit, handle: H) {
        self.records.entry(permit.id.clone()).or_default().push(handle);
    }

    /// Remove and return every handle of `id`, in registration order
    pub fn withdraw_all(&mut self, id: &ContainerId) -> Result<Vec<H>, RegistryError> {
        self.records
            .remove(id)
            .ok_or_else(|| RegistryError::NotRegistered(id.clone()))
    }

    pub fn get(&self, id: &ContainerId) -> Option<&[H]> {
        self.records.get(id).map(Vec::as_slice)
    }

    pub fn container_ids(&self) -> Vec<ContainerId> {
        let mut ids: Vec<ContainerId> = self.records.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<H> Default for RecordRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_and_withdraw() {
        let mut registry = RecordRegistry::new();
        let id = ContainerId::new("c1");

        let permit = registry.begin_registration(&id).unwrap();
        registry.commit(&permit, "a.local.");
        registry.commit(&permit, "b.local.");

        assert_eq!(registry.get(&id), Some(&["a.local.", "b.local."][..]));
        assert_eq!(registry.withdraw_all(&id).unwrap(), vec!["a.local.", "b.local."]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_second_registration_set_rejected() {
        let mut registry = RecordRegistry::new();
        let id = ContainerId::new("c1");

        let permit = registry.begin_registration(&id).unwrap();
        registry.commit(&permit, 1);

        assert_eq!(
            registry.begin_registration(&id).unwrap_err(),
            RegistryError::AlreadyRegistered(id.clone())
        );
        assert_eq!(registry.get(&id), Some(&[1][..]));
    }

    #[test]
    fn test_permit_without_commit_leaves_no_entry() {
        let registry: RecordRegistry<u32> = RecordRegistry::new();
        let id = ContainerId::new("c1");

        let _permit = registry.begin_registration(&id).unwrap();
        assert!(registry.get(&id).is_none());
        assert!(registry.begin_registration(&id).is_ok());
    }

    #[test]
    fn test_withdraw_unknown() {
        let mut registry: RecordRegistry<u32> = RecordRegistry::new();
        let id = ContainerId::new("ghost");
        assert_eq!(registry.withdraw_all(&id), Err(RegistryError::NotRegistered(id)));
    }

    #[test]
    fn test_containers_are_independent() {
        let mut registry = RecordRegistry::new();
        let c1 = ContainerId::new("c1");
        let c2 = ContainerId::new("c2");

        let p1 = registry.begin_registration(&c1).unwrap();
        registry.commit(&p1, 1);
        let p2 = registry.begin_registration(&c2).unwrap();
        registry.commit(&p2, 2);

        assert_eq!(registry.container_ids(), vec![c1.clone(), c2.clone()]);
        assert_eq!(registry.withdraw_all(&c1).unwrap(), vec![1]);
        assert_eq!(registry.get(&c2), Some(&[2][..]));
        assert_eq!(registry.len(), 1);
    }
}
