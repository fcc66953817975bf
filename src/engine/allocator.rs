use crate::domain::{InternalId, RequirementId};

/// Hands out internal IDs for a requirement's candidates, in allocation
/// order.
///
/// The first ID is `{requirement}-AC1`. Each subsequent one steps by 5:
/// `{requirement}-005`, `{requirement}-010`, ...
#[derive(Debug, Clone)]
pub struct Allocator {
    requirement: RequirementId,
    position: usize,
}

impl Allocator {
    /// Start allocating IDs for a requirement.
    #[must_use]
    pub const fn new(requirement: RequirementId) -> Self {
        Self {
            requirement,
            position: 0,
        }
    }
}

impl Iterator for Allocator {
    type Item = InternalId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = InternalId::at(self.requirement.clone(), self.position);
        self.position = self.position.saturating_add(1);
        Some(id)
    }
}
