//! Mutation plan generation.
//!
//! Turns one successful mutation into an ordered list of cache instructions.
//! Planning is pure; `CacheStore::apply` executes the result.

use std::fmt;

use crate::domain::{Domain, Resource};

use super::keys::QueryKey;

/// The server-side write a plan is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update { id: String },
    Delete { id: String },
}

impl MutationKind {
    pub fn update(id: impl ToString) -> Self {
        Self::Update { id: id.to_string() }
    }

    pub fn delete(id: impl ToString) -> Self {
        Self::Delete { id: id.to_string() }
    }

    /// Id of the entity being changed, when known before the write.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::Create => None,
            Self::Update { id } | Self::Delete { id } => Some(id),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheAction {
    /// Replace the data of an existing entry and mark it fresh.
    Patch(Resource),
    /// Keep the data but force the next read to refetch.
    Invalidate,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyTarget {
    Exact(QueryKey),
    Prefix(QueryKey),
}

impl KeyTarget {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            KeyTarget::Exact(target) => target == key,
            KeyTarget::Prefix(prefix) => key.starts_with(prefix),
        }
    }
}

impl fmt::Display for KeyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyTarget::Exact(key) => write!(f, "{key}"),
            KeyTarget::Prefix(key) => write!(f, "{key}/*"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheInstruction {
    pub action: CacheAction,
    pub target: KeyTarget,
}

impl CacheInstruction {
    fn patch(key: QueryKey, resource: &Resource) -> Self {
        Self {
            action: CacheAction::Patch(resource.clone()),
            target: KeyTarget::Exact(key),
        }
    }

    fn invalidate(target: KeyTarget) -> Self {
        Self {
            action: CacheAction::Invalidate,
            target,
        }
    }

    fn remove(key: QueryKey) -> Self {
        Self {
            action: CacheAction::Remove,
            target: KeyTarget::Exact(key),
        }
    }
}

/// Ordered cache instructions for one mutation.
///
/// Detail patches come first, list invalidation second, caller supplied keys
/// third and removals last, so a patched detail is never observed after the
/// lists that would refetch it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationPlan {
    pub instructions: Vec<CacheInstruction>,
}

impl fmt::Display for MutationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |wanted: fn(&CacheAction) -> bool| {
            self.instructions
                .iter()
                .filter(|instruction| wanted(&instruction.action))
                .count()
        };
        write!(
            f,
            "MutationPlan {{ patch: {}, invalidate: {}, remove: {} }}",
            count(|action| matches!(action, CacheAction::Patch(_))),
            count(|action| matches!(action, CacheAction::Invalidate)),
            count(|action| matches!(action, CacheAction::Remove)),
        )
    }
}

impl MutationPlan {
    /// Plan the cache changes for a successful mutation.
    ///
    /// - `updated`: the normalized server response, or `None` when the
    ///   response could not be normalized (or a delete returned nothing);
    ///   detail entries are then invalidated instead of patched.
    /// - `previous`: the entity as cached before the write, used to clean up
    ///   slug entries that no longer resolve to it.
    /// - `affected`: extra prefixes to invalidate, such as other domains whose
    ///   counts depend on this one.
    pub fn for_mutation(
        domain: Domain,
        kind: &MutationKind,
        updated: Option<&Resource>,
        previous: Option<&Resource>,
        affected: &[QueryKey],
    ) -> Self {
        let mut plan = Self::default();
        let previous_slug = previous.map(Resource::slug);

        if let MutationKind::Update { id } = kind {
            match updated {
                Some(resource) => {
                    plan.push(CacheInstruction::patch(QueryKey::detail(domain, id), resource));
                    plan.push(CacheInstruction::patch(
                        QueryKey::by_slug(domain, resource.slug()),
                        resource,
                    ));
                    if let Some(old) = previous_slug.filter(|old| *old != resource.slug()) {
                        plan.push(CacheInstruction::remove(QueryKey::by_slug(domain, old)));
                    }
                }
                None => {
                    plan.push(CacheInstruction::invalidate(KeyTarget::Exact(
                        QueryKey::detail(domain, id),
                    )));
                    if let Some(old) = previous_slug {
                        plan.push(CacheInstruction::invalidate(KeyTarget::Exact(
                            QueryKey::by_slug(domain, old),
                        )));
                    }
                }
            }
        }

        plan.push(CacheInstruction::invalidate(KeyTarget::Prefix(
            QueryKey::lists(domain),
        )));
        plan.push(CacheInstruction::invalidate(KeyTarget::Exact(
            QueryKey::all(domain),
        )));
        for key in affected {
            plan.push(CacheInstruction::invalidate(KeyTarget::Prefix(key.clone())));
        }

        if let MutationKind::Delete { id } = kind {
            plan.push(CacheInstruction::remove(QueryKey::detail(domain, id)));
            let slug = previous_slug.or_else(|| updated.map(Resource::slug));
            if let Some(slug) = slug {
                plan.push(CacheInstruction::remove(QueryKey::by_slug(domain, slug)));
            }
        }

        plan
    }

    fn push(&mut self, instruction: CacheInstruction) {
        self.instructions.push(instruction);
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
