//! In-flight mutations and their convergence rules

use crate::address::ContentAddress;
use crate::body::{LogAction, PermissionFlags};
use crate::submit::LogEntryId;
use crate::traits::{EntityKind, EntityRef, IndexedEntity};
use serde::{Deserialize, Serialize};

/// How a mutation changes the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

/// What the index looked like before the write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    /// Entity did not exist yet
    Absent,
    /// Entity existed
    Present,
    /// Prior last-modified marker of the entity
    LastUpdated(Option<String>),
    /// Prior capabilities of `account`; `None` when it had no row
    Permission {
        account: String,
        prior: Option<PermissionFlags>,
    },
}

impl Baseline {
    /// Snapshot the last-modified marker of an indexed entity
    pub fn last_updated_of(entity: &IndexedEntity) -> Self {
        Baseline::LastUpdated(entity.last_updated().map(String::from))
    }

    /// Snapshot the permissions `account` holds on an indexed entity
    pub fn permission_of(entity: &IndexedEntity, account: &str) -> Self {
        Baseline::Permission {
            account: account.to_string(),
            prior: entity.permission_for(account).map(PermissionFlags::from),
        }
    }
}

/// One submitted mutation awaiting indexing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    kind: MutationKind,
    entity: EntityKind,
    /// Unknown for creates until the log entry id is derived
    target_id: Option<String>,
    baseline: Baseline,
    log_entry_id: Option<LogEntryId>,
    content_addresses: Vec<ContentAddress>,
}

impl PendingMutation {
    /// A new entity; it is looked up under its log entry id
    pub fn create(entity: EntityKind) -> Self {
        Self {
            kind: MutationKind::Create,
            entity,
            target_id: None,
            baseline: Baseline::Absent,
            log_entry_id: None,
            content_addresses: Vec::new(),
        }
    }

    pub fn update(target: EntityRef, baseline: Baseline) -> Self {
        Self {
            kind: MutationKind::Update,
            entity: target.kind,
            target_id: Some(target.id),
            baseline,
            log_entry_id: None,
            content_addresses: Vec::new(),
        }
    }

    pub fn delete(target: EntityRef) -> Self {
        Self {
            kind: MutationKind::Delete,
            entity: target.kind,
            target_id: Some(target.id),
            baseline: Baseline::Present,
            log_entry_id: None,
            content_addresses: Vec::new(),
        }
    }

    /// Pending mutation for a built log action
    ///
    /// Updates need the entity as last seen in the index to take a baseline
    /// from; without one the baseline is an unknown marker, and any indexed
    /// marker counts as a change.
    pub fn for_action(action: &LogAction, current: Option<&IndexedEntity>) -> Self {
        let entity = match action {
            LogAction::ArticleCreate(_) | LogAction::ArticleUpdate(_) | LogAction::ArticleDelete(_) => {
                EntityKind::Article
            }
            _ => EntityKind::Publication,
        };

        match (action.mutation_kind(), action.target_id()) {
            (MutationKind::Create, _) | (_, None) => Self::create(entity),
            (MutationKind::Delete, Some(id)) => Self::delete(EntityRef {
                kind: entity,
                id: id.to_string(),
            }),
            (MutationKind::Update, Some(id)) => {
                let baseline = match (action, current) {
                    (LogAction::PermissionSet(grant), Some(entity)) => {
                        Baseline::permission_of(entity, &grant.account)
                    }
                    (LogAction::PermissionSet(grant), None) => Baseline::Permission {
                        account: grant.account.clone(),
                        prior: None,
                    },
                    (_, Some(entity)) => Baseline::last_updated_of(entity),
                    (_, None) => Baseline::LastUpdated(None),
                };
                Self::update(
                    EntityRef {
                        kind: entity,
                        id: id.to_string(),
                    },
                    baseline,
                )
            }
        }
    }

    pub fn with_content_addresses(mut self, addresses: Vec<ContentAddress>) -> Self {
        self.content_addresses = addresses;
        self
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn log_entry_id(&self) -> Option<&LogEntryId> {
        self.log_entry_id.as_ref()
    }

    pub fn content_addresses(&self) -> &[ContentAddress] {
        &self.content_addresses
    }

    /// Entity the index is polled for, once known
    pub fn target(&self) -> Option<EntityRef> {
        self.target_id.as_ref().map(|id| EntityRef {
            kind: self.entity,
            id: id.clone(),
        })
    }

    /// Record the derived log entry id; creates take it as their target
    pub(crate) fn bind(&mut self, id: LogEntryId) {
        if self.kind == MutationKind::Create {
            self.target_id = Some(id.as_str().to_string());
        }
        self.log_entry_id = Some(id);
    }

    /// Whether `observed` shows this mutation materialized
    pub fn is_reflected_by(&self, observed: Option<&IndexedEntity>) -> bool {
        match self.kind {
            MutationKind::Create => match (observed, self.target_id.as_deref()) {
                (Some(entity), Some(id)) => entity.id() == id,
                _ => false,
            },
            MutationKind::Delete => observed.is_none(),
            MutationKind::Update => {
                let Some(entity) = observed else {
                    return false;
                };
                match &self.baseline {
                    Baseline::LastUpdated(prior) => entity.last_updated() != prior.as_deref(),
                    Baseline::Permission { account, prior } => {
                        entity.permission_for(account).map(PermissionFlags::from) != *prior
                    }
                    // Presence alone says nothing about an update
                    Baseline::Absent | Baseline::Present => false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{PermissionGrant, TargetRef};
    use tabula_client::{Permission, Publication};

    fn publication(id: &str, last_updated: &str, permissions: Vec<Permission>) -> IndexedEntity {
        IndexedEntity::Publication(Publication {
            id: id.into(),
            hash: None,
            title: "T".into(),
            description: None,
            image: None,
            tags: None,
            last_updated: Some(last_updated.into()),
            permissions,
            articles: None,
        })
    }

    fn row(address: &str, article_create: bool) -> Permission {
        Permission {
            id: format!("P1-{}", address),
            address: address.into(),
            article_create,
            article_delete: false,
            article_update: false,
            publication_delete: false,
            publication_permissions: false,
            publication_update: false,
        }
    }

    #[test]
    fn test_create_converges_on_matching_id() {
        let mut pending = PendingMutation::create(EntityKind::Publication);
        assert!(pending.target().is_none());

        pending.bind(LogEntryId::parse("1-P-0xa-0").unwrap());
        assert!(!pending.is_reflected_by(None));
        assert!(!pending.is_reflected_by(Some(&publication("other", "1", vec![]))));
        assert!(pending.is_reflected_by(Some(&publication("1-P-0xa-0", "1", vec![]))));
    }

    #[test]
    fn test_update_needs_changed_marker() {
        let pending = PendingMutation::update(
            EntityRef::publication("P1"),
            Baseline::LastUpdated(Some("100".into())),
        );
        assert!(!pending.is_reflected_by(Some(&publication("P1", "100", vec![]))));
        assert!(!pending.is_reflected_by(None));
        assert!(pending.is_reflected_by(Some(&publication("P1", "101", vec![]))));
    }

    #[test]
    fn test_permission_update_matches_account_case_insensitively() {
        let before = publication("P1", "1", vec![row("0xabc", false)]);
        let pending = PendingMutation::update(
            EntityRef::publication("P1"),
            Baseline::permission_of(&before, "0xABC"),
        );

        assert!(!pending.is_reflected_by(Some(&before)));
        assert!(pending.is_reflected_by(Some(&publication("P1", "1", vec![row("0xabc", true)]))));
    }

    #[test]
    fn test_delete_converges_on_absence() {
        let pending = PendingMutation::delete(EntityRef::article("A1"));
        assert_eq!(pending.baseline(), &Baseline::Present);
        assert!(!pending.is_reflected_by(Some(&publication("A1", "1", vec![]))));
        assert!(pending.is_reflected_by(None));
    }

    #[test]
    fn test_for_action_picks_kind_and_baseline() {
        let current = publication("P1", "7", vec![]);

        let delete = PendingMutation::for_action(
            &LogAction::ArticleDelete(TargetRef { id: "A1".into() }),
            None,
        );
        assert_eq!(delete.kind(), MutationKind::Delete);
        assert_eq!(delete.target(), Some(EntityRef::article("A1")));

        let grant = PendingMutation::for_action(
            &LogAction::PermissionSet(PermissionGrant {
                id: "P1".into(),
                account: "0xdef".into(),
                permissions: PermissionFlags::all(),
            }),
            Some(&current),
        );
        assert_eq!(grant.kind(), MutationKind::Update);
        assert_eq!(
            grant.baseline(),
            &Baseline::Permission {
                account: "0xdef".into(),
                prior: None
            }
        );
    }
}
