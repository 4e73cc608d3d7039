//! Read-model trait and the entities it returns

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tabula_client::{Article, Permission, Publication, RequestPolicy};

/// Entity kinds the index materializes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Publication,
    Article,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Publication => f.write_str("publication"),
            EntityKind::Article => f.write_str("article"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = crate::error::TabulaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "publication" => Ok(EntityKind::Publication),
            "article" => Ok(EntityKind::Article),
            other => Err(crate::error::TabulaError::InvalidInput(format!(
                "unknown entity kind: {}",
                other
            ))),
        }
    }
}

/// Identifies one entity in the index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn publication(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Publication,
            id: id.into(),
        }
    }

    pub fn article(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Article,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// An entity as returned by the index
#[derive(Debug, Clone, PartialEq)]
pub enum IndexedEntity {
    Publication(Publication),
    Article(Article),
}

impl IndexedEntity {
    pub fn id(&self) -> &str {
        match self {
            IndexedEntity::Publication(p) => &p.id,
            IndexedEntity::Article(a) => &a.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            IndexedEntity::Publication(_) => EntityKind::Publication,
            IndexedEntity::Article(_) => EntityKind::Article,
        }
    }

    /// Last-modified marker maintained by the index
    pub fn last_updated(&self) -> Option<&str> {
        match self {
            IndexedEntity::Publication(p) => p.last_updated.as_deref(),
            IndexedEntity::Article(a) => a.last_updated.as_deref(),
        }
    }

    /// Permission row of `account`; articles answer from their publication
    pub fn permission_for(&self, account: &str) -> Option<&Permission> {
        let permissions = match self {
            IndexedEntity::Publication(p) => &p.permissions,
            IndexedEntity::Article(a) => match &a.publication {
                Some(parent) => &parent.permissions,
                None => return None,
            },
        };
        permissions
            .iter()
            .find(|p| p.address.eq_ignore_ascii_case(account))
    }
}

/// Queryable projection of the post log
#[async_trait]
pub trait ReadModel: Send + Sync {
    /// Fetch an entity by id; `Ok(None)` when the index has no such entity
    ///
    /// `RequestPolicy::NetworkOnly` must bypass any cache between the
    /// caller and the index.
    async fn fetch(&self, target: &EntityRef, policy: RequestPolicy) -> Result<Option<IndexedEntity>>;
}
