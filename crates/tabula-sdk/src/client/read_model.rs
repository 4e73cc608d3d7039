//! Read-model access through `tabula_client::SubgraphClient`

use crate::error::{Result, TabulaError};
use crate::traits::{EntityKind, EntityRef, IndexedEntity, ReadModel};
use async_trait::async_trait;
use tabula_client::{RequestPolicy, SubgraphClient};

#[async_trait]
impl ReadModel for SubgraphClient {
    async fn fetch(&self, target: &EntityRef, policy: RequestPolicy) -> Result<Option<IndexedEntity>> {
        let entity = match target.kind {
            EntityKind::Publication => self
                .publication(&target.id, policy)
                .await
                .map_err(TabulaError::from_read_model)?
                .map(IndexedEntity::Publication),
            EntityKind::Article => self
                .article(&target.id, policy)
                .await
                .map_err(TabulaError::from_read_model)?
                .map(IndexedEntity::Article),
        };
        Ok(entity)
    }
}
