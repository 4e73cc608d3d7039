//! In-memory chain, index and pinning service sharing one post log

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tabula_client::{Article, ArticleParent, Permission, Publication, RequestPolicy};
use tabula_sdk::body::LogAction;
use tabula_sdk::submit::log_id::LogEntryParts;
use tabula_sdk::traits::{ChainError, ChainWriter, EntityKind, EntityRef, IndexedEntity, LogRef, Receipt, ReadModel, RemotePinner};
use tabula_sdk::{ContentAddress, LogEntryId, TabulaError};

pub const CHAIN_ID: u64 = 11155111;
pub const CONTRACT: &str = "0x000000000000cd56c2df7d2f3d2a2a8a6a7c0b1c";

#[derive(Default)]
struct Ledger {
    block: u64,
    /// Entries posted but not yet materialized, with the polls left until they are
    backlog: VecDeque<(u64, LogEntryId, LogAction)>,
    publications: HashMap<String, Publication>,
    articles: HashMap<String, Article>,
    posts: Vec<(String, String)>,
}

/// Shared post log; hand out the chain and index views
#[derive(Clone, Default)]
pub struct PostLog {
    ledger: Arc<Mutex<Ledger>>,
    /// Polls an entry waits before it is materialized
    lag: u64,
}

impl PostLog {
    pub fn with_lag(lag: u64) -> Self {
        Self {
            ledger: Arc::default(),
            lag,
        }
    }

    pub fn chain(&self) -> Arc<InMemoryChain> {
        Arc::new(InMemoryChain {
            log: self.clone(),
            connected: CHAIN_ID,
        })
    }

    pub fn chain_on(&self, connected: u64) -> Arc<InMemoryChain> {
        Arc::new(InMemoryChain {
            log: self.clone(),
            connected,
        })
    }

    pub fn index(&self) -> Arc<InMemoryIndex> {
        Arc::new(InMemoryIndex {
            log: self.clone(),
            fail: Mutex::new(false),
            fetches: Mutex::new(Vec::new()),
        })
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.ledger.lock().unwrap().posts.clone()
    }

    pub fn publication(&self, id: &str) -> Option<Publication> {
        self.ledger.lock().unwrap().publications.get(id).cloned()
    }
}

pub struct InMemoryChain {
    log: PostLog,
    connected: u64,
}

#[async_trait]
impl ChainWriter for InMemoryChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.connected)
    }

    async fn post(&self, contract: &str, content: &str, tag: &str) -> Result<Receipt, ChainError> {
        let action: LogAction =
            serde_json::from_str(content).map_err(|e| ChainError::Reverted(e.to_string()))?;

        let mut ledger = self.log.ledger.lock().unwrap();
        ledger.block += 1;
        let block = ledger.block;
        let receipt = Receipt {
            transaction_hash: format!("0x{:064x}", block),
            block_hash: format!("0xb{:063x}", block),
            logs: vec![LogRef { log_index: 0 }],
        };

        let id = LogEntryId::from_parts(LogEntryParts {
            chain_id: self.connected,
            tag: action.tag(),
            transaction_hash: receipt.transaction_hash.clone(),
            log_index: 0,
        });
        ledger.posts.push((contract.to_string(), tag.to_string()));
        ledger.backlog.push_back((self.log.lag, id, action));
        Ok(receipt)
    }
}

pub struct InMemoryIndex {
    log: PostLog,
    fail: Mutex<bool>,
    fetches: Mutex<Vec<RequestPolicy>>,
}

impl InMemoryIndex {
    pub fn fail_reads(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn fetch_policies(&self) -> Vec<RequestPolicy> {
        self.fetches.lock().unwrap().clone()
    }

    /// Materialize everything immediately, as if the indexer caught up
    pub fn catch_up(&self) {
        let mut ledger = self.log.ledger.lock().unwrap();
        while let Some((_, id, action)) = ledger.backlog.pop_front() {
            materialize(&mut ledger, &id, action);
        }
    }
}

#[async_trait]
impl ReadModel for InMemoryIndex {
    async fn fetch(&self, target: &EntityRef, policy: RequestPolicy) -> tabula_sdk::Result<Option<IndexedEntity>> {
        self.fetches.lock().unwrap().push(policy);
        if *self.fail.lock().unwrap() {
            return Err(TabulaError::ReadModelError("index unavailable".into()));
        }

        let mut ledger = self.log.ledger.lock().unwrap();
        let mut ready = Vec::new();
        for entry in ledger.backlog.iter_mut() {
            if entry.0 == 0 {
                ready.push(entry.1.clone());
            } else {
                entry.0 -= 1;
            }
        }
        while ledger.backlog.front().map(|e| ready.contains(&e.1)).unwrap_or(false) {
            if let Some((_, id, action)) = ledger.backlog.pop_front() {
                materialize(&mut ledger, &id, action);
            }
        }

        Ok(match target.kind {
            EntityKind::Publication => ledger
                .publications
                .get(&target.id)
                .cloned()
                .map(IndexedEntity::Publication),
            EntityKind::Article => ledger.articles.get(&target.id).cloned().map(IndexedEntity::Article),
        })
    }
}

fn materialize(ledger: &mut Ledger, id: &LogEntryId, action: LogAction) {
    let stamp = id.parts().transaction_hash.clone();
    match action {
        LogAction::PublicationCreate(body) => {
            ledger.publications.insert(
                id.to_string(),
                Publication {
                    id: id.to_string(),
                    hash: Some(id.parts().transaction_hash.clone()),
                    title: body.title,
                    description: Some(body.description),
                    image: Some(body.image),
                    tags: Some(body.tags.0),
                    last_updated: Some(stamp),
                    permissions: Vec::new(),
                    articles: None,
                },
            );
        }
        LogAction::PublicationUpdate(update) => {
            if let Some(publication) = ledger.publications.get_mut(&update.id) {
                publication.title = update.body.title;
                publication.last_updated = Some(stamp);
            }
        }
        LogAction::PublicationDelete(target) => {
            ledger.publications.remove(&target.id);
        }
        LogAction::ArticleCreate(body) => {
            let parent = ledger.publications.get(&body.publication_id).map(|p| ArticleParent {
                id: p.id.clone(),
                hash: p.hash.clone(),
                title: p.title.clone(),
                image: p.image.clone(),
                permissions: p.permissions.clone(),
            });
            ledger.articles.insert(
                id.to_string(),
                Article {
                    id: id.to_string(),
                    title: body.title,
                    article: body.article,
                    tags: Some(body.tags.0),
                    authors: None,
                    description: Some(body.description),
                    image: Some(body.image),
                    last_updated: Some(stamp),
                    posted_on: None,
                    poster: None,
                    publication: parent,
                },
            );
        }
        LogAction::ArticleUpdate(update) => {
            if let Some(article) = ledger.articles.get_mut(&update.id) {
                article.title = update.body.title;
                article.article = update.body.article;
                article.last_updated = Some(stamp);
            }
        }
        LogAction::ArticleDelete(target) => {
            ledger.articles.remove(&target.id);
        }
        LogAction::PermissionSet(grant) => {
            if let Some(publication) = ledger.publications.get_mut(&grant.id) {
                let account = grant.account.to_lowercase();
                publication.permissions.retain(|p| p.address != account);
                publication.permissions.push(Permission {
                    id: format!("{}-{}", grant.id, account),
                    address: account,
                    article_create: grant.permissions.article_create,
                    article_delete: grant.permissions.article_delete,
                    article_update: grant.permissions.article_update,
                    publication_delete: grant.permissions.publication_delete,
                    publication_permissions: grant.permissions.publication_permissions,
                    publication_update: grant.permissions.publication_update,
                });
            }
        }
    }
}

/// Pinning service that remembers every request
#[derive(Default)]
pub struct RecordingPinner {
    pub pins: Mutex<Vec<(String, String)>>,
    pub reject: Mutex<Option<String>>,
}

#[async_trait]
impl RemotePinner for RecordingPinner {
    async fn pin(&self, address: &ContentAddress, label: &str) -> tabula_sdk::Result<()> {
        if self.reject.lock().unwrap().as_deref() == Some(address.as_str()) {
            return Err(TabulaError::StorageUnavailable("pin rejected".into()));
        }
        self.pins
            .lock()
            .unwrap()
            .push((address.to_string(), label.to_string()));
        Ok(())
    }
}
