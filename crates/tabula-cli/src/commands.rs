//! Subcommand handlers; each returns the JSON document printed to stdout

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tabula_client::{IpfsClient, PinningClient, SubgraphClient};
use tabula_sdk::traits::Receipt;
use tabula_sdk::{
    ActionTag, ArticleBodyBuilder, ArticleForm, Baseline, BuiltBody, Config, ContentAddress, ContentAddressCodec,
    EntityKind, EntityRef, ImageInput, IndexReconciler, LogEntryId, MutationKind, PendingMutation, PinRequest,
    PinningCoordinator, PinningPolicy, ReconcileStatus, RemotePinner, TagOption,
};
use tracing::{info, warn};

fn codec(config: &Config) -> Result<ContentAddressCodec> {
    let ipfs = IpfsClient::new(config.ipfs_client_config())?;
    Ok(ContentAddressCodec::new(Arc::new(ipfs)).with_decode_timeout(config.decode_timeout()))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))
}

pub async fn encode(config: &Config, file: &Path) -> Result<Value> {
    let bytes = read_file(file)?;
    let address = codec(config)?.encode(&bytes).await?;

    Ok(json!({
        "address": address,
        "size": bytes.len(),
        "sha256": hex::encode(Sha256::digest(&bytes)),
        "url": address.display_url(&config.ipfs.gateway_url),
    }))
}

pub async fn decode(config: &Config, address: &str, out: Option<&Path>) -> Result<Value> {
    let address = ContentAddress::parse(address)?;
    let bytes = codec(config)?.decode(&address).await?;

    if let Some(out) = out {
        std::fs::write(out, &bytes).with_context(|| format!("cannot write {}", out.display()))?;
        return Ok(json!({
            "address": address,
            "size": bytes.len(),
            "out": out.display().to_string(),
        }));
    }

    match String::from_utf8(bytes) {
        Ok(text) => Ok(json!({
            "address": address,
            "size": text.len(),
            "text": text,
        })),
        Err(err) => bail!(
            "{} is {} bytes of binary content; use --out",
            address,
            err.as_bytes().len()
        ),
    }
}

pub struct ArticleBodyArgs<'a> {
    pub title: &'a str,
    pub html_file: &'a Path,
    pub tags: &'a [String],
    pub description: Option<&'a str>,
    pub image_file: Option<&'a Path>,
    pub on_chain: bool,
    pub publication_id: &'a str,
    pub id: Option<&'a str>,
}

pub async fn article_body(config: &Config, args: ArticleBodyArgs<'_>) -> Result<Value> {
    let html = String::from_utf8(read_file(args.html_file)?)
        .with_context(|| format!("{} is not UTF-8", args.html_file.display()))?;
    let image = args
        .image_file
        .map(read_file)
        .transpose()?
        .map(ImageInput::Bytes);

    let form = ArticleForm {
        publication_id: args.publication_id.to_string(),
        title: args.title.to_string(),
        rich_text_html: html,
        tags: args.tags.iter().map(TagOption::new).collect(),
        description: args.description.map(String::from),
        image,
        direct_on_chain: args.on_chain,
    };

    let builder = ArticleBodyBuilder::new(codec(config)?).with_display_prefixes(config.display_prefixes());
    let built = match args.id {
        Some(id) => builder.article_update(id, &form).await?,
        None => builder.article_create(&form).await?,
    };

    built_json(&built)
}

fn built_json(built: &BuiltBody) -> Result<Value> {
    let wire: Value = serde_json::from_str(built.wire.as_str())?;
    Ok(json!({
        "action": built.action.action_name(),
        "tag": built.action.tag(),
        "body": wire,
        "contentAddresses": built.content_addresses,
        "image": built.image,
        "pinSet": built.pin_set(),
    }))
}

pub fn log_id(config: &Config, chain_id: u64, tag: &str, receipt: &Path) -> Result<Value> {
    let tag: ActionTag = tag.parse()?;
    let receipt: Receipt = serde_json::from_slice(&read_file(receipt)?).context("invalid receipt JSON")?;
    let id = LogEntryId::derive(chain_id, tag, &receipt)?;
    let parts = id.parts();

    Ok(json!({
        "id": id,
        "chainId": parts.chain_id,
        "tag": parts.tag,
        "transactionHash": parts.transaction_hash,
        "logIndex": parts.log_index,
        "transactionUrl": config
            .network_registry()
            .transaction_url(chain_id, &receipt.transaction_hash),
    }))
}

pub struct WatchArgs<'a> {
    pub chain_id: u64,
    pub kind: MutationKind,
    pub entity: EntityKind,
    pub id: &'a str,
    pub log_id: Option<&'a str>,
    pub last_updated: Option<&'a str>,
}

fn pending_for(args: &WatchArgs<'_>) -> Result<(PendingMutation, LogEntryId)> {
    let log_entry_id = LogEntryId::parse(args.log_id.unwrap_or(args.id))?;
    let target = EntityRef {
        kind: args.entity,
        id: args.id.to_string(),
    };

    let pending = match args.kind {
        MutationKind::Create => {
            if log_entry_id.as_str() != args.id {
                bail!("a created entity is indexed under its log entry id");
            }
            PendingMutation::create(args.entity)
        }
        MutationKind::Update => {
            PendingMutation::update(target, Baseline::LastUpdated(args.last_updated.map(String::from)))
        }
        MutationKind::Delete => PendingMutation::delete(target),
    };
    Ok((pending, log_entry_id))
}

pub async fn watch(config: &Config, args: WatchArgs<'_>) -> Result<Value> {
    let (pending, log_entry_id) = pending_for(&args)?;

    let index = SubgraphClient::new(config.subgraph_client_config(args.chain_id)?)?;
    info!(endpoint = index.endpoint(), id = args.id, "Watching index");

    let reconciler = IndexReconciler::new(Arc::new(index), config.reconciler_config());
    let handle = reconciler.spawn(pending, log_entry_id)?;
    let mut updates = handle.subscribe();

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut interrupted = false;

    loop {
        let status = updates.borrow_and_update().clone();
        if status.state.is_terminal() {
            return Ok(status_json(&status));
        }

        let closed = tokio::select! {
            changed = updates.changed() => changed.is_err(),
            _ = &mut interrupt, if !interrupted => {
                warn!("Interrupted; abandoning reconciliation");
                interrupted = true;
                handle.abandon();
                false
            }
        };
        if closed {
            return Ok(status_json(&updates.borrow()));
        }
    }
}

fn status_json(status: &ReconcileStatus) -> Value {
    json!({
        "state": status.state.to_string(),
        "isConverged": status.is_converged,
        "loading": status.loading,
        "polls": status.polls,
        "logEntryId": status.log_entry_id,
        "error": status.error.as_ref().map(|e| e.to_string()),
    })
}

pub async fn pin_status(config: &Config, address: &str) -> Result<Value> {
    if !config.pinning.service.is_remote() {
        bail!(
            "pinning service {} keeps no pin records",
            config.pinning.service
        );
    }
    let address = ContentAddress::parse(address)?;
    let client = PinningClient::new(config.pinning_client_config())?;
    let status = client.status(address.as_str()).await?;

    Ok(json!({
        "address": address,
        "service": config.pinning.service,
        "status": status,
    }))
}

/// Pin one address, on the local node or through the configured service
pub async fn pin(config: &Config, address: &str, label: Option<&str>, local: bool) -> Result<Value> {
    let address = ContentAddress::parse(address)?;
    let pinner: Arc<dyn RemotePinner> = if local {
        Arc::new(IpfsClient::new(config.ipfs_client_config())?)
    } else if config.pinning.service.is_remote() {
        Arc::new(PinningClient::new(config.pinning_client_config())?)
    } else {
        bail!(
            "pinning service {} takes no pin requests; use --local",
            config.pinning.service
        );
    };
    let target = if local {
        "local".to_string()
    } else {
        config.pinning.service.to_string()
    };

    let label = label.unwrap_or(address.as_str()).to_string();
    let report = PinningCoordinator::new(PinningPolicy::Remote(pinner))
        .on_converged(&[PinRequest::new(address, label)])
        .await;

    if let Some(failed) = report.failed().next() {
        bail!(
            "pinning {} on {} failed: {}",
            failed.address,
            target,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(json!({
        "target": target,
        "pins": report.outcomes,
    }))
}

/// Reachability of the IPFS node and validity of the pinning credentials
pub async fn status(config: &Config) -> Result<Value> {
    let ipfs = IpfsClient::new(config.ipfs_client_config())?;
    let (version, ipfs_error) = match ipfs.version().await {
        Ok(version) => (Some(version), None),
        Err(err) => {
            warn!(api_url = ipfs.api_url(), error = %err, "IPFS node unreachable");
            (None, Some(err.to_string()))
        }
    };

    let (credentials_valid, pinning_error) = if config.pinning.service.is_remote() {
        let client = PinningClient::new(config.pinning_client_config())?;
        match client.check_credentials().await {
            Ok(valid) => (Some(valid), None),
            Err(err) => (None, Some(err.to_string())),
        }
    } else {
        (None, None)
    };

    Ok(json!({
        "ipfs": {
            "apiUrl": ipfs.api_url(),
            "version": version,
            "error": ipfs_error,
        },
        "pinning": {
            "service": config.pinning.service,
            "credentialsValid": credentials_valid,
            "error": pinning_error,
        },
    }))
}
