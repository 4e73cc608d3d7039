//! Command line arguments
//!
//! Every global option can also be set through the environment (a `.env`
//! file is honored). Options given here override the TOML configuration.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tabula_sdk::{Config, EntityKind, MutationKind};

/// Tabula - content addressing and index reconciliation for an on-chain post log
#[derive(Parser, Debug, Clone)]
#[command(name = "tabula")]
#[command(about = "Content addressing and index reconciliation for Tabula publications")]
pub struct Args {
    /// TOML configuration file; defaults apply when absent
    #[arg(long, env = "TABULA_CONFIG")]
    pub config: Option<PathBuf>,

    /// IPFS HTTP API URL (overrides the configuration)
    #[arg(long, env = "IPFS_API_URL")]
    pub ipfs_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format; logs always go to stderr
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Store a file and print its content address
    Encode {
        file: PathBuf,
    },

    /// Fetch content by address
    Decode {
        address: String,

        /// Write the bytes here instead of printing them
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Build the log entry body for an article
    ArticleBody {
        #[arg(long)]
        title: String,

        /// Rich text body
        #[arg(long)]
        html_file: PathBuf,

        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        description: Option<String>,

        /// Cover image to store; not allowed with --on-chain
        #[arg(long)]
        image_file: Option<PathBuf>,

        /// Inline the body in the transaction instead of storing it
        #[arg(long)]
        on_chain: bool,

        #[arg(long)]
        publication_id: String,

        /// Existing article id; builds an update instead of a create
        #[arg(long)]
        id: Option<String>,
    },

    /// Derive the log entry id from a confirmation receipt
    LogId {
        #[arg(long)]
        chain_id: u64,

        /// P, A or X
        #[arg(long)]
        tag: String,

        /// Receipt JSON (`transactionHash`, `blockHash`, `logs`)
        #[arg(long)]
        receipt: PathBuf,
    },

    /// Poll the index until it reflects a mutation
    Watch {
        #[arg(long)]
        chain_id: u64,

        #[arg(long, value_enum)]
        kind: KindArg,

        #[arg(long, value_enum)]
        entity: EntityArg,

        /// Entity id; for creates, the log entry id of the write
        #[arg(long)]
        id: String,

        /// Log entry id of the write, when it differs from --id
        #[arg(long)]
        log_id: Option<String>,

        /// Last-modified marker seen before an update
        #[arg(long)]
        last_updated: Option<String>,
    },

    /// Ask the configured pinning service about an address
    PinStatus {
        address: String,
    },

    /// Pin an address through the configured service, or on the IPFS node
    Pin {
        address: String,

        /// Name recorded with the pin; defaults to the address
        #[arg(long)]
        label: Option<String>,

        /// Pin on the IPFS node instead of the pinning service
        #[arg(long)]
        local: bool,
    },

    /// Check the IPFS node and the pinning credentials
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Create,
    Update,
    Delete,
}

impl From<KindArg> for MutationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Create => MutationKind::Create,
            KindArg::Update => MutationKind::Update,
            KindArg::Delete => MutationKind::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityArg {
    Publication,
    Article,
}

impl From<EntityArg> for EntityKind {
    fn from(entity: EntityArg) -> Self {
        match entity {
            EntityArg::Publication => EntityKind::Publication,
            EntityArg::Article => EntityKind::Article,
        }
    }
}

impl Args {
    /// Validate argument combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if let Command::ArticleBody {
            on_chain: true,
            image_file: Some(_),
            ..
        } = &self.command
        {
            return Err("--image-file cannot be combined with --on-chain".to_string());
        }

        if let Command::Watch {
            kind: KindArg::Create,
            last_updated: Some(_),
            ..
        } = &self.command
        {
            return Err("--last-updated only applies to updates".to_string());
        }

        Ok(())
    }

    /// Configuration file (or defaults) with command line overrides applied
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(url) = &self.ipfs_url {
            config.ipfs.api_url = url.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_article_body() {
        let args = Args::try_parse_from([
            "tabula",
            "article-body",
            "--title",
            "Hello",
            "--html-file",
            "body.html",
            "--tag",
            "rust",
            "--tag",
            "ipfs",
            "--publication-id",
            "11155111-P-0xabc-0",
        ])
        .unwrap();

        match args.command {
            Command::ArticleBody { tags, on_chain, id, .. } => {
                assert_eq!(tags, vec!["rust", "ipfs"]);
                assert!(!on_chain);
                assert!(id.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_on_chain_image_rejected() {
        let args = Args::try_parse_from([
            "tabula",
            "article-body",
            "--title",
            "Hello",
            "--html-file",
            "body.html",
            "--image-file",
            "cover.png",
            "--on-chain",
            "--publication-id",
            "p",
        ])
        .unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_watch() {
        let args = Args::try_parse_from([
            "tabula",
            "--log-format",
            "json",
            "watch",
            "--chain-id",
            "100",
            "--kind",
            "update",
            "--entity",
            "article",
            "--id",
            "100-A-0xabc-0",
            "--last-updated",
            "1700000000",
        ])
        .unwrap();

        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.validate().is_ok());
        match args.command {
            Command::Watch { kind, entity, .. } => {
                assert_eq!(MutationKind::from(kind), MutationKind::Update);
                assert_eq!(EntityKind::from(entity), EntityKind::Article);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_local_pin() {
        let args = Args::try_parse_from(["tabula", "pin", "QmBody", "--local"]).unwrap();
        match args.command {
            Command::Pin { address, label, local } => {
                assert_eq!(address, "QmBody");
                assert!(label.is_none());
                assert!(local);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
