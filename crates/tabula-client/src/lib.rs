//! HTTP clients for the services Tabula writes to and reads from
//!
//! - [`IpfsClient`]: Kubo-compatible content store (`add`, `cat`, `pin/add`)
//! - [`PinningClient`]: Pinata or IPFS Pinning Service API endpoints
//! - [`SubgraphClient`]: GraphQL index that materializes the post log
//!
//! # Example
//!
//! ```rust,no_run
//! use tabula_client::{RequestPolicy, SubgraphClient, SubgraphConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let index = SubgraphClient::new(SubgraphConfig {
//!     endpoint: "https://api.thegraph.com/subgraphs/name/tabula/sepolia".into(),
//!     ..Default::default()
//! })?;
//!
//! // Bypass the response cache while waiting for a write to be indexed
//! let article = index.article("11155111-A-0xabc-0", RequestPolicy::NetworkOnly).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod ipfs;
pub mod pinning;
pub mod subgraph;
pub mod types;

// Re-export main types
pub use error::{ClientError, Result};
pub use ipfs::IpfsClient;
pub use pinning::PinningClient;
pub use subgraph::SubgraphClient;
pub use types::*;
