//! Log entry bodies: wire schema, media rewriting and the body builder

pub mod builder;
pub mod html;
pub mod wire;

pub use builder::{
    ArticleBodyBuilder, ArticleForm, BuiltBody, ImageInput, PermissionForm, PublicationForm, TagOption,
};
pub use html::{add_display_url, extract_and_replace, split_address, Extracted};
pub use wire::{
    ArticleBody, ArticleUpdate, LogAction, PermissionFlags, PermissionGrant, PublicationBody,
    PublicationUpdate, Tags, TargetRef, WireBody,
};
