//! Builds log entry bodies from form input
//!
//! Rich text is stored with bare content addresses in place of gateway URLs.
//! In pinned mode the rewritten HTML is itself stored and the entry carries
//! its address; in direct-on-chain mode the HTML is inlined.

use super::html::extract_and_replace;
use super::wire::{
    ArticleBody, ArticleUpdate, LogAction, PermissionFlags, PermissionGrant, PublicationBody,
    PublicationUpdate, Tags, TargetRef, WireBody,
};
use crate::address::{ContentAddress, DEFAULT_GATEWAY};
use crate::codec::ContentAddressCodec;
use crate::error::{Result, TabulaError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tag as picked in the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOption {
    pub label: String,
    pub value: String,
}

impl TagOption {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Cover image supplied with a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// Raw bytes still to be stored
    Bytes(Vec<u8>),
    /// Already stored content
    Address(ContentAddress),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleForm {
    pub publication_id: String,
    pub title: String,
    pub rich_text_html: String,
    pub tags: Vec<TagOption>,
    pub description: Option<String>,
    pub image: Option<ImageInput>,
    pub direct_on_chain: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicationForm {
    pub title: String,
    pub tags: Vec<TagOption>,
    pub description: Option<String>,
    pub image: Option<ImageInput>,
    pub direct_on_chain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionForm {
    pub publication_id: String,
    pub account: String,
    pub permissions: PermissionFlags,
}

/// A log entry ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltBody {
    pub action: LogAction,
    pub wire: WireBody,
    /// Addresses referenced by the body: media lifted out of the rich text,
    /// then the stored body itself in pinned mode
    pub content_addresses: Vec<ContentAddress>,
    /// Cover image address, when one was set
    pub image: Option<ContentAddress>,
}

impl BuiltBody {
    fn new(action: LogAction, content_addresses: Vec<ContentAddress>, image: Option<ContentAddress>) -> Result<Self> {
        let wire = action.to_wire()?;
        Ok(Self {
            action,
            wire,
            content_addresses,
            image,
        })
    }

    /// Every address worth pinning once the entry is indexed
    pub fn pin_set(&self) -> Vec<ContentAddress> {
        let mut set = self.content_addresses.clone();
        if let Some(image) = &self.image {
            if !set.contains(image) {
                set.push(image.clone());
            }
        }
        set
    }
}

/// Turns form input into log entries
#[derive(Clone)]
pub struct ArticleBodyBuilder {
    codec: ContentAddressCodec,
    display_prefixes: Vec<String>,
}

impl ArticleBodyBuilder {
    pub fn new(codec: ContentAddressCodec) -> Self {
        Self {
            codec,
            display_prefixes: vec![DEFAULT_GATEWAY.to_string()],
        }
    }

    /// Gateway prefixes recognized as display URLs in rich text
    pub fn with_display_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.display_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn codec(&self) -> &ContentAddressCodec {
        &self.codec
    }

    pub async fn article_create(&self, form: &ArticleForm) -> Result<BuiltBody> {
        let (body, addresses, image) = self.article_body(form).await?;
        BuiltBody::new(LogAction::ArticleCreate(body), addresses, image)
    }

    pub async fn article_update(&self, id: &str, form: &ArticleForm) -> Result<BuiltBody> {
        require_id(id)?;
        let (body, addresses, image) = self.article_body(form).await?;
        BuiltBody::new(
            LogAction::ArticleUpdate(ArticleUpdate {
                id: id.to_string(),
                body,
            }),
            addresses,
            image,
        )
    }

    pub fn article_delete(&self, id: &str) -> Result<BuiltBody> {
        require_id(id)?;
        BuiltBody::new(LogAction::ArticleDelete(TargetRef { id: id.to_string() }), Vec::new(), None)
    }

    pub async fn publication_create(&self, form: &PublicationForm) -> Result<BuiltBody> {
        let (body, image) = self.publication_body(form).await?;
        BuiltBody::new(LogAction::PublicationCreate(body), Vec::new(), image)
    }

    pub async fn publication_update(&self, id: &str, form: &PublicationForm) -> Result<BuiltBody> {
        require_id(id)?;
        let (body, image) = self.publication_body(form).await?;
        BuiltBody::new(
            LogAction::PublicationUpdate(PublicationUpdate {
                id: id.to_string(),
                body,
            }),
            Vec::new(),
            image,
        )
    }

    pub fn publication_delete(&self, id: &str) -> Result<BuiltBody> {
        require_id(id)?;
        BuiltBody::new(
            LogAction::PublicationDelete(TargetRef { id: id.to_string() }),
            Vec::new(),
            None,
        )
    }

    pub fn permission_set(&self, form: &PermissionForm) -> Result<BuiltBody> {
        require_id(&form.publication_id)?;
        if form.account.trim().is_empty() {
            return Err(TabulaError::InvalidInput("permission account is required".into()));
        }
        BuiltBody::new(
            LogAction::PermissionSet(PermissionGrant {
                id: form.publication_id.clone(),
                account: form.account.clone(),
                permissions: form.permissions,
            }),
            Vec::new(),
            None,
        )
    }

    // ==================== Helper Methods ====================

    async fn article_body(
        &self,
        form: &ArticleForm,
    ) -> Result<(ArticleBody, Vec<ContentAddress>, Option<ContentAddress>)> {
        require_title(&form.title)?;
        if form.publication_id.trim().is_empty() {
            return Err(TabulaError::InvalidInput("article needs a publication id".into()));
        }
        check_image_mode(form.image.as_ref(), form.direct_on_chain)?;

        let extracted = extract_and_replace(&form.rich_text_html, self.display_prefixes.as_slice());
        let mut addresses = extracted.addresses;

        let image = self.resolve_image(form.image.as_ref()).await?;

        let article = if form.direct_on_chain {
            extracted.html
        } else {
            let body_address = self.codec.encode_text(&extracted.html).await?;
            let inline = body_address.as_str().to_string();
            if !addresses.contains(&body_address) {
                addresses.push(body_address);
            }
            inline
        };

        debug!(
            title = %form.title,
            on_chain = form.direct_on_chain,
            addresses = addresses.len(),
            "Built article body"
        );

        let body = ArticleBody {
            publication_id: form.publication_id.clone(),
            article,
            title: form.title.clone(),
            tags: flatten_tags(&form.tags),
            description: form.description.clone().unwrap_or_default(),
            image: image.as_ref().map(|a| a.to_string()).unwrap_or_default(),
        };
        Ok((body, addresses, image))
    }

    async fn publication_body(&self, form: &PublicationForm) -> Result<(PublicationBody, Option<ContentAddress>)> {
        require_title(&form.title)?;
        check_image_mode(form.image.as_ref(), form.direct_on_chain)?;

        let image = self.resolve_image(form.image.as_ref()).await?;
        let body = PublicationBody {
            title: form.title.clone(),
            tags: flatten_tags(&form.tags),
            description: form.description.clone().unwrap_or_default(),
            image: image.as_ref().map(|a| a.to_string()).unwrap_or_default(),
        };
        Ok((body, image))
    }

    async fn resolve_image(&self, image: Option<&ImageInput>) -> Result<Option<ContentAddress>> {
        match image {
            None => Ok(None),
            Some(ImageInput::Address(address)) => Ok(Some(address.clone())),
            Some(ImageInput::Bytes(bytes)) => self.codec.encode(bytes).await.map(Some),
        }
    }
}

fn require_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TabulaError::InvalidInput("title is required".into()));
    }
    Ok(())
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(TabulaError::InvalidInput("target id is required".into()));
    }
    Ok(())
}

/// Images are disabled when content stays on chain; only an already stored
/// image may be referenced
fn check_image_mode(image: Option<&ImageInput>, direct_on_chain: bool) -> Result<()> {
    if direct_on_chain && matches!(image, Some(ImageInput::Bytes(_))) {
        return Err(TabulaError::InvalidInput(
            "image upload is not available when content is stored on chain".into(),
        ));
    }
    Ok(())
}

fn flatten_tags(tags: &[TagOption]) -> Tags {
    Tags(tags.iter().map(|t| t.value.clone()).collect())
}
