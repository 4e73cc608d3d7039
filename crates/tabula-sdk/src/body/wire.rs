//! Wire schema of post log entries
//!
//! Each entry is a JSON object tagged by `action`. Absent optional fields are
//! written as empty strings, never omitted or null, because existing log
//! consumers expect every key to be present.

use crate::error::Result;
use crate::reconcile::MutationKind;
use crate::submit::ActionTag;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tabula_client::Permission;

/// Flat tag list; an empty list is written as `""`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(pub Vec<String>);

impl Tags {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        Self(tags)
    }
}

impl Serialize for Tags {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            serializer.serialize_str("")
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Tags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<String>),
            Text(String),
        }

        Ok(match Option::<Repr>::deserialize(deserializer)? {
            Some(Repr::List(tags)) => Tags(tags),
            // Older entries carry comma-joined tags
            Some(Repr::Text(text)) => Tags(
                text.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            None => Tags::default(),
        })
    }
}

/// Publication fields shared by create and update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationBody {
    pub title: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub description: String,
    /// Content address of the cover image, empty when absent
    #[serde(default)]
    pub image: String,
}

/// Article fields shared by create and update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleBody {
    pub publication_id: String,
    /// Inline HTML, or the content address of the HTML body
    pub article: String,
    pub title: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationUpdate {
    pub id: String,
    #[serde(flatten)]
    pub body: PublicationBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleUpdate {
    pub id: String,
    #[serde(flatten)]
    pub body: ArticleBody,
}

/// Target of a delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub id: String,
}

/// Capabilities granted to an account on a publication
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFlags {
    #[serde(rename = "article/create")]
    pub article_create: bool,
    #[serde(rename = "article/update")]
    pub article_update: bool,
    #[serde(rename = "article/delete")]
    pub article_delete: bool,
    #[serde(rename = "publication/delete")]
    pub publication_delete: bool,
    #[serde(rename = "publication/update")]
    pub publication_update: bool,
    #[serde(rename = "publication/permissions")]
    pub publication_permissions: bool,
}

impl PermissionFlags {
    /// Every capability
    pub fn all() -> Self {
        Self {
            article_create: true,
            article_update: true,
            article_delete: true,
            publication_delete: true,
            publication_update: true,
            publication_permissions: true,
        }
    }
}

impl From<&Permission> for PermissionFlags {
    fn from(row: &Permission) -> Self {
        Self {
            article_create: row.article_create,
            article_update: row.article_update,
            article_delete: row.article_delete,
            publication_delete: row.publication_delete,
            publication_update: row.publication_update,
            publication_permissions: row.publication_permissions,
        }
    }
}

/// Permission change for one account on one publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Publication id
    pub id: String,
    /// Account address the flags apply to
    pub account: String,
    pub permissions: PermissionFlags,
}

/// One mutation intent written to the post log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum LogAction {
    #[serde(rename = "publication/create")]
    PublicationCreate(PublicationBody),
    #[serde(rename = "publication/update")]
    PublicationUpdate(PublicationUpdate),
    #[serde(rename = "publication/delete")]
    PublicationDelete(TargetRef),
    #[serde(rename = "article/create")]
    ArticleCreate(ArticleBody),
    #[serde(rename = "article/update")]
    ArticleUpdate(ArticleUpdate),
    #[serde(rename = "article/delete")]
    ArticleDelete(TargetRef),
    #[serde(rename = "publication/permissions")]
    PermissionSet(PermissionGrant),
}

impl LogAction {
    /// Value of the `action` key
    pub fn action_name(&self) -> &'static str {
        match self {
            LogAction::PublicationCreate(_) => "publication/create",
            LogAction::PublicationUpdate(_) => "publication/update",
            LogAction::PublicationDelete(_) => "publication/delete",
            LogAction::ArticleCreate(_) => "article/create",
            LogAction::ArticleUpdate(_) => "article/update",
            LogAction::ArticleDelete(_) => "article/delete",
            LogAction::PermissionSet(_) => "publication/permissions",
        }
    }

    /// Tag used when deriving the log entry id
    pub fn tag(&self) -> ActionTag {
        match self {
            LogAction::PublicationCreate(_)
            | LogAction::PublicationUpdate(_)
            | LogAction::PublicationDelete(_) => ActionTag::Publication,
            LogAction::ArticleCreate(_)
            | LogAction::ArticleUpdate(_)
            | LogAction::ArticleDelete(_) => ActionTag::Article,
            LogAction::PermissionSet(_) => ActionTag::Permission,
        }
    }

    /// How the index is expected to change once this entry is materialized
    pub fn mutation_kind(&self) -> MutationKind {
        match self {
            LogAction::PublicationCreate(_) | LogAction::ArticleCreate(_) => MutationKind::Create,
            LogAction::PublicationUpdate(_)
            | LogAction::ArticleUpdate(_)
            | LogAction::PermissionSet(_) => MutationKind::Update,
            LogAction::PublicationDelete(_) | LogAction::ArticleDelete(_) => MutationKind::Delete,
        }
    }

    /// Id of the entity the action targets; `None` for creates
    pub fn target_id(&self) -> Option<&str> {
        match self {
            LogAction::PublicationCreate(_) | LogAction::ArticleCreate(_) => None,
            LogAction::PublicationUpdate(u) => Some(&u.id),
            LogAction::ArticleUpdate(u) => Some(&u.id),
            LogAction::PublicationDelete(t) | LogAction::ArticleDelete(t) => Some(&t.id),
            LogAction::PermissionSet(g) => Some(&g.id),
        }
    }

    /// Serialize for submission
    pub fn to_wire(&self) -> Result<WireBody> {
        Ok(WireBody(serde_json::to_string(self)?))
    }
}

/// Serialized log action, ready to be posted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireBody(String);

impl WireBody {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Decode back into an action
    pub fn parse(&self) -> Result<LogAction> {
        Ok(serde_json::from_str(&self.0)?)
    }
}

impl std::fmt::Display for WireBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
