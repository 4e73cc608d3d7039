//! Draft projection
//!
//! What an editor shows is a pure function of the local edit buffer and the
//! last converged server value. Fields set in the edit win; everything else
//! comes from the server.

use serde::{Deserialize, Serialize};
use tabula_client::{Article, Publication};

/// Unsaved article changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleEdit {
    pub title: Option<String>,
    pub article: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
}

impl ArticleEdit {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDraft {
    /// `None` until the article exists on the index
    pub id: Option<String>,
    pub publication_id: Option<String>,
    pub title: String,
    pub article: String,
    pub description: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
}

/// Unsaved publication changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
}

impl PublicationEdit {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationDraft {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
}

pub fn project_article(edit: &ArticleEdit, server: Option<&Article>) -> ArticleDraft {
    ArticleDraft {
        id: server.map(|a| a.id.clone()),
        publication_id: server.and_then(|a| a.publication.as_ref()).map(|p| p.id.clone()),
        title: pick(&edit.title, server.map(|a| a.title.clone())),
        article: pick(&edit.article, server.map(|a| a.article.clone())),
        description: pick(&edit.description, server.and_then(|a| a.description.clone())),
        tags: pick(&edit.tags, server.and_then(|a| a.tags.clone())),
        image: edit
            .image
            .clone()
            .or_else(|| server.and_then(|a| a.image.clone()))
            .filter(|image| !image.is_empty()),
    }
}

pub fn project_publication(edit: &PublicationEdit, server: Option<&Publication>) -> PublicationDraft {
    PublicationDraft {
        id: server.map(|p| p.id.clone()),
        title: pick(&edit.title, server.map(|p| p.title.clone())),
        description: pick(&edit.description, server.and_then(|p| p.description.clone())),
        tags: pick(&edit.tags, server.and_then(|p| p.tags.clone())),
        image: edit
            .image
            .clone()
            .or_else(|| server.and_then(|p| p.image.clone()))
            .filter(|image| !image.is_empty()),
    }
}

fn pick<T: Clone + Default>(edited: &Option<T>, server: Option<T>) -> T {
    edited.clone().or(server).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_article() -> Article {
        Article {
            id: "1-A-0xa-0".into(),
            title: "Server title".into(),
            article: "QmBody".into(),
            tags: Some(vec!["rust".into()]),
            authors: None,
            description: Some("server description".into()),
            image: Some("QmCover".into()),
            last_updated: Some("10".into()),
            posted_on: None,
            poster: None,
            publication: None,
        }
    }

    #[test]
    fn test_edit_fields_win() {
        let edit = ArticleEdit {
            title: Some("Local title".into()),
            tags: Some(vec![]),
            ..Default::default()
        };
        let draft = project_article(&edit, Some(&server_article()));

        assert_eq!(draft.id.as_deref(), Some("1-A-0xa-0"));
        assert_eq!(draft.title, "Local title");
        assert!(draft.tags.is_empty());
        assert_eq!(draft.article, "QmBody");
        assert_eq!(draft.image.as_deref(), Some("QmCover"));
    }

    #[test]
    fn test_new_article_from_edit_only() {
        let edit = ArticleEdit {
            title: Some("Fresh".into()),
            image: Some(String::new()),
            ..Default::default()
        };
        let draft = project_article(&edit, None);
        assert_eq!(draft.id, None);
        assert_eq!(draft.title, "Fresh");
        assert_eq!(draft.description, "");
        assert_eq!(draft.image, None);
    }

    #[test]
    fn test_projection_is_pure() {
        let edit = PublicationEdit {
            description: Some("d".into()),
            ..Default::default()
        };
        assert!(!edit.is_empty());
        assert_eq!(project_publication(&edit, None), project_publication(&edit, None));
    }
}
