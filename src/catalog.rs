use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Declared kind of a gift's media. Authoritative: resolution never second-
/// guesses it from the reference's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    #[default]
    Video,
    Embed,
}

impl MediaKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Video => "Video",
            MediaKind::Embed => "Embedded video",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GiftEntry {
    pub id: String,
    #[serde(default)]
    pub kind: MediaKind,
    pub media: String,
    #[serde(default)]
    pub poster: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub note: String,
}

impl GiftEntry {
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.id
        } else {
            &self.title
        }
    }

    /// Presentation hint only; the resolution path always follows `kind`.
    pub fn media_hint(&self) -> &'static str {
        match self.kind {
            MediaKind::Image => "image",
            MediaKind::Embed => "embedded player",
            MediaKind::Video => {
                if self.media.trim_end().ends_with(".mp4") {
                    "direct video"
                } else {
                    "video stream"
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Catalog {
    #[serde(default)]
    pub gifts: Vec<GiftEntry>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read gift catalog at {}", path.display()))?;
        let catalog: Catalog = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&data)
                .with_context(|| format!("parse gift catalog at {}", path.display()))?,
            _ => serde_yaml::from_str(&data)
                .with_context(|| format!("parse gift catalog at {}", path.display()))?,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gifts.is_empty() {
            bail!("catalog: no gifts defined");
        }
        let mut seen = HashSet::new();
        for gift in &self.gifts {
            if gift.id.trim().is_empty() {
                bail!("catalog: gift with empty id");
            }
            if !seen.insert(gift.id.trim()) {
                bail!("catalog: duplicate gift id {:?}", gift.id);
            }
            if gift.media.trim().is_empty() {
                bail!("catalog: gift {:?} has no media reference", gift.id);
            }
        }
        Ok(())
    }

    /// Sample gift set shown when no catalog file is configured.
    pub fn built_in() -> Self {
        Self {
            gifts: vec![
                GiftEntry {
                    id: "first-snow".into(),
                    kind: MediaKind::Video,
                    media: "/clips/first-snow.mp4".into(),
                    poster: "/posters/first-snow.png".into(),
                    title: "First snow".into(),
                    note: "The morning everything turned white.".into(),
                },
                GiftEntry {
                    id: "family-portrait".into(),
                    kind: MediaKind::Image,
                    media: "/photos/family-portrait.png".into(),
                    poster: String::new(),
                    title: "Family portrait".into(),
                    note: "Everyone managed to look at the camera this year.".into(),
                },
                GiftEntry {
                    id: "carol-night".into(),
                    kind: MediaKind::Embed,
                    media: "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ".into(),
                    poster: "/posters/carol-night.png".into(),
                    title: "Carol night".into(),
                    note: "Turn the volume up.".into(),
                },
            ],
        }
    }
}

pub fn load_or_default(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::load(path),
        None => Ok(Catalog::built_in()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn built_in_catalog_is_valid() {
        Catalog::built_in().validate().unwrap();
    }

    #[test]
    fn loads_yaml_catalog() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gifts.yaml");
        fs::write(
            &path,
            "gifts:\n  - id: one\n    kind: video\n    media: /clips/one.mp4\n    poster: /posters/one.png\n",
        )
        .unwrap();
        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.gifts.len(), 1);
        assert_eq!(catalog.gifts[0].kind, MediaKind::Video);
    }

    #[test]
    fn loads_json_catalog() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gifts.json");
        fs::write(
            &path,
            r#"{"gifts":[{"id":"one","kind":"image","media":"/photos/one.png"}]}"#,
        )
        .unwrap();
        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.gifts[0].kind, MediaKind::Image);
        assert!(catalog.gifts[0].poster.is_empty());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let catalog = Catalog {
            gifts: vec![
                GiftEntry {
                    id: "dup".into(),
                    kind: MediaKind::Image,
                    media: "/a.png".into(),
                    poster: String::new(),
                    title: String::new(),
                    note: String::new(),
                },
                GiftEntry {
                    id: "dup".into(),
                    kind: MediaKind::Image,
                    media: "/b.png".into(),
                    poster: String::new(),
                    title: String::new(),
                    note: String::new(),
                },
            ],
        };
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn rejects_missing_media_reference() {
        let catalog = Catalog {
            gifts: vec![GiftEntry {
                id: "empty".into(),
                kind: MediaKind::Video,
                media: "   ".into(),
                poster: String::new(),
                title: String::new(),
                note: String::new(),
            }],
        };
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn media_hint_follows_kind_not_suffix() {
        let gift = GiftEntry {
            id: "g".into(),
            kind: MediaKind::Embed,
            media: "/clips/looks-direct.mp4".into(),
            poster: String::new(),
            title: String::new(),
            note: String::new(),
        };
        assert_eq!(gift.media_hint(), "embedded player");
    }
}
