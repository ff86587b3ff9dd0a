//! Data models for MARKS
//!
//! Defines the core data structures: Section and Favorite, plus the
//! input types used to create and edit them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Default section background
pub const DEFAULT_BACKGROUND: &str = "#f3f4f6";

/// Default section text color
pub const DEFAULT_TEXT: &str = "#111827";

/// A `#rrggbb` color
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    /// Parse a color, accepting upper or lower case hex digits
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        let valid = value.len() == 7
            && value.starts_with('#')
            && value[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(ValidationError::InvalidColor(value.to_string()));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn default_background() -> Self {
        Self(DEFAULT_BACKGROUND.to_string())
    }

    pub fn default_text() -> Self {
        Self(DEFAULT_TEXT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Color {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

/// A named, colored group of favorites
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    /// Unique identifier
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// Header background
    pub background_color: Color,
    /// Header text color
    pub text_color: Color,
    /// Position among all sections
    pub rank: u32,
    /// When this section was created
    pub created_at: DateTime<Utc>,
    /// When this section was last updated
    pub updated_at: DateTime<Utc>,
}

impl Section {
    /// Create a new section with default colors
    pub fn new(title: impl Into<String>, rank: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            background_color: Color::default_background(),
            text_color: Color::default_text(),
            rank,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Utc::now();
    }

    /// Update both colors
    pub fn set_colors(&mut self, background: Color, text: Color) {
        self.background_color = background;
        self.text_color = text;
        self.updated_at = Utc::now();
    }
}

/// A bookmarked URL inside a section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Favorite {
    /// Unique identifier
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// Absolute, scheme-qualified URL
    pub url: String,
    /// Icon URI
    pub icon: Option<String>,
    /// Owning section
    pub section_id: Uuid,
    /// Position within the owning section
    pub rank: u32,
    /// When this favorite was created
    pub created_at: DateTime<Utc>,
    /// When this favorite was last updated
    pub updated_at: DateTime<Utc>,
}

impl Favorite {
    /// Create a new favorite in the given section
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        section_id: Uuid,
        rank: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            url: url.into(),
            icon: None,
            section_id,
            rank,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Utc::now();
    }

    /// Update the URL
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
        self.updated_at = Utc::now();
    }

    /// Update the icon
    pub fn set_icon(&mut self, icon: Option<String>) {
        self.icon = icon;
        self.updated_at = Utc::now();
    }
}

/// Input for creating a section
#[derive(Debug, Clone, PartialEq)]
pub struct NewSection {
    pub title: String,
    pub background_color: Color,
    pub text_color: Color,
}

impl NewSection {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            background_color: Color::default_background(),
            text_color: Color::default_text(),
        }
    }

    pub fn with_colors(mut self, background: Color, text: Color) -> Self {
        self.background_color = background;
        self.text_color = text;
        self
    }
}

/// Fields to change on an existing section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub background_color: Option<Color>,
    pub text_color: Option<Color>,
}

impl SectionPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.background_color.is_none() && self.text_color.is_none()
    }
}

/// Input for creating a favorite
#[derive(Debug, Clone, PartialEq)]
pub struct NewFavorite {
    pub title: String,
    /// Raw URL; a missing scheme is completed with `https://`
    pub url: String,
    pub section_id: Uuid,
    /// Explicit icon; derived from the URL host when absent
    pub icon: Option<String>,
}

impl NewFavorite {
    pub fn new(title: impl Into<String>, url: impl Into<String>, section_id: Uuid) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            section_id,
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Fields to change on an existing favorite
///
/// A `section_id` different from the current one transfers the favorite to
/// the end of the destination section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritePatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon: Option<Option<String>>,
    pub section_id: Option<Uuid>,
}

impl FavoritePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.icon.is_none() && self.section_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::parse("#FFAA00").unwrap().as_str(), "#ffaa00");
        assert_eq!(Color::parse(" #111827 ").unwrap(), Color::default_text());
        assert!(Color::parse("ffaa00").is_err());
        assert!(Color::parse("#ffa").is_err());
        assert!(Color::parse("#gggggg").is_err());
    }

    #[test]
    fn test_color_serde_rejects_invalid() {
        let ok: Color = serde_json::from_str("\"#abcdef\"").unwrap();
        assert_eq!(ok.as_str(), "#abcdef");

        let bad: Result<Color, _> = serde_json::from_str("\"blue\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_section_new() {
        let section = Section::new("Work", 2);
        assert_eq!(section.title, "Work");
        assert_eq!(section.rank, 2);
        assert_eq!(section.background_color, Color::default_background());
        assert_eq!(section.text_color, Color::default_text());
    }

    #[test]
    fn test_favorite_set_title_touches_updated_at() {
        let mut favorite = Favorite::new("Rust", "https://rust-lang.org", Uuid::new_v4(), 0);
        let original_updated = favorite.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(10));
        favorite.set_title("Rust Lang");
        assert_eq!(favorite.title, "Rust Lang");
        assert!(favorite.updated_at > original_updated);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(SectionPatch::default().is_empty());
        assert!(FavoritePatch::default().is_empty());

        let patch = FavoritePatch {
            section_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_favorite_serialization() {
        let mut favorite = Favorite::new("Docs", "https://docs.rs", Uuid::new_v4(), 3);
        favorite.set_icon(Some("https://docs.rs/favicon.ico".to_string()));
        let json = serde_json::to_string(&favorite).unwrap();
        let deserialized: Favorite = serde_json::from_str(&json).unwrap();
        assert_eq!(favorite, deserialized);
    }
}
