//! Defines the [`Tag`] type, which represents a post tag.

use serde::Serialize;
use std::hash::{Hash, Hasher};

/// The directory (relative to the output directory) holding tag pages.
pub const TAGS_DIR: &str = "tags";

/// Represents a post tag. Tags are case-folded on parsing so e.g., `macOS`
/// and `MacOS` resolve to the same tag.
#[derive(Clone, Debug, Serialize)]
pub struct Tag {
    /// The tag's case-folded name.
    pub name: String,

    /// The site-absolute URL of the tag's page, `/tags/{slug}/`.
    pub url: String,
}

impl Tag {
    /// Builds a tag from its name as written in front matter.
    pub fn new(name: &str) -> Tag {
        let name = fold(name);
        Tag {
            url: format!("/{}/{}/", TAGS_DIR, slug::slugify(&name)),
            name,
        }
    }

    /// The slug used for the tag page's directory.
    pub fn slug(&self) -> String {
        slug::slugify(&self.name)
    }
}

/// Case-folds a tag name.
pub fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `name`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `name` field.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Tag {}
