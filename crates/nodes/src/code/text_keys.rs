//! User-facing vocabulary used to phrase diagnostics.
//!
//! The same controller can describe its payloads as "objects" or any other
//! noun; the wording is configuration, fixed when the controller is built.

use serde::{Deserialize, Serialize};

/// Singular and plural spelling of one noun.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NounForms {
    pub singular: String,
    pub plural: String,
}

impl NounForms {
    pub fn new(singular: impl Into<String>, plural: impl Into<String>) -> Self {
        Self {
            singular: singular.into(),
            plural: plural.into(),
        }
    }
}

/// Grammatical categories the provider can spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKey {
    /// The domain noun for a returned payload ("object").
    Object,
}

/// How a text key should be rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextKeyOptions {
    pub include_article: bool,
    pub plural: bool,
}

/// Vocabulary configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextKeys {
    pub object: NounForms,
}

impl Default for TextKeys {
    fn default() -> Self {
        Self {
            object: NounForms::new("object", "objects"),
        }
    }
}

impl TextKeys {
    pub fn new(object: NounForms) -> Self {
        Self { object }
    }

    /// Spell `key`, optionally pluralised and prefixed with "a"/"an".
    pub fn get(&self, key: TextKey, options: TextKeyOptions) -> String {
        let forms = match key {
            TextKey::Object => &self.object,
        };
        let word = if options.plural {
            &forms.plural
        } else {
            &forms.singular
        };

        if !options.include_article {
            return word.clone();
        }
        if word.starts_with(['a', 'e', 'i', 'o', 'u']) {
            format!("an {word}")
        } else {
            format!("a {word}")
        }
    }

    /// "object"
    pub fn noun(&self) -> String {
        self.get(TextKey::Object, TextKeyOptions::default())
    }

    /// "an object"
    pub fn noun_with_article(&self) -> String {
        self.get(
            TextKey::Object,
            TextKeyOptions {
                include_article: true,
                plural: false,
            },
        )
    }

    /// "objects"
    pub fn plural_noun(&self) -> String {
        self.get(
            TextKey::Object,
            TextKeyOptions {
                include_article: false,
                plural: true,
            },
        )
    }
}
