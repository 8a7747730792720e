//! Prompt Book
//!
//! Maps a subject type ("cat", ...) to the instruction sent to the transformer.

use std::collections::HashMap;

use crate::error::{FurbleError, Result};

/// Subject used when a request does not name one
pub const DEFAULT_SUBJECT: &str = "cat";

/// Magistrate portrait instruction for cats
pub const MAGISTRATE_PROMPT_CAT: &str = r"Use the first image as the composition and costume template: a stately oil portrait of a magistrate in a dark robe with a white jabot, seated before a draped velvet background.

Replace the magistrate with the cat from the second image. Keep the cat's exact fur colours, markings, eye colour and face shape so the owner instantly recognises their pet.

Render the result as a classical oil painting with soft chiaroscuro lighting, visible brush texture and a warm, aged varnish. The cat should sit upright with dignity, paws resting naturally, wearing the robe and jabot from the template.

Do not add text, signatures, frames or extra animals.";

/// Lookup table from subject key to prompt text
#[derive(Clone, Debug)]
pub struct PromptBook {
    prompts: HashMap<String, String>,
}

impl Default for PromptBook {
    fn default() -> Self {
        let mut book = Self::empty();
        book.insert(DEFAULT_SUBJECT, MAGISTRATE_PROMPT_CAT);
        book
    }
}

impl PromptBook {
    pub fn empty() -> Self {
        Self {
            prompts: HashMap::new(),
        }
    }

    /// Add or replace the prompt for a subject. Keys are case-insensitive.
    pub fn insert(&mut self, subject: &str, prompt: impl Into<String>) {
        self.prompts.insert(subject.to_lowercase(), prompt.into());
    }

    pub fn get(&self, subject: &str) -> Result<&str> {
        self.prompts
            .get(&subject.to_lowercase())
            .map(String::as_str)
            .ok_or_else(|| FurbleError::Validation(format!("No prompt for subject '{subject}'")))
    }

    pub fn subjects(&self) -> Vec<&str> {
        let mut subjects: Vec<&str> = self.prompts.keys().map(String::as_str).collect();
        subjects.sort_unstable();
        subjects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_cat() {
        let book = PromptBook::default();
        assert_eq!(book.get("cat").unwrap(), MAGISTRATE_PROMPT_CAT);
        assert_eq!(book.get("CAT").unwrap(), MAGISTRATE_PROMPT_CAT);
    }

    #[test]
    fn test_extensible() {
        let mut book = PromptBook::default();
        book.insert("dog", "A dog magistrate");
        assert_eq!(book.get("dog").unwrap(), "A dog magistrate");
        assert_eq!(book.subjects(), vec!["cat", "dog"]);
    }

    #[test]
    fn test_unknown_subject() {
        let err = PromptBook::default().get("ferret").unwrap_err();
        assert!(matches!(err, FurbleError::Validation(_)));
    }
}
