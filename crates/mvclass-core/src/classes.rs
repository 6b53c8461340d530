/*!
The ordered class-name table shipped next to model weights.
*/

use anyhow::{bail, Result};
use std::sync::Arc;

/// Ordered class names; logit index `i` maps to `ClassTable[i]`.
///
/// Cloning is cheap and shares the underlying storage, so one table can
/// be handed to every request without copying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassTable {
    names: Arc<[String]>,
}

impl ClassTable {
    /// # Errors
    ///
    /// Fails for an empty table.
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            bail!("class table is empty");
        }

        Ok(Self {
            names: names.into(),
        })
    }

    /// Parse a class list from either a JSON array of strings or
    /// newline-separated text. Blank lines are skipped in text form.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim_start();
        if trimmed.starts_with('[') {
            let names: Vec<String> = serde_json::from_str(trimmed)?;
            return Self::new(names);
        }

        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }
}

impl std::ops::Index<usize> for ClassTable {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.names[index]
    }
}
