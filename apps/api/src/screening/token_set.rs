//! Skill catalog and `TokenSet` — build a job description from selected
//! category labels instead of free text.
//!
//! The joined labels go through `submit_job_description` like any other text.

use serde::{Deserialize, Serialize};

pub const TECHNICAL_SKILLS: &[&str] = &[
    "Python",
    "Java",
    "SQL",
    "AI",
    "ML",
    "Web Development",
    "Javascript",
    "C",
    "C++",
    "Rust",
];

pub const NON_TECHNICAL_SKILLS: &[&str] = &["Communication", "Leadership", "Teamwork"];

#[derive(Debug, Clone, Serialize)]
pub struct SkillCatalog {
    pub technical: &'static [&'static str],
    pub non_technical: &'static [&'static str],
}

pub fn skill_catalog() -> SkillCatalog {
    SkillCatalog {
        technical: TECHNICAL_SKILLS,
        non_technical: NON_TECHNICAL_SKILLS,
    }
}

/// Ordered, de-duplicated set of selected labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    labels: Vec<String>,
}

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a label. Blank labels and case-insensitive repeats are ignored.
    pub fn select(&mut self, label: &str) -> &mut Self {
        let label = label.trim();
        if !label.is_empty() && !self.labels.iter().any(|l| l.eq_ignore_ascii_case(label)) {
            self.labels.push(label.to_string());
        }
        self
    }

    pub fn extend<I, S>(&mut self, labels: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            self.select(label.as_ref());
        }
        self
    }

    #[cfg(test)]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels joined with single spaces, in selection order.
    pub fn to_text(&self) -> String {
        self.labels.join(" ")
    }
}

impl<S: AsRef<str>> FromIterator<S> for TokenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TokenSet::new();
        set.extend(iter);
        set
    }
}
