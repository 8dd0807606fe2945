// Language profile table
// Maps a language key to its Judge0 id, prompt template and extraction hints.
// Built-ins can be replaced by a languages.json file at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Substitution point for the user's task description inside a prompt template
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Language used when a request does not name one
pub const DEFAULT_LANGUAGE: &str = "python";

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("Unsupported language: {0}")]
    Unsupported(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse languages file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid language configuration: {0}")]
    Invalid(String),
}

/// How the LLM is asked to format its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// Raw source only
    Plain,
    /// A single JSON object with `language`, `code` and `explanation`
    #[default]
    Structured,
}

impl std::fmt::Display for PromptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PromptMode::Plain => write!(f, "plain"),
            PromptMode::Structured => write!(f, "structured"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub key: String,
    pub display_name: String,
    /// Judge0 language id
    pub execution_language_id: u32,
    pub prompt_template: String,
    #[serde(default)]
    pub mode: PromptMode,
    /// Prefixes that mark a reply as already being bare source
    #[serde(default)]
    pub leading_hints: Vec<String>,
}

impl LanguageProfile {
    /// Substitute the task description into the template, verbatim
    pub fn render_template(&self, task: &str) -> String {
        self.prompt_template.replace(PROMPT_PLACEHOLDER, task)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LanguagesFile {
    languages: Vec<LanguageProfile>,
}

/// Immutable set of supported languages, keyed by lower-case name
#[derive(Debug, Clone)]
pub struct LanguageTable {
    profiles: BTreeMap<String, LanguageProfile>,
}

impl LanguageTable {
    /// Build a table, rejecting duplicate keys and unusable templates
    pub fn new(profiles: Vec<LanguageProfile>) -> Result<Self, LanguageError> {
        if profiles.is_empty() {
            return Err(LanguageError::Invalid("no languages configured".to_string()));
        }

        let mut table = BTreeMap::new();
        for mut profile in profiles {
            let key = normalize_key(&profile.key);
            if key.is_empty() {
                return Err(LanguageError::Invalid("language key cannot be empty".to_string()));
            }
            if !profile.prompt_template.contains(PROMPT_PLACEHOLDER) {
                return Err(LanguageError::Invalid(format!(
                    "prompt template for '{}' has no {} placeholder",
                    key, PROMPT_PLACEHOLDER
                )));
            }
            if profile.execution_language_id == 0 {
                return Err(LanguageError::Invalid(format!(
                    "execution language id for '{}' must be positive",
                    key
                )));
            }
            profile.key = key.clone();
            if table.insert(key.clone(), profile).is_some() {
                return Err(LanguageError::Invalid(format!("duplicate language '{}'", key)));
            }
        }

        Ok(Self { profiles: table })
    }

    /// Load language profiles from a languages.json file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, LanguageError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LanguageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, LanguageError> {
        let file: LanguagesFile = serde_json::from_str(content)?;
        Self::new(file.languages)
    }

    /// Profiles compiled into the binary
    pub fn builtin() -> Self {
        let profiles = builtin_profiles()
            .into_iter()
            .map(|p| (p.key.clone(), p))
            .collect();
        Self { profiles }
    }

    /// Case-insensitive lookup; unknown keys are never replaced by a default
    pub fn resolve(&self, key: &str) -> Result<&LanguageProfile, LanguageError> {
        let key = normalize_key(key);
        self.profiles
            .get(&key)
            .ok_or(LanguageError::Unsupported(key))
    }

    /// Supported keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &LanguageProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn hints(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn builtin_profiles() -> Vec<LanguageProfile> {
    vec![
        LanguageProfile {
            key: "python".to_string(),
            display_name: "Python".to_string(),
            execution_language_id: 71,
            prompt_template: "Write a complete and executable Python script that {prompt}."
                .to_string(),
            mode: PromptMode::Structured,
            leading_hints: hints(&["import ", "from ", "def ", "class ", "print(", "#!", "if __name__"]),
        },
        LanguageProfile {
            key: "java".to_string(),
            display_name: "Java".to_string(),
            execution_language_id: 62,
            prompt_template: "Write a complete Java program that {prompt}. The code must be in a public class named 'Main' with a `public static void main(String[] args)` method."
                .to_string(),
            mode: PromptMode::Structured,
            leading_hints: hints(&["import ", "package ", "public class ", "class "]),
        },
        LanguageProfile {
            key: "c++".to_string(),
            display_name: "C++".to_string(),
            execution_language_id: 53,
            prompt_template: "Write a complete C++ program that {prompt}. The code must be in a `main` function with necessary headers like `<iostream>`."
                .to_string(),
            mode: PromptMode::Structured,
            leading_hints: hints(&["#include", "using namespace", "int main"]),
        },
        LanguageProfile {
            key: "javascript".to_string(),
            display_name: "JavaScript".to_string(),
            execution_language_id: 63,
            prompt_template: "Write a complete Node.js script that {prompt}. Print all results to standard output with console.log."
                .to_string(),
            mode: PromptMode::Plain,
            leading_hints: hints(&["const ", "let ", "var ", "function ", "console.log", "require(", "import ", "'use strict'"]),
        },
    ]
}
