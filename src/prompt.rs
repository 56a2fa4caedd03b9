//! Prompt assembly for answer turns.
//!
//! An answer prompt is the fixed instruction block, the loaded context
//! documents, and a rendering of the recent conversation history. The worker
//! supplies the history window; everything else is loaded once at startup.

use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing::warn;

use crate::config::Config;
use crate::providers::CompletionRequest;

/// Immutable prompt ingredients shared by all answer workers.
#[derive(Debug)]
pub struct PromptContext {
    instructions: String,
    context: String,
}

impl PromptContext {
    /// Loads instructions and context documents per the config.
    ///
    /// Unreadable context files are skipped with a warning; they must never
    /// keep the pipeline from answering.
    pub fn from_config(config: &Config) -> Result<Self> {
        let instructions = config.effective_instructions()?;
        let context = load_context_files(&config.context_files);
        Ok(Self {
            instructions,
            context,
        })
    }

    #[cfg(test)]
    pub fn for_tests(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            context: String::new(),
        }
    }

    /// Builds the completion request for one question.
    ///
    /// `history` is the bounded `Q1:`/`A1:` rendering from
    /// [`crate::core::history::ConversationHistory::format_for_prompt`].
    pub fn build_request(&self, question: &str, history: &str) -> CompletionRequest {
        let mut instructions = self.instructions.clone();
        if !self.context.is_empty() {
            instructions.push_str("\n\nRELEVANT CONTEXT:\n");
            instructions.push_str(&self.context);
        }
        if !history.is_empty() {
            instructions.push_str("\n\nRECENT EXCHANGES:\n");
            instructions.push_str(history);
        }
        CompletionRequest {
            instructions,
            question: question.to_string(),
        }
    }
}

/// Reads plain-text context documents, wrapped in file markers.
///
/// Extraction from richer formats (PDF, DOCX) is an external concern; this
/// loads what is already text.
fn load_context_files(paths: &[String]) -> String {
    let mut combined = String::new();
    for path_str in paths {
        let path = Path::new(path_str);
        match fs::read_to_string(path) {
            Ok(text) => {
                let name = path
                    .file_name()
                    .map_or_else(|| path_str.clone(), |n| n.to_string_lossy().into_owned());
                combined.push_str(&format!(
                    "--- START FILE: {} ---\n{}\n--- END FILE ---\n",
                    name,
                    text.trim()
                ));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable context file");
            }
        }
    }
    combined
}
