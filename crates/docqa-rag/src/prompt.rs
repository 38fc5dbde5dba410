//! Question-answering prompt construction

use docqa_core::SourceNode;

const CONTEXT_SEPARATOR: &str = "---------------------";

/// Builder for the text QA prompt sent to the LLM.
///
/// Produces the classic "context information is below" template: a block of
/// retrieved chunks, then an instruction to answer from that context only.
pub struct PromptBuilder {
    context_sections: Vec<String>,
    question: String,
    max_context_length: usize,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new() -> Self {
        Self {
            context_sections: Vec::new(),
            question: String::new(),
            max_context_length: usize::MAX,
        }
    }

    /// Cap the total context size in characters. Sections that would exceed
    /// the cap are dropped, except the first, which is truncated.
    pub fn max_context_length(mut self, max: usize) -> Self {
        self.max_context_length = max;
        self
    }

    /// Add a context section
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    /// Add every retrieved node as a context section, best match first
    pub fn add_sources(self, sources: &[SourceNode]) -> Self {
        sources.iter().fold(self, |builder, node| {
            builder.add_context(format!("file_name: {}\n\n{}", node.file_name, node.content))
        })
    }

    /// Set the question
    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        let mut context = String::new();
        let mut total_length = 0;

        for section in &self.context_sections {
            let length = section.chars().count();
            if total_length + length > self.max_context_length {
                if total_length == 0 {
                    context.extend(section.chars().take(self.max_context_length));
                }
                break;
            }
            if total_length > 0 {
                context.push_str("\n\n");
            }
            context.push_str(section);
            total_length += length;
        }

        let mut prompt = String::new();
        prompt.push_str("Context information is below.\n");
        prompt.push_str(CONTEXT_SEPARATOR);
        prompt.push('\n');
        prompt.push_str(&context);
        prompt.push('\n');
        prompt.push_str(CONTEXT_SEPARATOR);
        prompt.push('\n');
        prompt.push_str(
            "Given the context information and not prior knowledge, answer the query.\n",
        );
        prompt.push_str("Query: ");
        prompt.push_str(&self.question);
        prompt.push_str("\nAnswer: ");

        prompt
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
