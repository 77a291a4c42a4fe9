//! Prompt text for unit summaries and grounded answers

use super::SummaryTask;
use crate::indexer::detect_language_for_path;
use crate::llm::Prompt;
use crate::types::{SearchHit, UnitKind};

pub const SUMMARY_TEMPERATURE: f32 = 0.2;
pub const ANSWER_TEMPERATURE: f32 = 0.3;

const SUMMARY_SYSTEM: &str = "You are an expert code assistant. Summarize the following code snippet in 1-2 concise sentences, explaining its primary purpose and functionality.";

const CLASS_SUMMARY_SYSTEM: &str = "You are an expert code assistant. Summarize the following class in two to three sentences. Describe its primary role and responsibility.";

const ANSWER_SYSTEM: &str = "You are an expert code assistant. Use the following context from the codebase summaries to answer the user's question. If the context doesn't contain the answer, state that you couldn't find the information in the provided summaries.";

pub const NO_CONTEXT: &str = "No relevant context found in the codebase for this question.";

/// Prompt asking for a short description of one unit
pub fn summary_prompt(task: &SummaryTask) -> Prompt {
    let fence = detect_language_for_path(&task.file_path)
        .map(|l| l.fence_tag())
        .unwrap_or("");
    let snippet = format!("Code snippet:\n\n```{}\n{}\n```", fence, task.source.trim_end());

    match task.kind {
        UnitKind::Class => Prompt::new(CLASS_SUMMARY_SYSTEM, snippet, SUMMARY_TEMPERATURE),
        UnitKind::Function => Prompt::new(SUMMARY_SYSTEM, snippet, SUMMARY_TEMPERATURE),
        UnitKind::Method => {
            let class = task.class_name.as_deref().unwrap_or_default();
            let mut context = format!("This method belongs to the class `{}`.", class);
            if let Some(doc) = &task.class_docstring {
                context.push_str(&format!("\nClass docstring: {}", doc));
            }
            Prompt::new(
                SUMMARY_SYSTEM,
                format!("{}\n\n{}", context, snippet),
                SUMMARY_TEMPERATURE,
            )
        }
    }
}

/// Render retrieved summaries as the context block of an answer prompt
pub fn format_context(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_CONTEXT.to_string();
    }

    let mut context = String::from("Here is some relevant context from the codebase summaries:\n");
    for hit in hits {
        context.push_str(&format!(
            "\n--- Context from file: {} ---\n",
            hit.metadata.source
        ));
        context.push_str(&format!("Type: {}\n", hit.metadata.unit_type));
        if hit.metadata.unit_type == UnitKind::Method
            && let Some(class) = &hit.metadata.class
        {
            context.push_str(&format!("Class: {}\n", class));
        }
        context.push_str(&format!("Name: {}\n", hit.metadata.name));
        context.push_str(&format!("Summary: {}\n", hit.text));
        context.push_str("---\n");
    }
    context
}

/// Prompt asking the model to answer only from the given context
pub fn answer_prompt(question: &str, context: &str) -> Prompt {
    Prompt::new(
        ANSWER_SYSTEM,
        format!("Context:\n\n{}\n\nQuestion: {}", context, question),
        ANSWER_TEMPERATURE,
    )
}
