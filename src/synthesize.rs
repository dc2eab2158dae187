//! Grounded answer synthesis.
//!
//! Composes retrieved citations into a grounding prompt and asks the
//! language model for an answer drawn only from that context. Synthesis
//! failure degrades to a descriptive error string — the citations the
//! caller already holds are never dropped because the model was down.

use tracing::warn;

use crate::llm::LanguageModel;
use crate::models::SourceCitation;

/// The exact phrase the model is instructed to emit when the retrieved
/// context cannot answer the question.
pub const FALLBACK_PHRASE: &str = "I cannot find this information in the documents.";

/// Synthesize an answer from `citations`, in the order provided.
///
/// Never returns an error: an unconfigured or failing model yields a
/// descriptive string instead, per the graceful-degradation policy for
/// the query path.
pub async fn synthesize_answer(
    model: Option<&dyn LanguageModel>,
    query: &str,
    citations: &[SourceCitation],
) -> String {
    let Some(model) = model else {
        return "Language model not configured.".to_string();
    };

    let prompt = build_grounding_prompt(query, citations);

    match model.generate(&prompt).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!(error = %e, "answer synthesis failed");
            format!("Error generating answer: {}", e)
        }
    }
}

/// Build the grounding prompt: citation texts with filename/page
/// attribution, concatenated in rank order, followed by the query and
/// the instruction to answer only from the given context.
pub fn build_grounding_prompt(query: &str, citations: &[SourceCitation]) -> String {
    let context: Vec<String> = citations
        .iter()
        .map(|c| format!("Source ({} p.{}): {}", c.filename, c.page_number, c.text))
        .collect();

    format!(
        "You are a legal assistant. Answer the user's query based ONLY on the provided context.\n\
         If the answer is not in the context, say \"{}\"\n\
         \n\
         Context:\n{}\n\
         \n\
         Query: {}\n\
         \n\
         Answer:",
        FALLBACK_PHRASE,
        context.join("\n\n"),
        query
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn citation(text: &str, filename: &str, page: u32) -> SourceCitation {
        SourceCitation {
            text: text.to_string(),
            filename: filename.to_string(),
            page_number: page,
            score: 0.9,
        }
    }

    #[test]
    fn prompt_keeps_citation_order_and_attribution() {
        let prompt = build_grounding_prompt(
            "When was the agreement dated?",
            &[
                citation("Agreement dated 2024-01-15.", "contract.pdf", 1),
                citation("Signed by both parties.", "contract.pdf", 3),
            ],
        );

        let first = prompt.find("Source (contract.pdf p.1)").unwrap();
        let second = prompt.find("Source (contract.pdf p.3)").unwrap();
        assert!(first < second);
        assert!(prompt.contains(FALLBACK_PHRASE));
        assert!(prompt.contains("When was the agreement dated?"));
    }

    #[tokio::test]
    async fn unconfigured_model_degrades_to_message() {
        let answer = synthesize_answer(None, "q", &[]).await;
        assert_eq!(answer, "Language model not configured.");
    }

    #[tokio::test]
    async fn model_failure_degrades_to_error_string() {
        struct DownModel;

        #[async_trait]
        impl LanguageModel for DownModel {
            async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
                anyhow::bail!("api unreachable")
            }
        }

        let answer = synthesize_answer(Some(&DownModel), "q", &[citation("t", "f.pdf", 1)]).await;
        assert!(answer.starts_with("Error generating answer:"));
        assert!(answer.contains("api unreachable"));
    }

    #[tokio::test]
    async fn successful_synthesis_returns_model_output() {
        struct EchoModel;

        #[async_trait]
        impl LanguageModel for EchoModel {
            async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
                assert!(prompt.contains("Source (contract.pdf p.1)"));
                Ok("The agreement was dated 2024-01-15.".to_string())
            }
        }

        let answer = synthesize_answer(
            Some(&EchoModel),
            "When was the agreement dated?",
            &[citation("Agreement dated 2024-01-15.", "contract.pdf", 1)],
        )
        .await;
        assert_eq!(answer, "The agreement was dated 2024-01-15.");
    }
}
