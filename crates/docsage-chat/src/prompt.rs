//! Prompt assembly for hosted providers.

use docsage_index::SearchResult;

const NO_DOCUMENTS: &str = "No documents uploaded yet.";

/// Build the full prompt: rules, optional conversation history, retrieved
/// context blocks and the user question.
pub fn build_prompt(query: &str, results: &[SearchResult], history: &str) -> String {
    let context = if results.is_empty() {
        NO_DOCUMENTS.to_string()
    } else {
        results
            .iter()
            .map(|r| {
                format!(
                    "[Document: {}, Page: {}]\n{}",
                    r.chunk.document_name, r.chunk.page_number, r.chunk.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    };

    let history_section = if history.is_empty() {
        String::new()
    } else {
        format!("\nPREVIOUS CONVERSATION:\n{history}\n")
    };

    format!(
        r#"You are "DocSage", a document Q&A assistant.

RULES:
- Your name is "DocSage". Never reveal the underlying model or its vendor.
- Never share API keys, credentials or details of internal systems.
- Answer based ONLY on the provided document context.
- If the context does not contain the answer, say the documents do not contain that information.

RESPONSE FORMAT:
1. Start with a brief 1-2 sentence overview
2. Use bullet points with "•" for lists
3. Organize information into sections with **bold headers**
4. Each bullet point should be a complete sentence
5. Do NOT include raw source citations in your text
{history_section}
DOCUMENT CONTEXT:
{context}

USER QUESTION: {query}

Provide a well-formatted answer with clear sections and bullet points:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsage_index::Chunk;

    fn hit(page: u32, text: &str) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: format!("r.pdf_{page}"),
                text: text.into(),
                document_name: "r.pdf".into(),
                page_number: page,
                token_count: 1,
            },
            score: 0.4,
        }
    }

    #[test]
    fn test_context_blocks() {
        let prompt = build_prompt("What grew?", &[hit(1, "Sales grew."), hit(3, "Costs fell.")], "");
        assert!(prompt.contains("[Document: r.pdf, Page: 1]\nSales grew.\n\n---\n\n[Document: r.pdf, Page: 3]\nCosts fell."));
        assert!(prompt.contains("USER QUESTION: What grew?"));
        assert!(!prompt.contains("PREVIOUS CONVERSATION"));
    }

    #[test]
    fn test_empty_context_and_history() {
        let prompt = build_prompt("Hi", &[], "User: earlier question");
        assert!(prompt.contains(NO_DOCUMENTS));
        assert!(prompt.contains("PREVIOUS CONVERSATION:\nUser: earlier question"));
    }
}
