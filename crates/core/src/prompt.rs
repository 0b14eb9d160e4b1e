use crate::models::RetrievedChunk;

pub const REFUSAL_ANSWER: &str = "I don't know.";

pub fn build_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
    let context_block = chunks
        .iter()
        .map(|chunk| {
            format!(
                "--- [source: {} | page: {} | chunk: {}] ---\n{}",
                chunk.metadata.source_filename,
                chunk.metadata.page_number,
                chunk.metadata.chunk_index,
                chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = String::new();
    prompt.push_str(
        "Answer the question using ONLY the information from the provided context. Be direct and concise.\n\n",
    );
    prompt.push_str("Context:\n");
    prompt.push_str(&context_block);
    prompt.push_str("\n\nQuestion:\n");
    prompt.push_str(question);
    prompt.push_str("\n\nInstructions:\n");
    prompt.push_str("- Provide a clear, direct answer without listing sources inline\n");
    prompt.push_str("- Use natural conversational language\n");
    prompt.push_str("- Be concise (2-4 sentences maximum)\n");
    prompt.push_str(&format!(
        "- If the context doesn't contain the answer, respond with ONLY: \"{REFUSAL_ANSWER}\"\n"
    ));
    prompt.push_str("- Do NOT make up information or use knowledge outside the context\n");
    prompt
}
