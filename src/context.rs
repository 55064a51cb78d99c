use crate::knowledge::KnowledgeChunk;

/// Pipe-joined metadata line for a chunk; empty when it has none
fn metadata_line(chunk: &KnowledgeChunk) -> String {
    let tags = chunk
        .tags
        .as_ref()
        .filter(|tags| !tags.is_empty())
        .map(|tags| format!("Tags: {}", tags.join(", ")));

    [
        chunk.title.clone(),
        chunk.company.clone(),
        chunk.role.clone(),
        chunk.dates.clone(),
        tags,
    ]
    .into_iter()
    .flatten()
    .filter(|field| !field.is_empty())
    .collect::<Vec<_>>()
    .join(" | ")
}

/// Format ranked chunks as numbered source blocks for the prompt.
///
/// Each block reads `Source N (meta):` or `Source N:` followed by the chunk
/// text on the next line. Blocks keep the order given and are separated by a
/// blank line.
pub fn build_context(chunks: &[&KnowledgeChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            let meta = metadata_line(chunk);
            let label = if meta.is_empty() {
                format!("Source {}", index + 1)
            } else {
                format!("Source {} ({})", index + 1, meta)
            };
            format!("{}:\n{}", label, chunk.text).trim().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
