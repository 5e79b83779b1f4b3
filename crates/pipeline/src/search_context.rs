//! Search augmentation text handed to the model as a system message.

use concierge_core::search::SearchResponse;

/// Format search results as a system message; `None` when nothing was found.
pub fn format_search_context(response: &SearchResponse) -> Option<String> {
    if response.is_empty() {
        return None;
    }

    let mut text = format!("Informazioni aggiornate dal web per \"{}\":\n\n", response.query);

    if let Some(answer) = response.answer.as_deref() {
        text.push_str(&format!("Risposta diretta: {answer}\n\n"));
    }

    text.push_str("Fonti trovate:\n");
    let sources = response
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   {}\n   Fonte: {}", i + 1, r.title, r.content, r.url))
        .collect::<Vec<_>>()
        .join("\n\n");
    text.push_str(&sources);

    text.push_str(
        "\n\nUtilizza queste informazioni aggiornate per rispondere alla domanda dell'utente, citando le fonti quando appropriato.",
    );

    Some(text)
}
