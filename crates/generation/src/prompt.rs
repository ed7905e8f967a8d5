/// Prompt for the paediatric clinical assistant.
pub struct ClinicalPrompt;

impl ClinicalPrompt {
    /// Fill the template with the retrieved `context` and the user's `query`
    pub fn render(query: &str, context: &str) -> String {
        format!(
            "You are a paediatric clinical assistant. Use the following medical context to answer clearly, based on hospital protocols:\n\n\
             Context:\n{context}\n\n\
             Question: {query}\n\
             Answer:"
        )
    }
}
