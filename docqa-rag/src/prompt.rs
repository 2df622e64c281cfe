//! Grounding prompt construction.
//!
//! [`build_prompt`] is a pure function: the same question and retrieval result
//! always render the same prompt. Refusal is enforced only through the
//! instruction text; nothing checks the model's answer against the context.

use crate::document::RetrievalResult;

/// The exact text the model is instructed to emit when the context does not
/// contain the answer.
pub const REFUSAL_SENTINEL: &str = "Não tenho informações necessárias para responder sua pergunta.";

/// Separator placed between passages in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Questions used to show the model what an out-of-context question looks like.
const OUT_OF_CONTEXT_EXAMPLES: [&str; 3] = [
    "Qual é a capital da França?",
    "Quantos clientes temos em 2024?",
    "Você acha isso bom ou ruim?",
];

/// Join the retrieved passages, in retrieval order, into one context block.
pub fn render_context(retrieval: &RetrievalResult) -> String {
    retrieval.texts().collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Render the grounding instruction for `question` over the retrieved passages.
///
/// The prompt carries the context block, a directive to answer only from it,
/// the refusal sentinel to emit verbatim when the answer is missing, a few
/// out-of-context examples and finally the question. An empty retrieval result
/// renders an empty context block, which leaves refusal as the only valid answer.
pub fn build_prompt(question: &str, retrieval: &RetrievalResult) -> String {
    let context = render_context(retrieval);

    let mut examples = String::new();
    for example in OUT_OF_CONTEXT_EXAMPLES {
        examples.push_str(&format!("Pergunta: \"{example}\"\nResposta: \"{REFUSAL_SENTINEL}\"\n\n"));
    }

    format!(
        "CONTEXTO:\n\
         {context}\n\
         \n\
         REGRAS:\n\
         - Responda somente com base no CONTEXTO.\n\
         - Se a informação não estiver explicitamente no CONTEXTO, responda:\n  \
         \"{REFUSAL_SENTINEL}\"\n\
         - Nunca invente ou use conhecimento externo.\n\
         - Nunca produza opiniões ou interpretações além do que está escrito.\n\
         \n\
         EXEMPLOS DE PERGUNTAS FORA DO CONTEXTO:\n\
         {examples}\
         PERGUNTA DO USUÁRIO:\n\
         {question}\n\
         \n\
         RESPONDA A \"PERGUNTA DO USUÁRIO\"\n"
    )
}
