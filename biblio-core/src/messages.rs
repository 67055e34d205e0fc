//! Fixed user-facing texts.

use crate::catalog::{BookRecord, SearchKind};

pub const APOLOGY: &str =
    "Desculpe, não entendi sua pergunta. Pode escrever com um pouco mais de detalhe o livro, autor ou tema que procura?";

pub const GREETING_PROMPT: &str =
    "Olá! Sou seu assistente literário. Me conte um livro, autor ou tema que você gosta e eu recomendo uma leitura.";

pub const BOOKS_ONLY: &str =
    "Desculpe, eu só posso te ajudar com livros. Tem alguma dúvida sobre livros, autores ou temas de leitura?";

pub const NOT_FOUND: &str =
    "Não encontrei nenhum livro para essa pergunta. Pode reformular, citando um título, autor ou tema?";

pub fn catalog_unavailable(kind: SearchKind) -> String {
    format!(
        "Erro ao consultar o catálogo de livros (busca por {}). Tente novamente em alguns instantes.",
        kind.label()
    )
}

pub fn insufficient_similar(base: &str) -> String {
    format!(
        "Não encontrei informações suficientes sobre \"{base}\" para sugerir algo parecido. Pode conferir o título?"
    )
}

pub fn no_similar(base: &str) -> String {
    format!(
        "Encontrei \"{base}\", mas não achei nenhum livro semelhante no catálogo. Quer tentar com um tema específico?"
    )
}

pub fn similar_found(base: &str, reply: &str) -> String {
    format!("Se você gostou de \"{base}\", aqui vai uma leitura parecida:\n{reply}")
}

/// "📚 {title} de {authors}, publicado em {year}. {justification}"
pub fn format_reply(book: &BookRecord, justification: &str) -> String {
    format!(
        "📚 {} de {}, publicado em {}. {}",
        book.title(),
        book.authors_display(),
        book.publication_year(),
        justification
    )
}
