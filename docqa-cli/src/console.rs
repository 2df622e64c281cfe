//! Interactive question loop.

use anyhow::{Context, Result};
use docqa_rag::QueryPipeline;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;

use crate::config::AppConfig;
use crate::providers;

const BANNER_WIDTH: usize = 60;
const PROMPT: &str = "\x1b[1;34mPERGUNTA:\x1b[0m ";

/// What one line typed at the prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatInput<'a> {
    Quit,
    Clear,
    Empty,
    Question(&'a str),
}

impl<'a> ChatInput<'a> {
    /// Classify a raw input line. Commands are case-insensitive.
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Self::Empty,
            "sair" | "exit" | "quit" => Self::Quit,
            "limpar" | "clear" => Self::Clear,
            _ => Self::Question(trimmed),
        }
    }
}

fn print_banner() {
    println!("{}", "=".repeat(BANNER_WIDTH));
    println!("  RAG Chat - Pergunte sobre o documento");
    println!("{}", "=".repeat(BANNER_WIDTH));
}

fn print_startup_checklist(error: &docqa_rag::RagError) {
    eprintln!("\n\x1b[1;31mErro ao iniciar o sistema:\x1b[0m {}", error.user_message());
    eprintln!("\nVerifique se:");
    eprintln!("  1. O arquivo .env está configurado corretamente");
    eprintln!("  2. O PostgreSQL com pgvector está acessível (DATABASE_URL)");
    eprintln!("  3. A ingestão foi executada (docqa ingest)");
}

/// Build the query pipeline and run the interactive loop until the user quits.
pub async fn run(config: &AppConfig) -> Result<()> {
    print_banner();
    println!("\nDigite 'sair', 'exit' ou 'quit' para encerrar");
    println!("Digite 'limpar' ou 'clear' para limpar a tela\n");

    let pipeline = match providers::query_pipeline(config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            print_startup_checklist(&e);
            return Err(e).context("failed to start chat");
        }
    };
    println!("Sistema iniciado (collection '{}').", pipeline.collection());

    let mut editor = DefaultEditor::new().context("failed to open terminal")?;
    loop {
        let line = match editor.readline(&format!("\n{PROMPT}")) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };

        match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Clear => {
                if let Err(e) = editor.clear_screen() {
                    warn!(error = %e, "failed to clear screen");
                }
                print_banner();
            }
            ChatInput::Question(question) => {
                if let Err(e) = editor.add_history_entry(question) {
                    warn!(error = %e, "failed to record history");
                }
                answer(&pipeline, question).await;
            }
        }
    }

    println!("\nEncerrando chat. Até logo!");
    Ok(())
}

/// Ask one question and print the outcome. Failures are reported, never fatal.
async fn answer(pipeline: &QueryPipeline, question: &str) {
    println!("\n\x1b[2mBuscando informações...\x1b[0m");
    match pipeline.ask(question).await {
        Ok(answer) => {
            println!("\n\x1b[1;32mRESPOSTA:\x1b[0m {answer}");
            println!("\n{}", "-".repeat(BANNER_WIDTH));
        }
        Err(e) => {
            println!("\n\x1b[1;31mErro ao processar pergunta:\x1b[0m {}", e.user_message());
            println!("\nTente novamente ou digite 'sair' para encerrar.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(ChatInput::parse("SAIR"), ChatInput::Quit);
        assert_eq!(ChatInput::parse(" exit "), ChatInput::Quit);
        assert_eq!(ChatInput::parse("Limpar"), ChatInput::Clear);
        assert_eq!(ChatInput::parse("clear"), ChatInput::Clear);
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(ChatInput::parse(""), ChatInput::Empty);
        assert_eq!(ChatInput::parse("   \t"), ChatInput::Empty);
    }

    #[test]
    fn questions_are_trimmed() {
        assert_eq!(
            ChatInput::parse("  Qual o faturamento da empresa?  "),
            ChatInput::Question("Qual o faturamento da empresa?")
        );
        assert_eq!(ChatInput::parse("sair agora"), ChatInput::Question("sair agora"));
    }
}
