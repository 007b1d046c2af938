use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};

static QUIET: AtomicBool = AtomicBool::new(false);
static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn init(quiet: bool, verbose: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
    VERBOSE.store(verbose, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

pub fn print_info(message: &str) {
    if !is_quiet() {
        println!("{} {}", "ℹ".blue(), message);
    }
}

pub fn print_success(message: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green().bold(), message.green());
    }
}

pub fn print_warning(message: &str) {
    if !is_quiet() {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

pub fn print_header(message: &str) {
    if !is_quiet() {
        println!("\n{}", message.bold().cyan());
        println!("{}", "─".repeat(message.chars().count()).cyan());
    }
}

pub fn print_verbose(message: &str) {
    if is_verbose() && !is_quiet() {
        println!("  {}", message.dimmed());
    }
}

/// Pares rótulo/valor, um por linha.
pub fn print_campos<V: AsRef<str>>(titulo: &str, campos: &[(&str, V)]) {
    if is_quiet() {
        return;
    }

    println!("\n{}", titulo.bold().cyan());
    for (label, value) in campos {
        println!("  {}: {}", label.bold(), value.as_ref().green());
    }
}

/// Tabela de texto com colunas alinhadas pela largura do maior valor.
pub fn print_tabela(cabecalho: &[&str], linhas: &[Vec<String>]) {
    if is_quiet() {
        return;
    }

    let mut larguras: Vec<usize> = cabecalho.iter().map(|c| c.chars().count()).collect();
    for linha in linhas {
        for (i, celula) in linha.iter().enumerate() {
            if let Some(l) = larguras.get_mut(i) {
                *l = (*l).max(celula.chars().count());
            }
        }
    }

    println!("{}", alinhar(cabecalho.iter().copied(), &larguras).bold());
    for linha in linhas {
        println!("{}", alinhar(linha.iter().map(String::as_str), &larguras));
    }
}

fn alinhar<'a>(celulas: impl Iterator<Item = &'a str>, larguras: &[usize]) -> String {
    celulas
        .zip(larguras.iter().copied())
        .map(|(c, l)| format!("{c:<l$}"))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn print_separator() {
    if !is_quiet() {
        println!("{}", "=".repeat(60).dimmed());
    }
}
