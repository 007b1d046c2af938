use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::{Store, Tabela};

/// Banco SQLite gerado a partir dos dados públicos de CNPJ.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Falha ao abrir banco de dados: {}", path))?;

        // PRAGMA journal_mode retorna um valor, então usamos query_row
        let _: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        Self::configure(conn)
    }

    /// Banco em memória, usado para testes e demonstrações.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Falha ao criar banco em memória")?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA foreign_keys = ON;",
        )?;

        // Sem a função a busca continua funcionando, só não ignora acentos
        if let Err(e) = register_unaccent(&conn) {
            warn!(erro = %e, "função unaccent indisponível");
        }
        // O lower() embutido só converte ASCII: "SÃO" viraria "sÃo"
        if let Err(e) = register_lower(&conn) {
            warn!(erro = %e, "lower() Unicode indisponível");
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn create_tables(&self) -> Result<()> {
        let conn = self.lock()?;

        // Tabelas de referência
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cnae (codigo TEXT PRIMARY KEY, descricao TEXT)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS municipio (codigo TEXT PRIMARY KEY, descricao TEXT)",
            [],
        )?;

        // Tabelas principais
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS empresas (
                cnpj_basico TEXT,
                razao_social TEXT,
                natureza_juridica TEXT,
                qualificacao_responsavel TEXT,
                capital_social REAL,
                porte_empresa TEXT,
                ente_federativo_responsavel TEXT
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS estabelecimento (
                cnpj TEXT,
                cnpj_basico TEXT,
                cnpj_ordem TEXT,
                cnpj_dv TEXT,
                matriz_filial TEXT,
                nome_fantasia TEXT,
                situacao_cadastral TEXT,
                data_situacao_cadastral TEXT,
                data_inicio_atividades TEXT,
                cnae_fiscal TEXT,
                tipo_logradouro TEXT,
                logradouro TEXT,
                numero TEXT,
                complemento TEXT,
                bairro TEXT,
                cep TEXT,
                uf TEXT,
                municipio TEXT,
                ddd1 TEXT,
                telefone1 TEXT,
                correio_eletronico TEXT
            )
            "#,
            [],
        )?;

        for (table, column) in [
            ("empresas", "cnpj_basico"),
            ("empresas", "razao_social"),
            ("estabelecimento", "cnpj"),
            ("estabelecimento", "cnpj_basico"),
            ("estabelecimento", "uf"),
            ("estabelecimento", "cnae_fiscal"),
        ] {
            create_index(&conn, table, column)?;
        }

        Ok(())
    }

    pub fn insert_codigo_descricao(&self, table: &str, codigo: &str, descricao: &str) -> Result<()> {
        let sql = format!("INSERT OR REPLACE INTO {} (codigo, descricao) VALUES (?1, ?2)", table);
        self.lock()?.execute(&sql, params![codigo, descricao])?;
        Ok(())
    }

    pub fn execute_with_params(&self, sql: &str, params: &[Value]) -> Result<usize> {
        let alteradas = self.lock()?.execute(sql, params_from_iter(params.iter()))?;
        Ok(alteradas)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Conexão com o banco envenenada por pânico anterior"))
    }
}

impl Store for Database {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Tabela, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError("conexão com o banco indisponível".into()))?;

        debug!(parametros = params.len(), "executando consulta");
        let mut stmt = conn.prepare(sql)?;
        let colunas: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let quantidade = colunas.len();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut linhas = Vec::new();
        while let Some(row) = rows.next()? {
            let mut valores = Vec::with_capacity(quantidade);
            for i in 0..quantidade {
                valores.push(row.get::<_, Value>(i)?);
            }
            linhas.push(valores);
        }

        Ok(Tabela { colunas, linhas })
    }
}

fn create_index(conn: &Connection, table: &str, column: &str) -> Result<()> {
    let index_name = format!("idx_{}_{}", table, column);
    let sql = format!("CREATE INDEX IF NOT EXISTS {} ON {}({})", index_name, table, column);
    conn.execute(&sql, [])?;
    Ok(())
}

/// Registra `unaccent(texto)`: remove acentos e converte para minúsculas.
fn register_unaccent(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "unaccent",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let texto: Option<String> = ctx.get(0)?;
            Ok(texto.map(|t| deunicode::deunicode(&t).to_lowercase()))
        },
    )
}

/// Substitui `lower(texto)` por uma versão que converte qualquer letra Unicode.
fn register_lower(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).to_lowercase()),
                outro => Value::from(outro),
            })
        },
    )
}
