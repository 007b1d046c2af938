use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::codigos::TabelaPorte;
use crate::filtro::{PadroesFiltro, CAPITAL_TETO_PADRAO, TAMANHO_PAGINA_PADRAO};

/// Configuração compartilhada pelos subcomandos.
///
/// Cada opção pode vir da linha de comando, de variável de ambiente (também
/// lida de um `.env`) ou do valor padrão, nessa ordem.
#[derive(Args, Clone, Debug)]
pub struct Config {
    /// Caminho do banco SQLite
    #[arg(short, long, global = true, env = "CNPJ_DB", default_value = "dados-publicos/cnpj.db")]
    pub database: String,

    /// Máximo de sugestões por busca
    #[arg(long, global = true, env = "CNPJ_LIMITE_SUGESTOES", default_value_t = 20)]
    pub limite_sugestoes: u32,

    /// Teto padrão do filtro de capital social quando não há dados
    #[arg(long, global = true, env = "CNPJ_CAPITAL_TETO", default_value_t = CAPITAL_TETO_PADRAO)]
    pub capital_teto: f64,

    /// Registros por página (1 a 500)
    #[arg(
        long,
        global = true,
        env = "CNPJ_TAMANHO_PAGINA",
        default_value_t = TAMANHO_PAGINA_PADRAO,
        value_parser = clap::value_parser!(u32).range(1..=500)
    )]
    pub tamanho_pagina: u32,

    /// Validade, em segundos, dos dados de referência em cache
    #[arg(long, global = true, env = "CNPJ_CACHE_TTL", default_value_t = 300)]
    pub cache_ttl: u64,

    /// Segundos sem acesso até uma sessão da API ser descartada
    #[arg(long, global = true, env = "CNPJ_SESSAO_TTL", default_value_t = 1800)]
    pub sessao_ttl: u64,

    /// Arquivo JSON com a tabela de porte (padrão: códigos da Receita Federal)
    #[arg(long, global = true, env = "CNPJ_TABELA_PORTE")]
    pub tabela_porte: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "dados-publicos/cnpj.db".to_string(),
            limite_sugestoes: 20,
            capital_teto: CAPITAL_TETO_PADRAO,
            tamanho_pagina: TAMANHO_PAGINA_PADRAO,
            cache_ttl: 300,
            sessao_ttl: 1800,
            tabela_porte: None,
        }
    }
}

impl Config {
    pub fn tabela_porte(&self) -> Result<TabelaPorte> {
        match &self.tabela_porte {
            Some(caminho) => TabelaPorte::carregar(caminho),
            None => Ok(TabelaPorte::default()),
        }
    }

    pub fn padroes_filtro(&self) -> PadroesFiltro {
        let capital_teto = if self.capital_teto.is_finite() && self.capital_teto > 0.0 {
            self.capital_teto
        } else {
            CAPITAL_TETO_PADRAO
        };
        PadroesFiltro {
            capital_teto,
            limite: self.tamanho_pagina,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn sessao_ttl(&self) -> Duration {
        Duration::from_secs(self.sessao_ttl)
    }
}
