//! Fachada consumida pela API HTTP e pela linha de comando.

use std::collections::BTreeMap;
use std::time::Duration;

use rusqlite::types::Value;
use serde::Serialize;
use tracing::debug;

use crate::agregador::{distribuir, formatar_linha, resumir, Distribuicoes, LinhaExibicao, ResumoPagina};
use crate::cache::CacheTtl;
use crate::codigos::{normalizar_cnae, rotulos_situacao, TabelaPorte};
use crate::compilador::{compilar, sql_somente_digitos};
use crate::config::Config;
use crate::detalhe::{buscar_detalhe, FichaEmpresa};
use crate::error::{ConsultaError, Result};
use crate::filtro::{Filtros, FiltrosAplicados, PadroesFiltro};
use crate::models::{CampoNome, DetalheEmpresa, LinhaResultado, OpcoesFiltro, SugestaoCnae, SugestaoNome};
use crate::paginacao::Paginacao;
use crate::store::Store;
use crate::sugestoes::{termo_valido, Sugestoes};

/// Entradas máximas em cada cache de referência.
const CAPACIDADE_CACHE: usize = 256;

/// Uma página de resultados com a posição no total contado.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PaginaResultado {
    pub linhas: Vec<LinhaResultado>,
    pub paginacao: Paginacao,
}

impl PaginaResultado {
    pub fn resumo(&self) -> ResumoPagina {
        resumir(&self.linhas)
    }

    pub fn exibicao(&self, porte: &TabelaPorte) -> Vec<LinhaExibicao> {
        self.linhas.iter().map(|l| formatar_linha(l, porte)).collect()
    }

    pub fn distribuicoes(&self, porte: &TabelaPorte) -> Distribuicoes {
        distribuir(&self.linhas, porte)
    }
}

pub struct Consulta<S> {
    store: S,
    porte: TabelaPorte,
    padroes: PadroesFiltro,
    sugestoes: Sugestoes,
    cache_opcoes: CacheTtl<(), OpcoesFiltro>,
    cache_cnae: CacheTtl<String, Vec<SugestaoCnae>>,
    cache_nomes: CacheTtl<(CampoNome, String), Vec<SugestaoNome>>,
    cache_descricoes: CacheTtl<String, Option<String>>,
}

impl<S: Store> Consulta<S> {
    pub fn new(store: S, porte: TabelaPorte, padroes: PadroesFiltro, limite_sugestoes: u32, ttl: Duration) -> Self {
        Self {
            store,
            porte,
            padroes,
            sugestoes: Sugestoes::new(limite_sugestoes),
            cache_opcoes: CacheTtl::new(ttl, 1),
            cache_cnae: CacheTtl::new(ttl, CAPACIDADE_CACHE),
            cache_nomes: CacheTtl::new(ttl, CAPACIDADE_CACHE),
            cache_descricoes: CacheTtl::new(ttl, CAPACIDADE_CACHE * 4),
        }
    }

    pub fn from_config(store: S, config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            store,
            config.tabela_porte()?,
            config.padroes_filtro(),
            config.limite_sugestoes,
            config.cache_ttl(),
        ))
    }

    pub fn porte(&self) -> &TabelaPorte {
        &self.porte
    }

    pub fn padroes(&self) -> PadroesFiltro {
        self.padroes
    }

    /// UFs, portes, situações e faixa de capital para os seletores.
    pub fn opcoes_filtro(&self) -> Result<OpcoesFiltro> {
        self.cache_opcoes.obter_ou((), || -> Result<OpcoesFiltro> {
            let ufs = self
                .store
                .execute(
                    "SELECT DISTINCT uf FROM estabelecimento WHERE uf IS NOT NULL AND trim(uf) <> '' ORDER BY uf",
                    &[],
                )?
                .registros()
                .filter_map(|r| r.texto("uf"))
                .collect();

            let mut portes: Vec<String> = Vec::new();
            for r in self
                .store
                .execute(
                    "SELECT DISTINCT porte_empresa FROM empresas WHERE porte_empresa IS NOT NULL ORDER BY porte_empresa",
                    &[],
                )?
                .registros()
            {
                let rotulo = self.porte.traduzir(r.texto("porte_empresa").as_deref());
                if !portes.contains(&rotulo) {
                    portes.push(rotulo);
                }
            }

            let capital_max = self.percentil_capital()?.unwrap_or(self.padroes.capital_teto);

            Ok(OpcoesFiltro {
                ufs,
                portes,
                situacoes: rotulos_situacao().into_iter().map(String::from).collect(),
                capital_min: 0.0,
                capital_max,
            })
        })
    }

    /// Percentil 95 (posto mais próximo) dos capitais positivos.
    fn percentil_capital(&self) -> Result<Option<f64>> {
        let tabela = self.store.execute(
            "SELECT capital_social FROM empresas WHERE capital_social > 0 \
             ORDER BY capital_social \
             LIMIT 1 OFFSET (SELECT max((count(*) * 95 + 99) / 100 - 1, 0) \
                             FROM empresas WHERE capital_social > 0)",
            &[],
        )?;
        let percentil = tabela
            .registros()
            .next()
            .and_then(|r| r.numero("capital_social"))
            .filter(|p| *p > 0.0);
        Ok(percentil)
    }

    pub fn sugerir_cnae(&self, termo: &str) -> Result<Vec<SugestaoCnae>> {
        let Some(termo) = termo_valido(termo) else {
            return Ok(Vec::new());
        };
        let chave = self.sugestoes.chave(&self.store, termo);
        self.cache_cnae.obter_ou(chave, || {
            self.sugestoes.sugerir_cnae(&self.store, termo)
        })
    }

    pub fn sugerir_nome(&self, campo: CampoNome, termo: &str) -> Result<Vec<SugestaoNome>> {
        let Some(termo) = termo_valido(termo) else {
            return Ok(Vec::new());
        };
        let chave = self.sugestoes.chave(&self.store, termo);
        self.cache_nomes.obter_ou((campo, chave), || {
            self.sugestoes.sugerir_nome(&self.store, campo, termo)
        })
    }

    /// Descrições dos códigos CNAE informados, chaveadas pelo código normalizado.
    pub fn descricoes_cnae(&self, codigos: &[String]) -> Result<BTreeMap<String, String>> {
        let mut resultado = BTreeMap::new();
        let mut faltantes = Vec::new();
        for codigo in codigos.iter().map(|c| normalizar_cnae(c)) {
            if codigo.is_empty() || resultado.contains_key(&codigo) || faltantes.contains(&codigo) {
                continue;
            }
            match self.cache_descricoes.get(&codigo) {
                Some(Some(descricao)) => {
                    resultado.insert(codigo, descricao);
                }
                Some(None) => {}
                None => faltantes.push(codigo),
            }
        }

        if !faltantes.is_empty() {
            let normalizado = sql_somente_digitos("codigo");
            let marcadores = vec!["?"; faltantes.len()].join(", ");
            let sql = format!(
                "SELECT {normalizado} AS codigo, descricao FROM cnae WHERE {normalizado} IN ({marcadores})"
            );
            let params: Vec<Value> = faltantes.iter().cloned().map(Value::Text).collect();
            let tabela = self.store.execute(&sql, &params)?;

            let mut encontrados = BTreeMap::new();
            for r in tabela.registros() {
                if let (Some(codigo), Some(descricao)) = (r.texto("codigo"), r.texto("descricao")) {
                    encontrados.insert(codigo, descricao);
                }
            }
            for codigo in faltantes {
                let descricao = encontrados.remove(&codigo);
                self.cache_descricoes.insert(codigo.clone(), descricao.clone());
                if let Some(descricao) = descricao {
                    resultado.insert(codigo, descricao);
                }
            }
        }

        Ok(resultado)
    }

    /// Total de estabelecimentos que atendem aos filtros.
    pub fn contar(&self, filtros: &FiltrosAplicados) -> Result<u64> {
        let consulta = compilar(filtros, &self.porte, 1);
        let tabela = self
            .store
            .execute(&consulta.contagem.texto, &consulta.contagem.params)?;
        let total = tabela.escalar().unwrap_or(0);
        Ok(u64::try_from(total).unwrap_or(0))
    }

    /// Conta e busca a página `pagina`; páginas além da última são rejeitadas.
    pub fn buscar_pagina(&self, filtros: &FiltrosAplicados, pagina: u32) -> Result<PaginaResultado> {
        let total = self.contar(filtros)?;
        let paginacao = Paginacao::new(total, filtros.limite, pagina);
        if pagina == 0 || pagina > paginacao.total_paginas {
            return Err(ConsultaError::InvalidInput(format!(
                "Página {pagina} fora do intervalo 1..={}",
                paginacao.total_paginas
            )));
        }

        let consulta = compilar(filtros, &self.porte, paginacao.pagina);
        let tabela = self
            .store
            .execute(&consulta.selecao.texto, &consulta.selecao.params)?;
        let linhas: Vec<LinhaResultado> = tabela
            .registros()
            .map(|r| LinhaResultado::from_registro(&r))
            .collect();
        debug!(total, pagina, linhas = linhas.len(), "página carregada");

        Ok(PaginaResultado { linhas, paginacao })
    }

    pub fn detalhe(&self, cnpj: &str) -> Result<DetalheEmpresa> {
        buscar_detalhe(&self.store, cnpj)
    }

    pub fn ficha(&self, cnpj: &str) -> Result<FichaEmpresa> {
        self.detalhe(cnpj).map(|d| FichaEmpresa::new(&d, &self.porte))
    }

    /// Filtros iniciais, já normalizados.
    pub fn filtros_padrao(&self) -> FiltrosAplicados {
        Filtros::padrao(self.padroes).normalizar()
    }

    pub fn invalidar_cache(&self) {
        self.cache_opcoes.invalidar();
        self.cache_cnae.invalidar();
        self.cache_nomes.invalidar();
        self.cache_descricoes.invalidar();
    }
}
