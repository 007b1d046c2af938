//! Critérios de pesquisa: filtros pendentes, aplicados e a sessão que os guarda.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::codigos::{normalizar_cnae, TODOS};
use crate::error::Result;
use crate::paginacao::{Paginacao, LIMITE_MAXIMO};
use crate::store::presente;

pub const CAPITAL_TETO_PADRAO: f64 = 500_000.0;
pub const TAMANHO_PAGINA_PADRAO: u32 = 100;

/// Valores iniciais configuráveis dos filtros.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PadroesFiltro {
    pub capital_teto: f64,
    pub limite: u32,
}

impl Default for PadroesFiltro {
    fn default() -> Self {
        Self {
            capital_teto: CAPITAL_TETO_PADRAO,
            limite: TAMANHO_PAGINA_PADRAO,
        }
    }
}

/// Critérios de pesquisa como editados pelo usuário.
///
/// `None` em `uf`, `porte` e `situacao` significa "sem filtro": o predicado
/// correspondente não entra na consulta. `porte` e `situacao` guardam os
/// rótulos exibidos, não os códigos armazenados.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Filtros {
    pub cnpj: String,
    pub razao_social: String,
    pub nome_fantasia: String,
    pub uf: Option<String>,
    pub porte: Option<String>,
    pub situacao: Option<String>,
    pub cnaes: Vec<String>,
    pub capital_min: f64,
    pub capital_max: f64,
    pub sem_limite_capital: bool,
    pub limite: u32,
}

impl Default for Filtros {
    fn default() -> Self {
        Self::padrao(PadroesFiltro::default())
    }
}

/// Faixa de capital social efetivamente aplicada.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FaixaCapital {
    /// `capital_social BETWEEN min AND max`, ambos inclusivos.
    Intervalo(f64, f64),
    /// Sem limite: ainda exige `capital_social > 0`.
    Positivo,
}

impl Filtros {
    pub fn padrao(padroes: PadroesFiltro) -> Self {
        Self {
            cnpj: String::new(),
            razao_social: String::new(),
            nome_fantasia: String::new(),
            uf: None,
            porte: None,
            situacao: None,
            cnaes: Vec::new(),
            capital_min: 0.0,
            capital_max: padroes.capital_teto,
            sem_limite_capital: false,
            limite: padroes.limite.clamp(1, LIMITE_MAXIMO),
        }
    }

    pub fn normalizar(&self) -> FiltrosAplicados {
        let mut cnaes: Vec<String> = Vec::with_capacity(self.cnaes.len());
        for codigo in &self.cnaes {
            if codigo.trim().eq_ignore_ascii_case(TODOS) {
                continue;
            }
            let codigo = normalizar_cnae(codigo);
            if !codigo.is_empty() && !cnaes.contains(&codigo) {
                cnaes.push(codigo);
            }
        }

        let limpar = |v: &Option<String>| {
            v.as_deref()
                .and_then(presente)
                .filter(|v| !v.eq_ignore_ascii_case(TODOS))
                .map(str::to_string)
        };

        let mut capital_min = valido(self.capital_min);
        let mut capital_max = valido(self.capital_max);
        if capital_min > capital_max {
            std::mem::swap(&mut capital_min, &mut capital_max);
        }

        FiltrosAplicados(Filtros {
            cnpj: self.cnpj.trim().to_string(),
            razao_social: self.razao_social.trim().to_string(),
            nome_fantasia: self.nome_fantasia.trim().to_string(),
            uf: limpar(&self.uf).map(|uf| uf.to_uppercase()),
            porte: limpar(&self.porte),
            situacao: limpar(&self.situacao),
            cnaes,
            capital_min,
            capital_max,
            sem_limite_capital: self.sem_limite_capital,
            limite: self.limite.clamp(1, LIMITE_MAXIMO),
        })
    }
}

fn valido(valor: f64) -> f64 {
    if valor.is_finite() {
        valor.max(0.0)
    } else {
        0.0
    }
}

/// Filtros normalizados e imutáveis, prontos para compilar.
///
/// Só podem ser obtidos por [`Filtros::normalizar`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FiltrosAplicados(Filtros);

impl Deref for FiltrosAplicados {
    type Target = Filtros;

    fn deref(&self) -> &Filtros {
        &self.0
    }
}

impl FiltrosAplicados {
    pub fn faixa_capital(&self) -> FaixaCapital {
        if self.sem_limite_capital {
            FaixaCapital::Positivo
        } else {
            FaixaCapital::Intervalo(self.capital_min, self.capital_max)
        }
    }

    /// Indica se algum critério além da faixa de capital está definido.
    pub fn tem_criterios(&self) -> bool {
        !self.cnpj.is_empty()
            || !self.razao_social.is_empty()
            || !self.nome_fantasia.is_empty()
            || self.uf.is_some()
            || self.porte.is_some()
            || self.situacao.is_some()
            || !self.cnaes.is_empty()
    }
}

/// Contexto de pesquisa de um usuário.
///
/// Edições vão para `pendente`; códigos CNAE escolhidos em buscas sucessivas
/// ficam em uma lista de preparação separada até serem confirmados. Só
/// [`SessaoConsulta::executar`] substitui os filtros aplicados, de uma vez.
#[derive(Clone, Debug)]
pub struct SessaoConsulta {
    padroes: PadroesFiltro,
    pendente: Filtros,
    cnaes_preparados: Vec<String>,
    aplicado: FiltrosAplicados,
    paginacao: Paginacao,
}

impl SessaoConsulta {
    pub fn new(padroes: PadroesFiltro) -> Self {
        let pendente = Filtros::padrao(padroes);
        let aplicado = pendente.normalizar();
        let paginacao = Paginacao::new(0, aplicado.limite, 1);
        Self {
            padroes,
            pendente,
            cnaes_preparados: Vec::new(),
            aplicado,
            paginacao,
        }
    }

    pub fn pendente(&self) -> &Filtros {
        &self.pendente
    }

    pub fn editar(&mut self, filtros: Filtros) {
        self.pendente = filtros;
    }

    pub fn aplicado(&self) -> &FiltrosAplicados {
        &self.aplicado
    }

    pub fn paginacao(&self) -> Paginacao {
        self.paginacao
    }

    pub fn cnaes_preparados(&self) -> &[String] {
        &self.cnaes_preparados
    }

    pub fn preparar_cnae(&mut self, codigo: &str) {
        let codigo = normalizar_cnae(codigo);
        if !codigo.is_empty() && !self.cnaes_preparados.contains(&codigo) {
            self.cnaes_preparados.push(codigo);
        }
    }

    pub fn descartar_cnaes_preparados(&mut self) {
        self.cnaes_preparados.clear();
    }

    /// Move a lista de preparação para os filtros pendentes.
    pub fn confirmar_cnaes(&mut self) {
        for codigo in self.cnaes_preparados.drain(..) {
            if !self.pendente.cnaes.contains(&codigo) {
                self.pendente.cnaes.push(codigo);
            }
        }
    }

    /// Aplica os filtros pendentes e volta para a primeira página.
    pub fn executar(&mut self) -> FiltrosAplicados {
        self.aplicado = self.pendente.normalizar();
        self.paginacao = Paginacao::new(0, self.aplicado.limite, 1);
        self.aplicado.clone()
    }

    /// Registra o total contado para os filtros aplicados, mantendo a página.
    pub fn registrar_total(&mut self, total_registros: u64) {
        self.paginacao = Paginacao::new(
            total_registros,
            self.aplicado.limite,
            self.paginacao.pagina,
        );
    }

    pub fn ir_para(&mut self, paginacao: Paginacao) {
        self.paginacao = paginacao;
    }

    pub fn avancar(&mut self) -> Result<u32> {
        self.paginacao = self.paginacao.proxima()?;
        Ok(self.paginacao.pagina)
    }

    pub fn voltar(&mut self) -> Result<u32> {
        self.paginacao = self.paginacao.anterior()?;
        Ok(self.paginacao.pagina)
    }

    /// Volta todos os critérios (pendentes, preparados e aplicados) ao padrão.
    pub fn limpar(&mut self) {
        *self = Self::new(self.padroes);
    }
}
