//! Resumo e formatação de uma página de resultados.
//!
//! Todos os números aqui são da página exibida, não do total contado.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::codigos::{
    formatar_cnpj, formatar_moeda_opcional, traduzir_situacao, TabelaPorte, NAO_DISPONIVEL,
};
use crate::models::LinhaResultado;

/// Quantidade de CNAEs no ranking da página.
const TOP_CNAES: usize = 10;

/// Métricas calculadas só sobre as linhas da página atual.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResumoPagina {
    pub empresas_na_pagina: usize,
    pub ufs_na_pagina: usize,
    pub capital_na_pagina: f64,
    pub ativas_na_pagina: usize,
}

impl ResumoPagina {
    pub fn rotulos(&self) -> [(&'static str, String); 4] {
        [
            ("Empresas nesta página", self.empresas_na_pagina.to_string()),
            ("UFs diferentes nesta página", self.ufs_na_pagina.to_string()),
            (
                "Capital social nesta página",
                formatar_moeda_opcional(Some(self.capital_na_pagina)),
            ),
            ("Empresas ativas nesta página", self.ativas_na_pagina.to_string()),
        ]
    }
}

pub fn resumir(linhas: &[LinhaResultado]) -> ResumoPagina {
    let ufs: HashSet<&str> = linhas.iter().filter_map(|l| l.uf.as_deref()).collect();
    ResumoPagina {
        empresas_na_pagina: linhas.len(),
        ufs_na_pagina: ufs.len(),
        capital_na_pagina: linhas.iter().filter_map(|l| l.capital_social).sum(),
        ativas_na_pagina: linhas.iter().filter(|l| l.ativa()).count(),
    }
}

/// Linha pronta para a tabela da interface.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinhaExibicao {
    pub cnpj: String,
    pub razao_social: String,
    pub nome_fantasia: String,
    pub uf: String,
    pub porte: String,
    pub capital_social: String,
    pub cnae: String,
    pub data_inicio: String,
    pub situacao: String,
}

pub fn formatar_linha(linha: &LinhaResultado, porte: &TabelaPorte) -> LinhaExibicao {
    let ou_na = |v: &Option<String>| v.clone().unwrap_or_else(|| NAO_DISPONIVEL.to_string());
    LinhaExibicao {
        cnpj: formatar_cnpj(&linha.cnpj),
        razao_social: ou_na(&linha.razao_social),
        nome_fantasia: ou_na(&linha.nome_fantasia),
        uf: ou_na(&linha.uf),
        porte: porte.traduzir(linha.porte_empresa.as_deref()),
        capital_social: formatar_moeda_opcional(linha.capital_social),
        cnae: formatar_cnae(linha.cnae_fiscal.as_deref(), linha.cnae_descricao.as_deref()),
        data_inicio: ou_na(&linha.data_inicio_atividades),
        situacao: traduzir_situacao(linha.situacao_cadastral.as_deref()),
    }
}

/// `código - descrição`, ou só o código quando não há descrição.
pub fn formatar_cnae(codigo: Option<&str>, descricao: Option<&str>) -> String {
    match (codigo, descricao) {
        (Some(c), Some(d)) => format!("{c} - {d}"),
        (Some(c), None) => c.to_string(),
        (None, _) => NAO_DISPONIVEL.to_string(),
    }
}

/// Distribuições da página para os gráficos.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Distribuicoes {
    pub por_uf: Vec<(String, usize)>,
    pub por_situacao: Vec<(String, usize)>,
    pub por_porte: Vec<(String, usize)>,
    pub capital_por_uf: Vec<(String, f64)>,
    pub top_cnaes: Vec<(String, usize)>,
    pub por_ano_inicio: BTreeMap<i32, usize>,
}

pub fn distribuir(linhas: &[LinhaResultado], porte: &TabelaPorte) -> Distribuicoes {
    let mut capital: HashMap<String, f64> = HashMap::new();
    for l in linhas {
        if let (Some(uf), Some(c)) = (&l.uf, l.capital_social) {
            *capital.entry(uf.clone()).or_default() += c;
        }
    }
    let mut capital_por_uf: Vec<(String, f64)> = capital.into_iter().filter(|(_, c)| *c > 0.0).collect();
    capital_por_uf.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut top_cnaes = contar(linhas.iter().filter_map(|l| l.cnae_fiscal.clone()));
    top_cnaes.truncate(TOP_CNAES);

    let mut por_ano_inicio: BTreeMap<i32, usize> = BTreeMap::new();
    for ano in linhas
        .iter()
        .filter_map(|l| l.data_inicio_atividades.as_deref())
        .filter_map(ano_de)
    {
        *por_ano_inicio.entry(ano).or_default() += 1;
    }

    Distribuicoes {
        por_uf: contar(linhas.iter().filter_map(|l| l.uf.clone())),
        por_situacao: contar(
            linhas
                .iter()
                .map(|l| traduzir_situacao(l.situacao_cadastral.as_deref())),
        ),
        por_porte: contar(linhas.iter().map(|l| porte.traduzir(l.porte_empresa.as_deref()))),
        capital_por_uf,
        top_cnaes,
        por_ano_inicio,
    }
}

/// Contagem por valor, do mais frequente para o menos; empate pelo valor.
fn contar(valores: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut contagem: HashMap<String, usize> = HashMap::new();
    for v in valores {
        *contagem.entry(v).or_default() += 1;
    }
    let mut ordenado: Vec<_> = contagem.into_iter().collect();
    ordenado.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ordenado
}

/// Ano de uma data `YYYYMMDD` ou `YYYY-MM-DD`.
fn ano_de(data: &str) -> Option<i32> {
    let data = data.trim();
    NaiveDate::parse_from_str(data, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(data, "%Y-%m-%d"))
        .ok()
        .map(|d| d.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn linha(cnpj: &str, uf: &str, situacao: &str, capital: Option<f64>, cnae: &str) -> LinhaResultado {
        LinhaResultado {
            razao_social: Some(format!("EMPRESA {cnpj}")),
            cnpj: cnpj.into(),
            uf: Some(uf.into()),
            situacao_cadastral: Some(situacao.into()),
            porte_empresa: Some("1".into()),
            capital_social: capital,
            cnae_fiscal: Some(cnae.into()),
            data_inicio_atividades: Some("20150310".into()),
            ..LinhaResultado::default()
        }
    }

    fn pagina() -> Vec<LinhaResultado> {
        vec![
            linha("11222333000181", "SP", "02", Some(1000.0), "4711302"),
            linha("11222333000262", "SP", "08", None, "4711302"),
            linha("44555666000199", "RJ", "2", Some(250.5), "5611201"),
        ]
    }

    #[test]
    fn summarizes_page_locally() {
        let r = resumir(&pagina());
        assert_eq!(
            r,
            ResumoPagina {
                empresas_na_pagina: 3,
                ufs_na_pagina: 2,
                capital_na_pagina: 1250.5,
                ativas_na_pagina: 2,
            }
        );
        assert_eq!(r.rotulos()[2].1, "R$ 1.250,50");
        assert_eq!(resumir(&[]), ResumoPagina::default());
    }

    #[test]
    fn formats_display_row_and_keeps_raw_row() {
        let mut l = linha("11222333000181", "SP", "02", Some(1234.5), "4711302");
        l.cnae_descricao = Some("Comércio varejista".into());
        let e = formatar_linha(&l, &TabelaPorte::default());
        assert_eq!(e.cnpj, "11.222.333/0001-81");
        assert_eq!(e.porte, "Microempresa");
        assert_eq!(e.capital_social, "R$ 1.234,50");
        assert_eq!(e.cnae, "4711302 - Comércio varejista");
        assert_eq!(e.situacao, "Ativa");
        assert_eq!(e.nome_fantasia, NAO_DISPONIVEL);
        assert_eq!(l.capital_social, Some(1234.5));
    }

    #[test]
    fn builds_distributions() {
        let d = distribuir(&pagina(), &TabelaPorte::default());
        assert_eq!(d.por_uf, vec![("SP".to_string(), 2), ("RJ".to_string(), 1)]);
        assert_eq!(d.por_situacao, vec![("Ativa".to_string(), 2), ("Baixada".to_string(), 1)]);
        assert_eq!(d.por_porte, vec![("Microempresa".to_string(), 3)]);
        assert_eq!(d.capital_por_uf, vec![("SP".to_string(), 1000.0), ("RJ".to_string(), 250.5)]);
        assert_eq!(d.top_cnaes[0], ("4711302".to_string(), 2));
        assert_eq!(d.por_ano_inicio.get(&2015), Some(&3));
    }

    #[test]
    fn parses_both_date_layouts() {
        assert_eq!(ano_de("20150310"), Some(2015));
        assert_eq!(ano_de("1999-12-31"), Some(1999));
        assert_eq!(ano_de("0"), None);
    }
}
