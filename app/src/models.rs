use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::store::Registro;

/// Linha da listagem como veio do banco, sem formatação (usada na exportação).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinhaResultado {
    pub razao_social: Option<String>,
    pub nome_fantasia: Option<String>,
    pub cnpj: String,
    pub uf: Option<String>,
    pub data_inicio_atividades: Option<String>,
    pub situacao_cadastral: Option<String>,
    pub porte_empresa: Option<String>,
    pub capital_social: Option<f64>,
    pub municipio: Option<String>,
    pub cnae_fiscal: Option<String>,
    pub cnae_descricao: Option<String>,
}

impl LinhaResultado {
    pub fn from_registro(r: &Registro<'_>) -> Self {
        Self {
            razao_social: r.texto("razao_social"),
            nome_fantasia: r.texto("nome_fantasia"),
            cnpj: r.texto("cnpj").unwrap_or_default(),
            uf: r.texto("uf"),
            data_inicio_atividades: r.texto("data_inicio_atividades"),
            situacao_cadastral: r.texto("situacao_cadastral"),
            porte_empresa: r.texto("porte_empresa"),
            capital_social: r.numero("capital_social"),
            municipio: r.texto("municipio"),
            cnae_fiscal: r.texto("cnae_fiscal"),
            cnae_descricao: r.texto("cnae_descricao"),
        }
    }

    pub fn ativa(&self) -> bool {
        self.situacao_cadastral
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            == Some(crate::codigos::SITUACAO_ATIVA)
    }
}

/// Estabelecimento completo, com empresa, município e CNAE.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetalheEmpresa {
    pub cnpj: String,
    pub razao_social: Option<String>,
    pub nome_fantasia: Option<String>,
    pub uf: Option<String>,
    pub municipio: Option<String>,
    pub data_inicio_atividades: Option<String>,
    pub situacao_cadastral: Option<String>,
    pub porte_empresa: Option<String>,
    pub capital_social: Option<f64>,
    pub tipo_logradouro: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub bairro: Option<String>,
    pub cep: Option<String>,
    pub complemento: Option<String>,
    pub ddd1: Option<String>,
    pub telefone1: Option<String>,
    pub correio_eletronico: Option<String>,
    pub cnae_fiscal: Option<String>,
    pub cnae_descricao: Option<String>,
}

impl DetalheEmpresa {
    pub fn from_registro(r: &Registro<'_>) -> Self {
        Self {
            cnpj: r.texto("cnpj").unwrap_or_default(),
            razao_social: r.texto("razao_social"),
            nome_fantasia: r.texto("nome_fantasia"),
            uf: r.texto("uf"),
            municipio: r.texto("municipio"),
            data_inicio_atividades: r.texto("data_inicio_atividades"),
            situacao_cadastral: r.texto("situacao_cadastral"),
            porte_empresa: r.texto("porte_empresa"),
            capital_social: r.numero("capital_social"),
            tipo_logradouro: r.texto("tipo_logradouro"),
            logradouro: r.texto("logradouro"),
            numero: r.texto("numero"),
            bairro: r.texto("bairro"),
            cep: r.texto("cep"),
            complemento: r.texto("complemento"),
            ddd1: r.texto("ddd1"),
            telefone1: r.texto("telefone1"),
            correio_eletronico: r.texto("correio_eletronico"),
            cnae_fiscal: r.texto("cnae_fiscal"),
            cnae_descricao: r.texto("cnae_descricao"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SugestaoCnae {
    pub codigo: String,
    pub descricao: String,
    pub ocorrencias: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SugestaoNome {
    pub valor: String,
    pub ocorrencias: i64,
}

/// Campo de nome com autocompletar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CampoNome {
    RazaoSocial,
    NomeFantasia,
}

impl CampoNome {
    pub fn coluna(self) -> &'static str {
        match self {
            Self::RazaoSocial => "emp.razao_social",
            Self::NomeFantasia => "est.nome_fantasia",
        }
    }
}

impl fmt::Display for CampoNome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RazaoSocial => "razao_social",
            Self::NomeFantasia => "nome_fantasia",
        })
    }
}

impl FromStr for CampoNome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "razao_social" => Ok(Self::RazaoSocial),
            "nome_fantasia" => Ok(Self::NomeFantasia),
            outro => Err(format!("Campo de nome desconhecido: {outro}")),
        }
    }
}

/// Opções para montar os seletores de filtro.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OpcoesFiltro {
    pub ufs: Vec<String>,
    pub portes: Vec<String>,
    pub situacoes: Vec<String>,
    pub capital_min: f64,
    pub capital_max: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Tabela;
    use rusqlite::types::Value;

    #[test]
    fn parses_name_field() {
        assert_eq!("razao-social".parse::<CampoNome>(), Ok(CampoNome::RazaoSocial));
        assert_eq!("NOME_FANTASIA".parse::<CampoNome>(), Ok(CampoNome::NomeFantasia));
        assert!("cnpj".parse::<CampoNome>().is_err());
    }

    #[test]
    fn active_status_accepts_padded_codes() {
        let t = Tabela::new(
            &["cnpj", "situacao_cadastral"],
            vec![
                vec![Value::Text("1".into()), Value::Text("02".into())],
                vec![Value::Text("2".into()), Value::Integer(8)],
            ],
        );
        let linhas: Vec<LinhaResultado> = t.registros().map(|r| LinhaResultado::from_registro(&r)).collect();
        assert!(linhas[0].ativa());
        assert!(!linhas[1].ativa());
    }
}
