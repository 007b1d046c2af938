use rusqlite::types::Value;
use serde::Serialize;
use tracing::error;

use crate::agregador::formatar_cnae;
use crate::codigos::{
    formatar_cep, formatar_cnpj, formatar_moeda_opcional, somente_digitos, traduzir_situacao,
    TabelaPorte, NAO_DISPONIVEL,
};
use crate::compilador::sql_somente_digitos;
use crate::error::{ConsultaError, Result};
use crate::models::DetalheEmpresa;
use crate::store::Store;

/// Remove a pontuação e exige exatamente 14 dígitos.
pub fn validar_cnpj(entrada: &str) -> Result<String> {
    let cnpj = somente_digitos(entrada);
    if cnpj.len() != 14 {
        return Err(ConsultaError::InvalidInput(format!(
            "CNPJ deve conter exatamente 14 dígitos (recebidos {})",
            cnpj.len()
        )));
    }
    Ok(cnpj)
}

pub fn buscar_detalhe(store: &dyn Store, entrada: &str) -> Result<DetalheEmpresa> {
    let cnpj = validar_cnpj(entrada)?;

    let sql = format!(
        r#"
        SELECT
            emp.razao_social AS razao_social,
            est.nome_fantasia AS nome_fantasia,
            est.cnpj AS cnpj,
            est.uf AS uf,
            tmun.descricao AS municipio,
            est.data_inicio_atividades AS data_inicio_atividades,
            est.situacao_cadastral AS situacao_cadastral,
            emp.porte_empresa AS porte_empresa,
            emp.capital_social AS capital_social,
            est.tipo_logradouro AS tipo_logradouro,
            est.logradouro AS logradouro,
            est.numero AS numero,
            est.bairro AS bairro,
            est.cep AS cep,
            est.complemento AS complemento,
            est.ddd1 AS ddd1,
            est.telefone1 AS telefone1,
            est.correio_eletronico AS correio_eletronico,
            est.cnae_fiscal AS cnae_fiscal,
            tc.descricao AS cnae_descricao
        FROM estabelecimento est
        LEFT JOIN empresas emp ON emp.cnpj_basico = est.cnpj_basico
        LEFT JOIN municipio tmun ON tmun.codigo = est.municipio
        LEFT JOIN cnae tc ON {} = est.cnae_fiscal
        WHERE est.cnpj = ?
        "#,
        sql_somente_digitos("tc.codigo")
    );

    let tabela = store.execute(&sql, &[Value::Text(cnpj.clone())])?;
    match tabela.linhas.len() {
        0 => Err(ConsultaError::NotFound(formatar_cnpj(&cnpj))),
        1 => {
            let detalhe = tabela
                .registros()
                .next()
                .map(|r| DetalheEmpresa::from_registro(&r))
                .unwrap_or_default();
            Ok(detalhe)
        }
        n => {
            error!(cnpj = %cnpj, linhas = n, "CNPJ duplicado na tabela estabelecimento");
            Err(ConsultaError::SchemaViolation(format!(
                "{n} estabelecimentos com o CNPJ {}",
                formatar_cnpj(&cnpj)
            )))
        }
    }
}

/// Ficha de exibição do detalhe, com as mesmas regras de formatação da listagem.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FichaEmpresa {
    pub razao_social: String,
    pub nome_fantasia: String,
    pub cnpj: String,
    pub porte: String,
    pub capital_social: String,
    pub data_inicio: String,
    pub situacao: String,
    pub cnae: String,
    pub uf: String,
    pub municipio: String,
    pub endereco: String,
    pub bairro: String,
    pub cep: String,
    pub complemento: String,
    pub telefone: String,
    pub email: String,
}

impl FichaEmpresa {
    pub fn new(d: &DetalheEmpresa, porte: &TabelaPorte) -> Self {
        let ou_na = |v: &Option<String>| v.clone().unwrap_or_else(|| NAO_DISPONIVEL.to_string());
        Self {
            razao_social: ou_na(&d.razao_social),
            nome_fantasia: ou_na(&d.nome_fantasia),
            cnpj: formatar_cnpj(&d.cnpj),
            porte: porte.traduzir(d.porte_empresa.as_deref()),
            capital_social: formatar_moeda_opcional(d.capital_social),
            data_inicio: ou_na(&d.data_inicio_atividades),
            situacao: traduzir_situacao(d.situacao_cadastral.as_deref()),
            cnae: formatar_cnae(d.cnae_fiscal.as_deref(), d.cnae_descricao.as_deref()),
            uf: ou_na(&d.uf),
            municipio: ou_na(&d.municipio),
            endereco: endereco(d),
            bairro: ou_na(&d.bairro),
            cep: d
                .cep
                .as_deref()
                .map(formatar_cep)
                .unwrap_or_else(|| NAO_DISPONIVEL.to_string()),
            complemento: ou_na(&d.complemento),
            telefone: telefone(d),
            email: ou_na(&d.correio_eletronico),
        }
    }

    pub fn campos(&self) -> [(&'static str, &str); 16] {
        [
            ("Razão Social", self.razao_social.as_str()),
            ("Nome Fantasia", self.nome_fantasia.as_str()),
            ("CNPJ", self.cnpj.as_str()),
            ("Porte", self.porte.as_str()),
            ("Capital Social", self.capital_social.as_str()),
            ("Data Início Atividade", self.data_inicio.as_str()),
            ("Situação Cadastral", self.situacao.as_str()),
            ("CNAE Principal", self.cnae.as_str()),
            ("UF", self.uf.as_str()),
            ("Município", self.municipio.as_str()),
            ("Endereço", self.endereco.as_str()),
            ("Bairro", self.bairro.as_str()),
            ("CEP", self.cep.as_str()),
            ("Complemento", self.complemento.as_str()),
            ("Telefone", self.telefone.as_str()),
            ("Email", self.email.as_str()),
        ]
    }
}

fn endereco(d: &DetalheEmpresa) -> String {
    let via = [d.tipo_logradouro.as_deref(), d.logradouro.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    match (via.is_empty(), d.numero.as_deref()) {
        (true, None) => NAO_DISPONIVEL.to_string(),
        (true, Some(numero)) => numero.to_string(),
        (false, None) => via,
        (false, Some(numero)) => format!("{via}, {numero}"),
    }
}

fn telefone(d: &DetalheEmpresa) -> String {
    match (d.ddd1.as_deref(), d.telefone1.as_deref()) {
        (_, None) => NAO_DISPONIVEL.to_string(),
        (Some(ddd), Some(tel)) => format!("({ddd}) {tel}"),
        (None, Some(tel)) => tel.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agregador::formatar_linha;
    use crate::models::LinhaResultado;
    use crate::store::teste::StoreFalso;
    use crate::store::Tabela;
    use pretty_assertions::assert_eq;

    fn detalhe_tabela(linhas: usize) -> Tabela {
        let linha = vec![
            Value::Text("PADARIA PÃO BOM LTDA".into()),
            Value::Text("11222333000181".into()),
            Value::Text("5".into()),
            Value::Real(150000.0),
            Value::Text("RUA".into()),
            Value::Text("DAS FLORES".into()),
            Value::Text("10".into()),
            Value::Text("01310100".into()),
            Value::Text("11".into()),
            Value::Text("32221111".into()),
        ];
        Tabela::new(
            &[
                "razao_social",
                "cnpj",
                "porte_empresa",
                "capital_social",
                "tipo_logradouro",
                "logradouro",
                "numero",
                "cep",
                "ddd1",
                "telefone1",
            ],
            vec![linha; linhas],
        )
    }

    #[test]
    fn rejects_wrong_length_before_querying() {
        let store = StoreFalso::new();
        let r = buscar_detalhe(&store, "1122233300018");
        assert!(matches!(r, Err(ConsultaError::InvalidInput(_))));
        assert_eq!(store.chamadas(), 0);
    }

    #[test]
    fn missing_cnpj_is_not_found() {
        let store = StoreFalso::new();
        let r = buscar_detalhe(&store, "11.222.333/0001-81");
        assert!(matches!(r, Err(ConsultaError::NotFound(_))));
        assert_eq!(store.consultas()[0].1, vec![Value::Text("11222333000181".into())]);
    }

    #[test]
    fn duplicate_rows_are_schema_violation() {
        let store = StoreFalso::new().responde(detalhe_tabela(2));
        let r = buscar_detalhe(&store, "11222333000181");
        assert!(matches!(r, Err(ConsultaError::SchemaViolation(_))));
    }

    #[test]
    fn builds_card_consistent_with_list_row() {
        let store = StoreFalso::new().responde(detalhe_tabela(1));
        let d = buscar_detalhe(&store, "11222333000181").unwrap();
        let porte = TabelaPorte::default();
        let ficha = FichaEmpresa::new(&d, &porte);

        assert_eq!(ficha.cnpj, "11.222.333/0001-81");
        assert_eq!(ficha.porte, "Demais");
        assert_eq!(ficha.capital_social, "R$ 150.000,00");
        assert_eq!(ficha.endereco, "RUA DAS FLORES, 10");
        assert_eq!(ficha.cep, "01310-100");
        assert_eq!(ficha.telefone, "(11) 32221111");
        assert_eq!(ficha.email, NAO_DISPONIVEL);
        assert_eq!(ficha.situacao, NAO_DISPONIVEL);

        let linha = LinhaResultado {
            cnpj: d.cnpj.clone(),
            porte_empresa: d.porte_empresa.clone(),
            capital_social: d.capital_social,
            ..LinhaResultado::default()
        };
        let exibicao = formatar_linha(&linha, &porte);
        assert_eq!(exibicao.cnpj, ficha.cnpj);
        assert_eq!(exibicao.porte, ficha.porte);
        assert_eq!(exibicao.capital_social, ficha.capital_social);
    }

    #[test]
    fn empty_address_is_not_available() {
        let d = DetalheEmpresa::default();
        assert_eq!(endereco(&d), NAO_DISPONIVEL);
        assert_eq!(telefone(&d), NAO_DISPONIVEL);
    }
}
