//! Compila filtros aplicados em SQL parametrizado.
//!
//! A consulta de contagem e a consulta paginada saem do mesmo conjunto de
//! predicados, então nunca divergem.

use rusqlite::types::Value;
use tracing::debug;

use crate::codigos::{codigo_situacao, TabelaPorte};
use crate::filtro::{FaixaCapital, FiltrosAplicados};
use crate::paginacao::offset;

const FROM_BASE: &str = "FROM estabelecimento est \
    LEFT JOIN empresas emp ON emp.cnpj_basico = est.cnpj_basico";

/// Colunas da listagem, na ordem em que são exportadas.
pub const COLUNAS_LISTAGEM: [&str; 11] = [
    "razao_social",
    "nome_fantasia",
    "cnpj",
    "uf",
    "data_inicio_atividades",
    "situacao_cadastral",
    "porte_empresa",
    "capital_social",
    "municipio",
    "cnae_fiscal",
    "cnae_descricao",
];

const PROJECAO: &str = "emp.razao_social AS razao_social, \
    est.nome_fantasia AS nome_fantasia, \
    est.cnpj AS cnpj, \
    est.uf AS uf, \
    est.data_inicio_atividades AS data_inicio_atividades, \
    est.situacao_cadastral AS situacao_cadastral, \
    emp.porte_empresa AS porte_empresa, \
    emp.capital_social AS capital_social, \
    est.municipio AS municipio, \
    est.cnae_fiscal AS cnae_fiscal, \
    tc.descricao AS cnae_descricao";

/// Texto SQL com seus parâmetros posicionais.
#[derive(Clone, Debug, PartialEq)]
pub struct Sql {
    pub texto: String,
    pub params: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConsultaCompilada {
    pub contagem: Sql,
    pub selecao: Sql,
}

/// Cláusulas `WHERE` unidas por `AND`, na ordem fixa de montagem.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicados {
    pub clausulas: Vec<String>,
    pub params: Vec<Value>,
}

impl Predicados {
    fn push(&mut self, clausula: impl Into<String>, params: impl IntoIterator<Item = Value>) {
        self.clausulas.push(clausula.into());
        self.params.extend(params);
    }

    /// ` WHERE a AND b`, ou vazio quando não há predicados.
    pub fn where_sql(&self) -> String {
        if self.clausulas.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clausulas.join(" AND "))
        }
    }
}

/// Expressão SQL que remove a pontuação de um código (`4711-3/02` → `4711302`).
pub fn sql_somente_digitos(coluna: &str) -> String {
    format!("replace(replace(replace(replace({coluna}, '.', ''), '-', ''), '/', ''), ' ', '')")
}

/// Padrão `LIKE` de "contém", com `%`, `_` e `\` escapados.
pub fn padrao_contem(termo: &str) -> String {
    let escapado = termo
        .replace('\\', r"\\")
        .replace('%', r"\%")
        .replace('_', r"\_");
    format!("%{escapado}%")
}

fn contem(coluna: &str) -> String {
    format!("lower({coluna}) LIKE lower(?) ESCAPE '\\'")
}

pub fn montar_predicados(filtros: &FiltrosAplicados, porte: &TabelaPorte) -> Predicados {
    let mut p = Predicados::default();

    if !filtros.cnpj.is_empty() {
        p.push(contem("est.cnpj"), [Value::Text(padrao_contem(&filtros.cnpj))]);
    }

    if !filtros.razao_social.is_empty() {
        p.push(
            contem("emp.razao_social"),
            [Value::Text(padrao_contem(&filtros.razao_social))],
        );
    }

    if !filtros.nome_fantasia.is_empty() {
        p.push(
            contem("est.nome_fantasia"),
            [Value::Text(padrao_contem(&filtros.nome_fantasia))],
        );
    }

    if !filtros.cnaes.is_empty() {
        let marcadores = vec!["?"; filtros.cnaes.len()].join(", ");
        p.push(
            format!("est.cnae_fiscal IN ({marcadores})"),
            filtros.cnaes.iter().cloned().map(Value::Text),
        );
    }

    if let Some(uf) = &filtros.uf {
        p.push("est.uf = ?", [Value::Text(uf.clone())]);
    }

    if let Some(rotulo) = &filtros.porte {
        // Rótulo desconhecido é tratado como código já armazenado
        let codigo = porte
            .codigo(rotulo)
            .unwrap_or_else(|| porte.normalizar_codigo(rotulo));
        let largura = porte.largura();
        // Códigos armazenados mais largos que a tabela nunca casam
        p.push(
            format!(
                "length(trim(emp.porte_empresa)) <= {largura} \
                 AND substr('{zeros}' || trim(emp.porte_empresa), -{largura}, {largura}) = ?",
                zeros = "0".repeat(largura)
            ),
            [Value::Text(codigo)],
        );
    }

    if let Some(rotulo) = &filtros.situacao {
        let valor = match codigo_situacao(rotulo) {
            Some(codigo) => Value::Integer(codigo),
            None => rotulo
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(rotulo.clone())),
        };
        p.push("CAST(est.situacao_cadastral AS INTEGER) = ?", [valor]);
    }

    match filtros.faixa_capital() {
        FaixaCapital::Intervalo(min, max) => p.push(
            "emp.capital_social BETWEEN ? AND ?",
            [Value::Real(min), Value::Real(max)],
        ),
        FaixaCapital::Positivo => p.push("emp.capital_social > 0", std::iter::empty()),
    }

    p
}

/// Compila a contagem e a página `pagina` (a partir de 1) dos filtros.
///
/// Razões sociais iguais não têm ordem relativa definida: não existe chave
/// de desempate.
pub fn compilar(filtros: &FiltrosAplicados, porte: &TabelaPorte, pagina: u32) -> ConsultaCompilada {
    let predicados = montar_predicados(filtros, porte);
    let where_sql = predicados.where_sql();

    let contagem = Sql {
        texto: format!("SELECT count(*) AS total {FROM_BASE}{where_sql}"),
        params: predicados.params.clone(),
    };

    let mut params = predicados.params;
    params.push(Value::Integer(i64::from(filtros.limite)));
    params.push(Value::Integer(
        i64::try_from(offset(pagina.max(1), filtros.limite)).unwrap_or(i64::MAX),
    ));
    let selecao = Sql {
        texto: format!(
            "SELECT {PROJECAO} {FROM_BASE} \
             LEFT JOIN cnae tc ON {} = est.cnae_fiscal\
             {where_sql} \
             ORDER BY emp.razao_social ASC NULLS LAST \
             LIMIT ? OFFSET ?",
            sql_somente_digitos("tc.codigo")
        ),
        params,
    };

    debug!(
        predicados = predicados.clausulas.len(),
        parametros = contagem.params.len(),
        pagina,
        "consulta compilada"
    );

    ConsultaCompilada { contagem, selecao }
}
