//! Tabelas de códigos da Receita Federal e formatação de valores para exibição.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Texto exibido quando o valor não existe na base.
pub const NAO_DISPONIVEL: &str = "N/A";

/// Sentinela "sem filtro" usada pelos seletores da interface.
pub const TODOS: &str = "Todos";

/// Código de situação cadastral "Ativa".
pub const SITUACAO_ATIVA: i64 = 2;

const SITUACOES: [(i64, &str); 5] = [
    (1, "Nula"),
    (2, "Ativa"),
    (3, "Suspensa"),
    (4, "Inapta"),
    (8, "Baixada"),
];

pub fn somente_digitos(texto: &str) -> String {
    texto.chars().filter(char::is_ascii_digit).collect()
}

/// Formata um CNPJ como `XX.XXX.XXX/XXXX-XX`.
///
/// Se depois de remover a pontuação não sobrarem exatamente 14 dígitos, a
/// entrada é devolvida sem alteração.
pub fn formatar_cnpj(cnpj: &str) -> String {
    let d = somente_digitos(cnpj);
    if d.len() != 14 {
        return cnpj.to_string();
    }
    format!(
        "{}.{}.{}/{}-{}",
        &d[..2],
        &d[2..5],
        &d[5..8],
        &d[8..12],
        &d[12..]
    )
}

/// Formata um CEP de 8 dígitos como `XXXXX-XXX`; outros valores passam direto.
pub fn formatar_cep(cep: &str) -> String {
    let d = somente_digitos(cep);
    if d.len() != 8 {
        return cep.to_string();
    }
    format!("{}-{}", &d[..5], &d[5..])
}

/// Normaliza um código CNAE para a forma só com dígitos (`4711-3/02` → `4711302`).
pub fn normalizar_cnae(codigo: &str) -> String {
    somente_digitos(codigo)
}

/// Formata um valor em reais (`R$ 1.234.567,89`).
///
/// Valores nulos viram [`NAO_DISPONIVEL`]. Textos que não são números são
/// devolvidos crus com o prefixo da moeda, sem erro.
pub fn formatar_moeda(valor: &Value) -> String {
    match valor {
        Value::Null => NAO_DISPONIVEL.to_string(),
        Value::Integer(i) => formatar_reais(*i as f64),
        Value::Real(r) => formatar_reais(*r),
        Value::Text(t) => match interpretar_numero(t) {
            Some(n) => formatar_reais(n),
            None => format!("R$ {t}"),
        },
        Value::Blob(b) => format!("R$ {}", String::from_utf8_lossy(b)),
    }
}

/// Variante de [`formatar_moeda`] para valores já numéricos.
pub fn formatar_moeda_opcional(valor: Option<f64>) -> String {
    match valor {
        Some(v) => formatar_reais(v),
        None => NAO_DISPONIVEL.to_string(),
    }
}

fn formatar_reais(valor: f64) -> String {
    if !valor.is_finite() {
        return format!("R$ {valor}");
    }
    let centavos = (valor.abs() * 100.0).round() as u128;
    let inteiro = (centavos / 100).to_string();
    let fracao = centavos % 100;

    let mut agrupado = String::with_capacity(inteiro.len() + inteiro.len() / 3);
    for (i, c) in inteiro.chars().enumerate() {
        if i > 0 && (inteiro.len() - i) % 3 == 0 {
            agrupado.push('.');
        }
        agrupado.push(c);
    }
    let sinal = if valor < 0.0 && centavos > 0 { "-" } else { "" };
    format!("R$ {sinal}{agrupado},{fracao:02}")
}

/// Aceita `1234.5` e `1234,5` (formato do arquivo da Receita).
fn interpretar_numero(texto: &str) -> Option<f64> {
    let t = texto.trim();
    t.parse::<f64>()
        .ok()
        .or_else(|| t.replace(',', ".").parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

pub fn traduzir_situacao(codigo: Option<&str>) -> String {
    let Some(codigo) = codigo.map(str::trim).filter(|c| !c.is_empty()) else {
        return NAO_DISPONIVEL.to_string();
    };
    codigo
        .parse::<i64>()
        .ok()
        .and_then(|n| SITUACOES.iter().find(|(c, _)| *c == n))
        .map(|(_, rotulo)| (*rotulo).to_string())
        .unwrap_or_else(|| codigo.to_string())
}

/// Código armazenado correspondente a um rótulo de situação.
pub fn codigo_situacao(rotulo: &str) -> Option<i64> {
    SITUACOES
        .iter()
        .find(|(_, r)| r.eq_ignore_ascii_case(rotulo.trim()))
        .map(|(c, _)| *c)
}

pub fn rotulos_situacao() -> Vec<&'static str> {
    SITUACOES.iter().map(|(_, r)| *r).collect()
}

/// Tabela de porte da empresa: código armazenado (com zeros à esquerda até
/// `largura`) para rótulo.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TabelaPorte {
    largura: usize,
    rotulos: BTreeMap<String, String>,
}

impl Default for TabelaPorte {
    fn default() -> Self {
        let rotulos = [
            ("00", "Não Informado"),
            ("01", "Microempresa"),
            ("03", "Empresa de Pequeno Porte"),
            ("05", "Demais"),
        ]
        .into_iter()
        .map(|(c, r)| (c.to_string(), r.to_string()))
        .collect();
        Self { largura: 2, rotulos }
    }
}

impl TabelaPorte {
    pub fn new(largura: usize, rotulos: BTreeMap<String, String>) -> anyhow::Result<Self> {
        if largura == 0 {
            bail!("A largura do código de porte deve ser positiva");
        }
        let mut tabela = Self {
            largura,
            rotulos: BTreeMap::new(),
        };
        for (codigo, rotulo) in rotulos {
            if codigo.is_empty() || !codigo.chars().all(|c| c.is_ascii_digit()) {
                bail!("Código de porte inválido: {codigo:?}");
            }
            if tabela.codigo(&rotulo).is_some() {
                bail!("Rótulo de porte duplicado: {rotulo:?}");
            }
            let codigo = tabela.normalizar_codigo(&codigo);
            tabela.rotulos.insert(codigo, rotulo);
        }
        Ok(tabela)
    }

    /// Carrega a tabela de um arquivo JSON `{"largura": 2, "rotulos": {"01": "..."}}`.
    pub fn carregar(caminho: &Path) -> anyhow::Result<Self> {
        let conteudo = fs::read_to_string(caminho)
            .with_context(|| format!("Falha ao ler tabela de porte: {}", caminho.display()))?;
        let bruta: TabelaPorte = serde_json::from_str(&conteudo)
            .with_context(|| format!("Tabela de porte inválida: {}", caminho.display()))?;
        Self::new(bruta.largura, bruta.rotulos)
    }

    pub fn largura(&self) -> usize {
        self.largura
    }

    /// Completa códigos numéricos com zeros à esquerda; outros textos passam aparados.
    pub fn normalizar_codigo(&self, codigo: &str) -> String {
        let codigo = codigo.trim();
        if !codigo.is_empty() && codigo.chars().all(|c| c.is_ascii_digit()) {
            format!("{codigo:0>width$}", width = self.largura)
        } else {
            codigo.to_string()
        }
    }

    /// Códigos desconhecidos são devolvidos como vieram.
    pub fn traduzir(&self, codigo: Option<&str>) -> String {
        let Some(codigo) = codigo.map(str::trim).filter(|c| !c.is_empty()) else {
            return NAO_DISPONIVEL.to_string();
        };
        self.rotulos
            .get(&self.normalizar_codigo(codigo))
            .cloned()
            .unwrap_or_else(|| codigo.to_string())
    }

    pub fn codigo(&self, rotulo: &str) -> Option<String> {
        self.rotulos
            .iter()
            .find(|(_, r)| r.as_str() == rotulo.trim())
            .map(|(c, _)| c.clone())
    }

    pub fn rotulos(&self) -> impl Iterator<Item = &str> {
        self.rotulos.values().map(String::as_str)
    }
}
