//! Contrato com o executor de consultas.

use rusqlite::types::Value;

use crate::error::StoreError;

/// Executor de consultas somente leitura.
///
/// Parâmetros sempre viajam separados do SQL: nenhuma implementação pode
/// interpolar valores do usuário no texto da consulta.
pub trait Store: Send + Sync {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Tabela, StoreError>;
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Tabela, StoreError> {
        (**self).execute(sql, params)
    }
}

/// Linhas devolvidas por uma consulta, com os nomes das colunas.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tabela {
    pub colunas: Vec<String>,
    pub linhas: Vec<Vec<Value>>,
}

impl Tabela {
    pub fn new(colunas: &[&str], linhas: Vec<Vec<Value>>) -> Self {
        Self {
            colunas: colunas.iter().map(|c| c.to_string()).collect(),
            linhas,
        }
    }

    pub fn registros(&self) -> impl Iterator<Item = Registro<'_>> {
        self.linhas.iter().map(move |valores| Registro {
            colunas: &self.colunas,
            valores,
        })
    }

    /// Primeira coluna da primeira linha como inteiro (ex.: `COUNT(*)`).
    pub fn escalar(&self) -> Option<i64> {
        match self.linhas.first()?.first()? {
            Value::Integer(i) => Some(*i),
            Value::Real(r) => Some(*r as i64),
            Value::Text(t) => t.trim().parse().ok(),
            Value::Null | Value::Blob(_) => None,
        }
    }
}

/// Uma linha acessada pelo nome da coluna.
#[derive(Clone, Copy, Debug)]
pub struct Registro<'a> {
    colunas: &'a [String],
    valores: &'a [Value],
}

impl<'a> Registro<'a> {
    pub fn valor(&self, coluna: &str) -> &'a Value {
        self.colunas
            .iter()
            .position(|c| c == coluna)
            .and_then(|i| self.valores.get(i))
            .unwrap_or(&Value::Null)
    }

    /// Valor como texto; nulos e textos em branco são ausentes.
    pub fn texto(&self, coluna: &str) -> Option<String> {
        let texto = match self.valor(coluna) {
            Value::Null => return None,
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => r.to_string(),
            Value::Text(t) => t.clone(),
            Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        };
        presente(&texto).map(str::to_string)
    }

    pub fn numero(&self, coluna: &str) -> Option<f64> {
        match self.valor(coluna) {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            Value::Text(t) => t.trim().replace(',', ".").parse().ok(),
            Value::Null | Value::Blob(_) => None,
        }
    }

    pub fn inteiro(&self, coluna: &str) -> Option<i64> {
        self.numero(coluna).map(|n| n as i64)
    }
}

/// Verificação canônica de presença: texto vazio ou só espaços é ausente.
pub fn presente(texto: &str) -> Option<&str> {
    let t = texto.trim();
    (!t.is_empty()).then_some(t)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_columns_by_name() {
        let t = Tabela::new(
            &["cnpj", "capital_social", "uf"],
            vec![vec![
                Value::Text("11222333000181".into()),
                Value::Text("1500,50".into()),
                Value::Text("  ".into()),
            ]],
        );
        let r = t.registros().next().unwrap();
        assert_eq!(r.texto("cnpj").as_deref(), Some("11222333000181"));
        assert_eq!(r.numero("capital_social"), Some(1500.5));
        assert_eq!(r.texto("uf"), None);
        assert_eq!(r.texto("inexistente"), None);
    }

    #[test]
    fn scalar_reads_count() {
        let t = Tabela::new(&["count"], vec![vec![Value::Integer(42)]]);
        assert_eq!(t.escalar(), Some(42));
        assert_eq!(Tabela::default().escalar(), None);
    }
}
