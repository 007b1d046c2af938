use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Falha ao executar uma consulta no banco (conexão, SQL ou leitura de linha).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConsultaError {
    /// Banco indisponível ou erro de execução. Nunca derruba a sessão.
    #[error("Banco de dados indisponível: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Entrada rejeitada antes de qualquer consulta.
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("Nenhuma empresa encontrada com o CNPJ {0}")]
    NotFound(String),

    /// Invariante do esquema violada (ex.: CNPJ duplicado em `estabelecimento`).
    #[error("Violação de esquema: {0}")]
    SchemaViolation(String),
}

pub type Result<T, E = ConsultaError> = std::result::Result<T, E>;

/// Resultado já degradado para a camada de apresentação: em caso de falha
/// carrega o valor padrão (lista vazia, zero) e uma mensagem visível.
#[derive(Debug, Serialize)]
pub struct Degradado<T> {
    pub valor: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aviso: Option<String>,
}

pub fn degradar<T: Default>(resultado: Result<T>) -> Degradado<T> {
    match resultado {
        Ok(valor) => Degradado { valor, aviso: None },
        Err(e) => {
            match &e {
                ConsultaError::StoreUnavailable(_) | ConsultaError::SchemaViolation(_) => {
                    error!(erro = %e, "consulta degradada para resultado vazio");
                }
                ConsultaError::InvalidInput(_) | ConsultaError::NotFound(_) => {}
            }
            Degradado {
                valor: T::default(),
                aviso: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failure_degrades_to_empty_with_message() {
        let r: Result<Vec<u32>> = Err(StoreError("conexão recusada".into()).into());
        let d = degradar(r);
        assert!(d.valor.is_empty());
        assert_eq!(
            d.aviso.as_deref(),
            Some("Banco de dados indisponível: conexão recusada")
        );
    }

    #[test]
    fn success_carries_no_message() {
        let d = degradar(Ok(7u64));
        assert_eq!(d.valor, 7);
        assert!(d.aviso.is_none());
    }
}
