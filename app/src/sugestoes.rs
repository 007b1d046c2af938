//! Sugestões para os campos de CNAE e de nome.

use std::sync::OnceLock;

use rusqlite::types::Value;
use tracing::{debug, warn};

use crate::compilador::{padrao_contem, sql_somente_digitos};
use crate::error::Result;
use crate::models::{CampoNome, SugestaoCnae, SugestaoNome};
use crate::store::Store;

/// Termos menores que isso não consultam o banco.
pub const TAMANHO_MINIMO_TERMO: usize = 2;

/// Buscas por substring ordenadas por uso (estabelecimentos que referenciam o
/// valor) e, no empate, pelo próprio valor.
pub struct Sugestoes {
    limite: u32,
    sem_acento: OnceLock<bool>,
}

impl Sugestoes {
    pub fn new(limite: u32) -> Self {
        Self {
            limite: limite.max(1),
            sem_acento: OnceLock::new(),
        }
    }

    /// Verifica uma única vez se o banco oferece `unaccent`.
    pub fn suporta_sem_acento(&self, store: &dyn Store) -> bool {
        *self.sem_acento.get_or_init(|| {
            match store.execute("SELECT unaccent(?) AS teste", &[Value::Text("ação".into())]) {
                Ok(_) => true,
                Err(e) => {
                    warn!(erro = %e, "busca sem acento indisponível, usando comparação simples");
                    false
                }
            }
        })
    }

    /// Chave de cache de um termo: termos que a comparação do banco trata
    /// como iguais compartilham a chave.
    pub fn chave(&self, store: &dyn Store, termo: &str) -> String {
        if self.suporta_sem_acento(store) {
            deunicode::deunicode(termo).to_lowercase()
        } else {
            termo.to_string()
        }
    }

    fn comparacao(&self, store: &dyn Store, coluna: &str) -> String {
        if self.suporta_sem_acento(store) {
            format!("unaccent({coluna}) LIKE unaccent(?) ESCAPE '\\'")
        } else {
            format!("lower({coluna}) LIKE lower(?) ESCAPE '\\'")
        }
    }

    pub fn sugerir_cnae(&self, store: &dyn Store, termo: &str) -> Result<Vec<SugestaoCnae>> {
        let Some(termo) = termo_valido(termo) else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "SELECT tc.codigo AS codigo, tc.descricao AS descricao, count(est.cnpj) AS ocorrencias \
             FROM cnae tc \
             LEFT JOIN estabelecimento est ON est.cnae_fiscal = {} \
             WHERE {} \
             GROUP BY tc.codigo, tc.descricao \
             ORDER BY ocorrencias DESC, tc.codigo ASC \
             LIMIT ?",
            sql_somente_digitos("tc.codigo"),
            self.comparacao(store, "tc.descricao"),
        );
        let params = [
            Value::Text(padrao_contem(termo)),
            Value::Integer(i64::from(self.limite)),
        ];

        let tabela = store.execute(&sql, &params)?;
        let sugestoes: Vec<SugestaoCnae> = tabela
            .registros()
            .filter_map(|r| {
                Some(SugestaoCnae {
                    codigo: r.texto("codigo")?,
                    descricao: r.texto("descricao").unwrap_or_default(),
                    ocorrencias: r.inteiro("ocorrencias").unwrap_or(0),
                })
            })
            .collect();
        debug!(termo, quantidade = sugestoes.len(), "sugestões de CNAE");
        Ok(sugestoes)
    }

    pub fn sugerir_nome(
        &self,
        store: &dyn Store,
        campo: CampoNome,
        termo: &str,
    ) -> Result<Vec<SugestaoNome>> {
        let Some(termo) = termo_valido(termo) else {
            return Ok(Vec::new());
        };

        let coluna = campo.coluna();
        let sql = format!(
            "SELECT {coluna} AS valor, count(*) AS ocorrencias \
             FROM estabelecimento est \
             LEFT JOIN empresas emp ON emp.cnpj_basico = est.cnpj_basico \
             WHERE {} \
             GROUP BY {coluna} \
             ORDER BY ocorrencias DESC, valor ASC \
             LIMIT ?",
            self.comparacao(store, coluna),
        );
        let params = [
            Value::Text(padrao_contem(termo)),
            Value::Integer(i64::from(self.limite)),
        ];

        let tabela = store.execute(&sql, &params)?;
        let sugestoes: Vec<SugestaoNome> = tabela
            .registros()
            .filter_map(|r| {
                Some(SugestaoNome {
                    valor: r.texto("valor")?,
                    ocorrencias: r.inteiro("ocorrencias").unwrap_or(0),
                })
            })
            .collect();
        debug!(%campo, termo, quantidade = sugestoes.len(), "sugestões de nome");
        Ok(sugestoes)
    }
}

/// Termo aparado, ou `None` se tiver menos que [`TAMANHO_MINIMO_TERMO`] caracteres.
pub fn termo_valido(termo: &str) -> Option<&str> {
    let termo = termo.trim();
    (termo.chars().count() >= TAMANHO_MINIMO_TERMO).then_some(termo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::teste::StoreFalso;
    use crate::store::Tabela;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_terms_never_reach_the_store() {
        let store = StoreFalso::new();
        let s = Sugestoes::new(20);
        assert!(s.sugerir_cnae(&store, "a").unwrap().is_empty());
        assert!(s.sugerir_cnae(&store, "  b  ").unwrap().is_empty());
        assert!(s.sugerir_nome(&store, CampoNome::RazaoSocial, "").unwrap().is_empty());
        assert_eq!(store.chamadas(), 0);
    }

    #[test]
    fn capability_is_checked_once() {
        let store = StoreFalso::new();
        let s = Sugestoes::new(20);
        s.sugerir_cnae(&store, "comércio").unwrap();
        s.sugerir_cnae(&store, "padaria").unwrap();
        s.sugerir_nome(&store, CampoNome::NomeFantasia, "pão").unwrap();

        let consultas = store.consultas();
        assert_eq!(consultas.len(), 4);
        assert!(consultas[0].0.starts_with("SELECT unaccent"));
        assert!(consultas[1..].iter().all(|(sql, _)| sql.contains("unaccent(")));
    }

    #[test]
    fn falls_back_to_case_insensitive_match() {
        let store = StoreFalso::new()
            .falha("no such function: unaccent")
            .responde(Tabela::new(
                &["codigo", "descricao", "ocorrencias"],
                vec![vec![
                    Value::Text("1091-1/02".into()),
                    Value::Text("Padaria e confeitaria".into()),
                    Value::Integer(12),
                ]],
            ));
        let s = Sugestoes::new(5);
        let r = s.sugerir_cnae(&store, "  PADARIA ").unwrap();
        assert_eq!(
            r,
            vec![SugestaoCnae {
                codigo: "1091-1/02".into(),
                descricao: "Padaria e confeitaria".into(),
                ocorrencias: 12,
            }]
        );

        let (sql, params) = &store.consultas()[1];
        assert!(sql.contains("lower(tc.descricao) LIKE lower(?)"));
        assert!(!sql.contains("unaccent"));
        assert!(sql.contains("ORDER BY ocorrencias DESC, tc.codigo ASC"));
        assert_eq!(params, &vec![Value::Text("%PADARIA%".into()), Value::Integer(5)]);
    }

    #[test]
    fn store_failure_is_reported() {
        let store = StoreFalso::new().responde(Tabela::default()).falha("banco fora do ar");
        let s = Sugestoes::new(5);
        assert!(s.sugerir_nome(&store, CampoNome::RazaoSocial, "mercado").is_err());
    }

    #[test]
    fn name_suggestions_group_by_selected_column() {
        let store = StoreFalso::new().responde(Tabela::default()).responde(Tabela::new(
            &["valor", "ocorrencias"],
            vec![
                vec![Value::Text("MERCADO BOM".into()), Value::Integer(3)],
                vec![Value::Null, Value::Integer(1)],
            ],
        ));
        let s = Sugestoes::new(5);
        let r = s.sugerir_nome(&store, CampoNome::RazaoSocial, "merc").unwrap();
        assert_eq!(
            r,
            vec![SugestaoNome {
                valor: "MERCADO BOM".into(),
                ocorrencias: 3
            }]
        );
        assert!(store.consultas()[1].0.contains("GROUP BY emp.razao_social"));
    }
}
