//! Exportação CSV da página atual com os dados crus.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::compilador::COLUNAS_LISTAGEM;
use crate::models::LinhaResultado;

pub fn nome_arquivo(pagina: u32) -> String {
    format!("empresas_pagina_{pagina}.csv")
}

/// Escreve as linhas separadas por `;`, com vírgula decimal e sem coluna de índice.
pub fn escrever_csv<W: Write>(destino: W, linhas: &[LinhaResultado]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(destino);
    wtr.write_record(COLUNAS_LISTAGEM)?;

    for l in linhas {
        let texto = |v: &Option<String>| v.clone().unwrap_or_default();
        wtr.write_record([
            texto(&l.razao_social),
            texto(&l.nome_fantasia),
            l.cnpj.clone(),
            texto(&l.uf),
            texto(&l.data_inicio_atividades),
            texto(&l.situacao_cadastral),
            texto(&l.porte_empresa),
            l.capital_social.map(decimal_virgula).unwrap_or_default(),
            texto(&l.municipio),
            texto(&l.cnae_fiscal),
            texto(&l.cnae_descricao),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn exportar_csv(linhas: &[LinhaResultado]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    escrever_csv(&mut buffer, linhas)?;
    Ok(buffer)
}

/// Grava a página em `diretorio`, devolvendo o caminho criado.
pub fn salvar_pagina(diretorio: &Path, pagina: u32, linhas: &[LinhaResultado]) -> Result<PathBuf> {
    fs::create_dir_all(diretorio)
        .with_context(|| format!("Falha ao criar diretório: {}", diretorio.display()))?;
    let caminho = diretorio.join(nome_arquivo(pagina));
    let arquivo = fs::File::create(&caminho)
        .with_context(|| format!("Falha ao criar arquivo: {}", caminho.display()))?;
    escrever_csv(arquivo, linhas)?;
    Ok(caminho)
}

/// Representação completa do número, só trocando o separador decimal.
fn decimal_virgula(valor: f64) -> String {
    valor.to_string().replace('.', ",")
}
