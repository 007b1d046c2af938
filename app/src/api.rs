use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse, ResponseError, Result as ActixResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agregador::{Distribuicoes, LinhaExibicao, ResumoPagina};
use crate::config::Config;
use crate::database::Database;
use crate::detalhe::FichaEmpresa;
use crate::error::{degradar, ConsultaError};
use crate::exportar::{exportar_csv, nome_arquivo};
use crate::filtro::{Filtros, FiltrosAplicados, SessaoConsulta};
use crate::models::{CampoNome, DetalheEmpresa, LinhaResultado};
use crate::paginacao::Paginacao;
use crate::servico::Consulta;
use crate::store::Store;
use crate::ui;

impl ResponseError for ConsultaError {
    fn status_code(&self) -> StatusCode {
        match self {
            ConsultaError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ConsultaError::NotFound(_) => StatusCode::NOT_FOUND,
            ConsultaError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ConsultaError::SchemaViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "erro": self.to_string()
        }))
    }
}

/// Limite de sessões simultâneas; ao atingi-lo, a de acesso mais antigo sai.
pub const MAX_SESSOES: usize = 10_000;

/// Sessões por id, descartadas depois de `ttl` sem acesso.
pub struct Sessoes {
    ttl: Duration,
    capacidade: usize,
    entradas: Mutex<HashMap<String, (Instant, SessaoConsulta)>>,
}

impl Sessoes {
    pub fn new(ttl: Duration, capacidade: usize) -> Self {
        Self {
            ttl,
            capacidade: capacidade.max(1),
            entradas: Mutex::new(HashMap::new()),
        }
    }

    fn entradas(&self) -> MutexGuard<'_, HashMap<String, (Instant, SessaoConsulta)>> {
        // Uma sessão com estado inconsistente ainda é melhor que derrubar todas
        self.entradas.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Executa `f` sobre a sessão `id`, criando-a com `criar` se não existir.
    pub fn com_sessao<T>(
        &self,
        id: &str,
        criar: impl FnOnce() -> SessaoConsulta,
        f: impl FnOnce(&mut SessaoConsulta) -> T,
    ) -> T {
        let mut entradas = self.entradas();
        let ttl = self.ttl;
        entradas.retain(|_, (acesso, _)| acesso.elapsed() < ttl);
        if entradas.len() >= self.capacidade && !entradas.contains_key(id) {
            let mais_antiga = entradas
                .iter()
                .min_by_key(|(_, (acesso, _))| *acesso)
                .map(|(k, _)| k.clone());
            if let Some(k) = mais_antiga {
                debug!(sessao = %k, "sessão descartada por capacidade");
                entradas.remove(&k);
            }
        }

        let (acesso, sessao) = entradas
            .entry(id.to_string())
            .or_insert_with(|| (Instant::now(), criar()));
        *acesso = Instant::now();
        f(sessao)
    }

    /// Executa `f` só se a sessão `id` existir e não tiver expirado.
    pub fn existente<T>(&self, id: &str, f: impl FnOnce(&mut SessaoConsulta) -> T) -> Option<T> {
        let mut entradas = self.entradas();
        let valida = entradas.get(id).map(|(acesso, _)| acesso.elapsed() < self.ttl)?;
        if !valida {
            entradas.remove(id);
            return None;
        }
        let (acesso, sessao) = entradas.get_mut(id)?;
        *acesso = Instant::now();
        Some(f(sessao))
    }

    pub fn len(&self) -> usize {
        self.entradas().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct AppState {
    pub consulta: Consulta<Arc<dyn Store>>,
    sessoes: Sessoes,
}

impl AppState {
    pub fn new(consulta: Consulta<Arc<dyn Store>>, ttl_sessao: Duration) -> Self {
        Self {
            consulta,
            sessoes: Sessoes::new(ttl_sessao, MAX_SESSOES),
        }
    }

    /// Executa `f` sobre a sessão `id`, criando-a com os padrões se não existir.
    fn com_sessao<T>(&self, id: &str, f: impl FnOnce(&mut SessaoConsulta) -> T) -> T {
        let padroes = self.consulta.padroes();
        self.sessoes.com_sessao(id, || SessaoConsulta::new(padroes), f)
    }

    fn filtros_padrao(&self) -> FiltrosAplicados {
        Filtros::padrao(self.consulta.padroes()).normalizar()
    }

    /// Cópia dos filtros aplicados; a consulta roda sem segurar o lock.
    /// Sessão inexistente usa os filtros padrão e não é criada.
    fn aplicado(&self, id: &str) -> FiltrosAplicados {
        self.sessoes
            .existente(id, |s| s.aplicado().clone())
            .unwrap_or_else(|| self.filtros_padrao())
    }
}

#[derive(Deserialize)]
pub struct TermoQuery {
    #[serde(default)]
    pub termo: String,
}

#[derive(Deserialize)]
pub struct CodigosQuery {
    /// Códigos separados por vírgula.
    #[serde(default)]
    pub codigos: String,
}

#[derive(Deserialize)]
pub struct NomeQuery {
    pub campo: String,
    #[serde(default)]
    pub termo: String,
}

#[derive(Deserialize)]
pub struct CnaeBody {
    pub codigo: String,
}

#[derive(Deserialize)]
pub struct ExportarQuery {
    pub pagina: Option<u32>,
}

#[derive(Serialize)]
pub struct SessaoResponse<'a> {
    pub pendente: &'a Filtros,
    pub cnaes_preparados: &'a [String],
    pub aplicado: &'a FiltrosAplicados,
    pub paginacao: Paginacao,
}

impl<'a> SessaoResponse<'a> {
    fn de(sessao: &'a SessaoConsulta) -> Self {
        Self {
            pendente: sessao.pendente(),
            cnaes_preparados: sessao.cnaes_preparados(),
            aplicado: sessao.aplicado(),
            paginacao: sessao.paginacao(),
        }
    }
}

#[derive(Serialize)]
pub struct PaginaResponse {
    pub paginacao: Paginacao,
    pub resumo: ResumoPagina,
    pub linhas: Vec<LinhaExibicao>,
    pub dados: Vec<LinhaResultado>,
    pub distribuicoes: Distribuicoes,
}

#[derive(Serialize)]
pub struct DetalheResponse {
    pub ficha: FichaEmpresa,
    pub dados: DetalheEmpresa,
}

fn estado_sessao(state: &AppState, id: &str) -> HttpResponse {
    state.com_sessao(id, |s| HttpResponse::Ok().json(SessaoResponse::de(s)))
}

pub async fn opcoes_filtro(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(degradar(state.consulta.opcoes_filtro()))
}

pub async fn sugerir_cnae(
    query: web::Query<TermoQuery>,
    state: web::Data<AppState>,
) -> HttpResponse {
    HttpResponse::Ok().json(degradar(state.consulta.sugerir_cnae(&query.termo)))
}

pub async fn descricoes_cnae(
    query: web::Query<CodigosQuery>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let codigos: Vec<String> = query.codigos.split(',').map(str::to_string).collect();
    HttpResponse::Ok().json(degradar(state.consulta.descricoes_cnae(&codigos)))
}

pub async fn sugerir_nome(
    query: web::Query<NomeQuery>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let campo: CampoNome = query.campo.parse().map_err(ConsultaError::InvalidInput)?;
    Ok(HttpResponse::Ok().json(degradar(state.consulta.sugerir_nome(campo, &query.termo))))
}

pub async fn consultar_cnpj(
    cnpj: web::Path<String>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let dados = state.consulta.detalhe(&cnpj)?;
    let ficha = FichaEmpresa::new(&dados, state.consulta.porte());
    Ok(HttpResponse::Ok().json(DetalheResponse { ficha, dados }))
}

pub async fn editar_filtros(
    id: web::Path<String>,
    filtros: web::Json<Filtros>,
    state: web::Data<AppState>,
) -> HttpResponse {
    state.com_sessao(&id, |s| s.editar(filtros.into_inner()));
    estado_sessao(&state, &id)
}

pub async fn limpar_filtros(id: web::Path<String>, state: web::Data<AppState>) -> HttpResponse {
    state.com_sessao(&id, SessaoConsulta::limpar);
    estado_sessao(&state, &id)
}

pub async fn preparar_cnae(
    id: web::Path<String>,
    body: web::Json<CnaeBody>,
    state: web::Data<AppState>,
) -> HttpResponse {
    state.com_sessao(&id, |s| s.preparar_cnae(&body.codigo));
    estado_sessao(&state, &id)
}

pub async fn descartar_cnaes(id: web::Path<String>, state: web::Data<AppState>) -> HttpResponse {
    state.com_sessao(&id, SessaoConsulta::descartar_cnaes_preparados);
    estado_sessao(&state, &id)
}

pub async fn confirmar_cnaes(id: web::Path<String>, state: web::Data<AppState>) -> HttpResponse {
    state.com_sessao(&id, SessaoConsulta::confirmar_cnaes);
    estado_sessao(&state, &id)
}

/// Aplica os filtros pendentes e conta os resultados.
pub async fn executar(
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let aplicado = state.com_sessao(&id, SessaoConsulta::executar);
    let total = state.consulta.contar(&aplicado)?;
    info!(sessao = %id, total, "consulta executada");
    state.com_sessao(&id, |s| {
        // Outra requisição pode ter reaplicado os filtros enquanto contávamos
        if s.aplicado() == &aplicado {
            s.registrar_total(total);
        }
    });
    Ok(estado_sessao(&state, &id))
}

pub async fn contagem(
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let aplicado = state.aplicado(&id);
    let total = state.consulta.contar(&aplicado)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "total_registros": total })))
}

pub async fn pagina(
    path: web::Path<(String, u32)>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (id, numero) = path.into_inner();
    let aplicado = state.aplicado(&id);
    let resultado = state.consulta.buscar_pagina(&aplicado, numero)?;
    state.sessoes.existente(&id, |s| {
        if s.aplicado() == &aplicado {
            s.ir_para(resultado.paginacao);
        }
    });

    let porte = state.consulta.porte();
    Ok(HttpResponse::Ok().json(PaginaResponse {
        paginacao: resultado.paginacao,
        resumo: resultado.resumo(),
        linhas: resultado.exibicao(porte),
        distribuicoes: resultado.distribuicoes(porte),
        dados: resultado.linhas,
    }))
}

/// CSV da página pedida (ou da atual) com os dados crus.
pub async fn exportar(
    id: web::Path<String>,
    query: web::Query<ExportarQuery>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (aplicado, atual) = state
        .sessoes
        .existente(&id, |s| (s.aplicado().clone(), s.paginacao().pagina))
        .unwrap_or_else(|| (state.filtros_padrao(), 1));
    let numero = query.pagina.unwrap_or(atual);
    let resultado = state.consulta.buscar_pagina(&aplicado, numero)?;
    let csv = exportar_csv(&resultado.linhas)
        .map_err(|e| actix_web::error::ErrorInternalServerError(format!("Erro ao gerar CSV: {}", e)))?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", nome_arquivo(numero)),
        ))
        .body(csv))
}

pub async fn invalidar_cache(state: web::Data<AppState>) -> HttpResponse {
    state.consulta.invalidar_cache();
    HttpResponse::NoContent().finish()
}

async fn health_check() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "mensagem": "API de consulta CNPJ está funcionando"
    })))
}

pub fn rotas(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/filtros", web::get().to(opcoes_filtro))
        .route("/cache", web::delete().to(invalidar_cache))
        .route("/cnae/sugestoes", web::get().to(sugerir_cnae))
        .route("/cnae/descricoes", web::get().to(descricoes_cnae))
        .route("/nomes/sugestoes", web::get().to(sugerir_nome))
        .route("/cnpj/{cnpj}", web::get().to(consultar_cnpj))
        .service(
            web::scope("/sessoes/{id}")
                .route("/filtros", web::put().to(editar_filtros))
                .route("/filtros", web::delete().to(limpar_filtros))
                .route("/cnaes", web::post().to(preparar_cnae))
                .route("/cnaes", web::delete().to(descartar_cnaes))
                .route("/cnaes/confirmar", web::post().to(confirmar_cnaes))
                .route("/executar", web::post().to(executar))
                .route("/contagem", web::get().to(contagem))
                .route("/pagina/{n}", web::get().to(pagina))
                .route("/exportar", web::get().to(exportar)),
        );
}

pub async fn start_server(config: &Config, host: &str, port: u16) -> anyhow::Result<()> {
    let db = Database::new(&config.database)
        .with_context(|| format!("Falha ao abrir banco de dados: {}", config.database))?;
    let store: Arc<dyn Store> = Arc::new(db);
    let consulta = Consulta::from_config(store, config)?;

    if let Err(e) = consulta.opcoes_filtro() {
        warn!(erro = %e, "não foi possível pré-carregar as opções de filtro");
    }

    let app_state = web::Data::new(AppState::new(consulta, config.sessao_ttl()));
    let address = format!("{}:{}", host, port);

    ui::print_header("🌐 Servidor API de consulta");
    ui::print_success(&format!("Servidor iniciando em http://{}", address));
    ui::print_info("Endpoints disponíveis:");
    use colored::Colorize;
    for (rota, descricao) in [
        ("GET    /filtros", "Opções de UF, porte, situação e faixa de capital"),
        ("GET    /cnae/sugestoes?termo=", "Sugestões de CNAE"),
        ("GET    /cnae/descricoes?codigos=", "Descrições de códigos CNAE"),
        ("GET    /nomes/sugestoes?campo=&termo=", "Sugestões de razão social ou nome fantasia"),
        ("GET    /cnpj/{cnpj}", "Detalhe de um estabelecimento"),
        ("PUT    /sessoes/{id}/filtros", "Edita os filtros pendentes"),
        ("POST   /sessoes/{id}/executar", "Aplica os filtros e conta"),
        ("GET    /sessoes/{id}/pagina/{n}", "Página de resultados"),
        ("GET    /sessoes/{id}/exportar", "CSV da página"),
        ("GET    /health", "Verifica status do servidor"),
    ] {
        println!("  {} {:<40} - {}", "•".cyan(), rota, descricao);
    }
    ui::print_verbose(&format!("Exemplo: curl http://{}/cnpj/00000000000191", address));
    ui::print_separator();

    actix_web::HttpServer::new(move || {
        actix_web::App::new()
            .app_data(app_state.clone())
            .configure(rotas)
    })
    .bind(&address)?
    .workers(num_cpus::get())
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codigos::TabelaPorte;
    use crate::filtro::PadroesFiltro;
    use actix_web::{test, App};
    use rusqlite::types::Value;

    fn banco() -> Database {
        let db = Database::in_memory().unwrap();
        db.create_tables().unwrap();
        db.insert_codigo_descricao("cnae", "4711-3/02", "Comércio varejista de mercadorias")
            .unwrap();
        db.insert_codigo_descricao("municipio", "7107", "SAO PAULO").unwrap();
        for (basico, razao, capital, porte) in [
            ("11222333", "MERCADO BOM LTDA", 150000.0, "1"),
            ("44555666", "ARMAZEM CENTRAL SA", 900000.0, "5"),
        ] {
            db.execute_with_params(
                "INSERT INTO empresas (cnpj_basico, razao_social, capital_social, porte_empresa) VALUES (?, ?, ?, ?)",
                &[
                    Value::Text(basico.into()),
                    Value::Text(razao.into()),
                    Value::Real(capital),
                    Value::Text(porte.into()),
                ],
            )
            .unwrap();
        }
        for (cnpj, uf, situacao) in [
            ("11222333000181", "SP", "02"),
            ("44555666000199", "RJ", "08"),
        ] {
            db.execute_with_params(
                "INSERT INTO estabelecimento (cnpj, cnpj_basico, uf, situacao_cadastral, cnae_fiscal, municipio) \
                 VALUES (?, ?, ?, ?, '4711302', '7107')",
                &[
                    Value::Text(cnpj.into()),
                    Value::Text(cnpj[..8].into()),
                    Value::Text(uf.into()),
                    Value::Text(situacao.into()),
                ],
            )
            .unwrap();
        }
        db
    }

    fn estado() -> web::Data<AppState> {
        let store: Arc<dyn Store> = Arc::new(banco());
        let consulta = Consulta::new(
            store,
            TabelaPorte::default(),
            PadroesFiltro::default(),
            10,
            Duration::from_secs(60),
        );
        web::Data::new(AppState::new(consulta, Duration::from_secs(60)))
    }

    #[actix_web::test]
    async fn detail_maps_errors_to_status() {
        let app = test::init_service(App::new().app_data(estado()).configure(rotas)).await;

        let req = test::TestRequest::get().uri("/cnpj/1122233300018").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/cnpj/99999999000199").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/cnpj/11222333000181").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ficha"]["cnpj"], "11.222.333/0001-81");
        assert_eq!(body["ficha"]["municipio"], "SAO PAULO");
        assert_eq!(body["ficha"]["capital_social"], "R$ 150.000,00");
    }

    #[actix_web::test]
    async fn session_flow_applies_filters_on_execute() {
        let app = test::init_service(App::new().app_data(estado()).configure(rotas)).await;

        let req = test::TestRequest::put()
            .uri("/sessoes/a/filtros")
            .set_json(serde_json::json!({ "uf": "sp", "sem_limite_capital": true }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pendente"]["uf"], "sp");
        assert_eq!(body["aplicado"]["uf"], serde_json::Value::Null);

        let req = test::TestRequest::post().uri("/sessoes/a/executar").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["aplicado"]["uf"], "SP");
        assert_eq!(body["paginacao"]["total_registros"], 1);

        let req = test::TestRequest::get().uri("/sessoes/a/pagina/1").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["dados"][0]["razao_social"], "MERCADO BOM LTDA");
        assert_eq!(body["linhas"][0]["porte"], "Microempresa");
        assert_eq!(body["resumo"]["empresas_na_pagina"], 1);

        let req = test::TestRequest::get().uri("/sessoes/a/pagina/2").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        // Outra sessão não enxerga os filtros de "a"
        let req = test::TestRequest::get().uri("/sessoes/b/contagem").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_registros"], 1);
    }

    #[actix_web::test]
    async fn staged_codes_only_count_after_confirm() {
        let app = test::init_service(App::new().app_data(estado()).configure(rotas)).await;

        let req = test::TestRequest::post()
            .uri("/sessoes/c/cnaes")
            .set_json(serde_json::json!({ "codigo": "4711-3/02" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["cnaes_preparados"][0], "4711302");
        assert_eq!(body["pendente"]["cnaes"].as_array().map(Vec::len), Some(0));

        let req = test::TestRequest::post().uri("/sessoes/c/cnaes/confirmar").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pendente"]["cnaes"][0], "4711302");
        assert_eq!(body["cnaes_preparados"].as_array().map(Vec::len), Some(0));
    }

    #[actix_web::test]
    async fn exports_csv_attachment() {
        let app = test::init_service(App::new().app_data(estado()).configure(rotas)).await;

        let req = test::TestRequest::get().uri("/sessoes/d/exportar").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"empresas_pagina_1.csv\""
        );
        let body = test::read_body(resp).await;
        let texto = String::from_utf8(body.to_vec()).unwrap();
        assert!(texto.starts_with("razao_social;nome_fantasia;cnpj"));
        assert_eq!(texto.lines().count(), 1 + 1);
    }

    #[::core::prelude::v1::test]
    fn idle_sessions_are_evicted() {
        let sessoes = Sessoes::new(Duration::ZERO, 10);
        sessoes.com_sessao("a", || SessaoConsulta::new(PadroesFiltro::default()), |_| ());
        assert_eq!(sessoes.existente("a", |_| ()), None);
        assert!(sessoes.is_empty());

        sessoes.com_sessao("b", || SessaoConsulta::new(PadroesFiltro::default()), |_| ());
        sessoes.com_sessao("c", || SessaoConsulta::new(PadroesFiltro::default()), |_| ());
        assert_eq!(sessoes.len(), 1);
    }

    #[::core::prelude::v1::test]
    fn full_session_table_drops_least_recent() {
        let sessoes = Sessoes::new(Duration::from_secs(60), 2);
        let nova = || SessaoConsulta::new(PadroesFiltro::default());
        sessoes.com_sessao("a", nova, |_| ());
        std::thread::sleep(Duration::from_millis(2));
        sessoes.com_sessao("b", nova, |_| ());
        std::thread::sleep(Duration::from_millis(2));
        // acesso renova "a"
        assert_eq!(sessoes.existente("a", |_| ()), Some(()));
        std::thread::sleep(Duration::from_millis(2));
        sessoes.com_sessao("c", nova, |_| ());

        assert_eq!(sessoes.len(), 2);
        assert_eq!(sessoes.existente("b", |_| ()), None);
        assert_eq!(sessoes.existente("a", |_| ()), Some(()));
    }

    #[actix_web::test]
    async fn read_only_routes_do_not_create_sessions() {
        let state = estado();
        let app = test::init_service(App::new().app_data(state.clone()).configure(rotas)).await;

        for uri in ["/sessoes/x/contagem", "/sessoes/y/pagina/1", "/sessoes/z/exportar"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK, "{uri}");
        }
        assert!(state.sessoes.is_empty());

        let req = test::TestRequest::post().uri("/sessoes/x/executar").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert_eq!(state.sessoes.len(), 1);
    }

    #[actix_web::test]
    async fn suggestions_degrade_and_reject_bad_field() {
        let app = test::init_service(App::new().app_data(estado()).configure(rotas)).await;

        let req = test::TestRequest::get().uri("/cnae/sugestoes?termo=comercio").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["valor"][0]["codigo"], "4711-3/02");
        assert_eq!(body["valor"][0]["ocorrencias"], 2);

        let req = test::TestRequest::get()
            .uri("/cnae/descricoes?codigos=4711302,0000000")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["valor"]["4711302"], "Comércio varejista de mercadorias");
        assert_eq!(body["valor"].as_object().map(|m| m.len()), Some(1));

        let req = test::TestRequest::get()
            .uri("/nomes/sugestoes?campo=cpf&termo=mercado")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
