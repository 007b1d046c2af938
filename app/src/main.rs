use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cnpj_consulta::codigos::formatar_moeda_opcional;
use cnpj_consulta::exportar::salvar_pagina;
use cnpj_consulta::models::CampoNome;
use cnpj_consulta::{api, degradar, ui, Config, Consulta, ConsultaError, Database, Filtros};

#[derive(Parser)]
#[command(name = "cnpj-consulta")]
#[command(about = "Consulta filtrada da base pública de CNPJ em SQLite", long_about = None)]
struct Cli {
    /// Modo silencioso (menos saída)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Modo verboso (mais detalhes)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cria as tabelas e índices esperados pela consulta
    Inicializar,
    /// Lista UFs, portes, situações e a faixa de capital disponíveis
    Opcoes,
    /// Filtra empresas e mostra uma página de resultados
    Consulta {
        #[command(flatten)]
        filtros: FiltrosArgs,
        /// Página a exibir
        #[arg(long, default_value_t = 1)]
        pagina: u32,
        /// Pasta onde salvar a página em CSV
        #[arg(long)]
        exportar: Option<PathBuf>,
        /// Mostra as distribuições da página (UF, situação, porte, CNAE, ano)
        #[arg(long)]
        distribuicoes: bool,
    },
    /// Mostra a ficha completa de um CNPJ
    Detalhes {
        /// CNPJ com ou sem pontuação
        cnpj: String,
    },
    /// Sugere CNAEs pela descrição
    SugerirCnae {
        termo: String,
    },
    /// Sugere razões sociais ou nomes fantasia
    SugerirNome {
        /// razao-social ou nome-fantasia
        #[arg(long, default_value = "razao-social")]
        campo: CampoNome,
        termo: String,
    },
    /// Inicia servidor web API de consulta
    Server {
        /// Porta do servidor
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Endereço do servidor
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(clap::Args)]
struct FiltrosArgs {
    /// Parte do CNPJ
    #[arg(long, default_value = "")]
    cnpj: String,
    /// Parte da razão social
    #[arg(long, default_value = "")]
    razao_social: String,
    /// Parte do nome fantasia
    #[arg(long, default_value = "")]
    nome_fantasia: String,
    #[arg(long)]
    uf: Option<String>,
    /// Rótulo do porte (ex.: Microempresa)
    #[arg(long)]
    porte: Option<String>,
    /// Rótulo da situação cadastral (ex.: Ativa)
    #[arg(long)]
    situacao: Option<String>,
    /// Código CNAE; pode ser repetido
    #[arg(long = "cnae")]
    cnaes: Vec<String>,
    #[arg(long)]
    capital_min: Option<f64>,
    #[arg(long)]
    capital_max: Option<f64>,
    /// Ignora a faixa de capital, exigindo apenas capital positivo
    #[arg(long)]
    sem_limite_capital: bool,
}

impl FiltrosArgs {
    fn em_filtros(self, padrao: Filtros) -> Filtros {
        Filtros {
            cnpj: self.cnpj,
            razao_social: self.razao_social,
            nome_fantasia: self.nome_fantasia,
            uf: self.uf,
            porte: self.porte,
            situacao: self.situacao,
            cnaes: self.cnaes,
            capital_min: self.capital_min.unwrap_or(padrao.capital_min),
            capital_max: self.capital_max.unwrap_or(padrao.capital_max),
            sem_limite_capital: self.sem_limite_capital,
            ..padrao
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    ui::init(cli.quiet, cli.verbose);
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        ui::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Inicializar => {
            let db = Database::new(&cli.config.database)?;
            db.create_tables()?;
            ui::print_success(&format!("Tabelas criadas em {}", cli.config.database));
        }
        Commands::Opcoes => {
            let consulta = abrir(&cli.config)?;
            let opcoes = degradar(consulta.opcoes_filtro());
            avisar(opcoes.aviso.as_deref());
            let o = opcoes.valor;
            ui::print_campos(
                "Opções de filtro:",
                &[
                    ("UFs", o.ufs.join(", ")),
                    ("Portes", o.portes.join(", ")),
                    ("Situações", o.situacoes.join(", ")),
                    (
                        "Capital social",
                        format!(
                            "{} a {}",
                            formatar_moeda_opcional(Some(o.capital_min)),
                            formatar_moeda_opcional(Some(o.capital_max))
                        ),
                    ),
                ],
            );
        }
        Commands::Consulta {
            filtros,
            pagina,
            exportar,
            distribuicoes,
        } => {
            let consulta = abrir(&cli.config)?;
            let aplicado = filtros.em_filtros(Filtros::padrao(consulta.padroes())).normalizar();
            ui::print_verbose(&format!("Filtros aplicados: {:?}", *aplicado));
            if !aplicado.tem_criterios() {
                ui::print_info("Nenhum critério informado: apenas a faixa de capital será aplicada");
            }
            if !aplicado.cnaes.is_empty() {
                let descricoes = degradar(consulta.descricoes_cnae(&aplicado.cnaes));
                avisar(descricoes.aviso.as_deref());
                let cnaes: Vec<(&str, String)> = aplicado
                    .cnaes
                    .iter()
                    .map(|c| {
                        let descricao = descricoes.valor.get(c).cloned();
                        (c.as_str(), descricao.unwrap_or_else(|| "(sem descrição)".to_string()))
                    })
                    .collect();
                ui::print_campos("CNAEs selecionados:", &cnaes);
            }

            let resultado = degradar(consulta.buscar_pagina(&aplicado, pagina));
            avisar(resultado.aviso.as_deref());
            let resultado = resultado.valor;
            let p = resultado.paginacao;

            ui::print_header(&format!(
                "{} empresas encontradas (página {} de {})",
                p.total_registros, p.pagina, p.total_paginas
            ));
            let linhas: Vec<Vec<String>> = resultado
                .exibicao(consulta.porte())
                .into_iter()
                .map(|l| vec![l.cnpj, l.razao_social, l.uf, l.porte, l.capital_social, l.situacao, l.cnae])
                .collect();
            ui::print_tabela(
                &["CNPJ", "Razão Social", "UF", "Porte", "Capital Social", "Situação", "CNAE"],
                &linhas,
            );

            let resumo = resultado.resumo();
            ui::print_campos("Resumo:", &resumo.rotulos());

            if distribuicoes {
                let d = resultado.distribuicoes(consulta.porte());
                let listar = |pares: &[(String, usize)]| {
                    pares
                        .iter()
                        .map(|(k, v)| format!("{k}: {v}"))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                ui::print_campos(
                    "Distribuições nesta página:",
                    &[
                        ("Por UF", listar(&d.por_uf)),
                        ("Por situação", listar(&d.por_situacao)),
                        ("Por porte", listar(&d.por_porte)),
                        (
                            "Capital por UF",
                            d.capital_por_uf
                                .iter()
                                .map(|(uf, c)| format!("{uf}: {}", formatar_moeda_opcional(Some(*c))))
                                .collect::<Vec<_>>()
                                .join(", "),
                        ),
                        ("Top CNAEs", listar(&d.top_cnaes)),
                        (
                            "Por ano de início",
                            d.por_ano_inicio
                                .iter()
                                .map(|(ano, n)| format!("{ano}: {n}"))
                                .collect::<Vec<_>>()
                                .join(", "),
                        ),
                    ],
                );
            }

            if let Some(diretorio) = exportar {
                let caminho = salvar_pagina(&diretorio, p.pagina, &resultado.linhas)?;
                ui::print_success(&format!("Página exportada para {}", caminho.display()));
            }
        }
        Commands::Detalhes { cnpj } => {
            let consulta = abrir(&cli.config)?;
            match consulta.ficha(&cnpj) {
                Ok(ficha) => ui::print_campos("Detalhes da empresa:", &ficha.campos()),
                Err(e @ ConsultaError::NotFound(_)) => ui::print_warning(&e.to_string()),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::SugerirCnae { termo } => {
            let consulta = abrir(&cli.config)?;
            let sugestoes = degradar(consulta.sugerir_cnae(&termo));
            avisar(sugestoes.aviso.as_deref());
            let linhas: Vec<Vec<String>> = sugestoes
                .valor
                .into_iter()
                .map(|s| vec![s.codigo, s.descricao, s.ocorrencias.to_string()])
                .collect();
            imprimir_sugestoes(&["Código", "Descrição", "Estabelecimentos"], &linhas);
        }
        Commands::SugerirNome { campo, termo } => {
            let consulta = abrir(&cli.config)?;
            let sugestoes = degradar(consulta.sugerir_nome(campo, &termo));
            avisar(sugestoes.aviso.as_deref());
            let linhas: Vec<Vec<String>> = sugestoes
                .valor
                .into_iter()
                .map(|s| vec![s.valor, s.ocorrencias.to_string()])
                .collect();
            imprimir_sugestoes(&[campo_titulo(campo), "Estabelecimentos"], &linhas);
        }
        Commands::Server { port, host } => {
            api::start_server(&cli.config, &host, port).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let padrao = if verbose { "cnpj_consulta=debug" } else { "warn" };
    let filtro = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(padrao));
    tracing_subscriber::fmt()
        .with_env_filter(filtro)
        .with_writer(std::io::stderr)
        .init();
}

fn abrir(config: &Config) -> Result<Consulta<Database>> {
    let db = Database::new(&config.database)?;
    Consulta::from_config(db, config)
}

fn avisar(aviso: Option<&str>) {
    if let Some(aviso) = aviso {
        ui::print_warning(aviso);
    }
}

fn campo_titulo(campo: CampoNome) -> &'static str {
    match campo {
        CampoNome::RazaoSocial => "Razão Social",
        CampoNome::NomeFantasia => "Nome Fantasia",
    }
}

fn imprimir_sugestoes(cabecalho: &[&str], linhas: &[Vec<String>]) {
    if linhas.is_empty() {
        ui::print_info("Nenhuma sugestão encontrada");
    } else {
        ui::print_tabela(cabecalho, linhas);
    }
}
