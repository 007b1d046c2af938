//! Consulta à base pública de CNPJ gravada em SQLite: filtros compilados em
//! SQL parametrizado, paginação, sugestões, detalhe e exportação CSV.

pub mod agregador;
pub mod api;
pub mod cache;
pub mod codigos;
pub mod compilador;
pub mod config;
pub mod database;
pub mod detalhe;
pub mod error;
pub mod exportar;
pub mod filtro;
pub mod models;
pub mod paginacao;
pub mod servico;
pub mod store;
pub mod sugestoes;
pub mod ui;

pub use config::Config;
pub use database::Database;
pub use error::{degradar, ConsultaError, Degradado};
pub use filtro::{Filtros, FiltrosAplicados, SessaoConsulta};
pub use servico::{Consulta, PaginaResultado};
pub use store::{Store, Tabela};
