use serde::Serialize;

use crate::error::{ConsultaError, Result};

/// Teto de linhas por página.
pub const LIMITE_MAXIMO: u32 = 500;

/// Posição de uma página dentro do total contado.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Paginacao {
    pub pagina: u32,
    pub tamanho: u32,
    pub total_registros: u64,
    pub total_paginas: u32,
}

impl Default for Paginacao {
    fn default() -> Self {
        Self::new(0, 1, 1)
    }
}

impl Paginacao {
    pub fn new(total_registros: u64, tamanho: u32, pagina: u32) -> Self {
        let tamanho = tamanho.clamp(1, LIMITE_MAXIMO);
        Self {
            pagina: pagina.max(1),
            tamanho,
            total_registros,
            total_paginas: total_paginas(total_registros, tamanho),
        }
    }

    pub fn tem_proxima(&self) -> bool {
        self.pagina < self.total_paginas
    }

    pub fn tem_anterior(&self) -> bool {
        self.pagina > 1
    }

    pub fn offset(&self) -> u64 {
        offset(self.pagina, self.tamanho)
    }

    pub fn proxima(&self) -> Result<Self> {
        if !self.tem_proxima() {
            return Err(ConsultaError::InvalidInput(format!(
                "Já está na última página ({} de {})",
                self.pagina, self.total_paginas
            )));
        }
        Ok(Self {
            pagina: self.pagina + 1,
            ..*self
        })
    }

    pub fn anterior(&self) -> Result<Self> {
        if !self.tem_anterior() {
            return Err(ConsultaError::InvalidInput("Já está na primeira página".into()));
        }
        Ok(Self {
            pagina: self.pagina - 1,
            ..*self
        })
    }
}

/// `ceil(total / tamanho)`, nunca menor que 1.
pub fn total_paginas(total_registros: u64, tamanho: u32) -> u32 {
    let tamanho = u64::from(tamanho.max(1));
    let paginas = total_registros.div_ceil(tamanho).max(1);
    u32::try_from(paginas).unwrap_or(u32::MAX)
}

pub fn offset(pagina: u32, tamanho: u32) -> u64 {
    u64::from(pagina.saturating_sub(1)) * u64::from(tamanho)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_has_single_page() {
        let p = Paginacao::new(0, 100, 1);
        assert_eq!(p.total_paginas, 1);
        assert!(!p.tem_proxima());
        assert!(!p.tem_anterior());
        assert!(p.proxima().is_err());
    }

    #[test]
    fn rounds_up_partial_pages() {
        assert_eq!(total_paginas(101, 100), 2);
        assert_eq!(total_paginas(100, 100), 1);
        assert_eq!(total_paginas(1, 100), 1);
    }

    #[test]
    fn navigates_within_bounds() {
        let p = Paginacao::new(250, 100, 1);
        let p2 = p.proxima().unwrap();
        assert_eq!(p2.pagina, 2);
        assert_eq!(p2.offset(), 100);
        let p3 = p2.proxima().unwrap();
        assert_eq!(p3.pagina, 3);
        assert!(p3.proxima().is_err());
        assert_eq!(p3.anterior().unwrap().pagina, 2);
        assert!(p.anterior().is_err());
    }

    #[test]
    fn clamps_page_size() {
        assert_eq!(Paginacao::new(10, 0, 1).tamanho, 1);
        assert_eq!(Paginacao::new(10, 10_000, 1).tamanho, LIMITE_MAXIMO);
        assert_eq!(Paginacao::new(10, 10, 0).pagina, 1);
    }
}
