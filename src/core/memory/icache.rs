//! Controle de invalidação do cache de instruções decodificadas.
//!
//! A CPU marca as páginas cujo código já foi decodificado; qualquer escrita
//! numa página a remove da tabela antes de retornar. O conteúdo do cache
//! (as instruções em si) fica com a CPU.

use std::collections::HashSet;

/// Bits de página: `address >> 9`
pub const ICACHE_PAGE_BITS: u32 = 9;

/// Página que contém um endereço
#[inline(always)]
pub fn page_of(address: u32) -> u32 {
    address >> ICACHE_PAGE_BITS
}

/// Tabela esparsa de páginas com instruções em cache
#[derive(Debug, Clone, Default)]
pub struct InstructionCache {
    pages: HashSet<u32>,
}

impl InstructionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marca a página de `address` como contendo código decodificado
    pub fn mark(&mut self, address: u32) {
        self.pages.insert(page_of(address));
    }

    pub fn is_cached(&self, address: u32) -> bool {
        self.pages.contains(&page_of(address))
    }

    pub fn is_page_cached(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    pub fn invalidate_page(&mut self, page: u32) {
        self.pages.remove(&page);
    }

    /// Invalida a página que contém `address`
    #[inline]
    pub fn invalidate(&mut self, address: u32) {
        self.invalidate_page(page_of(address));
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
