//! Sistema de Memória do Game Boy Advance.
//! Decodifica o espaço de endereçamento de 32-bit em 16 regiões, aplica os
//! wait states do barramento, invalida o cache de decodificação nas escritas
//! e executa as transferências de DMA.

// Rastreamento de acessos; definido antes dos submódulos para ficar visível neles
cfg_if::cfg_if! {
    if #[cfg(feature = "trace-access")] {
        macro_rules! trace_access {
            ($($arg:tt)*) => { log::trace!($($arg)*) };
        }
    } else {
        macro_rules! trace_access {
            ($($arg:tt)*) => {};
        }
    }
}

pub mod bus;
pub mod cart;
pub mod dma;
pub mod icache;
pub mod io;
pub mod map;
pub mod timing;
pub mod view;

// Re-exportações para facilitar o uso
pub use bus::Mmu;
pub use cart::{CartridgeInfo, RomHeader};
pub use dma::{AddressControl, DmaControl, DmaDescriptor, DmaOutcome};
pub use icache::InstructionCache;
pub use io::{IoPort, IoRegisters, RegisterFile};
pub use map::{Region, RegionSlot};
pub use timing::{AccessTiming, WaitStates};
pub use view::{MemoryBlock, MemoryView, RomView};

use thiserror::Error;

/// Número de slots de região (4 bits superiores do endereço)
pub const REGION_COUNT: usize = 16;

/// Deslocamento do índice de região dentro do endereço
pub const BASE_OFFSET: u32 = 24;

/// Máscara do offset dentro da região (24-bit = 16 MB)
pub const OFFSET_MASK: u32 = 0x00FF_FFFF;

/// Erros do sistema de memória
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Acesso a um slot sem memória mapeada
    #[error("acesso a região não mapeada: 0x{address:08X}")]
    Unmapped { address: u32 },
    /// Tentativa de mapear uma ROM vazia
    #[error("buffer de ROM vazio")]
    EmptyRom,
}

/// Tipo de resultado para operações de memória
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Índice da região de um endereço. Endereços acima de 0x0FFFFFFF produzem
/// índices >= 16, que nunca estão mapeados.
#[inline(always)]
pub fn region_index(address: u32) -> usize {
    (address >> BASE_OFFSET) as usize
}
