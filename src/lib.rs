// Este é o ponto de entrada principal da biblioteca.
// O core expõe apenas a MMU do Game Boy Advance: decodificação de regiões,
// wait states, invalidação do cache de decodificação e o motor de DMA.

// Módulos principais do projeto.
pub mod core;

// Re-exportações para facilitar o uso.
pub use crate::core::memory::{
    AddressControl, CartridgeInfo, DmaControl, DmaDescriptor, DmaOutcome, InstructionCache,
    IoRegisters, MemoryBlock, MemoryError, MemoryResult, MemoryView, Mmu, Region, RegionSlot,
    RegisterFile, RomView, WaitStates,
};

/// Versão do core.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Função conveniente para criar uma nova MMU em estado de reset.
pub fn create_mmu() -> Mmu {
    Mmu::new()
}
