//! Tabela de regiões do espaço de endereçamento.
//!
//! Os 4 bits superiores do endereço (`address >> 24`) selecionam um de 16
//! slots. Cada slot guarda uma [`RegionSlot`]: nada, um bloco de RAM, uma
//! visão somente leitura da ROM/BIOS ou o bloco de I/O injetado.

use crate::core::memory::io::IoPort;
use crate::core::memory::view::{MemoryBlock, MemoryView, RomView};
use crate::core::memory::BASE_OFFSET;

pub const SIZE_BIOS: usize = 0x0000_4000;
pub const SIZE_WORKING_RAM: usize = 0x0004_0000;
pub const SIZE_WORKING_IRAM: usize = 0x0000_8000;
pub const SIZE_IO: usize = 0x0000_0400;
pub const SIZE_PALETTE_RAM: usize = 0x0000_0400;
pub const SIZE_VRAM: usize = 0x0001_8000;
pub const SIZE_OAM: usize = 0x0000_0400;
pub const SIZE_CART: usize = 0x0200_0000;
pub const SIZE_CART_SRAM: usize = 0x0001_0000;

/// Tamanho de uma metade do cartucho (cada espelho de 16 MB)
pub const CART_HALF: usize = 0x0100_0000;

/// Região de memória (o discriminante é o índice do slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Region {
    Bios = 0x0,
    WorkingRam = 0x2,
    WorkingIram = 0x3,
    Io = 0x4,
    PaletteRam = 0x5,
    Vram = 0x6,
    Oam = 0x7,
    Cart0 = 0x8,
    Cart1 = 0xA,
    Cart2 = 0xC,
    CartSram = 0xE,
}

impl Region {
    pub const ALL: [Region; 11] = [
        Region::Bios,
        Region::WorkingRam,
        Region::WorkingIram,
        Region::Io,
        Region::PaletteRam,
        Region::Vram,
        Region::Oam,
        Region::Cart0,
        Region::Cart1,
        Region::Cart2,
        Region::CartSram,
    ];

    /// Os três espelhos da ROM (wait states 0, 1 e 2)
    pub const CARTS: [Region; 3] = [Region::Cart0, Region::Cart1, Region::Cart2];

    /// Regiões de RAM alocadas pelo próprio core no reset
    pub const OWNED_RAM: [Region; 5] = [
        Region::WorkingRam,
        Region::WorkingIram,
        Region::PaletteRam,
        Region::Vram,
        Region::Oam,
    ];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Endereço base (`index << 24`)
    #[inline(always)]
    pub const fn base(self) -> u32 {
        (self as u32) << BASE_OFFSET
    }

    pub const fn size(self) -> usize {
        match self {
            Region::Bios => SIZE_BIOS,
            Region::WorkingRam => SIZE_WORKING_RAM,
            Region::WorkingIram => SIZE_WORKING_IRAM,
            Region::Io => SIZE_IO,
            Region::PaletteRam => SIZE_PALETTE_RAM,
            Region::Vram => SIZE_VRAM,
            Region::Oam => SIZE_OAM,
            Region::Cart0 | Region::Cart1 | Region::Cart2 => SIZE_CART,
            Region::CartSram => SIZE_CART_SRAM,
        }
    }

    pub fn from_index(index: usize) -> Option<Region> {
        Region::ALL.iter().copied().find(|r| r.index() == index)
    }

    /// Região nomeada que contém o endereço. Os slots ímpares do cartucho
    /// (0x9/0xB/0xD, metade alta da ROM) pertencem ao espelho par anterior.
    pub fn from_address(address: u32) -> Option<Region> {
        match address >> BASE_OFFSET {
            0x9 => Some(Region::Cart0),
            0xB => Some(Region::Cart1),
            0xD => Some(Region::Cart2),
            index => Region::from_index(index as usize),
        }
    }
}

/// Conteúdo de um slot de região
#[derive(Debug, Clone, Default)]
pub enum RegionSlot {
    /// Nada mapeado: qualquer acesso é erro
    #[default]
    Unmapped,
    /// RAM de leitura e escrita pertencente ao core
    Block(MemoryBlock),
    /// Visão somente leitura de um buffer externo
    Rom(RomView),
    /// Bloco de I/O injetado (não pertence à MMU)
    Io(IoPort),
}

impl RegionSlot {
    pub fn view(&self) -> Option<&dyn MemoryView> {
        match self {
            RegionSlot::Unmapped => None,
            RegionSlot::Block(block) => Some(block),
            RegionSlot::Rom(rom) => Some(rom),
            RegionSlot::Io(io) => Some(io),
        }
    }

    pub fn view_mut(&mut self) -> Option<&mut dyn MemoryView> {
        match self {
            RegionSlot::Unmapped => None,
            RegionSlot::Block(block) => Some(block),
            RegionSlot::Rom(rom) => Some(rom),
            RegionSlot::Io(io) => Some(io),
        }
    }

    pub fn is_mapped(&self) -> bool {
        !matches!(self, RegionSlot::Unmapped)
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, RegionSlot::Rom(_))
    }
}
