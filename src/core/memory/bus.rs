//! Barramento de memória principal - funções LOAD/STORE e wait states.
//! Este é o núcleo do sistema de memória, chamado pela CPU a cada acesso.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::memory::cart::CartridgeInfo;
use crate::core::memory::icache::{page_of, InstructionCache};
use crate::core::memory::io::{IoPort, IoRegisters};
use crate::core::memory::map::{Region, RegionSlot, CART_HALF};
use crate::core::memory::timing::{AccessTiming, WaitStates};
use crate::core::memory::view::{MemoryBlock, MemoryView, RomView};
use crate::core::memory::{region_index, MemoryError, MemoryResult, OFFSET_MASK, REGION_COUNT};
use log::{debug, info};

/// MMU do Game Boy Advance
#[derive(Debug)]
pub struct Mmu {
    slots: [RegionSlot; REGION_COUNT],
    waitstates: WaitStates,
    icache: InstructionCache,
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}

impl Mmu {
    /// Cria uma MMU já em estado de reset
    pub fn new() -> Self {
        let mut mmu = Self {
            slots: Default::default(),
            waitstates: WaitStates::new(),
            icache: InstructionCache::new(),
        };
        mmu.reset();
        mmu
    }

    /// Reseta o barramento.
    ///
    /// Realoca a RAM interna zerada, desmapeia BIOS, I/O, cartucho e SRAM,
    /// restaura os wait states padrão e esvazia o cache de decodificação.
    pub fn reset(&mut self) {
        self.slots = Default::default();
        for region in Region::OWNED_RAM {
            self.slots[region.index()] = RegionSlot::Block(MemoryBlock::new(region.size()));
        }
        self.waitstates.reset();
        self.icache.clear();
        debug!("MMU resetada");
    }

    /// Instala um slot arbitrário
    pub fn map(&mut self, region: usize, slot: RegionSlot) {
        if let Some(entry) = self.slots.get_mut(region) {
            *entry = slot;
        }
    }

    pub fn unmap(&mut self, region: usize) {
        self.map(region, RegionSlot::Unmapped);
    }

    pub fn slot(&self, region: usize) -> Option<&RegionSlot> {
        self.slots.get(region)
    }

    /// Bloco de I/O injetado, se houver
    pub fn io(&self) -> Option<Rc<RefCell<dyn IoRegisters>>> {
        self.io_port().map(IoPort::handle)
    }

    /// Injeta o bloco de registradores de I/O na região 0x04
    pub fn map_io(&mut self, io: Rc<RefCell<dyn IoRegisters>>) {
        self.slots[Region::Io.index()] = RegionSlot::Io(IoPort::new(io));
    }

    /// Mapeia a BIOS (somente leitura) na região 0x00
    pub fn map_bios(&mut self, bios: Rc<[u8]>) {
        info!("BIOS mapeada: {} bytes", bios.len());
        self.slots[Region::Bios.index()] = RegionSlot::Rom(RomView::new(bios, 0));
    }

    /// Mapeia a ROM nos três espelhos do cartucho e aloca uma SRAM nova.
    ///
    /// ROMs maiores que 16 MB ganham uma segunda visão (metade alta) nos slots
    /// ímpares 0x09/0x0B/0x0D.
    pub fn map_rom(&mut self, rom: Rc<[u8]>, extract: bool) -> MemoryResult<CartridgeInfo> {
        if rom.is_empty() {
            return Err(MemoryError::EmptyRom);
        }

        let lo = RomView::new(Rc::clone(&rom), 0);
        for region in Region::CARTS {
            self.slots[region.index()] = RegionSlot::Rom(lo.clone());
        }

        if rom.len() > CART_HALF {
            let hi = RomView::new(Rc::clone(&rom), CART_HALF);
            for region in Region::CARTS {
                self.slots[region.index() + 1] = RegionSlot::Rom(hi.clone());
            }
        }

        self.slots[Region::CartSram.index()] =
            RegionSlot::Block(MemoryBlock::new(Region::CartSram.size()));

        info!(
            "ROM mapeada: {} bytes{}",
            rom.len(),
            if rom.len() > CART_HALF { " (com metade alta)" } else { "" }
        );

        Ok(if extract {
            CartridgeInfo::from_rom(rom)
        } else {
            CartridgeInfo::unprocessed(rom)
        })
    }

    /// Conteúdo da SRAM do cartucho, se mapeada
    pub fn sram(&self) -> Option<&[u8]> {
        match &self.slots[Region::CartSram.index()] {
            RegionSlot::Block(block) => Some(block.as_bytes()),
            _ => None,
        }
    }

    // --- Resolução de endereços ---

    #[inline(always)]
    fn view(&self, address: u32) -> MemoryResult<&dyn MemoryView> {
        self.slots
            .get(region_index(address))
            .and_then(RegionSlot::view)
            .ok_or(MemoryError::Unmapped { address })
    }

    #[inline(always)]
    fn view_mut(&mut self, address: u32) -> MemoryResult<&mut dyn MemoryView> {
        self.slots
            .get_mut(region_index(address))
            .and_then(RegionSlot::view_mut)
            .ok_or(MemoryError::Unmapped { address })
    }

    /// Visão de uma região pelo índice (usado pelo DMA)
    pub(crate) fn region_view(&self, region: usize) -> Option<&dyn MemoryView> {
        self.slots.get(region).and_then(RegionSlot::view)
    }

    pub(crate) fn region_view_mut(&mut self, region: usize) -> Option<&mut dyn MemoryView> {
        self.slots.get_mut(region).and_then(RegionSlot::view_mut)
    }

    pub(crate) fn io_port(&self) -> Option<&IoPort> {
        match &self.slots[Region::Io.index()] {
            RegionSlot::Io(port) => Some(port),
            _ => None,
        }
    }

    // --- Funções principais de acesso à memória (chamadas pela CPU) ---

    pub fn load8(&self, address: u32) -> MemoryResult<i8> {
        trace_access!("load8 0x{:08X}", address);
        Ok(self.view(address)?.load8(address & OFFSET_MASK))
    }

    pub fn load16(&self, address: u32) -> MemoryResult<i16> {
        trace_access!("load16 0x{:08X}", address);
        Ok(self.view(address)?.load16(address & OFFSET_MASK))
    }

    pub fn load32(&self, address: u32) -> MemoryResult<i32> {
        trace_access!("load32 0x{:08X}", address);
        Ok(self.view(address)?.load32(address & OFFSET_MASK))
    }

    pub fn load_u8(&self, address: u32) -> MemoryResult<u8> {
        trace_access!("loadU8 0x{:08X}", address);
        Ok(self.view(address)?.load_u8(address & OFFSET_MASK))
    }

    pub fn load_u16(&self, address: u32) -> MemoryResult<u16> {
        trace_access!("loadU16 0x{:08X}", address);
        Ok(self.view(address)?.load_u16(address & OFFSET_MASK))
    }

    /// Escreve um byte e invalida a página no cache de decodificação
    pub fn store8(&mut self, address: u32, value: u8) -> MemoryResult<()> {
        trace_access!("store8 0x{:08X} <- 0x{:02X}", address, value);
        self.view_mut(address)?.store8(address & OFFSET_MASK, value);
        self.icache.invalidate_page(page_of(address));
        Ok(())
    }

    /// Escreve um halfword; o bit 0 do endereço é ignorado
    pub fn store16(&mut self, address: u32, value: u16) -> MemoryResult<()> {
        trace_access!("store16 0x{:08X} <- 0x{:04X}", address, value);
        self.view_mut(address)?.store16(address & 0x00FF_FFFE, value);
        self.icache.invalidate_page(page_of(address));
        Ok(())
    }

    /// Escreve um word; os bits 0-1 do endereço são ignorados.
    /// Invalida também a página seguinte.
    pub fn store32(&mut self, address: u32, value: u32) -> MemoryResult<()> {
        trace_access!("store32 0x{:08X} <- 0x{:08X}", address, value);
        self.view_mut(address)?.store32(address & 0x00FF_FFFC, value);
        let page = page_of(address);
        self.icache.invalidate_page(page);
        self.icache.invalidate_page(page + 1);
        Ok(())
    }

    // --- Wait states ---

    #[inline(always)]
    fn charge(&self, kind: AccessTiming, address: u32, cycles: &mut u64) {
        *cycles += 1 + self.waitstates.cycles(kind, region_index(address)) as u64;
    }

    /// Acesso não sequencial de 8/16-bit
    pub fn wait(&self, address: u32, cycles: &mut u64) {
        self.charge(AccessTiming::NonSeq16, address, cycles);
    }

    /// Acesso sequencial de 8/16-bit
    pub fn wait_seq(&self, address: u32, cycles: &mut u64) {
        self.charge(AccessTiming::Seq16, address, cycles);
    }

    /// Acesso não sequencial de 32-bit
    pub fn wait32(&self, address: u32, cycles: &mut u64) {
        self.charge(AccessTiming::NonSeq32, address, cycles);
    }

    /// Acesso sequencial de 32-bit
    pub fn wait_seq32(&self, address: u32, cycles: &mut u64) {
        self.charge(AccessTiming::Seq32, address, cycles);
    }

    /// Reconfigura os wait states do cartucho (escrita em WAITCNT)
    pub fn adjust_timings(&mut self, word: u16) {
        self.waitstates.adjust(word);
    }

    pub fn waitstates(&self) -> &WaitStates {
        &self.waitstates
    }

    pub fn icache(&self) -> &InstructionCache {
        &self.icache
    }

    pub fn icache_mut(&mut self) -> &mut InstructionCache {
        &mut self.icache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::io::RegisterFile;
    use crate::core::memory::map::SIZE_CART_SRAM;

    fn rom_of(len: usize) -> Rc<[u8]> {
        Rc::from((0..len).map(|i| i as u8).collect::<Vec<u8>>())
    }

    #[test]
    fn test_word_round_trip() {
        let mut mmu = Mmu::new();
        for (address, value) in [
            (0x0200_0000u32, 0xDEAD_BEEFu32),
            (0x0300_7FFC, 0x0000_0001),
            (0x0600_0100, 0x8000_0000),
            (0x0700_03FC, 0x7FFF_FFFF),
        ] {
            mmu.store32(address, value).unwrap();
            assert_eq!(mmu.load32(address).unwrap(), value as i32);
        }
    }

    #[test]
    fn test_byte_round_trip() {
        let mut mmu = Mmu::new();
        mmu.store8(0x0200_0001, 0x7F).unwrap();
        mmu.store8(0x0200_0002, 0x80).unwrap();
        assert_eq!(mmu.load_u8(0x0200_0001).unwrap(), 0x7F);
        assert_eq!(mmu.load8(0x0200_0001).unwrap(), 0x7F);
        assert_eq!(mmu.load_u8(0x0200_0002).unwrap(), 0x80);
        assert_eq!(mmu.load8(0x0200_0002).unwrap(), -128);
    }

    #[test]
    fn test_halfword_store_ignores_low_bit() {
        let mut mmu = Mmu::new();
        mmu.store16(0x0500_0011, 0xBEEF).unwrap();
        assert_eq!(mmu.load_u16(0x0500_0010).unwrap(), 0xBEEF);
        assert_eq!(mmu.load16(0x0500_0010).unwrap(), 0xBEEFu16 as i16);
    }

    #[test]
    fn test_word_store_forces_alignment() {
        let mut mmu = Mmu::new();
        mmu.store32(0x0300_0103, 0x1122_3344).unwrap();
        assert_eq!(mmu.load32(0x0300_0100).unwrap(), 0x1122_3344);
    }

    #[test]
    fn test_offset_ignores_upper_bits() {
        let mut mmu = Mmu::new();
        mmu.store8(0x0200_0040, 0x99).unwrap();
        // Mesmo offset de 24 bits, região igual
        assert_eq!(mmu.load_u8(0x02FC_0040).unwrap(), 0x99);
    }

    #[test]
    fn test_unmapped_access_is_error() {
        let mut mmu = Mmu::new();
        assert_eq!(
            mmu.load32(0x0100_0000),
            Err(MemoryError::Unmapped { address: 0x0100_0000 })
        );
        assert_eq!(
            mmu.store8(0x0800_0000, 1),
            Err(MemoryError::Unmapped { address: 0x0800_0000 })
        );
        assert!(mmu.load_u8(0x0000_0000).is_err());
        assert!(mmu.load_u16(0x0400_0000).is_err());
        assert!(mmu.load8(0x1000_0000).is_err());
        assert!(mmu.store32(0xFFFF_FFFC, 0).is_err());
    }

    #[test]
    fn test_rom_is_read_only() {
        let mut mmu = Mmu::new();
        mmu.map_rom(rom_of(0x400), false).unwrap();
        mmu.map_bios(rom_of(0x100));

        let before = mmu.load32(0x0800_0010).unwrap();
        mmu.store32(0x0800_0010, 0xFFFF_FFFF).unwrap();
        mmu.store16(0x0800_0010, 0xFFFF).unwrap();
        mmu.store8(0x0800_0010, 0xFF).unwrap();
        assert_eq!(mmu.load32(0x0800_0010).unwrap(), before);

        mmu.store8(0x0000_0004, 0xFF).unwrap();
        assert_eq!(mmu.load_u8(0x0000_0004).unwrap(), 4);
    }

    #[test]
    fn test_rom_mirrors() {
        let mut mmu = Mmu::new();
        let info = mmu.map_rom(rom_of(0x1000), false).unwrap();
        assert!(info.title.is_none());
        for base in [0x0800_0000u32, 0x0A00_0000, 0x0C00_0000] {
            assert_eq!(mmu.load_u8(base + 0x42).unwrap(), 0x42);
        }
        assert!(mmu.slot(0xE).map_or(false, RegionSlot::is_mapped));
        assert_eq!(mmu.sram().map(<[u8]>::len), Some(SIZE_CART_SRAM));
    }

    #[test]
    fn test_rom_high_half_threshold() {
        let mut mmu = Mmu::new();
        mmu.map_rom(Rc::from(vec![0u8; CART_HALF]), false).unwrap();
        for index in [0x9, 0xB, 0xD] {
            assert!(!mmu.slot(index).map_or(false, RegionSlot::is_mapped));
        }

        let mut mmu = Mmu::new();
        let mut rom = vec![0u8; CART_HALF + 1];
        rom[CART_HALF] = 0x5C;
        mmu.map_rom(Rc::from(rom), false).unwrap();
        for base in [0x0900_0000u32, 0x0B00_0000, 0x0D00_0000] {
            assert_eq!(mmu.load_u8(base).unwrap(), 0x5C);
        }

        // Todos os espelhos apontam para o mesmo buffer
        let low = match mmu.slot(0x8) {
            Some(RegionSlot::Rom(view)) => view.clone(),
            other => panic!("slot 0x8: {:?}", other),
        };
        assert_eq!(low.base(), 0);
        for index in [0x9, 0xB, 0xD] {
            match mmu.slot(index) {
                Some(RegionSlot::Rom(view)) => {
                    assert_eq!(view.base(), CART_HALF);
                    assert!(Rc::ptr_eq(view.buffer(), low.buffer()));
                }
                other => panic!("slot {:#X}: {:?}", index, other),
            }
        }
    }

    #[test]
    fn test_empty_rom_rejected() {
        let mut mmu = Mmu::new();
        let empty: Rc<[u8]> = Rc::from(Vec::new());
        assert_eq!(mmu.map_rom(empty, true).unwrap_err(), MemoryError::EmptyRom);
    }

    #[test]
    fn test_map_rom_extracts_metadata() {
        let mut rom = vec![0u8; 0x200];
        rom[0xA0..0xA8].copy_from_slice(b"METROID4");
        rom[0xAC..0xB0].copy_from_slice(b"AMTE");
        rom[0xB0..0xB2].copy_from_slice(b"01");
        let mut mmu = Mmu::new();
        let info = mmu.map_rom(Rc::from(rom), true).unwrap();
        assert_eq!(info.title.as_deref(), Some("METROID4"));
        assert_eq!(info.code.as_deref(), Some("AMTE"));
        assert_eq!(info.maker.as_deref(), Some("01"));
    }

    #[test]
    fn test_sram_is_fresh_on_each_rom() {
        let mut mmu = Mmu::new();
        mmu.map_rom(rom_of(0x100), false).unwrap();
        mmu.store8(0x0E00_0010, 0xAA).unwrap();
        mmu.map_rom(rom_of(0x100), false).unwrap();
        assert_eq!(mmu.load_u8(0x0E00_0010).unwrap(), 0);
    }

    #[test]
    fn test_stores_invalidate_icache() {
        let mut mmu = Mmu::new();
        let address = 0x0200_01FE;
        let page = page_of(address);

        mmu.icache_mut().mark(address);
        mmu.store8(address, 1).unwrap();
        assert!(!mmu.icache().is_page_cached(page));

        mmu.icache_mut().mark(address);
        mmu.store16(address, 1).unwrap();
        assert!(!mmu.icache().is_page_cached(page));

        mmu.icache_mut().mark(address);
        mmu.icache_mut().mark(address + 0x200);
        mmu.store32(address, 1).unwrap();
        assert!(!mmu.icache().is_page_cached(page));
        assert!(!mmu.icache().is_page_cached(page + 1));
    }

    #[test]
    fn test_halfword_store_keeps_next_page() {
        let mut mmu = Mmu::new();
        mmu.icache_mut().mark(0x0200_0200);
        mmu.store16(0x0200_01FE, 0xFFFF).unwrap();
        assert!(mmu.icache().is_cached(0x0200_0200));
    }

    #[test]
    fn test_rom_store_still_invalidates() {
        let mut mmu = Mmu::new();
        mmu.map_rom(rom_of(0x400), false).unwrap();
        mmu.icache_mut().mark(0x0800_0000);
        mmu.store16(0x0800_0000, 0).unwrap();
        assert!(!mmu.icache().is_cached(0x0800_0000));
    }

    #[test]
    fn test_wait_charges() {
        let mmu = Mmu::new();
        let mut cycles = 0u64;
        mmu.wait(0x0200_0000, &mut cycles);
        assert_eq!(cycles, 3);
        mmu.wait_seq(0x0300_0000, &mut cycles);
        assert_eq!(cycles, 4);
        mmu.wait32(0x0200_0000, &mut cycles);
        assert_eq!(cycles, 10);
        mmu.wait_seq32(0x0C00_0000, &mut cycles);
        assert_eq!(cycles, 28);
    }

    #[test]
    fn test_adjust_timings_changes_wait() {
        let mut mmu = Mmu::new();
        mmu.adjust_timings(0x0000);
        let mut cycles = 0u64;
        mmu.wait(0x0800_0000, &mut cycles);
        mmu.wait_seq(0x0A00_0000, &mut cycles);
        mmu.wait32(0x0C00_0000, &mut cycles);
        mmu.wait_seq32(0x0E00_0000, &mut cycles);
        // (1+4) + (1+4) + (1+13) + (1+4)
        assert_eq!(cycles, 5 + 5 + 14 + 5);
    }

    #[test]
    fn test_io_region_delegates() {
        let io = RegisterFile::shared();
        let mut mmu = Mmu::new();
        mmu.map_io(io.clone());
        mmu.store16(0x0400_0204, 0x4317).unwrap();
        assert_eq!(io.borrow().raw_register(0x204), 0x4317);
        assert_eq!(mmu.load_u16(0x0400_0204).unwrap(), 0x4317);

        let handle = mmu.io().unwrap();
        assert_eq!(handle.borrow().raw_register(0x204), 0x4317);
        mmu.unmap(Region::Io.index());
        assert!(mmu.io().is_none());
    }

    #[test]
    fn test_reset_restores_pristine_state() {
        let io = RegisterFile::shared();
        let mut mmu = Mmu::new();
        mmu.map_io(io);
        mmu.map_rom(rom_of(0x100), false).unwrap();
        mmu.store32(0x0200_0000, 0xFFFF_FFFF).unwrap();
        mmu.adjust_timings(0x0317);
        mmu.icache_mut().mark(0x0300_0000);

        mmu.reset();

        assert_eq!(mmu.load32(0x0200_0000).unwrap(), 0);
        assert!(mmu.load8(0x0800_0000).is_err());
        assert!(mmu.load8(0x0400_0000).is_err());
        assert!(mmu.sram().is_none());
        assert_eq!(mmu.waitstates(), &WaitStates::default());
        assert!(mmu.icache().is_empty());
    }
}
