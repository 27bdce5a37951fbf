//! Controlador de DMA.
//!
//! Executa uma transferência em bloco descrita por um [`DmaDescriptor`]
//! direto sobre as regiões do barramento, sem cobrar wait states por acesso:
//! o custo é aproximado e cobrado de uma vez ao final.

use bitflags::bitflags;
use log::warn;

use crate::core::memory::bus::Mmu;
use crate::core::memory::icache::page_of;
use crate::core::memory::io::dma_control_offset;
use crate::core::memory::timing::AccessTiming;
use crate::core::memory::{region_index, BASE_OFFSET, OFFSET_MASK};

/// Máscara aplicada ao DMAxCNT_H quando um canal sem repetição termina
pub const DMA_COMPLETE_MASK: u16 = 0x7FE0;

/// Ciclos internos extras (2I) de toda transferência
const DMA_INTERNAL_CYCLES: u64 = 2;

bitflags! {
    /// Registrador DMAxCNT_H
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmaControl: u16 {
        const DEST_CONTROL = 0x0060;
        const SRC_CONTROL  = 0x0180;
        const REPEAT       = 0x0200;
        const WORD         = 0x0400;
        const GAME_PAK_DRQ = 0x0800;
        const TIMING       = 0x3000;
        const IRQ          = 0x4000;
        const ENABLE       = 0x8000;
    }
}

impl DmaControl {
    pub fn dest_control(self) -> u16 {
        (self.bits() & Self::DEST_CONTROL.bits()) >> 5
    }

    pub fn src_control(self) -> u16 {
        (self.bits() & Self::SRC_CONTROL.bits()) >> 7
    }

    /// Momento de início (0 imediato, 1 VBlank, 2 HBlank, 3 especial)
    pub fn start_timing(self) -> u16 {
        (self.bits() & Self::TIMING.bits()) >> 12
    }
}

/// Modo de endereço de um lado da transferência
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressControl {
    Increment,
    Decrement,
    Fixed,
}

impl AddressControl {
    /// Decodifica o campo de 2 bits. O valor 3 (reservado / incremento com
    /// recarga) fica por conta do dono do registrador.
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(AddressControl::Increment),
            1 => Some(AddressControl::Decrement),
            2 => Some(AddressControl::Fixed),
            _ => None,
        }
    }

    /// Passo em bytes por elemento
    #[inline]
    pub fn step(self, width: u32) -> i32 {
        match self {
            AddressControl::Increment => width as i32,
            AddressControl::Decrement => -(width as i32),
            AddressControl::Fixed => 0,
        }
    }
}

/// Descritor de um canal de DMA (pertence ao bloco de I/O)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaDescriptor {
    pub source: u32,
    pub dest: u32,
    pub src_control: AddressControl,
    pub dst_control: AddressControl,
    /// Largura de 32-bit se verdadeiro, 16-bit caso contrário
    pub word: bool,
    /// Número de elementos (não bytes)
    pub count: u32,
    pub repeat: bool,
    pub enable: bool,
}

impl DmaDescriptor {
    /// Monta o descritor a partir dos registradores do canal.
    ///
    /// Contagem zero vale o máximo do canal (0x4000, ou 0x10000 no canal 3).
    pub fn from_registers(
        channel: usize,
        source: u32,
        dest: u32,
        count: u16,
        control: u16,
    ) -> Option<Self> {
        let control = DmaControl::from_bits_retain(control);
        let count = match (count, channel) {
            (0, 3) => 0x10000,
            (0, _) => 0x4000,
            (n, _) => n as u32,
        };
        Some(Self {
            source,
            dest,
            src_control: AddressControl::from_bits(control.src_control())?,
            dst_control: AddressControl::from_bits(control.dest_control())?,
            word: control.contains(DmaControl::WORD),
            count,
            repeat: control.contains(DmaControl::REPEAT),
            enable: control.contains(DmaControl::ENABLE),
        })
    }

    /// Largura de cada elemento em bytes
    #[inline]
    pub fn width(&self) -> u32 {
        if self.word {
            4
        } else {
            2
        }
    }
}

/// Resultado de uma transferência
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaOutcome {
    /// Dados copiados; `cycles` foi somado ao contador
    Completed { cycles: u64 },
    /// Origem ou destino sem memória mapeada; nada foi feito
    InvalidRegion,
}

#[inline(always)]
fn advance(offset: u32, step: i32) -> u32 {
    offset.wrapping_add(step as u32) & OFFSET_MASK
}

impl Mmu {
    /// Executa a transferência do canal `channel` (0-3).
    ///
    /// Em 16-bit, se a origem não estiver alinhada em 4 bytes, o primeiro
    /// elemento é copiado sozinho; depois os elementos andam aos pares como
    /// words de 32-bit, e um elemento final que sobrar é copiado sozinho.
    ///
    /// O custo cobrado é um acesso não sequencial na origem e no destino,
    /// mais `count - 1` acessos sequenciais de cada lado, mais 2 ciclos
    /// internos, independente dos pares acima.
    pub fn transfer(
        &mut self,
        channel: usize,
        info: &mut DmaDescriptor,
        cycles: &mut u64,
    ) -> DmaOutcome {
        let width = info.width();
        let source_step = info.src_control.step(width);
        let dest_step = info.dst_control.step(width);

        let mut source = info.source & OFFSET_MASK;
        let mut dest = info.dest & OFFSET_MASK;
        let source_region = region_index(info.source);
        let dest_region = region_index(info.dest);

        if self.region_view(source_region).is_none() || self.region_view(dest_region).is_none() {
            warn!(
                "DMA {} inválido: 0x{:08X} -> 0x{:08X}",
                channel, info.source, info.dest
            );
            return DmaOutcome::InvalidRegion;
        }

        let mut remaining = info.count;
        if width == 4 {
            for _ in 0..remaining {
                self.move32(source_region, source, dest_region, dest);
                source = advance(source, source_step);
                dest = advance(dest, dest_step);
            }
        } else {
            if source & 0x2 != 0 && remaining > 0 {
                self.move16(source_region, source, dest_region, dest);
                source = advance(source, source_step);
                dest = advance(dest, dest_step);
                remaining -= 1;
            }

            while remaining > 1 {
                self.move32(source_region, source, dest_region, dest);
                source = advance(source, source_step << 1);
                dest = advance(dest, dest_step << 1);
                remaining -= 2;
            }

            if remaining > 0 {
                self.move16(source_region, source, dest_region, dest);
            }
        }

        let (nonseq, seq) = if width == 4 {
            (AccessTiming::NonSeq32, AccessTiming::Seq32)
        } else {
            (AccessTiming::NonSeq16, AccessTiming::Seq16)
        };
        let ws = self.waitstates();
        let first = ws.cycles(nonseq, source_region) + ws.cycles(nonseq, dest_region);
        let rest = ws.cycles(seq, source_region) + ws.cycles(seq, dest_region);
        let cost = first as u64
            + info.count.saturating_sub(1) as u64 * rest as u64
            + DMA_INTERNAL_CYCLES;
        *cycles += cost;

        if !info.repeat {
            info.enable = false;
            self.clear_enable(channel);
        }

        DmaOutcome::Completed { cycles: cost }
    }

    /// Limpa o bit de enable (e a contagem baixa) no DMAxCNT_H do canal
    fn clear_enable(&mut self, channel: usize) {
        let (Some(offset), Some(io)) = (dma_control_offset(channel), self.io_port()) else {
            return;
        };
        let value = io.raw_register(offset);
        io.set_raw_register(offset, value & DMA_COMPLETE_MASK);
    }

    fn move16(&mut self, source_region: usize, source: u32, dest_region: usize, dest: u32) {
        let Some(value) = self.region_view(source_region).map(|v| v.load_u16(source)) else {
            return;
        };
        if let Some(view) = self.region_view_mut(dest_region) {
            view.store16(dest, value);
        }
        self.invalidate_dest(dest_region, dest);
    }

    fn move32(&mut self, source_region: usize, source: u32, dest_region: usize, dest: u32) {
        let Some(value) = self.region_view(source_region).map(|v| v.load32(source)) else {
            return;
        };
        if let Some(view) = self.region_view_mut(dest_region) {
            view.store32(dest, value as u32);
        }
        self.invalidate_dest(dest_region, dest);
        self.invalidate_dest(dest_region, dest.wrapping_add(3) & OFFSET_MASK);
    }

    #[inline]
    fn invalidate_dest(&mut self, dest_region: usize, dest: u32) {
        let address = ((dest_region as u32) << BASE_OFFSET) | dest;
        self.icache_mut().invalidate_page(page_of(address));
    }
}
