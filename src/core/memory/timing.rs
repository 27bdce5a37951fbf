//! Tabelas de wait states do barramento.
//!
//! Quatro tabelas de 16 entradas (uma por região): acesso não sequencial e
//! sequencial de 8/16-bit, e acesso não sequencial e sequencial de 32-bit.
//! Cada acesso custa `1 + tabela[região]` ciclos. Só as entradas da ROM e da
//! SRAM mudam em tempo de execução, via WAITCNT.

use crate::core::memory::map::Region;
use crate::core::memory::REGION_COUNT;
use log::debug;

pub const WAITSTATES: [u8; REGION_COUNT] = [0, 0, 2, 0, 0, 0, 0, 0, 4, 0, 4, 0, 4, 0, 4, 0];
pub const WAITSTATES_32: [u8; REGION_COUNT] = [0, 0, 5, 0, 0, 1, 0, 1, 7, 0, 9, 0, 13, 0, 8, 0];
pub const WAITSTATES_SEQ: [u8; REGION_COUNT] = [0, 0, 2, 0, 0, 0, 0, 0, 2, 0, 4, 0, 8, 0, 4, 0];
pub const WAITSTATES_SEQ_32: [u8; REGION_COUNT] =
    [0, 0, 5, 0, 0, 1, 0, 1, 5, 0, 9, 0, 17, 0, 8, 0];

/// Wait states não sequenciais da ROM e da SRAM, indexados pelo campo de 2 bits
pub const ROM_WS: [u8; 4] = [4, 3, 2, 8];

/// Wait states sequenciais de cada espelho da ROM, indexados pelo bit de seq
pub const ROM_WS_SEQ: [[u8; 2]; 3] = [[2, 1], [4, 1], [8, 1]];

/// Tipo de acesso ao barramento
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTiming {
    NonSeq16,
    Seq16,
    NonSeq32,
    Seq32,
}

/// Conjunto das quatro tabelas de wait states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitStates {
    pub nonseq: [u8; REGION_COUNT],
    pub seq: [u8; REGION_COUNT],
    pub nonseq32: [u8; REGION_COUNT],
    pub seq32: [u8; REGION_COUNT],
}

impl Default for WaitStates {
    fn default() -> Self {
        Self {
            nonseq: WAITSTATES,
            seq: WAITSTATES_SEQ,
            nonseq32: WAITSTATES_32,
            seq32: WAITSTATES_SEQ_32,
        }
    }
}

impl WaitStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Volta aos valores padrão do hardware
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn table(&self, kind: AccessTiming) -> &[u8; REGION_COUNT] {
        match kind {
            AccessTiming::NonSeq16 => &self.nonseq,
            AccessTiming::Seq16 => &self.seq,
            AccessTiming::NonSeq32 => &self.nonseq32,
            AccessTiming::Seq32 => &self.seq32,
        }
    }

    /// Wait states extras de uma região (0 para índices fora da tabela)
    #[inline]
    pub fn cycles(&self, kind: AccessTiming, region: usize) -> u32 {
        self.table(kind).get(region).copied().unwrap_or(0) as u32
    }

    /// Reconfigura a ROM e a SRAM a partir do registrador WAITCNT.
    ///
    /// Bits 0-1: SRAM. Bits 2-3/4: espelho 0 (não seq/seq). Bits 5-6/7:
    /// espelho 1. Bits 8-9/10: espelho 2. Um acesso de 32-bit à ROM conta como
    /// dois ciclos de 16-bit, o segundo sequencial.
    pub fn adjust(&mut self, word: u16) {
        let sram = (word & 0x0003) as usize;
        let ws0 = ((word & 0x000C) >> 2) as usize;
        let ws0seq = ((word & 0x0010) >> 4) as usize;
        let ws1 = ((word & 0x0060) >> 5) as usize;
        let ws1seq = ((word & 0x0080) >> 7) as usize;
        let ws2 = ((word & 0x0300) >> 8) as usize;
        let ws2seq = ((word & 0x0400) >> 10) as usize;

        let sram_ws = ROM_WS[sram];
        let s = Region::CartSram.index();
        self.nonseq[s] = sram_ws;
        self.seq[s] = sram_ws;
        self.nonseq32[s] = sram_ws;
        self.seq32[s] = sram_ws;

        let fields = [(ws0, ws0seq), (ws1, ws1seq), (ws2, ws2seq)];
        for (i, (region, (ws, seq))) in Region::CARTS.iter().zip(fields).enumerate() {
            let r = region.index();
            self.nonseq[r] = ROM_WS[ws];
            self.seq[r] = ROM_WS_SEQ[i][seq];
            self.nonseq32[r] = self.nonseq[r] + 1 + self.seq[r];
            self.seq32[r] = 2 * self.seq[r] + 1;
        }

        debug!(
            "WAITCNT 0x{:04X}: SRAM={} ROM0={}/{} ROM1={}/{} ROM2={}/{}",
            word,
            sram_ws,
            self.nonseq[Region::Cart0.index()],
            self.seq[Region::Cart0.index()],
            self.nonseq[Region::Cart1.index()],
            self.seq[Region::Cart1.index()],
            self.nonseq[Region::Cart2.index()],
            self.seq[Region::Cart2.index()],
        );
    }
}
