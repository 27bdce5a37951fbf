//! Visões de memória little-endian sobre buffers de tamanho fixo.
//!
//! Toda região mapeada implementa [`MemoryView`]. Existem duas variantes
//! concretas: [`MemoryBlock`] (RAM alocada e zerada pelo próprio core) e
//! [`RomView`] (janela somente leitura sobre um buffer externo, ROM/BIOS).
//!
//! Os offsets recebidos já foram mascarados pelo barramento. Offsets fora do
//! tamanho da visão não causam pânico: um `MemoryBlock` espelha (o offset dá a
//! volta no tamanho do bloco, como a WRAM/IRAM/OAM do hardware), enquanto uma
//! `RomView` lê zero além do fim do buffer.

use std::rc::Rc;

/// Acesso little-endian a um buffer de bytes.
pub trait MemoryView {
    /// Tamanho da visão em bytes
    fn size(&self) -> usize;

    fn load_u8(&self, offset: u32) -> u8;
    fn load_u16(&self, offset: u32) -> u16;
    fn load32(&self, offset: u32) -> i32;

    fn store8(&mut self, offset: u32, value: u8);
    fn store16(&mut self, offset: u32, value: u16);
    fn store32(&mut self, offset: u32, value: u32);

    /// Byte com extensão de sinal
    #[inline]
    fn load8(&self, offset: u32) -> i8 {
        self.load_u8(offset) as i8
    }

    /// Halfword com extensão de sinal
    #[inline]
    fn load16(&self, offset: u32) -> i16 {
        self.load_u16(offset) as i16
    }
}

/// Bloco de RAM de leitura e escrita, zerado na criação.
#[derive(Debug, Clone)]
pub struct MemoryBlock {
    data: Vec<u8>,
}

impl MemoryBlock {
    /// Cria um bloco zerado de `size` bytes (no mínimo 1)
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size.max(1)],
        }
    }

    /// Conteúdo bruto do bloco
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline(always)]
    fn index(&self, offset: u32) -> usize {
        offset as usize % self.data.len()
    }

    #[inline]
    fn read<const N: usize>(&self, offset: u32) -> [u8; N] {
        let mut out = [0u8; N];
        let start = self.index(offset);
        match self.data.get(start..start + N) {
            Some(bytes) => out.copy_from_slice(bytes),
            None => {
                // Acesso atravessando o fim: espelha byte a byte
                for (i, byte) in out.iter_mut().enumerate() {
                    *byte = self.data[(start + i) % self.data.len()];
                }
            }
        }
        out
    }

    #[inline]
    fn write<const N: usize>(&mut self, offset: u32, bytes: [u8; N]) {
        let start = self.index(offset);
        let len = self.data.len();
        match self.data.get_mut(start..start + N) {
            Some(dst) => dst.copy_from_slice(&bytes),
            None => {
                for (i, byte) in bytes.iter().enumerate() {
                    self.data[(start + i) % len] = *byte;
                }
            }
        }
    }
}

impl MemoryView for MemoryBlock {
    fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn load_u8(&self, offset: u32) -> u8 {
        self.data[self.index(offset)]
    }

    #[inline]
    fn load_u16(&self, offset: u32) -> u16 {
        u16::from_le_bytes(self.read(offset))
    }

    #[inline]
    fn load32(&self, offset: u32) -> i32 {
        i32::from_le_bytes(self.read(offset))
    }

    #[inline]
    fn store8(&mut self, offset: u32, value: u8) {
        let index = self.index(offset);
        self.data[index] = value;
    }

    #[inline]
    fn store16(&mut self, offset: u32, value: u16) {
        self.write(offset, value.to_le_bytes());
    }

    #[inline]
    fn store32(&mut self, offset: u32, value: u32) {
        self.write(offset, value.to_le_bytes());
    }
}

/// Janela somente leitura sobre um buffer externo (BIOS ou ROM do cartucho).
///
/// O buffer é compartilhado: espelhar a mesma ROM em várias regiões só clona
/// o `Rc`. Escritas são descartadas silenciosamente.
#[derive(Debug, Clone)]
pub struct RomView {
    data: Rc<[u8]>,
    base: usize,
}

impl RomView {
    /// Cria uma visão começando em `base` bytes dentro de `data`
    pub fn new(data: Rc<[u8]>, base: usize) -> Self {
        Self { data, base }
    }

    /// Offset de início dentro do buffer
    pub fn base(&self) -> usize {
        self.base
    }

    /// Buffer completo compartilhado
    pub fn buffer(&self) -> &Rc<[u8]> {
        &self.data
    }

    #[inline]
    fn read<const N: usize>(&self, offset: u32) -> [u8; N] {
        let mut out = [0u8; N];
        let start = self.base + offset as usize;
        match self.data.get(start..start + N) {
            Some(bytes) => out.copy_from_slice(bytes),
            None => {
                for (i, byte) in out.iter_mut().enumerate() {
                    *byte = self.data.get(start + i).copied().unwrap_or(0);
                }
            }
        }
        out
    }
}

impl MemoryView for RomView {
    fn size(&self) -> usize {
        self.data.len().saturating_sub(self.base)
    }

    #[inline]
    fn load_u8(&self, offset: u32) -> u8 {
        self.data
            .get(self.base + offset as usize)
            .copied()
            .unwrap_or(0)
    }

    #[inline]
    fn load_u16(&self, offset: u32) -> u16 {
        u16::from_le_bytes(self.read(offset))
    }

    #[inline]
    fn load32(&self, offset: u32) -> i32 {
        i32::from_le_bytes(self.read(offset))
    }

    // ROM: escritas não têm efeito
    fn store8(&mut self, _offset: u32, _value: u8) {}
    fn store16(&mut self, _offset: u32, _value: u16) {}
    fn store32(&mut self, _offset: u32, _value: u32) {}
}
