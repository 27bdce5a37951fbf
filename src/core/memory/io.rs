//! Interface com o bloco de registradores de I/O (região 0x04).
//!
//! O bloco de I/O pertence aos periféricos, não à MMU. O barramento apenas
//! guarda uma referência injetada ([`IoPort`]) e encaminha os acessos.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::warn;

use crate::core::memory::map::Region;
use crate::core::memory::view::{MemoryBlock, MemoryView};

/// Controle de wait states do cartucho (WAITCNT)
pub const WAITCNT: u32 = 0x204;

/// Registradores de controle (CNT_H) dos canais de DMA
pub const DMA0CNT_HI: u32 = 0xBA;
pub const DMA1CNT_HI: u32 = 0xC6;
pub const DMA2CNT_HI: u32 = 0xD2;
pub const DMA3CNT_HI: u32 = 0xDE;

/// Offset do registrador de controle do canal de DMA `channel` (0-3)
pub fn dma_control_offset(channel: usize) -> Option<u32> {
    match channel {
        0 => Some(DMA0CNT_HI),
        1 => Some(DMA1CNT_HI),
        2 => Some(DMA2CNT_HI),
        3 => Some(DMA3CNT_HI),
        _ => None,
    }
}

/// Bloco de registradores de I/O.
///
/// Os acessos via [`MemoryView`] podem ter efeitos colaterais (disparar DMA,
/// reconfigurar timers). `raw_register`/`set_raw_register` acessam o
/// armazenamento sem efeitos; são usados pelo DMA ao concluir um canal.
pub trait IoRegisters: MemoryView {
    fn raw_register(&self, offset: u32) -> u16;
    fn set_raw_register(&mut self, offset: u32, value: u16);
}

/// Referência compartilhada ao bloco de I/O mapeada na região 0x04.
#[derive(Clone)]
pub struct IoPort {
    inner: Rc<RefCell<dyn IoRegisters>>,
}

impl IoPort {
    pub fn new(io: Rc<RefCell<dyn IoRegisters>>) -> Self {
        Self { inner: io }
    }

    pub fn raw_register(&self, offset: u32) -> u16 {
        self.inner.borrow().raw_register(offset)
    }

    /// Grava sem efeitos colaterais. Se o host ainda estiver com o bloco
    /// emprestado, a escrita é descartada com um aviso.
    pub fn set_raw_register(&self, offset: u32, value: u16) {
        match self.inner.try_borrow_mut() {
            Ok(mut io) => io.set_raw_register(offset, value),
            Err(_) => warn!(
                "Bloco de I/O ocupado: escrita em 0x{:03X} descartada",
                offset
            ),
        }
    }

    /// Clona o `Rc` do bloco injetado
    pub fn handle(&self) -> Rc<RefCell<dyn IoRegisters>> {
        Rc::clone(&self.inner)
    }
}

impl fmt::Debug for IoPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IoPort({:p})", Rc::as_ptr(&self.inner))
    }
}

impl MemoryView for IoPort {
    fn size(&self) -> usize {
        self.inner.borrow().size()
    }

    fn load_u8(&self, offset: u32) -> u8 {
        self.inner.borrow().load_u8(offset)
    }

    fn load_u16(&self, offset: u32) -> u16 {
        self.inner.borrow().load_u16(offset)
    }

    fn load32(&self, offset: u32) -> i32 {
        self.inner.borrow().load32(offset)
    }

    fn store8(&mut self, offset: u32, value: u8) {
        self.inner.borrow_mut().store8(offset, value);
    }

    fn store16(&mut self, offset: u32, value: u16) {
        self.inner.borrow_mut().store16(offset, value);
    }

    fn store32(&mut self, offset: u32, value: u32) {
        self.inner.borrow_mut().store32(offset, value);
    }
}

/// Armazenamento simples de registradores, sem efeitos colaterais.
///
/// Serve para hosts que ainda não têm um bloco de periféricos completo.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    registers: MemoryBlock,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            registers: MemoryBlock::new(Region::Io.size()),
        }
    }

    /// Cria já embrulhado para injeção no barramento
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryView for RegisterFile {
    fn size(&self) -> usize {
        self.registers.size()
    }

    fn load_u8(&self, offset: u32) -> u8 {
        self.registers.load_u8(offset)
    }

    fn load_u16(&self, offset: u32) -> u16 {
        self.registers.load_u16(offset)
    }

    fn load32(&self, offset: u32) -> i32 {
        self.registers.load32(offset)
    }

    fn store8(&mut self, offset: u32, value: u8) {
        self.registers.store8(offset, value);
    }

    fn store16(&mut self, offset: u32, value: u16) {
        self.registers.store16(offset, value);
    }

    fn store32(&mut self, offset: u32, value: u32) {
        self.registers.store32(offset, value);
    }
}

impl IoRegisters for RegisterFile {
    fn raw_register(&self, offset: u32) -> u16 {
        self.registers.load_u16(offset & !1)
    }

    fn set_raw_register(&mut self, offset: u32, value: u16) {
        self.registers.store16(offset & !1, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dma_control_offsets() {
        assert_eq!(dma_control_offset(0), Some(0xBA));
        assert_eq!(dma_control_offset(3), Some(0xDE));
        assert_eq!(dma_control_offset(4), None);
    }

    #[test]
    fn test_io_port_shares_register_file() {
        let file = RegisterFile::shared();
        let mut port = IoPort::new(file.clone());

        port.store16(DMA1CNT_HI, 0x8400);
        assert_eq!(file.borrow().raw_register(DMA1CNT_HI), 0x8400);

        file.borrow_mut().set_raw_register(WAITCNT, 0x4317);
        assert_eq!(port.load_u16(WAITCNT), 0x4317);
        assert_eq!(port.raw_register(WAITCNT), 0x4317);
        assert!(Rc::ptr_eq(&port.handle(), &(file as Rc<RefCell<dyn IoRegisters>>)));
    }

    #[test]
    fn test_raw_write_while_borrowed_is_dropped() {
        let file = RegisterFile::shared();
        file.borrow_mut().set_raw_register(DMA2CNT_HI, 0x8000);
        let port = IoPort::new(file.clone());

        let guard = file.borrow();
        port.set_raw_register(DMA2CNT_HI, 0x0000);
        assert_eq!(guard.raw_register(DMA2CNT_HI), 0x8000);
        drop(guard);

        port.set_raw_register(DMA2CNT_HI, 0x0000);
        assert_eq!(file.borrow().raw_register(DMA2CNT_HI), 0);
    }
}
