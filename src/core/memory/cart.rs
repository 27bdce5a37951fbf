//! Metadados do cartucho extraídos do cabeçalho da ROM.
//!
//! O cabeçalho do GBA começa em 0xA0: título (12 bytes), código do jogo (4),
//! código do fabricante (2), valor fixo 0x96, unidade, tipo de dispositivo,
//! reservado (7), versão e complemento (checksum do cabeçalho).

use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use log::{info, warn};

/// Offset do título na ROM
pub const HEADER_OFFSET: usize = 0xA0;

/// Fim da área coberta pelo checksum do cabeçalho (inclusivo: 0xA0..=0xBC)
const CHECKSUM_SPAN: usize = 0xBD - HEADER_OFFSET;

/// Campos do cabeçalho a partir de 0xA0
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RomHeader {
    pub title: [u8; 12],
    pub game_code: [u8; 4],
    pub maker_code: [u8; 2],
    pub fixed: u8,
    pub unit_code: u8,
    pub device_type: u8,
    pub reserved: [u8; 7],
    pub version: u8,
    pub complement: u8,
    pub reserved2: [u8; 2],
}

impl RomHeader {
    pub const SIZE: usize = std::mem::size_of::<RomHeader>();

    /// Lê o cabeçalho. Bytes ausentes numa ROM curta contam como zero.
    pub fn parse(rom: &[u8]) -> Self {
        let mut raw = [0u8; Self::SIZE];
        if let Some(available) = rom.get(HEADER_OFFSET..) {
            let len = available.len().min(Self::SIZE);
            raw[..len].copy_from_slice(&available[..len]);
        }
        bytemuck::pod_read_unaligned(&raw)
    }

    /// Complemento esperado: `-(soma de 0xA0..=0xBC) - 0x19`
    pub fn expected_complement(&self) -> u8 {
        let bytes = bytemuck::bytes_of(self);
        let sum = bytes[..CHECKSUM_SPAN]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        0u8.wrapping_sub(sum).wrapping_sub(0x19)
    }

    pub fn checksum_ok(&self) -> bool {
        self.complement == self.expected_complement()
    }
}

/// Converte um campo terminado em NUL, parando no primeiro zero
fn field_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as char)
        .collect()
}

/// Informações do cartucho devolvidas ao carregador
#[derive(Debug, Clone)]
pub struct CartridgeInfo {
    pub title: Option<String>,
    pub code: Option<String>,
    pub maker: Option<String>,
    pub version: Option<u8>,
    pub header_checksum_ok: Option<bool>,
    pub rom: Rc<[u8]>,
}

impl CartridgeInfo {
    /// Cartucho sem metadados (extração não solicitada)
    pub fn unprocessed(rom: Rc<[u8]>) -> Self {
        Self {
            title: None,
            code: None,
            maker: None,
            version: None,
            header_checksum_ok: None,
            rom,
        }
    }

    /// Extrai título, código e fabricante do cabeçalho
    pub fn from_rom(rom: Rc<[u8]>) -> Self {
        let header = RomHeader::parse(&rom);
        let checksum_ok = header.checksum_ok();
        if !checksum_ok {
            warn!(
                "Checksum do cabeçalho inválido: 0x{:02X} (esperado 0x{:02X})",
                header.complement,
                header.expected_complement()
            );
        }

        let info = Self {
            title: Some(field_string(&header.title)),
            code: Some(field_string(&header.game_code)),
            maker: Some(field_string(&header.maker_code)),
            version: Some(header.version),
            header_checksum_ok: Some(checksum_ok),
            rom,
        };
        info!(
            "Cartucho: \"{}\" código {} fabricante {}",
            info.title.as_deref().unwrap_or(""),
            info.code.as_deref().unwrap_or(""),
            info.maker.as_deref().unwrap_or("")
        );
        info
    }
}
