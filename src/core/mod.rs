//! Núcleo do emulador.
//! Por enquanto contém apenas o sistema de memória (MMU) do Game Boy Advance.

pub mod memory;
