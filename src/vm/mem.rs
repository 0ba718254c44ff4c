use thiserror::Error;

/// Words of memory; addresses are exactly 16 bits wide.
pub const MEMORY_SIZE: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("invalid machine word '{text}' on line {lineno}")]
    BadWord { lineno: usize, text: String },
    #[error("image does not fit in memory")]
    TooLarge,
}

/// Flat word-addressed memory. The address space is circular: address
/// arithmetic is done in u16 and wraps modulo 2^16, so every access hits
/// a real word and loads and stores cannot fault.
pub struct Memory {
    words: Box<[u16]>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            words: vec![0; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    pub fn load(&self, addr: u16) -> u16 {
        self.words[addr as usize]
    }

    pub fn store(&mut self, addr: u16, value: u16) {
        self.words[addr as usize] = value;
    }

    /// Parses the assembler's output format: one 16-bit hex word per line,
    /// loaded starting at address zero. Blank lines are skipped and `#`
    /// starts a comment, so annotated listings load unchanged.
    pub fn load_hex(input: &str) -> Result<Memory, ImageError> {
        let mut mem = Memory::new();
        let mut addr: usize = 0;
        for (i, line) in input.lines().enumerate() {
            let text = match line.find('#') {
                Some(x) => &line[..x],
                None => line,
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let word = u16::from_str_radix(text, 16).map_err(|_| ImageError::BadWord {
                lineno: i + 1,
                text: text.to_string(),
            })?;
            if addr >= MEMORY_SIZE {
                return Err(ImageError::TooLarge);
            }
            mem.words[addr] = word;
            addr += 1;
        }
        Ok(mem)
    }
}

impl Default for Memory {
    fn default() -> Memory {
        Memory::new()
    }
}

#[cfg(test)]
pub mod memory_words {
    use super::*;

    #[test]
    fn roundtrip_word() {
        let mut mem = Memory::new();
        mem.store(0x1000, 0x2010);
        assert_eq!(mem.load(0x1000), 0x2010);
        assert_eq!(mem.load(0x1001), 0);
    }

    #[test]
    fn highest_address_is_reachable() {
        let mut mem = Memory::new();
        mem.store(0xFFFF, 0xBEEF);
        assert_eq!(mem.load(0xFFFF), 0xBEEF);
    }

    #[test]
    fn load_hex_image() {
        let mem = Memory::load_hex("e071\n1234  # 2\n\nbeef\n").expect("image loads");
        assert_eq!(mem.load(0), 0xE071);
        assert_eq!(mem.load(1), 0x1234);
        assert_eq!(mem.load(2), 0xBEEF);
        assert_eq!(mem.load(3), 0);
    }

    #[test]
    fn load_hex_rejects_junk() {
        match Memory::load_hex("e071\nnope\n") {
            Err(err) => assert_eq!(
                err,
                ImageError::BadWord {
                    lineno: 2,
                    text: "nope".to_string(),
                }
            ),
            Ok(_) => panic!("expected a bad word error"),
        }
    }
}
