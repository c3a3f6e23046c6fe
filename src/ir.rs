// Infrared remote decoding
//
// The receiver hardware hands us a raw pulse code; this module maps the 17
// buttons of the car's remote onto keys 0..=16. Anything else is "no key",
// which is the normal state between presses.

use std::sync::{Arc, Mutex};

/// Key value reported when no known button was decoded
pub const NO_KEY: i32 = -1;

/// Raw code a source reports when nothing was received
pub const NO_SIGNAL: u32 = 0;

/// Raw code -> key for the car's remote, one entry per button
pub const KEY_TABLE: [(u32, u8); 17] = [
    (0xf629D, 12),
    (0xf22DD, 13),
    (0xfA857, 14),
    (0xfC23D, 15),
    (0xf02FD, 16),
    (0xf4AB5, 0),
    (0xf6897, 1),
    (0xf9867, 2),
    (0xfB04F, 3),
    (0xf30CF, 4),
    (0xf18E7, 5),
    (0xf7A85, 6),
    (0xf10EF, 7),
    (0xf38C7, 8),
    (0xf5AA5, 9),
    (0xf42BD, 10),
    (0xf52AD, 11),
];

/// Look up a raw code, returning the key or `NO_KEY`
pub fn decode(code: u32) -> i32 {
    KEY_TABLE
        .iter()
        .find(|&&(known, _)| known == code)
        .map_or(NO_KEY, |&(_, key)| key as i32)
}

/// Raw code the remote sends for a key
pub fn code_for_key(key: u8) -> Option<u32> {
    KEY_TABLE
        .iter()
        .find(|&&(_, k)| k == key)
        .map(|&(code, _)| code)
}

/// Source of raw IR codes (the receiver)
///
/// Must never block: with nothing pending it returns a code the key table
/// does not know, usually `NO_SIGNAL`.
pub trait IrSource {
    fn read_raw_code(&mut self) -> u32;
}

impl<S: IrSource + ?Sized> IrSource for Box<S> {
    fn read_raw_code(&mut self) -> u32 {
        (**self).read_raw_code()
    }
}

/// Latest raw code received by something else (the bus, a test)
///
/// Holds one code at a time: a newer code replaces an unread one, and a read
/// takes it, so the next read misses until another code arrives. Clones share
/// the slot.
#[derive(Debug, Clone, Default)]
pub struct LatchedCode {
    latest: Arc<Mutex<Option<u32>>>,
}

impl LatchedCode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a received code, replacing any unread one
    pub fn push(&self, code: u32) {
        *self.slot() = Some(code);
    }

    /// Drop an unread code
    pub fn clear(&self) {
        self.slot().take();
    }

    pub fn is_empty(&self) -> bool {
        self.slot().is_none()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<u32>> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl IrSource for LatchedCode {
    fn read_raw_code(&mut self) -> u32 {
        self.slot().take().unwrap_or(NO_SIGNAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(decode(0xf629D), 12);
        assert_eq!(decode(0xf4AB5), 0);
        assert_eq!(decode(0xf52AD), 11);
        assert_eq!(decode(0xf02FD), 16);
    }

    #[test]
    fn test_full_table() {
        let expected: [(u32, i32); 17] = [
            (0xf4AB5, 0),
            (0xf6897, 1),
            (0xf9867, 2),
            (0xfB04F, 3),
            (0xf30CF, 4),
            (0xf18E7, 5),
            (0xf7A85, 6),
            (0xf10EF, 7),
            (0xf38C7, 8),
            (0xf5AA5, 9),
            (0xf42BD, 10),
            (0xf52AD, 11),
            (0xf629D, 12),
            (0xf22DD, 13),
            (0xfA857, 14),
            (0xfC23D, 15),
            (0xf02FD, 16),
        ];
        for (code, key) in expected {
            assert_eq!(decode(code), key, "code 0x{:X}", code);
        }
    }

    #[test]
    fn test_table_is_a_bijection_onto_0_to_16() {
        let mut keys: Vec<u8> = KEY_TABLE.iter().map(|&(_, key)| key).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..=16).collect::<Vec<u8>>());

        let mut codes: Vec<u32> = KEY_TABLE.iter().map(|&(code, _)| code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 17, "Duplicate raw codes in key table");
    }

    #[test]
    fn test_unknown_codes_are_no_key() {
        for code in [NO_SIGNAL, 0xFFFF_FFFF, 0xf629C, 0xf629E, 0x00FF_629D, 12] {
            assert_eq!(decode(code), NO_KEY, "code 0x{:X}", code);
        }
    }

    #[test]
    fn test_code_for_key_matches_decode() {
        for key in 0..=16u8 {
            let code = code_for_key(key).expect("every key has a code");
            assert_eq!(decode(code), key as i32);
        }
        assert_eq!(code_for_key(17), None);
    }

    #[test]
    fn test_latched_code_keeps_only_latest() {
        let latch = LatchedCode::new();
        let mut source = latch.clone();
        for _ in 0..1000 {
            latch.push(0xf629D);
        }
        latch.push(0xf22DD);

        assert_eq!(source.read_raw_code(), 0xf22DD);
        assert_eq!(source.read_raw_code(), NO_SIGNAL);
        assert!(latch.is_empty());
    }

    #[test]
    fn test_latched_code_clear() {
        let latch = LatchedCode::new();
        let mut source = latch.clone();
        latch.push(0xf4AB5);
        latch.clear();
        assert_eq!(source.read_raw_code(), NO_SIGNAL);
    }
}
