//! TP-Link autokey stream cipher.
//! Each ciphertext byte becomes the key for the next byte, seeded by a fixed initial key.

/// Initial key every message starts from.
pub const INITIAL_KEY: u8 = 0xAB;

/// AutokeyCipher holds the running key of a single message.
///
/// A new cipher must be created for every message; the key never carries
/// over between messages.
#[derive(Debug, Clone)]
pub struct AutokeyCipher {
    key: u8,
}

impl Default for AutokeyCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl AutokeyCipher {
    pub fn new() -> Self {
        Self { key: INITIAL_KEY }
    }

    /// Encrypt one byte and advance the key to the produced ciphertext.
    pub fn encrypt_byte(&mut self, plain: u8) -> u8 {
        let cipher = plain ^ self.key;
        self.key = cipher;
        cipher
    }

    /// Decrypt one byte and advance the key to the consumed ciphertext.
    pub fn decrypt_byte(&mut self, cipher: u8) -> u8 {
        let plain = cipher ^ self.key;
        self.key = cipher;
        plain
    }

    /// Encrypt a whole message with a fresh key.
    pub fn encrypt(data: &[u8]) -> Vec<u8> {
        let mut cipher = Self::new();
        data.iter().map(|&b| cipher.encrypt_byte(b)).collect()
    }

    /// Decrypt a whole message with a fresh key.
    pub fn decrypt(data: &[u8]) -> Vec<u8> {
        let mut cipher = Self::new();
        data.iter().map(|&b| cipher.decrypt_byte(b)).collect()
    }
}
