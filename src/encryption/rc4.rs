//! RC4 stream cipher.
//!
//! RC4 is symmetric: encrypting twice with the same key restores the input.

use std::io::{self, Write};

use crate::filters::StreamLayer;

/// RC4 keystream state.
pub(crate) struct Rc4Cipher {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4Cipher {
    /// Key-schedule a new cipher. `key` must not be empty.
    pub(crate) fn new(key: &[u8]) -> Self {
        let mut s = [0u8; 256];
        for (i, val) in s.iter_mut().enumerate() {
            *val = i as u8;
        }

        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }

        Self { s, i: 0, j: 0 }
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);
        let k = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[k as usize]
    }

    /// XOR the next keystream bytes into `data`.
    pub(crate) fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            *byte ^= self.next_byte();
        }
    }
}

/// Encrypt or decrypt `data` with a fresh keystream.
pub fn rc4_crypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut cipher = Rc4Cipher::new(key);
    let mut result = data.to_vec();
    cipher.apply_keystream(&mut result);
    result
}

/// Stream stage that RC4-encrypts everything written through it.
pub(crate) struct Rc4Layer {
    cipher: Rc4Cipher,
    inner: Box<dyn StreamLayer>,
    scratch: Vec<u8>,
}

impl Rc4Layer {
    pub(crate) fn new(key: &[u8], inner: Box<dyn StreamLayer>) -> Self {
        Self {
            cipher: Rc4Cipher::new(key),
            inner,
            scratch: Vec::new(),
        }
    }
}

impl Write for Rc4Layer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        self.cipher.apply_keystream(&mut self.scratch);
        self.inner.write_all(&self.scratch)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl StreamLayer for Rc4Layer {
    fn finish(self: Box<Self>) -> io::Result<u64> {
        self.inner.finish()
    }
}
