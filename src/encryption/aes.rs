//! AES-128 in CBC mode with PKCS#7 padding.
//!
//! Encrypted strings and streams start with their 16-byte IV.
//!
//! PDF Spec: Section 7.6.2 - General Encryption Algorithm

use std::io::{self, Write};

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;
use cbc::{Decryptor, Encryptor};

use crate::error::{Error, Result};
use crate::filters::StreamLayer;

type Aes128CbcEnc = Encryptor<Aes128>;
type Aes128CbcDec = Decryptor<Aes128>;

const BLOCK: usize = 16;

fn encryptor(key: &[u8], iv: &[u8]) -> Result<Aes128CbcEnc> {
    Aes128CbcEnc::new_from_slices(key, iv)
        .map_err(|_| Error::Encryption("AES-128 needs a 16-byte key and IV".to_string()))
}

fn pkcs7_pad(data: &mut Vec<u8>) {
    let padding_len = BLOCK - (data.len() % BLOCK);
    data.extend(std::iter::repeat(padding_len as u8).take(padding_len));
}

/// Encrypt `data` with PKCS#7 padding. The IV is not included in the output.
pub fn aes128_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut cipher = encryptor(key, iv)?;
    let mut padded = data.to_vec();
    pkcs7_pad(&mut padded);
    for block in padded.chunks_exact_mut(BLOCK) {
        cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    Ok(padded)
}

/// Decrypt `data` and strip PKCS#7 padding.
pub fn aes128_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % BLOCK != 0 {
        return Err(Error::Encryption(
            "encrypted data length must be a multiple of 16".to_string(),
        ));
    }
    let mut cipher = Aes128CbcDec::new_from_slices(key, iv)
        .map_err(|_| Error::Encryption("AES-128 needs a 16-byte key and IV".to_string()))?;
    let mut buffer = data.to_vec();
    for block in buffer.chunks_exact_mut(BLOCK) {
        cipher.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }

    let padding_len = buffer.last().copied().unwrap_or(0) as usize;
    if padding_len == 0 || padding_len > BLOCK || padding_len > buffer.len() {
        return Err(Error::Encryption("invalid PKCS#7 padding".to_string()));
    }
    let data_len = buffer.len() - padding_len;
    if buffer[data_len..].iter().any(|&b| b as usize != padding_len) {
        return Err(Error::Encryption("invalid PKCS#7 padding".to_string()));
    }
    buffer.truncate(data_len);
    Ok(buffer)
}

/// Stream stage that AES-CBC encrypts everything written through it.
///
/// The IV goes out first; the padded final block goes out on finish.
pub(crate) struct AesCbcLayer {
    cipher: Aes128CbcEnc,
    inner: Box<dyn StreamLayer>,
    pending: Vec<u8>,
}

impl AesCbcLayer {
    pub(crate) fn new(key: &[u8], iv: [u8; 16], mut inner: Box<dyn StreamLayer>) -> Result<Self> {
        let cipher = encryptor(key, &iv)?;
        inner.write_all(&iv)?;
        Ok(Self {
            cipher,
            inner,
            pending: Vec::with_capacity(BLOCK * 64),
        })
    }
}

impl Write for AesCbcLayer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        let whole = self.pending.len() - self.pending.len() % BLOCK;
        if whole > 0 {
            for block in self.pending[..whole].chunks_exact_mut(BLOCK) {
                self.cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
            }
            self.inner.write_all(&self.pending[..whole])?;
            self.pending.drain(..whole);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl StreamLayer for AesCbcLayer {
    fn finish(mut self: Box<Self>) -> io::Result<u64> {
        let mut last = std::mem::take(&mut self.pending);
        pkcs7_pad(&mut last);
        for block in last.chunks_exact_mut(BLOCK) {
            self.cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        self.inner.write_all(&last)?;
        self.inner.finish()
    }
}
