//! Document encryption.
//!
//! The writer only knows the two hook traits defined here: a
//! [`SecurityHandler`] hands out one [`ObjectEncryptor`] per object, and the
//! encryptor either transforms string bytes or wraps a stream's byte sink.
//! [`StandardSecurityHandler`] implements the password-based standard
//! handler (RC4 40/128-bit, AES-128).
//!
//! Stream bodies are encoded first and encrypted last, so the cipher stage
//! sits directly above the fragment and readers decrypt before decoding.
//!
//! # References
//!
//! - PDF Spec Section 7.6: Encryption
//! - PDF Spec Section 7.6.3: Standard Security Handler

use std::rc::Rc;

use crate::config::PdfVersion;
use crate::error::Result;
use crate::filters::StreamLayer;
use crate::object::ObjectRef;
use crate::writer::FragmentWriter;

mod aes;
pub mod algorithms;
mod rc4;
mod standard;

pub use aes::{aes128_decrypt, aes128_encrypt};
pub use rc4::rc4_crypt;
pub use standard::StandardSecurityHandler;

/// Per-object encryption hooks.
pub trait ObjectEncryptor {
    /// Whether this is a block cipher whose output length differs from its input.
    fn is_block(&self) -> bool;

    /// Encrypt a complete value. Block ciphers prepend their IV.
    fn block_encrypt(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Encrypt in place. Only stream ciphers support this.
    fn fast_encrypt_in_place(&self, data: &mut [u8]) -> Result<()>;

    /// Wrap a stream stage so that everything written through it is encrypted.
    fn wrap(&self, inner: Box<dyn StreamLayer>) -> Result<Box<dyn StreamLayer>>;

    /// Encrypt a string value with whichever path fits the cipher.
    fn encrypt_string(&self, data: &[u8]) -> Result<Vec<u8>> {
        if self.is_block() {
            self.block_encrypt(data)
        } else {
            let mut out = data.to_vec();
            self.fast_encrypt_in_place(&mut out)?;
            Ok(out)
        }
    }
}

/// Source of per-object encryptors for one document.
pub trait SecurityHandler {
    /// Encryptor for the object `obj`, or `None` if it is stored in the clear.
    fn for_object(&self, obj: ObjectRef) -> Option<Rc<dyn ObjectEncryptor>>;

    /// Reference of the `/Encrypt` dictionary object.
    fn dictionary_ref(&self) -> ObjectRef;

    /// Write the `/Encrypt` dictionary object.
    fn write_dictionary(&self, writer: &mut FragmentWriter) -> Result<()>;
}

/// Encryption algorithm for the standard security handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionAlgorithm {
    /// RC4 with 40-bit key (V=1, R=2)
    Rc4_40,
    /// RC4 with 128-bit key (V=2, R=3, PDF 1.4+)
    Rc4_128,
    /// AES with 128-bit key in CBC mode (V=4, R=4, PDF 1.6+)
    #[default]
    Aes128,
}

impl EncryptionAlgorithm {
    /// Key length in bytes.
    pub fn key_length(&self) -> usize {
        match self {
            EncryptionAlgorithm::Rc4_40 => 5,
            EncryptionAlgorithm::Rc4_128 | EncryptionAlgorithm::Aes128 => 16,
        }
    }

    /// `(V, R)` pair of the encryption dictionary.
    pub fn version_revision(&self) -> (u32, u32) {
        match self {
            EncryptionAlgorithm::Rc4_40 => (1, 2),
            EncryptionAlgorithm::Rc4_128 => (2, 3),
            EncryptionAlgorithm::Aes128 => (4, 4),
        }
    }

    /// Whether this is an AES algorithm.
    pub fn is_aes(&self) -> bool {
        matches!(self, EncryptionAlgorithm::Aes128)
    }

    /// Oldest PDF version that supports the algorithm.
    pub fn min_version(&self) -> PdfVersion {
        match self {
            EncryptionAlgorithm::Rc4_40 => PdfVersion::V1_2,
            EncryptionAlgorithm::Rc4_128 => PdfVersion::V1_4,
            EncryptionAlgorithm::Aes128 => PdfVersion::V1_6,
        }
    }
}

/// Permission flags granted to a user who opens with the user password.
///
/// PDF Spec: Table 22 - User access permissions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    /// Allow printing the document.
    pub print: bool,
    /// Allow high-resolution printing.
    pub print_high_quality: bool,
    /// Allow modifying the document contents.
    pub modify: bool,
    /// Allow copying or extracting text and graphics.
    pub copy: bool,
    /// Allow adding annotations and form fields.
    pub annotate: bool,
    /// Allow filling in form fields.
    pub fill_forms: bool,
    /// Allow extracting content for accessibility.
    pub accessibility: bool,
    /// Allow document assembly (insert, rotate, delete pages).
    pub assemble: bool,
}

impl Permissions {
    /// All permissions granted.
    pub fn all() -> Self {
        Self {
            print: true,
            print_high_quality: true,
            modify: true,
            copy: true,
            annotate: true,
            fill_forms: true,
            accessibility: true,
            assemble: true,
        }
    }

    /// View only, plus accessibility extraction.
    pub fn read_only() -> Self {
        Self {
            accessibility: true,
            ..Default::default()
        }
    }

    /// The 32-bit `/P` value. Reserved bits 7-8 and 13-32 are set.
    pub fn to_bits(&self) -> i32 {
        let flags = [
            (self.print, 2),
            (self.modify, 3),
            (self.copy, 4),
            (self.annotate, 5),
            (self.fill_forms, 8),
            (self.accessibility, 9),
            (self.assemble, 10),
            (self.print_high_quality, 11),
        ];
        flags
            .iter()
            .filter(|(granted, _)| *granted)
            .fold(0xFFFFF0C0u32 as i32, |bits, (_, bit)| bits | (1 << bit))
    }
}

/// Settings for the standard security handler.
#[derive(Debug, Clone)]
pub struct EncryptionConfig {
    /// Password required to open the document (may be empty).
    pub user_password: String,
    /// Password for full access; the user password is used when empty.
    pub owner_password: String,
    /// Cipher and key length.
    pub algorithm: EncryptionAlgorithm,
    /// What a user-password holder may do.
    pub permissions: Permissions,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            user_password: String::new(),
            owner_password: String::new(),
            algorithm: EncryptionAlgorithm::default(),
            permissions: Permissions::all(),
        }
    }
}

impl EncryptionConfig {
    /// Create a configuration with the given passwords.
    pub fn new(user_password: impl Into<String>, owner_password: impl Into<String>) -> Self {
        Self {
            user_password: user_password.into(),
            owner_password: owner_password.into(),
            ..Default::default()
        }
    }

    /// Set the encryption algorithm.
    pub fn with_algorithm(mut self, algorithm: EncryptionAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the permissions.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}
