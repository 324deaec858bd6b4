//! Standard (password) security handler for writing.

use std::rc::Rc;

use md5::{Digest, Md5};

use super::aes::{aes128_encrypt, AesCbcLayer};
use super::algorithms;
use super::rc4::{rc4_crypt, Rc4Cipher, Rc4Layer};
use super::{EncryptionAlgorithm, EncryptionConfig, ObjectEncryptor, SecurityHandler};
use crate::config::PdfVersion;
use crate::error::{Error, Result};
use crate::filters::StreamLayer;
use crate::object::ObjectRef;
use crate::writer::FragmentWriter;

/// Password-based security handler.
///
/// Every object except the `/Encrypt` dictionary itself gets its own key
/// derived from the file key, object number and generation (Algorithm 1).
pub struct StandardSecurityHandler {
    algorithm: EncryptionAlgorithm,
    file_key: Vec<u8>,
    owner_hash: Vec<u8>,
    user_hash: Vec<u8>,
    permissions: i32,
    dictionary_ref: ObjectRef,
}

impl StandardSecurityHandler {
    /// Derive keys for `config`. Fails before anything is written when the
    /// algorithm is newer than `version`.
    pub fn new(
        config: &EncryptionConfig,
        file_id: &[u8],
        dictionary_ref: ObjectRef,
        version: PdfVersion,
    ) -> Result<Self> {
        let algorithm = config.algorithm;
        version.require(algorithm.min_version(), &format!("{:?} encryption", algorithm))?;

        let (_, revision) = algorithm.version_revision();
        let key_length = algorithm.key_length();
        let permissions = config.permissions.to_bits();
        let owner_hash = algorithms::compute_owner_password_hash(
            config.owner_password.as_bytes(),
            config.user_password.as_bytes(),
            revision,
            key_length,
        );
        let file_key = algorithms::compute_encryption_key(
            config.user_password.as_bytes(),
            &owner_hash,
            permissions,
            file_id,
            revision,
            key_length,
            true,
        );
        let user_hash = algorithms::compute_user_password_hash(&file_key, file_id, revision);
        log::debug!("standard security handler: {:?}, R{}", algorithm, revision);

        Ok(Self {
            algorithm,
            file_key,
            owner_hash,
            user_hash,
            permissions,
            dictionary_ref,
        })
    }

    /// The file encryption key.
    pub fn file_key(&self) -> &[u8] {
        &self.file_key
    }

    /// Key for one object (Algorithm 1).
    pub fn object_key(&self, obj: ObjectRef) -> Vec<u8> {
        let mut hasher = Md5::new();
        hasher.update(&self.file_key);
        hasher.update(&obj.id.to_le_bytes()[..3]);
        hasher.update(obj.gen.to_le_bytes());
        if self.algorithm.is_aes() {
            hasher.update(b"sAlT");
        }
        let hash = hasher.finalize();
        let key_length = (self.file_key.len() + 5).min(16);
        hash[..key_length].to_vec()
    }
}

impl SecurityHandler for StandardSecurityHandler {
    fn for_object(&self, obj: ObjectRef) -> Option<Rc<dyn ObjectEncryptor>> {
        if obj == self.dictionary_ref {
            return None;
        }
        let key = self.object_key(obj);
        Some(if self.algorithm.is_aes() {
            Rc::new(AesObjectEncryptor { key })
        } else {
            Rc::new(Rc4ObjectEncryptor { key })
        })
    }

    fn dictionary_ref(&self) -> ObjectRef {
        self.dictionary_ref
    }

    fn write_dictionary(&self, writer: &mut FragmentWriter) -> Result<()> {
        let (v, r) = self.algorithm.version_revision();
        writer.start_object(self.dictionary_ref)?;
        writer.start_hash()?;
        writer.write_name("Filter")?;
        writer.write_name("Standard")?;
        writer.write_name("V")?;
        writer.write_int(v as i64)?;
        writer.write_name("R")?;
        writer.write_int(r as i64)?;
        writer.write_name("Length")?;
        writer.write_int(self.algorithm.key_length() as i64 * 8)?;
        if self.algorithm.is_aes() {
            writer.write_name("CF")?;
            writer.start_hash()?;
            writer.write_name("StdCF")?;
            writer.start_hash()?;
            writer.write_name("CFM")?;
            writer.write_name("AESV2")?;
            writer.write_name("AuthEvent")?;
            writer.write_name("DocOpen")?;
            writer.write_name("Length")?;
            writer.write_int(16)?;
            writer.end_hash()?;
            writer.end_hash()?;
            writer.write_name("StmF")?;
            writer.write_name("StdCF")?;
            writer.write_name("StrF")?;
            writer.write_name("StdCF")?;
        }
        writer.write_name("O")?;
        writer.write_bytes(&self.owner_hash)?;
        writer.write_name("U")?;
        writer.write_bytes(&self.user_hash)?;
        writer.write_name("P")?;
        writer.write_int(self.permissions as i64)?;
        writer.end_hash()?;
        writer.end_object()
    }
}

struct Rc4ObjectEncryptor {
    key: Vec<u8>,
}

impl ObjectEncryptor for Rc4ObjectEncryptor {
    fn is_block(&self) -> bool {
        false
    }

    fn block_encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(rc4_crypt(&self.key, data))
    }

    fn fast_encrypt_in_place(&self, data: &mut [u8]) -> Result<()> {
        Rc4Cipher::new(&self.key).apply_keystream(data);
        Ok(())
    }

    fn wrap(&self, inner: Box<dyn StreamLayer>) -> Result<Box<dyn StreamLayer>> {
        Ok(Box::new(Rc4Layer::new(&self.key, inner)))
    }
}

struct AesObjectEncryptor {
    key: Vec<u8>,
}

impl AesObjectEncryptor {
    fn generate_iv() -> [u8; 16] {
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&algorithms::random_bytes(16));
        iv
    }
}

impl ObjectEncryptor for AesObjectEncryptor {
    fn is_block(&self) -> bool {
        true
    }

    fn block_encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let iv = Self::generate_iv();
        let mut out = iv.to_vec();
        out.extend(aes128_encrypt(&self.key, &iv, data)?);
        Ok(out)
    }

    fn fast_encrypt_in_place(&self, _data: &mut [u8]) -> Result<()> {
        Err(Error::Encryption(
            "AES output is longer than its input and cannot be produced in place".to_string(),
        ))
    }

    fn wrap(&self, inner: Box<dyn StreamLayer>) -> Result<Box<dyn StreamLayer>> {
        Ok(Box::new(AesCbcLayer::new(&self.key, Self::generate_iv(), inner)?))
    }
}
