//! Standard security handler key derivation.
//!
//! PDF Spec: Section 7.6.3 - Standard Security Handler, revisions 2 to 4.

use md5::{Digest, Md5};

use super::rc4::rc4_crypt;

/// Padding string used to extend passwords to 32 bytes.
///
/// PDF Spec: Algorithm 2, step 1
pub(crate) const PADDING: &[u8; 32] = b"\x28\xBF\x4E\x5E\x4E\x75\x8A\x41\
                              \x64\x00\x4E\x56\xFF\xFA\x01\x08\
                              \x2E\x2E\x00\xB6\xD0\x68\x3E\x80\
                              \x2F\x0C\xA9\xFE\x64\x53\x69\x7A";

/// Pad or truncate a password to 32 bytes using the standard padding.
pub fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// Compute the file encryption key (Algorithm 2).
pub fn compute_encryption_key(
    password: &[u8],
    owner_hash: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: u32,
    key_length: usize,
    encrypt_metadata: bool,
) -> Vec<u8> {
    let key_length = key_length.min(16);
    let mut hasher = Md5::new();
    hasher.update(pad_password(password));
    hasher.update(owner_hash);
    hasher.update(permissions.to_le_bytes());
    hasher.update(file_id);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut hash = hasher.finalize().to_vec();

    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash[..key_length]).to_vec();
        }
    }

    hash.truncate(key_length);
    hash
}

/// Compute the `/O` value (Algorithm 3).
///
/// An empty owner password falls back to the user password.
pub fn compute_owner_password_hash(
    owner_password: &[u8],
    user_password: &[u8],
    revision: u32,
    key_length: usize,
) -> Vec<u8> {
    let password = if owner_password.is_empty() {
        user_password
    } else {
        owner_password
    };
    let key_length = key_length.min(16);

    let mut hash = Md5::digest(pad_password(password)).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash[..key_length]).to_vec();
        }
    }
    let rc4_key = &hash[..key_length];

    let mut result = rc4_crypt(rc4_key, &pad_password(user_password));
    if revision >= 3 {
        for i in 1..=19u8 {
            let round_key: Vec<u8> = rc4_key.iter().map(|b| b ^ i).collect();
            result = rc4_crypt(&round_key, &result);
        }
    }
    result
}

/// Compute the `/U` value (Algorithm 4 for R2, Algorithm 5 for R3+).
pub fn compute_user_password_hash(encryption_key: &[u8], file_id: &[u8], revision: u32) -> Vec<u8> {
    if revision < 3 {
        return rc4_crypt(encryption_key, PADDING);
    }

    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut hash = hasher.finalize().to_vec();

    for i in 0..20u8 {
        let round_key: Vec<u8> = encryption_key.iter().map(|b| b ^ i).collect();
        hash = rc4_crypt(&round_key, &hash);
    }

    // Remaining 16 bytes are arbitrary
    hash.extend_from_slice(&[0u8; 16]);
    hash
}

/// Check a user password against a `/U` value, returning the file key.
pub fn authenticate_user_password(
    password: &[u8],
    user_hash: &[u8],
    owner_hash: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: u32,
    key_length: usize,
) -> Option<Vec<u8>> {
    let key = compute_encryption_key(
        password,
        owner_hash,
        permissions,
        file_id,
        revision,
        key_length,
        true,
    );
    let expected = compute_user_password_hash(&key, file_id, revision);
    let compared = if revision >= 3 { 16 } else { 32 };
    if user_hash.len() < compared || expected.len() < compared {
        return None;
    }
    let diff = user_hash[..compared]
        .iter()
        .zip(&expected[..compared])
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    (diff == 0).then_some(key)
}

/// Unpredictable bytes from UUID v4 and timestamp mixing.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut result = Vec::with_capacity(len);
    while result.len() < len {
        let mut hasher = Md5::new();
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        hasher.update(now.as_nanos().to_le_bytes());
        let hash = hasher.finalize();
        let remaining = len - result.len();
        result.extend_from_slice(&hash[..remaining.min(16)]);
    }
    result
}
