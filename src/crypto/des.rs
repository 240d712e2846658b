//! Single-block DES in electronic-codebook mode (FIPS 46-3).
//!
//! No mode chaining, no IV — this is a fixed compatibility requirement with
//! the GK-2A broadcast's on-wire format (spec.md §4.3). Block alignment is
//! the S_PDU layer's responsibility, not this module's.

const IP: [u8; 64] = [
    58, 50, 42, 34, 26, 18, 10, 2, 60, 52, 44, 36, 28, 20, 12, 4, 62, 54, 46, 38, 30, 22, 14, 6,
    64, 56, 48, 40, 32, 24, 16, 8, 57, 49, 41, 33, 25, 17, 9, 1, 59, 51, 43, 35, 27, 19, 11, 3, 61,
    53, 45, 37, 29, 21, 13, 5, 63, 55, 47, 39, 31, 23, 15, 7,
];

const FP: [u8; 64] = [
    40, 8, 48, 16, 56, 24, 64, 32, 39, 7, 47, 15, 55, 23, 63, 31, 38, 6, 46, 14, 54, 22, 62, 30,
    37, 5, 45, 13, 53, 21, 61, 29, 36, 4, 44, 12, 52, 20, 60, 28, 35, 3, 43, 11, 51, 19, 59, 27,
    34, 2, 42, 10, 50, 18, 58, 26, 33, 1, 41, 9, 49, 17, 57, 25,
];

const E: [u8; 48] = [
    32, 1, 2, 3, 4, 5, 4, 5, 6, 7, 8, 9, 8, 9, 10, 11, 12, 13, 12, 13, 14, 15, 16, 17, 16, 17, 18,
    19, 20, 21, 20, 21, 22, 23, 24, 25, 24, 25, 26, 27, 28, 29, 28, 29, 30, 31, 32, 1,
];

const P: [u8; 32] = [
    16, 7, 20, 21, 29, 12, 28, 17, 1, 15, 23, 26, 5, 18, 31, 10, 2, 8, 24, 14, 32, 27, 3, 9, 19,
    13, 30, 6, 22, 11, 4, 25,
];

const PC1: [u8; 56] = [
    57, 49, 41, 33, 25, 17, 9, 1, 58, 50, 42, 34, 26, 18, 10, 2, 59, 51, 43, 35, 27, 19, 11, 3, 60,
    52, 44, 36, 63, 55, 47, 39, 31, 23, 15, 7, 62, 54, 46, 38, 30, 22, 14, 6, 61, 53, 45, 37, 29,
    21, 13, 5, 28, 20, 12, 4,
];

const PC2: [u8; 48] = [
    14, 17, 11, 24, 1, 5, 3, 28, 15, 6, 21, 10, 23, 19, 12, 4, 26, 8, 16, 7, 27, 20, 13, 2, 41, 52,
    31, 37, 47, 55, 30, 40, 51, 45, 33, 48, 44, 49, 39, 56, 34, 53, 46, 42, 50, 36, 29, 32,
];

const SHIFTS: [u8; 16] = [1, 1, 2, 2, 2, 2, 2, 2, 1, 2, 2, 2, 2, 2, 2, 1];

#[rustfmt::skip]
const S: [[u8; 64]; 8] = [
    [
        14, 4, 13, 1, 2, 15, 11, 8, 3, 10, 6, 12, 5, 9, 0, 7,
        0, 15, 7, 4, 14, 2, 13, 1, 10, 6, 12, 11, 9, 5, 3, 8,
        4, 1, 14, 8, 13, 6, 2, 11, 15, 12, 9, 7, 3, 10, 5, 0,
        15, 12, 8, 2, 4, 9, 1, 7, 5, 11, 3, 14, 10, 0, 6, 13,
    ],
    [
        15, 1, 8, 14, 6, 11, 3, 4, 9, 7, 2, 13, 12, 0, 5, 10,
        3, 13, 4, 7, 15, 2, 8, 14, 12, 0, 1, 10, 6, 9, 11, 5,
        0, 14, 7, 11, 10, 4, 13, 1, 5, 8, 12, 6, 9, 3, 2, 15,
        13, 8, 10, 1, 3, 15, 4, 2, 11, 6, 7, 12, 0, 5, 14, 9,
    ],
    [
        10, 0, 9, 14, 6, 3, 15, 5, 1, 13, 12, 7, 11, 4, 2, 8,
        13, 7, 0, 9, 3, 4, 6, 10, 2, 8, 5, 14, 12, 11, 15, 1,
        13, 6, 4, 9, 8, 15, 3, 0, 11, 1, 2, 12, 5, 10, 14, 7,
        1, 10, 13, 0, 6, 9, 8, 7, 4, 15, 14, 3, 11, 5, 2, 12,
    ],
    [
        7, 13, 14, 3, 0, 6, 9, 10, 1, 2, 8, 5, 11, 12, 4, 15,
        13, 8, 11, 5, 6, 15, 0, 3, 4, 7, 2, 12, 1, 10, 14, 9,
        10, 6, 9, 0, 12, 11, 7, 13, 15, 1, 3, 14, 5, 2, 8, 4,
        3, 15, 0, 6, 10, 1, 13, 8, 9, 4, 5, 11, 12, 7, 2, 14,
    ],
    [
        2, 12, 4, 1, 7, 10, 11, 6, 8, 5, 3, 15, 13, 0, 14, 9,
        14, 11, 2, 12, 4, 7, 13, 1, 5, 0, 15, 10, 3, 9, 8, 6,
        4, 2, 1, 11, 10, 13, 7, 8, 15, 9, 12, 5, 6, 3, 0, 14,
        11, 8, 12, 7, 1, 14, 2, 13, 6, 15, 0, 9, 10, 4, 5, 3,
    ],
    [
        12, 1, 10, 15, 9, 2, 6, 8, 0, 13, 3, 4, 14, 7, 5, 11,
        10, 15, 4, 2, 7, 12, 9, 5, 6, 1, 13, 14, 0, 11, 3, 8,
        9, 14, 15, 5, 2, 8, 12, 3, 7, 0, 4, 10, 1, 13, 11, 6,
        4, 3, 2, 12, 9, 5, 15, 10, 11, 14, 1, 7, 6, 0, 8, 13,
    ],
    [
        4, 11, 2, 14, 15, 0, 8, 13, 3, 12, 9, 7, 5, 10, 6, 1,
        13, 0, 11, 7, 4, 9, 1, 10, 14, 3, 5, 12, 2, 15, 8, 6,
        1, 4, 11, 13, 12, 3, 7, 14, 10, 15, 6, 8, 0, 5, 9, 2,
        6, 11, 13, 8, 1, 4, 10, 7, 9, 5, 0, 15, 14, 2, 3, 12,
    ],
    [
        13, 2, 8, 4, 6, 15, 11, 1, 10, 9, 3, 14, 5, 0, 12, 7,
        1, 15, 13, 8, 10, 3, 7, 4, 12, 5, 6, 11, 0, 14, 9, 2,
        7, 11, 4, 1, 9, 12, 14, 2, 0, 6, 10, 13, 15, 3, 5, 8,
        2, 1, 14, 7, 4, 10, 8, 13, 15, 12, 9, 0, 3, 5, 6, 11,
    ],
];

fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &b in bytes {
        for i in 0..8 {
            bits.push((b >> (7 - i)) & 1);
        }
    }
    bits
}

fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b))
        .collect()
}

fn permute(input: &[u8], table: &[u8]) -> Vec<u8> {
    table.iter().map(|&i| input[i as usize - 1]).collect()
}

fn left_shift(half: &[u8], n: u8) -> Vec<u8> {
    let n = n as usize;
    let mut out = half[n..].to_vec();
    out.extend_from_slice(&half[..n]);
    out
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

/// Derives the 16 round subkeys (each 48 bits) from a DES key.
fn subkeys(key: &[u8; 8]) -> [Vec<u8>; 16] {
    let key_bits = bytes_to_bits(key);
    let permuted = permute(&key_bits, &PC1);
    let (mut c, mut d) = permuted.split_at(28);
    let (mut c, mut d) = (c.to_vec(), d.to_vec());

    let mut keys: [Vec<u8>; 16] = Default::default();
    for round in 0..16 {
        c = left_shift(&c, SHIFTS[round]);
        d = left_shift(&d, SHIFTS[round]);
        let combined: Vec<u8> = c.iter().chain(d.iter()).copied().collect();
        keys[round] = permute(&combined, &PC2);
    }
    keys
}

fn feistel(half: &[u8], subkey: &[u8]) -> Vec<u8> {
    let expanded = permute(half, &E);
    let mixed = xor(&expanded, subkey);

    let mut sbox_out = Vec::with_capacity(32);
    for (i, chunk) in mixed.chunks(6).enumerate() {
        let row = (chunk[0] << 1 | chunk[5]) as usize;
        let col = (chunk[1] << 3 | chunk[2] << 2 | chunk[3] << 1 | chunk[4]) as usize;
        let val = S[i][row * 16 + col];
        for b in 0..4 {
            sbox_out.push((val >> (3 - b)) & 1);
        }
    }

    permute(&sbox_out, &P)
}

fn crypt_block(key: &[u8; 8], block: &[u8; 8], decrypt: bool) -> [u8; 8] {
    let mut keys = subkeys(key);
    if decrypt {
        keys.reverse();
    }

    let block_bits = bytes_to_bits(block);
    let permuted = permute(&block_bits, &IP);
    let (mut l, mut r) = permuted.split_at(32);
    let (mut l, mut r) = (l.to_vec(), r.to_vec());

    for round_key in keys.iter() {
        let f_out = feistel(&r, round_key);
        let new_r = xor(&l, &f_out);
        l = r;
        r = new_r;
    }

    let combined: Vec<u8> = r.iter().chain(l.iter()).copied().collect();
    let output_bits = permute(&combined, &FP);
    let output = bits_to_bytes(&output_bits);

    let mut out = [0u8; 8];
    out.copy_from_slice(&output);
    out
}

/// Decrypts a single 8-byte DES block.
pub fn decrypt_block(key: &[u8; 8], block: &[u8; 8]) -> [u8; 8] {
    crypt_block(key, block, true)
}

/// Encrypts a single 8-byte DES block.
///
/// Only used to build test fixtures in this crate — the live S_PDU pipeline
/// is decrypt-only.
pub fn encrypt_block(key: &[u8; 8], block: &[u8; 8]) -> [u8; 8] {
    crypt_block(key, block, false)
}

/// Decrypts `data` in ECB mode. `data.len()` must be a multiple of 8.
pub fn decrypt_ecb(key: &[u8; 8], data: &[u8]) -> Vec<u8> {
    assert_eq!(data.len() % 8, 0, "ECB input must be block-aligned");
    let mut out = Vec::with_capacity(data.len());
    for chunk in data.chunks(8) {
        let mut block = [0u8; 8];
        block.copy_from_slice(chunk);
        out.extend_from_slice(&decrypt_block(key, &block));
    }
    out
}

/// Encrypts `data` in ECB mode. `data.len()` must be a multiple of 8.
pub fn encrypt_ecb(key: &[u8; 8], data: &[u8]) -> Vec<u8> {
    assert_eq!(data.len() % 8, 0, "ECB input must be block-aligned");
    let mut out = Vec::with_capacity(data.len());
    for chunk in data.chunks(8) {
        let mut block = [0u8; 8];
        block.copy_from_slice(chunk);
        out.extend_from_slice(&encrypt_block(key, &block));
    }
    out
}
