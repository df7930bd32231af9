//! Systematic BCH(1023, 983) encoder/decoder, shortened to one NAND
//! sub-block of 122 data bytes + 5 parity bytes and correcting up to
//! 4 bit errors.
//!
//! Decoding is the classic pipeline: syndrome computation, error
//! locator via Berlekamp-Massey, root finding via Chien search, then
//! in-place bit correction.

use crate::gf::{self, GF_ORDER};
use crate::BchError;

/// Data bytes per codeword.
pub const DATA_LEN: usize = 122;

/// Parity bytes per codeword.
pub const PARITY_LEN: usize = 5;

/// Correctable bit errors per codeword.
pub const MAX_ERRORS: usize = 4;

/// Live bits of the shortened codeword (976 data + 40 parity).
pub const CODEWORD_BITS: usize = 8 * (DATA_LEN + PARITY_LEN);

const SYNDROME_COUNT: usize = 2 * MAX_ERRORS;
const DATA_BITS: usize = 8 * DATA_LEN;
const PARITY_BITS: usize = 8 * PARITY_LEN;
const PARITY_MASK: u64 = (1 << PARITY_BITS) - 1;

/// Degree-40 generator polynomial: the LCM of the minimal polynomials
/// of α^1..α^8, i.e. the product of (x + α^j) over the union of the
/// cyclotomic cosets of 1, 3, 5 and 7. Bit i holds the coefficient of
/// x^i; all coefficients land in GF(2).
const fn build_generator() -> u64 {
    let mut is_root = [false; GF_ORDER];
    let mut e = 1usize;
    while e <= SYNDROME_COUNT {
        let mut r = e;
        while !is_root[r] {
            is_root[r] = true;
            r = (r * 2) % GF_ORDER;
        }
        e += 1;
    }

    // Multiply the (x + α^r) factors together with GF(2^10) coefficients.
    let mut g = [0u16; PARITY_BITS + 1];
    g[0] = 1;
    let mut deg = 0usize;
    let mut r = 0usize;
    while r < GF_ORDER {
        if is_root[r] {
            let root = gf::alpha_pow(r);
            let mut i = deg + 1;
            while i >= 1 {
                g[i] = g[i - 1] ^ gf::mul(g[i], root);
                i -= 1;
            }
            g[0] = gf::mul(g[0], root);
            deg += 1;
        }
        r += 1;
    }
    assert!(deg == PARITY_BITS);

    let mut packed: u64 = 0;
    let mut i = 0usize;
    while i <= PARITY_BITS {
        assert!(g[i] <= 1);
        packed |= (g[i] as u64) << i;
        i += 1;
    }
    packed
}

const GENERATOR: u64 = build_generator();
const GENERATOR_LOW: u64 = GENERATOR & PARITY_MASK;

/// Compute the 40-bit systematic parity for one 122-byte data block.
///
/// The data is treated as a polynomial with `data[0]` bit 7 as the
/// highest coefficient; the parity is the remainder of data·x^40
/// modulo the generator, produced by an LFSR-form long division.
pub fn encode(data: &[u8; DATA_LEN]) -> [u8; PARITY_LEN] {
    let mut rem: u64 = 0;
    for &byte in data.iter() {
        let mut bit = 8usize;
        while bit > 0 {
            bit -= 1;
            let incoming = ((byte >> bit) & 1) as u64;
            let feedback = incoming ^ ((rem >> (PARITY_BITS - 1)) & 1);
            rem = (rem << 1) & PARITY_MASK;
            if feedback != 0 {
                rem ^= GENERATOR_LOW;
            }
        }
    }

    let mut parity = [0u8; PARITY_LEN];
    let mut i = 0usize;
    while i < PARITY_LEN {
        parity[i] = (rem >> (8 * (PARITY_LEN - 1 - i))) as u8;
        i += 1;
    }
    parity
}

/// Decode one codeword in place, correcting up to [`MAX_ERRORS`] bit
/// errors in `data`. Returns the number of corrected bit errors
/// (corrections that land in the parity region are counted but need no
/// caller-visible fixup).
pub fn decode(data: &mut [u8; DATA_LEN], parity: &[u8; PARITY_LEN]) -> Result<usize, BchError> {
    let syndromes = compute_syndromes(data, parity);
    if syndromes.iter().all(|&s| s == 0) {
        return Ok(0);
    }

    let (lambda, degree) = berlekamp_massey(&syndromes);
    if degree > MAX_ERRORS {
        return Err(BchError::TooManyErrors);
    }
    if degree == 0 {
        // Nonzero syndromes with an empty locator cannot be trusted.
        return Err(BchError::LocatorError);
    }

    let positions = chien_search(&lambda, degree)?;

    for &p in positions.iter().take(degree) {
        // p is the polynomial degree of the errored bit; map it back to
        // a bit offset from the start of the codeword.
        let idx = CODEWORD_BITS - 1 - p;
        if idx < DATA_BITS {
            data[idx / 8] ^= 0x80 >> (idx % 8);
        }
    }
    Ok(degree)
}

/// Evaluate the received word at α^1..α^8 (Horner form over the bits,
/// highest coefficient first).
fn compute_syndromes(data: &[u8; DATA_LEN], parity: &[u8; PARITY_LEN]) -> [u16; SYNDROME_COUNT] {
    let mut syndromes = [0u16; SYNDROME_COUNT];
    for (j, s) in syndromes.iter_mut().enumerate() {
        let a = gf::alpha_pow(j + 1);
        let mut acc = 0u16;
        for &byte in data.iter().chain(parity.iter()) {
            let mut bit = 8usize;
            while bit > 0 {
                bit -= 1;
                acc = gf::mul(acc, a) ^ ((byte >> bit) & 1) as u16;
            }
        }
        *s = acc;
    }
    syndromes
}

/// Berlekamp-Massey over the syndrome sequence. Returns the error
/// locator Λ(x) and its LFSR length L (the claimed error count).
fn berlekamp_massey(synd: &[u16; SYNDROME_COUNT]) -> ([u16; SYNDROME_COUNT + 1], usize) {
    // Λ(x), the running locator, and B(x), the locator from the last
    // length change; both start at 1.
    let mut lambda = [0u16; SYNDROME_COUNT + 1];
    lambda[0] = 1;
    let mut b = [0u16; SYNDROME_COUNT + 1];
    b[0] = 1;

    // l: current LFSR length. m: steps since l changed.
    // d_prev: discrepancy at the last length change.
    let mut l = 0usize;
    let mut m = 1usize;
    let mut d_prev = 1u16;

    for n in 0..SYNDROME_COUNT {
        // Discrepancy between the next syndrome and the LFSR prediction.
        let mut d = synd[n];
        for i in 1..=l.min(n) {
            if lambda[i] != 0 {
                d ^= gf::mul(lambda[i], synd[n - i]);
            }
        }

        if d == 0 {
            m += 1;
        } else {
            let prev = lambda;
            let scale = gf::div(d, d_prev);
            // Λ(x) ← Λ(x) + (d/d_prev)·x^m·B(x)
            let mut i = 0usize;
            while i + m <= SYNDROME_COUNT {
                if b[i] != 0 {
                    lambda[i + m] ^= gf::mul(scale, b[i]);
                }
                i += 1;
            }
            if 2 * l <= n {
                l = n + 1 - l;
                d_prev = d;
                b = prev;
                m = 1;
            } else {
                m += 1;
            }
        }
    }

    (lambda, l)
}

/// Exhaustively evaluate Λ at every nonzero field element. A root at
/// α^-p marks an error at polynomial degree p. The root count must
/// match the locator degree and every root must name a live bit of the
/// shortened codeword; anything else is an internal inconsistency and
/// the word is uncorrectable.
fn chien_search(
    lambda: &[u16; SYNDROME_COUNT + 1],
    degree: usize,
) -> Result<[usize; MAX_ERRORS], BchError> {
    let mut positions = [0usize; MAX_ERRORS];
    let mut found = 0usize;

    for p in 0..GF_ORDER {
        let x = gf::alpha_pow(GF_ORDER - p);
        let mut v = 0u16;
        let mut i = degree + 1;
        while i > 0 {
            i -= 1;
            v = gf::mul(v, x) ^ lambda[i];
        }
        if v == 0 {
            if p >= CODEWORD_BITS || found == degree {
                return Err(BchError::LocatorError);
            }
            positions[found] = p;
            found += 1;
        }
    }

    if found != degree {
        return Err(BchError::LocatorError);
    }
    Ok(positions)
}
