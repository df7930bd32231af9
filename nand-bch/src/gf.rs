//! GF(2^10) arithmetic backing the BCH codec.
//!
//! The field is generated by the primitive polynomial
//! x^10 + x^3 + 1 (`0x409`). All multiplicative operations go through
//! discrete log/antilog tables built once at compile time, so every
//! runtime user sees the same immutable tables with no init to guard.

/// Primitive polynomial of the field, x^10 + x^3 + 1.
pub const GF_POLY: u16 = 0x409;

/// Number of nonzero field elements (2^10 - 1).
pub const GF_ORDER: usize = 1023;

/// Sentinel discrete log of zero: `log(0) = GF_ORDER`, `alog(GF_ORDER) = 0`.
pub const LOG_ZERO: u16 = GF_ORDER as u16;

pub(crate) struct Tables {
    pub log: [u16; GF_ORDER + 1],
    pub alog: [u16; GF_ORDER + 1],
}

const fn build_tables() -> Tables {
    let mut log = [0u16; GF_ORDER + 1];
    let mut alog = [0u16; GF_ORDER + 1];

    // α = x: repeatedly double and reduce through the primitive
    // polynomial, recording the discrete log of every element reached.
    let mut i = 0usize;
    let mut x: u16 = 1;
    while i < GF_ORDER {
        alog[i] = x;
        log[x as usize] = i as u16;
        x <<= 1;
        if x & 0x400 != 0 {
            x ^= GF_POLY;
        }
        i += 1;
    }

    log[0] = LOG_ZERO;
    alog[GF_ORDER] = 0;

    Tables { log, alog }
}

pub(crate) const TABLES: Tables = build_tables();

/// Addition in GF(2^10) is bitwise XOR.
#[inline(always)]
pub const fn add(a: u16, b: u16) -> u16 {
    a ^ b
}

#[inline(always)]
pub const fn mul(a: u16, b: u16) -> u16 {
    if a == 0 || b == 0 {
        0
    } else {
        let idx = TABLES.log[a as usize] as usize + TABLES.log[b as usize] as usize;
        TABLES.alog[idx % GF_ORDER]
    }
}

#[inline(always)]
pub const fn div(a: u16, b: u16) -> u16 {
    debug_assert!(b != 0);
    if a == 0 {
        0
    } else {
        let la = TABLES.log[a as usize] as usize;
        let lb = TABLES.log[b as usize] as usize;
        TABLES.alog[(la + GF_ORDER - lb) % GF_ORDER]
    }
}

/// Multiplicative inverse. `a` must be nonzero.
#[inline(always)]
pub const fn inv(a: u16) -> u16 {
    debug_assert!(a != 0);
    let la = TABLES.log[a as usize] as usize;
    TABLES.alog[(GF_ORDER - la) % GF_ORDER]
}

/// `a` raised to the power `e`.
#[inline(always)]
pub const fn pow(a: u16, e: usize) -> u16 {
    if a == 0 {
        if e == 0 {
            1
        } else {
            0
        }
    } else {
        let la = TABLES.log[a as usize] as usize;
        TABLES.alog[(la * (e % GF_ORDER)) % GF_ORDER]
    }
}

/// α^e for the field generator α.
#[inline(always)]
pub const fn alpha_pow(e: usize) -> u16 {
    TABLES.alog[e % GF_ORDER]
}
