//! Rounded integer square root
//!
//! Classic digit-by-digit method, two result bits per iteration, no
//! multiplication or division. Both variants round to the nearest integer:
//! after the loop `op == x - res^2`, and `x > res^2 + res` is exactly the
//! condition for `sqrt(x) >= res + 0.5`.

/// Native-word variant for operands of at most 32 bits
#[inline]
pub fn isqrt_round_u32(x: u32) -> u32 {
    let mut op = x;
    let mut res = 0u32;
    let mut one = 1u32 << 30;

    while one > op {
        one >>= 2;
    }

    while one != 0 {
        if op >= res + one {
            op -= res + one;
            res = (res >> 1) + one;
        } else {
            res >>= 1;
        }
        one >>= 2;
    }

    if op > res {
        res += 1;
    }
    res
}

/// Generic variant for operands wider than 32 bits
pub fn isqrt_round_u64(x: u64) -> u64 {
    let mut op = x;
    let mut res = 0u64;
    let mut one = 1u64 << 62;

    while one > op {
        one >>= 2;
    }

    while one != 0 {
        if op >= res + one {
            op -= res + one;
            res = (res >> 1) + one;
        } else {
            res >>= 1;
        }
        one >>= 2;
    }

    if op > res {
        res += 1;
    }
    res
}
