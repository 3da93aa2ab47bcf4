//! Address Validator
//!
//! Shape predicates that keep wallet addresses and transaction hashes apart.
//! A wallet is `0x` + 40 hex chars (42 total), a tx hash is `0x` + 64 hex
//! chars (66 total), so the two can never both match the same string.

/// Length of a `0x`-prefixed EVM address
pub const ADDRESS_LEN: usize = 42;

/// Length of a `0x`-prefixed transaction hash
pub const TX_HASH_LEN: usize = 66;

#[inline]
fn is_prefixed_hex(s: &str, len: usize) -> bool {
    s.len() == len
        && s.starts_with("0x")
        && hex::decode(&s[2..]).is_ok()
}

/// True iff `s` is a 42-char `0x`-prefixed hex string
#[inline]
pub fn is_address(s: &str) -> bool {
    is_prefixed_hex(s, ADDRESS_LEN)
}

/// True iff `s` is a 66-char `0x`-prefixed hex string
#[inline]
pub fn is_tx_hash(s: &str) -> bool {
    is_prefixed_hex(s, TX_HASH_LEN)
}

/// Lowercase an address for comparisons and cache keys
#[inline]
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Case-insensitive address equality
#[inline]
pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
    const HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    #[test]
    fn test_is_address() {
        assert!(is_address(WALLET));
        assert!(!is_address(HASH));
        assert!(!is_address("0x1234"));
        assert!(!is_address("dAC17F958D2ee523a2206206994597C13D831ec7aa"));
        // right length, bad hex
        assert!(!is_address("0xzAC17F958D2ee523a2206206994597C13D831ec7"));
        // upper-case prefix
        assert!(!is_address("0XdAC17F958D2ee523a2206206994597C13D831ec7"));
        assert!(!is_tx_hash(&HASH.replacen("0x", "0X", 1)));
    }

    #[test]
    fn test_is_tx_hash() {
        assert!(is_tx_hash(HASH));
        assert!(!is_tx_hash(WALLET));
        assert!(!is_tx_hash(""));
    }

    #[test]
    fn test_shapes_are_exclusive() {
        for s in [WALLET, HASH, "0x", "0xabc"] {
            assert!(!(is_address(s) && is_tx_hash(s)), "{} matched both", s);
        }
    }

    #[test]
    fn test_same_address() {
        assert!(same_address(WALLET, &WALLET.to_uppercase().replace("0X", "0x")));
        assert_eq!(normalize_address(" 0xABC "), "0xabc");
    }
}
