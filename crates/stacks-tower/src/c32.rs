//! c32check address encoding for Stacks principals.
//!
//! Address = `S` + c32 version char + c32(hash160 ‖ checksum), where checksum is the first
//! 4 bytes of sha256(sha256(version ‖ hash160)).

use sha2::{Digest, Sha256};

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Encode bytes as c32, preserving leading zero bytes as `0` characters.
pub fn c32_encode(data: &[u8]) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(data.len() * 8 / 5 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits = 0u32;
    for &byte in data.iter().rev() {
        carry |= u16::from(byte) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
    }
    while out.last() == Some(&b'0') {
        out.pop();
    }
    for &byte in data {
        if byte != 0 {
            break;
        }
        out.push(b'0');
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Stacks address for a (version, hash160) pair. Returns `None` for versions >= 32.
pub fn c32_address(version: u8, hash160: &[u8; 20]) -> Option<String> {
    let version_char = *C32_ALPHABET.get(usize::from(version))?;
    let first = Sha256::new()
        .chain_update([version])
        .chain_update(hash160)
        .finalize();
    let checksum = Sha256::digest(first);
    let mut payload = Vec::with_capacity(24);
    payload.extend_from_slice(hash160);
    payload.extend_from_slice(&checksum[..4]);
    Some(format!("S{}{}", char::from(version_char), c32_encode(&payload)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(s: &str) -> [u8; 20] {
        hex::decode(s).unwrap().try_into().unwrap()
    }

    #[test]
    fn boot_address() {
        assert_eq!(
            c32_address(22, &[0u8; 20]).unwrap(),
            "SP000000000000000000002Q6VF78"
        );
    }

    #[test]
    fn mainnet_and_testnet_versions() {
        let h = hash("982f3ec112a5f5928a5c96a914bd733793b896a5");
        assert_eq!(
            c32_address(22, &h).unwrap(),
            "SP2C2YFP12AJZB4MABJBAJ55XECVS7E4PMMZ89YZR"
        );
        assert_eq!(
            c32_address(26, &h).unwrap(),
            "ST2C2YFP12AJZB4MABJBAJ55XECVS7E4PMN0KW98F"
        );
    }

    #[test]
    fn version_out_of_range() {
        assert!(c32_address(32, &[0u8; 20]).is_none());
    }

    #[test]
    fn leading_zero_bytes_kept() {
        assert_eq!(c32_encode(&[0, 0, 1]), "001");
        assert_eq!(c32_encode(&[]), "");
    }
}
