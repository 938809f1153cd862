//! `{id}` substitution in prize metadata URIs.

use soroban_sdk::{Env, String};

use crate::error::LotteryError;

/// Longest metadata URI template accepted.
pub const MAX_URI_LEN: u32 = 256;

const PLACEHOLDER: &[u8] = b"{id}";

// Each 4-byte placeholder expands to at most 10 digits.
const MAX_EXPANDED_LEN: usize = MAX_URI_LEN as usize * 3;

/// Replace every `{id}` in `template` with the decimal prize id.
pub fn expand(env: &Env, template: &String, prize_id: u32) -> Result<String, LotteryError> {
    let len = template.len() as usize;
    if len > MAX_URI_LEN as usize {
        return Err(LotteryError::InvalidParameters);
    }

    let mut src = [0u8; MAX_URI_LEN as usize];
    template.copy_into_slice(&mut src[..len]);

    let mut digits = [0u8; 10];
    let id = decimal(prize_id, &mut digits);

    let mut out = [0u8; MAX_EXPANDED_LEN];
    let mut n = 0;
    let mut i = 0;
    while i < len {
        if src[i..len].starts_with(PLACEHOLDER) {
            out[n..n + id.len()].copy_from_slice(id);
            n += id.len();
            i += PLACEHOLDER.len();
        } else {
            out[n] = src[i];
            n += 1;
            i += 1;
        }
    }

    Ok(String::from_bytes(env, &out[..n]))
}

fn decimal(mut value: u32, buf: &mut [u8; 10]) -> &[u8] {
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    &buf[pos..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_placeholder() {
        let env = Env::default();
        let template = String::from_str(&env, "ipfs://prizes/{id}.json");
        assert_eq!(
            expand(&env, &template, 42).unwrap(),
            String::from_str(&env, "ipfs://prizes/42.json")
        );
    }

    #[test]
    fn test_expand_without_placeholder() {
        let env = Env::default();
        let template = String::from_str(&env, "https://example.org/prize");
        assert_eq!(expand(&env, &template, 7).unwrap(), template);
    }

    #[test]
    fn test_expand_repeated_and_zero() {
        let env = Env::default();
        let template = String::from_str(&env, "{id}/{id}");
        assert_eq!(
            expand(&env, &template, 0).unwrap(),
            String::from_str(&env, "0/0")
        );
        assert_eq!(
            expand(&env, &template, u32::MAX).unwrap(),
            String::from_str(&env, "4294967295/4294967295")
        );
    }

    #[test]
    fn test_expand_rejects_oversized_template() {
        let env = Env::default();
        let long = [b'a'; MAX_URI_LEN as usize + 1];
        let template = String::from_bytes(&env, &long);
        assert_eq!(
            expand(&env, &template, 1),
            Err(LotteryError::InvalidParameters)
        );
    }
}
