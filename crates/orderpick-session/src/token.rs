//! Deterministic participant codes.
//!
//! A participant's code is recomputed from their identity on demand; no
//! secret is stored anywhere before first use. The derivation is:
//!
//! 1. hash the identity to a seed with a polynomial rolling hash,
//! 2. seed a Park–Miller (Lehmer) generator with it,
//! 3. draw four groups of three hex digits, each followed by a check digit
//!    that makes the group sum to a fixed target modulo 16.
//!
//! The targets `11, 0, 11, 10` are constants, so any token can be checked
//! for the format fingerprint without knowing the identity.

use orderpick_protocol::AuthToken;

/// Modulus of both the seed hash and the generator, `2^31 - 1`.
pub const MODULUS: i64 = 2_147_483_647;

/// Lehmer multiplier.
const MULTIPLIER: i64 = 16_807;

/// Per-group checksum targets, in order.
pub const GROUP_CHECKSUMS: [u8; 4] = [11, 0, 11, 10];

/// Suffix appended to an identity to derive its completion code.
pub const COMPLETION_SUFFIX: &str = "qq";

/// Hashes an identity to a seed in `[0, MODULUS)`.
///
/// `seed = (seed * 31 + unit) mod MODULUS` over the identity's UTF-16 code
/// units, left to right, starting from zero.
pub fn hash_to_seed(identity: &str) -> i64 {
    identity
        .encode_utf16()
        .fold(0i64, |seed, unit| (seed * 31 + i64::from(unit)) % MODULUS)
}

/// An endless, restartable stream of floats in `[0, 1)`.
///
/// Two streams built from the same seed yield identical sequences.
#[derive(Debug, Clone)]
pub struct SeededStream {
    state: i64,
}

impl SeededStream {
    /// Seeds the generator. Non-positive seeds (after reduction modulo
    /// [`MODULUS`]) are shifted up by `MODULUS - 1`.
    pub fn new(seed: i64) -> Self {
        let mut state = seed % MODULUS;
        if state <= 0 {
            state += MODULUS - 1;
        }
        Self { state }
    }

    /// Next value of the stream.
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state * MULTIPLIER % MODULUS;
        (self.state - 1) as f64 / (MODULUS - 1) as f64
    }

    /// Next hex digit, `floor(next * 16)`.
    pub fn next_digit(&mut self) -> u8 {
        (self.next_f64() * 16.0).floor() as u8
    }
}

impl Iterator for SeededStream {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_f64())
    }
}

/// Draws one self-checking group of four hex digits.
///
/// The middle draw is doubled, folding values above 15 back by 15 (the
/// base-16 counterpart of Luhn doubling), and is emitted in that folded
/// form. The fourth digit is `(16 - sum % 16 + target) % 16`, so the four
/// emitted digits always sum to `target` modulo 16.
pub fn generate_group(rng: &mut SeededStream, target: u8) -> [u8; 4] {
    let mut digits = [rng.next_digit(), rng.next_digit(), rng.next_digit(), 0];
    digits[1] *= 2;
    if digits[1] > 15 {
        digits[1] -= 15;
    }
    let sum: u32 = digits[..3].iter().map(|d| u32::from(*d)).sum();
    digits[3] = ((16 - sum % 16 + u32::from(target % 16)) % 16) as u8;
    digits
}

/// Checks that a group's digits sum to `target` modulo 16.
pub fn verify_group(group: &[u8; 4], target: u8) -> bool {
    let sum: u32 = group.iter().map(|d| u32::from(*d)).sum();
    sum % 16 == u32::from(target % 16)
}

/// Derives the participant code for an identity.
pub fn generate_token(identity: &str) -> AuthToken {
    let mut rng = SeededStream::new(hash_to_seed(identity));
    AuthToken::from_digits(GROUP_CHECKSUMS.map(|target| generate_group(&mut rng, target)))
}

/// Derives the completion code shown at the end of a session.
///
/// Uses a separate namespace (`identity + "qq"`), so it never equals the
/// participant's login code.
pub fn complete_id_for(identity: &str) -> AuthToken {
    generate_token(&format!("{identity}{COMPLETION_SUFFIX}"))
}

/// Whether every group of `token` carries its fixed checksum.
///
/// A `true` result means the string was produced by this scheme (or is a
/// 1-in-65536 accident); it says nothing about *whose* token it is.
pub fn is_well_formed(token: &AuthToken) -> bool {
    token
        .groups()
        .iter()
        .zip(GROUP_CHECKSUMS)
        .all(|(group, target)| verify_group(group, target))
}
