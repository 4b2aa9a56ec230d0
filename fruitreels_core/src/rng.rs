use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

// Provably fair byte stream:
// server_seed (secret) + client_seed + nonce -> HMAC-SHA256 -> first block,
// each later block is SHA-256 of the previous one. Words are big-endian u32.

pub type HmacSha256 = Hmac<Sha256>;

pub fn derive_hash_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

#[derive(Debug, Clone)]
pub struct ProvablyFairRng {
    pub server_seed: String, // secret
    pub client_seed: String,
    pub nonce: u64,
    block: [u8; 32],
    pos: usize,
}

impl ProvablyFairRng {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        let server_seed = server_seed.into();
        let client_seed = client_seed.into();
        let block = hmac_block(&server_seed, &client_seed, nonce);
        Self {
            server_seed,
            client_seed,
            nonce,
            block,
            pos: 0,
        }
    }

    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }

    fn next_word(&mut self) -> u32 {
        if self.pos + 4 > self.block.len() {
            self.block = Sha256::digest(self.block).into();
            self.pos = 0;
        }
        let chunk = &self.block[self.pos..self.pos + 4];
        self.pos += 4;
        u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
    }
}

fn hmac_block(server_seed: &str, client_seed: &str, nonce: u64) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(server_seed.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{}:{}", client_seed, nonce).as_bytes());
    mac.finalize().into_bytes().into()
}

impl RngCore for ProvablyFairRng {
    fn next_u32(&mut self) -> u32 {
        self.next_word()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = self.next_word() as u64;
        let lo = self.next_word() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.next_word().to_be_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = ProvablyFairRng::new("server", "client", 1);
        let mut rng2 = ProvablyFairRng::new("server", "client", 1);
        assert_eq!(rng1.server_seed_hash_hex(), rng2.server_seed_hash_hex());
        let a: Vec<u32> = (0..40).map(|_| rng1.next_u32()).collect();
        let b: Vec<u32> = (0..40).map(|_| rng2.next_u32()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nonce_changes_stream() {
        let mut rng1 = ProvablyFairRng::new("server", "client", 1);
        let mut rng2 = ProvablyFairRng::new("server", "client", 2);
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_stream_extends_past_first_block() {
        let mut rng = ProvablyFairRng::new("server", "client", 7);
        let first: Vec<u32> = (0..8).map(|_| rng.next_u32()).collect();
        let second: Vec<u32> = (0..8).map(|_| rng.next_u32()).collect();
        assert_ne!(first, second);

        let mut bytes = [0u8; 64];
        ProvablyFairRng::new("server", "client", 7).fill_bytes(&mut bytes);
        assert_eq!(&bytes[..4], &first[0].to_be_bytes());
        assert_eq!(&bytes[32..36], &second[0].to_be_bytes());
    }

    #[test]
    fn test_seed_hash_is_sha256_hex() {
        let rng = ProvablyFairRng::new("abc", "client", 0);
        assert_eq!(
            rng.server_seed_hash_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
