//! HMAC message authentication codes.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384, Sha512};
use sha3::{Sha3_256, Sha3_384, Sha3_512};
use zeroize::Zeroizing;

use super::MacAlgorithm;
use crate::CryptoError;

macro_rules! hmac_algorithm {
    ($(#[$doc:meta])* $name:ident, $hash:ty, $label:literal) => {
        $(#[$doc])*
        pub struct $name;

        impl MacAlgorithm for $name {
            fn name(&self) -> &'static str {
                $label
            }

            fn output_len(&self) -> usize {
                <$hash as Digest>::output_size()
            }

            fn finalize(&self, key: &[u8], message: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
                // HMAC pads or hashes any key length, so this never rejects.
                let mut mac = <Hmac<$hash> as Mac>::new_from_slice(key)
                    .map_err(|_| CryptoError::InvalidKeyLength { expected: 0, actual: key.len() })?;
                mac.update(message);
                Ok(Zeroizing::new(mac.finalize().into_bytes().to_vec()))
            }
        }
    };
}

hmac_algorithm!(
    /// HMAC-SHA-256.
    HmacSha256, Sha256, "HMAC-SHA-256"
);
hmac_algorithm!(
    /// HMAC-SHA-384.
    HmacSha384, Sha384, "HMAC-SHA-384"
);
hmac_algorithm!(
    /// HMAC-SHA-512.
    HmacSha512, Sha512, "HMAC-SHA-512"
);
hmac_algorithm!(
    /// HMAC-SHA3-256.
    HmacSha3_256, Sha3_256, "HMAC-SHA3-256"
);
hmac_algorithm!(
    /// HMAC-SHA3-384.
    HmacSha3_384, Sha3_384, "HMAC-SHA3-384"
);
hmac_algorithm!(
    /// HMAC-SHA3-512.
    HmacSha3_512, Sha3_512, "HMAC-SHA3-512"
);
