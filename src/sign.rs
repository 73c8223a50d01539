//! Host key signature verification over the exchange hash.

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use alloc::boxed::Box;

use signature::Verifier;
use sunset_sshwire_derive::*;

use crate::*;
use sshnames::*;
use sshwire::{read_ssh, read_ssh_prefix, BinString};
#[cfg(any(feature = "rsa", feature = "p256"))]
use sshwire::MPInt;

/// Creates a verifier for one host key type
pub type VerifierFactory = fn() -> Box<dyn HostKeyVerifier>;

/// Checks a server's signature over the exchange hash.
pub trait HostKeyVerifier {
    /// `k_s` is the server's public host key blob, `sig` the signature
    /// blob from `SSH_MSG_KEX_DH_GEX_REPLY`, `h` the exchange hash.
    ///
    /// Malformed blobs verify as `false`.
    fn verify(&self, k_s: &[u8], sig: &[u8], h: &[u8]) -> bool;
}

/// Returns the key type name that a host key blob starts with.
pub fn key_type_name(k_s: &[u8]) -> Result<&str> {
    read_ssh_prefix(k_s)
}

#[derive(SSHEncode, SSHDecode)]
struct Ed25519PubKey<'a> {
    name: &'a str,
    key: BinString<'a>,
}

#[derive(SSHEncode, SSHDecode)]
struct SigBlob<'a> {
    name: &'a str,
    sig: BinString<'a>,
}

/// `ssh-ed25519` host keys, [RFC8709](https://tools.ietf.org/html/rfc8709)
#[derive(Debug, Default)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    pub fn boxed() -> Box<dyn HostKeyVerifier> {
        Box::new(Self)
    }

    fn check(k_s: &[u8], sig: &[u8], h: &[u8]) -> Result<()> {
        let k: Ed25519PubKey = read_ssh(k_s)?;
        let s: SigBlob = read_ssh(sig)?;
        if k.name != SSH_NAME_ED25519 || s.name != SSH_NAME_ED25519 {
            debug!("Mismatched {} key with {} signature", k.name, s.name);
            return Err(Error::BadSig);
        }

        let key: &[u8; 32] = k.key.0.try_into().map_err(|_| Error::BadKeyFormat)?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(key)
            .map_err(|_| Error::BadKeyFormat)?;
        let s: &[u8; 64] = s.sig.0.try_into().map_err(|_| Error::BadSig)?;
        let s = ed25519_dalek::Signature::from_bytes(s);

        key.verify(h, &s).map_err(|_| Error::BadSig)
    }
}

impl HostKeyVerifier for Ed25519Verifier {
    fn verify(&self, k_s: &[u8], sig: &[u8], h: &[u8]) -> bool {
        match Self::check(k_s, sig, h) {
            Ok(()) => true,
            Err(e) => {
                trace!("ed25519 verify failed: {e}");
                false
            }
        }
    }
}

/// Smallest RSA modulus accepted, in bits
#[cfg(feature = "rsa")]
pub const RSA_MIN_KEYSIZE: usize = 1024;
#[cfg(feature = "rsa")]
const RSA_MAX_KEYSIZE: usize = 16384;

#[cfg(feature = "rsa")]
#[derive(SSHEncode, SSHDecode)]
struct RSAPubKey<'a> {
    name: &'a str,
    e: MPInt<'a>,
    n: MPInt<'a>,
}

/// `ssh-rsa` host keys.
///
/// Accepts `rsa-sha2-256` and `rsa-sha2-512` signatures
/// ([RFC8332](https://tools.ietf.org/html/rfc8332)) and SHA-1 `ssh-rsa`.
#[cfg(feature = "rsa")]
#[derive(Debug, Default)]
pub struct RsaVerifier;

#[cfg(feature = "rsa")]
impl RsaVerifier {
    pub fn boxed() -> Box<dyn HostKeyVerifier> {
        Box::new(Self)
    }

    fn check(k_s: &[u8], sig: &[u8], h: &[u8]) -> Result<()> {
        use rsa::pkcs1v15::{Signature, VerifyingKey};
        use rsa::traits::PublicKeyParts;
        use rsa::{BigUint, RsaPublicKey};

        let k: RSAPubKey = read_ssh(k_s)?;
        if k.name != SSH_NAME_RSA {
            return Err(Error::BadKeyFormat);
        }
        let key = RsaPublicKey::new_with_max_size(
            BigUint::from_bytes_be(k.n.magnitude()),
            BigUint::from_bytes_be(k.e.magnitude()),
            RSA_MAX_KEYSIZE,
        )
        .map_err(|e| {
            debug!("Bad RSA key: {e}");
            Error::BadKeyFormat
        })?;
        if key.n().bits() < RSA_MIN_KEYSIZE {
            debug!("RSA key too small");
            return Err(Error::BadKeyFormat);
        }

        let s: SigBlob = read_ssh(sig)?;
        // some implementations strip leading zeroes
        let size = key.size();
        if s.sig.0.len() > size {
            return Err(Error::BadSig);
        }
        let mut padded = vec![0u8; size];
        padded[size - s.sig.0.len()..].copy_from_slice(s.sig.0);
        let rsig = Signature::try_from(padded.as_slice()).map_err(|_| Error::BadSig)?;

        let r = match s.name {
            SSH_NAME_RSA_SHA256 => VerifyingKey::<sha2::Sha256>::new(key).verify(h, &rsig),
            SSH_NAME_RSA_SHA512 => VerifyingKey::<sha2::Sha512>::new(key).verify(h, &rsig),
            SSH_NAME_RSA => VerifyingKey::<sha1::Sha1>::new(key).verify(h, &rsig),
            _ => {
                debug!("Unknown RSA signature type {}", s.name);
                return Err(Error::BadSig);
            }
        };
        r.map_err(|_| Error::BadSig)
    }
}

#[cfg(feature = "rsa")]
impl HostKeyVerifier for RsaVerifier {
    fn verify(&self, k_s: &[u8], sig: &[u8], h: &[u8]) -> bool {
        match Self::check(k_s, sig, h) {
            Ok(()) => true,
            Err(e) => {
                trace!("rsa verify failed: {e}");
                false
            }
        }
    }
}

#[cfg(feature = "p256")]
#[derive(SSHEncode, SSHDecode)]
struct EcdsaPubKey<'a> {
    name: &'a str,
    curve: &'a str,
    /// SEC1 encoded point
    q: BinString<'a>,
}

/// The inner blob of an ECDSA signature
#[cfg(feature = "p256")]
#[derive(SSHEncode, SSHDecode)]
struct EcdsaSig<'a> {
    r: MPInt<'a>,
    s: MPInt<'a>,
}

/// `ecdsa-sha2-nistp256` host keys, [RFC5656](https://tools.ietf.org/html/rfc5656)
#[cfg(feature = "p256")]
#[derive(Debug, Default)]
pub struct EcdsaP256Verifier;

#[cfg(feature = "p256")]
impl EcdsaP256Verifier {
    pub fn boxed() -> Box<dyn HostKeyVerifier> {
        Box::new(Self)
    }

    fn check(k_s: &[u8], sig: &[u8], h: &[u8]) -> Result<()> {
        use p256::ecdsa::{Signature, VerifyingKey};

        let k: EcdsaPubKey = read_ssh(k_s)?;
        if k.name != SSH_NAME_ECDSA_NISTP256 || k.curve != SSH_NAME_NISTP256 {
            debug!("Bad ECDSA key {} {}", k.name, k.curve);
            return Err(Error::BadKeyFormat);
        }
        let key = VerifyingKey::from_sec1_bytes(k.q.0).map_err(|_| Error::BadKeyFormat)?;

        let s: SigBlob = read_ssh(sig)?;
        if s.name != SSH_NAME_ECDSA_NISTP256 {
            debug!("Mismatched ECDSA key with {} signature", s.name);
            return Err(Error::BadSig);
        }
        let rs: EcdsaSig = read_ssh(s.sig.0)?;

        // r || s, each left padded to the field size
        let mut b = [0u8; 64];
        for (m, out) in [rs.r.magnitude(), rs.s.magnitude()].iter().zip(b.chunks_mut(32)) {
            if m.len() > 32 {
                return Err(Error::BadSig);
            }
            out[32 - m.len()..].copy_from_slice(m);
        }
        let s = Signature::from_slice(&b).map_err(|_| Error::BadSig)?;

        key.verify(h, &s).map_err(|_| Error::BadSig)
    }
}

#[cfg(feature = "p256")]
impl HostKeyVerifier for EcdsaP256Verifier {
    fn verify(&self, k_s: &[u8], sig: &[u8], h: &[u8]) -> bool {
        match Self::check(k_s, sig, h) {
            Ok(()) => true,
            Err(e) => {
                trace!("ecdsa verify failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::sign::*;
    use crate::sshwire::write_ssh_vec;
    use crate::kexlog::init_test_log;
    use ed25519_dalek::{Signer, SigningKey};

    pub fn test_signing_key() -> SigningKey {
        SigningKey::from_bytes(&[0x42; 32])
    }

    /// Host key blob for `k`
    pub fn ed25519_k_s(k: &SigningKey) -> Vec<u8> {
        let pk = k.verifying_key().to_bytes();
        write_ssh_vec(&Ed25519PubKey { name: SSH_NAME_ED25519, key: BinString(&pk) }).unwrap()
    }

    /// Signature blob over `h`
    pub fn ed25519_sig(k: &SigningKey, h: &[u8]) -> Vec<u8> {
        let s = k.sign(h).to_bytes();
        write_ssh_vec(&SigBlob { name: SSH_NAME_ED25519, sig: BinString(&s) }).unwrap()
    }

    #[test]
    fn ed25519_good() {
        init_test_log();
        let k = test_signing_key();
        let h = [7u8; 32];
        let k_s = ed25519_k_s(&k);
        assert_eq!(key_type_name(&k_s).unwrap(), SSH_NAME_ED25519);
        assert!(Ed25519Verifier.verify(&k_s, &ed25519_sig(&k, &h), &h));
    }

    #[test]
    fn ed25519_bad() {
        init_test_log();
        let k = test_signing_key();
        let h = [7u8; 32];
        let k_s = ed25519_k_s(&k);
        let sig = ed25519_sig(&k, &h);

        // different hash
        assert!(!Ed25519Verifier.verify(&k_s, &sig, &[8u8; 32]));

        // flipped signature bit
        let mut bad = sig.clone();
        let l = bad.len();
        bad[l - 1] ^= 0x01;
        assert!(!Ed25519Verifier.verify(&k_s, &bad, &h));

        // truncated blobs
        assert!(!Ed25519Verifier.verify(&k_s[..k_s.len() - 1], &sig, &h));
        assert!(!Ed25519Verifier.verify(&k_s, &sig[..10], &h));

        // wrong signature name
        let s = k.sign(&h).to_bytes();
        let other = write_ssh_vec(&SigBlob { name: SSH_NAME_RSA_SHA256, sig: BinString(&s) }).unwrap();
        assert!(!Ed25519Verifier.verify(&k_s, &other, &h));
    }

    #[test]
    fn key_name() {
        assert!(key_type_name(&[0, 0, 0, 9, b'a']).is_err());
        assert_eq!(key_type_name(&[0, 0, 0, 1, b'x', 1, 2, 3]).unwrap(), "x");
    }

    #[cfg(feature = "rsa")]
    pub fn rsa_key() -> &'static rsa::RsaPrivateKey {
        static KEY: std::sync::OnceLock<rsa::RsaPrivateKey> = std::sync::OnceLock::new();
        // smallest accepted size, keeps key generation fast
        KEY.get_or_init(|| rsa::RsaPrivateKey::new(&mut rand_core::OsRng, RSA_MIN_KEYSIZE).unwrap())
    }

    /// Host key blob for `k`
    #[cfg(feature = "rsa")]
    pub fn rsa_k_s(k: &rsa::RsaPrivateKey) -> Vec<u8> {
        use rsa::traits::PublicKeyParts;
        let e = k.e().to_bytes_be();
        let n = k.n().to_bytes_be();
        write_ssh_vec(&RSAPubKey { name: SSH_NAME_RSA, e: MPInt(&e), n: MPInt(&n) }).unwrap()
    }

    /// PKCS#1 v1.5 signature over `h` with the digest for signature type `name`
    #[cfg(feature = "rsa")]
    fn rsa_raw_sig(k: &rsa::RsaPrivateKey, name: &str, h: &[u8]) -> Vec<u8> {
        use rsa::pkcs1v15::SigningKey;
        use signature::{SignatureEncoding, Signer};
        let s = match name {
            SSH_NAME_RSA_SHA256 => SigningKey::<sha2::Sha256>::new(k.clone()).sign(h).to_bytes(),
            SSH_NAME_RSA_SHA512 => SigningKey::<sha2::Sha512>::new(k.clone()).sign(h).to_bytes(),
            SSH_NAME_RSA => SigningKey::<sha1::Sha1>::new(k.clone()).sign(h).to_bytes(),
            _ => panic!("unknown {name}"),
        };
        s.into_vec()
    }

    /// Signature blob over `h`
    #[cfg(feature = "rsa")]
    pub fn rsa_sig(k: &rsa::RsaPrivateKey, name: &str, h: &[u8]) -> Vec<u8> {
        let s = rsa_raw_sig(k, name, h);
        write_ssh_vec(&SigBlob { name, sig: BinString(&s) }).unwrap()
    }

    #[cfg(feature = "rsa")]
    const RSA_SIG_NAMES: [&str; 3] = [SSH_NAME_RSA_SHA256, SSH_NAME_RSA_SHA512, SSH_NAME_RSA];

    #[cfg(feature = "rsa")]
    #[test]
    fn rsa_good_bad() {
        init_test_log();
        let k = rsa_key();
        let k_s = rsa_k_s(k);
        assert_eq!(key_type_name(&k_s).unwrap(), SSH_NAME_RSA);
        let h = [7u8; 32];

        for name in RSA_SIG_NAMES {
            let sig = rsa_sig(k, name, &h);
            assert!(RsaVerifier.verify(&k_s, &sig, &h), "{name}");

            // flipped signature bit
            let mut bad = sig.clone();
            let l = bad.len();
            bad[l - 1] ^= 0x01;
            assert!(!RsaVerifier.verify(&k_s, &bad, &h), "{name}");

            // different hash
            assert!(!RsaVerifier.verify(&k_s, &sig, &[8u8; 32]), "{name}");
        }

        // signature type decides the digest
        let s = rsa_raw_sig(k, SSH_NAME_RSA_SHA256, &h);
        let relabel = write_ssh_vec(&SigBlob { name: SSH_NAME_RSA_SHA512, sig: BinString(&s) }).unwrap();
        assert!(!RsaVerifier.verify(&k_s, &relabel, &h));
    }

    #[cfg(feature = "rsa")]
    #[test]
    fn rsa_stripped_zero() {
        init_test_log();
        let k = rsa_key();
        let k_s = rsa_k_s(k);

        for name in RSA_SIG_NAMES {
            // roughly 1 in 256 signatures start with a zero byte
            let (h, s) = (0u32..8192)
                .map(|i| {
                    let h = i.to_be_bytes();
                    (h, rsa_raw_sig(k, name, &h))
                })
                .find(|(_, s)| s[0] == 0)
                .unwrap();

            let full = write_ssh_vec(&SigBlob { name, sig: BinString(&s) }).unwrap();
            assert!(RsaVerifier.verify(&k_s, &full, &h), "{name}");

            let stripped = s.iter().position(|b| *b != 0).unwrap();
            let short = write_ssh_vec(&SigBlob { name, sig: BinString(&s[stripped..]) }).unwrap();
            assert!(RsaVerifier.verify(&k_s, &short, &h), "{name}");

            // longer than the modulus
            let mut long = vec![0u8; 1];
            long.extend_from_slice(&s);
            let long = write_ssh_vec(&SigBlob { name, sig: BinString(&long) }).unwrap();
            assert!(!RsaVerifier.verify(&k_s, &long, &h), "{name}");
        }
    }

    #[cfg(feature = "p256")]
    pub fn ecdsa_signing_key() -> p256::ecdsa::SigningKey {
        p256::ecdsa::SigningKey::from_slice(&[0x42; 32]).unwrap()
    }

    /// Host key blob for `k`
    #[cfg(feature = "p256")]
    pub fn ecdsa_k_s(k: &p256::ecdsa::SigningKey) -> Vec<u8> {
        use p256::elliptic_curve::sec1::ToEncodedPoint;
        let q = k.verifying_key().to_encoded_point(false);
        write_ssh_vec(&EcdsaPubKey {
            name: SSH_NAME_ECDSA_NISTP256,
            curve: SSH_NAME_NISTP256,
            q: BinString(q.as_bytes()),
        }).unwrap()
    }

    /// Signature blob over `h`
    #[cfg(feature = "p256")]
    pub fn ecdsa_sig(k: &p256::ecdsa::SigningKey, h: &[u8]) -> Vec<u8> {
        use signature::Signer;
        let s: p256::ecdsa::Signature = k.sign(h);
        let (r, s) = s.split_bytes();
        let rs = write_ssh_vec(&EcdsaSig { r: MPInt(r.as_slice()), s: MPInt(s.as_slice()) }).unwrap();
        write_ssh_vec(&SigBlob { name: SSH_NAME_ECDSA_NISTP256, sig: BinString(&rs) }).unwrap()
    }

    #[cfg(feature = "p256")]
    #[test]
    fn ecdsa_good_bad() {
        init_test_log();
        let k = ecdsa_signing_key();
        let k_s = ecdsa_k_s(&k);
        assert_eq!(key_type_name(&k_s).unwrap(), SSH_NAME_ECDSA_NISTP256);
        let h = [7u8; 32];
        let sig = ecdsa_sig(&k, &h);
        assert!(EcdsaP256Verifier.verify(&k_s, &sig, &h));

        assert!(!EcdsaP256Verifier.verify(&k_s, &sig, &[8u8; 32]));

        let mut bad = sig.clone();
        let l = bad.len();
        bad[l - 1] ^= 0x01;
        assert!(!EcdsaP256Verifier.verify(&k_s, &bad, &h));

        // wrong curve name
        use p256::elliptic_curve::sec1::ToEncodedPoint;
        let q = k.verifying_key().to_encoded_point(false);
        let other = write_ssh_vec(&EcdsaPubKey {
            name: SSH_NAME_ECDSA_NISTP256,
            curve: "nistp384",
            q: BinString(q.as_bytes()),
        }).unwrap();
        assert!(matches!(EcdsaP256Verifier::check(&other, &sig, &h), Err(Error::BadKeyFormat)));

        // ed25519 signature with an ecdsa key
        let ed = ed25519_sig(&test_signing_key(), &h);
        assert!(!EcdsaP256Verifier.verify(&k_s, &ed, &h));

        // r longer than the field
        let rs = write_ssh_vec(&EcdsaSig { r: MPInt(&[1; 33]), s: MPInt(&[1; 32]) }).unwrap();
        let long = write_ssh_vec(&SigBlob { name: SSH_NAME_ECDSA_NISTP256, sig: BinString(&rs) }).unwrap();
        assert!(matches!(EcdsaP256Verifier::check(&k_s, &long, &h), Err(Error::BadSig)));
    }

    #[cfg(feature = "rsa")]
    #[test]
    fn rsa_malformed() {
        // 512 bit modulus is refused
        let n = [0xc3u8; 64];
        let k_s = write_ssh_vec(&RSAPubKey {
            name: SSH_NAME_RSA,
            e: MPInt(&[1, 0, 1]),
            n: MPInt(&n),
        }).unwrap();
        let sig = write_ssh_vec(&SigBlob { name: SSH_NAME_RSA_SHA256, sig: BinString(&[1; 64]) }).unwrap();
        assert!(!RsaVerifier.verify(&k_s, &sig, b"hash"));
        assert!(matches!(RsaVerifier::check(&k_s, &sig, b"hash"), Err(Error::BadKeyFormat)));
    }
}
