//! Finite field Diffie-Hellman for group exchange.

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use num_bigint_dig::BigUint;
use zeroize::Zeroizing;

use crate::*;

/// Creates a Diffie-Hellman instance for one exchange
pub type DhFactory = fn() -> Box<dyn DiffieHellman>;

/// A Diffie-Hellman implementation for a server provided group.
///
/// An instance is used for a single exchange. Private values must be
/// cleared once the shared secret is derived, and on drop.
pub trait DiffieHellman {
    /// Sets the group and generates a fresh ephemeral key pair.
    ///
    /// `p` and `g` are big-endian magnitudes.
    fn set_group(&mut self, p: &[u8], g: &[u8]) -> Result<()>;

    /// Returns our public value `e = g^x mod p`, big-endian.
    fn public(&self) -> Result<&[u8]>;

    /// Sets the peer's public value `f`, failing with [`Error::BadKex`]
    /// unless `1 < f < p-1`.
    fn set_peer(&mut self, f: &[u8]) -> Result<()>;

    /// Computes the shared secret `K = f^x mod p`, big-endian.
    ///
    /// The private exponent is cleared, so this can only be called once.
    fn shared_secret(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Modular exponentiation Diffie-Hellman using `num-bigint-dig`.
///
/// The private exponent `x` is chosen uniformly with `1 < x < (p-1)/2`
/// (RFC4419 section 3). Values derived from `x` are held in [`Zeroizing`]
/// and cleared when dropped.
#[derive(Default)]
pub struct ModpDh {
    p: Option<BigUint>,
    x: Option<Zeroizing<BigUint>>,
    e: Vec<u8>,
    f: Option<BigUint>,
}

impl fmt::Debug for ModpDh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModpDh")
            .field("p_bits", &self.p.as_ref().map(|p| p.bits()))
            .field("x", &if self.x.is_some() { "Some" } else { "None" })
            .finish_non_exhaustive()
    }
}

impl ModpDh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed() -> Box<dyn DiffieHellman> {
        Box::new(Self::new())
    }

    /// Returns a random exponent `2 <= x <= q-1`, `q = (p-1)/2`.
    fn random_exponent(p: &BigUint) -> Result<Zeroizing<BigUint>> {
        let one = BigUint::from(1u32);
        let two = BigUint::from(2u32);
        let q = (p - &one) >> 1usize;
        if q <= two {
            return Err(Error::BadKex);
        }
        let range = &q - &two;

        // extra bytes make the modulo bias negligible
        let mut buf = Zeroizing::new(vec![0u8; (p.bits() as usize + 7) / 8 + 8]);
        random::fill_random(&mut buf)?;
        let r = Zeroizing::new(BigUint::from_bytes_be(&buf));
        let mut x = Zeroizing::new(&*r % &range);
        *x += &two;
        Ok(x)
    }
}

impl DiffieHellman for ModpDh {
    fn set_group(&mut self, p: &[u8], g: &[u8]) -> Result<()> {
        // group exchange primes are safe primes, at least odd
        let odd = p.last().map_or(false, |l| l & 1 == 1);
        let p = BigUint::from_bytes_be(p);
        let g = BigUint::from_bytes_be(g);
        let one = BigUint::from(1u32);

        if p.bits() < 3 || !odd {
            debug!("Bad group prime");
            return Err(Error::BadKex);
        }
        let p1 = &p - &one;
        if g <= one || g >= p1 {
            debug!("Bad group generator");
            return Err(Error::BadKex);
        }

        let x = Self::random_exponent(&p)?;
        self.e = g.modpow(&x, &p).to_bytes_be();
        self.x = Some(x);
        self.p = Some(p);
        self.f = None;
        Ok(())
    }

    fn public(&self) -> Result<&[u8]> {
        if self.x.is_none() {
            return Err(Error::bug_err_msg("public() without a group"));
        }
        Ok(&self.e)
    }

    fn set_peer(&mut self, f: &[u8]) -> Result<()> {
        let p = self.p.as_ref().trap()?;
        let f = BigUint::from_bytes_be(f);
        let one = BigUint::from(1u32);
        if f <= one || f >= p - &one {
            warn!("Peer DH value out of range");
            // the exchange is over, don't keep the exponent
            self.x = None;
            return Err(Error::BadKex);
        }
        self.f = Some(f);
        Ok(())
    }

    fn shared_secret(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let p = self.p.as_ref().trap()?;
        let f = self.f.take().trap()?;
        let x = self.x.take().trap()?;
        let k = Zeroizing::new(f.modpow(&x, p));
        if *k <= BigUint::from(1u32) {
            // not reachable with a prime p and 1 < f < p-1
            return Err(Error::BadKex);
        }
        Ok(Zeroizing::new(k.to_bytes_be()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::dh::*;
    use crate::error::Error;

    /// RFC3526 2048-bit MODP group, a safe prime
    pub const GROUP14_P: &str = "\
        FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
        29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
        EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
        E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
        EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D\
        C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F\
        83655D23DCA3AD961C62F356208552BB9ED529077096966D\
        670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
        E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9\
        DE2BCBF6955817183995497CEA956AE515D2261898FA0510\
        15728E5A8AACAA68FFFFFFFFFFFFFFFF";

    pub fn group14_p() -> Vec<u8> {
        hex::decode(GROUP14_P).unwrap()
    }

    #[test]
    fn agree() {
        let p = group14_p();
        let mut a = ModpDh::new();
        let mut b = ModpDh::new();
        a.set_group(&p, &[2]).unwrap();
        b.set_group(&p, &[2]).unwrap();
        assert_ne!(a.public().unwrap(), b.public().unwrap());

        let ea = a.public().unwrap().to_vec();
        let eb = b.public().unwrap().to_vec();
        a.set_peer(&eb).unwrap();
        b.set_peer(&ea).unwrap();
        let ka = a.shared_secret().unwrap();
        let kb = b.shared_secret().unwrap();
        assert_eq!(*ka, *kb);

        // exponent is consumed
        assert!(a.x.is_none());
    }

    #[test]
    fn peer_range() {
        let p = group14_p();
        let pn = BigUint::from_bytes_be(&p);
        let mut a = ModpDh::new();
        a.set_group(&p, &[2]).unwrap();

        let p1 = (&pn - BigUint::from(1u32)).to_bytes_be();
        let p2 = (&pn - BigUint::from(2u32)).to_bytes_be();
        assert!(matches!(a.set_peer(&[]), Err(Error::BadKex)));
        assert!(matches!(a.set_peer(&[1]), Err(Error::BadKex)));
        assert!(matches!(a.set_peer(&p1), Err(Error::BadKex)));
        assert!(matches!(a.set_peer(&p), Err(Error::BadKex)));
        // rejection ends the exchange
        assert!(a.x.is_none());

        a.set_group(&p, &[2]).unwrap();
        a.set_peer(&[2]).unwrap();
        a.set_peer(&p2).unwrap();
    }

    #[test]
    fn secret_cleared() {
        let p = group14_p();
        let mut a = ModpDh::new();
        let mut b = ModpDh::new();
        a.set_group(&p, &[2]).unwrap();
        b.set_group(&p, &[2]).unwrap();
        let eb = b.public().unwrap().to_vec();

        // a rejected peer value drops the exponent
        assert!(a.set_peer(&[1]).is_err());
        assert!(a.x.is_none());
        assert!(format!("{a:?}").contains("x: \"None\""));

        a.set_group(&p, &[2]).unwrap();
        assert!(a.x.is_some());
        a.set_peer(&eb).unwrap();
        a.shared_secret().unwrap();
        assert!(a.x.is_none());
        assert!(a.f.is_none());

        // the exponent type clears its limbs
        let mut x = BigUint::from_bytes_be(&[0xa5; 40]);
        zeroize::Zeroize::zeroize(&mut x);
        assert!(x.to_bytes_be().iter().all(|b| *b == 0));
    }

    #[test]
    fn bad_group() {
        let p = group14_p();
        let mut a = ModpDh::new();
        // even modulus
        assert!(matches!(a.set_group(&[0x10, 0x00], &[2]), Err(Error::BadKex)));
        // generator out of range
        assert!(matches!(a.set_group(&p, &[1]), Err(Error::BadKex)));
        assert!(matches!(a.set_group(&p, &[]), Err(Error::BadKex)));
        assert!(matches!(a.set_group(&p, &p), Err(Error::BadKex)));
        assert!(a.x.is_none());
    }

    #[test]
    fn exponent_range() {
        let p = BigUint::from(23u32);
        for _ in 0..50 {
            let x = ModpDh::random_exponent(&p).unwrap();
            // q = 11
            assert!(*x >= BigUint::from(2u32) && *x <= BigUint::from(10u32));
        }
    }
}
