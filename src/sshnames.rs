//! Named SSH algorithms and the local method names used for configuration.
//!
//! Packet numbers are listed in `packets.rs`.
//!
//! This module also serves as an index of SSH specifications.

/// [RFC4419](https://tools.ietf.org/html/rfc4419)
pub const SSH_NAME_DHGEX_SHA1: &str = "diffie-hellman-group-exchange-sha1";
/// [RFC4419](https://tools.ietf.org/html/rfc4419)
pub const SSH_NAME_DHGEX_SHA256: &str = "diffie-hellman-group-exchange-sha256";
/// [draft-ietf-curdle-ssh-kex-sha2](https://tools.ietf.org/html/draft-ietf-curdle-ssh-kex-sha2-03)
pub const SSH_NAME_DHGEX_SHA384: &str = "diffie-hellman-group-exchange-sha384@ssh.com";
/// [draft-ietf-curdle-ssh-kex-sha2](https://tools.ietf.org/html/draft-ietf-curdle-ssh-kex-sha2-03)
pub const SSH_NAME_DHGEX_SHA512: &str = "diffie-hellman-group-exchange-sha512@ssh.com";

/// [RFC8709](https://tools.ietf.org/html/rfc8709)
pub const SSH_NAME_ED25519: &str = "ssh-ed25519";
/// [RFC8332](https://tools.ietf.org/html/rfc8332)
pub const SSH_NAME_RSA_SHA256: &str = "rsa-sha2-256";
/// [RFC8332](https://tools.ietf.org/html/rfc8332)
pub const SSH_NAME_RSA_SHA512: &str = "rsa-sha2-512";
/// [RFC4253](https://tools.ietf.org/html/rfc4253). Deprecated for signatures but is a valid key type.
pub const SSH_NAME_RSA: &str = "ssh-rsa";
/// [RFC5656](https://tools.ietf.org/html/rfc5656)
pub const SSH_NAME_ECDSA_NISTP256: &str = "ecdsa-sha2-nistp256";
/// [RFC5656](https://tools.ietf.org/html/rfc5656) curve identifier
pub const SSH_NAME_NISTP256: &str = "nistp256";

// Local hash method names, as used in configuration.
pub const HASH_NAME_SHA1: &str = "sha-1";
pub const HASH_NAME_SHA256: &str = "sha-256";
pub const HASH_NAME_SHA384: &str = "sha-384";
pub const HASH_NAME_SHA512: &str = "sha-512";

/// Built in modular exponentiation Diffie-Hellman
pub const DH_NAME_MODP: &str = "modp";

// Setting names read by `KexConfig::from_settings()`
pub const SETTING_HASH: &str = "hash";
pub const SETTING_DH: &str = "dh";
pub const SETTING_DHGEX_MIN: &str = "dhgex_min";
pub const SETTING_DHGEX_PREFERRED: &str = "dhgex_preferred";
pub const SETTING_DHGEX_MAX: &str = "dhgex_max";
