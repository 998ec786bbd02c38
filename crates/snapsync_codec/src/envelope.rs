//! The envelope: the versioned on-wire unit wrapping a token payload.

use crate::compress::CompressMode;
use serde::{Deserialize, Serialize};

/// Format version for the bare prefix form (`c_`/`e_`/`ec_` + payload).
pub const FORMAT_VERSION_PREFIXED: u16 = 1;
/// Format version for the wrapped-object form (the current format).
pub const FORMAT_VERSION: u16 = 2;
/// Format versions the decoder accepts.
pub const SUPPORTED_VERSIONS: [u16; 2] = [FORMAT_VERSION_PREFIXED, FORMAT_VERSION];

/// Token prefix for payloads that are encrypted and compressed.
pub const PREFIX_ENCRYPTED_COMPRESSED: &str = "ec_";
/// Token prefix for payloads that are encrypted only.
pub const PREFIX_ENCRYPTED: &str = "e_";
/// Token prefix for payloads that are compressed only.
pub const PREFIX_COMPRESSED: &str = "c_";

/// Returns true if the decoder accepts the given format version.
pub fn is_supported_version(version: u16) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}

/// The on-wire unit.
///
/// Constructed at encode time, immutable, consumed once at decode time.
/// `data` is the (possibly compressed, possibly encrypted) inner payload
/// as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Envelope {
    /// Format version of this envelope.
    pub format_version: u16,
    /// The inner payload.
    pub data: String,
    /// Whether the payload is compressed.
    pub compressed: bool,
    /// Whether the payload is encrypted.
    pub encrypted: bool,
}

impl Envelope {
    /// Returns the token prefix matching this envelope's flags.
    pub fn prefix(&self) -> &'static str {
        prefix_for(self.compressed, self.encrypted)
    }
}

/// Returns the token prefix for the given flag combination.
pub fn prefix_for(compressed: bool, encrypted: bool) -> &'static str {
    match (compressed, encrypted) {
        (true, true) => PREFIX_ENCRYPTED_COMPRESSED,
        (false, true) => PREFIX_ENCRYPTED,
        (true, false) => PREFIX_COMPRESSED,
        (false, false) => "",
    }
}

/// Flags recovered from a token prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrefixFlags {
    /// Whether a known prefix was present at all.
    pub present: bool,
    /// Whether the prefix declares compression.
    pub compressed: bool,
    /// Whether the prefix declares encryption.
    pub encrypted: bool,
}

/// Splits a known prefix off a token, if one is present.
pub fn strip_prefix(token: &str) -> (PrefixFlags, &str) {
    // "ec_" must be checked before "e_".
    if let Some(rest) = token.strip_prefix(PREFIX_ENCRYPTED_COMPRESSED) {
        (
            PrefixFlags {
                present: true,
                compressed: true,
                encrypted: true,
            },
            rest,
        )
    } else if let Some(rest) = token.strip_prefix(PREFIX_ENCRYPTED) {
        (
            PrefixFlags {
                present: true,
                compressed: false,
                encrypted: true,
            },
            rest,
        )
    } else if let Some(rest) = token.strip_prefix(PREFIX_COMPRESSED) {
        (
            PrefixFlags {
                present: true,
                compressed: true,
                encrypted: false,
            },
            rest,
        )
    } else {
        (PrefixFlags::default(), token)
    }
}

/// Options controlling [`encode`](crate::encode).
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// Compression mode for the payload.
    pub compress: CompressMode,
    /// Whether to encrypt the payload.
    pub encrypt: bool,
    /// Password for encryption. Required when `encrypt` is true.
    pub password: Option<String>,
    /// Format version to emit. `None` means the current version.
    pub format_version: Option<u16>,
}

impl EncodeOptions {
    /// Creates default options: no compression, no encryption.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression mode.
    pub fn with_compress(mut self, mode: CompressMode) -> Self {
        self.compress = mode;
        self
    }

    /// Enables encryption with the given password.
    pub fn with_encryption(mut self, password: impl Into<String>) -> Self {
        self.encrypt = true;
        self.password = Some(password.into());
        self
    }

    /// Sets the format version to emit.
    pub fn with_format_version(mut self, version: u16) -> Self {
        self.format_version = Some(version);
        self
    }
}

/// Options controlling [`decode`](crate::decode).
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Password for decryption, if the token may be encrypted.
    pub password: Option<String>,
    /// Fail closed on unknown format versions. When false, the decoder
    /// additionally tries an ordered list of best-effort payload
    /// interpretations for tokens from unknown peers.
    pub strict_version: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            password: None,
            strict_version: true,
        }
    }
}

impl DecodeOptions {
    /// Creates default options: strict version checking, no password.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies a password for encrypted tokens.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Enables best-effort decoding of tokens from unknown peers.
    pub fn lenient(mut self) -> Self {
        self.strict_version = false;
        self
    }
}
