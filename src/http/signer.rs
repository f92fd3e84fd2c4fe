use std::fmt;

use ring::hmac;

/// Number of HMAC bytes kept in the `a=` parameter (8 hex characters).
const SIGNATURE_BYTES: usize = 4;

/// A query fragment with its client id and truncated signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQuery {
    pub raw_query_fragment: String,
    pub client_id: String,
    pub signature: String,
}

impl fmt::Display for SignedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}&c={}&a={}",
            self.raw_query_fragment, self.client_id, self.signature
        )
    }
}

/// Signs transformation query strings with HMAC-SHA1 over the shared key.
///
/// The fragment is expected to already be a non-empty, `&`-joinable
/// parameter list; no leading separator is inserted for it.
#[derive(Clone)]
pub struct UrlSigner {
    key: hmac::Key,
}

impl fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlSigner").finish_non_exhaustive()
    }
}

impl UrlSigner {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret.as_bytes()),
        }
    }

    /// Signs `query`, preserving everything up to and including the first
    /// `?` verbatim and signing only what follows it.
    #[must_use]
    pub fn sign(&self, query: &str, client_id: &str) -> String {
        let (prefix, fragment) = query.split_once('?').map_or(("", query), |(path, fragment)| {
            (query.get(..=path.len()).unwrap_or_default(), fragment)
        });
        let signed = self.sign_fragment(fragment, client_id);
        format!("{}{}", prefix, signed)
    }

    #[must_use]
    pub fn sign_fragment(&self, fragment: &str, client_id: &str) -> SignedQuery {
        SignedQuery {
            raw_query_fragment: fragment.to_owned(),
            client_id: client_id.to_owned(),
            signature: self.signature(fragment),
        }
    }

    /// First 8 lowercase hex characters of HMAC-SHA1(key, fragment).
    #[must_use]
    pub fn signature(&self, fragment: &str) -> String {
        let tag = hmac::sign(&self.key, fragment.as_bytes());
        tag.as_ref()
            .iter()
            .take(SIGNATURE_BYTES)
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }
}
