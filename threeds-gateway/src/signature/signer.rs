//! Signature generation over canonical field encodings.

use std::{convert::Infallible, fmt, str::FromStr};

use sha2::{Digest, Sha512};
use tracing::instrument;

use crate::{encoding::encode, fields::FieldSet};

/// Which fields a signature covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SignScope {
    /// Sign every field; the signature carries no field list.
    #[default]
    All,
    /// Sign only the named top-level fields; the signature carries the list
    /// of names that were present and hashed.
    Fields(Vec<String>),
}

impl SignScope {
    /// Builds a partial scope from field names.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::signature::SignScope;
    ///
    /// let scope = SignScope::fields(["action", "amount"]);
    /// assert!(scope.is_partial());
    /// ```
    #[must_use]
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fields(names.into_iter().map(Into::into).collect())
    }

    /// Builds a partial scope naming every top-level field currently in `fields`.
    ///
    /// Fields added after signing can then be changed freely without
    /// invalidating the signature.
    #[must_use]
    pub fn every_field(fields: &FieldSet) -> Self {
        Self::fields(fields.keys())
    }

    /// Returns true if the signature will carry a field list.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        matches!(self, Self::Fields(_))
    }
}

impl FromStr for SignScope {
    type Err = Infallible;

    /// Parses a comma-separated list of names; an empty string means [`SignScope::All`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let names: Vec<String> =
            s.split(',').map(str::trim).filter(|name| !name.is_empty()).map(str::to_owned).collect();
        if names.is_empty() { Ok(Self::All) } else { Ok(Self::Fields(names)) }
    }
}

/// A computed or received signature.
///
/// The [`Display`](fmt::Display) form is the wire value: the hex digest,
/// followed by `|name,name,...` when partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    digest: String,
    fields: Option<Vec<String>>,
}

impl Signature {
    /// Parses a wire signature value.
    ///
    /// Everything before the first `|` is the digest; everything after it is
    /// the comma-separated list of covered fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::signature::Signature;
    ///
    /// let signature = Signature::parse("abc123|action,amount");
    /// assert_eq!(signature.digest(), "abc123");
    /// assert_eq!(signature.fields(), Some(&["action".to_owned(), "amount".to_owned()][..]));
    ///
    /// let full = Signature::parse("abc123");
    /// assert!(full.fields().is_none());
    /// ```
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.split_once('|') {
            Some((digest, names)) => Self {
                digest: digest.to_owned(),
                fields: Some(
                    names.split(',').filter(|name| !name.is_empty()).map(str::to_owned).collect(),
                ),
            },
            None => Self { digest: value.to_owned(), fields: None },
        }
    }

    /// The hex digest.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// The covered field names, for a partial signature.
    #[must_use]
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    /// Returns the scope needed to reproduce this signature.
    #[must_use]
    pub fn scope(&self) -> SignScope {
        self.fields.clone().map_or(SignScope::All, SignScope::Fields)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digest)?;
        if let Some(fields) = &self.fields {
            write!(f, "|{}", fields.join(","))?;
        }
        Ok(())
    }
}

/// Signs a field set with the merchant secret.
///
/// With [`SignScope::Fields`], fields not named are left out before encoding
/// and names not present in `fields` are dropped from the list. The listed
/// names follow the field set's own order, not the order of the scope.
///
/// # Examples
///
/// ```
/// use threeds_gateway::{
///     fields::FieldSet,
///     signature::{SignScope, sign},
/// };
///
/// let fields = FieldSet::from([("c", "3"), ("a", "1"), ("b", "2")]);
///
/// let full = sign(&fields, "secret", &SignScope::All);
/// assert_eq!(full.digest().len(), 128);
/// assert!(full.fields().is_none());
///
/// let partial = sign(&fields, "secret", &SignScope::fields(["b", "a", "zz"]));
/// assert!(partial.to_string().ends_with("|a,b"));
/// ```
#[must_use]
#[instrument(skip_all, fields(field_count = fields.len(), partial = scope.is_partial()))]
pub fn sign(fields: &FieldSet, secret: &str, scope: &SignScope) -> Signature {
    match scope {
        SignScope::All => Signature { digest: digest(fields, secret), fields: None },
        SignScope::Fields(names) => {
            let mut covered = fields.clone();
            covered.retain(|key, _| names.iter().any(|name| name == key));
            let listed = covered.keys().map(str::to_owned).collect();
            Signature { digest: digest(&covered, secret), fields: Some(listed) }
        }
    }
}

/// Hex SHA-512 over the canonical encoding followed by the secret.
fn digest(fields: &FieldSet, secret: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(encode(fields).as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
