//! Resolution of textual key paths into a root namespace and sub-path.

use crate::error::{Result, WatchError};
use std::fmt;

/// Separator between path segments.
pub const SEPARATOR: char = '\\';

/// One of the well-known root namespaces of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKey {
    /// `HKEY_LOCAL_MACHINE`
    LocalMachine,
    /// `HKEY_CURRENT_USER`
    CurrentUser,
    /// `HKEY_CLASSES_ROOT`
    ClassesRoot,
    /// `HKEY_CURRENT_CONFIG`
    CurrentConfig,
    /// `HKEY_PERFORMANCE_DATA`
    PerformanceData,
    /// `HKEY_USERS`
    Users,
}

impl RootKey {
    /// Every root, in a stable order.
    pub const ALL: [RootKey; 6] = [
        RootKey::LocalMachine,
        RootKey::CurrentUser,
        RootKey::ClassesRoot,
        RootKey::CurrentConfig,
        RootKey::PerformanceData,
        RootKey::Users,
    ];

    /// The short token for this root, e.g. `HKLM`.
    pub fn token(self) -> &'static str {
        match self {
            RootKey::LocalMachine => "HKLM",
            RootKey::CurrentUser => "HKCU",
            RootKey::ClassesRoot => "HKCR",
            RootKey::CurrentConfig => "HKCC",
            RootKey::PerformanceData => "HKPD",
            RootKey::Users => "HKU",
        }
    }

    /// The long name for this root, e.g. `HKEY_LOCAL_MACHINE`.
    pub fn long_name(self) -> &'static str {
        match self {
            RootKey::LocalMachine => "HKEY_LOCAL_MACHINE",
            RootKey::CurrentUser => "HKEY_CURRENT_USER",
            RootKey::ClassesRoot => "HKEY_CLASSES_ROOT",
            RootKey::CurrentConfig => "HKEY_CURRENT_CONFIG",
            RootKey::PerformanceData => "HKEY_PERFORMANCE_DATA",
            RootKey::Users => "HKEY_USERS",
        }
    }

    /// Match a root token case-insensitively against the short and long forms.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|root| {
            token.eq_ignore_ascii_case(root.token()) || token.eq_ignore_ascii_case(root.long_name())
        })
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A path split into its root namespace and the sub-path below it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedKey {
    /// The root namespace
    pub root: RootKey,
    /// Backslash-separated sub-path, empty when the root itself is addressed
    pub sub_path: String,
}

impl ResolvedKey {
    /// Create a resolved key from a root and a sub-path.
    pub fn new(root: RootKey, sub_path: impl Into<String>) -> Self {
        Self {
            root,
            sub_path: sub_path.into(),
        }
    }

    /// Iterate the sub-path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.sub_path.split(SEPARATOR).filter(|s| !s.is_empty())
    }
}

impl fmt::Display for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub_path.is_empty() {
            write!(f, "{}", self.root)
        } else {
            write!(f, "{}{}{}", self.root, SEPARATOR, self.sub_path)
        }
    }
}

/// Maps a textual path to a root namespace and sub-path.
///
/// Resolution happens before any OS resource is touched, so a resolver
/// must not open anything itself.
pub trait NamespaceResolver: Send + Sync {
    /// Resolve `path`, failing with [`WatchError::InvalidArgument`] when the
    /// root token is not recognized.
    fn resolve(&self, path: &str) -> Result<ResolvedKey>;
}

/// Resolver for the six standard registry roots.
///
/// # Examples
///
/// ```rust
/// use regwatch::core::{NamespaceResolver, RootKey, StandardResolver};
///
/// let key = StandardResolver.resolve("hklm\\Software\\WinRAR").unwrap();
/// assert_eq!(key.root, RootKey::LocalMachine);
/// assert_eq!(key.sub_path, "Software\\WinRAR");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardResolver;

impl NamespaceResolver for StandardResolver {
    fn resolve(&self, path: &str) -> Result<ResolvedKey> {
        if path.is_empty() {
            return Err(WatchError::InvalidArgument("empty key path".into()));
        }

        let (token, rest) = match path.split_once(SEPARATOR) {
            Some((token, rest)) => (token, rest),
            None => (path, ""),
        };

        let root = RootKey::from_token(token).ok_or_else(|| {
            WatchError::InvalidArgument(format!("incorrect root key '{}' in '{}'", token, path))
        })?;

        let sub_path = rest
            .split(SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("\\");

        Ok(ResolvedKey { root, sub_path })
    }
}
