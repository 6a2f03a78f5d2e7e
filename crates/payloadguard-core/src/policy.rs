//! Extension policy predicates.
//!
//! The engine consults a policy with the lowercased extension of every
//! entry name it visits. A policy is a pure predicate: it must return the
//! same answer for the same input and must be safe to share across threads.

use std::collections::HashSet;

/// Predicate deciding whether an extension is allowed.
///
/// `extension` is lowercased and includes the leading `.`; it is empty for
/// names without an extension.
///
/// Any `Fn(&str) -> bool + Send + Sync` closure is a policy:
///
/// ```
/// use payloadguard_core::ExtensionPolicy;
///
/// let no_scripts = |ext: &str| ext != ".js" && ext != ".vbs";
/// assert!(no_scripts.is_allowed(".txt"));
/// assert!(!no_scripts.is_allowed(".js"));
/// ```
pub trait ExtensionPolicy: Send + Sync {
    /// Returns `true` if entries with this extension are allowed.
    fn is_allowed(&self, extension: &str) -> bool;
}

impl<F> ExtensionPolicy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_allowed(&self, extension: &str) -> bool {
        self(extension)
    }
}

/// Policy that admits every extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ExtensionPolicy for AllowAll {
    fn is_allowed(&self, _extension: &str) -> bool {
        true
    }
}

/// Case-insensitive set of disallowed extensions.
///
/// Extensions may be given with or without the leading dot; they are stored
/// lowercased with a leading dot. The empty string is kept as-is and then
/// matches names that have no extension.
///
/// # Examples
///
/// ```
/// use payloadguard_core::ExtensionBlacklist;
/// use payloadguard_core::ExtensionPolicy;
///
/// let blacklist = ExtensionBlacklist::new(["exe", ".JS", ".scr"]);
/// assert!(!blacklist.is_allowed(".exe"));
/// assert!(!blacklist.is_allowed(".js"));
/// assert!(blacklist.is_allowed(".pdf"));
/// assert!(blacklist.is_allowed(""));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionBlacklist {
    extensions: HashSet<String>,
}

impl ExtensionBlacklist {
    /// Creates a blacklist from any iterator of extensions.
    #[must_use]
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        }
    }

    /// Executable and script extensions commonly blocked in mail attachments.
    #[must_use]
    pub fn mail_default() -> Self {
        Self::new([
            ".ade", ".adp", ".bat", ".chm", ".cmd", ".com", ".cpl", ".exe", ".hta", ".ins",
            ".isp", ".jar", ".js", ".jse", ".lib", ".lnk", ".mde", ".msc", ".msi", ".msp",
            ".mst", ".pif", ".ps1", ".reg", ".scr", ".sct", ".shb", ".sys", ".vb", ".vbe",
            ".vbs", ".vxd", ".wsc", ".wsf", ".wsh",
        ])
    }

    /// Adds an extension to the blacklist.
    pub fn insert(&mut self, extension: &str) {
        self.extensions.insert(normalize_extension(extension));
    }

    /// Returns `true` if the extension is blacklisted.
    #[must_use]
    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(&normalize_extension(extension))
    }

    /// Number of blacklisted extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns `true` if nothing is blacklisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl ExtensionPolicy for ExtensionBlacklist {
    fn is_allowed(&self, extension: &str) -> bool {
        !self.extensions.contains(extension)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExtensionBlacklist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

fn normalize_extension(extension: &str) -> String {
    let lower = extension.to_lowercase();
    if lower.is_empty() || lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

/// Returns the extension of the final path component of `name`.
///
/// The result starts at the last `.` of the final component and includes it,
/// or is empty when the component has no `.`. Only `/` separates components,
/// whatever the archive format's native convention. The result is not
/// lowercased; see [`normalized_extension`].
///
/// # Examples
///
/// ```
/// use payloadguard_core::policy::extension_of;
///
/// assert_eq!(extension_of("dir/archive.tar.gz"), ".gz");
/// assert_eq!(extension_of("dir.d/README"), "");
/// assert_eq!(extension_of("trailing."), ".");
/// assert_eq!(extension_of(""), "");
/// ```
#[must_use]
pub fn extension_of(name: &str) -> &str {
    let component = name.rsplit('/').next().unwrap_or(name);
    component.rfind('.').map_or("", |dot| &component[dot..])
}

/// Returns the Unicode-lowercased extension of `name`, as passed to policies.
#[must_use]
pub fn normalized_extension(name: &str) -> String {
    extension_of(name).to_lowercase()
}
