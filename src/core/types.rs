//! core::types
//!
//! Strong types for the version-control entity model.
//!
//! # Types
//!
//! - [`Oid`] - Git object identifier (SHA-1 or SHA-256 hex)
//! - [`BranchName`] - Validated local branch name
//! - [`Commit`] - Immutable handle naming one point in history
//! - [`Reference`] - Named pointer with an optional short alias
//! - [`Blob`] - One file reached through a tree walk
//! - [`TreeEntry`] - A path/id pair from a tree listing
//! - [`DiffDelta`] - One path-level change between two tree states
//!
//! # Validation
//!
//! Identifiers are validated at construction time. A `Commit` can only be
//! built from a valid `Oid`, so a half-resolved commit cannot be represented.
//!
//! # Examples
//!
//! ```
//! use vcscope::core::types::{BranchName, Commit, DiffDelta, Oid};
//!
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let commit = Commit::new(oid);
//! assert_eq!(commit.short(), "abc123d");
//!
//! let delta = DiffDelta::added("b/c.txt");
//! assert_eq!(delta.old_file(), "");
//! assert_eq!(delta.new_file(), "b/c.txt");
//!
//! assert!(BranchName::new("feature/x").is_ok());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty, start with `.` or `-`, or be exactly `@`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// Names are checked before they reach a backend, so a name like
/// `--orphan` is never handed to `git` as an option.
///
/// # Example
///
/// ```
/// use vcscope::core::types::BranchName;
///
/// let name = BranchName::new("feature/my-branch").unwrap();
/// assert_eq!(name.as_str(), "feature/my-branch");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("-f").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |msg: &str| -> Result<(), TypeError> {
            Err(TypeError::InvalidBranchName(format!("{name:?}: {msg}")))
        };

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("'@' is reserved");
        }
        if name.starts_with('-') {
            return reject("cannot start with '-'");
        }
        if name.ends_with('/') {
            return reject("cannot end with '/'");
        }
        for pattern in ["..", "@{", "//"] {
            if name.contains(pattern) {
                return reject(&format!("cannot contain '{pattern}'"));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return reject(&format!("cannot contain '{c}'"));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("cannot contain control characters");
        }

        // Component rules also cover a leading '.' and a trailing ".lock"
        for component in name.split('/') {
            if component.starts_with('.') {
                return reject("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return reject("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full ref name for this branch (`refs/heads/<name>`).
    pub fn refname(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase so that equal strings always denote
/// the same object, whichever backend produced them.
///
/// # Example
///
/// ```
/// use vcscope::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// The OID is normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a full hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().trim().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters, or the full OID if shorter.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable point in history.
///
/// A `Commit` is a value, not a live handle: it holds only the resolved
/// object id and stays valid after the backend session that produced it is
/// gone. Two commits are equal iff their ids are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commit {
    id: Oid,
}

impl Commit {
    /// Wrap a resolved object id.
    pub fn new(id: Oid) -> Self {
        Self { id }
    }

    /// The commit's object id.
    pub fn id(&self) -> &Oid {
        &self.id
    }

    /// Seven-character abbreviation, for display.
    pub fn short(&self) -> &str {
        self.id.short(7)
    }
}

impl std::fmt::Display for Commit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A named pointer into history.
///
/// `name` is the full name (`refs/heads/main`, `refs/tags/v1`, or `HEAD`
/// for a detached head). `symbolic_name` is the short alias when one exists
/// (`main`). What the reference points at is never stored here: resolution
/// is always a fresh backend query.
///
/// # Example
///
/// ```
/// use vcscope::core::types::{BranchName, Reference};
///
/// let main = Reference::branch(&BranchName::new("main").unwrap());
/// assert_eq!(main.name(), "refs/heads/main");
/// assert_eq!(main.symbolic_name(), Some("main"));
/// assert!(main.is_branch());
///
/// assert!(Reference::detached_head().is_detached());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    name: String,
    symbolic_name: Option<String>,
}

impl Reference {
    /// Name of the detached head pointer.
    pub const HEAD: &'static str = "HEAD";

    /// Build a reference from its parts.
    pub fn new(name: impl Into<String>, symbolic_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            symbolic_name,
        }
    }

    /// Reference to a local branch.
    pub fn branch(branch: &BranchName) -> Self {
        Self::new(branch.refname(), Some(branch.as_str().to_string()))
    }

    /// Reference describing a detached HEAD.
    pub fn detached_head() -> Self {
        Self::new(Self::HEAD, None)
    }

    /// Full reference name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short alias, if any.
    pub fn symbolic_name(&self) -> Option<&str> {
        self.symbolic_name.as_deref()
    }

    /// Whether this names a local branch.
    pub fn is_branch(&self) -> bool {
        self.name.starts_with("refs/heads/")
    }

    /// Whether this names a detached HEAD.
    pub fn is_detached(&self) -> bool {
        self.name == Self::HEAD
    }

    /// The branch this reference names, if it is a valid local branch.
    pub fn branch_name(&self) -> Option<BranchName> {
        self.name
            .strip_prefix("refs/heads/")
            .and_then(|short| BranchName::new(short).ok())
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.symbolic_name {
            Some(alias) => write!(f, "{}", alias),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Kind of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A regular or executable file
    Blob,
    /// A symbolic link (stored as a blob holding the target path)
    Link,
    /// A directory
    Tree,
    /// A submodule commit
    Submodule,
}

impl EntryKind {
    /// Map a git file mode (`100644`, `040000`, ...) to an entry kind.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode {
            0o100644 | 0o100755 | 0o100664 => Some(EntryKind::Blob),
            0o120000 => Some(EntryKind::Link),
            0o040000 => Some(EntryKind::Tree),
            0o160000 => Some(EntryKind::Submodule),
            _ => None,
        }
    }

    /// Whether entries of this kind have blob contents.
    pub fn has_contents(&self) -> bool {
        matches!(self, EntryKind::Blob | EntryKind::Link)
    }
}

/// One entry of a tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Repository-relative, `/`-separated path
    pub path: String,
    /// Object id of the entry
    pub id: Oid,
    /// What the entry is
    pub kind: EntryKind,
}

/// A file reached through a tree walk or path lookup.
///
/// The handle remembers the commit it was reached from. It is only
/// meaningful together with that commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blob {
    commit: Oid,
    path: String,
    id: Oid,
}

impl Blob {
    /// Create a blob handle.
    pub fn new(commit: Oid, path: impl Into<String>, id: Oid) -> Self {
        Self {
            commit,
            path: path.into(),
            id,
        }
    }

    /// Commit the blob was reached from.
    pub fn commit(&self) -> &Oid {
        &self.commit
    }

    /// Repository-relative path of the file.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Content id of the file.
    pub fn id(&self) -> &Oid {
        &self.id
    }
}

/// How a path changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaStatus {
    /// Path exists only on the new side
    Added,
    /// Path exists only on the old side
    Deleted,
    /// Contents (or mode) changed in place
    Modified,
    /// Moved from `old_path` to `new_path`
    Renamed,
    /// Copied from `old_path` to `new_path`
    Copied,
    /// Changed between file, symlink and submodule
    TypeChanged,
    /// Present in the working directory but not tracked
    Untracked,
}

impl DeltaStatus {
    /// Single-letter code, as printed by `git diff --name-status`.
    pub fn code(&self) -> char {
        match self {
            DeltaStatus::Added => 'A',
            DeltaStatus::Deleted => 'D',
            DeltaStatus::Modified => 'M',
            DeltaStatus::Renamed => 'R',
            DeltaStatus::Copied => 'C',
            DeltaStatus::TypeChanged => 'T',
            DeltaStatus::Untracked => '?',
        }
    }
}

impl std::fmt::Display for DeltaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One path-level change between two tree states.
///
/// The side a path is absent from is `None`:
///
/// | status | `old_path` | `new_path` |
/// |---|---|---|
/// | added, untracked | `None` | `Some(p)` |
/// | deleted | `Some(p)` | `None` |
/// | modified, type changed | `Some(p)` | `Some(p)` |
/// | renamed, copied | `Some(a)` | `Some(b)`, `a != b` |
///
/// The constructors are the only way to build a delta, so these rows always
/// hold.
///
/// # Example
///
/// ```
/// use vcscope::core::types::{DeltaStatus, DiffDelta};
///
/// let d = DiffDelta::renamed("old.rs", "new.rs");
/// assert_eq!(d.status(), DeltaStatus::Renamed);
/// assert_eq!((d.old_file(), d.new_file()), ("old.rs", "new.rs"));
///
/// let m = DiffDelta::modified("a.txt");
/// assert_eq!(m.old_file(), m.new_file());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiffDelta {
    status: DeltaStatus,
    old_path: Option<String>,
    new_path: Option<String>,
}

impl DiffDelta {
    /// A path that only exists on the new side.
    pub fn added(path: impl Into<String>) -> Self {
        Self {
            status: DeltaStatus::Added,
            old_path: None,
            new_path: Some(path.into()),
        }
    }

    /// A path that only exists on the old side.
    pub fn deleted(path: impl Into<String>) -> Self {
        Self {
            status: DeltaStatus::Deleted,
            old_path: Some(path.into()),
            new_path: None,
        }
    }

    /// A path whose contents changed in place.
    pub fn modified(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            status: DeltaStatus::Modified,
            old_path: Some(path.clone()),
            new_path: Some(path),
        }
    }

    /// A path whose type changed (file, symlink, submodule).
    pub fn type_changed(path: impl Into<String>) -> Self {
        Self {
            status: DeltaStatus::TypeChanged,
            ..Self::modified(path)
        }
    }

    /// An untracked file in the working directory.
    pub fn untracked(path: impl Into<String>) -> Self {
        Self {
            status: DeltaStatus::Untracked,
            ..Self::added(path)
        }
    }

    /// A path moved from `old` to `new`.
    pub fn renamed(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            status: DeltaStatus::Renamed,
            old_path: Some(old.into()),
            new_path: Some(new.into()),
        }
    }

    /// A path copied from `old` to `new`.
    pub fn copied(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            status: DeltaStatus::Copied,
            ..Self::renamed(old, new)
        }
    }

    /// How the path changed.
    pub fn status(&self) -> DeltaStatus {
        self.status
    }

    /// Path on the old side, if the path existed there.
    pub fn old_path(&self) -> Option<&str> {
        self.old_path.as_deref()
    }

    /// Path on the new side, if the path exists there.
    pub fn new_path(&self) -> Option<&str> {
        self.new_path.as_deref()
    }

    /// Old path, or `""` when the path was added.
    pub fn old_file(&self) -> &str {
        self.old_path().unwrap_or("")
    }

    /// New path, or `""` when the path was deleted.
    pub fn new_file(&self) -> &str {
        self.new_path().unwrap_or("")
    }

    /// The path a caller should attribute the change to: the new path,
    /// falling back to the old one for deletions.
    pub fn path(&self) -> &str {
        self.new_path()
            .or_else(|| self.old_path())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for DiffDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.status, self.old_path(), self.new_path()) {
            (DeltaStatus::Renamed | DeltaStatus::Copied, Some(old), Some(new)) => {
                write!(f, "{}\t{} -> {}", self.status, old, new)
            }
            _ => write!(f, "{}\t{}", self.status, self.path()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "abc123def4567890abc123def4567890abc12345";

    mod branch_name {
        use super::*;

        #[test]
        fn valid_branch_names() {
            assert!(BranchName::new("main").is_ok());
            assert!(BranchName::new("feature/foo").is_ok());
            assert!(BranchName::new("user@feature").is_ok());
            assert!(BranchName::new("with.dot").is_ok());
        }

        #[test]
        fn option_like_names_rejected() {
            assert!(BranchName::new("-b").is_err());
            assert!(BranchName::new("--orphan").is_err());
        }

        #[test]
        fn refname_rules_enforced() {
            assert!(BranchName::new("").is_err());
            assert!(BranchName::new("@").is_err());
            assert!(BranchName::new(".hidden").is_err());
            assert!(BranchName::new("foo/.hidden").is_err());
            assert!(BranchName::new("branch.lock").is_err());
            assert!(BranchName::new("branch/").is_err());
            assert!(BranchName::new("bad..path").is_err());
            assert!(BranchName::new("foo@{1}").is_err());
            assert!(BranchName::new("foo//bar").is_err());
            assert!(BranchName::new("has space").is_err());
            assert!(BranchName::new("has\ttab").is_err());
        }

        #[test]
        fn refname() {
            let name = BranchName::new("feature/foo").unwrap();
            assert_eq!(name.refname(), "refs/heads/feature/foo");
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn valid_sha1_and_sha256() {
            assert!(Oid::new(SHA).is_ok());
            assert!(Oid::new("a".repeat(64)).is_ok());
        }

        #[test]
        fn normalizes_case_and_whitespace() {
            let oid = Oid::new(format!("{}\n", SHA.to_uppercase())).unwrap();
            assert_eq!(oid.as_str(), SHA);
        }

        #[test]
        fn abbreviated_rejected() {
            assert!(Oid::new("abc123").is_err());
            assert!(Oid::new("").is_err());
        }

        #[test]
        fn non_hex_rejected() {
            assert!(Oid::new("xyz123def4567890abc123def4567890abc12345").is_err());
        }

        #[test]
        fn ordering_is_lexicographic() {
            let a = Oid::new("1".repeat(40)).unwrap();
            let b = Oid::new("a".repeat(40)).unwrap();
            assert!(a < b);
        }
    }

    mod commit {
        use super::*;

        #[test]
        fn identity_is_the_id() {
            let a = Commit::new(Oid::new(SHA).unwrap());
            let b = Commit::new(Oid::new(SHA.to_uppercase()).unwrap());
            assert_eq!(a, b);
            assert_eq!(a.to_string(), SHA);
            assert_eq!(a.short(), "abc123d");
        }

        #[test]
        fn serializes_as_plain_string() {
            let c = Commit::new(Oid::new(SHA).unwrap());
            assert_eq!(serde_json::to_string(&c).unwrap(), format!("\"{SHA}\""));
        }
    }

    mod reference {
        use super::*;

        #[test]
        fn branch_reference() {
            let r = Reference::branch(&BranchName::new("main").unwrap());
            assert!(r.is_branch());
            assert!(!r.is_detached());
            assert_eq!(r.branch_name().unwrap().as_str(), "main");
            assert_eq!(r.to_string(), "main");
        }

        #[test]
        fn detached_reference() {
            let r = Reference::detached_head();
            assert!(r.is_detached());
            assert!(r.branch_name().is_none());
            assert_eq!(r.to_string(), "HEAD");
        }

        #[test]
        fn tag_reference_is_not_a_branch() {
            let r = Reference::new("refs/tags/v1.0", Some("v1.0".into()));
            assert!(!r.is_branch());
            assert!(r.branch_name().is_none());
        }
    }

    mod entry_kind {
        use super::*;

        #[test]
        fn modes() {
            assert_eq!(EntryKind::from_mode(0o100644), Some(EntryKind::Blob));
            assert_eq!(EntryKind::from_mode(0o100755), Some(EntryKind::Blob));
            assert_eq!(EntryKind::from_mode(0o120000), Some(EntryKind::Link));
            assert_eq!(EntryKind::from_mode(0o040000), Some(EntryKind::Tree));
            assert_eq!(EntryKind::from_mode(0o160000), Some(EntryKind::Submodule));
            assert_eq!(EntryKind::from_mode(0o777), None);
        }

        #[test]
        fn contents() {
            assert!(EntryKind::Blob.has_contents());
            assert!(EntryKind::Link.has_contents());
            assert!(!EntryKind::Tree.has_contents());
            assert!(!EntryKind::Submodule.has_contents());
        }
    }

    mod diff_delta {
        use super::*;

        #[test]
        fn added_has_no_old_side() {
            let d = DiffDelta::added("b/c.txt");
            assert_eq!(d.old_path(), None);
            assert_eq!(d.old_file(), "");
            assert_eq!(d.path(), "b/c.txt");
        }

        #[test]
        fn deleted_has_no_new_side() {
            let d = DiffDelta::deleted("gone.txt");
            assert_eq!(d.new_path(), None);
            assert_eq!(d.new_file(), "");
            assert_eq!(d.path(), "gone.txt");
        }

        #[test]
        fn modified_has_equal_sides() {
            let d = DiffDelta::modified("a.txt");
            assert_eq!(d.old_file(), d.new_file());
            assert_eq!(d.path(), "a.txt");
        }

        #[test]
        fn untracked_looks_like_an_add() {
            let d = DiffDelta::untracked("new/file.rs");
            assert_eq!(d.status(), DeltaStatus::Untracked);
            assert_eq!(d.old_path(), None);
        }

        #[test]
        fn display() {
            assert_eq!(DiffDelta::added("a").to_string(), "A\ta");
            assert_eq!(DiffDelta::renamed("a", "b").to_string(), "R\ta -> b");
            assert_eq!(DiffDelta::untracked("n").to_string(), "?\tn");
        }
    }
}
