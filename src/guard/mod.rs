//! Containment guard for untrusted relative paths.
//!
//! [`PathGuard::check`] layers four steps and every `Allowed` result has passed
//! all of them:
//!
//! 1. sanitize: trim, bound, percent-decode exactly once, reject NUL
//! 2. lexical join of root and input with `.`/`..` collapsed
//! 3. segment-aware containment of the lexical candidate
//! 4. real-path resolution (symlinks followed) and containment re-checked
//!    against the canonical root
//!
//! The guard holds no mutable state. The only side effects are the
//! filesystem queries of step 4.

pub mod lexical;
pub mod sanitize;

use anyhow::Context;
use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use lexical::{is_contained, lexical_candidate};
pub use sanitize::{sanitize, DEFAULT_MAX_INPUT_LEN};

/// Why a request was refused. Carries no path text so it can be shown to
/// untrusted callers as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Reason {
    #[error("invalid input")]
    InvalidInput,
    #[error("path traversal detected")]
    Traversal,
    #[error("file not found")]
    NotFound,
    #[error("i/o error")]
    OtherIoError,
}

impl Reason {
    pub fn code(&self) -> &'static str {
        match self {
            Reason::InvalidInput => "InvalidInput",
            Reason::Traversal => "Traversal",
            Reason::NotFound => "NotFound",
            Reason::OtherIoError => "OtherIoError",
        }
    }

    fn from_resolve(err: &io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound | ErrorKind::NotADirectory => Reason::NotFound,
            _ => Reason::OtherIoError,
        }
    }
}

pub type GuardResult = Result<ResolvedPath, Reason>;

/// Operator-configured base directory, fully resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedRoot(PathBuf);

impl TrustedRoot {
    /// Resolves an existing directory.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let canonical = dunce::canonicalize(path)
            .with_context(|| format!("resolving root {}", path.display()))?;
        if !canonical.is_dir() {
            anyhow::bail!("root is not a directory: {}", canonical.display());
        }
        Ok(Self(canonical))
    }

    /// Creates the directory (and parents) when absent, then resolves it.
    pub fn create(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating root {}", path.display()))?;
        Self::open(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// A real filesystem path proven to lie under a [`TrustedRoot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// Path below `root` with `/` separators; empty for the root itself.
    pub fn relative_to(&self, root: &TrustedRoot) -> String {
        self.0
            .strip_prefix(root.as_path())
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }

    /// Opens the resolved path for reading and checks through the handle that
    /// it is a regular file.
    ///
    /// The path is already free of symlinks, which narrows but does not close
    /// the window between check and use.
    pub fn open(&self) -> Result<File, Reason> {
        let file = File::open(&self.0).map_err(|e| Reason::from_resolve(&e))?;
        let meta = file.metadata().map_err(|_| Reason::OtherIoError)?;
        if !meta.is_file() {
            return Err(Reason::NotFound);
        }
        Ok(file)
    }
}

/// Stateless checker bound to one root.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: TrustedRoot,
    max_input_len: usize,
}

impl PathGuard {
    pub fn new(root: TrustedRoot) -> Self {
        Self { root, max_input_len: DEFAULT_MAX_INPUT_LEN }
    }

    pub fn with_max_input_len(mut self, max_input_len: usize) -> Self {
        self.max_input_len = max_input_len;
        self
    }

    pub fn root(&self) -> &TrustedRoot {
        &self.root
    }

    pub fn check(&self, input: &str) -> GuardResult {
        let result = self.evaluate(input);
        if let Err(reason) = &result {
            tracing::debug!(code = reason.code(), "path rejected");
        }
        result
    }

    fn evaluate(&self, input: &str) -> GuardResult {
        let root = self.root.as_path();
        let decoded = sanitize(input, self.max_input_len)?;
        let candidate = lexical_candidate(root, &decoded)?;
        if !is_contained(root, &candidate) {
            return Err(Reason::Traversal);
        }
        let real = dunce::canonicalize(&candidate).map_err(|e| Reason::from_resolve(&e))?;
        if !is_contained(root, &real) {
            return Err(Reason::Traversal);
        }
        Ok(ResolvedPath(real))
    }
}

/// One-shot check with the default input limit.
pub fn check(root: &TrustedRoot, input: &str) -> GuardResult {
    PathGuard::new(root.clone()).check(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn setup() -> (TempDir, PathGuard) {
        let tmp = TempDir::new().unwrap();
        let base = tmp.child("base");
        base.child("hello.txt").write_str("Hello from safe file!\n").unwrap();
        base.child("notes/readme.md").write_str("hi").unwrap();
        tmp.child("base-evil/secret").write_str("nope").unwrap();
        tmp.child("outside.txt").write_str("outside").unwrap();
        let guard = PathGuard::new(TrustedRoot::open(base.path()).unwrap());
        (tmp, guard)
    }

    #[test]
    fn allows_file_under_root() {
        let (_tmp, guard) = setup();
        let resolved = guard.check("notes/readme.md").unwrap();
        assert_eq!(resolved.as_path(), guard.root().as_path().join("notes/readme.md"));
        assert_eq!(std::fs::read_to_string(resolved.as_path()).unwrap(), "hi");
        assert_eq!(resolved.relative_to(guard.root()), "notes/readme.md");
    }

    #[test]
    fn traversal_rejected() {
        let (_tmp, guard) = setup();
        assert_eq!(guard.check("../../etc/passwd"), Err(Reason::Traversal));
        assert_eq!(guard.check("../outside.txt"), Err(Reason::Traversal));
        assert_eq!(guard.check(".."), Err(Reason::Traversal));
        assert_eq!(guard.check("..%2f..%2fetc%2fpasswd"), Err(Reason::Traversal));
        assert_eq!(guard.check("%2e%2e/outside.txt"), Err(Reason::Traversal));
        assert_eq!(guard.check("..\\outside.txt"), Err(Reason::Traversal));
    }

    #[test]
    fn sibling_with_shared_prefix_rejected() {
        let (_tmp, guard) = setup();
        assert_eq!(guard.check("../base-evil/secret"), Err(Reason::Traversal));
    }

    #[test]
    fn absolute_input_stays_under_root() {
        let (_tmp, guard) = setup();
        assert_eq!(guard.check("/etc/passwd"), Err(Reason::NotFound));
        let resolved = guard.check("/hello.txt").unwrap();
        assert_eq!(resolved.relative_to(guard.root()), "hello.txt");
    }

    #[test]
    fn dot_resolves_to_root_but_is_not_openable() {
        let (_tmp, guard) = setup();
        let resolved = guard.check(".").unwrap();
        assert_eq!(resolved.as_path(), guard.root().as_path());
        assert_eq!(resolved.relative_to(guard.root()), "");
        assert_eq!(resolved.open().err(), Some(Reason::NotFound));
    }

    #[test]
    fn trailing_separator_on_directory() {
        let (_tmp, guard) = setup();
        let resolved = guard.check("notes/").unwrap();
        assert_eq!(resolved.relative_to(guard.root()), "notes");
    }

    #[test]
    fn missing_and_invalid() {
        let (_tmp, guard) = setup();
        assert_eq!(guard.check("nope.txt"), Err(Reason::NotFound));
        assert_eq!(guard.check("hello.txt/child"), Err(Reason::NotFound));
        assert_eq!(guard.check("\0etc"), Err(Reason::InvalidInput));
        assert_eq!(guard.check(""), Err(Reason::InvalidInput));
        assert_eq!(guard.check("%zz"), Err(Reason::InvalidInput));
    }

    #[test]
    fn double_encoding_is_literal() {
        let (_tmp, guard) = setup();
        assert_eq!(guard.check("%252e%252e%252foutside.txt"), Err(Reason::NotFound));
        std::fs::write(guard.root().as_path().join("%2e%2e"), "literal").unwrap();
        let resolved = guard.check("%252e%252e").unwrap();
        assert_eq!(resolved.relative_to(guard.root()), "%2e%2e");
    }

    #[test]
    fn input_limit_is_configurable() {
        let (_tmp, guard) = setup();
        let guard = guard.with_max_input_len(4);
        assert_eq!(guard.check("hello.txt"), Err(Reason::InvalidInput));
    }

    #[test]
    fn free_function_matches_guard() {
        let (_tmp, guard) = setup();
        assert_eq!(check(guard.root(), "hello.txt"), guard.check("hello.txt"));
    }

    #[test]
    fn root_must_be_directory() {
        let (tmp, _guard) = setup();
        assert!(TrustedRoot::open(tmp.child("outside.txt").path()).is_err());
        assert!(TrustedRoot::open(tmp.child("absent").path()).is_err());
        let created = TrustedRoot::create(tmp.child("fresh/nested").path()).unwrap();
        assert!(created.as_path().is_dir());
    }

    #[cfg(unix)]
    mod symlinks {
        use super::*;
        use std::os::unix::fs::symlink;

        #[test]
        fn link_pointing_outside_rejected() {
            let (tmp, guard) = setup();
            let link = guard.root().as_path().join("escape");
            symlink(tmp.child("outside.txt").path(), &link).unwrap();
            assert_eq!(guard.check("escape"), Err(Reason::Traversal));
        }

        #[test]
        fn directory_link_pointing_outside_rejected() {
            let (tmp, guard) = setup();
            symlink(tmp.child("base-evil").path(), guard.root().as_path().join("evil")).unwrap();
            assert_eq!(guard.check("evil/secret"), Err(Reason::Traversal));
        }

        #[test]
        fn link_chain_inside_root_allowed() {
            let (_tmp, guard) = setup();
            let root = guard.root().as_path();
            symlink(root.join("hello.txt"), root.join("a")).unwrap();
            symlink(root.join("a"), root.join("b")).unwrap();
            symlink(root.join("b"), root.join("notes/c")).unwrap();
            let resolved = guard.check("notes/c").unwrap();
            assert_eq!(resolved.relative_to(guard.root()), "hello.txt");
        }

        #[test]
        fn link_cycle_terminates() {
            let (_tmp, guard) = setup();
            let root = guard.root().as_path();
            symlink(root.join("loop-b"), root.join("loop-a")).unwrap();
            symlink(root.join("loop-a"), root.join("loop-b")).unwrap();
            assert_eq!(guard.check("loop-a"), Err(Reason::OtherIoError));
        }

        #[test]
        fn dangling_link_is_not_found() {
            let (tmp, guard) = setup();
            symlink(tmp.child("gone").path(), guard.root().as_path().join("dangling")).unwrap();
            assert_eq!(guard.check("dangling"), Err(Reason::NotFound));
        }

        #[test]
        fn symlinked_root_is_resolved() {
            let (tmp, _guard) = setup();
            let alias = tmp.child("alias");
            symlink(tmp.child("base").path(), alias.path()).unwrap();
            let guard = PathGuard::new(TrustedRoot::open(alias.path()).unwrap());
            assert_eq!(guard.root().as_path(), dunce::canonicalize(tmp.child("base").path()).unwrap());
            assert!(guard.check("hello.txt").is_ok());
        }
    }
}
