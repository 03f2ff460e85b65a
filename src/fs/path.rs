//! Paths.
//!
//! A path is a `/`-separated sequence of file names. The resolver walks
//! directory entries starting from the root: `.` keeps the current
//! directory and `..` is resolved through the directory's own `..` entry,
//! so `/a/../b` lands where it should.

use super::FileSystem;
use crate::block::BlockDevice;
use crate::error::{FsError, Result};
use crate::param::{DIRSIZ, ROOTINO};

/// A single path component in its stored form.
#[derive(Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct FileName {
    // Invariant: at most DIRSIZ - 1 bytes.
    inner: str,
}

impl FileName {
    /// Truncate `name` to the storable length, `DIRSIZ - 1` bytes.
    /// `name` must not contain `/`.
    pub fn new(name: &str) -> &FileName {
        debug_assert!(!name.contains('/'));
        let mut end = name.len().min(DIRSIZ - 1);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        // SAFETY: `&FileName` is layout-compatible with `str` because of
        // its attribute `#[repr(transparent)]`.
        unsafe { &*(&name[..end] as *const str as *const FileName) }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }
}

/// A borrowed slash-separated path.
#[derive(Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct Path {
    inner: str,
}

impl Path {
    pub fn new(path: &str) -> &Path {
        // SAFETY: `&Path` is layout-compatible with `str` because of its
        // attribute `#[repr(transparent)]`.
        unsafe { &*(path as *const str as *const Path) }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Returns `Some((rest, name))` where `name` is the next path element
    /// and `rest` is the remainder with no leading slashes, or `None` when
    /// no element remains.
    ///
    /// `skipelem("a/bb/c")` is `("bb/c", "a")`; `skipelem("///a//bb")` is
    /// `("bb", "a")`; `skipelem("a")` is `("", "a")`; `skipelem("")` and
    /// `skipelem("////")` are `None`.
    fn skipelem(&self) -> Option<(&Path, &str)> {
        let s = self.inner.trim_start_matches('/');
        if s.is_empty() {
            return None;
        }
        let (name, rest) = s.split_once('/').unwrap_or((s, ""));
        Some((Path::new(rest.trim_start_matches('/')), name))
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// Translate `path` to an inode number by walking directory entries
    /// from the root.
    ///
    /// A leading `/` is optional: a path without one is still resolved
    /// root-relative. Callers (the shell) compose absolute paths before
    /// calling, so the distinction never shows.
    pub fn resolve(&mut self, path: &Path) -> Result<u32> {
        if path.as_str().is_empty() {
            return Err(FsError::NotFound);
        }
        let mut inum = ROOTINO;
        let mut rest = path;
        while let Some((next, name)) = rest.skipelem() {
            rest = next;
            if name == "." {
                continue;
            }
            let ip = self.iget(inum)?;
            if !ip.is_dir() {
                return Err(FsError::NotADirectory);
            }
            // ".." needs no special case: every directory stores its
            // parent as an ordinary entry.
            inum = self
                .dirlookup(&ip, FileName::new(name))?
                .ok_or(FsError::NotFound)?;
        }
        Ok(inum)
    }

    /// Split `path` into its parent directory's inode number and the leaf
    /// name. A name without any slash is taken relative to the root.
    pub fn split<'p>(&mut self, path: &'p Path) -> Result<(u32, &'p FileName)> {
        let s = path.as_str();
        let (parent, leaf) = match s.rfind('/') {
            None => (ROOTINO, s),
            Some(i) => {
                let prefix = &s[..i];
                let parent = if prefix.is_empty() {
                    ROOTINO
                } else {
                    self.resolve(Path::new(prefix))?
                };
                (parent, &s[i + 1..])
            }
        };
        if leaf.is_empty() {
            return Err(FsError::NotFound);
        }
        Ok((parent, FileName::new(leaf)))
    }
}
