//! File and directory operations over whole paths.
//!
//! Every operation takes an absolute-style path, resolves it through the
//! directory tree, and flushes all modified inodes before returning.

use arrayvec::ArrayVec;
use zerocopy::AsBytes;

use super::inode::{Dirent, InodeType, DIRENT_SIZE};
use super::path::{FileName, Path};
use super::FileSystem;
use crate::block::BlockDevice;
use crate::error::{FsError, Result};
use crate::param::{BSIZE, MAXLIST, NDIRECT, ROOTINO};

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_directory: bool,
    pub size: u32,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Create an empty directory at `path`. The parent gains an entry and
    /// one link (the new child's `..`).
    pub fn create_directory(&mut self, path: &str) -> Result<()> {
        let path = Path::new(path);
        if self.resolve(path).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        let (parent_inum, leaf) = self.split(path)?;
        let mut parent = self.iget(parent_inum)?;
        if !parent.is_dir() {
            return Err(FsError::NotADirectory);
        }

        let inum = self.ialloc(InodeType::Dir)?;
        if let Err(e) = self.init_directory(inum, parent_inum) {
            self.destroy_inode(inum);
            return Err(e);
        }
        if let Err(e) = self.dirlink(&mut parent, leaf, inum) {
            self.destroy_inode(inum);
            return Err(e);
        }
        parent.dinode.nlink += 1;
        self.iput(&parent)
    }

    /// Create a regular file at `path`, optionally with initial content.
    pub fn create_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let path = Path::new(path);
        if self.resolve(path).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        let (parent_inum, leaf) = self.split(path)?;
        let mut parent = self.iget(parent_inum)?;
        if !parent.is_dir() {
            return Err(FsError::NotADirectory);
        }

        let inum = self.ialloc(InodeType::File)?;
        if let Err(e) = self.init_file(inum, content) {
            self.destroy_inode(inum);
            return Err(e);
        }
        if let Err(e) = self.dirlink(&mut parent, leaf, inum) {
            self.destroy_inode(inum);
            return Err(e);
        }
        self.iput(&parent)
    }

    /// Replace the contents of the file at `path`, truncating first.
    pub fn write_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let inum = self.resolve(Path::new(path))?;
        let mut ip = self.iget(inum)?;
        if !ip.is_file() {
            return Err(FsError::NotAFile);
        }

        // Drop blocks past the new end, then logically truncate and
        // rewrite from offset zero.
        let keep = (content.len() + BSIZE - 1) / BSIZE;
        for i in keep..NDIRECT {
            let addr = ip.dinode.addrs[i];
            if addr != 0 {
                self.bfree(addr)?;
                ip.dinode.addrs[i] = 0;
            }
        }
        ip.dinode.size = 0;
        self.writei(&mut ip, content, 0)?;
        self.iput(&ip)
    }

    /// The full contents of the file at `path`.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let inum = self.resolve(Path::new(path))?;
        let ip = self.iget(inum)?;
        if !ip.is_file() {
            return Err(FsError::NotAFile);
        }
        let mut buf = vec![0u8; ip.size() as usize];
        let n = self.readi(&ip, &mut buf, 0)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// List the directory at `path` in entry order, skipping `.`, `..`
    /// and unused slots. At most [`MAXLIST`] entries are returned.
    pub fn list_directory(&mut self, path: &str) -> Result<ArrayVec<DirEntry, MAXLIST>> {
        let inum = self.resolve(Path::new(path))?;
        let ip = self.iget(inum)?;
        if !ip.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let data = self.read_dir(&ip)?;
        let mut out = ArrayVec::new();
        for chunk in data.chunks_exact(DIRENT_SIZE) {
            if out.is_full() {
                break;
            }
            let de = Dirent::read_at(chunk);
            if de.inum == 0 {
                continue;
            }
            match de.name() {
                b"." | b".." => continue,
                name => {
                    let entry = self.iget(de.inum as u32)?;
                    out.push(DirEntry {
                        name: String::from_utf8_lossy(name).into_owned(),
                        is_directory: entry.is_dir(),
                        size: entry.size(),
                    });
                }
            }
        }
        Ok(out)
    }

    /// Delete the regular file at `path`: free its data blocks and inode
    /// and clear the parent's entry.
    pub fn delete_file(&mut self, path: &str) -> Result<()> {
        let path = Path::new(path);
        let inum = self.resolve(path)?;
        let ip = self.iget(inum)?;
        if !ip.is_file() {
            return Err(FsError::NotAFile);
        }
        let (parent_inum, leaf) = self.split(path)?;
        let mut parent = self.iget(parent_inum)?;

        for addr in ip.dinode.addrs {
            if addr != 0 {
                self.bfree(addr)?;
            }
        }
        self.ifree(inum)?;
        self.dirunlink(&mut parent, leaf)?;
        self.iput(&parent)
    }

    /// Delete the directory at `path`. It must hold nothing but `.` and
    /// `..`; the root can never be deleted.
    pub fn delete_directory(&mut self, path: &str) -> Result<()> {
        let path = Path::new(path);
        if path.as_str() == "/" {
            return Err(FsError::NotEmpty);
        }
        let inum = self.resolve(path)?;
        if inum == ROOTINO {
            return Err(FsError::NotEmpty);
        }
        let ip = self.iget(inum)?;
        if !ip.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let data = self.read_dir(&ip)?;
        let live = data
            .chunks_exact(DIRENT_SIZE)
            .filter(|chunk| Dirent::read_at(chunk).inum != 0)
            .count();
        if live > 2 {
            return Err(FsError::NotEmpty);
        }
        let (parent_inum, leaf) = self.split(path)?;
        let mut parent = self.iget(parent_inum)?;

        for addr in ip.dinode.addrs {
            if addr != 0 {
                self.bfree(addr)?;
            }
        }
        self.ifree(inum)?;
        self.dirunlink(&mut parent, leaf)?;
        // The child's `..` link goes away with it.
        parent.dinode.nlink -= 1;
        self.iput(&parent)
    }

    /// Make `path` the current directory.
    pub fn change_directory(&mut self, path: &str) -> Result<()> {
        let inum = self.resolve(Path::new(path))?;
        if !self.iget(inum)?.is_dir() {
            return Err(FsError::NotADirectory);
        }
        self.cwd.clear();
        self.cwd.push_str(path);
        Ok(())
    }

    /// The current directory path, initially `/`.
    pub fn current_path(&self) -> &str {
        &self.cwd
    }

    /// Write a fresh directory's own body: `.`, `..`, and two links.
    pub(crate) fn init_directory(&mut self, inum: u32, parent_inum: u32) -> Result<()> {
        let mut ip = self.iget(inum)?;
        let dot = Dirent::new(inum as u16, FileName::new("."));
        let dotdot = Dirent::new(parent_inum as u16, FileName::new(".."));
        let mut body = [0u8; 2 * DIRENT_SIZE];
        body[..DIRENT_SIZE].copy_from_slice(dot.as_bytes());
        body[DIRENT_SIZE..].copy_from_slice(dotdot.as_bytes());
        self.writei(&mut ip, &body, 0)?;
        ip.dinode.nlink = 2;
        self.iput(&ip)
    }

    /// Write a fresh file's initial content and single link.
    fn init_file(&mut self, inum: u32, content: &[u8]) -> Result<()> {
        let mut ip = self.iget(inum)?;
        if !content.is_empty() {
            self.writei(&mut ip, content, 0)?;
        }
        ip.dinode.nlink = 1;
        self.iput(&ip)
    }

    /// Free an inode together with whatever blocks its on-disk record
    /// holds. Backs out of half-built create operations; the primary
    /// error is the one worth surfacing, so failures here are dropped.
    fn destroy_inode(&mut self, inum: u32) {
        if let Ok(ip) = self.iget(inum) {
            for addr in ip.dinode.addrs {
                if addr != 0 {
                    let _ = self.bfree(addr);
                }
            }
        }
        let _ = self.ifree(inum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::RamDisk;

    fn testfs() -> FileSystem<RamDisk> {
        FileSystem::format(RamDisk::new()).unwrap()
    }

    #[test]
    fn fresh_root_lists_empty() {
        let mut fs = testfs();
        assert!(fs.list_directory("/").unwrap().is_empty());
    }

    #[test]
    fn mkdir_shows_up_in_listing() {
        let mut fs = testfs();
        fs.create_directory("/home").unwrap();
        let entries = fs.list_directory("/").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "home");
        assert!(entries[0].is_directory);
        assert_eq!(entries[0].size as usize, 2 * DIRENT_SIZE);
    }

    #[test]
    fn child_directory_links_to_parent() {
        let mut fs = testfs();
        fs.create_directory("/home").unwrap();
        let root = fs.iget(ROOTINO).unwrap();
        let child = fs.dirlookup(&root, FileName::new("home")).unwrap().unwrap();

        let ip = fs.iget(child).unwrap();
        assert_eq!(ip.nlink(), 2);
        assert_eq!(fs.dirlookup(&ip, FileName::new(".")).unwrap(), Some(child));
        assert_eq!(
            fs.dirlookup(&ip, FileName::new("..")).unwrap(),
            Some(ROOTINO)
        );
        // Parent picked up the `..` back-link.
        assert_eq!(fs.iget(ROOTINO).unwrap().nlink(), 3);
    }

    #[test]
    fn create_then_read_is_empty() {
        let mut fs = testfs();
        fs.create_file("/a.txt", b"").unwrap();
        assert_eq!(fs.read_file("/a.txt").unwrap(), b"");
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut fs = testfs();
        fs.create_file("/a.txt", b"").unwrap();
        fs.write_file("/a.txt", b"hello").unwrap();
        assert_eq!(fs.read_file("/a.txt").unwrap(), b"hello");

        let entries = fs.list_directory("/").unwrap();
        assert_eq!(entries[0].name, "a.txt");
        assert!(!entries[0].is_directory);
        assert_eq!(entries[0].size, 5);
    }

    #[test]
    fn duplicate_create_fails_and_leaves_state() {
        let mut fs = testfs();
        fs.create_file("/a.txt", b"first").unwrap();
        assert_eq!(
            fs.create_file("/a.txt", b"second").unwrap_err(),
            FsError::AlreadyExists
        );
        assert_eq!(fs.read_file("/a.txt").unwrap(), b"first");
        assert_eq!(fs.list_directory("/").unwrap().len(), 1);

        fs.create_directory("/d").unwrap();
        assert_eq!(
            fs.create_directory("/d").unwrap_err(),
            FsError::AlreadyExists
        );
    }

    #[test]
    fn nested_paths_resolve() {
        let mut fs = testfs();
        fs.create_directory("/home").unwrap();
        fs.create_directory("/home/u").unwrap();
        fs.create_file("/home/u/x", b"ok").unwrap();
        assert_eq!(fs.read_file("/home/u/x").unwrap(), b"ok");

        let entries = fs.list_directory("/home").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "u");
    }

    #[test]
    fn truncating_write_frees_tail_blocks() {
        let mut fs = testfs();
        fs.create_file("/f", &[7u8; 1000]).unwrap();
        let inum = fs.resolve(Path::new("/f")).unwrap();
        let before = fs.iget(inum).unwrap();
        let tail = before.dinode.addrs[1];
        assert_ne!(tail, 0);

        fs.write_file("/f", b"tiny!").unwrap();
        let after = fs.iget(before.inum).unwrap();
        assert_eq!(after.size(), 5);
        assert_eq!(after.dinode.addrs[1], 0);
        assert_eq!(fs.read_file("/f").unwrap(), b"tiny!");
        // The tail block is allocatable again.
        assert_eq!(fs.balloc().unwrap(), tail);
    }

    #[test]
    fn write_file_boundaries() {
        let mut fs = testfs();
        fs.create_file("/max", b"").unwrap();
        fs.write_file("/max", &[1u8; NDIRECT * BSIZE]).unwrap();
        assert_eq!(fs.read_file("/max").unwrap().len(), NDIRECT * BSIZE);
        assert_eq!(
            fs.write_file("/max", &[1u8; NDIRECT * BSIZE + 1]).unwrap_err(),
            FsError::NoSpaceBlocks
        );
    }

    #[test]
    fn delete_file_clears_entry_and_frees_storage() {
        let mut fs = testfs();
        fs.create_file("/f", &[3u8; 600]).unwrap();
        let inum = fs.resolve(Path::new("/f")).unwrap();
        let blocks: Vec<u32> = fs
            .iget(inum)
            .unwrap()
            .dinode
            .addrs
            .iter()
            .copied()
            .filter(|a| *a != 0)
            .collect();
        assert_eq!(blocks.len(), 2);

        fs.delete_file("/f").unwrap();
        assert!(fs.list_directory("/").unwrap().is_empty());
        assert_eq!(
            fs.read_file("/f").unwrap_err(),
            FsError::NotFound
        );
        assert_eq!(fs.iget(inum).unwrap().typ(), InodeType::Free);
        // Both data blocks are the first fits again.
        assert_eq!(fs.balloc().unwrap(), blocks[0]);
        assert_eq!(fs.balloc().unwrap(), blocks[1]);

        // The name can be created anew.
        fs.create_file("/f", b"again").unwrap();
        assert_eq!(fs.read_file("/f").unwrap(), b"again");
    }

    #[test]
    fn delete_directory_requires_empty() {
        let mut fs = testfs();
        fs.create_directory("/d").unwrap();
        fs.create_file("/d/child", b"").unwrap();
        assert_eq!(fs.delete_directory("/d").unwrap_err(), FsError::NotEmpty);

        fs.delete_file("/d/child").unwrap();
        fs.delete_directory("/d").unwrap();
        assert!(fs.list_directory("/").unwrap().is_empty());
        assert_eq!(fs.iget(ROOTINO).unwrap().nlink(), 2);
    }

    #[test]
    fn deleting_the_root_is_refused() {
        let mut fs = testfs();
        assert_eq!(fs.delete_directory("/").unwrap_err(), FsError::NotEmpty);
    }

    #[test]
    fn type_mismatches_are_rejected() {
        let mut fs = testfs();
        fs.create_directory("/d").unwrap();
        fs.create_file("/f", b"").unwrap();
        assert_eq!(fs.read_file("/d").unwrap_err(), FsError::NotAFile);
        assert_eq!(fs.write_file("/d", b"x").unwrap_err(), FsError::NotAFile);
        assert_eq!(fs.delete_file("/d").unwrap_err(), FsError::NotAFile);
        assert_eq!(
            fs.list_directory("/f").unwrap_err(),
            FsError::NotADirectory
        );
        assert_eq!(
            fs.delete_directory("/f").unwrap_err(),
            FsError::NotADirectory
        );
        assert_eq!(
            fs.create_file("/f/x", b"").unwrap_err(),
            FsError::NotADirectory
        );
    }

    #[test]
    fn dot_dot_resolves_through_the_parent_entry() {
        let mut fs = testfs();
        fs.create_directory("/a").unwrap();
        fs.create_directory("/b").unwrap();
        fs.create_file("/b/x", b"via parent").unwrap();
        assert_eq!(fs.read_file("/a/../b/x").unwrap(), b"via parent");
        assert_eq!(
            fs.resolve(Path::new("/a/./../b")).unwrap(),
            fs.resolve(Path::new("/b")).unwrap()
        );
        // Root's `..` is itself.
        assert_eq!(fs.resolve(Path::new("/..")).unwrap(), ROOTINO);
    }

    #[test]
    fn change_directory_tracks_path() {
        let mut fs = testfs();
        assert_eq!(fs.current_path(), "/");
        fs.create_directory("/home").unwrap();
        fs.change_directory("/home").unwrap();
        assert_eq!(fs.current_path(), "/home");
        assert_eq!(
            fs.change_directory("/nope").unwrap_err(),
            FsError::NotFound
        );
        assert_eq!(fs.current_path(), "/home");
    }

    #[test]
    fn listing_caps_at_fifty_entries() {
        let mut fs = testfs();
        // 63 free inodes allow more files than the listing returns.
        for i in 0..60 {
            fs.create_file(&format!("/f{i}"), b"").unwrap();
        }
        assert_eq!(fs.list_directory("/").unwrap().len(), MAXLIST);
    }
}
