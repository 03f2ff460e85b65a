//! End-to-end scenarios through the public surface.

use rufs::fs::path::Path;
use rufs::fs::{FileName, DIRENT_SIZE, FSMAGIC};
use rufs::param::{BSIZE, MAXFILE, NDIRECT, NINODES, ROOTINO};
use rufs::{FileSystem, FsError, RamDisk, Shell};

fn testfs() -> FileSystem<RamDisk> {
    FileSystem::format(RamDisk::new()).unwrap()
}

#[test]
fn scenario_format_and_root() {
    let mut fs = testfs();
    assert_eq!(fs.superblock().magic, FSMAGIC);

    let root = fs.iget(ROOTINO).unwrap();
    assert!(root.is_dir());
    assert_eq!(root.nlink(), 2);
    assert_eq!(root.size() as usize, 2 * DIRENT_SIZE);
    assert!(fs.list_directory("/").unwrap().is_empty());
}

#[test]
fn scenario_mkdir_and_ls() {
    let mut fs = testfs();
    fs.create_directory("/home").unwrap();

    let entries = fs.list_directory("/").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "home");
    assert!(entries[0].is_directory);
    assert_eq!(entries[0].size, 32);
}

#[test]
fn scenario_write_and_read_back() {
    let mut fs = testfs();
    fs.create_file("/a.txt", b"").unwrap();
    fs.write_file("/a.txt", b"hello").unwrap();
    assert_eq!(fs.read_file("/a.txt").unwrap(), b"hello");

    let entries = fs.list_directory("/").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "a.txt");
    assert!(!entries[0].is_directory);
    assert_eq!(entries[0].size, 5);
}

#[test]
fn scenario_truncate_shorter() {
    let mut fs = testfs();
    fs.create_file("/f", &[0xaau8; 1000]).unwrap();
    fs.write_file("/f", b"12345").unwrap();

    let inum = fs.resolve(Path::new("/f")).unwrap();
    assert_eq!(fs.iget(inum).unwrap().size(), 5);
    assert_eq!(fs.read_file("/f").unwrap(), b"12345");
}

#[test]
fn scenario_nested_path() {
    let mut fs = testfs();
    fs.create_directory("/home").unwrap();
    fs.create_directory("/home/u").unwrap();
    fs.create_file("/home/u/x", b"ok").unwrap();
    assert_eq!(fs.read_file("/home/u/x").unwrap(), b"ok");
}

#[test]
fn scenario_duplicate_create() {
    let mut fs = testfs();
    fs.create_file("/a.txt", b"keep").unwrap();
    assert_eq!(
        fs.create_file("/a.txt", b"clobber").unwrap_err(),
        FsError::AlreadyExists
    );
    assert_eq!(fs.read_file("/a.txt").unwrap(), b"keep");
}

#[test]
fn boundary_max_file_size() {
    let mut fs = testfs();
    fs.create_file("/big", &[0x42u8; MAXFILE * BSIZE]).unwrap();
    assert_eq!(fs.read_file("/big").unwrap().len(), 6144);

    fs.create_file("/bigger", b"").unwrap();
    assert_eq!(
        fs.write_file("/bigger", &[0x42u8; MAXFILE * BSIZE + 1])
            .unwrap_err(),
        FsError::NoSpaceBlocks
    );
}

#[test]
fn boundary_name_truncation() {
    let mut fs = testfs();
    fs.create_file("/exactly13char", b"13").unwrap();
    assert_eq!(fs.read_file("/exactly13char").unwrap(), b"13");

    // The fourteenth character is cut off in storage, and lookups agree.
    fs.create_file("/fourteen-chars", b"14").unwrap();
    assert_eq!(fs.read_file("/fourteen-char").unwrap(), b"14");
    assert_eq!(fs.read_file("/fourteen-chars").unwrap(), b"14");
    let names: Vec<String> = fs
        .list_directory("/")
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["exactly13char", "fourteen-char"]);
}

#[test]
fn boundary_inode_exhaustion() {
    let mut fs = testfs();
    // Root takes inode 1, leaving 63 for files.
    for i in 0..NINODES - 1 {
        fs.create_file(&format!("/f{i}"), b"").unwrap();
    }
    assert_eq!(
        fs.create_file("/one-too-many", b"").unwrap_err(),
        FsError::NoSpaceInodes
    );
}

#[test]
fn random_data_round_trips() {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);

    let mut fs = testfs();
    for (i, len) in [1usize, 511, 512, 513, 4096, 6144].into_iter().enumerate() {
        let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let path = format!("/blob{i}");
        fs.create_file(&path, &data).unwrap();
        assert_eq!(fs.read_file(&path).unwrap(), data, "length {len}");
    }
}

#[test]
fn deletion_frees_the_name_and_the_inode() {
    let mut fs = testfs();
    fs.create_directory("/d").unwrap();
    fs.create_file("/d/f", b"bytes").unwrap();

    assert_eq!(fs.delete_directory("/d").unwrap_err(), FsError::NotEmpty);
    fs.delete_file("/d/f").unwrap();
    assert!(fs.list_directory("/d").unwrap().is_empty());
    fs.delete_directory("/d").unwrap();
    assert_eq!(fs.read_file("/d/f").unwrap_err(), FsError::NotFound);

    // Same names work again from scratch.
    fs.create_directory("/d").unwrap();
    fs.create_file("/d/f", b"fresh").unwrap();
    assert_eq!(fs.read_file("/d/f").unwrap(), b"fresh");
}

#[test]
fn dot_dot_walks_to_the_parent() {
    let mut fs = testfs();
    fs.create_directory("/a").unwrap();
    fs.create_directory("/a/inner").unwrap();
    fs.create_file("/top", b"up here").unwrap();
    assert_eq!(fs.read_file("/a/inner/../../top").unwrap(), b"up here");
}

#[test]
fn directory_entries_keep_insertion_order() {
    let mut fs = testfs();
    for name in ["zeta", "alpha", "mid"] {
        fs.create_file(&format!("/{name}"), b"").unwrap();
    }
    let names: Vec<String> = fs
        .list_directory("/")
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn dirlookup_skips_cleared_slots() {
    let mut fs = testfs();
    fs.create_file("/a", b"").unwrap();
    fs.create_file("/b", b"").unwrap();
    fs.delete_file("/a").unwrap();

    let root = fs.iget(ROOTINO).unwrap();
    assert_eq!(fs.dirlookup(&root, FileName::new("a")).unwrap(), None);
    assert!(fs.dirlookup(&root, FileName::new("b")).unwrap().is_some());
}

#[test]
fn small_volume_runs_out_of_blocks_cleanly() {
    // 16 blocks leaves 6 data blocks; the root body takes one.
    let mut fs = FileSystem::format(RamDisk::with_blocks(16)).unwrap();
    fs.create_file("/fits", &[1u8; 2 * BSIZE]).unwrap();
    assert_eq!(
        fs.create_file("/nope", &[1u8; (NDIRECT - 2) * BSIZE])
            .unwrap_err(),
        FsError::NoSpaceBlocks
    );
    // The failed create left no debris: the same space is still usable.
    fs.create_file("/also-fits", &[2u8; 3 * BSIZE]).unwrap();
    assert_eq!(fs.read_file("/also-fits").unwrap(), vec![2u8; 3 * BSIZE]);
}

#[test]
fn shell_round_trip() {
    let mut shell = Shell::new(testfs());
    let mut out = Vec::new();
    for line in [
        "mkdir d",
        "cd d",
        "echo hi > f",
        "cat f",
        "cd ..",
        "ls",
        "pwd",
    ] {
        shell.exec(line, &mut out).unwrap();
    }
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("hi\n"));
    assert!(text.contains("[DIR]"));
    assert!(text.contains('d'));
    assert!(text.ends_with("/\n"));
}
