//! Command shell over the file system.
//!
//! Parses one command line at a time, composes absolute paths against the
//! current directory, and dispatches to the file-system operations.
//! Output and error text go to a caller-supplied writer; file-system
//! failures are reported there and never abort the shell.

use std::io::{self, Write};

use crate::block::BlockDevice;
use crate::fs::FileSystem;

const HELP: &str = "\
available commands:
  help          - show this help message
  echo TEXT     - print text
  echo T > F    - write text to a file, creating it if needed
  mkdir DIR     - create a directory
  touch FILE    - create an empty file
  del NAME      - delete a file or empty directory
  ls [DIR]      - list directory contents
  cd DIR        - change directory
  pwd           - print working directory
  cat FILE      - print file contents";

pub struct Shell<D: BlockDevice> {
    fs: FileSystem<D>,
}

impl<D: BlockDevice> Shell<D> {
    pub fn new(fs: FileSystem<D>) -> Self {
        Shell { fs }
    }

    /// The wrapped file system.
    pub fn fs(&mut self) -> &mut FileSystem<D> {
        &mut self.fs
    }

    /// Prompt string naming the current directory.
    pub fn prompt(&self) -> String {
        format!("{}> ", self.fs.current_path())
    }

    /// Execute one command line, writing any output to `out`.
    pub fn exec(&mut self, line: &str, out: &mut dyn Write) -> io::Result<()> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = args.split_first() else {
            return Ok(());
        };
        match cmd {
            "help" => writeln!(out, "{HELP}"),
            "echo" => self.echo(args, out),
            "mkdir" => self.mkdir(args, out),
            "touch" => self.touch(args, out),
            "del" => self.del(args, out),
            "ls" => self.ls(args, out),
            "cd" => self.cd(args, out),
            "pwd" => writeln!(out, "{}", self.fs.current_path()),
            "cat" => self.cat(args, out),
            _ => writeln!(out, "command not found: {cmd}"),
        }
    }

    /// Absolute path for `name`, composed against the current directory
    /// unless it is already absolute.
    fn abspath(&self, name: &str) -> String {
        if name.starts_with('/') {
            name.to_string()
        } else if self.fs.current_path() == "/" {
            format!("/{name}")
        } else {
            format!("{}/{name}", self.fs.current_path())
        }
    }

    fn echo(&mut self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        if let Some(pos) = args.iter().position(|a| *a == ">") {
            let Some(name) = args.get(pos + 1) else {
                return writeln!(out, "usage: echo TEXT > FILE");
            };
            let text = args[..pos].join(" ");
            let path = self.abspath(name);
            // Overwrite an existing file, else create it with the text.
            let res = self
                .fs
                .write_file(&path, text.as_bytes())
                .or_else(|_| self.fs.create_file(&path, text.as_bytes()));
            match res {
                Ok(()) => Ok(()),
                Err(e) => writeln!(out, "echo: {path}: {e}"),
            }
        } else {
            writeln!(out, "{}", args.join(" "))
        }
    }

    fn mkdir(&mut self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        let Some(name) = args.first() else {
            return writeln!(out, "usage: mkdir DIR");
        };
        let path = self.abspath(name);
        match self.fs.create_directory(&path) {
            Ok(()) => Ok(()),
            Err(e) => writeln!(out, "mkdir: {path}: {e}"),
        }
    }

    fn touch(&mut self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        let Some(name) = args.first() else {
            return writeln!(out, "usage: touch FILE");
        };
        let path = self.abspath(name);
        match self.fs.create_file(&path, b"") {
            Ok(()) => Ok(()),
            Err(e) => writeln!(out, "touch: {path}: {e}"),
        }
    }

    fn del(&mut self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        let Some(name) = args.first() else {
            return writeln!(out, "usage: del NAME");
        };
        let path = self.abspath(name);
        let res = self
            .fs
            .delete_file(&path)
            .or_else(|_| self.fs.delete_directory(&path));
        match res {
            Ok(()) => Ok(()),
            Err(e) => writeln!(out, "del: {path}: {e}"),
        }
    }

    fn ls(&mut self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        let path = match args.first() {
            Some(name) => self.abspath(name),
            None => self.fs.current_path().to_string(),
        };
        match self.fs.list_directory(&path) {
            Ok(entries) => {
                for e in &entries {
                    let tag = if e.is_directory { "[DIR] " } else { "[FILE]" };
                    writeln!(out, "{tag} {:>6}  {}", e.size, e.name)?;
                }
                Ok(())
            }
            Err(e) => writeln!(out, "ls: {path}: {e}"),
        }
    }

    fn cd(&mut self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        let Some(&name) = args.first() else {
            return writeln!(out, "usage: cd DIR");
        };
        let path = match name {
            "." => return Ok(()),
            ".." => parent_of(self.fs.current_path()),
            _ => self.abspath(name),
        };
        match self.fs.change_directory(&path) {
            Ok(()) => Ok(()),
            Err(e) => writeln!(out, "cd: {path}: {e}"),
        }
    }

    fn cat(&mut self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        let Some(name) = args.first() else {
            return writeln!(out, "usage: cat FILE");
        };
        let path = self.abspath(name);
        match self.fs.read_file(&path) {
            Ok(bytes) => {
                out.write_all(&bytes)?;
                if !bytes.ends_with(b"\n") {
                    writeln!(out)?;
                }
                Ok(())
            }
            Err(e) => writeln!(out, "cat: {path}: {e}"),
        }
    }
}

/// One path segment up from `cwd`.
fn parent_of(cwd: &str) -> String {
    match cwd.trim_end_matches('/').rfind('/') {
        Some(0) | None => String::from("/"),
        Some(i) => cwd[..i].to_string(),
    }
}
