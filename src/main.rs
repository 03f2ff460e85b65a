//! Interactive shell over a freshly mounted RAM-disk file system.

use std::io::{self, BufRead, Write};
use std::process;

use rufs::{FileSystem, RamDisk, Shell};

fn main() -> io::Result<()> {
    let fs = match FileSystem::mount(RamDisk::new()) {
        Ok(fs) => fs,
        Err(e) => {
            eprintln!("rufs: {e}");
            process::exit(1);
        }
    };
    let mut shell = Shell::new(fs);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    writeln!(stdout, "rufs shell, type 'help' for commands")?;
    let mut line = String::new();
    loop {
        write!(stdout, "{}", shell.prompt())?;
        stdout.flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim() == "exit" {
            break;
        }
        shell.exec(&line, &mut stdout)?;
    }
    Ok(())
}
