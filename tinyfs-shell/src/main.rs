mod cli;

use std::fs;
use std::fs::File;
use std::io::Read;

use clap::Parser;
use tinyfs::{OpenFlag, TinyFileSystem};

use cli::Cli;

fn main() -> tinyfs::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    println!("source={:?}\nout_dir={:?}", cli.source, cli.out_dir);

    let tfs = TinyFileSystem::init()?;

    let names = fs::read_dir(&cli.source)?
        .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, _>>()?;

    for name in &names {
        let mut host_file = File::open(cli.source.join(name))?;
        let mut data = Vec::new();
        host_file.read_to_end(&mut data)?;

        let fd = tfs.open(&format!("/{name}"), OpenFlag::CREATE | OpenFlag::TRUNC)?;
        let written = tfs.write(fd, &data)?;
        tfs.close(fd)?;

        if written < data.len() {
            log::warn!("{name:?} clamped to {written} bytes");
        }
        println!("imported: {name:?} ({written} bytes)");
    }

    fs::create_dir_all(&cli.out_dir)?;
    for name in &names {
        tfs.copy_to_host(&format!("/{name}"), &cli.out_dir.join(name))?;
        println!("exported: {name:?}");
    }

    tfs.destroy()
}
