use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, Command};

use vsfs::mkfs::{self, FormatOpts};
use vsfs::Image;

fn main() {
    env_logger::init();

    let cmd = Command::new("mkfs.vsfs")
        .about("Format an image file into a vsfs file system")
        .arg(
            Arg::new("inodes")
                .short('i')
                .value_name("NUM")
                .required(true)
                .value_parser(value_parser!(u32))
                .help("number of inodes"),
        )
        .arg(
            Arg::new("force")
                .short('f')
                .action(ArgAction::SetTrue)
                .help("overwrite an existing vsfs file system"),
        )
        .arg(
            Arg::new("zero")
                .short('z')
                .action(ArgAction::SetTrue)
                .help("zero out image contents first"),
        )
        .arg(
            Arg::new("image")
                .value_name("IMAGE")
                .required(true)
                .help("image file; must exist and hold a whole number of blocks"),
        );

    let matches = cmd.try_get_matches().unwrap_or_else(|err| {
        let _ = err.print();
        if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
            process::exit(0);
        }
        process::exit(1);
    });

    let opts = FormatOpts {
        num_inodes: *matches.get_one::<u32>("inodes").unwrap(),
        force: matches.get_flag("force"),
        zero: matches.get_flag("zero"),
    };
    let image_path = PathBuf::from(matches.get_one::<String>("image").unwrap());

    let mut image = match Image::open(&image_path) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("mkfs.vsfs: {}: {}", image_path.display(), err);
            process::exit(1);
        }
    };
    if let Err(err) = mkfs::format(&mut image, &opts) {
        eprintln!("mkfs.vsfs: {}", err);
        process::exit(1);
    }
    if let Err(err) = image.flush() {
        eprintln!("mkfs.vsfs: {}", err);
        process::exit(1);
    }
}
