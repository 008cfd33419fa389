use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::{Arg, Command};
use fuser::MountOption;
use log::info;

use vsfs::fuse::VsfsFuse;
use vsfs::{FsContext, Image};

fn main() {
    env_logger::init();

    let cmd = Command::new("vsfs")
        .about("Mount a vsfs image through FUSE")
        .arg(
            Arg::new("image")
                .value_name("IMAGE")
                .required(true)
                .help("file system image; its size must be a whole number of blocks"),
        )
        .arg(
            Arg::new("mountpoint")
                .value_name("DIR")
                .required(true)
                .help("directory to mount the file system on"),
        );

    let matches = cmd.try_get_matches().unwrap_or_else(|err| {
        let _ = err.print();
        if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
            process::exit(0);
        }
        process::exit(1);
    });

    let image_path = PathBuf::from(matches.get_one::<String>("image").unwrap());
    let mountpoint = PathBuf::from(matches.get_one::<String>("mountpoint").unwrap());

    let image = match Image::open(&image_path) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("vsfs: {}: {}", image_path.display(), err);
            process::exit(1);
        }
    };
    let ctx = match FsContext::new(image) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("vsfs: failed to mount the file system: {}", err);
            process::exit(1);
        }
    };
    info!(
        "mounting {} ({} blocks, {} inodes)",
        image_path.display(),
        ctx.num_blocks(),
        ctx.num_inodes()
    );

    let options = [
        MountOption::FSName("vsfs".to_string()),
        MountOption::DefaultPermissions,
    ];
    if let Err(err) = fuser::mount2(VsfsFuse::new(ctx), &mountpoint, &options) {
        eprintln!("vsfs: {}", err);
        process::exit(1);
    }
}
