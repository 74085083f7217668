//! Cat command implementation.

use crate::cli::CatArgs;
use crate::error::add_archive_context;
use anyhow::Context;
use anyhow::Result;
use rootfs_core::open_archive;
use rootfs_core::read_tar_file;
use std::io::Write;
use std::io::{self};

pub fn execute(args: &CatArgs) -> Result<()> {
    let reader = add_archive_context(open_archive(&args.archive), &args.archive)?;
    let content = add_archive_context(read_tar_file(reader, &args.name), &args.archive)?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&content)
        .and_then(|()| stdout.flush())
        .context("failed to write to stdout")?;

    Ok(())
}
