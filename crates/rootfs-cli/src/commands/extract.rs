//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use rootfs_core::ExtractOptions;
use rootfs_core::NoopProgress;
use rootfs_core::PathWhitelist;
use rootfs_core::config::HardlinkPolicy;
use rootfs_core::extract_tar_with_progress;
use rootfs_core::open_archive;
use rootfs_core::types::ExtractionTarget;
use std::fs;

pub fn execute(args: &ExtractArgs, formatter: &dyn OutputFormatter, quiet: bool) -> Result<()> {
    fs::create_dir_all(&args.root)
        .with_context(|| format!("failed to create root directory '{}'", args.root.display()))?;

    let target = add_archive_context(ExtractionTarget::open(&args.root), &args.archive)?
        .with_overwrite(args.overwrite);

    let mut options = ExtractOptions::default();
    if !args.only.is_empty() {
        options = options.with_whitelist(args.only.iter().collect::<PathWhitelist>());
    }
    if let Some(range) = args.uid_range {
        if !rustix::process::geteuid().is_root() {
            formatter.format_warning(
                "--uid-range usually requires root; chown to shifted ids may fail",
            );
        }
        options = options.with_uid_range(range);
    }
    if args.defer_hardlinks {
        options = options.with_hardlink_policy(HardlinkPolicy::Deferred);
    }

    let reader = add_archive_context(open_archive(&args.archive), &args.archive)?;

    // Progress only on an interactive terminal with human output
    let report = if !quiet && CliProgress::should_show() {
        let mut progress = CliProgress::new("Extracting");
        add_archive_context(
            extract_tar_with_progress(reader, &target, &options, &mut progress),
            &args.archive,
        )?
    } else {
        add_archive_context(
            extract_tar_with_progress(reader, &target, &options, &mut NoopProgress),
            &args.archive,
        )?
    };

    formatter.format_extraction_result(&report)?;

    Ok(())
}
