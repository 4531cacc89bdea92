use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use appshelf_lib::{AppId, PatchState};

use super::CliLibrary;
use crate::error::CliError;

/// Report the patch state of `id` and list files with active directives.
pub(crate) fn run_patch_scan(
    lib: &CliLibrary,
    id: AppId,
    dir: Option<&Path>,
) -> Result<(), CliError> {
    let dir = lib.plugin_dir(dir)?;
    log::info!(
        "Scanning {}",
        dir.display().if_supports_color(Stdout, |t| t.cyan())
    );
    let report = lib.scan_patch(id, Some(&dir))?;
    let state = report.state();
    match state {
        PatchState::NeedsPatch { .. } => {
            log::info!(
                "{} {}",
                "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
                state.status_line(id),
            );
            for file in report.detail() {
                log::info!(
                    "  {} ({} active)",
                    file.path.display(),
                    file.active_directives
                );
            }
            log::info!("Run 'appshelf patch apply {id}' to neutralize them.");
        }
        PatchState::UpToDate => log::info!(
            "{} {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            state.status_line(id),
        ),
        PatchState::Absent => log::info!(
            "{}",
            state.status_line(id).if_supports_color(Stdout, |t| t.dimmed())
        ),
    }
    Ok(())
}

pub(crate) fn run_patch_apply(
    lib: &CliLibrary,
    id: AppId,
    dir: Option<&Path>,
    files: &[PathBuf],
) -> Result<(), CliError> {
    let report = lib.patch(id, dir, files)?;
    if report.files_changed == 0 && report.failures.is_empty() {
        log::info!("Nothing to patch for {id}");
        return Ok(());
    }
    if report.files_changed > 0 {
        log::info!(
            "{} Neutralized {} line(s) in {} file(s)",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            report.lines_neutralized,
            report.files_changed,
        );
    }
    for (path, err) in &report.failures {
        log::warn!(
            "{} {}: {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            path.display(),
            err,
        );
    }
    Ok(())
}
