use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use appshelf_lib::{Settings, settings_path};
use appshelf_lib::install::find_install_root;

use crate::error::CliError;

/// Show effective settings and where they come from.
pub(crate) fn run_config_show(settings: &Settings) -> Result<(), CliError> {
    let path = settings_path();
    log::info!(
        "{}",
        "appshelf Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");
    if path.exists() {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found, using defaults)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    match find_install_root(settings.install_root.as_deref()) {
        Some(root) => log::info!("  Install root:  {}", root.display()),
        None => log::info!(
            "  Install root:  {}",
            "not found".if_supports_color(Stdout, |t| t.yellow())
        ),
    }
    log::info!("");
    for line in settings.to_toml()?.lines() {
        log::info!("  {line}");
    }
    Ok(())
}

/// Write the effective settings to the settings file.
pub(crate) fn run_config_init(settings: &Settings) -> Result<(), CliError> {
    let path = settings_path();
    settings.save_to(&path)?;
    log::info!(
        "{} Settings written to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display(),
    );
    Ok(())
}

/// Print the settings file path.
pub(crate) fn run_config_path() -> Result<(), CliError> {
    log::info!("{}", settings_path().display());
    Ok(())
}
