use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use appshelf_core::is_primary_category;
use appshelf_lib::AppId;

use super::CliLibrary;
use crate::error::CliError;

/// Resolve and print the category of each id.
pub(crate) async fn run_classify(
    lib: &CliLibrary,
    ids: &[AppId],
    network: bool,
) -> Result<(), CliError> {
    let categories = lib.classify(ids, network).await;
    for id in ids {
        let category = categories.get(id).map(String::as_str).unwrap_or("");
        let shown = if category.is_empty() {
            "(unknown)".if_supports_color(Stdout, |t| t.dimmed()).to_string()
        } else if is_primary_category(category) {
            category.if_supports_color(Stdout, |t| t.green()).to_string()
        } else {
            category.to_string()
        };
        log::info!(
            "  {}  {}",
            format!("{id:>9}").if_supports_color(Stdout, |t| t.cyan()),
            shown
        );
    }
    Ok(())
}

/// Render cleaned requirement markup as plain terminal lines.
fn render_markup(markup: &str) -> Vec<String> {
    markup
        .replace("<br>", "\n")
        .replace("<b>", "")
        .replace("</b>", "")
        .replace("<strong>", "")
        .replace("</strong>", "")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) async fn run_requirements(
    lib: &CliLibrary,
    id: AppId,
    network: bool,
) -> Result<(), CliError> {
    let found = lib.requirements(id, network).await?;
    let Some(req) = found.filter(|r| !r.is_empty()) else {
        log::info!(
            "{}",
            format!("No requirements available for {id}").if_supports_color(Stdout, |t| t.dimmed()),
        );
        if !network {
            log::info!("Pass --network to fetch them from the store.");
        }
        return Ok(());
    };

    for (label, text) in [("Minimum", &req.minimum), ("Recommended", &req.recommended)] {
        if text.is_empty() {
            continue;
        }
        log::info!("{}", label.if_supports_color(Stdout, |t| t.bold()));
        for line in render_markup(text) {
            log::info!("  {line}");
        }
        log::info!("");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markup_splits_lines_and_drops_tags() {
        let lines = render_markup(concat!(
            "<strong>Minimum:</strong><br>",
            "• <b>OS:</b> Windows 10<br><br>",
            "• Memory: 8 GB<br>",
        ));
        assert_eq!(lines, vec!["Minimum:", "• OS: Windows 10", "• Memory: 8 GB"]);
    }
}
