/// Terminal progress bars for long indexing steps.
use indicatif::{ProgressBar, ProgressStyle};

/// A bar over `len` items, or a hidden one when progress display is off.
#[must_use]
pub fn bar(len: usize, unit: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let template = format!("  {{bar:40.cyan/blue}} {{pos}}/{{len}} {unit} ({{percent}}%) {{msg}}");
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb
}
