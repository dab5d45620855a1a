//! CLI progress display utilities
//!
//! Step indicators and per-file byte progress bars for JT loads.

use std::time::Duration;

use console::{Emoji, style};
use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::import::LoadProgress;

/// Magnifying glass - for reading/scanning operations
pub static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
/// Cube - for geometry
pub static CUBE: Emoji<'_, '_> = Emoji("📐 ", "");
/// Sparkles - for completion
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

/// Print a step indicator: `[1/3] 🔍 Message...`
pub fn print_step(current: usize, total: usize, emoji: Emoji, msg: &str) {
    eprintln!(
        "{} {}{}",
        style(format!("[{current}/{total}]")).bold().dim(),
        emoji,
        msg
    );
}

/// Print completion message: `✨ Done in 2s`
pub fn print_done(elapsed: Duration) {
    eprintln!("{} Done in {}", SPARKLE, HumanDuration(elapsed));
}

/// Byte progress bar style
///
/// Format: `part.jt [████████░░░░░░░░] 1.2 MiB/2.4 MiB`
///
/// # Panics
/// Panics if the template string is invalid (this is a compile-time constant).
#[must_use]
pub fn bytes_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
        .expect("valid template")
        .progress_chars("##-")
}

/// Create a multi-progress manager; hidden when `quiet`
#[must_use]
pub fn multi_progress(quiet: bool) -> MultiProgress {
    if quiet {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::with_draw_target(ProgressDrawTarget::stderr())
    }
}

/// Add a byte progress bar for one file
#[must_use]
pub fn add_file_bar(mp: &MultiProgress, total: u64, msg: &str) -> ProgressBar {
    let pb = mp.add(ProgressBar::new(total));
    pb.set_style(bytes_style());
    pb.set_message(msg.to_string());
    pb
}

/// Move a bar to the state reported by a load
///
/// Nested external reference loads report their own totals, so the length
/// follows the most recent report.
pub fn update_bar(pb: &ProgressBar, progress: &LoadProgress) {
    pb.set_length(progress.total_bytes as u64);
    pb.set_position(progress.bytes_read as u64);
}
