use indicatif::{ProgressBar, ProgressStyle};

/// Receives byte counts while an asset is fetched or decoded.
pub trait ProgressSink {
    /// `total` is 0 while the size is unknown.
    fn update(&mut self, transferred: u64, total: u64);
}

impl<F: FnMut(u64, u64)> ProgressSink for F {
    fn update(&mut self, transferred: u64, total: u64) {
        self(transferred, total);
    }
}

const BAR_TEMPLATE: &str = "  [{bar:40.cyan/blue}] {bytes}/{total_bytes}  {msg}";
const SPINNER_TEMPLATE: &str = "  {spinner} {bytes}  {msg}";

/// Terminal progress for one download. The bar is cleared when the reporter
/// is dropped, whichever way the download ends.
pub struct ProgressReporter {
    bar: ProgressBar,
    transferred: u64,
    total: u64,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self::with_bar(ProgressBar::new_spinner(), label)
    }

    /// A reporter that tracks counts but draws nothing.
    #[must_use]
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden(), "")
    }

    fn with_bar(bar: ProgressBar, label: &str) -> Self {
        bar.set_style(style(SPINNER_TEMPLATE));
        bar.set_message(label.to_string());
        Self {
            bar,
            transferred: 0,
            total: 0,
        }
    }

    #[must_use]
    pub const fn transferred(&self) -> u64 {
        self.transferred
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Completion in whole percent, `None` while the total is unknown.
    #[must_use]
    pub fn percent(&self) -> Option<u64> {
        percent(self.transferred, self.total)
    }

    fn rebound(&mut self, total: u64) {
        self.total = total;
        self.bar.set_length(total);
        self.bar.set_style(style(BAR_TEMPLATE));
    }
}

impl ProgressSink for ProgressReporter {
    fn update(&mut self, transferred: u64, total: u64) {
        if total != 0 && total != self.total {
            self.rebound(total);
        }
        self.transferred = self.transferred.max(transferred);
        self.bar.set_position(self.transferred);
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// `transferred` as a share of `total`, capped at 100.
#[must_use]
pub fn percent(transferred: u64, total: u64) -> Option<u64> {
    if total == 0 {
        return None;
    }
    let share = u128::from(transferred.min(total)) * 100 / u128::from(total);
    u64::try_from(share).ok()
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}
