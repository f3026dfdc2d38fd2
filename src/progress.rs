//! Progress units flowing from clients to a single aggregator task.
//!
//! The channel closes once every sender is dropped, which is the aggregator's
//! end-of-stream signal.
use std::io::{IsTerminal, Write};
use std::time::Duration;

use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const RENDER_INTERVAL: Duration = Duration::from_millis(100);
const BAR_WIDTH: usize = 30;

/// One completed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUnit {
    Published,
    Received,
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressUnit>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressUnit>;

#[must_use]
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressTotals {
    pub published: u64,
    pub received: u64,
}

impl ProgressTotals {
    fn record(&mut self, unit: ProgressUnit) {
        match unit {
            ProgressUnit::Published => self.published = self.published.saturating_add(1),
            ProgressUnit::Received => self.received = self.received.saturating_add(1),
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.published.saturating_add(self.received)
    }
}

/// Presentation side of the aggregator.
pub trait ProgressReporter: Send {
    fn on_progress(&mut self, totals: &ProgressTotals);

    fn finish(&mut self, totals: &ProgressTotals) {
        let _ = totals;
    }
}

/// Reporter used in debug mode and when stderr is not a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn on_progress(&mut self, _totals: &ProgressTotals) {}
}

/// Single-line stderr bar tracking published messages against the expected
/// total.
#[derive(Debug)]
pub struct ProgressBar {
    expected: u64,
    style: ProgressStyle,
    no_color: bool,
    last_render: Option<Instant>,
}

impl ProgressBar {
    #[must_use]
    pub fn new(expected: u64, no_color: bool) -> Self {
        Self {
            expected,
            style: ProgressStyle::new(BAR_WIDTH),
            no_color,
            last_render: None,
        }
    }

    /// Returns a bar when stderr is a terminal, otherwise a silent reporter.
    #[must_use]
    pub fn for_stderr(expected: u64, no_color: bool) -> Box<dyn ProgressReporter> {
        if std::io::stderr().is_terminal() {
            Box::new(Self::new(expected, no_color))
        } else {
            Box::new(SilentReporter)
        }
    }

    fn render(&self, totals: &ProgressTotals) -> Result<(), std::io::Error> {
        let line = build_progress_line(&self.style, totals, self.expected, self.no_color);
        let mut out = std::io::stderr();
        queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        for segment in line {
            match segment.color {
                Some(color) if !self.no_color => queue!(
                    out,
                    SetForegroundColor(color),
                    Print(&segment.text),
                    ResetColor
                )?,
                Some(_) | None => queue!(out, Print(&segment.text))?,
            }
        }
        out.flush()
    }
}

impl ProgressReporter for ProgressBar {
    fn on_progress(&mut self, totals: &ProgressTotals) {
        let now = Instant::now();
        let due = self
            .last_render
            .is_none_or(|last| now.saturating_duration_since(last) >= RENDER_INTERVAL);
        if due && self.render(totals).is_ok() {
            self.last_render = Some(now);
        }
    }

    fn finish(&mut self, totals: &ProgressTotals) {
        if self.render(totals).is_ok() {
            let mut out = std::io::stderr();
            drop(out.write_all(b"\n"));
            drop(out.flush());
        }
    }
}

/// Drains `receiver` until every sender is gone and returns the totals.
pub async fn aggregate(
    mut receiver: ProgressReceiver,
    reporter: &mut dyn ProgressReporter,
) -> ProgressTotals {
    let mut totals = ProgressTotals::default();
    while let Some(unit) = receiver.recv().await {
        totals.record(unit);
        reporter.on_progress(&totals);
    }
    reporter.finish(&totals);
    totals
}

pub fn spawn_progress_aggregator(
    receiver: ProgressReceiver,
    mut reporter: Box<dyn ProgressReporter>,
) -> JoinHandle<ProgressTotals> {
    tokio::spawn(async move { aggregate(receiver, reporter.as_mut()).await })
}

fn build_progress_line(
    style: &ProgressStyle,
    totals: &ProgressTotals,
    expected: u64,
    no_color: bool,
) -> Vec<ProgressSegment> {
    let size = style.size.max(1);
    let goal = u128::from(expected.max(1));
    let current = u128::from(totals.published).min(goal);
    let size_u128 = u128::from(u64::try_from(size).unwrap_or(u64::MAX));

    let scaled = current
        .saturating_mul(size_u128)
        .checked_div(goal)
        .unwrap_or(0);
    let complete_size = usize::try_from(scaled).unwrap_or(size).min(size);
    let incomplete_size = size.saturating_sub(complete_size);

    let percent_x100 = current.saturating_mul(10_000).checked_div(goal).unwrap_or(0);
    let percent_whole = percent_x100.checked_div(100).unwrap_or(0);
    let percent_frac = percent_x100.checked_rem(100).unwrap_or(0);
    let percent_text = format!(" {}.{:02}%", percent_whole, percent_frac);

    let count_text = if totals.received > 0 {
        format!(
            " | {}/{} msgs | {} received",
            totals.published, expected, totals.received
        )
    } else {
        format!(" | {}/{} msgs", totals.published, expected)
    };

    let progress_bar = format!(
        "{}{}{}{}",
        style.begin,
        style.fill.repeat(complete_size),
        style.empty.repeat(incomplete_size),
        style.end
    );

    if no_color {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::plain(percent_text),
            ProgressSegment::plain(count_text),
        ]
    } else {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::colored(percent_text, Color::Cyan),
            ProgressSegment::colored(count_text, Color::Yellow),
        ]
    }
}

#[derive(Debug)]
struct ProgressStyle {
    size: usize,
    begin: String,
    end: String,
    fill: String,
    empty: String,
}

impl ProgressStyle {
    fn new(size: usize) -> Self {
        Self {
            size,
            begin: "[".to_owned(),
            end: "]".to_owned(),
            fill: "#".to_owned(),
            empty: "-".to_owned(),
        }
    }
}

struct ProgressSegment {
    text: String,
    color: Option<Color>,
}

impl ProgressSegment {
    const fn plain(text: String) -> Self {
        Self { text, color: None }
    }

    const fn colored(text: String, color: Color) -> Self {
        Self {
            text,
            color: Some(color),
        }
    }
}
