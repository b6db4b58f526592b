//! Terminal rendering of the aggregate view
//!
//! Every refresh redraws the whole screen from an [`AggregateSnapshot`].
//! Rendering itself is pure so it can be tested without a terminal.

use std::io::{self, Write};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dnstrack_core::aggregator::{AggregateSnapshot, ServerView, ViewMode};
use dnstrack_core::records::{Record, RecordSet, RecordType};
use dnstrack_core::tracker::{ChangeReport, PollSnapshot};
use owo_colors::{OwoColorize, Style};

/// Clear screen, clear scrollback, cursor home
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[3J\x1b[H";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders snapshots for one measurement
#[derive(Debug, Clone)]
pub struct Display {
    name: String,
    record_type: RecordType,
    started_at: DateTime<Utc>,
    interval: Option<Duration>,
    verbose: bool,
    color: bool,
}

impl Display {
    pub fn new(name: impl Into<String>, record_type: RecordType, started_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            record_type,
            started_at,
            interval: None,
            verbose: false,
            color: true,
        }
    }

    /// Show the poll interval in the header
    pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
        self.interval = interval;
        self
    }

    /// Show raw records instead of placeholders
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable or disable ANSI colors
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Clear the terminal and draw `snapshot`
    pub fn refresh(&self, snapshot: &AggregateSnapshot) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(CLEAR_SCREEN.as_bytes())?;
        stdout.write_all(self.render(snapshot).as_bytes())?;
        stdout.flush()
    }

    /// Text of one full screen
    pub fn render(&self, snapshot: &AggregateSnapshot) -> String {
        let mut out = String::new();

        push_line(&mut out, format!("Measurement started at: {}", timestamp(self.started_at)));
        let query = format!("Query: {} {}", self.record_type, self.name);
        match self.interval {
            Some(interval) => push_line(&mut out, format!("{} (every {})", query, format_duration(interval))),
            None => push_line(&mut out, query),
        }
        out.push('\n');

        if self.verbose {
            push_line(&mut out, self.column_header());
        }

        for view in &snapshot.servers {
            push_line(&mut out, format!("@{}", view.server));
            match snapshot.mode {
                ViewMode::History => self.render_history(&mut out, snapshot, &view.server),
                ViewMode::Latest => self.render_latest(&mut out, view),
            }
            out.push('\n');
        }

        for failure in &snapshot.failures {
            let line = format!("@{}\tlookup of {} failed: {}", failure.server, failure.name, failure.error);
            push_line(&mut out, self.paint(line, Style::new().red()));
        }
        if !snapshot.failures.is_empty() {
            out.push('\n');
        }

        for view in &snapshot.servers {
            if let Some(change) = &view.change {
                self.render_change(&mut out, change);
            }
        }

        out
    }

    fn column_header(&self) -> &'static str {
        match self.record_type {
            RecordType::A => "Time\t\t\tRequested\tAddress\t\tTTL",
            RecordType::Srv => "Time\t\t\tRequested\tTarget\tPriority\tWeight\tPort\tTTL",
        }
    }

    fn render_latest(&self, out: &mut String, view: &ServerView) {
        if self.verbose {
            if let Some(previous) = &view.previous {
                render_records(out, previous);
            }
            render_records(out, &view.current);
            return;
        }

        if let Some(previous) = &view.previous {
            push_line(out, format!("{}\tNo Change detected", timestamp(previous.polled_at)));
        }
        if view.hash_changed {
            let line = format!("{}\tChange detected", timestamp(view.current.polled_at));
            push_line(out, self.paint(line, Style::new().bold().yellow()));
        } else {
            push_line(out, format!("{}\tNo Change detected", timestamp(view.current.polled_at)));
        }
    }

    fn render_history(&self, out: &mut String, snapshot: &AggregateSnapshot, server: &str) {
        for entry in snapshot.ledger_for(server) {
            push_line(
                out,
                format!(
                    "{} .. {}\t{}",
                    timestamp(entry.first_seen),
                    timestamp(entry.last_seen),
                    summarize(&entry.records)
                ),
            );
        }
    }

    fn render_change(&self, out: &mut String, change: &ChangeReport) {
        let style = Style::new().bold().yellow();
        push_line(out, self.paint("Change detected".to_string(), style));
        push_line(out, format!("  Domain:    {} ({})", change.name, change.record_type));
        push_line(out, format!("  Server:    {}", change.server));
        push_line(out, format!("  Changed:   {}", timestamp(change.changed_at())));
        push_line(out, format!("  Before:    {}", summarize(&change.previous.records)));
        push_line(out, format!("  After:     {}", summarize(&change.current.records)));
        let duration = format!("  Duration:  {}", format_duration(change.elapsed));
        push_line(out, self.paint(duration, Style::new().bold()));
        out.push('\n');
    }

    fn paint(&self, text: String, style: Style) -> String {
        if self.color {
            text.style(style).to_string()
        } else {
            text
        }
    }
}

fn push_line(out: &mut String, line: impl AsRef<str>) {
    out.push_str(line.as_ref());
    out.push('\n');
}

/// One line per record, the first prefixed with the poll time
fn render_records(out: &mut String, snapshot: &PollSnapshot) {
    let ts = timestamp(snapshot.polled_at);
    if snapshot.records.is_empty() {
        push_line(out, format!("{}\t(no records)", ts));
        return;
    }

    for (i, record) in snapshot.records.iter().enumerate() {
        let prefix = if i == 0 { ts.as_str() } else { "\t\t" };
        push_line(out, format!("{}\t{}", prefix, record_columns(record)));
    }
}

fn record_columns(record: &Record) -> String {
    match record {
        Record::A(a) => format!("{}\t{}\t{}", a.owner, a.address, a.ttl),
        Record::Srv(srv) => format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            srv.owner, srv.target, srv.priority, srv.weight, srv.port, srv.ttl
        ),
    }
}

/// Comma separated values of an answer
fn summarize(records: &RecordSet) -> String {
    if records.is_empty() {
        return "(no records)".to_string();
    }
    records
        .iter()
        .map(|r| match r {
            Record::A(a) => format!("{} (ttl {})", a.address, a.ttl),
            Record::Srv(srv) => format!("{} (prio {}, ttl {})", srv.target, srv.priority, srv.ttl),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIME_FORMAT).to_string()
}

/// `1h 02m 03s`, `4m 05s` or `6s`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
