use anyhow::Result;
use clap::ValueEnum;
use colored::{Color, Colorize};
use comfy_table::{Attribute, Cell, Table, presets};
use serde::Serialize;

/// How a command's result is rendered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Table,
    Json,
    /// One line per result
    Compact,
}

/// The result of a command, renderable in every [`Format`].
pub trait Report: Serialize {
    fn table(&self, printer: &Printer) -> Table;
    fn compact(&self) -> String;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Ok,
    Info,
    Warn,
    Fail,
}

impl Tone {
    fn icon(self) -> &'static str {
        match self {
            Tone::Ok => "✓",
            Tone::Info => "ℹ",
            Tone::Warn => "⚠",
            Tone::Fail => "✗",
        }
    }

    fn color(self) -> Color {
        match self {
            Tone::Ok => Color::Green,
            Tone::Info => Color::Blue,
            Tone::Warn => Color::Yellow,
            Tone::Fail => Color::Red,
        }
    }
}

pub struct Printer {
    pub format: Format,
    pub quiet: bool,
    pub verbose: bool,
    pub color: bool,
}

impl Printer {
    pub fn report<R: Report>(&self, report: &R) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        let rendered = match self.format {
            Format::Json => serde_json::to_string_pretty(report)?,
            Format::Table => report.table(self).to_string(),
            Format::Compact => report.compact(),
        };
        println!("{rendered}");
        Ok(())
    }

    /// Status line. Failures always reach stderr; other lines are muted by
    /// `--quiet` and in JSON mode.
    pub fn line(&self, tone: Tone, message: &str) {
        let text = self.tinted(tone, message);
        if tone == Tone::Fail {
            eprintln!("{text}");
        } else if !self.muted() {
            println!("{text}");
        }
    }

    pub fn title(&self, text: &str) {
        if self.muted() {
            return;
        }
        if self.color {
            println!("\n{}", text.bold());
        } else {
            println!("\n{text}");
        }
    }

    pub fn field(&self, key: &str, value: &str) {
        if self.muted() {
            return;
        }
        if self.color {
            println!("{}: {value}", key.cyan().bold());
        } else {
            println!("{key}: {value}");
        }
    }

    /// Diagnostic line for `--verbose`, on stderr.
    pub fn debug(&self, message: &str) {
        if self.verbose && !self.quiet {
            eprintln!("{}", if self.color { message.dimmed().to_string() } else { message.to_string() });
        }
    }

    /// Empty table with a bold header row.
    pub fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table.load_preset(if self.color {
            presets::UTF8_FULL_CONDENSED
        } else {
            presets::ASCII_FULL
        });
        let header: Vec<Cell> = headers
            .iter()
            .map(|h| Cell::new(*h).add_attribute(Attribute::Bold))
            .collect();
        table.set_header(header);
        table
    }

    fn tinted(&self, tone: Tone, message: &str) -> String {
        if self.color {
            format!("{} {}", tone.icon().color(tone.color()), message.color(tone.color()))
        } else {
            format!("{} {message}", tone.icon())
        }
    }

    fn muted(&self) -> bool {
        self.quiet || self.format == Format::Json
    }
}

#[cfg(test)]
pub(crate) fn plain(format: Format) -> Printer {
    Printer {
        format,
        quiet: false,
        verbose: false,
        color: false,
    }
}
