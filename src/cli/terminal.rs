//! Coloured status lines for registry reports.

use owo_colors::{OwoColorize, Style};

/// What a report line is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing to report.
    Clean,
    /// A reference to a form that is not registered.
    Dangling,
    /// Forms that reference each other.
    Cycle,
}

impl Status {
    /// The status of a whole report. Only dangling references spoil it.
    pub const fn of_report(dangling: usize) -> Self {
        if dangling == 0 { Self::Clean } else { Self::Dangling }
    }

    const fn word(self) -> &'static str {
        match self {
            Self::Clean => "ok",
            Self::Dangling => "dangling",
            Self::Cycle => "cycle",
        }
    }

    fn style(self) -> Style {
        match self {
            Self::Clean => Style::new().green(),
            Self::Dangling => Style::new().yellow().bold(),
            Self::Cycle => Style::new().cyan(),
        }
    }

    /// Renders `text` in the colour of this status.
    pub fn paint(self, text: &str) -> String {
        if colour_enabled() {
            text.style(self.style()).to_string()
        } else {
            text.to_string()
        }
    }

    /// A fixed-width tag opening a report line.
    pub fn tag(self) -> String {
        self.paint(&format!("{:<8}", self.word()))
    }
}

/// Renders secondary detail, such as the members of a cycle.
pub fn detail(text: &str) -> String {
    if colour_enabled() {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

fn colour_enabled() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}
