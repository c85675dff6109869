//! # Theme
//!
//! All styles the composer uses, built once at startup from the configured
//! accent color and shared read-only by every session.

use std::str::FromStr;

use ratatui::style::{Color, Modifier, Style};

pub const DEFAULT_ACCENT: Color = Color::Rgb(0xfc, 0xd3, 0x4d);

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub accent: Color,
    /// Banner title on the list screen.
    pub title: Style,
    /// Document name label in the content header.
    pub header: Style,
    /// Scroll percentage label in the content footer.
    pub footer: Style,
    /// Horizontal rules filling header and footer.
    pub rule: Style,
    pub entry: Style,
    pub selected: Style,
    pub intro: Style,
    pub help: Style,
}

impl Theme {
    pub fn new(accent: Color) -> Self {
        let header = Style::default()
            .fg(Color::Black)
            .bg(accent)
            .add_modifier(Modifier::BOLD);
        let footer = derive_footer(header);
        Self {
            accent,
            title: Style::default()
                .fg(Color::Black)
                .bg(accent)
                .add_modifier(Modifier::BOLD),
            header,
            footer,
            rule: Style::default().fg(accent),
            entry: Style::default().fg(Color::Gray),
            selected: Style::default()
                .fg(accent)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            intro: Style::default().fg(Color::White),
            help: Style::default().fg(Color::DarkGray),
        }
    }

    /// Parse a color name or `#rrggbb` value, falling back to the default accent.
    pub fn from_accent(accent: &str) -> Self {
        match Color::from_str(accent) {
            Ok(color) => Self::new(color),
            Err(_) => {
                log::warn!("Unrecognized accent color {accent:?}, using default");
                Self::new(DEFAULT_ACCENT)
            }
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(DEFAULT_ACCENT)
    }
}

/// Footer label shares the header's colors but is not bold.
fn derive_footer(header: Style) -> Style {
    header.remove_modifier(Modifier::BOLD)
}
