use owo_colors::{OwoColorize, Style};
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for the parts of relstore's terminal output.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Banners and section titles
    pub accent: Style,
    /// Completed operations
    pub ok: Style,
    /// Skipped lines and other recoverable trouble
    pub caution: Style,
    /// Event and room identifiers
    pub id: Style,
    /// Field labels
    pub muted: Style,
}

impl Theme {
    /// Colored unless `console` says colors are off (not a terminal, `NO_COLOR`, ...)
    pub fn detect() -> Self {
        if console::colors_enabled() {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            accent: Style::new().cyan().bold(),
            ok: Style::new().green().bold(),
            caution: Style::new().yellow().bold(),
            id: Style::new().blue(),
            muted: Style::new().dimmed(),
        }
    }

    pub fn plain() -> Self {
        Self {
            accent: Style::new(),
            ok: Style::new(),
            caution: Style::new(),
            id: Style::new(),
            muted: Style::new(),
        }
    }
}

pub(crate) fn paint(text: &str, style: &Style) -> String {
    text.style(style.clone()).to_string()
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
