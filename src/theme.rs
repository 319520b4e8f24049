// Theme system for the loam surface
// Colors are rendered to CSS variables and injected into the served page

/// A single RGB color value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThemeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ThemeColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a hex color string like "#RRGGBB" or "RRGGBB"
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches('#');
        if s.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    /// Convert to #RRGGBB hex string
    pub fn to_css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Which built-in theme the surface uses
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn name(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn colors(&self) -> ThemeColors {
        match self {
            Theme::Dark => ThemeColors::dark_default(),
            Theme::Light => ThemeColors::light_default(),
        }
    }
}

/// All theme color variables for a single theme
#[derive(Clone, Debug, PartialEq)]
pub struct ThemeColors {
    pub bg: ThemeColor,
    pub bg_elevated: ThemeColor,
    pub fg: ThemeColor,
    pub fg_muted: ThemeColor,
    pub accent: ThemeColor,
    pub error: ThemeColor,
    pub link: ThemeColor,
    pub prompt: ThemeColor,
    pub border: ThemeColor,

    // ANSI palette (16 standard colors) backing the color-NNN classes
    pub ansi: [ThemeColor; 16],
}

impl ThemeColors {
    pub fn dark_default() -> Self {
        Self {
            bg: ThemeColor::new(0x13, 0x19, 0x26),
            bg_elevated: ThemeColor::new(0x1f, 0x1f, 0x1f),
            fg: ThemeColor::new(0xe8, 0xe4, 0xec),
            fg_muted: ThemeColor::new(0x6e, 0x64, 0x79),
            accent: ThemeColor::new(0x26, 0x57, 0xba),
            error: ThemeColor::new(0xb1, 0x0a, 0x0a),
            link: ThemeColor::new(0x8c, 0xb4, 0xe0),
            prompt: ThemeColor::new(0xd4, 0x84, 0x5a),
            border: ThemeColor::new(0x2e, 0x27, 0x38),
            ansi: [
                ThemeColor::new(0, 0, 0),
                ThemeColor::new(170, 0, 0),
                ThemeColor::new(68, 170, 68),
                ThemeColor::new(170, 85, 0),
                ThemeColor::new(0, 57, 170),
                ThemeColor::new(170, 0, 170),
                ThemeColor::new(0, 170, 170),
                ThemeColor::new(170, 170, 170),
                ThemeColor::new(85, 85, 85),
                ThemeColor::new(255, 85, 85),
                ThemeColor::new(85, 255, 85),
                ThemeColor::new(255, 255, 85),
                ThemeColor::new(85, 85, 255),
                ThemeColor::new(255, 85, 255),
                ThemeColor::new(85, 255, 255),
                ThemeColor::new(255, 255, 255),
            ],
        }
    }

    pub fn light_default() -> Self {
        Self {
            bg: ThemeColor::new(0xfa, 0xf8, 0xf2),
            bg_elevated: ThemeColor::new(0xef, 0xec, 0xe4),
            fg: ThemeColor::new(0x24, 0x20, 0x2a),
            fg_muted: ThemeColor::new(0x8a, 0x84, 0x92),
            accent: ThemeColor::new(0x26, 0x57, 0xba),
            error: ThemeColor::new(0xa0, 0x10, 0x10),
            link: ThemeColor::new(0x1a, 0x4f, 0xa0),
            prompt: ThemeColor::new(0xa0, 0x52, 0x28),
            border: ThemeColor::new(0xd8, 0xd4, 0xca),
            ansi: [
                ThemeColor::new(0, 0, 0),
                ThemeColor::new(160, 16, 16),
                ThemeColor::new(24, 128, 24),
                ThemeColor::new(146, 100, 10),
                ThemeColor::new(26, 79, 160),
                ThemeColor::new(140, 20, 140),
                ThemeColor::new(16, 130, 130),
                ThemeColor::new(90, 90, 90),
                ThemeColor::new(120, 120, 120),
                ThemeColor::new(210, 40, 40),
                ThemeColor::new(30, 160, 30),
                ThemeColor::new(180, 130, 20),
                ThemeColor::new(40, 100, 210),
                ThemeColor::new(180, 40, 180),
                ThemeColor::new(20, 160, 160),
                ThemeColor::new(40, 40, 40),
            ],
        }
    }

    /// Render as CSS custom properties for the served page
    pub fn to_css_vars(&self) -> String {
        let mut vars = String::new();
        vars.push_str(&format!("--bg: {};\n", self.bg.to_css()));
        vars.push_str(&format!("--bg-elevated: {};\n", self.bg_elevated.to_css()));
        vars.push_str(&format!("--fg: {};\n", self.fg.to_css()));
        vars.push_str(&format!("--fg-muted: {};\n", self.fg_muted.to_css()));
        vars.push_str(&format!("--accent: {};\n", self.accent.to_css()));
        vars.push_str(&format!("--error: {};\n", self.error.to_css()));
        vars.push_str(&format!("--link: {};\n", self.link.to_css()));
        vars.push_str(&format!("--prompt: {};\n", self.prompt.to_css()));
        vars.push_str(&format!("--border: {};\n", self.border.to_css()));
        for (i, color) in self.ansi.iter().enumerate() {
            vars.push_str(&format!("--ansi-{}: {};\n", i, color.to_css()));
        }
        vars
    }
}
