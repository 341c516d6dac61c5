use ratatui::style::Color;

use crate::config::Theme;

/// Theme colors resolved once per frame
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub highlight_bg: Color,
    pub highlight_fg: Color,
    pub error_fg: Color,
}

impl Palette {
    /// An empty `highlight_fg` means "pick whatever contrasts with highlight_bg"
    pub fn from_theme(theme: &Theme) -> Self {
        let highlight_bg = parse_color(&theme.highlight_bg);
        let highlight_fg = if theme.highlight_fg.trim().is_empty() {
            get_contrast_text_color(highlight_bg)
        } else {
            parse_color(&theme.highlight_fg)
        };
        Self {
            fg: parse_color(&theme.fg),
            bg: parse_color(&theme.bg),
            highlight_bg,
            highlight_fg,
            error_fg: parse_color(&theme.error_fg),
        }
    }
}

/// Parse a color string into a ratatui Color
/// Supports:
/// - Named colors: black, red, green, yellow, blue, magenta, cyan, white, gray/grey
/// - Extended named colors: darkgray, lightred, lightgreen, lightyellow, lightblue, lightmagenta, lightcyan
/// - Hex format: #RRGGBB or #RGB (short form)
/// - RGB format: rgb(255,0,0) or rgb(255, 0, 0)
/// Returns Color::White for unrecognized colors
pub fn parse_color(color_str: &str) -> Color {
    let s = color_str.trim().to_lowercase();

    match s.as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" | "lightgray" | "lightgrey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        _ => {
            if s.starts_with('#') {
                if let Some(color) = parse_hex_color(&s) {
                    return color;
                }
            } else if s.starts_with("rgb(") {
                if let Some(color) = parse_rgb_color(&s) {
                    return color;
                }
            }
            Color::White
        }
    }
}

/// Parse hex color format (#RRGGBB or #RGB)
fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.trim_start_matches('#');

    match hex.len() {
        6 => {
            let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
            let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
            let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(hex.get(0..1)?, 16).ok()?;
            let g = u8::from_str_radix(hex.get(1..2)?, 16).ok()?;
            let b = u8::from_str_radix(hex.get(2..3)?, 16).ok()?;
            // 0xF -> 0xFF
            Some(Color::Rgb((r << 4) | r, (g << 4) | g, (b << 4) | b))
        }
        _ => None,
    }
}

/// Parse RGB color format (rgb(r,g,b) or rgb(r, g, b))
fn parse_rgb_color(s: &str) -> Option<Color> {
    let content = s.strip_prefix("rgb(")?.strip_suffix(')')?;

    let parts: Vec<&str> = content.split(',').map(|s| s.trim()).collect();
    if parts.len() != 3 {
        return None;
    }

    let r = parts[0].parse::<u8>().ok()?;
    let g = parts[1].parse::<u8>().ok()?;
    let b = parts[2].parse::<u8>().ok()?;

    Some(Color::Rgb(r, g, b))
}

/// Relative luminance (WCAG formula), 0.0 dark to 1.0 light
fn calculate_luminance(r: u8, g: u8, b: u8) -> f64 {
    let linear = |c: u8| {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// Gray renders light in most terminals, so it is not counted as dark
fn is_dark_color(color: Color) -> bool {
    matches!(
        color,
        Color::Black | Color::Blue | Color::Magenta | Color::Red | Color::DarkGray
    )
}

/// Black text for light backgrounds, white text for dark ones
pub fn get_contrast_text_color(background: Color) -> Color {
    let dark = match background {
        Color::Rgb(r, g, b) => calculate_luminance(r, g, b) < 0.5,
        other => is_dark_color(other),
    };
    if dark { Color::White } else { Color::Black }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_hex_and_rgb() {
        assert_eq!(parse_color("Blue"), Color::Blue);
        assert_eq!(parse_color("#ff0000"), Color::Rgb(255, 0, 0));
        assert_eq!(parse_color("#0f0"), Color::Rgb(0, 255, 0));
        assert_eq!(parse_color("rgb(1, 2, 3)"), Color::Rgb(1, 2, 3));
        assert_eq!(parse_color("chartreuse-ish"), Color::White);
    }

    #[test]
    fn contrast_follows_background() {
        assert_eq!(get_contrast_text_color(Color::Blue), Color::White);
        assert_eq!(get_contrast_text_color(Color::Yellow), Color::Black);
        assert_eq!(get_contrast_text_color(Color::Rgb(250, 250, 250)), Color::Black);
        assert_eq!(get_contrast_text_color(Color::Rgb(10, 10, 40)), Color::White);
    }

    #[test]
    fn palette_derives_highlight_fg() {
        let palette = Palette::from_theme(&Theme::default());
        assert_eq!(palette.highlight_bg, Color::Blue);
        assert_eq!(palette.highlight_fg, Color::White);
        assert_eq!(palette.error_fg, Color::Red);
    }
}
