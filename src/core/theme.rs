//! Fixed terminal color theme
//!
//! The window uses one hardcoded foreground/background pair. Only those two
//! entries override the emulator's palette; the 256-color table keeps the
//! library defaults.

use wezterm_cell::color::RgbColor;
use wezterm_term::color::ColorPalette;

/// Foreground text color (sRGB 0.85, 0.9, 0.94)
const FOREGROUND: (u8, u8, u8) = (217, 230, 240);

/// Background color (sRGB 0.1, 0.1, 0.1)
const BACKGROUND: (u8, u8, u8) = (26, 26, 26);

/// Selection highlight color
const SELECTION: (u8, u8, u8) = (70, 130, 180);

/// The terminal color theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Theme;

impl Theme {
    /// Convert this theme to a wezterm ColorPalette.
    ///
    /// Only foreground and background are overridden; ANSI and indexed
    /// colors resolve through the default palette.
    pub fn to_color_palette(&self) -> ColorPalette {
        let mut cp = ColorPalette::default();
        cp.foreground = RgbColor::new_8bpc(FOREGROUND.0, FOREGROUND.1, FOREGROUND.2).into();
        cp.background = RgbColor::new_8bpc(BACKGROUND.0, BACKGROUND.1, BACKGROUND.2).into();
        cp
    }

    /// Get the background color
    pub fn background(&self) -> egui::Color32 {
        egui::Color32::from_rgb(BACKGROUND.0, BACKGROUND.1, BACKGROUND.2)
    }

    /// Get the foreground color
    pub fn foreground(&self) -> egui::Color32 {
        egui::Color32::from_rgb(FOREGROUND.0, FOREGROUND.1, FOREGROUND.2)
    }

    /// Get the selection background color
    pub fn selection_background(&self) -> egui::Color32 {
        egui::Color32::from_rgb(SELECTION.0, SELECTION.1, SELECTION.2)
    }

    /// Get the cursor block color
    pub fn cursor(&self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(200, 200, 200, 220)
    }

    /// Get the context menu background color
    pub fn popup_background(&self) -> egui::Color32 {
        egui::Color32::from_rgb(40, 40, 40)
    }

    /// Get the context menu border color
    pub fn popup_border(&self) -> egui::Color32 {
        egui::Color32::from_rgb(80, 80, 80)
    }

    /// Get the foreground color for unavailable menu entries
    pub fn disabled_foreground(&self) -> egui::Color32 {
        egui::Color32::from_rgb(120, 120, 120)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_overrides_fg_bg_only() {
        let theme = Theme;
        let palette = theme.to_color_palette();
        let default_palette = ColorPalette::default();

        assert_ne!(palette.foreground, default_palette.foreground);
        assert_ne!(palette.background, default_palette.background);
        // Indexed colors stay at library defaults
        for i in 0..16u8 {
            let attr = wezterm_cell::color::ColorAttribute::PaletteIndex(i);
            assert_eq!(palette.resolve_fg(attr), default_palette.resolve_fg(attr));
        }
    }

    #[test]
    fn test_theme_contrast() {
        let theme = Theme;
        // Light text on dark background
        assert!(theme.foreground().r() > theme.background().r());
        assert!(theme.foreground().g() > theme.background().g());
    }
}
