use iced::{Background, Border, Color};

/// All colors and font sizes used by the map and popup surfaces.
pub struct ThemeColors {
    pub is_dark: bool,
    // Text
    pub text: Color,
    pub muted: Color,
    pub hover_text: Color,
    pub error: Color,
    // Backgrounds
    pub map_bg: Color,
    pub panel_bg: Color,
    pub cell_bg: Color,
    pub selected: Color,
    pub hover: Color,
    // Session markers
    pub marker_fill: Color,
    pub marker_border: Color,
    // Font sizes (logical pixels)
    pub title_text: f32,
    pub body_text: f32,
    pub label_text: f32,
    /// Version/info line under the sidebar
    pub info_text: f32,
}

const MARKER_FILL: Color = Color::from_rgb(1.0, 138.0 / 255.0, 80.0 / 255.0);
const MARKER_BORDER: Color = Color::from_rgb(1.0, 87.0 / 255.0, 34.0 / 255.0);

impl ThemeColors {
    pub fn dark() -> Self {
        Self {
            is_dark: true,
            text: Color::from_rgba(1.0, 1.0, 1.0, 0.9),
            muted: Color::from_rgba(1.0, 1.0, 1.0, 0.45),
            hover_text: Color::from_rgb(1.0, 0.78, 0.0),
            error: Color::from_rgb(0.9, 0.2, 0.2),
            map_bg: Color::from_rgba(0.04, 0.06, 0.08, 0.55),
            panel_bg: Color::from_rgba(0.05, 0.05, 0.08, 0.92),
            cell_bg: Color::from_rgba(0.08, 0.08, 0.12, 0.6),
            selected: Color::from_rgba(0.15, 0.15, 0.22, 0.8),
            hover: Color::from_rgba(0.12, 0.12, 0.18, 0.6),
            marker_fill: MARKER_FILL,
            marker_border: MARKER_BORDER,
            title_text: 16.0,
            body_text: 13.0,
            label_text: 11.0,
            info_text: 8.0,
        }
    }

    pub fn light() -> Self {
        Self {
            is_dark: false,
            text: Color::from_rgba(0.08, 0.08, 0.08, 0.9),
            muted: Color::from_rgba(0.35, 0.35, 0.35, 0.8),
            hover_text: Color::from_rgb(0.6, 0.35, 0.0),
            error: Color::from_rgb(0.75, 0.1, 0.1),
            map_bg: Color::from_rgba(0.9, 0.92, 0.88, 0.5),
            panel_bg: Color::from_rgba(0.92, 0.92, 0.95, 0.93),
            cell_bg: Color::from_rgba(0.85, 0.85, 0.9, 0.7),
            selected: Color::from_rgba(0.75, 0.75, 0.85, 0.8),
            hover: Color::from_rgba(0.8, 0.8, 0.88, 0.6),
            marker_fill: MARKER_FILL,
            marker_border: MARKER_BORDER,
            title_text: 16.0,
            body_text: 13.0,
            label_text: 11.0,
            info_text: 7.2,
        }
    }

    pub fn toggled(&self) -> Self {
        if self.is_dark {
            Self::light()
        } else {
            Self::dark()
        }
    }

    pub fn map_bg_style(&self) -> impl Fn(&iced::Theme) -> iced::widget::container::Style {
        background(self.map_bg, 0.0)
    }

    pub fn panel_bg_style(&self) -> impl Fn(&iced::Theme) -> iced::widget::container::Style {
        background(self.panel_bg, 6.0)
    }

    pub fn cell_bg_style(&self) -> impl Fn(&iced::Theme) -> iced::widget::container::Style {
        background(self.cell_bg, 4.0)
    }

    pub fn selected_style(&self) -> impl Fn(&iced::Theme) -> iced::widget::container::Style {
        background(self.selected, 3.0)
    }

    pub fn hover_style(&self) -> impl Fn(&iced::Theme) -> iced::widget::container::Style {
        background(self.hover, 3.0)
    }

    /// Round session marker; `hot` when hovered or focused.
    pub fn marker_style(&self, hot: bool) -> impl Fn(&iced::Theme) -> iced::widget::container::Style {
        let fill = if hot { self.hover_text } else { self.marker_fill };
        let border = self.marker_border;
        move |_theme: &iced::Theme| iced::widget::container::Style {
            background: Some(Background::Color(fill)),
            border: Border {
                color: border,
                width: 2.0,
                radius: 6.0.into(),
            },
            ..Default::default()
        }
    }
}

fn background(color: Color, radius: f32) -> impl Fn(&iced::Theme) -> iced::widget::container::Style {
    move |_theme: &iced::Theme| iced::widget::container::Style {
        background: Some(Background::Color(color)),
        border: Border {
            radius: radius.into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_appearance() {
        let dark = ThemeColors::dark();
        assert!(!dark.toggled().is_dark);
        assert!(dark.toggled().toggled().is_dark);
    }

    #[test]
    fn markers_keep_their_colour_across_themes() {
        assert_eq!(ThemeColors::dark().marker_fill, ThemeColors::light().marker_fill);
    }

    #[test]
    fn hover_rows_use_the_hover_background() {
        let colors = ThemeColors::dark();
        let style = colors.hover_style()(&iced::Theme::Dark);
        assert_eq!(style.background, Some(Background::Color(colors.hover)));
        assert_ne!(colors.hover, colors.selected);
    }
}
