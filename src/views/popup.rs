use iced::widget::text::Shaping;
use iced::widget::{column, container, image as iced_image, mouse_area, row, scrollable, space, text};
use iced::{mouse, Element, Font, Length};

use crate::app::{Dashboard, Message, PopupSurface};
use crate::icons::{IconSlot, IconState};
use crate::panels::{ItemCell, Overview, PanelBody, SkillCell};
use crate::popup::PopupShell;
use crate::util::truncate_str;

const ICON_SIZE: f32 = 32.0;
const ITEMS_PER_ROW: usize = 8;
const SKILLS_PER_ROW: usize = 3;

impl Dashboard {
    pub(crate) fn view_popup(&self, popup: &PopupSurface) -> Element<'_, Message> {
        let colors = &self.colors;
        let mono = Font::MONOSPACE;

        let Some(marker) = self
            .markers
            .as_ref()
            .and_then(|m| m.find(&popup.session_id))
        else {
            return container(text("Session no longer on the map").color(colors.muted))
                .padding(24)
                .width(Length::Fill)
                .height(Length::Fill)
                .style(colors.panel_bg_style())
                .into();
        };
        let shell = &marker.popup;

        let title = marker
            .snapshot
            .api_key()
            .map(str::to_string)
            .unwrap_or_else(|| marker.session_id.to_string());
        let button = |label: &'static str, msg: Message| {
            mouse_area(
                text(label)
                    .size(colors.body_text)
                    .color(colors.muted)
                    .font(mono),
            )
            .on_press(msg)
            .interaction(mouse::Interaction::Pointer)
        };
        let title_row = row![
            text(truncate_str(&title, 40))
                .size(colors.title_text)
                .color(colors.text)
                .font(mono)
                .shaping(Shaping::Advanced),
            space::horizontal(),
            button("copy html", Message::CopyPanelHtml),
            text("   "),
            button("close", Message::ClosePopup),
        ];

        let content = column![
            title_row,
            self.view_tabs(shell),
            self.view_panel(shell.panel(shell.visible()))
        ]
        .spacing(12)
        .width(Length::Fill)
        .height(Length::Fill);

        container(content)
            .padding(20)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(colors.panel_bg_style())
            .into()
    }

    fn view_tabs(&self, shell: &PopupShell) -> Element<'_, Message> {
        let colors = &self.colors;
        let mut tabs = row![].spacing(6);
        for binding in shell.tabs() {
            let label = text(binding.panel.label())
                .size(colors.body_text)
                .color(colors.text)
                .font(Font::MONOSPACE);
            let tab = if binding.panel == shell.visible() {
                container(label).style(colors.selected_style())
            } else {
                container(label).style(colors.cell_bg_style())
            }
            .padding([4, 10]);
            tabs = tabs.push(
                mouse_area(tab)
                    .on_press(Message::SelectTab(binding.panel))
                    .interaction(mouse::Interaction::Pointer),
            );
        }
        tabs.into()
    }

    fn view_panel<'a>(&'a self, body: &'a PanelBody) -> Element<'a, Message> {
        let colors = &self.colors;
        let mono = Font::MONOSPACE;
        match body {
            PanelBody::Blank => text("Loading...")
                .size(colors.body_text)
                .color(colors.muted)
                .font(mono)
                .into(),
            PanelBody::Overview(overview) => self.view_overview(overview),
            PanelBody::Items { cells, scroll } => {
                let grid = self.view_item_grid(cells);
                if *scroll {
                    scrollable(grid).height(Length::Fill).into()
                } else {
                    grid
                }
            }
            PanelBody::Skills { cells, total_level } => column![
                scrollable(self.view_skill_grid(cells)).height(Length::Fill),
                text(format!("Total level: {total_level}"))
                    .size(colors.body_text)
                    .color(colors.text)
                    .font(mono),
            ]
            .spacing(8)
            .into(),
            PanelBody::Empty(message) => text(*message)
                .size(colors.body_text)
                .color(colors.muted)
                .font(mono)
                .into(),
            PanelBody::Failed(message) => text(*message)
                .size(colors.body_text)
                .color(colors.error)
                .font(mono)
                .into(),
        }
    }

    fn view_overview<'a>(&'a self, overview: &'a Overview) -> Element<'a, Message> {
        let colors = &self.colors;
        let line = |s: String| {
            text(s)
                .size(colors.body_text)
                .color(colors.text)
                .font(Font::MONOSPACE)
                .shaping(Shaping::Advanced)
        };
        let mut col = column![text(overview.title.as_str())
            .size(colors.title_text)
            .color(colors.text)
            .font(Font::MONOSPACE)
            .shaping(Shaping::Advanced)]
        .spacing(4);
        if let Some(issued) = &overview.issued {
            col = col.push(line(format!("Issued: {issued}")));
        }
        if let Some(last) = &overview.last {
            col = col.push(line(format!("Last: {last}")));
        }
        if let Some([x, y, z]) = &overview.location {
            col = col.push(line(format!("Location: x={x} y={y} z={z}")));
        }
        col.into()
    }

    fn view_item_grid<'a>(&'a self, cells: &'a [ItemCell]) -> Element<'a, Message> {
        let colors = &self.colors;
        let mut grid = column![].spacing(4);
        for chunk in cells.chunks(ITEMS_PER_ROW) {
            let mut line = row![].spacing(4);
            for cell in chunk {
                let qty = cell.quantity.as_deref().unwrap_or("");
                let boxed = container(
                    column![
                        self.view_icon(&cell.icon),
                        text(qty)
                            .size(colors.label_text)
                            .color(colors.muted)
                            .font(Font::MONOSPACE),
                    ]
                    .align_x(iced::alignment::Horizontal::Center),
                )
                .padding(3)
                .width(ICON_SIZE + 14.0)
                .style(colors.cell_bg_style());
                line = line.push(boxed);
            }
            grid = grid.push(line);
        }
        grid.into()
    }

    fn view_skill_grid<'a>(&'a self, cells: &'a [SkillCell]) -> Element<'a, Message> {
        let colors = &self.colors;
        let mut grid = column![].spacing(4);
        for chunk in cells.chunks(SKILLS_PER_ROW) {
            let mut line = row![].spacing(4);
            for cell in chunk {
                let meta = column![
                    text(cell.name.as_str())
                        .size(colors.label_text)
                        .color(colors.muted)
                        .font(Font::MONOSPACE),
                    text(cell.level.to_string())
                        .size(colors.body_text)
                        .color(colors.text)
                        .font(Font::MONOSPACE),
                ];
                let boxed = container(
                    row![self.view_icon(&cell.icon), meta]
                        .spacing(6)
                        .align_y(iced::alignment::Vertical::Center),
                )
                .padding(4)
                .width(Length::FillPortion(1))
                .style(colors.cell_bg_style());
                line = line.push(boxed);
            }
            grid = grid.push(line);
        }
        grid.into()
    }

    fn view_icon<'a>(&'a self, slot: &'a IconSlot) -> Element<'a, Message> {
        let colors = &self.colors;
        match &slot.state {
            IconState::Loaded(handle) => iced_image(handle.clone())
                .width(ICON_SIZE)
                .height(ICON_SIZE)
                .into(),
            state => {
                let color = if matches!(state, IconState::Pending) {
                    colors.muted
                } else {
                    colors.text
                };
                container(
                    text(slot.badge.as_str())
                        .size(colors.label_text)
                        .color(color)
                        .font(Font::MONOSPACE),
                )
                .center_x(ICON_SIZE)
                .center_y(ICON_SIZE)
                .into()
            }
        }
    }
}
