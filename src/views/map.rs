use iced::widget::text::Shaping;
use iced::widget::{column, container, mouse_area, pin, responsive, row, space, stack, text};
use iced::{mouse, Element, Font, Length};

use crate::app::{Dashboard, MapMode, Message, EDGE_MARGIN};
use crate::projection::{Projection, ScreenPoint};
use crate::sidebar::SidebarStatus;
use crate::util::truncate_str;

const MARKER_SIZE: f32 = 12.0;
const SIDEBAR_WIDTH: f32 = 340.0;
const MAX_VISIBLE_ROWS: usize = 24;
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

impl Dashboard {
    pub(crate) fn view_map(&self) -> Element<'_, Message> {
        let colors = &self.colors;
        let focused = self.mode == MapMode::Focused;

        let map = responsive(move |size| {
            let view = self.view.with_size(size.width, size.height);
            let projection = self.projection;
            let backdrop = container(space::horizontal())
                .width(Length::Fill)
                .height(Length::Fill)
                .style(colors.map_bg_style());
            let backdrop: Element<'_, Message> = if focused {
                mouse_area(backdrop)
                    .on_move(move |p| {
                        let at = ScreenPoint { x: p.x, y: p.y };
                        Message::PointerMoved(projection.unproject_from_screen(at, &view))
                    })
                    .on_press(Message::RecenterMap)
                    .into()
            } else {
                backdrop.into()
            };
            let mut layer = stack![backdrop];

            for marker in self.markers.iter().flat_map(|m| m.iter()) {
                let at = self.projection.project_to_screen(marker.world, &view);
                if at.x < 0.0 || at.y < 0.0 || at.x > size.width || at.y > size.height {
                    continue;
                }
                let hovered = self.hovered_marker.as_ref() == Some(&marker.session_id);
                let is_open = self
                    .popup
                    .as_ref()
                    .is_some_and(|p| p.session_id == marker.session_id);
                let dot = container(space::horizontal())
                    .width(MARKER_SIZE)
                    .height(MARKER_SIZE)
                    .style(colors.marker_style(hovered || is_open));

                let mut body = row![dot].spacing(4).align_y(iced::alignment::Vertical::Center);
                if hovered {
                    let label = marker.snapshot.api_key().unwrap_or("(unknown)");
                    body = body.push(
                        container(
                            text(truncate_str(label, 32))
                                .size(colors.label_text)
                                .color(colors.text)
                                .font(Font::MONOSPACE),
                        )
                        .padding([1, 4])
                        .style(colors.panel_bg_style()),
                    );
                }

                let element: Element<'_, Message> = if focused {
                    mouse_area(body)
                        .on_press(Message::MarkerClicked(marker.session_id.clone()))
                        .on_enter(Message::HoverMarker(marker.session_id.clone()))
                        .on_exit(Message::UnhoverMarker(marker.session_id.clone()))
                        .interaction(mouse::Interaction::Pointer)
                        .into()
                } else {
                    body.into()
                };
                let half = MARKER_SIZE / 2.0;
                layer = layer.push(pin(element).x(at.x - half).y(at.y - half));
            }
            layer.into()
        });

        let mut body = row![map].spacing(12).width(Length::Fill).height(Length::Fill);
        if self.sidebar.is_visible() {
            body = body.push(self.view_sidebar());
        }

        let pointer = match (focused, self.pointer_world) {
            (true, Some(w)) => format!("x={:.0} y={:.0}   ", w.x, w.y),
            _ => String::new(),
        };
        let info_row = row![
            space::horizontal(),
            text(pointer)
                .size(colors.info_text)
                .color(colors.muted)
                .font(Font::MONOSPACE),
            text(format!(
                "v{} {}",
                env!("SESSION_MAP_VERSION"),
                env!("SESSION_MAP_COMMIT"),
            ))
            .size(colors.info_text)
            .color(colors.muted)
            .font(Font::MONOSPACE)
        ];

        column![
            container(body)
                .padding(EDGE_MARGIN)
                .width(Length::Fill)
                .height(Length::Fill),
            container(info_row)
                .padding(iced::Padding {
                    top: 0.0,
                    right: EDGE_MARGIN as f32,
                    bottom: 8.0,
                    left: 0.0,
                })
                .width(Length::Fill),
        ]
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }

    fn view_sidebar(&self) -> Element<'_, Message> {
        let colors = &self.colors;
        let mono = Font::MONOSPACE;
        let shaped = Shaping::Advanced;
        let focused = self.mode == MapMode::Focused;

        let spinner = if self.sidebar.loading {
            SPINNER[self.spinner_frame % SPINNER.len()]
        } else {
            ""
        };
        let header = row![
            text("Sessions")
                .size(colors.title_text)
                .color(colors.text)
                .font(mono),
            space::horizontal(),
            text(spinner)
                .size(colors.title_text)
                .color(colors.muted)
                .font(mono)
                .shaping(shaped),
        ];

        let mut list = column![].spacing(2);
        match self.sidebar.status() {
            SidebarStatus::Idle => {
                list = list.push(
                    text("Not loaded")
                        .size(colors.body_text)
                        .color(colors.muted)
                        .font(mono),
                );
            }
            SidebarStatus::Empty => {
                list = list.push(
                    text("No active sessions")
                        .size(colors.body_text)
                        .color(colors.muted)
                        .font(mono),
                );
            }
            SidebarStatus::Error(message) => {
                list = list.push(
                    text(message.as_str())
                        .size(colors.body_text)
                        .color(colors.error)
                        .font(mono),
                );
            }
            SidebarStatus::Rows => {
                let rows = self.sidebar.rows();
                for row_data in &rows[self.sidebar.visible_window(MAX_VISIBLE_ROWS)] {
                    let entry = column![
                        text(truncate_str(&row_data.label, 40))
                            .size(colors.body_text)
                            .color(colors.text)
                            .font(mono)
                            .shaping(shaped),
                        text(truncate_str(&row_data.meta, 48))
                            .size(colors.label_text)
                            .color(colors.muted)
                            .font(mono)
                            .shaping(shaped),
                    ];
                    let marker_hovered = self
                        .hovered_marker
                        .as_ref()
                        .is_some_and(|id| id.matches(&row_data.id));
                    let boxed = if self.sidebar.is_active(row_data) {
                        container(entry).style(colors.selected_style())
                    } else if marker_hovered {
                        container(entry).style(colors.hover_style())
                    } else {
                        container(entry)
                    }
                    .padding([3, 6])
                    .width(Length::Fill);

                    if focused {
                        list = list.push(
                            mouse_area(boxed)
                                .on_press(Message::SelectRow(row_data.id.clone()))
                                .interaction(mouse::Interaction::Pointer),
                        );
                    } else {
                        list = list.push(boxed);
                    }
                }
                let hidden = rows.len().saturating_sub(MAX_VISIBLE_ROWS);
                if hidden > 0 {
                    list = list.push(
                        text(format!("{hidden} more"))
                            .size(colors.label_text)
                            .color(colors.muted)
                            .font(mono),
                    );
                }
            }
        }

        container(column![header, list].spacing(10))
            .padding(12)
            .width(SIDEBAR_WIDTH)
            .height(Length::Fill)
            .style(colors.panel_bg_style())
            .into()
    }
}
