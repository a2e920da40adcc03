use std::sync::Arc;

use crate::config::{Credentials, DashboardConfig};
use crate::fetch::FetchGate;
use crate::icons::IconResolver;
use crate::ipc;
use crate::markers::MarkerLayer;
use crate::panels::PanelKind;
use crate::popup::IconUpdate;
use crate::projection::{TileProjection, ViewState};
use crate::readiness::{ReadinessCoordinator, RetryStep, RetryToken};
use crate::registry::Registry;
use crate::sidebar::Sidebar;
use crate::snapshot::{SessionId, SessionSnapshot, WorldPoint};
use crate::surface::*;
use crate::sync::{Effect, FocusProvider, SelectionSync};
use crate::theme::ThemeColors;

use iced::{Color, Element, Subscription, Task};
use iced_layershell::build_pattern::daemon;
use iced_layershell::settings::{LayerShellSettings, StartMode};
use iced_layershell::to_layer_message;

pub(crate) type IcedId = iced_layershell::reexport::IcedId;

pub(crate) const EDGE_MARGIN: u16 = 40;

const TICK_MS: u64 = 80;

// --- Dashboard State ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MapMode {
    Hidden,
    Visible,
    Focused,
}

/// The open popup surface and whose marker it shows.
pub(crate) struct PopupSurface {
    pub(crate) surface_id: IcedId,
    pub(crate) session_id: SessionId,
}

pub(crate) struct Dashboard {
    pub(crate) mode: MapMode,
    pub(crate) surface_id: Option<IcedId>,
    config: DashboardConfig,
    credentials: Credentials,
    pub(crate) colors: ThemeColors,
    registry: Arc<Registry>,
    /// Present while the map surface exists.
    pub(crate) markers: Option<MarkerLayer>,
    pub(crate) sidebar: Sidebar,
    /// Attached once the sidebar has rendered for the first time.
    selection: Option<SelectionSync>,
    coordinator: ReadinessCoordinator<Arc<Registry>>,
    fetches: FetchGate,
    pub(crate) popup: Option<PopupSurface>,
    pub(crate) view: ViewState,
    pub(crate) projection: TileProjection,
    icons: IconResolver,
    pub(crate) hovered_marker: Option<SessionId>,
    pub(crate) pointer_world: Option<WorldPoint>,
    pub(crate) spinner_frame: usize,
}

#[to_layer_message(multi)]
#[derive(Debug, Clone)]
pub(crate) enum Message {
    ToggleVisibility,
    ToggleFocus,
    TogglePanel,
    ClosePanel,
    Refresh,
    /// Tagged with the [`FetchGate`] epoch the request started under.
    SessionsFetched(u64, Result<Vec<SessionSnapshot>, String>),
    RetryRebuild(RetryToken),
    SelectRow(SessionId),
    MarkerClicked(SessionId),
    /// Pointer over the map backdrop, in world coordinates.
    PointerMoved(WorldPoint),
    RecenterMap,
    HoverMarker(SessionId),
    UnhoverMarker(SessionId),
    FocusSession(SessionId),
    PopulatePopup(SessionId),
    ClearMarkers,
    SelectTab(PanelKind),
    ClosePopup,
    IconResolved(IconUpdate),
    CopyPanelHtml,
    ThemeToggle,
    Logout,
    Tick,
}

pub(crate) fn run() -> Result<(), iced_layershell::Error> {
    tracing::info!(
        "v{} ({}) starting in background mode",
        env!("SESSION_MAP_VERSION"),
        env!("SESSION_MAP_COMMIT")
    );

    let settings = LayerShellSettings {
        start_mode: StartMode::Background,
        ..Default::default()
    };

    daemon(
        Dashboard::new,
        Dashboard::namespace,
        Dashboard::update,
        Dashboard::view,
    )
    .style(Dashboard::style)
    .subscription(Dashboard::subscription)
    .layer_settings(settings)
    .run()
}

/// Hand a registry to the marker layer if the map is mounted.
fn deliver(markers: &mut Option<MarkerLayer>, registry: &Registry) -> bool {
    match markers {
        Some(layer) => {
            layer.rebuild(registry.sessions());
            true
        }
        None => false,
    }
}

/// Create the marker layer and offer it the current registry, unless a
/// delivery is already waiting for it or there is nothing to plot.
fn mount(
    coordinator: &mut ReadinessCoordinator<Arc<Registry>>,
    registry: &Arc<Registry>,
    markers: &mut Option<MarkerLayer>,
) -> Option<RetryStep> {
    *markers = Some(MarkerLayer::default());
    if coordinator.is_pending() || registry.is_empty() {
        return None;
    }
    Some(coordinator.submit(Arc::clone(registry), |r| deliver(markers, r)))
}

/// Drop the marker layer along with any delivery still waiting for it.
fn unmount(coordinator: &mut ReadinessCoordinator<Arc<Registry>>, markers: &mut Option<MarkerLayer>) {
    coordinator.cancel();
    *markers = None;
}

#[derive(Debug, PartialEq)]
enum PopupFollowUp {
    Nothing,
    Repopulate(SessionId),
    Close,
}

/// What an open popup needs once the markers were recreated.
fn popup_follow_up(open: Option<&SessionId>, markers: Option<&MarkerLayer>) -> PopupFollowUp {
    let Some(id) = open else {
        return PopupFollowUp::Nothing;
    };
    if markers.is_some_and(|m| m.find(id).is_some()) {
        PopupFollowUp::Repopulate(id.clone())
    } else {
        PopupFollowUp::Close
    }
}

impl Dashboard {
    fn new() -> (Self, Task<Message>) {
        let config = DashboardConfig::load();
        let credentials = Credentials::user();
        if let Some(name) = &config.screen {
            tracing::info!("target screen: {name}");
        }
        if config.host().is_none() {
            tracing::warn!("no api_host configured; session fetches will fail");
        }

        let [x, y] = config.map.center;
        let view = ViewState {
            center: WorldPoint { x, y, plane: 0.0 },
            width: 0.0,
            height: 0.0,
        };
        let projection = TileProjection {
            tile_px: config.map.tile_px,
        };
        let icons = IconResolver::new(&config.icons);

        let (id, open_task) = Message::layershell_open(visible_settings(config.screen.as_deref()));
        tracing::info!("booting -> Visible (surface {id})");

        let mut dashboard = Self {
            mode: MapMode::Visible,
            surface_id: Some(id),
            config,
            credentials,
            colors: ThemeColors::dark(),
            registry: Arc::new(Registry::default()),
            markers: Some(MarkerLayer::default()),
            sidebar: Sidebar::default(),
            selection: None,
            coordinator: ReadinessCoordinator::default(),
            fetches: FetchGate::default(),
            popup: None,
            view,
            projection,
            icons,
            hovered_marker: None,
            pointer_world: None,
            spinner_frame: 0,
        };

        // Without a credential the backend would only answer 401.
        let fetch_task = if dashboard.credentials.token().is_some() {
            dashboard.fetch()
        } else {
            tracing::info!("no stored credential; waiting for refresh");
            Task::none()
        };
        (dashboard, Task::batch([open_task, fetch_task]))
    }

    fn namespace() -> String {
        String::from("session-map")
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ToggleVisibility => match self.mode {
                MapMode::Hidden => self.show(MapMode::Visible),
                mode @ (MapMode::Visible | MapMode::Focused) => {
                    tracing::info!("{mode:?} -> Hidden");
                    self.hide()
                }
            },
            Message::ToggleFocus => match self.mode {
                MapMode::Hidden | MapMode::Visible => self.show(MapMode::Focused),
                MapMode::Focused => {
                    let popup_task = self.close_popup_task();
                    Task::batch([popup_task, self.show(MapMode::Visible)])
                }
            },
            Message::TogglePanel => {
                self.sidebar.toggle();
                if self.sidebar.is_visible() {
                    self.fetch()
                } else {
                    Task::none()
                }
            }
            Message::ClosePanel => {
                self.sidebar.hide();
                Task::none()
            }
            Message::Refresh => self.fetch(),
            Message::SessionsFetched(epoch, result) => {
                if !self.fetches.finish(epoch) {
                    tracing::debug!("dropping session fetch from before logout");
                    return Task::none();
                }
                self.sidebar.loading = false;
                match result {
                    Ok(snapshots) => {
                        let registry = Arc::new(Registry::from_snapshots(snapshots));
                        self.registry = Arc::clone(&registry);
                        self.sidebar.render(&registry);
                        self.selection.get_or_insert_with(SelectionSync::default);
                        let markers = &mut self.markers;
                        let step = self.coordinator.submit(registry, |r| deliver(markers, r));
                        self.schedule(step)
                    }
                    Err(e) => {
                        tracing::warn!("session fetch failed: {e}");
                        self.sidebar.render_error(&e);
                        self.selection.get_or_insert_with(SelectionSync::default);
                        Task::none()
                    }
                }
            }
            Message::RetryRebuild(token) => {
                let markers = &mut self.markers;
                let step = self.coordinator.retry(token, |r| deliver(markers, r));
                self.schedule(step)
            }
            Message::SelectRow(id) => {
                let effects = match self.selection.as_mut() {
                    Some(sync) => sync.on_row_selected(&id, self.markers.as_ref(), &mut self.sidebar),
                    None => {
                        self.sidebar.select(&id);
                        vec![Effect::OpenPopup(id)]
                    }
                };
                self.run_effects(effects)
            }
            Message::MarkerClicked(id) => {
                let Some(markers) = self.markers.as_ref() else {
                    return Task::none();
                };
                let focus = self
                    .selection
                    .as_mut()
                    .map(|sync| sync as &mut dyn FocusProvider);
                let effects = markers.click(&id, &mut self.sidebar, focus);
                self.run_effects(effects)
            }
            Message::PointerMoved(world) => {
                self.pointer_world = Some(world);
                Task::none()
            }
            Message::RecenterMap => {
                if let Some(world) = self.pointer_world {
                    self.view.pan_to(world);
                }
                Task::none()
            }
            Message::HoverMarker(id) => {
                self.hovered_marker = Some(id);
                Task::none()
            }
            Message::UnhoverMarker(id) => {
                if self.hovered_marker.as_ref() == Some(&id) {
                    self.hovered_marker = None;
                }
                Task::none()
            }
            Message::FocusSession(id) => {
                if self.registry.get(&id).is_none() {
                    tracing::debug!("focus: session {id} not in the last fetch");
                }
                let sync = self.selection.get_or_insert_with(SelectionSync::default);
                let effects = sync.focus(&id, self.markers.as_ref(), &mut self.sidebar);
                self.run_effects(effects)
            }
            Message::PopulatePopup(id) => self.populate_popup(&id),
            Message::ClearMarkers => {
                if let Some(markers) = &mut self.markers {
                    markers.clear();
                }
                self.hovered_marker = None;
                tracing::info!("markers cleared");
                self.close_popup_task()
            }
            Message::SelectTab(kind) => {
                if let Some(popup) = &self.popup {
                    if let Some(marker) = self
                        .markers
                        .as_mut()
                        .and_then(|m| m.find_mut(&popup.session_id))
                    {
                        marker.popup.select_tab(kind);
                    }
                }
                Task::none()
            }
            Message::ClosePopup => self.close_popup_task(),
            Message::IconResolved(update) => {
                if let Some(marker) = self
                    .markers
                    .as_mut()
                    .and_then(|m| m.find_mut(&update.session_id))
                {
                    marker.popup.apply_icon(update);
                }
                Task::none()
            }
            Message::CopyPanelHtml => {
                let html = self.popup.as_ref().and_then(|popup| {
                    let marker = self.markers.as_ref()?.find(&popup.session_id)?;
                    Some(marker.popup.panel(marker.popup.visible()).to_html())
                });
                if let Some(html) = html {
                    ipc::copy_to_clipboard(html);
                }
                Task::none()
            }
            Message::ThemeToggle => {
                self.colors = self.colors.toggled();
                tracing::info!(
                    "theme toggle -> {}",
                    if self.colors.is_dark { "dark" } else { "light" }
                );
                Task::none()
            }
            Message::Logout => {
                if let Err(e) = self.credentials.clear() {
                    tracing::error!("logout: {e}");
                }
                self.fetches.invalidate();
                self.sidebar.loading = false;
                self.coordinator.cancel();
                self.registry = Arc::new(Registry::default());
                self.sidebar.clear();
                if let Some(sync) = &mut self.selection {
                    sync.clear();
                }
                if let Some(markers) = &mut self.markers {
                    markers.clear();
                }
                self.hovered_marker = None;
                tracing::info!("logged out");
                self.close_popup_task()
            }
            Message::Tick => {
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
                Task::none()
            }
            _ => Task::none(),
        }
    }

    /// Open the map surface in `mode`, replacing the current one.
    fn show(&mut self, mode: MapMode) -> Task<Message> {
        let remove_task = match self.surface_id.take() {
            Some(id) => Task::done(Message::RemoveWindow(id)),
            None => Task::none(),
        };
        let settings = match mode {
            MapMode::Focused => focused_settings(self.config.screen.as_deref()),
            _ => visible_settings(self.config.screen.as_deref()),
        };
        let (id, open_task) = Message::layershell_open(settings);
        tracing::info!("{:?} -> {mode:?}", self.mode);
        self.surface_id = Some(id);
        let was_hidden = self.mode == MapMode::Hidden;
        self.mode = mode;
        let mount_task = if was_hidden { self.mount() } else { Task::none() };
        Task::batch([remove_task, open_task, mount_task])
    }

    fn hide(&mut self) -> Task<Message> {
        let popup_task = self.close_popup_task();
        let remove_task = match self.surface_id.take() {
            Some(id) => Task::done(Message::RemoveWindow(id)),
            None => Task::none(),
        };
        self.mode = MapMode::Hidden;
        unmount(&mut self.coordinator, &mut self.markers);
        self.hovered_marker = None;
        self.pointer_world = None;
        if let Some(sync) = &mut self.selection {
            sync.clear();
        }
        Task::batch([popup_task, remove_task])
    }

    fn mount(&mut self) -> Task<Message> {
        match mount(&mut self.coordinator, &self.registry, &mut self.markers) {
            Some(step) => self.schedule(step),
            None => Task::none(),
        }
    }

    fn schedule(&mut self, step: RetryStep) -> Task<Message> {
        match step {
            RetryStep::Delivered => self.after_rebuild(),
            RetryStep::Scheduled {
                token,
                after,
                cancel,
            } => ipc::delayed(after, Some(cancel), Message::RetryRebuild(token)),
            RetryStep::Exhausted | RetryStep::Stale => Task::none(),
        }
    }

    /// Markers were recreated: point an open popup at its new marker, or close
    /// it when the session is gone.
    fn after_rebuild(&mut self) -> Task<Message> {
        let open = self.popup.as_ref().map(|p| &p.session_id);
        match popup_follow_up(open, self.markers.as_ref()) {
            PopupFollowUp::Nothing => Task::none(),
            PopupFollowUp::Repopulate(id) => self.populate_popup(&id),
            PopupFollowUp::Close => self.close_popup_task(),
        }
    }

    /// Start a fetch unless one is already running; its result serves both.
    fn fetch(&mut self) -> Task<Message> {
        let Some(epoch) = self.fetches.begin() else {
            return Task::none();
        };
        self.sidebar.loading = true;
        ipc::fetch_sessions(self.config.clone(), self.credentials.token(), epoch)
    }

    fn run_effects(&mut self, effects: Vec<Effect>) -> Task<Message> {
        let tasks: Vec<Task<Message>> = effects
            .into_iter()
            .map(|effect| self.run_effect(effect))
            .collect();
        Task::batch(tasks)
    }

    fn run_effect(&mut self, effect: Effect) -> Task<Message> {
        match effect {
            Effect::ShowSidebar => {
                self.sidebar.show();
                Task::none()
            }
            Effect::PanTo(target) => {
                self.view.pan_to(target);
                Task::none()
            }
            Effect::OpenPopup(id) => self.open_popup(&id),
            Effect::ClosePopupExcept(id) => {
                if self.popup.as_ref().is_some_and(|p| !p.session_id.matches(&id)) {
                    self.close_popup_task()
                } else {
                    Task::none()
                }
            }
            Effect::RepopulateAfter(id, after) => {
                ipc::delayed(after, None, Message::PopulatePopup(id))
            }
            Effect::ActivateRow(id) => self.update(Message::SelectRow(id)),
            Effect::Fetch => self.fetch(),
        }
    }

    fn open_popup(&mut self, id: &SessionId) -> Task<Message> {
        let Some(marker) = self.markers.as_ref().and_then(|m| m.find(id)) else {
            return Task::none();
        };
        let session_id = marker.session_id.clone();
        let surface_task = match &mut self.popup {
            Some(popup) => {
                popup.session_id = session_id.clone();
                Task::none()
            }
            None => {
                let (surface_id, task) =
                    Message::layershell_open(popup_settings(self.config.screen.as_deref()));
                tracing::info!("popup opened for session {session_id}");
                self.popup = Some(PopupSurface {
                    surface_id,
                    session_id: session_id.clone(),
                });
                task
            }
        };
        Task::batch([surface_task, self.populate_popup(&session_id)])
    }

    /// Re-render a marker's popup from its current snapshot.
    fn populate_popup(&mut self, id: &SessionId) -> Task<Message> {
        let Some(marker) = self.markers.as_mut().and_then(|m| m.find_mut(id)) else {
            tracing::debug!("populate: no marker for session {id}");
            return Task::none();
        };
        let jobs = marker.popup.populate(&marker.snapshot, &self.icons);
        ipc::resolve_icons(jobs)
    }

    fn close_popup_task(&mut self) -> Task<Message> {
        match self.popup.take() {
            Some(popup) => Task::done(Message::RemoveWindow(popup.surface_id)),
            None => Task::none(),
        }
    }

    fn view(&self, window_id: IcedId) -> Element<'_, Message> {
        if let Some(popup) = &self.popup {
            if window_id == popup.surface_id {
                return self.view_popup(popup);
            }
        }
        self.view_map()
    }

    fn subscription(state: &Self) -> Subscription<Message> {
        let mut subs = vec![Subscription::run(ipc::socket_listener)];
        if state.fetches.in_flight() && state.mode != MapMode::Hidden {
            subs.push(Subscription::run_with(TICK_MS, ipc::tick_stream));
        }
        Subscription::batch(subs)
    }

    fn style(&self, _theme: &iced::Theme) -> iced::theme::Style {
        iced::theme::Style {
            background_color: Color::TRANSPARENT,
            text_color: self.colors.text,
        }
    }
}
