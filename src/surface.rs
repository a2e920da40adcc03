use iced_layershell::reexport::{Anchor, KeyboardInteractivity, Layer, NewLayerShellSettings, OutputOption};

fn output_option(output: Option<&str>) -> OutputOption {
    match output {
        Some(name) => OutputOption::OutputName(name.to_string()),
        None => OutputOption::None,
    }
}

/// Map overlay that lets pointer input fall through to the desktop.
pub(crate) fn visible_settings(output: Option<&str>) -> NewLayerShellSettings {
    NewLayerShellSettings {
        layer: Layer::Overlay,
        anchor: Anchor::Top | Anchor::Bottom | Anchor::Left | Anchor::Right,
        keyboard_interactivity: KeyboardInteractivity::None,
        exclusive_zone: Some(-1),
        size: Some((0, 0)),
        events_transparent: true,
        output_option: output_option(output),
        ..Default::default()
    }
}

/// Map overlay with clickable markers and sidebar rows.
pub(crate) fn focused_settings(output: Option<&str>) -> NewLayerShellSettings {
    NewLayerShellSettings {
        layer: Layer::Overlay,
        anchor: Anchor::Top | Anchor::Bottom | Anchor::Left | Anchor::Right,
        keyboard_interactivity: KeyboardInteractivity::OnDemand,
        exclusive_zone: Some(-1),
        size: Some((0, 0)),
        events_transparent: false,
        output_option: output_option(output),
        ..Default::default()
    }
}

/// Session popup, centred on the right half of the output.
pub(crate) fn popup_settings(output: Option<&str>) -> NewLayerShellSettings {
    NewLayerShellSettings {
        layer: Layer::Overlay,
        anchor: Anchor::Top | Anchor::Bottom | Anchor::Right,
        keyboard_interactivity: KeyboardInteractivity::OnDemand,
        exclusive_zone: Some(-1),
        size: Some((520, 0)),
        margin: Some((80, 380, 80, 0)),
        events_transparent: false,
        output_option: output_option(output),
        ..Default::default()
    }
}
