use crate::snapshot::WorldPoint;

/// A position in surface pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

/// What part of the world the map surface currently shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub center: WorldPoint,
    pub width: f32,
    pub height: f32,
}

impl ViewState {
    pub fn pan_to(&mut self, target: WorldPoint) {
        self.center = target;
    }

    pub fn with_size(self, width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }
}

/// World <-> screen conversion seam.
pub trait Projection {
    fn project_to_screen(&self, world: WorldPoint, view: &ViewState) -> ScreenPoint;
    fn unproject_from_screen(&self, screen: ScreenPoint, view: &ViewState) -> WorldPoint;
}

/// Flat tile grid: a fixed number of pixels per tile, world y grows northwards.
#[derive(Debug, Clone, Copy)]
pub struct TileProjection {
    pub tile_px: f32,
}

impl Projection for TileProjection {
    fn project_to_screen(&self, world: WorldPoint, view: &ViewState) -> ScreenPoint {
        let dx = (world.x - view.center.x) as f32;
        let dy = (world.y - view.center.y) as f32;
        ScreenPoint {
            x: view.width / 2.0 + dx * self.tile_px,
            y: view.height / 2.0 - dy * self.tile_px,
        }
    }

    fn unproject_from_screen(&self, screen: ScreenPoint, view: &ViewState) -> WorldPoint {
        let tile_px = if self.tile_px > 0.0 { self.tile_px } else { 1.0 };
        WorldPoint {
            x: view.center.x + f64::from((screen.x - view.width / 2.0) / tile_px),
            y: view.center.y - f64::from((screen.y - view.height / 2.0) / tile_px),
            plane: view.center.plane,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ViewState {
        ViewState {
            center: WorldPoint {
                x: 3200.0,
                y: 3200.0,
                plane: 0.0,
            },
            width: 800.0,
            height: 600.0,
        }
    }

    #[test]
    fn center_projects_to_middle_of_surface() {
        let p = TileProjection { tile_px: 4.0 };
        let v = view();
        assert_eq!(
            p.project_to_screen(v.center, &v),
            ScreenPoint { x: 400.0, y: 300.0 }
        );
    }

    #[test]
    fn north_is_up() {
        let p = TileProjection { tile_px: 4.0 };
        let v = view();
        let north = WorldPoint {
            y: 3210.0,
            ..v.center
        };
        assert_eq!(p.project_to_screen(north, &v).y, 260.0);
    }

    #[test]
    fn unproject_inverts_project() {
        let p = TileProjection { tile_px: 2.0 };
        let v = view();
        let w = WorldPoint {
            x: 3190.0,
            y: 3222.0,
            plane: 0.0,
        };
        let back = p.unproject_from_screen(p.project_to_screen(w, &v), &v);
        assert!((back.x - w.x).abs() < 1e-3);
        assert!((back.y - w.y).abs() < 1e-3);
    }

    #[test]
    fn recentring_on_a_clicked_point_brings_it_to_the_middle() {
        let p = TileProjection { tile_px: 4.0 };
        let mut v = view();
        let clicked = p.unproject_from_screen(ScreenPoint { x: 600.0, y: 100.0 }, &v);
        assert_eq!(clicked.x, 3250.0);
        assert_eq!(clicked.y, 3250.0);
        v.pan_to(clicked);
        assert_eq!(p.project_to_screen(clicked, &v), ScreenPoint { x: 400.0, y: 300.0 });
    }
}
