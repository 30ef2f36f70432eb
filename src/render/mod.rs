//! SVG rendering of a simulated frame

use std::fmt::Write;

use crate::sim::{Frame, PlaySetup, Pt, FIRST_DOWN_Y, LOS_Y};

const BACKGROUND: &str = "#f8fafc";
const BORDER: &str = "#e5e7eb";
const LOS_BLUE: &str = "#2563eb";
const FIRST_DOWN_YELLOW: &str = "#facc15";
const ROUTE_BLUE: &str = "#2563eb";
const OFFENSE_FILL: &str = "#111827";
const DEFENSE_FILL: &str = "#dc2626";
const TARGET_RING: &str = "#f59e0b";
const BALL_LEATHER: &str = "#8b4513";
const STITCHING: &str = "#fefefe";
const CAPTION: &str = "#6b7280";

const PLAYER_RADIUS: f32 = 16.0;
const TARGET_RING_RADIUS: f32 = 20.0;
const BALL_RX: f32 = 10.0;
const BALL_RY: f32 = 6.0;

/// Pixel surface the normalized field is drawn onto
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 720,
            height: 420,
        }
    }
}

impl Viewport {
    pub fn px_x(&self, x: f32) -> f32 {
        x * self.width as f32
    }

    /// Field y grows upfield, SVG y grows downward
    pub fn px_y(&self, y: f32) -> f32 {
        (1.0 - y) * self.height as f32
    }

    fn px(&self, p: Pt) -> (f32, f32) {
        (self.px_x(p.x), self.px_y(p.y))
    }
}

/// Draw the field, route reference lines, both teams and the ball
pub fn render_frame_svg(setup: &PlaySetup, frame: &Frame, view: Viewport) -> String {
    let (w, h) = (view.width, view.height);
    let mut svg = String::with_capacity(4096);

    // write! into a String cannot fail
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    let _ = write!(svg, r#"<rect x="0" y="0" width="{w}" height="{h}" fill="{BACKGROUND}"/>"#);
    let _ = write!(
        svg,
        r#"<rect x="1" y="1" width="{}" height="{}" fill="none" stroke="{BORDER}" stroke-width="2"/>"#,
        w.saturating_sub(2),
        h.saturating_sub(2)
    );

    horizontal_line(&mut svg, view, LOS_Y, LOS_BLUE);
    horizontal_line(&mut svg, view, FIRST_DOWN_Y, FIRST_DOWN_YELLOW);

    for (_, pts) in setup.route_points() {
        let points: Vec<String> = pts
            .iter()
            .map(|p| {
                let (x, y) = view.px(*p);
                format!("{x:.1},{y:.1}")
            })
            .collect();
        let _ = write!(
            svg,
            r#"<polyline points="{}" fill="none" stroke="{ROUTE_BLUE}" stroke-width="3"/>"#,
            points.join(" ")
        );
    }

    for p in &frame.offense {
        let (x, y) = view.px(p.pos());
        if p.id == frame.target {
            let _ = write!(
                svg,
                r#"<circle cx="{x:.1}" cy="{y:.1}" r="{TARGET_RING_RADIUS}" fill="none" stroke="{TARGET_RING}" stroke-width="4"/>"#
            );
        }
        player_token(&mut svg, x, y, OFFENSE_FILL, p.id.label(), 12);
    }

    for d in &frame.defense {
        let (x, y) = view.px(d.pos());
        player_token(&mut svg, x, y, DEFENSE_FILL, d.id.label(), 11);
    }

    ball(&mut svg, view.px(frame.ball));

    let _ = write!(
        svg,
        r#"<text x="12" y="24" fill="{CAPTION}" font-family="system-ui" font-weight="bold" font-size="14">{} · t={:.2}s</text>"#,
        setup.coverage.label(),
        frame.t
    );

    svg.push_str("</svg>");
    svg
}

fn horizontal_line(svg: &mut String, view: Viewport, y: f32, color: &str) {
    let py = view.px_y(y);
    let _ = write!(
        svg,
        r#"<line x1="0" y1="{py:.1}" x2="{}" y2="{py:.1}" stroke="{color}" stroke-width="3"/>"#,
        view.width
    );
}

fn player_token(svg: &mut String, x: f32, y: f32, fill: &str, label: &str, font_size: u32) {
    let _ = write!(
        svg,
        r##"<circle cx="{x:.1}" cy="{y:.1}" r="{PLAYER_RADIUS}" fill="{fill}"/><text x="{x:.1}" y="{y:.1}" fill="#ffffff" font-family="system-ui" font-weight="bold" font-size="{font_size}" text-anchor="middle" dominant-baseline="middle">{label}</text>"##
    );
}

fn ball(svg: &mut String, (bx, by): (f32, f32)) {
    let _ = write!(
        svg,
        r#"<ellipse cx="{bx:.1}" cy="{by:.1}" rx="{BALL_RX}" ry="{BALL_RY}" fill="{BALL_LEATHER}"/>"#
    );
    let _ = write!(
        svg,
        r#"<line x1="{:.1}" y1="{by:.1}" x2="{:.1}" y2="{by:.1}" stroke="{STITCHING}" stroke-width="1.5"/>"#,
        bx - BALL_RX * 0.5,
        bx + BALL_RX * 0.5
    );
    for (dx, half) in [(-0.2, 0.5), (0.0, 0.6), (0.2, 0.5)] {
        let x = bx + BALL_RX * dx;
        let _ = write!(
            svg,
            r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{STITCHING}" stroke-width="1.5"/>"#,
            by - BALL_RY * half,
            by + BALL_RY * half
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::defense::generate_defense;
    use crate::sim::formation::{default_routes, offense_for_formation, Formation};
    use crate::sim::{Coverage, PlayerId, SimState};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn snapshot() -> (PlaySetup, Frame) {
        let offense = offense_for_formation(Formation::Doubles2x2);
        let defense = generate_defense(Coverage::Cover1, &offense, &mut ChaCha8Rng::seed_from_u64(1));
        let setup = PlaySetup::new(offense, default_routes(), Coverage::Cover1, PlayerId::Wr2, None);
        let mut state = SimState::new(&setup, &defense);
        let frame = state.frame(&setup, 0.016, false);
        (setup, frame)
    }

    #[test]
    fn renders_every_player_and_route() {
        let (setup, frame) = snapshot();
        let svg = render_frame_svg(&setup, &frame, Viewport::default());

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        for label in ["QB", "WR1", "WR2", "WR3", "TE", "RB", "CB1", "CB2", "N", "LB1", "LB2", "S1", "S2"] {
            assert!(svg.contains(&format!(">{label}</text>")), "missing {label}");
        }
        assert_eq!(svg.matches("<polyline").count(), setup.route_points().len());
        assert_eq!(svg.matches(TARGET_RING).count(), 1);
        assert!(svg.contains("<ellipse"));
    }

    #[test]
    fn caption_names_the_coverage_and_clock() {
        let (setup, mut frame) = snapshot();
        frame.t = 1.5;
        let svg = render_frame_svg(&setup, &frame, Viewport::default());
        assert!(svg.contains(">COVER 1 · t=1.50s</text>"));
    }

    #[test]
    fn viewport_flips_the_vertical_axis() {
        let view = Viewport {
            width: 100,
            height: 200,
        };
        assert_eq!(view.px_y(0.0), 200.0);
        assert_eq!(view.px_y(1.0), 0.0);
        assert_eq!(view.px_x(0.5), 50.0);
    }
}
