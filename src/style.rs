//! Region styling as a pure function of (region name, current selection).

pub const SELECTED_FILL: &str = "#22c55e";
pub const SELECTED_STROKE: &str = "#166534";
pub const UNSELECTED_FILL: &str = "#60a5fa";
pub const UNSELECTED_STROKE: &str = "#1e3a8a";

const HOVER_WEIGHT: f64 = 2.0;
const HOVER_FILL_OPACITY: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dash {
    Solid,
    /// Equal on/off segments of the given length in CSS pixels.
    Dashed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStyle {
    pub fill_color: &'static str,
    pub fill_opacity: f64,
    pub stroke_color: &'static str,
    pub stroke_weight: f64,
    pub stroke_opacity: f64,
    pub dash: Dash,
}

impl RegionStyle {
    pub const SELECTED: RegionStyle = RegionStyle {
        fill_color: SELECTED_FILL,
        fill_opacity: 0.5,
        stroke_color: SELECTED_STROKE,
        stroke_weight: 2.0,
        stroke_opacity: 1.0,
        dash: Dash::Solid,
    };

    pub const UNSELECTED: RegionStyle = RegionStyle {
        fill_color: UNSELECTED_FILL,
        fill_opacity: 0.2,
        stroke_color: UNSELECTED_STROKE,
        stroke_weight: 1.0,
        stroke_opacity: 1.0,
        dash: Dash::Dashed(3.0),
    };

    /// Transient pointer-over emphasis layered on a computed style.
    pub fn emphasized(self) -> RegionStyle {
        RegionStyle {
            stroke_weight: HOVER_WEIGHT,
            fill_opacity: HOVER_FILL_OPACITY,
            ..self
        }
    }
}

pub fn region_style(name: Option<&str>, selected: Option<&str>) -> RegionStyle {
    match (name, selected) {
        (Some(n), Some(s)) if n == s => RegionStyle::SELECTED,
        _ => RegionStyle::UNSELECTED,
    }
}
