use geo::{BoundingRect, MultiPolygon, Rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct City {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

/// One boundary feature: a federal state outline.
#[derive(Debug, Clone)]
pub struct Region {
    // None when no name key resolved on the feature
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone)]
pub struct BoundaryDataset {
    pub source: String,
    pub regions: Vec<Region>,
}

impl BoundaryDataset {
    /// Smallest rectangle enclosing every region, `None` when there is no geometry.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.regions
            .iter()
            .filter_map(|r| r.geometry.bounding_rect())
            .reduce(|acc, rect| {
                Rect::new(
                    geo::Coord {
                        x: acc.min().x.min(rect.min().x),
                        y: acc.min().y.min(rect.min().y),
                    },
                    geo::Coord {
                        x: acc.max().x.max(rect.max().x),
                        y: acc.max().y.max(rect.max().y),
                    },
                )
            })
    }
}
