use crate::cities::{self, CITIES};
use crate::config::ViewConfig;
use crate::projection::Viewport;
use crate::selection::Selection;
use crate::style::{region_style, RegionStyle};
use crate::types::{BoundaryDataset, City, Region};
use geo::algorithm::contains::Contains;
use geo::bounding_rect::BoundingRect;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, info};

// Wrapper for RTree indexing
struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// A rendered region together with the style it is currently drawn with.
#[derive(Debug, Clone)]
pub struct RegionLayer {
    pub region: Region,
    pub style: RegionStyle,
}

impl RegionLayer {
    pub fn name(&self) -> Option<&str> {
        self.region.name.as_deref()
    }
}

pub struct MapView {
    viewport: Viewport,
    fit_padding: f64,
    layers: Vec<RegionLayer>,
    tree: RTree<AreaIndex>,
    selection: Selection,
    hovered: Option<usize>,
    popup: Option<&'static City>,
}

impl MapView {
    pub fn new(config: &ViewConfig) -> Self {
        let mut viewport = Viewport {
            center_lat: config.center_lat,
            center_lon: config.center_lon,
            zoom: 0,
            width: config.width,
            height: config.height,
        };
        viewport.set_zoom(config.zoom);

        Self {
            viewport,
            fit_padding: config.fit_padding,
            layers: Vec::new(),
            tree: RTree::new(),
            selection: Selection::default(),
            hovered: None,
            popup: None,
        }
    }

    /// Install a freshly loaded dataset and frame the view on it.
    pub fn set_dataset(&mut self, dataset: BoundaryDataset) {
        let bounds = dataset.bounds();
        let selected = self.selection.current();

        self.layers = dataset
            .regions
            .into_iter()
            .map(|region| {
                let style = region_style(region.name.as_deref(), selected);
                RegionLayer { region, style }
            })
            .collect();

        let items: Vec<AreaIndex> = self
            .layers
            .iter()
            .enumerate()
            .filter_map(|(i, layer)| {
                let rect = layer.region.geometry.bounding_rect()?;
                Some(AreaIndex {
                    index: i,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();
        self.tree = RTree::bulk_load(items);
        self.hovered = None;

        if let Some(bounds) = bounds {
            self.viewport.fit_bounds(&bounds, self.fit_padding);
            info!(
                "Fitted view to dataset bounds: center {:.4}, {:.4} zoom {}",
                self.viewport.center_lat, self.viewport.center_lon, self.viewport.zoom
            );
        }
    }

    pub fn has_overlay(&self) -> bool {
        !self.layers.is_empty()
    }

    pub fn layers(&self) -> &[RegionLayer] {
        &self.layers
    }

    pub fn markers(&self) -> &'static [City] {
        &CITIES
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn popup(&self) -> Option<&'static City> {
        self.popup
    }

    pub fn hovered(&self) -> Option<&RegionLayer> {
        self.hovered.map(|i| &self.layers[i])
    }

    /// Topmost region containing the point. Later layers draw over earlier ones.
    fn hit_test(&self, lat: f64, lon: f64) -> Option<usize> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|candidate| self.layers[candidate.index].region.geometry.contains(&point))
            .map(|candidate| candidate.index)
            .max()
    }

    fn computed_style(&self, index: usize) -> RegionStyle {
        region_style(self.layers[index].name(), self.selection.current())
    }

    fn restyle_all(&mut self) {
        let selected = self.selection.current();
        for layer in &mut self.layers {
            layer.style = region_style(layer.region.name.as_deref(), selected);
        }
    }

    /// Click on the map. Returns whether a region was hit; empty map is ignored.
    pub fn click_at(&mut self, lat: f64, lon: f64) -> bool {
        let Some(index) = self.hit_test(lat, lon) else {
            debug!("Click at {:.4}, {:.4} hit no region", lat, lon);
            return false;
        };

        let name = self.layers[index].region.name.clone();
        if self.selection.select(name) {
            self.restyle_all();
        }
        true
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = self.selection.clear();
        if changed {
            self.restyle_all();
        }
        changed
    }

    /// Move the pointer to a map position. Returns the tooltip of the region under it.
    pub fn pointer_at(&mut self, lat: f64, lon: f64) -> Option<&str> {
        let hit = self.hit_test(lat, lon);
        if hit != self.hovered {
            self.pointer_leave();
            if let Some(index) = hit {
                let emphasized = self.computed_style(index).emphasized();
                self.layers[index].style = emphasized;
            }
            self.hovered = hit;
        }
        self.hovered.and_then(|i| self.layers[i].name())
    }

    pub fn pointer_leave(&mut self) {
        if let Some(index) = self.hovered.take() {
            let style = self.computed_style(index);
            self.layers[index].style = style;
        }
    }

    /// Open a city's popup, closing whichever one was open.
    pub fn open_popup(&mut self, name: &str) -> Option<&'static City> {
        let city = cities::find(name)?;
        self.popup = Some(city);
        Some(city)
    }

    pub fn close_popup(&mut self) -> bool {
        self.popup.take().is_some()
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.viewport.set_zoom(zoom);
    }

    pub fn set_center(&mut self, lat: f64, lon: f64) {
        self.viewport.center_lat = lat;
        self.viewport.center_lon = lon;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.viewport.pan_by(dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{parse_dataset, tests::sample_collection};
    use serde_json::json;

    fn loaded_view() -> MapView {
        let mut view = MapView::new(&ViewConfig::default());
        view.set_dataset(parse_dataset("mem", sample_collection()).unwrap());
        view
    }

    fn style_of<'a>(view: &'a MapView, name: &str) -> &'a RegionStyle {
        &view.layers().iter().find(|l| l.name() == Some(name)).unwrap().style
    }

    #[test]
    fn click_selects_and_switches_regions() {
        let mut view = loaded_view();

        assert!(view.click_at(51.0, 7.0));
        assert_eq!(view.selection().current(), Some("West"));
        assert_eq!(*style_of(&view, "West"), RegionStyle::SELECTED);
        assert_eq!(*style_of(&view, "Ost"), RegionStyle::UNSELECTED);

        assert!(view.click_at(51.0, 9.0));
        assert_eq!(view.selection().current(), Some("Ost"));
        assert_eq!(*style_of(&view, "West"), RegionStyle::UNSELECTED);
        assert_eq!(*style_of(&view, "Ost"), RegionStyle::SELECTED);
    }

    #[test]
    fn clear_restyles_everything() {
        let mut view = loaded_view();
        view.click_at(51.0, 7.0);

        assert!(view.clear_selection());
        assert_eq!(view.selection().label(), "none");
        assert!(view.layers().iter().all(|l| l.style == RegionStyle::UNSELECTED));
    }

    #[test]
    fn click_on_empty_map_keeps_selection() {
        let mut view = loaded_view();
        view.click_at(51.0, 7.0);

        assert!(!view.click_at(40.0, 20.0));
        assert_eq!(view.selection().current(), Some("West"));
    }

    #[test]
    fn click_on_unnamed_region_clears() {
        let json = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "NAME_1": "Named" },
                  "geometry": { "type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]] } },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "Polygon", "coordinates": [[[2.0, 0.0], [3.0, 0.0], [3.0, 1.0], [2.0, 1.0], [2.0, 0.0]]] } }
            ]
        });
        let mut view = MapView::new(&ViewConfig::default());
        view.set_dataset(parse_dataset("mem", json).unwrap());

        view.click_at(0.5, 0.5);
        assert_eq!(view.selection().current(), Some("Named"));
        assert!(view.click_at(0.5, 2.5));
        assert_eq!(view.selection().current(), None);
    }

    #[test]
    fn hover_is_transient_and_does_not_leak() {
        let mut view = loaded_view();

        assert_eq!(view.pointer_at(51.0, 7.0), Some("West"));
        assert_eq!(*style_of(&view, "West"), RegionStyle::UNSELECTED.emphasized());

        // moving into the neighbour restores the first one
        assert_eq!(view.pointer_at(51.0, 9.0), Some("Ost"));
        assert_eq!(*style_of(&view, "West"), RegionStyle::UNSELECTED);
        assert_eq!(*style_of(&view, "Ost"), RegionStyle::UNSELECTED.emphasized());

        view.pointer_leave();
        assert!(view.layers().iter().all(|l| l.style == RegionStyle::UNSELECTED));
        assert!(view.hovered().is_none());
    }

    #[test]
    fn leaving_a_selected_region_restores_selected_style() {
        let mut view = loaded_view();
        view.pointer_at(51.0, 7.0);
        view.click_at(51.0, 7.0);
        assert_eq!(*style_of(&view, "West"), RegionStyle::SELECTED);

        view.pointer_at(51.0, 7.0);
        view.pointer_at(40.0, 20.0);
        assert_eq!(*style_of(&view, "West"), RegionStyle::SELECTED);
    }

    #[test]
    fn fit_happens_once_per_load() {
        let mut view = loaded_view();
        let fitted = *view.viewport();
        assert_ne!(fitted.zoom, ViewConfig::default().zoom);

        view.pan_by(50.0, 0.0);
        view.click_at(51.0, 7.0);
        view.clear_selection();
        assert_ne!(view.viewport().center_lon, fitted.center_lon);
        assert_eq!(view.viewport().zoom, fitted.zoom);
    }

    #[test]
    fn markers_work_without_overlay() {
        let mut view = MapView::new(&ViewConfig::default());
        assert!(!view.has_overlay());
        assert!(!view.click_at(52.5, 13.4));

        let berlin = view.markers().iter().find(|c| c.name == "Berlin").unwrap();
        assert_eq!((berlin.lat, berlin.lon), (52.520008, 13.404954));

        assert_eq!(view.open_popup("Berlin").unwrap().name, "Berlin");
        view.open_popup("Köln");
        assert_eq!(view.popup().unwrap().name, "Köln");
        assert!(view.close_popup());
        assert!(view.popup().is_none());
        assert!(!view.close_popup());
    }
}
