use crate::error::ExportError;
use crate::render::{capture, MarkerIcon};
use crate::tiles::Basemap;
use crate::view::MapView;
use chrono::NaiveDate;
use image::{DynamicImage, RgbaImage};
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument, Pt};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// A4 in landscape, in PDF points.
pub const A4_LANDSCAPE: PageSize = PageSize { width: 841.89, height: 595.28 };

const ATTRIBUTION_FONT_SIZE: f32 = 7.0;
const ATTRIBUTION_MARGIN_PT: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Where the image lands on the page, in points from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Largest uniform scaling of an `image_w`×`image_h` image that fits the page, centered.
pub fn fit_to_page(page: PageSize, image_w: u32, image_h: u32) -> Placement {
    let ratio = (page.width / image_w as f64).min(page.height / image_h as f64);
    let width = image_w as f64 * ratio;
    let height = image_h as f64 * ratio;
    Placement {
        x: (page.width - width) / 2.0,
        y: (page.height - height) / 2.0,
        width,
        height,
    }
}

/// `<prefix>_[<Region>_]<YYYY-MM-DD>.pdf`, whitespace runs in the region name become `_`.
pub fn file_name(prefix: &str, selected: Option<&str>, date: NaiveDate) -> String {
    let region = selected
        .map(|name| {
            let mut out = String::with_capacity(name.len() + 1);
            let mut in_space = false;
            for c in name.chars() {
                if c.is_whitespace() {
                    if !in_space {
                        out.push('_');
                    }
                    in_space = true;
                } else {
                    out.push(c);
                    in_space = false;
                }
            }
            out.push('_');
            out
        })
        .unwrap_or_default();

    format!("{}_{}{}.pdf", prefix, region, date.format("%Y-%m-%d"))
}

fn pt_to_mm(pt: f64) -> Mm {
    Mm::from(Pt(pt as f32))
}

/// Embed the capture into a single landscape page, scaled and centered.
pub fn build_pdf(capture: &RgbaImage, attribution: &str, title: &str) -> Result<(Vec<u8>, Placement), ExportError> {
    let page = A4_LANDSCAPE;
    let placement = fit_to_page(page, capture.width(), capture.height());

    let (doc, page_index, layer_index) =
        PdfDocument::new(title, pt_to_mm(page.width), pt_to_mm(page.height), "Map");
    let layer = doc.get_page(page_index).get_layer(layer_index);

    // PDF has no alpha here; flatten to RGB first.
    let rgb = DynamicImage::ImageRgba8(capture.clone()).to_rgb8();
    let image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(rgb));

    // At 72 dpi one image pixel is one point before scaling.
    let scale = (placement.width / capture.width() as f64) as f32;
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(pt_to_mm(placement.x)),
            // PDF origin is bottom-left
            translate_y: Some(pt_to_mm(page.height - placement.y - placement.height)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(72.0),
            ..Default::default()
        },
    );

    if !attribution.is_empty() {
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        layer.use_text(
            attribution,
            ATTRIBUTION_FONT_SIZE,
            Mm::from(Pt(ATTRIBUTION_MARGIN_PT)),
            Mm::from(Pt(ATTRIBUTION_MARGIN_PT)),
            &font,
        );
    }

    let bytes = doc.save_to_bytes().map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok((bytes, placement))
}

/// Capture the view and write it as a PDF into `output_dir`. Returns the written path.
pub async fn export_view(
    view: &MapView,
    basemap: &Basemap,
    icon: &MarkerIcon,
    pixel_ratio: u32,
    output_dir: &Path,
    file_prefix: &str,
) -> Result<PathBuf, ExportError> {
    let image = capture(view, basemap, icon, pixel_ratio).await;
    let date = chrono::Utc::now().date_naive();
    let name = file_name(file_prefix, view.selection().current(), date);

    let (bytes, placement) = build_pdf(&image, basemap.attribution(), &name)?;
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(&name);
    fs::write(&path, bytes)?;

    info!(
        "Exported {} ({}x{} px placed at {:.1}x{:.1} pt)",
        path.display(),
        image.width(),
        image.height(),
        placement.width,
        placement.height
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BasemapConfig, ViewConfig};
    use crate::data::{parse_dataset, tests::sample_collection};
    use image::Rgba;

    #[test]
    fn placement_preserves_aspect_ratio() {
        for &(w, h) in &[(1920u32, 1200u32), (1600, 1600), (600, 2400), (3000, 500)] {
            let p = fit_to_page(A4_LANDSCAPE, w, h);
            let source = w as f64 / h as f64;
            assert!((p.width / p.height - source).abs() < 1e-9);
            assert!(p.width <= A4_LANDSCAPE.width + 1e-9);
            assert!(p.height <= A4_LANDSCAPE.height + 1e-9);
            // one side touches the page edge
            assert!(
                (p.width - A4_LANDSCAPE.width).abs() < 1e-9 || (p.height - A4_LANDSCAPE.height).abs() < 1e-9
            );
        }
    }

    #[test]
    fn placement_is_centered() {
        // 1.6:1 is wider than the page, so width is the limit
        let p = fit_to_page(A4_LANDSCAPE, 1920, 1200);
        assert!((p.width - A4_LANDSCAPE.width).abs() < 1e-9);
        assert!(p.x.abs() < 1e-9);
        assert!((p.y * 2.0 + p.height - A4_LANDSCAPE.height).abs() < 1e-9);

        let p = fit_to_page(A4_LANDSCAPE, 1000, 1000);
        assert!((p.height - A4_LANDSCAPE.height).abs() < 1e-9);
        assert!((p.x * 2.0 + p.width - A4_LANDSCAPE.width).abs() < 1e-9);
    }

    #[test]
    fn file_names() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(file_name("Deutschlandkarte", None, date), "Deutschlandkarte_2026-10-19.pdf");
        assert_eq!(
            file_name("Deutschlandkarte", Some("Baden-Württemberg"), date),
            "Deutschlandkarte_Baden-Württemberg_2026-10-19.pdf"
        );
        assert_eq!(
            file_name("Deutschlandkarte", Some("Nordrhein  Westfalen"), date),
            "Deutschlandkarte_Nordrhein_Westfalen_2026-10-19.pdf"
        );
    }

    #[test]
    fn builds_a_pdf_from_a_fixed_surface() {
        let surface = RgbaImage::from_pixel(1600, 1000, Rgba([200, 100, 50, 255]));
        let (bytes, placement) = build_pdf(&surface, "© OpenStreetMap contributors", "test").unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        assert!((placement.width / placement.height - 1.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn export_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut view = MapView::new(&ViewConfig { width: 320, height: 200, ..ViewConfig::default() });
        view.set_dataset(parse_dataset("mem", sample_collection()).unwrap());
        view.click_at(51.0, 7.0);

        let basemap = Basemap::new(
            reqwest::Client::new(),
            BasemapConfig { enabled: false, ..BasemapConfig::default() },
        );
        let path = export_view(&view, &basemap, &MarkerIcon::Glyph, 2, dir.path(), "Deutschlandkarte")
            .await
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Deutschlandkarte_West_"));
        assert!(name.ends_with(".pdf"));
        assert!(fs::read(&path).unwrap().starts_with(b"%PDF"));
    }
}
