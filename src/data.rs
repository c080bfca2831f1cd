use crate::error::LoadError;
use crate::types::{BoundaryDataset, Region};
use geo::MultiPolygon;
use geojson::GeoJson;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Property keys that may carry the region name, in lookup order.
pub const NAME_KEYS: &[&str] = &["NAME_1", "name", "NAME"];

/// First non-empty value among `NAME_KEYS`.
pub fn resolve_name(properties: Option<&Map<String, Value>>) -> Option<String> {
    let props = properties?;
    NAME_KEYS.iter().find_map(|key| match props.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Fetch the boundary dataset, trying each candidate URL in turn.
///
/// A candidate counts as successful once it answers with a 2xx status and a body
/// that parses as JSON. Later candidates are not contacted after that, even if the
/// JSON turns out not to be a usable FeatureCollection.
pub async fn load_boundaries(
    client: &reqwest::Client,
    urls: &[String],
) -> Result<BoundaryDataset, LoadError> {
    for url in urls {
        let Some(json) = fetch_json(client, url).await else {
            continue;
        };

        let dataset = parse_dataset(url, json)?;
        info!(
            "Loaded {} regions from {}",
            dataset.regions.len(),
            dataset.source
        );
        return Ok(dataset);
    }

    Err(LoadError::AllSourcesFailed { attempted: urls.to_vec() })
}

async fn fetch_json(client: &reqwest::Client, url: &str) -> Option<Value> {
    debug!("Fetching boundaries from {}", url);
    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!("Boundary source {} unreachable: {}", url, e);
            return None;
        }
    };

    if !response.status().is_success() {
        warn!("Boundary source {} answered {}", url, response.status());
        return None;
    }

    match response.json::<Value>().await {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("Boundary source {} returned unparseable JSON: {}", url, e);
            None
        }
    }
}

/// Turn a GeoJSON FeatureCollection into regions. Features without areal
/// geometry are skipped.
pub fn parse_dataset(source: &str, json: Value) -> Result<BoundaryDataset, LoadError> {
    let invalid = |reason: String| LoadError::InvalidDataset {
        source_url: source.to_string(),
        reason,
    };

    let geojson = GeoJson::from_json_value(json).map_err(|e| invalid(e.to_string()))?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(invalid("GeoJSON must be a FeatureCollection".to_string())),
    };

    let mut regions = Vec::with_capacity(collection.features.len());

    for (i, feature) in collection.features.into_iter().enumerate() {
        let name = resolve_name(feature.properties.as_ref());

        let Some(geometry) = feature.geometry else {
            debug!("Skipping feature {} ({:?}): no geometry", i, name);
            continue;
        };

        let geometry: geo::Geometry<f64> = match geometry.value.try_into() {
            Ok(g) => g,
            Err(e) => {
                debug!("Skipping feature {} ({:?}): {}", i, name, e);
                continue;
            }
        };

        let geometry = match geometry {
            geo::Geometry::MultiPolygon(mp) => mp,
            geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
            _ => {
                debug!("Skipping feature {} ({:?}): not a polygon", i, name);
                continue;
            }
        };

        regions.push(Region { name, geometry });
    }

    Ok(BoundaryDataset {
        source: source.to_string(),
        regions,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;
    use std::net::SocketAddr;

    /// Two states side by side: "West" spans lon 6..8, "Ost" spans lon 8..10, lat 50..52.
    pub(crate) fn sample_collection() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "NAME_1": "West" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[6.0, 50.0], [8.0, 50.0], [8.0, 52.0], [6.0, 52.0], [6.0, 50.0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "name": "Ost" },
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [[[[8.0, 50.0], [10.0, 50.0], [10.0, 52.0], [8.0, 52.0], [8.0, 50.0]]]]
                    }
                }
            ]
        })
    }

    async fn spawn(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn geojson_route() -> axum::routing::MethodRouter {
        get(|| async { axum::Json(sample_collection()) })
    }

    #[test]
    fn name_keys_in_priority_order() {
        let props = json!({ "NAME": "Tertiary", "name": "Secondary", "NAME_1": "Primary" });
        assert_eq!(resolve_name(props.as_object()).as_deref(), Some("Primary"));

        let props = json!({ "NAME": "Tertiary", "name": "Secondary" });
        assert_eq!(resolve_name(props.as_object()).as_deref(), Some("Secondary"));

        let props = json!({ "NAME": "Tertiary" });
        assert_eq!(resolve_name(props.as_object()).as_deref(), Some("Tertiary"));
    }

    #[test]
    fn empty_or_missing_names_fall_through() {
        let props = json!({ "NAME_1": "", "name": null, "NAME": "Bayern" });
        assert_eq!(resolve_name(props.as_object()).as_deref(), Some("Bayern"));

        let props = json!({ "id": 4 });
        assert_eq!(resolve_name(props.as_object()), None);
        assert_eq!(resolve_name(None), None);
    }

    #[test]
    fn secondary_key_dataset_resolves() {
        let dataset = parse_dataset("mem", sample_collection()).unwrap();
        let names: Vec<_> = dataset.regions.iter().map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec![Some("West"), Some("Ost")]);
    }

    #[test]
    fn non_areal_features_are_skipped() {
        let json = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "name": "Pt" },
                  "geometry": { "type": "Point", "coordinates": [9.0, 51.0] } },
                { "type": "Feature", "properties": { "name": "Nothing" }, "geometry": null }
            ]
        });
        let dataset = parse_dataset("mem", json).unwrap();
        assert!(dataset.regions.is_empty());
        assert!(dataset.bounds().is_none());
    }

    #[test]
    fn non_collection_is_invalid() {
        let err = parse_dataset("mem", json!({ "hello": "world" })).unwrap_err();
        assert!(matches!(err, LoadError::InvalidDataset { .. }));
    }

    #[tokio::test]
    async fn falls_back_when_primary_returns_500() {
        let router = Router::new()
            .route("/primary", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route("/fallback", geojson_route());
        let addr = spawn(router).await;

        let urls = vec![
            format!("http://{}/primary", addr),
            format!("http://{}/fallback", addr),
        ];
        let dataset = load_boundaries(&reqwest::Client::new(), &urls).await.unwrap();

        assert_eq!(dataset.source, urls[1]);
        assert_eq!(dataset.regions.len(), 2);
    }

    #[tokio::test]
    async fn falls_back_on_unparseable_body() {
        let router = Router::new()
            .route("/primary", get(|| async { "<html>not json</html>" }))
            .route("/fallback", geojson_route());
        let addr = spawn(router).await;

        let urls = vec![
            format!("http://{}/primary", addr),
            format!("http://{}/fallback", addr),
        ];
        let dataset = load_boundaries(&reqwest::Client::new(), &urls).await.unwrap();
        assert_eq!(dataset.source, urls[1]);
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let router = Router::new()
            .route("/primary", geojson_route())
            .route("/fallback", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let addr = spawn(router).await;

        let urls = vec![
            format!("http://{}/primary", addr),
            format!("http://{}/fallback", addr),
        ];
        let dataset = load_boundaries(&reqwest::Client::new(), &urls).await.unwrap();
        assert_eq!(dataset.source, urls[0]);
    }

    #[tokio::test]
    async fn all_sources_failing_is_a_load_error() {
        let router = Router::new()
            .route("/primary", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route("/fallback", get(|| async { StatusCode::NOT_FOUND }));
        let addr = spawn(router).await;

        let urls = vec![
            format!("http://{}/primary", addr),
            format!("http://{}/fallback", addr),
        ];
        let err = load_boundaries(&reqwest::Client::new(), &urls).await.unwrap_err();

        match err {
            LoadError::AllSourcesFailed { attempted } => assert_eq!(attempted, urls),
            other => panic!("unexpected error: {other}"),
        }
    }
}
