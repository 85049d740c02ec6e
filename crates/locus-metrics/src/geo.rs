//! Plane and sphere geometry for geo-labelling.
//!
//! Distances to road segments and polygon containment use a local
//! equirectangular projection around the query point; at the tens-of-metres
//! scale these tests run at, the error is negligible.

use locus_core::{
  business::GeoPoint,
  metrics::FALLBACK_GEO_LABEL,
  spatial::{RoadSegment, SpatialLayers, Zone},
};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Road classes that count as high-traffic frontage.
pub const HIGH_TRAFFIC_ROADS: [&str; 5] = ["motorway", "trunk", "primary", "secondary", "tertiary"];

/// Zone kinds that collapse to the `center` label.
const CENTER_KINDS: [&str; 4] = ["center", "centre", "centro", "historic"];

/// Haversine distance in metres.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
  let dlat = (b.lat - a.lat).to_radians();
  let dlon = (b.lon - a.lon).to_radians();

  let h = (dlat / 2.0).sin().powi(2)
    + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);

  2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Project `p` to metres east/north of `origin`.
fn project(origin: GeoPoint, p: GeoPoint) -> (f64, f64) {
  let x = (p.lon - origin.lon).to_radians() * origin.lat.to_radians().cos() * EARTH_RADIUS_METERS;
  let y = (p.lat - origin.lat).to_radians() * EARTH_RADIUS_METERS;
  (x, y)
}

/// Shortest distance in metres from `p` to the segment `a`–`b`.
pub fn distance_to_segment_m(p: GeoPoint, a: GeoPoint, b: GeoPoint) -> f64 {
  let (ax, ay) = project(p, a);
  let (bx, by) = project(p, b);
  let (dx, dy) = (bx - ax, by - ay);
  let len2 = dx * dx + dy * dy;

  let t = if len2 == 0.0 { 0.0 } else { (-(ax * dx + ay * dy) / len2).clamp(0.0, 1.0) };
  let (cx, cy) = (ax + t * dx, ay + t * dy);
  (cx * cx + cy * cy).sqrt()
}

/// Shortest distance in metres from `p` to a polyline. Infinite for an empty
/// path.
pub fn distance_to_path_m(p: GeoPoint, path: &[GeoPoint]) -> f64 {
  match path {
    [] => f64::INFINITY,
    [only] => haversine_m(p, *only),
    _ => path
      .windows(2)
      .map(|w| distance_to_segment_m(p, w[0], w[1]))
      .fold(f64::INFINITY, f64::min),
  }
}

/// Even-odd containment test. The ring may or may not repeat its first vertex.
pub fn point_in_polygon(p: GeoPoint, ring: &[GeoPoint]) -> bool {
  if ring.len() < 3 {
    return false;
  }
  let pts: Vec<(f64, f64)> = ring.iter().map(|v| project(p, *v)).collect();

  let mut inside = false;
  let mut j = pts.len() - 1;
  for i in 0..pts.len() {
    let (xi, yi) = pts[i];
    let (xj, yj) = pts[j];
    if (yi > 0.0) != (yj > 0.0) && 0.0 < (xj - xi) * (0.0 - yi) / (yj - yi) + xi {
      inside = !inside;
    }
    j = i;
  }
  inside
}

// ─── Labelling ───────────────────────────────────────────────────────────────

/// Geo-distribution label and the signal that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLabel {
  pub label:  String,
  pub source: String,
}

impl GeoLabel {
  fn new(label: impl Into<String>, source: impl Into<String>) -> Self {
    Self { label: label.into(), source: source.into() }
  }

  pub fn fallback() -> Self { Self::new(FALLBACK_GEO_LABEL, "fallback") }
}

/// Distance thresholds for the spatial signals.
#[derive(Debug, Clone, Copy)]
pub struct LabelRadii {
  pub anchor_m: f64,
  pub road_m:   f64,
}

impl Default for LabelRadii {
  fn default() -> Self { Self { anchor_m: 100.0, road_m: 50.0 } }
}

fn zone_label(zone: &Zone) -> GeoLabel {
  let kind = zone.kind.as_deref().map(str::to_lowercase).unwrap_or_default();
  let label = if CENTER_KINDS.contains(&kind.as_str()) { "center" } else { zone.label.as_str() };
  GeoLabel::new(label, format!("zone:{}", zone.label))
}

fn near_high_traffic(p: GeoPoint, roads: &[RoadSegment], radius_m: f64) -> bool {
  roads
    .iter()
    .filter(|r| HIGH_TRAFFIC_ROADS.contains(&r.class.to_lowercase().as_str()))
    .any(|r| distance_to_path_m(p, &r.path) <= radius_m)
}

/// Label a location. Anchor beats road beats zone beats fallback.
pub fn classify(location: Option<GeoPoint>, layers: &SpatialLayers, radii: LabelRadii) -> GeoLabel {
  let Some(p) = location else {
    return GeoLabel::fallback();
  };

  if layers.anchors.iter().any(|a| haversine_m(p, a.location) <= radii.anchor_m) {
    return GeoLabel::new("near-anchor", "anchor");
  }
  if near_high_traffic(p, &layers.roads, radii.road_m) {
    return GeoLabel::new("roadside-traffic", "road-high-traffic");
  }

  layers
    .zones
    .iter()
    .filter(|z| point_in_polygon(p, &z.polygon))
    .min_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.zone_id.cmp(&b.zone_id)))
    .map_or_else(GeoLabel::fallback, zone_label)
}

#[cfg(test)]
mod tests {
  use locus_core::spatial::AnchorPoint;

  use super::*;

  const ORIGIN: GeoPoint = GeoPoint { lat: 45.0, lon: 7.0 };

  /// A point `north_m` metres north and `east_m` metres east of ORIGIN.
  fn offset(north_m: f64, east_m: f64) -> GeoPoint {
    let dlat = (north_m / EARTH_RADIUS_METERS).to_degrees();
    let dlon = (east_m / (EARTH_RADIUS_METERS * ORIGIN.lat.to_radians().cos())).to_degrees();
    GeoPoint::new(ORIGIN.lat + dlat, ORIGIN.lon + dlon)
  }

  fn square(id: &str, half_m: f64, priority: i32, kind: Option<&str>) -> Zone {
    Zone {
      zone_id: id.into(),
      label: format!("zone-{id}"),
      kind: kind.map(str::to_owned),
      priority,
      polygon: vec![
        offset(-half_m, -half_m),
        offset(-half_m, half_m),
        offset(half_m, half_m),
        offset(half_m, -half_m),
      ],
    }
  }

  fn anchor_at(p: GeoPoint) -> AnchorPoint {
    AnchorPoint { anchor_id: "a1".into(), name: None, location: p }
  }

  fn road(class: &str, east_m: f64) -> RoadSegment {
    RoadSegment {
      road_id: format!("{class}-{east_m}"),
      class: class.into(),
      path: vec![offset(-500.0, east_m), offset(500.0, east_m)],
    }
  }

  #[test]
  fn haversine_one_degree_of_latitude() {
    let d = haversine_m(GeoPoint::new(45.0, 7.0), GeoPoint::new(46.0, 7.0));
    assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    assert_eq!(haversine_m(ORIGIN, ORIGIN), 0.0);
  }

  #[test]
  fn segment_distance_projects_onto_interior_and_ends() {
    let a = offset(-100.0, 30.0);
    let b = offset(100.0, 30.0);
    assert!((distance_to_segment_m(ORIGIN, a, b) - 30.0).abs() < 0.5);

    let far_a = offset(100.0, 0.0);
    let far_b = offset(200.0, 0.0);
    assert!((distance_to_segment_m(ORIGIN, far_a, far_b) - 100.0).abs() < 0.5);
    assert!((distance_to_segment_m(ORIGIN, far_a, far_a) - 100.0).abs() < 0.5);
  }

  #[test]
  fn polygon_containment() {
    let zone = square("z", 100.0, 1, None);
    assert!(point_in_polygon(ORIGIN, &zone.polygon));
    assert!(!point_in_polygon(offset(150.0, 0.0), &zone.polygon));

    let mut closed = zone.polygon.clone();
    closed.push(closed[0]);
    assert!(point_in_polygon(ORIGIN, &closed));
    assert!(!point_in_polygon(ORIGIN, &zone.polygon[..2]));
  }

  #[test]
  fn anchor_beats_road_beats_zone() {
    let radii = LabelRadii::default();
    let mut layers = SpatialLayers {
      anchors: vec![anchor_at(offset(60.0, 0.0))],
      roads:   vec![road("primary", 20.0)],
      zones:   vec![square("z", 500.0, 1, Some("Centro"))],
    };

    assert_eq!(classify(Some(ORIGIN), &layers, radii), GeoLabel::new("near-anchor", "anchor"));

    layers.anchors[0].location = offset(150.0, 0.0);
    assert_eq!(
      classify(Some(ORIGIN), &layers, radii),
      GeoLabel::new("roadside-traffic", "road-high-traffic")
    );

    layers.roads = vec![road("residential", 5.0), road("primary", 80.0)];
    assert_eq!(
      classify(Some(ORIGIN), &layers, radii),
      GeoLabel::new("center", "zone:zone-z")
    );

    layers.zones.clear();
    assert_eq!(classify(Some(ORIGIN), &layers, radii), GeoLabel::fallback());
  }

  #[test]
  fn lowest_priority_zone_wins() {
    let layers = SpatialLayers {
      zones: vec![square("big", 800.0, 5, Some("district")), square("small", 100.0, 2, None)],
      ..SpatialLayers::default()
    };
    let label = classify(Some(ORIGIN), &layers, LabelRadii::default());
    assert_eq!(label, GeoLabel::new("zone-small", "zone:zone-small"));
  }

  #[test]
  fn missing_location_falls_back() {
    let layers = SpatialLayers { anchors: vec![anchor_at(ORIGIN)], ..SpatialLayers::default() };
    let label = classify(None, &layers, LabelRadii::default());
    assert_eq!(label.label, "other");
    assert_eq!(label.source, "fallback");
  }
}
