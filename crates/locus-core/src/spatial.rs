//! Spatial reference layers used for geo-labelling.

use serde::{Deserialize, Serialize};

use crate::business::GeoPoint;

/// A fixed reference location (e.g. a service station).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
  pub anchor_id: String,
  pub name:      Option<String>,
  pub location:  GeoPoint,
}

/// A road polyline with its map classification (`primary`, `residential`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
  pub road_id: String,
  pub class:   String,
  pub path:    Vec<GeoPoint>,
}

/// A labelled polygon. Lower `priority` wins when zones overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
  pub zone_id:  String,
  pub label:    String,
  pub kind:     Option<String>,
  pub priority: i32,
  /// Outer ring; closing vertex optional.
  pub polygon:  Vec<GeoPoint>,
}

/// Every spatial layer, loaded together for one metrics run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialLayers {
  #[serde(default)]
  pub anchors: Vec<AnchorPoint>,
  #[serde(default)]
  pub roads:   Vec<RoadSegment>,
  #[serde(default)]
  pub zones:   Vec<Zone>,
}
