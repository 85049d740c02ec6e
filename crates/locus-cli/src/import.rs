//! Seed a store from a JSON document of businesses and spatial layers.

use locus_core::{
  business::BusinessEntity,
  spatial::{AnchorPoint, RoadSegment, Zone},
  store::EnrichmentStore,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ImportDocument {
  #[serde(default)]
  pub businesses: Vec<BusinessEntity>,
  #[serde(default)]
  pub anchors:    Vec<AnchorPoint>,
  #[serde(default)]
  pub roads:      Vec<RoadSegment>,
  #[serde(default)]
  pub zones:      Vec<Zone>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportCounts {
  pub businesses: usize,
  pub anchors:    usize,
  pub roads:      usize,
  pub zones:      usize,
}

/// Upsert every row of `doc` into `store`.
pub async fn import<S: EnrichmentStore>(store: &S, doc: ImportDocument) -> Result<ImportCounts, S::Error> {
  let counts = ImportCounts {
    businesses: doc.businesses.len(),
    anchors:    doc.anchors.len(),
    roads:      doc.roads.len(),
    zones:      doc.zones.len(),
  };

  for business in doc.businesses {
    store.put_business(business).await?;
  }
  for anchor in doc.anchors {
    store.put_anchor(anchor).await?;
  }
  for road in doc.roads {
    store.put_road(road).await?;
  }
  for zone in doc.zones {
    store.put_zone(zone).await?;
  }

  tracing::info!(
    businesses = counts.businesses,
    anchors = counts.anchors,
    roads = counts.roads,
    zones = counts.zones,
    "import finished"
  );
  Ok(counts)
}
