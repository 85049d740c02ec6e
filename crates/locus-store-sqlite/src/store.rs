//! [`SqliteStore`]: the SQLite implementation of [`EnrichmentStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use locus_core::{
  Error as CoreError,
  business::{BusinessEntity, GeoPoint},
  facts::BusinessFacts,
  metrics::{BusinessMetrics, NewMetrics},
  request::{EnrichmentRequest, EnrichmentResponse, NewRequest, truncate_error},
  spatial::{AnchorPoint, RoadSegment, SpatialLayers, Zone},
  staleness::StalenessReport,
  store::{CandidateQuery, CandidateRow, EnrichmentStore, MetricsInput, RecordedEnrichment},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    BUSINESS_COLUMN_COUNT, BUSINESS_COLUMNS, FACTS_COLUMNS, METRICS_COLUMNS,
    REQUEST_COLUMNS, RawBusiness, RawFacts, RawMetrics, RawRequest, RawResponse,
    decode_dt, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Locus store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Reject a bounded score outside [0, 1] before it reaches the table.
fn check_unit(business_id: &str, field: &'static str, value: Option<f64>) -> Result<()> {
  match value {
    Some(v) if !(0.0..=1.0).contains(&v) => Err(Error::OutOfRange {
      business_id: business_id.to_owned(),
      field,
      value: v,
    }),
    _ => Ok(()),
  }
}

/// Column values for one `business_metrics` upsert, encoded up front.
struct EncodedMetrics {
  business_id:                 String,
  density_neighbors:           u32,
  density_score:               f64,
  geo_label:                   String,
  geo_source:                  String,
  size_class:                  Option<&'static str>,
  is_chain:                    Option<bool>,
  ad_budget_band:              Option<&'static str>,
  umbrella_affinity:           Option<f64>,
  digital_presence:            f64,
  digital_presence_confidence: f64,
  marketing_attitude:          Option<f64>,
  facts_confidence:            Option<f64>,
}

impl EncodedMetrics {
  fn encode(m: NewMetrics) -> Result<Self> {
    let id = m.business_id.as_str();
    check_unit(id, "density_score", Some(m.density_score))?;
    check_unit(id, "digital_presence", Some(m.digital_presence))?;
    check_unit(id, "digital_presence_confidence", Some(m.digital_presence_confidence))?;
    check_unit(id, "umbrella_affinity", m.umbrella_affinity)?;
    check_unit(id, "marketing_attitude", m.marketing_attitude)?;
    check_unit(id, "facts_confidence", m.facts_confidence)?;

    Ok(Self {
      size_class: m.size_class.map(|s| s.as_str()),
      ad_budget_band: m.ad_budget_band.map(|b| b.as_str()),
      business_id: m.business_id,
      density_neighbors: m.density_neighbors,
      density_score: m.density_score,
      geo_label: m.geo_label,
      geo_source: m.geo_source,
      is_chain: m.is_chain,
      umbrella_affinity: m.umbrella_affinity,
      digital_presence: m.digital_presence,
      digital_presence_confidence: m.digital_presence_confidence,
      marketing_attitude: m.marketing_attitude,
      facts_confidence: m.facts_confidence,
    })
  }
}

// ─── EnrichmentStore impl ────────────────────────────────────────────────────

impl EnrichmentStore for SqliteStore {
  type Error = Error;

  // ── Upstream rows ─────────────────────────────────────────────────────────

  async fn put_business(&self, business: BusinessEntity) -> Result<()> {
    let types = serde_json::to_string(&business.types)?;
    let tags  = serde_json::to_string(&business.tags)?;
    let lat   = business.location.map(|p| p.lat);
    let lon   = business.location.map(|p| p.lon);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO businesses (
             business_id, name, category, address, formatted_address, city,
             latitude, longitude, has_phone, has_website, weekly_minutes,
             types, tags, external_category, external_subtype
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
           ON CONFLICT (business_id) DO UPDATE SET
             name              = excluded.name,
             category          = excluded.category,
             address           = excluded.address,
             formatted_address = excluded.formatted_address,
             city              = excluded.city,
             latitude          = excluded.latitude,
             longitude         = excluded.longitude,
             has_phone         = excluded.has_phone,
             has_website       = excluded.has_website,
             weekly_minutes    = excluded.weekly_minutes,
             types             = excluded.types,
             tags              = excluded.tags,
             external_category = excluded.external_category,
             external_subtype  = excluded.external_subtype",
          rusqlite::params![
            business.business_id,
            business.name,
            business.category,
            business.address,
            business.formatted_address,
            business.city,
            lat,
            lon,
            business.has_phone,
            business.has_website,
            business.weekly_minutes,
            types,
            tags,
            business.external_category,
            business.external_subtype,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_business(&self, business_id: &str) -> Result<Option<BusinessEntity>> {
    let id = business_id.to_owned();

    let raw: Option<RawBusiness> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {BUSINESS_COLUMNS} FROM businesses b WHERE b.business_id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawBusiness::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawBusiness::into_business).transpose()
  }

  async fn put_anchor(&self, anchor: AnchorPoint) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO anchor_points (anchor_id, name, latitude, longitude)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![
            anchor.anchor_id,
            anchor.name,
            anchor.location.lat,
            anchor.location.lon,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn put_road(&self, road: RoadSegment) -> Result<()> {
    let path = serde_json::to_string(&road.path)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO road_segments (road_id, class, path) VALUES (?1, ?2, ?3)",
          rusqlite::params![road.road_id, road.class, path],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn put_zone(&self, zone: Zone) -> Result<()> {
    let polygon = serde_json::to_string(&zone.polygon)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO zones (zone_id, label, kind, priority, polygon)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![zone.zone_id, zone.label, zone.kind, zone.priority, polygon],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Staleness and selection ───────────────────────────────────────────────

  async fn staleness(&self, ttl_days: u32, as_of: DateTime<Utc>) -> Result<StalenessReport> {
    let cutoff = encode_dt(as_of - chrono::Duration::days(i64::from(ttl_days)));

    let (candidates, missing, stale): (i64, i64, i64) = self
      .conn
      .call(move |conn| {
        let candidates: i64 = conn.query_row(
          "SELECT COUNT(*)
           FROM businesses b
           LEFT JOIN business_facts bf ON bf.business_id = b.business_id
           WHERE bf.business_id IS NULL OR bf.updated_at < ?1",
          rusqlite::params![cutoff],
          |r| r.get(0),
        )?;

        let (missing, stale): (i64, i64) = conn.query_row(
          "SELECT
             COALESCE(SUM(CASE WHEN bm.business_id IS NULL THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(
               CASE
                 WHEN bm.business_id IS NOT NULL
                  AND bf.updated_at IS NOT NULL
                  AND bm.updated_at < bf.updated_at THEN 1
                 ELSE 0
               END
             ), 0)
           FROM businesses b
           LEFT JOIN business_metrics bm ON bm.business_id = b.business_id
           LEFT JOIN business_facts   bf ON bf.business_id = b.business_id",
          [],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        Ok((candidates, missing, stale))
      })
      .await?;

    Ok(StalenessReport {
      enrichment_candidates: candidates.max(0) as u64,
      metrics_missing:       missing.max(0) as u64,
      metrics_stale:         stale.max(0) as u64,
    })
  }

  async fn select_candidates(&self, query: CandidateQuery) -> Result<Vec<CandidateRow>> {
    let cutoff    = encode_dt(query.cutoff());
    let force     = query.force;
    let limit_val = i64::try_from(query.limit).unwrap_or(i64::MAX);
    let exclude   = serde_json::to_string(&query.exclude)?;

    let raws: Vec<(RawBusiness, Option<String>, Option<f64>)> = self
      .conn
      .call(move |conn| {
        // Never-enriched rows first, then the stalest, then by id.
        let sql = format!(
          "SELECT {BUSINESS_COLUMNS}, bf.updated_at, bf.confidence
           FROM businesses b
           LEFT JOIN business_facts bf ON bf.business_id = b.business_id
           WHERE (?1 OR bf.business_id IS NULL OR bf.updated_at < ?2)
             AND b.business_id NOT IN (SELECT value FROM json_each(?4))
           ORDER BY bf.updated_at ASC NULLS FIRST, b.business_id
           LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![force, cutoff, limit_val, exclude], |row| {
            Ok((
              RawBusiness::from_row(row)?,
              row.get(BUSINESS_COLUMN_COUNT)?,
              row.get(BUSINESS_COLUMN_COUNT + 1)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, updated_at, confidence)| {
        Ok(CandidateRow {
          business:         raw.into_business()?,
          facts_updated_at: updated_at.as_deref().map(decode_dt).transpose()?,
          facts_confidence: confidence,
        })
      })
      .collect()
  }

  // ── Requests ──────────────────────────────────────────────────────────────

  async fn upsert_request(&self, input: NewRequest) -> Result<EnrichmentRequest> {
    let request_id = encode_uuid(Uuid::new_v4());
    let now        = encode_dt(Utc::now());
    let payload    = serde_json::to_string(&input.input_payload)?;

    let raw: RawRequest = self
      .conn
      .call(move |conn| {
        // On conflict the original request_id and created_at are kept.
        let sql = format!(
          "INSERT INTO enrichment_requests (
             request_id, business_id, provider, input_hash, input_payload,
             status, error, created_at, started_at, finished_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 'running', NULL, ?6, ?6, NULL)
           ON CONFLICT (business_id, input_hash) DO UPDATE SET
             provider      = excluded.provider,
             input_payload = excluded.input_payload,
             status        = 'running',
             error         = NULL,
             started_at    = excluded.started_at,
             finished_at   = NULL
           RETURNING {REQUEST_COLUMNS}"
        );
        Ok(conn.query_row(
          &sql,
          rusqlite::params![
            request_id,
            input.business_id,
            input.provider,
            input.input_hash,
            payload,
            now,
          ],
          RawRequest::from_row,
        )?)
      })
      .await?;

    raw.into_request()
  }

  async fn get_request(&self, request_id: Uuid) -> Result<Option<EnrichmentRequest>> {
    let id_str = encode_uuid(request_id);

    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM enrichment_requests WHERE request_id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawRequest::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRequest::into_request).transpose()
  }

  async fn list_requests(&self, business_id: &str) -> Result<Vec<EnrichmentRequest>> {
    let id = business_id.to_owned();

    let raws: Vec<RawRequest> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {REQUEST_COLUMNS} FROM enrichment_requests
           WHERE business_id = ?1
           ORDER BY created_at, request_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id], RawRequest::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRequest::into_request).collect()
  }

  async fn complete_request(
    &self,
    request_id: Uuid,
    outcome: RecordedEnrichment,
  ) -> Result<BusinessFacts> {
    let RecordedEnrichment { completion, facts } = outcome;
    let now = Utc::now();

    let req_id_str  = encode_uuid(request_id);
    let resp_id_str = encode_uuid(Uuid::new_v4());
    let now_str     = encode_dt(now);
    let raw_json    = serde_json::to_string(&completion.raw)?;
    let parsed_json = serde_json::to_string(&facts)?;
    let social_json = serde_json::to_string(&facts.social)?;
    let provenance  = facts.provenance.as_ref().map(serde_json::to_string).transpose()?;
    let size_class  = facts.size_class.map(|s| s.as_str());
    let budget_band = facts.ad_budget_band.map(|b| b.as_str());
    let model       = completion.model.clone();

    let columns = (
      facts.is_chain,
      facts.website_url.clone(),
      facts.marketing_attitude,
      facts.umbrella_affinity,
      facts.confidence,
    );
    let tokens = (completion.prompt_tokens, completion.completion_tokens, completion.cost_cents);

    // (business_id, provider) of the request, if it exists.
    let found: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let found: Option<(String, String)> = tx
          .query_row(
            "SELECT business_id, provider FROM enrichment_requests WHERE request_id = ?1",
            rusqlite::params![req_id_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let Some((business_id, provider)) = found else {
          return Ok(None);
        };

        tx.execute(
          "INSERT INTO enrichment_responses (
             response_id, request_id, model, raw_response, parsed_response,
             prompt_tokens, completion_tokens, cost_cents, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            resp_id_str,
            req_id_str,
            model,
            raw_json,
            parsed_json,
            tokens.0,
            tokens.1,
            tokens.2,
            now_str,
          ],
        )?;

        // Full replacement: every column is overwritten, nulls included.
        tx.execute(
          "INSERT INTO business_facts (
             business_id, size_class, is_chain, website_url, social,
             marketing_attitude, umbrella_affinity, ad_budget_band,
             budget_source, confidence, provenance, source_provider,
             source_model, updated_at
           ) VALUES (
             ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
             CASE WHEN ?8 IS NULL THEN NULL ELSE 'llm' END,
             ?9, ?10, ?11, ?12, ?13
           )
           ON CONFLICT (business_id) DO UPDATE SET
             size_class         = excluded.size_class,
             is_chain           = excluded.is_chain,
             website_url        = excluded.website_url,
             social             = excluded.social,
             marketing_attitude = excluded.marketing_attitude,
             umbrella_affinity  = excluded.umbrella_affinity,
             ad_budget_band     = excluded.ad_budget_band,
             budget_source      = excluded.budget_source,
             confidence         = excluded.confidence,
             provenance         = excluded.provenance,
             source_provider    = excluded.source_provider,
             source_model       = excluded.source_model,
             updated_at         = excluded.updated_at",
          rusqlite::params![
            business_id,
            size_class,
            columns.0,
            columns.1,
            social_json,
            columns.2,
            columns.3,
            budget_band,
            columns.4,
            provenance,
            provider,
            model,
            now_str,
          ],
        )?;

        tx.execute(
          "UPDATE enrichment_requests
              SET status = 'completed', error = NULL, finished_at = ?2
            WHERE request_id = ?1",
          rusqlite::params![req_id_str, now_str],
        )?;

        tx.commit()?;
        Ok(Some((business_id, provider)))
      })
      .await?;

    let (business_id, provider) = found.ok_or(CoreError::RequestNotFound(request_id))?;

    Ok(BusinessFacts::from_extracted(
      business_id,
      &facts,
      Some(provider),
      completion.model,
      // Round-trip through the column encoding so callers see the stored value.
      decode_dt(&encode_dt(now))?,
    ))
  }

  async fn fail_request(&self, request_id: Uuid, message: &str) -> Result<()> {
    let id_str  = encode_uuid(request_id);
    let message = truncate_error(message);
    let now     = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE enrichment_requests
              SET status = 'error', error = ?2, finished_at = ?3
            WHERE request_id = ?1",
          rusqlite::params![id_str, message, now],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(CoreError::RequestNotFound(request_id).into());
    }
    Ok(())
  }

  async fn list_responses(&self, request_id: Uuid) -> Result<Vec<EnrichmentResponse>> {
    let id_str = encode_uuid(request_id);

    let raws: Vec<RawResponse> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT response_id, request_id, model, raw_response, parsed_response,
                  prompt_tokens, completion_tokens, cost_cents, created_at
           FROM enrichment_responses
           WHERE request_id = ?1
           ORDER BY created_at, response_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawResponse::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawResponse::into_response).collect()
  }

  // ── Facts and metrics ─────────────────────────────────────────────────────

  async fn get_facts(&self, business_id: &str) -> Result<Option<BusinessFacts>> {
    let id = business_id.to_owned();

    let raw: Option<RawFacts> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {FACTS_COLUMNS} FROM business_facts bf WHERE bf.business_id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], |row| RawFacts::from_row_at(row, 0))
            .optional()?
            .flatten(),
        )
      })
      .await?;

    raw.map(RawFacts::into_facts).transpose()
  }

  async fn metrics_inputs(&self) -> Result<Vec<MetricsInput>> {
    let raws: Vec<(RawBusiness, Option<RawFacts>)> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT {BUSINESS_COLUMNS}, {FACTS_COLUMNS}
           FROM businesses b
           LEFT JOIN business_facts bf ON bf.business_id = b.business_id
           ORDER BY b.business_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| {
            Ok((
              RawBusiness::from_row(row)?,
              RawFacts::from_row_at(row, BUSINESS_COLUMN_COUNT)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(business, facts)| {
        Ok(MetricsInput {
          business: business.into_business()?,
          facts:    facts.map(RawFacts::into_facts).transpose()?,
        })
      })
      .collect()
  }

  async fn spatial_layers(&self) -> Result<SpatialLayers> {
    type RawRoad = (String, String, String);
    type RawZone = (String, String, Option<String>, i32, String);

    let (anchors, roads, zones): (Vec<AnchorPoint>, Vec<RawRoad>, Vec<RawZone>) = self
      .conn
      .call(|conn| {
        let anchors = conn
          .prepare("SELECT anchor_id, name, latitude, longitude FROM anchor_points ORDER BY anchor_id")?
          .query_map([], |r| {
            Ok(AnchorPoint {
              anchor_id: r.get(0)?,
              name:      r.get(1)?,
              location:  GeoPoint::new(r.get(2)?, r.get(3)?),
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let roads = conn
          .prepare("SELECT road_id, class, path FROM road_segments ORDER BY road_id")?
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let zones = conn
          .prepare(
            "SELECT zone_id, label, kind, priority, polygon FROM zones ORDER BY priority, zone_id",
          )?
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((anchors, roads, zones))
      })
      .await?;

    let roads = roads
      .into_iter()
      .map(|(road_id, class, path)| {
        Ok(RoadSegment { road_id, class, path: serde_json::from_str(&path)? })
      })
      .collect::<Result<Vec<_>>>()?;

    let zones = zones
      .into_iter()
      .map(|(zone_id, label, kind, priority, polygon)| {
        Ok(Zone { zone_id, label, kind, priority, polygon: serde_json::from_str(&polygon)? })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(SpatialLayers { anchors, roads, zones })
  }

  async fn replace_metrics(&self, rows: Vec<NewMetrics>) -> Result<usize> {
    let encoded = rows
      .into_iter()
      .map(EncodedMetrics::encode)
      .collect::<Result<Vec<_>>>()?;
    let now = encode_dt(Utc::now());

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO business_metrics (
               business_id, density_neighbors, density_score, geo_label, geo_source,
               size_class, is_chain, ad_budget_band, umbrella_affinity,
               digital_presence, digital_presence_confidence, marketing_attitude,
               facts_confidence, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT (business_id) DO UPDATE SET
               density_neighbors           = excluded.density_neighbors,
               density_score               = excluded.density_score,
               geo_label                   = excluded.geo_label,
               geo_source                  = excluded.geo_source,
               size_class                  = excluded.size_class,
               is_chain                    = excluded.is_chain,
               ad_budget_band              = excluded.ad_budget_band,
               umbrella_affinity           = excluded.umbrella_affinity,
               digital_presence            = excluded.digital_presence,
               digital_presence_confidence = excluded.digital_presence_confidence,
               marketing_attitude          = excluded.marketing_attitude,
               facts_confidence            = excluded.facts_confidence,
               updated_at                  = excluded.updated_at",
          )?;
          for m in &encoded {
            stmt.execute(rusqlite::params![
              m.business_id,
              m.density_neighbors,
              m.density_score,
              m.geo_label,
              m.geo_source,
              m.size_class,
              m.is_chain,
              m.ad_budget_band,
              m.umbrella_affinity,
              m.digital_presence,
              m.digital_presence_confidence,
              m.marketing_attitude,
              m.facts_confidence,
              now,
            ])?;
          }
        }
        tx.commit()?;
        Ok(encoded.len())
      })
      .await?;

    tracing::debug!(rows = written, "business_metrics replaced");
    Ok(written)
  }

  async fn get_metrics(&self, business_id: &str) -> Result<Option<BusinessMetrics>> {
    let id = business_id.to_owned();

    let raw: Option<RawMetrics> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {METRICS_COLUMNS} FROM business_metrics WHERE business_id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawMetrics::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMetrics::into_metrics).transpose()
  }
}
