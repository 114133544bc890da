//! The retrieval client: HTTP plumbing plus the fallback policies.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use sst_common::{ErrorBody, Field};

use crate::config::ClientConfig;
use crate::error::{classify_response, RetrievalError};
use crate::retry::{
    initial_stride, is_retryable_status, nearest_available, Backoff, NearestDecision,
    StrideSearch,
};

/// How to react when the requested day has no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMethod {
    /// Report the miss.
    Exact,
    /// Substitute the nearest published day, once, within tolerance.
    Nearest,
}

/// A point-value request.
#[derive(Debug, Clone)]
pub struct PointRequest {
    pub lon: f64,
    pub lat: f64,
    /// `None` asks for the latest published day.
    pub date: Option<NaiveDate>,
    pub fields: Vec<Field>,
    pub method: FallbackMethod,
}

/// A bbox mean-aggregation request.
#[derive(Debug, Clone)]
pub struct BboxRequest {
    pub lon0: f64,
    pub lat0: f64,
    pub lon1: f64,
    pub lat1: f64,
    /// `None` asks for the latest published day.
    pub date: Option<NaiveDate>,
    pub fields: Vec<Field>,
    pub method: FallbackMethod,
}

/// Value of each requested field at the grid cell nearest a point.
#[derive(Debug, Clone, Serialize)]
pub struct PointValue {
    pub region: [f64; 2],
    pub date: NaiveDate,

    #[serde(flatten)]
    pub fields: BTreeMap<String, Option<f64>>,

    /// Set when the served day differs from the request by substitution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Per-field arithmetic mean over the sampled cells of a bbox.
#[derive(Debug, Clone, Serialize)]
pub struct BboxMean {
    pub region: [f64; 4],
    pub date: NaiveDate,
    /// Stride the service accepted.
    pub sample: usize,

    #[serde(flatten)]
    pub fields: BTreeMap<String, Option<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// One record of the service's JSON response.
#[derive(Debug, Clone, Deserialize)]
struct RowRecord {
    #[allow(dead_code)]
    lon: f64,
    #[allow(dead_code)]
    lat: f64,
    date: NaiveDate,

    #[serde(flatten)]
    values: BTreeMap<String, Option<f64>>,
}

/// HTTP client with bounded retry, nearest-date fallback, and adaptive
/// stride search.
pub struct RetrievalClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl RetrievalClient {
    pub fn new(config: ClientConfig) -> Result<Self, RetrievalError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RetrievalError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Fetch the requested fields at the grid cell nearest `(lon, lat)`.
    pub async fn point_value(
        &self,
        req: &PointRequest,
        cancel: &CancellationToken,
    ) -> Result<PointValue, RetrievalError> {
        validate_lon_lat(req.lon, req.lat)?;
        let fields = normalize_fields(&req.fields)?;

        match self.fetch_point(req, req.date, &fields, cancel).await {
            Ok(rows) => assemble_point(req, &rows, &fields, None),
            Err(RetrievalError::NotFound {
                detail,
                earliest,
                latest,
            }) if req.method == FallbackMethod::Nearest => {
                let substitution =
                    self.decide_substitution(req.date, &detail, earliest, latest)?;
                let (requested, day) = substitution;

                tracing::info!(%requested, substitute = %day, "retrying with nearest available day");
                let rows = self
                    .fetch_point(req, Some(day), &fields, cancel)
                    .await
                    .map_err(|e| named_fallback_failure(e, requested, day))?;
                assemble_point(req, &rows, &fields, Some((requested, day)))
            }
            Err(e) => Err(e),
        }
    }

    /// Mean of each requested field over a bbox, widening the sampling
    /// stride until the service accepts the selection.
    pub async fn bbox_mean(
        &self,
        req: &BboxRequest,
        cancel: &CancellationToken,
    ) -> Result<BboxMean, RetrievalError> {
        validate_bbox(req)?;
        let fields = normalize_fields(&req.fields)?;

        let mut search = StrideSearch::new(
            initial_stride(
                req.lon1 - req.lon0,
                req.lat1 - req.lat0,
                self.config.deg_per_cell,
                self.config.point_limit,
            ),
            self.config.max_sample_attempts,
        );
        let mut date = req.date;
        let mut substitution: Option<(NaiveDate, NaiveDate)> = None;

        loop {
            match self
                .fetch_bbox(req, date, search.stride(), &fields, cancel)
                .await
            {
                Ok(rows) => {
                    let day = rows
                        .first()
                        .map(|r| r.date)
                        .ok_or_else(|| {
                            RetrievalError::InvalidResponse(
                                "service returned no rows for bbox".to_string(),
                            )
                        })?;
                    let means = field_means(&rows, &fields)?;
                    return Ok(BboxMean {
                        region: [req.lon0, req.lat0, req.lon1, req.lat1],
                        date: day,
                        sample: search.stride(),
                        fields: means,
                        requested_date: substitution.map(|(r, _)| r),
                        method: substitution.map(|_| "nearest".to_string()),
                    });
                }
                Err(RetrievalError::TooManyPoints { detail }) => {
                    if !search.widen() {
                        return Err(RetrievalError::TooManyPoints {
                            detail: format!(
                                "stride search gave up after {} attempts: {detail}",
                                search.attempts_used()
                            ),
                        });
                    }
                    tracing::debug!(stride = search.stride(), "widening bbox stride");
                }
                Err(RetrievalError::NotFound {
                    detail,
                    earliest,
                    latest,
                }) if req.method == FallbackMethod::Nearest && substitution.is_none() => {
                    let (requested, day) =
                        self.decide_substitution(req.date, &detail, earliest, latest)?;

                    tracing::info!(%requested, substitute = %day, "retrying bbox with nearest available day");
                    date = Some(day);
                    substitution = Some((requested, day));
                    search.reset();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Turn a miss into a single nearest-day substitution, or a final error.
    fn decide_substitution(
        &self,
        requested: Option<NaiveDate>,
        detail: &str,
        earliest: Option<NaiveDate>,
        latest: Option<NaiveDate>,
    ) -> Result<(NaiveDate, NaiveDate), RetrievalError> {
        // Without a requested date there is nothing to measure distance from.
        let Some(requested) = requested else {
            return Err(RetrievalError::NotFound {
                detail: detail.to_string(),
                earliest,
                latest,
            });
        };
        let (Some(earliest), Some(latest)) = (earliest, latest) else {
            return Err(RetrievalError::NotFound {
                detail: format!("{detail} (no available range reported)"),
                earliest,
                latest,
            });
        };

        match nearest_available(
            requested,
            earliest,
            latest,
            self.config.nearest_tolerance_days,
        ) {
            NearestDecision::Substitute(day) => Ok((requested, day)),
            NearestDecision::OutOfTolerance {
                nearest,
                distance_days,
            } => Err(RetrievalError::NotFound {
                detail: format!(
                    "requested {requested} is {distance_days} days from nearest \
                     available {nearest} (tolerance {} days)",
                    self.config.nearest_tolerance_days
                ),
                earliest: Some(earliest),
                latest: Some(latest),
            }),
        }
    }

    async fn fetch_point(
        &self,
        req: &PointRequest,
        date: Option<NaiveDate>,
        fields: &[Field],
        cancel: &CancellationToken,
    ) -> Result<Vec<RowRecord>, RetrievalError> {
        let mut query = vec![
            ("lon0", req.lon.to_string()),
            ("lat0", req.lat.to_string()),
            ("append", join_fields(fields)),
        ];
        if let Some(d) = date {
            let iso = d.format("%Y-%m-%d").to_string();
            query.push(("start", iso.clone()));
            query.push(("end", iso));
        }
        self.fetch_rows(&query, cancel).await
    }

    async fn fetch_bbox(
        &self,
        req: &BboxRequest,
        date: Option<NaiveDate>,
        stride: usize,
        fields: &[Field],
        cancel: &CancellationToken,
    ) -> Result<Vec<RowRecord>, RetrievalError> {
        let mut query = vec![
            ("lon0", req.lon0.to_string()),
            ("lat0", req.lat0.to_string()),
            ("lon1", req.lon1.to_string()),
            ("lat1", req.lat1.to_string()),
            ("sample", stride.to_string()),
            ("append", join_fields(fields)),
        ];
        if let Some(d) = date {
            query.push(("start", d.format("%Y-%m-%d").to_string()));
        }
        self.fetch_rows(&query, cancel).await
    }

    /// One logical request with the transport retry policy applied.
    ///
    /// Non-retryable responses short-circuit; retryable statuses and
    /// connection failures consume the backoff budget and the last failure
    /// is returned once it is spent. Every await races the cancel token.
    async fn fetch_rows(
        &self,
        query: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<Vec<RowRecord>, RetrievalError> {
        let url = format!("{}/api/ghrsst", self.config.base_url.trim_end_matches('/'));
        let mut backoff = Backoff::new(self.config.max_retries, self.config.initial_backoff);
        let mut last_error = RetrievalError::Transport("no attempts made".to_string());

        loop {
            if cancel.is_cancelled() {
                return Err(RetrievalError::Cancelled);
            }

            let send = self.http.get(&url).query(query).send();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(RetrievalError::Cancelled),
                r = send => r,
            };

            match outcome {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if resp.status().is_success() {
                        return resp
                            .json::<Vec<RowRecord>>()
                            .await
                            .map_err(|e| RetrievalError::InvalidResponse(e.to_string()));
                    }

                    let body = resp.json::<ErrorBody>().await.ok();
                    let classified = classify_response(status, body);
                    if !is_retryable_status(status) {
                        return Err(classified);
                    }
                    tracing::warn!(status, error = %classified, "retryable response");
                    last_error = classified;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "transport failure");
                    last_error = RetrievalError::Transport(e.to_string());
                }
            }

            match backoff.next_delay() {
                Some(delay) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RetrievalError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => return Err(last_error),
            }
        }
    }
}

fn named_fallback_failure(
    err: RetrievalError,
    requested: NaiveDate,
    substitute: NaiveDate,
) -> RetrievalError {
    match err {
        RetrievalError::NotFound {
            detail,
            earliest,
            latest,
        } => RetrievalError::NotFound {
            detail: format!(
                "requested {requested} and nearest available {substitute} both \
                 unavailable: {detail}"
            ),
            earliest,
            latest,
        },
        other => other,
    }
}

fn assemble_point(
    req: &PointRequest,
    rows: &[RowRecord],
    fields: &[Field],
    substitution: Option<(NaiveDate, NaiveDate)>,
) -> Result<PointValue, RetrievalError> {
    // The service returns one row per served day; with a single-day span
    // that is one row, and for an open span the last row is the latest.
    let row = rows.last().ok_or_else(|| {
        RetrievalError::InvalidResponse("service returned no rows for point".to_string())
    })?;

    let mut values = BTreeMap::new();
    for field in fields {
        let name = field.as_str();
        // Fields a day's group does not carry are omitted by the service;
        // the result keeps them as null so the shape is stable.
        values.insert(
            name.to_string(),
            row.values.get(name).copied().flatten(),
        );
    }

    Ok(PointValue {
        region: [req.lon, req.lat],
        date: row.date,
        fields: values,
        requested_date: substitution.map(|(r, _)| r),
        method: substitution.map(|_| "nearest".to_string()),
    })
}

/// Arithmetic mean per field over non-null sampled values; `None` when a
/// field has no data anywhere in the selection. Non-finite values mean a
/// serialization fault somewhere and are rejected outright.
fn field_means(
    rows: &[RowRecord],
    fields: &[Field],
) -> Result<BTreeMap<String, Option<f64>>, RetrievalError> {
    let mut means = BTreeMap::new();
    for field in fields {
        let name = field.as_str();
        let mut sum = 0.0;
        let mut count = 0u64;
        for row in rows {
            if let Some(Some(v)) = row.values.get(name) {
                if !v.is_finite() {
                    return Err(RetrievalError::InvalidResponse(format!(
                        "non-finite value for field '{name}'"
                    )));
                }
                sum += v;
                count += 1;
            }
        }
        let mean = if count == 0 { None } else { Some(sum / count as f64) };
        means.insert(name.to_string(), mean);
    }
    Ok(means)
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn validate_lon_lat(lon: f64, lat: f64) -> Result<(), RetrievalError> {
    if !(-180.0..=180.0).contains(&lon) {
        return Err(RetrievalError::InvalidRequest(format!(
            "longitude {lon} outside [-180, 180]"
        )));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(RetrievalError::InvalidRequest(format!(
            "latitude {lat} outside [-90, 90]"
        )));
    }
    Ok(())
}

fn validate_bbox(req: &BboxRequest) -> Result<(), RetrievalError> {
    validate_lon_lat(req.lon0, req.lat0)?;
    validate_lon_lat(req.lon1, req.lat1)?;
    if req.lon0 == req.lon1 || req.lat0 == req.lat1 {
        return Err(RetrievalError::InvalidRequest(
            "bbox must have nonzero area".to_string(),
        ));
    }
    Ok(())
}

/// De-duplicate preserving request order; at least one field is required.
fn normalize_fields(fields: &[Field]) -> Result<Vec<Field>, RetrievalError> {
    let mut out: Vec<Field> = Vec::new();
    for &f in fields {
        if !out.contains(&f) {
            out.push(f);
        }
    }
    if out.is_empty() {
        return Err(RetrievalError::InvalidRequest(
            "at least one field is required".to_string(),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn row(date: &str, sst: Option<f64>) -> RowRecord {
        let mut values = BTreeMap::new();
        values.insert("sst".to_string(), sst);
        RowRecord {
            lon: 120.0,
            lat: 23.0,
            date: d(date),
            values,
        }
    }

    #[test]
    fn test_validate_lon_lat() {
        assert!(validate_lon_lat(120.0, 23.0).is_ok());
        assert!(validate_lon_lat(181.0, 23.0).is_err());
        assert!(validate_lon_lat(120.0, -91.0).is_err());
    }

    #[test]
    fn test_validate_bbox_rejects_zero_area() {
        let req = BboxRequest {
            lon0: 120.0,
            lat0: 23.0,
            lon1: 120.0,
            lat1: 24.0,
            date: None,
            fields: vec![Field::Sst],
            method: FallbackMethod::Exact,
        };
        assert!(matches!(
            validate_bbox(&req),
            Err(RetrievalError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_normalize_fields_dedups_in_order() {
        let fields =
            normalize_fields(&[Field::SeaIce, Field::Sst, Field::SeaIce]).unwrap();
        assert_eq!(fields, vec![Field::SeaIce, Field::Sst]);
        assert!(normalize_fields(&[]).is_err());
    }

    #[test]
    fn test_field_means_ignores_nulls() {
        let rows = vec![
            row("2025-10-01", Some(20.0)),
            row("2025-10-01", None),
            row("2025-10-01", Some(22.0)),
        ];
        let means = field_means(&rows, &[Field::Sst]).unwrap();
        assert_eq!(means["sst"], Some(21.0));
    }

    #[test]
    fn test_field_means_all_null_is_none() {
        let rows = vec![row("2025-10-01", None), row("2025-10-01", None)];
        let means = field_means(&rows, &[Field::Sst]).unwrap();
        assert_eq!(means["sst"], None);
    }

    #[test]
    fn test_field_means_rejects_non_finite() {
        let rows = vec![row("2025-10-01", Some(f64::INFINITY))];
        assert!(matches!(
            field_means(&rows, &[Field::Sst]),
            Err(RetrievalError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_field_means_missing_field_is_none() {
        let rows = vec![row("2025-10-01", Some(20.0))];
        let means = field_means(&rows, &[Field::Sst, Field::SeaIce]).unwrap();
        assert_eq!(means["sst"], Some(20.0));
        assert_eq!(means["sea_ice"], None);
    }

    #[test]
    fn test_row_record_deserializes_flattened_fields() {
        let raw = r#"{"lon":120.5,"lat":23.5,"date":"2025-10-03","sst":20.75,"sea_ice":null}"#;
        let row: RowRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(row.date, d("2025-10-03"));
        assert_eq!(row.values["sst"], Some(20.75));
        assert_eq!(row.values["sea_ice"], None);
    }

    #[test]
    fn test_assemble_point_takes_latest_row() {
        let req = PointRequest {
            lon: 120.0,
            lat: 23.0,
            date: None,
            fields: vec![Field::Sst],
            method: FallbackMethod::Exact,
        };
        let rows = vec![row("2025-10-01", Some(20.0)), row("2025-10-03", Some(21.0))];
        let value = assemble_point(&req, &rows, &[Field::Sst], None).unwrap();
        assert_eq!(value.date, d("2025-10-03"));
        assert_eq!(value.fields["sst"], Some(21.0));
        assert!(value.requested_date.is_none());
        assert!(value.method.is_none());
    }

    #[test]
    fn test_assemble_point_tags_substitution() {
        let req = PointRequest {
            lon: 120.0,
            lat: 23.0,
            date: Some(d("2025-10-02")),
            fields: vec![Field::Sst],
            method: FallbackMethod::Nearest,
        };
        let rows = vec![row("2025-10-01", Some(20.0))];
        let value = assemble_point(
            &req,
            &rows,
            &[Field::Sst],
            Some((d("2025-10-02"), d("2025-10-01"))),
        )
        .unwrap();
        assert_eq!(value.requested_date, Some(d("2025-10-02")));
        assert_eq!(value.method.as_deref(), Some("nearest"));
    }
}
