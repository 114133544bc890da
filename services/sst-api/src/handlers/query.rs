//! GHRSST query handler: point time-series and single-day bbox reads.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use metrics::counter;
use serde::Deserialize;

use day_store::DayGroup;
use grid_sampling::{check_budget, nearest_index, Bbox};
use sst_common::{
    parse_append, parse_date, parse_modes, ErrorBody, Field, ResponseMode, SstError, SstResult,
};

use crate::assemble::{apply_modes, cell_value, ResultRow};
use crate::resolve::{resolve_bbox_day, resolve_point_days};
use crate::state::AppState;

/// Query parameters for the /api/ghrsst endpoint.
#[derive(Debug, Deserialize)]
pub struct GhrsstParams {
    /// Longitude (point) or near-corner longitude (bbox). Required.
    pub lon0: Option<f64>,
    /// Latitude (point) or near-corner latitude (bbox). Required.
    pub lat0: Option<f64>,

    /// Far-corner longitude; with `lat1` selects bbox mode.
    pub lon1: Option<f64>,
    /// Far-corner latitude; with `lon1` selects bbox mode.
    pub lat1: Option<f64>,

    /// Span start, YYYY-MM-DD.
    pub start: Option<String>,
    /// Span end, YYYY-MM-DD.
    pub end: Option<String>,

    /// Comma-separated fields, default `sst`.
    pub append: Option<String>,

    /// Bbox sampling stride, default 1.
    pub sample: Option<i64>,

    /// Comma-separated post-processing modes.
    pub mode: Option<String>,
}

enum QueryOutcome {
    Point(Vec<ResultRow>),
    Bbox {
        rows: Vec<ResultRow>,
        stride: usize,
        served_rows: usize,
    },
}

/// GET /api/ghrsst
pub async fn ghrsst_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<GhrsstParams>,
) -> Response {
    match run_query(&state, params).await {
        Ok(QueryOutcome::Point(rows)) => {
            counter!("ghrsst_requests_total", "mode" => "point").increment(1);
            Json(rows).into_response()
        }
        Ok(QueryOutcome::Bbox {
            rows,
            stride,
            served_rows,
        }) => {
            counter!("ghrsst_requests_total", "mode" => "bbox").increment(1);
            let mut headers = HeaderMap::new();
            if let Ok(v) = HeaderValue::from_str(&stride.to_string()) {
                headers.insert("x-stride", v);
            }
            if let Ok(v) = HeaderValue::from_str(&served_rows.to_string()) {
                headers.insert("x-served-rows", v);
            }
            (headers, Json(rows)).into_response()
        }
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &SstError) -> Response {
    let status = StatusCode::from_u16(err.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        tracing::error!(error = %err, "query failed");
    } else {
        tracing::debug!(error = %err, "query rejected");
    }
    counter!("ghrsst_errors_total", "status" => status.as_str().to_string()).increment(1);

    (status, Json(ErrorBody::from(err))).into_response()
}

async fn run_query(state: &AppState, params: GhrsstParams) -> SstResult<QueryOutcome> {
    // Parameter validation happens before any storage access, so a bad
    // request is rejected the same way whether or not data exists.
    let fields = parse_append(params.append.as_deref())?;
    let modes = parse_modes(params.mode.as_deref())?;

    let lon0 = require_param(params.lon0, "lon0")?;
    let lat0 = require_param(params.lat0, "lat0")?;

    let start = parse_opt_date(params.start.as_deref())?;
    let end = parse_opt_date(params.end.as_deref())?;

    let bbox = match (params.lon1, params.lat1) {
        (Some(lon1), Some(lat1)) => {
            let b = Bbox {
                lon0,
                lat0,
                lon1,
                lat1,
            };
            // A degenerate box collapses to the near corner: point mode.
            if b.is_degenerate() {
                None
            } else {
                Some(b)
            }
        }
        _ => None,
    };

    let stride = match (bbox.is_some(), params.sample) {
        (false, Some(_)) => {
            return Err(SstError::InvalidParameter {
                param: "sample".to_string(),
                message: "only applies to bbox queries".to_string(),
            });
        }
        (_, Some(s)) if s < 1 => {
            return Err(SstError::InvalidParameter {
                param: "sample".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }
        (true, Some(s)) => s as usize,
        _ => 1,
    };

    let bounds = state.bounds.current().await?;

    match bbox {
        None => {
            let days = resolve_point_days(start, end, bounds, state.config.max_span_days, |d| {
                state.store.exists(d)
            })?;
            let rows = point_rows(state, &days, lon0, lat0, &fields, &modes).await?;
            Ok(QueryOutcome::Point(rows))
        }
        Some(bbox) => {
            let day = resolve_bbox_day(start, end, bounds, |d| state.store.exists(d))?;
            let (rows, served_rows) =
                bbox_rows(state, day, bbox, stride, &fields, &modes).await?;
            Ok(QueryOutcome::Bbox {
                rows,
                stride,
                served_rows,
            })
        }
    }
}

fn require_param(value: Option<f64>, name: &str) -> SstResult<f64> {
    value.ok_or_else(|| SstError::InvalidParameter {
        param: name.to_string(),
        message: "required".to_string(),
    })
}

fn parse_opt_date(s: Option<&str>) -> SstResult<Option<NaiveDate>> {
    match s {
        Some(raw) if !raw.trim().is_empty() => Ok(Some(parse_date(raw.trim())?)),
        _ => Ok(None),
    }
}

/// One row per resolved day; all days share the coordinate frame of the
/// first resolved day's group.
async fn point_rows(
    state: &AppState,
    days: &[NaiveDate],
    lon: f64,
    lat: f64,
    fields: &[Field],
    modes: &[ResponseMode],
) -> SstResult<Vec<ResultRow>> {
    let first = state.store.open(days[0]).await?;
    let col = nearest_index(lon, first.lon());
    let row = nearest_index(lat, first.lat());
    let grid_lon = first.lon()[col];
    let grid_lat = first.lat()[row];

    let mut rows = Vec::with_capacity(days.len());
    for (i, &day) in days.iter().enumerate() {
        let opened: Box<dyn DayGroup>;
        let group: &dyn DayGroup = if i == 0 {
            first.as_ref()
        } else {
            opened = state.store.open(day).await?;
            opened.as_ref()
        };

        let mut result = ResultRow {
            lon: grid_lon,
            lat: grid_lat,
            date: day,
            values: Default::default(),
        };
        for &field in fields {
            // Days missing a field simply omit it from their row.
            if !group.has_field(field) {
                continue;
            }
            let v = group.read_cell(field, row, col).await?;
            result.values.insert(field.as_str().to_string(), cell_value(v));
        }
        rows.push(result);
    }

    apply_modes(&mut rows, modes);
    Ok(rows)
}

/// Row-major strided cells of a single day, one JSON record per cell.
async fn bbox_rows(
    state: &AppState,
    day: NaiveDate,
    bbox: Bbox,
    stride: usize,
    fields: &[Field],
    modes: &[ResponseMode],
) -> SstResult<(Vec<ResultRow>, usize)> {
    let group = state.store.open(day).await?;
    let (cols, grid_rows) = bbox.to_index_ranges(group.lon(), group.lat());

    let total = check_budget(&cols, &grid_rows, stride, state.config.point_limit)?;
    let mut rows: Vec<ResultRow> = Vec::with_capacity(total as usize);

    let present: Vec<(Field, bool)> = fields
        .iter()
        .map(|&f| (f, group.has_field(f)))
        .collect();

    for row_idx in grid_rows.strided(stride) {
        // One contiguous read per field per grid row, then pick the strided
        // columns; strided cell reads would multiply round-trips.
        let mut spans: Vec<(Field, Option<Vec<f32>>)> = Vec::with_capacity(present.len());
        for &(field, has) in &present {
            if has {
                let span = group.read_row(field, row_idx, cols.lo, cols.hi).await?;
                spans.push((field, Some(span)));
            } else {
                spans.push((field, None));
            }
        }

        for col_idx in cols.strided(stride) {
            let mut result = ResultRow {
                lon: group.lon()[col_idx],
                lat: group.lat()[row_idx],
                date: day,
                values: Default::default(),
            };
            for (field, span) in &spans {
                let value = match span {
                    Some(data) => cell_value(data[col_idx - cols.lo]),
                    // Requested but absent from this day's group: explicit null.
                    None => None,
                };
                result.values.insert(field.as_str().to_string(), value);
            }
            rows.push(result);
        }
    }

    apply_modes(&mut rows, modes);
    let served = rows.len();
    Ok((rows, served))
}
