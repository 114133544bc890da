//! Field and response-mode allow-lists.

use crate::error::SstError;

/// A queryable grid field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Sst,
    SstAnomaly,
    SeaIce,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Sst, Field::SstAnomaly, Field::SeaIce];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Sst => "sst",
            Field::SstAnomaly => "sst_anomaly",
            Field::SeaIce => "sea_ice",
        }
    }

    pub fn parse(s: &str) -> Option<Field> {
        match s {
            "sst" => Some(Field::Sst),
            "sst_anomaly" => Some(Field::SstAnomaly),
            "sea_ice" => Some(Field::SeaIce),
            _ => None,
        }
    }

    fn allowed_list() -> String {
        Field::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Parse the comma-separated `append` parameter into an ordered,
/// de-duplicated field list. Defaults to `[sst]`.
pub fn parse_append(append: Option<&str>) -> Result<Vec<Field>, SstError> {
    let Some(raw) = append else {
        return Ok(vec![Field::Sst]);
    };

    let mut fields = Vec::new();
    let mut bad = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match Field::parse(token) {
            Some(f) => {
                if !fields.contains(&f) {
                    fields.push(f);
                }
            }
            None => bad.push(token),
        }
    }

    if !bad.is_empty() {
        return Err(SstError::UnsupportedField {
            bad: bad.join(","),
            allowed: Field::allowed_list(),
        });
    }
    if fields.is_empty() {
        return Ok(vec![Field::Sst]);
    }
    Ok(fields)
}

/// Post-processing modes applied to assembled rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Round coordinates to 5 decimals and field values to 3.
    Truncate,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Truncate => "truncate",
        }
    }
}

/// Parse the comma-separated `mode` parameter against the allow-list.
pub fn parse_modes(mode: Option<&str>) -> Result<Vec<ResponseMode>, SstError> {
    let Some(raw) = mode else {
        return Ok(Vec::new());
    };

    let mut modes = Vec::new();
    let mut bad = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token {
            "truncate" => {
                if !modes.contains(&ResponseMode::Truncate) {
                    modes.push(ResponseMode::Truncate);
                }
            }
            other => bad.push(other),
        }
    }

    if !bad.is_empty() {
        return Err(SstError::UnsupportedMode {
            bad: bad.join(","),
            allowed: "truncate".to_string(),
        });
    }
    Ok(modes)
}
