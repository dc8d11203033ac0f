use clap::ValueEnum;

use crate::error::ServiceError;

const LEGACY_SCHEME: &str = "postgres://";
const CANONICAL_SCHEME: &str = "postgresql://";

/// Where the coordinate table keeps its x/y/z values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CoordinateColumns {
    /// Plain `x`, `y` and `z` columns.
    #[default]
    Xyz,
    /// A PostGIS `geom` POINT Z column.
    Geom,
}

impl CoordinateColumns {
    pub fn expressions(&self) -> [&'static str; 3] {
        match self {
            CoordinateColumns::Xyz => ["x", "y", "z"],
            CoordinateColumns::Geom => ["ST_X(geom)", "ST_Y(geom)", "ST_Z(geom)"],
        }
    }
}

/// Server-side caps on result sizes.
#[derive(Debug, Clone, Copy)]
pub struct QueryLimits {
    /// Ceiling on raw rows returned by a study query, regardless of the requested limit.
    pub max_rows: u32,
    /// Number of study ids echoed in the response body.
    pub display_cap: usize,
    /// Number of metadata rows fetched alongside a non-empty result.
    pub sample_size: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_rows: 2000,
            display_cap: 200,
            sample_size: 100,
        }
    }
}

/// Rewrites the legacy `postgres://` scheme to `postgresql://`.
pub fn normalize_db_url(url: &str) -> String {
    match url.strip_prefix(LEGACY_SCHEME) {
        Some(rest) => format!("{}{}", CANONICAL_SCHEME, rest),
        None => url.to_string(),
    }
}

/// Picks the first non-blank connection string, preferring `DB_URL` over `DATABASE_URL`.
pub fn resolve_db_url(
    db_url: Option<String>,
    fallback: Option<String>,
) -> Result<String, ServiceError> {
    db_url
        .into_iter()
        .chain(fallback)
        .find(|url| !url.trim().is_empty())
        .map(|url| normalize_db_url(url.trim()))
        .ok_or_else(|| {
            ServiceError::Configuration(
                "missing DB_URL (or DATABASE_URL) environment variable".to_string(),
            )
        })
}

/// The schema name is interpolated into `SET LOCAL search_path`, so it must be
/// a plain identifier.
pub fn validate_schema(schema: &str) -> Result<(), ServiceError> {
    let mut chars = schema.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ServiceError::Configuration(format!(
            "schema '{}' is not a valid SQL identifier",
            schema
        )))
    }
}
