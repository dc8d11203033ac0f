use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use super::coordinate::Coordinate;
use super::term::Term;
use crate::config::{CoordinateColumns, QueryLimits};
use crate::error::ServiceError;

pub const DEFAULT_RADIUS: f64 = 2.0;
pub const DEFAULT_MIN_WEIGHT: f64 = 0.0;

/// How a term is matched against the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TermMatch {
    /// Exact (case-insensitive) match against annotation terms, above a weight threshold.
    #[default]
    Exact,
    /// Case-insensitive substring match against study titles.
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    Terms,
    Titles,
    Locations,
    DissociateTerms,
    DissociateTitles,
    DissociateLocations,
}

/// Predicate deciding whether a study belongs to a result set.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum Membership {
    /// The study is annotated with `term` at a weight strictly above `min_weight`.
    Term { term: Term, min_weight: f64 },
    /// The study title contains `term`.
    Title { term: Term },
    /// The study reports at least one coordinate within `radius` of `point`.
    Location { point: Coordinate, radius: f64 },
}

impl Membership {
    pub fn term(
        term: Term,
        matching: TermMatch,
        min_weight: Option<f64>,
    ) -> Result<Self, ServiceError> {
        let min_weight = non_negative("minw", min_weight.unwrap_or(DEFAULT_MIN_WEIGHT))?;
        match matching {
            TermMatch::Exact => Ok(Membership::Term { term, min_weight }),
            // titles carry no weight, but a malformed threshold is still rejected
            TermMatch::Title => Ok(Membership::Title { term }),
        }
    }

    pub fn location(point: Coordinate, radius: Option<f64>) -> Result<Self, ServiceError> {
        Ok(Membership::Location {
            point,
            radius: non_negative("radius", radius.unwrap_or(DEFAULT_RADIUS))?,
        })
    }

    /// Appends `SELECT DISTINCT study_id ...` for this predicate.
    pub(crate) fn push_sql(
        &self,
        qb: &mut QueryBuilder<'static, Postgres>,
        columns: CoordinateColumns,
    ) {
        qb.push("SELECT DISTINCT study_id::bigint AS study_id FROM ");
        match self {
            Membership::Term { term, min_weight } => {
                qb.push("annotations_terms WHERE lower(term) = ");
                qb.push_bind(term.as_str().to_owned());
                qb.push(" AND weight > ");
                qb.push_bind(*min_weight);
            }
            Membership::Title { term } => {
                qb.push("metadata WHERE strpos(lower(title), ");
                qb.push_bind(term.as_str().to_owned());
                qb.push(") > 0");
            }
            Membership::Location { point, radius } => {
                // squared distance, boundary inclusive
                let [x, y, z] = columns.expressions();
                qb.push("coordinates WHERE power(");
                qb.push(x).push(" - ").push_bind(point.x);
                qb.push(", 2) + power(");
                qb.push(y).push(" - ").push_bind(point.y);
                qb.push(", 2) + power(");
                qb.push(z).push(" - ").push_bind(point.z);
                qb.push(", 2) <= ");
                qb.push_bind(radius * radius);
            }
        }
    }
}

fn non_negative(name: &str, value: f64) -> Result<f64, ServiceError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ServiceError::InvalidInput(format!(
            "{} must be a finite, non-negative number, got {}",
            name, value
        )));
    }
    Ok(value)
}

/// Clamps a requested row limit to the server-side ceiling.
pub fn resolve_limit(requested: Option<u32>, limits: &QueryLimits) -> Result<u32, ServiceError> {
    match requested {
        Some(0) => Err(ServiceError::InvalidInput(
            "limit must be at least 1".to_string(),
        )),
        Some(limit) => Ok(limit.min(limits.max_rows)),
        None => Ok(limits.max_rows),
    }
}

/// A study lookup: every study in `include`, minus those in `exclude`.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct QueryPlan {
    pub include: Membership,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Membership>,
    pub limit: u32,
}

impl QueryPlan {
    pub fn lookup(include: Membership, limit: u32) -> Self {
        QueryPlan {
            include,
            exclude: None,
            limit,
        }
    }

    pub fn dissociate(include: Membership, exclude: Membership, limit: u32) -> Self {
        QueryPlan {
            include,
            exclude: Some(exclude),
            limit,
        }
    }

    pub fn mode(&self) -> QueryMode {
        let dissociate = self.exclude.is_some();
        match (&self.include, dissociate) {
            (Membership::Term { .. }, false) => QueryMode::Terms,
            (Membership::Term { .. }, true) => QueryMode::DissociateTerms,
            (Membership::Title { .. }, false) => QueryMode::Titles,
            (Membership::Title { .. }, true) => QueryMode::DissociateTitles,
            (Membership::Location { .. }, false) => QueryMode::Locations,
            (Membership::Location { .. }, true) => QueryMode::DissociateLocations,
        }
    }

    /// Builds the statement returning the ordered study ids of `include \ exclude`.
    pub fn to_query(&self, columns: CoordinateColumns) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("WITH a AS (");
        self.include.push_sql(&mut qb, columns);
        qb.push(")");
        if let Some(exclude) = &self.exclude {
            qb.push(", b AS (");
            exclude.push_sql(&mut qb, columns);
            qb.push(")");
        }
        qb.push(" SELECT a.study_id FROM a");
        if self.exclude.is_some() {
            qb.push(" LEFT JOIN b USING (study_id) WHERE b.study_id IS NULL");
        }
        qb.push(" ORDER BY a.study_id LIMIT ");
        qb.push_bind(i64::from(self.limit));
        qb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(raw: &str) -> Term {
        Term::normalize(raw).unwrap()
    }

    fn point(raw: &str) -> Coordinate {
        raw.parse().unwrap()
    }

    #[test]
    fn defaults_radius_and_weight() {
        assert_eq!(
            Membership::location(point("0_0_0"), None).unwrap(),
            Membership::Location { point: point("0_0_0"), radius: DEFAULT_RADIUS }
        );
        assert_eq!(
            Membership::term(term("amygdala"), TermMatch::Exact, None).unwrap(),
            Membership::Term { term: term("amygdala"), min_weight: 0.0 }
        );
    }

    #[test]
    fn rejects_negative_radius_and_weight() {
        assert!(matches!(
            Membership::location(point("0_0_0"), Some(-1.0)),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            Membership::location(point("0_0_0"), Some(f64::NAN)),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            Membership::term(term("amygdala"), TermMatch::Exact, Some(-0.1)),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn title_match_drops_valid_weight_and_rejects_invalid_one() {
        let m = Membership::term(term("Default_Mode"), TermMatch::Title, Some(0.5)).unwrap();
        assert_eq!(m, Membership::Title { term: term("default mode") });

        for weight in [-5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Membership::term(term("Default_Mode"), TermMatch::Title, Some(weight)),
                Err(ServiceError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn limit_is_clamped_to_ceiling() {
        let limits = QueryLimits::default();
        assert_eq!(resolve_limit(None, &limits).unwrap(), 2000);
        assert_eq!(resolve_limit(Some(10), &limits).unwrap(), 10);
        assert_eq!(resolve_limit(Some(50_000), &limits).unwrap(), 2000);
        assert!(resolve_limit(Some(0), &limits).is_err());
    }

    #[test]
    fn lookup_query_has_no_anti_join() {
        let plan = QueryPlan::lookup(
            Membership::term(term("insula"), TermMatch::Exact, Some(0.001)).unwrap(),
            100,
        );
        let qb = plan.to_query(CoordinateColumns::Xyz);
        assert_eq!(
            qb.sql(),
            "WITH a AS (SELECT DISTINCT study_id::bigint AS study_id FROM annotations_terms \
             WHERE lower(term) = $1 AND weight > $2) \
             SELECT a.study_id FROM a ORDER BY a.study_id LIMIT $3"
        );
        assert_eq!(plan.mode(), QueryMode::Terms);
    }

    #[test]
    fn dissociation_query_is_left_anti_join() {
        let plan = QueryPlan::dissociate(
            Membership::location(point("0_-52_26"), Some(4.0)).unwrap(),
            Membership::location(point("-2_50_-6"), Some(6.0)).unwrap(),
            2000,
        );
        let qb = plan.to_query(CoordinateColumns::Xyz);
        let sql = qb.sql();
        assert!(sql.starts_with(
            "WITH a AS (SELECT DISTINCT study_id::bigint AS study_id FROM coordinates"
        ));
        assert!(sql.contains("power(x - $1, 2) + power(y - $2, 2) + power(z - $3, 2) <= $4"));
        assert!(sql.contains(
            ", b AS (SELECT DISTINCT study_id::bigint AS study_id FROM coordinates"
        ));
        assert!(sql.contains("power(x - $5, 2) + power(y - $6, 2) + power(z - $7, 2) <= $8"));
        assert!(sql.ends_with(
            "SELECT a.study_id FROM a LEFT JOIN b USING (study_id) WHERE b.study_id IS NULL \
             ORDER BY a.study_id LIMIT $9"
        ));
        assert_eq!(plan.mode(), QueryMode::DissociateLocations);
    }

    #[test]
    fn geom_columns_use_postgis_accessors() {
        let plan = QueryPlan::lookup(Membership::location(point("1_2_3"), None).unwrap(), 5);
        let qb = plan.to_query(CoordinateColumns::Geom);
        assert!(qb.sql().contains("power(ST_X(geom) - $1, 2) + power(ST_Y(geom) - $2, 2)"));
    }

    #[test]
    fn title_query_uses_substring_position() {
        let plan = QueryPlan::dissociate(
            Membership::term(term("memory"), TermMatch::Title, None).unwrap(),
            Membership::term(term("working_memory"), TermMatch::Title, None).unwrap(),
            10,
        );
        let qb = plan.to_query(CoordinateColumns::Xyz);
        assert!(qb.sql().contains("FROM metadata WHERE strpos(lower(title), $1) > 0"));
        assert_eq!(plan.mode(), QueryMode::DissociateTitles);
    }

    #[test]
    fn plan_echoes_parameters() {
        let plan = QueryPlan::dissociate(
            Membership::term(term("posterior_cingulate"), TermMatch::Exact, None).unwrap(),
            Membership::term(term("ventromedial_prefrontal"), TermMatch::Exact, Some(0.1)).unwrap(),
            1000,
        );
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["include"]["match"], "term");
        assert_eq!(json["include"]["term"], "posterior cingulate");
        assert_eq!(json["exclude"]["term"], "ventromedial prefrontal");
        assert_eq!(json["exclude"]["min_weight"], 0.1);
        assert_eq!(json["limit"], 1000);
    }
}
