use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::Serialize;

use crate::error::ServiceError;

const DELIMITER: char = '_';

/// A point in stereotactic space, given in the request path as `x_y_z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl FromStr for Coordinate {
    type Err = ServiceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = raw.split(DELIMITER).collect();
        if tokens.len() != 3 {
            return Err(ServiceError::InvalidInput(format!(
                "coordinate '{}' must have exactly three '{}'-separated values, got {}",
                raw,
                DELIMITER,
                tokens.len()
            )));
        }

        let mut values = [0f64; 3];
        for (value, token) in values.iter_mut().zip(tokens) {
            *value = parse_axis(raw, token)?;
        }
        let [x, y, z] = values;

        Ok(Coordinate { x, y, z })
    }
}

fn parse_axis(raw: &str, token: &str) -> Result<f64, ServiceError> {
    let value: f64 = token.trim().parse().map_err(|_| {
        ServiceError::InvalidInput(format!(
            "coordinate '{}' contains non-numeric value '{}'",
            raw, token
        ))
    })?;
    if !value.is_finite() {
        return Err(ServiceError::InvalidInput(format!(
            "coordinate '{}' contains non-finite value '{}'",
            raw, token
        )));
    }
    Ok(value)
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{d}{}{d}{}",
            self.x,
            self.y,
            self.z,
            d = DELIMITER
        )
    }
}
