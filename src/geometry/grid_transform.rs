use super::transform::{MATRIX_ELEMENTS, Transform};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of numeric tokens in a serialized grid transform: 3 dimensions + 16 matrix elements
pub const GRID_TRANSFORM_TOKENS: usize = 3 + MATRIX_ELEMENTS;

/// Errors produced while parsing the `[nx ny nz m0 .. m15]` form
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformParseError {
    #[error("Expected 19 numeric values, found {0}")]
    WrongTokenCount(usize),

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Grid dimension {0} is not a non-negative integer")]
    InvalidDimension(f64),
}

/// Grid dimensions plus the transform that maps grid indices into world space.
///
/// The string form is the persistence format used by state files:
/// `[nx ny nz m0 m1 ... m15]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridTransform {
    nx: usize,
    ny: usize,
    nz: usize,
    transform: Transform,
}

impl GridTransform {
    /// Grid of the given size with an identity transform
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self::with_transform(nx, ny, nz, Transform::identity())
    }

    pub fn with_transform(nx: usize, ny: usize, nz: usize, transform: Transform) -> Self {
        Self {
            nx,
            ny,
            nz,
            transform,
        }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn nz(&self) -> usize {
        self.nz
    }

    pub fn set_nx(&mut self, nx: usize) {
        self.nx = nx;
    }

    pub fn set_ny(&mut self, ny: usize) {
        self.ny = ny;
    }

    pub fn set_nz(&mut self, nz: usize) {
        self.nz = nz;
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Parse `input` into `self`.
    ///
    /// On failure `self` is left exactly as it was.
    pub fn import_from_string(&mut self, input: &str) -> Result<(), TransformParseError> {
        *self = input.parse()?;
        Ok(())
    }
}

impl Default for GridTransform {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

impl fmt::Display for GridTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {} {}]", self.nx, self.ny, self.nz, self.transform)
    }
}

fn dimension(value: f64) -> Result<usize, TransformParseError> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value < usize::MAX as f64 {
        Ok(value as usize)
    } else {
        Err(TransformParseError::InvalidDimension(value))
    }
}

impl FromStr for GridTransform {
    type Err = TransformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Brackets only delimit; nested forms like `[4 4 4 [1 0 ...]]` parse the same way
        let values = s
            .split(|c: char| c.is_whitespace() || c == '[' || c == ']')
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| TransformParseError::InvalidNumber(token.to_string()))
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if values.len() != GRID_TRANSFORM_TOKENS {
            return Err(TransformParseError::WrongTokenCount(values.len()));
        }

        let mut mat = [0.0; MATRIX_ELEMENTS];
        mat.copy_from_slice(&values[3..]);

        Ok(Self {
            nx: dimension(values[0])?,
            ny: dimension(values[1])?,
            nz: dimension(values[2])?,
            transform: Transform::from_array(mat),
        })
    }
}
