use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of elements in a 4x4 homogeneous matrix
pub const MATRIX_ELEMENTS: usize = 16;

/// Homogeneous 4x4 transform stored row-major.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    mat: [f64; MATRIX_ELEMENTS],
}

impl Transform {
    /// Identity transform
    pub fn identity() -> Self {
        let mut mat = [0.0; MATRIX_ELEMENTS];
        mat[0] = 1.0;
        mat[5] = 1.0;
        mat[10] = 1.0;
        mat[15] = 1.0;
        Self { mat }
    }

    pub fn from_array(mat: [f64; MATRIX_ELEMENTS]) -> Self {
        Self { mat }
    }

    /// Overwrite all sixteen elements
    pub fn set(&mut self, values: &[f64; MATRIX_ELEMENTS]) {
        self.mat = *values;
    }

    pub fn as_array(&self) -> &[f64; MATRIX_ELEMENTS] {
        &self.mat
    }

    /// Element at `row`, `col`; `None` outside the 4x4 matrix
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < 4 && col < 4 {
            Some(self.mat[row * 4 + col])
        } else {
            None
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for Transform {
    /// Space separated elements without brackets
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.mat.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = Transform::identity();
        assert_eq!(t.get(0, 0), Some(1.0));
        assert_eq!(t.get(3, 3), Some(1.0));
        assert_eq!(t.get(0, 3), Some(0.0));
        assert!(t.is_identity());
        assert_eq!(Transform::default(), t);
    }

    #[test]
    fn test_get_outside_matrix() {
        let t = Transform::identity();
        assert_eq!(t.get(4, 0), None);
        assert_eq!(t.get(0, 4), None);
        assert_eq!(t.get(1, 1), Some(1.0));
    }

    #[test]
    fn test_display_is_space_separated() {
        let t = Transform::identity();
        assert_eq!(t.to_string(), "1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1");
    }
}
