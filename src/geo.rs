use serde::{Deserialize, Serialize};

/// Axis-aligned pixel box of a detected component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub column_min: i32,
    pub column_max: i32,
    pub row_min: i32,
    pub row_max: i32,
}

impl Rect {
    pub fn new(column_min: i32, row_min: i32, column_max: i32, row_max: i32) -> Self {
        Self {
            column_min,
            column_max,
            row_min,
            row_max,
        }
    }

    pub fn width(&self) -> i32 {
        self.column_max - self.column_min
    }

    pub fn height(&self) -> i32 {
        self.row_max - self.row_min
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width()) * i64::from(self.height())
    }

    /// Center as (column, row).
    pub fn center(&self) -> (f64, f64) {
        (self.center_column(), self.center_row())
    }

    pub fn center_column(&self) -> f64 {
        f64::from(self.column_min + self.column_max) / 2.0
    }

    pub fn center_row(&self) -> f64 {
        f64::from(self.row_min + self.row_max) / 2.0
    }
}
