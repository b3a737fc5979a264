//! Time stacks of gridded fields.

use crate::{date_pair::DatePair, StackError};
use chrono::NaiveDateTime;
use ndarray::{Array3, ArrayView3};
use std::collections::BTreeMap;

/// A gridded quantity carried by a [`Stack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Vx,
    Vy,
    V,
    Ex,
    Ey,
    E,
    DeltaH,
}

impl Field {
    /// Fields produced by velocity assembly.
    pub const VELOCITY: [Field; 6] = [
        Field::Vx,
        Field::Vy,
        Field::V,
        Field::Ex,
        Field::Ey,
        Field::E,
    ];

    /// Short variable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Vx => "VX",
            Self::Vy => "VY",
            Self::V => "V",
            Self::Ex => "EX",
            Self::Ey => "EY",
            Self::E => "E",
            Self::DeltaH => "delta_h",
        }
    }

    pub fn long_name(self) -> &'static str {
        match self {
            Self::Vx => "x component of ice velocity",
            Self::Vy => "y component of ice velocity",
            Self::V => "ice velocity magnitude",
            Self::Ex => "error in x component of ice velocity",
            Self::Ey => "error in y component of ice velocity",
            Self::E => "ice velocity error magnitude",
            Self::DeltaH => "height change relative to the reference surface",
        }
    }

    pub fn units(self) -> &'static str {
        match self {
            Self::DeltaH => "meters",
            _ => "meters/year",
        }
    }
}

/// When a slice was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceTime {
    /// Averaged over an acquisition period.
    Period(DatePair),

    /// Observed at a single instant.
    Instant(NaiveDateTime),
}

impl SliceTime {
    /// Sort key of the slice.
    pub fn start(&self) -> NaiveDateTime {
        match self {
            Self::Period(pair) => pair.start_time(),
            Self::Instant(time) => *time,
        }
    }

    pub fn end(&self) -> NaiveDateTime {
        match self {
            Self::Period(pair) => pair.end_time(),
            Self::Instant(time) => *time,
        }
    }

    /// Human readable slice label.
    pub fn label(&self) -> String {
        match self {
            Self::Period(pair) => pair.to_string(),
            Self::Instant(time) => time.format("%Y%m%dT%H%M%S").to_string(),
        }
    }
}

/// Fields sharing one grid and one sequence of slice times.
///
/// Every field is indexed `[time, y, x]` with shape
/// `(times.len(), y.len(), x.len())`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    pub(crate) x: Vec<f64>,
    pub(crate) y: Vec<f64>,
    pub(crate) times: Vec<SliceTime>,
    pub(crate) fields: BTreeMap<Field, Array3<f32>>,
}

impl Stack {
    pub fn new(
        x: Vec<f64>,
        y: Vec<f64>,
        times: Vec<SliceTime>,
        fields: BTreeMap<Field, Array3<f32>>,
    ) -> Result<Self, StackError> {
        let expected = [times.len(), y.len(), x.len()];
        for (field, samples) in &fields {
            if samples.shape() != expected.as_slice() {
                return Err(StackError::Shape {
                    what: format!("field {}", field.name()),
                    expected: expected.to_vec(),
                    found: samples.shape().to_vec(),
                });
            }
        }
        Ok(Self {
            x,
            y,
            times,
            fields,
        })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn times(&self) -> &[SliceTime] {
        &self.times
    }

    /// Number of time slices.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn field(&self, field: Field) -> Option<ArrayView3<'_, f32>> {
        self.fields.get(&field).map(Array3::view)
    }

    /// Iterates over the stack's fields in [`Field`] order.
    pub fn fields(&self) -> impl Iterator<Item = (Field, ArrayView3<'_, f32>)> {
        self.fields
            .iter()
            .map(|(field, samples)| (*field, samples.view()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Field, SliceTime, Stack};
    use crate::StackError;
    use chrono::NaiveDate;
    use ndarray::Array3;
    use std::collections::BTreeMap;

    #[test]
    fn test_stack_shape_invariant() {
        let times = vec![
            SliceTime::Period("20150101-20150131".parse().unwrap()),
            SliceTime::Period("20150201-20150228".parse().unwrap()),
        ];
        let fields = BTreeMap::from([
            (Field::Vx, Array3::zeros((2, 3, 4))),
            (Field::V, Array3::zeros((2, 3, 4))),
        ]);
        let stack = Stack::new(vec![0.0; 4], vec![0.0; 3], times.clone(), fields).unwrap();
        assert_eq!(stack.len(), 2);
        assert!(stack.field(Field::Vx).is_some());
        assert!(stack.field(Field::Ey).is_none());
        let order: Vec<Field> = stack.fields().map(|(field, _)| field).collect();
        assert_eq!(order, [Field::Vx, Field::V]);

        let fields = BTreeMap::from([(Field::Vx, Array3::zeros((2, 4, 3)))]);
        assert!(matches!(
            Stack::new(vec![0.0; 4], vec![0.0; 3], times, fields),
            Err(StackError::Shape { found, .. }) if found == [2, 4, 3]
        ));
    }

    #[test]
    fn test_slice_time() {
        let period = SliceTime::Period("20150101-20150131".parse().unwrap());
        assert_eq!(period.label(), "20150101-20150131");
        assert_eq!(period.end().date(), NaiveDate::from_ymd_opt(2015, 1, 31).unwrap());

        let instant = NaiveDate::from_ymd_opt(2019, 3, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let slice = SliceTime::Instant(instant);
        assert_eq!(slice.start(), slice.end());
        assert_eq!(slice.label(), "20190331T120000");
    }
}
