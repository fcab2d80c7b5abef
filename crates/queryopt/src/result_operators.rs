//! Result operators and their capability groups.
//!
//! Result operators apply left-to-right to a model's projected sequence
//! (`.Count()`, `.Take(5)`, `.Distinct()`, ...). The optimizer never looks at
//! individual operators beyond their *capability group*:
//!
//! - **choice** operators reduce the sequence to zero or one element and may
//!   depend on element order for *which* element is returned;
//! - **value-from-sequence** operators (a superset of choice) produce a
//!   value rather than a sequence;
//! - **windowing** operators keep a position-dependent slice;
//! - the **type filter** narrows element type, never count or order — it is
//!   the only operator safe to carry through a subquery flatten.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::expressions::{Expression, TypeRef};

/// A single result operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOperator {
    /// First element of the sequence.
    First,
    /// The only element; more than one is an execution-time error.
    Single,
    /// Whether the sequence is non-empty.
    Any,
    /// Number of elements.
    Count,
    /// Sum over the projected values.
    Sum,
    /// Average over the projected values.
    Average,
    /// Minimum projected value.
    Min,
    /// Maximum projected value.
    Max,
    /// Distinct projected values.
    Distinct,
    /// Whether the sequence contains the given item.
    Contains(Expression),
    /// Whether every element satisfies the given predicate.
    All(Expression),
    /// At most the first `n` elements.
    Take(Expression),
    /// All elements after the first `n`.
    Skip(Expression),
    /// Elements assignable to the given type.
    OfType(TypeRef),
}

impl ResultOperator {
    /// First/Single/Any: reduce to zero or one element, and order may
    /// determine which element that is.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            ResultOperator::First | ResultOperator::Single | ResultOperator::Any
        )
    }

    /// Operators producing a value from the sequence rather than another
    /// sequence. Includes every choice operator.
    pub fn is_value_from_sequence(&self) -> bool {
        self.is_choice()
            || matches!(
                self,
                ResultOperator::Count
                    | ResultOperator::Sum
                    | ResultOperator::Average
                    | ResultOperator::Min
                    | ResultOperator::Max
                    | ResultOperator::Distinct
                    | ResultOperator::Contains(_)
                    | ResultOperator::All(_)
            )
    }

    /// Take/Skip: keep a position-dependent window of the sequence.
    pub fn is_windowing(&self) -> bool {
        matches!(self, ResultOperator::Take(_) | ResultOperator::Skip(_))
    }

    /// OfType: narrows element type, never element count or order.
    pub fn is_type_filter(&self) -> bool {
        matches!(self, ResultOperator::OfType(_))
    }

    /// Apply `f` to any expression this operator carries.
    pub fn transform_expressions<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(Expression) -> Result<Expression>,
    {
        match self {
            ResultOperator::Contains(e)
            | ResultOperator::All(e)
            | ResultOperator::Take(e)
            | ResultOperator::Skip(e) => {
                let taken = std::mem::replace(e, Expression::null());
                *e = f(taken)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Read-only companion of [`transform_expressions`](Self::transform_expressions).
    pub fn visit_expressions(&self, f: &mut dyn FnMut(&Expression)) {
        match self {
            ResultOperator::Contains(e)
            | ResultOperator::All(e)
            | ResultOperator::Take(e)
            | ResultOperator::Skip(e) => f(e),
            _ => {}
        }
    }
}

impl fmt::Display for ResultOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultOperator::First => "First",
            ResultOperator::Single => "Single",
            ResultOperator::Any => "Any",
            ResultOperator::Count => "Count",
            ResultOperator::Sum => "Sum",
            ResultOperator::Average => "Average",
            ResultOperator::Min => "Min",
            ResultOperator::Max => "Max",
            ResultOperator::Distinct => "Distinct",
            ResultOperator::Contains(_) => "Contains",
            ResultOperator::All(_) => "All",
            ResultOperator::Take(_) => "Take",
            ResultOperator::Skip(_) => "Skip",
            ResultOperator::OfType(_) => "OfType",
        };
        write!(f, "{}", name)
    }
}
