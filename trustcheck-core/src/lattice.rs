//! Qualifier hierarchy for trust annotations
//!
//! The hierarchy is flat: a qualifier is only a subtype of itself, and any
//! two distinct qualifiers join and meet at the root `@Trust(level = 0)`.
//! This relation is what general assignability uses. Call sites are checked
//! with the numeric relation in [`crate::verifier::meets_requirement`]
//! instead, which never consults this module.
//!
//! ```text
//!              @Trust(level = 0)
//!     ┌───────────┬───┴────────┬──────────────┐
//! @Trust(1)  @TrustType(2)  @TrustReq(3)  ...
//! ```

use crate::qual::TrustQualifier;

/// The three lattice operations a type-checking framework needs to relate
/// two qualified types.
///
/// Every operation is total over qualifier values.
pub trait QualifierHierarchy {
    /// Root qualifier, also the default for unannotated elements
    fn top(&self) -> TrustQualifier;

    fn is_subtype(&self, sub: &TrustQualifier, sup: &TrustQualifier) -> bool;

    fn least_upper_bound(&self, a: &TrustQualifier, b: &TrustQualifier) -> TrustQualifier;

    fn greatest_lower_bound(&self, a: &TrustQualifier, b: &TrustQualifier) -> TrustQualifier;

    /// Assignment compatibility of two possibly-unannotated types.
    /// Missing qualifiers default to [`top`](Self::top).
    fn is_assignable(
        &self,
        value: Option<&TrustQualifier>,
        target: Option<&TrustQualifier>,
    ) -> bool {
        let top = self.top();
        self.is_subtype(value.unwrap_or(&top), target.unwrap_or(&top))
    }
}

/// Flat identity lattice rooted at `@Trust(level = 0)`
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustHierarchy;

impl QualifierHierarchy for TrustHierarchy {
    fn top(&self) -> TrustQualifier {
        TrustQualifier::root()
    }

    fn is_subtype(&self, sub: &TrustQualifier, sup: &TrustQualifier) -> bool {
        sub == sup
    }

    fn least_upper_bound(&self, a: &TrustQualifier, b: &TrustQualifier) -> TrustQualifier {
        if a == b {
            *a
        } else {
            self.top()
        }
    }

    fn greatest_lower_bound(&self, a: &TrustQualifier, b: &TrustQualifier) -> TrustQualifier {
        if a == b {
            *a
        } else {
            self.top()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qual::{QualifierKind, TrustLevel};

    fn sample() -> Vec<TrustQualifier> {
        let mut values = Vec::new();
        for kind in QualifierKind::ALL {
            for level in [0 as TrustLevel, 1, 2, 3, 10] {
                values.push(TrustQualifier::new(kind, level));
            }
        }
        values
    }

    #[test]
    fn test_subtype_is_identity() {
        let lattice = TrustHierarchy;
        for a in sample() {
            for b in sample() {
                assert_eq!(lattice.is_subtype(&a, &b), a == b, "{a} <: {b}");
            }
        }
    }

    #[test]
    fn test_higher_level_is_not_a_subtype() {
        // Numeric order plays no part in the hierarchy
        let lattice = TrustHierarchy;
        assert!(!lattice.is_subtype(&TrustQualifier::trust(3), &TrustQualifier::trust(2)));
        assert!(!lattice.is_subtype(&TrustQualifier::trust(2), &TrustQualifier::trust(3)));
    }

    #[test]
    fn test_lub_and_glb_are_commutative_and_collapse_to_root() {
        let lattice = TrustHierarchy;
        for a in sample() {
            for b in sample() {
                let lub = lattice.least_upper_bound(&a, &b);
                let glb = lattice.greatest_lower_bound(&a, &b);

                assert_eq!(lub, lattice.least_upper_bound(&b, &a));
                assert_eq!(glb, lattice.greatest_lower_bound(&b, &a));

                let expected = if a == b { a } else { TrustQualifier::root() };
                assert_eq!(lub, expected);
                assert_eq!(glb, expected);
            }
        }
    }

    #[test]
    fn test_unannotated_assigns_only_to_root() {
        let lattice = TrustHierarchy;
        let two = TrustQualifier::trust(2);

        assert!(lattice.is_assignable(None, None));
        assert!(lattice.is_assignable(None, Some(&TrustQualifier::root())));
        assert!(!lattice.is_assignable(None, Some(&two)));
        assert!(lattice.is_assignable(Some(&two), Some(&two)));
        assert!(!lattice.is_assignable(Some(&two), None));
    }
}
