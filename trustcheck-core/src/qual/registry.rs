//! Registry of the qualifier kinds active for one checker run

use super::{ElementTarget, QualifierKind, TrustQualifier};
use std::collections::BTreeSet;

/// The qualifier kinds the checker recognizes.
///
/// Qualifiers of an inactive kind are treated as absent everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifierRegistry {
    kinds: BTreeSet<QualifierKind>,
}

impl QualifierRegistry {
    pub fn new(kinds: impl IntoIterator<Item = QualifierKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Registry with every qualifier kind active
    pub fn all() -> Self {
        Self::new(QualifierKind::ALL)
    }

    pub fn is_active(&self, kind: QualifierKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Whether a qualifier of `kind` may be read at `target`
    pub fn permits(&self, kind: QualifierKind, target: ElementTarget) -> bool {
        self.is_active(kind) && kind.permits(target)
    }

    /// Filter a qualifier through the registry
    pub fn admit(&self, qualifier: Option<TrustQualifier>) -> Option<TrustQualifier> {
        qualifier.filter(|q| self.is_active(q.kind()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = QualifierKind> + '_ {
        self.kinds.iter().copied()
    }

    /// The root qualifier of the hierarchy
    pub fn top(&self) -> TrustQualifier {
        TrustQualifier::root()
    }
}

impl Default for QualifierRegistry {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_every_kind() {
        let registry = QualifierRegistry::default();
        let kinds: Vec<_> = registry.kinds().collect();
        assert_eq!(kinds, QualifierKind::ALL.to_vec());
    }

    #[test]
    fn test_inactive_kind_is_not_admitted() {
        let registry = QualifierRegistry::new([QualifierKind::Trust]);

        assert_eq!(
            registry.admit(Some(TrustQualifier::trust(2))),
            Some(TrustQualifier::trust(2))
        );
        assert_eq!(registry.admit(Some(TrustQualifier::requirement(2))), None);
        assert_eq!(registry.admit(None), None);
    }

    #[test]
    fn test_permits_requires_active_and_legal_target() {
        let registry = QualifierRegistry::new([QualifierKind::Trust, QualifierKind::TrustType]);

        assert!(registry.permits(QualifierKind::Trust, ElementTarget::TypeUse));
        assert!(!registry.permits(QualifierKind::TrustType, ElementTarget::Method));
        assert!(!registry.permits(QualifierKind::TrustRequirement, ElementTarget::Method));
    }
}
