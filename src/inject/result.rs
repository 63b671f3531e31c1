//! Result of an injection: the requested mapping plus the dependency closure.

use crate::metadata::member::MemberDef;

/// Outcome of a successful `inject` call.
///
/// `injected` lists every (source, target) pair that was transplanted as a dependency of
/// the request; the requested definition itself is carried in `source`/`mapped` and
/// excluded from the list. The pairs let callers verify closure completeness or
/// post-process everything that was copied.
#[derive(Debug)]
pub struct InjectResult<T> {
    /// The definition the caller asked to inject
    pub source: T,
    /// The equivalent definition created in (or resolved from) the target module
    pub mapped: T,
    /// All dependencies transitively injected by this call, as (source, target) pairs
    pub injected: Vec<(MemberDef, MemberDef)>,
}

impl<T> InjectResult<T> {
    /// Look up the target a dependency was mapped to
    #[must_use]
    pub fn find_mapped(&self, source: &MemberDef) -> Option<&MemberDef> {
        self.injected
            .iter()
            .find(|(from, _)| from.same_as(source))
            .map(|(_, to)| to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::types::TypeDef;

    #[test]
    fn test_find_mapped() {
        let dep_source = MemberDef::Type(TypeDef::new("N", "Dep", 0));
        let dep_target = MemberDef::Type(TypeDef::new("N", "Dep", 0));
        let result = InjectResult {
            source: (),
            mapped: (),
            injected: vec![(dep_source.clone(), dep_target.clone())],
        };

        assert!(result.find_mapped(&dep_source).unwrap().same_as(&dep_target));
        let other = MemberDef::Type(TypeDef::new("N", "Other", 0));
        assert!(result.find_mapped(&other).is_none());
    }
}
