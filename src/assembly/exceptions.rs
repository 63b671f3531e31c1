//! Exception handler regions anchored to instruction identities.
//!
//! A handler's five boundaries are instruction ids, not byte offsets: the region follows
//! its instructions through splices and transplants. `None` is the "end of body" sentinel
//! and is only semantically valid for the two *end* boundaries (an open region extending to
//! the end of the method); the sequence editor maintains exactly that invariant.

use bitflags::bitflags;

use crate::{
    assembly::instruction::InstrId,
    metadata::types::TypeReference,
};

bitflags! {
    /// Exception handler flags defining the type of exception handling clause.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HandlerKind: u16 {
        /// A typed exception clause; `catch_type` names the exception type caught.
        const EXCEPTION = 0x0000;

        /// An exception filter and handler clause.
        ///
        /// The filter code starting at `filter_start` runs first to decide whether the
        /// handler takes the exception.
        const FILTER = 0x0001;

        /// A finally clause, executed on every exit from the try region.
        const FINALLY = 0x0002;

        /// A fault clause, executed only when an exception is thrown.
        const FAULT = 0x0004;
    }
}

/// An exception handler region within a method body.
#[derive(Debug, Clone)]
pub struct ExceptionHandler {
    /// The clause type
    pub kind: HandlerKind,
    /// The exception type caught, for `EXCEPTION` clauses
    pub catch_type: Option<TypeReference>,
    /// First instruction of the protected region
    pub try_start: Option<InstrId>,
    /// End boundary of the protected region (`None` = end of body)
    pub try_end: Option<InstrId>,
    /// First instruction of the handler
    pub handler_start: Option<InstrId>,
    /// End boundary of the handler (`None` = end of body)
    pub handler_end: Option<InstrId>,
    /// First instruction of the filter, for `FILTER` clauses
    pub filter_start: Option<InstrId>,
}

impl ExceptionHandler {
    /// Create a typed exception clause over the given region
    #[must_use]
    pub fn catch(
        catch_type: Option<TypeReference>,
        try_start: InstrId,
        try_end: Option<InstrId>,
        handler_start: InstrId,
        handler_end: Option<InstrId>,
    ) -> Self {
        ExceptionHandler {
            kind: HandlerKind::EXCEPTION,
            catch_type,
            try_start: Some(try_start),
            try_end,
            handler_start: Some(handler_start),
            handler_end,
            filter_start: None,
        }
    }

    /// Create a finally clause over the given region
    #[must_use]
    pub fn finally(
        try_start: InstrId,
        try_end: Option<InstrId>,
        handler_start: InstrId,
        handler_end: Option<InstrId>,
    ) -> Self {
        ExceptionHandler {
            kind: HandlerKind::FINALLY,
            catch_type: None,
            try_start: Some(try_start),
            try_end,
            handler_start: Some(handler_start),
            handler_end,
            filter_start: None,
        }
    }

    /// Every boundary that is currently set, in declaration order
    #[must_use]
    pub fn boundaries(&self) -> Vec<InstrId> {
        [
            self.try_start,
            self.try_end,
            self.handler_start,
            self.handler_end,
            self.filter_start,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::instruction::InstrId;

    #[test]
    fn test_boundaries_collects_set_fields() {
        let a = InstrId::next();
        let b = InstrId::next();
        let handler = ExceptionHandler::finally(a, None, b, None);
        assert_eq!(handler.kind, HandlerKind::FINALLY);
        assert_eq!(handler.boundaries(), vec![a, b]);
    }

    #[test]
    fn test_catch_kind() {
        let a = InstrId::next();
        let b = InstrId::next();
        let handler = ExceptionHandler::catch(None, a, Some(b), b, None);
        assert_eq!(handler.kind, HandlerKind::EXCEPTION);
        assert!(handler.filter_start.is_none());
        assert_eq!(handler.boundaries().len(), 3);
    }
}
