//! Invocation engine.
//!
//! # Request states
//! ```text
//! Matched → Decoding → Invoked → Serialized
//!                   ↘          ↘ HandlerErrored
//!                    DecodeErrored ↘ EncodeErrored
//! ```
//!
//! Arguments are assembled from the plan: path-bound indices read their
//! matched segment, the body-bound index reads the raw payload. After the
//! call, a non-nil error slot wins over any body value.

use crate::error::{ErrorKind, RequestError};
use crate::routing::handler::{ArgInput, DecodeError, Slot};
use crate::routing::route::{ArgSource, Route};
use crate::routing::trie::PathParams;

impl Route {
    /// Run the handler for one request.
    ///
    /// Returns the JSON payload, empty when there is nothing to send back.
    pub fn invoke(&self, params: &PathParams<'_>, body: &[u8]) -> Result<Vec<u8>, RequestError> {
        let plan = self.plan();

        let inputs = (0..plan.arity())
            .map(|index| match plan.source(index) {
                ArgSource::Body => Ok(ArgInput::Body(body)),
                ArgSource::Path => params
                    .get(index)
                    .map(ArgInput::Path)
                    .ok_or(DecodeError::Missing(index)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RequestError::new(ErrorKind::DecodeError, e))?;

        let mut slots = self
            .handler()
            .invoke(&inputs)
            .map_err(|e| RequestError::new(ErrorKind::DecodeError, e))?;

        if let Some(index) = plan.output_error {
            if let Some(Slot::Error(Some(err))) = take(&mut slots, index) {
                return Err(RequestError::new(ErrorKind::HandlerError, err));
            }
        }

        match plan.output_body.and_then(|index| take(&mut slots, index)) {
            Some(Slot::Body { empty: false, encode }) => {
                encode().map_err(|e| RequestError::new(ErrorKind::EncodeError, e))
            }
            _ => Ok(Vec::new()),
        }
    }
}

fn take(slots: &mut [Slot], index: usize) -> Option<Slot> {
    slots
        .get_mut(index)
        .map(|slot| std::mem::replace(slot, Slot::Error(None)))
}
