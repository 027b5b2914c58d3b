//! Type-keyed dispatch of completed messages.

use std::collections::HashMap;
use std::sync::Arc;

use canlink_protocol::{BusMessage, ACK_TYPE_TAG, TYPE_TAG_MASK};

use crate::error::RegistryError;

pub(crate) type Handler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Maps payload type tags to decode-and-invoke handlers.
///
/// Registration replaces any previous handler for the tag. Dispatching an
/// unregistered tag is not an error: on a shared bus, most nodes care about
/// a subset of message kinds and ignore the rest.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: HashMap<u8, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        HandlerRegistry::default()
    }

    /// Bind `M`'s type tag to `handler`.
    ///
    /// The stored closure drops payloads shorter than `M::ENCODED_LEN` or
    /// failing to decode, without invoking `handler`.
    pub fn register<M, F>(&mut self, handler: F) -> Result<(), RegistryError>
    where
        M: BusMessage,
        F: Fn(M) + Send + Sync + 'static,
    {
        let tag = M::TYPE_TAG & TYPE_TAG_MASK;
        if tag == ACK_TYPE_TAG {
            return Err(RegistryError::ReservedTypeTag(tag));
        }
        let decode_and_invoke = move |data: &[u8]| {
            if data.len() < M::ENCODED_LEN {
                log::debug!(
                    "payload for tag {} too short: {} < {}",
                    tag,
                    data.len(),
                    M::ENCODED_LEN
                );
                return;
            }
            match M::decode(data) {
                Ok(message) => handler(message),
                Err(err) => log::debug!("undecodable payload for tag {}: {}", tag, err),
            }
        };
        self.handlers.insert(tag, Arc::new(decode_and_invoke));
        Ok(())
    }

    /// Look up the handler for `tag`, if any.
    pub fn handler(&self, tag: u8) -> Option<Handler> {
        self.handlers.get(&tag).cloned()
    }
}
