//! Harvested sample type.

use crate::source::EntropySource;

/// Largest payload a single event carries. Longer payloads are truncated.
pub const MAX_EVENT_PAYLOAD: usize = 64;

/// One raw sample delivered by a harvesting call site.
///
/// Borrowed for the duration of [`process_event`](crate::EntropyState::process_event)
/// and never retained.
#[derive(Clone, Copy)]
pub struct HarvestedEvent<'a> {
    source: EntropySource,
    payload: &'a [u8],
    counter: u64,
    destination: u32,
}

impl<'a> HarvestedEvent<'a> {
    /// Creates an event, truncating `payload` to [`MAX_EVENT_PAYLOAD`].
    ///
    /// `counter` is a per-event timestamp or sequence value; `destination`
    /// is the round-robin hint.
    pub fn new(source: EntropySource, payload: &'a [u8], counter: u64, destination: u32) -> Self {
        let len = payload.len().min(MAX_EVENT_PAYLOAD);
        Self {
            source,
            payload: &payload[..len],
            counter,
            destination,
        }
    }

    /// Source that produced this sample.
    #[inline]
    pub fn source(&self) -> EntropySource {
        self.source
    }

    /// Sample bytes.
    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Per-event counter value.
    #[inline]
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Counter as absorbed into pools.
    #[inline]
    pub fn counter_bytes(&self) -> [u8; 8] {
        self.counter.to_le_bytes()
    }

    /// Round-robin destination hint.
    #[inline]
    pub fn destination(&self) -> u32 {
        self.destination
    }

    /// Returns the number of payload bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl std::fmt::Debug for HarvestedEvent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarvestedEvent")
            .field("source", &self.source)
            .field("bytes", &self.payload.len())
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_truncated() {
        let data = [0xAB; 100];
        let event = HarvestedEvent::new(EntropySource::Rdrand, &data, 7, 3);
        assert_eq!(event.len(), MAX_EVENT_PAYLOAD);
        assert_eq!(event.counter_bytes(), 7u64.to_le_bytes());
    }

    #[test]
    fn test_empty_payload() {
        let event = HarvestedEvent::new(EntropySource::Mouse, &[], 1, 0);
        assert!(event.is_empty());
    }

    #[test]
    fn test_debug_hides_payload() {
        let event = HarvestedEvent::new(EntropySource::Keyboard, b"secret", 1, 0);
        let rendered = format!("{:?}", event);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("bytes: 6"));
    }
}
