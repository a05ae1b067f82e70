//! Object handles passed between the strategy and the levels.

use crate::{new_object_id, ObjectId};

/// Identity of a cached object plus its payload while it is in transit.
///
/// A level that accepts an allocation takes the payload out of the handle,
/// leaving only the id behind. `free` and `retrieve` hand back a handle with
/// the payload restored under the same id.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectHandle<V> {
    id: ObjectId,
    payload: Option<V>,
}

impl<V> ObjectHandle<V> {
    /// Create a handle for a new object with a fresh id.
    pub fn new(payload: V) -> Self {
        Self {
            id: new_object_id(),
            payload: Some(payload),
        }
    }

    /// Rebuild a handle for an existing id.
    pub fn with_payload(id: ObjectId, payload: V) -> Self {
        Self {
            id,
            payload: Some(payload),
        }
    }

    /// A handle carrying only the id.
    pub fn empty(id: ObjectId) -> Self {
        Self { id, payload: None }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn payload(&self) -> Option<&V> {
        self.payload.as_ref()
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Take the payload out, leaving the handle empty.
    pub fn take_payload(&mut self) -> Option<V> {
        self.payload.take()
    }

    /// Drop the payload once a level owns its own copy.
    pub fn clear_payload(&mut self) {
        self.payload = None;
    }

    /// Consume the handle and return the payload.
    pub fn into_payload(self) -> Option<V> {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_payload_keeps_id() {
        let mut handle = ObjectHandle::new("value".to_string());
        let id = handle.id();

        assert_eq!(handle.take_payload().as_deref(), Some("value"));
        assert!(!handle.has_payload());
        assert_eq!(handle.id(), id);
        assert_eq!(handle.take_payload(), None);
    }

    #[test]
    fn test_with_payload_reuses_id() {
        let original: ObjectHandle<i32> = ObjectHandle::new(1);
        let rebuilt = ObjectHandle::with_payload(original.id(), 2);
        assert_eq!(rebuilt.id(), original.id());
        assert_eq!(rebuilt.into_payload(), Some(2));
    }

    #[test]
    fn test_empty_handle() {
        let id = new_object_id();
        let mut handle: ObjectHandle<u8> = ObjectHandle::empty(id);
        assert!(handle.payload().is_none());
        handle.clear_payload();
        assert_eq!(handle.id(), id);
    }
}
