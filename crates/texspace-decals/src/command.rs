/// At most one pending request; a newer submit replaces an unconsumed one.
#[derive(Debug)]
pub struct ApplySlot<T> {
    pending: Option<T>,
}

impl<T> Default for ApplySlot<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> ApplySlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `request`, returning the one it displaced, if any.
    pub fn submit(&mut self, request: T) -> Option<T> {
        self.pending.replace(request)
    }

    /// Consumes the pending request.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_submit_wins() {
        let mut slot = ApplySlot::new();
        assert!(slot.submit(1).is_none());
        assert_eq!(slot.submit(2), Some(1));
        assert_eq!(slot.take(), Some(2));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn take_is_single_shot() {
        let mut slot = ApplySlot::new();
        slot.submit("stamp");
        assert!(slot.is_pending());
        assert_eq!(slot.peek(), Some(&"stamp"));
        slot.take();
        assert!(!slot.is_pending());
    }
}
