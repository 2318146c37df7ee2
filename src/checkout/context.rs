use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::{Cart, Identity};

/// Allows one checkout submission at a time per context.
#[derive(Debug, Clone, Default)]
pub struct SubmissionGuard {
    in_flight: Arc<AtomicBool>,
}

impl SubmissionGuard {
    /// Returns `None` while another submission holds the permit.
    pub fn try_begin(&self) -> Option<SubmitPermit> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitPermit {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Held for the duration of a submission; released on drop, whatever the
/// outcome.
#[derive(Debug)]
pub struct SubmitPermit {
    in_flight: Arc<AtomicBool>,
}

impl Drop for SubmitPermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Everything a checkout needs to know about the customer session.
#[derive(Debug, Clone)]
pub struct OrderContext {
    pub identity: Identity,
    /// The cart as loaded when the checkout page was opened.
    pub cart: Cart,
    guard: SubmissionGuard,
}

impl OrderContext {
    pub fn new(identity: Identity, cart: Cart) -> Self {
        Self {
            identity,
            cart,
            guard: SubmissionGuard::default(),
        }
    }

    pub fn anonymous(cart: Cart) -> Self {
        Self::new(Identity::Anonymous, cart)
    }

    pub fn guard(&self) -> &SubmissionGuard {
        &self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_permit_is_refused_until_release() {
        let ctx = OrderContext::anonymous(Cart::new());
        let permit = ctx.guard().try_begin().expect("first permit");
        assert!(ctx.guard().is_submitting());
        assert!(ctx.guard().try_begin().is_none());

        drop(permit);
        assert!(!ctx.guard().is_submitting());
        assert!(ctx.guard().try_begin().is_some());
    }

    #[test]
    fn test_cloned_context_shares_the_guard() {
        let ctx = OrderContext::anonymous(Cart::new());
        let copy = ctx.clone();
        let _permit = ctx.guard().try_begin().expect("first permit");
        assert!(copy.guard().try_begin().is_none());
    }
}
