use crate::envelope::Envelope;

/// Fan-out seam between the workflow gate and whatever delivers envelopes.
///
/// The envelope is handed over by value; the caller keeps no reference to it.
/// Delivery is best-effort and never reports failure to the caller.
pub trait Broadcast: Send + Sync {
    /// Returns how many clients the envelope was delivered to.
    fn broadcast(&self, envelope: Envelope) -> usize;
}
