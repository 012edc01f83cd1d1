use tower::Service;

/// Takes the ready service out of `src`, leaving a fresh clone behind.
///
/// A clone of a service is not guaranteed to be ready, so the one that was
/// polled is the one that must be called.
pub fn replace_ready_service<S, T>(src: &mut S) -> S
where
    S: Service<T> + Clone,
{
    let clone = src.clone();
    std::mem::replace(src, clone)
}
