/// Trait for objects that refer to backend resources which may be released.
///
/// Once an object reports `false` it never becomes valid again.
pub trait Validity {
    /// Returns true while the backing resources are still live.
    fn is_valid(&self) -> bool;
}
