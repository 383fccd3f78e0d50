//! Graph label resolution.
//!
//! An explicit, non-empty `Vertex::label()` is used verbatim. Otherwise the
//! label is the type's declared name: the last path segment of
//! `std::any::type_name`, with generic arguments stripped. The same rule is
//! applied on the write and read paths.

use crate::types::Vertex;

/// The graph label for vertex type `T`.
pub fn label_for<T: Vertex>() -> String {
    let explicit = T::label();
    if explicit.is_empty() {
        type_name_of::<T>().to_string()
    } else {
        explicit.to_string()
    }
}

/// The declared name of `T`, without module path or generic arguments.
pub fn type_name_of<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
