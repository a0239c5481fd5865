use crate::protocol::Breadcrumb;

/// A helper trait that converts a value into one or more breadcrumbs.
///
/// This is implemented for the most common forms in which breadcrumbs are
/// recorded: a single [`Breadcrumb`], an optional one, a list of them, and
/// closures returning any of those. Closures are only invoked when a client
/// is bound, so expensive breadcrumb construction is free when the SDK is
/// disabled.
pub trait IntoBreadcrumbs {
    /// The iterator type of the breadcrumbs.
    type Output: Iterator<Item = Breadcrumb>;

    /// Converts the value into an iterator of breadcrumbs.
    fn into_breadcrumbs(self) -> Self::Output;
}

impl IntoBreadcrumbs for Breadcrumb {
    type Output = std::iter::Once<Breadcrumb>;

    fn into_breadcrumbs(self) -> Self::Output {
        std::iter::once(self)
    }
}

impl IntoBreadcrumbs for Vec<Breadcrumb> {
    type Output = std::vec::IntoIter<Breadcrumb>;

    fn into_breadcrumbs(self) -> Self::Output {
        self.into_iter()
    }
}

impl IntoBreadcrumbs for Option<Breadcrumb> {
    type Output = std::option::IntoIter<Breadcrumb>;

    fn into_breadcrumbs(self) -> Self::Output {
        self.into_iter()
    }
}

impl<F: FnOnce() -> I, I: IntoBreadcrumbs> IntoBreadcrumbs for F {
    type Output = I::Output;

    fn into_breadcrumbs(self) -> Self::Output {
        self().into_breadcrumbs()
    }
}
