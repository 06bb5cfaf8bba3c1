//! Component family traits.
//!
//! Components are a closed set chosen by the game: a single enum whose
//! variants are the concrete component structs. [`ComponentFamily`] exposes
//! the enum's kind discriminator so entities can key their storage by kind,
//! and [`ComponentVariant`] maps each concrete struct to and from its variant
//! for typed access. No runtime type lookup is involved.

use std::fmt::Debug;
use std::hash::Hash;

/// A closed family of component types with an explicit kind discriminator.
pub trait ComponentFamily: Sized {
    /// The discriminator. One component per kind per entity.
    type Kind: Copy + Ord + Hash + Debug;

    /// The kind of this component value.
    fn kind(&self) -> Self::Kind;
}

/// One concrete member of a [`ComponentFamily`].
///
/// Usually implemented with a small macro alongside the family enum.
pub trait ComponentVariant<C: ComponentFamily>: Sized {
    /// The kind this struct is stored under.
    fn kind() -> C::Kind;

    fn from_component(component: &C) -> Option<&Self>;

    fn from_component_mut(component: &mut C) -> Option<&mut Self>;

    /// Unwrap an owned family value, handing it back on a variant mismatch.
    fn from_owned(component: C) -> Result<Self, C>;

    fn into_component(self) -> C;
}
