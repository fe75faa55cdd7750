//! The item and layout model exchanged with callers.
//!
//! A [`GridLayout`] is the inert description a caller hands to the engine and
//! receives back: a list of [`GridItem`]s plus a column bound. The payload
//! parameter `D` travels with each item but is never inspected by the engine,
//! which reasons about geometry only.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::{GridRect, Position};

/// Opaque identifier for a grid item.
///
/// Cheap to clone; the engine copies ids freely while branching.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Arc<str>);

impl ItemId {
    /// The id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(Arc::from(value.as_str()))
    }
}

/// An item placed on the grid.
///
/// Invariants (enforced when a grid is constructed): `width >= 1`,
/// `height >= 1`, `x >= 0`, `y >= 0`, `x + width <= columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridItem<D = ()> {
    pub id: ItemId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Caller payload, opaque to the engine.
    pub data: D,
}

impl GridItem<()> {
    /// Create an item with no payload.
    pub fn new(id: impl Into<ItemId>, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::with_data(id, x, y, width, height, ())
    }
}

impl<D> GridItem<D> {
    /// Create an item carrying a payload.
    pub fn with_data(
        id: impl Into<ItemId>,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        data: D,
    ) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            data,
        }
    }

    /// The item's footprint.
    #[inline]
    pub fn rect(&self) -> GridRect {
        GridRect::new(self.x, self.y, self.width, self.height)
    }

    /// The item's top-left corner.
    #[inline]
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// An ordered collection of items plus the column bound.
///
/// The row count is derived from item extents rather than stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout<D = ()> {
    pub items: Vec<GridItem<D>>,
    pub columns: i32,
}

impl<D> GridLayout<D> {
    /// Create a layout from items and a column bound.
    pub fn new(items: Vec<GridItem<D>>, columns: i32) -> Self {
        Self { items, columns }
    }

    /// Derived grid height: the lowest occupied row plus one, or zero when
    /// the layout is empty.
    #[must_use]
    pub fn rows(&self) -> i32 {
        self.items
            .iter()
            .map(|item| item.y + item.height)
            .max()
            .unwrap_or(0)
    }

    /// Look up an item by id.
    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&GridItem<D>> {
        self.items.iter().find(|item| &item.id == id)
    }
}
