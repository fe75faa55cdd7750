//! Authoritative spatial index of item rectangles.
//!
//! A [`Grid`] owns its items outright. The overlap search clones the grid at
//! every branch point, so two live branches never share mutable state; a
//! clone is a deep copy of the item list and the id index.

use boardgrid_core::{GridItem, GridLayout, GridRect, ItemId, LayoutError};
use rustc_hash::FxHashMap;

/// Mutable spatial index over a validated layout.
///
/// Construction enforces the committed-grid invariants (bounds, positive
/// sizes, no two items on the same cell). Mutation primitives keep the
/// derived row count current but deliberately allow transient overlaps:
/// resolving them is the caller's job.
#[derive(Debug, Clone)]
pub struct Grid<D = ()> {
    items: Vec<GridItem<D>>,
    index: FxHashMap<ItemId, usize>,
    columns: i32,
    rows: i32,
}

impl<D: Clone> Grid<D> {
    /// Build a grid from a layout, validating every committed-grid invariant.
    pub fn new(layout: GridLayout<D>) -> Result<Self, LayoutError> {
        let GridLayout { items, columns } = layout;
        if columns < 1 {
            return Err(LayoutError::InvalidGrid {
                reason: format!("column count {columns} must be at least 1"),
            });
        }
        let mut index = FxHashMap::default();
        for (i, item) in items.iter().enumerate() {
            validate_size(item.width, item.height)
                .map_err(|_| LayoutError::InvalidGrid {
                    reason: format!(
                        "item `{}` has non-positive size {}x{}",
                        item.id, item.width, item.height
                    ),
                })?;
            validate_bounds(item.x, item.y, item.width, columns).map_err(|_| {
                LayoutError::InvalidGrid {
                    reason: format!(
                        "item `{}` at ({}, {}) with width {} exceeds {} columns",
                        item.id, item.x, item.y, item.width, columns
                    ),
                }
            })?;
            if index.insert(item.id.clone(), i).is_some() {
                return Err(LayoutError::InvalidGrid {
                    reason: format!("duplicate item id `{}`", item.id),
                });
            }
        }
        for (i, a) in items.iter().enumerate() {
            for b in &items[i + 1..] {
                if a.rect().intersects(&b.rect()) {
                    return Err(LayoutError::InvalidGrid {
                        reason: format!("items `{}` and `{}` overlap", a.id, b.id),
                    });
                }
            }
        }
        let mut grid = Self {
            items,
            index,
            columns,
            rows: 0,
        };
        grid.recompute_rows();
        Ok(grid)
    }

    /// Column bound.
    #[inline]
    pub fn columns(&self) -> i32 {
        self.columns
    }

    /// Derived grid height.
    #[inline]
    pub fn rows(&self) -> i32 {
        self.rows
    }

    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the grid holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The items in insertion order.
    #[inline]
    pub fn items(&self) -> &[GridItem<D>] {
        &self.items
    }

    /// Whether an item with this id exists.
    #[inline]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.index.contains_key(id)
    }

    /// Look up an item by id.
    pub fn item(&self, id: &ItemId) -> Result<&GridItem<D>, LayoutError> {
        self.index
            .get(id)
            .map(|&i| &self.items[i])
            .ok_or_else(|| LayoutError::ItemNotFound { id: id.clone() })
    }

    /// Ids of items whose footprint intersects `rect`, excluding `exclude`.
    ///
    /// Insertion order, so results are deterministic.
    pub fn overlapping(&self, rect: GridRect, exclude: &ItemId) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| &item.id != exclude && item.rect().intersects(&rect))
            .map(|item| item.id.clone())
            .collect()
    }

    /// Ids of items currently intersecting `id`'s own footprint.
    pub fn overlaps_of(&self, id: &ItemId) -> Result<Vec<ItemId>, LayoutError> {
        let rect = self.item(id)?.rect();
        Ok(self.overlapping(rect, id))
    }

    /// Relocate an item's top-left corner in place.
    pub fn move_to(&mut self, id: &ItemId, x: i32, y: i32) -> Result<(), LayoutError> {
        let item = self.item_mut(id)?;
        item.x = x;
        item.y = y;
        self.recompute_rows();
        Ok(())
    }

    /// Change an item's size in place, anchored at its top-left corner.
    pub fn resize(&mut self, id: &ItemId, width: i32, height: i32) -> Result<(), LayoutError> {
        let item = self.item_mut(id)?;
        item.width = width;
        item.height = height;
        self.recompute_rows();
        Ok(())
    }

    /// Add an item, validating bounds and size but *not* overlaps: an insert
    /// may create overlaps that the caller resolves afterwards.
    pub fn insert(&mut self, item: GridItem<D>) -> Result<(), LayoutError> {
        validate_size(item.width, item.height)?;
        validate_bounds(item.x, item.y, item.width, self.columns)?;
        if self.index.contains_key(&item.id) {
            return Err(LayoutError::InvalidGrid {
                reason: format!("duplicate item id `{}`", item.id),
            });
        }
        self.index.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        self.recompute_rows();
        Ok(())
    }

    /// Delete an item, returning it.
    pub fn remove(&mut self, id: &ItemId) -> Result<GridItem<D>, LayoutError> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| LayoutError::ItemNotFound { id: id.clone() })?;
        let removed = self.items.remove(i);
        self.index.clear();
        for (i, item) in self.items.iter().enumerate() {
            self.index.insert(item.id.clone(), i);
        }
        self.recompute_rows();
        Ok(removed)
    }

    /// Export the current state as an inert layout.
    pub fn to_layout(&self) -> GridLayout<D> {
        GridLayout::new(self.items.clone(), self.columns)
    }

    fn item_mut(&mut self, id: &ItemId) -> Result<&mut GridItem<D>, LayoutError> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| LayoutError::ItemNotFound { id: id.clone() })?;
        Ok(&mut self.items[i])
    }

    fn recompute_rows(&mut self) {
        self.rows = self
            .items
            .iter()
            .map(|item| item.y + item.height)
            .max()
            .unwrap_or(0);
    }
}

fn validate_size(width: i32, height: i32) -> Result<(), LayoutError> {
    if width < 1 || height < 1 {
        return Err(LayoutError::InvalidSize { width, height });
    }
    Ok(())
}

fn validate_bounds(x: i32, y: i32, width: i32, columns: i32) -> Result<(), LayoutError> {
    if x < 0 || y < 0 || x + width > columns {
        return Err(LayoutError::OutOfBounds { x, y, columns });
    }
    Ok(())
}
