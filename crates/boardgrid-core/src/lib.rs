#![forbid(unsafe_code)]

//! Core types for the boardgrid layout engine.
//!
//! This crate holds the geometric primitives ([`Position`], [`Direction`],
//! [`GridRect`]), the item model ([`ItemId`], [`GridItem`], [`GridLayout`]),
//! and the error taxonomy ([`LayoutError`]) shared by the engine crate.
//! It contains no layout logic of its own.

pub mod error;
pub mod geometry;
pub mod item;

pub use error::LayoutError;
pub use geometry::{Direction, GridRect, Position};
pub use item::{GridItem, GridLayout, ItemId};
