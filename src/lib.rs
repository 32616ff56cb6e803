#![doc = "Area-weighted reallocation of municipal district statistics"]
mod error;
mod geometry;
mod realloc;
mod table;

pub mod atlas;
pub mod cli;
pub mod commands;
pub mod election;
pub mod fetch;
pub mod svg;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use geometry::{DistrictPolygon, PolygonSet, ShapeDoc, ShapeFeature};

#[doc(inline)]
pub use realloc::{reallocate, reallocate_with_stats, ReallocOptions, ReallocStats};

#[doc(inline)]
pub use table::AttrTable;
