//! Converts the output of a VISSIM traffic simulation to geographic data: link geometry from the
//! network file, and vehicle and aggregate records with absolute timestamps and WGS84 positions.

#[macro_use]
extern crate log;

pub mod aggregate;
mod error;
mod export;
pub mod network;
mod records;
mod table;
pub mod trajectory;
mod transform;

pub use aggregate::AggregateConfig;
pub use error::{Error, Result, RowDecodeFailure};
pub use network::{Link, Network, Vertex};
pub use table::{Row, SpatialColumns, Table, DATETIME_COLUMN, DATETIME_FORMAT};
pub use trajectory::TrajectoryConfig;
pub use transform::{GeoPoint, PiConvention, ReferenceFrame, Transformer, PI_LONG, PI_SHORT};
