//! Repository traits and implementations.

pub mod game;
pub mod quote;
pub mod video;

pub use game::{GameRepo, PgGameRepo, StatusCounts};
pub use quote::{PgQuoteRepo, QuoteRepo};
pub use video::{PgVideoRepo, VideoRepo};
