//! Render pipelines and the GPU state shared between them.
//!
//! A frame runs two passes: [`shadow`] renders casters into the spotlight's
//! depth map, then [`basic`] shades every mesh with the spotlight from [`light`].

pub mod basic;
pub mod light;
pub mod shadow;
