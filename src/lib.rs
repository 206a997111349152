//! Fixed-point grid raycaster for height-field worlds.
//!
//! * [`map`] – the height-field grid and its on-disk format.
//! * [`engine`] – DDA ray caster and painter's-order resolver.
//! * [`renderer`] – software column renderer driven once per frame.
//! * [`demo`] – procedural textures and a sample level.

pub mod config;
pub mod demo;
pub mod engine;
pub mod fixed;
pub mod map;
pub mod renderer;
pub mod world;
