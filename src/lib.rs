//! `gamelights` drives network LED controllers from the state of a game shown on screen.
//!
//! # Structure
//!
//! Every tick, the [dispatcher] samples two pixels through a [grabber], feeds them to
//! the [generator] state machine, and sends the resulting color to all peers of the
//! [transport]. Colors are quantized to 8 bits only when they leave the process.
//!
//! # License
//!
//! This source code is released under the [MIT-License](https://opensource.org/licenses/MIT)

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate tracing;

pub mod cli;
pub mod color;
pub mod discovery;
pub mod dispatcher;
pub mod generator;
pub mod grabber;
pub mod methods;
pub mod models;
pub mod transport;
pub mod tween;
