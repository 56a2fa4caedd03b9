//! Display side of the pipeline: the bounded styled log, its single-mutator
//! consumer, and the terminal shell that renders it.

pub mod consumer;
pub mod display;
pub mod fence;
pub mod scroll;
pub mod terminal;
pub mod tui;
pub mod view;
