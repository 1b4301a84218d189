pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod index;
pub mod output;
pub mod pokeapi;
pub mod render;
pub mod tui;
