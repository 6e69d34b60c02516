//! sitekit - build pipeline for a static blog
//!
//! This library provides functionality to:
//! - Minify the site's script and compile its stylesheet
//! - Run the site generator and minify the generated HTML
//! - Serve the output with live reload while watching sources
//! - Publish the generated site into a sibling repository

pub mod build;
pub mod cli;
pub mod config;
pub mod serve;
pub mod tasks;
pub mod tool;
pub mod watch;
