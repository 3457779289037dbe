//! # image-grouper CLI
//!
//! Command-line interface for the image grouper.
//!
//! ## Usage
//! ```bash
//! image-grouper group ~/Photos ~/Grouped --threshold 10
//! image-grouper group ~/Catalog ~/Grouped --strategy embedding --model vit-b-16
//! image-grouper distances ~/Photos --algorithm difference
//! image-grouper models
//! ```

mod cli;

use image_grouper::Result;

fn main() -> Result<()> {
    cli::run()
}
