use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::vault::SaveMode;

#[derive(Parser, Debug)]
#[command(name = "wandering-tools")]
#[command(version, about = "Save images with their workflow and blend prompts")]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save PNG images to the vault, optionally with workflow metadata
    Save {
        /// Input PNG files, saved as one batch
        #[arg(required = true, value_name = "IMAGE")]
        images: Vec<PathBuf>,

        /// Save mode (image_only, image_with_metadata, thumbnail_with_metadata, json_with_workflow)
        #[arg(long, short = 'm', default_value = "image_only")]
        mode: SaveMode,

        /// Filename prefix
        #[arg(long, short = 'p', default_value = "")]
        prefix: String,

        /// Workflow description JSON (primary channel)
        #[arg(long, value_name = "FILE")]
        workflow: Option<PathBuf>,

        /// Extra metadata JSON carrying a "workflow" key (auxiliary channel)
        #[arg(long, value_name = "FILE")]
        extra: Option<PathBuf>,

        /// Output root directory
        #[arg(long, env = "WANDERING_OUTPUT_DIR", value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Output the save report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Blend two prompts into one
    Mix {
        /// Main prompt
        #[arg(long)]
        main: String,

        /// Secondary prompt
        #[arg(long, default_value = "")]
        secondary: String,

        /// Percentage of the secondary prompt to blend in (0-100)
        #[arg(long, allow_negative_numbers = true)]
        blend: Option<i64>,

        /// Blend mode (append, interpolate, shuffle, replace, random_insert)
        #[arg(long)]
        mode: Option<String>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum output length in characters
        #[arg(long)]
        max_length: Option<usize>,

        /// Output the result as JSON
        #[arg(long)]
        json: bool,
    },
}
