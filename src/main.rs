use clap::Parser;
use wandering_tools::cli::{handle_mix, handle_save, init_tracing, Cli, Commands};

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Save {
            images,
            mode,
            prefix,
            workflow,
            extra,
            output_dir,
            json,
        } => handle_save(cli.config, images, mode, prefix, workflow, extra, output_dir, json),
        Commands::Mix {
            main,
            secondary,
            blend,
            mode,
            seed,
            max_length,
            json,
        } => handle_mix(cli.config, main, secondary, blend, mode, seed, max_length, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
