//! Policy Filter - prune password dictionaries to a complexity policy
//!
//! Main entry point for the command-line application.

use clap::Parser;
use std::path::PathBuf;
use std::process;

use policy_filter::cli::Args;
use policy_filter::merge::{collect_inputs, MergeOptions, Merger};
use policy_filter::output::resolve_output_path;
use policy_filter::pipeline::{FilterPipeline, PipelineOptions};
use policy_filter::progress::{
    format_duration, format_number, print_banner, print_bullet, print_error, print_header,
    print_info, print_success, print_warning,
};

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    if args.verbose {
        std::env::set_var("RUST_LOG", "debug");
    } else if !args.quiet {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    // Configure thread pool
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .ok();
    }

    if let Err(e) = run(args) {
        print_error(&format!("{}", e));

        for cause in e.chain().skip(1) {
            print_error(&format!("  Caused by: {}", cause));
        }

        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if !args.quiet {
        print_banner();
    }

    let policy = args.build_policy()?;

    if !args.quiet {
        print_header("Policy");
        for rule in policy.describe() {
            print_bullet(&rule);
        }
    }

    if let Some(ref path) = args.save_policy {
        policy.save(path)?;
        if !args.quiet {
            print_success(&format!("Policy saved to {:?}", path));
        }
    }

    if args.merge_all && args.merge_name == args.output_name {
        anyhow::bail!("--merge-name and --output-name must differ");
    }

    // Inputs are checked first: resolving the output may delete an old file
    let merge_inputs = if args.merge_all {
        Some((find_dictionaries(&args)?, args.parse_buffer_size()?))
    } else {
        if !args.input.is_file() {
            anyhow::bail!(
                "Input is not a file: {:?} (use --merge-all to merge a directory)",
                args.input
            );
        }
        None
    };

    let output_path = resolve_output_path(&args.output, &args.output_name, args.overwrite)?;

    let input = match merge_inputs {
        Some((inputs, buffer_size)) => merge_dictionaries(&args, &inputs, buffer_size)?,
        None => args.input.clone(),
    };

    if !args.quiet {
        print_header("Filtering...");
    }

    let options = PipelineOptions {
        batch_size: args.batch_size,
        quiet: args.quiet,
    };
    let stats = FilterPipeline::new(policy, options)?.run(&input, &output_path)?;

    if !args.quiet {
        stats.print_summary(&output_path);
        if stats.valid_lines == 0 {
            print_warning("No password satisfied the policy; no output file was written");
        }
    }

    Ok(())
}

/// List the dictionaries under the input directory, skipping the merge file
fn find_dictionaries(args: &Args) -> anyhow::Result<Vec<PathBuf>> {
    let merge_path = args.output.join(&args.merge_name);
    let inputs = collect_inputs(
        &args.input,
        &args.get_extensions(),
        args.recursive,
        Some(&merge_path),
    )?;

    if inputs.is_empty() {
        anyhow::bail!("No dictionaries found in {:?}", args.input);
    }

    Ok(inputs)
}

/// Merge `inputs` into the merge file and return its path
fn merge_dictionaries(args: &Args, inputs: &[PathBuf], buffer_size: usize) -> anyhow::Result<PathBuf> {
    if !args.quiet {
        print_header("Merging dictionaries and removing duplicates...");
        for path in inputs {
            print_bullet(&format!("{:?}", path));
        }
    }

    let merger = Merger::new(MergeOptions {
        output_path: args.output.join(&args.merge_name),
        strategy: args.strategy,
        buffer_size,
        sort: args.sort,
        quiet: args.quiet,
        ..MergeOptions::default()
    });
    let report = merger.merge(inputs)?;

    if !args.quiet {
        if report.files_failed > 0 {
            print_warning(&format!(
                "{} of {} dictionaries could not be read",
                report.files_failed,
                inputs.len()
            ));
        }
        print_info(&format!(
            "{} lines read, {} unique, in {}",
            format_number(report.lines_read),
            format_number(report.unique_lines),
            format_duration(report.elapsed)
        ));
        print_success(&format!("Merged dictionary: {:?}", report.path));
    }

    Ok(report.path)
}
