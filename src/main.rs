use clap::Parser;
use heat_pathways::output::FileOutput;
use heat_pathways::{
    default_scenarios, ingest_config, read_properties, read_scenarios, read_spatial_inputs,
    run_scenarios, ModelConfig,
};
use std::ffi::OsStr;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Default, Debug)]
#[clap(author, version, about, long_about = None)]
struct PathwaysArgs {
    #[arg(help = "Path to property data in .csv format")]
    properties_file: String,
    #[arg(
        long,
        short,
        help = "Path to model configuration in .json format (built-in defaults when omitted)"
    )]
    config: Option<String>,
    #[arg(
        long,
        short,
        help = "Path to heat network and zone geometry in .json format"
    )]
    spatial: Option<String>,
    #[arg(
        long,
        short = 'n',
        help = "Path to scenario definitions in .json format (built-in scenarios when omitted)"
    )]
    scenarios: Option<String>,
    #[clap(long, default_value_t = false, help = "Whether to log out spans")]
    log_spans: bool,
}

fn main() -> anyhow::Result<()> {
    let args = PathwaysArgs::parse();

    // set up basic tracing
    let tracing_subscriber = {
        let mut builder = tracing_subscriber::fmt::fmt().with_max_level(tracing::Level::INFO);

        if args.log_spans {
            builder = builder.with_span_events(FmtSpan::CLOSE);
        }

        builder.finish()
    };
    tracing::subscriber::set_global_default(tracing_subscriber)?;

    let properties_file = args.properties_file.as_str();
    let properties_file_ext = Path::new(properties_file)
        .extension()
        .and_then(OsStr::to_str);
    let properties_file_stem = match properties_file_ext {
        Some(ext) => &properties_file[..(properties_file.len() - ext.len() - 1)],
        None => properties_file,
    };
    let properties_file_stem = PathBuf::from(properties_file_stem);

    let output_path = PathBuf::from(format!("{}__results", properties_file_stem.display()));
    fs::create_dir_all(&output_path)?;
    let properties_file_name = properties_file_stem
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("properties");
    let file_output = FileOutput::new(
        output_path,
        format!("{properties_file_name}__{{}}.{{}}"),
    );

    let config = match args.config {
        Some(ref file) => ingest_config(BufReader::new(File::open(file)?))?,
        None => ModelConfig::default(),
    };
    let scenarios = match args.scenarios {
        Some(ref file) => read_scenarios(BufReader::new(File::open(file)?))?,
        None => default_scenarios(),
    };
    let spatial = args
        .spatial
        .as_ref()
        .map(|file| anyhow::Ok(read_spatial_inputs(BufReader::new(File::open(file)?))?))
        .transpose()?;
    let mut properties = read_properties(BufReader::new(File::open(properties_file)?))?;

    let results = run_scenarios(
        &mut properties,
        spatial.as_ref(),
        &scenarios,
        Arc::new(config),
        &file_output,
    )?;

    debug!(
        "Classification: {}",
        serde_json::to_string_pretty(&results.classification)?
    );

    Ok(())
}
