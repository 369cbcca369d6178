use clustermap::render::{ClusterMap, HeadlessError, RetainedScene, SvgRenderOptions};
use clustermap::{ClusterMapConfig, ClusterMapData};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    ClusterMap(HeadlessError),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::ClusterMap(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<HeadlessError> for CliError {
    fn from(value: HeadlessError) -> Self {
        Self::ClusterMap(value)
    }
}

impl From<clustermap::Error> for CliError {
    fn from(value: clustermap::Error) -> Self {
        Self::ClusterMap(value.into())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Render,
    Groups,
    Links,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    config: Option<String>,
    overrides: Vec<(String, Value)>,
    pretty: bool,
    diagram_id: Option<String>,
    out: Option<String>,
}

#[derive(Serialize)]
struct LinkOut<'a> {
    uid: &'a str,
    query: &'a str,
    target: &'a str,
    identity: f64,
    opacity: f64,
}

fn usage() -> &'static str {
    "clustermap-cli\n\
\n\
USAGE:\n\
  clustermap-cli [render] [OPTIONS] [--id <diagram-id>] [--out <path>] [<path>|-]\n\
  clustermap-cli groups [OPTIONS] [--pretty] [<path>|-]\n\
  clustermap-cli links [OPTIONS] [--pretty] [<path>|-]\n\
\n\
OPTIONS:\n\
  --config <path>          JSON file deep merged over the default config\n\
  --set <key>=<value>      set one option by dotted path, e.g. --set link.threshold=0.3\n\
  --scale-factor <px>      pixels per kilobase (plot.scaleFactor)\n\
  --best-only              keep only the best link per gene and cluster pair\n\
  --threshold <identity>   hide links with identity at or below this value\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - render prints SVG to stdout by default; use --out to write a file.\n\
  - groups and links print JSON; links lists the links that would be drawn.\n\
  - Set RUST_LOG=debug to trace scene updates on stderr.\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

/// `key=value`; the value is read as JSON when it parses, as a plain string otherwise.
fn parse_override(raw: &str) -> Result<(String, Value), CliError> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(CliError::Usage(usage()));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::Usage(usage()));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "render" => args.command = Command::Render,
            "groups" => args.command = Command::Groups,
            "links" => args.command = Command::Links,
            "--pretty" => args.pretty = true,
            "--best-only" => args
                .overrides
                .push(("link.bestOnly".to_string(), Value::Bool(true))),
            "--config" => args.config = Some(next_value(&mut it)?.clone()),
            "--set" => args.overrides.push(parse_override(next_value(&mut it)?)?),
            "--scale-factor" => {
                let raw = next_value(&mut it)?;
                let px = raw.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
                if !(px.is_finite() && px > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.overrides
                    .push(("plot.scaleFactor".to_string(), Value::from(px)));
            }
            "--threshold" => {
                let raw = next_value(&mut it)?;
                let threshold = raw.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(CliError::Usage(usage()));
                }
                args.overrides
                    .push(("link.threshold".to_string(), Value::from(threshold)));
            }
            "--id" => args.diagram_id = Some(next_value(&mut it)?.clone()),
            "--out" => args.out = Some(next_value(&mut it)?.clone()),
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn build_config(args: &Args) -> Result<ClusterMapConfig, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let value: Value = serde_json::from_str(&text)?;
            ClusterMapConfig::from_value(&value)?
        }
        None => ClusterMapConfig::default(),
    };
    for (key, value) in &args.overrides {
        config.set_value(key, value.clone())?;
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), CliError> {
    let config = build_config(&args)?;
    let text = read_input(args.input.as_deref())?;
    let data = ClusterMapData::from_json(&text)?;
    let map: ClusterMap<RetainedScene> = clustermap::render::load_headless(data, config)?;
    tracing::debug!(
        clusters = map.diagram().cluster_count(),
        genes = map.diagram().gene_count(),
        links = map.diagram().links().len(),
        "loaded diagram"
    );

    match args.command {
        Command::Render => {
            let options = SvgRenderOptions {
                diagram_id: args
                    .diagram_id
                    .as_deref()
                    .map(clustermap::render::sanitize_svg_id),
                ..Default::default()
            };
            write_text(&map.to_svg_with(&options), args.out.as_deref())
        }
        Command::Groups => write_json(&map.state().groups, args.pretty),
        Command::Links => {
            let state = map.state();
            let links: Vec<LinkOut<'_>> = state
                .visible_links()
                .into_iter()
                .map(|link| LinkOut {
                    uid: &link.uid,
                    query: &link.query,
                    target: &link.target,
                    identity: link.identity,
                    opacity: state.link_opacity(link),
                })
                .collect();
            write_json(&links, args.pretty)
        }
    }
}

fn main() {
    env_logger::init();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
