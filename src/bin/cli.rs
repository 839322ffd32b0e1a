use clap::Parser;
use colored::Colorize;
use symdiff::prelude::*;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "symdiff")]
#[command(about = "Differentiate a single-variable expression and optimize its derivative series")]
#[command(version)]
struct Args {
    /// Mathematical expression of one variable, e.g. "sin(x^2) * ln(x)"
    expression: String,

    /// Highest derivative order
    #[arg(short = 'n', long, default_value_t = 2)]
    order: usize,

    /// Print the series as differentiated, without optimization
    #[arg(long)]
    no_optimize: bool,

    /// Evaluate every derivative at this point (repeatable)
    #[arg(long = "eval", value_name = "X", allow_negative_numbers = true)]
    eval: Vec<f64>,

    /// Integrate every derivative over [A, B]
    #[arg(long, num_args = 2, value_names = ["A", "B"], allow_negative_numbers = true)]
    integrate: Option<Vec<f64>>,

    /// Number of subintervals used by --integrate
    #[arg(long, value_name = "N", default_value_t = 1000)]
    intervals: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red(), e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let raw = FunctionGraph::parse(&args.expression, args.order)?;
    let graph = if args.no_optimize {
        raw.clone()
    } else {
        raw.optimize()?
    };

    println!("{}", graph);
    println!(
        "{}: {} before, {} after optimization",
        "Nodes".cyan(),
        raw.node_count(),
        graph.node_count()
    );

    for &x in &args.eval {
        let values = graph.evaluate(x);
        println!("{} {}", "At".cyan(), x);
        for (k, value) in values.iter().enumerate() {
            println!("  f{k}({x}) = {value}");
        }
    }

    if let Some(&[a, b]) = args.integrate.as_deref() {
        let n = args.intervals;
        println!("{} over [{a}, {b}], {n} subintervals", "Integral".cyan());
        for (k, node) in graph.derivatives().iter().enumerate() {
            println!("  f{k}: {}", node.integrate(a, b, n)?);
        }
    }

    Ok(())
}
