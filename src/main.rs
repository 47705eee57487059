use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use wk_ec::workload::{self, Op};
use wk_ec::{EcError, EcResult, EncoderConfig, RangeEncoder, VERSION};

#[derive(Debug, Serialize)]
struct StreamStats {
    seed: u64,
    symbols: usize,
    bytes: usize,
    bits_per_symbol: f64,
    overhead_percent: f64,
    encode_ms: f64,
    decode_ms: f64,
    verified: bool,
}

#[derive(Debug, Serialize)]
struct BenchSummary {
    streams: Vec<StreamStats>,
    total_symbols: usize,
    total_bytes: usize,
    wall_ms: f64,
    symbols_per_sec: f64,
}

fn main() -> EcResult<()> {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "golden" => {
            golden()?;
        }
        "bench" | "benchmark" => {
            let json = args.iter().any(|a| a == "--json");
            let mut positional = args[2..].iter().filter(|a| !a.starts_with("--"));
            let symbols = parse_count(positional.next(), 100_000);
            let streams = parse_count(positional.next(), 8);
            bench(symbols, streams, json)?;
        }
        _ => {
            eprintln!("{} Unknown command: {}", "Error:".red().bold(), command);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn parse_count(arg: Option<&String>, default: usize) -> usize {
    match arg {
        None => default,
        Some(s) => match s.parse() {
            Ok(n) if n > 0 => n,
            _ => {
                eprintln!("{} Invalid count: {}", "Error:".red().bold(), s);
                std::process::exit(1);
            }
        },
    }
}

fn golden() -> EcResult<()> {
    let mut enc = RangeEncoder::new();
    enc.encode_bool(true, 16384)?;
    let tell = enc.tell();
    let bytes = enc.finalize()?;

    println!(
        "{} encode_bool(true, 16384) then finalize",
        "Golden:".cyan().bold()
    );
    let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
    println!("{} {}", "Bytes:".dimmed(), hex.join(" ").green());
    println!("{} {}", "Tell:".dimmed(), tell.to_string().magenta());
    Ok(())
}

fn run_stream(seed: u64, symbols: usize) -> EcResult<StreamStats> {
    let ops: Vec<Op> = workload::generate(seed, symbols);

    let start = Instant::now();
    let stream = workload::encode(&ops, EncoderConfig::default().measure_overhead(true))?;
    let encode_time = start.elapsed();

    let start = Instant::now();
    let mismatch = workload::first_mismatch(&stream.bytes, &ops)?;
    let decode_time = start.elapsed();

    if let Some(index) = mismatch {
        log::error!("stream {} diverged at operation {}", seed, index);
    }

    let overhead_percent = stream
        .overhead
        .as_ref()
        .map_or(0.0, |report| report.overhead_percent);

    Ok(StreamStats {
        seed,
        symbols,
        bytes: stream.bytes.len(),
        bits_per_symbol: (stream.bytes.len() * 8) as f64 / symbols as f64,
        overhead_percent,
        encode_ms: encode_time.as_secs_f64() * 1000.0,
        decode_ms: decode_time.as_secs_f64() * 1000.0,
        verified: mismatch.is_none(),
    })
}

fn bench(symbols: usize, streams: usize, json: bool) -> EcResult<()> {
    let start = Instant::now();
    let results: Vec<StreamStats> = (0..streams as u64)
        .into_par_iter()
        .map(|seed| run_stream(seed, symbols))
        .collect::<EcResult<_>>()?;
    let wall = start.elapsed();

    let total_symbols = symbols * streams;
    let total_bytes = results.iter().map(|r| r.bytes).sum::<usize>();
    let summary = BenchSummary {
        total_symbols,
        total_bytes,
        wall_ms: wall.as_secs_f64() * 1000.0,
        symbols_per_sec: total_symbols as f64 / wall.as_secs_f64().max(1e-9),
        streams: results,
    };

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                std::process::exit(1);
            }
        }
    } else {
        print_summary(&summary);
    }

    if summary.streams.iter().all(|s| s.verified) {
        Ok(())
    } else {
        Err(EcError::InvalidInput(
            "decoded stream differs from its input".into(),
        ))
    }
}

fn print_summary(summary: &BenchSummary) {
    println!();
    println!("{}", "═══ WK Range Coder Benchmark ═══".cyan().bold());
    println!(
        "{} {} streams x {} symbols",
        "Input:".dimmed(),
        summary.streams.len().to_string().yellow(),
        (summary.total_symbols / summary.streams.len().max(1))
            .to_string()
            .yellow()
    );
    println!();

    println!(
        "{:>6} {:>10} {:>8} {:>10} {:>10} {:>10} {:>6}",
        "Seed".white().bold(),
        "Bytes".white().bold(),
        "Bits/sym".white().bold(),
        "Overhead".white().bold(),
        "Encode".white().bold(),
        "Decode".white().bold(),
        "OK".white().bold()
    );
    println!("{}", "─".repeat(68).dimmed());

    for s in &summary.streams {
        let ok = if s.verified { "yes".green() } else { "NO".red().bold() };
        println!(
            "{:>6} {:>10} {:>8} {:>9}% {:>8}ms {:>8}ms {:>6}",
            s.seed.to_string().cyan(),
            s.bytes.to_string().white(),
            format!("{:.3}", s.bits_per_symbol).magenta(),
            format!("{:.3}", s.overhead_percent).magenta(),
            format!("{:.2}", s.encode_ms).dimmed(),
            format!("{:.2}", s.decode_ms).dimmed(),
            ok
        );
    }

    println!();
    println!(
        "{} {} bytes in {:.2}ms ({:.1} Msym/s)",
        "Total:".dimmed(),
        summary.total_bytes.to_string().green(),
        summary.wall_ms,
        summary.symbols_per_sec / 1e6
    );
    println!("{}", "✓ Benchmark complete!".green().bold());
}

fn print_usage() {
    println!();
    println!(
        "{} {}",
        "WK Range Coder".cyan().bold(),
        format!("v{}", VERSION).green()
    );
    println!();
    println!("{}", "USAGE:".yellow().bold());
    println!("  {} {}", "wkec".white(), "golden".green());
    println!(
        "  {} {} [symbols] [streams] [--json]",
        "wkec".white(),
        "bench".green()
    );
    println!();
    println!("{}", "OPTIONS:".yellow().bold());
    println!("  {} 100000 symbols, 8 streams", "Defaults:".dimmed());
    println!("  {} set RUST_LOG=debug for coder tracing", "Logging:".dimmed());
    println!();
    println!("{}", "EXAMPLES:".yellow().bold());
    println!("  {}", "wkec golden".cyan());
    println!("  {} 50000 16 --json", "wkec bench".cyan());
    println!();
}
