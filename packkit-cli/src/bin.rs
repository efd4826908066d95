//! Small demonstration binary for the packkit codec suite: round-trips a
//! list of numbers (or, for `bitmap`, a list of 16-bit set members) through
//! one of the array codecs and reports the encoded size. Not meant as the
//! only consumer of the library — just an illustration.

use clap::{Parser, Subcommand};
use packkit_codec::{bitmap::RoaringBitmap, bp128, float, for_codec, rle};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Frame-of-reference round trip over a list of unsigned integers.
    For { values: Vec<u64> },
    /// Run-length-encoded round trip over a list of unsigned integers.
    Rle { values: Vec<u64> },
    /// BP128 plain (non-delta) round trip over a list of unsigned integers.
    Bp128 { values: Vec<u64> },
    /// Roaring-style bitmap round trip over a list of 16-bit set members.
    Bitmap { values: Vec<u16> },
    /// Float codec round trip at a given precision (full/high/medium/low).
    Float {
        #[arg(long, default_value = "full")]
        precision: String,
        values: Vec<f64>,
    },
}

fn parse_precision(s: &str) -> float::Precision {
    match s {
        "full" => float::Precision::Full,
        "high" => float::Precision::High,
        "medium" => float::Precision::Medium,
        "low" => float::Precision::Low,
        other => panic!("unknown precision {other:?}; expected full/high/medium/low"),
    }
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    match args.command {
        Command::For { values } => {
            let mut dst = Vec::new();
            let written = for_codec::encode(&mut dst, &values);
            let (decoded, _) = for_codec::decode(&dst);
            info!(input = values.len(), bytes = written, "frame-of-reference round trip");
            assert_eq!(decoded, values);
            println!("{written} bytes for {} values", values.len());
        }
        Command::Rle { values } => {
            let a = rle::analyse(&values);
            let mut dst = Vec::new();
            let written = rle::encode_no_header(&mut dst, &values);
            let (decoded, _) = rle::decode_no_header(&dst);
            info!(runs = a.runs, bytes = written, "run-length round trip");
            assert_eq!(decoded, values);
            println!("{} runs, {written} bytes for {} values", a.runs, values.len());
        }
        Command::Bp128 { values } => {
            let mut dst = Vec::new();
            let written = bp128::encode_array(&mut dst, &values, 64);
            let (decoded, _) = bp128::decode_array(&dst, values.len());
            info!(input = values.len(), bytes = written, "bp128 round trip");
            assert_eq!(decoded, values);
            println!("{written} bytes for {} values", values.len());
        }
        Command::Bitmap { values } => {
            let mut bm = RoaringBitmap::new();
            for v in values {
                bm.add(v);
            }
            let mut dst = Vec::new();
            let written = bm.encode(&mut dst);
            info!(cardinality = bm.cardinality(), bytes = written, "bitmap round trip");
            println!("cardinality {}, {written} bytes", bm.cardinality());
        }
        Command::Float { precision, values } => {
            let precision = parse_precision(&precision);
            let mut dst = Vec::new();
            let written = float::encode(&mut dst, &values, precision, float::Mode::Independent);
            let (decoded, _) = float::decode(&dst);
            info!(input = values.len(), bytes = written, precision = ?precision, "float round trip");
            println!("{written} bytes for {} values at {precision:?}", values.len());
            for (orig, got) in values.iter().zip(&decoded) {
                println!("  {orig} -> {got}");
            }
        }
    }
}
