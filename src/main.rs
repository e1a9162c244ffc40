use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use histeg::{partner, Concealer};

/// Demo payload size: "Hello World!" zero-padded to this many bytes.
const PAYLOAD_LEN: usize = 2000;

/// Hide a demo payload in a JPEG while preserving its coefficient histogram.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Cover JPEG, used readonly
    #[arg(value_name = "in.jpg")]
    input: PathBuf,

    /// Output JPEG carrying the embedded payload
    #[arg(value_name = "out.jpg")]
    output: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    // partner-map self-check before touching any image
    for coef in 0..=u16::MAX {
        let corr = partner(coef);
        if corr != 0 {
            if partner(corr) != coef {
                eprintln!("illegal correlation {} : {}", coef as i16, corr as i16);
                return ExitCode::from(10);
            }
        } else if !(-2..=2).contains(&(coef as i16)) && coef != 0x7fff {
            eprintln!("illegal unpaired value {}", coef as i16);
            return ExitCode::from(11);
        }
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> histeg::Result<()> {
    let cover = fs::read(&args.input)?;
    let mut concealer = Concealer::new(&cover)?;

    println!("size original = {}", concealer.current_size());
    let before = concealer.read()?;

    let mut payload = vec![0u8; PAYLOAD_LEN];
    payload[..12].copy_from_slice(b"Hello World!");
    let stego = concealer.write(&payload)?;

    println!("size changed = {}", concealer.current_size());

    let after = concealer.read()?;
    let text: String = after
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect();
    println!("read = {text}");

    let parity = |bytes: &[u8]| {
        let mut counts = [0u64; 2];
        for &b in bytes {
            counts[(b & 1) as usize] += 1;
        }
        counts
    };
    let bc = parity(&before);
    let ac = parity(&after);
    println!(
        "entropy = {{ before: {}:{}, after: {}:{} }}",
        bc[0], bc[1], ac[0], ac[1]
    );

    fs::write(&args.output, &stego)?;
    Ok(())
}
