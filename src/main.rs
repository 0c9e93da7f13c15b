use std::fs::File;
use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use memmap2::Mmap;
use tracing_subscriber::EnvFilter;

use swdloader::{Error, Phase, Session, RAM_BASE};

/// Load and start firmware on an RP2040 over bit-banged SWD.
#[derive(Parser, Debug)]
#[command(name = "swdloader", version, about)]
struct Args {
    /// SWDIO pin (BCM numbering)
    #[arg(short = 'd', long, default_value_t = 24)]
    dio: u32,

    /// SWCLK pin (BCM numbering)
    #[arg(short = 'c', long, default_value_t = 25)]
    clk: u32,

    /// Reset pin; 0 disables the hardware reset pulse
    #[arg(short = 'r', long, default_value_t = 23)]
    reset: u32,

    /// SWCLK rate in kHz
    #[arg(short = 'f', long, default_value_t = 1000)]
    khz: u32,

    /// gpiochip device path (only used by the gpio-cdev backend)
    #[cfg(feature = "backend-cdev")]
    #[arg(long, default_value = "/dev/gpiochip0")]
    chip: String,

    /// Raw firmware image; length must be a non-zero multiple of 4
    image_file: std::path::PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("swdloader: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> swdloader::Result<()> {
    let args = Args::parse();

    if !is_root::is_root() {
        return Err(Error::Invariant("swdloader needs root"));
    }

    let file = File::open(&args.image_file).map_err(Error::Io)?;
    let mmap = unsafe { Mmap::map(&file).map_err(Error::Io)? };
    let image: &[u8] = &mmap;

    if image.is_empty() || image.len() % 4 != 0 {
        return Err(Error::Invariant("Image size must be a non-zero multiple of 4"));
    }

    println!(
        "Image size {} bytes (0x{:08x}-0x{:08x})",
        image.len(),
        RAM_BASE,
        RAM_BASE + image.len() as u32
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted!");
        handler_flag.store(true, Ordering::SeqCst);
    })
    .expect("failed to install interrupt handler");

    let mut session = open_session(&args)?;
    println!("SWD dio=GPIO{}, clk=GPIO{}", args.dio, args.clk);

    let report = session.run_load(
        image,
        RAM_BASE,
        0,
        Some(&cancel),
        |addr| {
            print!("\rLoading @ 0x{:08x}", addr);
            let _ = std::io::stdout().flush();
        },
        |phase| match phase {
            Phase::Quiescing => println!("Disabling XIP and USB"),
            Phase::Starting => println!("\nStarting"),
        },
    )?;

    println!(
        "\n{} bytes loaded in {:.2} seconds ({:.1} KBytes/s)",
        report.bytes,
        report.seconds,
        report.kib_per_sec()
    );

    Ok(())
}

#[cfg(feature = "backend-cdev")]
fn open_session(args: &Args) -> swdloader::Result<Session<swdloader::backend::cdev::CdevPin>> {
    use swdloader::backend::cdev::CdevPin;
    let clk = CdevPin::open(&args.chip, args.clk)?;
    let dio = CdevPin::open(&args.chip, args.dio)?;
    let reset = if args.reset != 0 { Some(CdevPin::open(&args.chip, args.reset)?) } else { None };
    Session::new(clk, dio, reset, args.khz)
}

#[cfg(all(feature = "backend-rppal", not(feature = "backend-cdev")))]
fn open_session(args: &Args) -> swdloader::Result<Session<swdloader::backend::rppal_backend::RppalPin>> {
    use swdloader::backend::rppal_backend::RppalPin;
    let clk = RppalPin::open(args.clk as u8)?;
    let dio = RppalPin::open(args.dio as u8)?;
    let reset = if args.reset != 0 { Some(RppalPin::open(args.reset as u8)?) } else { None };
    Session::new(clk, dio, reset, args.khz)
}
