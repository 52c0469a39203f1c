extern crate clap;
extern crate env_logger;
extern crate failure;
extern crate image;
#[macro_use]
extern crate log;
extern crate mandelbrot;
extern crate num;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::ColorType;
use log::LevelFilter;
use mandelbrot::device;
use mandelbrot::{
    DeviceRenderer, ImageBuffer, IterationCap, LaunchConfig, ParallelRenderer, Renderer,
    SequentialRenderer, Viewport,
};
use num::{clamp, Complex};
use std::fs::File;
use std::str::FromStr;
use std::time::Instant;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_positive_pair(s: &str, err: &str) -> Result<(), String> {
    match parse_pair::<usize>(s, 'x') {
        Some((a, b)) if a > 0 && b > 0 => Ok(()),
        _ => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const ITERATIONS: &str = "iterations";
const BACKEND: &str = "backend";
const THREADS: &str = "threads";
const GRID: &str = "grid";
const BLOCK: &str = "block";
const DEVICE: &str = "device";
const NORMALIZE: &str = "normalize";
const VERBOSE: &str = "verbose";

fn args<'a>(max_threads: usize, default_threads: &'a str) -> ArgMatches<'a> {
    App::new("mandel")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Escape-time Mandelbrot renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file (binary PGM)"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1536x1024")
                .validator(|s| validate_positive_pair(&s, "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(LEFTLOWER)
                .required(false)
                .long(LEFTLOWER)
                .short("l")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-2.0,-1.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse left lower corner"))
                .help("Left lower corner of the viewport, as re,im"),
        )
        .arg(
            Arg::with_name(RIGHTUPPER)
                .required(false)
                .long(RIGHTUPPER)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("1.0,1.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse right upper corner"))
                .help("Right upper corner of the viewport, as re,im"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("20")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        255,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 255",
                    )
                })
                .help("Maximum escape iterations per pixel"),
        )
        .arg(
            Arg::with_name(BACKEND)
                .required(false)
                .long(BACKEND)
                .short("b")
                .takes_value(true)
                .possible_values(&["sequential", "parallel", "device"])
                .default_value("parallel")
                .help("Which renderer to use"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value(default_threads)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads for the parallel renderer"),
        )
        .arg(
            Arg::with_name(GRID)
                .required(false)
                .long(GRID)
                .short("g")
                .takes_value(true)
                .default_value("32x16")
                .validator(|s| validate_positive_pair(&s, "Could not parse grid dimensions"))
                .help("Device launch grid, in blocks"),
        )
        .arg(
            Arg::with_name(BLOCK)
                .required(false)
                .long(BLOCK)
                .short("k")
                .takes_value(true)
                .default_value("32x8")
                .validator(|s| validate_positive_pair(&s, "Could not parse block dimensions"))
                .help("Device launch block, in threads"),
        )
        .arg(
            Arg::with_name(DEVICE)
                .required(false)
                .long(DEVICE)
                .takes_value(true)
                .default_value("emulated")
                .help("Device backend for the device renderer"),
        )
        .arg(
            Arg::with_name(NORMALIZE)
                .long(NORMALIZE)
                .short("n")
                .help("Stretch escape times to the full 0-255 grey range"),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .long(VERBOSE)
                .short("v")
                .multiple(true)
                .help("More logging; repeat for more"),
        )
        .get_matches()
}

fn init_logging(verbosity: u64) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbosity {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        2 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn write_image(outfile: &str, pixels: &[u8], bounds: (usize, usize)) -> Result<(), std::io::Error> {
    let output = File::create(outfile)?;
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary));
    encoder.encode(pixels, bounds.0 as u32, bounds.1 as u32, ColorType::Gray(8))?;
    Ok(())
}

/// Pair values are checked by the validators, so these only fail if
/// clap lets something through.
fn pair_arg(matches: &ArgMatches, name: &str) -> Result<(usize, usize), failure::Error> {
    let value = matches.value_of(name).unwrap_or_default();
    parse_pair(value, 'x').ok_or_else(|| failure::err_msg(format!("could not parse --{}", name)))
}

fn complex_arg(matches: &ArgMatches, name: &str) -> Result<Complex<f64>, failure::Error> {
    let value = matches.value_of(name).unwrap_or_default();
    parse_complex(value).ok_or_else(|| failure::err_msg(format!("could not parse --{}", name)))
}

fn number_arg<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T, failure::Error> {
    let value = matches.value_of(name).unwrap_or_default();
    T::from_str(value).map_err(|_| failure::err_msg(format!("could not parse --{}", name)))
}

fn renderer(matches: &ArgMatches) -> Result<Box<dyn Renderer>, failure::Error> {
    let renderer: Box<dyn Renderer> = match matches.value_of(BACKEND).unwrap_or("parallel") {
        "sequential" => Box::new(SequentialRenderer),
        "device" => {
            let config = LaunchConfig::new(pair_arg(matches, GRID)?, pair_arg(matches, BLOCK)?)?;
            let device = device::open(matches.value_of(DEVICE).unwrap_or("emulated"))?;
            Box::new(DeviceRenderer::new(device, config))
        }
        _ => Box::new(ParallelRenderer::new(number_arg(matches, THREADS)?)?),
    };
    Ok(renderer)
}

fn run(matches: &ArgMatches) -> Result<(), failure::Error> {
    let (width, height) = pair_arg(matches, SIZE)?;
    let viewport = Viewport::from_corners(
        complex_arg(matches, LEFTLOWER)?,
        complex_arg(matches, RIGHTUPPER)?,
    )?;
    let cap = IterationCap::new(number_arg(matches, ITERATIONS)?)?;
    let renderer = renderer(matches)?;

    let mut image = ImageBuffer::new(width, height)?;
    let started = Instant::now();
    renderer.render(&viewport, &mut image, cap)?;
    info!(
        "{} renderer filled {}x{} pixels in {:?}",
        renderer.name(),
        width,
        height,
        started.elapsed()
    );

    let mut pixels = image.into_raw();
    if matches.is_present(NORMALIZE) {
        let top = cap.get().min(255);
        for p in pixels.iter_mut() {
            *p = clamp((u32::from(*p) * 255) / top, 0, 255) as u8;
        }
    }

    let outfile = matches.value_of(OUTPUT).unwrap_or_default();
    write_image(outfile, &pixels, (width, height))?;
    info!("wrote {}", outfile);
    Ok(())
}

fn main() {
    let max_threads = num_cpus::get().max(1);
    let default_threads = max_threads.to_string();
    let matches = args(max_threads, &default_threads);
    init_logging(matches.occurrences_of(VERBOSE));

    if let Err(e) = run(&matches) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
