use std::error::Error;
use std::path::PathBuf;

use argh::FromArgs;
use coreset::utils::{as_continuous_vec, gather_rows, read_vecs, write_vecs};
use coreset::{Coreset, Device};
use log::info;

/// Select a coreset from an fvecs file and write the selected vectors.
#[derive(FromArgs, Debug)]
struct Args {
    /// input fvecs file path
    #[argh(positional)]
    input: PathBuf,

    /// output fvecs file path
    #[argh(positional)]
    output: PathBuf,

    /// number of vectors to select
    #[argh(option, short = 'n', default = "1000")]
    num: usize,

    /// distortion tolerance of the random projection, in (0, 1)
    #[argh(option, default = "0.95")]
    eps: f32,

    /// select on the original vectors without random projection
    #[argh(switch)]
    no_projection: bool,

    /// run the distance step on the batched accelerator backend
    #[argh(switch)]
    accelerate: bool,

    /// seed of the random projection
    #[argh(option)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Args = argh::from_env();
    logforth::stderr().apply();

    let vecs = read_vecs::<f32>(&args.input)?;
    let dim = vecs.first().map_or(0, |vec| vec.len());
    if vecs.iter().any(|vec| vec.len() != dim) {
        return Err("all vectors must have the same dimension".into());
    }
    info!("read {} vectors of dim {} from {:?}", vecs.len(), dim, args.input);

    let device = if args.accelerate {
        Device::Accelerator
    } else {
        Device::Host
    };
    let eps = (!args.no_projection).then_some(args.eps);
    let mut coreset = Coreset::new(args.num, eps, device)?;
    if let Some(seed) = args.seed {
        coreset = coreset.with_seed(seed);
    }

    let flat = as_continuous_vec(&vecs);
    let indices = coreset.select(&flat, dim)?;
    write_vecs(&args.output, &gather_rows(&flat, dim, &indices))?;
    info!("wrote {} vectors to {:?}", indices.len(), args.output);
    Ok(())
}
