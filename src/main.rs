use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
};

use rateshift::audio::pcm;
use rateshift::common::{logger, types::AnyResult};
use rateshift::configs::{Config, Representation};
use tracing::info;

fn main() -> AnyResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    logger::init(&config);

    let io = &config.io;
    let reader = BufReader::new(File::open(&io.input)?);
    let mut writer = BufWriter::new(File::create(&io.output)?);

    info!(
        input = %io.input.display(),
        output = %io.output.display(),
        in_rate = config.resampler.in_rate,
        out_rate = config.resampler.out_rate,
        representation = ?config.resampler.representation,
        "Converting"
    );

    let stats = match config.resampler.representation {
        Representation::Float => {
            let mut resampler = config.resampler.build_float()?;
            pcm::convert(&mut resampler, reader, &mut writer, io.chunk_frames)?
        }
        Representation::Fixed => {
            let mut resampler = config.resampler.build_fixed()?;
            pcm::convert(&mut resampler, reader, &mut writer, io.chunk_frames)?
        }
    };
    writer.flush()?;

    info!(
        frames_in = stats.frames_in,
        frames_out = stats.frames_out,
        "Conversion finished"
    );
    Ok(())
}
