//! Offline batch decoding CLI.
//!
//! Usage:
//!   decode_files <model_dir> <wav> [wav ...]
//!       [--hotwords "PHRASE/PHRASE"] [--hotwords-score F]
//!       [--blank-penalty F] [--method greedy_search|modified_beam_search]
//!       [--rule-fst FILE]... [--rule-far FILE]...
//!
//! `model_dir` must contain `model.onnx` and `tokens.txt`. All WAV files are
//! decoded as one batch.

use std::path::PathBuf;
use std::process::ExitCode;

use recognize_rs::{audio, OfflineRecognizer, RecognizerConfig};

struct Args {
    model_dir: PathBuf,
    wavs: Vec<PathBuf>,
    hotwords: Option<String>,
    config: RecognizerConfig,
}

fn parse_args() -> Result<Args, String> {
    let mut config = RecognizerConfig::default();
    let mut positional: Vec<String> = Vec::new();
    let mut hotwords = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |name: &str| {
            it.next().ok_or_else(|| format!("{} needs a value", name))
        };
        match arg.as_str() {
            "--hotwords" => hotwords = Some(value("--hotwords")?),
            "--hotwords-score" => {
                config.hotwords_score = value("--hotwords-score")?
                    .parse()
                    .map_err(|e| format!("bad --hotwords-score: {}", e))?;
            }
            "--blank-penalty" => {
                config.blank_penalty = value("--blank-penalty")?
                    .parse()
                    .map_err(|e| format!("bad --blank-penalty: {}", e))?;
            }
            "--method" => {
                config.decoding_method = value("--method")?
                    .parse()
                    .map_err(|e| format!("{}", e))?;
            }
            "--rule-fst" => config.rule_fsts.push(PathBuf::from(value("--rule-fst")?)),
            "--rule-far" => config.rule_fars.push(PathBuf::from(value("--rule-far")?)),
            other if other.starts_with("--") => {
                return Err(format!("unknown flag '{}'", other));
            }
            _ => positional.push(arg.clone()),
        }
    }

    if positional.len() < 2 {
        return Err("usage: decode_files <model_dir> <wav> [wav ...] [flags]".to_string());
    }

    let model_dir = PathBuf::from(&positional[0]);
    config.model_config.model = model_dir.join("model.onnx");
    config.model_config.tokens = model_dir.join("tokens.txt");

    Ok(Args {
        model_dir,
        wavs: positional[1..].iter().map(PathBuf::from).collect(),
        hotwords,
        config,
    })
}

fn run(args: Args) -> recognize_rs::Result<()> {
    println!("Loading model from {:?}...", args.model_dir);
    let mut recognizer = OfflineRecognizer::new(args.config)?;

    let mut streams = Vec::with_capacity(args.wavs.len());
    for wav in &args.wavs {
        let samples = audio::read_wav_samples(wav)?;
        let mut stream = match &args.hotwords {
            Some(hw) => recognizer.create_stream_with_hotwords(hw)?,
            None => recognizer.create_stream(),
        };
        stream.accept_waveform(16000, &samples)?;
        streams.push(stream);
    }

    let mut refs: Vec<&mut _> = streams.iter_mut().collect();
    let outcome = recognizer.decode_streams(&mut refs);

    for (wav, stream) in args.wavs.iter().zip(streams.iter()) {
        match stream.result() {
            Some(result) => {
                println!("{}: {}", wav.display(), result.text);
                for ((token, ts), score) in result
                    .tokens
                    .iter()
                    .zip(result.timestamps.iter())
                    .zip(result.scores.iter())
                {
                    println!("  {:>8.2}s  {:<12} {:.3}", ts, token, score);
                }
            }
            None => println!("{}: <no result>", wav.display()),
        }
    }

    outcome
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
