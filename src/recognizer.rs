//! Offline recognizer: the top-level decoding façade.
//!
//! Owns the validated configuration, the acoustic model, the symbol table,
//! the search decoder, the rewrite chain, and the default hotword context.
//! Streams are created here, fed by the caller, and decoded in batches.

use ndarray::{s, Array2};

use crate::config::RecognizerConfig;
use crate::decoder::{apply_blank_penalty, new_decoder, SearchDecoder};
use crate::error::{RecognizerError, Result, StreamFailure};
use crate::features::FeatureExtractor;
use crate::hotwords::{compile_hotwords, load_hotwords_file, HotwordContext};
use crate::model::{AcousticModel, OnnxCtcModel};
use crate::rewrite::RuleChain;
use crate::stream::OfflineStream;
use crate::vocab::SymbolTable;
use crate::RecognitionResult;

/// Batch-oriented offline speech recognizer.
///
/// `decode_streams` takes `&mut self`, so one recognizer handles one decode
/// at a time; distinct recognizers may run concurrently. The vocabulary size
/// of the symbol table defines the model's expected class count.
pub struct OfflineRecognizer {
    config: RecognizerConfig,
    model: Box<dyn AcousticModel>,
    symbols: SymbolTable,
    decoder: Box<dyn SearchDecoder>,
    rules: RuleChain,
    /// Phrases compiled from `hotwords_file` at construction; per-stream
    /// contexts clone these and stamp the current `hotwords_score`.
    default_hotword_phrases: Vec<Vec<i32>>,
    extractor: FeatureExtractor,
}

impl OfflineRecognizer {
    /// Build a recognizer, loading the ONNX model and symbol table named by
    /// the config. Any validation or load failure prevents construction.
    pub fn new(config: RecognizerConfig) -> Result<Self> {
        config.validate()?;

        let tokens_path = &config.model_config.tokens;
        if !tokens_path.exists() {
            return Err(RecognizerError::Config(format!(
                "tokens file not found: {}",
                tokens_path.display()
            )));
        }
        let symbols = SymbolTable::load(tokens_path)?;
        let model = Box::new(OnnxCtcModel::new(&config.model_config)?);

        Self::with_model(config, model, symbols)
    }

    /// Build a recognizer around an injected acoustic model.
    ///
    /// This is the collaborator seam used by tests and embedders that bring
    /// their own forward pass.
    pub fn with_model(
        config: RecognizerConfig,
        model: Box<dyn AcousticModel>,
        symbols: SymbolTable,
    ) -> Result<Self> {
        config.validate()?;

        let rules = RuleChain::load(&config.rule_fsts, &config.rule_fars)?;

        let default_hotword_phrases = match &config.hotwords_file {
            Some(path) => {
                load_hotwords_file(
                    path,
                    config.tokenize_hotwords,
                    &symbols,
                    config.hotwords_score,
                )?
                .phrases
            }
            None => Vec::new(),
        };

        let decoder = new_decoder(&config, model.blank_id(), symbols.len());
        let extractor = FeatureExtractor::new(&config.feat_config);

        log::info!(
            "Recognizer ready: method={}, vocab={}, rules={}, default hotword phrases={}",
            config.decoding_method,
            symbols.len(),
            rules.len(),
            default_hotword_phrases.len()
        );

        Ok(Self {
            config,
            model,
            symbols,
            decoder,
            rules,
            default_hotword_phrases,
            extractor,
        })
    }

    /// Create a stream carrying the config's default hotword context.
    pub fn create_stream(&self) -> OfflineStream {
        let context = if self.default_hotword_phrases.is_empty() {
            None
        } else {
            Some(HotwordContext {
                phrases: self.default_hotword_phrases.clone(),
                score: self.config.hotwords_score,
            })
        };
        OfflineStream::new(self.extractor.clone(), context)
    }

    /// Create a stream with its own hotwords, compiled independently of the
    /// default context. Phrases are `/`-separated; `tokenize_hotwords`
    /// controls whether they are tokenized or looked up pre-tokenized.
    pub fn create_stream_with_hotwords(&self, hotwords: &str) -> Result<OfflineStream> {
        let context = compile_hotwords(
            hotwords,
            self.config.tokenize_hotwords,
            &self.symbols,
            self.config.hotwords_score,
        )?;
        let context = (!context.is_empty()).then_some(context);
        Ok(OfflineStream::new(self.extractor.clone(), context))
    }

    /// Decode a single stream; identical to a one-element batch.
    pub fn decode_stream(&mut self, stream: &mut OfflineStream) -> Result<()> {
        self.decode_streams(&mut [stream])
    }

    /// Decode a batch of streams with one model forward pass.
    ///
    /// Blocks until every stream's result is available. Per-stream failures
    /// are isolated: succeeding streams still receive their results, and the
    /// failures are reported together as a `BatchDecode` error.
    pub fn decode_streams(&mut self, streams: &mut [&mut OfflineStream]) -> Result<()> {
        self.decoder.ensure_supported()?;

        if streams.is_empty() {
            return Err(RecognizerError::InvalidInput(
                "empty stream batch".to_string(),
            ));
        }

        log::debug!("Decoding batch of {} streams", streams.len());

        let mut failures: Vec<StreamFailure> = Vec::new();
        let mut kept: Vec<usize> = Vec::new();
        let mut features: Vec<Array2<f32>> = Vec::new();
        let mut contexts: Vec<Option<HotwordContext>> = Vec::new();

        for (i, stream) in streams.iter().enumerate() {
            if stream.num_frames() == 0 {
                failures.push(StreamFailure {
                    index: i,
                    error: RecognizerError::InvalidInput(
                        "stream has no feature frames".to_string(),
                    ),
                });
            } else {
                kept.push(i);
                features.push(stream.features_owned());
                contexts.push(stream.hotwords().cloned());
            }
        }

        if kept.is_empty() {
            return Err(RecognizerError::BatchDecode {
                total: streams.len(),
                failures,
            });
        }

        let views: Vec<_> = features.iter().map(|f| f.view()).collect();
        let mut output = self.model.forward_batch(&views)?;

        apply_blank_penalty(
            &mut output.log_probs,
            self.model.blank_id(),
            self.config.blank_penalty,
        );

        let max_out_frames = output.log_probs.shape()[1];
        let matrices: Vec<_> = kept
            .iter()
            .enumerate()
            .map(|(k, _)| {
                let len = output.lengths.get(k).copied().unwrap_or(max_out_frames);
                output.log_probs.slice(s![k, ..len.min(max_out_frames), ..])
            })
            .collect();
        let context_refs: Vec<Option<&HotwordContext>> =
            contexts.iter().map(|c| c.as_ref()).collect();

        let decoded = self.decoder.decode_batch(&matrices, &context_refs);

        let frame_shift = self.config.feat_config.frame_shift_seconds();
        let subsampling = self.model.subsampling_factor();

        for (k, result) in decoded.into_iter().enumerate() {
            let index = kept[k];
            match result {
                Ok(tokens) => {
                    let text = self.symbols.decode_text(&tokens.tokens);
                    let text = self.rules.apply(&text);
                    let result = RecognitionResult {
                        tokens: tokens
                            .tokens
                            .iter()
                            .map(|&id| {
                                self.symbols.symbol(id).unwrap_or_default().to_string()
                            })
                            .collect(),
                        token_ids: tokens.tokens,
                        timestamps: tokens
                            .timestamps
                            .iter()
                            .map(|&t| t as f32 * subsampling as f32 * frame_shift)
                            .collect(),
                        scores: tokens.scores,
                        text,
                    };
                    log::debug!("Stream {}: '{}'", index, result.text);
                    streams[index].set_result(result);
                }
                Err(error) => failures.push(StreamFailure { index, error }),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            failures.sort_by_key(|f| f.index);
            Err(RecognizerError::BatchDecode {
                total: streams.len(),
                failures,
            })
        }
    }

    /// Replace decoding-relevant configuration.
    ///
    /// Applies `decoding_method`, `max_active_paths`, `blank_penalty`, and
    /// `hotwords_score`, rebuilding the search decoder. The loaded model,
    /// symbol table, rewrite rules, compiled default hotword phrases, and
    /// feature extractor are unaffected; other fields of `config` are
    /// ignored.
    pub fn set_config(&mut self, config: RecognizerConfig) -> Result<()> {
        config.validate()?;

        self.config.decoding_method = config.decoding_method;
        self.config.max_active_paths = config.max_active_paths;
        self.config.blank_penalty = config.blank_penalty;
        self.config.hotwords_score = config.hotwords_score;

        self.decoder = new_decoder(&self.config, self.model.blank_id(), self.symbols.len());

        log::debug!(
            "Reconfigured: method={}, blank_penalty={}, hotwords_score={}",
            self.config.decoding_method,
            self.config.blank_penalty,
            self.config.hotwords_score
        );
        Ok(())
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }
}
