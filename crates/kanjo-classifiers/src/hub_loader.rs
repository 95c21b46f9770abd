//! Hugging Face Hub model loader backed by Candle
//!
//! Loads a BERT sequence-classification checkpoint (the layout produced by
//! `transformers`' `BertForSequenceClassification`) from the Hub or from a
//! local directory and runs it on CPU, CUDA or Metal.

use crate::classifier::{ClassificationResult, Classifier};
use crate::loader_plugin::ModelLoader;
use crate::model_config::{resolve_labels, ModelConfig};
use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use kanjo_core::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokenizers::{Encoding, Tokenizer, TruncationParams};

/// Loads sentiment models through `hf-hub` and Candle
#[derive(Debug, Clone)]
pub struct HubModelLoader {
    config: ModelConfig,
}

impl HubModelLoader {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelLoader for HubModelLoader {
    async fn load(&self, model_id: &str) -> Result<Box<dyn Classifier>> {
        let config = self.config.clone();
        let model_id = model_id.to_string();

        // Downloads and weight mapping block; keep them off the async workers
        let classifier = tokio::task::spawn_blocking(move || load_bert(&config, &model_id))
            .await
            .map_err(|e| Error::model_init(format!("model loading task failed: {}", e)))??;

        Ok(Box::new(classifier))
    }
}

/// Files making up a checkpoint
struct ModelFiles {
    config: PathBuf,
    weights: PathBuf,
    tokenizer: TokenizerFiles,
}

enum TokenizerFiles {
    Json(PathBuf),
    Vocab {
        vocab: PathBuf,
        tokenizer_config: Option<PathBuf>,
    },
}

fn load_bert(config: &ModelConfig, model_id: &str) -> Result<BertSequenceClassifier> {
    let files = resolve_model_files(model_id, &config.revision)?;

    let config_str = std::fs::read_to_string(&files.config).map_err(|e| {
        Error::model_init(format!(
            "Failed to read config {}: {}",
            files.config.display(),
            e
        ))
    })?;
    let config_json: serde_json::Value = serde_json::from_str(&config_str)
        .map_err(|e| Error::model_init(format!("Failed to parse config JSON: {}", e)))?;
    let bert_config: BertConfig = serde_json::from_str(&config_str)
        .map_err(|e| Error::model_init(format!("Failed to parse BERT config: {}", e)))?;

    let labels = resolve_labels(&config_json);
    let tokenizer = load_tokenizer(&files.tokenizer, config.max_length)?;
    let device = get_device(&config.device)?;
    let vb = load_var_builder(&files.weights, &device)?;

    let model = load_bert_backbone(&vb, &bert_config)?;
    let pooler = candle_nn::linear(
        bert_config.hidden_size,
        bert_config.hidden_size,
        vb.pp("bert").pp("pooler").pp("dense"),
    )
    .ok();
    if pooler.is_none() {
        tracing::debug!("No pooler weights found, classifying the raw [CLS] embedding");
    }

    let classifier = candle_nn::linear(bert_config.hidden_size, labels.len(), vb.pp("classifier"))
        .map_err(|e| {
            Error::model_init(format!(
                "No classification head with {} labels in checkpoint: {}",
                labels.len(),
                e
            ))
        })?;

    tracing::info!(
        "Loaded BERT classifier '{}' on {:?} with labels {:?}",
        model_id,
        device,
        labels
    );

    Ok(BertSequenceClassifier {
        name: model_id.to_string(),
        tokenizer,
        model,
        pooler,
        classifier,
        device,
        labels,
    })
}

/// Use `model_id` as a directory when it exists, else fetch it from the Hub
fn resolve_model_files(model_id: &str, revision: &str) -> Result<ModelFiles> {
    let local = Path::new(model_id);
    if local.is_dir() {
        tracing::info!("Loading model from local directory {}", local.display());
        return local_model_files(local);
    }

    tracing::info!("Fetching model from HuggingFace: {} @ {}", model_id, revision);

    let api = hf_hub::api::sync::Api::new().map_err(|e| {
        Error::model_init(format!("Failed to initialize HuggingFace API: {}", e))
    })?;
    let repo = api.repo(hf_hub::Repo::with_revision(
        model_id.to_string(),
        hf_hub::RepoType::Model,
        revision.to_string(),
    ));

    let config = repo
        .get("config.json")
        .map_err(|e| Error::model_init(format!("Failed to download config.json: {}", e)))?;

    let weights = ["model.safetensors", "pytorch_model.bin"]
        .iter()
        .find_map(|file| match repo.get(file) {
            Ok(path) => {
                tracing::debug!("Found weight file: {}", file);
                Some(path)
            }
            Err(_) => None,
        })
        .ok_or_else(|| {
            Error::model_init(
                "No model weights found (tried model.safetensors, pytorch_model.bin)",
            )
        })?;

    let tokenizer = if let Ok(path) = repo.get("tokenizer.json") {
        TokenizerFiles::Json(path)
    } else {
        let vocab = repo.get("vocab.txt").map_err(|_| {
            Error::model_init("No tokenizer found (tried tokenizer.json, vocab.txt)")
        })?;
        TokenizerFiles::Vocab {
            vocab,
            tokenizer_config: repo.get("tokenizer_config.json").ok(),
        }
    };

    Ok(ModelFiles {
        config,
        weights,
        tokenizer,
    })
}

fn local_model_files(dir: &Path) -> Result<ModelFiles> {
    let existing = |name: &str| Some(dir.join(name)).filter(|p| p.exists());

    let config = existing("config.json").ok_or_else(|| {
        Error::model_init(format!("config.json not found in {}", dir.display()))
    })?;
    let weights = existing("model.safetensors")
        .or_else(|| existing("pytorch_model.bin"))
        .ok_or_else(|| {
            Error::model_init(format!("No model weights found in {}", dir.display()))
        })?;
    let tokenizer = match existing("tokenizer.json") {
        Some(path) => TokenizerFiles::Json(path),
        None => TokenizerFiles::Vocab {
            vocab: existing("vocab.txt").ok_or_else(|| {
                Error::model_init(format!(
                    "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
                    dir.display()
                ))
            })?,
            tokenizer_config: existing("tokenizer_config.json"),
        },
    };

    Ok(ModelFiles {
        config,
        weights,
        tokenizer,
    })
}

fn get_device(device_str: &str) -> Result<Device> {
    match device_str.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0)
            .map_err(|e| Error::model_init(format!("Failed to initialize CUDA: {}", e))),
        "mps" | "metal" => Device::new_metal(0)
            .map_err(|e| Error::model_init(format!("Failed to initialize Metal: {}", e))),
        _ => Ok(Device::Cpu),
    }
}

fn load_var_builder(weights: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let is_safetensors = weights
        .extension()
        .is_some_and(|ext| ext == "safetensors");

    let vb = if is_safetensors {
        // SAFETY: the file is owned by the model cache and not modified while mapped
        unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device) }
    } else {
        VarBuilder::from_pth(weights, DType::F32, device)
    };

    vb.map_err(|e| {
        Error::model_init(format!(
            "Failed to load weights {}: {}",
            weights.display(),
            e
        ))
    })
}

fn load_bert_backbone(vb: &VarBuilder, config: &BertConfig) -> Result<BertModel> {
    let mut errors = Vec::new();

    for prefix in ["bert", ""] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match BertModel::load(vb_prefix, config) {
            Ok(model) => {
                tracing::debug!(
                    "Loaded BERT backbone from '{}'",
                    if prefix.is_empty() { "<root>" } else { prefix }
                );
                return Ok(model);
            }
            Err(e) => errors.push(format!(
                "{}: {}",
                if prefix.is_empty() { "<root>" } else { prefix },
                e
            )),
        }
    }

    Err(Error::model_init(format!(
        "Failed to load BERT backbone with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

fn load_tokenizer(files: &TokenizerFiles, max_length: usize) -> Result<SentimentTokenizer> {
    let (mut tokenizer, segmenter) = match files {
        TokenizerFiles::Json(path) => {
            let tokenizer = Tokenizer::from_file(path)
                .map_err(|e| Error::model_init(format!("Failed to load tokenizer.json: {}", e)))?;
            (tokenizer, None)
        }
        TokenizerFiles::Vocab {
            vocab,
            tokenizer_config,
        } => {
            let (tokenizer, segmenter) = wordpiece_tokenizer(vocab, tokenizer_config.as_deref())?;
            (tokenizer, Some(segmenter))
        }
    };

    // One sequence per call, so padding would only add unmasked noise
    tokenizer.with_padding(None);
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| Error::model_init(format!("Failed to configure truncation: {}", e)))?;

    Ok(SentimentTokenizer {
        tokenizer,
        segmenter,
    })
}

/// Tokenizer plus the word segmentation a bare `vocab.txt` checkpoint needs
struct SentimentTokenizer {
    tokenizer: Tokenizer,
    segmenter: Option<VocabSegmenter>,
}

impl SentimentTokenizer {
    fn encode(&self, text: &str) -> tokenizers::Result<Encoding> {
        match &self.segmenter {
            Some(segmenter) => self.tokenizer.encode(segmenter.segment(text), true),
            None => self.tokenizer.encode(text, true),
        }
    }
}

/// Splits unspaced Japanese into words by greedy longest match against
/// the vocabulary's word-initial entries.
///
/// Checkpoints without `tokenizer.json` were trained on MeCab-segmented
/// text; WordPiece alone only splits on whitespace and punctuation, which
/// Japanese rarely has. Characters with no vocabulary match become
/// single-character words.
struct VocabSegmenter {
    words: HashSet<String>,
    max_chars: usize,
    lowercase: bool,
}

impl VocabSegmenter {
    fn new<I: IntoIterator<Item = String>>(vocab: I, lowercase: bool) -> Self {
        let words: HashSet<String> = vocab
            .into_iter()
            .filter(|token| {
                !token.is_empty() && !token.starts_with("##") && !is_special_token(token)
            })
            .collect();
        let max_chars = words.iter().map(|w| w.chars().count()).max().unwrap_or(1);

        Self {
            words,
            max_chars,
            lowercase,
        }
    }

    /// Space-separated words for the whitespace pre-tokenizer
    fn segment(&self, text: &str) -> String {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let mut words = Vec::new();
        for chunk in text.split_whitespace() {
            let chars: Vec<char> = chunk.chars().collect();
            let mut start = 0;
            while start < chars.len() {
                let longest = (chars.len() - start).min(self.max_chars);
                let len = (1..=longest)
                    .rev()
                    .find(|&len| {
                        let candidate: String = chars[start..start + len].iter().collect();
                        self.words.contains(&candidate)
                    })
                    .unwrap_or(1);
                words.push(chars[start..start + len].iter().collect::<String>());
                start += len;
            }
        }

        words.join(" ")
    }
}

fn is_special_token(token: &str) -> bool {
    token.len() > 2 && token.starts_with('[') && token.ends_with(']')
}

fn wordpiece_tokenizer(
    vocab: &Path,
    tokenizer_config: Option<&Path>,
) -> Result<(Tokenizer, VocabSegmenter)> {
    use tokenizers::models::wordpiece::WordPiece;
    use tokenizers::normalizers::BertNormalizer;
    use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
    use tokenizers::processors::bert::BertProcessing;

    tracing::debug!("Building WordPiece tokenizer from {}", vocab.display());

    let config: Option<serde_json::Value> = tokenizer_config
        .and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|s| serde_json::from_str(&s).ok());
    let flag = |key: &str| {
        config
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|b| b.as_bool())
    };

    // Japanese BERT checkpoints are cased, and accent stripping drops dakuten
    let lowercase = flag("do_lower_case").unwrap_or(false);
    let strip_accents = flag("strip_accents").unwrap_or(false);

    let wordpiece = WordPiece::from_file(vocab.to_string_lossy().as_ref())
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| Error::model_init(format!("Failed to build WordPiece model: {}", e)))?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    let cls_id = tokenizer.token_to_id("[CLS]").unwrap_or(101);
    let sep_id = tokenizer.token_to_id("[SEP]").unwrap_or(102);

    // Kanji stay joined so multi-character vocabulary entries can match
    tokenizer.with_normalizer(Some(BertNormalizer::new(
        true,
        false,
        Some(strip_accents),
        lowercase,
    )));
    tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
    tokenizer.with_post_processor(Some(BertProcessing::new(
        ("[SEP]".to_string(), sep_id),
        ("[CLS]".to_string(), cls_id),
    )));

    let segmenter = VocabSegmenter::new(tokenizer.get_vocab(false).into_keys(), lowercase);
    tracing::debug!(
        "Segmenting input against {} vocabulary words",
        segmenter.words.len()
    );

    Ok((tokenizer, segmenter))
}

struct BertSequenceClassifier {
    name: String,
    tokenizer: SentimentTokenizer,
    model: BertModel,
    pooler: Option<Linear>,
    classifier: Linear,
    device: Device,
    labels: Vec<String>,
}

impl BertSequenceClassifier {
    fn probabilities(&self, text: &str) -> candle_core::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text)
            .map_err(|e| candle_core::Error::Msg(format!("Tokenization failed: {}", e)))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let hidden_states = self.model.forward(&input_ids, &token_type_ids, None)?;

        let cls_embedding = hidden_states.i((0, 0, ..))?.unsqueeze(0)?;
        let pooled = match &self.pooler {
            Some(pooler) => pooler.forward(&cls_embedding)?.tanh()?,
            None => cls_embedding,
        };

        let logits = self.classifier.forward(&pooled)?;
        candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec1::<f32>()
    }
}

#[async_trait]
impl Classifier for BertSequenceClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<ClassificationResult>> {
        let start = Instant::now();

        let probs = self
            .probabilities(text)
            .map_err(|e| Error::inference(format!("BERT forward pass failed: {}", e)))?;

        Ok(ClassificationResult::ranked(
            &self.labels,
            &probs,
            Some(&self.name),
            start.elapsed().as_micros() as u64,
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
